use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use scraper::{ElementRef, Html, Selector};

use super::{
    BoundingBox, Element, Page, Renderer, ScrapeError, Session, SessionOptions, WaitUntil,
};

/// Renders nothing: fetches the document over plain http and queries the
/// markup as served. Scripts never run, and `<img>` layout comes from the
/// `width`/`height` attributes when both are numeric.
pub struct PlainRenderer;

impl PlainRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for PlainRenderer {
    fn open(&self, opts: &SessionOptions) -> Result<Box<dyn Session>, ScrapeError> {
        let mut client =
            reqwest::blocking::Client::builder().pool_idle_timeout(Duration::from_secs(10));

        if let Some(ref user_agent) = opts.user_agent {
            client = client.user_agent(user_agent);
        }

        let client = client
            .build()
            .map_err(|err| ScrapeError::Launch(err.to_string()))?;

        Ok(Box::new(PlainSession {
            client: Some(client),
            page: PlainPage::blank(),
        }))
    }

    fn name(&self) -> &'static str {
        "plain"
    }
}

struct PlainSession {
    client: Option<reqwest::blocking::Client>,
    page: PlainPage,
}

impl Page for PlainSession {
    fn content_type(&self) -> Result<Option<String>, ScrapeError> {
        self.page.content_type()
    }

    fn find_element(&self, selector: &str) -> Result<Option<Box<dyn Element + '_>>, ScrapeError> {
        self.page.find_element(selector)
    }

    fn find_elements(&self, selector: &str) -> Result<Vec<Box<dyn Element + '_>>, ScrapeError> {
        self.page.find_elements(selector)
    }
}

impl Session for PlainSession {
    // there is nothing to settle without a script engine, both waits end
    // once the body has been read.
    fn navigate(
        &mut self,
        url: &str,
        _wait: WaitUntil,
        timeout: Duration,
    ) -> Result<String, ScrapeError> {
        let client = self.client.as_ref().ok_or_else(|| ScrapeError::Navigation {
            url: url.to_string(),
            reason: "session is closed".to_string(),
        })?;

        let to_navigation_error = |err: reqwest::Error| {
            if err.is_timeout() {
                ScrapeError::Timeout {
                    url: url.to_string(),
                    secs: timeout.as_secs(),
                }
            } else {
                ScrapeError::Navigation {
                    url: url.to_string(),
                    reason: err.to_string(),
                }
            }
        };

        let resp = client
            .get(url)
            .timeout(timeout)
            .send()
            .map_err(to_navigation_error)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ScrapeError::Navigation {
                url: url.to_string(),
                reason: status.to_string(),
            });
        }

        let final_url = resp.url().to_string();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = resp.text().map_err(to_navigation_error)?;

        self.page = PlainPage::parse(content_type, &body);

        Ok(final_url)
    }

    fn close(&mut self) {
        self.client.take();
        self.page = PlainPage::blank();
    }
}

/// Parsed markup of a document, queried with `scraper`.
pub struct PlainPage {
    content_type: Option<String>,
    document: Html,
}

impl PlainPage {
    pub fn blank() -> Self {
        Self {
            content_type: None,
            document: Html::new_document(),
        }
    }

    pub fn parse(content_type: Option<String>, html: &str) -> Self {
        Self {
            content_type,
            document: Html::parse_document(html),
        }
    }

    fn selector(selector: &str) -> Result<Selector, ScrapeError> {
        Selector::parse(selector).map_err(|err| ScrapeError::Element(format!("{selector}: {err}")))
    }
}

impl Page for PlainPage {
    fn content_type(&self) -> Result<Option<String>, ScrapeError> {
        Ok(self.content_type.clone())
    }

    fn find_element(&self, selector: &str) -> Result<Option<Box<dyn Element + '_>>, ScrapeError> {
        let selector = Self::selector(selector)?;
        Ok(self
            .document
            .select(&selector)
            .next()
            .map(|el| Box::new(PlainElement(el)) as Box<dyn Element + '_>))
    }

    fn find_elements(&self, selector: &str) -> Result<Vec<Box<dyn Element + '_>>, ScrapeError> {
        let selector = Self::selector(selector)?;
        Ok(self
            .document
            .select(&selector)
            .map(|el| Box::new(PlainElement(el)) as Box<dyn Element + '_>)
            .collect())
    }
}

struct PlainElement<'a>(ElementRef<'a>);

impl PlainElement<'_> {
    fn dimension(&self, name: &str) -> Option<f64> {
        let value = self.0.value().attr(name)?.trim();
        value.trim_end_matches("px").parse::<f64>().ok()
    }
}

impl Element for PlainElement<'_> {
    fn attribute(&self, name: &str) -> Result<Option<String>, ScrapeError> {
        Ok(self.0.value().attr(name).map(str::to_string))
    }

    fn inner_text(&self) -> Result<String, ScrapeError> {
        Ok(self.0.text().collect::<String>())
    }

    fn bounding_box(&self) -> Result<Option<BoundingBox>, ScrapeError> {
        Ok(self
            .dimension("width")
            .zip(self.dimension("height"))
            .map(|(width, height)| BoundingBox { width, height }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(html: &str) -> PlainPage {
        PlainPage::parse(Some("text/html".into()), html)
    }

    #[test]
    fn test_find_elements_in_document_order() {
        let page = page(
            r#"<html><head>
                <meta name="twitter:image" content="https://example.com/first.png">
                <meta property="og:image" content="https://example.com/second.png">
            </head><body></body></html>"#,
        );

        let found = page
            .find_elements(r#"meta[property="og:image"], meta[name="twitter:image"]"#)
            .unwrap();
        let contents = found
            .iter()
            .map(|el| el.attribute("content").unwrap().unwrap())
            .collect::<Vec<_>>();

        assert_eq!(
            contents,
            vec!["https://example.com/first.png", "https://example.com/second.png"]
        );
    }

    #[test]
    fn test_find_element_missing() {
        let page = page("<html><head></head><body></body></html>");
        assert!(page.find_element("img").unwrap().is_none());
        assert!(page.find_elements("img").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_selector_is_an_error() {
        let page = page("<html></html>");
        assert!(matches!(
            page.find_element("meta[[["),
            Err(ScrapeError::Element(_))
        ));
    }

    #[test]
    fn test_bounding_box_from_attributes() {
        let page = page(
            r#"<html><body>
                <img src="/a.png" width="300" height="250px">
                <img src="/b.png" width="300">
                <img src="/c.png" width="auto" height="10">
            </body></html>"#,
        );
        let images = page.find_elements("img").unwrap();

        assert_eq!(
            images[0].bounding_box().unwrap(),
            Some(BoundingBox {
                width: 300.0,
                height: 250.0
            })
        );
        assert_eq!(images[1].bounding_box().unwrap(), None);
        assert_eq!(images[2].bounding_box().unwrap(), None);
    }

    #[test]
    fn test_title_text() {
        let page = page("<html><head><title>Hello there</title></head></html>");
        let title = page.find_element("title").unwrap().unwrap();
        assert_eq!(title.inner_text().unwrap(), "Hello there");
        assert_eq!(title.attribute("content").unwrap(), None);
    }
}
