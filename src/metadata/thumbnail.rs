use super::normalize::resolve_image_url;
use crate::scrape::{Element, Page, ScrapeError};

/// Image meta tags of every platform, queried as one group.
const IMAGE_META_TAGS: &str = r#"meta[property="og:image"], meta[name="twitter:image"]"#;

/// Pick the preview image of a rendered page.
///
/// `og:image` and `twitter:image` tags come first, taken together in
/// document order since several of them may coexist. When none of them
/// resolves, the first `<img>` rendered at least `min_size` wide and high wins.
pub fn select_thumbnail<P: Page + ?Sized>(
    page: &P,
    base_url: &str,
    min_size: f64,
) -> Option<String> {
    from_meta_tags(page, base_url).or_else(|| from_images(page, base_url, min_size))
}

fn from_meta_tags<P: Page + ?Sized>(page: &P, base_url: &str) -> Option<String> {
    let elements = match page.find_elements(IMAGE_META_TAGS) {
        Ok(elements) => elements,
        Err(err) => {
            log::debug!("image meta tags: {err}");
            return None;
        }
    };

    elements.iter().find_map(|el| match el.attribute("content") {
        Ok(content) => resolve_image_url(base_url, content.as_deref()),
        Err(err) => {
            log::debug!("image meta tag skipped: {err}");
            None
        }
    })
}

fn from_images<P: Page + ?Sized>(page: &P, base_url: &str, min_size: f64) -> Option<String> {
    let images = match page.find_elements("img") {
        Ok(images) => images,
        Err(err) => {
            log::error!("error finding thumbnail image: {err}");
            return None;
        }
    };

    images
        .iter()
        .find_map(|img| match large_enough(img.as_ref(), base_url, min_size) {
            Ok(url) => url,
            Err(err) => {
                log::debug!("thumbnail candidate skipped: {err}");
                None
            }
        })
}

fn large_enough(
    img: &dyn Element,
    base_url: &str,
    min_size: f64,
) -> Result<Option<String>, ScrapeError> {
    let Some(url) = resolve_image_url(base_url, img.attribute("src")?.as_deref()) else {
        return Ok(None);
    };

    Ok(img
        .bounding_box()?
        .filter(|bbox| bbox.width >= min_size && bbox.height >= min_size)
        .map(|_| url))
}

/// Every `<img src>` of the page that resolves, in document order.
pub fn list_images<P: Page + ?Sized>(page: &P, base_url: &str) -> Result<Vec<String>, ScrapeError> {
    let images = page.find_elements("img")?;

    Ok(images
        .iter()
        .filter_map(|img| match img.attribute("src") {
            Ok(src) => resolve_image_url(base_url, src.as_deref()),
            Err(err) => {
                log::debug!("image skipped: {err}");
                None
            }
        })
        .collect())
}
