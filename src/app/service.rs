use std::{sync::Arc, time::Duration};

use crate::{
    config::Config,
    metadata::{self, LinkPreview},
    scrape::{
        is_html, Renderer, ResourceKind, ScopedSession, ScrapeError, SessionOptions, WaitUntil,
    },
};

/// The part of the config a single scrape needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeSettings {
    pub user_agent: String,
    pub allowed_resources: Vec<ResourceKind>,
    pub navigation_timeout: Duration,
    pub redirect_timeout: Duration,
    pub min_thumbnail_size: f64,
}

impl From<&Config> for ScrapeSettings {
    fn from(config: &Config) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            allowed_resources: config.allowed_resources.clone(),
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
            redirect_timeout: Duration::from_secs(config.redirect_timeout_secs),
            min_thumbnail_size: config.min_thumbnail_size,
        }
    }
}

/// Runs every operation in a session of its own, closed before returning.
pub struct PreviewService {
    renderer: Arc<dyn Renderer>,
    settings: ScrapeSettings,
}

impl PreviewService {
    pub fn new(renderer: Arc<dyn Renderer>, settings: ScrapeSettings) -> Self {
        Self { renderer, settings }
    }

    fn scrape_options(&self) -> SessionOptions {
        SessionOptions {
            user_agent: Some(self.settings.user_agent.clone()),
            allowed_resources: Some(self.settings.allowed_resources.clone()),
        }
    }

    /// Navigate and wait for the page to settle. Returns the final url.
    fn load(&self, session: &mut ScopedSession, url: &str) -> Result<String, ScrapeError> {
        let final_url =
            session.navigate(url, WaitUntil::NetworkIdle, self.settings.navigation_timeout)?;

        match session.content_type() {
            Ok(Some(content_type)) if !is_html(&content_type) => {
                return Err(ScrapeError::NotHtml {
                    url: final_url,
                    content_type,
                })
            }
            Ok(_) => {}
            Err(err) => log::debug!("{final_url}: unknown content type: {err}"),
        }

        Ok(final_url)
    }

    /// Link preview of `url`, `None` when the page could not be loaded.
    pub fn build_preview(&self, url: &str) -> Option<LinkPreview> {
        log::info!("fetching preview for url: {url}");

        match self.try_build_preview(url) {
            Ok(preview) => {
                log::info!("successfully generated preview for url: {url}");
                Some(preview)
            }
            Err(err) => {
                log::error!("error generating preview for url {url}: {err}");
                None
            }
        }
    }

    fn try_build_preview(&self, url: &str) -> Result<LinkPreview, ScrapeError> {
        let mut session = ScopedSession::open(self.renderer.as_ref(), &self.scrape_options())?;
        let final_url = self.load(&mut session, url)?;

        Ok(metadata::assemble_preview(
            &*session,
            &final_url,
            self.settings.min_thumbnail_size,
        ))
    }

    /// Every usable `<img>` url of the page, in document order.
    pub fn all_images(&self, url: &str) -> Result<Vec<String>, ScrapeError> {
        log::info!("listing images for url: {url}");

        let mut session = ScopedSession::open(self.renderer.as_ref(), &self.scrape_options())?;
        let final_url = self.load(&mut session, url)?;

        metadata::list_images(&*session, &final_url)
    }

    /// Where `url` ends up after redirects, without scraping anything.
    pub fn original_url(&self, url: &str) -> Option<String> {
        let result = ScopedSession::open(self.renderer.as_ref(), &SessionOptions::default())
            .and_then(|mut session| {
                session.navigate(url, WaitUntil::DomContentLoaded, self.settings.redirect_timeout)
            });

        match result {
            Ok(final_url) => Some(final_url),
            Err(err) => {
                log::error!("an error occurred resolving {url}: {err}");
                None
            }
        }
    }
}
