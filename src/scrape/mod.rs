#[cfg(feature = "headless")]
pub mod headless;
pub mod plain;

use std::{
    ops::{Deref, DerefMut},
    sync::Arc,
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::config::{Config, RendererKind};

#[derive(thiserror::Error, Debug)]
pub enum ScrapeError {
    #[error("failed to start renderer: {0}")]
    Launch(String),

    #[error("{url}: navigation failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("{url}: navigation did not settle within {secs}s")]
    Timeout { url: String, secs: u64 },

    #[error("{url}: not an html document ({content_type})")]
    NotHtml { url: String, content_type: String },

    #[error("element query failed: {0}")]
    Element(String),
}

/// When a navigation counts as finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitUntil {
    /// The document has been parsed.
    DomContentLoaded,
    /// The document has loaded and resource activity stopped for a short idle window.
    NetworkIdle,
}

/// Resource types a session lets through when request interception is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Document,
    Script,
    Image,
    Stylesheet,
    Font,
    Media,
    Xhr,
    Fetch,
    Other,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionOptions {
    pub user_agent: Option<String>,
    /// `None` disables interception; every request goes through.
    pub allowed_resources: Option<Vec<ResourceKind>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub width: f64,
    pub height: f64,
}

/// An element of a rendered document.
pub trait Element {
    fn attribute(&self, name: &str) -> Result<Option<String>, ScrapeError>;

    /// Rendered, visible text of the element.
    fn inner_text(&self) -> Result<String, ScrapeError>;

    /// Layout box of the element, `None` when it has no layout information.
    fn bounding_box(&self) -> Result<Option<BoundingBox>, ScrapeError>;
}

/// A rendered document that can be queried with CSS selectors.
pub trait Page {
    fn content_type(&self) -> Result<Option<String>, ScrapeError>;

    /// First element matching `selector` in document order.
    fn find_element(&self, selector: &str) -> Result<Option<Box<dyn Element + '_>>, ScrapeError>;

    /// Every element matching `selector`, in document order.
    fn find_elements(&self, selector: &str) -> Result<Vec<Box<dyn Element + '_>>, ScrapeError>;
}

pub trait Session: Page {
    /// Navigates to `url` and returns the final url once `wait` is satisfied.
    fn navigate(&mut self, url: &str, wait: WaitUntil, timeout: Duration)
        -> Result<String, ScrapeError>;

    /// Releases everything the session holds. Must be safe to call twice.
    fn close(&mut self);
}

pub trait Renderer: Send + Sync {
    fn open(&self, opts: &SessionOptions) -> Result<Box<dyn Session>, ScrapeError>;

    fn name(&self) -> &'static str;
}

/// Session that is closed when it goes out of scope, on every exit path.
pub struct ScopedSession {
    inner: Box<dyn Session>,
}

impl ScopedSession {
    pub fn open(renderer: &dyn Renderer, opts: &SessionOptions) -> Result<Self, ScrapeError> {
        let inner = renderer.open(opts)?;
        log::debug!("{}: session opened", renderer.name());
        Ok(Self { inner })
    }
}

impl Deref for ScopedSession {
    type Target = dyn Session;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl DerefMut for ScopedSession {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.inner.as_mut()
    }
}

impl Drop for ScopedSession {
    fn drop(&mut self) {
        self.inner.close();
        log::debug!("session closed");
    }
}

pub fn is_html(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "text/html" || mime == "application/xhtml+xml"
}

pub fn make_renderer(config: &Config) -> anyhow::Result<Arc<dyn Renderer>> {
    match config.renderer {
        RendererKind::Plain => Ok(Arc::new(plain::PlainRenderer::new())),
        #[cfg(feature = "headless")]
        RendererKind::Headless => Ok(Arc::new(headless::ChromeRenderer::new(config))),
        #[cfg(not(feature = "headless"))]
        RendererKind::Headless => {
            anyhow::bail!("built without the `headless` feature, use the plain renderer")
        }
    }
}
