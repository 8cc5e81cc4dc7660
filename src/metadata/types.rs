use serde::{Deserialize, Serialize};

/// Preview of a single page. `url` is never empty: it falls back to the
/// final navigated url when the page declares no canonical one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkPreview {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageList {
    pub images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginalUrl {
    pub original_url: Option<String>,
}
