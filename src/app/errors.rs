use crate::scrape::ScrapeError;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("URL parameter is required")]
    MissingUrl,

    #[error("Could not generate preview")]
    NoPreview,

    #[error("No images found")]
    NoImages,

    #[error("{0}")]
    Scrape(#[from] ScrapeError),

    #[error("unexpected error: {0:?}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Whether the failure comes from the page or the request rather than from us.
    pub fn is_client_error(&self) -> bool {
        match self {
            AppError::MissingUrl | AppError::NoPreview | AppError::NoImages => true,
            AppError::Scrape(err) => matches!(
                err,
                ScrapeError::Navigation { .. }
                    | ScrapeError::Timeout { .. }
                    | ScrapeError::NotHtml { .. }
            ),
            AppError::Other(_) => false,
        }
    }
}
