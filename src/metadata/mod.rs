pub mod extract;
pub mod normalize;
pub mod platforms;
pub mod thumbnail;
pub mod types;

pub use thumbnail::list_images;
pub use types::{ImageList, LinkPreview, OriginalUrl};

use crate::scrape::Page;
use extract::extract;
use normalize::domain_of;
use platforms::lookup;
use thumbnail::select_thumbnail;

/// Assemble the preview of a page that has finished loading at `final_url`.
///
/// Each field degrades to `None` on its own; only `url` is always set.
pub fn assemble_preview<P: Page + ?Sized>(
    page: &P,
    final_url: &str,
    min_thumbnail_size: f64,
) -> LinkPreview {
    let domain = domain_of(final_url).unwrap_or_default();
    let config = lookup(&domain);
    log::info!("using config for domain: {domain}");

    let image = select_thumbnail(page, final_url, min_thumbnail_size);

    LinkPreview {
        url: extract(page, &config.selectors.url).unwrap_or_else(|| final_url.to_string()),
        title: extract(page, &config.selectors.title),
        description: extract(page, &config.selectors.description),
        image,
    }
}
