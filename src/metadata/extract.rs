use super::platforms::{Extraction, SelectorEntry};
use crate::scrape::{Page, ScrapeError};

/// Walk `chain` in order and return the first non-empty content, as read.
///
/// A failing entry (query error, detached element, ...) is skipped like an
/// entry that matched nothing; the walk goes on with the next one.
pub fn extract<P: Page + ?Sized>(page: &P, chain: &[SelectorEntry]) -> Option<String> {
    chain.iter().find_map(|entry| match read_entry(page, entry) {
        Ok(content) => content,
        Err(err) => {
            log::debug!("{}: skipped: {err}", entry.matcher);
            None
        }
    })
}

fn read_entry<P: Page + ?Sized>(
    page: &P,
    entry: &SelectorEntry,
) -> Result<Option<String>, ScrapeError> {
    let Some(element) = page.find_element(&entry.matcher)? else {
        return Ok(None);
    };

    let content = match entry.extraction {
        Extraction::MetaContent => match non_empty(element.attribute("content")?) {
            Some(content) => Some(content),
            None => non_empty(Some(element.inner_text()?)),
        },
        Extraction::VisibleText => non_empty(Some(element.inner_text()?)),
    };

    Ok(content)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}
