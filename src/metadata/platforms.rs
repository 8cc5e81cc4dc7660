use std::collections::HashMap;

use once_cell::sync::Lazy;

pub const DEFAULT_PLATFORM: &str = "default";

/// How a matched element yields its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction {
    /// The `content` attribute, or the visible text when the attribute is missing.
    MetaContent,
    /// The rendered, visible text.
    VisibleText,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorEntry {
    pub matcher: String,
    pub extraction: Extraction,
}

impl SelectorEntry {
    /// `<meta property="...">`, the Open Graph convention.
    pub fn property(name: &str) -> Self {
        Self {
            matcher: format!(r#"meta[property="{name}"]"#),
            extraction: Extraction::MetaContent,
        }
    }

    /// `<meta name="...">`, used by Twitter cards and plain descriptions.
    pub fn name(name: &str) -> Self {
        Self {
            matcher: format!(r#"meta[name="{name}"]"#),
            extraction: Extraction::MetaContent,
        }
    }

    pub fn text(matcher: &str) -> Self {
        Self {
            matcher: matcher.to_string(),
            extraction: Extraction::VisibleText,
        }
    }
}

/// Ordered fallback chain, earlier entries win.
pub type SelectorChain = Vec<SelectorEntry>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selectors {
    pub url: SelectorChain,
    pub title: SelectorChain,
    pub description: SelectorChain,
    pub image: SelectorChain,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformConfig {
    pub selectors: Selectors,
}

static PLATFORMS: Lazy<HashMap<&'static str, PlatformConfig>> = Lazy::new(|| {
    use SelectorEntry as S;

    let og_then_twitter_image = || vec![S::property("og:image"), S::name("twitter:image")];

    // platforms that only fill in open graph tags
    let open_graph = || PlatformConfig {
        selectors: Selectors {
            url: vec![S::property("og:url")],
            title: vec![S::property("og:title")],
            description: vec![S::property("og:description")],
            image: og_then_twitter_image(),
        },
    };

    // platforms whose twitter card text is better than their open graph text
    let twitter_text = || PlatformConfig {
        selectors: Selectors {
            url: vec![S::property("og:url")],
            title: vec![S::name("twitter:title")],
            description: vec![S::name("twitter:description")],
            image: og_then_twitter_image(),
        },
    };

    let mut platforms = HashMap::new();

    platforms.insert(
        DEFAULT_PLATFORM,
        PlatformConfig {
            selectors: Selectors {
                url: vec![S::property("og:url"), S::name("twitter:url")],
                title: vec![
                    S::property("og:title"),
                    S::name("twitter:title"),
                    S::text("title"),
                ],
                description: vec![
                    S::property("og:description"),
                    S::name("twitter:description"),
                    S::name("description"),
                ],
                image: og_then_twitter_image(),
            },
        },
    );
    platforms.insert("tiktok.com", open_graph());
    platforms.insert("facebook.com", open_graph());
    platforms.insert(
        "twitter.com",
        PlatformConfig {
            selectors: Selectors {
                url: vec![S::name("twitter:url")],
                title: vec![S::name("twitter:title")],
                description: vec![S::name("twitter:description")],
                image: vec![S::name("twitter:image")],
            },
        },
    );
    platforms.insert("youtube.com", twitter_text());
    platforms.insert("linkedin.com", twitter_text());

    platforms
});

/// Selector config for `domain`. The match is exact: `m.tiktok.com` or
/// `www.youtube.com` get the default config.
pub fn lookup(domain: &str) -> &'static PlatformConfig {
    PLATFORMS
        .get(domain)
        .or_else(|| PLATFORMS.get(DEFAULT_PLATFORM))
        .expect("platform registry always has a default entry")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_exists() {
        assert!(PLATFORMS.contains_key(DEFAULT_PLATFORM));
        for domain in [
            "tiktok.com",
            "facebook.com",
            "twitter.com",
            "youtube.com",
            "linkedin.com",
        ] {
            assert!(PLATFORMS.contains_key(domain), "{domain}");
        }
    }

    #[test]
    fn test_unknown_domain_falls_back_to_default() {
        assert_eq!(lookup("unknown-site.example"), lookup(DEFAULT_PLATFORM));
        assert_eq!(lookup(""), lookup(DEFAULT_PLATFORM));
    }

    #[test]
    fn test_platform_override_differs() {
        assert_ne!(
            lookup("tiktok.com").selectors.url,
            lookup("unknown-site.example").selectors.url
        );
        assert_eq!(
            lookup("tiktok.com").selectors.url,
            vec![SelectorEntry::property("og:url")]
        );
    }

    #[test]
    fn test_exact_match_only() {
        assert_eq!(lookup("m.tiktok.com"), lookup(DEFAULT_PLATFORM));
        assert_eq!(lookup("www.youtube.com"), lookup(DEFAULT_PLATFORM));
        assert_ne!(lookup("youtube.com"), lookup(DEFAULT_PLATFORM));
    }

    #[test]
    fn test_default_title_chain_order() {
        let title = &lookup(DEFAULT_PLATFORM).selectors.title;
        let matchers = title.iter().map(|e| e.matcher.as_str()).collect::<Vec<_>>();

        assert_eq!(
            matchers,
            vec![
                r#"meta[property="og:title"]"#,
                r#"meta[name="twitter:title"]"#,
                "title"
            ]
        );
        assert_eq!(title[2].extraction, Extraction::VisibleText);
    }

    #[test]
    fn test_twitter_uses_only_card_tags() {
        let selectors = &lookup("twitter.com").selectors;
        for chain in [
            &selectors.url,
            &selectors.title,
            &selectors.description,
            &selectors.image,
        ] {
            assert!(chain.iter().all(|e| e.matcher.starts_with(r#"meta[name="twitter:"#)));
        }
    }
}
