use std::path::Path;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::scrape::ResourceKind;

const DEFAULT_LISTEN: &str = "0.0.0.0:3000";

/// Some sites serve different or no metadata to unknown user agents.
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const NAVIGATION_TIMEOUT_SECS: u64 = 30;
const REDIRECT_TIMEOUT_SECS: u64 = 10;
const SETTLE_IDLE_MS: u64 = 500;
const MIN_THUMBNAIL_SIZE: f64 = 200.0;
const MAX_SESSIONS: usize = 4;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    #[default]
    Headless,
    Plain,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1366,
            height: 768,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default)]
    pub renderer: RendererKind,

    /// Chromium executable. Falls back to `CHROME_PATH`, then to autodetection.
    #[serde(default)]
    pub chrome_path: Option<String>,

    #[serde(default)]
    pub sandbox: bool,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default)]
    pub viewport: Viewport,

    /// Budget for a full page load, used by previews and image listings.
    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,

    /// Budget for unwrapping redirects.
    #[serde(default = "default_redirect_timeout_secs")]
    pub redirect_timeout_secs: u64,

    /// How long resource activity must stay quiet before a page counts as settled.
    #[serde(default = "default_settle_idle_ms")]
    pub settle_idle_ms: u64,

    /// Smallest rendered width and height of an `<img>` thumbnail.
    #[serde(default = "default_min_thumbnail_size")]
    pub min_thumbnail_size: f64,

    /// Upper bound on concurrently open rendering sessions.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    #[serde(default = "default_allowed_resources")]
    pub allowed_resources: Vec<ResourceKind>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            renderer: RendererKind::default(),
            chrome_path: None,
            sandbox: false,
            user_agent: default_user_agent(),
            viewport: Viewport::default(),
            navigation_timeout_secs: NAVIGATION_TIMEOUT_SECS,
            redirect_timeout_secs: REDIRECT_TIMEOUT_SECS,
            settle_idle_ms: SETTLE_IDLE_MS,
            min_thumbnail_size: MIN_THUMBNAIL_SIZE,
            max_sessions: MAX_SESSIONS,
            allowed_resources: default_allowed_resources(),
        }
    }
}

fn default_listen() -> String {
    DEFAULT_LISTEN.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_navigation_timeout_secs() -> u64 {
    NAVIGATION_TIMEOUT_SECS
}

fn default_redirect_timeout_secs() -> u64 {
    REDIRECT_TIMEOUT_SECS
}

fn default_settle_idle_ms() -> u64 {
    SETTLE_IDLE_MS
}

fn default_min_thumbnail_size() -> f64 {
    MIN_THUMBNAIL_SIZE
}

fn default_max_sessions() -> usize {
    MAX_SESSIONS
}

fn default_allowed_resources() -> Vec<ResourceKind> {
    vec![
        ResourceKind::Document,
        ResourceKind::Script,
        ResourceKind::Image,
    ]
}

impl Config {
    fn validate(&self) -> anyhow::Result<()> {
        if self.navigation_timeout_secs == 0 {
            bail!("navigation_timeout_secs must be greater than 0");
        }

        if self.redirect_timeout_secs == 0 {
            bail!("redirect_timeout_secs must be greater than 0");
        }

        if self.max_sessions == 0 {
            bail!("max_sessions must be greater than 0");
        }

        if self.viewport.width == 0 || self.viewport.height == 0 {
            bail!(
                "viewport must not be empty, got {}x{}",
                self.viewport.width,
                self.viewport.height
            );
        }

        if !(self.min_thumbnail_size >= 0.0) {
            bail!(
                "min_thumbnail_size must be a non-negative number, got {}",
                self.min_thumbnail_size
            );
        }

        if self.user_agent.trim().is_empty() {
            bail!("user_agent must not be empty");
        }

        // the document itself has to load
        if !self.allowed_resources.contains(&ResourceKind::Document) {
            bail!("allowed_resources must include `document`");
        }

        Ok(())
    }

    /// Loads the config at `path`, writing the defaults there first when the
    /// file does not exist yet. Without a path the defaults are used as is.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        if !path.exists() {
            log::info!("writing default config to {}", path.display());
            std::fs::write(path, serde_yml::to_string(&Self::default())?)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }

        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = serde_yml::from_str(&config_str)
            .with_context(|| format!("config {} is malformed", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    pub fn chrome_path(&self) -> Option<String> {
        self.chrome_path
            .clone()
            .or_else(|| std::env::var("CHROME_PATH").ok())
            .filter(|path| !path.is_empty())
    }
}
