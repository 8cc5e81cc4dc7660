use headless_chrome::{
    browser::{
        tab::{element::Element as ChromeElementRef, NoElementFound, RequestPausedDecision},
        transport::{SessionId, Transport},
    },
    protocol::cdp::{
        Fetch::{events::RequestPausedEvent, FailRequest, RequestPattern, RequestStage},
        Network::{ErrorReason, ResourceType},
    },
    Browser, LaunchOptionsBuilder, Tab,
};
use std::{
    path::PathBuf,
    sync::Arc,
    thread::sleep,
    time::{Duration, Instant},
};

use super::{
    BoundingBox, Element, Page, Renderer, ResourceKind, ScrapeError, Session, SessionOptions,
    WaitUntil,
};
use crate::config::Config;

const SETTLE_POLL: Duration = Duration::from_millis(100);

// -1 until the load event fired, then the number of finished resource fetches.
// The timing buffer holds 250 entries by default and stops growing once full,
// so entries are moved into a counter and the buffer cleared on every poll.
const RESOURCE_PROBE: &str = "(() => { \
    performance.setResourceTimingBufferSize(10000); \
    window.__linkpeekResources = (window.__linkpeekResources || 0) \
        + performance.getEntriesByType('resource').length; \
    performance.clearResourceTimings(); \
    return document.readyState === 'complete' ? window.__linkpeekResources : -1; \
})()";

/// One Chromium process per session.
pub struct ChromeRenderer {
    path: Option<PathBuf>,
    sandbox: bool,
    window_size: (u32, u32),
    settle_idle: Duration,
    idle_browser_timeout: Duration,
}

impl ChromeRenderer {
    pub fn new(config: &Config) -> Self {
        Self {
            path: config.chrome_path().map(PathBuf::from),
            sandbox: config.sandbox,
            window_size: (config.viewport.width, config.viewport.height),
            settle_idle: Duration::from_millis(config.settle_idle_ms),
            // the devtools connection must outlive the longest navigation
            idle_browser_timeout: Duration::from_secs(config.navigation_timeout_secs * 2),
        }
    }
}

impl Renderer for ChromeRenderer {
    fn open(&self, opts: &SessionOptions) -> Result<Box<dyn Session>, ScrapeError> {
        let launch_err = |err: anyhow::Error| ScrapeError::Launch(err.to_string());

        let options = LaunchOptionsBuilder::default()
            .sandbox(self.sandbox)
            .path(self.path.clone())
            .window_size(Some(self.window_size))
            .idle_browser_timeout(self.idle_browser_timeout)
            .build()
            .map_err(|err| ScrapeError::Launch(err.to_string()))?;

        let browser = Browser::new(options).map_err(launch_err)?;
        let tab = browser.new_tab().map_err(launch_err)?;

        if let Some(ref user_agent) = opts.user_agent {
            tab.set_user_agent(user_agent, None, None)
                .map_err(launch_err)?;
        }

        if let Some(ref allowed) = opts.allowed_resources {
            intercept_requests(&tab, allowed.clone()).map_err(launch_err)?;
        }

        Ok(Box::new(ChromeSession {
            browser: Some(browser),
            tab,
            settle_idle: self.settle_idle,
        }))
    }

    fn name(&self) -> &'static str {
        "chrome"
    }
}

fn resource_kind(resource_type: &ResourceType) -> ResourceKind {
    match resource_type {
        ResourceType::Document => ResourceKind::Document,
        ResourceType::Script => ResourceKind::Script,
        ResourceType::Image => ResourceKind::Image,
        ResourceType::Stylesheet => ResourceKind::Stylesheet,
        ResourceType::Font => ResourceKind::Font,
        ResourceType::Media => ResourceKind::Media,
        ResourceType::Xhr => ResourceKind::Xhr,
        ResourceType::Fetch => ResourceKind::Fetch,
        _ => ResourceKind::Other,
    }
}

/// Pauses every request and lets through only the allowed resource types.
fn intercept_requests(tab: &Arc<Tab>, allowed: Vec<ResourceKind>) -> anyhow::Result<()> {
    let patterns = vec![RequestPattern {
        url_pattern: None,
        resource_Type: None,
        request_stage: Some(RequestStage::Request),
    }];
    tab.enable_fetch(Some(patterns.as_slice()), None)?;

    tab.enable_request_interception(Arc::new(
        move |_transport: Arc<Transport>, _session_id: SessionId, event: RequestPausedEvent| {
            let kind = resource_kind(&event.params.resource_Type);
            if allowed.contains(&kind) {
                RequestPausedDecision::Continue(None)
            } else {
                log::trace!("blocked {kind:?} request to {}", event.params.request.url);
                RequestPausedDecision::Fail(FailRequest {
                    request_id: event.params.request_id,
                    error_reason: ErrorReason::BlockedByClient,
                })
            }
        },
    ))?;

    Ok(())
}

struct ChromeSession {
    browser: Option<Browser>,
    tab: Arc<Tab>,
    settle_idle: Duration,
}

impl ChromeSession {
    /// Polls the resource timeline until it stops growing for `settle_idle`.
    fn wait_for_network_idle(
        &self,
        url: &str,
        deadline: Instant,
        timeout: Duration,
    ) -> Result<(), ScrapeError> {
        let mut last_count = None;
        let mut stable_since = Instant::now();

        loop {
            let now = Instant::now();
            if now >= deadline {
                return Err(ScrapeError::Timeout {
                    url: url.to_string(),
                    secs: timeout.as_secs(),
                });
            }

            let count = self
                .tab
                .evaluate(RESOURCE_PROBE, false)
                .ok()
                .and_then(|obj| obj.value)
                .and_then(|value| value.as_i64());

            match count {
                Some(count) if count >= 0 && last_count == Some(count) => {
                    if now.duration_since(stable_since) >= self.settle_idle {
                        return Ok(());
                    }
                }
                _ => {
                    last_count = count;
                    stable_since = now;
                }
            }

            sleep(SETTLE_POLL);
        }
    }
}

impl Page for ChromeSession {
    fn content_type(&self) -> Result<Option<String>, ScrapeError> {
        let obj = self
            .tab
            .evaluate("document.contentType", false)
            .map_err(|err| ScrapeError::Element(err.to_string()))?;

        Ok(obj
            .value
            .and_then(|value| value.as_str().map(str::to_string)))
    }

    fn find_element(&self, selector: &str) -> Result<Option<Box<dyn Element + '_>>, ScrapeError> {
        match self.tab.find_element(selector) {
            Ok(el) => Ok(Some(Box::new(ChromeElement(el)) as Box<dyn Element + '_>)),
            Err(err) if err.is::<NoElementFound>() => Ok(None),
            Err(err) => Err(ScrapeError::Element(format!("{selector}: {err}"))),
        }
    }

    fn find_elements(&self, selector: &str) -> Result<Vec<Box<dyn Element + '_>>, ScrapeError> {
        match self.tab.find_elements(selector) {
            Ok(els) => Ok(els
                .into_iter()
                .map(|el| Box::new(ChromeElement(el)) as Box<dyn Element + '_>)
                .collect()),
            Err(err) if err.is::<NoElementFound>() => Ok(Vec::new()),
            Err(err) => Err(ScrapeError::Element(format!("{selector}: {err}"))),
        }
    }
}

impl Session for ChromeSession {
    fn navigate(
        &mut self,
        url: &str,
        wait: WaitUntil,
        timeout: Duration,
    ) -> Result<String, ScrapeError> {
        let started = Instant::now();
        let deadline = started + timeout;

        let nav_err = |err: anyhow::Error| {
            if started.elapsed() >= timeout {
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

        self.tab.set_default_timeout(timeout);
        self.tab.navigate_to(url).map_err(nav_err)?;
        self.tab.wait_until_navigated().map_err(nav_err)?;

        if wait == WaitUntil::NetworkIdle {
            self.wait_for_network_idle(url, deadline, timeout)?;
        }

        Ok(self.tab.get_url())
    }

    fn close(&mut self) {
        if let Some(browser) = self.browser.take() {
            let _ = self.tab.close(true);
            // dropping the browser kills the chromium process
            drop(browser);
        }
    }
}

struct ChromeElement<'a>(ChromeElementRef<'a>);

impl ChromeElement<'_> {
    fn read_string(
        &self,
        function: &str,
        args: Vec<serde_json::Value>,
    ) -> Result<Option<String>, ScrapeError> {
        let obj = self
            .0
            .call_js_fn(function, args, false)
            .map_err(|err| ScrapeError::Element(err.to_string()))?;

        Ok(obj
            .value
            .and_then(|value| value.as_str().map(str::to_string)))
    }
}

impl Element for ChromeElement<'_> {
    fn attribute(&self, name: &str) -> Result<Option<String>, ScrapeError> {
        self.read_string(
            "function(name) { return this.getAttribute(name); }",
            vec![serde_json::json!(name)],
        )
    }

    fn inner_text(&self) -> Result<String, ScrapeError> {
        self.read_string("function() { return this.innerText; }", vec![])
            .map(Option::unwrap_or_default)
    }

    fn bounding_box(&self) -> Result<Option<BoundingBox>, ScrapeError> {
        let model = self
            .0
            .get_box_model()
            .map_err(|err| ScrapeError::Element(err.to_string()))?;

        Ok(Some(BoundingBox {
            width: model.width,
            height: model.height,
        }))
    }
}
