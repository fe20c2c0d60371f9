use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::element::Element;
use chromiumoxide::handler::Handler;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::FinderConfig;
use crate::data_models::MarkerSnapshot;
use crate::driver::{DriverError, DriverResult, MapDriver};

const POLL_START: Duration = Duration::from_millis(100);
const POLL_CAP: Duration = Duration::from_secs(1);
/// How long the resource count must hold still before the network counts as idle.
const NETWORK_QUIET: Duration = Duration::from_millis(500);

// Leaflet listens for click on the icon element itself, so dispatching there
// reaches the marker even when a neighbouring cluster icon overlaps it.
const FORCE_CLICK_JS: &str = "function() {
    for (const type of ['mousedown', 'mouseup', 'click']) {
        this.dispatchEvent(new MouseEvent(type, { bubbles: true, cancelable: true, view: window, buttons: 1 }));
    }
}";

// The resource timing buffer stops recording at 250 entries by default, which
// would freeze the count on busy pages. Navigation resets it, so it is raised
// on every poll.
const LOAD_STATE_JS: &str = "(() => {
    performance.setResourceTimingBufferSize(100000);
    return { ready: document.readyState, resources: performance.getEntriesByType('resource').length };
})()";

#[derive(Debug, Deserialize)]
struct LoadState {
    ready: String,
    resources: usize,
}

/// A headless Chromium with a single page, driven over CDP.
pub struct ChromeDriver {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
}

impl ChromeDriver {
    pub async fn launch(config: &FinderConfig) -> DriverResult<ChromeDriver> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(1280, 900)
            .arg("--disable-gpu")
            .arg("--no-first-run");
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &config.chrome_path {
            builder = builder.chrome_executable(path);
        }
        let browser_config = builder.build().map_err(DriverError::Browser)?;

        let (browser, handler) = Browser::launch(browser_config)
            .await
            .map_err(DriverError::browser)?;
        let handler_task = tokio::spawn(handler_loop(handler));

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler_task.abort();
                return Err(DriverError::browser(e));
            }
        };
        log::info!("launched chromium (headless: {})", config.headless);

        Ok(ChromeDriver {
            browser,
            page,
            handler_task,
        })
    }

    async fn load_state(&self) -> DriverResult<LoadState> {
        self.page
            .evaluate(LOAD_STATE_JS)
            .await
            .map_err(DriverError::browser)?
            .into_value::<LoadState>()
            .map_err(DriverError::browser)
    }
}

async fn handler_loop(mut handler: Handler) {
    while let Some(event) = handler.next().await {
        if let Err(e) = event {
            log::debug!("browser handler stopped: {e}");
            break;
        }
    }
}

fn timeout_error(what: impl Into<String>, after: Duration) -> DriverError {
    DriverError::Timeout {
        what: what.into(),
        after,
    }
}

#[async_trait]
impl MapDriver for ChromeDriver {
    type Element = Element;

    async fn goto(&self, url: &str) -> DriverResult<()> {
        log::info!("navigating to {url}");
        self.page.goto(url).await.map_err(DriverError::browser)?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(DriverError::browser)?;
        Ok(())
    }

    async fn wait_for_network_idle(&self, timeout: Duration) -> DriverResult<()> {
        let deadline = Instant::now() + timeout;
        let mut last_count: Option<usize> = None;
        let mut quiet_since = Instant::now();

        loop {
            let state = self.load_state().await?;
            let now = Instant::now();
            if state.ready != "complete" || last_count != Some(state.resources) {
                last_count = Some(state.resources);
                quiet_since = now;
            } else if now.duration_since(quiet_since) >= NETWORK_QUIET {
                return Ok(());
            }

            if now >= deadline {
                return Err(timeout_error("network idle", timeout));
            }
            tokio::time::sleep(POLL_START.min(deadline - now)).await;
        }
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> DriverResult<()> {
        let deadline = Instant::now() + timeout;
        let mut poll_interval = POLL_START;

        loop {
            if let Ok(found) = self.page.find_elements(selector).await {
                if !found.is_empty() {
                    return Ok(());
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(timeout_error(format!("selector {selector:?}"), timeout));
            }
            tokio::time::sleep(poll_interval.min(deadline - now)).await;
            poll_interval = (poll_interval * 2).min(POLL_CAP);
        }
    }

    async fn query_all(&self, selector: &str) -> DriverResult<Vec<Element>> {
        self.page
            .find_elements(selector)
            .await
            .map_err(DriverError::browser)
    }

    async fn query_one(&self, selector: &str) -> DriverResult<Option<Element>> {
        Ok(self.query_all(selector).await?.into_iter().next())
    }

    async fn attribute(&self, element: &Element, name: &str) -> DriverResult<Option<String>> {
        element.attribute(name).await.map_err(DriverError::browser)
    }

    async fn scroll_into_view(&self, element: &Element) -> DriverResult<()> {
        element
            .scroll_into_view()
            .await
            .map_err(DriverError::browser)?;
        Ok(())
    }

    async fn click(&self, element: &Element) -> DriverResult<()> {
        element.click().await.map_err(DriverError::browser)?;
        Ok(())
    }

    async fn force_click(&self, element: &Element) -> DriverResult<()> {
        element
            .call_js_fn(FORCE_CLICK_JS, false)
            .await
            .map_err(DriverError::browser)?;
        Ok(())
    }

    async fn inner_html(&self, element: &Element) -> DriverResult<String> {
        element
            .inner_html()
            .await
            .map_err(DriverError::browser)?
            .ok_or(DriverError::Detached)
    }

    async fn outer_html(&self, element: &Element) -> DriverResult<String> {
        element
            .outer_html()
            .await
            .map_err(DriverError::browser)?
            .ok_or(DriverError::Detached)
    }

    async fn screenshot_full_page(&self, path: &Path) -> DriverResult<()> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();
        self.page
            .save_screenshot(params, path)
            .await
            .map_err(DriverError::browser)?;
        Ok(())
    }

    async fn close(&mut self) -> DriverResult<()> {
        let closed = self.browser.close().await.map_err(DriverError::browser);
        if closed.is_ok() {
            self.browser.wait().await?;
        }
        self.handler_task.abort();
        log::info!("browser closed");
        closed.map(|_| ())
    }

    async fn marker_snapshot(&self, selector: &str) -> DriverResult<MarkerSnapshot> {
        let selector_json = serde_json::to_string(selector).map_err(DriverError::browser)?;
        let js = format!(
            "Array.from(document.querySelectorAll({selector_json})).map(n => n.outerHTML)"
        );
        let markup = self
            .page
            .evaluate(js)
            .await
            .map_err(DriverError::browser)?
            .into_value::<Vec<String>>()
            .map_err(DriverError::browser)?;
        Ok(MarkerSnapshot::new(markup))
    }
}
