use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::chrome::ChromeDriver;
use crate::config::FinderConfig;
use crate::data_models::{PostcodeInput, SearchOutcome, ToolResponse};
use crate::driver::{DriverError, MapDriver};
use crate::links::extract_links;
use crate::matcher::{ContainsText, PopupMatcher};
use crate::search::SearchController;

pub const TOOL_NAME: &str = "view_gritbins_on_map";
pub const TOOL_DESCRIPTION: &str = "Visits the grit bin finder page, runs JavaScript, and extracts info from the nearest grit bin pin. \
Returns the popup HTML and extracted links.";

/// Failures that end an invocation before the marker search can run.
#[derive(Debug, Error)]
pub enum FinderError {
    #[error("failed to launch browser: {0}")]
    Launch(#[source] DriverError),

    #[error("failed to load {url}: {source}")]
    Navigation { url: String, source: DriverError },

    #[error("map markers never appeared: {0}")]
    MarkersNotFound(#[source] DriverError),

    #[error("gave up after {}ms", .0.as_millis())]
    TimedOut(std::time::Duration),

    #[error("browser session pool closed")]
    Unavailable,
}

pub fn build_target_url(base_url: &str, postcode: &str) -> String {
    format!(
        "{}/?postcode={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(postcode)
    )
}

/// The tool surface the invoking layer calls.
#[async_trait]
pub trait GritBinTool: Send + Sync {
    async fn view_gritbins_on_map(&self, input: PostcodeInput)
    -> Result<ToolResponse, FinderError>;
}

/// Runs one lookup on an already launched driver: load the map, search it,
/// and turn the outcome into the tool response. Does not close the driver.
pub async fn find_on_map<D: MapDriver>(
    driver: &D,
    config: &FinderConfig,
    matcher: &dyn PopupMatcher,
    postcode: &str,
) -> Result<ToolResponse, FinderError> {
    let url = build_target_url(&config.base_url, postcode);

    let load = async {
        driver.goto(&url).await?;
        driver.wait_for_network_idle(config.page_load_timeout).await
    };
    load.await.map_err(|source| FinderError::Navigation {
        url: url.clone(),
        source,
    })?;
    driver
        .wait_for_selector(&config.search.marker_selector, config.page_load_timeout)
        .await
        .map_err(FinderError::MarkersNotFound)?;

    let report = SearchController::new(driver, &config.search, matcher)
        .run()
        .await;
    log::info!(
        "search for {postcode:?} finished after {} pass(es), {} zoom(s)",
        report.attempts,
        report.zooms
    );

    match report.outcome {
        SearchOutcome::Found(popup) => {
            let links = extract_links(&popup.html);
            Ok(ToolResponse::found(popup.html, links))
        }
        SearchOutcome::NotFound(reason) => {
            log::warn!("no matching popup for {postcode:?} ({reason:?})");
            let path = screenshot_path(config);
            let screenshot = match driver.screenshot_full_page(&path).await {
                Ok(()) => Some(path.display().to_string()),
                Err(e) => {
                    log::warn!("failed to capture debug screenshot: {e}");
                    None
                }
            };
            Ok(ToolResponse::not_found(screenshot))
        }
    }
}

/// Runs [`find_on_map`] under the overall timeout and closes the driver on
/// every exit path.
pub async fn run_and_close<D: MapDriver>(
    mut driver: D,
    config: &FinderConfig,
    matcher: &dyn PopupMatcher,
    postcode: &str,
) -> Result<ToolResponse, FinderError> {
    let result = tokio::time::timeout(
        config.overall_timeout,
        find_on_map(&driver, config, matcher, postcode),
    )
    .await
    .unwrap_or(Err(FinderError::TimedOut(config.overall_timeout)));

    if let Err(e) = driver.close().await {
        log::warn!("failed to close browser cleanly: {e}");
    }
    result
}

fn screenshot_path(config: &FinderConfig) -> PathBuf {
    let file_name = format!(
        "debug_popup_failure_{}.png",
        chrono::Local::now().format("%Y%m%d_%H%M%S%3f")
    );
    config.screenshot_dir.join(file_name)
}

/// Launches a fresh Chromium per lookup. At most `max_sessions` browsers
/// run at once.
pub struct ChromeFinder {
    config: FinderConfig,
    matcher: Arc<dyn PopupMatcher>,
    sessions: Arc<Semaphore>,
}

impl ChromeFinder {
    pub fn new(config: FinderConfig) -> ChromeFinder {
        let matcher = Arc::new(ContainsText::new(config.target_text.clone()));
        Self::with_matcher(config, matcher)
    }

    pub fn with_matcher(config: FinderConfig, matcher: Arc<dyn PopupMatcher>) -> ChromeFinder {
        let sessions = Arc::new(Semaphore::new(config.max_sessions));
        ChromeFinder {
            config,
            matcher,
            sessions,
        }
    }
}

#[async_trait]
impl GritBinTool for ChromeFinder {
    async fn view_gritbins_on_map(
        &self,
        input: PostcodeInput,
    ) -> Result<ToolResponse, FinderError> {
        let _permit = self
            .sessions
            .acquire()
            .await
            .map_err(|_| FinderError::Unavailable)?;

        let driver = ChromeDriver::launch(&self.config)
            .await
            .map_err(FinderError::Launch)?;
        run_and_close(driver, &self.config, self.matcher.as_ref(), &input.postcode).await
    }
}
