use std::time::Duration;
use thiserror::Error;

use crate::classifier::{Partition, classify};
use crate::config::SearchConfig;
use crate::data_models::{
    MarkerElement, NotFoundReason, PopupContent, SearchOutcome, SearchReport,
};
use crate::driver::{DriverError, MapDriver};
use crate::matcher::PopupMatcher;
use crate::mutation::wait_for_marker_change;

/// Why a single step of the search did not produce anything. Every variant
/// is recovered by moving on to the next marker or the next pass.
#[derive(Debug, Error)]
pub enum AttemptFailure {
    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("no popup rendered within {}ms", .0.as_millis())]
    PopupTimeout(Duration),

    #[error("popup selector matched but the popup vanished before it could be read")]
    PopupMissing,

    #[error("no cluster left to zoom into")]
    NoCluster,
}

enum SearchState {
    Scanning,
    Zooming,
}

enum ScanResult {
    Found(PopupContent),
    Exhausted { clusters: usize },
}

/// Walks a clustered marker map looking for the one popup the matcher
/// accepts, zooming into clusters until individual pins show up.
pub struct SearchController<'a, D: MapDriver> {
    driver: &'a D,
    config: &'a SearchConfig,
    matcher: &'a dyn PopupMatcher,
}

impl<'a, D: MapDriver> SearchController<'a, D> {
    pub fn new(
        driver: &'a D,
        config: &'a SearchConfig,
        matcher: &'a dyn PopupMatcher,
    ) -> SearchController<'a, D> {
        SearchController {
            driver,
            config,
            matcher,
        }
    }

    pub async fn run(&self) -> SearchReport {
        let mut attempts = 0usize;
        let mut zooms = 0usize;
        let mut state = SearchState::Scanning;

        while attempts < self.config.max_attempts {
            state = match state {
                SearchState::Scanning => {
                    attempts += 1;
                    match self.scan().await {
                        Ok(ScanResult::Found(popup)) => {
                            log::info!("matching popup found on pass {attempts}");
                            return SearchReport {
                                outcome: SearchOutcome::Found(popup),
                                attempts,
                                zooms,
                            };
                        }
                        Ok(ScanResult::Exhausted { clusters: 0 }) => {
                            log::info!("no matching pin and no clusters left on pass {attempts}");
                            return SearchReport {
                                outcome: SearchOutcome::NotFound(NotFoundReason::NoClusters),
                                attempts,
                                zooms,
                            };
                        }
                        Ok(ScanResult::Exhausted { clusters }) => {
                            log::debug!("pass {attempts}: no match, {clusters} cluster(s) to expand");
                            SearchState::Zooming
                        }
                        Err(e) => {
                            log::warn!("pass {attempts} failed, rescanning: {e}");
                            SearchState::Scanning
                        }
                    }
                }
                SearchState::Zooming => {
                    zooms += 1;
                    match self.zoom().await {
                        Ok(true) => log::debug!("marker layer changed after zoom {zooms}"),
                        Ok(false) => log::warn!(
                            "marker layer unchanged {}ms after zoom {zooms}, rescanning anyway",
                            self.config.mutation_timeout.as_millis()
                        ),
                        Err(e) => log::warn!("zoom {zooms} failed: {e}"),
                    }
                    SearchState::Scanning
                }
            };
        }

        log::info!("giving up after {attempts} pass(es) and {zooms} zoom(s)");
        SearchReport {
            outcome: SearchOutcome::NotFound(NotFoundReason::BudgetExhausted),
            attempts,
            zooms,
        }
    }

    async fn query_markers(&self) -> Result<Partition<D::Element>, AttemptFailure> {
        let handles = self.driver.query_all(&self.config.marker_selector).await?;
        let mut markers = Vec::with_capacity(handles.len());
        for handle in handles {
            // an unreadable class is the same as no class: treat as an individual pin
            let class_name = self.driver.attribute(&handle, "class").await.ok().flatten();
            markers.push(MarkerElement::new(handle, class_name));
        }
        Ok(classify(markers, &self.config.cluster_class))
    }

    async fn scan(&self) -> Result<ScanResult, AttemptFailure> {
        let Partition {
            individuals,
            clusters,
        } = self.query_markers().await?;
        log::debug!(
            "{} individual pin(s), {} cluster(s)",
            individuals.len(),
            clusters.len()
        );

        for (idx, marker) in individuals.iter().enumerate() {
            match self.open_popup_and_check(marker).await {
                Ok(popup) if popup.is_target => return Ok(ScanResult::Found(popup)),
                Ok(_) => log::debug!("pin {idx}: popup is not a match"),
                Err(e) => log::debug!("pin {idx}: {e}"),
            }
        }

        Ok(ScanResult::Exhausted {
            clusters: clusters.len(),
        })
    }

    /// Clicks the first cluster and waits for the marker layer to re-render.
    /// Returns whether a change was observed before the mutation timeout.
    async fn zoom(&self) -> Result<bool, AttemptFailure> {
        let Partition { clusters, .. } = self.query_markers().await?;
        let cluster = clusters.first().ok_or(AttemptFailure::NoCluster)?;

        let before = self
            .driver
            .marker_snapshot(&self.config.marker_selector)
            .await?;

        self.driver.scroll_into_view(&cluster.handle).await?;
        self.driver.force_click(&cluster.handle).await?;

        Ok(wait_for_marker_change(
            self.driver,
            &self.config.marker_selector,
            &before,
            self.config.mutation_timeout,
        )
        .await)
    }

    pub async fn open_popup_and_check(
        &self,
        marker: &MarkerElement<D::Element>,
    ) -> Result<PopupContent, AttemptFailure> {
        self.driver.scroll_into_view(&marker.handle).await?;
        self.driver.force_click(&marker.handle).await?;

        let popup_timeout = self.config.popup_timeout;
        self.driver
            .wait_for_selector(&self.config.popup_selector, popup_timeout)
            .await
            .map_err(|e| match e {
                e if e.is_timeout() => AttemptFailure::PopupTimeout(popup_timeout),
                e => AttemptFailure::Driver(e),
            })?;

        let popup = self
            .driver
            .query_one(&self.config.popup_selector)
            .await?
            .ok_or(AttemptFailure::PopupMissing)?;
        let html = self.driver.inner_html(&popup).await?;

        self.dismiss_popup().await;

        Ok(PopupContent::inspect(html, self.matcher))
    }

    async fn dismiss_popup(&self) {
        match self
            .driver
            .query_one(&self.config.popup_close_selector)
            .await
        {
            Ok(Some(close)) => {
                if let Err(e) = self.driver.click(&close).await {
                    log::debug!("could not close popup: {e}");
                }
            }
            Ok(None) => log::debug!("popup has no close control"),
            Err(e) => log::debug!("could not look up popup close control: {e}"),
        }
    }
}
