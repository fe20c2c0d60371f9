#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use gritbin::config::{FinderConfig, SearchConfig};
use gritbin::data_models::MarkerSnapshot;
use gritbin::driver::{DriverError, DriverResult, MapDriver};

pub const MARKER: &str = ".leaflet-marker-icon";
pub const POPUP: &str = ".leaflet-popup-content";
pub const POPUP_CLOSE: &str = ".leaflet-popup-close-button";

#[derive(Debug, Clone)]
pub struct FakeMarker {
    pub class: Option<String>,
    pub popup: Option<String>,
}

/// An individual pin whose popup renders `html`.
pub fn pin(html: &str) -> FakeMarker {
    FakeMarker {
        class: Some("leaflet-marker-icon leaflet-interactive".to_string()),
        popup: Some(html.to_string()),
    }
}

/// An individual pin that never opens a popup.
pub fn silent_pin() -> FakeMarker {
    FakeMarker {
        class: Some("leaflet-marker-icon".to_string()),
        popup: None,
    }
}

pub fn cluster() -> FakeMarker {
    FakeMarker {
        class: Some("leaflet-marker-icon marker-cluster marker-cluster-small".to_string()),
        popup: None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FakeElement {
    Marker { level: usize, idx: usize },
    Popup,
    CloseButton,
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub levels: Vec<Vec<FakeMarker>>,
    pub level: usize,
    pub open_popup: Option<String>,
    pub has_close_button: bool,
    pub markers_never_load: bool,
    pub fail_screenshots: bool,
    /// Remaining marker queries that fail before the layer answers again.
    pub failing_queries: usize,
    /// Remaining scroll-into-view calls that report a detached element.
    pub detaching_scrolls: usize,
    /// Remaining marker snapshots that fail mid re-render.
    pub failing_snapshots: usize,
    pub visited: Vec<String>,
    pub cluster_clicks: usize,
    pub popup_clicks: usize,
    pub popups_closed: usize,
    pub screenshots: Vec<PathBuf>,
    pub closed: bool,
}

/// A clustered map held in memory. Each entry of `levels` is the marker
/// layer at one zoom level; clicking a cluster moves to the next level, and
/// clicking a cluster on the last level leaves the layer untouched. Clones
/// share state, so a test can keep one while the code under test owns another.
#[derive(Clone)]
pub struct FakeMap {
    pub state: Arc<Mutex<FakeState>>,
}

impl FakeMap {
    pub fn new(levels: Vec<Vec<FakeMarker>>) -> FakeMap {
        FakeMap {
            state: Arc::new(Mutex::new(FakeState {
                levels,
                has_close_button: true,
                ..Default::default()
            })),
        }
    }

    pub fn without_close_button(self) -> FakeMap {
        self.state.lock().unwrap().has_close_button = false;
        self
    }

    pub fn with_markers_never_loading(self) -> FakeMap {
        self.state.lock().unwrap().markers_never_load = true;
        self
    }

    pub fn with_failing_screenshots(self) -> FakeMap {
        self.state.lock().unwrap().fail_screenshots = true;
        self
    }

    pub fn with_failing_queries(self, count: usize) -> FakeMap {
        self.state.lock().unwrap().failing_queries = count;
        self
    }

    pub fn with_detaching_scrolls(self, count: usize) -> FakeMap {
        self.state.lock().unwrap().detaching_scrolls = count;
        self
    }

    pub fn fail_snapshots(&self, count: usize) {
        self.state.lock().unwrap().failing_snapshots = count;
    }

    pub fn failing_snapshots(&self) -> usize {
        self.state.lock().unwrap().failing_snapshots
    }

    pub fn cluster_clicks(&self) -> usize {
        self.state.lock().unwrap().cluster_clicks
    }

    pub fn popup_clicks(&self) -> usize {
        self.state.lock().unwrap().popup_clicks
    }

    pub fn popups_closed(&self) -> usize {
        self.state.lock().unwrap().popups_closed
    }

    pub fn screenshots(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().screenshots.clone()
    }

    pub fn visited(&self) -> Vec<String> {
        self.state.lock().unwrap().visited.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    fn marker<'a>(state: &'a FakeState, element: &FakeElement) -> DriverResult<&'a FakeMarker> {
        match element {
            FakeElement::Marker { level, idx } if *level == state.level => {
                state.levels[*level].get(*idx).ok_or(DriverError::Detached)
            }
            _ => Err(DriverError::Detached),
        }
    }
}

#[async_trait]
impl MapDriver for FakeMap {
    type Element = FakeElement;

    async fn goto(&self, url: &str) -> DriverResult<()> {
        self.state.lock().unwrap().visited.push(url.to_string());
        Ok(())
    }

    async fn wait_for_network_idle(&self, _timeout: Duration) -> DriverResult<()> {
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> DriverResult<()> {
        let present = {
            let state = self.state.lock().unwrap();
            match selector {
                MARKER => {
                    !state.markers_never_load
                        && state.levels.get(state.level).is_some_and(|l| !l.is_empty())
                }
                POPUP => state.open_popup.is_some(),
                _ => false,
            }
        };
        if present {
            Ok(())
        } else {
            tokio::time::sleep(timeout).await;
            Err(DriverError::Timeout {
                what: selector.to_string(),
                after: timeout,
            })
        }
    }

    async fn query_all(&self, selector: &str) -> DriverResult<Vec<FakeElement>> {
        let mut state = self.state.lock().unwrap();
        match selector {
            MARKER if state.failing_queries > 0 => {
                state.failing_queries -= 1;
                Err(DriverError::Browser("marker query failed".to_string()))
            }
            MARKER => {
                let count = state.levels.get(state.level).map_or(0, Vec::len);
                Ok((0..count)
                    .map(|idx| FakeElement::Marker {
                        level: state.level,
                        idx,
                    })
                    .collect())
            }
            POPUP if state.open_popup.is_some() => Ok(vec![FakeElement::Popup]),
            POPUP_CLOSE if state.open_popup.is_some() && state.has_close_button => {
                Ok(vec![FakeElement::CloseButton])
            }
            _ => Ok(Vec::new()),
        }
    }

    async fn query_one(&self, selector: &str) -> DriverResult<Option<FakeElement>> {
        Ok(self.query_all(selector).await?.into_iter().next())
    }

    async fn attribute(&self, element: &FakeElement, name: &str) -> DriverResult<Option<String>> {
        let state = self.state.lock().unwrap();
        let marker = Self::marker(&state, element)?;
        Ok(if name == "class" {
            marker.class.clone()
        } else {
            None
        })
    }

    async fn scroll_into_view(&self, element: &FakeElement) -> DriverResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.detaching_scrolls > 0 {
            state.detaching_scrolls -= 1;
            return Err(DriverError::Detached);
        }
        match element {
            FakeElement::Marker { .. } => Self::marker(&state, element).map(|_| ()),
            _ => Ok(()),
        }
    }

    async fn click(&self, element: &FakeElement) -> DriverResult<()> {
        if let FakeElement::Marker { .. } = element {
            return self.force_click(element).await;
        }
        let mut state = self.state.lock().unwrap();
        match element {
            FakeElement::CloseButton if state.open_popup.is_some() => {
                state.open_popup = None;
                state.popups_closed += 1;
                Ok(())
            }
            _ => Err(DriverError::Detached),
        }
    }

    async fn force_click(&self, element: &FakeElement) -> DriverResult<()> {
        let mut state = self.state.lock().unwrap();
        let marker = Self::marker(&state, element)?.clone();
        let is_cluster = marker
            .class
            .as_deref()
            .is_some_and(|c| c.contains("marker-cluster"));

        if is_cluster {
            state.cluster_clicks += 1;
            state.open_popup = None;
            if state.level + 1 < state.levels.len() {
                state.level += 1;
            }
        } else {
            state.popup_clicks += 1;
            state.open_popup = marker.popup;
        }
        Ok(())
    }

    async fn inner_html(&self, element: &FakeElement) -> DriverResult<String> {
        let state = self.state.lock().unwrap();
        match element {
            FakeElement::Popup => state.open_popup.clone().ok_or(DriverError::Detached),
            _ => Err(DriverError::NotFound("inner html".to_string())),
        }
    }

    async fn outer_html(&self, element: &FakeElement) -> DriverResult<String> {
        let state = self.state.lock().unwrap();
        let marker = Self::marker(&state, element)?;
        let FakeElement::Marker { level, idx } = element else {
            return Err(DriverError::Detached);
        };
        Ok(format!(
            "<div class=\"{}\" data-level=\"{level}\" data-idx=\"{idx}\"></div>",
            marker.class.as_deref().unwrap_or_default()
        ))
    }

    async fn screenshot_full_page(&self, path: &Path) -> DriverResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_screenshots {
            return Err(DriverError::Browser("screenshot failed".to_string()));
        }
        state.screenshots.push(path.to_path_buf());
        Ok(())
    }

    async fn marker_snapshot(&self, selector: &str) -> DriverResult<MarkerSnapshot> {
        {
            let mut state = self.state.lock().unwrap();
            if state.failing_snapshots > 0 {
                state.failing_snapshots -= 1;
                return Err(DriverError::Browser("layer is re-rendering".to_string()));
            }
        }
        let elements = self.query_all(selector).await?;
        let mut markup = Vec::with_capacity(elements.len());
        for element in &elements {
            markup.push(self.outer_html(element).await?);
        }
        Ok(MarkerSnapshot::new(markup))
    }

    async fn close(&mut self) -> DriverResult<()> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}

pub fn search_config() -> SearchConfig {
    SearchConfig::default()
}

pub fn finder_config() -> FinderConfig {
    FinderConfig {
        base_url: "https://maps.example.test/".to_string(),
        screenshot_dir: PathBuf::from("/tmp/gritbin-tests"),
        ..FinderConfig::default()
    }
}
