use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::data_models::MarkerSnapshot;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("no element matches selector {0:?}")]
    NotFound(String),

    #[error("element is no longer attached to the document")]
    Detached,

    #[error("timed out after {}ms waiting for {what}", .after.as_millis())]
    Timeout { what: String, after: Duration },

    #[error("browser error: {0}")]
    Browser(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DriverError {
    pub fn browser(err: impl std::fmt::Display) -> DriverError {
        DriverError::Browser(err.to_string())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, DriverError::Timeout { .. })
    }
}

pub type DriverResult<T> = Result<T, DriverError>;

/// The slice of a browser page the marker search needs.
///
/// One driver owns one page and is used strictly sequentially. Element
/// handles are only valid until the next action that may re-render the map.
#[async_trait]
pub trait MapDriver: Send + Sync {
    type Element: Send + Sync;

    async fn goto(&self, url: &str) -> DriverResult<()>;

    async fn wait_for_network_idle(&self, timeout: Duration) -> DriverResult<()>;

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> DriverResult<()>;

    async fn query_all(&self, selector: &str) -> DriverResult<Vec<Self::Element>>;

    async fn query_one(&self, selector: &str) -> DriverResult<Option<Self::Element>>;

    async fn attribute(&self, element: &Self::Element, name: &str) -> DriverResult<Option<String>>;

    async fn scroll_into_view(&self, element: &Self::Element) -> DriverResult<()>;

    async fn click(&self, element: &Self::Element) -> DriverResult<()>;

    /// Click the element itself even if something else is drawn on top of it.
    async fn force_click(&self, element: &Self::Element) -> DriverResult<()>;

    async fn inner_html(&self, element: &Self::Element) -> DriverResult<String>;

    async fn outer_html(&self, element: &Self::Element) -> DriverResult<String>;

    async fn screenshot_full_page(&self, path: &Path) -> DriverResult<()>;

    /// Releases the page and the browser behind it.
    async fn close(&mut self) -> DriverResult<()>;

    async fn marker_snapshot(&self, selector: &str) -> DriverResult<MarkerSnapshot> {
        let elements = self.query_all(selector).await?;
        let mut markup = Vec::with_capacity(elements.len());
        for element in &elements {
            markup.push(self.outer_html(element).await?);
        }
        Ok(MarkerSnapshot::new(markup))
    }
}
