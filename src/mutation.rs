use std::time::Duration;
use tokio::time::Instant;

use crate::data_models::MarkerSnapshot;
use crate::driver::MapDriver;

const INITIAL_POLL_INTERVAL: Duration = Duration::from_millis(100);
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Polls the marker layer until its serialized form diverges from `before`.
///
/// Returns `true` once a change is seen and `false` when `timeout` runs out.
/// Snapshot failures while polling (the layer is often mid re-render) count
/// as "not changed yet".
pub async fn wait_for_marker_change<D>(
    driver: &D,
    selector: &str,
    before: &MarkerSnapshot,
    timeout: Duration,
) -> bool
where
    D: MapDriver + ?Sized,
{
    let deadline = Instant::now() + timeout;
    let mut poll_interval = INITIAL_POLL_INTERVAL;

    loop {
        match driver.marker_snapshot(selector).await {
            Ok(current) if current.diverges_from(before) => return true,
            Ok(_) => {}
            Err(e) => log::debug!("marker snapshot failed while waiting for change: {e}"),
        }

        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        tokio::time::sleep(poll_interval.min(deadline - now)).await;
        poll_interval = (poll_interval * 2).min(MAX_POLL_INTERVAL);
    }
}
