use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub static CONFIG: Lazy<FinderConfig> = Lazy::new(|| {
    dotenv().ok(); // Load .env file if present
    FinderConfig::from_env()
});

pub const DEFAULT_BASE_URL: &str = "https://gritbinfinder-476im3hk7-jonny-muirs-projects.vercel.app";

/// Knobs for the marker/popup search loop. Selectors and class names
/// default to the ones Leaflet and Leaflet.markercluster render.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub marker_selector: String,
    pub cluster_class: String,
    pub popup_selector: String,
    pub popup_close_selector: String,
    /// Maximum number of scanning passes before giving up.
    pub max_attempts: usize,
    pub popup_timeout: Duration,
    pub mutation_timeout: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            marker_selector: ".leaflet-marker-icon".to_string(),
            cluster_class: "marker-cluster".to_string(),
            popup_selector: ".leaflet-popup-content".to_string(),
            popup_close_selector: ".leaflet-popup-close-button".to_string(),
            max_attempts: 10,
            popup_timeout: Duration::from_millis(2000),
            mutation_timeout: Duration::from_millis(3000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FinderConfig {
    pub base_url: String,
    pub target_text: String,
    pub search: SearchConfig,
    /// Bound on navigation, network idle and the first marker appearing.
    pub page_load_timeout: Duration,
    /// Bound on one lookup once the browser is up: page load, search and screenshot.
    pub overall_timeout: Duration,
    pub screenshot_dir: PathBuf,
    pub headless: bool,
    pub chrome_path: Option<PathBuf>,
    pub max_sessions: usize,
    pub addr: String,
}

impl Default for FinderConfig {
    fn default() -> Self {
        FinderConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            target_text: "Grit Bin".to_string(),
            search: SearchConfig::default(),
            page_load_timeout: Duration::from_millis(30_000),
            overall_timeout: Duration::from_millis(120_000),
            screenshot_dir: PathBuf::from("."),
            headless: true,
            chrome_path: None,
            max_sessions: 2,
            addr: "0.0.0.0:8080".to_string(),
        }
    }
}

impl FinderConfig {
    pub fn from_env() -> Self {
        let defaults = FinderConfig::default();
        let search_defaults = defaults.search;

        FinderConfig {
            base_url: get_env_or_default("GRITBIN_BASE_URL", &defaults.base_url),
            target_text: get_env_or_default("GRITBIN_TARGET_TEXT", &defaults.target_text),
            search: SearchConfig {
                marker_selector: get_env_or_default(
                    "GRITBIN_MARKER_SELECTOR",
                    &search_defaults.marker_selector,
                ),
                cluster_class: get_env_or_default(
                    "GRITBIN_CLUSTER_CLASS",
                    &search_defaults.cluster_class,
                ),
                popup_selector: get_env_or_default(
                    "GRITBIN_POPUP_SELECTOR",
                    &search_defaults.popup_selector,
                ),
                popup_close_selector: get_env_or_default(
                    "GRITBIN_POPUP_CLOSE_SELECTOR",
                    &search_defaults.popup_close_selector,
                ),
                max_attempts: get_env_parsed("GRITBIN_MAX_ATTEMPTS", search_defaults.max_attempts),
                popup_timeout: get_env_millis(
                    "GRITBIN_POPUP_TIMEOUT_MS",
                    search_defaults.popup_timeout,
                ),
                mutation_timeout: get_env_millis(
                    "GRITBIN_MUTATION_TIMEOUT_MS",
                    search_defaults.mutation_timeout,
                ),
            },
            page_load_timeout: get_env_millis(
                "GRITBIN_PAGE_LOAD_TIMEOUT_MS",
                defaults.page_load_timeout,
            ),
            overall_timeout: get_env_millis("GRITBIN_OVERALL_TIMEOUT_MS", defaults.overall_timeout),
            screenshot_dir: env::var("GRITBIN_SCREENSHOT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.screenshot_dir),
            headless: get_env_parsed("GRITBIN_HEADLESS", defaults.headless),
            chrome_path: env::var("GRITBIN_CHROME_PATH").ok().map(PathBuf::from),
            max_sessions: get_env_parsed("GRITBIN_MAX_SESSIONS", defaults.max_sessions).max(1),
            addr: get_env_or_default("GRITBIN_ADDR", &defaults.addr),
        }
    }
}

fn get_env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn get_env_parsed<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("ignoring invalid value for {key}: {raw:?}");
            default
        }),
        Err(_) => default,
    }
}

fn get_env_millis(key: &str, default: Duration) -> Duration {
    Duration::from_millis(get_env_parsed(key, default.as_millis() as u64))
}
