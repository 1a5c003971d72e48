//! Fixed configuration constants.
//!
//! None of these are runtime-configurable; the pipeline's behavior is meant
//! to be identical on every page it runs on.

use std::time::Duration;

/// How often the periodic flush timer fires.
pub const FLUSH_INTERVAL: Duration = Duration::from_millis(30_000);

/// Minimum spacing between two processed clicks.
pub const CLICK_THROTTLE_MS: u64 = 200;

/// Trailing time window for rage-click clustering.
pub const RAGE_WINDOW_MS: u64 = 500;

/// Maximum Euclidean distance from the cluster anchor, in CSS pixels.
pub const RAGE_RADIUS_PX: f64 = 50.0;

/// Minimum clicks in the window before a detection fires.
pub const RAGE_MIN_CLICKS: usize = 3;

/// Trailing-edge debounce applied to the scroll stream.
pub const SCROLL_DEBOUNCE_MS: u64 = 250;

/// Scroll-depth thresholds, in percent. Each fires at most once per page.
pub const SCROLL_THRESHOLDS: [u8; 4] = [25, 50, 75, 100];

/// Scroll depth at or beyond which intent points are granted.
pub const SCROLL_INTENT_THRESHOLD: u8 = 75;

/// Intent score at which a visitor classifies as medium.
pub const INTENT_LOW_THRESHOLD: u32 = 5;

/// Intent score at which a visitor classifies as high.
pub const INTENT_MEDIUM_THRESHOLD: u32 = 10;

/// Intent points granted per event kind.
pub const POINTS_PAGE_VIEW: u32 = 1;
pub const POINTS_MODAL_OPEN: u32 = 3;
pub const POINTS_ADD_TO_CART: u32 = 5;
pub const POINTS_DEEP_SCROLL: u32 = 2;
pub const POINTS_DWELL: u32 = 2;

/// Continuous time on site before the one-per-session dwell grant.
pub const DWELL_GRANT_AFTER: Duration = Duration::from_secs(60);
