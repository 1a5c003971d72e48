//! Rage-click detection: a tight spatiotemporal cluster of repeated clicks
//! signaling user frustration.
//!
//! Both types here are timestamp-driven state machines with no internal
//! clock, so tests feed them synthetic time.

use pulse_core::config::{CLICK_THROTTLE_MS, RAGE_MIN_CLICKS, RAGE_RADIUS_PX, RAGE_WINDOW_MS};

/// Rate-limits the raw click stream to at most one admitted click per
/// throttle interval. Runs ahead of the detector.
#[derive(Default)]
pub struct ClickThrottle {
    last_admitted_ms: Option<u64>,
}

impl ClickThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a click at `now_ms` passes the throttle.
    pub fn admit(&mut self, now_ms: u64) -> bool {
        match self.last_admitted_ms {
            Some(last) if now_ms.saturating_sub(last) < CLICK_THROTTLE_MS => false,
            _ => {
                self.last_admitted_ms = Some(now_ms);
                true
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct ClickSample {
    x: f64,
    y: f64,
    at_ms: u64,
}

/// One emitted detection: the cluster anchor, how many clicks landed in it,
/// and when it fired.
#[derive(Clone, Debug, PartialEq)]
pub struct RageDetection {
    pub x: f64,
    pub y: f64,
    pub count: usize,
    pub at_ms: u64,
}

/// Sliding time/spatial window clustering over admitted clicks.
///
/// The anchor is the oldest sample in the already-pruned window, not the
/// first click ever. Detection is non-retroactive: clicks consumed by an
/// emitted detection are discarded, so the next cluster starts from empty.
#[derive(Default)]
pub struct RageClickDetector {
    window: Vec<ClickSample>,
}

impl RageClickDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one admitted click. Returns a detection if this click completes
    /// a cluster.
    pub fn observe(&mut self, x: f64, y: f64, now_ms: u64) -> Option<RageDetection> {
        self.window.push(ClickSample { x, y, at_ms: now_ms });
        self.window
            .retain(|s| now_ms.saturating_sub(s.at_ms) <= RAGE_WINDOW_MS);

        if self.window.len() < RAGE_MIN_CLICKS {
            return None;
        }

        let anchor = self.window[0];
        let clustered = self.window.iter().all(|s| {
            let dx = s.x - anchor.x;
            let dy = s.y - anchor.y;
            (dx * dx + dy * dy).sqrt() <= RAGE_RADIUS_PX
        });
        if !clustered {
            return None;
        }

        let detection = RageDetection {
            x: anchor.x,
            y: anchor.y,
            count: self.window.len(),
            at_ms: now_ms,
        };
        self.window.clear();
        Some(detection)
    }
}
