//! Debounced scroll-depth tracking.
//!
//! Scroll samples arrive at browser-event rate; only the last sample before
//! a quiet period counts (trailing-edge debounce). Each threshold fires at
//! most once per page load and never un-fires, so oscillating around a
//! threshold cannot re-report it.

use pulse_core::config::{SCROLL_DEBOUNCE_MS, SCROLL_INTENT_THRESHOLD, SCROLL_THRESHOLDS};

#[derive(Clone, Copy, Debug, PartialEq)]
struct ScrollSample {
    scroll_top: f64,
    document_height: f64,
    viewport_height: f64,
    at_ms: u64,
}

/// Result of a settled scroll sample.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScrollOutcome {
    /// Thresholds newly crossed by this sample, ascending.
    pub fired: Vec<u8>,
    /// Whether any newly-fired threshold grants intent points.
    pub deep: bool,
}

#[derive(Default)]
pub struct ScrollTracker {
    pending: Option<ScrollSample>,
    fired: Vec<u8>,
}

impl ScrollTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a raw scroll sample. Later samples replace earlier ones until
    /// the stream goes quiet.
    pub fn observe(
        &mut self,
        scroll_top: f64,
        document_height: f64,
        viewport_height: f64,
        now_ms: u64,
    ) {
        self.pending = Some(ScrollSample {
            scroll_top,
            document_height,
            viewport_height,
            at_ms: now_ms,
        });
    }

    /// Trailing-edge settle: if the pending sample has been quiet for the
    /// debounce interval, evaluate it against the unfired thresholds.
    pub fn settle(&mut self, now_ms: u64) -> Option<ScrollOutcome> {
        let sample = self.pending?;
        if now_ms.saturating_sub(sample.at_ms) < SCROLL_DEBOUNCE_MS {
            return None;
        }
        self.pending = None;

        let scrollable = sample.document_height - sample.viewport_height;
        if scrollable <= 0.0 {
            // No scrollable area on this page.
            return None;
        }
        let percent = (sample.scroll_top / scrollable * 100.0).round();

        let mut outcome = ScrollOutcome::default();
        for &threshold in SCROLL_THRESHOLDS.iter() {
            if percent >= f64::from(threshold) && !self.fired.contains(&threshold) {
                self.fired.push(threshold);
                if threshold >= SCROLL_INTENT_THRESHOLD {
                    outcome.deep = true;
                }
                outcome.fired.push(threshold);
            }
        }
        Some(outcome)
    }
}
