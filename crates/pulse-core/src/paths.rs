//! Hierarchical backend key builders.
//!
//! All write paths are rooted under named trees (`pageViews`, `funnel`,
//! `presence`, ...). Segments that originate outside this crate (slugs,
//! handles, event names, experiment names) pass through [`sanitize_segment`]
//! first: hierarchical keys may not contain `.`, `#`, `$`, `[`, `]`, or an
//! embedded `/` within one segment.

use chrono::{DateTime, Utc};

use crate::bucket::Variant;
use crate::ids::{SessionToken, VisitorId};

/// UTC calendar-day key used by every dated tree.
pub fn date_key(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

/// Replace characters that are illegal in a single path segment.
///
/// An empty (or fully-illegal) input becomes `"unknown"` rather than
/// producing a malformed key.
pub fn sanitize_segment(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| match c {
            '.' | '#' | '$' | '[' | ']' | '/' => '_',
            c if c.is_whitespace() => '-',
            c => c,
        })
        .collect();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}

pub fn page_views(date: &str, slug: &str) -> String {
    format!("pageViews/{date}/{}", sanitize_segment(slug))
}

pub fn product_view_counts(date: &str, handle: &str) -> String {
    format!("productViewCounts/{date}/{}", sanitize_segment(handle))
}

pub fn scroll_depth(date: &str, slug: &str, threshold: u8) -> String {
    format!("scrollDepth/{date}/{}/{threshold}", sanitize_segment(slug))
}

pub fn clicks(date: &str, slug: &str) -> String {
    format!("clicks/{date}/{}", sanitize_segment(slug))
}

pub fn rage_clicks(date: &str, slug: &str) -> String {
    format!("rageClicks/{date}/{}", sanitize_segment(slug))
}

pub fn funnel(date: &str, stage: &str, handle: &str) -> String {
    format!(
        "funnel/{date}/{}/{}",
        sanitize_segment(stage),
        sanitize_segment(handle)
    )
}

pub fn newsletter(date: &str, stage: &str) -> String {
    format!("newsletter/{date}/{}", sanitize_segment(stage))
}

pub fn newsletter_dismiss_details(date: &str) -> String {
    format!("newsletter/{date}/dismiss_details")
}

pub fn performance(date: &str, slug: &str) -> String {
    format!("performance/{date}/{}", sanitize_segment(slug))
}

pub fn errors(date: &str) -> String {
    format!("errors/{date}")
}

pub fn cart(date: &str) -> String {
    format!("cart/{date}")
}

pub fn events(date: &str, event_name: &str) -> String {
    format!("events/{date}/{}", sanitize_segment(event_name))
}

pub fn visitor_intent(visitor: &VisitorId) -> String {
    format!("visitors/{}/intent", visitor.as_str())
}

pub fn sessions(date: &str, session: &SessionToken) -> String {
    format!("sessions/{date}/{}", session.as_str())
}

pub fn presence(visitor: &VisitorId) -> String {
    format!("presence/{}", visitor.as_str())
}

pub fn ab_test_views(experiment: &str, variant: Variant) -> String {
    format!(
        "abTests/{}/{}/views",
        sanitize_segment(experiment),
        variant.as_str()
    )
}
