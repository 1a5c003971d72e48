//! The shared adapter pattern: each domain event maps deterministically to
//! queued operations plus an optional intent grant.
//!
//! Mapping is a pure function of (event, page context, time), so every
//! adapter is testable without a live event loop. All adapters are inert
//! under do-not-track except error capture, which stays on so operational
//! failures remain observable.

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

use pulse_core::config::{POINTS_ADD_TO_CART, POINTS_MODAL_OPEN, POINTS_PAGE_VIEW};
use pulse_core::events::{DomainEvent, FunnelStage, NewsletterStage};
use pulse_core::ids::{SessionToken, VisitorId};
use pulse_core::ops::Operation;
use pulse_core::paths;

/// Immutable per-page facts threaded through every adapter call.
#[derive(Clone, Debug)]
pub struct PageContext {
    pub visitor: VisitorId,
    pub session: SessionToken,
    pub slug: String,
    pub do_not_track: bool,
}

/// What one event turns into.
#[derive(Debug, Default, PartialEq)]
pub struct AdapterOutput {
    pub operations: Vec<Operation>,
    pub intent_points: u32,
}

impl AdapterOutput {
    fn op(operation: Operation) -> Self {
        Self {
            operations: vec![operation],
            intent_points: 0,
        }
    }

    fn with_points(mut self, points: u32) -> Self {
        self.intent_points = points;
        self
    }
}

/// Map one domain event to its operations.
///
/// Click and Scroll events are not handled here: they pass through the
/// throttle/rage and debounce state machines first, which need mutable
/// state this pure layer does not hold.
pub fn map_event(event: &DomainEvent, ctx: &PageContext, now: DateTime<Utc>) -> AdapterOutput {
    let date = paths::date_key(now);

    // Error capture is exempt from the do-not-track gate.
    if let DomainEvent::PageError {
        message,
        source,
        line,
    } = event
    {
        let mut payload = json!({
            "message": message,
            "page": ctx.slug,
            "timestamp": now.timestamp_millis(),
        });
        if let Some(source) = source {
            payload["source"] = json!(source);
        }
        if let Some(line) = line {
            payload["line"] = json!(line);
        }
        return AdapterOutput::op(Operation::append(paths::errors(&date), payload));
    }

    if ctx.do_not_track {
        return AdapterOutput::default();
    }

    match event {
        DomainEvent::PageView => {
            AdapterOutput::op(Operation::increment(paths::page_views(&date, &ctx.slug)))
                .with_points(POINTS_PAGE_VIEW)
        }

        DomainEvent::ProductView { handle } => AdapterOutput::op(Operation::increment(
            paths::product_view_counts(&date, handle),
        )),

        DomainEvent::Funnel { stage, handle } => {
            let output = AdapterOutput::op(Operation::increment(paths::funnel(
                &date,
                stage.as_str(),
                handle,
            )));
            if *stage == FunnelStage::ModalOpen {
                output.with_points(POINTS_MODAL_OPEN)
            } else {
                output
            }
        }

        DomainEvent::Newsletter { stage, details } => {
            let mut operations = vec![Operation::increment(paths::newsletter(
                &date,
                stage.as_str(),
            ))];
            if *stage == NewsletterStage::Dismiss {
                if let Some(details) = details {
                    operations.push(Operation::append(
                        paths::newsletter_dismiss_details(&date),
                        json!({
                            "details": details,
                            "timestamp": now.timestamp_millis(),
                        }),
                    ));
                }
            }
            AdapterOutput {
                operations,
                intent_points: 0,
            }
        }

        DomainEvent::Cart {
            action,
            handle,
            quantity,
        } => {
            let output = AdapterOutput::op(Operation::append(
                paths::cart(&date),
                json!({
                    "action": action,
                    "handle": handle,
                    "quantity": quantity,
                    "visitorId": ctx.visitor.as_str(),
                    "timestamp": now.timestamp_millis(),
                }),
            ));
            if action == "add" {
                output.with_points(POINTS_ADD_TO_CART)
            } else {
                output
            }
        }

        DomainEvent::Performance { metric, value } => AdapterOutput::op(Operation::append(
            paths::performance(&date, &ctx.slug),
            json!({
                "metric": metric,
                "value": value,
                "timestamp": now.timestamp_millis(),
            }),
        )),

        DomainEvent::Custom { name, data } => {
            AdapterOutput::op(track_operation(name, data.clone(), ctx, now))
        }

        // Handled by the stateful detectors in the collector.
        DomainEvent::Click { .. } | DomainEvent::Scroll { .. } => AdapterOutput::default(),

        DomainEvent::PageError { .. } => unreachable!("handled above the gate"),
    }
}

/// Build the append for a caller-defined `track` event: caller data merged
/// with identity, session, page, and timestamp.
pub fn track_operation(
    name: &str,
    mut data: Map<String, Value>,
    ctx: &PageContext,
    now: DateTime<Utc>,
) -> Operation {
    let date = paths::date_key(now);
    data.insert("visitorId".into(), json!(ctx.visitor.as_str()));
    data.insert("sessionId".into(), json!(ctx.session.as_str()));
    data.insert("page".into(), json!(ctx.slug));
    data.insert("timestamp".into(), json!(now.timestamp_millis()));
    Operation::append(paths::events(&date, name), Value::Object(data))
}
