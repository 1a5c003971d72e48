//! The collector: one explicit context object owning the queue, identity,
//! detectors, and delivery engine. Constructed once per page life and
//! threaded through every call instead of ambient globals.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use tokio::sync::oneshot;
use tracing::{debug, info};

use pulse_backend::Backend;
use pulse_core::bucket::{bucket, Variant};
use pulse_core::config::{DWELL_GRANT_AFTER, FLUSH_INTERVAL, POINTS_DEEP_SCROLL, POINTS_DWELL};
use pulse_core::events::DomainEvent;
use pulse_core::ops::Operation;
use pulse_core::paths;
use pulse_core::traffic::{self, TrafficSource};
use pulse_store::{IdentityStore, SessionRecord};

use crate::adapters::{self, PageContext};
use crate::delivery::DeliveryEngine;
use crate::intent::IntentEngine;
use crate::queue::OperationQueue;
use crate::rage::{ClickThrottle, RageClickDetector};
use crate::scroll::ScrollTracker;

/// How the page presented itself at load time.
#[derive(Clone, Debug)]
pub struct CollectorConfig {
    /// Full landing URL, query string included.
    pub url: String,
    pub referrer: Option<String>,
    /// Page slug used in dated tree paths.
    pub slug: String,
    pub do_not_track: bool,
}

pub struct Collector {
    backend: Arc<dyn Backend>,
    identity: Arc<IdentityStore>,
    queue: OperationQueue,
    delivery: DeliveryEngine,
    intent: tokio::sync::Mutex<IntentEngine>,
    throttle: Mutex<ClickThrottle>,
    rage: Mutex<RageClickDetector>,
    scroll: Mutex<ScrollTracker>,
    seen_experiments: Mutex<HashSet<String>>,
    ctx: PageContext,
    session: SessionRecord,
    traffic: TrafficSource,
    page_loaded_at: DateTime<Utc>,
}

impl Collector {
    /// Bootstrap identity and session, then assemble the pipeline.
    pub fn new(
        backend: Arc<dyn Backend>,
        identity: Arc<IdentityStore>,
        config: CollectorConfig,
        now: DateTime<Utc>,
    ) -> Self {
        let visitor = identity.resolve_visitor_id();
        let session = identity.resolve_session(now);
        let traffic = traffic::classify(&config.url, config.referrer.as_deref());
        info!(
            visitor = %visitor,
            session = %session.id,
            traffic = traffic.as_str(),
            slug = %config.slug,
            "collector started"
        );

        let ctx = PageContext {
            visitor: visitor.clone(),
            session: session.id.clone(),
            slug: config.slug,
            do_not_track: config.do_not_track,
        };
        let intent = IntentEngine::new(identity.clone(), backend.clone(), visitor);

        Self {
            delivery: DeliveryEngine::new(backend.clone()),
            backend,
            identity,
            queue: OperationQueue::new(),
            intent: tokio::sync::Mutex::new(intent),
            throttle: Mutex::new(ClickThrottle::new()),
            rage: Mutex::new(RageClickDetector::new()),
            scroll: Mutex::new(ScrollTracker::new()),
            seen_experiments: Mutex::new(HashSet::new()),
            ctx,
            session,
            traffic,
            page_loaded_at: now,
        }
    }

    /// Latch all write paths off for the rest of the page life.
    pub fn disable_writes(&self) {
        self.delivery.disable_writes();
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Route one domain event through the adapters and detectors.
    pub async fn handle_event(&self, event: &DomainEvent, now: DateTime<Utc>) {
        match event {
            DomainEvent::Click { x, y } => self.handle_click(*x, *y, now),
            DomainEvent::Scroll {
                scroll_top,
                document_height,
                viewport_height,
            } => {
                if !self.ctx.do_not_track {
                    self.scroll.lock().observe(
                        *scroll_top,
                        *document_height,
                        *viewport_height,
                        now_ms(now),
                    );
                }
            }
            _ => {
                let output = adapters::map_event(event, &self.ctx, now);
                for op in output.operations {
                    self.queue.enqueue(op);
                }
                self.grant(output.intent_points, now).await;
            }
        }
    }

    fn handle_click(&self, x: f64, y: f64, now: DateTime<Utc>) {
        if self.ctx.do_not_track {
            return;
        }
        let at_ms = now_ms(now);
        if !self.throttle.lock().admit(at_ms) {
            return;
        }

        let date = paths::date_key(now);
        self.queue.enqueue(Operation::append(
            paths::clicks(&date, &self.ctx.slug),
            json!({"x": x, "y": y, "timestamp": now.timestamp_millis()}),
        ));

        if let Some(detection) = self.rage.lock().observe(x, y, at_ms) {
            debug!(count = detection.count, "rage click detected");
            self.queue.enqueue(Operation::append(
                paths::rage_clicks(&date, &self.ctx.slug),
                json!({
                    "x": detection.x,
                    "y": detection.y,
                    "count": detection.count,
                    "timestamp": now.timestamp_millis(),
                }),
            ));
        }
    }

    /// Trailing-edge settle of the scroll debounce. Call on a short tick.
    pub async fn settle_scroll(&self, now: DateTime<Utc>) {
        let outcome = match self.scroll.lock().settle(now_ms(now)) {
            Some(outcome) => outcome,
            None => return,
        };
        let date = paths::date_key(now);
        for threshold in &outcome.fired {
            self.queue.enqueue(Operation::increment(paths::scroll_depth(
                &date,
                &self.ctx.slug,
                *threshold,
            )));
        }
        if outcome.deep {
            self.grant(POINTS_DEEP_SCROLL, now).await;
        }
    }

    /// Grant the once-per-session dwell points after enough continuous time
    /// on site. Call on a short tick.
    pub async fn maybe_grant_dwell(&self, now: DateTime<Utc>) {
        if self.identity.dwell_granted() {
            return;
        }
        let elapsed = now.signed_duration_since(self.page_loaded_at);
        if elapsed.num_seconds() < DWELL_GRANT_AFTER.as_secs() as i64 {
            return;
        }
        self.identity.mark_dwell_granted();
        self.grant(POINTS_DWELL, now).await;
    }

    /// Public API: record a caller-defined event. No-op under do-not-track.
    pub fn track(&self, name: &str, data: Map<String, Value>, now: DateTime<Utc>) {
        if self.ctx.do_not_track {
            return;
        }
        self.queue
            .enqueue(adapters::track_operation(name, data, &self.ctx, now));
    }

    /// Public API: deterministic variant for the named experiment. The first
    /// call per experiment per page also counts an exposure.
    pub fn get_variant(&self, experiment: &str) -> Variant {
        let variant = bucket(self.ctx.visitor.as_str(), experiment);
        if !self.ctx.do_not_track && self.seen_experiments.lock().insert(experiment.to_string()) {
            self.queue
                .enqueue(Operation::increment(paths::ab_test_views(experiment, variant)));
        }
        variant
    }

    /// Public API: today's view count for a product handle.
    ///
    /// Defers until the backend reports ready, then resolves 0 for missing
    /// data. Never fails the caller.
    pub async fn get_product_views(&self, handle: &str, now: DateTime<Utc>) -> i64 {
        let mut connectivity = self.backend.watch_connectivity();
        while !*connectivity.borrow_and_update() {
            if connectivity.changed().await.is_err() {
                return 0;
            }
        }

        let path = paths::product_view_counts(&paths::date_key(now), handle);
        match self.backend.get(&path).await {
            Ok(Some(value)) => value.as_i64().unwrap_or(0),
            Ok(None) => 0,
            Err(e) => {
                debug!(error = %e, kind = e.error_kind(), path, "product view read failed");
                0
            }
        }
    }

    /// Drain and transmit the queue. Triggered by the periodic timer, by a
    /// visibility transition to hidden, and before teardown.
    pub async fn flush(&self) {
        self.delivery.flush(self.queue.drain()).await;
    }

    async fn grant(&self, points: u32, now: DateTime<Utc>) {
        if points == 0 || self.ctx.do_not_track {
            return;
        }
        self.intent.lock().await.grant(points, now).await;
    }

    /// Page teardown: write the session summary, flush, then hand any
    /// leftovers to the beacon fallback.
    pub async fn teardown(&self, now: DateTime<Utc>) {
        if !self.ctx.do_not_track {
            let date = paths::date_key(now);
            let intent_level = self.intent.lock().await.level();
            self.queue.enqueue(Operation::set(
                paths::sessions(&date, &self.session.id),
                json!({
                    "startedAt": self.session.started_at,
                    "endedAt": now.timestamp_millis(),
                    "pageViews": self.session.page_views,
                    "durationMs": now.timestamp_millis() - self.session.started_at,
                    "trafficSource": self.traffic.as_str(),
                    "intentLevel": intent_level.as_str(),
                    "visitorId": self.ctx.visitor.as_str(),
                }),
            ));
        }
        self.identity.end_session();

        self.flush().await;
        // Anything enqueued while the flush was in flight rides the beacon.
        self.delivery.flush_beacon(self.queue.drain());
        info!("collector torn down");
    }

    /// Drive the periodic triggers until `shutdown` fires, then tear down.
    pub async fn run(&self, mut shutdown: oneshot::Receiver<()>) {
        let mut flush_timer = tokio::time::interval(FLUSH_INTERVAL);
        flush_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        flush_timer.tick().await; // first tick completes immediately
        let mut settle_timer = tokio::time::interval(std::time::Duration::from_millis(100));
        settle_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = flush_timer.tick() => {
                    self.flush().await;
                }
                _ = settle_timer.tick() => {
                    let now = Utc::now();
                    self.settle_scroll(now).await;
                    self.maybe_grant_dwell(now).await;
                }
                _ = &mut shutdown => {
                    self.teardown(Utc::now()).await;
                    return;
                }
            }
        }
    }
}

fn now_ms(now: DateTime<Utc>) -> u64 {
    now.timestamp_millis().max(0) as u64
}
