use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::errors::BackendError;
use crate::Backend;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Beacons must finish fast or not at all; nothing waits on them.
const BEACON_TIMEOUT: Duration = Duration::from_secs(3);
/// Bounded conflict retries inside one increment transaction. This is not
/// delivery retry — a transaction that loses five races is dropped.
const INCREMENT_MAX_ATTEMPTS: u32 = 5;
/// Tree that receives teardown beacon payloads.
const BEACON_TREE: &str = "beacon";

#[derive(Clone, Debug)]
pub struct HttpBackendConfig {
    /// Root of the hierarchical store, e.g. `https://telemetry.example.com`.
    pub base_url: String,
}

/// REST transport for a hierarchical realtime KV store.
///
/// Paths map to `{base}/{path}.json`; multi-path updates PATCH the root with
/// full paths as keys; increments are ETag-conditional read-modify-writes.
pub struct HttpBackend {
    client: Client,
    base_url: String,
    connectivity_tx: watch::Sender<bool>,
}

impl HttpBackend {
    pub fn new(config: HttpBackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BackendError::Network(format!("client build: {e}")))?;
        let (connectivity_tx, _) = watch::channel(false);
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            connectivity_tx,
        })
    }

    /// Verify the store is reachable and flip the connectivity signal.
    ///
    /// A failure here is a bootstrap failure: the caller disables all write
    /// paths for the remainder of the page life.
    pub async fn bootstrap(&self) -> Result<(), BackendError> {
        let url = format!("{}/.json?shallow=true", self.base_url);
        let response = self.client.get(&url).send().await.map_err(|e| {
            let _ = self.connectivity_tx.send(false);
            BackendError::Network(e.to_string())
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let _ = self.connectivity_tx.send(false);
            return Err(BackendError::from_status(status, body));
        }

        let _ = self.connectivity_tx.send(true);
        debug!("backend bootstrap complete");
        Ok(())
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, path)
    }

    async fn read_with_etag(&self, path: &str) -> Result<(Option<Value>, String), BackendError> {
        let response = self
            .client
            .get(self.url_for(path))
            .header("X-Firebase-ETag", "true")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::from_status(status.as_u16(), body));
        }

        let etag = response
            .headers()
            .get("ETag")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let value: Value = response.json().await?;
        let value = if value.is_null() { None } else { Some(value) };
        Ok((value, etag))
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn increment(&self, path: &str, delta: i64) -> Result<i64, BackendError> {
        for _ in 0..INCREMENT_MAX_ATTEMPTS {
            let (current, etag) = self.read_with_etag(path).await?;
            let current = current.and_then(|v| v.as_i64()).unwrap_or(0);
            let next = current + delta;

            let response = self
                .client
                .put(self.url_for(path))
                .header("if-match", &etag)
                .json(&next)
                .send()
                .await?;

            let status = response.status();
            if status.is_success() {
                return Ok(next);
            }
            if status.as_u16() == 412 {
                // Lost the race; re-read and try again.
                continue;
            }
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::from_status(status.as_u16(), body));
        }
        Err(BackendError::Conflict {
            path: path.to_string(),
            attempts: INCREMENT_MAX_ATTEMPTS,
        })
    }

    async fn update(&self, writes: Map<String, Value>) -> Result<(), BackendError> {
        if writes.is_empty() {
            return Ok(());
        }
        let url = format!("{}/.json", self.base_url);
        let response = self.client.patch(&url).json(&writes).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::from_status(status.as_u16(), body));
        }
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Option<Value>, BackendError> {
        let response = self.client.get(self.url_for(path)).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::from_status(status.as_u16(), body));
        }
        let value: Value = response.json().await?;
        Ok(if value.is_null() { None } else { Some(value) })
    }

    async fn set_presence(&self, path: &str, payload: Value) -> Result<(), BackendError> {
        let response = self
            .client
            .put(self.url_for(path))
            .json(&payload)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::from_status(status.as_u16(), body));
        }

        // Arm auto-removal: when connectivity is later lost, delete the
        // record so the live count stays accurate without an explicit
        // disconnect notification.
        let client = self.client.clone();
        let url = self.url_for(path);
        let mut connectivity = self.connectivity_tx.subscribe();
        tokio::spawn(async move {
            loop {
                if connectivity.changed().await.is_err() {
                    break;
                }
                if !*connectivity.borrow() {
                    if let Err(e) = client.delete(&url).send().await {
                        debug!(error = %e, "presence removal attempt failed");
                    }
                    break;
                }
            }
        });
        Ok(())
    }

    fn beacon(&self, payload: Value) {
        let client = self.client.clone();
        let url = format!("{}/{}.json", self.base_url, BEACON_TREE);
        tokio::spawn(async move {
            let result = client
                .post(&url)
                .timeout(BEACON_TIMEOUT)
                .json(&payload)
                .send()
                .await;
            if let Err(e) = result {
                // Explicitly lossy; nothing to do but note it.
                warn!(error = %e, "beacon send failed");
            }
        });
    }

    fn watch_connectivity(&self) -> watch::Receiver<bool> {
        self.connectivity_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn backend(server: &MockServer) -> HttpBackend {
        HttpBackend::new(HttpBackendConfig {
            base_url: server.uri(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn bootstrap_flips_connectivity() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let backend = backend(&server).await;
        let mut connectivity = backend.watch_connectivity();
        assert!(!*connectivity.borrow());

        backend.bootstrap().await.unwrap();
        connectivity.changed().await.unwrap();
        assert!(*connectivity.borrow());
    }

    #[tokio::test]
    async fn bootstrap_failure_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let backend = backend(&server).await;
        let result = backend.bootstrap().await;
        assert!(matches!(result, Err(BackendError::Http { status: 500, .. })));
        assert!(!*backend.watch_connectivity().borrow());
    }

    #[tokio::test]
    async fn get_maps_null_to_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/productViewCounts/2026-08-30/widget.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(null)))
            .mount(&server)
            .await;

        let backend = backend(&server).await;
        let value = backend
            .get("productViewCounts/2026-08-30/widget")
            .await
            .unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn update_patches_root_with_full_paths() {
        let server = MockServer::start().await;
        let mut writes = Map::new();
        writes.insert("clicks/2026-08-30/home/k1".into(), json!({"x": 1}));
        writes.insert("visitors/v-1/intent".into(), json!({"score": 5}));

        Mock::given(method("PATCH"))
            .and(path("/.json"))
            .and(body_json(json!({
                "clicks/2026-08-30/home/k1": {"x": 1},
                "visitors/v-1/intent": {"score": 5},
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let backend = backend(&server).await;
        backend.update(writes).await.unwrap();
    }

    #[tokio::test]
    async fn empty_update_sends_nothing() {
        let server = MockServer::start().await;
        // No PATCH mock mounted: a request would 404 and fail the call.
        let backend = backend(&server).await;
        backend.update(Map::new()).await.unwrap();
    }

    #[tokio::test]
    async fn increment_reads_then_conditionally_writes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pageViews/2026-08-30/home.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!(4))
                    .insert_header("ETag", "etag-1"),
            )
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/pageViews/2026-08-30/home.json"))
            .and(header("if-match", "etag-1"))
            .and(body_json(json!(5)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(5)))
            .expect(1)
            .mount(&server)
            .await;

        let backend = backend(&server).await;
        let committed = backend.increment("pageViews/2026-08-30/home", 1).await.unwrap();
        assert_eq!(committed, 5);
    }

    #[tokio::test]
    async fn increment_treats_absent_counter_as_zero() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/scrollDepth/2026-08-30/shop/75.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!(null))
                    .insert_header("ETag", "etag-0"),
            )
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/scrollDepth/2026-08-30/shop/75.json"))
            .and(body_json(json!(1)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(1)))
            .mount(&server)
            .await;

        let backend = backend(&server).await;
        let committed = backend.increment("scrollDepth/2026-08-30/shop/75", 1).await.unwrap();
        assert_eq!(committed, 1);
    }

    #[tokio::test]
    async fn increment_gives_up_after_bounded_conflicts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/c.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!(1))
                    .insert_header("ETag", "stale"),
            )
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/c.json"))
            .respond_with(ResponseTemplate::new(412))
            .mount(&server)
            .await;

        let backend = backend(&server).await;
        let result = backend.increment("c", 1).await;
        assert!(matches!(result, Err(BackendError::Conflict { attempts: 5, .. })));
    }

    #[tokio::test]
    async fn beacon_posts_to_beacon_tree() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/beacon.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "k"})))
            .expect(1)
            .mount(&server)
            .await;

        let backend = backend(&server).await;
        backend.beacon(json!({"writes": {}}));
        // Fire-and-forget: give the spawned send a moment to land.
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    #[tokio::test]
    async fn presence_set_then_removed_on_connectivity_loss() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/presence/v-1.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(true)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/presence/v-1.json"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let backend = backend(&server).await;
        backend.bootstrap().await.unwrap();
        backend
            .set_presence("presence/v-1", json!({"online": true}))
            .await
            .unwrap();

        // Losing connectivity triggers the armed removal.
        let _ = backend.connectivity_tx.send(false);
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}
