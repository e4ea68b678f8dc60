//! HTTP client for the territory store host.

use std::time::Duration;

use claimloop_shared::{
    InsertResponse, RecordList, Ring, StoreError, Territory, TerritoryId, TerritoryRecord, TerritoryStore,
    UpdateRequest,
};
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::config;
use crate::feed;

const USER_AGENT: &str = "claimloop-client/0.1";

#[derive(Clone)]
pub struct RemoteStore {
    base_url: String,
    http: reqwest::Client,
    /// Separate client without a total request timeout; the feed response never ends.
    feed_http: reqwest::Client,
}

impl RemoteStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        let connect_timeout = config::connect_timeout();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: build_client(Some(config::http_timeout()), connect_timeout),
            feed_http: build_client(None, connect_timeout),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn territories_url(&self) -> String {
        format!("{}/api/territories", self.base_url)
    }

    fn territory_url(&self, id: &TerritoryId) -> String {
        format!("{}/api/territories/{id}", self.base_url)
    }

    fn events_url(&self) -> String {
        format!("{}/api/events", self.base_url)
    }
}

fn build_client(timeout: Option<Duration>, connect_timeout: Duration) -> reqwest::Client {
    let builder = reqwest::Client::builder().connect_timeout(connect_timeout);
    let builder = match timeout {
        Some(timeout) => builder.timeout(timeout),
        None => builder,
    };
    builder
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "failed to build configured HTTP client, using defaults");
            reqwest::Client::new()
        })
}

fn unavailable(error: reqwest::Error) -> StoreError {
    StoreError::Unavailable(error.to_string())
}

/// Turn a non-success response into a store error, keeping the body as the message.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    if status.is_server_error() {
        return Err(StoreError::Unavailable(format!("{status}: {message}")));
    }
    Err(StoreError::Rejected {
        status: status.as_u16(),
        message,
    })
}

/// Fetch the full territory list. Entries without the record shape are dropped one by one.
pub(crate) async fn fetch_territories(
    http: &reqwest::Client,
    url: &str,
) -> Result<Vec<TerritoryRecord>, StoreError> {
    let response = http.get(url).send().await.map_err(unavailable)?;
    check_status(response)
        .await?
        .json::<RecordList>()
        .await
        .map(RecordList::into_inner)
        .map_err(unavailable)
}

impl TerritoryStore for RemoteStore {
    async fn list(&self) -> Result<Vec<Territory>, StoreError> {
        let records = fetch_territories(&self.http, &self.territories_url()).await?;
        Ok(records
            .into_iter()
            .filter_map(|record| match Territory::try_from(record) {
                Ok(territory) => Some(territory),
                Err(e) => {
                    debug!(error = %e, "dropping malformed stored territory");
                    None
                }
            })
            .collect())
    }

    async fn insert(&self, territory: &Territory) -> Result<TerritoryId, StoreError> {
        let response = self
            .http
            .post(self.territories_url())
            .json(&territory.to_record())
            .send()
            .await
            .map_err(unavailable)?;
        let body: InsertResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(unavailable)?;
        Ok(body.id)
    }

    async fn update(&self, id: &TerritoryId, ring: &Ring, area_km2: f64) -> Result<(), StoreError> {
        let request = UpdateRequest {
            coords: ring.to_lat_lng(),
            area: area_km2,
        };
        let response = self
            .http
            .put(self.territory_url(id))
            .json(&request)
            .send()
            .await
            .map_err(unavailable)?;
        check_status(response).await.map(|_| ())
    }

    async fn delete(&self, id: &TerritoryId) -> Result<(), StoreError> {
        let response = self
            .http
            .delete(self.territory_url(id))
            .send()
            .await
            .map_err(unavailable)?;
        // Someone else already removed it; the outcome is the same.
        if response.status() == StatusCode::NOT_FOUND {
            debug!(territory = %id, "delete of missing territory treated as done");
            return Ok(());
        }
        check_status(response).await.map(|_| ())
    }

    fn subscribe<F>(&self, on_create: F)
    where
        F: Fn(TerritoryRecord) + Send + Sync + 'static,
    {
        let http = self.feed_http.clone();
        let events_url = self.events_url();
        let list_url = self.territories_url();
        tokio::spawn(async move {
            feed::run(http, events_url, list_url, on_create).await;
        });
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeMap;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    use axum::Json;
    use axum::Router;
    use axum::extract::{Path, State};
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::{get, put};
    use claimloop_shared::{GeoPoint, Owner};

    use super::*;

    type Table = Arc<Mutex<BTreeMap<String, TerritoryRecord>>>;

    async fn list_handler(State(table): State<Table>) -> Json<Vec<TerritoryRecord>> {
        let table = table.lock().expect("table lock");
        Json(table.values().cloned().collect())
    }

    async fn insert_handler(
        State(table): State<Table>,
        Json(record): Json<TerritoryRecord>,
    ) -> Result<(AxumStatus, Json<InsertResponse>), AxumStatus> {
        let id = record
            .id
            .clone()
            .unwrap_or_else(|| TerritoryId::new("assigned"));
        let mut table = table.lock().expect("table lock");
        if table.contains_key(id.as_str()) {
            return Err(AxumStatus::CONFLICT);
        }
        table.insert(id.to_string(), record);
        Ok((AxumStatus::CREATED, Json(InsertResponse { id })))
    }

    async fn update_handler(
        State(table): State<Table>,
        Path(id): Path<String>,
        Json(request): Json<UpdateRequest>,
    ) -> AxumStatus {
        let mut table = table.lock().expect("table lock");
        match table.get_mut(&id) {
            Some(record) => {
                record.coords = request.coords;
                record.area = request.area;
                AxumStatus::NO_CONTENT
            }
            None => AxumStatus::NOT_FOUND,
        }
    }

    async fn delete_handler(State(table): State<Table>, Path(id): Path<String>) -> AxumStatus {
        let mut table = table.lock().expect("table lock");
        match table.remove(&id) {
            Some(_) => AxumStatus::NO_CONTENT,
            None => AxumStatus::NOT_FOUND,
        }
    }

    /// Minimal in-test store host speaking the same HTTP contract.
    pub(crate) async fn spawn_test_store(table: Table) -> (SocketAddr, tokio::task::JoinHandle<()>) {
        let app = Router::new()
            .route("/api/territories", get(list_handler).post(insert_handler))
            .route(
                "/api/territories/{id}",
                put(update_handler).delete(delete_handler),
            )
            .with_state(table);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve test app");
        });
        (addr, handle)
    }

    pub(crate) fn square(lat: f64, lng: f64, size: f64) -> Ring {
        Ring::close(&[
            GeoPoint::new(lat, lng),
            GeoPoint::new(lat, lng + size),
            GeoPoint::new(lat + size, lng + size),
            GeoPoint::new(lat + size, lng),
        ])
        .expect("square ring")
    }

    #[tokio::test]
    async fn crud_round_trip_against_store_host() {
        let table: Table = Arc::default();
        let (addr, server) = spawn_test_store(Arc::clone(&table)).await;
        let store = RemoteStore::new(format!("http://{addr}/"));
        assert_eq!(store.base_url(), format!("http://{addr}"));

        let territory = Territory::new(
            TerritoryId::new("t1"),
            Owner::Blue,
            square(50.0, 17.0, 0.001),
        );
        let id = store.insert(&territory).await.expect("insert");
        assert_eq!(id, territory.id);

        let conflict = store.insert(&territory).await.expect_err("duplicate insert");
        assert!(matches!(conflict, StoreError::Rejected { status: 409, .. }));

        let smaller = square(50.0, 17.0, 0.0005);
        store.update(&id, &smaller, 0.25).await.expect("update");
        let listed = store.list().await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].ring, smaller);
        // Inbound area is recomputed, never taken from the wire.
        assert!(listed[0].area_km2 < 0.25);

        store.delete(&id).await.expect("delete");
        store.delete(&id).await.expect("second delete is idempotent");
        assert!(store.list().await.expect("list").is_empty());

        let missing = store
            .update(&id, &smaller, 0.0)
            .await
            .expect_err("update missing");
        assert!(matches!(missing, StoreError::Rejected { status: 404, .. }));

        server.abort();
    }

    #[tokio::test]
    async fn list_drops_malformed_records() {
        let table: Table = Arc::default();
        table.lock().expect("table lock").insert(
            "bad".to_string(),
            TerritoryRecord {
                id: Some(TerritoryId::new("bad")),
                player_color: "purple".to_string(),
                coords: square(50.0, 17.0, 0.001).to_lat_lng(),
                area: 0.0,
            },
        );
        table.lock().expect("table lock").insert(
            "good".to_string(),
            Territory::new(TerritoryId::new("good"), Owner::Red, square(50.1, 17.0, 0.001))
                .to_record(),
        );
        let (addr, server) = spawn_test_store(table).await;
        let store = RemoteStore::new(format!("http://{addr}"));

        let listed = store.list().await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, TerritoryId::new("good"));

        server.abort();
    }

    #[tokio::test]
    async fn list_survives_misshapen_rows() {
        let good = Territory::new(TerritoryId::new("good"), Owner::Green, square(50.0, 17.0, 0.001))
            .to_record();
        let body = serde_json::json!([
            good,
            { "id": "null-area", "player_color": "red", "coords": good.coords, "area": null },
            { "id": "three-d", "player_color": "red", "coords": [[50.0, 17.0, 1.0]] },
        ]);
        let app = Router::new().route(
            "/api/territories",
            get(move || {
                let body = body.clone();
                async move { Json(body) }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve test app");
        });

        let store = RemoteStore::new(format!("http://{addr}"));
        let listed = store.list().await.expect("list with bad rows");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, TerritoryId::new("good"));

        server.abort();
    }

    #[tokio::test]
    async fn unreachable_store_is_unavailable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind probe listener");
        let addr = listener.local_addr().expect("probe address");
        drop(listener);

        let store = RemoteStore::new(format!("http://{addr}"));
        assert!(matches!(
            store.list().await,
            Err(StoreError::Unavailable(_))
        ));
    }
}
