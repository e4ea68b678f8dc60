use std::fmt::Write as _;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use claimloop_shared::algebra::is_below_min_area;
use claimloop_shared::ranking::{OwnerStanding, leaderboard};
use claimloop_shared::{
    InsertResponse, InvalidInput, Ring, StoreError, Territory, TerritoryId, TerritoryRecord,
    UpdateRequest,
};
use tracing::{debug, info};

use crate::config::MAX_RING_POINTS;
use crate::state::{AppState, ObservabilitySnapshot};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

type ApiError = (StatusCode, String);

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let observability = state.observability.snapshot();
    Json(serde_json::json!({
        "status": "ok",
        "territories": state.store.len(),
        "seq": state.store.current_seq(),
        "observability": {
            "inserts_total": observability.inserts_total,
            "updates_total": observability.updates_total,
            "deletes_total": observability.deletes_total,
            "rejected_writes_total": observability.rejected_writes_total,
            "feed_subscribers_total": observability.feed_subscribers_total,
            "lagged_feed_events_total": observability.lagged_feed_events_total,
        },
    }))
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = render_prometheus_metrics(
        state.store.len(),
        state.store.current_seq(),
        state.observability.snapshot(),
    );

    (
        [
            (header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-store"),
        ],
        body,
    )
}

fn render_prometheus_metrics(
    territory_count: usize,
    seq: u64,
    observability: ObservabilitySnapshot,
) -> String {
    let mut body = String::new();
    let _ = writeln!(
        body,
        "# HELP claimloop_territories Current number of stored territories."
    );
    let _ = writeln!(body, "# TYPE claimloop_territories gauge");
    let _ = writeln!(body, "claimloop_territories {territory_count}");

    let _ = writeln!(
        body,
        "# HELP claimloop_feed_seq Sequence number of the latest creation event."
    );
    let _ = writeln!(body, "# TYPE claimloop_feed_seq gauge");
    let _ = writeln!(body, "claimloop_feed_seq {seq}");

    let counters = [
        (
            "claimloop_inserts_total",
            "Territories inserted.",
            observability.inserts_total,
        ),
        (
            "claimloop_updates_total",
            "Territory rings replaced.",
            observability.updates_total,
        ),
        (
            "claimloop_deletes_total",
            "Territories deleted.",
            observability.deletes_total,
        ),
        (
            "claimloop_rejected_writes_total",
            "Write requests refused as invalid, conflicting or unknown.",
            observability.rejected_writes_total,
        ),
        (
            "claimloop_feed_subscribers_total",
            "Creation feed subscriptions opened.",
            observability.feed_subscribers_total,
        ),
        (
            "claimloop_lagged_feed_events_total",
            "Creation events skipped by lagging subscribers.",
            observability.lagged_feed_events_total,
        ),
    ];
    for (name, help, value) in counters {
        let _ = writeln!(body, "# HELP {name} {help}");
        let _ = writeln!(body, "# TYPE {name} counter");
        let _ = writeln!(body, "{name} {value}");
    }

    body
}

pub async fn list_territories(State(state): State<AppState>) -> Json<Vec<TerritoryRecord>> {
    Json(
        state
            .store
            .snapshot()
            .iter()
            .map(Territory::to_record)
            .collect(),
    )
}

pub async fn insert_territory(
    State(state): State<AppState>,
    Json(mut record): Json<TerritoryRecord>,
) -> Result<(StatusCode, Json<InsertResponse>), ApiError> {
    check_ring_size(&state, record.coords.len())?;
    if record.id.is_none() {
        record.id = Some(TerritoryId::fresh());
    }

    let territory = Territory::try_from(record).map_err(|e| {
        state.observability.record_rejected_write();
        debug!(error = %e, "rejecting malformed territory");
        (StatusCode::BAD_REQUEST, e.to_string())
    })?;
    if is_below_min_area(territory.area_km2) {
        state.observability.record_rejected_write();
        return Err((StatusCode::BAD_REQUEST, InvalidInput::ZeroArea.to_string()));
    }
    let owner = territory.owner;
    let area_km2 = territory.area_km2;

    let id = state
        .store
        .insert_territory(territory)
        .map_err(|e| reject(&state, e))?;
    state.observability.record_insert();
    info!(territory = %id, %owner, area_km2, "territory inserted");

    Ok((StatusCode::CREATED, Json(InsertResponse { id })))
}

pub async fn update_territory(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateRequest>,
) -> Result<StatusCode, ApiError> {
    check_ring_size(&state, request.coords.len())?;
    let ring = Ring::from_lat_lng(&request.coords).map_err(|e| {
        state.observability.record_rejected_write();
        (StatusCode::BAD_REQUEST, e.to_string())
    })?;

    let id = TerritoryId::new(id);
    state
        .store
        .update_territory(&id, ring)
        .map_err(|e| reject(&state, e))?;
    state.observability.record_update();
    debug!(territory = %id, "territory ring replaced");

    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_territory(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = TerritoryId::new(id);
    state
        .store
        .delete_territory(&id)
        .map_err(|e| reject(&state, e))?;
    state.observability.record_delete();
    debug!(territory = %id, "territory deleted");

    Ok(StatusCode::NO_CONTENT)
}

pub async fn ranking(State(state): State<AppState>) -> Json<Vec<OwnerStanding>> {
    let territories = state.store.snapshot();
    Json(leaderboard(&territories))
}

fn check_ring_size(state: &AppState, points: usize) -> Result<(), ApiError> {
    if points > MAX_RING_POINTS {
        state.observability.record_rejected_write();
        return Err((
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("ring has {points} points; at most {MAX_RING_POINTS} accepted"),
        ));
    }
    Ok(())
}

fn reject(state: &AppState, error: StoreError) -> ApiError {
    state.observability.record_rejected_write();
    match error {
        StoreError::Rejected { status, message } => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_REQUEST),
            message,
        ),
        StoreError::Unavailable(reason) => (StatusCode::SERVICE_UNAVAILABLE, reason),
    }
}
