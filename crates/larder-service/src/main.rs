use std::net::SocketAddr;
use std::path::{Path as FsPath, PathBuf};

use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use larder_api::{
    AddQuantityRequest, DiscardItemRequest, InventoryApi, MigrateResult, ReorderLocationsRequest,
    SetQuantityRequest, UseItemRequest, API_CONTRACT_VERSION,
};
use larder_core::{
    Category, ConsumptionAction, ConsumptionRecord, DomainError, HistoryFilter, ItemDraft,
    ItemFilter, ItemId, ItemView, Location, LocationDraft, LocationId, LocationStats,
    StatsSnapshot,
};
use larder_store_sqlite::{SchemaStatus, SqliteStore};
use serde::{Deserialize, Serialize};
use tokio::time::MissedTickBehavior;
use ulid::Ulid;

const SERVICE_CONTRACT_VERSION: &str = "service.v1";
const OPENAPI_YAML: &str = include_str!("../../../openapi/openapi.yaml");

#[derive(Debug, Clone)]
struct ServiceState {
    api: InventoryApi,
}

#[derive(Debug, Clone, Serialize)]
struct ServiceEnvelope<T>
where
    T: Serialize,
{
    service_contract_version: &'static str,
    api_contract_version: &'static str,
    data: T,
}

#[derive(Debug, Clone, Serialize)]
struct ServiceErrorBody {
    service_contract_version: &'static str,
    error: String,
}

#[derive(Debug, Clone)]
struct ServiceError {
    status: StatusCode,
    body: ServiceErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
struct MigrateRequest {
    dry_run: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct LocationListQuery {
    #[serde(default)]
    visible_only: bool,
}

#[derive(Debug, Clone, Serialize)]
struct DeleteResponse {
    deleted: bool,
}

#[derive(Debug, Clone, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Parser)]
#[command(name = "larder-service")]
#[command(about = "Local HTTP service for the Larder inventory tracker")]
struct Args {
    #[arg(long, default_value = "./larder.sqlite3")]
    db: PathBuf,
    #[arg(long, default_value = "127.0.0.1:4020")]
    bind: SocketAddr,
    /// Seconds between background WAL checkpoints.
    #[arg(long, default_value_t = 5)]
    flush_interval_secs: u64,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn service_error(err: &anyhow::Error) -> ServiceError {
    let status = match err.downcast_ref::<DomainError>() {
        Some(DomainError::Validation(_)) => StatusCode::BAD_REQUEST,
        Some(DomainError::NotFound(_)) => StatusCode::NOT_FOUND,
        None => StatusCode::INTERNAL_SERVER_ERROR,
    };
    ServiceError {
        status,
        body: ServiceErrorBody {
            service_contract_version: SERVICE_CONTRACT_VERSION,
            error: err.to_string(),
        },
    }
}

fn bad_request(message: impl Into<String>) -> ServiceError {
    ServiceError {
        status: StatusCode::BAD_REQUEST,
        body: ServiceErrorBody {
            service_contract_version: SERVICE_CONTRACT_VERSION,
            error: message.into(),
        },
    }
}

fn envelope<T>(data: T) -> ServiceEnvelope<T>
where
    T: Serialize,
{
    ServiceEnvelope {
        service_contract_version: SERVICE_CONTRACT_VERSION,
        api_contract_version: API_CONTRACT_VERSION,
        data,
    }
}

fn parse_item_id(raw: &str) -> Result<ItemId, ServiceError> {
    Ulid::from_string(raw).map(ItemId).map_err(|_| bad_request(format!("invalid item id: {raw}")))
}

fn parse_location_id(raw: &str) -> Result<LocationId, ServiceError> {
    Ulid::from_string(raw)
        .map(LocationId)
        .map_err(|_| bad_request(format!("invalid location id: {raw}")))
}

fn app(state: ServiceState) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/openapi", get(openapi))
        .route("/v1/db/schema-version", post(db_schema_version))
        .route("/v1/db/migrate", post(db_migrate))
        .route("/v1/items", get(items_list).post(items_create))
        .route("/v1/items/export", get(items_export))
        .route("/v1/items/:id", get(item_get).put(item_update).delete(item_delete))
        .route("/v1/items/:id/use", post(item_use))
        .route("/v1/items/:id/add", post(item_add))
        .route("/v1/items/:id/quantity", post(item_quantity))
        .route("/v1/items/:id/discard", post(item_discard))
        .route("/v1/locations", get(locations_list).post(locations_create))
        .route("/v1/locations/reorder", post(locations_reorder))
        .route("/v1/locations/counts", get(location_counts))
        .route("/v1/locations/:id", get(location_get).put(location_update).delete(location_delete))
        .route("/v1/consumption", get(consumption_list))
        .route("/v1/categories", get(categories_list))
        .route("/v1/stats", get(stats))
        .with_state(state)
}

fn flush_database(db_path: &FsPath) -> Result<()> {
    let store = SqliteStore::open(db_path)?;
    store.flush()
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("failed to install the shutdown signal handler");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let state = ServiceState { api: InventoryApi::new(args.db.clone()) };

    // Mutations commit their own transactions; this background checkpoint is
    // the safety net that keeps the WAL from growing unbounded. A failed
    // checkpoint is logged and retried on the next tick.
    let flush_path = args.db.clone();
    let flush_interval = std::time::Duration::from_secs(args.flush_interval_secs.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(err) = flush_database(&flush_path) {
                tracing::warn!(error = %err, "periodic wal checkpoint failed");
            }
        }
    });

    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    tracing::info!(bind = %args.bind, db = %args.db.display(), "larder service listening");
    axum::serve(listener, app(state)).with_graceful_shutdown(shutdown_signal()).await?;

    match flush_database(&args.db) {
        Ok(()) => tracing::info!("final wal checkpoint complete"),
        Err(err) => tracing::warn!(error = %err, "final wal checkpoint failed"),
    }
    Ok(())
}

async fn health() -> Json<ServiceEnvelope<HealthResponse>> {
    Json(envelope(HealthResponse { status: "ok" }))
}

async fn openapi() -> impl IntoResponse {
    (StatusCode::OK, [("content-type", "application/yaml; charset=utf-8")], OPENAPI_YAML)
}

async fn db_schema_version(
    State(state): State<ServiceState>,
) -> Result<Json<ServiceEnvelope<SchemaStatus>>, ServiceError> {
    let status = state.api.schema_status().map_err(|err| service_error(&err))?;
    Ok(Json(envelope(status)))
}

async fn db_migrate(
    State(state): State<ServiceState>,
    Json(request): Json<MigrateRequest>,
) -> Result<Json<ServiceEnvelope<MigrateResult>>, ServiceError> {
    let result = state.api.migrate(request.dry_run).map_err(|err| service_error(&err))?;
    Ok(Json(envelope(result)))
}

async fn items_list(
    State(state): State<ServiceState>,
    Query(filter): Query<ItemFilter>,
) -> Result<Json<ServiceEnvelope<Vec<ItemView>>>, ServiceError> {
    let items = state.api.list_items(&filter).map_err(|err| service_error(&err))?;
    Ok(Json(envelope(items)))
}

async fn items_create(
    State(state): State<ServiceState>,
    Json(draft): Json<ItemDraft>,
) -> Result<Json<ServiceEnvelope<ItemView>>, ServiceError> {
    let view = state.api.create_item(draft).map_err(|err| service_error(&err))?;
    Ok(Json(envelope(view)))
}

async fn items_export(
    State(state): State<ServiceState>,
) -> Result<Json<ServiceEnvelope<Vec<ItemView>>>, ServiceError> {
    let items = state.api.export_items().map_err(|err| service_error(&err))?;
    Ok(Json(envelope(items)))
}

async fn item_get(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
) -> Result<Json<ServiceEnvelope<ItemView>>, ServiceError> {
    let id = parse_item_id(&id)?;
    let view = state.api.get_item(id).map_err(|err| service_error(&err))?;
    Ok(Json(envelope(view)))
}

async fn item_update(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
    Json(draft): Json<ItemDraft>,
) -> Result<Json<ServiceEnvelope<ItemView>>, ServiceError> {
    let id = parse_item_id(&id)?;
    let view = state.api.update_item(id, draft).map_err(|err| service_error(&err))?;
    Ok(Json(envelope(view)))
}

async fn item_delete(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
) -> Result<Json<ServiceEnvelope<DeleteResponse>>, ServiceError> {
    let id = parse_item_id(&id)?;
    state.api.delete_item(id).map_err(|err| service_error(&err))?;
    Ok(Json(envelope(DeleteResponse { deleted: true })))
}

async fn item_use(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
    Json(request): Json<UseItemRequest>,
) -> Result<Json<ServiceEnvelope<Option<ItemView>>>, ServiceError> {
    let id = parse_item_id(&id)?;
    let view = state
        .api
        .use_item(id, request.amount, request.notes)
        .map_err(|err| service_error(&err))?;
    Ok(Json(envelope(view)))
}

async fn item_add(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
    Json(request): Json<AddQuantityRequest>,
) -> Result<Json<ServiceEnvelope<ItemView>>, ServiceError> {
    let id = parse_item_id(&id)?;
    let view = state.api.add_quantity(id, request.amount).map_err(|err| service_error(&err))?;
    Ok(Json(envelope(view)))
}

async fn item_quantity(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
    Json(request): Json<SetQuantityRequest>,
) -> Result<Json<ServiceEnvelope<ItemView>>, ServiceError> {
    let id = parse_item_id(&id)?;
    let view = state.api.set_quantity(id, request.quantity).map_err(|err| service_error(&err))?;
    Ok(Json(envelope(view)))
}

async fn item_discard(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
    Json(request): Json<DiscardItemRequest>,
) -> Result<Json<ServiceEnvelope<ItemView>>, ServiceError> {
    let id = parse_item_id(&id)?;
    let action = request.action.unwrap_or(ConsumptionAction::Discarded);
    let view =
        state.api.discard_item(id, action, request.notes).map_err(|err| service_error(&err))?;
    Ok(Json(envelope(view)))
}

async fn locations_list(
    State(state): State<ServiceState>,
    Query(query): Query<LocationListQuery>,
) -> Result<Json<ServiceEnvelope<Vec<Location>>>, ServiceError> {
    let locations =
        state.api.list_locations(query.visible_only).map_err(|err| service_error(&err))?;
    Ok(Json(envelope(locations)))
}

async fn locations_create(
    State(state): State<ServiceState>,
    Json(draft): Json<LocationDraft>,
) -> Result<Json<ServiceEnvelope<Location>>, ServiceError> {
    let location = state.api.create_location(draft).map_err(|err| service_error(&err))?;
    Ok(Json(envelope(location)))
}

async fn locations_reorder(
    State(state): State<ServiceState>,
    Json(request): Json<ReorderLocationsRequest>,
) -> Result<Json<ServiceEnvelope<Vec<Location>>>, ServiceError> {
    let locations =
        state.api.reorder_locations(&request.ids).map_err(|err| service_error(&err))?;
    Ok(Json(envelope(locations)))
}

async fn location_counts(
    State(state): State<ServiceState>,
) -> Result<Json<ServiceEnvelope<Vec<LocationStats>>>, ServiceError> {
    let counts = state.api.location_counts().map_err(|err| service_error(&err))?;
    Ok(Json(envelope(counts)))
}

async fn location_get(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
) -> Result<Json<ServiceEnvelope<Location>>, ServiceError> {
    let id = parse_location_id(&id)?;
    let location = state.api.get_location(id).map_err(|err| service_error(&err))?;
    Ok(Json(envelope(location)))
}

async fn location_update(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
    Json(draft): Json<LocationDraft>,
) -> Result<Json<ServiceEnvelope<Location>>, ServiceError> {
    let id = parse_location_id(&id)?;
    let location = state.api.update_location(id, draft).map_err(|err| service_error(&err))?;
    Ok(Json(envelope(location)))
}

async fn location_delete(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
) -> Result<Json<ServiceEnvelope<DeleteResponse>>, ServiceError> {
    let id = parse_location_id(&id)?;
    state.api.delete_location(id).map_err(|err| service_error(&err))?;
    Ok(Json(envelope(DeleteResponse { deleted: true })))
}

async fn consumption_list(
    State(state): State<ServiceState>,
    Query(filter): Query<HistoryFilter>,
) -> Result<Json<ServiceEnvelope<Vec<ConsumptionRecord>>>, ServiceError> {
    let records = state.api.history(&filter).map_err(|err| service_error(&err))?;
    Ok(Json(envelope(records)))
}

async fn categories_list(
    State(state): State<ServiceState>,
) -> Result<Json<ServiceEnvelope<Vec<Category>>>, ServiceError> {
    let categories = state.api.list_categories().map_err(|err| service_error(&err))?;
    Ok(Json(envelope(categories)))
}

async fn stats(
    State(state): State<ServiceState>,
) -> Result<Json<ServiceEnvelope<StatsSnapshot>>, ServiceError> {
    let snapshot = state.api.stats_snapshot().map_err(|err| service_error(&err))?;
    Ok(Json(envelope(snapshot)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use http::Request;
    use tower::ServiceExt;

    fn unique_temp_db_path() -> PathBuf {
        std::env::temp_dir().join(format!("larder-service-{}.sqlite3", Ulid::new()))
    }

    fn test_router(db_path: PathBuf) -> Router {
        app(ServiceState { api: InventoryApi::new(db_path) })
    }

    async fn response_json(response: Response) -> serde_json::Value {
        let bytes = match to_bytes(response.into_body(), 1024 * 1024).await {
            Ok(bytes) => bytes,
            Err(err) => panic!("failed to read response body: {err}"),
        };
        let body = match String::from_utf8(bytes.to_vec()) {
            Ok(body) => body,
            Err(err) => panic!("response body is not UTF-8: {err}"),
        };
        match serde_json::from_str(&body) {
            Ok(value) => value,
            Err(err) => panic!("response body is not JSON: {err}; body={body}"),
        }
    }

    async fn send(router: Router, method: &str, uri: &str, body: Option<serde_json::Value>) -> Response {
        let builder = Request::builder().uri(uri).method(method);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(axum::body::Body::from(json.to_string())),
            None => builder.body(axum::body::Body::empty()),
        };
        let request = request.unwrap_or_else(|err| panic!("failed to build request: {err}"));
        match router.oneshot(request).await {
            Ok(response) => response,
            Err(err) => panic!("router request failed: {err}"),
        }
    }

    #[tokio::test]
    async fn health_endpoint_reports_ok() {
        let router = test_router(unique_temp_db_path());
        let response = send(router, "GET", "/v1/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let value = response_json(response).await;
        assert_eq!(
            value.get("service_contract_version").and_then(serde_json::Value::as_str),
            Some(SERVICE_CONTRACT_VERSION)
        );
        assert_eq!(
            value.get("api_contract_version").and_then(serde_json::Value::as_str),
            Some(API_CONTRACT_VERSION)
        );
    }

    #[tokio::test]
    async fn openapi_endpoint_returns_versioned_artifact() {
        let router = test_router(unique_temp_db_path());
        let response = send(router, "GET", "/v1/openapi", None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = match to_bytes(response.into_body(), 1024 * 1024).await {
            Ok(bytes) => bytes,
            Err(err) => panic!("failed to read response body: {err}"),
        };
        let body = match String::from_utf8(bytes.to_vec()) {
            Ok(body) => body,
            Err(err) => panic!("response body is not UTF-8: {err}"),
        };
        assert!(body.contains("openapi: 3.1.0"));
        assert!(body.contains("version: service.v1"));
        assert!(body.contains("/v1/items/{id}/use"));
        assert!(body.contains("/v1/locations/reorder"));
    }

    #[tokio::test]
    async fn item_create_list_and_filter_flow() {
        let db_path = unique_temp_db_path();
        let router = test_router(db_path.clone());

        let create = send(
            router.clone(),
            "POST",
            "/v1/items",
            Some(serde_json::json!({
                "title": "Smoked salmon",
                "category": "Fish",
                "quantity": 2.0,
                "unit": "g"
            })),
        )
        .await;
        assert_eq!(create.status(), StatusCode::OK);
        let created = response_json(create).await;
        assert_eq!(
            created.pointer("/data/category").and_then(serde_json::Value::as_str),
            Some("Fish")
        );
        assert_eq!(
            created.pointer("/data/expiry_status").and_then(serde_json::Value::as_str),
            Some("none")
        );

        let listed = send(router.clone(), "GET", "/v1/items?search=salmon", None).await;
        assert_eq!(listed.status(), StatusCode::OK);
        let listed = response_json(listed).await;
        let rows = match listed.pointer("/data").and_then(serde_json::Value::as_array) {
            Some(rows) => rows,
            None => panic!("expected data array, got {listed}"),
        };
        assert_eq!(rows.len(), 1);

        let missed = send(router.clone(), "GET", "/v1/items?search=herring", None).await;
        let missed = response_json(missed).await;
        assert_eq!(
            missed.pointer("/data").and_then(serde_json::Value::as_array).map(Vec::len),
            Some(0)
        );

        let _ = std::fs::remove_file(&db_path);
    }

    #[tokio::test]
    async fn validation_and_lookup_errors_map_to_400_and_404() {
        let db_path = unique_temp_db_path();
        let router = test_router(db_path.clone());

        let rejected = send(
            router.clone(),
            "POST",
            "/v1/items",
            Some(serde_json::json!({ "title": "   " })),
        )
        .await;
        assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
        let rejected = response_json(rejected).await;
        assert!(rejected.get("error").and_then(serde_json::Value::as_str).is_some());

        let missing_uri = format!("/v1/items/{}", Ulid::new());
        let missing = send(router.clone(), "GET", &missing_uri, None).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let bad_id = send(router, "GET", "/v1/items/not-a-ulid", None).await;
        assert_eq!(bad_id.status(), StatusCode::BAD_REQUEST);

        let _ = std::fs::remove_file(&db_path);
    }

    #[tokio::test]
    async fn use_flow_records_consumption_and_clamps_quantity() {
        let db_path = unique_temp_db_path();
        let router = test_router(db_path.clone());

        let create = send(
            router.clone(),
            "POST",
            "/v1/items",
            Some(serde_json::json!({ "title": "Milk", "quantity": 1.0, "unit": "L" })),
        )
        .await;
        let created = response_json(create).await;
        let id = match created.pointer("/data/id").and_then(serde_json::Value::as_str) {
            Some(id) => id.to_string(),
            None => panic!("missing data.id in response: {created}"),
        };

        let use_uri = format!("/v1/items/{id}/use");
        let used = send(
            router.clone(),
            "POST",
            &use_uri,
            Some(serde_json::json!({ "amount": 2.0, "notes": "porridge" })),
        )
        .await;
        assert_eq!(used.status(), StatusCode::OK);
        let used = response_json(used).await;
        assert_eq!(
            used.pointer("/data/quantity").and_then(serde_json::Value::as_f64),
            Some(0.0)
        );

        let history = send(router.clone(), "GET", "/v1/consumption?days=1", None).await;
        let history = response_json(history).await;
        let rows = match history.pointer("/data").and_then(serde_json::Value::as_array) {
            Some(rows) => rows,
            None => panic!("expected data array, got {history}"),
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("action").and_then(serde_json::Value::as_str), Some("used"));
        assert_eq!(rows[0].get("quantity").and_then(serde_json::Value::as_f64), Some(2.0));

        // A missing item yields a null body, not an error.
        let ghost_uri = format!("/v1/items/{}/use", Ulid::new());
        let ghost = send(router, "POST", &ghost_uri, Some(serde_json::json!({}))).await;
        assert_eq!(ghost.status(), StatusCode::OK);
        let ghost = response_json(ghost).await;
        assert!(ghost.pointer("/data").is_some_and(serde_json::Value::is_null));

        let _ = std::fs::remove_file(&db_path);
    }

    #[tokio::test]
    async fn location_reorder_and_counts_flow() {
        let db_path = unique_temp_db_path();
        let router = test_router(db_path.clone());

        let create = send(
            router.clone(),
            "POST",
            "/v1/locations",
            Some(serde_json::json!({ "name": "Garage Freezer", "kind": "freezer" })),
        )
        .await;
        assert_eq!(create.status(), StatusCode::OK);
        let created = response_json(create).await;
        let garage_id = match created.pointer("/data/id").and_then(serde_json::Value::as_str) {
            Some(id) => id.to_string(),
            None => panic!("missing data.id in response: {created}"),
        };

        let listed = send(router.clone(), "GET", "/v1/locations", None).await;
        let listed = response_json(listed).await;
        let rows = match listed.pointer("/data").and_then(serde_json::Value::as_array) {
            Some(rows) => rows.clone(),
            None => panic!("expected data array, got {listed}"),
        };
        assert_eq!(rows.len(), 2);
        let seeded_id = match rows
            .iter()
            .filter_map(|row| row.get("id").and_then(serde_json::Value::as_str))
            .find(|id| *id != garage_id)
        {
            Some(id) => id.to_string(),
            None => panic!("seeded freezer should exist"),
        };

        let reordered = send(
            router.clone(),
            "POST",
            "/v1/locations/reorder",
            Some(serde_json::json!({ "ids": [garage_id, seeded_id] })),
        )
        .await;
        assert_eq!(reordered.status(), StatusCode::OK);
        let reordered = response_json(reordered).await;
        assert_eq!(
            reordered.pointer("/data/0/id").and_then(serde_json::Value::as_str),
            Some(garage_id.as_str())
        );

        let counts = send(router, "GET", "/v1/locations/counts", None).await;
        assert_eq!(counts.status(), StatusCode::OK);
        let counts = response_json(counts).await;
        assert_eq!(
            counts.pointer("/data").and_then(serde_json::Value::as_array).map(Vec::len),
            Some(2)
        );

        let _ = std::fs::remove_file(&db_path);
    }

    #[tokio::test]
    async fn stats_route_reports_expiring_soon() {
        let db_path = unique_temp_db_path();
        let router = test_router(db_path.clone());

        let soon = (InventoryApi::today() + time::Duration::days(2)).to_string();
        let create = send(
            router.clone(),
            "POST",
            "/v1/items",
            Some(serde_json::json!({ "title": "Chicken", "expires_on": soon })),
        )
        .await;
        assert_eq!(create.status(), StatusCode::OK);

        let stats = send(router, "GET", "/v1/stats", None).await;
        assert_eq!(stats.status(), StatusCode::OK);
        let stats = response_json(stats).await;
        assert_eq!(stats.pointer("/data/total_items").and_then(serde_json::Value::as_i64), Some(1));
        assert_eq!(
            stats.pointer("/data/expiring_soon").and_then(serde_json::Value::as_i64),
            Some(1)
        );

        let _ = std::fs::remove_file(&db_path);
    }
}
