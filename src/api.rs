//! REST API for the stowage service.
//!
//! The engine is stateless between calls: every request carries the full
//! current world state (containers plus items with their placements) and
//! every response returns the new state for the caller to persist. Uses
//! Axum as the web framework and supports CORS.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use utoipa::{OpenApi, ToSchema};

use crate::config::{ApiConfig, EngineConfig};
use crate::model::{Container, Item, ItemLocation, ValidationError, WasteReason, WasteRecord};
use crate::placement::{PlaceEvent, optimize_placement};
use crate::retrieval::{Action, plan_retrieval};
use crate::simulation::{
    advance, assign_undocking_container, complete_undocking, expiring_within, record_retrieval,
};
use crate::space::{FleetIndex, StateError};
use crate::types::{BoundingBox, Vec3};
use crate::waste::{WasteCandidate, select_waste};

#[derive(Clone)]
struct ApiState {
    engine: EngineConfig,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

// SRI hashes verified against https://unpkg.com/swagger-ui-dist@5.17.14/ on 2025-10-29.
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>stow-it-right API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-standalone-preset.js"
            integrity="sha384-2YH8WDRaj7V2OqU/trsmzSagmk/E2SutiCsGkdgoQwC9pNUJV1u/141DHB6jgs8t"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                const ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                    presets: [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset],
                    layout: "StandaloneLayout",
                });
                window.ui = ui;
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

fn default_usage_limit() -> u32 {
    100
}

/// One cargo item on the wire, placed or not.
#[derive(Clone, Serialize, Deserialize, ToSchema)]
pub struct ItemDto {
    #[serde(rename = "itemId")]
    pub item_id: String,
    pub name: String,
    pub width: f64,
    pub depth: f64,
    pub height: f64,
    pub priority: u32,
    #[serde(rename = "expiryDate", default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<DateTime<Utc>>,
    #[serde(rename = "usageLimit", default = "default_usage_limit")]
    pub usage_limit: u32,
    #[serde(rename = "preferredZone", default, skip_serializing_if = "Option::is_none")]
    pub preferred_zone: Option<String>,
    #[serde(rename = "containerId", default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<BoundingBox>,
}

impl ItemDto {
    fn into_item(self) -> Result<Item, ValidationError> {
        let mut item = Item::new(
            self.item_id,
            self.name,
            Vec3::new(self.width, self.depth, self.height),
            self.priority,
            self.expiry_date,
            self.usage_limit,
            self.preferred_zone,
        )?;
        match (self.container_id, self.position) {
            (Some(container_id), Some(position)) => {
                if !position.is_well_formed() {
                    return Err(ValidationError::InvalidBox(format!(
                        "item {} position has end <= start",
                        item.id
                    )));
                }
                item.location = Some(ItemLocation {
                    container_id,
                    boxed: position,
                });
            }
            (None, None) => {}
            _ => {
                return Err(ValidationError::InvalidBox(format!(
                    "item {} must carry containerId and position together or neither",
                    item.id
                )));
            }
        }
        Ok(item)
    }

    fn from_item(item: &Item) -> Self {
        Self {
            item_id: item.id.clone(),
            name: item.name.clone(),
            width: item.dims.x,
            depth: item.dims.y,
            height: item.dims.z,
            priority: item.priority,
            expiry_date: item.expiry,
            usage_limit: item.usage_limit,
            preferred_zone: item.preferred_zone.clone(),
            container_id: item.location.as_ref().map(|l| l.container_id.clone()),
            position: item.location.as_ref().map(|l| l.boxed),
        }
    }
}

/// One storage container on the wire.
#[derive(Clone, Serialize, Deserialize, ToSchema)]
pub struct ContainerDto {
    #[serde(rename = "containerId")]
    pub container_id: String,
    pub zone: String,
    pub width: f64,
    pub depth: f64,
    pub height: f64,
}

impl ContainerDto {
    fn into_container(self) -> Result<Container, ValidationError> {
        Container::new(
            self.container_id,
            self.zone,
            Vec3::new(self.width, self.depth, self.height),
        )
    }
}

/// The full world state a request carries.
struct World {
    items: Vec<Item>,
    containers: Vec<Container>,
}

fn parse_world(
    items: Vec<ItemDto>,
    containers: Vec<ContainerDto>,
) -> Result<World, ValidationError> {
    Ok(World {
        items: items
            .into_iter()
            .map(ItemDto::into_item)
            .collect::<Result<Vec<_>, _>>()?,
        containers: containers
            .into_iter()
            .map(ContainerDto::into_container)
            .collect::<Result<Vec<_>, _>>()?,
    })
}

#[derive(Deserialize, ToSchema)]
pub struct PlacementRequest {
    pub items: Vec<ItemDto>,
    pub containers: Vec<ContainerDto>,
}

#[derive(Serialize, ToSchema)]
pub struct PlacementDto {
    #[serde(rename = "itemId")]
    pub item_id: String,
    #[serde(rename = "containerId")]
    pub container_id: String,
    pub position: BoundingBox,
}

#[derive(Serialize, ToSchema)]
pub struct PlacementResponse {
    pub placements: Vec<PlacementDto>,
    pub unplaced: Vec<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct RetrievalPlanRequest {
    #[serde(rename = "itemId")]
    pub item_id: String,
    pub items: Vec<ItemDto>,
    pub containers: Vec<ContainerDto>,
}

#[derive(Serialize, ToSchema)]
pub struct StepDto {
    pub step: usize,
    pub action: Action,
    #[serde(rename = "itemId")]
    pub item_id: String,
    #[serde(rename = "itemName")]
    pub item_name: String,
}

#[derive(Serialize, ToSchema)]
pub struct RetrievalPlanResponse {
    pub found: bool,
    pub steps: Vec<StepDto>,
}

#[derive(Deserialize, ToSchema)]
pub struct ReturnPlanRequest {
    pub items: Vec<ItemDto>,
    pub containers: Vec<ContainerDto>,
    #[serde(rename = "maxVolume")]
    pub max_volume: f64,
    #[serde(rename = "undockingContainerId", default)]
    pub undocking_container_id: Option<String>,
    /// Simulation time; defaults to the server clock.
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
}

#[derive(Serialize, ToSchema)]
pub struct ReturnItemDto {
    #[serde(rename = "itemId")]
    pub item_id: String,
    pub name: String,
    #[serde(rename = "sourceContainerId")]
    pub source_container_id: String,
    pub reason: WasteReason,
}

#[derive(Serialize, ToSchema)]
pub struct ReturnPlanResponse {
    #[serde(rename = "returnItems")]
    pub return_items: Vec<ReturnItemDto>,
    #[serde(rename = "totalVolume")]
    pub total_volume: f64,
}

#[derive(Deserialize, ToSchema)]
pub struct SimulationAdvanceRequest {
    pub items: Vec<ItemDto>,
    /// Simulation time; defaults to the server clock.
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
}

#[derive(Clone, Serialize, Deserialize, ToSchema)]
pub struct WasteRecordDto {
    #[serde(rename = "itemId")]
    pub item_id: String,
    pub name: String,
    pub reason: WasteReason,
    #[serde(rename = "sourceContainerId")]
    pub source_container_id: String,
    #[serde(
        rename = "undockingContainerId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub undocking_container_id: Option<String>,
}

impl WasteRecordDto {
    fn from_record(record: &WasteRecord) -> Self {
        Self {
            item_id: record.item_id.clone(),
            name: record.name.clone(),
            reason: record.reason,
            source_container_id: record.source_container_id.clone(),
            undocking_container_id: record.undocking_container_id.clone(),
        }
    }

    fn into_record(self) -> WasteRecord {
        WasteRecord {
            item_id: self.item_id,
            name: self.name,
            reason: self.reason,
            source_container_id: self.source_container_id,
            undocking_container_id: self.undocking_container_id,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct RetrieveRequest {
    #[serde(rename = "itemId")]
    pub item_id: String,
    pub items: Vec<ItemDto>,
}

#[derive(Serialize, ToSchema)]
pub struct RetrieveResponse {
    pub found: bool,
    pub items: Vec<ItemDto>,
    #[serde(rename = "wasteRecord", skip_serializing_if = "Option::is_none")]
    pub waste_record: Option<WasteRecordDto>,
}

#[derive(Deserialize, ToSchema)]
pub struct CompleteUndockingRequest {
    #[serde(rename = "undockingContainerId")]
    pub undocking_container_id: String,
    pub items: Vec<ItemDto>,
    #[serde(rename = "wasteRecords")]
    pub waste_records: Vec<WasteRecordDto>,
}

#[derive(Serialize, ToSchema)]
pub struct CompleteUndockingResponse {
    #[serde(rename = "itemsRemoved")]
    pub items_removed: usize,
    pub items: Vec<ItemDto>,
    #[serde(rename = "wasteRecords")]
    pub waste_records: Vec<WasteRecordDto>,
}

#[derive(Serialize, ToSchema)]
pub struct ExpiringItemDto {
    #[serde(rename = "itemId")]
    pub item_id: String,
    pub name: String,
    #[serde(rename = "expiryDate")]
    pub expiry_date: DateTime<Utc>,
    #[serde(rename = "daysUntilExpiry")]
    pub days_until_expiry: i64,
}

#[derive(Serialize, ToSchema)]
pub struct SimulationAdvanceResponse {
    pub items: Vec<ItemDto>,
    #[serde(rename = "wasteRecords")]
    pub waste_records: Vec<WasteRecordDto>,
    #[serde(rename = "expiringSoon")]
    pub expiring_soon: Vec<ExpiringItemDto>,
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        err.to_string(),
    )
}

fn validation_error(err: ValidationError) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid input data",
        err.to_string(),
    )
}

fn state_error(err: StateError) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Inconsistent placement state",
        err.to_string(),
    )
}

fn unwrap_payload<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(err) => Err(json_deserialize_error(err)),
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handle_placement,
        handle_placement_stream,
        handle_retrieval_plan,
        handle_retrieve,
        handle_return_plan,
        handle_complete_undocking,
        handle_simulation_advance
    ),
    components(schemas(
        ItemDto,
        ContainerDto,
        PlacementRequest,
        PlacementDto,
        PlacementResponse,
        RetrievalPlanRequest,
        StepDto,
        RetrievalPlanResponse,
        RetrieveRequest,
        RetrieveResponse,
        ReturnPlanRequest,
        ReturnItemDto,
        ReturnPlanResponse,
        CompleteUndockingRequest,
        CompleteUndockingResponse,
        SimulationAdvanceRequest,
        WasteRecordDto,
        ExpiringItemDto,
        SimulationAdvanceResponse,
        ErrorResponse,
        BoundingBox,
        Vec3,
        Action,
        WasteReason
    )),
    tags((name = "stowage", description = "Placement, retrieval and waste planning endpoints"))
)]
struct ApiDoc;

/// Starts the API server.
///
/// Configures CORS for cross-origin requests. Blocks until the server is
/// terminated.
pub async fn start_api_server(config: ApiConfig, engine: EngineConfig) {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let state = ApiState { engine };

    let app = Router::new()
        .route("/api/placement", post(handle_placement))
        .route("/api/placement/stream", post(handle_placement_stream))
        .route("/api/retrieval-plan", post(handle_retrieval_plan))
        .route("/api/retrieve", post(handle_retrieve))
        .route("/api/waste/return-plan", post(handle_return_plan))
        .route("/api/waste/complete-undocking", post(handle_complete_undocking))
        .route("/api/simulation/advance", post(handle_simulation_advance))
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(state);

    let addr = config.socket_addr();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            panic!("❌ Could not bind API server to {}: {}", addr, err);
        }
    };

    let display_host = config.display_host().to_string();
    println!(
        "🚀 Server running on http://{}:{}",
        display_host,
        config.port()
    );
    if config.binds_to_all_interfaces() {
        println!("💡 Local access: http://localhost:{}", config.port());
    }
    println!("📦 API Endpoints:");
    println!("   - POST /api/placement");
    println!("   - POST /api/placement/stream");
    println!("   - POST /api/retrieval-plan");
    println!("   - POST /api/retrieve");
    println!("   - POST /api/waste/return-plan");
    println!("   - POST /api/waste/complete-undocking");
    println!("   - POST /api/simulation/advance");
    println!("📑 Documentation:");
    println!("   - GET /docs");
    println!("   - GET /docs/openapi.json");

    if let Err(err) = axum::serve(listener, app).await {
        eprintln!("❌ API server terminated with an error: {err}");
    }
}

fn run_placement(
    world: World,
    engine: &EngineConfig,
    on_event: impl FnMut(&PlaceEvent),
) -> Result<PlacementResponse, StateError> {
    let mut fleet = FleetIndex::build(&world.containers, &world.items)?;
    let new_items: Vec<Item> = world
        .items
        .into_iter()
        .filter(|item| item.location.is_none())
        .collect();

    let scorer = engine.scorer();
    let outcome = optimize_placement(&new_items, &mut fleet, &scorer, Utc::now(), on_event);

    Ok(PlacementResponse {
        placements: outcome
            .placements
            .into_iter()
            .map(|p| PlacementDto {
                item_id: p.item_id,
                container_id: p.container_id,
                position: p.boxed,
            })
            .collect(),
        unplaced: outcome.unplaced,
    })
}

/// Handler for POST /api/placement.
///
/// Places every not-yet-placed item of the supplied world state into the
/// supplied containers. Items that fit nowhere come back in `unplaced`;
/// that is a normal partial outcome, not an error.
#[utoipa::path(
    post,
    path = "/api/placement",
    request_body = PlacementRequest,
    responses(
        (status = 200, description = "Batch placed", body = PlacementResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid input or inconsistent placement state",
            body = ErrorResponse
        )
    ),
    tag = "stowage"
)]
async fn handle_placement(
    State(state): State<ApiState>,
    payload: Result<Json<PlacementRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match unwrap_payload(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    println!(
        "📥 New placement request: {} items, {} containers",
        request.items.len(),
        request.containers.len()
    );

    let world = match parse_world(request.items, request.containers) {
        Ok(world) => world,
        Err(err) => return validation_error(err),
    };

    match run_placement(world, &state.engine, |_| {}) {
        Ok(response) => {
            println!(
                "📦 Result: {} placed, {} unplaced",
                response.placements.len(),
                response.unplaced.len()
            );
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => state_error(err),
    }
}

/// Handler for POST /api/placement/stream (SSE).
///
/// Streams placement events in real-time as Server-Sent Events so a
/// client can visualize progress without waiting for the full result.
#[utoipa::path(
    post,
    path = "/api/placement/stream",
    request_body = PlacementRequest,
    responses(
        (
            status = 200,
            description = "Streams placement events in real-time",
            content_type = "text/event-stream",
            body = String
        ),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid input or inconsistent placement state",
            body = ErrorResponse
        )
    ),
    tag = "stowage"
)]
async fn handle_placement_stream(
    State(state): State<ApiState>,
    payload: Result<Json<PlacementRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match unwrap_payload(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let world = match parse_world(request.items, request.containers) {
        Ok(world) => world,
        Err(err) => return validation_error(err),
    };

    let engine = state.engine.clone();
    let (tx, rx) = mpsc::channel::<String>(32);

    tokio::task::spawn_blocking(move || {
        let result = run_placement(world, &engine, |evt| {
            if let Ok(json) = serde_json::to_string(evt) {
                // A closed receiver just means the client went away.
                let _ = tx.blocking_send(json);
            }
        });
        if let Err(err) = result {
            eprintln!("❌ Streaming placement aborted: {err}");
        }
    });

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

/// Handler for POST /api/retrieval-plan.
///
/// Computes the ordered remove/setAside/retrieve/placeBack steps needed
/// to reach one item. An unplaced or unknown target yields `found: false`
/// with no steps (HTTP 200), not an error.
#[utoipa::path(
    post,
    path = "/api/retrieval-plan",
    request_body = RetrievalPlanRequest,
    responses(
        (status = 200, description = "Retrieval plan", body = RetrievalPlanResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid input or inconsistent placement state",
            body = ErrorResponse
        )
    ),
    tag = "stowage"
)]
async fn handle_retrieval_plan(
    State(_state): State<ApiState>,
    payload: Result<Json<RetrievalPlanRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match unwrap_payload(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let target_id = request.item_id.clone();
    let world = match parse_world(request.items, request.containers) {
        Ok(world) => world,
        Err(err) => return validation_error(err),
    };

    let fleet = match FleetIndex::build(&world.containers, &world.items) {
        Ok(fleet) => fleet,
        Err(err) => return state_error(err),
    };

    let target_container = world
        .items
        .iter()
        .find(|item| item.id == target_id)
        .and_then(|item| item.location.as_ref())
        .map(|location| location.container_id.clone());

    let plan = target_container
        .as_deref()
        .and_then(|container_id| fleet.space(container_id))
        .and_then(|space| plan_retrieval(space, &target_id));

    let response = match plan {
        Some(plan) => {
            let name_of = |id: &str| {
                world
                    .items
                    .iter()
                    .find(|item| item.id == id)
                    .map(|item| item.name.clone())
                    .unwrap_or_default()
            };
            RetrievalPlanResponse {
                found: true,
                steps: plan
                    .steps
                    .iter()
                    .enumerate()
                    .map(|(i, step)| StepDto {
                        step: i + 1,
                        action: step.action,
                        item_id: step.item_id.clone(),
                        item_name: name_of(&step.item_id),
                    })
                    .collect(),
            }
        }
        None => RetrievalPlanResponse {
            found: false,
            steps: Vec::new(),
        },
    };

    (StatusCode::OK, Json(response)).into_response()
}

/// Handler for POST /api/waste/return-plan.
///
/// Reclassifies depleted/expired items as waste, then selects the subset
/// fitting the return-shipment volume budget. An empty selection is a
/// normal outcome.
#[utoipa::path(
    post,
    path = "/api/waste/return-plan",
    request_body = ReturnPlanRequest,
    responses(
        (status = 200, description = "Return plan under the volume budget", body = ReturnPlanResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid input",
            body = ErrorResponse
        )
    ),
    tag = "stowage"
)]
async fn handle_return_plan(
    State(state): State<ApiState>,
    payload: Result<Json<ReturnPlanRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match unwrap_payload(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    if !(request.max_volume.is_finite() && request.max_volume >= 0.0) {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Invalid input data",
            format!("maxVolume must be a non-negative number, got: {}", request.max_volume),
        );
    }

    let now = request.now.unwrap_or_else(Utc::now);
    let world = match parse_world(request.items, request.containers) {
        Ok(world) => world,
        Err(err) => return validation_error(err),
    };
    if let Err(err) = FleetIndex::build(&world.containers, &world.items) {
        return state_error(err);
    }
    let mut items = world.items;

    let mut records = advance(&mut items, now);
    if let Some(undocking_id) = &request.undocking_container_id {
        assign_undocking_container(&mut records, undocking_id);
    }

    let candidates: Vec<WasteCandidate> = records
        .iter()
        .filter_map(|record| {
            items
                .iter()
                .find(|item| item.id == record.item_id)
                .map(|item| WasteCandidate::from_record(record, item))
        })
        .collect();

    let selection = select_waste(&candidates, request.max_volume, state.engine.waste_policy());
    println!(
        "🗑️ Return plan: {} of {} waste items within volume {}",
        selection.selected.len(),
        candidates.len(),
        request.max_volume
    );

    let response = ReturnPlanResponse {
        return_items: selection
            .selected
            .into_iter()
            .map(|c| ReturnItemDto {
                item_id: c.item_id,
                name: c.name,
                source_container_id: c.source_container_id,
                reason: c.reason,
            })
            .collect(),
        total_volume: selection.total_volume,
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// Handler for POST /api/simulation/advance.
///
/// Moves simulation time to `now`, reclassifies depleted/expired items as
/// waste and returns the updated item set plus an expiry lookahead.
#[utoipa::path(
    post,
    path = "/api/simulation/advance",
    request_body = SimulationAdvanceRequest,
    responses(
        (status = 200, description = "Updated world state", body = SimulationAdvanceResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid input",
            body = ErrorResponse
        )
    ),
    tag = "stowage"
)]
async fn handle_simulation_advance(
    State(state): State<ApiState>,
    payload: Result<Json<SimulationAdvanceRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match unwrap_payload(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let now = request.now.unwrap_or_else(Utc::now);
    let mut items = match request
        .items
        .into_iter()
        .map(ItemDto::into_item)
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(items) => items,
        Err(err) => return validation_error(err),
    };

    let records = advance(&mut items, now);
    let expiring = expiring_within(&items, now, state.engine.expiring_lookahead_days());
    println!(
        "⏱️ Simulation advance: {} new waste records, {} items expiring soon",
        records.len(),
        expiring.len()
    );

    let response = SimulationAdvanceResponse {
        items: items.iter().map(ItemDto::from_item).collect(),
        waste_records: records.iter().map(WasteRecordDto::from_record).collect(),
        expiring_soon: expiring
            .into_iter()
            .map(|e| ExpiringItemDto {
                item_id: e.item_id,
                name: e.name,
                expiry_date: e.expiry,
                days_until_expiry: e.days_until,
            })
            .collect(),
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// Handler for POST /api/retrieve.
///
/// Records one physical retrieval of an item: remaining uses drop by
/// one; consuming the last use clears the placement and yields a
/// depletion waste record. An unknown item id yields `found: false`.
#[utoipa::path(
    post,
    path = "/api/retrieve",
    request_body = RetrieveRequest,
    responses(
        (status = 200, description = "Updated item set after the retrieval", body = RetrieveResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid input",
            body = ErrorResponse
        )
    ),
    tag = "stowage"
)]
async fn handle_retrieve(
    State(_state): State<ApiState>,
    payload: Result<Json<RetrieveRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match unwrap_payload(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let mut items = match request
        .items
        .into_iter()
        .map(ItemDto::into_item)
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(items) => items,
        Err(err) => return validation_error(err),
    };

    let (found, record) = match items.iter_mut().find(|item| item.id == request.item_id) {
        Some(item) => (true, record_retrieval(item)),
        None => (false, None),
    };
    println!(
        "📤 Retrieval of {}: found={}, depleted={}",
        request.item_id,
        found,
        record.is_some()
    );

    let response = RetrieveResponse {
        found,
        items: items.iter().map(ItemDto::from_item).collect(),
        waste_record: record.as_ref().map(WasteRecordDto::from_record),
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// Handler for POST /api/waste/complete-undocking.
///
/// Clears every waste record assigned to the undocked container and
/// drops the corresponding items from the active set.
#[utoipa::path(
    post,
    path = "/api/waste/complete-undocking",
    request_body = CompleteUndockingRequest,
    responses(
        (status = 200, description = "World state after undocking", body = CompleteUndockingResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid input",
            body = ErrorResponse
        )
    ),
    tag = "stowage"
)]
async fn handle_complete_undocking(
    State(_state): State<ApiState>,
    payload: Result<Json<CompleteUndockingRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match unwrap_payload(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let mut items = match request
        .items
        .into_iter()
        .map(ItemDto::into_item)
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(items) => items,
        Err(err) => return validation_error(err),
    };
    let mut records: Vec<WasteRecord> = request
        .waste_records
        .into_iter()
        .map(WasteRecordDto::into_record)
        .collect();

    let removed = complete_undocking(&mut items, &mut records, &request.undocking_container_id);
    println!(
        "🚢 Undocking {} complete: {} items removed",
        request.undocking_container_id, removed
    );

    let response = CompleteUndockingResponse {
        items_removed: removed,
        items: items.iter().map(ItemDto::from_item).collect(),
        waste_records: records.iter().map(WasteRecordDto::from_record).collect(),
    };
    (StatusCode::OK, Json(response)).into_response()
}

async fn serve_openapi_json(State(_state): State<ApiState>) -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui(State(_state): State<ApiState>) -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_doc_lists_expected_paths() {
        let doc = openapi_doc();
        let paths = &doc.paths.paths;
        for path in [
            "/api/placement",
            "/api/placement/stream",
            "/api/retrieval-plan",
            "/api/retrieve",
            "/api/waste/return-plan",
            "/api/waste/complete-undocking",
            "/api/simulation/advance",
        ] {
            assert!(
                paths.contains_key(path),
                "OpenAPI documentation is missing the {} path",
                path
            );
        }
    }

    #[test]
    fn openapi_doc_contains_key_schemas() {
        let doc = openapi_doc();
        let components = doc
            .components
            .as_ref()
            .expect("OpenAPI documentation contains no components");
        let schemas = &components.schemas;
        for name in ["PlacementRequest", "RetrievalPlanResponse", "ReturnPlanResponse"] {
            assert!(
                schemas.contains_key(name),
                "Expected schema '{}' is missing from OpenAPI spec",
                name
            );
        }
    }

    #[test]
    fn item_dto_parses_minimal_fields() {
        let json = r#"{
            "itemId": "000001",
            "name": "Food Packet",
            "width": 10.0,
            "depth": 10.0,
            "height": 20.0,
            "priority": 80
        }"#;
        let dto: ItemDto = serde_json::from_str(json).expect("Should parse valid JSON");
        assert_eq!(dto.usage_limit, 100, "usageLimit should default when omitted");
        assert!(dto.expiry_date.is_none());
        assert!(dto.preferred_zone.is_none());

        let item = dto.into_item().expect("Should validate");
        assert!(item.location.is_none());
    }

    #[test]
    fn item_dto_parses_placed_item() {
        let json = r#"{
            "itemId": "000002",
            "name": "First Aid",
            "width": 2.0,
            "depth": 2.0,
            "height": 2.0,
            "priority": 95,
            "preferredZone": "Medical_Bay",
            "containerId": "C1",
            "position": {
                "startCoordinates": {"width": 0.0, "depth": 0.0, "height": 0.0},
                "endCoordinates": {"width": 2.0, "depth": 2.0, "height": 2.0}
            }
        }"#;
        let item: Item = serde_json::from_str::<ItemDto>(json)
            .unwrap()
            .into_item()
            .unwrap();
        let location = item.location.expect("placement should survive parsing");
        assert_eq!(location.container_id, "C1");
        assert_eq!(location.boxed.end, Vec3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn item_dto_rejects_position_without_container() {
        let json = r#"{
            "itemId": "000003",
            "name": "Loose",
            "width": 1.0,
            "depth": 1.0,
            "height": 1.0,
            "priority": 1,
            "position": {
                "startCoordinates": {"width": 0.0, "depth": 0.0, "height": 0.0},
                "endCoordinates": {"width": 1.0, "depth": 1.0, "height": 1.0}
            }
        }"#;
        let err = serde_json::from_str::<ItemDto>(json)
            .unwrap()
            .into_item()
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidBox(_)));
    }

    #[test]
    fn item_dto_rejects_malformed_position_box() {
        let json = r#"{
            "itemId": "000004",
            "name": "Inverted",
            "width": 1.0,
            "depth": 1.0,
            "height": 1.0,
            "priority": 1,
            "containerId": "C1",
            "position": {
                "startCoordinates": {"width": 2.0, "depth": 0.0, "height": 0.0},
                "endCoordinates": {"width": 1.0, "depth": 1.0, "height": 1.0}
            }
        }"#;
        let err = serde_json::from_str::<ItemDto>(json)
            .unwrap()
            .into_item()
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidBox(_)));
    }

    #[test]
    fn container_dto_validates_dimensions() {
        let json = r#"{"containerId": "C1", "zone": "A", "width": 0.0, "depth": 10.0, "height": 10.0}"#;
        let err = serde_json::from_str::<ContainerDto>(json)
            .unwrap()
            .into_container()
            .unwrap_err();
        assert!(err.to_string().contains("width"));
    }

    #[test]
    fn retrieve_request_consumes_the_last_use() {
        let request: RetrieveRequest = serde_json::from_str(
            r#"{
                "itemId": "I1",
                "items": [
                    {"itemId": "I1", "name": "Ration", "width": 1.0, "depth": 1.0,
                     "height": 1.0, "priority": 5, "usageLimit": 1,
                     "containerId": "C1",
                     "position": {
                         "startCoordinates": {"width": 0.0, "depth": 0.0, "height": 0.0},
                         "endCoordinates": {"width": 1.0, "depth": 1.0, "height": 1.0}
                     }}
                ]
            }"#,
        )
        .unwrap();

        let mut items: Vec<Item> = request
            .items
            .into_iter()
            .map(|dto| dto.into_item().unwrap())
            .collect();
        let item = items
            .iter_mut()
            .find(|item| item.id == request.item_id)
            .unwrap();

        let record = record_retrieval(item).expect("last use should deplete the item");
        assert_eq!(record.source_container_id, "C1");
        assert!(item.location.is_none());

        let dto = WasteRecordDto::from_record(&record);
        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["reason"], "depleted");
        assert!(
            json.get("undockingContainerId").is_none(),
            "unassigned records should omit undockingContainerId"
        );
    }

    #[test]
    fn complete_undocking_request_drops_assigned_items() {
        let request: CompleteUndockingRequest = serde_json::from_str(
            r#"{
                "undockingContainerId": "UNDOCK-1",
                "items": [
                    {"itemId": "W1", "name": "Spent", "width": 1.0, "depth": 1.0,
                     "height": 1.0, "priority": 1, "usageLimit": 0},
                    {"itemId": "KEEP", "name": "Fresh", "width": 1.0, "depth": 1.0,
                     "height": 1.0, "priority": 1}
                ],
                "wasteRecords": [
                    {"itemId": "W1", "name": "Spent", "reason": "depleted",
                     "sourceContainerId": "C1", "undockingContainerId": "UNDOCK-1"}
                ]
            }"#,
        )
        .unwrap();

        let mut items: Vec<Item> = request
            .items
            .into_iter()
            .map(|dto| dto.into_item().unwrap())
            .collect();
        let mut records: Vec<WasteRecord> = request
            .waste_records
            .into_iter()
            .map(WasteRecordDto::into_record)
            .collect();

        let removed = complete_undocking(&mut items, &mut records, &request.undocking_container_id);
        assert_eq!(removed, 1);
        assert!(records.is_empty());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "KEEP");
    }

    #[test]
    fn placement_round_trips_through_the_api_layer() {
        let request: PlacementRequest = serde_json::from_str(
            r#"{
                "containers": [
                    {"containerId": "C1", "zone": "A", "width": 10.0, "depth": 10.0, "height": 10.0}
                ],
                "items": [
                    {"itemId": "I1", "name": "A", "width": 2.0, "depth": 2.0, "height": 2.0, "priority": 5},
                    {"itemId": "I2", "name": "B", "width": 3.0, "depth": 3.0, "height": 3.0, "priority": 3}
                ]
            }"#,
        )
        .unwrap();

        let world = parse_world(request.items, request.containers).unwrap();
        let engine = crate::config::AppConfig::from_env().engine;
        let response = run_placement(world, &engine, |_| {}).unwrap();
        assert_eq!(response.placements.len(), 2);
        assert!(response.unplaced.is_empty());
    }
}
