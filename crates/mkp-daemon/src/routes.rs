//! Axum router and all HTTP handlers for mkp-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Every mutation that succeeds publishes a [`BusMsg`] so
//! `/v1/stream` subscribers see catalog and order changes without polling.

use std::{convert::Infallible, str::FromStr, sync::Arc};

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use mkp_schemas::{ItemId, NewOrder, OrderId};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::info;

use crate::{
    api_types::{
        CheckoutLineView, CheckoutRequest, CheckoutResponse, CreateItemRequest, ErrorResponse,
        HealthResponse, ItemListResponse, ItemView, OrderListResponse, OrderView,
        SetStatusRequest, UpdateItemRequest,
    },
    error::ApiError,
    state::{AppState, BusMsg},
};

type ApiResult<T> = Result<T, ApiError>;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/stream", get(stream))
        .route("/v1/catalog/items", get(list_items).post(add_item))
        .route(
            "/v1/catalog/items/:id",
            get(get_item).patch(update_item).delete(delete_item),
        )
        .route("/v1/orders", get(list_orders).post(place_order))
        .route("/v1/orders/checkout", post(checkout))
        .route("/v1/orders/by-phone/:phone", get(find_by_phone))
        .route("/v1/orders/:id", get(get_order).delete(delete_order))
        .route("/v1/orders/:id/status", post(set_status))
        .with_state(state)
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(v)| v)
        .map_err(|rej| ApiError::bad_request("body", rej.body_text()))
}

fn item_id(raw: &str) -> ApiResult<ItemId> {
    ItemId::from_str(raw).map_err(|e| ApiError::bad_request("item_id", e.to_string()))
}

fn order_id(raw: &str) -> ApiResult<OrderId> {
    OrderId::from_str(raw).map_err(|e| ApiError::bad_request("order_id", e.to_string()))
}

fn order_view(st: &AppState, order: mkp_schemas::Order) -> OrderView {
    OrderView::new(order, &st.market.delivery_estimates())
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
            backend: st.market.backend_name(),
            config_hash: st.config_hash.clone(),
        }),
    )
}

// ---------------------------------------------------------------------------
// /v1/catalog/items
// ---------------------------------------------------------------------------

pub(crate) async fn list_items(State(st): State<Arc<AppState>>) -> ApiResult<Json<ItemListResponse>> {
    let items = st.market.list_items().await?;
    Ok(Json(ItemListResponse {
        items: items.into_iter().map(ItemView::from).collect(),
    }))
}

pub(crate) async fn add_item(
    State(st): State<Arc<AppState>>,
    payload: Result<Json<CreateItemRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ItemView>)> {
    let new = body(payload)?.into_new_item()?;
    let item = st.market.add_item(new).await?;
    st.publish(BusMsg::Catalog {
        action: "added".to_string(),
        item_id: item.item_id,
    });
    Ok((StatusCode::CREATED, Json(ItemView::from(item))))
}

pub(crate) async fn get_item(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ItemView>> {
    let item = st.market.get_item(item_id(&id)?).await?;
    Ok(Json(ItemView::from(item)))
}

pub(crate) async fn update_item(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateItemRequest>, JsonRejection>,
) -> ApiResult<Json<ItemView>> {
    let id = item_id(&id)?;
    let patch = body(payload)?.into_patch()?;
    let item = st.market.update_item(id, patch).await?;
    st.publish(BusMsg::Catalog {
        action: "updated".to_string(),
        item_id: id,
    });
    Ok(Json(ItemView::from(item)))
}

pub(crate) async fn delete_item(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = item_id(&id)?;
    st.market.delete_item(id).await?;
    st.publish(BusMsg::Catalog {
        action: "deleted".to_string(),
        item_id: id,
    });
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// /v1/orders
// ---------------------------------------------------------------------------

pub(crate) async fn list_orders(State(st): State<Arc<AppState>>) -> ApiResult<Json<OrderListResponse>> {
    let orders = st.market.list_orders().await?;
    Ok(Json(OrderListResponse {
        orders: orders.into_iter().map(|o| order_view(&st, o)).collect(),
    }))
}

pub(crate) async fn place_order(
    State(st): State<Arc<AppState>>,
    payload: Result<Json<NewOrder>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<OrderView>)> {
    let order = st.market.place_order(body(payload)?).await?;
    info!(order_id = %order.order_id, item_id = %order.item_id, "daemon/orders/place");
    st.publish(BusMsg::Order {
        action: "placed".to_string(),
        order_id: order.order_id,
        status: order.status,
    });
    Ok((StatusCode::CREATED, Json(order_view(&st, order))))
}

/// Lines are placed independently; the response reports each one.
pub(crate) async fn checkout(
    State(st): State<Arc<AppState>>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> ApiResult<Json<CheckoutResponse>> {
    let req = body(payload)?;
    if req.lines.is_empty() {
        return Err(ApiError::bad_request("lines", "cart is empty"));
    }

    let outcomes = st.market.checkout(req.customer, req.lines).await;
    let mut lines = Vec::with_capacity(outcomes.len());
    let mut placed = 0;
    for outcome in outcomes {
        let line = outcome.line;
        match outcome.result {
            Ok(order) => {
                placed += 1;
                st.publish(BusMsg::Order {
                    action: "placed".to_string(),
                    order_id: order.order_id,
                    status: order.status,
                });
                lines.push(CheckoutLineView {
                    item_id: line.item_id,
                    quantity: line.quantity,
                    ok: true,
                    order: Some(order_view(&st, order)),
                    error: None,
                });
            }
            Err(e) => lines.push(CheckoutLineView {
                item_id: line.item_id,
                quantity: line.quantity,
                ok: false,
                order: None,
                error: Some(ErrorResponse::from(&e)),
            }),
        }
    }

    let failed = lines.len() - placed;
    info!(placed, failed, "daemon/orders/checkout");
    Ok(Json(CheckoutResponse {
        placed,
        failed,
        lines,
    }))
}

pub(crate) async fn get_order(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<OrderView>> {
    let order = st.market.get_order(order_id(&id)?).await?;
    Ok(Json(order_view(&st, order)))
}

pub(crate) async fn delete_order(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<OrderView>> {
    let order = st.market.delete_order(order_id(&id)?).await?;
    st.publish(BusMsg::Order {
        action: "deleted".to_string(),
        order_id: order.order_id,
        status: order.status,
    });
    Ok(Json(order_view(&st, order)))
}

pub(crate) async fn set_status(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<SetStatusRequest>, JsonRejection>,
) -> ApiResult<Json<OrderView>> {
    let id = order_id(&id)?;
    let req = body(payload)?;
    let order = st.market.set_status(id, &req.status).await?;
    st.publish(BusMsg::Order {
        action: "status".to_string(),
        order_id: order.order_id,
        status: order.status,
    });
    Ok(Json(order_view(&st, order)))
}

pub(crate) async fn find_by_phone(
    State(st): State<Arc<AppState>>,
    Path(phone): Path<String>,
) -> ApiResult<Json<OrderListResponse>> {
    let orders = st.market.find_by_phone(&phone).await?;
    Ok(Json(OrderListResponse {
        orders: orders.into_iter().map(|o| order_view(&st, o)).collect(),
    }))
}

// ---------------------------------------------------------------------------
// GET /v1/stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(m.event_name()).data(data)))
            }
            Err(_) => None, // lagged / closed
        }
    })
}
