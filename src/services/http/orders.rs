use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tokio::sync::oneshot;

use crate::models::orders::{PlaceOrderRequest, UpdateOrderStatusRequest};
use crate::services::orders::OrderRequest;
use crate::services::ServiceError;

use super::{recv, service_unavailable, AppState, Principal};

pub async fn place_order(
    State(state): State<AppState>,
    principal: Principal,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    principal.require_customer()?;

    let (response_tx, response_rx) = oneshot::channel();

    state
        .order_channel
        .send(OrderRequest::Place {
            user_id: principal.user_id,
            instructions: request.instructions,
            response: response_tx,
        })
        .await
        .map_err(service_unavailable)?;
    let details = recv(response_rx).await?;

    Ok((StatusCode::CREATED, Json(details)))
}

/// Orders are visible to their owner only; anyone else gets the same 404 a
/// missing order would produce.
pub async fn get_order(
    State(state): State<AppState>,
    principal: Principal,
    Path(order_id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let (response_tx, response_rx) = oneshot::channel();

    state
        .order_channel
        .send(OrderRequest::GetOrder {
            user_id: principal.user_id,
            order_id,
            response: response_tx,
        })
        .await
        .map_err(service_unavailable)?;
    let details = recv(response_rx).await?;

    Ok(Json(details))
}

pub async fn all_orders(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<impl IntoResponse, ServiceError> {
    principal.require_admin()?;

    let (response_tx, response_rx) = oneshot::channel();

    state
        .order_channel
        .send(OrderRequest::AllOrders {
            response: response_tx,
        })
        .await
        .map_err(service_unavailable)?;
    let orders = recv(response_rx).await?;

    Ok(Json(orders))
}

pub async fn update_order_status(
    State(state): State<AppState>,
    principal: Principal,
    Path(order_id): Path<String>,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    principal.require_admin()?;

    let (response_tx, response_rx) = oneshot::channel();

    state
        .order_channel
        .send(OrderRequest::UpdateStatus {
            order_id,
            new_status: request.new_status,
            response: response_tx,
        })
        .await
        .map_err(service_unavailable)?;
    let change = recv(response_rx).await?;

    Ok(Json(change))
}
