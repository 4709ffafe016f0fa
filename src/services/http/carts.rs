use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use tokio::sync::oneshot;

use crate::models::carts::AddToCartRequest;
use crate::services::carts::CartRequest;
use crate::services::ServiceError;

use super::{recv, service_unavailable, AppState, Principal};

pub async fn add_to_cart(
    State(state): State<AppState>,
    principal: Principal,
    Json(item): Json<AddToCartRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    principal.require_customer()?;

    let (response_tx, response_rx) = oneshot::channel();

    state
        .cart_channel
        .send(CartRequest::AddItem {
            user_id: principal.user_id,
            item,
            response: response_tx,
        })
        .await
        .map_err(service_unavailable)?;
    let details = recv(response_rx).await?;

    Ok((StatusCode::CREATED, Json(details)))
}

pub async fn view_cart(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<impl IntoResponse, ServiceError> {
    principal.require_customer()?;

    let (response_tx, response_rx) = oneshot::channel();

    state
        .cart_channel
        .send(CartRequest::ViewCart {
            user_id: principal.user_id,
            response: response_tx,
        })
        .await
        .map_err(service_unavailable)?;
    let view = recv(response_rx).await?;

    Ok(Json(view))
}

/// Clearing an absent or already-empty cart is a no-op success, not an
/// error.
pub async fn clear_cart(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<impl IntoResponse, ServiceError> {
    principal.require_customer()?;

    let (response_tx, response_rx) = oneshot::channel();

    state
        .cart_channel
        .send(CartRequest::Clear {
            user_id: principal.user_id,
            response: response_tx,
        })
        .await
        .map_err(service_unavailable)?;
    let removed = recv(response_rx).await?;

    let message = if removed == 0 {
        "Cart is already empty"
    } else {
        "Cart cleared successfully"
    };

    Ok(Json(json!({ "message": message })))
}
