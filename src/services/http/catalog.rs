use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tokio::sync::oneshot;

use crate::models::catalog::{
    FoodItemUpdate, NewExtra, NewFoodItem, NewProtein, NewRating, SetAvailabilityRequest,
};
use crate::services::catalog::CatalogRequest;
use crate::services::ServiceError;

use super::{recv, service_unavailable, AppState, Principal};

pub async fn list_food_items(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let (response_tx, response_rx) = oneshot::channel();

    state
        .catalog_channel
        .send(CatalogRequest::ListFoodItems {
            response: response_tx,
        })
        .await
        .map_err(service_unavailable)?;
    let items = recv(response_rx).await?;

    Ok(Json(items))
}

pub async fn list_proteins(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let (response_tx, response_rx) = oneshot::channel();

    state
        .catalog_channel
        .send(CatalogRequest::ListProteins {
            response: response_tx,
        })
        .await
        .map_err(service_unavailable)?;
    let proteins = recv(response_rx).await?;

    Ok(Json(proteins))
}

pub async fn list_extras(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let (response_tx, response_rx) = oneshot::channel();

    state
        .catalog_channel
        .send(CatalogRequest::ListExtras {
            response: response_tx,
        })
        .await
        .map_err(service_unavailable)?;
    let extras = recv(response_rx).await?;

    Ok(Json(extras))
}

pub async fn list_ratings(
    State(state): State<AppState>,
    Path(food_item_id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let (response_tx, response_rx) = oneshot::channel();

    state
        .catalog_channel
        .send(CatalogRequest::ListRatings {
            food_item_id,
            response: response_tx,
        })
        .await
        .map_err(service_unavailable)?;
    let ratings = recv(response_rx).await?;

    Ok(Json(ratings))
}

pub async fn rate_food_item(
    State(state): State<AppState>,
    principal: Principal,
    Path(food_item_id): Path<String>,
    Json(rating): Json<NewRating>,
) -> Result<impl IntoResponse, ServiceError> {
    principal.require_customer()?;

    let (response_tx, response_rx) = oneshot::channel();

    state
        .catalog_channel
        .send(CatalogRequest::RateFoodItem {
            user_id: principal.user_id,
            food_item_id,
            rating,
            response: response_tx,
        })
        .await
        .map_err(service_unavailable)?;
    let rating = recv(response_rx).await?;

    Ok((StatusCode::CREATED, Json(rating)))
}

pub async fn add_food_item(
    State(state): State<AppState>,
    principal: Principal,
    Json(item): Json<NewFoodItem>,
) -> Result<impl IntoResponse, ServiceError> {
    principal.require_admin()?;

    let (response_tx, response_rx) = oneshot::channel();

    state
        .catalog_channel
        .send(CatalogRequest::AddFoodItem {
            item,
            owner_id: principal.user_id,
            response: response_tx,
        })
        .await
        .map_err(service_unavailable)?;
    let item = recv(response_rx).await?;

    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_food_item(
    State(state): State<AppState>,
    principal: Principal,
    Path(food_item_id): Path<String>,
    Json(update): Json<FoodItemUpdate>,
) -> Result<impl IntoResponse, ServiceError> {
    principal.require_admin()?;

    let (response_tx, response_rx) = oneshot::channel();

    state
        .catalog_channel
        .send(CatalogRequest::UpdateFoodItem {
            food_item_id,
            update,
            response: response_tx,
        })
        .await
        .map_err(service_unavailable)?;
    let item = recv(response_rx).await?;

    Ok(Json(item))
}

pub async fn set_availability(
    State(state): State<AppState>,
    principal: Principal,
    Path(food_item_id): Path<String>,
    Json(request): Json<SetAvailabilityRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    principal.require_admin()?;

    let (response_tx, response_rx) = oneshot::channel();

    state
        .catalog_channel
        .send(CatalogRequest::SetAvailability {
            food_item_id,
            available: request.available,
            response: response_tx,
        })
        .await
        .map_err(service_unavailable)?;
    let item = recv(response_rx).await?;

    Ok(Json(item))
}

pub async fn add_protein(
    State(state): State<AppState>,
    principal: Principal,
    Json(protein): Json<NewProtein>,
) -> Result<impl IntoResponse, ServiceError> {
    principal.require_admin()?;

    let (response_tx, response_rx) = oneshot::channel();

    state
        .catalog_channel
        .send(CatalogRequest::AddProtein {
            protein,
            response: response_tx,
        })
        .await
        .map_err(service_unavailable)?;
    let protein = recv(response_rx).await?;

    Ok((StatusCode::CREATED, Json(protein)))
}

pub async fn add_extra(
    State(state): State<AppState>,
    principal: Principal,
    Json(extra): Json<NewExtra>,
) -> Result<impl IntoResponse, ServiceError> {
    principal.require_admin()?;

    let (response_tx, response_rx) = oneshot::channel();

    state
        .catalog_channel
        .send(CatalogRequest::AddExtra {
            extra,
            response: response_tx,
        })
        .await
        .map_err(service_unavailable)?;
    let extra = recv(response_rx).await?;

    Ok((StatusCode::CREATED, Json(extra)))
}
