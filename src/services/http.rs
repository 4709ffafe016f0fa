use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use tokio::sync::{mpsc, oneshot};
use tower_http::trace::TraceLayer;

use super::carts::CartRequest;
use super::catalog::CatalogRequest;
use super::orders::OrderRequest;
use super::users::{lookup_session, UserRequest};
use super::ServiceError;
use crate::models::users::Role;
use crate::repositories::kv::KeyValueStore;

mod carts;
mod catalog;
mod orders;
mod users;

#[derive(Clone)]
struct AppState {
    user_channel: mpsc::Sender<UserRequest>,
    catalog_channel: mpsc::Sender<CatalogRequest>,
    cart_channel: mpsc::Sender<CartRequest>,
    order_channel: mpsc::Sender<OrderRequest>,
    kv: Arc<dyn KeyValueStore>,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::InvalidInput(_) | ServiceError::EmptyCart => StatusCode::BAD_REQUEST,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServiceError::Database(_) | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        // Storage and plumbing failures are logged in full but reach the
        // client as a generic 500.
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            log::error!("request failed: {self}");
            return (status, Json(json!({ "detail": "Internal server error" }))).into_response();
        }

        if let ServiceError::Unauthorized = self {
            return (
                status,
                [(header::WWW_AUTHENTICATE, "Bearer")],
                Json(json!({ "detail": self.to_string() })),
            )
                .into_response();
        }

        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

/// Authenticated caller, resolved from the bearer token before the handler
/// body runs.
#[derive(Clone, Debug)]
struct Principal {
    user_id: String,
    role: Role,
}

impl Principal {
    fn require_admin(&self) -> Result<(), ServiceError> {
        if self.role != Role::Admin {
            return Err(ServiceError::Forbidden("Admin only".to_string()));
        }
        Ok(())
    }

    fn require_customer(&self) -> Result<(), ServiceError> {
        if self.role != Role::Customer {
            return Err(ServiceError::Forbidden(
                "Access forbidden: Customers only".to_string(),
            ));
        }
        Ok(())
    }
}

impl FromRequestParts<AppState> for Principal {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ServiceError::Unauthorized)?;
        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or(ServiceError::Unauthorized)?;

        let session = lookup_session(state.kv.as_ref(), token)
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        let Some((user_id, role)) = session else {
            return Err(ServiceError::Unauthorized);
        };

        Ok(Principal { user_id, role })
    }
}

fn service_unavailable<T>(err: mpsc::error::SendError<T>) -> ServiceError {
    ServiceError::Internal(format!("service unavailable: {err}"))
}

/// Waits for a service's reply, folding a dropped oneshot into an internal
/// error.
async fn recv<T>(rx: oneshot::Receiver<Result<T, ServiceError>>) -> Result<T, ServiceError> {
    match rx.await {
        Ok(result) => result,
        Err(err) => Err(ServiceError::Internal(format!(
            "service dropped the request: {err}"
        ))),
    }
}

pub async fn start_http_server(
    listen: &str,
    user_channel: mpsc::Sender<UserRequest>,
    catalog_channel: mpsc::Sender<CatalogRequest>,
    cart_channel: mpsc::Sender<CartRequest>,
    order_channel: mpsc::Sender<OrderRequest>,
    kv: Arc<dyn KeyValueStore>,
) -> Result<(), anyhow::Error> {
    let app_state = AppState {
        user_channel,
        catalog_channel,
        cart_channel,
        order_channel,
        kv,
    };

    let app = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/auth/signup", post(users::signup))
        .route("/auth/verify-email", post(users::verify_email))
        .route("/auth/login", post(users::login))
        .route("/food", get(catalog::list_food_items))
        .route("/food/proteins", get(catalog::list_proteins))
        .route("/food/extras", get(catalog::list_extras))
        .route(
            "/food/{food_item_id}/ratings",
            get(catalog::list_ratings).post(catalog::rate_food_item),
        )
        .route("/cart", get(carts::view_cart).delete(carts::clear_cart))
        .route("/cart/items", post(carts::add_to_cart))
        .route("/orders", post(orders::place_order))
        .route("/orders/{order_id}", get(orders::get_order))
        .route("/admin/orders", get(orders::all_orders))
        .route(
            "/admin/orders/{order_id}/status",
            put(orders::update_order_status),
        )
        .route("/admin/food", post(catalog::add_food_item))
        .route("/admin/food/{food_item_id}", put(catalog::update_food_item))
        .route(
            "/admin/food/{food_item_id}/availability",
            put(catalog::set_availability),
        )
        .route("/admin/proteins", post(catalog::add_protein))
        .route("/admin/extras", post(catalog::add_extra))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(listen).await?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("HTTP server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");

        log::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        log::info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
