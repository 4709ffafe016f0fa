use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::mpsc;

use crate::repositories::kv::KeyValueStore;
use crate::settings::Settings;

mod carts;
mod catalog;
mod http;
mod orders;
mod users;

#[derive(Debug, thiserror::Error)]
enum ServiceError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("Cart is empty")]
    EmptyCart,
    #[error("{0}")]
    Forbidden(String),
    #[error("Could not validate credentials")]
    Unauthorized,
    #[error("Database error: {0}")]
    Database(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

#[async_trait]
pub trait RequestHandler<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    async fn handle_request(&self, request: T);
}

#[async_trait]
pub trait Service<T, H>: Send + Sync + 'static
where
    T: Send + 'static,
    H: RequestHandler<T> + Clone + Send,
{
    async fn run(&mut self, handler: H, receiver: &mut mpsc::Receiver<T>) {
        while let Some(request) = receiver.recv().await {
            let handler = handler.clone();

            tokio::spawn(async move {
                handler.handle_request(request).await;
            });
        }
    }
}

/// Wires every service to its channel and hands the senders to the HTTP
/// front end. Runs until the HTTP server shuts down.
pub async fn start_services(
    pool: PgPool,
    kv: Arc<dyn KeyValueStore>,
    settings: Settings,
) -> Result<(), anyhow::Error> {
    let (user_tx, mut user_rx) = mpsc::channel(512);
    let (catalog_tx, mut catalog_rx) = mpsc::channel(512);
    let (cart_tx, mut cart_rx) = mpsc::channel(512);
    let (order_tx, mut order_rx) = mpsc::channel(512);

    let mut user_service = users::UserService::new();
    let mut catalog_service = catalog::CatalogService::new();
    let mut cart_service = carts::CartService::new();
    let mut order_service = orders::OrderService::new();

    log::info!("Starting user service.");
    let user_pool_clone = pool.clone();
    let user_kv_clone = kv.clone();
    let session_ttl = Duration::from_secs(settings.auth.session_ttl_minutes * 60);
    tokio::spawn(async move {
        user_service
            .run(
                users::UserRequestHandler::new(user_pool_clone, user_kv_clone, session_ttl),
                &mut user_rx,
            )
            .await;
    });

    log::info!("Starting catalog service.");
    let catalog_pool_clone = pool.clone();
    tokio::spawn(async move {
        catalog_service
            .run(
                catalog::CatalogRequestHandler::new(catalog_pool_clone),
                &mut catalog_rx,
            )
            .await;
    });

    log::info!("Starting cart service.");
    let cart_pool_clone = pool.clone();
    tokio::spawn(async move {
        cart_service
            .run(carts::CartRequestHandler::new(cart_pool_clone), &mut cart_rx)
            .await;
    });

    log::info!("Starting order service.");
    let order_pool_clone = pool.clone();
    tokio::spawn(async move {
        order_service
            .run(
                orders::OrderRequestHandler::new(order_pool_clone),
                &mut order_rx,
            )
            .await;
    });

    log::info!("Starting HTTP server.");
    http::start_http_server(
        &settings.http.listen,
        user_tx,
        catalog_tx,
        cart_tx,
        order_tx,
        kv,
    )
    .await
}
