use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::oneshot;

use super::{RequestHandler, Service, ServiceError};
use crate::models::orders::{OrderDetails, OrderStatus, StatusChange};
use crate::repositories::orders::OrderRepository;

pub enum OrderRequest {
    Place {
        user_id: String,
        instructions: Option<String>,
        response: oneshot::Sender<Result<OrderDetails, ServiceError>>,
    },
    GetOrder {
        user_id: String,
        order_id: String,
        response: oneshot::Sender<Result<OrderDetails, ServiceError>>,
    },
    AllOrders {
        response: oneshot::Sender<Result<Vec<OrderDetails>, ServiceError>>,
    },
    UpdateStatus {
        order_id: String,
        new_status: String,
        response: oneshot::Sender<Result<StatusChange, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct OrderRequestHandler {
    repository: OrderRepository,
}

impl OrderRequestHandler {
    pub fn new(sql_conn: PgPool) -> Self {
        let repository = OrderRepository::new(sql_conn);

        OrderRequestHandler { repository }
    }

    async fn place(
        &self,
        user_id: &str,
        instructions: Option<&str>,
    ) -> Result<OrderDetails, ServiceError> {
        let order_id = self
            .repository
            .place_order(user_id, instructions)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;
        let Some(order_id) = order_id else {
            return Err(ServiceError::EmptyCart);
        };

        log::info!("user {user_id} placed order {order_id}");

        let details = self
            .repository
            .get_order(user_id, &order_id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;

        details.ok_or_else(|| ServiceError::Internal("order missing after placement".to_string()))
    }

    async fn get_order(&self, user_id: &str, order_id: &str) -> Result<OrderDetails, ServiceError> {
        let details = self
            .repository
            .get_order(user_id, order_id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;

        details.ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))
    }

    async fn all_orders(&self) -> Result<Vec<OrderDetails>, ServiceError> {
        self.repository
            .get_all_orders()
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))
    }

    async fn update_status(
        &self,
        order_id: &str,
        new_status: &str,
    ) -> Result<StatusChange, ServiceError> {
        let Some(status) = OrderStatus::parse(new_status) else {
            return Err(ServiceError::InvalidInput("Invalid order status".to_string()));
        };

        let change = self
            .repository
            .update_status(order_id, status)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;
        let Some(change) = change else {
            return Err(ServiceError::NotFound("Order not found".to_string()));
        };

        log::info!(
            "order {} status changed from {} to {}",
            change.order_id,
            change.old_status,
            change.new_status
        );

        Ok(change)
    }
}

#[async_trait]
impl RequestHandler<OrderRequest> for OrderRequestHandler {
    async fn handle_request(&self, request: OrderRequest) {
        match request {
            OrderRequest::Place {
                user_id,
                instructions,
                response,
            } => {
                let details = self.place(&user_id, instructions.as_deref()).await;
                let _ = response.send(details);
            }
            OrderRequest::GetOrder {
                user_id,
                order_id,
                response,
            } => {
                let details = self.get_order(&user_id, &order_id).await;
                let _ = response.send(details);
            }
            OrderRequest::AllOrders { response } => {
                let orders = self.all_orders().await;
                let _ = response.send(orders);
            }
            OrderRequest::UpdateStatus {
                order_id,
                new_status,
                response,
            } => {
                let change = self.update_status(&order_id, &new_status).await;
                let _ = response.send(change);
            }
        }
    }
}

pub struct OrderService;

impl OrderService {
    pub fn new() -> Self {
        OrderService {}
    }
}

#[async_trait]
impl Service<OrderRequest, OrderRequestHandler> for OrderService {}
