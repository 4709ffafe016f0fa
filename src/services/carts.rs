use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::oneshot;

use super::{RequestHandler, Service, ServiceError};
use crate::models::{
    self,
    carts::{AddToCartRequest, CartItemDetails, CartView},
    catalog::Extra,
};
use crate::repositories::{carts::CartRepository, catalog::CatalogRepository};

pub enum CartRequest {
    AddItem {
        user_id: String,
        item: AddToCartRequest,
        response: oneshot::Sender<Result<CartItemDetails, ServiceError>>,
    },
    ViewCart {
        user_id: String,
        response: oneshot::Sender<Result<CartView, ServiceError>>,
    },
    Clear {
        user_id: String,
        response: oneshot::Sender<Result<u64, ServiceError>>,
    },
}

/// Every requested extra id must resolve. Unknown ids fail the whole add
/// instead of silently pricing the line without them.
fn ensure_extras_resolved(requested: &[String], resolved: &[Extra]) -> Result<(), String> {
    if resolved.len() != requested.len() {
        return Err("One or more extras ids do not exist".to_string());
    }
    Ok(())
}

#[derive(Clone)]
pub struct CartRequestHandler {
    carts: CartRepository,
    catalog: CatalogRepository,
}

impl CartRequestHandler {
    pub fn new(sql_conn: PgPool) -> Self {
        let carts = CartRepository::new(sql_conn.clone());
        let catalog = CatalogRepository::new(sql_conn);

        CartRequestHandler { carts, catalog }
    }

    async fn add_item(
        &self,
        user_id: &str,
        mut request: AddToCartRequest,
    ) -> Result<CartItemDetails, ServiceError> {
        request.validate().map_err(ServiceError::InvalidInput)?;

        let food = self
            .catalog
            .get_food_item(&request.food_item_id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;
        let Some(food) = food else {
            return Err(ServiceError::NotFound("Food not found".to_string()));
        };

        let protein = match &request.protein_id {
            Some(protein_id) => {
                let protein = self
                    .catalog
                    .get_protein(protein_id)
                    .await
                    .map_err(|e| ServiceError::Database(e.to_string()))?;
                match protein {
                    Some(protein) => Some(protein),
                    None => return Err(ServiceError::NotFound("Protein not found".to_string())),
                }
            }
            None => None,
        };

        let mut extra_ids = request.extras_ids.take().unwrap_or_default();
        extra_ids.sort();
        extra_ids.dedup();
        let extras = self
            .catalog
            .get_extras_by_ids(&extra_ids)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;
        ensure_extras_resolved(&extra_ids, &extras).map_err(ServiceError::InvalidInput)?;

        // Snapshot pricing: the line keeps these numbers even if the catalog
        // changes afterwards.
        let unit_price = models::carts::unit_price(&food, protein.as_ref(), &extras);
        let subtotal = unit_price * request.quantity as f64;

        let cart = self
            .carts
            .fetch_or_create(user_id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;

        let item = self
            .carts
            .add_item(
                &cart.id,
                &request.food_item_id,
                request.protein_id.as_deref(),
                &extra_ids,
                request.quantity,
                unit_price,
                subtotal,
                request.instructions.as_deref(),
            )
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;

        let details = self
            .carts
            .get_item_details(&item.id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;

        details.ok_or_else(|| ServiceError::Internal("cart item missing after insert".to_string()))
    }

    async fn view_cart(&self, user_id: &str) -> Result<CartView, ServiceError> {
        let items = self
            .carts
            .list_item_details(user_id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;
        let lines = self
            .carts
            .list_items(user_id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;

        let subtotal = models::carts::cart_subtotal(&lines);

        Ok(CartView { items, subtotal })
    }

    async fn clear(&self, user_id: &str) -> Result<u64, ServiceError> {
        self.carts
            .clear(user_id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))
    }
}

#[async_trait]
impl RequestHandler<CartRequest> for CartRequestHandler {
    async fn handle_request(&self, request: CartRequest) {
        match request {
            CartRequest::AddItem {
                user_id,
                item,
                response,
            } => {
                let details = self.add_item(&user_id, item).await;
                let _ = response.send(details);
            }
            CartRequest::ViewCart { user_id, response } => {
                let view = self.view_cart(&user_id).await;
                let _ = response.send(view);
            }
            CartRequest::Clear { user_id, response } => {
                let removed = self.clear(&user_id).await;
                let _ = response.send(removed);
            }
        }
    }
}

pub struct CartService;

impl CartService {
    pub fn new() -> Self {
        CartService {}
    }
}

#[async_trait]
impl Service<CartRequest, CartRequestHandler> for CartService {}

#[cfg(test)]
mod tests {
    use super::*;

    fn extra(id: &str) -> Extra {
        Extra {
            id: id.to_string(),
            name: format!("extra {id}"),
            price: 100.0,
        }
    }

    #[test]
    fn fully_resolved_extras_pass() {
        let requested = ["e1".to_string(), "e2".to_string()];
        let resolved = [extra("e1"), extra("e2")];
        assert!(ensure_extras_resolved(&requested, &resolved).is_ok());
    }

    #[test]
    fn no_extras_requested_passes() {
        assert!(ensure_extras_resolved(&[], &[]).is_ok());
    }

    #[test]
    fn unknown_extra_id_fails_the_add() {
        // "e2" did not resolve; the add must fail instead of pricing
        // the line without it
        let requested = ["e1".to_string(), "e2".to_string()];
        let resolved = [extra("e1")];
        assert!(ensure_extras_resolved(&requested, &resolved).is_err());
    }
}
