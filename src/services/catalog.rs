use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::oneshot;

use super::{RequestHandler, Service, ServiceError};
use crate::models::catalog::{
    Extra, FoodItemDetails, FoodItemUpdate, NewExtra, NewFoodItem, NewProtein, NewRating, Protein,
    Rating,
};
use crate::repositories::catalog::CatalogRepository;

pub enum CatalogRequest {
    ListFoodItems {
        response: oneshot::Sender<Result<Vec<FoodItemDetails>, ServiceError>>,
    },
    AddFoodItem {
        item: NewFoodItem,
        owner_id: String,
        response: oneshot::Sender<Result<FoodItemDetails, ServiceError>>,
    },
    UpdateFoodItem {
        food_item_id: String,
        update: FoodItemUpdate,
        response: oneshot::Sender<Result<FoodItemDetails, ServiceError>>,
    },
    SetAvailability {
        food_item_id: String,
        available: bool,
        response: oneshot::Sender<Result<FoodItemDetails, ServiceError>>,
    },
    ListProteins {
        response: oneshot::Sender<Result<Vec<Protein>, ServiceError>>,
    },
    AddProtein {
        protein: NewProtein,
        response: oneshot::Sender<Result<Protein, ServiceError>>,
    },
    ListExtras {
        response: oneshot::Sender<Result<Vec<Extra>, ServiceError>>,
    },
    AddExtra {
        extra: NewExtra,
        response: oneshot::Sender<Result<Extra, ServiceError>>,
    },
    RateFoodItem {
        user_id: String,
        food_item_id: String,
        rating: NewRating,
        response: oneshot::Sender<Result<Rating, ServiceError>>,
    },
    ListRatings {
        food_item_id: String,
        response: oneshot::Sender<Result<Vec<Rating>, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct CatalogRequestHandler {
    repository: CatalogRepository,
}

impl CatalogRequestHandler {
    pub fn new(sql_conn: PgPool) -> Self {
        let repository = CatalogRepository::new(sql_conn);

        CatalogRequestHandler { repository }
    }

    async fn list_food_items(&self) -> Result<Vec<FoodItemDetails>, ServiceError> {
        self.repository
            .list_food_items()
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))
    }

    /// Referenced protein ids must all exist before the food item is
    /// persisted with its links.
    async fn check_protein_ids(&self, protein_ids: &mut Vec<String>) -> Result<(), ServiceError> {
        protein_ids.sort();
        protein_ids.dedup();

        let resolved = self
            .repository
            .get_proteins_by_ids(protein_ids)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;
        if resolved.len() != protein_ids.len() {
            return Err(ServiceError::InvalidInput(
                "One or more protein ids do not exist".to_string(),
            ));
        }

        Ok(())
    }

    async fn add_food_item(
        &self,
        mut item: NewFoodItem,
        owner_id: &str,
    ) -> Result<FoodItemDetails, ServiceError> {
        if let Some(protein_ids) = &mut item.protein_ids {
            self.check_protein_ids(protein_ids).await?;
        }

        self.repository
            .insert_food_item(&item, owner_id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))
    }

    async fn update_food_item(
        &self,
        food_item_id: &str,
        mut update: FoodItemUpdate,
    ) -> Result<FoodItemDetails, ServiceError> {
        if let Some(protein_ids) = &mut update.protein_ids {
            self.check_protein_ids(protein_ids).await?;
        }

        let updated = self
            .repository
            .update_food_item(food_item_id, &update)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;

        updated.ok_or_else(|| ServiceError::NotFound("Food item not found".to_string()))
    }

    async fn set_availability(
        &self,
        food_item_id: &str,
        available: bool,
    ) -> Result<FoodItemDetails, ServiceError> {
        let updated = self
            .repository
            .set_food_item_availability(food_item_id, available)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;

        updated.ok_or_else(|| ServiceError::NotFound("Food item not found".to_string()))
    }

    async fn list_proteins(&self) -> Result<Vec<Protein>, ServiceError> {
        self.repository
            .list_proteins()
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))
    }

    async fn add_protein(&self, protein: NewProtein) -> Result<Protein, ServiceError> {
        self.repository
            .insert_protein(&protein)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))
    }

    async fn list_extras(&self) -> Result<Vec<Extra>, ServiceError> {
        self.repository
            .list_extras()
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))
    }

    async fn add_extra(&self, extra: NewExtra) -> Result<Extra, ServiceError> {
        self.repository
            .insert_extra(&extra)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))
    }

    async fn rate_food_item(
        &self,
        user_id: &str,
        food_item_id: &str,
        rating: NewRating,
    ) -> Result<Rating, ServiceError> {
        rating.validate().map_err(ServiceError::InvalidInput)?;

        let food = self
            .repository
            .get_food_item(food_item_id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;
        if food.is_none() {
            return Err(ServiceError::NotFound("Food not found".to_string()));
        }

        self.repository
            .insert_rating(user_id, food_item_id, &rating)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))
    }

    async fn list_ratings(&self, food_item_id: &str) -> Result<Vec<Rating>, ServiceError> {
        let food = self
            .repository
            .get_food_item(food_item_id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;
        if food.is_none() {
            return Err(ServiceError::NotFound("Food not found".to_string()));
        }

        self.repository
            .list_ratings(food_item_id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))
    }
}

#[async_trait]
impl RequestHandler<CatalogRequest> for CatalogRequestHandler {
    async fn handle_request(&self, request: CatalogRequest) {
        match request {
            CatalogRequest::ListFoodItems { response } => {
                let items = self.list_food_items().await;
                let _ = response.send(items);
            }
            CatalogRequest::AddFoodItem {
                item,
                owner_id,
                response,
            } => {
                let item = self.add_food_item(item, &owner_id).await;
                let _ = response.send(item);
            }
            CatalogRequest::UpdateFoodItem {
                food_item_id,
                update,
                response,
            } => {
                let item = self.update_food_item(&food_item_id, update).await;
                let _ = response.send(item);
            }
            CatalogRequest::SetAvailability {
                food_item_id,
                available,
                response,
            } => {
                let item = self.set_availability(&food_item_id, available).await;
                let _ = response.send(item);
            }
            CatalogRequest::ListProteins { response } => {
                let proteins = self.list_proteins().await;
                let _ = response.send(proteins);
            }
            CatalogRequest::AddProtein { protein, response } => {
                let protein = self.add_protein(protein).await;
                let _ = response.send(protein);
            }
            CatalogRequest::ListExtras { response } => {
                let extras = self.list_extras().await;
                let _ = response.send(extras);
            }
            CatalogRequest::AddExtra { extra, response } => {
                let extra = self.add_extra(extra).await;
                let _ = response.send(extra);
            }
            CatalogRequest::RateFoodItem {
                user_id,
                food_item_id,
                rating,
                response,
            } => {
                let rating = self.rate_food_item(&user_id, &food_item_id, rating).await;
                let _ = response.send(rating);
            }
            CatalogRequest::ListRatings {
                food_item_id,
                response,
            } => {
                let ratings = self.list_ratings(&food_item_id).await;
                let _ = response.send(ratings);
            }
        }
    }
}

pub struct CatalogService;

impl CatalogService {
    pub fn new() -> Self {
        CatalogService {}
    }
}

#[async_trait]
impl Service<CatalogRequest, CatalogRequestHandler> for CatalogService {}
