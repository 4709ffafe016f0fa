use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct FoodItem {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub quantity: i32,
    pub price: f64,
    pub available: bool,
    pub owner_id: Option<String>,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

/// Listing/detail view: the food row plus the proteins offered with it.
#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct FoodItemDetails {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub quantity: i32,
    pub price: f64,
    pub available: bool,
    pub owner_id: Option<String>,
    pub protein_ids: Vec<String>,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewFoodItem {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub quantity: Option<i32>,
    pub protein_ids: Option<Vec<String>>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SetAvailabilityRequest {
    pub available: bool,
}

/// Partial update: unset fields keep their current value.
#[derive(Clone, Debug, Deserialize)]
pub struct FoodItemUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub quantity: Option<i32>,
    pub available: Option<bool>,
    pub protein_ids: Option<Vec<String>>,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct Protein {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub is_available: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewProtein {
    pub name: String,
    pub price: f64,
    pub is_available: Option<bool>,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct Extra {
    pub id: String,
    pub name: String,
    pub price: f64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewExtra {
    pub name: String,
    pub price: f64,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct Rating {
    pub id: String,
    pub user_id: String,
    pub food_item_id: String,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewRating {
    pub rating: i32,
    pub comment: Option<String>,
}

impl NewRating {
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=5).contains(&self.rating) {
            return Err("Rating must be between 1 and 5.".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::NewRating;

    #[test]
    fn rating_bounds() {
        for value in 1..=5 {
            let rating = NewRating {
                rating: value,
                comment: None,
            };
            assert!(rating.validate().is_ok());
        }
        for value in [0, 6, -1] {
            let rating = NewRating {
                rating: value,
                comment: None,
            };
            assert!(rating.validate().is_err());
        }
    }
}
