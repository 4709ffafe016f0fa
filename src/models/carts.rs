use serde::{Deserialize, Serialize};

use crate::models::catalog::{Extra, FoodItem, Protein};

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Cart {
    pub id: String,
    pub user_id: String,
    pub created_at: chrono::NaiveDateTime,
}

/// One cart line. unit_price and subtotal are frozen at add-time; catalog
/// price changes after that never touch the row.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct CartItem {
    pub id: String,
    pub cart_id: String,
    pub food_item_id: String,
    pub protein_id: Option<String>,
    pub quantity: i32,
    pub unit_price: f64,
    pub subtotal: f64,
    pub instructions: Option<String>,
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AddToCartRequest {
    pub food_item_id: String,
    pub quantity: i32,
    pub protein_id: Option<String>,
    pub extras_ids: Option<Vec<String>>,
    pub instructions: Option<String>,
}

impl AddToCartRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.quantity < 1 {
            return Err("Quantity must be at least 1.".to_string());
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct CartItemDetails {
    pub id: String,
    pub food: String,
    pub protein: Option<String>,
    pub extras: Vec<String>,
    pub quantity: i32,
    pub unit_price: f64,
    pub subtotal: f64,
    pub instructions: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartItemDetails>,
    pub subtotal: f64,
}

/// Price of one unit of a selection: base food price plus the chosen protein
/// and every resolved extra.
pub fn unit_price(food: &FoodItem, protein: Option<&Protein>, extras: &[Extra]) -> f64 {
    let protein_price = protein.map(|p| p.price).unwrap_or(0.0);
    let extras_price: f64 = extras.iter().map(|e| e.price).sum();

    food.price + protein_price + extras_price
}

/// Recomputed from unit_price * quantity rather than trusting the stored
/// subtotal, so it doubles as a consistency check on the rows.
pub fn cart_subtotal(items: &[CartItem]) -> f64 {
    items
        .iter()
        .map(|item| item.unit_price * item.quantity as f64)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn food(price: f64) -> FoodItem {
        FoodItem {
            id: "food-1".to_string(),
            name: "Jollof Rice".to_string(),
            description: None,
            quantity: 10,
            price,
            available: true,
            owner_id: None,
            created_at: chrono::NaiveDateTime::default(),
            updated_at: chrono::NaiveDateTime::default(),
        }
    }

    fn protein(price: f64) -> Protein {
        Protein {
            id: "protein-1".to_string(),
            name: "Grilled Chicken".to_string(),
            price,
            is_available: true,
        }
    }

    fn extra(id: &str, price: f64) -> Extra {
        Extra {
            id: id.to_string(),
            name: format!("extra {id}"),
            price,
        }
    }

    fn item(id: &str, unit_price: f64, quantity: i32) -> CartItem {
        CartItem {
            id: id.to_string(),
            cart_id: "cart-1".to_string(),
            food_item_id: "food-1".to_string(),
            protein_id: None,
            quantity,
            unit_price,
            subtotal: unit_price * quantity as f64,
            instructions: None,
            created_at: chrono::NaiveDateTime::default(),
        }
    }

    #[test]
    fn add_request_rejects_non_positive_quantity() {
        for quantity in [0, -1, -10] {
            let request = AddToCartRequest {
                food_item_id: "food-1".to_string(),
                quantity,
                protein_id: None,
                extras_ids: None,
                instructions: None,
            };
            assert!(request.validate().is_err());
        }
        let request = AddToCartRequest {
            food_item_id: "food-1".to_string(),
            quantity: 1,
            protein_id: None,
            extras_ids: None,
            instructions: None,
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn unit_price_is_base_plus_addons() {
        let extras = [extra("a", 150.0), extra("b", 50.0)];
        let priced = unit_price(&food(1200.0), Some(&protein(400.0)), &extras);
        assert!((priced - 1800.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unit_price_without_addons_is_base_price() {
        let priced = unit_price(&food(950.0), None, &[]);
        assert!((priced - 950.0).abs() < f64::EPSILON);
    }

    #[test]
    fn subtotal_matches_unit_price_times_quantity() {
        let line = item("i1", 1800.0, 3);
        assert!((line.subtotal - line.unit_price * line.quantity as f64).abs() < f64::EPSILON);
    }

    #[test]
    fn cart_subtotal_recomputes_from_lines() {
        let items = [item("i1", 1000.0, 2), item("i2", 500.0, 1)];
        let subtotal = cart_subtotal(&items);
        assert!((subtotal - 2500.0).abs() < f64::EPSILON);
        // recomputation agrees with the stored snapshots
        let stored: f64 = items.iter().map(|i| i.subtotal).sum();
        assert!((subtotal - stored).abs() < f64::EPSILON);
    }

    #[test]
    fn cart_subtotal_of_empty_cart_is_zero() {
        assert_eq!(cart_subtotal(&[]), 0.0);
    }
}
