use serde::{Deserialize, Serialize};

/// Fixed business policy, same currency unit as catalog prices. Changing
/// these is a code change, not configuration.
pub const DELIVERY_FEE: f64 = 500.0;
pub const SERVICE_FEE_RATE: f64 = 0.05;
pub const TAX_RATE: f64 = 0.075;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// Exact, case-sensitive literal match; anything else is rejected.
    pub fn parse(value: &str) -> Option<OrderStatus> {
        match value {
            "Pending" => Some(OrderStatus::Pending),
            "Processing" => Some(OrderStatus::Processing),
            "Shipped" => Some(OrderStatus::Shipped),
            "Delivered" => Some(OrderStatus::Delivered),
            "Cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

/// Priced breakdown of an order, derived from the cart subtotal alone.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct OrderTotals {
    pub subtotal: f64,
    pub delivery_fee: f64,
    pub service_fee: f64,
    pub tax: f64,
    pub total: f64,
}

impl OrderTotals {
    pub fn from_subtotal(subtotal: f64) -> OrderTotals {
        let delivery_fee = DELIVERY_FEE;
        let service_fee = subtotal * SERVICE_FEE_RATE;
        let tax = subtotal * TAX_RATE;

        OrderTotals {
            subtotal,
            delivery_fee,
            service_fee,
            tax,
            total: subtotal + delivery_fee + service_fee + tax,
        }
    }
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub subtotal: f64,
    pub delivery_fee: f64,
    pub service_fee: f64,
    pub tax: f64,
    pub total: f64,
    pub special_instructions: Option<String>,
    pub current_status: String,
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct OrderItemDetails {
    pub food: String,
    pub protein: Option<String>,
    pub extras: Vec<String>,
    pub unit_price: f64,
    pub quantity: i32,
    pub item_total: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct OrderDetails {
    pub order_id: String,
    pub user_id: String,
    pub status: String,
    pub subtotal: f64,
    pub delivery_fee: f64,
    pub service_fee: f64,
    pub tax: f64,
    pub total: f64,
    pub instructions: Option<String>,
    pub items: Vec<OrderItemDetails>,
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Clone, Debug, Serialize)]
pub struct StatusChange {
    pub order_id: String,
    pub old_status: String,
    pub new_status: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub instructions: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub new_status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    #[test]
    fn totals_breakdown_for_sample_cart() {
        // lines [unit_price=1000, qty=2] and [unit_price=500, qty=1]
        let totals = OrderTotals::from_subtotal(2500.0);
        assert!((totals.subtotal - 2500.0).abs() < TOLERANCE);
        assert!((totals.delivery_fee - 500.0).abs() < TOLERANCE);
        assert!((totals.service_fee - 125.0).abs() < TOLERANCE);
        assert!((totals.tax - 187.5).abs() < TOLERANCE);
        assert!((totals.total - 3312.5).abs() < TOLERANCE);
    }

    #[test]
    fn total_is_sum_of_parts() {
        for subtotal in [0.0, 1.0, 999.99, 123456.78] {
            let t = OrderTotals::from_subtotal(subtotal);
            let expected = t.subtotal + t.delivery_fee + t.service_fee + t.tax;
            assert!((t.total - expected).abs() < TOLERANCE);
            assert!((t.service_fee - subtotal * 0.05).abs() < TOLERANCE);
            assert!((t.tax - subtotal * 0.075).abs() < TOLERANCE);
        }
    }

    #[test]
    fn all_status_literals_parse() {
        for (literal, status) in [
            ("Pending", OrderStatus::Pending),
            ("Processing", OrderStatus::Processing),
            ("Shipped", OrderStatus::Shipped),
            ("Delivered", OrderStatus::Delivered),
            ("Cancelled", OrderStatus::Cancelled),
        ] {
            assert_eq!(OrderStatus::parse(literal), Some(status));
            assert_eq!(status.as_str(), literal);
        }
    }

    #[test]
    fn unknown_status_literals_are_rejected() {
        assert!(OrderStatus::parse("Shippedd").is_none());
        assert!(OrderStatus::parse("pending").is_none());
        assert!(OrderStatus::parse("DELIVERED").is_none());
        assert!(OrderStatus::parse("").is_none());
    }
}
