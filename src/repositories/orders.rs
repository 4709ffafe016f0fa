use crate::models::carts::{cart_subtotal, CartItem};
use crate::models::orders::{
    Order, OrderDetails, OrderItemDetails, OrderStatus, OrderTotals, StatusChange,
};

use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct OrderRepository {
    conn: PgPool,
}

impl OrderRepository {
    pub fn new(conn: PgPool) -> Self {
        Self { conn }
    }

    /// Turns the user's cart into an order in one transaction: snapshot the
    /// lines, price the order, copy items and extras, empty the cart. The
    /// row lock on the cart serializes concurrent placements by the same
    /// user, so each line is ordered exactly once.
    ///
    /// Returns None when there is no cart or it has no lines.
    pub async fn place_order(
        &self,
        user_id: &str,
        instructions: Option<&str>,
    ) -> Result<Option<String>, anyhow::Error> {
        let mut tx = self.conn.begin().await?;

        let cart_id: Option<String> =
            sqlx::query_scalar("SELECT id FROM carts WHERE user_id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(cart_id) = cart_id else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, CartItem>("SELECT * FROM cart_items WHERE cart_id = $1")
            .bind(&cart_id)
            .fetch_all(&mut *tx)
            .await?;
        if items.is_empty() {
            return Ok(None);
        }

        let totals = OrderTotals::from_subtotal(cart_subtotal(&items));
        let order_id = Uuid::new_v4().hyphenated().to_string();

        sqlx::query(
            r#"
                INSERT INTO orders
                    (id, user_id, subtotal, delivery_fee, service_fee, tax, total,
                     special_instructions, current_status)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&order_id)
        .bind(user_id)
        .bind(totals.subtotal)
        .bind(totals.delivery_fee)
        .bind(totals.service_fee)
        .bind(totals.tax)
        .bind(totals.total)
        .bind(instructions)
        .bind(OrderStatus::Pending.as_str())
        .execute(&mut *tx)
        .await?;

        for item in &items {
            let order_item_id = Uuid::new_v4().hyphenated().to_string();

            sqlx::query(
                r#"
                    INSERT INTO order_items
                        (id, order_id, food_item_id, protein_id, quantity, unit_price, subtotal, instructions)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(&order_item_id)
            .bind(&order_id)
            .bind(&item.food_item_id)
            .bind(item.protein_id.as_deref())
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.subtotal)
            .bind(item.instructions.as_deref())
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                    INSERT INTO order_item_extras (order_item_id, extra_id)
                    SELECT $1, extra_id FROM cart_item_extras WHERE cart_item_id = $2
                "#,
            )
            .bind(&order_item_id)
            .bind(&item.id)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(&cart_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(order_id))
    }

    /// Fetches an order scoped to its owner. Asking for someone else's order
    /// looks identical to asking for one that does not exist.
    pub async fn get_order(
        &self,
        user_id: &str,
        order_id: &str,
    ) -> Result<Option<OrderDetails>, anyhow::Error> {
        let order =
            sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 AND user_id = $2")
                .bind(order_id)
                .bind(user_id)
                .fetch_optional(&self.conn)
                .await?;
        let Some(order) = order else {
            return Ok(None);
        };

        let items = self.get_order_item_details(&order.id).await?;

        Ok(Some(details(order, items)))
    }

    pub async fn get_all_orders(&self) -> Result<Vec<OrderDetails>, anyhow::Error> {
        let orders = sqlx::query_as::<_, Order>("SELECT * FROM orders ORDER BY created_at DESC, id")
            .fetch_all(&self.conn)
            .await?;

        let mut all = Vec::with_capacity(orders.len());
        for order in orders {
            let items = self.get_order_item_details(&order.id).await?;
            all.push(details(order, items));
        }

        Ok(all)
    }

    /// Records the transition in the status log in the same transaction that
    /// applies it. Returns None when no such order exists.
    pub async fn update_status(
        &self,
        order_id: &str,
        new_status: OrderStatus,
    ) -> Result<Option<StatusChange>, anyhow::Error> {
        let mut tx = self.conn.begin().await?;

        let old_status: Option<String> =
            sqlx::query_scalar("SELECT current_status FROM orders WHERE id = $1 FOR UPDATE")
                .bind(order_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(old_status) = old_status else {
            return Ok(None);
        };

        sqlx::query("UPDATE orders SET current_status = $2 WHERE id = $1")
            .bind(order_id)
            .bind(new_status.as_str())
            .execute(&mut *tx)
            .await?;

        let log_id = Uuid::new_v4().hyphenated().to_string();
        sqlx::query(
            r#"
                INSERT INTO order_status_log (id, order_id, old_status, new_status)
                VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&log_id)
        .bind(order_id)
        .bind(&old_status)
        .bind(new_status.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(StatusChange {
            order_id: order_id.to_string(),
            old_status,
            new_status: new_status.as_str().to_string(),
        }))
    }

    async fn get_order_item_details(
        &self,
        order_id: &str,
    ) -> Result<Vec<OrderItemDetails>, anyhow::Error> {
        let items = sqlx::query_as::<_, OrderItemDetails>(
            r#"
                SELECT f.name AS food, p.name AS protein,
                       COALESCE(
                           ARRAY_AGG(e.name ORDER BY e.name)
                               FILTER (WHERE e.name IS NOT NULL),
                           ARRAY[]::TEXT[]
                       ) AS extras,
                       oi.unit_price, oi.quantity, oi.subtotal AS item_total
                FROM order_items oi
                JOIN food_items f ON f.id = oi.food_item_id
                LEFT JOIN proteins p ON p.id = oi.protein_id
                LEFT JOIN order_item_extras oie ON oie.order_item_id = oi.id
                LEFT JOIN extras e ON e.id = oie.extra_id
                WHERE oi.order_id = $1
                GROUP BY oi.id, f.name, p.name
                ORDER BY oi.id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.conn)
        .await?;

        Ok(items)
    }
}

fn details(order: Order, items: Vec<OrderItemDetails>) -> OrderDetails {
    OrderDetails {
        order_id: order.id,
        user_id: order.user_id,
        status: order.current_status,
        subtotal: order.subtotal,
        delivery_fee: order.delivery_fee,
        service_fee: order.service_fee,
        tax: order.tax,
        total: order.total,
        instructions: order.special_instructions,
        items,
        created_at: order.created_at,
    }
}
