use crate::models::carts::{Cart, CartItem, CartItemDetails};

use sqlx::PgPool;
use uuid::Uuid;

/// Cart lines joined with catalog names for client views.
const CART_ITEM_DETAILS_QUERY: &str = r#"
    SELECT ci.id, f.name AS food, p.name AS protein,
           COALESCE(
               ARRAY_AGG(e.name ORDER BY e.name)
                   FILTER (WHERE e.name IS NOT NULL),
               ARRAY[]::TEXT[]
           ) AS extras,
           ci.quantity, ci.unit_price, ci.subtotal, ci.instructions
    FROM cart_items ci
    JOIN carts c ON c.id = ci.cart_id
    JOIN food_items f ON f.id = ci.food_item_id
    LEFT JOIN proteins p ON p.id = ci.protein_id
    LEFT JOIN cart_item_extras cie ON cie.cart_item_id = ci.id
    LEFT JOIN extras e ON e.id = cie.extra_id
"#;

#[derive(Clone)]
pub struct CartRepository {
    conn: PgPool,
}

impl CartRepository {
    pub fn new(conn: PgPool) -> Self {
        Self { conn }
    }

    /// Returns the user's cart, creating it on first use. The upsert keeps
    /// concurrent first adds from racing past the one-cart-per-user rule.
    pub async fn fetch_or_create(&self, user_id: &str) -> Result<Cart, anyhow::Error> {
        let cart_id = Uuid::new_v4().hyphenated().to_string();

        let cart = sqlx::query_as::<_, Cart>(
            r#"
                INSERT INTO carts (id, user_id)
                VALUES ($1, $2)
                ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
                RETURNING *
            "#,
        )
        .bind(&cart_id)
        .bind(user_id)
        .fetch_one(&self.conn)
        .await?;

        Ok(cart)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn add_item(
        &self,
        cart_id: &str,
        food_item_id: &str,
        protein_id: Option<&str>,
        extra_ids: &[String],
        quantity: i32,
        unit_price: f64,
        subtotal: f64,
        instructions: Option<&str>,
    ) -> Result<CartItem, anyhow::Error> {
        let item_id = Uuid::new_v4().hyphenated().to_string();

        let mut tx = self.conn.begin().await?;

        let item = sqlx::query_as::<_, CartItem>(
            r#"
                INSERT INTO cart_items
                    (id, cart_id, food_item_id, protein_id, quantity, unit_price, subtotal, instructions)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING *
            "#,
        )
        .bind(&item_id)
        .bind(cart_id)
        .bind(food_item_id)
        .bind(protein_id)
        .bind(quantity)
        .bind(unit_price)
        .bind(subtotal)
        .bind(instructions)
        .fetch_one(&mut *tx)
        .await?;

        for extra_id in extra_ids {
            sqlx::query("INSERT INTO cart_item_extras (cart_item_id, extra_id) VALUES ($1, $2)")
                .bind(&item_id)
                .bind(extra_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(item)
    }

    pub async fn get_item_details(
        &self,
        cart_item_id: &str,
    ) -> Result<Option<CartItemDetails>, anyhow::Error> {
        let query = format!("{CART_ITEM_DETAILS_QUERY} WHERE ci.id = $1 GROUP BY ci.id, f.name, p.name");
        let item = sqlx::query_as::<_, CartItemDetails>(&query)
            .bind(cart_item_id)
            .fetch_optional(&self.conn)
            .await?;

        Ok(item)
    }

    pub async fn list_item_details(
        &self,
        user_id: &str,
    ) -> Result<Vec<CartItemDetails>, anyhow::Error> {
        let query = format!(
            "{CART_ITEM_DETAILS_QUERY} WHERE c.user_id = $1 GROUP BY ci.id, f.name, p.name ORDER BY ci.created_at, ci.id"
        );
        let items = sqlx::query_as::<_, CartItemDetails>(&query)
            .bind(user_id)
            .fetch_all(&self.conn)
            .await?;

        Ok(items)
    }

    pub async fn list_items(&self, user_id: &str) -> Result<Vec<CartItem>, anyhow::Error> {
        let items = sqlx::query_as::<_, CartItem>(
            r#"
                SELECT ci.*
                FROM cart_items ci
                JOIN carts c ON c.id = ci.cart_id
                WHERE c.user_id = $1
                ORDER BY ci.created_at, ci.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.conn)
        .await?;

        Ok(items)
    }

    /// Empties the cart and reports how many lines were removed. The cart
    /// row itself stays; only its items go.
    pub async fn clear(&self, user_id: &str) -> Result<u64, anyhow::Error> {
        let result = sqlx::query(
            r#"
                DELETE FROM cart_items
                WHERE cart_id IN (SELECT id FROM carts WHERE user_id = $1)
            "#,
        )
        .bind(user_id)
        .execute(&self.conn)
        .await?;

        Ok(result.rows_affected())
    }
}
