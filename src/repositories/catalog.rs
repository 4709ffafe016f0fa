use crate::models::catalog::{
    Extra, FoodItem, FoodItemDetails, FoodItemUpdate, NewExtra, NewFoodItem, NewProtein, NewRating,
    Protein, Rating,
};

use anyhow::bail;
use sqlx::PgPool;
use uuid::Uuid;

/// Food rows joined with their offered protein ids.
const FOOD_DETAILS_QUERY: &str = r#"
    SELECT f.id, f.name, f.description, f.quantity, f.price, f.available, f.owner_id,
           COALESCE(
               ARRAY_AGG(fp.protein_id ORDER BY fp.protein_id)
                   FILTER (WHERE fp.protein_id IS NOT NULL),
               ARRAY[]::TEXT[]
           ) AS protein_ids,
           f.created_at, f.updated_at
    FROM food_items f
    LEFT JOIN food_proteins fp ON fp.food_id = f.id
"#;

#[derive(Clone)]
pub struct CatalogRepository {
    conn: PgPool,
}

impl CatalogRepository {
    pub fn new(conn: PgPool) -> Self {
        Self { conn }
    }

    pub async fn list_food_items(&self) -> Result<Vec<FoodItemDetails>, anyhow::Error> {
        let query = format!("{FOOD_DETAILS_QUERY} GROUP BY f.id ORDER BY f.name, f.id");
        let items = sqlx::query_as::<_, FoodItemDetails>(&query)
            .fetch_all(&self.conn)
            .await?;

        Ok(items)
    }

    pub async fn get_food_item(
        &self,
        food_item_id: &str,
    ) -> Result<Option<FoodItem>, anyhow::Error> {
        let item = sqlx::query_as::<_, FoodItem>("SELECT * FROM food_items WHERE id = $1")
            .bind(food_item_id)
            .fetch_optional(&self.conn)
            .await?;

        Ok(item)
    }

    pub async fn get_food_item_details(
        &self,
        food_item_id: &str,
    ) -> Result<Option<FoodItemDetails>, anyhow::Error> {
        let query = format!("{FOOD_DETAILS_QUERY} WHERE f.id = $1 GROUP BY f.id");
        let item = sqlx::query_as::<_, FoodItemDetails>(&query)
            .bind(food_item_id)
            .fetch_optional(&self.conn)
            .await?;

        Ok(item)
    }

    pub async fn insert_food_item(
        &self,
        new: &NewFoodItem,
        owner_id: &str,
    ) -> Result<FoodItemDetails, anyhow::Error> {
        let food_id = Uuid::new_v4().hyphenated().to_string();

        let mut tx = self.conn.begin().await?;

        sqlx::query(
            r#"
                INSERT INTO food_items (id, name, description, quantity, price, owner_id)
                VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&food_id)
        .bind(&new.name)
        .bind(new.description.as_deref())
        .bind(new.quantity.unwrap_or(0))
        .bind(new.price)
        .bind(owner_id)
        .execute(&mut *tx)
        .await?;

        if let Some(protein_ids) = &new.protein_ids {
            for protein_id in protein_ids {
                sqlx::query("INSERT INTO food_proteins (food_id, protein_id) VALUES ($1, $2)")
                    .bind(&food_id)
                    .bind(protein_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;

        match self.get_food_item_details(&food_id).await? {
            Some(details) => Ok(details),
            None => bail!("food item {food_id} missing after insert"),
        }
    }

    /// Applies only the fields present in the update; a provided protein_ids
    /// list replaces the existing links wholesale. Returns None when no such
    /// food item exists.
    pub async fn update_food_item(
        &self,
        food_item_id: &str,
        update: &FoodItemUpdate,
    ) -> Result<Option<FoodItemDetails>, anyhow::Error> {
        let mut tx = self.conn.begin().await?;

        let result = sqlx::query(
            r#"
                UPDATE food_items
                SET name = COALESCE($2, name),
                    description = COALESCE($3, description),
                    price = COALESCE($4, price),
                    quantity = COALESCE($5, quantity),
                    available = COALESCE($6, available),
                    updated_at = CURRENT_TIMESTAMP
                WHERE id = $1
            "#,
        )
        .bind(food_item_id)
        .bind(update.name.as_deref())
        .bind(update.description.as_deref())
        .bind(update.price)
        .bind(update.quantity)
        .bind(update.available)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        if let Some(protein_ids) = &update.protein_ids {
            sqlx::query("DELETE FROM food_proteins WHERE food_id = $1")
                .bind(food_item_id)
                .execute(&mut *tx)
                .await?;

            for protein_id in protein_ids {
                sqlx::query("INSERT INTO food_proteins (food_id, protein_id) VALUES ($1, $2)")
                    .bind(food_item_id)
                    .bind(protein_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;

        self.get_food_item_details(food_item_id).await
    }

    pub async fn set_food_item_availability(
        &self,
        food_item_id: &str,
        available: bool,
    ) -> Result<Option<FoodItemDetails>, anyhow::Error> {
        let result = sqlx::query(
            "UPDATE food_items SET available = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $1",
        )
        .bind(food_item_id)
        .bind(available)
        .execute(&self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_food_item_details(food_item_id).await
    }

    pub async fn list_proteins(&self) -> Result<Vec<Protein>, anyhow::Error> {
        let proteins = sqlx::query_as::<_, Protein>("SELECT * FROM proteins ORDER BY name, id")
            .fetch_all(&self.conn)
            .await?;

        Ok(proteins)
    }

    pub async fn get_protein(&self, protein_id: &str) -> Result<Option<Protein>, anyhow::Error> {
        let protein = sqlx::query_as::<_, Protein>("SELECT * FROM proteins WHERE id = $1")
            .bind(protein_id)
            .fetch_optional(&self.conn)
            .await?;

        Ok(protein)
    }

    pub async fn get_proteins_by_ids(
        &self,
        protein_ids: &[String],
    ) -> Result<Vec<Protein>, anyhow::Error> {
        let proteins = sqlx::query_as::<_, Protein>("SELECT * FROM proteins WHERE id = ANY($1)")
            .bind(protein_ids)
            .fetch_all(&self.conn)
            .await?;

        Ok(proteins)
    }

    pub async fn insert_protein(&self, new: &NewProtein) -> Result<Protein, anyhow::Error> {
        let protein_id = Uuid::new_v4().hyphenated().to_string();

        let protein = sqlx::query_as::<_, Protein>(
            r#"
                INSERT INTO proteins (id, name, price, is_available)
                VALUES ($1, $2, $3, $4)
                RETURNING *
            "#,
        )
        .bind(&protein_id)
        .bind(&new.name)
        .bind(new.price)
        .bind(new.is_available.unwrap_or(true))
        .fetch_one(&self.conn)
        .await?;

        Ok(protein)
    }

    pub async fn list_extras(&self) -> Result<Vec<Extra>, anyhow::Error> {
        let extras = sqlx::query_as::<_, Extra>("SELECT * FROM extras ORDER BY name, id")
            .fetch_all(&self.conn)
            .await?;

        Ok(extras)
    }

    pub async fn get_extras_by_ids(
        &self,
        extra_ids: &[String],
    ) -> Result<Vec<Extra>, anyhow::Error> {
        let extras = sqlx::query_as::<_, Extra>("SELECT * FROM extras WHERE id = ANY($1)")
            .bind(extra_ids)
            .fetch_all(&self.conn)
            .await?;

        Ok(extras)
    }

    pub async fn insert_extra(&self, new: &NewExtra) -> Result<Extra, anyhow::Error> {
        let extra_id = Uuid::new_v4().hyphenated().to_string();

        let extra = sqlx::query_as::<_, Extra>(
            r#"
                INSERT INTO extras (id, name, price)
                VALUES ($1, $2, $3)
                RETURNING *
            "#,
        )
        .bind(&extra_id)
        .bind(&new.name)
        .bind(new.price)
        .fetch_one(&self.conn)
        .await?;

        Ok(extra)
    }

    pub async fn insert_rating(
        &self,
        user_id: &str,
        food_item_id: &str,
        new: &NewRating,
    ) -> Result<Rating, anyhow::Error> {
        let rating_id = Uuid::new_v4().hyphenated().to_string();

        let rating = sqlx::query_as::<_, Rating>(
            r#"
                INSERT INTO ratings (id, user_id, food_item_id, rating, comment)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
            "#,
        )
        .bind(&rating_id)
        .bind(user_id)
        .bind(food_item_id)
        .bind(new.rating)
        .bind(new.comment.as_deref())
        .fetch_one(&self.conn)
        .await?;

        Ok(rating)
    }

    pub async fn list_ratings(&self, food_item_id: &str) -> Result<Vec<Rating>, anyhow::Error> {
        let ratings = sqlx::query_as::<_, Rating>(
            "SELECT * FROM ratings WHERE food_item_id = $1 ORDER BY created_at DESC, id",
        )
        .bind(food_item_id)
        .fetch_all(&self.conn)
        .await?;

        Ok(ratings)
    }
}
