use crate::models::users::User;

use anyhow::bail;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct UserRepository {
    conn: PgPool,
}

impl UserRepository {
    pub fn new(conn: PgPool) -> Self {
        Self { conn }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_user(
        &self,
        email: Option<&str>,
        phone_number: Option<&str>,
        password_hash: &str,
        role: &str,
        referral_code: &str,
        referred_by: Option<&str>,
    ) -> Result<User, anyhow::Error> {
        let user_id = Uuid::new_v4().hyphenated().to_string();

        let user = sqlx::query_as::<_, User>(
            r#"
                INSERT INTO users (id, email, phone_number, password_hash, role, referral_code, referred_by)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
            "#,
        )
        .bind(&user_id)
        .bind(email)
        .bind(phone_number)
        .bind(password_hash)
        .bind(role)
        .bind(referral_code)
        .bind(referred_by)
        .fetch_one(&self.conn)
        .await?;

        Ok(user)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, anyhow::Error> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.conn)
            .await?;

        Ok(user)
    }

    pub async fn get_user_by_phone(
        &self,
        phone_number: &str,
    ) -> Result<Option<User>, anyhow::Error> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE phone_number = $1")
            .bind(phone_number)
            .fetch_optional(&self.conn)
            .await?;

        Ok(user)
    }

    pub async fn get_user_by_referral_code(
        &self,
        referral_code: &str,
    ) -> Result<Option<User>, anyhow::Error> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE referral_code = $1")
            .bind(referral_code)
            .fetch_optional(&self.conn)
            .await?;

        Ok(user)
    }

    pub async fn activate_user(&self, user_id: &str) -> Result<(), anyhow::Error> {
        let result = sqlx::query(
            "UPDATE users SET is_active = TRUE, updated_at = CURRENT_TIMESTAMP WHERE id = $1",
        )
        .bind(user_id)
        .execute(&self.conn)
        .await?;

        if result.rows_affected() == 0 {
            bail!("User not found")
        }

        Ok(())
    }
}
