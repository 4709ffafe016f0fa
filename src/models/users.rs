use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Customer => "customer",
        }
    }

    pub fn parse(value: &str) -> Option<Role> {
        match value {
            "admin" => Some(Role::Admin),
            "customer" => Some(Role::Customer),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub password_hash: String,
    pub role: String,
    pub referral_code: String,
    pub referred_by: Option<String>,
    pub is_active: bool,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SignupRequest {
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub password: String,
    pub referral_code: Option<String>,
    pub role: Option<Role>,
}

impl SignupRequest {
    /// Field-level checks that need no database access.
    pub fn validate(&self) -> Result<(), String> {
        if self.email.is_none() && self.phone_number.is_none() {
            return Err("Either email or phone number must be provided.".to_string());
        }

        if let Some(phone) = &self.phone_number {
            let pattern = Regex::new(r"^\+?[1-9]\d{7,14}$").unwrap();
            if !pattern.is_match(phone) {
                return Err("Invalid phone number format.".to_string());
            }
        }

        if self.password.len() < 8 || self.password.len() > 72 {
            return Err("Password must be between 8 and 72 characters.".to_string());
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub password: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub email: String,
    pub otp: String,
}

/// User view returned to clients; never carries the password hash.
#[derive(Clone, Debug, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub role: String,
    pub referral_code: String,
    pub referred_by: Option<String>,
    pub is_active: bool,
    pub created_at: chrono::NaiveDateTime,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        UserProfile {
            id: user.id,
            email: user.email,
            phone_number: user.phone_number,
            role: user.role,
            referral_code: user.referral_code,
            referred_by: user.referred_by,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
    pub role: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: Option<&str>, phone: Option<&str>, password: &str) -> SignupRequest {
        SignupRequest {
            email: email.map(str::to_string),
            phone_number: phone.map(str::to_string),
            password: password.to_string(),
            referral_code: None,
            role: None,
        }
    }

    #[test]
    fn signup_requires_email_or_phone() {
        assert!(request(None, None, "longenough").validate().is_err());
    }

    #[test]
    fn signup_accepts_email_only_or_phone_only() {
        assert!(request(Some("a@b.com"), None, "longenough").validate().is_ok());
        assert!(request(None, Some("+2348012345678"), "longenough")
            .validate()
            .is_ok());
    }

    #[test]
    fn signup_rejects_malformed_phone_numbers() {
        assert!(request(None, Some("abc"), "longenough").validate().is_err());
        assert!(request(None, Some("+0123456789"), "longenough")
            .validate()
            .is_err());
        assert!(request(None, Some("123"), "longenough").validate().is_err());
        // 16 significant digits is one past the ceiling
        assert!(request(None, Some("+1234567890123456"), "longenough")
            .validate()
            .is_err());
    }

    #[test]
    fn signup_enforces_password_bounds() {
        assert!(request(Some("a@b.com"), None, "short").validate().is_err());
        let too_long = "x".repeat(73);
        assert!(request(Some("a@b.com"), None, &too_long).validate().is_err());
        let max = "x".repeat(72);
        assert!(request(Some("a@b.com"), None, &max).validate().is_ok());
    }

    #[test]
    fn role_literals_round_trip() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("customer"), Some(Role::Customer));
        assert_eq!(Role::Admin.as_str(), "admin");
        assert!(Role::parse("superuser").is_none());
    }
}
