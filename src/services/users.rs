use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bcrypt::{hash, verify, DEFAULT_COST};
use rand::{distr::Alphanumeric, Rng};
use sqlx::PgPool;
use tokio::sync::oneshot;
use uuid::Uuid;

use super::{RequestHandler, Service, ServiceError};
use crate::models::users::{LoginRequest, Role, SignupRequest, Token, UserProfile};
use crate::repositories::{kv::KeyValueStore, users::UserRepository};

/// Unverified OTPs die after this window, matching the delivery channel's
/// resend cadence.
pub const OTP_TTL: Duration = Duration::from_secs(300);

const REFERRAL_CODE_LEN: usize = 8;

fn otp_key(email: &str) -> String {
    format!("email_otp:{email}")
}

fn session_key(token: &str) -> String {
    format!("session:{token}")
}

fn generate_otp() -> String {
    let mut rng = rand::rng();
    rng.random_range(100_000..=999_999).to_string()
}

fn generate_referral_code() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(REFERRAL_CODE_LEN)
        .map(char::from)
        .collect::<String>()
        .to_uppercase()
}

/// Stores a bcrypt hash of a fresh OTP under the email's key and returns the
/// plaintext for delivery. Reissuing replaces any OTP still pending.
pub async fn issue_email_otp(
    kv: &dyn KeyValueStore,
    email: &str,
    ttl: Duration,
) -> Result<String, anyhow::Error> {
    let otp = generate_otp();
    let hashed_otp = hash(&otp, DEFAULT_COST)?;

    kv.set(&otp_key(email), &hashed_otp, ttl).await?;

    Ok(otp)
}

/// One-shot check: a correct OTP is consumed, a wrong one leaves the stored
/// OTP in place for another attempt within the TTL.
pub async fn check_email_otp(
    kv: &dyn KeyValueStore,
    email: &str,
    input_otp: &str,
) -> Result<bool, anyhow::Error> {
    let key = otp_key(email);

    let Some(stored_hash) = kv.get(&key).await? else {
        return Ok(false);
    };
    if !verify(input_otp, &stored_hash)? {
        return Ok(false);
    }

    kv.delete(&key).await?;
    Ok(true)
}

/// Issues an opaque bearer token backed by the key-value store. The stored
/// value carries the logical claims, id and role.
pub async fn create_session(
    kv: &dyn KeyValueStore,
    user_id: &str,
    role: &str,
    ttl: Duration,
) -> Result<String, anyhow::Error> {
    let token = Uuid::new_v4().simple().to_string();

    kv.set(&session_key(&token), &format!("{user_id}:{role}"), ttl)
        .await?;

    Ok(token)
}

/// Resolves a bearer token to (user_id, role). Unknown, expired, and
/// malformed sessions all come back as None.
pub async fn lookup_session(
    kv: &dyn KeyValueStore,
    token: &str,
) -> Result<Option<(String, Role)>, anyhow::Error> {
    let Some(value) = kv.get(&session_key(token)).await? else {
        return Ok(None);
    };
    let Some((user_id, role)) = value.rsplit_once(':') else {
        return Ok(None);
    };
    let Some(role) = Role::parse(role) else {
        return Ok(None);
    };

    Ok(Some((user_id.to_string(), role)))
}

pub enum UserRequest {
    Signup {
        request: SignupRequest,
        response: oneshot::Sender<Result<UserProfile, ServiceError>>,
    },
    VerifyEmail {
        email: String,
        otp: String,
        response: oneshot::Sender<Result<UserProfile, ServiceError>>,
    },
    Login {
        request: LoginRequest,
        response: oneshot::Sender<Result<Token, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct UserRequestHandler {
    repository: UserRepository,
    kv: Arc<dyn KeyValueStore>,
    session_ttl: Duration,
}

impl UserRequestHandler {
    pub fn new(sql_conn: PgPool, kv: Arc<dyn KeyValueStore>, session_ttl: Duration) -> Self {
        let repository = UserRepository::new(sql_conn);

        UserRequestHandler {
            repository,
            kv,
            session_ttl,
        }
    }

    async fn signup(&self, request: SignupRequest) -> Result<UserProfile, ServiceError> {
        request.validate().map_err(ServiceError::InvalidInput)?;

        if let Some(email) = &request.email {
            let existing = self
                .repository
                .get_user_by_email(email)
                .await
                .map_err(|e| ServiceError::Database(e.to_string()))?;
            if existing.is_some() {
                return Err(ServiceError::Conflict(
                    "Email or phone number already exists".to_string(),
                ));
            }
        }

        if let Some(phone_number) = &request.phone_number {
            let existing = self
                .repository
                .get_user_by_phone(phone_number)
                .await
                .map_err(|e| ServiceError::Database(e.to_string()))?;
            if existing.is_some() {
                return Err(ServiceError::Conflict(
                    "Email or phone number already exists".to_string(),
                ));
            }
        }

        let referred_by = match &request.referral_code {
            Some(code) => {
                let referrer = self
                    .repository
                    .get_user_by_referral_code(code)
                    .await
                    .map_err(|e| ServiceError::Database(e.to_string()))?;
                match referrer {
                    Some(user) => Some(user.id),
                    None => {
                        return Err(ServiceError::NotFound("Invalid referral code".to_string()))
                    }
                }
            }
            None => None,
        };

        let password_hash = hash(&request.password, DEFAULT_COST)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        let role = request.role.unwrap_or(Role::Customer);
        let referral_code = generate_referral_code();

        let user = self
            .repository
            .insert_user(
                request.email.as_deref(),
                request.phone_number.as_deref(),
                &password_hash,
                role.as_str(),
                &referral_code,
                referred_by.as_deref(),
            )
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;

        // Accounts stay inactive until the emailed OTP is confirmed.
        // Phone-only accounts have no delivery channel yet and stay inactive.
        if let Some(email) = &user.email {
            let otp = issue_email_otp(self.kv.as_ref(), email, OTP_TTL)
                .await
                .map_err(|e| ServiceError::Internal(e.to_string()))?;
            // TODO: hand the OTP to a real mailer; logging it stands in until
            // SMTP credentials are provisioned.
            log::info!("email OTP for {email}: {otp}");
        }

        Ok(user.into())
    }

    async fn verify_email(&self, email: &str, otp: &str) -> Result<UserProfile, ServiceError> {
        let user = self
            .repository
            .get_user_by_email(email)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;
        let Some(mut user) = user else {
            return Err(ServiceError::NotFound("User not found".to_string()));
        };

        if user.is_active {
            return Err(ServiceError::Conflict("Email already verified".to_string()));
        }

        let valid = check_email_otp(self.kv.as_ref(), email, otp)
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        if !valid {
            return Err(ServiceError::InvalidInput(
                "Invalid or expired OTP".to_string(),
            ));
        }

        self.repository
            .activate_user(&user.id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;

        user.is_active = true;
        Ok(user.into())
    }

    async fn login(&self, request: LoginRequest) -> Result<Token, ServiceError> {
        let user = match (&request.email, &request.phone_number) {
            (Some(email), _) => self
                .repository
                .get_user_by_email(email)
                .await
                .map_err(|e| ServiceError::Database(e.to_string()))?,
            (None, Some(phone_number)) => self
                .repository
                .get_user_by_phone(phone_number)
                .await
                .map_err(|e| ServiceError::Database(e.to_string()))?,
            (None, None) => {
                return Err(ServiceError::InvalidInput(
                    "Either email or phone number must be provided.".to_string(),
                ))
            }
        };

        // A wrong password and an unknown account are indistinguishable to
        // the caller.
        let Some(user) = user else {
            return Err(ServiceError::Unauthorized);
        };
        let valid = verify(&request.password, &user.password_hash)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        if !valid {
            return Err(ServiceError::Unauthorized);
        }

        let access_token = create_session(self.kv.as_ref(), &user.id, &user.role, self.session_ttl)
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;

        Ok(Token {
            access_token,
            token_type: "bearer".to_string(),
            role: user.role,
        })
    }
}

#[async_trait]
impl RequestHandler<UserRequest> for UserRequestHandler {
    async fn handle_request(&self, request: UserRequest) {
        match request {
            UserRequest::Signup { request, response } => {
                let profile = self.signup(request).await;
                let _ = response.send(profile);
            }
            UserRequest::VerifyEmail {
                email,
                otp,
                response,
            } => {
                let profile = self.verify_email(&email, &otp).await;
                let _ = response.send(profile);
            }
            UserRequest::Login { request, response } => {
                let token = self.login(request).await;
                let _ = response.send(token);
            }
        }
    }
}

pub struct UserService;

impl UserService {
    pub fn new() -> Self {
        UserService {}
    }
}

#[async_trait]
impl Service<UserRequest, UserRequestHandler> for UserService {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::kv::MemoryStore;

    #[test]
    fn otp_is_six_digits() {
        for _ in 0..20 {
            let otp = generate_otp();
            assert_eq!(otp.len(), 6);
            let value: u32 = otp.parse().unwrap();
            assert!((100_000..=999_999).contains(&value));
        }
    }

    #[test]
    fn referral_codes_are_short_uppercase_alphanumerics() {
        for _ in 0..20 {
            let code = generate_referral_code();
            assert_eq!(code.len(), REFERRAL_CODE_LEN);
            assert!(code
                .chars()
                .all(|c| c.is_ascii_alphanumeric() && !c.is_ascii_lowercase()));
        }
    }

    #[tokio::test]
    async fn correct_otp_verifies_once() {
        let kv = MemoryStore::new();
        let otp = issue_email_otp(&kv, "a@b.com", OTP_TTL).await.unwrap();

        assert!(check_email_otp(&kv, "a@b.com", &otp).await.unwrap());
        // consumed by the successful check
        assert!(!check_email_otp(&kv, "a@b.com", &otp).await.unwrap());
    }

    #[tokio::test]
    async fn wrong_otp_fails_without_consuming() {
        let kv = MemoryStore::new();
        let otp = issue_email_otp(&kv, "a@b.com", OTP_TTL).await.unwrap();

        let wrong = if otp == "123456" { "654321" } else { "123456" };
        assert!(!check_email_otp(&kv, "a@b.com", wrong).await.unwrap());
        assert!(check_email_otp(&kv, "a@b.com", &otp).await.unwrap());
    }

    #[tokio::test]
    async fn otp_expires_after_ttl() {
        let kv = MemoryStore::new();
        let otp = issue_email_otp(&kv, "a@b.com", Duration::from_millis(30))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!check_email_otp(&kv, "a@b.com", &otp).await.unwrap());
    }

    #[tokio::test]
    async fn reissuing_invalidates_the_previous_otp() {
        let kv = MemoryStore::new();
        let first = issue_email_otp(&kv, "a@b.com", OTP_TTL).await.unwrap();
        let second = issue_email_otp(&kv, "a@b.com", OTP_TTL).await.unwrap();

        if first != second {
            assert!(!check_email_otp(&kv, "a@b.com", &first).await.unwrap());
        }
        assert!(check_email_otp(&kv, "a@b.com", &second).await.unwrap());
    }

    #[tokio::test]
    async fn session_round_trips_id_and_role() {
        let kv = MemoryStore::new();
        let token = create_session(&kv, "user-1", "admin", Duration::from_secs(60))
            .await
            .unwrap();

        let session = lookup_session(&kv, &token).await.unwrap();
        assert_eq!(session, Some(("user-1".to_string(), Role::Admin)));
    }

    #[tokio::test]
    async fn unknown_token_resolves_to_none() {
        let kv = MemoryStore::new();
        assert_eq!(lookup_session(&kv, "not-a-token").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_session_resolves_to_none() {
        let kv = MemoryStore::new();
        let token = create_session(&kv, "user-1", "customer", Duration::from_millis(30))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(lookup_session(&kv, &token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn tampered_session_value_resolves_to_none() {
        let kv = MemoryStore::new();
        kv.set("session:tok", "garbage-without-role", Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(lookup_session(&kv, "tok").await.unwrap(), None);
    }
}
