use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use tokio::sync::oneshot;

use crate::models::users::{LoginRequest, SignupRequest, VerifyEmailRequest};
use crate::services::users::UserRequest;
use crate::services::ServiceError;

use super::{recv, service_unavailable, AppState};

pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let (response_tx, response_rx) = oneshot::channel();

    state
        .user_channel
        .send(UserRequest::Signup {
            request,
            response: response_tx,
        })
        .await
        .map_err(service_unavailable)?;
    let profile = recv(response_rx).await?;

    Ok((StatusCode::CREATED, Json(profile)))
}

pub async fn verify_email(
    State(state): State<AppState>,
    Json(request): Json<VerifyEmailRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let (response_tx, response_rx) = oneshot::channel();

    state
        .user_channel
        .send(UserRequest::VerifyEmail {
            email: request.email,
            otp: request.otp,
            response: response_tx,
        })
        .await
        .map_err(service_unavailable)?;
    let profile = recv(response_rx).await?;

    Ok(Json(profile))
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let (response_tx, response_rx) = oneshot::channel();

    state
        .user_channel
        .send(UserRequest::Login {
            request,
            response: response_tx,
        })
        .await
        .map_err(service_unavailable)?;
    let token = recv(response_rx).await?;

    Ok(Json(token))
}
