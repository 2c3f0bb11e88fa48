//! Account registration endpoint.

use actix_web::{HttpResponse, post, web};
use serde::Deserialize;

use super::ApiResult;
use super::state::HttpState;
use crate::domain::{User, UserId};

#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    pub username: String,
    pub email: String,
}

/// Create an account with its default notification profile.
#[post("/users")]
pub async fn register_user(
    state: web::Data<HttpState>,
    payload: web::Json<RegisterUserRequest>,
) -> ApiResult<HttpResponse> {
    let RegisterUserRequest { username, email } = payload.into_inner();
    let profile = state
        .onboarding
        .register(User {
            id: UserId::random(),
            username,
            email,
        })
        .await?;
    Ok(HttpResponse::Created().json(profile))
}
