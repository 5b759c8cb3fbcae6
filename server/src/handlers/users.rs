use actix_web::{delete, get, post, web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::{
    db::UserProfile,
    error::Result,
    middleware::AUTH_HEADER,
    session::{AuthenticatedUser, SessionAuthority},
};

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Public view of a user. Hash and tokens never leave the server.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
}

impl From<&UserProfile> for UserResponse {
    fn from(profile: &UserProfile) -> Self {
        Self {
            id: profile.id.to_hex(),
            email: profile.email.clone(),
        }
    }
}

#[post("/users")]
pub async fn register(
    req: web::Json<CredentialsRequest>,
    authority: web::Data<SessionAuthority>,
) -> Result<HttpResponse> {
    let (profile, token) = authority.register(&req.email, &req.password).await?;

    Ok(HttpResponse::Ok()
        .insert_header((AUTH_HEADER, token))
        .json(UserResponse::from(&profile)))
}

#[post("/users/login")]
pub async fn login(
    req: web::Json<CredentialsRequest>,
    authority: web::Data<SessionAuthority>,
) -> Result<HttpResponse> {
    log::info!("Login attempt for user: {}", req.email.trim());

    let (profile, token) = authority.login(&req.email, &req.password).await?;

    Ok(HttpResponse::Ok()
        .insert_header((AUTH_HEADER, token))
        .json(UserResponse::from(&profile)))
}

#[get("")]
pub async fn me(auth: web::ReqData<AuthenticatedUser>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(UserResponse::from(&auth.user)))
}

#[delete("/token")]
pub async fn logout(
    auth: web::ReqData<AuthenticatedUser>,
    authority: web::Data<SessionAuthority>,
) -> Result<HttpResponse> {
    let auth = auth.into_inner();
    authority.remove_token(&auth.user, &auth.token).await?;

    log::info!("User {} logged out", auth.user.email);

    Ok(HttpResponse::Ok().finish())
}
