use actix_web::{
    body::{EitherBody, MessageBody},
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    web, HttpMessage,
};

use crate::error::{Result, TodoApiError};
use crate::session::{AuthenticatedUser, SessionAuthority};

/// Header carrying the session token in both directions.
pub const AUTH_HEADER: &str = "x-auth";

pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> std::result::Result<ServiceResponse<EitherBody<impl MessageBody>>, actix_web::Error> {
    let authenticated = match authenticate_request(&req).await {
        Ok(authenticated) => authenticated,
        // Rejections are answered here so they carry the JSON error body
        Err(err) => return Ok(req.error_response(err).map_into_right_body()),
    };

    // Handlers read this through ReqData<AuthenticatedUser>
    req.extensions_mut().insert(authenticated);

    next.call(req).await.map(ServiceResponse::map_into_left_body)
}

async fn authenticate_request(req: &ServiceRequest) -> Result<AuthenticatedUser> {
    let token = req
        .headers()
        .get(AUTH_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(TodoApiError::Authentication)?;

    let authority = req
        .app_data::<web::Data<SessionAuthority>>()
        .ok_or_else(|| TodoApiError::Internal("Session authority not available".to_string()))?;

    authority.authenticate(token).await
}
