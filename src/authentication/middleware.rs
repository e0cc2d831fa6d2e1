use crate::authentication::{AuthError, basic_authentication, validate_credentials};
use crate::utils::{e401, e500};
use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::middleware::Next;
use actix_web::web;
use secrecy::Secret;

#[derive(Clone)]
pub struct AdminApiKey(pub Secret<String>);

pub async fn reject_unauthorized_admins(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    let admin_api_key = req
        .app_data::<web::Data<AdminApiKey>>()
        .cloned()
        .ok_or_else(|| e500("Admin API key is not registered."))?;

    let outcome = basic_authentication(req.headers())
        .map_err(AuthError::from)
        .and_then(|credentials| validate_credentials(&credentials, &admin_api_key.0));

    match outcome {
        Ok(()) => next
            .call(req)
            .await
            .map(ServiceResponse::map_into_left_body),
        Err(e) => {
            tracing::warn!(error = %e, path = %req.path(), "Rejected admin request");
            Ok(req.error_response(e401(e)).map_into_right_body())
        }
    }
}
