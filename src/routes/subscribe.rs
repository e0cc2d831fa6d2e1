use crate::domain::NewSubscriber;
use crate::email_client::EmailClient;
use crate::notifications::send_subscription_confirmation;
use crate::rate_limit::limit_subscriptions;
use crate::storage::{Store, StoreError};
use crate::utils::{ResponseMessage, e400, e409, e500};
use actix_web::http::header::ContentType;
use actix_web::middleware::from_fn;
use actix_web::{HttpResponse, post, web};
use serde::Deserialize;

const SUCCESS_MESSAGE: &str = "Thank you for subscribing!";
const ALREADY_SUBSCRIBED: &str = "This email is already subscribed.";

#[derive(Deserialize)]
pub struct SubscribeParams {
    email: String,
}

#[post("/subscribe", wrap = "from_fn(limit_subscriptions)")]
#[tracing::instrument(
    name = "Adding a new subscriber",
    skip_all,
    fields(subscriber_email = %params.email)
)]
pub async fn post(
    params: web::Json<SubscribeParams>,
    store: web::Data<dyn Store>,
    email_client: web::Data<EmailClient>,
) -> Result<HttpResponse, actix_web::Error> {
    let new_subscriber = NewSubscriber::try_from(params.0.email).map_err(e400)?;

    match store.insert_subscriber(&new_subscriber).await {
        Ok(subscriber) => tracing::info!(subscriber_id = %subscriber.id, "New subscriber saved"),
        Err(StoreError::Conflict) => return Err(e409(ALREADY_SUBSCRIBED)),
        Err(e) => return Err(e500(e)),
    }

    send_subscription_confirmation(email_client, new_subscriber.email);

    Ok(HttpResponse::Ok()
        .content_type(ContentType::json())
        .json(ResponseMessage::from(SUCCESS_MESSAGE)))
}
