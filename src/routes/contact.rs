use crate::domain::{NewMessage, NewMessageData};
use crate::email_client::EmailClient;
use crate::notifications::send_contact_notification;
use crate::rate_limit::limit_contact_messages;
use crate::startup::AdminNotificationEmail;
use crate::storage::Store;
use crate::utils::{ResponseMessage, e400, e500};
use actix_web::http::header::ContentType;
use actix_web::middleware::from_fn;
use actix_web::{HttpResponse, post, web};
use serde::Deserialize;

const SUCCESS_MESSAGE: &str = "Thank you for your message!";

#[derive(Deserialize)]
pub struct ContactParams {
    name: String,
    email: String,
    message: String,
}

#[post("/contact", wrap = "from_fn(limit_contact_messages)")]
#[tracing::instrument(
    name = "Saving a contact message",
    skip_all,
    fields(sender_email = %params.email)
)]
pub async fn post(
    params: web::Json<ContactParams>,
    store: web::Data<dyn Store>,
    email_client: web::Data<EmailClient>,
    admin_email: web::Data<AdminNotificationEmail>,
) -> Result<HttpResponse, actix_web::Error> {
    let ContactParams {
        name,
        email,
        message,
    } = params.into_inner();
    let new_message: NewMessage = NewMessageData {
        name,
        email,
        message,
    }
    .try_into()
    .map_err(e400)?;
    let message = store.insert_message(&new_message).await.map_err(e500)?;

    send_contact_notification(email_client, admin_email.0.clone(), &message);

    Ok(HttpResponse::Ok()
        .content_type(ContentType::json())
        .json(ResponseMessage::from(SUCCESS_MESSAGE)))
}
