//! Emails sent after a write has already succeeded.
//!
//! Each send runs in its own detached task. A failed send is logged and
//! never reaches the client, whose response was decided by the write.

use crate::domain::EmailAddress;
use crate::email_client::EmailClient;
use crate::models::Message;
use actix_web::web;
use tracing::Instrument;
use voca_rs::escape::escape_html;

pub struct EmailContent {
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

pub fn subscription_confirmation() -> EmailContent {
    EmailContent {
        subject: "Thanks for subscribing!".to_string(),
        html_body: "<p>Thank you for subscribing to our newsletter!</p>\
                    <p>We will keep you posted with our latest news.</p>"
            .to_string(),
        text_body: "Thank you for subscribing to our newsletter!\n\
                    We will keep you posted with our latest news."
            .to_string(),
    }
}

pub fn contact_notification(message: &Message) -> EmailContent {
    EmailContent {
        subject: format!("New contact message from {}", message.name),
        html_body: format!(
            "<p><strong>Name:</strong> {}</p>\
             <p><strong>Email:</strong> {}</p>\
             <p><strong>Message:</strong></p><p>{}</p>",
            escape_html(&message.name),
            escape_html(&message.email),
            escape_html(&message.message).replace('\n', "<br>"),
        ),
        text_body: format!(
            "Name: {}\nEmail: {}\nMessage:\n{}",
            message.name, message.email, message.message
        ),
    }
}

pub fn send_subscription_confirmation(
    email_client: web::Data<EmailClient>,
    recipient: EmailAddress,
) {
    dispatch(email_client, recipient, subscription_confirmation());
}

pub fn send_contact_notification(
    email_client: web::Data<EmailClient>,
    admin_email: EmailAddress,
    message: &Message,
) {
    dispatch(email_client, admin_email, contact_notification(message));
}

fn dispatch(
    email_client: web::Data<EmailClient>,
    recipient: EmailAddress,
    content: EmailContent,
) {
    let span = tracing::info_span!("Sending notification email", subject = %content.subject);

    tokio::spawn(
        async move {
            if let Err(e) = email_client
                .send_email(
                    &recipient,
                    &content.subject,
                    &content.html_body,
                    &content.text_body,
                )
                .await
            {
                tracing::error!(
                    error.cause_chain = ?e,
                    error.message = %e,
                    "Failed to send notification email."
                );
            }
        }
        .instrument(span),
    );
}
