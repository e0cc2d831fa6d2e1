mod contact_name;
mod email_address;
mod message_body;
mod new_message;
mod new_subscriber;

pub use contact_name::ContactName;
pub use email_address::EmailAddress;
pub use message_body::MessageBody;
pub use new_message::{NewMessage, NewMessageData};
pub use new_subscriber::NewSubscriber;
