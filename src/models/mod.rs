mod message;
mod subscriber;

pub use message::Message;
pub use subscriber::Subscriber;
