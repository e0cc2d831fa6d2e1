use crate::utils::is_empty_or_whitespace;

#[derive(Debug)]
pub struct MessageBody(String);

impl AsRef<str> for MessageBody {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl MessageBody {
    pub fn parse(s: String) -> Result<MessageBody, String> {
        if is_empty_or_whitespace(&s) {
            Err(String::from("A message is required."))
        } else {
            Ok(Self(s))
        }
    }
}
