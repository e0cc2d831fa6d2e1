use crate::utils::is_empty_or_whitespace;

#[derive(Debug)]
pub struct ContactName(String);

impl AsRef<str> for ContactName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl ContactName {
    pub fn parse(s: String) -> Result<ContactName, String> {
        if is_empty_or_whitespace(&s) {
            Err(String::from("A name is required."))
        } else {
            Ok(Self(s))
        }
    }
}
