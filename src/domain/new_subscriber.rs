use crate::domain::EmailAddress;

pub struct NewSubscriber {
    pub email: EmailAddress,
}

impl TryFrom<String> for NewSubscriber {
    type Error = String;

    fn try_from(email: String) -> Result<Self, Self::Error> {
        let email = EmailAddress::parse(email)?;

        Ok(Self { email })
    }
}
