use crate::domain::{ContactName, EmailAddress, MessageBody};

pub struct NewMessage {
    pub name: ContactName,
    pub email: EmailAddress,
    pub message: MessageBody,
}

pub struct NewMessageData {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl TryFrom<NewMessageData> for NewMessage {
    type Error = String;

    fn try_from(data: NewMessageData) -> Result<Self, Self::Error> {
        let name = ContactName::parse(data.name)?;
        let email = EmailAddress::parse(data.email)?;
        let message = MessageBody::parse(data.message)?;

        Ok(Self {
            name,
            email,
            message,
        })
    }
}
