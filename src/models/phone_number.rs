use crate::models::ClientId;

pub type PhoneId = i32;

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct PhoneNumber {
    pub id: PhoneId,
    pub number: String,
    pub client_id: ClientId,
}
