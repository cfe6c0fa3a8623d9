use crate::error::{RegistryError, Result};
use crate::models::PhoneNumber;

pub type ClientId = i32;

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct Client {
    pub id: ClientId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// A client together with every phone number it owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRecord {
    pub client: Client,
    pub phones: Vec<PhoneNumber>,
}

/// Input for registering a client, optionally with initial phone numbers.
#[derive(Debug, Clone, Default)]
pub struct NewClient {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phones: Vec<String>,
}

impl NewClient {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            phones: Vec::new(),
        }
    }

    pub fn with_phone(mut self, number: impl Into<String>) -> Self {
        self.phones.push(number.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        require_non_empty("first_name", &self.first_name)?;
        require_non_empty("last_name", &self.last_name)?;
        require_non_empty("email", &self.email)?;
        for phone in &self.phones {
            require_non_empty("phone", phone)?;
        }
        Ok(())
    }
}

/// What to do with a client's phone numbers during an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhoneUpdate {
    /// Write the same number into every phone row the client already owns.
    /// The number of rows does not change; a client without phones stays
    /// without phones.
    OverwriteAll(String),
    /// Make the client's phone set exactly this list.
    Replace(Vec<String>),
}

/// Partial update of a client. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ClientUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phones: Option<PhoneUpdate>,
}

impl ClientUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn first_name(mut self, value: impl Into<String>) -> Self {
        self.first_name = Some(value.into());
        self
    }

    pub fn last_name(mut self, value: impl Into<String>) -> Self {
        self.last_name = Some(value.into());
        self
    }

    pub fn email(mut self, value: impl Into<String>) -> Self {
        self.email = Some(value.into());
        self
    }

    pub fn phones(mut self, update: PhoneUpdate) -> Self {
        self.phones = Some(update);
        self
    }

    /// True when at least one column of `clients` is touched.
    pub fn touches_client_row(&self) -> bool {
        self.first_name.is_some() || self.last_name.is_some() || self.email.is_some()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(value) = &self.first_name {
            require_non_empty("first_name", value)?;
        }
        if let Some(value) = &self.last_name {
            require_non_empty("last_name", value)?;
        }
        if let Some(value) = &self.email {
            require_non_empty("email", value)?;
        }
        match &self.phones {
            Some(PhoneUpdate::OverwriteAll(number)) => require_non_empty("phone", number)?,
            Some(PhoneUpdate::Replace(numbers)) => {
                for number in numbers {
                    require_non_empty("phone", number)?;
                }
            }
            None => {}
        }
        Ok(())
    }
}

fn require_non_empty(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RegistryError::InvalidInput {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    Ok(())
}
