use crate::error::{RegistryError, Result};

/// Search criteria for `find_client`. Exactly one field must be set.
#[derive(Debug, Clone, Default)]
pub struct ClientFilter {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// The single criterion a search resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchBy<'a> {
    FirstName(&'a str),
    LastName(&'a str),
    Email(&'a str),
    Phone(&'a str),
}

impl ClientFilter {
    pub fn by_first_name(value: impl Into<String>) -> Self {
        Self {
            first_name: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn by_last_name(value: impl Into<String>) -> Self {
        Self {
            last_name: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn by_email(value: impl Into<String>) -> Self {
        Self {
            email: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn by_phone(value: impl Into<String>) -> Self {
        Self {
            phone: Some(value.into()),
            ..Self::default()
        }
    }

    /// Resolve the filter to its one criterion. Supplying none is
    /// `MissingCriteria`; supplying several is `AmbiguousCriteria` rather than
    /// silently picking one.
    pub fn criterion(&self) -> Result<SearchBy<'_>> {
        let candidates = [
            ("first_name", self.first_name.as_deref().map(SearchBy::FirstName)),
            ("last_name", self.last_name.as_deref().map(SearchBy::LastName)),
            ("email", self.email.as_deref().map(SearchBy::Email)),
            ("phone", self.phone.as_deref().map(SearchBy::Phone)),
        ];

        let mut supplied = candidates
            .into_iter()
            .filter_map(|(name, criterion)| criterion.map(|c| (name, c)))
            .collect::<Vec<_>>();

        match supplied.len() {
            0 => Err(RegistryError::MissingCriteria),
            1 => Ok(supplied.remove(0).1),
            _ => Err(RegistryError::AmbiguousCriteria {
                supplied: supplied.into_iter().map(|(name, _)| name).collect(),
            }),
        }
    }
}
