mod error;
pub mod memory;
pub mod postgres;
mod repository;
mod service;

pub use error::*;
pub use repository::*;
pub use service::*;
#[cfg(test)]
pub(crate) use service::tests::StubEncoder;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier assigned by storage once a [`Customer`] is persisted.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CustomerId(pub i64);

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CustomerId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Customer account as saved on database.
#[derive(Clone, PartialEq, Serialize)]
pub struct Customer {
    /// `None` until persisted.
    pub id: Option<CustomerId>,
    pub email: String,
    pub name: String,
    /// Output of the password encoder, never plaintext.
    #[serde(skip)]
    pub password: String,
}

impl Customer {
    /// Create a new, not yet persisted, [`Customer`].
    pub fn new(
        email: impl Into<String>,
        name: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            email: email.into(),
            name: name.into(),
            password: password_hash.into(),
        }
    }

    /// Update `id` of [`Customer`].
    pub fn with_id(mut self, id: CustomerId) -> Self {
        self.id = Some(id);
        self
    }

    /// Replace `name` of [`Customer`].
    pub fn change_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replace encoded password of [`Customer`].
    pub fn change_password(mut self, password_hash: impl Into<String>) -> Self {
        self.password = password_hash.into();
        self
    }
}

impl fmt::Debug for Customer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Customer")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("name", &self.name)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Public view of a [`Customer`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub name: String,
    pub email: String,
}

impl From<Customer> for CustomerProfile {
    fn from(customer: Customer) -> Self {
        Self {
            name: customer.name,
            email: customer.email,
        }
    }
}
