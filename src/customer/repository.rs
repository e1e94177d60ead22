//! Persistence port for customers.

use async_trait::async_trait;

use crate::customer::{Customer, CustomerId, Result};

/// Entry point to customer storage.
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    /// Open a transaction. Dropping it without [`CustomerTransaction::commit`]
    /// discards every change made through it.
    async fn begin(&self) -> Result<Box<dyn CustomerTransaction>>;
}

/// Operations on customers inside one atomic unit.
#[async_trait]
pub trait CustomerTransaction: Send {
    /// Insert a new customer and return its generated id.
    ///
    /// Fails with [`crate::customer::AccountError::DuplicateEmail`] when the
    /// email is already taken.
    async fn save(&mut self, customer: &Customer) -> Result<CustomerId>;

    /// Find a customer by id without locking it.
    async fn find_by_id(&mut self, id: CustomerId) -> Result<Option<Customer>>;

    /// Find a customer by id, holding it against concurrent writers until
    /// the transaction ends.
    async fn find_by_id_for_update(
        &mut self,
        id: CustomerId,
    ) -> Result<Option<Customer>>;

    /// Find a customer by email.
    async fn find_by_email(&mut self, email: &str) -> Result<Option<Customer>>;

    /// Persist the `name` of `customer`.
    async fn update_profile(&mut self, customer: &Customer) -> Result<()>;

    /// Persist the encoded password of `customer`.
    async fn update_password(&mut self, customer: &Customer) -> Result<()>;

    /// Remove a customer permanently.
    async fn delete(&mut self, id: CustomerId) -> Result<()>;

    /// Make every change visible.
    async fn commit(self: Box<Self>) -> Result<()>;
}
