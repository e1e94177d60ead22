//! In-memory customer storage.
//!
//! Transactions are serialized: one holds the lock from `begin` until it is
//! committed or dropped.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::customer::{
    AccountError, Customer, CustomerId, CustomerRepository,
    CustomerTransaction, Result,
};

#[derive(Clone, Debug, Default)]
struct State {
    last_id: i64,
    customers: BTreeMap<CustomerId, Customer>,
}

/// Customer repository kept in process memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryCustomerRepository {
    state: Arc<Mutex<State>>,
}

impl MemoryCustomerRepository {
    /// Create an empty [`MemoryCustomerRepository`].
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CustomerRepository for MemoryCustomerRepository {
    async fn begin(&self) -> Result<Box<dyn CustomerTransaction>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();

        Ok(Box::new(MemoryTransaction { guard, staged }))
    }
}

struct MemoryTransaction {
    guard: OwnedMutexGuard<State>,
    staged: State,
}

impl MemoryTransaction {
    fn stored_mut(&mut self, customer: &Customer) -> Result<&mut Customer> {
        customer
            .id
            .and_then(|id| self.staged.customers.get_mut(&id))
            .ok_or(AccountError::CustomerNotFound)
    }
}

#[async_trait]
impl CustomerTransaction for MemoryTransaction {
    async fn save(&mut self, customer: &Customer) -> Result<CustomerId> {
        if self
            .staged
            .customers
            .values()
            .any(|c| c.email == customer.email)
        {
            return Err(AccountError::DuplicateEmail);
        }

        self.staged.last_id += 1;
        let id = CustomerId(self.staged.last_id);
        self.staged
            .customers
            .insert(id, customer.clone().with_id(id));

        Ok(id)
    }

    async fn find_by_id(&mut self, id: CustomerId) -> Result<Option<Customer>> {
        Ok(self.staged.customers.get(&id).cloned())
    }

    async fn find_by_id_for_update(
        &mut self,
        id: CustomerId,
    ) -> Result<Option<Customer>> {
        // The whole store is already held by this transaction.
        self.find_by_id(id).await
    }

    async fn find_by_email(&mut self, email: &str) -> Result<Option<Customer>> {
        Ok(self
            .staged
            .customers
            .values()
            .find(|c| c.email == email)
            .cloned())
    }

    async fn update_profile(&mut self, customer: &Customer) -> Result<()> {
        self.stored_mut(customer)?.name = customer.name.clone();
        Ok(())
    }

    async fn update_password(&mut self, customer: &Customer) -> Result<()> {
        self.stored_mut(customer)?.password = customer.password.clone();
        Ok(())
    }

    async fn delete(&mut self, id: CustomerId) -> Result<()> {
        self.staged
            .customers
            .remove(&id)
            .map(|_| ())
            .ok_or(AccountError::CustomerNotFound)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTransaction { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}
