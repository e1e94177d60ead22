//! PostgreSQL implementation for customer repository.

use async_trait::async_trait;
use sqlx::postgres::PgQueryResult;
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use crate::customer::{
    AccountError, Customer, CustomerId, CustomerRepository,
    CustomerTransaction, Result, ToInternal,
};

/// Customer record as stored in the database.
#[derive(Debug, Clone, FromRow)]
struct CustomerRecord {
    id: i64,
    email: String,
    name: String,
    password: String,
}

impl From<CustomerRecord> for Customer {
    fn from(record: CustomerRecord) -> Self {
        Customer::new(record.email, record.name, record.password)
            .with_id(CustomerId(record.id))
    }
}

/// PostgreSQL customer repository.
#[derive(Clone)]
pub struct PgCustomerRepository {
    pool: PgPool,
}

impl PgCustomerRepository {
    /// Create a new [`PgCustomerRepository`].
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerRepository for PgCustomerRepository {
    async fn begin(&self) -> Result<Box<dyn CustomerTransaction>> {
        let tx = self.pool.begin().await.catch()?;
        Ok(Box::new(PgCustomerTransaction { tx }))
    }
}

struct PgCustomerTransaction {
    tx: Transaction<'static, Postgres>,
}

/// Turn a rejected insert on `customers_email_key` into a typed error.
fn on_insert(err: sqlx::Error) -> AccountError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return AccountError::DuplicateEmail;
        }
    }
    AccountError::internal(err)
}

fn affected(result: PgQueryResult) -> Result<()> {
    if result.rows_affected() == 0 {
        return Err(AccountError::CustomerNotFound);
    }
    Ok(())
}

#[async_trait]
impl CustomerTransaction for PgCustomerTransaction {
    async fn save(&mut self, customer: &Customer) -> Result<CustomerId> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO customers (email, name, password)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(&customer.email)
        .bind(&customer.name)
        .bind(&customer.password)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(on_insert)?;

        Ok(CustomerId(id))
    }

    async fn find_by_id(&mut self, id: CustomerId) -> Result<Option<Customer>> {
        let record = sqlx::query_as::<_, CustomerRecord>(
            r#"
            SELECT id, email, name, password
            FROM customers
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&mut *self.tx)
        .await
        .catch()?;

        Ok(record.map(Customer::from))
    }

    async fn find_by_id_for_update(
        &mut self,
        id: CustomerId,
    ) -> Result<Option<Customer>> {
        let record = sqlx::query_as::<_, CustomerRecord>(
            r#"
            SELECT id, email, name, password
            FROM customers
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.0)
        .fetch_optional(&mut *self.tx)
        .await
        .catch()?;

        Ok(record.map(Customer::from))
    }

    async fn find_by_email(&mut self, email: &str) -> Result<Option<Customer>> {
        let record = sqlx::query_as::<_, CustomerRecord>(
            r#"
            SELECT id, email, name, password
            FROM customers
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&mut *self.tx)
        .await
        .catch()?;

        Ok(record.map(Customer::from))
    }

    async fn update_profile(&mut self, customer: &Customer) -> Result<()> {
        let id = customer.id.ok_or(AccountError::CustomerNotFound)?;

        let result = sqlx::query(r#"UPDATE customers SET name = $2 WHERE id = $1"#)
            .bind(id.0)
            .bind(&customer.name)
            .execute(&mut *self.tx)
            .await
            .catch()?;

        affected(result)
    }

    async fn update_password(&mut self, customer: &Customer) -> Result<()> {
        let id = customer.id.ok_or(AccountError::CustomerNotFound)?;

        let result =
            sqlx::query(r#"UPDATE customers SET password = $2 WHERE id = $1"#)
                .bind(id.0)
                .bind(&customer.password)
                .execute(&mut *self.tx)
                .await
                .catch()?;

        affected(result)
    }

    async fn delete(&mut self, id: CustomerId) -> Result<()> {
        let result = sqlx::query(r#"DELETE FROM customers WHERE id = $1"#)
            .bind(id.0)
            .execute(&mut *self.tx)
            .await
            .catch()?;

        affected(result)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.catch()
    }
}
