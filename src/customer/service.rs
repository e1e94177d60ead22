use std::sync::{Arc, OnceLock};

use crate::crypto::PasswordEncoder;
use crate::customer::{
    AccountError, Customer, CustomerId, CustomerProfile, CustomerRepository,
    Result, ToInternal,
};

/// Compared against when an email is unknown, so that a failed login costs
/// the same hash check either way.
const DUMMY_PASSWORD: &str = "dummy password, never assigned";

/// Customer account manager.
///
/// Every operation runs in its own repository transaction: checks happen
/// first and nothing is committed when one of them fails.
#[derive(Clone)]
pub struct CustomerService {
    repo: Arc<dyn CustomerRepository>,
    encoder: Arc<dyn PasswordEncoder>,
    dummy_hash: Arc<OnceLock<String>>,
}

impl CustomerService {
    /// Create a new [`CustomerService`].
    pub fn new(
        repo: Arc<dyn CustomerRepository>,
        encoder: Arc<dyn PasswordEncoder>,
    ) -> Self {
        Self {
            repo,
            encoder,
            dummy_hash: Arc::new(OnceLock::new()),
        }
    }

    /// Register a new customer.
    #[tracing::instrument(skip(self, password))]
    pub async fn create(
        &self,
        email: &str,
        name: &str,
        password: &str,
    ) -> Result<CustomerId> {
        // Hashing is slow, keep it out of the transaction.
        let hash = self.encoder.encode(password).catch()?;
        let mut tx = self.repo.begin().await?;

        if tx.find_by_email(email).await?.is_some() {
            tracing::debug!("email already registered");
            return Err(AccountError::DuplicateEmail);
        }

        let id = tx.save(&Customer::new(email, name, hash)).await?;
        tx.commit().await?;

        tracing::info!(customer_id = %id, "customer created");
        Ok(id)
    }

    /// Get public data of a customer.
    #[tracing::instrument(skip(self))]
    pub async fn find_by_id(&self, id: CustomerId) -> Result<CustomerProfile> {
        let mut tx = self.repo.begin().await?;
        let customer = tx
            .find_by_id(id)
            .await?
            .ok_or(AccountError::CustomerNotFound)?;

        Ok(customer.into())
    }

    /// Get a customer, with its credentials, using its email.
    #[tracing::instrument(skip(self))]
    pub async fn find_by_email(&self, email: &str) -> Result<Customer> {
        let mut tx = self.repo.begin().await?;
        tx.find_by_email(email)
            .await?
            .ok_or(AccountError::CustomerNotFound)
    }

    /// Replace the name of a customer.
    #[tracing::instrument(skip(self))]
    pub async fn update_profile(
        &self,
        id: CustomerId,
        name: &str,
    ) -> Result<CustomerId> {
        let mut tx = self.repo.begin().await?;
        let customer = tx
            .find_by_id_for_update(id)
            .await?
            .ok_or(AccountError::CustomerNotFound)?;

        tx.update_profile(&customer.change_name(name)).await?;
        tx.commit().await?;

        tracing::info!(customer_id = %id, "profile updated");
        Ok(id)
    }

    /// Replace the password of a customer once `old_password` is proven.
    #[tracing::instrument(skip(self, old_password, new_password))]
    pub async fn update_password(
        &self,
        id: CustomerId,
        old_password: &str,
        new_password: &str,
    ) -> Result<CustomerId> {
        let mut tx = self.repo.begin().await?;
        let customer = tx
            .find_by_id_for_update(id)
            .await?
            .ok_or(AccountError::CustomerNotFound)?;
        self.check_password(&customer, old_password)?;

        let hash = self.encoder.encode(new_password).catch()?;
        tx.update_password(&customer.change_password(hash)).await?;
        tx.commit().await?;

        tracing::info!(customer_id = %id, "password updated");
        Ok(id)
    }

    /// Remove a customer permanently once `password` is proven.
    #[tracing::instrument(skip(self, password))]
    pub async fn delete(
        &self,
        id: CustomerId,
        password: &str,
    ) -> Result<CustomerId> {
        let mut tx = self.repo.begin().await?;
        let customer = tx
            .find_by_id_for_update(id)
            .await?
            .ok_or(AccountError::CustomerNotFound)?;
        self.check_password(&customer, password)?;

        tx.delete(id).await?;
        tx.commit().await?;

        tracing::info!(customer_id = %id, "customer deleted");
        Ok(id)
    }

    /// Get a customer using its email once `password` is proven.
    ///
    /// An unknown email still costs one hash check.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Customer> {
        let customer = match self.find_by_email(email).await {
            Ok(customer) => customer,
            Err(AccountError::CustomerNotFound) => {
                if let Some(hash) = self.dummy_hash() {
                    let _ = self.encoder.matches(password, hash);
                }
                return Err(AccountError::CustomerNotFound);
            },
            Err(err) => return Err(err),
        };

        self.check_password(&customer, password)?;
        Ok(customer)
    }

    fn dummy_hash(&self) -> Option<&str> {
        if let Some(hash) = self.dummy_hash.get() {
            return Some(hash.as_str());
        }

        let hash = self.encoder.encode(DUMMY_PASSWORD).ok()?;
        Some(self.dummy_hash.get_or_init(|| hash).as_str())
    }

    /// Check `password` against the stored hash of `customer`.
    pub fn check_password(&self, customer: &Customer, password: &str) -> Result<()> {
        if self.encoder.matches(password, &customer.password) {
            Ok(())
        } else {
            tracing::warn!(customer_id = ?customer.id, "password mismatch");
            Err(AccountError::PasswordIncorrect)
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::crypto::CryptoError;
    use crate::customer::memory::MemoryCustomerRepository;

    /// Reversible encoder keeping tests fast.
    pub(crate) struct StubEncoder;

    impl PasswordEncoder for StubEncoder {
        fn encode(&self, plaintext: &str) -> std::result::Result<String, CryptoError> {
            Ok(format!("stub${plaintext}"))
        }

        fn matches(&self, plaintext: &str, hash: &str) -> bool {
            hash.strip_prefix("stub$") == Some(plaintext)
        }
    }

    /// Stub encoder taking `delay` to hash and counting comparisons.
    #[derive(Default)]
    struct SlowEncoder {
        delay: Duration,
        comparisons: AtomicUsize,
    }

    impl PasswordEncoder for SlowEncoder {
        fn encode(&self, plaintext: &str) -> std::result::Result<String, CryptoError> {
            std::thread::sleep(self.delay);
            StubEncoder.encode(plaintext)
        }

        fn matches(&self, plaintext: &str, hash: &str) -> bool {
            self.comparisons.fetch_add(1, Ordering::SeqCst);
            StubEncoder.matches(plaintext, hash)
        }
    }

    pub(crate) fn service() -> CustomerService {
        CustomerService::new(
            Arc::new(MemoryCustomerRepository::new()),
            Arc::new(StubEncoder),
        )
    }

    #[tokio::test]
    async fn test_create_then_find() {
        let service = service();
        let id = service.create("a@x.com", "Ann", "pw1").await.unwrap();

        let profile = service.find_by_id(id).await.unwrap();
        assert_eq!(profile.email, "a@x.com");
        assert_eq!(profile.name, "Ann");
    }

    #[tokio::test]
    async fn test_password_is_encoded() {
        let service = service();
        service.create("a@x.com", "Ann", "pw1").await.unwrap();

        let customer = service.find_by_email("a@x.com").await.unwrap();
        assert_ne!(customer.password, "pw1");
        assert!(service.check_password(&customer, "pw1").is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let service = service();
        service.create("a@x.com", "Ann", "pw1").await.unwrap();

        let err = service.create("a@x.com", "Bob", "pw2").await.unwrap_err();
        assert!(matches!(err, AccountError::DuplicateEmail));

        // Nothing else was written.
        let customer = service.find_by_email("a@x.com").await.unwrap();
        assert_eq!(customer.name, "Ann");
    }

    #[tokio::test]
    async fn test_concurrent_registration() {
        let service = service();

        let (first, second) = tokio::join!(
            service.create("race@x.com", "Ann", "pw1"),
            service.create("race@x.com", "Bob", "pw2"),
        );

        assert!(first.is_ok() ^ second.is_ok());
    }

    #[tokio::test]
    async fn test_not_found() {
        let service = service();

        assert!(matches!(
            service.find_by_id(CustomerId(42)).await,
            Err(AccountError::CustomerNotFound)
        ));
        assert!(matches!(
            service.find_by_email("nobody@x.com").await,
            Err(AccountError::CustomerNotFound)
        ));
        assert!(matches!(
            service.update_profile(CustomerId(42), "Ann").await,
            Err(AccountError::CustomerNotFound)
        ));
        assert!(matches!(
            service.update_password(CustomerId(42), "a", "b").await,
            Err(AccountError::CustomerNotFound)
        ));
        assert!(matches!(
            service.delete(CustomerId(42), "a").await,
            Err(AccountError::CustomerNotFound)
        ));
    }

    #[tokio::test]
    async fn test_update_profile_keeps_credentials() {
        let service = service();
        let id = service.create("a@x.com", "Ann", "pw1").await.unwrap();

        assert_eq!(service.update_profile(id, "Annie").await.unwrap(), id);

        let customer = service.find_by_email("a@x.com").await.unwrap();
        assert_eq!(customer.name, "Annie");
        assert!(service.check_password(&customer, "pw1").is_ok());
    }

    #[tokio::test]
    async fn test_password_rotation() {
        let service = service();
        let id = service.create("a@x.com", "Ann", "old").await.unwrap();

        assert!(matches!(
            service.update_password(id, "wrong", "new").await,
            Err(AccountError::PasswordIncorrect)
        ));

        service.update_password(id, "old", "new").await.unwrap();
        service.update_password(id, "new", "newer").await.unwrap();

        let customer = service.find_by_email("a@x.com").await.unwrap();
        assert!(service.check_password(&customer, "old").is_err());
        assert!(service.check_password(&customer, "new").is_err());
        assert!(service.check_password(&customer, "newer").is_ok());
    }

    #[tokio::test]
    async fn test_delete() {
        let service = service();
        let id = service.create("a@x.com", "Ann", "pw1").await.unwrap();

        assert!(matches!(
            service.delete(id, "wrong").await,
            Err(AccountError::PasswordIncorrect)
        ));
        assert!(service.find_by_id(id).await.is_ok());

        assert_eq!(service.delete(id, "pw1").await.unwrap(), id);
        assert!(matches!(
            service.find_by_id(id).await,
            Err(AccountError::CustomerNotFound)
        ));

        // Email is free again.
        assert!(service.create("a@x.com", "Ann", "pw1").await.is_ok());
    }

    #[tokio::test]
    async fn test_account_scenario() {
        let service = service();

        let id = service.create("a@x.com", "Ann", "pw1").await.unwrap();
        assert_eq!(id, CustomerId(1));

        assert!(matches!(
            service.create("a@x.com", "Bob", "pw2").await,
            Err(AccountError::DuplicateEmail)
        ));

        service.update_profile(id, "Annie").await.unwrap();
        assert_eq!(
            service.find_by_id(id).await.unwrap(),
            CustomerProfile {
                name: "Annie".into(),
                email: "a@x.com".into()
            }
        );

        service.update_password(id, "pw1", "pw2").await.unwrap();
        assert!(matches!(
            service.update_password(id, "pw1", "pw3").await,
            Err(AccountError::PasswordIncorrect)
        ));
    }

    #[tokio::test]
    async fn test_with_argon2() {
        let service = CustomerService::new(
            Arc::new(MemoryCustomerRepository::new()),
            Arc::new(crate::crypto::fast_encoder()),
        );
        let id = service.create("a@x.com", "Ann", "pw1").await.unwrap();

        service.update_password(id, "pw1", "pw2").await.unwrap();
        assert!(matches!(
            service.delete(id, "pw1").await,
            Err(AccountError::PasswordIncorrect)
        ));
        service.delete(id, "pw2").await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_password_change() {
        let service = service();
        let id = service.create("a@x.com", "Ann", "old").await.unwrap();

        let first = tokio::spawn({
            let service = service.clone();
            async move { service.update_password(id, "old", "a").await }
        });
        let second = tokio::spawn({
            let service = service.clone();
            async move { service.update_password(id, "old", "b").await }
        });
        let (first, second) = (first.await.unwrap(), second.await.unwrap());

        assert!(first.is_ok() ^ second.is_ok());
        let loser = if first.is_ok() { second } else { first };
        assert!(matches!(loser, Err(AccountError::PasswordIncorrect)));

        // Exactly the winner's password is stored.
        let customer = service.find_by_email("a@x.com").await.unwrap();
        let a = service.check_password(&customer, "a").is_ok();
        let b = service.check_password(&customer, "b").is_ok();
        assert!(a ^ b);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_delete() {
        let service = service();
        let id = service.create("a@x.com", "Ann", "pw1").await.unwrap();

        let first = tokio::spawn({
            let service = service.clone();
            async move { service.delete(id, "pw1").await }
        });
        let second = tokio::spawn({
            let service = service.clone();
            async move { service.delete(id, "pw1").await }
        });
        let (first, second) = (first.await.unwrap(), second.await.unwrap());

        assert!(first.is_ok() ^ second.is_ok());
        let loser = if first.is_ok() { second } else { first };
        assert!(matches!(loser, Err(AccountError::CustomerNotFound)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_hashing_does_not_block_readers() {
        let service = CustomerService::new(
            Arc::new(MemoryCustomerRepository::new()),
            Arc::new(SlowEncoder {
                delay: Duration::from_millis(300),
                ..Default::default()
            }),
        );
        let id = service.create("a@x.com", "Ann", "pw1").await.unwrap();

        let registration = tokio::spawn({
            let service = service.clone();
            async move { service.create("b@x.com", "Bob", "pw2").await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let start = std::time::Instant::now();
        service.find_by_id(id).await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(200));

        registration.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_login() {
        let encoder = Arc::new(SlowEncoder::default());
        let service = CustomerService::new(
            Arc::new(MemoryCustomerRepository::new()),
            encoder.clone(),
        );
        let id = service.create("a@x.com", "Ann", "pw1").await.unwrap();

        let customer = service.login("a@x.com", "pw1").await.unwrap();
        assert_eq!(customer.id, Some(id));
        assert!(matches!(
            service.login("a@x.com", "wrong").await,
            Err(AccountError::PasswordIncorrect)
        ));
        assert_eq!(encoder.comparisons.load(Ordering::SeqCst), 2);

        // Unknown emails still compare against a hash.
        assert!(matches!(
            service.login("nobody@x.com", "pw1").await,
            Err(AccountError::CustomerNotFound)
        ));
        assert_eq!(encoder.comparisons.load(Ordering::SeqCst), 3);
        assert!(service.login("nobody@x.com", "pw1").await.is_err());
        assert_eq!(encoder.comparisons.load(Ordering::SeqCst), 4);
    }
}
