//! Customer account errors.

pub type Result<T> = std::result::Result<T, AccountError>;

/// Errors that can occur while managing customer accounts.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("email is already used by another customer")]
    DuplicateEmail,
    #[error("customer not found")]
    CustomerNotFound,
    #[error("password is incorrect")]
    PasswordIncorrect,

    #[error("internal server error")]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

impl AccountError {
    pub fn internal<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Internal(Box::new(err))
    }
}

pub trait ToInternal<T> {
    fn catch(self) -> Result<T>;
}

impl<T, E> ToInternal<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn catch(self) -> Result<T> {
        self.map_err(|e| AccountError::Internal(Box::new(e)))
    }
}
