pub mod password;
pub mod token;

pub use token::{Claims, TokenIssuer};

use std::sync::LazyLock;

use regex::Regex;

use crate::catalog::Catalog;
use crate::error::{AppError, AppResult};
use crate::models::User;

pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Registration and credential checks shared by the gRPC auth service and
/// the client-side session.
#[derive(Clone)]
pub struct Accounts {
    catalog: Catalog,
}

impl Accounts {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    pub async fn register(&self, email: &str, password: &str, name: &str) -> AppResult<User> {
        validate_registration(email, password, name)?;

        if self.catalog.find_user_by_email(email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let record = self.catalog.create_user(email, password, name).await?;
        Ok(User::from(record))
    }

    /// Unknown email and wrong password fail the same way.
    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<User> {
        let record = self
            .catalog
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| AppError::Unauthenticated(INVALID_CREDENTIALS.to_string()))?;

        if !password::verify_password(password, &record.password_hash)? {
            tracing::debug!("Password mismatch: user_id={}", record.id);
            return Err(AppError::Unauthenticated(INVALID_CREDENTIALS.to_string()));
        }

        Ok(User::from(record))
    }
}

fn validate_registration(email: &str, password: &str, name: &str) -> AppResult<()> {
    if !EMAIL_RE.is_match(email.trim()) {
        return Err(AppError::InvalidInput("A valid email is required".to_string()));
    }
    if name.trim().is_empty() {
        return Err(AppError::InvalidInput("name is required".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::InvalidInput(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}
