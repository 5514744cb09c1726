// Account service - registration, login and password management.
//
// Usernames are trimmed before use; passwords are taken as typed.
// Nothing here knows about cookies or terminals, the caller keeps the
// returned Session however it likes.

use super::account_models::{Landing, NewUser, Role, Session, User};
use super::password::{hash_password, verify_password, DEFAULT_ITERATIONS};
use async_trait::async_trait;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Username '{0}' is already taken")]
    UsernameTaken(String),

    #[error("Username and password are required")]
    MissingFields,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Account not found")]
    NotFound,
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Trait for persisting accounts.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert a new account. A duplicate username yields `UsernameTaken`.
    async fn create_user(&self, user: NewUser) -> Result<User, AccountError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AccountError>;

    async fn find_by_id(&self, user_id: i64) -> Result<Option<User>, AccountError>;

    async fn update_password(&self, user_id: i64, password_hash: &str)
        -> Result<(), AccountError>;

    async fn delete_user(&self, user_id: i64) -> Result<(), AccountError>;

    /// Students of one school, oldest account first.
    async fn list_students(&self, school_id: i64) -> Result<Vec<User>, AccountError>;

    async fn count_students(&self, school_id: i64) -> Result<u64, AccountError>;
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct AccountConfig {
    /// Work factor for password hashing.
    pub hash_iterations: u32,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            hash_iterations: DEFAULT_ITERATIONS,
        }
    }
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct AccountService<A: AccountStore> {
    store: A,
    config: AccountConfig,
}

impl<A: AccountStore> AccountService<A> {
    pub fn new(store: A) -> Self {
        Self {
            store,
            config: AccountConfig::default(),
        }
    }

    pub fn new_with_config(store: A, config: AccountConfig) -> Self {
        Self { store, config }
    }

    /// Register a regular forum account.
    pub async fn register(&self, username: &str, password: &str) -> Result<User, AccountError> {
        let user = self
            .create_account(username, password, Role::User, None)
            .await?;
        tracing::info!(user_id = user.id, username = %user.username, "Account registered");
        Ok(user)
    }

    /// Log in with any role.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, AccountError> {
        let user = self.authenticate(username, password).await?;
        tracing::info!(user_id = user.id, role = %user.role, "Login succeeded");
        Ok(Session::from(&user))
    }

    /// Log in through the school entrance: teachers and students only.
    pub async fn school_login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Session, AccountError> {
        let user = self.authenticate(username, password).await?;
        if !user.role.is_school_member() {
            return Err(AccountError::InvalidCredentials);
        }
        Ok(Session::from(&user))
    }

    /// Where the session should go right after login.
    pub fn landing(&self, session: &Session) -> Landing {
        match (session.role, session.school_id) {
            (Role::Teacher, _) => Landing::TeacherDashboard,
            (Role::Student, Some(school_id)) => Landing::Spotted { school_id },
            _ => Landing::Forum,
        }
    }

    pub async fn change_password(
        &self,
        session: &Session,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AccountError> {
        if new_password.is_empty() {
            return Err(AccountError::MissingFields);
        }
        let user = self
            .store
            .find_by_id(session.user_id)
            .await?
            .ok_or(AccountError::InvalidCredentials)?;
        if !verify_password(old_password, &user.password_hash) {
            return Err(AccountError::InvalidCredentials);
        }
        self.set_password(user.id, new_password).await?;
        tracing::info!(user_id = user.id, "Password changed");
        Ok(())
    }

    pub async fn profile(&self, session: &Session) -> Result<User, AccountError> {
        self.store
            .find_by_id(session.user_id)
            .await?
            .ok_or(AccountError::NotFound)
    }

    // ------------------------------------------------------------------------
    // Helpers shared with the school service
    // ------------------------------------------------------------------------

    /// Validate, hash and insert an account of any role.
    pub async fn create_account(
        &self,
        username: &str,
        password: &str,
        role: Role,
        school_id: Option<i64>,
    ) -> Result<User, AccountError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AccountError::MissingFields);
        }

        self.store
            .create_user(NewUser {
                username: username.to_string(),
                password_hash: hash_password(password, self.config.hash_iterations),
                role,
                school_id,
            })
            .await
    }

    pub async fn username_available(&self, username: &str) -> Result<bool, AccountError> {
        Ok(self
            .store
            .find_by_username(username.trim())
            .await?
            .is_none())
    }

    pub async fn get_user(&self, user_id: i64) -> Result<Option<User>, AccountError> {
        self.store.find_by_id(user_id).await
    }

    pub async fn set_password(&self, user_id: i64, password: &str) -> Result<(), AccountError> {
        if password.is_empty() {
            return Err(AccountError::MissingFields);
        }
        let hash = hash_password(password, self.config.hash_iterations);
        self.store.update_password(user_id, &hash).await
    }

    pub async fn delete_user(&self, user_id: i64) -> Result<(), AccountError> {
        self.store.delete_user(user_id).await
    }

    pub async fn students(&self, school_id: i64) -> Result<Vec<User>, AccountError> {
        self.store.list_students(school_id).await
    }

    pub async fn student_count(&self, school_id: i64) -> Result<u64, AccountError> {
        self.store.count_students(school_id).await
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<User, AccountError> {
        let user = self
            .store
            .find_by_username(username.trim())
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        if verify_password(password, &user.password_hash) {
            Ok(user)
        } else {
            tracing::warn!(username = %user.username, "Login rejected: wrong password");
            Err(AccountError::InvalidCredentials)
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::memory::InMemoryStore;

    fn service() -> AccountService<InMemoryStore> {
        AccountService::new_with_config(
            InMemoryStore::new(),
            AccountConfig {
                hash_iterations: 10,
            },
        )
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let service = service();
        let user = service.register("  ala ", "kot").await.unwrap();
        assert_eq!(user.username, "ala");
        assert_eq!(user.role, Role::User);
        assert_eq!(user.school_id, None);
        assert_ne!(user.password_hash, "kot");

        let session = service.login("ala", "kot").await.unwrap();
        assert_eq!(session.user_id, user.id);
        assert_eq!(service.landing(&session), Landing::Forum);
    }

    #[tokio::test]
    async fn test_register_requires_fields() {
        let service = service();
        assert!(matches!(
            service.register("   ", "x").await,
            Err(AccountError::MissingFields)
        ));
        assert!(matches!(
            service.register("ala", "").await,
            Err(AccountError::MissingFields)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let service = service();
        service.register("ala", "kot").await.unwrap();
        assert!(matches!(
            service.register("ala", "pies").await,
            Err(AccountError::UsernameTaken(name)) if name == "ala"
        ));
    }

    #[tokio::test]
    async fn test_wrong_credentials() {
        let service = service();
        service.register("ala", "kot").await.unwrap();
        assert!(matches!(
            service.login("ala", "pies").await,
            Err(AccountError::InvalidCredentials)
        ));
        assert!(matches!(
            service.login("ola", "kot").await,
            Err(AccountError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_school_login_rejects_regular_users() {
        let service = service();
        service.register("ala", "kot").await.unwrap();
        service
            .create_account("pani", "tablica", Role::Teacher, Some(7))
            .await
            .unwrap();
        service
            .create_account("jas", "zeszyt", Role::Student, Some(7))
            .await
            .unwrap();

        assert!(matches!(
            service.school_login("ala", "kot").await,
            Err(AccountError::InvalidCredentials)
        ));

        let teacher = service.school_login("pani", "tablica").await.unwrap();
        assert_eq!(service.landing(&teacher), Landing::TeacherDashboard);

        let student = service.school_login("jas", "zeszyt").await.unwrap();
        assert_eq!(
            service.landing(&student),
            Landing::Spotted { school_id: 7 }
        );
    }

    #[tokio::test]
    async fn test_change_password() {
        let service = service();
        service.register("ala", "kot").await.unwrap();
        let session = service.login("ala", "kot").await.unwrap();

        assert!(matches!(
            service.change_password(&session, "zle", "nowe").await,
            Err(AccountError::InvalidCredentials)
        ));
        assert!(matches!(
            service.change_password(&session, "kot", "").await,
            Err(AccountError::MissingFields)
        ));

        service
            .change_password(&session, "kot", "nowe")
            .await
            .unwrap();
        assert!(service.login("ala", "kot").await.is_err());
        assert!(service.login("ala", "nowe").await.is_ok());
    }

    #[tokio::test]
    async fn test_profile() {
        let service = service();
        let user = service.register("ala", "kot").await.unwrap();
        let session = Session::from(&user);
        let profile = service.profile(&session).await.unwrap();
        assert_eq!(profile.username, "ala");

        service.delete_user(user.id).await.unwrap();
        assert!(matches!(
            service.profile(&session).await,
            Err(AccountError::NotFound)
        ));
    }
}
