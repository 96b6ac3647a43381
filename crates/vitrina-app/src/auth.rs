//! # Identity Provider
//!
//! Local email/password accounts and the signed-in session.
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   None ──register(email, pw)──► Some(user) ──logout()──► None           │
//! │     │                              ▲                                    │
//! │     └──────login(email, pw)────────┘                                    │
//! │                                                                         │
//! │   Every transition is pushed to subscribe() receivers (watch channel), │
//! │   which is how AppState knows whose collections to follow.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Password Storage
//! Passwords are hashed with argon2 (default parameters, random salt) and
//! stored as PHC strings. A failed login never says which half was wrong.

use std::sync::Arc;

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use tokio::sync::watch;
use tracing::{info, warn};

use vitrina_core::validation::{validate_email, validate_password};
use vitrina_core::User;
use vitrina_db::{Database, UserRepository};

use crate::error::{AppError, AppResult};

/// The signed-in user, shared by every service of one [`crate::AppState`].
#[derive(Debug, Clone)]
pub struct Session {
    users: UserRepository,
    current: Arc<watch::Sender<Option<User>>>,
}

impl Session {
    pub fn new(db: &Database) -> Self {
        let (current, _) = watch::channel(None);
        Session {
            users: db.users(),
            current: Arc::new(current),
        }
    }

    /// Creates an account and signs it in.
    ///
    /// ## Returns
    /// * `Ok(User)` - The new account
    /// * `Err(ValidationError)` - Malformed email or password shorter than 6
    /// * `Err(Duplicate)` - Email already registered
    pub async fn register(&self, email: &str, password: &str) -> AppResult<User> {
        let email = validate_email(email)?;
        validate_password(password)?;

        let hash = hash_password(password)?;
        let user = self.users.create(&email, &hash).await?;

        info!(user_id = %user.id, "Account registered");
        self.current.send_replace(Some(user.clone()));
        Ok(user)
    }

    /// Signs an existing account in.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<User> {
        let email = email.trim().to_lowercase();

        let Some(credentials) = self.users.find_by_email(&email).await? else {
            warn!("Login failed: unknown account");
            return Err(AppError::invalid_credentials());
        };

        if !verify_password(password, &credentials.password_hash) {
            warn!(user_id = %credentials.user.id, "Login failed: wrong password");
            return Err(AppError::invalid_credentials());
        }

        info!(user_id = %credentials.user.id, "Signed in");
        self.current.send_replace(Some(credentials.user.clone()));
        Ok(credentials.user)
    }

    pub fn logout(&self) {
        if let Some(user) = self.current.send_replace(None) {
            info!(user_id = %user.id, "Signed out");
        }
    }

    /// Receiver that sees every sign-in and sign-out.
    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.current.subscribe()
    }

    pub fn current_user(&self) -> Option<User> {
        self.current.borrow().clone()
    }

    /// The signed-in user, or `Unauthenticated`.
    pub fn require_user(&self) -> AppResult<User> {
        self.current_user().ok_or_else(AppError::unauthenticated)
    }
}

// =============================================================================
// Password Hashing
// =============================================================================

/// Hashes a password into a PHC string.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::internal(format!("Failed to hash password: {}", e)))
}

/// Checks a password against a stored PHC string.
fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Stored password hash is unreadable: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use vitrina_db::DbConfig;

    async fn session() -> Session {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        Session::new(&db)
    }

    #[test]
    fn test_hash_roundtrip() {
        let hash = hash_password("secreto").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("secreto", &hash));
        assert!(!verify_password("Secreto", &hash));
        assert!(!verify_password("secreto", "not a phc string"));
    }

    #[test]
    fn test_each_hash_gets_a_fresh_salt() {
        let a = hash_password("secreto").unwrap();
        let b = hash_password("secreto").unwrap();

        assert_ne!(a, b);
        let salt = |phc: &str| PasswordHash::new(phc).unwrap().salt.map(|s| s.as_str().to_string());
        assert_ne!(salt(&a), salt(&b));
        assert!(verify_password("secreto", &b));
    }

    #[tokio::test]
    async fn test_register_signs_in() {
        let session = session().await;
        let mut changes = session.subscribe();

        let user = session.register("  Ana@Tienda.ec ", "secreto").await.unwrap();
        assert_eq!(user.email, "ana@tienda.ec");
        assert_eq!(session.current_user(), Some(user.clone()));

        assert!(changes.has_changed().unwrap());
        assert_eq!(*changes.borrow_and_update(), Some(user));
    }

    #[tokio::test]
    async fn test_register_rejects_bad_input() {
        let session = session().await;

        let err = session.register("ana", "secreto").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = session.register("ana@tienda.ec", "123").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        session.register("ana@tienda.ec", "secreto").await.unwrap();
        let err = session.register("ANA@tienda.ec", "secreto").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Duplicate);
    }

    #[tokio::test]
    async fn test_login_and_logout() {
        let session = session().await;
        let user = session.register("ana@tienda.ec", "secreto").await.unwrap();
        session.logout();
        assert!(session.current_user().is_none());
        assert_eq!(session.require_user().unwrap_err().code, ErrorCode::Unauthenticated);

        let again = session.login("ANA@tienda.ec", "secreto").await.unwrap();
        assert_eq!(again.id, user.id);
        assert_eq!(session.require_user().unwrap().id, user.id);
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let session = session().await;
        session.register("ana@tienda.ec", "secreto").await.unwrap();
        session.logout();

        let wrong_password = session.login("ana@tienda.ec", "otro-secreto").await.unwrap_err();
        let unknown = session.login("luis@tienda.ec", "secreto").await.unwrap_err();

        assert_eq!(wrong_password.code, ErrorCode::InvalidCredentials);
        assert_eq!(wrong_password.message, unknown.message);
        assert!(session.current_user().is_none());
    }
}
