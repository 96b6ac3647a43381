//! # User Repository
//!
//! Accounts for the local identity provider. Only the password hash is
//! stored; hashing and verification live in the application layer.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use vitrina_core::User;

#[derive(Debug, FromRow)]
struct UserRow {
    id: String,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

/// A user together with their stored password hash.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: User,
    /// PHC string (argon2).
    pub password_hash: String,
}

impl From<UserRow> for Credentials {
    fn from(row: UserRow) -> Self {
        Credentials {
            user: User {
                id: row.id,
                email: row.email,
                created_at: row.created_at,
            },
            password_hash: row.password_hash,
        }
    }
}

/// Repository for user accounts.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Stores a new account.
    ///
    /// ## Returns
    /// * `Ok(User)` - The account, with a fresh id
    /// * `Err(DbError::UniqueViolation)` - Email already registered (compared
    ///   case-insensitively)
    pub async fn create(&self, email: &str, password_hash: &str) -> DbResult<User> {
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            created_at: Utc::now(),
        };

        debug!(id = %user.id, "Creating user");

        sqlx::query("INSERT INTO users (id, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(&user.id)
            .bind(&user.email)
            .bind(password_hash)
            .bind(user.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { .. } => DbError::duplicate("email", email),
                other => other,
            })?;

        Ok(user)
    }

    /// Looks an account up by email, case-insensitively.
    pub async fn find_by_email(&self, email: &str) -> DbResult<Option<Credentials>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, email, password_hash, created_at FROM users WHERE email = ?1 COLLATE NOCASE",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Credentials::from))
    }

    /// Gets an account by id.
    pub async fn get(&self, id: &str) -> DbResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, email, password_hash, created_at FROM users WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|r| Credentials::from(r).user))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    /// Registers a throwaway account and returns its id.
    pub(crate) async fn create_user(db: &Database, email: &str) -> String {
        db.users().create(email, "$argon2id$test").await.unwrap().id
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = db.users().create("ana@tienda.ec", "hash").await.unwrap();

        let found = db.users().find_by_email("ANA@tienda.ec").await.unwrap().unwrap();
        assert_eq!(found.user.id, user.id);
        assert_eq!(found.password_hash, "hash");

        assert_eq!(db.users().get(&user.id).await.unwrap(), Some(user));
        assert!(db.users().find_by_email("luis@tienda.ec").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.users().create("ana@tienda.ec", "hash").await.unwrap();

        let err = db.users().create("Ana@Tienda.ec", "hash").await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "email"));
    }
}
