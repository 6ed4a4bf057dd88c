use std::str::FromStr;

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

use crate::{config::DatabaseConfig, error::StoreError};

/// Open the pool described by `config` and bring the schema up to date.
pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool, StoreError> {
    let options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let db_pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;

    migrate(&db_pool).await?;
    Ok(db_pool)
}

/// Single-connection in-memory database; every pooled connection to
/// `:memory:` would otherwise see its own empty schema.
pub async fn connect_in_memory() -> Result<SqlitePool, StoreError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let db_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    migrate(&db_pool).await?;
    Ok(db_pool)
}

async fn migrate(db_pool: &SqlitePool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations")
        .run(db_pool)
        .await
        .map_err(|e| StoreError::Database(e.into()))
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Room {
    pub id: i64,
    pub name: String,
}

impl Room {
    pub async fn find(db_pool: &SqlitePool, id: i64) -> Result<Option<Room>, StoreError> {
        Ok(sqlx::query_as("SELECT id,name FROM room WHERE id=?")
            .bind(id)
            .fetch_optional(db_pool)
            .await?)
    }

    pub async fn find_all(db_pool: &SqlitePool) -> Result<Vec<Room>, StoreError> {
        Ok(sqlx::query_as("SELECT id,name FROM room ORDER BY id")
            .fetch_all(db_pool)
            .await?)
    }

    pub async fn insert(db_pool: &SqlitePool, id: i64, name: &str) -> Result<Room, StoreError> {
        sqlx::query("INSERT INTO room (id,name) VALUES (?,?)")
            .bind(id)
            .bind(name)
            .execute(db_pool)
            .await?;

        Ok(Room { id, name: name.to_owned() })
    }
}

/// Account row. `password` holds an Argon2 PHC string, never plaintext.
#[derive(Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub login: String,
    pub email: String,
    pub password: String,
    /// Unix seconds.
    pub created_at: i64,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("login", &self.login)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl User {
    pub async fn find(db_pool: &SqlitePool, id: i64) -> Result<Option<User>, StoreError> {
        Ok(sqlx::query_as("SELECT id,login,email,password,created_at FROM app_user WHERE id=?")
            .bind(id)
            .fetch_optional(db_pool)
            .await?)
    }

    pub async fn find_by_login(db_pool: &SqlitePool, login: &str) -> Result<Option<User>, StoreError> {
        Ok(sqlx::query_as("SELECT id,login,email,password,created_at FROM app_user WHERE login=? LIMIT 1")
            .bind(login)
            .fetch_optional(db_pool)
            .await?)
    }

    pub async fn login_taken(db_pool: &SqlitePool, login: &str) -> Result<bool, StoreError> {
        Ok(sqlx::query("SELECT 1 FROM app_user WHERE login=? LIMIT 1")
            .bind(login)
            .fetch_optional(db_pool)
            .await?
            .is_some())
    }

    pub async fn email_taken(db_pool: &SqlitePool, email: &str) -> Result<bool, StoreError> {
        Ok(sqlx::query("SELECT 1 FROM app_user WHERE email=? LIMIT 1")
            .bind(email)
            .fetch_optional(db_pool)
            .await?
            .is_some())
    }

    /// Insert a new account. `password_hash` must already be hashed.
    pub async fn insert(
        db_pool: &SqlitePool,
        login: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<i64, StoreError> {
        Ok(sqlx::query_scalar("INSERT INTO app_user (login,email,password) VALUES (?,?,?) RETURNING id")
            .bind(login)
            .bind(email)
            .bind(password_hash)
            .fetch_one(db_pool)
            .await?)
    }
}
