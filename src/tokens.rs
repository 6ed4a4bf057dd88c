use std::{
    hash::{DefaultHasher, Hash, Hasher},
    sync::Arc,
};

use rand::Rng;
use sqlx::SqlitePool;
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::StoreError;

pub const TOKEN_LENGTH: usize = 80;
pub const TOKEN_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const DEFAULT_TTL: Duration = Duration::minutes(20);

const PAIR_LOCKS: usize = 64;

#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    pub id: i64,
    pub value: String,
    pub valid_to: OffsetDateTime,
    pub room_id: i64,
    pub user_id: i64,
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("id", &self.id)
            .field("value", &"<redacted>")
            .field("valid_to", &self.valid_to)
            .field("room_id", &self.room_id)
            .field("user_id", &self.user_id)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub user_id: i64,
    pub login: String,
    pub room_id: i64,
}

enum Lookup {
    Live(Sender),
    Expired,
    Missing,
}

#[derive(Clone)]
pub struct TokenStore {
    db_pool: SqlitePool,
    ttl: Duration,
    pair_locks: Arc<[Mutex<()>]>,
}

impl TokenStore {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self::with_ttl(db_pool, DEFAULT_TTL)
    }

    pub fn with_ttl(db_pool: SqlitePool, ttl: Duration) -> Self {
        Self {
            db_pool,
            ttl,
            pair_locks: (0..PAIR_LOCKS).map(|_| Mutex::new(())).collect(),
        }
    }

    fn pair_lock(&self, room_id: i64, user_id: i64) -> &Mutex<()> {
        let mut hasher = DefaultHasher::new();
        (room_id, user_id).hash(&mut hasher);
        &self.pair_locks[hasher.finish() as usize % self.pair_locks.len()]
    }

    /// Replaces whatever token the pair held before.
    pub async fn mint(&self, room_id: i64, user_id: i64) -> Result<Token, StoreError> {
        let value = random_value();
        let valid_to = OffsetDateTime::now_utc()
            .checked_add(self.ttl)
            .ok_or(StoreError::Clock)?;

        let _pair = self.pair_lock(room_id, user_id).lock().await;
        let mut tx = self.db_pool.begin().await?;

        let replaced = sqlx::query("DELETE FROM token WHERE room_id=? AND user_id=?")
            .bind(room_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO token (value,valid_to,room_id,user_id) VALUES (?,?,?,?) RETURNING id",
        )
        .bind(&value)
        .bind(valid_to.unix_timestamp())
        .bind(room_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(room_id, user_id, token_id = id, replaced, "minted token");

        Ok(Token { id, value, valid_to, room_id, user_id })
    }

    pub async fn resolve(&self, value: &str) -> Result<Option<Sender>, StoreError> {
        Ok(match self.lookup(value).await? {
            Lookup::Live(sender) => Some(sender),
            Lookup::Expired => {
                debug!("token rejected: expired");
                None
            }
            Lookup::Missing => {
                debug!("token rejected: unknown");
                None
            }
        })
    }

    async fn lookup(&self, value: &str) -> Result<Lookup, StoreError> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let row: Option<(i64, String, i64, bool)> = sqlx::query_as(
            "SELECT app_user.id, app_user.login, token.room_id, token.valid_to >= ? \
             FROM token INNER JOIN app_user ON app_user.id = token.user_id \
             WHERE token.value = ? \
             ORDER BY token.valid_to DESC LIMIT 1",
        )
        .bind(now)
        .bind(value)
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(match row {
            Some((user_id, login, room_id, true)) => Lookup::Live(Sender { user_id, login, room_id }),
            Some((_, _, _, false)) => Lookup::Expired,
            None => Lookup::Missing,
        })
    }

    pub async fn purge_expired(&self) -> Result<u64, StoreError> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        Ok(sqlx::query("DELETE FROM token WHERE valid_to < ?")
            .bind(now)
            .execute(&self.db_pool)
            .await?
            .rows_affected())
    }

    pub async fn revoke_for_user(&self, user_id: i64) -> Result<u64, StoreError> {
        let revoked = sqlx::query("DELETE FROM token WHERE user_id=?")
            .bind(user_id)
            .execute(&self.db_pool)
            .await?
            .rows_affected();

        debug!(user_id, revoked, "revoked tokens");
        Ok(revoked)
    }
}

pub fn spawn_purge(tokens: TokenStore, every: std::time::Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match tokens.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => info!(purged, "purged expired tokens"),
                Err(e) => warn!(error = %e, "token purge failed"),
            }
        }
    })
}

fn random_value() -> String {
    let mut rng = rand::rng();
    (0..TOKEN_LENGTH)
        .map(|_| TOKEN_ALPHABET[rng.random_range(0..TOKEN_ALPHABET.len())] as char)
        .collect()
}
