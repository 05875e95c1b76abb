//! User accounts and wallet balances

use super::{Store, StoreError};
use crate::auth::models::User;
use bcrypt::{hash, verify};
use rusqlite::{params, ErrorCode, OptionalExtension, Row, TransactionBehavior};
use tracing::{debug, info};

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        wallet: row.get(3)?,
    })
}

impl Store {
    /// Create a user with a zero wallet. The password is bcrypt-hashed here.
    pub fn create_user(&self, username: &str, password: &str) -> Result<User, StoreError> {
        let password_hash = hash(password, self.hash_cost)?;

        let conn = self.conn.lock();
        let inserted = conn.execute(
            "INSERT INTO users (username, password_hash, wallet) VALUES (?1, ?2, 0)",
            params![username, password_hash],
        );

        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                return Err(StoreError::UserAlreadyExists(username.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        let user = User {
            id: conn.last_insert_rowid(),
            username: username.to_string(),
            password_hash,
            wallet: 0,
        };
        info!(user_id = user.id, username = %user.username, "Created user");
        Ok(user)
    }

    /// Get user by username
    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let conn = self.conn.lock();
        let user = conn
            .query_row(
                "SELECT id, username, password_hash, wallet FROM users WHERE username = ?1",
                params![username],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    /// Returns the user when the password matches, `None` for an unknown
    /// user or a wrong password.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Option<User>, StoreError> {
        let Some(user) = self.get_user_by_username(username)? else {
            return Ok(None);
        };
        if verify(password, &user.password_hash)? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    pub fn wallet(&self, username: &str) -> Result<i64, StoreError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT wallet FROM users WHERE username = ?1",
            params![username],
            |row| row.get(0),
        )
        .optional()?
        .ok_or(StoreError::UserNotFound)
    }

    /// Add a signed delta to the wallet and return the new balance.
    /// There is no lower bound; the balance may go negative.
    pub fn adjust_wallet(&self, username: &str, delta: i64) -> Result<i64, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let (user_id, balance): (i64, i64) = tx
            .query_row(
                "SELECT id, wallet FROM users WHERE username = ?1",
                params![username],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
            .ok_or(StoreError::UserNotFound)?;

        balance
            .checked_add(delta)
            .ok_or(crate::settlement::SettlementError::AmountOutOfRange)?;

        let updated: i64 = tx.query_row(
            "UPDATE users SET wallet = wallet + ?1 WHERE id = ?2 RETURNING wallet",
            params![delta, user_id],
            |row| row.get(0),
        )?;
        tx.commit()?;

        debug!(username, delta, wallet = updated, "Wallet adjusted");
        Ok(updated)
    }
}
