//! Ticket persistence and the settlement transaction

use super::{decode_timestamp, encode_timestamp, Store, StoreError};
use crate::models::{Game, GameCreateRequest, SettledBatch};
use crate::settlement::{self, NumberRules, SettlementError};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row, TransactionBehavior};
use tracing::{debug, info};

fn game_from_row(row: &Row<'_>) -> rusqlite::Result<Game> {
    let created_at: String = row.get(9)?;
    Ok(Game {
        id: row.get(0)?,
        number1: row.get(1)?,
        number2: row.get(2)?,
        number3: row.get(3)?,
        number4: row.get(4)?,
        dealer: row.get(5)?,
        prize: row.get(6)?,
        user_id: row.get(7)?,
        win: row.get(8)?,
        created_at: decode_timestamp(9, &created_at)?,
    })
}

impl Store {
    /// Settle a ticket batch for `username` and persist it.
    ///
    /// Ticket inserts and the wallet change commit in one transaction. Any
    /// validation failure returns before a single row is written.
    pub fn settle_batch(
        &self,
        username: &str,
        batch: &[GameCreateRequest],
        rules: &NumberRules,
    ) -> Result<SettledBatch, StoreError> {
        if settlement::ticket_cost(batch.len()).is_none() {
            return Err(SettlementError::InvalidBatchSize(batch.len()).into());
        }

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

        let outcome = settlement::settle(batch, rules, Utc::now())?;
        let delta = outcome.wallet_delta()?;
        // SQLite turns an overflowing integer sum into a REAL
        balance
            .checked_add(delta)
            .ok_or(SettlementError::AmountOutOfRange)?;

        let mut games = Vec::with_capacity(outcome.tickets.len());
        {
            let mut insert = tx.prepare_cached(
                "INSERT INTO games
                    (number1, number2, number3, number4, dealer, prize, user_id, win, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for ticket in &outcome.tickets {
                insert.execute(params![
                    ticket.number1,
                    ticket.number2,
                    ticket.number3,
                    ticket.number4,
                    ticket.dealer,
                    ticket.prize,
                    user_id,
                    ticket.win,
                    encode_timestamp(&ticket.created_at),
                ])?;
                games.push(ticket.clone().into_game(tx.last_insert_rowid(), user_id));
            }
        }

        let wallet: i64 = tx.query_row(
            "UPDATE users SET wallet = wallet + ?1 WHERE id = ?2 RETURNING wallet",
            params![delta, user_id],
            |row| row.get(0),
        )?;
        tx.commit()?;

        info!(
            username,
            batch_size = batch.len(),
            wins = outcome.win_count(),
            credits = outcome.credits,
            cost = outcome.cost,
            wallet,
            "Settled ticket batch"
        );

        Ok(SettledBatch { games, wallet })
    }

    /// All tickets owned by `username`, newest first.
    pub fn list_games(&self, username: &str) -> Result<Vec<Game>, StoreError> {
        let conn = self.conn.lock();
        let user_id = user_id_for(&conn, username)?;

        let mut stmt = conn.prepare_cached(
            "SELECT id, number1, number2, number3, number4, dealer, prize, user_id, win, created_at
             FROM games WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC",
        )?;
        let games = stmt
            .query_map(params![user_id], game_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(games)
    }

    /// Delete a ticket owned by `username`. Tickets owned by someone else
    /// are reported as not found. The wallet is left untouched.
    pub fn delete_game(&self, username: &str, game_id: i64) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let user_id = user_id_for(&conn, username)?;

        let rows = conn.execute(
            "DELETE FROM games WHERE id = ?1 AND user_id = ?2",
            params![game_id, user_id],
        )?;
        if rows == 0 {
            return Err(StoreError::GameNotFound(game_id));
        }

        debug!(username, game_id, "Deleted game");
        Ok(())
    }
}

fn user_id_for(conn: &rusqlite::Connection, username: &str) -> Result<i64, StoreError> {
    conn.query_row(
        "SELECT id FROM users WHERE username = ?1",
        params![username],
        |row| row.get(0),
    )
    .optional()?
    .ok_or(StoreError::UserNotFound)
}
