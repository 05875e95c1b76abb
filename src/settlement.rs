//! Ticket Settlement
//!
//! Validates a submitted batch, decides win/loss per ticket and computes the
//! net wallet change. Nothing here touches storage; `Store::settle_batch`
//! applies the result inside one transaction.

use crate::models::{GameCreateRequest, NewGame};
use chrono::{DateTime, Utc};

/// Minimum prize a ticket may carry.
pub const MIN_PRIZE: i64 = 300;

/// Cost charged once for a single-ticket batch.
pub const SINGLE_TICKET_COST: i64 = 300;

/// Cost charged once for a four-ticket batch.
pub const FOUR_TICKET_COST: i64 = 500;

/// Inclusive upper bounds for each guess slot and the dealer number.
/// The lower bound is always 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberRules {
    pub guess_max: [i64; 4],
    pub dealer_max: i64,
}

impl Default for NumberRules {
    /// Slot two accepts up to 31, unlike the other slots.
    fn default() -> Self {
        Self {
            guess_max: [21, 31, 21, 21],
            dealer_max: 21,
        }
    }
}

impl NumberRules {
    /// Every guess slot bounded to [1, 21].
    pub fn uniform() -> Self {
        Self {
            guess_max: [21; 4],
            dealer_max: 21,
        }
    }

    fn check(&self, req: &GameCreateRequest) -> Result<(), SettlementError> {
        let guesses_ok = req
            .guesses()
            .iter()
            .zip(self.guess_max.iter())
            .all(|(&n, &max)| (1..=max).contains(&n));

        if !guesses_ok || !(1..=self.dealer_max).contains(&req.dealer) {
            return Err(SettlementError::NumberOutOfRange);
        }
        if req.prize < MIN_PRIZE {
            return Err(SettlementError::PrizeTooLow);
        }
        Ok(())
    }
}

/// Settlement failures. All of them are raised before anything is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementError {
    InvalidBatchSize(usize),
    NumberOutOfRange,
    PrizeTooLow,
    AmountOutOfRange,
}

impl std::fmt::Display for SettlementError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidBatchSize(_) => write!(f, "Invalid game data"),
            Self::NumberOutOfRange => write!(f, "Numbers must be between 1 and 21"),
            Self::PrizeTooLow => write!(f, "Prize must be at least {}", MIN_PRIZE),
            Self::AmountOutOfRange => write!(f, "Wallet balance out of range"),
        }
    }
}

impl std::error::Error for SettlementError {}

/// Fixed cost of a batch, or `None` when the batch size is not allowed.
pub fn ticket_cost(batch_len: usize) -> Option<i64> {
    match batch_len {
        1 => Some(SINGLE_TICKET_COST),
        4 => Some(FOUR_TICKET_COST),
        _ => None,
    }
}

/// A ticket wins when any guess is strictly greater than the dealer number.
pub fn is_winner(req: &GameCreateRequest) -> bool {
    req.guesses().iter().any(|&n| n > req.dealer)
}

/// Outcome of settling a batch, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub tickets: Vec<NewGame>,
    /// Sum of prizes for winning tickets.
    pub credits: i64,
    /// Batch cost, charged once regardless of how many tickets won.
    pub cost: i64,
}

impl Settlement {
    pub fn wallet_delta(&self) -> Result<i64, SettlementError> {
        self.credits
            .checked_sub(self.cost)
            .ok_or(SettlementError::AmountOutOfRange)
    }

    pub fn win_count(&self) -> usize {
        self.tickets.iter().filter(|t| t.win).count()
    }
}

/// Settle a batch in input order.
///
/// The batch size is checked first, then every ticket is validated before
/// any of them is evaluated, so a bad ticket anywhere rejects the whole batch.
pub fn settle(
    batch: &[GameCreateRequest],
    rules: &NumberRules,
    now: DateTime<Utc>,
) -> Result<Settlement, SettlementError> {
    let cost = ticket_cost(batch.len()).ok_or(SettlementError::InvalidBatchSize(batch.len()))?;

    for req in batch {
        rules.check(req)?;
    }

    let mut credits: i64 = 0;
    let mut tickets = Vec::with_capacity(batch.len());
    for req in batch {
        let mut ticket = NewGame::from_request(req, now);
        if is_winner(req) {
            credits = credits
                .checked_add(ticket.prize)
                .ok_or(SettlementError::AmountOutOfRange)?;
            ticket.win = true;
        }
        tickets.push(ticket);
    }

    Ok(Settlement {
        tickets,
        credits,
        cost,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket(numbers: [i64; 4], dealer: i64, prize: i64) -> GameCreateRequest {
        GameCreateRequest {
            number1: numbers[0],
            number2: numbers[1],
            number3: numbers[2],
            number4: numbers[3],
            dealer,
            prize,
        }
    }

    #[test]
    fn test_batch_size_must_be_one_or_four() {
        let rules = NumberRules::default();
        let t = ticket([1, 1, 1, 1], 5, 400);

        for len in [0usize, 2, 3, 5, 8] {
            let batch = vec![t; len];
            assert_eq!(
                settle(&batch, &rules, Utc::now()),
                Err(SettlementError::InvalidBatchSize(len))
            );
        }
        assert!(settle(&[t], &rules, Utc::now()).is_ok());
        assert!(settle(&[t; 4], &rules, Utc::now()).is_ok());
    }

    #[test]
    fn test_batch_size_checked_before_ticket_contents() {
        let bad = ticket([0, 0, 0, 0], 0, 1);
        let err = settle(&[bad, bad], &NumberRules::default(), Utc::now()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid game data");
    }

    #[test]
    fn test_losing_ticket_only_pays_cost() {
        let s = settle(&[ticket([1, 1, 1, 1], 5, 400)], &NumberRules::default(), Utc::now())
            .unwrap();
        assert!(!s.tickets[0].win);
        assert_eq!(s.credits, 0);
        assert_eq!(s.wallet_delta().unwrap(), -300);
    }

    #[test]
    fn test_winning_ticket_credits_prize() {
        let s = settle(&[ticket([10, 1, 1, 1], 5, 400)], &NumberRules::default(), Utc::now())
            .unwrap();
        assert!(s.tickets[0].win);
        assert_eq!(s.wallet_delta().unwrap(), 100);
    }

    #[test]
    fn test_guess_equal_to_dealer_does_not_win() {
        assert!(!is_winner(&ticket([5, 5, 5, 5], 5, 300)));
        assert!(is_winner(&ticket([5, 5, 5, 6], 5, 300)));
    }

    #[test]
    fn test_four_ticket_batch_charged_once() {
        let batch = [
            ticket([9, 1, 1, 1], 5, 300),
            ticket([1, 1, 1, 1], 5, 900),
            ticket([1, 1, 1, 12], 5, 350),
            ticket([2, 2, 2, 2], 5, 1000),
        ];
        let s = settle(&batch, &NumberRules::default(), Utc::now()).unwrap();
        assert_eq!(s.win_count(), 2);
        assert_eq!(s.credits, 650);
        assert_eq!(s.cost, FOUR_TICKET_COST);
        assert_eq!(s.wallet_delta().unwrap(), 150);

        let wins: Vec<bool> = s.tickets.iter().map(|t| t.win).collect();
        assert_eq!(wins, vec![true, false, true, false]);
    }

    #[test]
    fn test_four_ticket_batch_with_no_winners() {
        let batch = [ticket([1, 2, 3, 4], 20, 300); 4];
        let s = settle(&batch, &NumberRules::default(), Utc::now()).unwrap();
        assert_eq!(s.win_count(), 0);
        assert_eq!(s.wallet_delta().unwrap(), -500);
    }

    #[test]
    fn test_out_of_range_numbers_rejected() {
        let rules = NumberRules::default();
        for bad in [
            ticket([0, 1, 1, 1], 5, 300),
            ticket([22, 1, 1, 1], 5, 300),
            ticket([1, 32, 1, 1], 5, 300),
            ticket([1, 1, 22, 1], 5, 300),
            ticket([1, 1, 1, -3], 5, 300),
            ticket([1, 1, 1, 1], 0, 300),
            ticket([1, 1, 1, 1], 22, 300),
        ] {
            let err = settle(&[bad], &rules, Utc::now()).unwrap_err();
            assert_eq!(err, SettlementError::NumberOutOfRange);
            assert_eq!(err.to_string(), "Numbers must be between 1 and 21");
        }
    }

    #[test]
    fn test_second_slot_range_depends_on_rules() {
        let t = ticket([1, 31, 1, 1], 5, 300);
        assert!(settle(&[t], &NumberRules::default(), Utc::now()).is_ok());
        assert_eq!(
            settle(&[t], &NumberRules::uniform(), Utc::now()),
            Err(SettlementError::NumberOutOfRange)
        );
    }

    #[test]
    fn test_prize_floor() {
        let err = settle(&[ticket([1, 1, 1, 1], 5, 299)], &NumberRules::default(), Utc::now())
            .unwrap_err();
        assert_eq!(err.to_string(), "Prize must be at least 300");
    }

    #[test]
    fn test_one_bad_ticket_rejects_whole_batch() {
        let good = ticket([10, 1, 1, 1], 5, 300);
        let bad = ticket([1, 1, 1, 1], 5, 100);
        let err = settle(&[good, good, good, bad], &NumberRules::default(), Utc::now());
        assert_eq!(err, Err(SettlementError::PrizeTooLow));
    }

    #[test]
    fn test_huge_prizes_overflow_is_rejected() {
        let t = ticket([10, 1, 1, 1], 5, i64::MAX);
        assert_eq!(
            settle(&[t; 4], &NumberRules::default(), Utc::now()),
            Err(SettlementError::AmountOutOfRange)
        );
    }
}
