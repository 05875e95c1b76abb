use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A ticket proposal as submitted by the client.
///
/// The web form posts its inputs as strings, so every field accepts either a
/// JSON integer or an integer string.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameCreateRequest {
    #[serde(deserialize_with = "deserialize_int_or_string")]
    pub number1: i64,
    #[serde(deserialize_with = "deserialize_int_or_string")]
    pub number2: i64,
    #[serde(deserialize_with = "deserialize_int_or_string")]
    pub number3: i64,
    #[serde(deserialize_with = "deserialize_int_or_string")]
    pub number4: i64,
    #[serde(deserialize_with = "deserialize_int_or_string")]
    pub dealer: i64,
    #[serde(deserialize_with = "deserialize_int_or_string")]
    pub prize: i64,
}

impl GameCreateRequest {
    pub fn guesses(&self) -> [i64; 4] {
        [self.number1, self.number2, self.number3, self.number4]
    }
}

/// A settled ticket that has not been written to the store yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGame {
    pub number1: i64,
    pub number2: i64,
    pub number3: i64,
    pub number4: i64,
    pub dealer: i64,
    pub prize: i64,
    pub win: bool,
    pub created_at: DateTime<Utc>,
}

impl NewGame {
    /// Builds a losing ticket; the settlement rule decides whether it flips.
    pub fn from_request(req: &GameCreateRequest, created_at: DateTime<Utc>) -> Self {
        Self {
            number1: req.number1,
            number2: req.number2,
            number3: req.number3,
            number4: req.number4,
            dealer: req.dealer,
            prize: req.prize,
            win: false,
            created_at,
        }
    }

    pub fn into_game(self, id: i64, user_id: i64) -> Game {
        Game {
            id,
            number1: self.number1,
            number2: self.number2,
            number3: self.number3,
            number4: self.number4,
            dealer: self.dealer,
            prize: self.prize,
            user_id,
            win: self.win,
            created_at: self.created_at,
        }
    }
}

/// A persisted ticket
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Game {
    pub id: i64,
    pub number1: i64,
    pub number2: i64,
    pub number3: i64,
    pub number4: i64,
    pub dealer: i64,
    pub prize: i64,
    pub user_id: i64,
    pub win: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Result of a committed settlement batch.
#[derive(Debug, Clone)]
pub struct SettledBatch {
    /// Persisted tickets in submission order.
    pub games: Vec<Game>,
    /// Wallet balance after the batch committed.
    pub wallet: i64,
}

#[derive(Debug, Deserialize)]
pub struct DeleteGameRequest {
    #[serde(deserialize_with = "deserialize_int_or_string")]
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct PriceUpdateRequest {
    #[serde(deserialize_with = "deserialize_int_or_string")]
    pub price: i64,
}

/// Deserialize an integer that may come as a string or number.
fn deserialize_int_or_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrInt {
        String(String),
        Int(i64),
    }

    match StringOrInt::deserialize(deserializer)? {
        StringOrInt::String(s) => s.trim().parse().map_err(|_| {
            serde::de::Error::custom(format!("invalid integer: {:?}", s))
        }),
        StringOrInt::Int(n) => Ok(n),
    }
}

#[derive(Debug, Serialize)]
pub struct CreateGamesResponse {
    pub message: String,
    /// Last ticket of the batch. Older clients only read this field.
    pub game: Game,
    pub games: Vec<Game>,
    pub wallet: i64,
}

#[derive(Debug, Serialize)]
pub struct WalletResponse {
    pub wallet: i64,
}

#[derive(Debug, Serialize)]
pub struct WalletUpdateResponse {
    pub message: String,
    pub wallet: i64,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
