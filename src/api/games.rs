//! Ticket endpoints: settle a batch, list history, delete a ticket

use super::{error::ApiError, AppState};
use crate::auth::Claims;
use crate::models::{
    CreateGamesResponse, DeleteGameRequest, Game, GameCreateRequest, MessageResponse,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use tracing::debug;

/// POST /games
pub async fn create_games(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<Vec<GameCreateRequest>>, JsonRejection>,
) -> Result<Json<CreateGamesResponse>, ApiError> {
    let Json(batch) = payload?;
    debug!(username = %claims.sub, batch_size = batch.len(), "Settling ticket batch");

    let settled = state
        .store
        .settle_batch(&claims.sub, &batch, &state.rules)?;

    let game = settled
        .games
        .last()
        .cloned()
        .ok_or_else(|| ApiError::Internal("settled batch was empty".to_string()))?;

    Ok(Json(CreateGamesResponse {
        message: "Game added successfully!".to_string(),
        game,
        games: settled.games,
        wallet: settled.wallet,
    }))
}

/// GET /games
pub async fn list_games(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Game>>, ApiError> {
    Ok(Json(state.store.list_games(&claims.sub)?))
}

/// DELETE /games
pub async fn delete_game(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<DeleteGameRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(req) = payload?;
    state.store.delete_game(&claims.sub, req.id)?;
    Ok(Json(MessageResponse::new("Game deleted successfully!")))
}
