use super::{error::ApiError, AppState};
use crate::auth::Claims;
use crate::models::{PriceUpdateRequest, WalletResponse, WalletUpdateResponse};
use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};

/// GET /wallet
pub async fn get_wallet(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<WalletResponse>, ApiError> {
    let wallet = state.store.wallet(&claims.sub)?;
    Ok(Json(WalletResponse { wallet }))
}

/// POST /update_wallet
pub async fn update_wallet(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<PriceUpdateRequest>, JsonRejection>,
) -> Result<Json<WalletUpdateResponse>, ApiError> {
    let Json(req) = payload?;
    let wallet = state.store.adjust_wallet(&claims.sub, req.price)?;
    Ok(Json(WalletUpdateResponse {
        message: "Wallet updated successfully!".to_string(),
        wallet,
    }))
}
