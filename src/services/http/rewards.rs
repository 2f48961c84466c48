use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use tokio::sync::oneshot;

use super::{channel_closed_response, error_response, AppState};
use crate::models::ad_views::NewAdView;
use crate::services::rewards::RewardRequest;

pub async fn credit_ad_view(
    State(state): State<AppState>,
    Json(new_ad_view): Json<NewAdView>,
) -> impl IntoResponse {
    let (reward_tx, reward_rx) = oneshot::channel();

    let send_result = state
        .reward_channel
        .send(RewardRequest::CreditAdView {
            new_ad_view,
            response: reward_tx,
        })
        .await;
    if let Err(e) = send_result {
        return channel_closed_response(&e.to_string());
    }

    match reward_rx.await {
        Ok(Ok(receipt)) => (StatusCode::OK, Json(json!(receipt))),
        Ok(Err(service_error)) => error_response(&service_error),
        Err(e) => channel_closed_response(&e.to_string()),
    }
}

pub async fn list_transactions(
    State(state): State<AppState>,
    Path(telegram_id): Path<i64>,
) -> impl IntoResponse {
    let (reward_tx, reward_rx) = oneshot::channel();

    let send_result = state
        .reward_channel
        .send(RewardRequest::ListTransactions {
            telegram_id,
            response: reward_tx,
        })
        .await;
    if let Err(e) = send_result {
        return channel_closed_response(&e.to_string());
    }

    match reward_rx.await {
        Ok(Ok(transactions)) => (
            StatusCode::OK,
            Json(json!({ "transactions": transactions })),
        ),
        Ok(Err(service_error)) => error_response(&service_error),
        Err(e) => channel_closed_response(&e.to_string()),
    }
}
