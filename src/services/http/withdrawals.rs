use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::oneshot;

use super::{channel_closed_response, error_response, AppState};
use crate::models::withdrawals::NewWithdrawal;
use crate::services::withdrawals::WithdrawalRequest;

#[derive(Deserialize)]
pub struct SettleRequest {
    pub withdrawal_id: i32,
}

pub async fn request_withdrawal(
    State(state): State<AppState>,
    Json(new_withdrawal): Json<NewWithdrawal>,
) -> impl IntoResponse {
    let (withdrawal_tx, withdrawal_rx) = oneshot::channel();

    let send_result = state
        .withdrawal_channel
        .send(WithdrawalRequest::RequestWithdrawal {
            new_withdrawal,
            response: withdrawal_tx,
        })
        .await;
    if let Err(e) = send_result {
        return channel_closed_response(&e.to_string());
    }

    match withdrawal_rx.await {
        Ok(Ok(receipt)) => (StatusCode::OK, Json(json!(receipt))),
        Ok(Err(service_error)) => error_response(&service_error),
        Err(e) => channel_closed_response(&e.to_string()),
    }
}

pub async fn settle_withdrawal(
    State(state): State<AppState>,
    Json(settle): Json<SettleRequest>,
) -> impl IntoResponse {
    let (withdrawal_tx, withdrawal_rx) = oneshot::channel();

    let send_result = state
        .withdrawal_channel
        .send(WithdrawalRequest::SettleWithdrawal {
            withdrawal_id: settle.withdrawal_id,
            response: withdrawal_tx,
        })
        .await;
    if let Err(e) = send_result {
        return channel_closed_response(&e.to_string());
    }

    match withdrawal_rx.await {
        Ok(Ok(withdrawal)) => (
            StatusCode::OK,
            Json(json!({
                "withdrawal_id": withdrawal.id,
                "status": withdrawal.status,
                "processed_at": withdrawal.processed_at
            })),
        ),
        Ok(Err(service_error)) => error_response(&service_error),
        Err(e) => channel_closed_response(&e.to_string()),
    }
}

pub async fn list_withdrawals(
    State(state): State<AppState>,
    Path(telegram_id): Path<i64>,
) -> impl IntoResponse {
    let (withdrawal_tx, withdrawal_rx) = oneshot::channel();

    let send_result = state
        .withdrawal_channel
        .send(WithdrawalRequest::ListWithdrawals {
            telegram_id,
            response: withdrawal_tx,
        })
        .await;
    if let Err(e) = send_result {
        return channel_closed_response(&e.to_string());
    }

    match withdrawal_rx.await {
        Ok(Ok(withdrawals)) => (StatusCode::OK, Json(json!({ "withdrawals": withdrawals }))),
        Ok(Err(service_error)) => error_response(&service_error),
        Err(e) => channel_closed_response(&e.to_string()),
    }
}
