use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use tokio::sync::oneshot;

use super::{channel_closed_response, error_response, AppState};
use crate::models::users::NewUser;
use crate::services::users::UserRequest;

pub async fn init_user(
    State(state): State<AppState>,
    Json(new_user): Json<NewUser>,
) -> impl IntoResponse {
    let (user_tx, user_rx) = oneshot::channel();

    let send_result = state
        .user_channel
        .send(UserRequest::InitUser {
            new_user,
            response: user_tx,
        })
        .await;
    if let Err(e) = send_result {
        return channel_closed_response(&e.to_string());
    }

    match user_rx.await {
        Ok(Ok(user)) => (
            StatusCode::OK,
            Json(json!({
                "telegram_id": user.telegram_id,
                "balance": user.balance,
                "total_earned": user.total_earned,
                "ads_watched": user.ads_watched,
                "has_referrer": user.referrer_id.is_some()
            })),
        ),
        Ok(Err(service_error)) => error_response(&service_error),
        Err(e) => channel_closed_response(&e.to_string()),
    }
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(telegram_id): Path<i64>,
) -> impl IntoResponse {
    let (user_tx, user_rx) = oneshot::channel();

    let send_result = state
        .user_channel
        .send(UserRequest::GetUser {
            telegram_id,
            response: user_tx,
        })
        .await;
    if let Err(e) = send_result {
        return channel_closed_response(&e.to_string());
    }

    match user_rx.await {
        Ok(Ok(profile)) => (StatusCode::OK, Json(json!(profile))),
        Ok(Err(service_error)) => error_response(&service_error),
        Err(e) => channel_closed_response(&e.to_string()),
    }
}

pub async fn list_referrals(
    State(state): State<AppState>,
    Path(telegram_id): Path<i64>,
) -> impl IntoResponse {
    let (user_tx, user_rx) = oneshot::channel();

    let send_result = state
        .user_channel
        .send(UserRequest::ListReferrals {
            telegram_id,
            response: user_tx,
        })
        .await;
    if let Err(e) = send_result {
        return channel_closed_response(&e.to_string());
    }

    match user_rx.await {
        Ok(Ok(referrals)) => (StatusCode::OK, Json(json!({ "referrals": referrals }))),
        Ok(Err(service_error)) => error_response(&service_error),
        Err(e) => channel_closed_response(&e.to_string()),
    }
}
