use axum::http::{header, HeaderName, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::rewards::RewardRequest;
use super::users::UserRequest;
use super::withdrawals::WithdrawalRequest;
use super::ServiceError;

mod rewards;
mod users;
mod withdrawals;

#[derive(Clone)]
struct AppState {
    user_channel: mpsc::Sender<UserRequest>,
    reward_channel: mpsc::Sender<RewardRequest>,
    withdrawal_channel: mpsc::Sender<WithdrawalRequest>,
}

/// Maps service errors to client responses. Business errors keep their
/// message; anything else is logged and returned as a generic body so
/// internal detail never reaches the client.
fn error_response(error: &ServiceError) -> (StatusCode, Json<serde_json::Value>) {
    match error {
        ServiceError::NotFound(_) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": error.to_string() })),
        ),
        ServiceError::Validation(_) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": error.to_string() })),
        ),
        ServiceError::InsufficientFunds { balance, requested } => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Insufficient funds",
                "balance": balance,
                "requested": requested
            })),
        ),
        ServiceError::Upstream(..) => {
            log::error!("Upstream failure: {}", error);
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": "Upstream service failed" })),
            )
        }
        _ => {
            log::error!("Internal error: {}", error);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal server error" })),
            )
        }
    }
}

fn channel_closed_response(detail: &str) -> (StatusCode, Json<serde_json::Value>) {
    log::error!("Service channel failure: {}", detail);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error" })),
    )
}

async fn health() -> impl IntoResponse {
    "OK"
}

pub async fn start_http_server(
    listen: &str,
    user_channel: mpsc::Sender<UserRequest>,
    reward_channel: mpsc::Sender<RewardRequest>,
    withdrawal_channel: mpsc::Sender<WithdrawalRequest>,
) -> Result<(), anyhow::Error> {
    let app_state = AppState {
        user_channel,
        reward_channel,
        withdrawal_channel,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-telegram-init-data"),
        ]);

    let app = Router::new()
        .route("/user/init", post(users::init_user))
        .route("/user/{telegram_id}", get(users::get_user))
        .route("/referrals/{telegram_id}", get(users::list_referrals))
        .route("/ad/reward", post(rewards::credit_ad_view))
        .route("/transactions/{telegram_id}", get(rewards::list_transactions))
        .route("/withdrawal/request", post(withdrawals::request_withdrawal))
        .route("/withdrawal/settle", post(withdrawals::settle_withdrawal))
        .route(
            "/withdrawal/history/{telegram_id}",
            get(withdrawals::list_withdrawals),
        )
        .route("/health", get(health))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let listener = tokio::net::TcpListener::bind(listen).await?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn business_errors_map_to_client_status_codes() {
        let (status, _) = error_response(&ServiceError::NotFound("user 42".to_string()));
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) =
            error_response(&ServiceError::Validation("Minimum withdrawal".to_string()));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = error_response(&ServiceError::InsufficientFunds {
            balance: Decimal::ONE,
            requested: Decimal::TWO,
        });
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn internal_errors_do_not_leak_detail() {
        let (status, body) =
            error_response(&ServiceError::Database("relation missing".to_string()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.0["error"], "Internal server error");

        let (status, body) = error_response(&ServiceError::Upstream(
            "toncenter".to_string(),
            "timeout".to_string(),
        ));
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body.0["error"], "Upstream service failed");
    }

    #[test]
    fn insufficient_funds_body_carries_balance_and_requested() {
        let (_, body) = error_response(&ServiceError::InsufficientFunds {
            balance: "0.3".parse().unwrap(),
            requested: "0.5".parse().unwrap(),
        });
        assert_eq!(body.0["balance"], 0.3);
        assert_eq!(body.0["requested"], 0.5);
    }
}
