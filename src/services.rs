use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tokio::sync::mpsc;

use crate::repositories::RepositoryError;
use crate::settings::Settings;

mod http;
mod rewards;
mod ton;
mod users;
mod withdrawals;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("insufficient funds: {balance} available, {requested} requested")]
    InsufficientFunds { balance: Decimal, requested: Decimal },
    #[error("{0}")]
    Validation(String),
    #[error("upstream error: {0} => {1}")]
    Upstream(String, String),
    #[error("database error: {0}")]
    Database(String),
    #[error("communication error: {0} - {1}")]
    Communication(String, String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<RepositoryError> for ServiceError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::UserNotFound(id) => ServiceError::NotFound(format!("user {}", id)),
            RepositoryError::WithdrawalNotPending(id) => {
                ServiceError::Validation(format!("Withdrawal {} is not pending", id))
            }
            RepositoryError::InsufficientBalance { balance, requested } => {
                ServiceError::InsufficientFunds { balance, requested }
            }
            RepositoryError::Sqlx(e) => ServiceError::Database(e.to_string()),
        }
    }
}

#[async_trait]
pub trait RequestHandler<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    async fn handle_request(&self, request: T);
}

#[async_trait]
pub trait Service<T, H>: Send + Sync + 'static
where
    T: Send + 'static,
    H: RequestHandler<T> + Clone + Send,
{
    async fn run(&mut self, handler: H, receiver: &mut mpsc::Receiver<T>) {
        while let Some(request) = receiver.recv().await {
            let handler = handler.clone();

            tokio::spawn(async move {
                handler.handle_request(request).await;
            });
        }
    }
}

pub async fn start_services(pool: PgPool, settings: Settings) -> Result<(), anyhow::Error> {
    let (user_tx, mut user_rx) = mpsc::channel(512);
    let (reward_tx, mut reward_rx) = mpsc::channel(512);
    let (withdrawal_tx, mut withdrawal_rx) = mpsc::channel(512);
    let (ton_tx, mut ton_rx) = mpsc::channel(512);

    let mut user_service = users::UserService::new();
    let mut reward_service = rewards::RewardService::new();
    let mut withdrawal_service = withdrawals::WithdrawalService::new();
    let mut ton_service = ton::TonService::new();

    log::info!("Starting user service.");
    let user_pool = pool.clone();
    tokio::spawn(async move {
        user_service
            .run(users::UserRequestHandler::new(user_pool), &mut user_rx)
            .await;
    });

    log::info!("Starting reward service.");
    let reward_pool = pool.clone();
    let reward_settings = settings.rewards.clone();
    tokio::spawn(async move {
        reward_service
            .run(
                rewards::RewardRequestHandler::new(reward_pool, reward_settings),
                &mut reward_rx,
            )
            .await;
    });

    log::info!("Starting TON service.");
    let wallet_settings = settings.wallet.clone();
    tokio::spawn(async move {
        ton_service
            .run(ton::TonRequestHandler::new(wallet_settings), &mut ton_rx)
            .await;
    });

    log::info!("Starting withdrawal service.");
    let withdrawal_pool = pool.clone();
    let withdrawal_settings = settings.withdrawals.clone();
    let withdrawal_ton_tx = ton_tx.clone();
    tokio::spawn(async move {
        withdrawal_service
            .run(
                withdrawals::WithdrawalRequestHandler::new(
                    withdrawal_pool,
                    withdrawal_ton_tx,
                    withdrawal_settings,
                ),
                &mut withdrawal_rx,
            )
            .await;
    });

    log::info!("Starting HTTP server on {}.", settings.http.listen);
    http::start_http_server(&settings.http.listen, user_tx, reward_tx, withdrawal_tx).await?;

    Ok(())
}
