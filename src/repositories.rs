use rust_decimal::Decimal;

pub mod rewards;
pub mod users;
pub mod withdrawals;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("user {0} not found")]
    UserNotFound(i64),
    #[error("withdrawal {0} is not pending")]
    WithdrawalNotPending(i32),
    #[error("insufficient balance: {balance} available, {requested} requested")]
    InsufficientBalance { balance: Decimal, requested: Decimal },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}
