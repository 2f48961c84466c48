use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_PROCESSING: &str = "processing";
pub const STATUS_COMPLETED: &str = "completed";

#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct Withdrawal {
    pub id: i32,
    pub user_id: i64,
    pub amount: Decimal,
    pub wallet_address: String,
    pub status: String,
    pub transaction_id: i32,
    pub created_at: chrono::NaiveDateTime,
    pub processed_at: Option<chrono::NaiveDateTime>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewWithdrawal {
    pub telegram_id: i64,
    pub wallet_address: String,
    pub amount: Decimal,
}

#[derive(Clone, Debug, Serialize)]
pub struct WithdrawalReceipt {
    pub success: bool,
    pub withdrawal_id: i32,
    pub new_balance: Decimal,
    pub amount: Decimal,
    pub wallet: String,
    pub message: String,
}

/// History shape returned by `GET /withdrawal/history/{telegram_id}`.
#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct WithdrawalEntry {
    pub id: i32,
    pub amount: Decimal,
    #[serde(rename = "wallet")]
    pub wallet_address: String,
    pub status: String,
    pub created_at: chrono::NaiveDateTime,
    pub processed_at: Option<chrono::NaiveDateTime>,
}
