use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct Transaction {
    pub id: i32,
    pub user_id: i64,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub transaction_type: String,
    pub description: String,
    #[serde(rename = "timestamp")]
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionType {
    AdView,
    ReferralBonus,
    Withdrawal,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::AdView => "ad_view",
            TransactionType::ReferralBonus => "referral_bonus",
            TransactionType::Withdrawal => "withdrawal",
        }
    }
}
