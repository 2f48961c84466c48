use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize)]
pub struct NewAdView {
    pub telegram_id: i64,
    pub reward_amount: Option<Decimal>,
    pub block_id: Option<String>,
}

/// Balances after an ad view has been credited, as returned to the client.
#[derive(Clone, Debug, Serialize)]
pub struct RewardReceipt {
    pub balance: Decimal,
    pub total_earned: Decimal,
    pub ads_watched: i32,
    pub reward_added: Decimal,
}
