use rust_decimal::Decimal;
use serde::Serialize;

/// One referred user as listed on the referrer's invite page.
#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct ReferralEntry {
    pub telegram_id: i64,
    pub username: String,
    pub first_name: String,
    pub bonus_earned: Decimal,
    pub joined_at: chrono::NaiveDateTime,
}
