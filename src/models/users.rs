use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct User {
    pub telegram_id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub balance: Decimal,
    pub total_earned: Decimal,
    pub ads_watched: i32,
    pub referrer_id: Option<i64>,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewUser {
    pub telegram_id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub referrer_id: Option<i64>,
}

/// Profile shape returned by `GET /user/{telegram_id}`.
#[derive(Clone, Debug, Serialize)]
pub struct UserProfile {
    pub telegram_id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub balance: Decimal,
    pub total_earned: Decimal,
    pub ads_watched: i32,
    pub referrals_count: i64,
    pub has_referrer: bool,
}

impl UserProfile {
    pub fn from_user(user: User, referrals_count: i64) -> Self {
        UserProfile {
            telegram_id: user.telegram_id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            balance: user.balance,
            total_earned: user.total_earned,
            ads_watched: user.ads_watched,
            referrals_count,
            has_referrer: user.referrer_id.is_some(),
        }
    }
}
