use rust_decimal::Decimal;
use sqlx::PgPool;

use super::RepositoryError;
use crate::models::ad_views::RewardReceipt;
use crate::models::transactions::{Transaction, TransactionType};

pub struct CreditedReferral {
    pub referrer_id: i64,
    pub bonus: Decimal,
}

pub struct CreditedReward {
    pub receipt: RewardReceipt,
    pub referral: Option<CreditedReferral>,
}

#[derive(Clone)]
pub struct RewardRepository {
    conn: PgPool,
}

impl RewardRepository {
    pub fn new(conn: PgPool) -> Self {
        Self { conn }
    }

    /// Credits one rewarded ad impression. The balance bump, the ad_views
    /// row, the ledger row and the optional referral bonus are committed as
    /// one unit; any failure rolls the whole credit back.
    pub async fn credit_ad_view(
        &self,
        telegram_id: i64,
        reward: Decimal,
        block_id: &str,
        bonus_rate: Decimal,
    ) -> Result<CreditedReward, RepositoryError> {
        let mut tx = self.conn.begin().await?;

        let updated = sqlx::query_as::<_, (Decimal, Decimal, i32, Option<i64>)>(
            r#"
            UPDATE users
            SET balance = balance + $1,
                total_earned = total_earned + $1,
                ads_watched = ads_watched + 1,
                updated_at = CURRENT_TIMESTAMP
            WHERE telegram_id = $2
            RETURNING balance, total_earned, ads_watched, referrer_id
            "#,
        )
        .bind(reward)
        .bind(telegram_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((balance, total_earned, ads_watched, referrer_id)) = updated else {
            return Err(RepositoryError::UserNotFound(telegram_id));
        };

        sqlx::query(
            "INSERT INTO ad_views (user_id, reward_amount, adsgram_block_id) VALUES ($1, $2, $3)",
        )
        .bind(telegram_id)
        .bind(reward)
        .bind(block_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO transactions (user_id, amount, transaction_type, description)
            VALUES ($1, $2, $3, 'Ad view reward')
            "#,
        )
        .bind(telegram_id)
        .bind(reward)
        .bind(TransactionType::AdView.as_str())
        .execute(&mut *tx)
        .await?;

        let mut referral = None;
        if let Some(referrer_id) = referrer_id {
            let bonus = referral_bonus(reward, bonus_rate);

            sqlx::query(
                r#"
                UPDATE users
                SET balance = balance + $1,
                    total_earned = total_earned + $1,
                    updated_at = CURRENT_TIMESTAMP
                WHERE telegram_id = $2
                "#,
            )
            .bind(bonus)
            .bind(referrer_id)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                UPDATE referrals
                SET bonus_earned = bonus_earned + $1
                WHERE referrer_id = $2 AND referred_id = $3
                "#,
            )
            .bind(bonus)
            .bind(referrer_id)
            .bind(telegram_id)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO transactions (user_id, amount, transaction_type, description)
                VALUES ($1, $2, $3, 'Referral bonus')
                "#,
            )
            .bind(referrer_id)
            .bind(bonus)
            .bind(TransactionType::ReferralBonus.as_str())
            .execute(&mut *tx)
            .await?;

            referral = Some(CreditedReferral { referrer_id, bonus });
        }

        tx.commit().await?;

        Ok(CreditedReward {
            receipt: RewardReceipt {
                balance,
                total_earned,
                ads_watched,
                reward_added: reward,
            },
            referral,
        })
    }

    pub async fn list_transactions(
        &self,
        telegram_id: i64,
    ) -> Result<Vec<Transaction>, RepositoryError> {
        let transactions = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, user_id, amount, transaction_type, description, created_at
            FROM transactions
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT 50
            "#,
        )
        .bind(telegram_id)
        .fetch_all(&self.conn)
        .await?;

        Ok(transactions)
    }
}

/// The referrer earns a fixed share of every reward credited to a user
/// they invited.
pub fn referral_bonus(reward: Decimal, rate: Decimal) -> Decimal {
    reward * rate
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn referral_bonus_is_ten_percent_at_default_rate() {
        assert_eq!(referral_bonus(d("0.000281"), d("0.1")), d("0.0000281"));
    }

    #[test]
    fn referral_bonus_is_exact_for_decimal_amounts() {
        assert_eq!(referral_bonus(d("1.5"), d("0.1")), d("0.15"));
        assert_eq!(referral_bonus(d("0.3"), d("0.1")), d("0.03"));
    }
}
