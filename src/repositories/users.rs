use sqlx::PgPool;

use super::RepositoryError;
use crate::models::{referrals, users};

#[derive(Clone)]
pub struct UserRepository {
    conn: PgPool,
}

impl UserRepository {
    pub fn new(conn: PgPool) -> Self {
        Self { conn }
    }

    /// Upserts the user on first app open. Profile fields are refreshed on
    /// every call; balance and counters are never touched here. The referral
    /// edge is written only when the stored row actually carries a referrer,
    /// so a referrer supplied on a later init of an existing user is ignored.
    pub async fn upsert_user(
        &self,
        new_user: &users::NewUser,
    ) -> Result<users::User, RepositoryError> {
        let mut tx = self.conn.begin().await?;

        let user = sqlx::query_as::<_, users::User>(
            r#"
            INSERT INTO users (telegram_id, username, first_name, last_name, referrer_id)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (telegram_id)
            DO UPDATE SET
                username = EXCLUDED.username,
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                updated_at = CURRENT_TIMESTAMP
            RETURNING *
            "#,
        )
        .bind(new_user.telegram_id)
        .bind(&new_user.username)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(new_user.referrer_id)
        .fetch_one(&mut *tx)
        .await?;

        if let (Some(_), Some(referrer_id)) = (new_user.referrer_id, user.referrer_id) {
            sqlx::query(
                r#"
                INSERT INTO referrals (referrer_id, referred_id)
                VALUES ($1, $2)
                ON CONFLICT (referrer_id, referred_id) DO NOTHING
                "#,
            )
            .bind(referrer_id)
            .bind(user.telegram_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(user)
    }

    pub async fn get_user(&self, telegram_id: i64) -> Result<Option<users::User>, RepositoryError> {
        let user = sqlx::query_as::<_, users::User>("SELECT * FROM users WHERE telegram_id = $1")
            .bind(telegram_id)
            .fetch_optional(&self.conn)
            .await?;

        Ok(user)
    }

    pub async fn referral_count(&self, telegram_id: i64) -> Result<i64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM referrals WHERE referrer_id = $1")
                .bind(telegram_id)
                .fetch_one(&self.conn)
                .await?;

        Ok(count)
    }

    pub async fn list_referrals(
        &self,
        referrer_id: i64,
    ) -> Result<Vec<referrals::ReferralEntry>, RepositoryError> {
        let referrals = sqlx::query_as::<_, referrals::ReferralEntry>(
            r#"
            SELECT r.referred_id AS telegram_id, u.username, u.first_name,
                   r.bonus_earned, r.created_at AS joined_at
            FROM referrals r
            JOIN users u ON r.referred_id = u.telegram_id
            WHERE r.referrer_id = $1
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(referrer_id)
        .fetch_all(&self.conn)
        .await?;

        Ok(referrals)
    }
}
