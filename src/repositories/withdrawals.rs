use rust_decimal::Decimal;
use sqlx::PgPool;

use super::RepositoryError;
use crate::models::transactions::TransactionType;
use crate::models::withdrawals::{self, Withdrawal, WithdrawalEntry};

#[derive(Clone)]
pub struct WithdrawalRepository {
    conn: PgPool,
}

impl WithdrawalRepository {
    pub fn new(conn: PgPool) -> Self {
        Self { conn }
    }

    /// Debits the balance and records the pending withdrawal together with
    /// its ledger row in one transaction. The balance row is locked for the
    /// duration so two concurrent requests cannot both pass the funds check.
    pub async fn request_withdrawal(
        &self,
        telegram_id: i64,
        wallet_address: &str,
        amount: Decimal,
    ) -> Result<(Withdrawal, Decimal), RepositoryError> {
        let mut tx = self.conn.begin().await?;

        let balance: Option<Decimal> =
            sqlx::query_scalar("SELECT balance FROM users WHERE telegram_id = $1 FOR UPDATE")
                .bind(telegram_id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(balance) = balance else {
            return Err(RepositoryError::UserNotFound(telegram_id));
        };

        check_balance(balance, amount)?;

        let new_balance: Decimal = sqlx::query_scalar(
            r#"
            UPDATE users
            SET balance = balance - $1,
                updated_at = CURRENT_TIMESTAMP
            WHERE telegram_id = $2
            RETURNING balance
            "#,
        )
        .bind(amount)
        .bind(telegram_id)
        .fetch_one(&mut *tx)
        .await?;

        let transaction_id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO transactions (user_id, amount, transaction_type, description)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(telegram_id)
        .bind(-amount)
        .bind(TransactionType::Withdrawal.as_str())
        .bind(format!("Withdrawal to {}", shorten_address(wallet_address)))
        .fetch_one(&mut *tx)
        .await?;

        let withdrawal = sqlx::query_as::<_, Withdrawal>(
            r#"
            INSERT INTO withdrawals (user_id, amount, wallet_address, status, transaction_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(telegram_id)
        .bind(amount)
        .bind(wallet_address)
        .bind(withdrawals::STATUS_PENDING)
        .bind(transaction_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((withdrawal, new_balance))
    }

    pub async fn get_withdrawal(&self, id: i32) -> Result<Option<Withdrawal>, RepositoryError> {
        let withdrawal =
            sqlx::query_as::<_, Withdrawal>("SELECT * FROM withdrawals WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.conn)
                .await?;

        Ok(withdrawal)
    }

    /// Atomically claims a pending withdrawal for settlement. Of any number
    /// of concurrent callers only one gets the row; the rest see None.
    pub async fn claim_pending(&self, id: i32) -> Result<Option<Withdrawal>, RepositoryError> {
        let withdrawal = sqlx::query_as::<_, Withdrawal>(
            r#"
            UPDATE withdrawals
            SET status = $1
            WHERE id = $2 AND status = $3
            RETURNING *
            "#,
        )
        .bind(withdrawals::STATUS_PROCESSING)
        .bind(id)
        .bind(withdrawals::STATUS_PENDING)
        .fetch_optional(&self.conn)
        .await?;

        Ok(withdrawal)
    }

    /// Returns a claimed withdrawal to pending after a failed transfer so a
    /// later settlement attempt can pick it up again.
    pub async fn release_claim(&self, id: i32) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE withdrawals SET status = $1 WHERE id = $2 AND status = $3")
            .bind(withdrawals::STATUS_PENDING)
            .bind(id)
            .bind(withdrawals::STATUS_PROCESSING)
            .execute(&self.conn)
            .await?;

        Ok(())
    }

    pub async fn mark_completed(&self, id: i32) -> Result<Withdrawal, RepositoryError> {
        let withdrawal = sqlx::query_as::<_, Withdrawal>(
            r#"
            UPDATE withdrawals
            SET status = $1, processed_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND status = $3
            RETURNING *
            "#,
        )
        .bind(withdrawals::STATUS_COMPLETED)
        .bind(id)
        .bind(withdrawals::STATUS_PROCESSING)
        .fetch_optional(&self.conn)
        .await?;

        withdrawal.ok_or(RepositoryError::WithdrawalNotPending(id))
    }

    pub async fn list_withdrawals(
        &self,
        telegram_id: i64,
    ) -> Result<Vec<WithdrawalEntry>, RepositoryError> {
        let withdrawals = sqlx::query_as::<_, WithdrawalEntry>(
            r#"
            SELECT id, amount, wallet_address, status, created_at, processed_at
            FROM withdrawals
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT 50
            "#,
        )
        .bind(telegram_id)
        .fetch_all(&self.conn)
        .await?;

        Ok(withdrawals)
    }
}

fn check_balance(balance: Decimal, requested: Decimal) -> Result<(), RepositoryError> {
    if balance < requested {
        return Err(RepositoryError::InsufficientBalance { balance, requested });
    }

    Ok(())
}

/// `UQC2xEjV...98pEZfqZ` form used in ledger descriptions. Cuts on char
/// boundaries; the address is client input and may not be ASCII.
pub fn shorten_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 14 {
        return address.to_string();
    }

    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 6..].iter().collect();
    format!("{}...{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn shorten_address_keeps_head_and_tail() {
        let addr = "UQC2xEjVwozC1qw-VKV4cx5c1LmqAVfIJadhTxdc98pEZfqZ";
        assert_eq!(shorten_address(addr), "UQC2xEjV...pEZfqZ");
    }

    #[test]
    fn shorten_address_leaves_short_strings_alone() {
        assert_eq!(shorten_address("UQC2xEjVwozC"), "UQC2xEjVwozC");
    }

    #[test]
    fn shorten_address_handles_multibyte_input() {
        let addr = "aaaaaaaαaaaaaaaaaa";
        assert_eq!(shorten_address(addr), "aaaaaaaα...aaaaaa");
    }

    #[test]
    fn withdrawal_equal_to_balance_is_allowed() {
        assert!(check_balance(d("0.5"), d("0.5")).is_ok());
        assert!(check_balance(d("2"), d("0.5")).is_ok());
    }

    #[test]
    fn withdrawal_exceeding_balance_is_rejected_with_amounts() {
        let err = check_balance(d("0.5"), d("0.500000001")).unwrap_err();
        match err {
            RepositoryError::InsufficientBalance { balance, requested } => {
                assert_eq!(balance, d("0.5"));
                assert_eq!(requested, d("0.500000001"));
            }
            other => panic!("unexpected error: {}", other),
        }

        assert!(check_balance(Decimal::ZERO, d("0.5")).is_err());
    }
}
