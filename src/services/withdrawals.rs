use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tokio::sync::{mpsc, oneshot};

use super::ton::TonRequest;
use super::{RequestHandler, Service, ServiceError};
use crate::models::withdrawals::{NewWithdrawal, Withdrawal, WithdrawalEntry, WithdrawalReceipt};
use crate::repositories::withdrawals::WithdrawalRepository;
use crate::settings;

pub enum WithdrawalRequest {
    RequestWithdrawal {
        new_withdrawal: NewWithdrawal,
        response: oneshot::Sender<Result<WithdrawalReceipt, ServiceError>>,
    },
    ListWithdrawals {
        telegram_id: i64,
        response: oneshot::Sender<Result<Vec<WithdrawalEntry>, ServiceError>>,
    },
    SettleWithdrawal {
        withdrawal_id: i32,
        response: oneshot::Sender<Result<Withdrawal, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct WithdrawalRequestHandler {
    repository: WithdrawalRepository,
    ton_channel: mpsc::Sender<TonRequest>,
    settings: settings::Withdrawals,
}

impl WithdrawalRequestHandler {
    pub fn new(
        sql_conn: PgPool,
        ton_channel: mpsc::Sender<TonRequest>,
        settings: settings::Withdrawals,
    ) -> Self {
        let repository = WithdrawalRepository::new(sql_conn);

        WithdrawalRequestHandler {
            repository,
            ton_channel,
            settings,
        }
    }

    async fn request_withdrawal(
        &self,
        new_withdrawal: NewWithdrawal,
    ) -> Result<WithdrawalReceipt, ServiceError> {
        validate_amount(new_withdrawal.amount, self.settings.min_amount)?;

        let (withdrawal, new_balance) = self
            .repository
            .request_withdrawal(
                new_withdrawal.telegram_id,
                &new_withdrawal.wallet_address,
                new_withdrawal.amount,
            )
            .await?;

        log::info!(
            "Recorded pending withdrawal {} of {} TON for user {}.",
            withdrawal.id,
            withdrawal.amount,
            withdrawal.user_id
        );

        Ok(WithdrawalReceipt {
            success: true,
            withdrawal_id: withdrawal.id,
            new_balance,
            amount: withdrawal.amount,
            wallet: withdrawal.wallet_address,
            message: "Withdrawal request created. Processing within 24 hours.".to_string(),
        })
    }

    async fn list_withdrawals(
        &self,
        telegram_id: i64,
    ) -> Result<Vec<WithdrawalEntry>, ServiceError> {
        let withdrawals = self.repository.list_withdrawals(telegram_id).await?;

        Ok(withdrawals)
    }

    /// Settles one pending withdrawal on-chain. Invoked by the operator, not
    /// by a scheduler. The row is claimed atomically before the transfer is
    /// dispatched, so concurrent settle requests for the same id cannot both
    /// broadcast; a failed transfer releases the claim back to pending.
    async fn settle_withdrawal(&self, withdrawal_id: i32) -> Result<Withdrawal, ServiceError> {
        let Some(withdrawal) = self.repository.claim_pending(withdrawal_id).await? else {
            let current = self.repository.get_withdrawal(withdrawal_id).await?;
            return Err(claim_failure(current.map(|w| w.status), withdrawal_id));
        };

        let transfer = match self.send_to_chain(&withdrawal).await {
            Ok(transfer) => transfer,
            Err(e) => {
                self.repository.release_claim(withdrawal_id).await?;
                return Err(e);
            }
        };

        log::info!(
            "Withdrawal {} settled on-chain, tx hash {}.",
            withdrawal_id,
            transfer.tx_hash
        );

        let settled = self.repository.mark_completed(withdrawal_id).await?;

        Ok(settled)
    }

    async fn send_to_chain(
        &self,
        withdrawal: &Withdrawal,
    ) -> Result<super::ton::TonTransfer, ServiceError> {
        let (ton_tx, ton_rx) = oneshot::channel();
        self.ton_channel
            .send(TonRequest::SendTransaction {
                destination: withdrawal.wallet_address.clone(),
                amount: withdrawal.amount,
                response: ton_tx,
            })
            .await
            .map_err(|e| {
                ServiceError::Communication("Withdrawal => Ton".to_string(), e.to_string())
            })?;

        ton_rx.await.map_err(|e| {
            ServiceError::Communication("Ton => Withdrawal".to_string(), e.to_string())
        })?
    }
}

/// A failed claim means the row is gone or some other caller already holds
/// or finished it; the losing caller must never reach the chain.
fn claim_failure(current_status: Option<String>, withdrawal_id: i32) -> ServiceError {
    match current_status {
        None => ServiceError::NotFound(format!("withdrawal {}", withdrawal_id)),
        Some(_) => {
            ServiceError::Validation(format!("Withdrawal {} is not pending", withdrawal_id))
        }
    }
}

fn validate_amount(amount: Decimal, min_amount: Decimal) -> Result<(), ServiceError> {
    if amount < min_amount {
        return Err(ServiceError::Validation(format!(
            "Minimum withdrawal amount is {} TON",
            min_amount
        )));
    }

    Ok(())
}

#[async_trait]
impl RequestHandler<WithdrawalRequest> for WithdrawalRequestHandler {
    async fn handle_request(&self, request: WithdrawalRequest) {
        match request {
            WithdrawalRequest::RequestWithdrawal {
                new_withdrawal,
                response,
            } => {
                let receipt = self.request_withdrawal(new_withdrawal).await;
                let _ = response.send(receipt);
            }
            WithdrawalRequest::ListWithdrawals {
                telegram_id,
                response,
            } => {
                let withdrawals = self.list_withdrawals(telegram_id).await;
                let _ = response.send(withdrawals);
            }
            WithdrawalRequest::SettleWithdrawal {
                withdrawal_id,
                response,
            } => {
                let settled = self.settle_withdrawal(withdrawal_id).await;
                let _ = response.send(settled);
            }
        }
    }
}

pub struct WithdrawalService;

impl WithdrawalService {
    pub fn new() -> Self {
        WithdrawalService {}
    }
}

#[async_trait]
impl Service<WithdrawalRequest, WithdrawalRequestHandler> for WithdrawalService {}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn amounts_below_minimum_are_rejected() {
        assert!(matches!(
            validate_amount(d("0.49"), d("0.5")),
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            validate_amount(Decimal::ZERO, d("0.5")),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn minimum_amount_itself_is_accepted() {
        assert!(validate_amount(d("0.5"), d("0.5")).is_ok());
        assert!(validate_amount(d("2.75"), d("0.5")).is_ok());
    }

    #[test]
    fn settlement_requires_winning_the_pending_claim() {
        assert!(matches!(claim_failure(None, 7), ServiceError::NotFound(_)));
        assert!(matches!(
            claim_failure(Some("processing".to_string()), 7),
            ServiceError::Validation(_)
        ));
        assert!(matches!(
            claim_failure(Some("completed".to_string()), 7),
            ServiceError::Validation(_)
        ));
    }
}
