use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tokio::sync::oneshot;

use super::{RequestHandler, Service, ServiceError};
use crate::models::ad_views::{NewAdView, RewardReceipt};
use crate::models::transactions::Transaction;
use crate::repositories::rewards::RewardRepository;
use crate::settings;

pub enum RewardRequest {
    CreditAdView {
        new_ad_view: NewAdView,
        response: oneshot::Sender<Result<RewardReceipt, ServiceError>>,
    },
    ListTransactions {
        telegram_id: i64,
        response: oneshot::Sender<Result<Vec<Transaction>, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct RewardRequestHandler {
    repository: RewardRepository,
    settings: settings::Rewards,
}

impl RewardRequestHandler {
    pub fn new(sql_conn: PgPool, settings: settings::Rewards) -> Self {
        let repository = RewardRepository::new(sql_conn);

        RewardRequestHandler {
            repository,
            settings,
        }
    }

    async fn credit_ad_view(&self, new_ad_view: NewAdView) -> Result<RewardReceipt, ServiceError> {
        let reward = new_ad_view
            .reward_amount
            .unwrap_or(self.settings.default_reward);
        let block_id = new_ad_view
            .block_id
            .unwrap_or_else(|| self.settings.default_block_id.clone());

        validate_reward(reward)?;

        let credited = self
            .repository
            .credit_ad_view(
                new_ad_view.telegram_id,
                reward,
                &block_id,
                self.settings.referral_bonus_rate,
            )
            .await?;

        if let Some(referral) = &credited.referral {
            log::info!(
                "Credited {} TON to user {} (block {}) and {} TON bonus to referrer {}.",
                reward,
                new_ad_view.telegram_id,
                block_id,
                referral.bonus,
                referral.referrer_id
            );
        } else {
            log::info!(
                "Credited {} TON to user {} (block {}).",
                reward,
                new_ad_view.telegram_id,
                block_id
            );
        }

        Ok(credited.receipt)
    }

    async fn list_transactions(&self, telegram_id: i64) -> Result<Vec<Transaction>, ServiceError> {
        let transactions = self.repository.list_transactions(telegram_id).await?;

        Ok(transactions)
    }
}

fn validate_reward(reward: Decimal) -> Result<(), ServiceError> {
    if reward <= Decimal::ZERO {
        return Err(ServiceError::Validation(format!(
            "Reward amount must be positive, got {}",
            reward
        )));
    }

    Ok(())
}

#[async_trait]
impl RequestHandler<RewardRequest> for RewardRequestHandler {
    async fn handle_request(&self, request: RewardRequest) {
        match request {
            RewardRequest::CreditAdView {
                new_ad_view,
                response,
            } => {
                let receipt = self.credit_ad_view(new_ad_view).await;
                let _ = response.send(receipt);
            }
            RewardRequest::ListTransactions {
                telegram_id,
                response,
            } => {
                let transactions = self.list_transactions(telegram_id).await;
                let _ = response.send(transactions);
            }
        }
    }
}

pub struct RewardService;

impl RewardService {
    pub fn new() -> Self {
        RewardService {}
    }
}

#[async_trait]
impl Service<RewardRequest, RewardRequestHandler> for RewardService {}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn default_reward_amount_is_accepted() {
        assert!(validate_reward(d("0.000281")).is_ok());
    }

    #[test]
    fn zero_and_negative_rewards_are_rejected() {
        assert!(matches!(
            validate_reward(Decimal::ZERO),
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            validate_reward(d("-0.1")),
            Err(ServiceError::Validation(_))
        ));
    }
}
