use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::oneshot;

use super::{RequestHandler, Service, ServiceError};
use crate::settings;

mod wallet;

pub use wallet::{TonError, TonTransfer};

pub enum TonRequest {
    SendTransaction {
        destination: String,
        amount: Decimal,
        response: oneshot::Sender<Result<TonTransfer, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct TonRequestHandler {
    sender: wallet::TonSender,
}

impl TonRequestHandler {
    pub fn new(settings: settings::Wallet) -> Self {
        let sender = wallet::TonSender::new(
            settings.mnemonic,
            settings.expected_address,
            settings.toncenter_url,
            settings.toncenter_api_key,
        );

        TonRequestHandler { sender }
    }

    async fn send_transaction(
        &self,
        destination: &str,
        amount: Decimal,
    ) -> Result<TonTransfer, ServiceError> {
        let transfer = self.sender.send(destination, amount).await.map_err(|e| {
            log::error!("TON transfer of {} to {} failed: {}", amount, destination, e);
            service_error(e)
        })?;

        log::info!(
            "Sent {} TON to {}, tx hash {}.",
            transfer.amount,
            transfer.destination,
            transfer.tx_hash
        );

        Ok(transfer)
    }
}

fn service_error(error: TonError) -> ServiceError {
    match error {
        TonError::BadMnemonic(_) | TonError::AddressMismatch { .. } | TonError::BadAddress(_) => {
            ServiceError::Validation(error.to_string())
        }
        TonError::BadAmount(_) | TonError::WalletNotDeployed => {
            ServiceError::Validation(error.to_string())
        }
        TonError::InsufficientBalance { balance, requested } => {
            ServiceError::InsufficientFunds { balance, requested }
        }
        TonError::Derivation(_) => ServiceError::Internal(error.to_string()),
        TonError::Rpc(_) => ServiceError::Upstream("toncenter".to_string(), error.to_string()),
    }
}

#[async_trait]
impl RequestHandler<TonRequest> for TonRequestHandler {
    async fn handle_request(&self, request: TonRequest) {
        match request {
            TonRequest::SendTransaction {
                destination,
                amount,
                response,
            } => {
                let transfer = self.send_transaction(&destination, amount).await;
                let _ = response.send(transfer);
            }
        }
    }
}

pub struct TonService;

impl TonService {
    pub fn new() -> Self {
        TonService {}
    }
}

#[async_trait]
impl Service<TonRequest, TonRequestHandler> for TonService {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_errors_map_to_typed_service_errors() {
        let mismatch = service_error(TonError::AddressMismatch {
            expected: "UQa".to_string(),
            derived: "UQb".to_string(),
        });
        assert!(matches!(mismatch, ServiceError::Validation(_)));

        let broke = service_error(TonError::InsufficientBalance {
            balance: "0.1".parse().unwrap(),
            requested: "0.5".parse().unwrap(),
        });
        assert!(matches!(broke, ServiceError::InsufficientFunds { .. }));

        let rpc = service_error(TonError::Rpc("timeout".to_string()));
        assert!(matches!(rpc, ServiceError::Upstream(..)));
    }
}
