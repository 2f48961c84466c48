use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use num_bigint::BigUint;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tonlib_core::cell::{BagOfCells, Cell, CellBuilder};
use tonlib_core::message::{CommonMsgInfo, TonMessage, TransferMessage};
use tonlib_core::wallet::mnemonic::Mnemonic;
use tonlib_core::wallet::ton_wallet::TonWallet;
use tonlib_core::wallet::wallet_version::WalletVersion;
use tonlib_core::TonAddress;

const NANOTONS_PER_TON: u64 = 1_000_000_000;
const TRANSFER_COMMENT: &str = "AdEarn withdrawal";
const MESSAGE_TTL_SECS: u32 = 60;

#[derive(Debug, thiserror::Error)]
pub enum TonError {
    #[error("wallet mnemonic must contain 24 words, got {0}")]
    BadMnemonic(usize),
    #[error("derived wallet address {derived} does not match expected {expected}")]
    AddressMismatch { expected: String, derived: String },
    #[error("insufficient wallet balance: {balance} TON available, {requested} TON requested")]
    InsufficientBalance { balance: Decimal, requested: Decimal },
    #[error("invalid destination address: {0}")]
    BadAddress(String),
    #[error("payout wallet is not deployed on-chain")]
    WalletNotDeployed,
    #[error("amount {0} cannot be converted to nanotons")]
    BadAmount(Decimal),
    #[error("wallet derivation failed: {0}")]
    Derivation(String),
    #[error("toncenter request failed: {0}")]
    Rpc(String),
}

#[derive(Clone, Debug)]
pub struct TonTransfer {
    pub tx_hash: String,
    pub amount: Decimal,
    pub destination: String,
    pub sender_balance: Decimal,
}

/// Signs and broadcasts transfers from the payout wallet. The wallet is
/// re-derived from the mnemonic on every send and checked against the
/// configured address, so a misconfigured mnemonic can never move funds
/// from the wrong wallet.
#[derive(Clone)]
pub struct TonSender {
    mnemonic: String,
    expected_address: String,
    api_url: String,
    api_key: Option<String>,
    http: reqwest::Client,
}

impl TonSender {
    pub fn new(
        mnemonic: String,
        expected_address: String,
        api_url: String,
        api_key: Option<String>,
    ) -> Self {
        TonSender {
            mnemonic,
            expected_address,
            api_url,
            api_key,
            http: reqwest::Client::new(),
        }
    }

    pub async fn send(&self, destination: &str, amount: Decimal) -> Result<TonTransfer, TonError> {
        let words = split_mnemonic(&self.mnemonic)?;

        let mnemonic =
            Mnemonic::new(words, &None).map_err(|e| TonError::Derivation(e.to_string()))?;
        let key_pair = mnemonic
            .to_key_pair()
            .map_err(|e| TonError::Derivation(e.to_string()))?;
        let wallet = TonWallet::new(WalletVersion::V4R2, key_pair)
            .map_err(|e| TonError::Derivation(e.to_string()))?;

        let derived = wallet.address.to_base64_url_flags(true, false);
        if derived != self.expected_address {
            return Err(TonError::AddressMismatch {
                expected: self.expected_address.clone(),
                derived,
            });
        }

        let info = self.wallet_info(&derived).await?;
        let balance = nano_to_ton(info.balance);
        if balance < amount {
            return Err(TonError::InsufficientBalance {
                balance,
                requested: amount,
            });
        }

        let amount_nano = ton_to_nano(amount).ok_or(TonError::BadAmount(amount))?;
        let dest: TonAddress = destination
            .parse()
            .map_err(|_| TonError::BadAddress(destination.to_string()))?;

        let boc = build_transfer_boc(&wallet, &dest, amount_nano, info.seqno)?;
        let tx_hash = self.send_boc(&boc).await?;

        Ok(TonTransfer {
            tx_hash,
            amount,
            destination: destination.to_string(),
            sender_balance: balance,
        })
    }

    async fn wallet_info(&self, address: &str) -> Result<WalletInfo, TonError> {
        let url = format!(
            "{}/getWalletInformation",
            self.api_url.trim_end_matches('/')
        );

        let mut request = self.http.get(&url).query(&[("address", address)]);
        if let Some(key) = &self.api_key {
            request = request.header("X-API-Key", key);
        }

        let response: ApiResponse<RawWalletInfo> = request
            .send()
            .await
            .map_err(|e| TonError::Rpc(e.to_string()))?
            .json()
            .await
            .map_err(|e| TonError::Rpc(e.to_string()))?;

        let info = response.into_result()?;
        let balance = info
            .balance
            .parse::<u64>()
            .map_err(|e| TonError::Rpc(format!("bad balance value: {}", e)))?;

        Ok(WalletInfo {
            balance,
            seqno: require_seqno(info.seqno)?,
        })
    }

    async fn send_boc(&self, boc: &[u8]) -> Result<String, TonError> {
        let url = format!("{}/sendBocReturnHash", self.api_url.trim_end_matches('/'));

        let mut request = self
            .http
            .post(&url)
            .json(&json!({ "boc": STANDARD.encode(boc) }));
        if let Some(key) = &self.api_key {
            request = request.header("X-API-Key", key);
        }

        let response: ApiResponse<SentMessage> = request
            .send()
            .await
            .map_err(|e| TonError::Rpc(e.to_string()))?
            .json()
            .await
            .map_err(|e| TonError::Rpc(e.to_string()))?;

        Ok(response.into_result()?.hash)
    }
}

fn build_transfer_boc(
    wallet: &TonWallet,
    destination: &TonAddress,
    amount_nano: u64,
    seqno: u32,
) -> Result<Vec<u8>, TonError> {
    let transfer = transfer_body(destination, amount_nano)?;

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| TonError::Derivation(e.to_string()))?
        .as_secs() as u32;

    let external = wallet
        .create_external_msg(now + MESSAGE_TTL_SECS, seqno, false, vec![Arc::new(transfer)])
        .map_err(|e| TonError::Derivation(e.to_string()))?;

    BagOfCells::from_root(external)
        .serialize(true)
        .map_err(|e| TonError::Derivation(e.to_string()))
}

/// Internal message moving `amount_nano` to `destination`, with the
/// withdrawal comment as its payload.
fn transfer_body(destination: &TonAddress, amount_nano: u64) -> Result<Cell, TonError> {
    let comment = CellBuilder::new()
        .store_u32(32, 0)
        .map_err(|e| TonError::Derivation(e.to_string()))?
        .store_string(TRANSFER_COMMENT)
        .map_err(|e| TonError::Derivation(e.to_string()))?
        .build()
        .map_err(|e| TonError::Derivation(e.to_string()))?;

    TransferMessage::new(
        CommonMsgInfo::new_default_internal(destination, &BigUint::from(amount_nano)),
        Arc::new(comment),
    )
    .build()
    .map_err(|e| TonError::Derivation(e.to_string()))
}

/// The external message carries no state init, so an undeployed wallet
/// (toncenter reports no seqno) cannot sign a plain transfer; fail early
/// with a clear error instead of an opaque chain rejection.
fn require_seqno(seqno: Option<u32>) -> Result<u32, TonError> {
    seqno.ok_or(TonError::WalletNotDeployed)
}

fn split_mnemonic(mnemonic: &str) -> Result<Vec<&str>, TonError> {
    let words: Vec<&str> = mnemonic.split_whitespace().collect();
    if words.len() != 24 {
        return Err(TonError::BadMnemonic(words.len()));
    }

    Ok(words)
}

pub fn ton_to_nano(amount: Decimal) -> Option<u64> {
    (amount * Decimal::from(NANOTONS_PER_TON)).trunc().to_u64()
}

pub fn nano_to_ton(nano: u64) -> Decimal {
    Decimal::from(nano) / Decimal::from(NANOTONS_PER_TON)
}

struct WalletInfo {
    balance: u64,
    seqno: u32,
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> Result<T, TonError> {
        if !self.ok {
            return Err(TonError::Rpc(
                self.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        self.result
            .ok_or_else(|| TonError::Rpc("missing result".to_string()))
    }
}

#[derive(Deserialize)]
struct RawWalletInfo {
    balance: String,
    seqno: Option<u32>,
}

#[derive(Deserialize)]
struct SentMessage {
    hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn ton_to_nano_scales_by_ten_to_the_ninth() {
        assert_eq!(ton_to_nano(d("0.5")), Some(500_000_000));
        assert_eq!(ton_to_nano(d("0.000281")), Some(281_000));
        assert_eq!(ton_to_nano(d("2")), Some(2_000_000_000));
    }

    #[test]
    fn ton_to_nano_rejects_negative_amounts() {
        assert_eq!(ton_to_nano(d("-1")), None);
    }

    #[test]
    fn nano_to_ton_round_trips_whole_nanotons() {
        assert_eq!(nano_to_ton(1_500_000_000), d("1.5"));
        assert_eq!(nano_to_ton(281_000), d("0.000281"));
    }

    #[test]
    fn transfer_body_carries_the_withdrawal_comment() {
        let dest: TonAddress = "UQC2xEjVwozC1qw-VKV4cx5c1LmqAVfIJadhTxdc98pEZfqZ"
            .parse()
            .unwrap();

        let body = transfer_body(&dest, 500_000_000).unwrap();
        let boc = BagOfCells::from_root(body).serialize(true).unwrap();
        assert!(!boc.is_empty());
    }

    #[test]
    fn missing_seqno_means_undeployed_wallet() {
        assert!(matches!(
            require_seqno(None),
            Err(TonError::WalletNotDeployed)
        ));
        assert_eq!(require_seqno(Some(7)).unwrap(), 7);
    }

    #[test]
    fn mnemonic_must_have_exactly_24_words() {
        let short = "word ".repeat(12);
        assert!(matches!(
            split_mnemonic(&short),
            Err(TonError::BadMnemonic(12))
        ));

        let full = "word ".repeat(24);
        assert_eq!(split_mnemonic(&full).unwrap().len(), 24);
    }
}
