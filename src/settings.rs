use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct Postgres {
    pub url: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Http {
    pub listen: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Wallet {
    pub mnemonic: String,
    pub expected_address: String,
    pub toncenter_url: String,
    pub toncenter_api_key: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Rewards {
    pub default_reward: Decimal,
    pub default_block_id: String,
    pub referral_bonus_rate: Decimal,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Withdrawals {
    pub min_amount: Decimal,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Settings {
    pub postgres: Postgres,
    pub http: Http,
    pub wallet: Wallet,
    pub rewards: Rewards,
    pub withdrawals: Withdrawals,
}

impl Settings {
    /// Values from the config file can be overridden through the
    /// environment, e.g. `ADEARN__POSTGRES__URL` or `ADEARN__WALLET__MNEMONIC`.
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("ADEARN").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
