pub mod ad_views;
pub mod referrals;
pub mod transactions;
pub mod users;
pub mod withdrawals;
