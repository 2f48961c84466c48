use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::oneshot;

use super::{RequestHandler, Service, ServiceError};
use crate::models::{referrals, users};
use crate::repositories::users::UserRepository;

pub enum UserRequest {
    InitUser {
        new_user: users::NewUser,
        response: oneshot::Sender<Result<users::User, ServiceError>>,
    },
    GetUser {
        telegram_id: i64,
        response: oneshot::Sender<Result<users::UserProfile, ServiceError>>,
    },
    ListReferrals {
        telegram_id: i64,
        response: oneshot::Sender<Result<Vec<referrals::ReferralEntry>, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct UserRequestHandler {
    repository: UserRepository,
}

impl UserRequestHandler {
    pub fn new(sql_conn: PgPool) -> Self {
        let repository = UserRepository::new(sql_conn);

        UserRequestHandler { repository }
    }

    async fn init_user(&self, new_user: users::NewUser) -> Result<users::User, ServiceError> {
        let user = self.repository.upsert_user(&new_user).await?;

        log::debug!("Initialized user {}.", user.telegram_id);
        Ok(user)
    }

    async fn get_user(&self, telegram_id: i64) -> Result<users::UserProfile, ServiceError> {
        let user = self
            .repository
            .get_user(telegram_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("user {}", telegram_id)))?;

        let referrals_count = self.repository.referral_count(telegram_id).await?;

        Ok(users::UserProfile::from_user(user, referrals_count))
    }

    async fn list_referrals(
        &self,
        telegram_id: i64,
    ) -> Result<Vec<referrals::ReferralEntry>, ServiceError> {
        let referrals = self.repository.list_referrals(telegram_id).await?;

        Ok(referrals)
    }
}

#[async_trait]
impl RequestHandler<UserRequest> for UserRequestHandler {
    async fn handle_request(&self, request: UserRequest) {
        match request {
            UserRequest::InitUser { new_user, response } => {
                let user = self.init_user(new_user).await;
                let _ = response.send(user);
            }
            UserRequest::GetUser {
                telegram_id,
                response,
            } => {
                let profile = self.get_user(telegram_id).await;
                let _ = response.send(profile);
            }
            UserRequest::ListReferrals {
                telegram_id,
                response,
            } => {
                let referrals = self.list_referrals(telegram_id).await;
                let _ = response.send(referrals);
            }
        }
    }
}

pub struct UserService;

impl UserService {
    pub fn new() -> Self {
        UserService {}
    }
}

#[async_trait]
impl Service<UserRequest, UserRequestHandler> for UserService {}
