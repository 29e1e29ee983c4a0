use std::sync::Arc;

use crypto_core::JwtKeys;

use crate::clock::Clock;
use crate::config::OtpConfig;
use crate::repository::{MessageStore, UserDirectory};
use crate::services::{
    AccountService, CodeMailer, ContactAggregator, CounterService, FollowService, MessageService,
    OtpService, OtpStore, ReelService, UserService,
};

#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub users: UserService,
    pub follows: FollowService,
    pub contacts: ContactAggregator,
    pub messages: MessageService,
    pub counters: CounterService,
    pub reels: ReelService,
    pub jwt: Arc<JwtKeys>,
}

impl AppState {
    /// Wire every service over the shared stores
    pub fn build(
        directory: Arc<dyn UserDirectory>,
        messages: Arc<dyn MessageStore>,
        otp_store: Arc<dyn OtpStore>,
        mailer: Arc<dyn CodeMailer>,
        clock: Arc<dyn Clock>,
        jwt: Arc<JwtKeys>,
        otp_config: OtpConfig,
    ) -> Self {
        let otp = OtpService::new(otp_store, clock.clone(), otp_config);

        Self {
            accounts: AccountService::new(directory.clone(), otp, mailer, jwt.clone()),
            users: UserService::new(directory.clone()),
            follows: FollowService::new(directory.clone()),
            contacts: ContactAggregator::new(directory.clone(), messages.clone()),
            messages: MessageService::new(directory.clone(), messages, clock.clone()),
            counters: CounterService::new(directory.clone()),
            reels: ReelService::new(directory, clock),
            jwt,
        }
    }
}
