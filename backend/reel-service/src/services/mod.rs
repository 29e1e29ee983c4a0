pub mod accounts;
pub mod contacts;
pub mod counters;
pub mod email;
pub mod follow;
pub mod messages;
pub mod otp;
pub mod reels;
pub mod users;

pub use accounts::{AccountService, Session};
pub use contacts::ContactAggregator;
pub use counters::CounterService;
pub use email::{CodeMailer, EmailService};
pub use follow::FollowService;
pub use messages::MessageService;
pub use otp::{InMemoryOtpStore, OtpPurpose, OtpService, OtpStore, RedisOtpStore};
pub use reels::ReelService;
pub use users::UserService;
