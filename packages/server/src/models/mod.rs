pub mod auth;
pub mod import;
pub mod phone;
pub mod progress;
pub mod question;
pub mod shared;
pub mod sms;
pub mod system_config;
pub mod training;
