mod common;

mod auth;
mod import;
mod phone;
mod progress;
mod questions;
mod sms;
mod system_config;
mod training;
