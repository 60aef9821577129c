pub mod phone_lookup;
pub mod question_parser;
pub mod sms;
pub mod verification;
