pub mod company;
pub mod exam_category;
pub mod failed_company;
pub mod feature_item;
pub mod feature_module;
pub mod import_record;
pub mod phone_number;
pub mod project;
pub mod project_phase;
pub mod question;
pub mod question_set;
pub mod sms_log;
pub mod sms_template;
pub mod system_config;
pub mod training_record;
