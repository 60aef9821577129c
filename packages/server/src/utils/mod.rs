pub mod phone;
pub mod template;
