pub mod email;
pub mod export;

pub use email::EmailService;
