pub mod jwt;
pub mod password;
pub mod reset_token;

pub use jwt::{Claims, JwtService};
pub use password::PasswordService;
