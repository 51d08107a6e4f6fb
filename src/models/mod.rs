pub mod contact;
pub mod download;
pub mod quote;
pub mod session;
pub mod user;

pub use contact::*;
pub use download::*;
pub use quote::*;
pub use session::*;
pub use user::*;
