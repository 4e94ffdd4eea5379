pub mod jwt;
pub mod session;

pub use jwt::*;
pub use session::*;
