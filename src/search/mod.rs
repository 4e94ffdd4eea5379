pub mod cache;
pub mod handlers;
pub mod types;
pub mod upstream;
pub mod validate;

pub use cache::*;
pub use handlers::*;
pub use types::*;
pub use upstream::*;
pub use validate::*;
