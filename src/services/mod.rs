pub mod auth;
pub mod files;
pub mod session_cache;

pub use auth::*;
pub use files::*;
pub use session_cache::*;
