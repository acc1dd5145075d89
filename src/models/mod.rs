pub mod file;
pub mod storage;
pub mod user;

pub use file::*;
pub use storage::*;
pub use user::*;
