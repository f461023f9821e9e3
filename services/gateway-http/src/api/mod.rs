pub mod catalog;
pub mod handlers;
pub mod router;
pub mod session;
pub mod types;

pub use router::create_router;
pub use types::*;
