mod cache;
mod clock;
mod codec;
mod error;
mod identity;
mod resolver;

pub use cache::{start_sweeper, CacheStats, IdentityCache, MemoryIdentityCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{IssuedToken, TokenCodec, VerifiedToken};
pub use error::{AuthError, TokenError};
pub use identity::Identity;
pub use resolver::{AuthResolver, ResolvedCredential};

pub const AUTHORIZATION_HEADER: &str = "Authorization";
pub const BEARER_PREFIX: &str = "Bearer ";
pub const DEFAULT_COOKIE_NAME: &str = "jwt";
