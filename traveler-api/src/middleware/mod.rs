pub mod auth;
pub mod rate_limit;

pub use auth::{Claims, CurrentCaller, MaybeCaller};
pub use rate_limit::rate_limit_middleware;
