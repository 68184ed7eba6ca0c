//! Subscriber identity: bearer JWT carrying the application user.

mod jwt;

pub use jwt::{AuthenticatedUser, JwtSecret};
