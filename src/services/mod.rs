//! Business logic: subscription auth, channel callbacks, and broadcasting.

pub mod auth;
pub mod authorizer;
pub mod broadcaster;

pub use auth::AuthService;
pub use authorizer::{ChannelAuthorizer, ChannelGrant, ChannelParams};
pub use broadcaster::Broadcaster;
