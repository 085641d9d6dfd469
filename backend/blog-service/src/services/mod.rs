/// Business logic layer
///
/// Services take the acting [`Actor`](crate::middleware::Actor) explicitly,
/// consult the authorization policy, then read or write through the store
/// traits.
pub mod accounts;
pub mod media;
pub mod posts;

pub use accounts::{AccountService, LoginResponse, ProfileUpdated, Registered};
pub use media::{MediaError, MediaStorage};
pub use posts::PostService;

/// Flash message emitted after a successful registration
pub const ACCOUNT_CREATED: &str = "Your account has been created! You are now able to login";

/// Flash message emitted after a successful profile update
pub const ACCOUNT_UPDATED: &str = "Your account has been updated!";
