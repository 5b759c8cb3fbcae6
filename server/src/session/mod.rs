pub mod authority;

pub use authority::{AuthenticatedUser, SessionAuthority};
