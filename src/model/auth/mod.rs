mod capability;
mod token;

pub use capability::{Authenticated, Caller, Capability, Manage, Oversee, Requirement};
pub use token::{AuthToken, AUTH_TOKEN_COOKIE};
