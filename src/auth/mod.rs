//! Credential handling
//!
//! Password digests for the client side and nickname validation for registration.

pub mod credentials;
pub mod validator;

pub use credentials::digest_password;
pub use validator::{MAX_NICKNAME_LENGTH, validate_nickname};
