//! Account lifecycle: credentials, lockout, and password policy.

pub mod password;
pub mod service;

pub use password::{hash_password, validate_password, verify_password};
pub use service::AccountService;
