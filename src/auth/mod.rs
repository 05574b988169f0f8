//! Authentication gate: password hashing, token issuance and verification.

pub mod error;
pub mod extractor;
pub mod gate;
pub mod password;

pub use error::AuthError;
pub use gate::{AuthGate, AuthenticatedAccount, Claims, IssuedToken};
pub use password::{hash_password, verify_password};
