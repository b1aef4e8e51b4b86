//! Admin token verification and member password handling.

mod claims;
mod jwt;
mod password;

pub use claims::{ADMIN_ROLE, Claims};
pub use jwt::AdminTokenVerifier;
pub use password::{generate_temporary_password, hash_password, verify_password};
