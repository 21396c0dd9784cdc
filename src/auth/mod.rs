pub mod password;
pub mod token;

pub use password::{hash_password, validate_password, verify_password, PasswordError};
pub use token::{decode_token, issue_token, Claims, TokenError};
