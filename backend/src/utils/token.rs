// src/utils/token.rs

use rand::{Rng, distributions::Alphanumeric};

/// Length of the opaque email verification token.
pub const EMAIL_TOKEN_LENGTH: usize = 45;

/// Generates a single-use email verification token (alphanumeric).
pub fn generate_email_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(EMAIL_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}
