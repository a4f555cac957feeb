//! Password credential store.
//!
//! Turns plaintext passwords into salted PBKDF2 digests serialized as
//! `<hex-salt>:<hex-digest>`, and verifies attempts against stored records
//! with a constant-time comparison.

mod hasher;
mod record;

pub use hasher::{
    KdfParams, PasswordHasher, DEFAULT_DIGEST_LEN, DEFAULT_ITERATIONS, DEFAULT_SALT_LEN,
};
pub use record::{CredentialRecord, RECORD_SEPARATOR};
