//! PBKDF2-HMAC-SHA256 password hashing and verification.

use std::num::NonZeroU32;

use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use tracing::debug;

use crate::error::{CredentialErrorKind, ServiceError};

use super::CredentialRecord;

/// Default PBKDF2 iteration count.
pub const DEFAULT_ITERATIONS: u32 = 600_000;

/// Default salt width in bytes.
pub const DEFAULT_SALT_LEN: usize = 16;

/// Default digest width in bytes (SHA-256 output size).
pub const DEFAULT_DIGEST_LEN: usize = 32;

/// Fixed work parameters for the key-derivation function.
///
/// These must stay constant for the lifetime of every stored record: a record
/// hashed with one iteration count will not verify under another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    pub iterations: NonZeroU32,
    pub salt_len: usize,
    pub digest_len: usize,
}

impl KdfParams {
    /// Build parameters, returning `None` if `iterations` is zero.
    pub fn new(iterations: u32, salt_len: usize, digest_len: usize) -> Option<Self> {
        Some(Self {
            iterations: NonZeroU32::new(iterations)?,
            salt_len,
            digest_len,
        })
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: NonZeroU32::new(DEFAULT_ITERATIONS).unwrap_or(NonZeroU32::MIN),
            salt_len: DEFAULT_SALT_LEN,
            digest_len: DEFAULT_DIGEST_LEN,
        }
    }
}

/// Password credential store.
///
/// Stateless apart from the random source, so a single instance is shared
/// across all connections. Both operations are CPU-bound for the duration of
/// the configured work factor and must be run off the async worker threads.
pub struct PasswordHasher {
    params: KdfParams,
    rng: SystemRandom,
}

impl PasswordHasher {
    /// Create a hasher with the given work parameters.
    pub fn new(params: KdfParams) -> Self {
        Self {
            params,
            rng: SystemRandom::new(),
        }
    }

    /// The work parameters in use.
    pub fn params(&self) -> KdfParams {
        self.params
    }

    /// Hash a password with a freshly generated salt.
    ///
    /// Any string is accepted, including the empty one. Fails only if the
    /// system random source cannot produce a salt.
    pub fn hash(&self, password: &str) -> Result<CredentialRecord, ServiceError> {
        let mut salt = vec![0u8; self.params.salt_len];
        self.rng.fill(&mut salt).map_err(|_| ServiceError::Credential {
            kind: CredentialErrorKind::RandomUnavailable,
        })?;

        let mut digest = vec![0u8; self.params.digest_len];
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA256,
            self.params.iterations,
            &salt,
            password.as_bytes(),
            &mut digest,
        );

        Ok(CredentialRecord::new(salt, digest))
    }

    /// Verify a password against a serialized `salt:digest` record.
    ///
    /// A malformed record yields `false`, never an error.
    pub fn verify(&self, password: &str, stored: &str) -> bool {
        match stored.parse::<CredentialRecord>() {
            Ok(record) => self.verify_record(password, &record),
            Err(e) => {
                debug!(error = %e, "Rejecting unparseable credential record");
                false
            }
        }
    }

    /// Verify a password against an already parsed record.
    pub fn verify_record(&self, password: &str, record: &CredentialRecord) -> bool {
        // Digest length is not secret; bail before any byte comparison.
        if record.digest().len() != self.params.digest_len {
            debug!(
                expected = self.params.digest_len,
                actual = record.digest().len(),
                "Rejecting credential record with unexpected digest length"
            );
            return false;
        }

        // ring compares the recomputed digest in constant time.
        pbkdf2::verify(
            pbkdf2::PBKDF2_HMAC_SHA256,
            self.params.iterations,
            record.salt(),
            password.as_bytes(),
            record.digest(),
        )
        .is_ok()
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(KdfParams::default())
    }
}
