//! Serialized credential record: `<hex-salt>:<hex-digest>`.

use std::fmt;
use std::str::FromStr;

use crate::error::{CredentialErrorKind, ServiceError};

/// Separator between the salt and the digest. Never produced by hex encoding.
pub const RECORD_SEPARATOR: char = ':';

/// A salted password digest as persisted by the storefront's user table.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    salt: Vec<u8>,
    digest: Vec<u8>,
}

impl CredentialRecord {
    /// Build a record from raw salt and digest bytes.
    pub fn new(salt: Vec<u8>, digest: Vec<u8>) -> Self {
        Self { salt, digest }
    }

    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    pub fn digest(&self) -> &[u8] {
        &self.digest
    }
}

fn malformed(reason: &'static str) -> ServiceError {
    ServiceError::Credential {
        kind: CredentialErrorKind::MalformedRecord { reason },
    }
}

impl FromStr for CredentialRecord {
    type Err = ServiceError;

    fn from_str(stored: &str) -> Result<Self, Self::Err> {
        let (salt_hex, digest_hex) = stored
            .split_once(RECORD_SEPARATOR)
            .ok_or_else(|| malformed("missing separator"))?;

        if salt_hex.is_empty() {
            return Err(malformed("missing salt"));
        }
        if digest_hex.is_empty() {
            return Err(malformed("missing digest"));
        }

        let salt = hex::decode(salt_hex).map_err(|_| malformed("salt is not hex"))?;
        let digest = hex::decode(digest_hex).map_err(|_| malformed("digest is not hex"))?;

        Ok(Self { salt, digest })
    }
}

impl fmt::Display for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            hex::encode(&self.salt),
            RECORD_SEPARATOR,
            hex::encode(&self.digest)
        )
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("salt_len", &self.salt.len())
            .field("digest", &"[REDACTED]")
            .finish()
    }
}
