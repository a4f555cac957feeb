//! Credential commands: hash, verify and change passwords.

mod change;
mod hash;
mod verify;

pub use change::ChangeCredentialCommand;
pub use hash::HashCredentialCommand;
pub use verify::VerifyCredentialCommand;
