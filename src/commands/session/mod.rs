//! Session commands: login, logout and guarded session queries.

mod authorize;
mod login;
mod logout;

pub use authorize::{AuthorizeCommand, WhoAmICommand};
pub use login::LoginCommand;
pub use logout::LogoutCommand;
