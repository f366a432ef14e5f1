//! IMAP command handlers for the fake server.

mod any_state;
mod select;
mod uid_fetch;
mod uid_search;

pub use any_state::{handle_capability, handle_logout, handle_noop};
pub use login::handle_login;
pub use select::handle_select;
pub use uid_fetch::handle_uid_fetch;
pub use uid_search::handle_uid_search;
