pub mod connection;
pub mod mailbox;
pub mod relay;

pub use connection::Connection;
pub use mailbox::Mailbox;
pub use relay::{Relay, RelayBehavior, POLL_INTERVAL};
