//! Server-side connection dispatching for PIXNET.
//!
//! The dispatcher accepts connections, issues process-unique session IDs,
//! spawns one session task per connection and routes verified client
//! messages to the application through the [`AppHandler`] trait. Outbound
//! sends go through each session's command channel, so writes to a single
//! session stay serialized while sessions run fully in parallel.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dispatcher;
pub mod limits;

pub use dispatcher::{AppHandler, Dispatcher, DispatcherConfig};
pub use limits::TokenBucket;
