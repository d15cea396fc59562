#![forbid(unsafe_code)]

mod connection;
pub mod handler;
pub mod node;
pub mod replication;

pub use connection::{Connection, Outbound};
pub use handler::{PeerKind, handle_connection};
pub use node::{Node, NodeConfig, Role};
pub use replication::{FollowerId, FollowerSet};
