//! Line-based TCP chat room.
//!
//! Clients connect, pick a name nobody else in the room holds, and every
//! line they send afterwards is relayed to the other members as
//! `"<name>: <line>"`. `/quit`, `/q`, `/exit` and `/part` leave the room;
//! `/help` and `/?` print a reminder. Dropping the connection counts as
//! leaving.
//!
//! - [`room`] holds the name → outbound queue registry and its atomic
//!   reservation.
//! - [`broadcast`] fans a line out to a snapshot of the members.
//! - [`conn`] runs the per-connection state machine.
//! - [`server`] accepts connections and spawns a session for each.

pub mod broadcast;
pub mod config;
pub mod conn;
pub mod protocol;
pub mod room;
pub mod server;
pub mod state;

pub use config::Config;
pub use room::{DeliveryError, Room};
pub use server::Server;
pub use state::ServerState;
