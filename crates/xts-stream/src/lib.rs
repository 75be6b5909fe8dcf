//! Sandbox market-data socket.
//!
//! [`SimulatedSocket`] stands in for the live touchline/depth feed. It
//! pushes [`StreamEvent`](xts_core::StreamEvent)s into a tokio channel;
//! consumers only ever see that channel.

pub mod error;
pub mod socket;

pub use error::{StreamError, StreamResult};
pub use socket::{ConnectionState, SimulatedSocket, SocketConfig};
