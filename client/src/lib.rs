//! Native client for the shared canvas: transports, frame pacing and a
//! session that keeps a local replica of the board.

pub mod clock;
pub mod config;
pub mod error;
pub mod session;
pub mod transport;

pub use clock::Clock;
pub use config::{ClientConfig, TransportKind};
pub use error::{ClientError, Result};
pub use session::{ClientSession, Redraw};
pub use transport::{LongPollTransport, PushTransport, Transport};
