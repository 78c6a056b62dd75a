//! Transmit-side transport capabilities for xlink.
//!
//! The protocol engine never talks to a UART directly. It needs exactly two
//! capabilities from whatever sits underneath it:
//! - a buffer allocator keyed by byte length ([`Transport::alloc`])
//! - a send queue that accepts a populated buffer ([`Transport::enqueue`])
//!
//! This is the lowest layer of xlink. [`StreamTransport`] drives any
//! `std::io::Write` (a serial port handle, a pipe, a socket) from a writer
//! thread; [`LoopbackTransport`] keeps frames in memory.

pub mod error;
pub mod loopback;
pub mod pool;
pub mod stream;
pub mod traits;

pub use error::{Result, TransportError};
pub use loopback::LoopbackTransport;
pub use pool::{BufferPool, PoolConfig, TxBuffer};
pub use stream::StreamTransport;
pub use traits::Transport;
