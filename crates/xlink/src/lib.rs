//! Framed messaging over point-to-point serial links.
//!
//! xlink carries small addressed messages between embedded components: a
//! start-marked, length-prefixed frame with a CRC16 trailer, decoded one
//! byte at a time, dispatched to handlers registered per
//! (component, message) pair.
//!
//! # Crate Structure
//!
//! - [`transport`]: Buffer allocation and send-queue capabilities (stream, loopback)
//! - [`frame`]: Wire format, CRC16 and the receive state machine
//! - [`link`]: Handler registry and link context (behind `link` feature)

/// Re-export transport types.
pub mod transport {
    pub use xlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use xlink_frame::*;
}

/// Re-export link types (requires `link` feature).
#[cfg(feature = "link")]
pub mod link {
    pub use xlink_link::*;
}
