//! Link context for xlink serial links.
//!
//! A [`LinkContext`] owns one receive session, one handler registry and a
//! transport handle. Bytes go in through [`LinkContext::feed`], validated
//! frames come out copied, and the integrator decides when to run
//! [`LinkContext::dispatch`] against the registry. Outbound messages go
//! through [`LinkContext::send`].

pub mod config;
pub mod error;
pub mod handler;
pub mod link;
pub mod registry;
pub mod stats;

pub use config::LinkConfig;
pub use error::{LinkError, Result};
pub use handler::{handler, Handler, HandlerRef};
pub use link::{LinkContext, ReceiveSummary, RxEvent};
pub use registry::HandlerRegistry;
pub use stats::{LinkStats, StatsSnapshot};
