//! Two link contexts wired back to back over in-memory transports.
//!
//! The "host" side sends a ping to the "sensor" side, whose handler replies
//! from inside dispatch; the host then receives and dispatches the reply.
//!
//! Run with:
//!   cargo run --example loopback
//!   cargo run --example loopback -- trace

use std::sync::{Arc, Weak};

use tracing::level_filters::LevelFilter;
use xlink::frame::Frame;
use xlink::link::{handler, LinkContext};
use xlink::transport::LoopbackTransport;

const SENSOR: u8 = 0x02;
const PING: u8 = 0x01;
const PONG: u8 = 0x81;

type Link = LinkContext<LoopbackTransport>;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let level = match std::env::args().nth(1).as_deref() {
        Some("trace") => LevelFilter::TRACE,
        Some("debug") => LevelFilter::DEBUG,
        _ => LevelFilter::INFO,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();

    let host = Link::new(LoopbackTransport::new());
    let sensor = Arc::new(Link::new(LoopbackTransport::new()));

    let replier: Weak<Link> = Arc::downgrade(&sensor);
    sensor.register(
        SENSOR,
        PING,
        handler(move |frame: &Frame| {
            let Some(link) = replier.upgrade() else {
                return;
            };
            let mut reply = frame.payload.to_vec();
            reply.reverse();
            if let Err(err) = link.send(SENSOR, PONG, &reply) {
                tracing::warn!(error = %err, "reply failed");
            }
        }),
    )?;

    host.register(
        SENSOR,
        PONG,
        handler(|frame: &Frame| {
            tracing::info!(
                component = frame.component,
                message = frame.message,
                payload = ?frame.payload,
                "pong received"
            );
        }),
    )?;

    host.send(SENSOR, PING, b"xlink")?;

    // Line noise ahead of the frame is skipped by the receiver.
    let mut wire = vec![0x00, 0xFF];
    wire.extend(host.transport().take_wire());
    let summary = sensor.receive(&wire);
    tracing::info!(?summary, "sensor side");

    let summary = host.receive(&sensor.transport().take_wire());
    tracing::info!(?summary, "host side");

    println!("{}", serde_json::to_string_pretty(&host.stats().snapshot())?);
    Ok(())
}
