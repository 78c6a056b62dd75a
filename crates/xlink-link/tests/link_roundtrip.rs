use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread;

use xlink_frame::Frame;
use xlink_link::{handler, HandlerRef, LinkContext, LinkError, RxEvent};
use xlink_transport::LoopbackTransport;

type Link = LinkContext<LoopbackTransport>;

fn recorder() -> (HandlerRef, Arc<Mutex<Vec<Frame>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let h = handler(move |frame: &Frame| {
        sink.lock().expect("recorder lock").push(frame.clone());
    });
    (h, seen)
}

#[test]
fn frames_cross_between_two_links() {
    let left = Link::new(LoopbackTransport::new());
    let right = Link::new(LoopbackTransport::new());
    let (h, seen) = recorder();
    right.register(0x01, 0x10, h).expect("register");

    left.send(0x01, 0x10, b"ping").expect("send ping");
    left.send(0x01, 0x11, b"ignored").expect("send other");
    left.send(0x01, 0x10, b"").expect("send empty");

    let summary = right.receive(&left.transport().take_wire());
    assert_eq!(summary.frames, 3);
    assert_eq!(summary.handlers_invoked, 2);
    assert_eq!(summary.checksum_mismatches, 0);

    let seen = seen.lock().expect("recorder lock");
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].payload.as_ref(), b"ping");
    assert!(seen[1].payload.is_empty());
}

#[test]
fn handlers_run_in_registration_order() {
    let link = Link::new(LoopbackTransport::new());
    let order = Arc::new(Mutex::new(Vec::new()));

    for tag in 0..3u8 {
        let order = Arc::clone(&order);
        link.register(
            2,
            2,
            handler(move |_frame: &Frame| order.lock().expect("order lock").push(tag)),
        )
        .expect("register");
    }

    link.send(2, 2, b"x").expect("send");
    link.receive(&link.transport().take_wire());
    assert_eq!(*order.lock().expect("order lock"), vec![0, 1, 2]);
}

#[test]
fn corrupted_frame_is_never_dispatched() {
    let sender = Link::new(LoopbackTransport::new());
    let receiver = Link::new(LoopbackTransport::new());
    let (h, seen) = recorder();
    receiver.register(3, 3, h).expect("register");

    sender.send(3, 3, b"bad").expect("send");
    sender.send(3, 3, b"good").expect("send");
    let mut wire = vec![0x00, 0x7E];
    wire.extend(sender.transport().take_wire());
    wire[2 + 5] ^= 0x10;

    let summary = receiver.receive(&wire);
    assert_eq!(summary.checksum_mismatches, 1);
    assert_eq!(summary.frames, 1);

    let seen = seen.lock().expect("recorder lock");
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].payload.as_ref(), b"good");

    let snap = receiver.stats().snapshot();
    assert_eq!(snap.noise_bytes, 2);
    assert_eq!(snap.checksum_mismatches, 1);
}

#[test]
fn handler_may_reply_and_reregister_on_its_own_link() {
    let link = Arc::new(Link::new(LoopbackTransport::new()));
    let weak: Weak<Link> = Arc::downgrade(&link);
    let follow_up_hits = Arc::new(AtomicUsize::new(0));
    let hits = Arc::clone(&follow_up_hits);

    let first = handler(move |frame: &Frame| {
        let Some(link) = weak.upgrade() else {
            return;
        };
        link.send(frame.component, 0x81, &frame.payload)
            .expect("reply from handler");
        let hits = Arc::clone(&hits);
        link.register(
            frame.component,
            0x81,
            handler(move |_frame: &Frame| {
                hits.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .expect("register from handler");
    });
    link.register(4, 0x01, first).expect("register");

    link.send(4, 0x01, b"hello").expect("send");
    let summary = link.receive(&link.transport().take_wire());
    assert_eq!(summary.handlers_invoked, 1);

    // the reply was queued from inside the handler and now loops back
    let summary = link.receive(&link.transport().take_wire());
    assert_eq!(summary.frames, 1);
    assert_eq!(follow_up_hits.load(Ordering::SeqCst), 1);
}

#[test]
fn handler_may_unregister_itself() {
    let link = Arc::new(Link::new(LoopbackTransport::new()));
    let weak: Weak<Link> = Arc::downgrade(&link);
    let hits = Arc::new(AtomicUsize::new(0));
    let slot: Arc<Mutex<Option<HandlerRef>>> = Arc::new(Mutex::new(None));

    let counter = Arc::clone(&hits);
    let me = Arc::clone(&slot);
    let once = handler(move |frame: &Frame| {
        counter.fetch_add(1, Ordering::SeqCst);
        let this = me.lock().expect("slot lock").take();
        if let (Some(link), Some(this)) = (weak.upgrade(), this) {
            link.unregister(frame.component, frame.message, &this)
                .expect("unregister self");
        }
    });
    *slot.lock().expect("slot lock") = Some(HandlerRef::clone(&once));
    link.register(5, 5, once).expect("register");

    link.send(5, 5, b"a").expect("send");
    link.send(5, 5, b"b").expect("send");
    link.receive(&link.transport().take_wire());

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(link.lookup(5, 5).is_empty());
}

#[test]
fn concurrent_feed_and_registration() {
    let link = Arc::new(Link::new(LoopbackTransport::new()));
    let sender = Link::new(LoopbackTransport::new());
    for i in 0..200u8 {
        sender.send(7, i % 4, &[i]).expect("send");
    }
    let wire = sender.transport().take_wire();

    let rx_link = Arc::clone(&link);
    let rx = thread::spawn(move || {
        let mut frames = 0;
        for byte in wire {
            if let RxEvent::FrameReady(frame) = rx_link.feed(byte) {
                frames += 1;
                rx_link.dispatch(&frame);
            }
        }
        frames
    });

    let reg_link = Arc::clone(&link);
    let registrar = thread::spawn(move || {
        for _ in 0..50 {
            let h = handler(|_frame: &Frame| {});
            reg_link
                .register(7, 1, HandlerRef::clone(&h))
                .expect("register");
            reg_link.unregister(7, 1, &h).expect("unregister");
        }
    });

    registrar.join().expect("registrar thread");
    assert_eq!(rx.join().expect("receiver thread"), 200);
    assert!(link.lookup(7, 1).is_empty());
    assert_eq!(link.stats().snapshot().frames_received, 200);
}

#[test]
fn registration_errors_surface_through_the_link() {
    let link = Link::new(LoopbackTransport::new());
    let h = handler(|_frame: &Frame| {});

    assert!(matches!(
        link.unregister(1, 1, &h),
        Err(LinkError::ComponentNotFound(1))
    ));
    link.register(1, 1, HandlerRef::clone(&h)).expect("register");
    assert!(matches!(
        link.register(1, 1, HandlerRef::clone(&h)),
        Err(LinkError::DuplicateRegistration { .. })
    ));
    link.unregister(1, 1, &h).expect("unregister");
    assert!(matches!(
        link.unregister(1, 1, &h),
        Err(LinkError::HandlerNotFound { .. })
    ));
}

#[test]
fn dropping_the_link_releases_registrations() {
    let link = Link::new(LoopbackTransport::new());
    let h = handler(|_frame: &Frame| {});
    link.register(1, 1, HandlerRef::clone(&h)).expect("register");
    link.register(1, 2, HandlerRef::clone(&h)).expect("register");
    assert_eq!(Arc::strong_count(&h), 3);

    drop(link);
    assert_eq!(Arc::strong_count(&h), 1);
}

#[test]
fn default_link_has_no_registration_ceiling() {
    let link = Link::new(LoopbackTransport::new());
    for component in 0..=u8::MAX {
        link.register(component, 1, handler(|_frame: &Frame| {}))
            .expect("register component");
    }
    for _ in 0..40 {
        link.register(7, 7, handler(|_frame: &Frame| {}))
            .expect("register in shared bucket");
    }

    assert_eq!(link.lookup(7, 7).len(), 40);
    assert_eq!(link.config().max_components, None);

    link.send(7, 7, b"fan-out").expect("send");
    let summary = link.receive(&link.transport().take_wire());
    assert_eq!(summary.handlers_invoked, 40);
}
