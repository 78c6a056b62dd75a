use std::collections::HashMap;
use std::ffi::c_void;
use std::os::raw::c_int;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use xlink_frame::{Frame, Outcome};
use xlink_link::{Handler, HandlerRef, LinkContext};
use xlink_transport::PoolConfig;

use crate::error;
use crate::transport::{self, CallbackTransport};
use crate::types::{
    CallbackKey, ContextHandle, UserData, XlinkContextHandle, XlinkFrame, XlinkMsgHandler,
    XlinkResult, XlinkRxOutcome, XlinkSendFn,
};

type RawHandler = unsafe extern "C" fn(u8, u8, *const u8, u8, *mut c_void) -> c_int;

struct CallbackHandler {
    func: RawHandler,
    user_data: UserData,
}

impl Handler for CallbackHandler {
    fn handle(&self, frame: &Frame) {
        // SAFETY: the callback was non-null at registration; the payload
        // slice outlives the call. The return value carries no meaning.
        unsafe {
            (self.func)(
                frame.component,
                frame.message,
                frame.payload.as_ptr(),
                frame.payload.len() as u8,
                self.user_data.0,
            );
        }
    }
}

fn callback_key(func: RawHandler, user_data: *mut c_void) -> CallbackKey {
    (func as usize, user_data as usize)
}

fn lock_handlers(handle: &ContextHandle) -> MutexGuard<'_, HashMap<CallbackKey, HandlerRef>> {
    handle
        .handlers
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

fn with_context<T>(handle: XlinkContextHandle, on_error: T, f: impl FnOnce(&ContextHandle) -> T) -> T {
    if handle.is_null() {
        let _ = error::set_invalid_argument("context handle cannot be null");
        return on_error;
    }

    let context = {
        // SAFETY: Pointer validity is guaranteed by the caller.
        unsafe { &*(handle as *const ContextHandle) }
    };

    f(context)
}

/// Create a link context that transmits through `send`.
///
/// Returns null (with `xlink_last_error` set) if `send` is null.
///
/// # Safety
/// `send` must remain callable, and `user_data` valid for it, until the
/// context is freed. `send` may be called from any thread that calls
/// `xlink_send` or from inside a message handler.
#[no_mangle]
pub unsafe extern "C" fn xlink_context_create(
    send: XlinkSendFn,
    user_data: *mut c_void,
) -> XlinkContextHandle {
    crate::ffi_boundary(std::ptr::null_mut(), || {
        error::clear_error_state();

        let Some(send) = send else {
            let _ = error::set_invalid_argument("send callback cannot be null");
            return std::ptr::null_mut();
        };

        let transport = CallbackTransport::new(send, user_data, PoolConfig::default());
        let handle = ContextHandle {
            link: LinkContext::new(transport),
            handlers: Mutex::new(HashMap::new()),
        };
        Box::into_raw(Box::new(handle)) as XlinkContextHandle
    })
}

/// Free a context and every registration it holds.
///
/// # Safety
/// `context` must be null or a handle previously returned by
/// `xlink_context_create`, and no other thread may be using it.
#[no_mangle]
pub unsafe extern "C" fn xlink_context_free(context: XlinkContextHandle) {
    crate::ffi_boundary((), || {
        if context.is_null() {
            return;
        }

        // SAFETY: Pointer originates from Box::into_raw in xlink_context_create.
        unsafe {
            drop(Box::from_raw(context as *mut ContextHandle));
        }
    });
}

/// Register `handler` with `user_data` for `(comp_id, msg_id)`.
///
/// The same callback with a different `user_data` is a distinct registration.
///
/// # Safety
/// `context` must be a valid context handle. `handler` must remain callable,
/// and `user_data` valid for it, until it is unregistered or the context is freed.
#[no_mangle]
pub unsafe extern "C" fn xlink_register_msg_handler(
    context: XlinkContextHandle,
    comp_id: u8,
    msg_id: u8,
    handler: XlinkMsgHandler,
    user_data: *mut c_void,
) -> XlinkResult {
    crate::ffi_boundary(XlinkResult::Internal, || {
        error::clear_error_state();

        let Some(func) = handler else {
            return error::set_invalid_argument("handler cannot be null");
        };

        with_context(context, XlinkResult::InvalidArgument, |ctx| {
            let key = callback_key(func, user_data);
            let mut handlers = lock_handlers(ctx);
            let shared = handlers.get(&key).map(Arc::clone).unwrap_or_else(|| {
                Arc::new(CallbackHandler {
                    func,
                    user_data: UserData(user_data),
                }) as HandlerRef
            });

            match ctx.link.register(comp_id, msg_id, Arc::clone(&shared)) {
                Ok(()) => {
                    handlers.entry(key).or_insert(shared);
                    XlinkResult::Ok
                }
                Err(err) => error::map_link_error(&err),
            }
        })
    })
}

/// Remove the registration of `handler` with `user_data` for `(comp_id, msg_id)`.
///
/// # Safety
/// `context` must be a valid context handle.
#[no_mangle]
pub unsafe extern "C" fn xlink_unregister_msg_handler(
    context: XlinkContextHandle,
    comp_id: u8,
    msg_id: u8,
    handler: XlinkMsgHandler,
    user_data: *mut c_void,
) -> XlinkResult {
    crate::ffi_boundary(XlinkResult::Internal, || {
        error::clear_error_state();

        let Some(func) = handler else {
            return error::set_invalid_argument("handler cannot be null");
        };

        with_context(context, XlinkResult::InvalidArgument, |ctx| {
            let key = callback_key(func, user_data);
            let mut handlers = lock_handlers(ctx);

            // An identity never registered still goes through the registry so
            // the caller learns whether the component or the handler was missing.
            let shared = handlers.get(&key).map(Arc::clone).unwrap_or_else(|| {
                Arc::new(CallbackHandler {
                    func,
                    user_data: UserData(user_data),
                }) as HandlerRef
            });

            match ctx.link.unregister(comp_id, msg_id, &shared) {
                Ok(()) => {
                    if !ctx.link.is_registered(&shared) {
                        handlers.remove(&key);
                    }
                    XlinkResult::Ok
                }
                Err(err) => error::map_link_error(&err),
            }
        })
    })
}

/// Feed one received byte into the context's receive session.
///
/// On `FrameReady` the validated frame is copied into `out_frame` if it is
/// non-null. Handlers are not invoked; pass the frame to `xlink_dispatch`.
///
/// # Safety
/// `context` must be a valid context handle; `out_frame` must be null or
/// point to writable `XlinkFrame` storage.
#[no_mangle]
pub unsafe extern "C" fn xlink_process_rx(
    context: XlinkContextHandle,
    byte: u8,
    out_frame: *mut XlinkFrame,
) -> XlinkRxOutcome {
    crate::ffi_boundary(XlinkRxOutcome::Error, || {
        with_context(context, XlinkRxOutcome::Error, |ctx| {
            let (outcome, _) = ctx.link.feed_with(byte, |view| {
                if !out_frame.is_null() {
                    // SAFETY: Pointer validity is guaranteed by the caller.
                    unsafe { &mut *out_frame }.fill(view);
                }
            });
            match outcome {
                Outcome::Incomplete => XlinkRxOutcome::Incomplete,
                Outcome::FrameReady => XlinkRxOutcome::FrameReady,
                Outcome::ChecksumMismatch { computed, received } => {
                    error::set_error_message(format!(
                        "checksum mismatch (computed {computed:#06x}, received {received:#06x})"
                    ));
                    XlinkRxOutcome::ChecksumMismatch
                }
            }
        })
    })
}

/// Invoke every handler registered for `frame`, in registration order.
///
/// The number of handlers run is written to `out_count` if it is non-null.
///
/// # Safety
/// `context` must be a valid context handle; `frame` must point to a
/// readable `XlinkFrame`; `out_count` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn xlink_dispatch(
    context: XlinkContextHandle,
    frame: *const XlinkFrame,
    out_count: *mut usize,
) -> XlinkResult {
    crate::ffi_boundary(XlinkResult::Internal, || {
        error::clear_error_state();

        if frame.is_null() {
            return error::set_invalid_argument("frame cannot be null");
        }

        with_context(context, XlinkResult::InvalidArgument, |ctx| {
            // SAFETY: Pointer validity is guaranteed by the caller.
            let frame = unsafe { &*frame }.to_frame();
            let count = ctx.link.dispatch(&frame);
            if !out_count.is_null() {
                // SAFETY: Pointer validity is guaranteed by the caller.
                unsafe { *out_count = count };
            }
            XlinkResult::Ok
        })
    })
}

/// Feed a block of received bytes and dispatch every valid frame in it.
///
/// # Safety
/// `context` must be a valid context handle; `data` must be readable for
/// `len` bytes when `len > 0`.
#[no_mangle]
pub unsafe extern "C" fn xlink_receive(
    context: XlinkContextHandle,
    data: *const u8,
    len: usize,
) -> XlinkResult {
    crate::ffi_boundary(XlinkResult::Internal, || {
        error::clear_error_state();

        // SAFETY: We validate pointer/length in helper.
        let Some(data) = (unsafe { transport::bytes_arg(data, len, "data") }) else {
            return XlinkResult::InvalidArgument;
        };

        with_context(context, XlinkResult::InvalidArgument, |ctx| {
            ctx.link.receive(data);
            XlinkResult::Ok
        })
    })
}

/// Encode a frame and pass it to the context's send callback.
///
/// # Safety
/// `context` must be a valid context handle; `payload` must be readable for
/// `payload_len` bytes when `payload_len > 0`.
#[no_mangle]
pub unsafe extern "C" fn xlink_send(
    context: XlinkContextHandle,
    comp_id: u8,
    msg_id: u8,
    payload: *const u8,
    payload_len: u8,
) -> XlinkResult {
    crate::ffi_boundary(XlinkResult::Internal, || {
        error::clear_error_state();

        // SAFETY: We validate pointer/length in helper.
        let Some(payload) =
            (unsafe { transport::bytes_arg(payload, usize::from(payload_len), "payload") })
        else {
            return XlinkResult::InvalidArgument;
        };

        with_context(context, XlinkResult::InvalidArgument, |ctx| {
            match ctx.link.send(comp_id, msg_id, payload) {
                Ok(()) => XlinkResult::Ok,
                Err(err) => error::map_link_error(&err),
            }
        })
    })
}
