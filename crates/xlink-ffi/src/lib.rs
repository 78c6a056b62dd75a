//! xlink-ffi: C-ABI exports for xlink link contexts.

mod context;
mod crc;
mod error;
mod transport;
mod types;

use std::panic::AssertUnwindSafe;

pub use context::{
    xlink_context_create, xlink_context_free, xlink_dispatch, xlink_process_rx, xlink_receive,
    xlink_register_msg_handler, xlink_send, xlink_unregister_msg_handler,
};
pub use crc::{xlink_crc16, xlink_crc16_with_init};
pub use types::{
    XlinkContextHandle, XlinkFrame, XlinkMsgHandler, XlinkResult, XlinkRxOutcome, XlinkSendFn,
    XLINK_ERR_COMPONENT_NOT_FOUND, XLINK_ERR_DUPLICATE_REGISTRATION, XLINK_ERR_FRAME,
    XLINK_ERR_HANDLER_NOT_FOUND, XLINK_ERR_INTERNAL, XLINK_ERR_INVALID_ARGUMENT,
    XLINK_ERR_PAYLOAD_TOO_LARGE, XLINK_ERR_RESOURCE_EXHAUSTED, XLINK_ERR_TRANSPORT,
    XLINK_ERR_TRANSPORT_UNAVAILABLE, XLINK_OK,
};

fn ffi_boundary<T>(on_panic: T, f: impl FnOnce() -> T) -> T {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            error::set_panic_error();
            on_panic
        }
    }
}

#[no_mangle]
pub extern "C" fn xlink_init() -> XlinkResult {
    ffi_boundary(XlinkResult::Internal, || {
        error::clear_error_state();
        XlinkResult::Ok
    })
}

#[no_mangle]
pub extern "C" fn xlink_last_error() -> *const std::os::raw::c_char {
    ffi_boundary(std::ptr::null(), error::last_error_ptr)
}
