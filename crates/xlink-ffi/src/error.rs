use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;

use xlink_link::LinkError;

use crate::types::XlinkResult;

thread_local! {
    static LAST_ERROR: RefCell<CString> = RefCell::new(CString::default());
}

pub(crate) fn clear_error_state() {
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::default();
    });
}

pub(crate) fn set_error_message(message: impl Into<String>) {
    let sanitized = message.into().replace('\0', "?");
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::new(sanitized).unwrap_or_default();
    });
}

pub(crate) fn set_invalid_argument(message: impl Into<String>) -> XlinkResult {
    set_error_message(message);
    XlinkResult::InvalidArgument
}

pub(crate) fn set_panic_error() {
    set_error_message("panic across FFI boundary");
}

pub(crate) fn map_link_error(err: &LinkError) -> XlinkResult {
    set_error_message(err.to_string());
    match err {
        LinkError::DuplicateRegistration { .. } => XlinkResult::DuplicateRegistration,
        LinkError::ComponentNotFound(_) => XlinkResult::ComponentNotFound,
        LinkError::HandlerNotFound { .. } => XlinkResult::HandlerNotFound,
        LinkError::ResourceExhausted(_) => XlinkResult::ResourceExhausted,
        LinkError::PayloadTooLarge { .. } => XlinkResult::PayloadTooLarge,
        LinkError::TransportUnavailable(_) => XlinkResult::TransportUnavailable,
        LinkError::Transport(_) => XlinkResult::TransportError,
        LinkError::Frame(_) => XlinkResult::FrameError,
    }
}

pub(crate) fn last_error_ptr() -> *const c_char {
    LAST_ERROR.with(|state| state.borrow().as_ptr())
}
