use std::collections::HashMap;
use std::ffi::c_void;
use std::os::raw::c_int;
use std::sync::Mutex;

use xlink_frame::{Frame, FrameView, MAX_PAYLOAD};
use xlink_link::{HandlerRef, LinkContext};

use crate::transport::CallbackTransport;

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XlinkResult {
    Ok = 0,
    InvalidArgument = 1,
    PayloadTooLarge = 2,
    TransportUnavailable = 3,
    TransportError = 4,
    DuplicateRegistration = 5,
    ComponentNotFound = 6,
    HandlerNotFound = 7,
    ResourceExhausted = 8,
    FrameError = 9,
    Internal = 99,
}

#[allow(dead_code)]
pub const XLINK_OK: XlinkResult = XlinkResult::Ok;
#[allow(dead_code)]
pub const XLINK_ERR_INVALID_ARGUMENT: XlinkResult = XlinkResult::InvalidArgument;
#[allow(dead_code)]
pub const XLINK_ERR_PAYLOAD_TOO_LARGE: XlinkResult = XlinkResult::PayloadTooLarge;
#[allow(dead_code)]
pub const XLINK_ERR_TRANSPORT_UNAVAILABLE: XlinkResult = XlinkResult::TransportUnavailable;
#[allow(dead_code)]
pub const XLINK_ERR_TRANSPORT: XlinkResult = XlinkResult::TransportError;
#[allow(dead_code)]
pub const XLINK_ERR_DUPLICATE_REGISTRATION: XlinkResult = XlinkResult::DuplicateRegistration;
#[allow(dead_code)]
pub const XLINK_ERR_COMPONENT_NOT_FOUND: XlinkResult = XlinkResult::ComponentNotFound;
#[allow(dead_code)]
pub const XLINK_ERR_HANDLER_NOT_FOUND: XlinkResult = XlinkResult::HandlerNotFound;
#[allow(dead_code)]
pub const XLINK_ERR_RESOURCE_EXHAUSTED: XlinkResult = XlinkResult::ResourceExhausted;
#[allow(dead_code)]
pub const XLINK_ERR_FRAME: XlinkResult = XlinkResult::FrameError;
#[allow(dead_code)]
pub const XLINK_ERR_INTERNAL: XlinkResult = XlinkResult::Internal;

/// Outcome of `xlink_process_rx`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XlinkRxOutcome {
    Error = -1,
    Incomplete = 0,
    FrameReady = 1,
    ChecksumMismatch = 2,
}

/// A validated frame copied out to C.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct XlinkFrame {
    pub comp_id: u8,
    pub msg_id: u8,
    pub len: u8,
    pub payload: [u8; MAX_PAYLOAD],
}

impl Default for XlinkFrame {
    fn default() -> Self {
        Self {
            comp_id: 0,
            msg_id: 0,
            len: 0,
            payload: [0; MAX_PAYLOAD],
        }
    }
}

impl XlinkFrame {
    pub(crate) fn fill(&mut self, view: FrameView<'_>) {
        let len = view.payload.len().min(MAX_PAYLOAD);
        self.comp_id = view.component;
        self.msg_id = view.message;
        self.len = len as u8;
        self.payload[..len].copy_from_slice(&view.payload[..len]);
    }

    pub(crate) fn to_frame(&self) -> Frame {
        let len = usize::from(self.len).min(MAX_PAYLOAD);
        Frame::new(self.comp_id, self.msg_id, self.payload[..len].to_vec())
    }
}

/// `int handler(uint8_t comp_id, uint8_t msg_id, const uint8_t *payload, uint8_t len, void *user_data)`
pub type XlinkMsgHandler =
    Option<unsafe extern "C" fn(u8, u8, *const u8, u8, *mut c_void) -> c_int>;

/// `int send(const uint8_t *data, uint16_t len, void *user_data)`; zero means queued.
pub type XlinkSendFn = Option<unsafe extern "C" fn(*const u8, u16, *mut c_void) -> c_int>;

pub type XlinkContextHandle = *mut c_void;

/// Opaque user pointer handed back to C callbacks.
#[derive(Debug, Clone, Copy)]
pub(crate) struct UserData(pub(crate) *mut c_void);

// SAFETY: the pointer is never dereferenced on the Rust side; the C caller
// owns whatever it points to and is responsible for its thread safety.
unsafe impl Send for UserData {}
// SAFETY: see above.
unsafe impl Sync for UserData {}

/// Registration identity as C sees it: the callback address and its user pointer.
pub(crate) type CallbackKey = (usize, usize);

pub(crate) struct ContextHandle {
    pub(crate) link: LinkContext<CallbackTransport>,
    /// One shared handler per C registration identity, so registry
    /// identity checks line up with (callback, user_data) equality.
    pub(crate) handlers: Mutex<HashMap<CallbackKey, HandlerRef>>,
}
