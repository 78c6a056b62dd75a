use std::ffi::c_void;

use xlink_transport::{BufferPool, PoolConfig, Transport, TransportError, TxBuffer};

use crate::types::UserData;

/// Transport that hands each completed frame to a C send callback.
///
/// The callback is expected to queue the bytes (for example onto a DMA
/// list) and return promptly; the buffer is recycled as soon as it returns.
pub(crate) struct CallbackTransport {
    send: unsafe extern "C" fn(*const u8, u16, *mut c_void) -> std::os::raw::c_int,
    user_data: UserData,
    pool: BufferPool,
}

impl CallbackTransport {
    pub(crate) fn new(
        send: unsafe extern "C" fn(*const u8, u16, *mut c_void) -> std::os::raw::c_int,
        user_data: *mut c_void,
        pool: PoolConfig,
    ) -> Self {
        Self {
            send,
            user_data: UserData(user_data),
            pool: BufferPool::new(pool),
        }
    }
}

impl Transport for CallbackTransport {
    fn alloc(&self, len: usize) -> xlink_transport::Result<TxBuffer> {
        self.pool.alloc(len)
    }

    fn enqueue(&self, buf: TxBuffer) -> xlink_transport::Result<()> {
        let len = u16::try_from(buf.len()).map_err(|_| TransportError::BufferTooLarge {
            len: buf.len(),
            max: usize::from(u16::MAX),
        })?;

        // SAFETY: the callback was supplied non-null at context creation and
        // the buffer stays alive for the duration of the call.
        let rc = unsafe { (self.send)(buf.as_ptr(), len, self.user_data.0) };
        if rc != 0 {
            return Err(TransportError::Rejected(format!(
                "send callback returned {rc}"
            )));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "c-callback"
    }
}

/// Convert an optional byte pointer + length into a slice.
///
/// # Safety
/// If `len > 0`, `data` must be non-null and readable for `len` bytes.
pub(crate) unsafe fn bytes_arg<'a>(data: *const u8, len: usize, name: &str) -> Option<&'a [u8]> {
    if len == 0 {
        return Some(&[]);
    }
    if data.is_null() {
        let _ = crate::error::set_invalid_argument(format!("{name} cannot be null when len > 0"));
        return None;
    }

    // SAFETY: Pointer and length are validated above and owned by caller for the call duration.
    Some(unsafe { std::slice::from_raw_parts(data, len) })
}
