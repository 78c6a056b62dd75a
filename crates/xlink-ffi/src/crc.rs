/// CRC16 over `len` bytes at `data`.
///
/// # Safety
/// `data` must be readable for `len` bytes when `len > 0`.
#[no_mangle]
pub unsafe extern "C" fn xlink_crc16(data: *const u8, len: u16) -> u16 {
    // SAFETY: Forwarded caller guarantee.
    unsafe { xlink_crc16_with_init(data, len, xlink_frame::CRC16_INIT) }
}

/// Continue a CRC16 from `init` over `len` bytes at `data`.
///
/// A null `data` or zero `len` returns `init` unchanged.
///
/// # Safety
/// `data` must be readable for `len` bytes when `len > 0`.
#[no_mangle]
pub unsafe extern "C" fn xlink_crc16_with_init(data: *const u8, len: u16, init: u16) -> u16 {
    crate::ffi_boundary(init, || {
        if data.is_null() || len == 0 {
            return init;
        }
        // SAFETY: Pointer and length are validated above and owned by caller for the call duration.
        let bytes = unsafe { std::slice::from_raw_parts(data, usize::from(len)) };
        xlink_frame::crc16_update(init, bytes)
    })
}
