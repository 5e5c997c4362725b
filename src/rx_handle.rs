//! Ownership hand-off for buffers loaned out by the WiFi driver.
//!
//! Received frames live in the driver's own buffer pool. The driver hands us
//! a pointer, a length and a release callback, and expects the callback to be
//! invoked exactly once when we're done with the buffer. [RxFrameHandle]
//! wraps that contract in a move-only handle whose [Drop] performs the
//! release, so double-release and use-after-release are ruled out by the type
//! rather than by control-flow discipline.

use core::ops::Deref;

/// Release callback for a driver-owned buffer.
///
/// Invoked with the opaque token the driver supplied alongside the buffer.
pub type ReleaseFn = unsafe fn(token: *mut ());

/// A received frame, borrowed from the WiFi driver's buffer pool.
///
/// Dropping the handle returns the buffer to the driver.
/// WARNING:
/// You must not [core::mem::forget] an [RxFrameHandle], since the buffer
/// would then never be returned to the driver's pool.
#[clippy::has_significant_drop]
pub struct RxFrameHandle {
    /// # SAFETY:
    /// Valid for `len` bytes until `release` is invoked with `token`, which
    /// only ever happens in [Drop].
    buffer: *const u8,
    len: usize,
    token: *mut (),
    release: ReleaseFn,
}

impl RxFrameHandle {
    /// Wrap a driver-owned buffer.
    ///
    /// # Safety
    /// `buffer` must be valid for reads of `len` bytes until `release` is
    /// called with `token`, and calling `release(token)` exactly once must be
    /// the correct way to return the buffer to its owner. The caller must not
    /// touch the buffer or the token afterwards.
    pub unsafe fn new(buffer: *const u8, len: usize, token: *mut (), release: ReleaseFn) -> Self {
        Self {
            buffer,
            len,
            token,
            release,
        }
    }
}
impl Deref for RxFrameHandle {
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        // SAFETY: See the field invariant; the buffer outlives the handle.
        unsafe { core::slice::from_raw_parts(self.buffer, self.len) }
    }
}
// SAFETY:
// The handle is created in the driver's delivery context and consumed by the
// bridge task, but only ever used from one context at a time, and the release
// callback is required to be callable from any context (the driver frees
// pool buffers from both).
unsafe impl Send for RxFrameHandle {}
impl Drop for RxFrameHandle {
    fn drop(&mut self) {
        // SAFETY: Drop runs at most once, so this is the single release.
        unsafe { (self.release)(self.token) }
    }
}
