use core::alloc::Layout;

use thiserror::Error;

/// Why a [`try_reserve`](crate::CharBuf::try_reserve) call could not grow
/// the buffer.
///
/// The buffer is left untouched in either case.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveError {
    /// The requested capacity exceeds the maximum the buffer can address.
    #[error("requested capacity exceeds the maximum buffer size")]
    CapacityOverflow,

    /// The allocator refused the request.
    #[error("allocation of {} bytes failed", .layout.size())]
    AllocFailed {
        /// The layout the allocator rejected.
        layout: Layout,
    },
}
