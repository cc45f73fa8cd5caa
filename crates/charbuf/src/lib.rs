//! Capacity-managed, append-only character buffers.
//!
//! The central type, [`CharBuf`], is a contiguous, exclusively-owned run of
//! fixed-width code units ([`Unit`]) with a *manual* capacity contract:
//! appends never allocate. The caller reserves capacity up front and the
//! buffer enforces the reservation with debug assertions rather than silent
//! growth, which keeps every append a branch-free pointer bump.
//!
//! Growth happens only through [`CharBuf::reserve`] (or its fallible twin
//! [`CharBuf::try_reserve`]) and is shaped by a compile-time
//! [`GrowthPolicy`]: [`Exact`] allocates precisely what was asked for,
//! [`Doubling`] rounds the storage size up to the next power of two.
//!
//! External code can format straight into unused capacity through the
//! borrowed-tail protocol: [`CharBuf::borrow_tail`] hands out a [`Tail`]
//! cursor over the spare room, and committing the cursor publishes whatever
//! was written as new buffer content.
//!
//! ```rust
//! use core::fmt::Write as _;
//!
//! use charbuf::CharBuf;
//!
//! let mut buf = CharBuf::<u8>::new();
//! buf.reserve(32);
//! // SAFETY: 32 units were reserved above; "status=" is 7 bytes.
//! unsafe { buf.append(b"status=") };
//!
//! let mut tail = buf.borrow_tail();
//! write!(tail, "{}", 200).unwrap();
//! tail.commit();
//!
//! assert_eq!(buf.as_slice(), b"status=200");
//! ```
#![no_std]
#![allow(missing_docs)]
extern crate alloc;

#[cfg(test)]
extern crate std;

mod buf;
mod error;
mod fmt;
mod growth;
mod unit;


pub use buf::{CharBuf, Tail};
pub use error::ReserveError;
pub use growth::{Doubling, Exact, GrowthPolicy};
pub use unit::Unit;
