//! Checked [`core::fmt::Write`] adapters.
//!
//! Formatting never grows a buffer: each write is checked against the
//! remaining capacity and fails with [`fmt::Error`] when it does not fit,
//! keeping the manual-capacity contract intact. A formatting call that
//! produces its output in several fragments may have appended earlier
//! fragments before a later one fails; reserve enough room up front when
//! that matters.
//!
//! The [`Tail`] adapter is the zero-copy path: `write!` lands directly in
//! the spare capacity and nothing becomes content until the tail commits.

use core::fmt;
use core::ptr;

use crate::buf::{CharBuf, Tail};
use crate::growth::GrowthPolicy;

impl<P: GrowthPolicy> fmt::Write for CharBuf<u8, P> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.capacity() - self.len() < s.len() {
            return Err(fmt::Error);
        }
        // SAFETY: room for `s.len()` more bytes was just checked.
        unsafe { self.append(s.as_bytes()) };
        Ok(())
    }
}

impl<P: GrowthPolicy> fmt::Write for CharBuf<char, P> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.capacity() - self.len() < s.chars().count() {
            return Err(fmt::Error);
        }
        for c in s.chars() {
            // SAFETY: capacity for every char of `s` was checked above.
            unsafe { self.push(c) };
        }
        Ok(())
    }
}

impl<P: GrowthPolicy> fmt::Write for Tail<'_, u8, P> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.remaining() < s.len() {
            return Err(fmt::Error);
        }
        // SAFETY: the spare room was just checked, and `s` cannot alias the
        // exclusively borrowed buffer.
        unsafe {
            ptr::copy_nonoverlapping(s.as_ptr(), self.as_mut_ptr(), s.len());
            self.advance(s.len());
        }
        Ok(())
    }
}
