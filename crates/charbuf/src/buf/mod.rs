//! The core buffer: an exclusively-owned, contiguous run of code units with
//! caller-driven capacity management.
//!
//! Layout
//! - `buf` points at the start of the allocation (dangling while nothing is
//!   allocated), `end` at one past the last written unit, and `cap` counts
//!   the usable slots. The physical allocation always holds `cap + 1` units:
//!   the extra slot is the terminator slot, filled lazily by
//!   [`CharBuf::terminated`] and never counted in `cap` or the length.
//! - The length is derived from the `buf..end` span rather than stored, so
//!   it cannot drift out of sync with the storage.
//!
//! Capacity contract
//! - Appends never allocate. Every append-shaped operation carries a
//!   capacity precondition that is asserted in debug builds and undefined
//!   behavior to violate in release builds; growth happens only through
//!   [`CharBuf::reserve`], [`CharBuf::try_reserve`], or
//!   [`CharBuf::reserve_for_one`].
//! - Reallocation follows the strong guarantee: the new block is allocated
//!   and filled before the old one is released, so a failed `try_reserve`
//!   leaves the buffer untouched.

use alloc::alloc::{alloc, dealloc, handle_alloc_error};
use core::alloc::Layout;
use core::marker::PhantomData;
use core::mem::{ManuallyDrop, MaybeUninit};
use core::ptr::{self, NonNull};
use core::{fmt, mem, slice};

use bstr::{BStr, ByteSlice};

use crate::error::ReserveError;
use crate::growth::{Doubling, GrowthPolicy};
use crate::unit::Unit;

#[cfg(test)]
mod tests;

/// A capacity-managed, append-only buffer of code units.
///
/// Unlike `Vec`, the buffer never grows behind the caller's back: capacity
/// is reserved explicitly and appends assert (in debug builds) that the
/// reservation suffices. This keeps appends branch-free and makes every
/// allocation visible at the call site.
///
/// The growth policy `P` is fixed at the type level: [`Doubling`] (the
/// default) rounds storage up to the next power of two, [`crate::Exact`]
/// allocates precisely what is requested.
///
/// The buffer owns its storage exclusively. It cannot be cloned, only
/// moved; `mem::take` leaves the default (empty, unallocated) state behind.
pub struct CharBuf<U: Unit, P: GrowthPolicy = Doubling> {
    /// Start of the allocation; dangling while `cap == 0`.
    buf: NonNull<U>,
    /// One past the last written unit. Equals `buf` when empty.
    end: *mut U,
    /// Usable slots, excluding the terminator slot.
    cap: usize,
    _policy: PhantomData<P>,
}

impl<U: Unit, P: GrowthPolicy> CharBuf<U, P> {
    /// The largest capacity any buffer of this unit type can reach: the
    /// element count whose one-past-the-end offset still fits `isize`,
    /// minus the terminator slot.
    pub const MAX_CAPACITY: usize = isize::MAX as usize / size_of::<U>() - 1;

    /// Largest physical allocation size, in units.
    const MAX_STORAGE: usize = Self::MAX_CAPACITY + 1;

    /// Creates an empty buffer without allocating.
    #[must_use]
    pub const fn new() -> Self {
        const { assert!(size_of::<U>() != 0, "zero-sized units are not supported") };
        let buf = NonNull::dangling();
        Self {
            buf,
            end: buf.as_ptr(),
            cap: 0,
            _policy: PhantomData,
        }
    }

    /// Creates a buffer with room for at least `n` units, sized by the
    /// growth policy. `n == 0` allocates nothing.
    ///
    /// # Panics
    ///
    /// Diverges fatally if the allocation fails or `n` exceeds
    /// [`Self::MAX_CAPACITY`], like [`CharBuf::reserve`].
    #[must_use]
    pub fn with_capacity(n: usize) -> Self {
        let mut buf = Self::new();
        buf.reserve(n);
        buf
    }

    /// Number of units written so far.
    #[inline]
    pub fn len(&self) -> usize {
        (self.end.addr() - self.buf.as_ptr().addr()) / size_of::<U>()
    }

    /// Whether no units have been written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Usable capacity in units. The terminator slot is not counted.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Ensures `capacity() >= n`, reallocating per the growth policy if
    /// needed. No-op when the capacity already suffices.
    ///
    /// # Panics
    ///
    /// Calls the global allocation-error hook if the allocator refuses the
    /// request, and panics if `n` exceeds [`Self::MAX_CAPACITY`]. In both
    /// cases the buffer remains valid and unmodified up to the point of the
    /// failed call.
    pub fn reserve(&mut self, n: usize) {
        if let Err(err) = self.try_reserve(n) {
            grow_failed(err);
        }
    }

    /// Fallible [`reserve`](Self::reserve): reports failure instead of
    /// diverging, leaving the buffer untouched.
    ///
    /// # Errors
    ///
    /// [`ReserveError::CapacityOverflow`] when `n` exceeds
    /// [`Self::MAX_CAPACITY`], [`ReserveError::AllocFailed`] when the
    /// allocator refuses the computed storage size.
    pub fn try_reserve(&mut self, n: usize) -> Result<(), ReserveError> {
        if n <= self.cap {
            return Ok(());
        }
        if n > Self::MAX_CAPACITY {
            return Err(ReserveError::CapacityOverflow);
        }
        self.grow(P::next_storage_size(
            self.storage_size(),
            n + 1,
            Self::MAX_STORAGE,
        ))
    }

    /// Ensures there is room for at least one more unit past the current
    /// length, sized off the current capacity rather than a caller target.
    ///
    /// Under [`Doubling`] a full buffer doubles its storage; under `Exact`
    /// it grows by a single slot. Same fatal contract as
    /// [`reserve`](Self::reserve).
    pub fn reserve_for_one(&mut self) {
        if self.len() == self.cap {
            self.reserve(self.cap + 1);
        }
    }

    /// Appends `n` units read from `src`.
    ///
    /// `src` may point into this buffer's own content (for example a view
    /// previously handed out by [`terminated`](Self::terminated)); the copy
    /// is overlap-safe.
    ///
    /// # Safety
    ///
    /// - `len() + n <= capacity()` must hold; the buffer never grows here.
    /// - `src` must be valid for reads of `n` units.
    pub unsafe fn append_raw(&mut self, src: *const U, n: usize) {
        debug_assert!(n <= self.cap - self.len());
        // SAFETY: the capacity precondition puts `end + n` inside the
        // allocation; `ptr::copy` tolerates `src` overlapping our storage.
        unsafe {
            ptr::copy(src, self.end, n);
            self.end = self.end.add(n);
        }
    }

    /// Appends a slice of units.
    ///
    /// # Safety
    ///
    /// `len() + src.len() <= capacity()` must hold.
    #[inline]
    pub unsafe fn append(&mut self, src: &[U]) {
        // SAFETY: same precondition; a borrowed slice cannot alias the
        // exclusively borrowed storage.
        unsafe { self.append_raw(src.as_ptr(), src.len()) }
    }

    /// Appends a single unit.
    ///
    /// # Safety
    ///
    /// `len() < capacity()` must hold.
    #[inline]
    pub unsafe fn push(&mut self, unit: U) {
        debug_assert!(self.len() < self.cap);
        // SAFETY: `end` is a free slot per the precondition.
        unsafe {
            ptr::write(self.end, unit);
            self.end = self.end.add(1);
        }
    }

    /// The written content, without touching the terminator slot.
    #[inline]
    pub fn as_slice(&self) -> &[U] {
        // SAFETY: `buf..end` is initialized content; while unallocated both
        // pointers coincide at an aligned dangling address and the length
        // is zero, which `from_raw_parts` permits.
        unsafe { slice::from_raw_parts(self.buf.as_ptr(), self.len()) }
    }

    /// The content followed by a terminator, written into the reserved
    /// slot at the moment of the call.
    ///
    /// Idempotent: repeated calls without intervening mutation return
    /// identical bytes and never change [`len`](Self::len). A buffer that
    /// has never allocated yields a terminator-only sentinel without
    /// allocating.
    pub fn terminated(&mut self) -> &[U] {
        if self.cap == 0 {
            return U::NUL_SLICE;
        }
        // SAFETY: the allocation holds `cap + 1` units, so the slot at
        // `end` (index `len <= cap`) is always in bounds.
        unsafe {
            ptr::write(self.end, U::NUL);
            slice::from_raw_parts(self.buf.as_ptr(), self.len() + 1)
        }
    }

    /// Pointer to the start of the content. Stable across appends that stay
    /// within the reserved capacity.
    #[inline]
    pub fn as_ptr(&self) -> *const U {
        self.buf.as_ptr()
    }

    /// Sets the length directly, committing units written out of band into
    /// reserved capacity.
    ///
    /// # Safety
    ///
    /// - `new_len <= capacity()` must hold.
    /// - The first `new_len` units must be initialized.
    pub unsafe fn set_len(&mut self, new_len: usize) {
        debug_assert!(new_len <= self.cap);
        // SAFETY: in bounds of the allocation per the precondition.
        self.end = unsafe { self.buf.as_ptr().add(new_len) };
    }

    /// Resets the length to zero. Capacity and storage are retained.
    #[inline]
    pub fn clear(&mut self) {
        self.end = self.buf.as_ptr();
    }

    /// Grants a write cursor over the unused capacity past the content.
    ///
    /// The buffer is mutably borrowed for the cursor's lifetime, so no
    /// other operation can interleave with the borrowed writes. Call
    /// [`Tail::commit`] to publish them; dropping the cursor discards them.
    pub fn borrow_tail(&mut self) -> Tail<'_, U, P> {
        Tail::new(self)
    }

    /// Surrenders ownership of the raw storage and resets the buffer to
    /// the empty, unallocated state.
    ///
    /// Returns `(ptr, len, capacity)`. The pointer is only meaningful when
    /// `capacity > 0`; pass the triple to
    /// [`from_raw_parts`](Self::from_raw_parts) to reclaim ownership, or
    /// release it manually with the layout for `capacity + 1` units.
    pub fn detach(&mut self) -> (*mut U, usize, usize) {
        mem::take(self).into_raw_parts()
    }

    /// Consuming form of [`detach`](Self::detach).
    #[must_use]
    pub fn into_raw_parts(self) -> (*mut U, usize, usize) {
        let this = ManuallyDrop::new(self);
        (this.buf.as_ptr(), this.len(), this.cap)
    }

    /// Reassembles a buffer from a triple produced by
    /// [`detach`](Self::detach) or [`into_raw_parts`](Self::into_raw_parts).
    ///
    /// # Safety
    ///
    /// The triple must have come from a buffer of the same unit type and
    /// growth policy, and ownership of the storage must not have been
    /// reclaimed elsewhere in the meantime.
    pub unsafe fn from_raw_parts(ptr: *mut U, len: usize, capacity: usize) -> Self {
        debug_assert!(len <= capacity);
        Self {
            // SAFETY: the source buffer held a non-null (possibly dangling)
            // pointer here.
            buf: unsafe { NonNull::new_unchecked(ptr) },
            // SAFETY: `len` slots past `ptr` are inside the allocation.
            end: unsafe { ptr.add(len) },
            cap: capacity,
            _policy: PhantomData,
        }
    }

    /// Physical allocation size in units, `0` while unallocated.
    fn storage_size(&self) -> usize {
        if self.cap == 0 { 0 } else { self.cap + 1 }
    }

    /// Reallocates to exactly `new_storage` units and migrates the content.
    ///
    /// The old block is released only after the content has been copied
    /// into the new one, so any failure leaves the buffer fully intact.
    fn grow(&mut self, new_storage: usize) -> Result<(), ReserveError> {
        debug_assert!(new_storage > self.storage_size());
        debug_assert!(new_storage <= Self::MAX_STORAGE);

        let layout = Self::storage_layout(new_storage);
        // SAFETY: `layout` has non-zero size (`new_storage >= 1` and units
        // are never zero-sized).
        let Some(new_buf) = NonNull::new(unsafe { alloc(layout) }.cast::<U>()) else {
            return Err(ReserveError::AllocFailed { layout });
        };

        let len = self.len();
        // SAFETY: the fresh block holds at least `len` units and cannot
        // overlap the old one.
        unsafe { ptr::copy_nonoverlapping(self.buf.as_ptr(), new_buf.as_ptr(), len) };

        self.release();
        self.buf = new_buf;
        // SAFETY: `len < new_storage`.
        self.end = unsafe { new_buf.as_ptr().add(len) };
        self.cap = new_storage - 1;
        Ok(())
    }

    /// Releases the current allocation, if any. Leaves the pointer fields
    /// stale; callers overwrite them or are in `drop`.
    fn release(&mut self) {
        if self.cap != 0 {
            // SAFETY: the block was allocated with exactly this layout.
            unsafe { dealloc(self.buf.as_ptr().cast(), Self::storage_layout(self.cap + 1)) };
        }
    }

    /// Layout for `storage` units.
    fn storage_layout(storage: usize) -> Layout {
        match Layout::array::<U>(storage) {
            Ok(layout) => layout,
            // `storage` never exceeds `MAX_STORAGE`, whose byte size fits
            // `isize`.
            Err(_) => unreachable!(),
        }
    }
}

impl<P: GrowthPolicy> CharBuf<u8, P> {
    /// Byte-string view of the content, for human-readable diagnostics.
    #[inline]
    pub fn as_bstr(&self) -> &BStr {
        self.as_slice().as_bstr()
    }
}

#[cold]
fn grow_failed(err: ReserveError) -> ! {
    match err {
        ReserveError::CapacityOverflow => {
            panic!("requested capacity exceeds the maximum buffer size")
        }
        ReserveError::AllocFailed { layout } => handle_alloc_error(layout),
    }
}

impl<U: Unit, P: GrowthPolicy> Default for CharBuf<U, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U: Unit, P: GrowthPolicy> Drop for CharBuf<U, P> {
    fn drop(&mut self) {
        self.release();
    }
}

// Ownership is exclusive, so crossing threads is as sound as for `Vec`.
unsafe impl<U: Unit + Send, P: GrowthPolicy> Send for CharBuf<U, P> {}
unsafe impl<U: Unit + Sync, P: GrowthPolicy> Sync for CharBuf<U, P> {}

impl<U: Unit + fmt::Debug, P: GrowthPolicy> fmt::Debug for CharBuf<U, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CharBuf")
            .field("len", &self.len())
            .field("capacity", &self.cap)
            .field("content", &self.as_slice())
            .finish()
    }
}

impl<U: Unit + PartialEq, P: GrowthPolicy> PartialEq for CharBuf<U, P> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<U: Unit + Eq, P: GrowthPolicy> Eq for CharBuf<U, P> {}

impl<U: Unit + PartialEq, P: GrowthPolicy> PartialEq<[U]> for CharBuf<U, P> {
    fn eq(&self, other: &[U]) -> bool {
        self.as_slice() == other
    }
}

impl<U: Unit + PartialEq, P: GrowthPolicy, const N: usize> PartialEq<[U; N]> for CharBuf<U, P> {
    fn eq(&self, other: &[U; N]) -> bool {
        self.as_slice() == other
    }
}

/// A write cursor over a buffer's unused capacity.
///
/// Obtained from [`CharBuf::borrow_tail`]. Writes land directly in the
/// buffer's storage between its current length and its capacity, without
/// the buffer observing them until [`commit`](Tail::commit) publishes the
/// final cursor position as the new length. Dropping the cursor instead
/// discards everything written through it.
///
/// The cursor holds the buffer's unique borrow, so the single-use
/// discipline (no other mutation while a tail is outstanding) is enforced
/// by the borrow checker.
pub struct Tail<'a, U: Unit, P: GrowthPolicy> {
    buf: &'a mut CharBuf<U, P>,
    pos: *mut U,
}

impl<'a, U: Unit, P: GrowthPolicy> Tail<'a, U, P> {
    fn new(buf: &'a mut CharBuf<U, P>) -> Self {
        let pos = buf.end;
        Self { buf, pos }
    }

    /// Units written through this cursor so far.
    #[inline]
    pub fn written(&self) -> usize {
        (self.pos.addr() - self.buf.end.addr()) / size_of::<U>()
    }

    /// Free slots left between the cursor and the capacity boundary.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.cap - self.buf.len() - self.written()
    }

    /// The current cursor position, for external routines that write raw
    /// units. Report how far they advanced with [`advance`](Self::advance).
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut U {
        self.pos
    }

    /// The spare room ahead of the cursor as uninitialized slots.
    pub fn spare_mut(&mut self) -> &mut [MaybeUninit<U>] {
        // SAFETY: `pos..pos + remaining()` lies inside the allocation, past
        // the content, and is aliased by nothing else while the buffer is
        // exclusively borrowed here. Zero-length while unallocated.
        unsafe { slice::from_raw_parts_mut(self.pos.cast::<MaybeUninit<U>>(), self.remaining()) }
    }

    /// Advances the cursor over `n` units already written through
    /// [`as_mut_ptr`](Self::as_mut_ptr) or [`spare_mut`](Self::spare_mut).
    ///
    /// # Safety
    ///
    /// - `n <= remaining()` must hold.
    /// - The `n` units ahead of the cursor must be initialized.
    pub unsafe fn advance(&mut self, n: usize) {
        debug_assert!(n <= self.remaining());
        // SAFETY: stays within the allocation per the precondition.
        self.pos = unsafe { self.pos.add(n) };
    }

    /// Writes one unit and advances the cursor.
    ///
    /// # Safety
    ///
    /// `remaining() > 0` must hold.
    pub unsafe fn write(&mut self, unit: U) {
        debug_assert!(self.remaining() > 0);
        // SAFETY: the cursor points at a free slot per the precondition.
        unsafe {
            ptr::write(self.pos, unit);
            self.pos = self.pos.add(1);
        }
    }

    /// Commits the cursor position as the buffer's new length.
    pub fn commit(self) {
        // `pos` cannot have passed the capacity boundary: `advance` and
        // `write` assert it, and `spare_mut` is bounded.
        self.buf.end = self.pos;
    }
}

#[cfg(feature = "serde")]
mod serde_impls {
    use core::marker::PhantomData;

    use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

    use super::CharBuf;
    use crate::{GrowthPolicy, Unit};

    impl<U, P> Serialize for CharBuf<U, P>
    where
        U: Unit + Serialize,
        P: GrowthPolicy,
    {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_seq(self.as_slice())
        }
    }

    impl<'de, U, P> Deserialize<'de> for CharBuf<U, P>
    where
        U: Unit + Deserialize<'de>,
        P: GrowthPolicy,
    {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            struct SeqVisitor<U, P>(PhantomData<(U, P)>);

            impl<'de, U, P> de::Visitor<'de> for SeqVisitor<U, P>
            where
                U: Unit + Deserialize<'de>,
                P: GrowthPolicy,
            {
                type Value = CharBuf<U, P>;

                fn expecting(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                    f.write_str("a sequence of code units")
                }

                fn visit_seq<A: de::SeqAccess<'de>>(
                    self,
                    mut seq: A,
                ) -> Result<Self::Value, A::Error> {
                    let mut buf = CharBuf::<U, P>::new();
                    // The hint is untrusted input; cap the preallocation.
                    if let Some(n) = seq.size_hint() {
                        buf.reserve(n.min(4096));
                    }
                    while let Some(unit) = seq.next_element::<U>()? {
                        buf.reserve_for_one();
                        // SAFETY: `reserve_for_one` guaranteed a free slot.
                        unsafe { buf.push(unit) };
                    }
                    Ok(buf)
                }
            }

            deserializer.deserialize_seq(SeqVisitor(PhantomData))
        }
    }
}
