use core::mem;

use rstest::rstest;

use super::CharBuf;
use crate::error::ReserveError;
use crate::growth::{Doubling, Exact};

// ─────────────────────────────────────────────────────────────────────
// Construction and the empty state
// ─────────────────────────────────────────────────────────────────────

#[test]
fn new_buffer_is_empty_and_unallocated() {
    let mut buf = CharBuf::<u8>::new();
    assert_eq!(buf.len(), 0);
    assert_eq!(buf.capacity(), 0);
    assert!(buf.is_empty());
    assert_eq!(buf.as_slice(), b"");
    assert_eq!(buf.terminated(), b"\0");
}

#[test]
fn with_capacity_zero_does_not_allocate() {
    let mut buf = CharBuf::<u8>::with_capacity(0);
    assert_eq!(buf.capacity(), 0);
    assert_eq!(buf.terminated(), b"\0");
}

#[test]
fn reserve_zero_on_fresh_buffer_is_a_no_op() {
    let mut buf = CharBuf::<u8>::new();
    buf.reserve(0);
    assert_eq!(buf.len(), 0);
    assert_eq!(buf.capacity(), 0);
}

// ─────────────────────────────────────────────────────────────────────
// Growth shapes
// ─────────────────────────────────────────────────────────────────────

#[rstest]
#[case(1, 1)]
#[case(4, 4)]
#[case(7, 7)]
#[case(100, 100)]
fn exact_reserve_allocates_precisely(#[case] n: usize, #[case] expected: usize) {
    let mut buf = CharBuf::<u8, Exact>::new();
    buf.reserve(n);
    assert_eq!(buf.capacity(), expected);
}

#[rstest]
#[case(1, 1)] // storage 2
#[case(4, 7)] // storage 5 rounds up to 8
#[case(7, 7)] // storage 8 is already a power of two
#[case(8, 15)] // storage 9 rounds up to 16
fn doubling_reserve_rounds_storage_up(#[case] n: usize, #[case] expected: usize) {
    let mut buf = CharBuf::<u8, Doubling>::new();
    buf.reserve(n);
    assert_eq!(buf.capacity(), expected);
    assert!((buf.capacity() + 1).is_power_of_two());
}

#[test]
fn reserve_within_capacity_keeps_the_allocation() {
    let mut buf = CharBuf::<u8, Doubling>::new();
    buf.reserve(4);
    let addr = buf.as_ptr();
    buf.reserve(4);
    buf.reserve(7);
    buf.reserve(1);
    assert_eq!(buf.as_ptr(), addr);
    assert_eq!(buf.capacity(), 7);
}

#[test]
fn growing_reserve_preserves_content() {
    let mut buf = CharBuf::<u8, Exact>::new();
    buf.reserve(2);
    // SAFETY: 2 bytes reserved.
    unsafe { buf.append(b"ab") };
    buf.reserve(64);
    assert_eq!(buf.capacity(), 64);
    assert_eq!(buf.as_slice(), b"ab");
}

#[test]
fn try_reserve_rejects_overflowing_requests() {
    let mut buf = CharBuf::<u8>::new();
    buf.reserve(4);
    // SAFETY: 4 bytes reserved.
    unsafe { buf.append(b"ab") };
    let addr = buf.as_ptr();

    let err = buf.try_reserve(usize::MAX).unwrap_err();
    assert_eq!(err, ReserveError::CapacityOverflow);

    // Failed growth leaves the buffer untouched.
    assert_eq!(buf.as_ptr(), addr);
    assert_eq!(buf.capacity(), 7);
    assert_eq!(buf.as_slice(), b"ab");
}

#[test]
fn max_capacity_reserves_the_terminator_slot() {
    assert_eq!(CharBuf::<u8>::MAX_CAPACITY, isize::MAX as usize - 1);
    assert_eq!(CharBuf::<char>::MAX_CAPACITY, isize::MAX as usize / 4 - 1);
}

// ─────────────────────────────────────────────────────────────────────
// Appends and views
// ─────────────────────────────────────────────────────────────────────

#[test]
fn append_within_reservation_never_reallocates() {
    let mut buf = CharBuf::<u8, Exact>::new();
    buf.reserve(4);
    let addr = buf.as_ptr();

    // SAFETY: cumulative appends stay within the 4 reserved bytes.
    unsafe { buf.append(b"ab") };
    assert_eq!(buf.len(), 2);
    assert_eq!(buf.terminated(), b"ab\0");

    // SAFETY: as above.
    unsafe { buf.append(b"cd") };
    assert_eq!(buf.len(), 4);
    assert_eq!(buf.terminated(), b"abcd\0");
    assert_eq!(buf.as_ptr(), addr);
}

#[test]
fn push_appends_single_units() {
    let mut buf = CharBuf::<u8>::new();
    buf.reserve(3);
    for b in *b"xyz" {
        // SAFETY: 3 bytes reserved, 3 pushed.
        unsafe { buf.push(b) };
    }
    assert_eq!(buf.as_slice(), b"xyz");
}

#[test]
fn append_tolerates_aliasing_the_buffer_itself() {
    let mut buf = CharBuf::<u8>::new();
    buf.reserve(8);
    // SAFETY: 8 bytes reserved.
    unsafe { buf.append(b"abcd") };
    // SAFETY: 4 more bytes fit; the source points into our own content,
    // which `append_raw` explicitly supports.
    unsafe { buf.append_raw(buf.as_ptr(), 4) };
    assert_eq!(buf.as_slice(), b"abcdabcd");
}

#[test]
fn terminated_is_idempotent() {
    let mut buf = CharBuf::<u8>::new();
    buf.reserve(2);
    // SAFETY: 2 bytes reserved.
    unsafe { buf.append(b"hi") };
    let first: alloc::vec::Vec<u8> = buf.terminated().to_vec();
    let second = buf.terminated().to_vec();
    assert_eq!(first, second);
    assert_eq!(buf.len(), 2);
}

#[test]
fn content_overwrites_a_previous_terminator() {
    let mut buf = CharBuf::<u8>::new();
    buf.reserve(4);
    // SAFETY: capacity checked by the reservations above.
    unsafe { buf.append(b"ab") };
    assert_eq!(buf.terminated(), b"ab\0");
    // SAFETY: as above.
    unsafe { buf.append(b"cd") };
    assert_eq!(buf.terminated(), b"abcd\0");
}

#[test]
fn as_bstr_views_bytes() {
    let mut buf = CharBuf::<u8>::new();
    buf.reserve(5);
    // SAFETY: 5 bytes reserved.
    unsafe { buf.append(b"hello") };
    assert_eq!(buf.as_bstr(), "hello");
}

// ─────────────────────────────────────────────────────────────────────
// Length management
// ─────────────────────────────────────────────────────────────────────

#[test]
fn set_len_commits_and_truncates() {
    let mut buf = CharBuf::<u8>::new();
    buf.reserve(4);
    // SAFETY: 4 bytes reserved.
    unsafe { buf.append(b"abcd") };
    // SAFETY: 2 <= capacity and the first 2 bytes are initialized.
    unsafe { buf.set_len(2) };
    assert_eq!(buf.as_slice(), b"ab");
    // SAFETY: 4 <= capacity and all 4 bytes were written above.
    unsafe { buf.set_len(4) };
    assert_eq!(buf.as_slice(), b"abcd");
}

#[test]
fn clear_retains_capacity_and_storage() {
    let mut buf = CharBuf::<u8>::new();
    buf.reserve(4);
    // SAFETY: 4 bytes reserved.
    unsafe { buf.append(b"abcd") };
    let addr = buf.as_ptr();
    buf.clear();
    assert_eq!(buf.len(), 0);
    assert_eq!(buf.capacity(), 7);
    assert_eq!(buf.as_ptr(), addr);
    // The retained storage is immediately writable again.
    // SAFETY: capacity survived the clear.
    unsafe { buf.append(b"ef") };
    assert_eq!(buf.as_slice(), b"ef");
}

#[test]
fn reserve_for_one_from_empty_and_when_full() {
    let mut buf = CharBuf::<u8, Doubling>::new();
    buf.reserve_for_one();
    assert_eq!(buf.capacity(), 1);
    // SAFETY: one slot guaranteed by `reserve_for_one`.
    unsafe { buf.push(b'a') };

    // Full again: capacity 1, length 1. The next call doubles the storage.
    buf.reserve_for_one();
    assert_eq!(buf.capacity(), 3);

    let mut exact = CharBuf::<u8, Exact>::with_capacity(2);
    // SAFETY: 2 bytes reserved.
    unsafe { exact.append(b"ab") };
    exact.reserve_for_one();
    assert_eq!(exact.capacity(), 3);
}

// ─────────────────────────────────────────────────────────────────────
// Ownership transfer
// ─────────────────────────────────────────────────────────────────────

#[test]
fn take_leaves_the_default_state_behind() {
    let mut buf = CharBuf::<u8>::new();
    buf.reserve(4);
    // SAFETY: 4 bytes reserved.
    unsafe { buf.append(b"abcd") };

    let moved = mem::take(&mut buf);
    assert_eq!(moved.as_slice(), b"abcd");
    assert_eq!(buf.len(), 0);
    assert_eq!(buf.capacity(), 0);
}

#[test]
fn detach_round_trips_through_raw_parts() {
    let mut buf = CharBuf::<u8>::new();
    buf.reserve(4);
    // SAFETY: 4 bytes reserved.
    unsafe { buf.append(b"abcd") };
    let content_addr = buf.as_ptr();

    let (ptr, len, cap) = buf.detach();
    assert_eq!(buf.capacity(), 0, "detach resets the buffer");
    assert_eq!(ptr.cast_const(), content_addr);
    assert_eq!((len, cap), (4, 7));

    // SAFETY: the triple came from `detach` above and is reclaimed once.
    let restored = unsafe { CharBuf::<u8>::from_raw_parts(ptr, len, cap) };
    assert_eq!(restored.as_slice(), b"abcd");
    assert_eq!(restored.capacity(), 7);
}

#[test]
fn raw_parts_round_trip_of_unallocated_buffer() {
    let (ptr, len, cap) = CharBuf::<u16>::new().into_raw_parts();
    assert_eq!((len, cap), (0, 0));
    // SAFETY: the triple came from `into_raw_parts` above.
    let buf = unsafe { CharBuf::<u16>::from_raw_parts(ptr, len, cap) };
    assert_eq!(buf.len(), 0);
    assert_eq!(buf.capacity(), 0);
}

// ─────────────────────────────────────────────────────────────────────
// Borrowed tail
// ─────────────────────────────────────────────────────────────────────

#[test]
fn tail_round_trip_commits_written_units() {
    let mut buf = CharBuf::<u8>::new();
    buf.reserve(8);
    // SAFETY: 8 bytes reserved.
    unsafe { buf.append(b"ab") };

    let mut tail = buf.borrow_tail();
    assert_eq!(tail.remaining(), 13); // doubling: capacity 15, length 2
    for b in *b"cde" {
        // SAFETY: 13 slots remain, 3 written.
        unsafe { tail.write(b) };
    }
    assert_eq!(tail.written(), 3);
    tail.commit();

    assert_eq!(buf.len(), 5);
    assert_eq!(buf.as_slice(), b"abcde");
}

#[test]
fn dropped_tail_discards_its_writes() {
    let mut buf = CharBuf::<u8>::new();
    buf.reserve(4);
    // SAFETY: 4 bytes reserved.
    unsafe { buf.append(b"ab") };

    let mut tail = buf.borrow_tail();
    // SAFETY: spare room remains.
    unsafe { tail.write(b'x') };
    drop(tail);

    assert_eq!(buf.len(), 2);
    assert_eq!(buf.as_slice(), b"ab");
}

#[test]
fn tail_spare_slots_commit_via_advance() {
    let mut buf = CharBuf::<u8>::new();
    buf.reserve(4);

    let mut tail = buf.borrow_tail();
    let spare = tail.spare_mut();
    spare[0].write(b'4');
    spare[1].write(b'2');
    // SAFETY: the two slots were just initialized.
    unsafe { tail.advance(2) };
    tail.commit();

    assert_eq!(buf.as_slice(), b"42");
}

#[test]
fn tail_of_unallocated_buffer_has_no_room() {
    let mut buf = CharBuf::<u8>::new();
    let mut tail = buf.borrow_tail();
    assert_eq!(tail.remaining(), 0);
    assert!(tail.spare_mut().is_empty());
    tail.commit();
    assert_eq!(buf.len(), 0);
}

// ─────────────────────────────────────────────────────────────────────
// Other unit types
// ─────────────────────────────────────────────────────────────────────

#[test]
fn utf16_units_terminate_with_zero() {
    let mut buf = CharBuf::<u16>::new();
    buf.reserve(2);
    // SAFETY: 2 units reserved.
    unsafe { buf.append(&[0x0068, 0x0069]) };
    assert_eq!(buf.terminated(), &[0x0068, 0x0069, 0x0000]);
}

#[test]
fn char_units_terminate_with_nul() {
    let mut buf = CharBuf::<char>::new();
    buf.reserve(2);
    // SAFETY: 2 units reserved.
    unsafe { buf.append(&['o', 'k']) };
    assert_eq!(buf.as_slice(), &['o', 'k']);
    assert_eq!(buf.terminated(), &['o', 'k', '\0']);
}

#[test]
fn content_equality_ignores_capacity() {
    let mut a = CharBuf::<u8>::with_capacity(2);
    let mut b = CharBuf::<u8>::with_capacity(100);
    // SAFETY: both reservations cover two bytes.
    unsafe {
        a.append(b"ok");
        b.append(b"ok");
    }
    assert_eq!(a, b);
    assert_eq!(a, *b"ok");
}
