#![no_main]

use arbitrary::Arbitrary;
use charbuf::{CharBuf, Doubling, Exact, GrowthPolicy};
use libfuzzer_sys::fuzz_target;

/// One step of a buffer workout script.
///
/// Every step clamps itself to the buffer's current spare capacity, so the
/// manual-capacity preconditions hold by construction and the harness
/// exercises the bookkeeping rather than undefined behavior.
#[derive(Arbitrary, Debug)]
enum Op {
    Reserve(u16),
    ReserveForOne,
    Append(Vec<u8>),
    Push(u8),
    SelfAppend,
    Truncate(u16),
    Clear,
    TailWrite { data: Vec<u8>, commit: bool },
    Terminate,
    Detach,
}

fuzz_target!(|ops: Vec<Op>| {
    run::<Doubling>(&ops);
    run::<Exact>(&ops);
});

fn run<P: GrowthPolicy>(ops: &[Op]) {
    let mut buf = CharBuf::<u8, P>::new();
    let mut model: Vec<u8> = Vec::new();

    for op in ops {
        match op {
            Op::Reserve(n) => {
                let n = usize::from(*n);
                buf.reserve(n);
                assert!(buf.capacity() >= n);
            }
            Op::ReserveForOne => {
                buf.reserve_for_one();
                assert!(buf.capacity() > model.len());
            }
            Op::Append(data) => {
                let fit = data.len().min(buf.capacity() - buf.len());
                // SAFETY: `fit` bytes of spare capacity exist.
                unsafe { buf.append(&data[..fit]) };
                model.extend_from_slice(&data[..fit]);
            }
            Op::Push(byte) => {
                if buf.len() < buf.capacity() {
                    // SAFETY: a free slot exists.
                    unsafe { buf.push(*byte) };
                    model.push(*byte);
                }
            }
            Op::SelfAppend => {
                let n = buf.len().min(buf.capacity() - buf.len());
                // SAFETY: `n` bytes fit; the aliasing source is supported.
                unsafe { buf.append_raw(buf.as_ptr(), n) };
                let prefix = model[..n].to_vec();
                model.extend_from_slice(&prefix);
            }
            Op::Truncate(k) => {
                let new_len = usize::from(*k) % (buf.len() + 1);
                // SAFETY: shrinking only.
                unsafe { buf.set_len(new_len) };
                model.truncate(new_len);
            }
            Op::Clear => {
                buf.clear();
                model.clear();
            }
            Op::TailWrite { data, commit } => {
                let mut tail = buf.borrow_tail();
                let fit = data.len().min(tail.remaining());
                for byte in &data[..fit] {
                    // SAFETY: `fit <= remaining()`.
                    unsafe { tail.write(*byte) };
                }
                if *commit {
                    tail.commit();
                    model.extend_from_slice(&data[..fit]);
                }
            }
            Op::Terminate => {
                let len = model.len();
                let terminated = buf.terminated();
                assert_eq!(&terminated[..len], model.as_slice());
                assert_eq!(terminated[len], 0);
            }
            Op::Detach => {
                let (ptr, len, cap) = buf.detach();
                assert_eq!(buf.capacity(), 0);
                // SAFETY: the triple was produced by `detach` just above.
                buf = unsafe { CharBuf::from_raw_parts(ptr, len, cap) };
            }
        }

        assert!(buf.len() <= buf.capacity());
        assert_eq!(buf.as_slice(), model.as_slice());
    }
}
