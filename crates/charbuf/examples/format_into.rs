//! Builds a small status line with one up-front reservation and no
//! intermediate allocations.

use core::fmt::Write as _;

use charbuf::{CharBuf, Exact};

fn main() {
    let mut line = CharBuf::<u8, Exact>::new();
    line.reserve(48);

    // SAFETY: 48 bytes reserved above; the content below fits.
    unsafe { line.append(b"job ") };

    let mut tail = line.borrow_tail();
    write!(tail, "#{} finished in {}ms", 17, 250).unwrap();
    tail.commit();

    println!("{}", line.as_bstr());
}
