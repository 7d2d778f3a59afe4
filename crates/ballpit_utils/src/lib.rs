//! Various utilities shared by the Ballpit crates

pub mod cursor;
pub use cursor::{ByteCursor, OutOfRange, Primitive};

mod ascii_display;
pub use ascii_display::*;

pub type AnyResult<T = (), E = anyhow::Error> = anyhow::Result<T, E>;

/// Shorthand for `Ok(())`, cause it looks ugly
pub const fn ok<E>() -> Result<(), E> {
    Ok(())
}

/// Cuts a fixed-size, zero padded byte field at its first NUL. Fields without any NUL are
/// returned whole.
///
/// ```
/// use ballpit_utils::trim_nul_padding;
/// assert_eq!(trim_nul_padding(b"peg\0\0\0"), b"peg");
/// assert_eq!(trim_nul_padding(b"full"), b"full");
/// ```
pub fn trim_nul_padding(field: &[u8]) -> &[u8] {
    match field.iter().position(|&byte| byte == 0) {
        Some(end) => &field[..end],
        None => field,
    }
}
