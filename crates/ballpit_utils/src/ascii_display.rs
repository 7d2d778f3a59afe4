use crate::{ok, trim_nul_padding};
use std::fmt::{self, Display};

/// Displays raw name fields pulled out of binary files, which are mostly ASCII but aren't
/// guaranteed to be. Non-printable bytes are shown as `\xNN`, and `\` as `\\`. Anything from the
/// first NUL onwards is treated as padding and not shown.
///
/// ## Example
/// ```
/// # use ballpit_utils::AsciiDisplay;
/// assert_eq!(AsciiDisplay(b"peg_blue\0\0").to_string(), "peg_blue");
/// assert_eq!(AsciiDisplay(b"a\xABb\\").to_string(), "a\\xABb\\\\");
/// ```
pub struct AsciiDisplay<'a>(pub &'a [u8]);

impl<'a> Display for AsciiDisplay<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &byte in trim_nul_padding(self.0) {
            match byte {
                b'\\' => write!(f, "\\\\")?,
                b' ' => write!(f, " ")?,
                byte if byte.is_ascii_graphic() => write!(f, "{}", byte as char)?,
                byte => write!(f, r"\x{byte:02X}")?,
            }
        }
        ok()
    }
}
