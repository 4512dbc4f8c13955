//! Common utility functions.

use crate::error::{ Error, ErrorKind, Result };

/// Converts an `i8`, `i16`, `i32` or `i64` to a `usize` if the range and
/// the value permits. Constructs an error message based on `msg` otherwise.
/// ```
/// # extern crate quince;
/// #
/// # use std::i64;
/// # use quince::utils::int_to_usize_with_msg;
/// # use quince::error::{ ErrorExt, ErrorKind, Result };
/// #
/// # fn main() -> Result<()> {
/// #
/// let negative = int_to_usize_with_msg(-1_i32, "array size").unwrap_err();
/// assert_eq!(negative.kind(), ErrorKind::IntConversionUnderflow);
/// assert!(negative.to_string().contains("array size (-1) is negative"));
///
/// assert_eq!(int_to_usize_with_msg(7, "array size")?, 7);
///
/// let platform_dependent = int_to_usize_with_msg(i64::MAX, "array size");
/// if cfg!(target_pointer_width = "64") {
///     assert_eq!(platform_dependent?, i64::MAX as usize);
/// } else {
///     assert!(platform_dependent.is_err());
/// }
/// #
/// # Ok(())
/// # }
/// ```
#[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation, clippy::if_same_then_else)]
pub fn int_to_usize_with_msg<T: Into<i64>>(x: T, msg: &str) -> Result<usize> {
    use std::usize;
    use std::mem::size_of;

    let n: i64 = x.into();

    // If `usize` is at least as wide as `i64`, every non-negative `i64` fits.
    // Otherwise `usize::MAX` fits in an `i64`, so it can bound `n` directly.
    if n < 0 {
        Err(Error::new(
            ErrorKind::IntConversionUnderflow,
            format!("{} ({}) is negative", msg, n)
        ))
    } else if size_of::<usize>() >= size_of::<i64>() {
        Ok(n as usize)
    } else if n <= usize::MAX as i64 {
        Ok(n as usize)
    } else {
        Err(Error::new(
            ErrorKind::IntConversionOverflow,
            format!("{} ({}) overflows `usize`", msg, n)
        ))
    }
}
