//! Orderings over decoded functions, for sorted address lookup.

use std::cmp::Ordering;

use crate::symbols::function::PdbFunction;

/// Orders functions by segment, then address.
///
/// Functions sharing an address compare equal; use [`by_address_and_token`] to break the tie.
///
/// # Examples
///
/// ```rust,no_run
/// use pdbscope::symbols::{ordering, PdbFunction};
///
/// fn sort(functions: &mut [PdbFunction]) {
///     functions.sort_by(ordering::by_address);
/// }
/// ```
#[must_use]
pub fn by_address(left: &PdbFunction, right: &PdbFunction) -> Ordering {
    (left.segment, left.address).cmp(&(right.segment, right.address))
}

/// Orders functions by segment, then address, then token.
#[must_use]
pub fn by_address_and_token(left: &PdbFunction, right: &PdbFunction) -> Ordering {
    by_address(left, right).then_with(|| left.token.cmp(&right.token))
}
