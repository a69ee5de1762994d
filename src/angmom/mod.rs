//! Angular momentum coupling numerics.

use factorial::Factorial;
use lazy_static::lazy_static;
use num::BigUint;
use num_traits::cast::ToPrimitive;

pub mod clebsch_gordan;

#[cfg(test)]
#[path = "angmom_tests.rs"]
mod angmom_tests;

/// The largest argument for which a factorial is tabulated.
pub const MAX_FACTORIAL: usize = 167;

lazy_static! {
    static ref FACTORIALS: Vec<f64> = (0..=MAX_FACTORIAL)
        .map(|n| {
            BigUint::from(n)
                .checked_factorial()
                .unwrap_or_else(|| panic!("Unable to compute the factorial of {n}."))
                .to_f64()
                .unwrap_or_else(|| panic!("Unable to convert {n}! to `f64`."))
        })
        .collect();
}

/// Looks up the factorial of an integer in the precomputed table.
///
/// The argument is signed because factorial arguments in the coupling formulae are differences
/// of doubled angular-momentum labels. A negative argument can only arise from an inconsistent
/// index table.
///
/// # Arguments
///
/// * `n` - The argument of the factorial.
///
/// # Returns
///
/// $`n!`$ as a floating-point number.
///
/// # Panics
///
/// Panics if `n` is negative or exceeds [`MAX_FACTORIAL`].
pub fn factorial(n: i32) -> f64 {
    let i = usize::try_from(n)
        .ok()
        .filter(|&i| i <= MAX_FACTORIAL)
        .unwrap_or_else(|| {
            panic!("Factorial argument {n} lies outside the tabulated range 0..={MAX_FACTORIAL}.")
        });
    FACTORIALS[i]
}

/// Computes the triangle coefficient
///
/// ```math
///     \Delta(j_1, j_2, j) = \sqrt{
///         \frac{(j_1 + j_2 - j)!\,(j_1 - j_2 + j)!\,(-j_1 + j_2 + j)!}{(j_1 + j_2 + j + 1)!}
///     }
/// ```
///
/// for halved labels.
///
/// # Arguments
///
/// * `j1` - Doubled first angular momentum.
/// * `j2` - Doubled second angular momentum.
/// * `j` - Doubled coupled angular momentum.
///
/// # Panics
///
/// Panics if the triple violates the triangle condition.
pub fn deltacg(j1: i32, j2: i32, j: i32) -> f64 {
    let sfaccg = factorial((j1 + j2 + j) / 2 + 1);
    (factorial((j1 + j2 - j) / 2) * factorial((j1 - j2 + j) / 2) * factorial((-j1 + j2 + j) / 2)
        / sfaccg)
        .sqrt()
}
