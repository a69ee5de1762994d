use approx;

use crate::angmom::{deltacg, factorial, MAX_FACTORIAL};

#[test]
fn test_angmom_factorial() {
    assert_eq!(factorial(0), 1.0);
    assert_eq!(factorial(1), 1.0);
    assert_eq!(factorial(5), 120.0);
    assert_eq!(factorial(10), 3_628_800.0);
    approx::assert_relative_eq!(
        factorial(20),
        2_432_902_008_176_640_000.0,
        epsilon = 1e-14,
        max_relative = 1e-14
    );
    assert!(factorial(i32::try_from(MAX_FACTORIAL).unwrap()).is_finite());
}

#[test]
#[should_panic(expected = "lies outside the tabulated range")]
fn test_angmom_factorial_negative() {
    factorial(-1);
}

#[test]
#[should_panic(expected = "lies outside the tabulated range")]
fn test_angmom_factorial_too_large() {
    factorial(168);
}

#[test]
fn test_angmom_deltacg() {
    // Δ(0, 0, 0) = sqrt(0! 0! 0! / 1!)
    approx::assert_relative_eq!(deltacg(0, 0, 0), 1.0, epsilon = 1e-14, max_relative = 1e-14);

    // Δ(1/2, 1/2, 1) = sqrt(0! 1! 1! / 3!)
    approx::assert_relative_eq!(
        deltacg(1, 1, 2),
        (1.0f64 / 6.0).sqrt(),
        epsilon = 1e-14,
        max_relative = 1e-14
    );

    // Δ(1/2, 1/2, 0) = sqrt(1! 0! 0! / 2!)
    approx::assert_relative_eq!(
        deltacg(1, 1, 0),
        0.5f64.sqrt(),
        epsilon = 1e-14,
        max_relative = 1e-14
    );
}
