use approx;
use proptest::prelude::*;

use crate::angmom::clebsch_gordan::{cg, ClebschGordanTable};
use crate::indexing::{coupling_triples, SnapIndices};

#[test]
fn test_clebsch_gordan_spin_half() {
    let fsq2 = std::f64::consts::FRAC_1_SQRT_2;

    // Triplet.
    approx::assert_relative_eq!(cg(1, 1, 2, 1, 1), 1.0, epsilon = 1e-14, max_relative = 1e-14);
    approx::assert_relative_eq!(cg(1, 1, 2, 1, 0), fsq2, epsilon = 1e-14, max_relative = 1e-14);
    approx::assert_relative_eq!(cg(1, 1, 2, 0, 1), fsq2, epsilon = 1e-14, max_relative = 1e-14);
    approx::assert_relative_eq!(cg(1, 1, 2, 0, 0), 1.0, epsilon = 1e-14, max_relative = 1e-14);

    // Singlet.
    approx::assert_relative_eq!(cg(1, 1, 0, 1, 0), fsq2, epsilon = 1e-14, max_relative = 1e-14);
    approx::assert_relative_eq!(cg(1, 1, 0, 0, 1), -fsq2, epsilon = 1e-14, max_relative = 1e-14);

    // m = m1 + m2 outside the coupled multiplet.
    assert_eq!(cg(1, 1, 0, 1, 1), 0.0);
    assert_eq!(cg(1, 1, 0, 0, 0), 0.0);
}

#[test]
fn test_clebsch_gordan_one_one_zero() {
    // <1 m; 1 -m | 0 0> = (-1)^(1 - m) / sqrt(3)
    let f3 = 1.0 / 3.0f64.sqrt();
    approx::assert_relative_eq!(cg(2, 2, 0, 0, 2), f3, epsilon = 1e-14, max_relative = 1e-14);
    approx::assert_relative_eq!(cg(2, 2, 0, 1, 1), -f3, epsilon = 1e-14, max_relative = 1e-14);
    approx::assert_relative_eq!(cg(2, 2, 0, 2, 0), f3, epsilon = 1e-14, max_relative = 1e-14);
}

#[test]
fn test_clebsch_gordan_table_layout() {
    let idx = SnapIndices::new(4);
    let cgt = ClebschGordanTable::new(&idx);
    assert_eq!(cgt.len(), idx.idxcg_max());
    assert!(!cgt.is_empty());
    for (j1, j2, j) in coupling_triples(4) {
        let block = idx.idxcg_block(j1, j2, j);
        for m1 in 0..=j1 {
            for m2 in 0..=j2 {
                assert_eq!(cgt[block + m1 * (j2 + 1) + m2], cg(j1, j2, j, m1, m2));
            }
        }
    }
}

#[test]
fn test_clebsch_gordan_orthonormality() {
    // For fixed (j1, j2, j, m), the squares summed over m1 give unity.
    for (j1, j2, j) in coupling_triples(6) {
        for mc in 0..=j {
            let norm = (0..=j1)
                .filter_map(|m1| {
                    // 2 m1 - j1 + 2 m2 - j2 = 2 mc - j
                    let twice_m2 = (2 * mc + j1 + j2).checked_sub(j + 2 * m1)?;
                    (twice_m2 % 2 == 0 && twice_m2 / 2 <= j2).then(|| twice_m2 / 2)
                        .map(|m2| cg(j1, j2, j, m1, m2).powi(2))
                })
                .sum::<f64>();
            approx::assert_relative_eq!(norm, 1.0, epsilon = 1e-12, max_relative = 1e-12);
        }
    }
}

#[test]
fn test_clebsch_gordan_completeness() {
    // For fixed (j1, m1, j2, m2), the squares summed over all coupled j give unity.
    for j1 in 0usize..=5 {
        for j2 in 0usize..=5 {
            for m1 in 0..=j1 {
                for m2 in 0..=j2 {
                    let norm = (j1.abs_diff(j2)..=j1 + j2)
                        .step_by(2)
                        .map(|j| cg(j1, j2, j, m1, m2).powi(2))
                        .sum::<f64>();
                    approx::assert_relative_eq!(norm, 1.0, epsilon = 1e-12, max_relative = 1e-12);
                }
            }
        }
    }
}

#[test]
#[should_panic(expected = "is not an allowed coupling triple")]
fn test_clebsch_gordan_parity_forbidden() {
    cg(2, 2, 1, 0, 0);
}

proptest! {
    #[test]
    fn test_clebsch_gordan_reflection_and_exchange(
        j1 in 0usize..=9,
        j2 in 0usize..=9,
        k in 0usize..=9,
        m1 in 0usize..=9,
        m2 in 0usize..=9,
    ) {
        let j = j1.abs_diff(j2) + 2 * (k % (j1.min(j2) + 1));
        let m1 = m1 % (j1 + 1);
        let m2 = m2 % (j2 + 1);
        let sign = if ((j1 + j2 - j) / 2) % 2 == 0 { 1.0 } else { -1.0 };
        let c = cg(j1, j2, j, m1, m2);

        // Negating every projection.
        let c_reflected = cg(j1, j2, j, j1 - m1, j2 - m2);
        prop_assert!((c_reflected - sign * c).abs() < 1e-12);

        // Exchanging the two coupled momenta.
        let c_exchanged = cg(j2, j1, j, m2, m1);
        prop_assert!((c_exchanged - sign * c).abs() < 1e-12);
    }
}
