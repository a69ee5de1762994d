//! Clebsch--Gordan coefficients for the SNAP coupling blocks.

use std::ops::Index;

use crate::angmom::{deltacg, factorial};
use crate::indexing::{coupling_triples, SnapIndices};

#[cfg(test)]
#[path = "clebsch_gordan_tests.rs"]
mod clebsch_gordan_tests;

/// Computes a single Clebsch--Gordan coefficient
/// $`\langle j_1 m_1; j_2 m_2 \mid j m \rangle`$ with doubled labels.
///
/// The projections are given as offsets from the lowest projection, *i.e.* `m1` in `0..=j1`
/// stands for the doubled projection `2 m1 - j1`. The coupled projection follows from the other
/// two; if it falls outside `0..=j` the coefficient is exactly zero.
///
/// # Arguments
///
/// * `j1` - Doubled first angular momentum.
/// * `j2` - Doubled second angular momentum.
/// * `j` - Doubled coupled angular momentum.
/// * `m1` - Offset of the first projection.
/// * `m2` - Offset of the second projection.
///
/// # Returns
///
/// The Clebsch--Gordan coefficient.
///
/// # Panics
///
/// Panics if `(j1, j2, j)` does not satisfy the triangle and parity conditions.
pub fn cg(j1: usize, j2: usize, j: usize, m1: usize, m2: usize) -> f64 {
    let (j1, j2, j, m1, m2) = (
        to_i32(j1),
        to_i32(j2),
        to_i32(j),
        to_i32(m1),
        to_i32(m2),
    );
    assert!(
        (j1 - j2).abs() <= j && j <= j1 + j2 && (j1 + j2 + j) % 2 == 0,
        "({j1}, {j2}, {j}) is not an allowed coupling triple."
    );

    let aa2 = 2 * m1 - j1;
    let bb2 = 2 * m2 - j2;
    let m = (aa2 + bb2 + j) / 2;
    if m < 0 || m > j {
        return 0.0;
    }

    let zmin = 0_i32.max((-(j - j2 + aa2) / 2).max(-(j - j1 - bb2) / 2));
    let zmax = ((j1 + j2 - j) / 2).min(((j1 - aa2) / 2).min((j2 + bb2) / 2));
    let sum = (zmin..=zmax)
        .map(|z| {
            let ifac = if z % 2 == 0 { 1.0 } else { -1.0 };
            ifac / (factorial(z)
                * factorial((j1 + j2 - j) / 2 - z)
                * factorial((j1 - aa2) / 2 - z)
                * factorial((j2 + bb2) / 2 - z)
                * factorial((j - j2 + aa2) / 2 + z)
                * factorial((j - j1 - bb2) / 2 + z))
        })
        .sum::<f64>();

    let cc2 = 2 * m - j;
    let dcg = deltacg(j1, j2, j);
    let sfaccg = (factorial((j1 + aa2) / 2)
        * factorial((j1 - aa2) / 2)
        * factorial((j2 + bb2) / 2)
        * factorial((j2 - bb2) / 2)
        * factorial((j + cc2) / 2)
        * factorial((j - cc2) / 2)
        * f64::from(j + 1))
    .sqrt();

    sum * dcg * sfaccg
}

fn to_i32(x: usize) -> i32 {
    i32::try_from(x).unwrap_or_else(|_| panic!("Angular momentum label {x} is too large."))
}

/// A structure holding the Clebsch--Gordan coefficients of every coupling triple of a given
/// bandwidth, laid out in one flat array.
///
/// The block of the triple $`(j_1, j_2, j)`$ starts at `idxcg_block(j1, j2, j)` and holds
/// $`(j_1 + 1)(j_2 + 1)`$ coefficients in row-major order over $`(m_1, m_2)`$.
#[derive(Clone, Debug)]
pub struct ClebschGordanTable {
    cglist: Vec<f64>,
}

impl ClebschGordanTable {
    /// Tabulates all coefficients needed for the bandwidth of an index table.
    ///
    /// # Arguments
    ///
    /// * `indices` - The index tables fixing the layout.
    ///
    /// # Returns
    ///
    /// The coefficient table.
    #[must_use]
    pub fn new(indices: &SnapIndices) -> Self {
        let mut cglist = Vec::with_capacity(indices.idxcg_max());
        for (j1, j2, j) in coupling_triples(indices.twojmax()) {
            assert_eq!(cglist.len(), indices.idxcg_block(j1, j2, j));
            for m1 in 0..=j1 {
                for m2 in 0..=j2 {
                    cglist.push(cg(j1, j2, j, m1, m2));
                }
            }
        }
        assert_eq!(cglist.len(), indices.idxcg_max());
        Self { cglist }
    }

    /// The flat coefficient array.
    pub fn as_slice(&self) -> &[f64] {
        &self.cglist
    }

    /// The number of tabulated coefficients.
    pub fn len(&self) -> usize {
        self.cglist.len()
    }

    /// Whether the table holds no coefficients.
    pub fn is_empty(&self) -> bool {
        self.cglist.is_empty()
    }
}

impl Index<usize> for ClebschGordanTable {
    type Output = f64;

    fn index(&self, icg: usize) -> &Self::Output {
        &self.cglist[icg]
    }
}
