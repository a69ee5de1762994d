//! Coupling-coefficient cache (the `Z` list) with the linear-model coefficients folded in.

use std::fmt;
use std::ops::Index;

use num_complex::Complex;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::angmom::clebsch_gordan::ClebschGordanTable;
use crate::indexing::{coupling_triples, SnapIndices};


// ======================
// Multiplicity rule table
// ======================

/// An enumerated type classifying a coupling triple $`(j_1, j_2, j)`$ by which of its labels
/// coincide.
///
/// Each bispectrum component $`B_{j_1 j_2 j}`$ with $`j \ge j_1`$ is reached by up to three
/// orderings of its labels. Folding the model coefficient into the coupling cache therefore
/// requires a multiplicity and, for the permuted orderings, a dimension ratio
/// $`(j_1 + 1)/(j + 1)`$ so that every ordering contributes the same derivative.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CouplingMultiplicity {
    /// $`j_1 = j_2 = j`$: three orderings collapse onto one; weight $`3\beta`$.
    AllEqual,

    /// $`j \ge j_1`$ and $`j_1 = j \ne j_2`$: weight $`2\beta`$.
    LeadEqual,

    /// $`j \ge j_1`$ and no further coincidence: weight $`\beta`$.
    Canonical,

    /// $`j_2 = j < j_1`$: component $`B_{j j_2 j_1}`$, weight $`2\beta(j_1 + 1)/(j + 1)`$.
    PermutedEqual,

    /// $`j_2 < j < j_1`$: component $`B_{j j_2 j_1}`$, weight $`\beta(j_1 + 1)/(j + 1)`$.
    Permuted,

    /// $`j < j_2`$: component $`B_{j_2 j j_1}`$, weight $`\beta(j_1 + 1)/(j + 1)`$.
    Rotated,
}

impl CouplingMultiplicity {
    /// Classifies a coupling triple with $`j_2 \le j_1`$.
    pub fn classify(j1: usize, j2: usize, j: usize) -> Self {
        if j >= j1 {
            if j1 == j && j2 == j {
                Self::AllEqual
            } else if j1 == j {
                Self::LeadEqual
            } else {
                Self::Canonical
            }
        } else if j >= j2 {
            if j2 == j {
                Self::PermutedEqual
            } else {
                Self::Permuted
            }
        } else {
            Self::Rotated
        }
    }

    /// The bispectrum triple whose coefficient applies to the coupling triple
    /// $`(j_1, j_2, j)`$.
    pub fn bispectrum_triple(&self, j1: usize, j2: usize, j: usize) -> (usize, usize, usize) {
        match self {
            Self::AllEqual | Self::LeadEqual | Self::Canonical => (j1, j2, j),
            Self::PermutedEqual | Self::Permuted => (j, j2, j1),
            Self::Rotated => (j2, j, j1),
        }
    }

    /// The factor multiplying the model coefficient of the coupling triple
    /// $`(j_1, j_2, j)`$.
    pub fn factor(&self, j1: usize, j: usize) -> f64 {
        let ratio = (j1 + 1) as f64 / (j + 1) as f64;
        match self {
            Self::AllEqual => 3.0,
            Self::LeadEqual => 2.0,
            Self::Canonical => 1.0,
            Self::PermutedEqual => 2.0 * ratio,
            Self::Permuted | Self::Rotated => ratio,
        }
    }
}

impl fmt::Display for CouplingMultiplicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllEqual => write!(f, "j1 = j2 = j"),
            Self::LeadEqual => write!(f, "j1 = j ≠ j2"),
            Self::Canonical => write!(f, "j ≥ j1"),
            Self::PermutedEqual => write!(f, "j2 = j < j1"),
            Self::Permuted => write!(f, "j2 < j < j1"),
            Self::Rotated => write!(f, "j < j2"),
        }
    }
}

// ==============
// Coupling entry
// ==============

/// A structure describing one coupling entry, *i.e.* one element $`(m_a, m_b)`$ of the
/// left half of $`Z_{j_1 j_2 j}`$ together with the summation windows over the two factors of
/// $`U_{\mathrm{tot}}`$ that contribute to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouplingEntry {
    pub j1: usize,
    pub j2: usize,
    pub j: usize,

    /// The projection offsets of this element of $`Z_{j_1 j_2 j}`$.
    pub ma: usize,
    pub mb: usize,

    /// Lowest column of $`U_{j_1}`$ and highest column of $`U_{j_2}`$ in the `ma` window.
    pub ma1min: usize,
    pub ma2max: usize,

    /// Number of column pairs in the `ma` window.
    pub na: usize,

    /// Lowest row of $`U_{j_1}`$ and highest row of $`U_{j_2}`$ in the `mb` window.
    pub mb1min: usize,
    pub mb2max: usize,

    /// Number of row pairs in the `mb` window.
    pub nb: usize,

    /// Offset of the Clebsch--Gordan block of the triple.
    pub jjcg: usize,

    /// Target offset in a left-half (`du` layout) array.
    pub jjdu: usize,
}

impl CouplingEntry {
    /// Builds the entry for element $`(m_a, m_b)`$ of $`Z_{j_1 j_2 j}`$.
    ///
    /// # Panics
    ///
    /// Panics if the element lies outside the left half of level `j`, or if the summation
    /// windows come out empty.
    pub fn new(
        indices: &SnapIndices,
        (j1, j2, j): (usize, usize, usize),
        ma: usize,
        mb: usize,
    ) -> Self {
        let (ma1min, ma2max, na) = Self::window(j1, j2, j, ma);
        let (mb1min, mb2max, nb) = Self::window(j1, j2, j, mb);
        Self {
            j1,
            j2,
            j,
            ma,
            mb,
            ma1min,
            ma2max,
            na,
            mb1min,
            mb2max,
            nb,
            jjcg: indices.idxcg_block(j1, j2, j),
            jjdu: indices.idxdu(j, mb, ma),
        }
    }

    /// Computes the window `(m1min, m2max, n)` of projection pairs $`(m_1, m_2)`$ with
    /// $`m_1 + m_2`$ mapping onto projection offset `m` of level `j`.
    fn window(j1: usize, j2: usize, j: usize, m: usize) -> (usize, usize, usize) {
        let (j1i, j2i, ji, mi) = (j1 as i64, j2 as i64, j as i64, m as i64);
        let m1min = 0_i64.max((2 * mi - ji - j2i + j1i) / 2);
        let m2max = (2 * mi - ji - (2 * m1min - j1i) + j2i) / 2;
        let n = j1i.min((2 * mi - ji + j2i + j1i) / 2) - m1min + 1;
        assert!(
            n >= 1 && (0..=j2i).contains(&m2max) && m2max - n + 1 >= 0,
            "Empty coupling window for m = {m} in ({j1}, {j2}, {j})."
        );
        (m1min as usize, m2max as usize, n as usize)
    }

    /// Contracts two windows of an atom's total rotation matrices through the Clebsch--Gordan
    /// block of this entry:
    ///
    /// ```math
    ///     Z = \sum_{b} C_{b} \sum_{a} C_{a}\, U_{j_1}[m_{a1}, m_{b1}]\, U_{j_2}[m_{a2}, m_{b2}].
    /// ```
    ///
    /// # Arguments
    ///
    /// * `indices` - The index tables.
    /// * `cglist` - The Clebsch--Gordan table.
    /// * `utot` - The full `u`-layout total of one atom, as any structure indexable by a flat
    /// `u` index.
    ///
    /// # Returns
    ///
    /// The value of this element of $`Z_{j_1 j_2 j}`$.
    pub fn contract<U>(
        &self,
        indices: &SnapIndices,
        cglist: &ClebschGordanTable,
        utot: &U,
    ) -> Complex<f64>
    where
        U: Index<usize, Output = Complex<f64>> + ?Sized,
    {
        let cgblock = &cglist.as_slice()[self.jjcg..];
        let ldim2 = self.j2 + 1;
        (0..self.nb).fold(Complex::<f64>::zero(), |ztmp, ib| {
            let mb1 = self.mb1min + ib;
            let mb2 = self.mb2max - ib;
            let jju1 = indices.idxu(self.j1, mb1, 0);
            let jju2 = indices.idxu(self.j2, mb2, 0);
            let suma1 = (0..self.na).fold(Complex::<f64>::zero(), |acc, ia| {
                let ma1 = self.ma1min + ia;
                let ma2 = self.ma2max - ia;
                acc + cgblock[ma1 * ldim2 + ma2] * utot[jju1 + ma1] * utot[jju2 + ma2]
            });
            ztmp + cgblock[mb1 * ldim2 + mb2] * suma1
        })
    }
}

/// Enumerates the coupling entries of every triple in index-table order.
///
/// # Arguments
///
/// * `indices` - The index tables.
///
/// # Returns
///
/// A vector of length `idxz_max` whose entries for triple $`(j_1, j_2, j)`$ start at
/// `idxz_block(j1, j2, j)`, with `mb` running outermost.
pub fn coupling_entries(indices: &SnapIndices) -> Vec<CouplingEntry> {
    let entries = coupling_triples(indices.twojmax())
        .flat_map(|(j1, j2, j)| {
            (0..=j / 2).flat_map(move |mb| {
                (0..=j).map(move |ma| CouplingEntry::new(indices, (j1, j2, j), ma, mb))
            })
        })
        .collect::<Vec<_>>();
    assert_eq!(entries.len(), indices.idxz_max());
    entries
}

// ==============
// Coupling table
// ==============

/// A structure holding the coupling entries of a bandwidth together with the model
/// coefficients folded into each of them. It depends only on `twojmax` and the coefficients,
/// and is reused unchanged across atoms and steps.
#[derive(Clone, Debug)]
pub struct CouplingTable {
    entries: Vec<CouplingEntry>,
    betaj: Vec<f64>,
}

impl CouplingTable {
    /// Builds the coupling table.
    ///
    /// # Arguments
    ///
    /// * `indices` - The index tables.
    /// * `beta` - The model coefficients of the bispectrum components, *excluding* the constant
    /// term, in `idxb` order.
    ///
    /// # Panics
    ///
    /// Panics if `beta` does not hold exactly `idxb_max` coefficients.
    #[must_use]
    pub fn new(indices: &SnapIndices, beta: &[f64]) -> Self {
        assert_eq!(
            beta.len(),
            indices.idxb_max(),
            "Expected {} bispectrum coefficients, but got {}.",
            indices.idxb_max(),
            beta.len()
        );
        let entries = coupling_entries(indices);
        let betaj = entries
            .iter()
            .map(|entry| {
                let (j1, j2, j) = (entry.j1, entry.j2, entry.j);
                let multiplicity = CouplingMultiplicity::classify(j1, j2, j);
                let (bj1, bj2, bj) = multiplicity.bispectrum_triple(j1, j2, j);
                beta[indices.idxb_block(bj1, bj2, bj)] * multiplicity.factor(j1, j)
            })
            .collect::<Vec<_>>();
        Self { entries, betaj }
    }

    /// The coupling entries in index-table order.
    pub fn entries(&self) -> &[CouplingEntry] {
        &self.entries
    }

    /// The folded coefficients, one per coupling entry.
    pub fn betaj(&self) -> &[f64] {
        &self.betaj
    }
}
