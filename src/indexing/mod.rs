//! Combinatorial index tables for the triangular arrays of the SNAP bispectrum.
//!
//! Every angular-momentum label in this module is *doubled*, *i.e.* a label `j` stands for the
//! angular momentum $`j/2`$, so that half-integral momenta are represented by odd integers. All
//! tables are pure functions of the bandwidth `twojmax` and are built once.

use std::fmt;

use serde::{Deserialize, Serialize};


/// Iterates over all coupling triples $`(j_1, j_2, j)`$ with $`j_2 \le j_1 \le j_{\mathrm{max}}`$
/// and $`|j_1 - j_2| \le j \le \min(j_{\mathrm{max}}, j_1 + j_2)`$, with $`j`$ stepping by two.
///
/// The stepping encodes that only couplings with $`j_1 + j_2 + j`$ even are allowed. The order
/// of this iterator fixes the layout of every block table built from it.
///
/// # Arguments
///
/// * `twojmax` - The bandwidth $`2j_{\mathrm{max}}`$.
pub fn coupling_triples(twojmax: usize) -> impl Iterator<Item = (usize, usize, usize)> {
    (0..=twojmax).flat_map(move |j1| {
        (0..=j1).flat_map(move |j2| {
            (j1 - j2..=twojmax.min(j1 + j2))
                .step_by(2)
                .map(move |j| (j1, j2, j))
        })
    })
}

/// Counts the number of bispectrum components for a given bandwidth.
///
/// This is the number of coupling triples with $`j \ge j_1`$, which is also the number of linear
/// model coefficients excluding the constant term.
///
/// # Arguments
///
/// * `twojmax` - The bandwidth $`2j_{\mathrm{max}}`$.
///
/// # Returns
///
/// The number of bispectrum components.
pub fn compute_ncoeff(twojmax: usize) -> usize {
    coupling_triples(twojmax)
        .filter(|(j1, _, j)| j >= j1)
        .count()
}

/// A structure holding all offset tables needed to address the flat triangular arrays of the
/// SNAP bispectrum.
///
/// Three families of tables exist:
/// - `u` tables address both halves of each level of the rotation matrices,
/// - `du` tables address only the left half (including the midline) of each level and are used
/// by the derivative arrays and the `Y` array,
/// - `cg`, `b` and `z` tables address the Clebsch--Gordan blocks, the bispectrum components and
/// the coupling entries, respectively.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SnapIndices {
    /// The bandwidth $`2j_{\mathrm{max}}`$.
    twojmax: usize,

    /// Offsets of the Clebsch--Gordan blocks, keyed by the flattened triple
    /// $`j_1 d^2 + j_2 d + j`$ where $`d`$ is `twojmax + 1`.
    idxcg_block: Vec<Option<usize>>,

    /// Total number of Clebsch--Gordan coefficients.
    idxcg_max: usize,

    /// Offsets of the levels of the full `u` arrays.
    idxu_block: Vec<usize>,

    /// Total length of a full `u` array.
    idxu_max: usize,

    /// Inversion-symmetry parities $`(-1)^{m_a + m_b}`$ of every `u` array element.
    ulist_parity: Vec<i8>,

    /// Offsets of the levels of the left-half `du` arrays.
    idxdu_block: Vec<usize>,

    /// Total length of a left-half `du` array.
    idxdu_max: usize,

    /// The coupling triples with $`j \ge j_1`$, one per bispectrum component.
    idxb: Vec<(usize, usize, usize)>,

    /// Reverse lookup from a flattened triple $`j_1 d^2 + j_2 d + j`$ into [`Self::idxb`].
    idxb_block: Vec<Option<usize>>,

    /// Offsets of the first coupling entry of each triple, keyed by the flattened triple
    /// $`j_1 d^2 + j_2 d + j`$.
    idxz_block: Vec<Option<usize>>,

    /// Total number of coupling entries.
    idxz_max: usize,
}

impl SnapIndices {
    /// Builds all index tables for a given bandwidth.
    ///
    /// # Arguments
    ///
    /// * `twojmax` - The bandwidth $`2j_{\mathrm{max}}`$.
    ///
    /// # Returns
    ///
    /// The index tables.
    #[must_use]
    pub fn new(twojmax: usize) -> Self {
        let jdim = twojmax + 1;

        // Clebsch--Gordan blocks: one (j1 + 1)(j2 + 1) block per triple.
        let mut idxcg_block = vec![None; jdim * jdim * jdim];
        let mut idxcg_count = 0;
        for (j1, j2, j) in coupling_triples(twojmax) {
            idxcg_block[j1 * jdim * jdim + j2 * jdim + j] = Some(idxcg_count);
            idxcg_count += (j1 + 1) * (j2 + 1);
        }

        // u arrays: both halves of each level.
        let mut idxu_block = Vec::with_capacity(jdim);
        let mut idxu_count = 0;
        for j in 0..=twojmax {
            idxu_block.push(idxu_count);
            idxu_count += (j + 1) * (j + 1);
        }

        // Parity +1: u[j - ma][j - mb] = +conj(u[ma][mb]).
        // Parity -1: u[j - ma][j - mb] = -conj(u[ma][mb]).
        let ulist_parity = (0..=twojmax)
            .flat_map(|j| {
                (0..=j).flat_map(move |mb| {
                    (0..=j).map(move |ma| if (ma + mb) % 2 == 0 { 1 } else { -1 })
                })
            })
            .collect::<Vec<i8>>();
        assert_eq!(ulist_parity.len(), idxu_count);

        // du and y arrays: left half only, midline included.
        let mut idxdu_block = Vec::with_capacity(jdim);
        let mut idxdu_count = 0;
        for j in 0..=twojmax {
            idxdu_block.push(idxdu_count);
            idxdu_count += (j / 2 + 1) * (j + 1);
        }

        // Bispectrum components and their reverse lookup.
        let idxb = coupling_triples(twojmax)
            .filter(|(j1, _, j)| j >= j1)
            .collect::<Vec<_>>();
        let mut idxb_block = vec![None; jdim * jdim * jdim];
        for (jjb, (j1, j2, j)) in idxb.iter().enumerate() {
            idxb_block[j1 * jdim * jdim + j2 * jdim + j] = Some(jjb);
        }

        // Coupling entries: one per (ma, mb) with 2 mb <= j, ma <= j, per triple.
        let mut idxz_block = vec![None; jdim * jdim * jdim];
        let mut idxz_count = 0;
        for (j1, j2, j) in coupling_triples(twojmax) {
            idxz_block[j1 * jdim * jdim + j2 * jdim + j] = Some(idxz_count);
            idxz_count += (j / 2 + 1) * (j + 1);
        }

        Self {
            twojmax,
            idxcg_block,
            idxcg_max: idxcg_count,
            idxu_block,
            idxu_max: idxu_count,
            ulist_parity,
            idxdu_block,
            idxdu_max: idxdu_count,
            idxb,
            idxb_block,
            idxz_block,
            idxz_max: idxz_count,
        }
    }

    /// The bandwidth $`2j_{\mathrm{max}}`$.
    pub fn twojmax(&self) -> usize {
        self.twojmax
    }

    /// The number of doubled angular-momentum labels, `twojmax + 1`.
    pub fn jdim(&self) -> usize {
        self.twojmax + 1
    }

    /// Total number of Clebsch--Gordan coefficients.
    pub fn idxcg_max(&self) -> usize {
        self.idxcg_max
    }

    /// Total length of a full `u` array.
    pub fn idxu_max(&self) -> usize {
        self.idxu_max
    }

    /// Total length of a left-half `du` array.
    pub fn idxdu_max(&self) -> usize {
        self.idxdu_max
    }

    /// Total number of bispectrum components.
    pub fn idxb_max(&self) -> usize {
        self.idxb.len()
    }

    /// Total number of coupling entries.
    pub fn idxz_max(&self) -> usize {
        self.idxz_max
    }

    /// The coupling triples with $`j \ge j_1`$ in bispectrum-component order.
    pub fn idxb(&self) -> &[(usize, usize, usize)] {
        &self.idxb
    }

    /// The inversion-symmetry parity of the `u` array element at a flat offset.
    pub fn parity(&self, jju: usize) -> i8 {
        self.ulist_parity[jju]
    }

    /// Offset of the first element of level `j` in a full `u` array.
    pub fn idxu_block(&self, j: usize) -> usize {
        self.idxu_block[j]
    }

    /// Offset of the first element of level `j` in a left-half `du` array.
    pub fn idxdu_block(&self, j: usize) -> usize {
        self.idxdu_block[j]
    }

    /// Flat offset of element $`(m_a, m_b)`$ of level `j` in a full `u` array.
    ///
    /// # Panics
    ///
    /// Panics if `ma` or `mb` exceeds `j`.
    pub fn idxu(&self, j: usize, mb: usize, ma: usize) -> usize {
        assert!(
            ma <= j && mb <= j,
            "Element (ma = {ma}, mb = {mb}) lies outside level j = {j} of the u array."
        );
        self.idxu_block[j] + (j + 1) * mb + ma
    }

    /// Flat offset of element $`(m_a, m_b)`$ of level `j` in a left-half `du` array.
    ///
    /// # Panics
    ///
    /// Panics if `ma` exceeds `j` or if `2 mb` exceeds `j`.
    pub fn idxdu(&self, j: usize, mb: usize, ma: usize) -> usize {
        assert!(
            ma <= j && 2 * mb <= j,
            "Element (ma = {ma}, mb = {mb}) lies outside the left half of level j = {j}."
        );
        self.idxdu_block[j] + (j + 1) * mb + ma
    }

    /// Offset of the Clebsch--Gordan block of a coupling triple.
    ///
    /// # Panics
    ///
    /// Panics if $`(j_1, j_2, j)`$ is not a valid coupling triple.
    pub fn idxcg_block(&self, j1: usize, j2: usize, j: usize) -> usize {
        let jdim = self.jdim();
        self.triple_lookup(&self.idxcg_block, j1 * jdim * jdim + j2 * jdim + j)
            .unwrap_or_else(|| panic!("({j1}, {j2}, {j}) has no Clebsch--Gordan block."))
    }

    /// Index of the bispectrum component of a coupling triple with $`j \ge j_1`$.
    ///
    /// # Panics
    ///
    /// Panics if $`(j_1, j_2, j)`$ is not a bispectrum triple.
    pub fn idxb_block(&self, j1: usize, j2: usize, j: usize) -> usize {
        let jdim = self.jdim();
        self.triple_lookup(&self.idxb_block, j1 * jdim * jdim + j2 * jdim + j)
            .unwrap_or_else(|| panic!("({j1}, {j2}, {j}) is not a bispectrum triple."))
    }

    /// Offset of the first coupling entry of a coupling triple.
    ///
    /// # Panics
    ///
    /// Panics if $`(j_1, j_2, j)`$ is not a valid coupling triple.
    pub fn idxz_block(&self, j1: usize, j2: usize, j: usize) -> usize {
        let jdim = self.jdim();
        self.triple_lookup(&self.idxz_block, j1 * jdim * jdim + j2 * jdim + j)
            .unwrap_or_else(|| panic!("({j1}, {j2}, {j}) has no coupling entries."))
    }

    fn triple_lookup(&self, table: &[Option<usize>], key: usize) -> Option<usize> {
        table.get(key).copied().flatten()
    }
}

impl fmt::Display for SnapIndices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Index tables for twojmax = {}:", self.twojmax)?;
        writeln!(f, "  idxu_max : {}", self.idxu_max)?;
        writeln!(f, "  idxdu_max: {}", self.idxdu_max)?;
        writeln!(f, "  idxcg_max: {}", self.idxcg_max)?;
        writeln!(f, "  idxb_max : {}", self.idxb_max())?;
        writeln!(f, "  idxz_max : {}", self.idxz_max)?;
        Ok(())
    }
}
