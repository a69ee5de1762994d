//! Per-neighbour Wigner rotation matrices in Cayley--Klein form, and their derivatives with
//! respect to the neighbour displacement.
//!
//! A displacement $`\mathbf{r}`$ inside a cutoff sphere of radius $`r_c`$ is mapped onto a point
//! on the unit 3-sphere with polar angle
//!
//! ```math
//!     \theta_0 = \frac{(r - r_{\mathrm{min}}) f \pi}{r_c - r_{\mathrm{min}}}
//! ```
//!
//! where $`f`$ is `rfac0`. The rotation is then parametrised by the Cayley--Klein pair
//!
//! ```math
//!     a = \frac{z_0 - iz}{\sqrt{r^2 + z_0^2}}, \qquad
//!     b = \frac{y - ix}{\sqrt{r^2 + z_0^2}}, \qquad
//!     z_0 = r \cot\theta_0,
//! ```
//!
//! and the matrices $`U_j`$ for doubled momenta $`j = 0, \ldots, 2j_{\mathrm{max}}`$ follow from
//! a level-by-level recursion in $`a`$ and $`b`$.

use std::f64::consts::PI;
use std::fmt;

use nalgebra::Vector3;
use ndarray::{ArrayView1, ArrayViewMut1, ArrayViewMut2};
use num_complex::Complex;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};

use crate::indexing::SnapIndices;
use crate::model::SnapParams;

#[cfg(test)]
#[path = "rotation_tests.rs"]
mod rotation_tests;

// ==================
// Switching function
// ==================

/// An enumerated type for the radial switching functions that smoothly switch off a
/// neighbour's contribution at the cutoff.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwitchingFunction {
    /// No switching: every neighbour contributes with unit weight.
    None,

    /// Cosine switching: unit weight below `rmin0`, zero beyond the cutoff, and
    /// $`\frac{1}{2}\left[\cos\left(\pi \frac{r - r_{\mathrm{min}}}{r_c - r_{\mathrm{min}}}\right) + 1\right]`$
    /// in between.
    #[default]
    Cosine,
}

impl SwitchingFunction {
    /// Evaluates the switching function.
    ///
    /// # Arguments
    ///
    /// * `r` - The neighbour distance.
    /// * `rcut` - The cutoff radius.
    /// * `rmin0` - The inner radius below which the weight is unity.
    pub fn sfac(&self, r: f64, rcut: f64, rmin0: f64) -> f64 {
        match self {
            Self::None => 1.0,
            Self::Cosine => {
                if r <= rmin0 {
                    1.0
                } else if r > rcut {
                    0.0
                } else {
                    let rcutfac = PI / (rcut - rmin0);
                    0.5 * (((r - rmin0) * rcutfac).cos() + 1.0)
                }
            }
        }
    }

    /// Evaluates the radial derivative of the switching function.
    ///
    /// # Arguments
    ///
    /// * `r` - The neighbour distance.
    /// * `rcut` - The cutoff radius.
    /// * `rmin0` - The inner radius below which the weight is unity.
    pub fn dsfac(&self, r: f64, rcut: f64, rmin0: f64) -> f64 {
        match self {
            Self::None => 0.0,
            Self::Cosine => {
                if r <= rmin0 || r > rcut {
                    0.0
                } else {
                    let rcutfac = PI / (rcut - rmin0);
                    -0.5 * ((r - rmin0) * rcutfac).sin() * rcutfac
                }
            }
        }
    }
}

impl fmt::Display for SwitchingFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Cosine => write!(f, "cosine"),
        }
    }
}

// ========================
// Cayley--Klein parameters
// ========================

/// A structure holding the Cayley--Klein parameters of one neighbour displacement together
/// with the intermediate radial quantities needed by their derivatives.
#[derive(Clone, Copy, Debug)]
pub struct CayleyKlein {
    /// The parameter $`a = r_0^{-1}(z_0 - iz)`$.
    pub a: Complex<f64>,

    /// The parameter $`b = r_0^{-1}(y - ix)`$.
    pub b: Complex<f64>,

    rij: Vector3<f64>,
    r: f64,
    z0: f64,
    r0inv: f64,
    rscale0: f64,
}

impl CayleyKlein {
    /// Maps a neighbour displacement onto its Cayley--Klein parameters.
    ///
    /// # Arguments
    ///
    /// * `rij` - The displacement of the neighbour from the central atom.
    /// * `rcut` - The cutoff radius of the pair.
    /// * `params` - The SNAP hyperparameters providing `rfac0` and `rmin0`.
    ///
    /// # Panics
    ///
    /// Panics if the displacement vanishes.
    pub fn new(rij: &Vector3<f64>, rcut: f64, params: &SnapParams) -> Self {
        let r = rij.norm();
        assert!(r > 0.0, "A neighbour coincides with its central atom.");
        let rscale0 = params.rfac0 * PI / (rcut - params.rmin0);
        let theta0 = (r - params.rmin0) * rscale0;
        let z0 = r * theta0.cos() / theta0.sin();
        let r0inv = 1.0 / (r * r + z0 * z0).sqrt();
        Self {
            a: Complex::new(r0inv * z0, -r0inv * rij.z),
            b: Complex::new(r0inv * rij.y, -r0inv * rij.x),
            rij: *rij,
            r,
            z0,
            r0inv,
            rscale0,
        }
    }

    /// The neighbour distance.
    pub fn r(&self) -> f64 {
        self.r
    }

    /// The unit vector along the displacement.
    pub fn rhat(&self) -> Vector3<f64> {
        self.rij / self.r
    }

    /// Computes the Cartesian derivatives $`\partial a / \partial r_k`$ and
    /// $`\partial b / \partial r_k`$ for $`k = x, y, z`$.
    pub fn derivatives(&self) -> ([Complex<f64>; 3], [Complex<f64>; 3]) {
        let (r, z0, r0inv) = (self.r, self.z0, self.r0inv);
        let (x, y, z) = (self.rij.x, self.rij.y, self.rij.z);
        let rsq = r * r;
        let dz0dr = z0 / r - (r * self.rscale0) * (rsq + z0 * z0) / rsq;
        let dr0invdr = -r0inv.powi(3) * (r + z0 * dz0dr);
        let rhat = self.rhat();

        let mut da = [Complex::<f64>::zero(); 3];
        let mut db = [Complex::<f64>::zero(); 3];
        for k in 0..3 {
            let dr0inv = dr0invdr * rhat[k];
            let dz0 = dz0dr * rhat[k];
            da[k] = Complex::new(dz0 * r0inv + z0 * dr0inv, -z * dr0inv);
            db[k] = Complex::new(y * dr0inv, -x * dr0inv);
        }
        da[2].im -= r0inv;
        db[0].im -= r0inv;
        db[1].re += r0inv;
        (da, db)
    }
}

fn rootpq(p: usize, q: usize) -> f64 {
    (p as f64 / q as f64).sqrt()
}

// ================
// Rotation matrices
// ================

/// Fills the full `u`-layout array of rotation matrices $`U_0, \ldots, U_{2j_{\mathrm{max}}}`$
/// of one neighbour.
///
/// Rows with $`2m_b < j`$ are built from level $`j - 1`$ through
///
/// ```math
///     u_{m_a m_b}^{j} = \sqrt{\tfrac{j - m_a}{j - m_b}}\, a^* u_{m_a m_b}^{j-1}
///         - \sqrt{\tfrac{m_a}{j - m_b}}\, b^* u_{m_a - 1, m_b}^{j-1},
/// ```
///
/// the midline row $`m_b = j/2`$ of even levels through
///
/// ```math
///     u_{m_a m_b}^{j} = \sqrt{\tfrac{j - m_a}{m_b}}\, b\, u_{m_a, m_b - 1}^{j-1}
///         + \sqrt{\tfrac{m_a}{m_b}}\, a\, u_{m_a - 1, m_b - 1}^{j-1},
/// ```
///
/// and the remaining rows by the inversion symmetry
/// $`u_{j - m_a, j - m_b}^{j} = (-1)^{m_a + m_b} \left(u_{m_a m_b}^{j}\right)^*`$.
///
/// # Arguments
///
/// * `indices` - The index tables.
/// * `ck` - The Cayley--Klein parameters of the neighbour.
/// * `ulist` - The output array of length `idxu_max`.
pub fn compute_uarray(
    indices: &SnapIndices,
    ck: &CayleyKlein,
    mut ulist: ArrayViewMut1<'_, Complex<f64>>,
) {
    assert_eq!(ulist.len(), indices.idxu_max());
    let (a, b) = (ck.a, ck.b);
    ulist[0] = Complex::one();

    for j in 1..=indices.twojmax() {
        for mb in 0..(j + 1) / 2 {
            for ma in 0..=j {
                let mut u = Complex::<f64>::zero();
                if ma < j {
                    u += rootpq(j - ma, j - mb) * a.conj() * ulist[indices.idxu(j - 1, mb, ma)];
                }
                if ma > 0 {
                    u -= rootpq(ma, j - mb) * b.conj() * ulist[indices.idxu(j - 1, mb, ma - 1)];
                }
                ulist[indices.idxu(j, mb, ma)] = u;
            }
        }

        if j % 2 == 0 {
            let mb = j / 2;
            for ma in 0..=j {
                let mut u = Complex::<f64>::zero();
                if ma < j {
                    u += rootpq(j - ma, mb) * b * ulist[indices.idxu(j - 1, mb - 1, ma)];
                }
                if ma > 0 {
                    u += rootpq(ma, mb) * a * ulist[indices.idxu(j - 1, mb - 1, ma - 1)];
                }
                ulist[indices.idxu(j, mb, ma)] = u;
            }
        }

        for mb in 0..(j + 1) / 2 {
            for ma in 0..=j {
                let src = indices.idxu(j, mb, ma);
                let dst = indices.idxu(j, j - mb, j - ma);
                ulist[dst] = f64::from(indices.parity(src)) * ulist[src].conj();
            }
        }
    }
}

/// Fills the left-half (`du` layout) array of the Cartesian derivatives of the *weighted*
/// rotation matrices $`s(r)\, w_j\, U_j`$ of one neighbour.
///
/// The recursion of [`compute_uarray`] is differentiated by the product rule, with the
/// derivatives of $`a`$ and $`b`$ from [`CayleyKlein::derivatives`]. The switching function is
/// then folded in as
/// $`\partial_k (s w U) = w \left(s'\, \hat{r}_k\, U + s\, \partial_k U\right)`$.
///
/// # Arguments
///
/// * `indices` - The index tables.
/// * `ck` - The Cayley--Klein parameters of the neighbour.
/// * `sfac` - The switching weight times the neighbour weight, $`s(r)\,w_j`$.
/// * `dsfac` - Its radial derivative, $`s'(r)\,w_j`$.
/// * `ulist` - The full rotation matrices of the neighbour from [`compute_uarray`].
/// * `dulist` - The output array of shape `(idxdu_max, 3)`.
pub fn compute_duarray(
    indices: &SnapIndices,
    ck: &CayleyKlein,
    sfac: f64,
    dsfac: f64,
    ulist: ArrayView1<'_, Complex<f64>>,
    mut dulist: ArrayViewMut2<'_, Complex<f64>>,
) {
    assert_eq!(ulist.len(), indices.idxu_max());
    assert_eq!(dulist.dim(), (indices.idxdu_max(), 3));
    let (a, b) = (ck.a, ck.b);
    let (da, db) = ck.derivatives();

    for k in 0..3 {
        dulist[[0, k]] = Complex::zero();
    }

    for j in 1..=indices.twojmax() {
        for mb in 0..(j + 1) / 2 {
            for ma in 0..=j {
                let jjdu = indices.idxdu(j, mb, ma);
                for k in 0..3 {
                    let mut du = Complex::<f64>::zero();
                    if ma < j {
                        let rp = rootpq(j - ma, j - mb);
                        let up = ulist[indices.idxu(j - 1, mb, ma)];
                        let dup = dulist[[indices.idxdu(j - 1, mb, ma), k]];
                        du += rp * (da[k].conj() * up + a.conj() * dup);
                    }
                    if ma > 0 {
                        let rp = rootpq(ma, j - mb);
                        let up = ulist[indices.idxu(j - 1, mb, ma - 1)];
                        let dup = dulist[[indices.idxdu(j - 1, mb, ma - 1), k]];
                        du -= rp * (db[k].conj() * up + b.conj() * dup);
                    }
                    dulist[[jjdu, k]] = du;
                }
            }
        }

        if j % 2 == 0 {
            let mb = j / 2;
            for ma in 0..=j {
                let jjdu = indices.idxdu(j, mb, ma);
                for k in 0..3 {
                    let mut du = Complex::<f64>::zero();
                    if ma < j {
                        let rp = rootpq(j - ma, mb);
                        let up = ulist[indices.idxu(j - 1, mb - 1, ma)];
                        let dup = dulist[[indices.idxdu(j - 1, mb - 1, ma), k]];
                        du += rp * (db[k] * up + b * dup);
                    }
                    if ma > 0 {
                        let rp = rootpq(ma, mb);
                        let up = ulist[indices.idxu(j - 1, mb - 1, ma - 1)];
                        let dup = dulist[[indices.idxdu(j - 1, mb - 1, ma - 1), k]];
                        du += rp * (da[k] * up + a * dup);
                    }
                    dulist[[jjdu, k]] = du;
                }
            }
        }
    }

    let rhat = ck.rhat();
    for j in 0..=indices.twojmax() {
        for mb in 0..=j / 2 {
            for ma in 0..=j {
                let jjdu = indices.idxdu(j, mb, ma);
                let u = ulist[indices.idxu(j, mb, ma)];
                for k in 0..3 {
                    dulist[[jjdu, k]] = dsfac * u * rhat[k] + sfac * dulist[[jjdu, k]];
                }
            }
        }
    }
}
