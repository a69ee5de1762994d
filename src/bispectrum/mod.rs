//! Bispectrum components and per-atom SNAP energies.
//!
//! The force kernels never form the bispectrum explicitly. The routines here do, one atom at a
//! time, so that energies are available for validating forces against finite differences and
//! for reporting.

use ndarray::{Array1, ArrayView1};
use num_complex::Complex;
use rayon::prelude::*;

use crate::model::SnapModel;
use crate::neighbours::{Neighbour, NeighbourList};
use crate::rotation::{compute_uarray, CayleyKlein};


/// Computes the total $`U_{\mathrm{tot}}`$ of one atom from its neighbours.
///
/// # Arguments
///
/// * `model` - The SNAP model.
/// * `neighbours` - The neighbours of the atom.
///
/// # Returns
///
/// The total in `u` layout, including the self-contribution on the diagonal of every level.
pub fn compute_ulisttot(
    model: &SnapModel,
    neighbours: ArrayView1<'_, Neighbour>,
) -> Array1<Complex<f64>> {
    let (params, indices) = (model.params(), model.indices());
    let mut ulisttot = Array1::<Complex<f64>>::zeros(indices.idxu_max());
    for j in 0..=indices.twojmax() {
        for ma in 0..=j {
            ulisttot[indices.idxu(j, ma, ma)] = Complex::new(params.wself, 0.0);
        }
    }

    let mut ulist = Array1::<Complex<f64>>::zeros(indices.idxu_max());
    for neighbour in neighbours.iter() {
        let ck = CayleyKlein::new(&neighbour.rij, neighbour.rcutij, params);
        compute_uarray(indices, &ck, ulist.view_mut());
        let sfac = params.switching.sfac(ck.r(), neighbour.rcutij, params.rmin0) * neighbour.wj;
        ulisttot.scaled_add(Complex::new(sfac, 0.0), &ulist);
    }
    ulisttot
}

/// Computes every element of $`Z`$ for one atom, without the model coefficients.
///
/// # Returns
///
/// An array of length `idxz_max` in coupling-entry order.
pub fn compute_zlist(
    model: &SnapModel,
    ulisttot: ArrayView1<'_, Complex<f64>>,
) -> Array1<Complex<f64>> {
    model
        .coupling()
        .entries()
        .iter()
        .map(|entry| entry.contract(model.indices(), model.cglist(), &ulisttot))
        .collect()
}

/// Computes the bispectrum components of one atom,
///
/// ```math
///     B_{j_1 j_2 j} = \sum_{m_a, m_b} U^*_{j, m_a m_b} Z_{j_1 j_2 j, m_a m_b},
/// ```
///
/// summing explicitly over the left half of every level and doubling, since the right half
/// mirrors it.
///
/// # Returns
///
/// An array of length `ncoeff` ordered as [`crate::indexing::SnapIndices::idxb`].
pub fn compute_blist(
    model: &SnapModel,
    ulisttot: ArrayView1<'_, Complex<f64>>,
    zlist: ArrayView1<'_, Complex<f64>>,
) -> Array1<f64> {
    let indices = model.indices();
    indices
        .idxb()
        .iter()
        .map(|&(j1, j2, j)| {
            let jjz0 = indices.idxz_block(j1, j2, j);
            let mut sumzu = 0.0;
            for mb in 0..=j / 2 {
                for ma in 0..=j {
                    let weight = if 2 * mb < j || ma < mb {
                        1.0
                    } else if ma == mb {
                        0.5
                    } else {
                        continue;
                    };
                    let u = ulisttot[indices.idxu(j, mb, ma)];
                    let z = zlist[jjz0 + mb * (j + 1) + ma];
                    sumzu += weight * (u.conj() * z).re;
                }
            }
            2.0 * sumzu
        })
        .collect()
}

/// Computes the bispectrum components of one atom directly from its neighbours.
pub fn compute_bispectrum(
    model: &SnapModel,
    neighbours: ArrayView1<'_, Neighbour>,
) -> Array1<f64> {
    let ulisttot = compute_ulisttot(model, neighbours);
    let zlist = compute_zlist(model, ulisttot.view());
    compute_blist(model, ulisttot.view(), zlist.view())
}

/// Computes the energy of one atom, $`E_i = \beta_0 + \sum_k \beta_k B_{i,k}`$.
pub fn atom_energy(model: &SnapModel, neighbours: ArrayView1<'_, Neighbour>) -> f64 {
    let coeff = model.coeff();
    let blist = compute_bispectrum(model, neighbours);
    coeff[0]
        + blist
            .iter()
            .zip(coeff[1..].iter())
            .map(|(b, beta)| b * beta)
            .sum::<f64>()
}

/// Computes the energies of all local atoms in parallel.
pub fn compute_energies(model: &SnapModel, nbrs: &NeighbourList) -> Array1<f64> {
    let energies = (0..nbrs.nlocal())
        .into_par_iter()
        .map(|atom| atom_energy(model, nbrs.of_atom(atom)))
        .collect::<Vec<_>>();
    Array1::from_vec(energies)
}

/// Computes the total energy of all local atoms.
pub fn total_energy(model: &SnapModel, nbrs: &NeighbourList) -> f64 {
    compute_energies(model, nbrs).iter().fold(0.0, |acc, e| acc + e)
}
