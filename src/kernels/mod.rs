//! Per-step SNAP force kernels.
//!
//! One force evaluation runs the stages of [`EvaluationStage`] strictly in order. Each stage is
//! data-parallel over atoms and either neighbours or coupling entries, and ends with a full
//! barrier (the return of the parallel call), so that no stage observes a partially written
//! array of an earlier one.

use std::fmt;
use std::ops::{Add, AddAssign};
use std::time::{Duration, Instant};

use log;
use nalgebra::Vector3;
use ndarray::{s, Array2, Array3, Array4, ArrayView1, ArrayView2, ArrayView3, Axis};
use num_complex::Complex;
use num_traits::Zero;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::atomic::{AtomicComplexBuffer, AtomicF64};
use crate::indexing::SnapIndices;
use crate::model::SnapModel;
use crate::neighbours::NeighbourList;
use crate::rotation::{compute_duarray, compute_uarray, CayleyKlein};


// ======
// Stages
// ======

/// An enumerated type for the stages of one force evaluation, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvaluationStage {
    /// Clears the per-atom totals and the force accumulator.
    Reset,

    /// Builds the rotation matrices of every pair and accumulates them into `Utot`.
    BuildU,

    /// Contracts `Utot` through the coupling cache into `Y`.
    BuildY,

    /// Builds the derivatives of the weighted rotation matrices of every pair.
    BuildDu,

    /// Contracts the derivatives against `Y` into pair forces.
    ContractForce,

    /// Folds the pair forces into per-atom forces.
    Reduce,
}

impl EvaluationStage {
    /// All stages in execution order.
    pub const ALL: [EvaluationStage; 6] = [
        EvaluationStage::Reset,
        EvaluationStage::BuildU,
        EvaluationStage::BuildY,
        EvaluationStage::BuildDu,
        EvaluationStage::ContractForce,
        EvaluationStage::Reduce,
    ];

    /// The stage following this one within a step, or `None` after the reduction.
    pub fn next(&self) -> Option<EvaluationStage> {
        match self {
            Self::Reset => Some(Self::BuildU),
            Self::BuildU => Some(Self::BuildY),
            Self::BuildY => Some(Self::BuildDu),
            Self::BuildDu => Some(Self::ContractForce),
            Self::ContractForce => Some(Self::Reduce),
            Self::Reduce => None,
        }
    }
}

impl fmt::Display for EvaluationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reset => write!(f, "reset"),
            Self::BuildU => write!(f, "compute_ui"),
            Self::BuildY => write!(f, "compute_yi"),
            Self::BuildDu => write!(f, "compute_duidrj"),
            Self::ContractForce => write!(f, "compute_deidrj"),
            Self::Reduce => write!(f, "reduce"),
        }
    }
}

/// Wall-clock durations of the evaluation stages, accumulated over any number of steps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StageTimings {
    pub reset: Duration,
    pub compute_ui: Duration,
    pub compute_yi: Duration,
    pub compute_duidrj: Duration,
    pub compute_deidrj: Duration,
    pub reduce: Duration,
}

impl StageTimings {
    /// Records a duration against a stage.
    pub fn record(&mut self, stage: EvaluationStage, duration: Duration) {
        *self.get_mut(stage) += duration;
    }

    /// The duration recorded against a stage.
    pub fn get(&self, stage: EvaluationStage) -> Duration {
        match stage {
            EvaluationStage::Reset => self.reset,
            EvaluationStage::BuildU => self.compute_ui,
            EvaluationStage::BuildY => self.compute_yi,
            EvaluationStage::BuildDu => self.compute_duidrj,
            EvaluationStage::ContractForce => self.compute_deidrj,
            EvaluationStage::Reduce => self.reduce,
        }
    }

    fn get_mut(&mut self, stage: EvaluationStage) -> &mut Duration {
        match stage {
            EvaluationStage::Reset => &mut self.reset,
            EvaluationStage::BuildU => &mut self.compute_ui,
            EvaluationStage::BuildY => &mut self.compute_yi,
            EvaluationStage::BuildDu => &mut self.compute_duidrj,
            EvaluationStage::ContractForce => &mut self.compute_deidrj,
            EvaluationStage::Reduce => &mut self.reduce,
        }
    }

    /// The total duration over all stages.
    pub fn total(&self) -> Duration {
        EvaluationStage::ALL
            .iter()
            .map(|stage| self.get(*stage))
            .sum()
    }
}

impl Add for StageTimings {
    type Output = StageTimings;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

impl AddAssign for StageTimings {
    fn add_assign(&mut self, rhs: Self) {
        for stage in EvaluationStage::ALL {
            self.record(stage, rhs.get(stage));
        }
    }
}

// =========
// Workspace
// =========

/// A structure holding all per-step arrays of a force evaluation. The arrays are allocated
/// once and reused by every step; none of them carries information across a
/// [`EvaluationStage::Reset`].
#[derive(Debug)]
pub struct SnapWorkspace {
    /// Rotation matrices of every pair, with shape `(nlocal, ninside, idxu_max)`.
    ulist: Array3<Complex<f64>>,

    /// Derivatives of the weighted rotation matrices of every pair, with shape
    /// `(nlocal, ninside, idxdu_max, 3)`.
    dulist: Array4<Complex<f64>>,

    /// Per-atom totals $`U_{\mathrm{tot}}`$, with shape `(nlocal, idxu_max)`.
    ulisttot: AtomicComplexBuffer,

    /// Per-atom coupling arrays $`Y`$, with shape `(nlocal, idxdu_max)`.
    ylist: AtomicComplexBuffer,

    /// Initial value of every atom's $`U_{\mathrm{tot}}`$: `wself` on the diagonal of every
    /// level.
    ulisttot_init: Vec<Complex<f64>>,

    /// Pair forces $`\partial E_i / \partial \mathbf{r}_{ij}`$, with shape `(nlocal, ninside, 3)`.
    dedr: Array3<f64>,

    /// Per-atom forces, with shape `(ntotal, 3)`.
    forces: Array2<f64>,
}

impl SnapWorkspace {
    /// Allocates a workspace for a model and a neighbour list.
    pub fn new(model: &SnapModel, nbrs: &NeighbourList) -> Self {
        let indices = model.indices();
        let (nlocal, ninside) = (nbrs.nlocal(), nbrs.ninside());

        let mut ulisttot_init = vec![Complex::<f64>::zero(); indices.idxu_max()];
        for j in 0..=indices.twojmax() {
            for ma in 0..=j {
                ulisttot_init[indices.idxu(j, ma, ma)] = Complex::new(model.params().wself, 0.0);
            }
        }

        Self {
            ulist: Array3::zeros((nlocal, ninside, indices.idxu_max())),
            dulist: Array4::zeros((nlocal, ninside, indices.idxdu_max(), 3)),
            ulisttot: AtomicComplexBuffer::new(nlocal, indices.idxu_max()),
            ylist: AtomicComplexBuffer::new(nlocal, indices.idxdu_max()),
            ulisttot_init,
            dedr: Array3::zeros((nlocal, ninside, 3)),
            forces: Array2::zeros((nbrs.ntotal(), 3)),
        }
    }

    /// Checks that the workspace was allocated for this model and neighbour list.
    fn check(&self, indices: &SnapIndices, nbrs: &NeighbourList) {
        let (nlocal, ninside) = (nbrs.nlocal(), nbrs.ninside());
        assert_eq!(
            self.ulist.dim(),
            (nlocal, ninside, indices.idxu_max()),
            "Workspace does not match the model and neighbour list."
        );
        assert_eq!(self.forces.nrows(), nbrs.ntotal());
    }

    /// A snapshot of every atom's $`U_{\mathrm{tot}}`$.
    pub fn ulisttot(&self) -> Array2<Complex<f64>> {
        self.ulisttot.snapshot()
    }

    /// A snapshot of every atom's $`Y`$.
    pub fn ylist(&self) -> Array2<Complex<f64>> {
        self.ylist.snapshot()
    }

    /// The pair forces from the last [`EvaluationStage::ContractForce`].
    pub fn dedr(&self) -> ArrayView3<'_, f64> {
        self.dedr.view()
    }

    /// The per-atom forces from the last [`EvaluationStage::Reduce`].
    pub fn forces(&self) -> ArrayView2<'_, f64> {
        self.forces.view()
    }
}

// =======
// Kernels
// =======

/// Runs a single stage.
///
/// # Returns
///
/// The wall-clock duration of the stage.
pub fn run_stage(
    stage: EvaluationStage,
    model: &SnapModel,
    nbrs: &NeighbourList,
    ws: &mut SnapWorkspace,
) -> Duration {
    ws.check(model.indices(), nbrs);
    let start = Instant::now();
    match stage {
        EvaluationStage::Reset => reset(ws),
        EvaluationStage::BuildU => compute_ui(model, nbrs, ws),
        EvaluationStage::BuildY => compute_yi(model, ws),
        EvaluationStage::BuildDu => compute_duidrj(model, nbrs, ws),
        EvaluationStage::ContractForce => compute_deidrj(model, ws),
        EvaluationStage::Reduce => reduce_forces(nbrs, ws),
    }
    let duration = start.elapsed();
    log::debug!("Stage {stage} took {:.3} ms.", duration.as_secs_f64() * 1000.0);
    duration
}

/// Runs one full force evaluation, *i.e.* every stage once in order.
///
/// # Returns
///
/// The durations of the stages.
pub fn evaluate_step(
    model: &SnapModel,
    nbrs: &NeighbourList,
    ws: &mut SnapWorkspace,
) -> StageTimings {
    let mut timings = StageTimings::default();
    let mut stage = Some(EvaluationStage::Reset);
    while let Some(current) = stage {
        timings.record(current, run_stage(current, model, nbrs, ws));
        stage = current.next();
    }
    timings
}

fn reset(ws: &mut SnapWorkspace) {
    let init = &ws.ulisttot_init;
    ws.ulisttot.reset(|jju| init[jju]);
    ws.ylist.reset(|_| Complex::zero());
    ws.dedr.fill(0.0);
    ws.forces.fill(0.0);
}

/// Builds the rotation matrices of every `(atom, neighbour)` pair and atomically accumulates
/// them, weighted by the switching function and the neighbour weight, into the atom's
/// $`U_{\mathrm{tot}}`$.
fn compute_ui(model: &SnapModel, nbrs: &NeighbourList, ws: &mut SnapWorkspace) {
    let (params, indices) = (model.params(), model.indices());
    let neighbours = nbrs.neighbours();
    let ulisttot = &ws.ulisttot;
    ws.ulist
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(atom, mut atom_ulist)| {
            atom_ulist
                .axis_iter_mut(Axis(0))
                .into_par_iter()
                .enumerate()
                .for_each(|(nbor, mut ulist)| {
                    let neighbour = &neighbours[[atom, nbor]];
                    let ck = CayleyKlein::new(&neighbour.rij, neighbour.rcutij, params);
                    compute_uarray(indices, &ck, ulist.view_mut());
                    let sfac = params.switching.sfac(ck.r(), neighbour.rcutij, params.rmin0)
                        * neighbour.wj;
                    ulist
                        .iter()
                        .enumerate()
                        .for_each(|(jju, u)| ulisttot.add(atom, jju, sfac * *u));
                });
        });
}

/// Contracts every atom's $`U_{\mathrm{tot}}`$ through every coupling entry and atomically
/// accumulates the result, scaled by the folded coefficient, into the atom's $`Y`$.
fn compute_yi(model: &SnapModel, ws: &mut SnapWorkspace) {
    let (indices, cglist) = (model.indices(), model.cglist());
    let entries = model.coupling().entries();
    let betaj = model.coupling().betaj();
    let utot = ws.ulisttot.snapshot();
    let ylist = &ws.ylist;
    let nz = entries.len();
    (0..utot.nrows() * nz).into_par_iter().for_each(|pair| {
        let (atom, jjz) = (pair / nz, pair % nz);
        let entry = &entries[jjz];
        let z = entry.contract(indices, cglist, &utot.row(atom));
        ylist.add(atom, entry.jjdu, betaj[jjz] * z);
    });
}

/// Builds the derivatives of the weighted rotation matrices of every `(atom, neighbour)` pair.
fn compute_duidrj(model: &SnapModel, nbrs: &NeighbourList, ws: &mut SnapWorkspace) {
    let (params, indices) = (model.params(), model.indices());
    let neighbours = nbrs.neighbours();
    let ulist = &ws.ulist;
    ws.dulist
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(atom, mut atom_dulist)| {
            atom_dulist
                .axis_iter_mut(Axis(0))
                .into_par_iter()
                .enumerate()
                .for_each(|(nbor, dulist)| {
                    let neighbour = &neighbours[[atom, nbor]];
                    let ck = CayleyKlein::new(&neighbour.rij, neighbour.rcutij, params);
                    let (r, rcut) = (ck.r(), neighbour.rcutij);
                    let sfac = params.switching.sfac(r, rcut, params.rmin0) * neighbour.wj;
                    let dsfac = params.switching.dsfac(r, rcut, params.rmin0) * neighbour.wj;
                    compute_duarray(
                        indices,
                        &ck,
                        sfac,
                        dsfac,
                        ulist.slice(s![atom, nbor, ..]),
                        dulist,
                    );
                });
        });
}

/// Contracts the derivative arrays of every `(atom, neighbour)` pair against the atom's $`Y`$.
fn compute_deidrj(model: &SnapModel, ws: &mut SnapWorkspace) {
    let indices = model.indices();
    let ylist = ws.ylist.snapshot();
    let dulist = &ws.dulist;
    ws.dedr
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(atom, mut atom_dedr)| {
            let y = ylist.row(atom);
            atom_dedr
                .axis_iter_mut(Axis(0))
                .enumerate()
                .for_each(|(nbor, mut dedr)| {
                    let grad = compute_deidrj_pair(
                        indices,
                        y.view(),
                        dulist.slice(s![atom, nbor, .., ..]),
                    );
                    dedr.iter_mut().zip(grad.iter()).for_each(|(d, g)| *d = *g);
                });
        });
}

/// Computes the gradient of an atom's energy with respect to the displacement of one of its
/// neighbours,
///
/// ```math
///     \frac{\partial E_i}{\partial r_{ij,k}}
///         = 2 \sum_{j} \sum_{m_b \le j/2} \sum_{m_a} w_{m_a m_b}
///             \mathrm{Re}\left[\left(\partial_k U_{j}\right)^*_{m_a m_b} Y_{j, m_a m_b}\right],
/// ```
///
/// where $`w = 1`$ off the midline, $`w = 1`$ on the midline for $`m_a < m_b`$,
/// $`w = \frac{1}{2}`$ at $`m_a = m_b = j/2`$, and midline elements with $`m_a > m_b`$ are
/// skipped since they mirror those with $`m_a < m_b`$.
///
/// # Arguments
///
/// * `indices` - The index tables.
/// * `ylist` - The $`Y`$ array of the central atom, in `du` layout.
/// * `dulist` - The derivative array of the pair, with shape `(idxdu_max, 3)`.
pub fn compute_deidrj_pair(
    indices: &SnapIndices,
    ylist: ArrayView1<'_, Complex<f64>>,
    dulist: ArrayView2<'_, Complex<f64>>,
) -> Vector3<f64> {
    let mut dedr = Vector3::<f64>::zeros();
    for j in 0..=indices.twojmax() {
        for mb in 0..=j / 2 {
            for ma in 0..=j {
                let weight = if 2 * mb < j {
                    1.0
                } else if ma < mb {
                    1.0
                } else if ma == mb {
                    0.5
                } else {
                    continue;
                };
                let jjdu = indices.idxdu(j, mb, ma);
                let y = ylist[jjdu];
                for k in 0..3 {
                    let du = dulist[[jjdu, k]];
                    dedr[k] += weight * (du.re * y.re + du.im * y.im);
                }
            }
        }
    }
    dedr * 2.0
}

/// Folds the pair forces into per-atom forces: each pair adds its force to the central atom
/// and subtracts it from the neighbour. Ghost atoms only ever receive the subtracted part.
fn reduce_forces(nbrs: &NeighbourList, ws: &mut SnapWorkspace) {
    let neighbours = nbrs.neighbours();
    let accumulator = (0..3 * nbrs.ntotal())
        .map(|_| AtomicF64::default())
        .collect::<Vec<_>>();
    ws.dedr
        .axis_iter(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(atom, atom_dedr)| {
            for (nbor, dedr) in atom_dedr.outer_iter().enumerate() {
                let jatom = neighbours[[atom, nbor]].index;
                for k in 0..3 {
                    accumulator[3 * atom + k].fetch_add(dedr[k]);
                    accumulator[3 * jatom + k].fetch_add(-dedr[k]);
                }
            }
        });
    ws.forces
        .iter_mut()
        .zip(accumulator.iter())
        .for_each(|(force, acc)| *force += acc.load());
}
