//! # QSnap: A Program for Spectral Neighbour Analysis Potential Force Evaluation
//!
//! QSnap evaluates interatomic forces from a linear spectral neighbour analysis potential
//! (SNAP) on a fixed neighbour geometry. For every atom it
//! - maps each neighbour displacement onto a point of the three-sphere and builds the Wigner
//!   rotation matrices $`U_j`$ of that point by recursion,
//! - sums them into per-atom totals and couples pairs of levels through Clebsch--Gordan
//!   coefficients, with the linear-model coefficients folded in, and
//! - differentiates the recursion to contract the coupled totals into pair forces, which are
//!   reduced into per-atom forces.
//!
//! All per-step stages run in parallel with [`rayon`]. Concurrent accumulation into shared
//! per-atom totals uses lock-free atomic floating-point additions.
//!
//! Besides forces, QSnap computes bispectrum components and per-atom energies, which are used
//! to validate forces by finite differences.
//!
//! ## Examples and usage
//!
//! For most items (structs, enums, functions, and traits), their usages are illustrated in test
//! functions. The `qsnap` binary reads a YAML configuration file; without one it evaluates
//! forces on a synthetic BCC tungsten supercell.
//!
//! ## License
//!
//! GNU Lesser General Public License v3.0.

pub mod angmom;
pub mod atomic;
pub mod bispectrum;
pub mod coupling;
pub mod dataset;
pub mod drivers;
pub mod indexing;
pub mod interfaces;
pub mod io;
pub mod kernels;
pub mod model;
pub mod neighbours;
pub mod rotation;
