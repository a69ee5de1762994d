//! Fixed neighbour lists.

use nalgebra::Vector3;
use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::model::SnapConfigurationError;

#[cfg(test)]
#[path = "neighbours_tests.rs"]
mod neighbours_tests;

/// A structure describing one neighbour of a local atom.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Neighbour {
    /// The displacement of the neighbour from the central atom.
    pub rij: Vector3<f64>,

    /// The neighbour weight.
    pub wj: f64,

    /// The pair cutoff radius.
    pub rcutij: f64,

    /// The index of the neighbour among all local and ghost atoms.
    pub index: usize,
}

/// A structure holding a fixed number of neighbours for every local atom.
///
/// Local atoms are numbered `0..nlocal` and ghost atoms `nlocal..nlocal + nghost`. Ghost atoms
/// never own neighbours; they only appear as neighbours of local atoms.
#[derive(Clone, Debug)]
pub struct NeighbourList {
    nghost: usize,

    /// The neighbours, with shape `(nlocal, ninside)`.
    neighbours: Array2<Neighbour>,
}

impl NeighbourList {
    /// Wraps an array of neighbours after checking its consistency.
    ///
    /// # Arguments
    ///
    /// * `nghost` - The number of ghost atoms.
    /// * `neighbours` - The neighbours, with shape `(nlocal, ninside)`.
    ///
    /// # Errors
    ///
    /// Errors if a neighbour index is out of range, if a local atom is its own neighbour, or if a
    /// displacement or cutoff is degenerate.
    pub fn new(
        nghost: usize,
        neighbours: Array2<Neighbour>,
    ) -> Result<Self, SnapConfigurationError> {
        let ntotal = neighbours.nrows() + nghost;
        for ((atom, nbor), neighbour) in neighbours.indexed_iter() {
            if neighbour.index >= ntotal {
                return Err(SnapConfigurationError(format!(
                    "Neighbour {nbor} of atom {atom} has index {}, but there are only {ntotal} \
                    atoms.",
                    neighbour.index
                )));
            }
            if neighbour.index == atom {
                return Err(SnapConfigurationError(format!(
                    "Atom {atom} is listed as its own neighbour."
                )));
            }
            let finite =
                neighbour.rij.iter().all(|x| x.is_finite()) && neighbour.rcutij.is_finite();
            if !finite || neighbour.rij.norm() <= 0.0 || neighbour.rcutij <= 0.0 {
                return Err(SnapConfigurationError(format!(
                    "Neighbour {nbor} of atom {atom} has a degenerate displacement or cutoff."
                )));
            }
        }
        Ok(Self { nghost, neighbours })
    }

    /// Builds a neighbour list from flat displacement and index lists with a uniform weight and
    /// cutoff.
    ///
    /// # Arguments
    ///
    /// * `nlocal` - The number of local atoms.
    /// * `nghost` - The number of ghost atoms.
    /// * `ninside` - The number of neighbours per local atom.
    /// * `rij` - The displacements, three per `(atom, neighbour)` pair, atom-major.
    /// * `jlist` - The neighbour indices, one per `(atom, neighbour)` pair, atom-major.
    /// * `wj` - The neighbour weight.
    /// * `rcut` - The pair cutoff radius.
    ///
    /// # Errors
    ///
    /// Errors if the flat lists do not have the shapes implied by `nlocal` and `ninside`, or if
    /// [`Self::new`] rejects the result.
    pub fn from_flat(
        nlocal: usize,
        nghost: usize,
        ninside: usize,
        rij: &[f64],
        jlist: &[usize],
        wj: f64,
        rcut: f64,
    ) -> Result<Self, SnapConfigurationError> {
        let npairs = nlocal * ninside;
        if rij.len() != 3 * npairs || jlist.len() != npairs {
            return Err(SnapConfigurationError(format!(
                "Expected {} displacement components and {npairs} neighbour indices for \
                {nlocal} atoms with {ninside} neighbours each, but got {} and {}.",
                3 * npairs,
                rij.len(),
                jlist.len()
            )));
        }
        let neighbours = Array2::from_shape_fn((nlocal, ninside), |(atom, nbor)| {
            let pair = atom * ninside + nbor;
            Neighbour {
                rij: Vector3::new(rij[3 * pair], rij[3 * pair + 1], rij[3 * pair + 2]),
                wj,
                rcutij: rcut,
                index: jlist[pair],
            }
        });
        Self::new(nghost, neighbours)
    }

    /// The number of local atoms.
    pub fn nlocal(&self) -> usize {
        self.neighbours.nrows()
    }

    /// The number of ghost atoms.
    pub fn nghost(&self) -> usize {
        self.nghost
    }

    /// The number of local and ghost atoms.
    pub fn ntotal(&self) -> usize {
        self.nlocal() + self.nghost
    }

    /// The number of neighbours per local atom.
    pub fn ninside(&self) -> usize {
        self.neighbours.ncols()
    }

    /// All neighbours, with shape `(nlocal, ninside)`.
    pub fn neighbours(&self) -> ArrayView2<'_, Neighbour> {
        self.neighbours.view()
    }

    /// The neighbours of one local atom.
    pub fn of_atom(&self, atom: usize) -> ArrayView1<'_, Neighbour> {
        self.neighbours.row(atom)
    }

    /// Returns a copy of this list with every displacement transformed by `f`.
    pub fn map_displacements<F>(&self, f: F) -> Self
    where
        F: Fn(usize, usize, &Vector3<f64>) -> Vector3<f64>,
    {
        let mut neighbours = self.neighbours.clone();
        neighbours
            .indexed_iter_mut()
            .for_each(|((atom, nbor), neighbour)| neighbour.rij = f(atom, nbor, &neighbour.rij));
        Self {
            nghost: self.nghost,
            neighbours,
        }
    }
}
