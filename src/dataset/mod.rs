//! Reference datasets: model coefficients, fixed neighbour geometry, and optional reference
//! forces.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use anyhow;
use derive_builder::Builder;
use log;
use nalgebra::Vector3;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::indexing::compute_ncoeff;
use crate::io::format::nice_bool;
use crate::io::{
    read_qsnap_binary, read_qsnap_yaml, write_qsnap_binary, write_qsnap_yaml, QSnapFileType,
};
use crate::model::{SnapConfigurationError, SnapModel, SnapParams};
use crate::neighbours::NeighbourList;


// ==============
// Reference data
// ==============

/// A structure holding one complete force-evaluation problem: the model, the geometry, and
/// optionally the forces it should produce.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReferenceData {
    /// The bandwidth $`2j_{\mathrm{max}}`$.
    pub twojmax: usize,

    /// The number of bispectrum components. Must match `twojmax`.
    pub ncoeff: usize,

    /// The number of local atoms.
    pub nlocal: usize,

    /// The number of ghost atoms.
    pub nghost: usize,

    /// The number of neighbours per local atom.
    pub ninside: usize,

    /// The pair cutoff radius.
    pub rcutfac: f64,

    /// The linear-model coefficients, constant term first.
    pub coeff: Vec<f64>,

    /// The neighbour displacements, three per `(atom, neighbour)` pair, atom-major.
    pub rij: Vec<f64>,

    /// The neighbour indices, one per `(atom, neighbour)` pair, atom-major.
    pub jlist: Vec<usize>,

    /// The reference forces, three per atom for all local and ghost atoms.
    pub fj: Option<Vec<f64>>,
}

impl ReferenceData {
    /// The number of local and ghost atoms.
    pub fn ntotal(&self) -> usize {
        self.nlocal + self.nghost
    }

    /// Checks the declared sizes against each other and against the stored lists.
    pub fn validate(&self) -> Result<(), SnapConfigurationError> {
        let ncoeff = compute_ncoeff(self.twojmax);
        if self.ncoeff != ncoeff {
            return Err(SnapConfigurationError(format!(
                "The dataset declares ncoeff = {}, but twojmax = {} implies ncoeff = {ncoeff}.",
                self.ncoeff, self.twojmax
            )));
        }
        if self.coeff.len() != ncoeff + 1 {
            return Err(SnapConfigurationError(format!(
                "The dataset holds {} coefficients, but ncoeff = {ncoeff} requires {}.",
                self.coeff.len(),
                ncoeff + 1
            )));
        }
        if let Some(fj) = &self.fj {
            if fj.len() != 3 * self.ntotal() {
                return Err(SnapConfigurationError(format!(
                    "The dataset holds {} reference force components for {} atoms.",
                    fj.len(),
                    self.ntotal()
                )));
            }
        }
        Ok(())
    }

    /// Returns the SNAP hyperparameters of this dataset: `base` with `twojmax` and `rcutfac`
    /// taken from the dataset.
    pub fn snap_params(&self, base: &SnapParams) -> SnapParams {
        SnapParams {
            twojmax: self.twojmax,
            rcutfac: self.rcutfac,
            ..base.clone()
        }
    }

    /// Builds the SNAP model of this dataset.
    ///
    /// # Errors
    ///
    /// Errors if the dataset is inconsistent or if [`SnapModel::new`] rejects it.
    pub fn model(&self, base: &SnapParams) -> Result<SnapModel, anyhow::Error> {
        self.validate()?;
        SnapModel::new(&self.snap_params(base), &self.coeff)
    }

    /// Builds the neighbour list of this dataset. Every neighbour has unit weight and the pair
    /// cutoff `rcutfac`.
    pub fn neighbour_list(&self) -> Result<NeighbourList, SnapConfigurationError> {
        NeighbourList::from_flat(
            self.nlocal,
            self.nghost,
            self.ninside,
            &self.rij,
            &self.jlist,
            1.0,
            self.rcutfac,
        )
    }

    /// The reference forces with shape `(ntotal, 3)`, if present.
    pub fn reference_forces(&self) -> Option<Array2<f64>> {
        self.fj
            .as_ref()
            .and_then(|fj| Array2::from_shape_vec((self.ntotal(), 3), fj.clone()).ok())
    }

    /// Reads a dataset. Files with a `.yml` or `.yaml` extension are read as YAML. Any other
    /// name is taken as a binary `.qsnap.ref` file without its extension.
    pub fn read<P: AsRef<Path>>(name: P) -> Result<Self, anyhow::Error> {
        let is_yaml = name
            .as_ref()
            .extension()
            .map(|ext| ext == "yml" || ext == "yaml")
            .unwrap_or(false);
        let data: Self = if is_yaml {
            read_qsnap_yaml(&name)?
        } else {
            read_qsnap_binary(&name, QSnapFileType::Ref)?
        };
        data.validate()?;
        log::debug!(
            "Dataset read from {}: {} local atoms, {} ghost atoms.",
            name.as_ref().display(),
            data.nlocal,
            data.nghost
        );
        Ok(data)
    }

    /// Writes the dataset as a binary `.qsnap.ref` file.
    pub fn write_binary<P: AsRef<Path>>(&self, name: P) -> Result<(), anyhow::Error> {
        write_qsnap_binary(name, QSnapFileType::Ref, self)
    }

    /// Writes the dataset as a `.yml` file.
    pub fn write_yaml<P: AsRef<Path>>(&self, name: P) -> Result<(), anyhow::Error> {
        write_qsnap_yaml(name, self)
    }
}

impl fmt::Display for ReferenceData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Reference dataset:")?;
        writeln!(f, "  natoms      : {}", self.nlocal)?;
        writeln!(f, "  nghostatoms : {}", self.nghost)?;
        writeln!(f, "  nneighs     : {}", self.ninside)?;
        writeln!(f, "  twojmax     : {}", self.twojmax)?;
        writeln!(f, "  ncoeff      : {}", self.ncoeff)?;
        writeln!(f, "  rcutfac     : {:.5}", self.rcutfac)?;
        writeln!(f, "  ref. forces : {}", nice_bool(self.fj.is_some()))?;
        Ok(())
    }
}

// =================
// Synthetic dataset
// =================

/// A structure containing the parameters of a synthetic periodic body-centred cubic dataset.
/// The defaults describe tungsten.
#[derive(Clone, Builder, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticDatasetParams {
    /// The cubic lattice constant.
    #[builder(default = "3.1803")]
    pub lattice_constant: f64,

    /// The number of conventional cells along each axis.
    #[builder(default = "[4, 4, 4]")]
    pub supercell: [usize; 3],

    /// The number of nearest periodic images kept as neighbours of every atom.
    #[builder(default = "26")]
    pub ninside: usize,

    /// The pair cutoff radius.
    #[builder(default = "4.73442")]
    pub rcutfac: f64,

    /// The bandwidth of the generated model.
    #[builder(default = "8")]
    pub twojmax: usize,

    /// The largest magnitude of the uniform random displacement applied to each Cartesian
    /// coordinate of every atom.
    #[builder(default = "0.0")]
    pub displacement: f64,

    /// The seed of the random number generator.
    #[builder(default = "42")]
    pub seed: u64,
}

impl SyntheticDatasetParams {
    /// Returns a builder to construct a [`SyntheticDatasetParams`] structure.
    pub fn builder() -> SyntheticDatasetParamsBuilder {
        SyntheticDatasetParamsBuilder::default()
    }

    /// The number of local atoms of the supercell.
    pub fn nlocal(&self) -> usize {
        2 * self.supercell.iter().product::<usize>()
    }
}

impl Default for SyntheticDatasetParams {
    fn default() -> Self {
        Self::builder()
            .build()
            .expect("Unable to construct a default `SyntheticDatasetParams`.")
    }
}

impl fmt::Display for SyntheticDatasetParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Synthetic BCC dataset:")?;
        writeln!(f, "  lattice constant: {:.5}", self.lattice_constant)?;
        writeln!(
            f,
            "  supercell       : {} × {} × {}",
            self.supercell[0], self.supercell[1], self.supercell[2]
        )?;
        writeln!(f, "  nneighs         : {}", self.ninside)?;
        writeln!(f, "  rcutfac         : {:.5}", self.rcutfac)?;
        writeln!(f, "  twojmax         : {}", self.twojmax)?;
        writeln!(f, "  displacement    : {:.5}", self.displacement)?;
        writeln!(f, "  seed            : {}", self.seed)?;
        Ok(())
    }
}

/// Generates a synthetic dataset on a periodic body-centred cubic supercell.
///
/// Every atom of the supercell is local. The neighbours of an atom are its `ninside` nearest
/// periodic images among the 27 copies of the supercell surrounding and including the home
/// one. Images outside the home supercell become ghost atoms, numbered in order of first
/// appearance. Model coefficients are drawn uniformly from $`[-1, 1)`$. No reference forces
/// are generated.
///
/// # Errors
///
/// Errors if the supercell is too small for its images to cover the cutoff sphere, or if it
/// holds fewer than `ninside` candidate neighbours.
pub fn generate_bcc_dataset(
    params: &SyntheticDatasetParams,
) -> Result<ReferenceData, anyhow::Error> {
    let a = params.lattice_constant;
    let box_lengths = Vector3::from_iterator(params.supercell.iter().map(|&n| n as f64 * a));
    if let Some(length) = box_lengths
        .iter()
        .find(|&&length| length < params.rcutfac + 2.0 * params.displacement)
    {
        return Err(SnapConfigurationError(format!(
            "A supercell edge of {length:.5} is too short for a cutoff of {:.5}.",
            params.rcutfac
        ))
        .into());
    }

    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut displace = || {
        if params.displacement > 0.0 {
            rng.gen_range(-params.displacement..params.displacement)
        } else {
            0.0
        }
    };
    let [nx, ny, nz] = params.supercell;
    let mut positions = Vec::with_capacity(params.nlocal());
    for ix in 0..nx {
        for iy in 0..ny {
            for iz in 0..nz {
                let corner = Vector3::new(ix as f64, iy as f64, iz as f64) * a;
                for basis in [Vector3::zeros(), Vector3::new(0.5, 0.5, 0.5) * a] {
                    let jitter = Vector3::new(displace(), displace(), displace());
                    positions.push(corner + basis + jitter);
                }
            }
        }
    }
    let nlocal = positions.len();
    let ncandidates = 27 * nlocal - 1;
    if ncandidates < params.ninside {
        return Err(SnapConfigurationError(format!(
            "{} neighbours per atom were requested, but the supercell only offers {ncandidates}.",
            params.ninside
        ))
        .into());
    }

    let shifts = (-1..=1)
        .flat_map(|sx| (-1..=1).flat_map(move |sy| (-1..=1).map(move |sz| [sx, sy, sz])))
        .collect::<Vec<[i32; 3]>>();
    let mut ghosts = HashMap::<(usize, [i32; 3]), usize>::new();
    let mut rij = Vec::with_capacity(3 * nlocal * params.ninside);
    let mut jlist = Vec::with_capacity(nlocal * params.ninside);
    let mut nbeyond = 0;
    for (atom, ri) in positions.iter().enumerate() {
        let mut candidates = positions
            .iter()
            .enumerate()
            .flat_map(|(other, rk)| {
                shifts.iter().filter_map(move |shift| {
                    if other == atom && *shift == [0, 0, 0] {
                        return None;
                    }
                    let offset = Vector3::new(
                        f64::from(shift[0]) * box_lengths[0],
                        f64::from(shift[1]) * box_lengths[1],
                        f64::from(shift[2]) * box_lengths[2],
                    );
                    Some((other, *shift, rk + offset - ri))
                })
            })
            .collect::<Vec<_>>();
        candidates.sort_by(|(_, _, x), (_, _, y)| x.norm().total_cmp(&y.norm()));

        for (other, shift, disp) in candidates.into_iter().take(params.ninside) {
            let index = if shift == [0, 0, 0] {
                other
            } else {
                let nghost = ghosts.len();
                *ghosts.entry((other, shift)).or_insert(nlocal + nghost)
            };
            if disp.norm() >= params.rcutfac {
                nbeyond += 1;
            }
            rij.extend(disp.iter());
            jlist.push(index);
        }
    }
    if nbeyond > 0 {
        log::warn!("{nbeyond} generated neighbour pairs lie on or beyond the cutoff.");
    }

    let ncoeff = compute_ncoeff(params.twojmax);
    let coeff = (0..=ncoeff)
        .map(|_| rng.gen_range(-1.0..1.0))
        .collect::<Vec<f64>>();
    log::debug!(
        "Generated a BCC dataset with {nlocal} local atoms and {} ghost atoms.",
        ghosts.len()
    );

    Ok(ReferenceData {
        twojmax: params.twojmax,
        ncoeff,
        nlocal,
        nghost: ghosts.len(),
        ninside: params.ninside,
        rcutfac: params.rcutfac,
        coeff,
        rij,
        jlist,
        fj: None,
    })
}
