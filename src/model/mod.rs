//! SNAP hyperparameters and the immutable, geometry-independent part of a SNAP model.

use std::error::Error;
use std::fmt;

use derive_builder::Builder;
use log;
use serde::{Deserialize, Serialize};

use crate::angmom::clebsch_gordan::ClebschGordanTable;
use crate::coupling::CouplingTable;
use crate::indexing::{compute_ncoeff, SnapIndices};
use crate::rotation::SwitchingFunction;

#[cfg(test)]
#[path = "model_tests.rs"]
mod model_tests;

// =================
// Error definitions
// =================

/// An error describing an inconsistent SNAP configuration, detected before any kernel runs.
#[derive(Debug, Clone)]
pub struct SnapConfigurationError(pub String);

impl fmt::Display for SnapConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SNAP configuration error: {}", self.0)
    }
}

impl Error for SnapConfigurationError {}

// ==========
// Parameters
// ==========

/// A structure containing the hyperparameters of a SNAP potential.
#[derive(Clone, Builder, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapParams {
    /// The bandwidth $`2j_{\mathrm{max}}`$, *i.e.* twice the largest angular momentum in the
    /// bispectrum.
    #[builder(default = "8")]
    pub twojmax: usize,

    /// The cutoff radius scale factor. With unit element radii this is the pair cutoff.
    #[builder(default = "4.73442")]
    pub rcutfac: f64,

    /// The fraction of $`\pi`$ spanned by the polar angle $`\theta_0`$ over the cutoff sphere.
    #[builder(default = "0.99363")]
    pub rfac0: f64,

    /// The inner radius of the polar-angle mapping and of the switching function.
    #[builder(default = "0.0")]
    pub rmin0: f64,

    /// The radial switching function.
    #[builder(default = "SwitchingFunction::Cosine")]
    pub switching: SwitchingFunction,

    /// The self-contribution weight placed on the diagonal of every level of $`U_{\mathrm{tot}}`$.
    #[builder(default = "1.0")]
    pub wself: f64,
}

impl SnapParams {
    /// Returns a builder to construct a [`SnapParams`] structure.
    pub fn builder() -> SnapParamsBuilder {
        SnapParamsBuilder::default()
    }

    /// Checks the parameters for internal consistency.
    pub fn validate(&self) -> Result<(), SnapConfigurationError> {
        if !(self.rfac0 > 0.0 && self.rfac0 < 1.0) {
            return Err(SnapConfigurationError(format!(
                "`rfac0` must lie strictly between 0 and 1, but is {}.",
                self.rfac0
            )));
        }
        if !(self.rmin0 >= 0.0 && self.rcutfac > self.rmin0) {
            return Err(SnapConfigurationError(format!(
                "Expected 0 ≤ rmin0 < rcutfac, but rmin0 = {} and rcutfac = {}.",
                self.rmin0, self.rcutfac
            )));
        }
        Ok(())
    }
}

impl Default for SnapParams {
    fn default() -> Self {
        Self::builder()
            .build()
            .expect("Unable to construct a default `SnapParams`.")
    }
}

impl fmt::Display for SnapParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SNAP hyperparameters:")?;
        writeln!(f, "  twojmax  : {}", self.twojmax)?;
        writeln!(f, "  ncoeff   : {}", compute_ncoeff(self.twojmax))?;
        writeln!(f, "  rcutfac  : {:.5}", self.rcutfac)?;
        writeln!(f, "  rfac0    : {:.5}", self.rfac0)?;
        writeln!(f, "  rmin0    : {:.5}", self.rmin0)?;
        writeln!(f, "  switching: {}", self.switching)?;
        writeln!(f, "  wself    : {:.5}", self.wself)?;
        Ok(())
    }
}

// =====
// Model
// =====

/// A structure holding everything about a SNAP potential that does not depend on the atomic
/// geometry: the index tables, the Clebsch--Gordan table, the coupling cache with the model
/// coefficients folded in, and the coefficients themselves.
#[derive(Clone, Debug)]
pub struct SnapModel {
    params: SnapParams,
    indices: SnapIndices,
    cglist: ClebschGordanTable,
    coupling: CouplingTable,

    /// The linear-model coefficients. Index 0 holds the constant term.
    coeff: Vec<f64>,
}

impl SnapModel {
    /// Builds a SNAP model.
    ///
    /// # Arguments
    ///
    /// * `params` - The SNAP hyperparameters.
    /// * `coeff` - The linear-model coefficients: the constant term followed by one coefficient
    /// per bispectrum component.
    ///
    /// # Errors
    ///
    /// Errors with a [`SnapConfigurationError`] if the hyperparameters are inconsistent or if the
    /// number of coefficients does not match the bandwidth.
    pub fn new(params: &SnapParams, coeff: &[f64]) -> Result<Self, anyhow::Error> {
        params.validate()?;
        let ncoeff = compute_ncoeff(params.twojmax);
        if coeff.len() != ncoeff + 1 {
            return Err(SnapConfigurationError(format!(
                "twojmax = {} requires {} coefficients (ncoeff = {} plus the constant term), but {} \
                were supplied.",
                params.twojmax,
                ncoeff + 1,
                ncoeff,
                coeff.len()
            ))
            .into());
        }

        let indices = SnapIndices::new(params.twojmax);
        log::debug!("{indices}");
        let cglist = ClebschGordanTable::new(&indices);
        let coupling = CouplingTable::new(&indices, &coeff[1..]);
        log::debug!(
            "SNAP model built with {} Clebsch--Gordan coefficients and {} coupling entries.",
            cglist.len(),
            coupling.entries().len()
        );

        Ok(Self {
            params: params.clone(),
            indices,
            cglist,
            coupling,
            coeff: coeff.to_vec(),
        })
    }

    /// The SNAP hyperparameters.
    pub fn params(&self) -> &SnapParams {
        &self.params
    }

    /// The index tables for `twojmax`.
    pub fn indices(&self) -> &SnapIndices {
        &self.indices
    }

    /// The Clebsch--Gordan coefficients in `idxcg` layout.
    pub fn cglist(&self) -> &ClebschGordanTable {
        &self.cglist
    }

    /// The coupling entries with the model coefficients folded in.
    pub fn coupling(&self) -> &CouplingTable {
        &self.coupling
    }

    /// The linear-model coefficients, constant term first.
    pub fn coeff(&self) -> &[f64] {
        &self.coeff
    }

    /// The number of bispectrum components.
    pub fn ncoeff(&self) -> usize {
        self.coeff.len() - 1
    }
}
