//! YAML input specification of a QSnap run.

use std::path::PathBuf;

use anyhow;
use serde::{Deserialize, Serialize};

use crate::dataset::{generate_bcc_dataset, ReferenceData, SyntheticDatasetParams};
use crate::drivers::force_evaluation::{ForceEvaluationParams, SnapForceDriver};
use crate::drivers::QSnapDriver;
use crate::interfaces::InputHandle;
use crate::io::format::{log_subtitle, qsnap_output, QSnapOutput};
#[allow(unused_imports)]
use crate::io::QSnapFileType;
use crate::model::SnapParams;

#[cfg(test)]
#[path = "input_tests.rs"]
mod input_tests;

/// An enumerated type representing possible sources of the reference dataset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source")]
pub enum DatasetSource {
    /// Variant indicating that the dataset will be read in from a `QSnap`
    /// [`QSnapFileType::Ref`] binary file. The associated path gives the name of the file
    /// without its `.qsnap.ref` extension.
    Binary { name: PathBuf },

    /// Variant indicating that the dataset will be read in from a YAML file.
    Yaml { path: PathBuf },

    /// Variant indicating that a synthetic BCC dataset will be generated.
    Synthetic(SyntheticDatasetParams),
}

impl Default for DatasetSource {
    fn default() -> Self {
        DatasetSource::Synthetic(SyntheticDatasetParams::default())
    }
}

impl DatasetSource {
    /// Reads or generates the dataset.
    pub fn load(&self) -> Result<ReferenceData, anyhow::Error> {
        match self {
            DatasetSource::Binary { name } => ReferenceData::read(name),
            DatasetSource::Yaml { path } => ReferenceData::read(path),
            DatasetSource::Synthetic(params) => {
                params.log_output_display();
                generate_bcc_dataset(params)
            }
        }
    }
}

/// A structure containing `QSnap` input parameters which can be serialised into and
/// deserialised from a YAML input file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Input {
    /// Specification of the reference dataset.
    ///
    /// If not specified, the default synthetic BCC tungsten dataset is generated.
    #[serde(default)]
    pub dataset: DatasetSource,

    /// SNAP hyperparameters. `twojmax` and `rcutfac` are always taken from the dataset; only the
    /// remaining parameters are read from here.
    ///
    /// If not specified, the defaults of [`SnapParams`] are used.
    #[serde(default)]
    pub snap: SnapParams,

    /// Control parameters for force evaluation.
    ///
    /// If not specified, the defaults of [`ForceEvaluationParams`] are used.
    #[serde(default)]
    pub force_evaluation: ForceEvaluationParams,
}

impl InputHandle for Input {
    /// Loads the dataset, builds the model and the neighbour list, and runs the force
    /// evaluation driver.
    fn handle(&self) -> Result<(), anyhow::Error> {
        log_subtitle("Reference dataset");
        qsnap_output!("");
        let data = self.dataset.load()?;
        data.log_output_display();
        qsnap_output!("");

        let model = data.model(&self.snap)?;
        let nbrs = data.neighbour_list()?;
        let reference_forces = data.reference_forces();

        let mut driver = SnapForceDriver::builder()
            .parameters(&self.force_evaluation)
            .model(&model)
            .neighbours(&nbrs)
            .reference_forces(reference_forces.as_ref())
            .build()?;
        driver.run()
    }
}
