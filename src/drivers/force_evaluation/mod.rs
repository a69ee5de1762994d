//! Driver for repeated SNAP force evaluation in QSnap.

use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{self, ensure, format_err};
use derive_builder::Builder;
use log;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::drivers::QSnapDriver;
use crate::io::format::{
    log_subtitle, log_title, ms_per_step, nice_bool, qsnap_output, qsnap_warn, write_subtitle,
    write_title, QSnapOutput,
};
use crate::io::{write_qsnap_binary, QSnapFileType};
use crate::kernels::{evaluate_step, EvaluationStage, SnapWorkspace, StageTimings};
use crate::model::SnapModel;
use crate::neighbours::NeighbourList;

#[cfg(test)]
#[path = "force_evaluation_tests.rs"]
mod force_evaluation_tests;

// ==================
// Struct definitions
// ==================

// ----------
// Parameters
// ----------

fn default_nsteps() -> usize {
    1
}
fn default_rms_threshold() -> f64 {
    1e-5
}

/// Structure containing control parameters for SNAP force evaluation.
#[derive(Clone, Builder, Debug, PartialEq, Serialize, Deserialize)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct ForceEvaluationParams {
    /// The number of force evaluations to run on the same geometry.
    #[builder(default = "1")]
    #[serde(default = "default_nsteps")]
    pub nsteps: usize,

    /// The largest root-mean-square force deviation from the reference forces that is still
    /// reported as a pass.
    #[builder(default = "1e-5")]
    #[serde(default = "default_rms_threshold")]
    pub rms_threshold: f64,

    /// Optional name (without the `.qsnap.frc` extension) for saving the force-evaluation result
    /// as a binary file of type [`QSnapFileType::Frc`]. If `None`, the result will not be saved.
    #[builder(default = "None")]
    #[serde(default)]
    pub result_save_name: Option<PathBuf>,
}

impl ForceEvaluationParamsBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.nsteps == Some(0) {
            Err("At least one force evaluation step is required.".to_string())
        } else {
            Ok(())
        }
    }
}

impl ForceEvaluationParams {
    /// Returns a builder to construct a [`ForceEvaluationParams`] structure.
    pub fn builder() -> ForceEvaluationParamsBuilder {
        ForceEvaluationParamsBuilder::default()
    }
}

impl Default for ForceEvaluationParams {
    fn default() -> Self {
        Self::builder()
            .build()
            .expect("Unable to construct a default `ForceEvaluationParams`.")
    }
}

impl fmt::Display for ForceEvaluationParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Number of force evaluation steps: {}", self.nsteps)?;
        writeln!(f, "RMS force deviation threshold: {:.3e}", self.rms_threshold)?;
        writeln!(
            f,
            "Save force-evaluation results to file: {}",
            if let Some(name) = self.result_save_name.as_ref() {
                let mut path = name.clone();
                path.set_extension(QSnapFileType::Frc.ext());
                path.display().to_string()
            } else {
                nice_bool(false)
            }
        )?;
        writeln!(f)?;

        Ok(())
    }
}

// ------
// Result
// ------

/// An enumerated type for the verdict on the accuracy of computed forces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForceVerdict {
    /// The RMS deviation lies within the threshold.
    Pass,

    /// The RMS deviation exceeds the threshold, or is not a number.
    Fail,
}

impl fmt::Display for ForceVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}

/// Structure to contain SNAP force-evaluation results.
#[derive(Clone, Builder, Debug, Serialize, Deserialize)]
pub struct SnapForceResult {
    /// The control parameters used to obtain this set of results.
    parameters: ForceEvaluationParams,

    /// The number of local atoms.
    pub nlocal: usize,

    /// The number of ghost atoms.
    pub nghost: usize,

    /// The number of neighbours per local atom.
    pub ninside: usize,

    /// The bandwidth of the model.
    pub twojmax: usize,

    /// The forces on all local and ghost atoms from the last step, with shape `(ntotal, 3)`.
    pub forces: Array2<f64>,

    /// The root-mean-square deviation of the forces from the reference forces over all steps,
    /// if reference forces were given.
    #[builder(default = "None")]
    pub rms_deviation: Option<f64>,

    /// The verdict on [`Self::rms_deviation`], if reference forces were given.
    #[builder(default = "None")]
    pub verdict: Option<ForceVerdict>,

    /// The stage durations summed over all steps.
    pub timings: StageTimings,

    /// The wall-clock duration of all steps.
    pub duration: Duration,
}

impl SnapForceResult {
    fn builder() -> SnapForceResultBuilder {
        SnapForceResultBuilder::default()
    }

    /// The control parameters used to obtain this set of results.
    pub fn parameters(&self) -> &ForceEvaluationParams {
        &self.parameters
    }

    /// The time spent in the four force kernels, excluding the reset and the reduction.
    pub fn kernel_time(&self) -> Duration {
        [
            EvaluationStage::BuildU,
            EvaluationStage::BuildY,
            EvaluationStage::BuildDu,
            EvaluationStage::ContractForce,
        ]
        .iter()
        .map(|stage| self.timings.get(*stage))
        .sum()
    }
}

impl fmt::Display for SnapForceResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nsteps = self.parameters.nsteps;
        write_title(f, "Summary of SNAP Force Evaluation")?;
        writeln!(f)?;
        writeln!(f, "natoms = {}", self.nlocal)?;
        writeln!(f, "nghostatoms = {}", self.nghost)?;
        writeln!(f, "nsteps = {nsteps}")?;
        writeln!(f, "nneighs = {}", self.ninside)?;
        writeln!(f, "twojmax = {}", self.twojmax)?;
        writeln!(f, "duration = {:.6e} [sec]", self.duration.as_secs_f64())?;
        writeln!(
            f,
            "step time = {:.6e} [msec/step]",
            ms_per_step(self.duration, nsteps)
        )?;
        writeln!(f)?;

        write_subtitle(f, "Individual kernel timings for each step")?;
        for stage in [
            EvaluationStage::BuildU,
            EvaluationStage::BuildY,
            EvaluationStage::BuildDu,
            EvaluationStage::ContractForce,
        ] {
            writeln!(
                f,
                "  {:<16} = {:.6e} [msec/step]",
                stage.to_string(),
                ms_per_step(self.timings.get(stage), nsteps)
            )?;
        }
        let kernel_time = self.kernel_time();
        writeln!(
            f,
            "  Total kernel time = {:.6e} [msec/step]",
            ms_per_step(kernel_time, nsteps)
        )?;
        let percentage = if self.duration.is_zero() {
            0.0
        } else {
            100.0 * kernel_time.as_secs_f64() / self.duration.as_secs_f64()
        };
        writeln!(f, "  Percentage of step time = {percentage:.2}%")?;
        writeln!(f)?;

        writeln!(
            f,
            "grind time = {:.6e} [msec/atom-step]",
            ms_per_step(self.duration, nsteps) / self.nlocal.max(1) as f64
        )?;
        match (self.rms_deviation, self.verdict) {
            (Some(rms), Some(verdict)) => {
                writeln!(f, "RMS |Fj| deviation {rms:.6e} [eV/A] ({verdict})")?;
            }
            _ => writeln!(f, "RMS |Fj| deviation: no reference forces")?,
        }

        Ok(())
    }
}

// ------
// Driver
// ------

/// Driver for repeated SNAP force evaluation on a fixed neighbour geometry.
///
/// Every step runs all [`EvaluationStage`]s in order on the same geometry. When reference
/// forces are given, the deviation of every step's forces from them enters the reported
/// root-mean-square deviation.
#[derive(Clone, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct SnapForceDriver<'a> {
    /// The control parameters for force evaluation.
    parameters: &'a ForceEvaluationParams,

    /// The SNAP model.
    model: &'a SnapModel,

    /// The neighbour list.
    neighbours: &'a NeighbourList,

    /// Optional reference forces with shape `(ntotal, 3)`.
    #[builder(default = "None")]
    reference_forces: Option<&'a Array2<f64>>,

    /// The result of the force evaluation.
    #[builder(setter(skip), default = "None")]
    result: Option<SnapForceResult>,
}

impl<'a> SnapForceDriverBuilder<'a> {
    fn validate(&self) -> Result<(), String> {
        let params = self
            .parameters
            .ok_or("No force-evaluation parameters found.".to_string())?;
        if params.nsteps == 0 {
            return Err("At least one force evaluation step is required.".to_string());
        }

        let nbrs = self
            .neighbours
            .ok_or("No neighbour list found.".to_string())?;
        if let Some(Some(fref)) = self.reference_forces {
            if fref.dim() != (nbrs.ntotal(), 3) {
                return Err(format!(
                    "Reference forces of shape {:?} do not match {} atoms.",
                    fref.dim(),
                    nbrs.ntotal()
                ));
            }
        }
        Ok(())
    }
}

impl<'a> SnapForceDriver<'a> {
    /// Returns a builder to construct a [`SnapForceDriver`] structure.
    pub fn builder() -> SnapForceDriverBuilder<'a> {
        SnapForceDriverBuilder::default()
    }

    /// Executes the force evaluation.
    fn evaluate_forces(&mut self) -> Result<(), anyhow::Error> {
        log_title("SNAP Force Evaluation");
        qsnap_output!("");
        let params = self.parameters;
        params.log_output_display();
        self.model.params().log_output_display();
        qsnap_output!("");
        ensure!(
            params.nsteps > 0,
            "At least one force evaluation step is required."
        );

        let nbrs = self.neighbours;
        let mut ws = SnapWorkspace::new(self.model, nbrs);
        let mut timings = StageTimings::default();
        let mut sumsqferr = 0.0;

        log_subtitle("Force evaluation");
        qsnap_output!("");
        let start = Instant::now();
        for istep in 0..params.nsteps {
            timings += evaluate_step(self.model, nbrs, &mut ws);
            if let Some(fref) = self.reference_forces {
                sumsqferr += (&ws.forces() - fref).mapv(|x| x * x).sum();
            }
            log::debug!("Force evaluation step {} of {} done.", istep + 1, params.nsteps);
        }
        let duration = start.elapsed();
        qsnap_output!(
            "{} step{} completed in {:.3} s.",
            params.nsteps,
            if params.nsteps == 1 { "" } else { "s" },
            duration.as_secs_f64()
        );
        qsnap_output!("");

        let rms_deviation = self
            .reference_forces
            .map(|_| (sumsqferr / (nbrs.ntotal() * params.nsteps) as f64).sqrt());
        let verdict = rms_deviation.map(|rms| {
            if rms <= params.rms_threshold {
                ForceVerdict::Pass
            } else {
                ForceVerdict::Fail
            }
        });

        let result = SnapForceResult::builder()
            .parameters(params.clone())
            .nlocal(nbrs.nlocal())
            .nghost(nbrs.nghost())
            .ninside(nbrs.ninside())
            .twojmax(self.model.params().twojmax)
            .forces(ws.forces().to_owned())
            .rms_deviation(rms_deviation)
            .verdict(verdict)
            .timings(timings)
            .duration(duration)
            .build()?;
        result.log_output_display();
        qsnap_output!("");

        if let (Some(ForceVerdict::Fail), Some(rms)) = (verdict, rms_deviation) {
            qsnap_warn!(
                "RMS force deviation {rms:.3e} exceeds the threshold of {:.3e}.",
                params.rms_threshold
            );
            qsnap_warn!("");
        }

        if let Some(name) = params.result_save_name.as_ref() {
            write_qsnap_binary(name, QSnapFileType::Frc, &result)?;
            let mut path = name.clone();
            path.set_extension(QSnapFileType::Frc.ext());
            qsnap_output!("Force-evaluation results saved as {}.", path.display());
            qsnap_output!("");
        }

        self.result = Some(result);
        Ok(())
    }
}

impl<'a> QSnapDriver for SnapForceDriver<'a> {
    type Params = ForceEvaluationParams;

    type Outcome = SnapForceResult;

    fn result(&self) -> Result<&Self::Outcome, anyhow::Error> {
        self.result
            .as_ref()
            .ok_or_else(|| format_err!("No force-evaluation results found."))
    }

    fn run(&mut self) -> Result<(), anyhow::Error> {
        self.evaluate_forces()
    }
}
