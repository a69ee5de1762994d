use std::env;
use std::fs;

use approx;
use ndarray::Array2;

use crate::dataset::{generate_bcc_dataset, ReferenceData, SyntheticDatasetParams};
use crate::drivers::force_evaluation::{
    ForceEvaluationParams, ForceVerdict, SnapForceDriver, SnapForceResult,
};
use crate::drivers::QSnapDriver;
use crate::io::{read_qsnap_binary, QSnapFileType};
use crate::model::{SnapModel, SnapParams};
use crate::neighbours::NeighbourList;

fn displaced_bcc() -> (ReferenceData, SnapModel, NeighbourList) {
    let params = SyntheticDatasetParams::builder()
        .supercell([2, 2, 2])
        .rcutfac(3.5)
        .ninside(14)
        .twojmax(4)
        .displacement(0.08)
        .seed(11)
        .build()
        .unwrap();
    let data = generate_bcc_dataset(&params).unwrap();
    let model = data.model(&SnapParams::default()).unwrap();
    let nbrs = data.neighbour_list().unwrap();
    (data, model, nbrs)
}

fn run(
    params: &ForceEvaluationParams,
    model: &SnapModel,
    nbrs: &NeighbourList,
    reference: Option<&Array2<f64>>,
) -> SnapForceResult {
    let mut driver = SnapForceDriver::builder()
        .parameters(params)
        .model(model)
        .neighbours(nbrs)
        .reference_forces(reference)
        .build()
        .unwrap();
    assert!(driver.result().is_err());
    assert!(driver.run().is_ok());
    driver.result().unwrap().clone()
}

#[test]
fn test_force_evaluation_params() {
    let params = ForceEvaluationParams::default();
    assert_eq!(params.nsteps, 1);
    assert_eq!(params.rms_threshold, 1e-5);
    assert!(params.result_save_name.is_none());
    assert!(params
        .to_string()
        .contains("Save force-evaluation results to file: no"));

    assert!(ForceEvaluationParams::builder().nsteps(0).build().is_err());

    let from_yaml: ForceEvaluationParams = serde_yaml::from_str("nsteps: 3").unwrap();
    assert_eq!(from_yaml.nsteps, 3);
    assert_eq!(from_yaml.rms_threshold, 1e-5);
}

#[test]
fn test_force_evaluation_without_reference() {
    let (_, model, nbrs) = displaced_bcc();
    let params = ForceEvaluationParams::default();
    let result = run(&params, &model, &nbrs, None);

    assert_eq!(result.nlocal, 16);
    assert_eq!(result.ninside, 14);
    assert_eq!(result.twojmax, 4);
    assert_eq!(result.forces.dim(), (nbrs.ntotal(), 3));
    assert!(result.rms_deviation.is_none());
    assert!(result.verdict.is_none());
    assert!(result.kernel_time() <= result.timings.total());
    assert!(result.to_string().contains("no reference forces"));
    assert!(result.to_string().contains("compute_deidrj"));

    // Forces on all local and ghost atoms balance.
    for k in 0..3 {
        approx::assert_abs_diff_eq!(result.forces.column(k).sum(), 0.0, epsilon = 1e-9);
    }
}

#[test]
fn test_force_evaluation_against_reference() {
    let (_, model, nbrs) = displaced_bcc();
    let params = ForceEvaluationParams::builder().nsteps(2).build().unwrap();
    let first = run(&params, &model, &nbrs, None);

    let passed = run(&params, &model, &nbrs, Some(&first.forces));
    assert_eq!(passed.verdict, Some(ForceVerdict::Pass));
    assert!(passed.rms_deviation.unwrap() < 1e-10);
    assert!(passed.to_string().contains("(PASS)"));

    let mut shifted = first.forces.clone();
    shifted[[0, 0]] += 1.0;
    let failed = run(&params, &model, &nbrs, Some(&shifted));
    assert_eq!(failed.verdict, Some(ForceVerdict::Fail));
    approx::assert_relative_eq!(
        failed.rms_deviation.unwrap(),
        (1.0 / nbrs.ntotal() as f64).sqrt(),
        max_relative = 1e-8
    );
}

#[test]
fn test_force_evaluation_reference_shape_mismatch() {
    let (_, model, nbrs) = displaced_bcc();
    let params = ForceEvaluationParams::default();
    let wrong = Array2::<f64>::zeros((nbrs.nlocal(), 3));
    let driver = SnapForceDriver::builder()
        .parameters(&params)
        .model(&model)
        .neighbours(&nbrs)
        .reference_forces(Some(&wrong))
        .build();
    assert!(driver.is_err());
}

#[test]
fn test_force_evaluation_save_result() {
    let (_, model, nbrs) = displaced_bcc();
    let dir = env::temp_dir().join(format!("qsnap_force_evaluation_{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let name = dir.join("bcc");
    let params = ForceEvaluationParams::builder()
        .result_save_name(Some(name.clone()))
        .build()
        .unwrap();
    let result = run(&params, &model, &nbrs, None);

    let saved: SnapForceResult = read_qsnap_binary(&name, QSnapFileType::Frc).unwrap();
    assert_eq!(saved.forces, result.forces);
    assert_eq!(saved.parameters(), &params);
    fs::remove_dir_all(&dir).unwrap();
}
