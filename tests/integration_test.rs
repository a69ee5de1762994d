use std::env;
use std::fs;

use approx;
use env_logger;
use ndarray::Array2;

use qsnap::bispectrum::total_energy;
use qsnap::dataset::{generate_bcc_dataset, ReferenceData, SyntheticDatasetParams};
use qsnap::drivers::force_evaluation::{ForceEvaluationParams, ForceVerdict, SnapForceDriver};
use qsnap::drivers::QSnapDriver;
use qsnap::interfaces::input::{DatasetSource, Input};
use qsnap::interfaces::InputHandle;
use qsnap::model::{SnapModel, SnapParams};
use qsnap::neighbours::NeighbourList;

fn displaced_bcc(twojmax: usize) -> ReferenceData {
    let params = SyntheticDatasetParams::builder()
        .supercell([2, 2, 2])
        .rcutfac(3.5)
        .ninside(14)
        .twojmax(twojmax)
        .displacement(0.1)
        .seed(2024)
        .build()
        .unwrap();
    generate_bcc_dataset(&params).unwrap()
}

/// Computes forces on all local and ghost atoms as central finite differences of the total
/// energy, moving one atom at a time through the displacements that involve it.
fn finite_difference_forces(model: &SnapModel, nbrs: &NeighbourList) -> Array2<f64> {
    let h = 1e-5;
    Array2::from_shape_fn((nbrs.ntotal(), 3), |(moved, k)| {
        let shifted = |step: f64| {
            nbrs.map_displacements(|atom, nbor, rij| {
                let mut rij = *rij;
                if nbrs.of_atom(atom)[nbor].index == moved {
                    rij[k] += step;
                }
                if atom == moved {
                    rij[k] -= step;
                }
                rij
            })
        };
        let e_plus = total_energy(model, &shifted(h));
        let e_minus = total_energy(model, &shifted(-h));
        -(e_plus - e_minus) / (2.0 * h)
    })
}

#[test]
fn test_forces_match_finite_difference_reference() {
    let mut data = displaced_bcc(4);
    let model = data.model(&SnapParams::default()).unwrap();
    let nbrs = data.neighbour_list().unwrap();
    let reference = finite_difference_forces(&model, &nbrs);
    data.fj = Some(reference.iter().copied().collect());
    assert!(data.validate().is_ok());

    let params = ForceEvaluationParams::builder().nsteps(2).build().unwrap();
    let fref = data.reference_forces().unwrap();
    let mut driver = SnapForceDriver::builder()
        .parameters(&params)
        .model(&model)
        .neighbours(&nbrs)
        .reference_forces(Some(&fref))
        .build()
        .unwrap();
    driver.run().unwrap();
    let result = driver.result().unwrap();

    assert_eq!(result.verdict, Some(ForceVerdict::Pass));
    assert!(result.rms_deviation.unwrap() <= 1e-5);
    for (f, fd) in result.forces.iter().zip(reference.iter()) {
        approx::assert_relative_eq!(f, fd, epsilon = 1e-5, max_relative = 1e-5);
    }
}

#[test]
fn test_fresh_runs_agree() {
    let data = displaced_bcc(6);
    let model = data.model(&SnapParams::default()).unwrap();
    let nbrs = data.neighbour_list().unwrap();
    let params = ForceEvaluationParams::default();

    let forces = (0..2)
        .map(|_| {
            let mut driver = SnapForceDriver::builder()
                .parameters(&params)
                .model(&model)
                .neighbours(&nbrs)
                .build()
                .unwrap();
            driver.run().unwrap();
            driver.result().unwrap().forces.clone()
        })
        .collect::<Vec<_>>();
    for (a, b) in forces[0].iter().zip(forces[1].iter()) {
        approx::assert_relative_eq!(a, b, epsilon = 1e-10, max_relative = 1e-12);
    }
    for k in 0..3 {
        approx::assert_abs_diff_eq!(forces[0].column(k).sum(), 0.0, epsilon = 1e-9);
    }
}

#[test]
fn test_input_from_binary_dataset() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut data = displaced_bcc(2);
    let model = data.model(&SnapParams::default()).unwrap();
    let nbrs = data.neighbour_list().unwrap();
    data.fj = Some(finite_difference_forces(&model, &nbrs).iter().copied().collect());

    let dir = env::temp_dir().join(format!("qsnap_integration_{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let name = dir.join("bcc_2j2");
    data.write_binary(&name).unwrap();

    let mut input = Input {
        dataset: DatasetSource::Binary { name },
        ..Default::default()
    };
    input.force_evaluation.result_save_name = Some(dir.join("bcc_2j2_forces"));
    assert!(input.handle().is_ok());
    assert!(dir.join("bcc_2j2_forces.qsnap.frc").exists());
    fs::remove_dir_all(&dir).unwrap();
}
