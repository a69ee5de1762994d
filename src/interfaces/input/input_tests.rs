use std::path::PathBuf;

use crate::dataset::SyntheticDatasetParams;
use crate::interfaces::InputHandle;
use crate::io::read_qsnap_yaml;
use crate::rotation::SwitchingFunction;

use super::{DatasetSource, Input};

const ROOT: &str = env!("CARGO_MANIFEST_DIR");

#[test]
fn test_interfaces_input_synthetic() {
    let name = format!("{ROOT}/tests/input/test_input_synthetic.yml");
    let inp = read_qsnap_yaml::<Input, _>(&name).unwrap();

    if let DatasetSource::Synthetic(params) = &inp.dataset {
        assert_eq!(params.supercell, [2, 2, 2]);
        assert_eq!(params.rcutfac, 3.5);
        assert_eq!(params.ninside, 14);
        assert_eq!(params.twojmax, 2);
        assert_eq!(params.displacement, 0.05);
        assert_eq!(params.seed, 3);
        assert_eq!(params.lattice_constant, 3.1803);
    } else {
        panic!("Expected a synthetic dataset.");
    }
    assert_eq!(inp.snap.rfac0, 0.95);
    assert_eq!(inp.snap.rmin0, 0.0);
    assert_eq!(inp.snap.switching, SwitchingFunction::Cosine);
    assert_eq!(inp.force_evaluation.nsteps, 2);
    assert_eq!(inp.force_evaluation.rms_threshold, 1e-6);
    assert!(inp.force_evaluation.result_save_name.is_none());

    assert!(inp.handle().is_ok());
}

#[test]
fn test_interfaces_input_binary() {
    let name = format!("{ROOT}/tests/input/test_input_binary.yml");
    let inp = read_qsnap_yaml::<Input, _>(&name).unwrap();
    assert_eq!(
        inp.dataset,
        DatasetSource::Binary {
            name: PathBuf::from("tests/ref/bcc_2j2")
        }
    );
    assert_eq!(
        inp.force_evaluation.result_save_name,
        Some(PathBuf::from("bcc_2j2_forces"))
    );
    assert_eq!(inp.force_evaluation.nsteps, 1);
}

#[test]
fn test_interfaces_input_defaults() {
    let name = format!("{ROOT}/tests/input/test_input_defaults.yml");
    let inp = read_qsnap_yaml::<Input, _>(&name).unwrap();
    assert_eq!(
        inp.dataset,
        DatasetSource::Synthetic(SyntheticDatasetParams::default())
    );
    assert_eq!(inp.snap, Default::default());
    assert_eq!(inp.force_evaluation.nsteps, 5);
}

#[test]
fn test_interfaces_input_missing_dataset_file() {
    let inp = Input {
        dataset: DatasetSource::Yaml {
            path: PathBuf::from(format!("{ROOT}/tests/input/does_not_exist.yml")),
        },
        ..Default::default()
    };
    assert!(inp.handle().is_err());
}
