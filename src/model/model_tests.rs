use crate::model::{SnapConfigurationError, SnapModel, SnapParams};
use crate::rotation::SwitchingFunction;

#[test]
fn test_model_default_params() {
    let params = SnapParams::default();
    assert_eq!(params.twojmax, 8);
    assert_eq!(params.rfac0, 0.99363);
    assert_eq!(params.rmin0, 0.0);
    assert_eq!(params.wself, 1.0);
    assert_eq!(params.switching, SwitchingFunction::Cosine);
    assert!(params.validate().is_ok());
    assert!(params.to_string().contains("ncoeff   : 55"));
}

#[test]
fn test_model_new() {
    let params = SnapParams::builder().twojmax(4).rcutfac(3.0).build().unwrap();
    let coeff = (0..15).map(|i| f64::from(i) * 0.1).collect::<Vec<_>>();
    let model = SnapModel::new(&params, &coeff).unwrap();
    assert_eq!(model.ncoeff(), 14);
    assert_eq!(model.coeff()[0], 0.0);
    assert_eq!(model.indices().twojmax(), 4);
    assert_eq!(model.cglist().len(), model.indices().idxcg_max());
    assert_eq!(model.coupling().entries().len(), model.indices().idxz_max());
    assert_eq!(model.params(), &params);
}

#[test]
fn test_model_ncoeff_mismatch() {
    let params = SnapParams::builder().twojmax(4).rcutfac(3.0).build().unwrap();
    let err = SnapModel::new(&params, &[0.0; 14]).unwrap_err();
    let config_err = err.downcast_ref::<SnapConfigurationError>().unwrap();
    assert!(config_err.0.contains("requires 15 coefficients"));
}

#[test]
fn test_model_invalid_params() {
    let bad_rfac0 = SnapParams::builder().twojmax(2).rfac0(1.2).build().unwrap();
    assert!(bad_rfac0.validate().is_err());
    assert!(SnapModel::new(&bad_rfac0, &[0.0; 6])
        .unwrap_err()
        .downcast_ref::<SnapConfigurationError>()
        .is_some());

    let bad_cutoff = SnapParams::builder()
        .twojmax(2)
        .rcutfac(1.0)
        .rmin0(1.5)
        .build()
        .unwrap();
    assert!(bad_cutoff.validate().is_err());
}
