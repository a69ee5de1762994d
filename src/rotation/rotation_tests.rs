use approx;
use nalgebra::Vector3;
use ndarray::{Array1, Array2};
use num_complex::Complex;
use num_traits::Zero;

use crate::indexing::SnapIndices;
use crate::model::SnapParams;
use crate::rotation::{compute_duarray, compute_uarray, CayleyKlein, SwitchingFunction};

fn uarray(
    idx: &SnapIndices,
    rij: &Vector3<f64>,
    rcut: f64,
    params: &SnapParams,
) -> Array1<Complex<f64>> {
    let ck = CayleyKlein::new(rij, rcut, params);
    let mut ulist = Array1::<Complex<f64>>::zeros(idx.idxu_max());
    compute_uarray(idx, &ck, ulist.view_mut());
    ulist
}

#[test]
fn test_rotation_switching_function() {
    let cosine = SwitchingFunction::Cosine;
    assert_eq!(cosine.sfac(3.0, 3.0, 0.0), 0.0);
    assert_eq!(cosine.sfac(3.0 + 1e-12, 3.0, 0.0), 0.0);
    assert_eq!(cosine.dsfac(3.5, 3.0, 0.0), 0.0);
    assert_eq!(cosine.sfac(0.5, 3.0, 0.5), 1.0);
    assert_eq!(cosine.dsfac(0.5, 3.0, 0.5), 0.0);
    approx::assert_relative_eq!(cosine.sfac(1.5, 3.0, 0.0), 0.5, epsilon = 1e-14);
    approx::assert_relative_eq!(
        cosine.dsfac(1.5, 3.0, 0.0),
        -0.5 * std::f64::consts::PI / 3.0,
        epsilon = 1e-14,
        max_relative = 1e-14
    );

    // The derivative is the slope of the function.
    let h = 1e-6;
    for r in [0.3, 1.1, 2.2, 2.9] {
        let fd = (cosine.sfac(r + h, 3.0, 0.2) - cosine.sfac(r - h, 3.0, 0.2)) / (2.0 * h);
        approx::assert_abs_diff_eq!(cosine.dsfac(r, 3.0, 0.2), fd, epsilon = 1e-8);
    }

    let none = SwitchingFunction::None;
    assert_eq!(none.sfac(10.0, 3.0, 0.0), 1.0);
    assert_eq!(none.dsfac(1.0, 3.0, 0.0), 0.0);
}

#[test]
fn test_rotation_cayley_klein_unit_norm() {
    let params = SnapParams::builder().twojmax(2).rcutfac(3.0).build().unwrap();
    let ck = CayleyKlein::new(&Vector3::new(0.4, -1.3, 0.9), 3.0, &params);
    approx::assert_relative_eq!(ck.a.norm_sqr() + ck.b.norm_sqr(), 1.0, epsilon = 1e-14);

    // A displacement along z leaves b = 0.
    let ck_z = CayleyKlein::new(&Vector3::new(0.0, 0.0, 1.0), 3.0, &params);
    assert_eq!(ck_z.b, Complex::zero());
    approx::assert_relative_eq!(ck_z.a.norm(), 1.0, epsilon = 1e-14);
}

#[test]
fn test_rotation_uarray_level_one() {
    let params = SnapParams::builder().twojmax(2).rcutfac(3.0).build().unwrap();
    let idx = SnapIndices::new(2);
    let rij = Vector3::new(0.4, -1.3, 0.9);
    let ck = CayleyKlein::new(&rij, 3.0, &params);
    let ulist = uarray(&idx, &rij, 3.0, &params);

    assert_eq!(ulist[0], Complex::new(1.0, 0.0));
    let level_one = [
        ((0, 0), ck.a.conj()),
        ((0, 1), -ck.b.conj()),
        ((1, 0), ck.b),
        ((1, 1), ck.a),
    ];
    for ((mb, ma), expected) in level_one {
        let u = ulist[idx.idxu(1, mb, ma)];
        approx::assert_abs_diff_eq!((u - expected).norm(), 0.0, epsilon = 1e-15);
    }
}

#[test]
fn test_rotation_uarray_unitary() {
    let twojmax = 6;
    let params = SnapParams::builder().twojmax(twojmax).rcutfac(3.5).build().unwrap();
    let idx = SnapIndices::new(twojmax);
    let ulist = uarray(&idx, &Vector3::new(0.7, -1.1, 1.9), 3.5, &params);

    for j in 0..=twojmax {
        for mb in 0..=j {
            for mbp in 0..=j {
                let overlap = (0..=j)
                    .map(|ma| ulist[idx.idxu(j, mb, ma)] * ulist[idx.idxu(j, mbp, ma)].conj())
                    .sum::<Complex<f64>>();
                let expected = if mb == mbp { 1.0 } else { 0.0 };
                approx::assert_abs_diff_eq!(overlap.re, expected, epsilon = 1e-13);
                approx::assert_abs_diff_eq!(overlap.im, 0.0, epsilon = 1e-13);
            }
        }
    }
}

#[test]
fn test_rotation_duarray_finite_difference() {
    let twojmax = 6;
    let rcut = 3.5;
    let wj = 0.8;
    let params = SnapParams::builder().twojmax(twojmax).rcutfac(rcut).build().unwrap();
    let idx = SnapIndices::new(twojmax);
    let rij = Vector3::new(0.7, -1.1, 1.9);

    let ck = CayleyKlein::new(&rij, rcut, &params);
    let sfac = params.switching.sfac(ck.r(), rcut, params.rmin0) * wj;
    let dsfac = params.switching.dsfac(ck.r(), rcut, params.rmin0) * wj;
    let ulist = uarray(&idx, &rij, rcut, &params);
    let mut dulist = Array2::<Complex<f64>>::zeros((idx.idxdu_max(), 3));
    compute_duarray(&idx, &ck, sfac, dsfac, ulist.view(), dulist.view_mut());

    let h = 1e-6;
    let weighted = |r: &Vector3<f64>| {
        let s = params.switching.sfac(r.norm(), rcut, params.rmin0) * wj;
        uarray(&idx, r, rcut, &params).mapv(|u| s * u)
    };
    for k in 0..3 {
        let mut rp = rij;
        let mut rm = rij;
        rp[k] += h;
        rm[k] -= h;
        let up = weighted(&rp);
        let um = weighted(&rm);
        for j in 0..=twojmax {
            for mb in 0..=j / 2 {
                for ma in 0..=j {
                    let jju = idx.idxu(j, mb, ma);
                    let fd = (up[jju] - um[jju]) / (2.0 * h);
                    let du = dulist[[idx.idxdu(j, mb, ma), k]];
                    approx::assert_abs_diff_eq!((du - fd).norm(), 0.0, epsilon = 1e-8);
                }
            }
        }
    }
}
