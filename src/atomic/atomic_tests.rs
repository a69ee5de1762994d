use std::sync::Arc;
use std::thread;

use num_complex::Complex;
use rayon::prelude::*;

use crate::atomic::{AtomicComplexBuffer, AtomicF64};

#[test]
fn test_atomic_f64_fetch_add() {
    let x = AtomicF64::new(1.5);
    assert_eq!(x.fetch_add(2.25), 1.5);
    assert_eq!(x.load(), 3.75);
    x.store(-1.0);
    assert_eq!(x.load(), -1.0);
}

#[test]
fn test_atomic_f64_concurrent_threads() {
    let x = Arc::new(AtomicF64::new(0.0));
    let handles = (0..8)
        .map(|_| {
            let x = Arc::clone(&x);
            thread::spawn(move || {
                for _ in 0..1000 {
                    x.fetch_add(0.5);
                }
            })
        })
        .collect::<Vec<_>>();
    for handle in handles {
        handle.join().unwrap();
    }
    // Sums of halves are exact in binary floating point.
    assert_eq!(x.load(), 4000.0);
}

#[test]
fn test_atomic_complex_buffer_concurrent_adds() {
    let buffer = AtomicComplexBuffer::new(3, 4);
    assert_eq!(buffer.natoms(), 3);
    assert_eq!(buffer.len(), 4);

    (0..30_000usize).into_par_iter().for_each(|i| {
        buffer.add(i % 3, (i / 3) % 4, Complex::new(1.0, -2.0));
    });

    let snapshot = buffer.snapshot();
    assert_eq!(snapshot.dim(), (3, 4));
    for value in snapshot.iter() {
        assert_eq!(*value, Complex::new(2500.0, -5000.0));
    }
}

#[test]
fn test_atomic_complex_buffer_reset() {
    let buffer = AtomicComplexBuffer::new(2, 5);
    buffer.add(1, 3, Complex::new(7.0, 7.0));
    buffer.reset(|slot| {
        if slot % 2 == 0 {
            Complex::new(1.0, 0.0)
        } else {
            Complex::new(0.0, 0.0)
        }
    });
    for atom in 0..2 {
        for slot in 0..5 {
            let expected = if slot % 2 == 0 { 1.0 } else { 0.0 };
            assert_eq!(buffer.load(atom, slot), Complex::new(expected, 0.0));
        }
    }
}

#[test]
#[should_panic(expected = "lies outside an accumulator")]
fn test_atomic_complex_buffer_out_of_range() {
    let buffer = AtomicComplexBuffer::new(2, 5);
    buffer.add(2, 0, Complex::new(1.0, 0.0));
}
