//! Lock-free floating-point accumulators for concurrent reductions.
//!
//! The standard library offers no atomic floating-point types, so each `f64` is stored as its
//! bit pattern in an [`AtomicU64`] and updated through a compare-and-swap loop.

use std::sync::atomic::{AtomicU64, Ordering};

use ndarray::Array2;
use num_complex::Complex;
use rayon::prelude::*;

#[cfg(test)]
#[path = "atomic_tests.rs"]
mod atomic_tests;

/// An `f64` that can be shared between threads and accumulated into atomically.
#[derive(Debug, Default)]
pub struct AtomicF64(AtomicU64);

impl AtomicF64 {
    /// Creates an accumulator holding `value`.
    pub fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    /// The current value.
    pub fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    /// Overwrites the current value.
    pub fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Atomically adds `value` and returns the previous value.
    ///
    /// Only the accumulation itself is atomic; no ordering with respect to other memory
    /// locations is implied.
    pub fn fetch_add(&self, value: f64) -> f64 {
        let mut current = self.0.load(Ordering::Relaxed);
        loop {
            let updated = (f64::from_bits(current) + value).to_bits();
            match self
                .0
                .compare_exchange_weak(current, updated, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(previous) => return f64::from_bits(previous),
                Err(actual) => current = actual,
            }
        }
    }
}

/// A complex number whose real and imaginary parts are accumulated independently and
/// atomically.
#[derive(Debug, Default)]
pub struct AtomicComplex {
    re: AtomicF64,
    im: AtomicF64,
}

impl AtomicComplex {
    /// Creates an accumulator holding `value`.
    pub fn new(value: Complex<f64>) -> Self {
        Self {
            re: AtomicF64::new(value.re),
            im: AtomicF64::new(value.im),
        }
    }

    /// The current value.
    pub fn load(&self) -> Complex<f64> {
        Complex::new(self.re.load(), self.im.load())
    }

    /// Overwrites both parts.
    pub fn store(&self, value: Complex<f64>) {
        self.re.store(value.re);
        self.im.store(value.im);
    }

    /// Atomically adds the real and imaginary parts of `value`, each on its own.
    pub fn fetch_add(&self, value: Complex<f64>) {
        self.re.fetch_add(value.re);
        self.im.fetch_add(value.im);
    }
}

/// A per-atom table of atomic complex accumulators with shape `(natoms, len)`.
///
/// This is the shared target of the concurrent `U` and `Y` accumulations: many parallel lanes
/// add into the same slot of the same atom, and every such write must be an atomic add.
#[derive(Debug)]
pub struct AtomicComplexBuffer {
    natoms: usize,
    len: usize,
    cells: Vec<AtomicComplex>,
}

impl AtomicComplexBuffer {
    /// Allocates a zero-filled buffer.
    ///
    /// # Arguments
    ///
    /// * `natoms` - The number of atoms.
    /// * `len` - The number of complex slots per atom.
    pub fn new(natoms: usize, len: usize) -> Self {
        let cells = (0..natoms * len)
            .map(|_| AtomicComplex::default())
            .collect::<Vec<_>>();
        Self { natoms, len, cells }
    }

    /// The number of atoms.
    pub fn natoms(&self) -> usize {
        self.natoms
    }

    /// The number of complex slots per atom.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer holds no slots at all.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn cell(&self, atom: usize, slot: usize) -> &AtomicComplex {
        assert!(
            atom < self.natoms && slot < self.len,
            "Slot ({atom}, {slot}) lies outside an accumulator of shape ({}, {}).",
            self.natoms,
            self.len
        );
        &self.cells[atom * self.len + slot]
    }

    /// Resets every atom's slots in parallel, slot `k` of each atom receiving `init(k)`.
    pub fn reset<F>(&self, init: F)
    where
        F: Fn(usize) -> Complex<f64> + Sync,
    {
        let len = self.len;
        self.cells
            .par_iter()
            .enumerate()
            .for_each(|(i, cell)| cell.store(init(i % len)));
    }

    /// Atomically adds `value` into slot `slot` of atom `atom`.
    ///
    /// # Panics
    ///
    /// Panics if the slot lies outside the buffer.
    pub fn add(&self, atom: usize, slot: usize, value: Complex<f64>) {
        self.cell(atom, slot).fetch_add(value);
    }

    /// Reads slot `slot` of atom `atom`.
    ///
    /// # Panics
    ///
    /// Panics if the slot lies outside the buffer.
    pub fn load(&self, atom: usize, slot: usize) -> Complex<f64> {
        self.cell(atom, slot).load()
    }

    /// Copies the accumulated values into a plain array of shape `(natoms, len)`. Called once
    /// all writers have finished.
    pub fn snapshot(&self) -> Array2<Complex<f64>> {
        Array2::from_shape_fn((self.natoms, self.len), |(atom, slot)| {
            self.cells[atom * self.len + slot].load()
        })
    }
}
