//! Cell-centred fields carried across a remap.

use std::fmt;
use std::ops::{Add, Mul};

use serde::{Deserialize, Serialize};

use crate::Vector;

/// Value type of a cell field that can be remapped.
///
/// Remapping only needs a zero, addition and scaling by a real weight.
pub trait FieldValue: Copy + Send + Sync + Add<Output = Self> + Mul<f64, Output = Self> {
    fn zero() -> Self;
}

impl FieldValue for f64 {
    fn zero() -> Self {
        0.
    }
}

impl FieldValue for Vector {
    fn zero() -> Self {
        Vector::zero()
    }
}

/// Second-order tensor stored row by row.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Tensor(pub [f64; 9]);

impl Tensor {
    pub fn new(xx: f64, xy: f64, xz: f64, yx: f64, yy: f64, yz: f64, zx: f64, zy: f64, zz: f64) -> Self {
        Self([xx, xy, xz, yx, yy, yz, zx, zy, zz])
    }

    pub fn identity() -> Self {
        Self::new(1., 0., 0., 0., 1., 0., 0., 0., 1.)
    }

    pub fn trace(&self) -> f64 {
        self.0[0] + self.0[4] + self.0[8]
    }

    pub fn is_close(&self, other: &Self, tol: f64) -> bool {
        self.0.iter().zip(other.0.iter()).all(|(a, b)| (a - b).abs() <= tol)
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = &self.0;
        write!(
            f,
            "Tensor([{:.3}, {:.3}, {:.3}], [{:.3}, {:.3}, {:.3}], [{:.3}, {:.3}, {:.3}])",
            t[0], t[1], t[2], t[3], t[4], t[5], t[6], t[7], t[8]
        )
    }
}

impl Add for Tensor {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        let mut out = self.0;
        for (o, b) in out.iter_mut().zip(other.0.iter()) {
            *o += b;
        }
        Self(out)
    }
}

impl Mul<f64> for Tensor {
    type Output = Self;

    fn mul(self, s: f64) -> Self {
        Self(self.0.map(|v| v * s))
    }
}

impl FieldValue for Tensor {
    fn zero() -> Self {
        Self([0.; 9])
    }
}

/// Field with one value per cell and a list of boundary patch values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolField<T> {
    pub name: String,
    pub values: Vec<T>,
    pub patches: Vec<Vec<T>>,
}

impl<T: FieldValue> VolField<T> {
    pub fn new(name: &str, values: Vec<T>) -> Self {
        Self {
            name: name.to_string(),
            values,
            patches: Vec::new(),
        }
    }

    /// Field of `n_cells` copies of `value`.
    pub fn uniform(name: &str, n_cells: usize, value: T) -> Self {
        Self::new(name, vec![value; n_cells])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Volume integral of the field, given the cell volumes of its mesh.
    pub fn integral(&self, volumes: &[f64]) -> T {
        self.values
            .iter()
            .zip(volumes)
            .fold(T::zero(), |acc, (&v, &vol)| acc + v * vol)
    }
}

/// Boundary patch mapping between the meshes.
///
/// Only the null mapping exists: nothing is mapped, the host is expected
/// to set boundary values through its own machinery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatchMapper {
    #[default]
    Null,
}

impl PatchMapper {
    /// Number of values produced by the mapping.
    pub fn size(&self) -> usize {
        match self {
            PatchMapper::Null => 0,
        }
    }

    /// Number of values before the mapping.
    pub fn size_before_mapping(&self) -> usize {
        match self {
            PatchMapper::Null => 0,
        }
    }

    /// Whether each target face takes its value from exactly one source face.
    pub fn direct(&self) -> bool {
        match self {
            PatchMapper::Null => false,
        }
    }

    pub fn map_patch<T: FieldValue>(&self, _from: &[T]) -> Vec<T> {
        match self {
            PatchMapper::Null => Vec::with_capacity(self.size()),
        }
    }
}
