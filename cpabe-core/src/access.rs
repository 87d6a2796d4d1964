use alloc::collections::BTreeSet;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::curve::CurveScalar;
use crate::lsss;
use crate::policy::{self, PolicyError};

/// Errors that can happen when building an [`AccessStructure`] from its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessStructureError {
    /// The number of matrix rows differs from the number of row labels.
    RowCountMismatch {
        /// Number of matrix rows.
        rows: usize,
        /// Number of attribute labels.
        attributes: usize,
    },
    /// A row has a different length than the first one.
    RaggedMatrix {
        /// Index of the offending row.
        row: usize,
    },
}

impl fmt::Display for AccessStructureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RowCountMismatch { rows, attributes } => write!(
                f,
                "Access structure has {} rows but {} attribute labels",
                rows, attributes
            ),
            Self::RaggedMatrix { row } => {
                write!(f, "Access structure row {} has a mismatched length", row)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for AccessStructureError {}

/// A monotone span program: a matrix `M` over `Z_p`
/// and a labelling of its rows with attributes.
///
/// A set of attributes satisfies the structure when the rows labelled
/// with those attributes span the vector `(1, 0, ..., 0)`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "AccessStructureRepr"))]
pub struct AccessStructure {
    matrix: Vec<Vec<CurveScalar>>,
    row_to_attrib: Vec<String>,
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct AccessStructureRepr {
    matrix: Vec<Vec<CurveScalar>>,
    row_to_attrib: Vec<String>,
}

#[cfg(feature = "serde")]
impl TryFrom<AccessStructureRepr> for AccessStructure {
    type Error = AccessStructureError;

    fn try_from(repr: AccessStructureRepr) -> Result<Self, Self::Error> {
        Self::new(repr.matrix, repr.row_to_attrib)
    }
}

impl AccessStructure {
    /// Creates an access structure from a rectangular matrix and one attribute per row.
    ///
    /// Repeated attributes are accepted here, but such a structure
    /// will be refused by [`encrypt`](`crate::encrypt_with_rng`).
    pub fn new(
        matrix: Vec<Vec<CurveScalar>>,
        row_to_attrib: Vec<String>,
    ) -> Result<Self, AccessStructureError> {
        if matrix.len() != row_to_attrib.len() {
            return Err(AccessStructureError::RowCountMismatch {
                rows: matrix.len(),
                attributes: row_to_attrib.len(),
            });
        }
        if let Some(first) = matrix.first() {
            let cols = first.len();
            if let Some(row) = matrix.iter().position(|row| row.len() != cols) {
                return Err(AccessStructureError::RaggedMatrix { row });
            }
        }
        Ok(Self {
            matrix,
            row_to_attrib,
        })
    }

    /// Creates an access structure from a matrix with small signed entries,
    /// as produced by boolean-formula compilers.
    pub fn from_signed_rows(
        rows: Vec<Vec<i64>>,
        row_to_attrib: Vec<String>,
    ) -> Result<Self, AccessStructureError> {
        let matrix = rows
            .into_iter()
            .map(|row| row.into_iter().map(CurveScalar::from_i64).collect())
            .collect();
        Self::new(matrix, row_to_attrib)
    }

    /// Compiles a boolean policy such as `"dept:HR AND (role:manager OR role:admin)"`.
    pub fn from_policy(policy: &str) -> Result<Self, PolicyError> {
        policy::compile(policy)
    }

    /// Number of rows (one per attribute occurrence).
    pub fn rows(&self) -> usize {
        self.matrix.len()
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.matrix.first().map_or(0, |row| row.len())
    }

    /// The attribute labelling the given row.
    pub fn row_attribute(&self, row: usize) -> Option<&str> {
        self.row_to_attrib.get(row).map(String::as_str)
    }

    /// Iterates over row labels in row order.
    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.row_to_attrib.iter().map(String::as_str)
    }

    /// Returns the first attribute that labels more than one row, if any.
    pub fn repeated_attribute(&self) -> Option<&str> {
        let mut seen = BTreeSet::new();
        self.attributes().find(|attribute| !seen.insert(*attribute))
    }

    pub(crate) fn matrix(&self) -> &[Vec<CurveScalar>] {
        &self.matrix
    }

    /// Returns `(row, alpha_row)` pairs with `sum alpha_row * M_row = (1, 0, ..., 0)`,
    /// using only rows for which `holds` returns `true`.
    /// Rows with a zero coefficient are omitted.
    ///
    /// Returns `None` if the attributes for which `holds` is `true`
    /// do not satisfy the structure.
    pub fn reconstruction_coefficients(
        &self,
        holds: impl Fn(&str) -> bool,
    ) -> Option<Vec<(usize, CurveScalar)>> {
        let selected: Vec<usize> = (0..self.rows())
            .filter(|&row| holds(&self.row_to_attrib[row]))
            .collect();
        let restricted: Vec<&[CurveScalar]> = selected
            .iter()
            .map(|&row| self.matrix[row].as_slice())
            .collect();
        let alpha = lsss::reconstruction_coefficients(&restricted, self.cols())?;
        Some(
            selected
                .into_iter()
                .zip(alpha)
                .filter(|(_, coefficient)| !coefficient.is_zero())
                .collect(),
        )
    }
}
