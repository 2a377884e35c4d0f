//! Array nodes and array-shape algebra.
//!
//! Cells are stored flat in row-major order: the rightmost index varies
//! fastest. [`IndexCursor`] walks the logical indices in the same order
//! with a carrying increment over the dimension lengths.

use serde::{Deserialize, Serialize};

use super::GraphError;
use crate::types::TypeRef;
use crate::value::{Primitive, Value};

/// Structural classification of an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArrayKind {
    /// Rank 1 with non-array elements.
    Single,
    /// Rank 1 whose elements are themselves arrays.
    Jagged,
    /// Rank greater than 1.
    Rectangular,
}

/// Number of cells for the given dimension lengths, or `None` if a length
/// is negative or the product overflows.
pub fn cell_count(lengths: &[i32]) -> Option<usize> {
    lengths.iter().try_fold(1usize, |acc, &len| {
        usize::try_from(len).ok().and_then(|len| acc.checked_mul(len))
    })
}

/// An array instance of any rank, with optional non-zero lower bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ArrayParts", into = "ArrayParts")]
pub struct ArrayNode {
    element: TypeRef,
    lengths: Vec<i32>,
    lower_bounds: Vec<i32>,
    cells: Vec<Value>,
}

/// Unvalidated serde form of [`ArrayNode`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ArrayParts {
    element: TypeRef,
    lengths: Vec<i32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    lower_bounds: Vec<i32>,
    cells: Vec<Value>,
}

impl TryFrom<ArrayParts> for ArrayNode {
    type Error = GraphError;

    fn try_from(parts: ArrayParts) -> Result<Self, Self::Error> {
        let lower_bounds = if parts.lower_bounds.is_empty() {
            vec![0; parts.lengths.len()]
        } else {
            parts.lower_bounds
        };
        ArrayNode::from_parts(parts.element, parts.lengths, lower_bounds, parts.cells)
    }
}

impl From<ArrayNode> for ArrayParts {
    fn from(node: ArrayNode) -> Self {
        let lower_bounds = if node.has_offset() {
            node.lower_bounds
        } else {
            Vec::new()
        };
        ArrayParts {
            element: node.element,
            lengths: node.lengths,
            lower_bounds,
            cells: node.cells,
        }
    }
}

impl ArrayNode {
    /// A zero-based, rank-1 array holding the given cells.
    pub fn new(element: TypeRef, cells: Vec<Value>) -> Self {
        let len = i32::try_from(cells.len()).unwrap_or(i32::MAX);
        Self {
            element,
            lengths: vec![len],
            lower_bounds: vec![0],
            cells,
        }
    }

    /// An array of the given shape with every cell set to the element
    /// type's default (zero for primitives, null otherwise).
    pub fn with_shape(
        element: TypeRef,
        lengths: Vec<i32>,
        lower_bounds: Vec<i32>,
    ) -> Result<Self, GraphError> {
        let count = Self::check_shape(&lengths, &lower_bounds)?;
        let fill = match element.as_primitive() {
            Some(p) => Value::Primitive(Primitive::default_for(p)),
            None => Value::Null,
        };
        Ok(Self {
            element,
            lengths,
            lower_bounds,
            cells: vec![fill; count],
        })
    }

    /// Assemble an array from explicit parts, validating the cell count.
    pub fn from_parts(
        element: TypeRef,
        lengths: Vec<i32>,
        lower_bounds: Vec<i32>,
        cells: Vec<Value>,
    ) -> Result<Self, GraphError> {
        let count = Self::check_shape(&lengths, &lower_bounds)?;
        if count != cells.len() {
            return Err(GraphError::CellCountMismatch {
                expected: count,
                found: cells.len(),
            });
        }
        Ok(Self {
            element,
            lengths,
            lower_bounds,
            cells,
        })
    }

    /// Validate dimension lengths and lower bounds, returning the cell count.
    pub fn check_shape(lengths: &[i32], lower_bounds: &[i32]) -> Result<usize, GraphError> {
        if lengths.is_empty() {
            return Err(GraphError::InvalidShape("rank must be at least 1".into()));
        }
        if lengths.len() != lower_bounds.len() {
            return Err(GraphError::InvalidShape(format!(
                "{} lengths but {} lower bounds",
                lengths.len(),
                lower_bounds.len()
            )));
        }
        if let Some(len) = lengths.iter().find(|&&len| len < 0) {
            return Err(GraphError::InvalidShape(format!("negative length {len}")));
        }
        for (len, lb) in lengths.iter().zip(lower_bounds) {
            if lb.checked_add(*len).is_none() {
                return Err(GraphError::InvalidShape(format!(
                    "lower bound {lb} with length {len} overflows"
                )));
            }
        }
        cell_count(lengths).ok_or_else(|| GraphError::InvalidShape("too many cells".into()))
    }

    pub fn element(&self) -> &TypeRef {
        &self.element
    }

    pub fn rank(&self) -> usize {
        self.lengths.len()
    }

    pub fn lengths(&self) -> &[i32] {
        &self.lengths
    }

    pub fn lower_bounds(&self) -> &[i32] {
        &self.lower_bounds
    }

    /// Whether any dimension starts at a non-zero index.
    pub fn has_offset(&self) -> bool {
        self.lower_bounds.iter().any(|&lb| lb != 0)
    }

    pub fn kind(&self) -> ArrayKind {
        if self.rank() > 1 {
            ArrayKind::Rectangular
        } else if self.element.is_array() {
            ArrayKind::Jagged
        } else {
            ArrayKind::Single
        }
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> &[Value] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [Value] {
        &mut self.cells
    }

    /// Row-major position of a logical index, honoring lower bounds.
    pub fn flat_index(&self, index: &[i32]) -> Option<usize> {
        if index.len() != self.rank() {
            return None;
        }
        let mut flat = 0usize;
        for ((&i, &lb), &len) in index.iter().zip(&self.lower_bounds).zip(&self.lengths) {
            let offset = i.checked_sub(lb)?;
            if offset < 0 || offset >= len {
                return None;
            }
            flat = flat * len as usize + offset as usize;
        }
        Some(flat)
    }

    pub fn get(&self, index: &[i32]) -> Option<&Value> {
        self.flat_index(index).map(|i| &self.cells[i])
    }

    pub fn set(&mut self, index: &[i32], value: Value) -> Result<(), GraphError> {
        let flat = self
            .flat_index(index)
            .ok_or_else(|| GraphError::IndexOutOfBounds(index.to_vec()))?;
        self.cells[flat] = value;
        Ok(())
    }

    /// Logical indices in storage order.
    pub fn indices(&self) -> IndexCursor {
        IndexCursor::new(&self.lengths, &self.lower_bounds)
    }

    /// Cells paired with their logical indices.
    pub fn iter_indexed(&self) -> impl Iterator<Item = (Vec<i32>, &Value)> {
        self.indices().zip(self.cells.iter())
    }
}

/// Row-major walk over the logical indices of an array shape.
#[derive(Debug, Clone)]
pub struct IndexCursor {
    lengths: Vec<i32>,
    lower_bounds: Vec<i32>,
    current: Vec<i32>,
    remaining: usize,
}

impl IndexCursor {
    pub fn new(lengths: &[i32], lower_bounds: &[i32]) -> Self {
        Self {
            lengths: lengths.to_vec(),
            lower_bounds: lower_bounds.to_vec(),
            current: lower_bounds.to_vec(),
            remaining: cell_count(lengths).unwrap_or(0),
        }
    }

    /// Advance `current` by one cell, carrying into lower dimensions.
    fn increment(&mut self) {
        for dim in (0..self.current.len()).rev() {
            self.current[dim] += 1;
            if self.current[dim] - self.lower_bounds[dim] < self.lengths[dim] {
                return;
            }
            self.current[dim] = self.lower_bounds[dim];
        }
    }
}

impl Iterator for IndexCursor {
    type Item = Vec<i32>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let out = self.current.clone();
        self.remaining -= 1;
        if self.remaining > 0 {
            self.increment();
        }
        Some(out)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}
