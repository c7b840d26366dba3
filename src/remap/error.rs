use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RemapError {
    #[error("no old-mesh cell overlaps new cell {cell}")]
    SearchExhausted { cell: usize },
    #[error("degenerate intersection between new cell {new_cell} and old cell {old_cell} (volume {volume:e})")]
    GeometryDegenerate {
        new_cell: usize,
        old_cell: usize,
        volume: f64,
    },
    #[error(
        "weights of new cell {cell} sum to {actual:e} instead of {expected:e} (relative error {rel_error:e})"
    )]
    ConservationMismatch {
        cell: usize,
        expected: f64,
        actual: f64,
        rel_error: f64,
    },
    #[error("field '{field}' has {actual} values, expected {expected}")]
    SizeMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },
}
