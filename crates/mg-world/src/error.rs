use mg_core::{GridLocation, Layer, ObjectId};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorldError {
    #[error("location {0} is outside the grid")]
    OutOfBounds(GridLocation),

    #[error("cell {loc} already occupied on layer {layer:?}")]
    CellOccupied { loc: GridLocation, layer: Layer },

    #[error("object {0} not found")]
    UnknownObject(ObjectId),
}

pub type WorldResult<T> = Result<T, WorldError>;
