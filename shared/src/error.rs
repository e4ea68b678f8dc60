use std::fmt;

/// A polygon algebra operation that could not produce a single well-formed ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryOpFailed {
    /// One of the operands has zero area or non-finite coordinates.
    DegenerateInput,
    /// The union produced more than one polygon (operands are disjoint).
    Disjoint,
    /// The operation produced no polygon where one was required.
    EmptyResult,
}

impl fmt::Display for GeometryOpFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryOpFailed::DegenerateInput => write!(f, "degenerate input ring"),
            GeometryOpFailed::Disjoint => write!(f, "operands do not form a single polygon"),
            GeometryOpFailed::EmptyResult => write!(f, "operation produced no polygon"),
        }
    }
}

impl std::error::Error for GeometryOpFailed {}

/// Input rejected at a boundary (path too short, malformed coordinates, unknown owner).
#[derive(Debug, Clone, PartialEq)]
pub enum InvalidInput {
    TooFewPoints { distinct: usize },
    NonFiniteCoordinate { lat: f64, lng: f64 },
    ZeroArea,
    UnknownOwner(String),
}

impl fmt::Display for InvalidInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidInput::TooFewPoints { distinct } => {
                write!(f, "need at least 3 distinct points, got {distinct}")
            }
            InvalidInput::NonFiniteCoordinate { lat, lng } => {
                write!(f, "non-finite coordinate [{lat}, {lng}]")
            }
            InvalidInput::ZeroArea => write!(f, "ring encloses no area"),
            InvalidInput::UnknownOwner(name) => write!(f, "unknown owner color {name:?}"),
        }
    }
}

impl std::error::Error for InvalidInput {}

/// A call to the territory store failed. Local optimistic state is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Transport-level failure (connection refused, timeout, bad gateway).
    Unavailable(String),
    /// The store answered but refused the request.
    Rejected { status: u16, message: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unavailable(reason) => write!(f, "store unavailable: {reason}"),
            StoreError::Rejected { status, message } => {
                write!(f, "store rejected request ({status}): {message}")
            }
        }
    }
}

impl std::error::Error for StoreError {}
