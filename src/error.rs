use thiserror::Error;

/// Top-level error type for the geonav kernel.
#[derive(Debug, Error)]
pub enum GeonavError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Composite(#[from] CompositeError),

    #[error(transparent)]
    Parameter(#[from] ParameterError),
}

/// Errors raised while validating shape dimensions.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("parameter {parameter} = {value} is out of range [{min}, {max}]")]
    ParameterOutOfRange {
        parameter: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("zero-length vector")]
    ZeroVector,
}

/// Errors raised while resolving deferred dimensions against a mother shape.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("invalid mother shape: {0}")]
    InvalidMother(String),

    #[error("cannot resolve {0} from the mother shape")]
    Unresolvable(&'static str),
}

/// Errors in the structure of a composite shape.
#[derive(Debug, Error)]
pub enum CompositeError {
    #[error("component index {index} out of range (composite has {len} components)")]
    ComponentIndex { index: usize, len: usize },

    #[error("composite shape has no components")]
    Empty,
}

/// Errors in parameter-array shape definitions.
#[derive(Debug, Error)]
pub enum ParameterError {
    #[error("unknown shape kind: {0}")]
    UnknownShape(String),

    #[error("{shape} expects {expected} parameters, got {got}")]
    Count {
        shape: &'static str,
        expected: usize,
        got: usize,
    },
}

/// Convenience type alias for results using [`GeonavError`].
pub type Result<T> = std::result::Result<T, GeonavError>;
