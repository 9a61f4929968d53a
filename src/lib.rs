pub mod error;
pub mod math;
pub mod shape;

pub use error::{GeonavError, Result};
pub use shape::{Distance, QueryMode, Shape, Solid};
