mod configmap;
mod error;
mod model;

pub use configmap::*;
pub use error::*;
pub use model::*;
