pub mod assumptions;
pub mod error;
pub mod metrics;
pub mod model;
pub mod numeric;
pub mod traits;
pub mod types;

pub use assumptions::*;
pub use error::*;
pub use metrics::*;
pub use model::*;
pub use traits::*;
pub use types::*;
