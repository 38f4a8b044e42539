mod macros;

pub mod error;
pub mod maintenance;
pub mod model;
pub mod sequencing;
pub mod slug;
pub mod validation;

pub use error::{CatalogError, CatalogResult};
pub use sequencing::{Resequencer, SequenceReport, SequenceScope};
