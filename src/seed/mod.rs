pub mod loader;
pub mod manifest;
pub mod report;
pub mod unit;
pub mod validate;

pub use loader::BulkLoader;
pub use manifest::{discover_manifests, Manifest};
pub use report::{LoadReport, SeedStats};
pub use unit::{LoadMode, ManifestUnit, SeedContext, SeedUnit};
pub use validate::{validate_manifest, ValidationReport};
