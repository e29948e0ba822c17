pub mod artifact;
pub mod loader;
pub mod record;
pub mod transform;
pub mod unit;

pub use artifact::{LoadOptions, SelfAwareData};
pub use loader::{NoLoader, TransformCatalog, TransformLoader};
pub use record::{TransformOptions, TransformRecord, UNTRACKED};
pub use transform::{Transform, TransformFn, TransformSource};
pub use unit::{is_unit_dir, Provenance, UnitInfo, UnitName};
