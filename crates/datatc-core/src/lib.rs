//! Project-scoped navigation of data directories, format-dispatched load and
//! save, and self-aware datasets that carry the history of transforms that
//! produced them.
//!
//! ```no_run
//! use datatc_core::provenance::LoadOptions;
//! use datatc_core::{DataContext, DirectoryNode};
//!
//! # fn main() -> Result<(), datatc_core::DataError> {
//! let root = DirectoryNode::open("/data/sales", DataContext::default().into_shared())?;
//! let latest = root.get("extracts")?.latest()?;
//! let data = latest.load(&LoadOptions::new())?.into_data();
//! # let _ = data;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod data;
pub mod error;
pub mod format;
pub mod kwargs;
pub mod provenance;
pub mod tree;
pub mod vcs;

pub use config::{ProjectRegistry, ProjectResolver};
pub use context::DataContext;
pub use data::{Data, Table};
pub use error::DataError;
pub use format::{Codec, FormatRegistry};
pub use kwargs::Kwargs;
pub use provenance::{SelfAwareData, Transform, TransformOptions, TransformRecord};
pub use tree::{DirectoryNode, Listing, Loaded, NodeKind};
pub use vcs::{GitVersionControl, VersionControl};
