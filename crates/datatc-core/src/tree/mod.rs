pub mod listing;
pub mod node;
pub mod select;

pub use listing::Listing;
pub use node::{DirectoryNode, Loaded, NodeKind};
