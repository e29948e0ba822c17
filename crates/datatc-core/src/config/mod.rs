pub mod projects;

pub use projects::{ProjectRegistry, ProjectResolver, REGISTRY_ENV};
