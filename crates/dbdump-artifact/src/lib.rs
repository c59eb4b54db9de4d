//! Artifact contracts: directory layout, manifest and metadata documents,
//! and the consistency checks that tie flat files to their descriptors.

pub mod atomic;
pub mod layout;
pub mod manifest;
pub mod validate;

pub use atomic::{write_bytes_atomic, write_json_atomic};
pub use layout::ArtifactLayout;
pub use manifest::{DataFile, Manifest, ManifestTable, Metadata, manifest_json_schema};
pub use validate::{DataFileStats, inspect_data_file, validate_artifact, validate_data_file};
