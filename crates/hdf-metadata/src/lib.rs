//! Metadata extraction from HEC-RAS HDF5 files.
//!
//! # Pipeline
//!
//! 1. A [`MetadataOpener`] turns an object key into a [`MetadataSource`]
//!    (the native HDF5 reader behind the `native` feature, or the in-memory
//!    [`MemorySource`] in tests).
//! 2. [`extract_attributes`] walks the requested groups, coerces every raw
//!    value ([`coerce`]) and namespaces keys by group.
//! 3. The [`ras`] recipes name the groups for geometry and plan files.

pub mod error;
pub mod extract;
pub mod memory;
pub mod ras;
pub mod source;
pub mod value;

#[cfg(feature = "native")]
pub mod native;

pub use error::{MetadataError, MetadataResult};
pub use extract::{extract_attributes, extract_group, snake_case, GroupSpec, PROJ_WKT2_KEY};
pub use memory::MemorySource;
pub use ras::{flow_area_perimeter, geometry_attributes, plan_attributes, FlowAreaPerimeter};
pub use source::{MetadataOpener, MetadataSource, NumericArray};
pub use value::{coerce, RawValue};

#[cfg(feature = "native")]
pub use native::{silence_hdf5_errors, Hdf5Opener, Hdf5Source};
