//! HEC-RAS model catalog assembly.
//!
//! Builds a STAC tree describing HEC-RAS models, their run outputs and depth
//! grids from objects in a bucket, then writes it as a self-contained set of
//! JSON documents.
//!
//! # Pipeline
//!
//! - [`CatalogBuilder`] discovers models and assembles the tree through the
//!   injected gateway, metadata and raster collaborators
//! - [`extent`] aggregates spatial/temporal coverage bottom-up
//! - [`dedup`] promotes metadata shared by model outputs to item properties
//! - [`layout`] renders documents with relative links and writes them
//! - [`publish`] uploads a written tree back to object storage

pub mod assets;
pub mod builder;
pub mod cache;
pub mod config;
pub mod dedup;
pub mod extent;
pub mod layout;
pub mod model;
pub mod publish;
pub mod report;

pub use builder::{BuildOutcome, CatalogBuilder};
pub use cache::FootprintCache;
pub use config::CatalogConfig;
pub use dedup::dedupe_item;
pub use extent::{aggregate_collection, aggregate_tree, item_datetime};
pub use layout::{render_tree, CatalogWriter, Document, FilesystemWriter, WriteSummary};
pub use model::{Asset, Catalog, Collection, Extent, Item, MediaType, Node};
pub use publish::publish_directory;
pub use report::{BuildReport, FailureScope, PartialFailure};
