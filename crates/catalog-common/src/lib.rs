//! Common types and utilities shared across the RAS model cataloger crates.

pub mod bag;
pub mod bbox;
pub mod error;
pub mod time;
pub mod value;

pub use bag::AttributeBag;
pub use bbox::BoundingBox;
pub use error::{CatalogError, CatalogResult};
pub use time::{parse_ras_datetime, parse_ras_duration, parse_ras_window};
pub use value::AttrValue;
