//! Asset classification and basic object metadata.
//!
//! | Extension (after the first dot) | Role                |
//! |---------------------------------|---------------------|
//! | `g##`                           | `ras-geometry-text` |
//! | `g##.hdf`                       | `ras-geometry`      |
//! | `p##`                           | `ras-plan`          |
//! | `p##.hdf`                       | `ras-output`        |
//! | `u##`                           | `ras-unsteady`      |
//! | `prj`                           | `ras-project`       |

use once_cell::sync::Lazy;
use regex::Regex;

use catalog_common::{AttrValue, AttributeBag};
use storage::ObjectSummary;

use crate::config::CatalogConfig;
use crate::model::{Asset, MediaType, LAST_MODIFIED};

pub const ROLE_GEOMETRY_TEXT: &str = "ras-geometry-text";
pub const ROLE_GEOMETRY: &str = "ras-geometry";
pub const ROLE_PLAN: &str = "ras-plan";
pub const ROLE_OUTPUT: &str = "ras-output";
pub const ROLE_UNSTEADY: &str = "ras-unsteady";
pub const ROLE_PROJECT: &str = "ras-project";
pub const ROLE_OUTPUT_LOGS: &str = "ras-output-logs";
pub const ROLE_DEPTH_GRID: &str = "ras-depth-grid";

pub const REALIZATION_KEY: &str = "cloud_wat:realization";
pub const SIMULATION_KEY: &str = "cloud_wat:simulation";
pub const NON_NULL_KEY: &str = "non_null";

static ROLE_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"^g\d{2}$", ROLE_GEOMETRY_TEXT),
        (r"^g\d{2}\.hdf$", ROLE_GEOMETRY),
        (r"^p\d{2}$", ROLE_PLAN),
        (r"^p\d{2}\.hdf$", ROLE_OUTPUT),
        (r"^u\d{2}$", ROLE_UNSTEADY),
        (r"^prj$", ROLE_PROJECT),
    ]
    .into_iter()
    .map(|(pattern, role)| (Regex::new(pattern).expect("static regex"), role))
    .collect()
});

static TEXT_EXTENSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(b\d{2}|bco\d{2}|g\d{2}|p\d{2}|u\d{2}|x\d{2}|prj)$").expect("static regex"));

/// Everything after the first dot of the file name.
fn full_extension(filename: &str) -> Option<&str> {
    filename.split_once('.').map(|(_, ext)| ext)
}

/// Role implied by a model file name, if any.
pub fn role_for(filename: &str) -> Option<&'static str> {
    let ext = full_extension(filename)?;
    ROLE_PATTERNS
        .iter()
        .find(|(pattern, _)| pattern.is_match(ext))
        .map(|(_, role)| *role)
}

pub fn media_type_for(filename: &str) -> MediaType {
    if filename.ends_with(".hdf") {
        return MediaType::Hdf5;
    }
    match filename.rsplit_once('.') {
        Some((_, ext)) if TEXT_EXTENSION.is_match(ext) => MediaType::Text,
        _ => MediaType::Unknown,
    }
}

/// `r0001`
pub fn realization_label(realization: u32) -> String {
    format!("r{:04}", realization)
}

/// `s0001`
pub fn simulation_label(simulation: u32) -> String {
    format!("s{:04}", simulation)
}

/// Size, digest, modification time and storage placement of an object.
pub fn basic_object_metadata(summary: &ObjectSummary, config: &CatalogConfig) -> AttributeBag {
    let tier = summary
        .storage_class
        .clone()
        .unwrap_or_else(|| config.storage_tier.clone());

    AttributeBag::new()
        .with("file:size", AttrValue::Int(summary.size as i64))
        .with(
            "e_tag",
            summary.e_tag.clone().map(AttrValue::Text).unwrap_or(AttrValue::Null),
        )
        .with(LAST_MODIFIED, summary.last_modified.to_rfc3339())
        .with("storage:platform", config.storage_platform.as_str())
        .with("storage:region", summary.region.as_str())
        .with("storage:tier", tier)
}

/// A model-directory asset: role and media type from the file name, titled
/// by the file name, carrying basic object metadata.
pub fn model_file_asset(href: String, summary: &ObjectSummary, config: &CatalogConfig) -> Asset {
    let filename = summary.filename();
    let mut asset = Asset::new(href, filename).with_media_type(media_type_for(filename));
    if let Some(role) = role_for(filename) {
        asset = asset.with_role(role);
    }
    asset.extra_fields = basic_object_metadata(summary, config);
    asset
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn summary(key: &str, storage_class: Option<&str>) -> ObjectSummary {
        ObjectSummary {
            key: key.to_string(),
            size: 2048,
            e_tag: Some("\"abc123\"".to_string()),
            last_modified: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            storage_class: storage_class.map(str::to_string),
            region: "us-east-1".to_string(),
        }
    }

    #[test]
    fn test_roles() {
        assert_eq!(role_for("ElkMiddle.g01"), Some(ROLE_GEOMETRY_TEXT));
        assert_eq!(role_for("ElkMiddle.g01.hdf"), Some(ROLE_GEOMETRY));
        assert_eq!(role_for("ElkMiddle.p03"), Some(ROLE_PLAN));
        assert_eq!(role_for("ElkMiddle.p01.hdf"), Some(ROLE_OUTPUT));
        assert_eq!(role_for("ElkMiddle.u01"), Some(ROLE_UNSTEADY));
        assert_eq!(role_for("ElkMiddle.prj"), Some(ROLE_PROJECT));
        assert_eq!(role_for("ElkMiddle.b01"), None);
        assert_eq!(role_for("ElkMiddle.p01.tmp.hdf"), None);
        assert_eq!(role_for("README"), None);
    }

    #[test]
    fn test_media_types() {
        assert_eq!(media_type_for("ElkMiddle.g01.hdf"), MediaType::Hdf5);
        assert_eq!(media_type_for("ElkMiddle.bco01"), MediaType::Text);
        assert_eq!(media_type_for("ElkMiddle.x04"), MediaType::Text);
        assert_eq!(media_type_for("ElkMiddle.prj"), MediaType::Text);
        assert_eq!(media_type_for("ElkMiddle.rasmap"), MediaType::Unknown);
        assert_eq!(media_type_for("ElkMiddle"), MediaType::Unknown);
    }

    #[test]
    fn test_labels() {
        assert_eq!(realization_label(1), "r0001");
        assert_eq!(simulation_label(42), "s0042");
    }

    #[test]
    fn test_basic_object_metadata() {
        let config = CatalogConfig::default();
        let bag = basic_object_metadata(&summary("ras/ElkMiddle/ElkMiddle.prj", None), &config);

        assert_eq!(bag.get("file:size"), Some(&AttrValue::Int(2048)));
        assert_eq!(bag.get("e_tag").and_then(AttrValue::as_str), Some("\"abc123\""));
        assert_eq!(
            bag.get(LAST_MODIFIED).and_then(AttrValue::as_str),
            Some("2024-03-01T12:00:00+00:00")
        );
        assert_eq!(bag.get("storage:platform").and_then(AttrValue::as_str), Some("AWS"));
        assert_eq!(bag.get("storage:tier").and_then(AttrValue::as_str), Some("STANDARD"));
    }

    #[test]
    fn test_storage_class_overrides_tier() {
        let config = CatalogConfig::default();
        let bag = basic_object_metadata(&summary("a.prj", Some("GLACIER")), &config);
        assert_eq!(bag.get("storage:tier").and_then(AttrValue::as_str), Some("GLACIER"));
    }

    #[test]
    fn test_model_file_asset() {
        let config = CatalogConfig::default();
        let asset = model_file_asset(
            "s3://kanawha-pilot/ras/ElkMiddle/ElkMiddle.u01".to_string(),
            &summary("ras/ElkMiddle/ElkMiddle.u01", None),
            &config,
        );
        assert_eq!(asset.title, "ElkMiddle.u01");
        assert_eq!(asset.roles, vec![ROLE_UNSTEADY]);
        assert_eq!(asset.media_type, MediaType::Text);
        assert!(asset.last_modified().is_some());
    }
}
