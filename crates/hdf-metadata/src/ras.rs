//! Extraction recipes for HEC-RAS geometry and plan files.
//!
//! # Geometry file (`*.g##.hdf`)
//!
//! | Group                          | Namespace      |
//! |--------------------------------|----------------|
//! | `/`                            | (none)         |
//! | `Geometry`                     | `geometry`     |
//! | `Geometry/Structures`          | `structures`   |
//! | first of `Geometry/2D Flow Areas/*` | `2d_flow_area` |
//!
//! # Plan file (`*.p##.hdf`)
//!
//! | Group                                      | Namespace          |
//! |--------------------------------------------|--------------------|
//! | `/`                                        | (none)             |
//! | `Plan Data/Plan Information`               | `plan_information` |
//! | `Plan Data/Plan Parameters`                | `plan_parameters`  |
//! | `Event Conditions/Meteorology/Precipitation` | `meteorology`    |
//!
//! With results, also `Results/Unsteady` (`unsteady_results`), a reduced
//! `Results/Unsteady/Summary` (`results_summary`) and
//! `Results/Unsteady/Summary/Volume Accounting` (`volume_accounting`).

use catalog_common::{parse_ras_duration, AttrValue, AttributeBag};
use tracing::debug;

use crate::error::{MetadataError, MetadataResult};
use crate::extract::{extract_attributes, extract_group, first_child_group, GroupSpec};
use crate::source::{join_path, MetadataSource};
use crate::value::coerce;

const FLOW_AREAS: &str = "Geometry/2D Flow Areas";
const RESULTS_UNSTEADY: &str = "Results/Unsteady";
const RESULTS_SUMMARY: &str = "Results/Unsteady/Summary";
const VOLUME_ACCOUNTING: &str = "Results/Unsteady/Summary/Volume Accounting";

pub const COMPUTATION_TIME_TOTAL: &str = "results_summary:computation_time_total";
pub const COMPUTATION_TIME_TOTAL_MINUTES: &str = "results_summary:computation_time_total_minutes";
pub const RUN_TIME_WINDOW: &str = "results_summary:run_time_window";

/// Outline of a model's first 2D flow area in its native projection.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowAreaPerimeter {
    /// Projection WKT from the file root
    pub wkt: String,
    pub vertices: Vec<[f64; 2]>,
}

/// Attributes of a geometry file.
pub fn geometry_attributes(source: &dyn MetadataSource) -> MetadataResult<AttributeBag> {
    let flow_area = first_child_group(source, FLOW_AREAS)?
        .ok_or_else(|| MetadataError::MissingGroup(format!("{}/*", FLOW_AREAS)))?;

    let groups = [
        GroupSpec::root(),
        GroupSpec::new("Geometry", "Geometry"),
        GroupSpec::new("Geometry/Structures", "Structures"),
        GroupSpec::new(flow_area, "2D Flow Area"),
    ];
    extract_attributes(source, &groups)
}

/// Attributes of a plan file, optionally including its results summary.
pub fn plan_attributes(source: &dyn MetadataSource, results: bool) -> MetadataResult<AttributeBag> {
    let groups = [
        GroupSpec::root(),
        GroupSpec::new("Plan Data/Plan Information", "Plan Information"),
        GroupSpec::new("Plan Data/Plan Parameters", "Plan Parameters"),
    ];
    let mut bag = extract_attributes(source, &groups)?;

    let mut precipitation = extract_group(
        source,
        &GroupSpec::new("Event Conditions/Meteorology/Precipitation", "Meteorology"),
    )?;
    precipitation.remove("meteorology:projection");
    bag = bag.merge(&precipitation);

    if results {
        bag = bag.merge(&plan_results_attributes(source)?);
    }
    Ok(bag)
}

/// Results attributes of a plan output file.
///
/// The summary group is reduced to the total computation time (as written
/// and in minutes) and the run time window.
pub fn plan_results_attributes(source: &dyn MetadataSource) -> MetadataResult<AttributeBag> {
    let unsteady = extract_group(source, &GroupSpec::new(RESULTS_UNSTEADY, "Unsteady Results"))?;
    let summary = extract_group(source, &GroupSpec::new(RESULTS_SUMMARY, "Results Summary"))?;

    let total = summary
        .get(COMPUTATION_TIME_TOTAL)
        .and_then(AttrValue::as_str)
        .ok_or_else(|| MetadataError::MissingAttribute {
            group: RESULTS_SUMMARY.to_string(),
            name: "Computation Time Total".to_string(),
        })?;
    let duration = parse_ras_duration(total).ok_or_else(|| {
        MetadataError::InvalidFormat(format!("computation time '{}' is not HH:MM:SS", total))
    })?;
    let minutes = duration.num_seconds() as f64 / 60.0;

    let reduced = AttributeBag::new()
        .with(COMPUTATION_TIME_TOTAL, total)
        .with(COMPUTATION_TIME_TOTAL_MINUTES, minutes)
        .with(
            RUN_TIME_WINDOW,
            summary.get(RUN_TIME_WINDOW).cloned().unwrap_or(AttrValue::Null),
        );

    let volume = extract_group(source, &GroupSpec::new(VOLUME_ACCOUNTING, "Volume Accounting"))?;

    Ok(unsteady.merge(&reduced).merge(&volume))
}

/// Projection and perimeter vertices of the first 2D flow area.
///
/// `None` when the geometry defines no flow area.
pub fn flow_area_perimeter(source: &dyn MetadataSource) -> MetadataResult<Option<FlowAreaPerimeter>> {
    if !source.has_group(FLOW_AREAS) {
        debug!("Geometry has no 2D flow areas group");
        return Ok(None);
    }
    let Some(flow_area) = first_child_group(source, FLOW_AREAS)? else {
        debug!("Geometry has no 2D flow areas");
        return Ok(None);
    };

    let wkt = source
        .read_attributes("")?
        .into_iter()
        .find(|(name, _)| name == "Projection")
        .and_then(|(_, raw)| match coerce(&raw) {
            AttrValue::Text(text) => Some(text),
            _ => None,
        })
        .ok_or_else(|| MetadataError::MissingAttribute {
            group: "/".to_string(),
            name: "Projection".to_string(),
        })?;

    let vertices = source
        .read_array(&join_path(&flow_area, "Perimeter"))?
        .to_points()?;

    Ok(Some(FlowAreaPerimeter { wkt, vertices }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySource;
    use crate::source::NumericArray;
    use crate::value::RawValue;

    fn plan_source() -> MemorySource {
        MemorySource::new()
            .with_attribute("", "File Type", RawValue::text("HEC-RAS Results"))
            .with_attribute("", "Projection", RawValue::text("PROJCS[]"))
            .with_attribute("Plan Data/Plan Information", "Plan Name", RawValue::text("Base"))
            .with_attribute("Plan Data/Plan Parameters", "HDF Write Warmup", RawValue::text("False"))
            .with_group(
                "Event Conditions/Meteorology/Precipitation",
                [
                    ("Mode", RawValue::text("Gridded")),
                    ("Projection", RawValue::text("GEOGCS[]")),
                ],
            )
            .with_attribute(RESULTS_UNSTEADY, "Solution", RawValue::text("Unsteady Finished Successfully"))
            .with_group(
                RESULTS_SUMMARY,
                [
                    ("Computation Time Total", RawValue::text("01:30:30")),
                    ("Run Time Window", RawValue::text("01JAN2020 10:00:00 to 01JAN2020 11:30:30")),
                    ("Computation Time DSS", RawValue::text("00:00:01")),
                ],
            )
            .with_attribute(VOLUME_ACCOUNTING, "Error Percent", RawValue::Float(0.01))
    }

    #[test]
    fn test_plan_attributes_without_results() {
        let bag = plan_attributes(&plan_source(), false).unwrap();
        assert_eq!(bag.get("plan_information:plan_name"), Some(&AttrValue::Text("Base".into())));
        assert_eq!(bag.get("plan_parameters:hdf_write_warmup"), Some(&AttrValue::Bool(false)));
        assert_eq!(bag.get("meteorology:mode"), Some(&AttrValue::Text("Gridded".into())));
        assert!(!bag.contains_key("meteorology:projection"));
        assert!(bag.contains_key("proj:wkt2"));
        assert!(!bag.contains_key("unsteady_results:solution"));
    }

    #[test]
    fn test_plan_attributes_with_results() {
        let bag = plan_attributes(&plan_source(), true).unwrap();
        assert_eq!(bag.get(COMPUTATION_TIME_TOTAL), Some(&AttrValue::Text("01:30:30".into())));
        assert_eq!(bag.get(COMPUTATION_TIME_TOTAL_MINUTES), Some(&AttrValue::Float(90.5)));
        assert!(matches!(bag.get(RUN_TIME_WINDOW), Some(AttrValue::TimestampRange(_, _))));
        assert!(!bag.contains_key("results_summary:computation_time_dss"));
        assert_eq!(bag.get("volume_accounting:error_percent"), Some(&AttrValue::Float(0.01)));
        assert!(bag.contains_key("unsteady_results:solution"));
    }

    #[test]
    fn test_missing_computation_time() {
        let source = plan_source().with_attribute("Results/Unsteady/Summary/Other", "x", RawValue::Int(1));
        let stripped = MemorySource::new()
            .with_attribute(RESULTS_UNSTEADY, "Solution", RawValue::text("ok"))
            .with_attribute(RESULTS_SUMMARY, "Run Time Window", RawValue::text("x"))
            .with_attribute(VOLUME_ACCOUNTING, "Error", RawValue::Float(0.0));
        assert!(plan_results_attributes(&source).is_ok());
        assert!(matches!(
            plan_results_attributes(&stripped),
            Err(MetadataError::MissingAttribute { .. })
        ));
    }

    #[test]
    fn test_missing_plan_group() {
        let source = MemorySource::new().with_attribute("", "File Type", RawValue::text("x"));
        assert!(matches!(
            plan_attributes(&source, false),
            Err(MetadataError::MissingGroup(_))
        ));
    }

    fn geometry_source() -> MemorySource {
        MemorySource::new()
            .with_attribute("", "Projection", RawValue::text("GEOGCS[\"WGS 84\"]"))
            .with_attribute("Geometry", "Extents", RawValue::Array(vec![
                RawValue::Float(0.0),
                RawValue::Float(2.0),
                RawValue::Float(0.0),
                RawValue::Float(1.0),
            ]))
            .with_attribute("Geometry/Structures", "Count", RawValue::Int(3))
            .with_attribute("Geometry/2D Flow Areas/Elk", "Cell Average Size", RawValue::Float(100.0))
            .with_dataset(
                "Geometry/2D Flow Areas/Elk/Perimeter",
                NumericArray::from_points(&[[0.0, 0.0], [0.0, 1.0], [2.0, 1.0], [2.0, 0.0]]),
            )
    }

    #[test]
    fn test_geometry_attributes() {
        let bag = geometry_attributes(&geometry_source()).unwrap();
        assert_eq!(bag.get("proj:wkt2"), Some(&AttrValue::Text("GEOGCS[\"WGS 84\"]".into())));
        assert_eq!(bag.get("structures:count"), Some(&AttrValue::Int(3)));
        assert_eq!(bag.get("2d_flow_area:cell_average_length"), Some(&AttrValue::Float(10.0)));
        assert!(matches!(bag.get("geometry:extents"), Some(AttrValue::Array(v)) if v.len() == 4));
    }

    #[test]
    fn test_flow_area_perimeter() {
        let perimeter = flow_area_perimeter(&geometry_source()).unwrap().unwrap();
        assert_eq!(perimeter.wkt, "GEOGCS[\"WGS 84\"]");
        assert_eq!(perimeter.vertices.len(), 4);
    }

    #[test]
    fn test_no_flow_area() {
        let source = MemorySource::new()
            .with_attribute("", "Projection", RawValue::text("x"))
            .with_attribute("Geometry/2D Flow Areas", "Count", RawValue::Int(0));
        assert_eq!(flow_area_perimeter(&source).unwrap(), None);
        assert!(geometry_attributes(&source).is_err());

        let bare = MemorySource::new().with_attribute("Geometry", "Title", RawValue::text("x"));
        assert_eq!(flow_area_perimeter(&bare).unwrap(), None);
    }
}
