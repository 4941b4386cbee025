//! Attribute extraction: walk groups, coerce values, namespace keys.

use catalog_common::{AttrValue, AttributeBag};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use crate::error::{MetadataError, MetadataResult};
use crate::source::MetadataSource;
use crate::value::coerce;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("static regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// Root attribute holding the projection WKT, and the key it is stored under.
const ROOT_PROJECTION: &str = "projection";
pub const PROJ_WKT2_KEY: &str = "proj:wkt2";

const CELL_AVERAGE_SIZE: &str = "cell_average_size";
const CELL_AVERAGE_LENGTH: &str = "cell_average_length";

/// Lowercase, drop punctuation, join words with `_`.
///
/// `"2D Flow Areas"` → `"2d_flow_areas"`, `"Time Window (UTC)"` → `"time_window_utc"`.
pub fn snake_case(text: &str) -> String {
    let stripped = NON_WORD.replace_all(text, "");
    WHITESPACE.replace_all(&stripped, "_").to_lowercase()
}

/// One attribute group to extract and the namespace its keys go under.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSpec {
    pub path: String,
    pub prefix: Option<String>,
}

impl GroupSpec {
    /// The file root, un-namespaced.
    pub fn root() -> Self {
        Self {
            path: String::new(),
            prefix: None,
        }
    }

    pub fn new(path: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            prefix: Some(prefix.into()),
        }
    }

    fn is_root(&self) -> bool {
        self.path.trim_matches('/').is_empty()
    }
}

/// Build the bag key for an attribute.
pub fn attribute_key(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}:{}", snake_case(prefix), snake_case(name)),
        None => snake_case(name),
    }
}

/// Read one group into a bag.
///
/// A root-level `projection` attribute is stored as `proj:wkt2`, and every
/// namespaced `cell_average_size` gains a sibling `cell_average_length`.
pub fn extract_group(source: &dyn MetadataSource, spec: &GroupSpec) -> MetadataResult<AttributeBag> {
    if !source.has_group(&spec.path) {
        return Err(MetadataError::MissingGroup(spec.path.clone()));
    }

    let mut bag = AttributeBag::new();
    for (name, raw) in source.read_attributes(&spec.path)? {
        let key = attribute_key(spec.prefix.as_deref(), &name);
        bag.insert(key, coerce(&raw));
    }

    if spec.is_root() && spec.prefix.is_none() {
        if let Some(wkt) = bag.remove(ROOT_PROJECTION) {
            bag.insert(PROJ_WKT2_KEY, wkt);
        }
    }

    if let Some(prefix) = spec.prefix.as_deref() {
        let ns = snake_case(prefix);
        let size_key = format!("{}:{}", ns, CELL_AVERAGE_SIZE);
        if let Some(size) = bag.get(&size_key).and_then(AttrValue::as_f64) {
            bag.insert(format!("{}:{}", ns, CELL_AVERAGE_LENGTH), size.sqrt());
        }
    }

    trace!(group = %spec.path, count = bag.len(), "Extracted attribute group");
    Ok(bag)
}

/// Extract several groups into one bag; later groups overwrite earlier keys.
pub fn extract_attributes(
    source: &dyn MetadataSource,
    groups: &[GroupSpec],
) -> MetadataResult<AttributeBag> {
    groups.iter().try_fold(AttributeBag::new(), |acc, spec| {
        Ok(acc.merge(&extract_group(source, spec)?))
    })
}

/// Path of the first child group of `parent`, if any.
pub fn first_child_group(source: &dyn MetadataSource, parent: &str) -> MetadataResult<Option<String>> {
    if !source.has_group(parent) {
        return Err(MetadataError::MissingGroup(parent.to_string()));
    }
    Ok(source
        .child_groups(parent)?
        .into_iter()
        .next()
        .map(|child| crate::source::join_path(parent, &child)))
}
