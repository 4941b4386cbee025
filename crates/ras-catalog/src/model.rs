//! The in-memory catalog tree.
//!
//! Built once per run by [`crate::builder`], completed by the extent and
//! deduplication passes, then handed read-only to a writer.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};

use catalog_common::{AttributeBag, BoundingBox};
use projection::Polygon;

/// Extra-field key holding an asset's RFC 3339 modification time.
pub const LAST_MODIFIED: &str = "last_modified";

pub const PROJECTION_EXTENSION: &str = "https://stac-extensions.github.io/projection/v1.1.0/schema.json";
pub const FILE_EXTENSION: &str = "https://stac-extensions.github.io/file/v2.1.0/schema.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    Hdf5,
    GeoTiff,
    Text,
    Unknown,
}

impl MediaType {
    /// IANA-style media type string; `None` for unknown files.
    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            MediaType::Hdf5 => Some("application/x-hdf5"),
            MediaType::GeoTiff => Some("image/tiff; application=geotiff"),
            MediaType::Text => Some("text/plain"),
            MediaType::Unknown => None,
        }
    }
}

impl Serialize for MediaType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_str() {
            Some(s) => serializer.serialize_str(s),
            None => serializer.serialize_none(),
        }
    }
}

/// One referenced remote object plus its descriptive metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub href: String,
    pub title: String,
    pub media_type: MediaType,
    /// Ordered, duplicate-free role tags
    pub roles: Vec<String>,
    pub extra_fields: AttributeBag,
}

impl Asset {
    pub fn new(href: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            title: title.into(),
            media_type: MediaType::Unknown,
            roles: Vec::new(),
            extra_fields: AttributeBag::new(),
        }
    }

    pub fn with_media_type(mut self, media_type: MediaType) -> Self {
        self.media_type = media_type;
        self
    }

    pub fn with_role(mut self, role: &str) -> Self {
        if !self.has_role(role) {
            self.roles.push(role.to_string());
        }
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Modification time recorded by the basic object metadata.
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.extra_fields
            .get(LAST_MODIFIED)
            .and_then(|v| v.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Spatial and temporal coverage of a collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extent {
    /// Child boxes in EPSG:4326, kept as a list and never merged
    pub spatial: Vec<BoundingBox>,
    /// Inclusive (start, end); `None` when nothing below carries a timestamp
    pub temporal: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl Extent {
    pub fn from_bbox(bbox: BoundingBox) -> Self {
        Self {
            spatial: vec![bbox],
            temporal: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: String,
    pub title: Option<String>,
    pub geometry: Option<Polygon>,
    pub bbox: Option<BoundingBox>,
    pub datetime: DateTime<Utc>,
    pub properties: AttributeBag,
    /// Assets in insertion order
    pub assets: IndexMap<String, Asset>,
    pub stac_extensions: Vec<String>,
}

impl Item {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            geometry: None,
            bbox: None,
            datetime: DateTime::<Utc>::UNIX_EPOCH,
            properties: AttributeBag::new(),
            assets: IndexMap::new(),
            stac_extensions: Vec::new(),
        }
    }

    /// Set geometry and bbox together from a polygon.
    pub fn with_geometry(mut self, geometry: Polygon) -> Self {
        self.bbox = geometry.bbox();
        self.geometry = Some(geometry);
        self
    }

    /// Add an asset unless the key is taken; the first occurrence wins.
    pub fn add_asset(&mut self, key: impl Into<String>, asset: Asset) -> bool {
        match self.assets.entry(key.into()) {
            indexmap::map::Entry::Occupied(_) => false,
            indexmap::map::Entry::Vacant(slot) => {
                slot.insert(asset);
                true
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    pub id: String,
    pub title: String,
    pub description: String,
    pub license: String,
    pub extent: Extent,
    pub assets: IndexMap<String, Asset>,
    pub children: Vec<Node>,
    pub stac_extensions: Vec<String>,
}

impl Collection {
    pub fn new(id: impl Into<String>, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            license: "proprietary".to_string(),
            extent: Extent::default(),
            assets: IndexMap::new(),
            children: Vec::new(),
            stac_extensions: Vec::new(),
        }
    }

    pub fn with_extension(mut self, url: &str) -> Self {
        if !self.stac_extensions.iter().any(|e| e == url) {
            self.stac_extensions.push(url.to_string());
        }
        self
    }

    pub fn add_child(&mut self, child: impl Into<Node>) {
        self.children.push(child.into());
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.children.iter().filter_map(|child| match child {
            Node::Item(item) => Some(item),
            _ => None,
        })
    }

    pub fn collections(&self) -> impl Iterator<Item = &Collection> {
        self.children.iter().filter_map(|child| match child {
            Node::Collection(collection) => Some(collection),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    pub id: String,
    pub title: String,
    pub description: String,
    pub children: Vec<Node>,
}

impl Catalog {
    pub fn new(id: impl Into<String>, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            children: Vec::new(),
        }
    }

    pub fn add_child(&mut self, child: impl Into<Node>) {
        self.children.push(child.into());
    }
}

/// Any node of the tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Catalog(Catalog),
    Collection(Collection),
    Item(Item),
}

impl Node {
    pub fn id(&self) -> &str {
        match self {
            Node::Catalog(c) => &c.id,
            Node::Collection(c) => &c.id,
            Node::Item(i) => &i.id,
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            Node::Catalog(c) => Some(&c.title),
            Node::Collection(c) => Some(&c.title),
            Node::Item(i) => i.title.as_deref(),
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Catalog(c) => &c.children,
            Node::Collection(c) => &c.children,
            Node::Item(_) => &[],
        }
    }
}

impl From<Catalog> for Node {
    fn from(c: Catalog) -> Self {
        Node::Catalog(c)
    }
}

impl From<Collection> for Node {
    fn from(c: Collection) -> Self {
        Node::Collection(c)
    }
}

impl From<Item> for Node {
    fn from(i: Item) -> Self {
        Node::Item(i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_common::AttrValue;

    #[test]
    fn test_media_type_strings() {
        assert_eq!(MediaType::Hdf5.as_str(), Some("application/x-hdf5"));
        assert_eq!(MediaType::Unknown.as_str(), None);
        assert_eq!(serde_json::to_value(MediaType::Text).unwrap(), "text/plain");
    }

    #[test]
    fn test_roles_are_a_set() {
        let asset = Asset::new("s3://b/k", "k").with_role("ras-output").with_role("ras-output");
        assert_eq!(asset.roles, vec!["ras-output"]);
        assert!(asset.has_role("ras-output"));
        assert!(!asset.has_role("ras-plan"));
    }

    #[test]
    fn test_last_modified() {
        let mut asset = Asset::new("s3://b/k", "k");
        assert_eq!(asset.last_modified(), None);
        asset
            .extra_fields
            .insert(LAST_MODIFIED, AttrValue::Text("2024-03-01T12:00:00+00:00".into()));
        assert_eq!(
            asset.last_modified().map(|dt| dt.to_rfc3339()),
            Some("2024-03-01T12:00:00+00:00".to_string())
        );
    }

    #[test]
    fn test_first_asset_wins() {
        let mut item = Item::new("i");
        assert!(item.add_asset("a", Asset::new("s3://b/1", "a")));
        assert!(!item.add_asset("a", Asset::new("s3://b/2", "a")));
        assert_eq!(item.assets["a"].href, "s3://b/1");
    }

    #[test]
    fn test_with_geometry_sets_bbox() {
        let item = Item::new("i").with_geometry(Polygon::from_bbox(&BoundingBox::new(0.0, 1.0, 2.0, 3.0)));
        assert_eq!(item.bbox, Some(BoundingBox::new(0.0, 1.0, 2.0, 3.0)));
    }

    #[test]
    fn test_collection_children() {
        let mut collection = Collection::new("c", "C", "desc");
        collection.add_child(Item::new("i"));
        collection.add_child(Collection::new("d", "D", "desc"));
        assert_eq!(collection.items().count(), 1);
        assert_eq!(collection.collections().count(), 1);
        assert_eq!(collection.children[1].id(), "d");
    }
}
