//! STAC 1.0.0 documents and the self-contained directory layout.
//!
//! ```text
//! catalog.json
//! {collection}/collection.json
//! {collection}/{child}/collection.json
//! {collection}/{item}/{item}.json
//! ```
//!
//! Every link is relative, so the tree can be copied or uploaded anywhere.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use catalog_common::{AttributeBag, BoundingBox, CatalogResult};
use projection::Polygon;

use crate::model::{Asset, Catalog, Collection, Extent, Item, Node};

pub const STAC_VERSION: &str = "1.0.0";
const JSON: &str = "application/json";

/// Box used for collections with nothing georeferenced below them.
const GLOBAL_BBOX: [f64; 4] = [-180.0, -90.0, 180.0, 90.0];

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Link {
    pub rel: &'static str,
    pub href: String,
    #[serde(rename = "type")]
    pub type_: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Link {
    pub fn new(rel: &'static str, href: impl Into<String>) -> Self {
        Self {
            rel,
            href: href.into(),
            type_: JSON,
            title: None,
        }
    }

    pub fn with_title(mut self, title: Option<&str>) -> Self {
        self.title = title.map(str::to_string);
        self
    }
}

#[derive(Serialize)]
struct AssetDoc<'a> {
    href: &'a str,
    title: &'a str,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    type_: Option<&'static str>,
    #[serde(skip_serializing_if = "no_roles")]
    roles: &'a [String],
    #[serde(flatten)]
    extra_fields: &'a AttributeBag,
}

fn no_roles(roles: &&[String]) -> bool {
    roles.is_empty()
}

impl<'a> From<&'a Asset> for AssetDoc<'a> {
    fn from(asset: &'a Asset) -> Self {
        Self {
            href: &asset.href,
            title: &asset.title,
            type_: asset.media_type.as_str(),
            roles: &asset.roles,
            extra_fields: &asset.extra_fields,
        }
    }
}

fn asset_docs<'a>(assets: impl IntoIterator<Item = (&'a String, &'a Asset)>) -> Vec<(&'a str, AssetDoc<'a>)> {
    assets
        .into_iter()
        .map(|(key, asset)| (key.as_str(), AssetDoc::from(asset)))
        .collect()
}

/// Insertion-ordered asset map.
struct AssetMap<'a>(Vec<(&'a str, AssetDoc<'a>)>);

impl Serialize for AssetMap<'_> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(k, v)| (k, v)))
    }
}

#[derive(Serialize)]
struct SpatialDoc {
    bbox: Vec<[f64; 4]>,
}

#[derive(Serialize)]
struct TemporalDoc {
    interval: Vec<[Option<String>; 2]>,
}

#[derive(Serialize)]
struct ExtentDoc {
    spatial: SpatialDoc,
    temporal: TemporalDoc,
}

impl From<&Extent> for ExtentDoc {
    fn from(extent: &Extent) -> Self {
        let bbox = if extent.spatial.is_empty() {
            vec![GLOBAL_BBOX]
        } else {
            extent.spatial.iter().map(BoundingBox::to_array).collect()
        };
        let interval = match &extent.temporal {
            Some((start, end)) => [Some(format_datetime(start)), Some(format_datetime(end))],
            None => [None, None],
        };
        Self {
            spatial: SpatialDoc { bbox },
            temporal: TemporalDoc {
                interval: vec![interval],
            },
        }
    }
}

#[derive(Serialize)]
struct CatalogDoc<'a> {
    #[serde(rename = "type")]
    type_: &'static str,
    stac_version: &'static str,
    id: &'a str,
    title: &'a str,
    description: &'a str,
    links: Vec<Link>,
}

#[derive(Serialize)]
struct CollectionDoc<'a> {
    #[serde(rename = "type")]
    type_: &'static str,
    stac_version: &'static str,
    stac_extensions: &'a [String],
    id: &'a str,
    title: &'a str,
    description: &'a str,
    license: &'a str,
    extent: ExtentDoc,
    #[serde(skip_serializing_if = "is_empty_map")]
    assets: AssetMap<'a>,
    links: Vec<Link>,
}

fn is_empty_map(map: &AssetMap<'_>) -> bool {
    map.0.is_empty()
}

#[derive(Serialize)]
struct ItemDoc<'a> {
    #[serde(rename = "type")]
    type_: &'static str,
    stac_version: &'static str,
    stac_extensions: &'a [String],
    id: &'a str,
    geometry: Option<&'a Polygon>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bbox: Option<[f64; 4]>,
    properties: BTreeMap<String, Value>,
    links: Vec<Link>,
    assets: AssetMap<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    collection: Option<&'a str>,
}

fn item_properties(item: &Item) -> BTreeMap<String, Value> {
    let mut properties: BTreeMap<String, Value> = item
        .properties
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect();
    if let Some(title) = &item.title {
        properties.insert("title".to_string(), Value::String(title.clone()));
    }
    properties.insert("datetime".to_string(), Value::String(format_datetime(&item.datetime)));
    properties
}

/// One rendered file, relative to the catalog root.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub path: PathBuf,
    pub contents: Vec<u8>,
}

fn file_name(node: &Node) -> String {
    match node {
        Node::Catalog(_) => "catalog.json".to_string(),
        Node::Collection(_) => "collection.json".to_string(),
        Node::Item(item) => format!("{}.json", item.id),
    }
}

fn child_link(child: &Node) -> Link {
    let rel = match child {
        Node::Item(_) => "item",
        _ => "child",
    };
    Link::new(rel, format!("./{}/{}", child.id(), file_name(child))).with_title(child.title())
}

/// Where a node sits relative to the root and its parent.
struct Position<'a> {
    dir: PathBuf,
    depth: usize,
    root_title: &'a str,
    parent: Option<&'a Node>,
}

impl Position<'_> {
    fn links(&self, node: &Node) -> Vec<Link> {
        let root_href = if self.depth == 0 {
            "./catalog.json".to_string()
        } else {
            format!("{}catalog.json", "../".repeat(self.depth))
        };
        let mut links = vec![Link::new("root", root_href).with_title(Some(self.root_title))];

        if let Some(parent) = self.parent {
            let href = format!("../{}", file_name(parent));
            links.push(Link::new("parent", href.as_str()).with_title(parent.title()));
            if let (Node::Item(_), Node::Collection(_)) = (node, parent) {
                links.push(Link::new("collection", href).with_title(parent.title()));
            }
        }

        links.extend(node.children().iter().map(child_link));
        links
    }
}

fn to_document<T: Serialize>(path: PathBuf, doc: &T) -> CatalogResult<Document> {
    let mut contents = serde_json::to_vec_pretty(doc)?;
    contents.push(b'\n');
    Ok(Document { path, contents })
}

fn render_node(node: &Node, position: &Position<'_>, out: &mut Vec<Document>) -> CatalogResult<()> {
    let path = position.dir.join(file_name(node));
    let links = position.links(node);

    let document = match node {
        Node::Catalog(catalog) => to_document(
            path,
            &CatalogDoc {
                type_: "Catalog",
                stac_version: STAC_VERSION,
                id: &catalog.id,
                title: &catalog.title,
                description: &catalog.description,
                links,
            },
        )?,
        Node::Collection(collection) => to_document(path, &collection_doc(collection, links))?,
        Node::Item(item) => {
            let collection = match position.parent {
                Some(Node::Collection(parent)) => Some(parent.id.as_str()),
                _ => None,
            };
            to_document(
                path,
                &ItemDoc {
                    type_: "Feature",
                    stac_version: STAC_VERSION,
                    stac_extensions: &item.stac_extensions,
                    id: &item.id,
                    geometry: item.geometry.as_ref(),
                    bbox: item.bbox.map(|b| b.to_array()),
                    properties: item_properties(item),
                    links,
                    assets: AssetMap(asset_docs(&item.assets)),
                    collection,
                },
            )?
        }
    };
    out.push(document);

    for child in node.children() {
        let child_position = Position {
            dir: position.dir.join(child.id()),
            depth: position.depth + 1,
            root_title: position.root_title,
            parent: Some(node),
        };
        render_node(child, &child_position, out)?;
    }
    Ok(())
}

fn collection_doc<'a>(collection: &'a Collection, links: Vec<Link>) -> CollectionDoc<'a> {
    CollectionDoc {
        type_: "Collection",
        stac_version: STAC_VERSION,
        stac_extensions: &collection.stac_extensions,
        id: &collection.id,
        title: &collection.title,
        description: &collection.description,
        license: &collection.license,
        extent: ExtentDoc::from(&collection.extent),
        assets: AssetMap(asset_docs(&collection.assets)),
        links,
    }
}

/// Render every document of the tree, parents before children.
pub fn render_tree(catalog: &Catalog) -> CatalogResult<Vec<Document>> {
    let root = Node::Catalog(catalog.clone());
    let position = Position {
        dir: PathBuf::new(),
        depth: 0,
        root_title: &catalog.title,
        parent: None,
    };
    let mut out = Vec::new();
    render_node(&root, &position, &mut out)?;
    Ok(out)
}

/// Totals for one written tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub documents: usize,
    pub bytes: u64,
}

/// Persists a finished catalog tree.
#[async_trait]
pub trait CatalogWriter: Send + Sync {
    async fn write(&self, catalog: &Catalog) -> CatalogResult<WriteSummary>;
}

/// Writes the tree under a local directory.
pub struct FilesystemWriter {
    root: PathBuf,
}

impl FilesystemWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl CatalogWriter for FilesystemWriter {
    async fn write(&self, catalog: &Catalog) -> CatalogResult<WriteSummary> {
        let documents = render_tree(catalog)?;
        let mut summary = WriteSummary::default();

        for document in &documents {
            let path = self.root.join(&document.path);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, &document.contents).await?;
            summary.documents += 1;
            summary.bytes += document.contents.len() as u64;
            debug!(path = %path.display(), "Wrote document");
        }

        info!(
            root = %self.root.display(),
            documents = summary.documents,
            bytes = summary.bytes,
            "Catalog written"
        );
        Ok(summary)
    }
}
