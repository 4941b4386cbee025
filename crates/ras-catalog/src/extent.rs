//! Spatial and temporal extents, aggregated bottom-up.
//!
//! [`aggregate_collection`] looks only at a collection's direct children and
//! its own assets, so callers run it after the children are complete.
//! [`aggregate_tree`] does the whole walk.

use chrono::{DateTime, Utc};

use catalog_common::BoundingBox;

use crate::model::{Asset, Collection, Item, Node};

type Interval = (DateTime<Utc>, DateTime<Utc>);

fn widen(interval: Option<Interval>, start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Interval> {
    Some(match interval {
        Some((lo, hi)) => (lo.min(start), hi.max(end)),
        None => (start, end),
    })
}

fn assets_interval<'a>(assets: impl IntoIterator<Item = &'a Asset>) -> Option<Interval> {
    assets
        .into_iter()
        .filter_map(Asset::last_modified)
        .fold(None, |acc, ts| widen(acc, ts, ts))
}

/// (min, max) of the item's asset modification times.
pub fn item_temporal(item: &Item) -> Option<Interval> {
    assets_interval(item.assets.values())
}

/// Latest asset modification time, or the Unix epoch for an item with none.
pub fn item_datetime(item: &Item) -> DateTime<Utc> {
    item_temporal(item)
        .map(|(_, end)| end)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Set an item's datetime from its assets.
pub fn finalize_item(item: &mut Item) {
    item.datetime = item_datetime(item);
}

fn push_unique(spatial: &mut Vec<BoundingBox>, bbox: BoundingBox) {
    if !spatial.contains(&bbox) {
        spatial.push(bbox);
    }
}

/// Recompute a collection's extent from its direct children and own assets.
///
/// Spatial: the seeded boxes first, then each child's boxes in child order,
/// exact duplicates dropped and nothing merged. Temporal: the span of every
/// timestamp below, or `None` when nothing is timestamped.
pub fn aggregate_collection(collection: &mut Collection) {
    let mut spatial = collection.extent.spatial.clone();
    let mut temporal = assets_interval(collection.assets.values());

    for child in &collection.children {
        match child {
            Node::Item(item) => {
                if let Some(bbox) = item.bbox {
                    push_unique(&mut spatial, bbox);
                }
                // Dedup may have stripped the asset timestamps, the datetime remains
                match item_temporal(item) {
                    Some((start, end)) => {
                        temporal =
                            widen(temporal, start.min(item.datetime), end.max(item.datetime));
                    }
                    None if !item.assets.is_empty() => {
                        temporal = widen(temporal, item.datetime, item.datetime);
                    }
                    None => {}
                }
            }
            Node::Collection(child) => {
                for bbox in &child.extent.spatial {
                    push_unique(&mut spatial, *bbox);
                }
                if let Some((start, end)) = child.extent.temporal {
                    temporal = widen(temporal, start, end);
                }
            }
            Node::Catalog(_) => {}
        }
    }

    collection.extent.spatial = spatial;
    collection.extent.temporal = temporal;
}

/// Finalize every item and aggregate every collection, leaves first.
pub fn aggregate_tree(node: &mut Node) {
    match node {
        Node::Item(item) => finalize_item(item),
        Node::Collection(collection) => {
            for child in &mut collection.children {
                aggregate_tree(child);
            }
            aggregate_collection(collection);
        }
        Node::Catalog(catalog) => {
            for child in &mut catalog.children {
                aggregate_tree(child);
            }
        }
    }
}
