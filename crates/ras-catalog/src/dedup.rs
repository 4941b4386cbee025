//! Promote metadata shared by an item's model outputs to item properties.

use catalog_common::{AttributeBag, CatalogError, CatalogResult};

use crate::assets::{REALIZATION_KEY, ROLE_OUTPUT};
use crate::model::{Asset, Item, MediaType};

/// Keys that stay on each asset even when every asset agrees on them.
const RETAINED_KEYS: &[&str] = &[REALIZATION_KEY];

fn qualifies(asset: &Asset) -> bool {
    asset.has_role(ROLE_OUTPUT) && asset.media_type == MediaType::Hdf5
}

/// Move the metadata common to all HDF5 `ras-output` assets into the item's
/// properties and strip it from those assets.
///
/// Returns the promoted bag. Fails with `EmptyAssetSet` when fewer than
/// `min_assets` assets qualify (and always when none do), leaving the item
/// untouched.
pub fn dedupe_item(item: &mut Item, min_assets: usize) -> CatalogResult<AttributeBag> {
    let qualifying: Vec<&AttributeBag> = item
        .assets
        .values()
        .filter(|asset| qualifies(asset))
        .map(|asset| &asset.extra_fields)
        .collect();

    if qualifying.is_empty() || qualifying.len() < min_assets {
        return Err(CatalogError::EmptyAssetSet(item.id.clone()));
    }

    let common = AttributeBag::intersect_all(qualifying)
        .ok_or_else(|| CatalogError::EmptyAssetSet(item.id.clone()))?;

    item.properties = item.properties.merge(&common);
    for asset in item.assets.values_mut().filter(|asset| qualifies(asset)) {
        asset.extra_fields = asset.extra_fields.subtract(&common, RETAINED_KEYS);
    }
    Ok(common)
}
