//! Static catalogs used across harnesses.

use geocat_core::Item;

use crate::common::builders::ItemBuilder;

/// Five items `a`..`e` inside `[0, 0, 10, 10]` sharing one datetime, plus
/// `far` well outside it.
pub fn grid_catalog() -> Vec<Item> {
    let mut items: Vec<Item> = ["a", "b", "c", "d", "e"]
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let offset = i as f64 + 1.0;
            ItemBuilder::new(*id).at(offset, offset).build()
        })
        .collect();
    items.push(ItemBuilder::new("far").at(50.0, 50.0).build());
    items
}

/// Three items with `gsd` 3, 5 and 7.
pub fn gsd_catalog() -> Vec<Item> {
    [("low", 3.0), ("mid", 5.0), ("high", 7.0)]
        .iter()
        .map(|(id, gsd)| ItemBuilder::new(*id).property("gsd", *gsd).build())
        .collect()
}

/// Items across two collections and a year of datetimes; one has no `gsd`.
pub fn mixed_catalog() -> Vec<Item> {
    vec![
        ItemBuilder::new("l-jan")
            .datetime("2020-01-15T00:00:00Z")
            .property("gsd", 30.0)
            .property("eo:cloud_cover", 12.5)
            .footprint(0.0, 0.0, 2.0, 2.0)
            .build(),
        ItemBuilder::new("l-apr")
            .datetime("2020-04-15T00:00:00Z")
            .property("gsd", 30.0)
            .property("eo:cloud_cover", 80.0)
            .footprint(4.0, 4.0, 6.0, 6.0)
            .build(),
        ItemBuilder::new("s-jul")
            .collection("sentinel")
            .datetime("2020-07-15T00:00:00Z")
            .property("gsd", 10.0)
            .property("eo:cloud_cover", 3.0)
            .footprint(1.0, 1.0, 3.0, 3.0)
            .build(),
        ItemBuilder::new("s-oct")
            .collection("sentinel")
            .datetime("2020-10-15T00:00:00Z")
            .property("eo:cloud_cover", 40.0)
            .footprint(8.0, 8.0, 9.0, 9.0)
            .build(),
    ]
}

/// Bodies of the fixtures above as they would appear on disk.
pub const FEATURE_COLLECTION_JSON: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {"type": "Feature", "id": "one", "collection": "c", "geometry": {"type": "Point", "coordinates": [0, 0]}, "properties": {"datetime": "2021-01-01T00:00:00Z", "gsd": 1}},
    {"type": "Feature", "id": "two", "collection": "c", "geometry": {"type": "Point", "coordinates": [1, 1]}, "properties": {"datetime": "2021-01-02T00:00:00Z", "gsd": 2}}
  ]
}"#;
