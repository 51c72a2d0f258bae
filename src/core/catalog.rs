//! Static STAC catalog model: one root catalog, one collection, one item per raster.
//!
//! All hrefs are absolute, computed from the catalog root href. The layout on disk is
//! `catalog.json`, `<collection>/collection.json` and `<collection>/<item>/<item>.json`.
use std::path::PathBuf;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::core::params::CatalogParams;
use crate::error::{Error, Result};
use crate::io::RasterInfo;

pub const STAC_VERSION: &str = "1.0.0";
pub const PROJECTION_EXTENSION: &str =
    "https://stac-extensions.github.io/projection/v1.1.0/schema.json";
pub const COG_MEDIA_TYPE: &str = "image/tiff; application=geotiff; profile=cloud-optimized";
const JSON_MEDIA_TYPE: &str = "application/json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Link {
    fn json(rel: &str, href: String) -> Self {
        Link {
            rel: rel.to_string(),
            href,
            media_type: Some(JSON_MEDIA_TYPE.to_string()),
            title: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub href: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Vec<Vec<[f64; 2]>>,
}

impl Polygon {
    /// Footprint ring `(l,b) (l,t) (r,t) (r,b) (l,b)` of a bbox
    pub fn from_bbox(bbox: [f64; 4]) -> Self {
        let [l, b, r, t] = bbox;
        Polygon {
            kind: "Polygon".to_string(),
            coordinates: vec![vec![[l, b], [l, t], [r, t], [r, b], [l, b]]],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemProperties {
    #[serde(rename = "proj:epsg")]
    pub epsg: u32,
    pub datetime: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "type")]
    pub kind: String,
    pub stac_version: String,
    pub stac_extensions: Vec<String>,
    pub id: String,
    pub geometry: Polygon,
    pub bbox: [f64; 4],
    pub properties: ItemProperties,
    pub links: Vec<Link>,
    pub assets: serde_json::Map<String, serde_json::Value>,
    pub collection: String,
}

impl Item {
    /// Item for a raster published at `<base_url>/<file name>`
    pub fn from_raster(
        info: &RasterInfo,
        base_url: &str,
        params: &CatalogParams,
        datetime: DateTime<Utc>,
    ) -> Result<Self> {
        let bounds = info.bounds().ok_or_else(|| {
            Error::Processing(format!("{} has no geotransform", info.path.display()))
        })?;
        let id = info
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| Error::Processing(format!("bad file name {:?}", info.path)))?;
        let file_name = info
            .path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| id.clone());

        let asset = Asset {
            href: format!("{}/{}", base_url.trim_end_matches('/'), file_name),
            media_type: COG_MEDIA_TYPE.to_string(),
            roles: vec!["data".to_string()],
        };
        let mut assets = serde_json::Map::new();
        assets.insert(params.asset_key.clone(), serde_json::to_value(asset)?);

        let bbox = bounds.bbox();
        Ok(Item {
            kind: "Feature".to_string(),
            stac_version: STAC_VERSION.to_string(),
            stac_extensions: vec![PROJECTION_EXTENSION.to_string()],
            id,
            geometry: Polygon::from_bbox(bbox),
            bbox,
            properties: ItemProperties {
                epsg: params.epsg,
                datetime: datetime.to_rfc3339_opts(SecondsFormat::Micros, true),
            },
            links: Vec::new(),
            assets,
            collection: params.collection_id.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialExtent {
    pub bbox: Vec<[f64; 4]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalExtent {
    pub interval: Vec<[Option<String>; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub spatial: SpatialExtent,
    pub temporal: TemporalExtent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub stac_version: String,
    pub description: String,
    pub links: Vec<Link>,
    pub extent: Extent,
    pub license: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub stac_version: String,
    pub description: String,
    pub links: Vec<Link>,
}

/// Whole catalog, ready to be written file-per-object
#[derive(Debug, Clone)]
pub struct CatalogTree {
    root_href: String,
    pub catalog: Catalog,
    pub collection: Collection,
    pub items: Vec<Item>,
}

pub fn href(root: &str, relative: &str) -> String {
    format!("{}/{}", root.trim_end_matches('/'), relative)
}

impl CatalogTree {
    pub fn new(params: &CatalogParams, root_href: &str, now: DateTime<Utc>) -> Self {
        let root = root_href.trim_end_matches('/').to_string();
        let catalog_href = href(&root, "catalog.json");
        let collection_rel = format!("{}/collection.json", params.collection_id);
        let collection_href = href(&root, &collection_rel);

        let catalog = Catalog {
            kind: "Catalog".to_string(),
            id: params.catalog_id.clone(),
            stac_version: STAC_VERSION.to_string(),
            description: params.title.clone(),
            links: vec![
                Link::json("root", catalog_href.clone()),
                Link::json("self", catalog_href.clone()),
                Link::json("child", collection_href.clone()),
            ],
        };
        let collection = Collection {
            kind: "Collection".to_string(),
            id: params.collection_id.clone(),
            stac_version: STAC_VERSION.to_string(),
            description: params.collection_description.clone(),
            links: vec![
                Link::json("root", catalog_href.clone()),
                Link::json("self", collection_href),
                Link::json("parent", catalog_href),
            ],
            extent: Extent {
                spatial: SpatialExtent {
                    bbox: vec![[-180.0, -90.0, 180.0, 90.0]],
                },
                temporal: TemporalExtent {
                    interval: vec![[Some(now.to_rfc3339_opts(SecondsFormat::Micros, true)), None]],
                },
            },
            license: params.license.clone(),
        };

        CatalogTree {
            root_href: root,
            catalog,
            collection,
            items: Vec::new(),
        }
    }

    pub fn root_href(&self) -> &str {
        &self.root_href
    }

    pub fn catalog_path() -> PathBuf {
        PathBuf::from("catalog.json")
    }

    pub fn collection_path(&self) -> PathBuf {
        PathBuf::from(&self.collection.id).join("collection.json")
    }

    pub fn item_path(&self, item: &Item) -> PathBuf {
        PathBuf::from(&self.collection.id)
            .join(&item.id)
            .join(format!("{}.json", item.id))
    }

    /// Attach `item` under the collection, wiring links both ways
    pub fn add_item(&mut self, mut item: Item) {
        let item_href = href(
            &self.root_href,
            &format!("{}/{}/{}.json", self.collection.id, item.id, item.id),
        );
        let catalog_href = href(&self.root_href, "catalog.json");
        let collection_href = href(
            &self.root_href,
            &format!("{}/collection.json", self.collection.id),
        );
        item.collection = self.collection.id.clone();
        item.links = vec![
            Link::json("root", catalog_href),
            Link::json("self", item_href.clone()),
            Link::json("parent", collection_href.clone()),
            Link::json("collection", collection_href),
        ];
        self.collection.links.push(Link::json("item", item_href));
        self.items.push(item);
    }

    /// Replace the `from` prefix of every link and asset href; returns hrefs changed
    pub fn rebase_hrefs(&mut self, from: &str, to: &str) -> usize {
        if from.is_empty() {
            return 0;
        }
        let rebase = |href: &mut String| -> usize {
            match href.strip_prefix(from) {
                Some(rest) => {
                    *href = format!("{}{}", to, rest);
                    1
                }
                None => 0,
            }
        };
        let mut changed = 0;
        for link in self
            .catalog
            .links
            .iter_mut()
            .chain(self.collection.links.iter_mut())
        {
            changed += rebase(&mut link.href);
        }
        for item in &mut self.items {
            for link in &mut item.links {
                changed += rebase(&mut link.href);
            }
            for asset in item.assets.values_mut() {
                if let Some(serde_json::Value::String(h)) = asset.get_mut("href") {
                    changed += rebase(h);
                }
            }
        }
        if let Some(rest) = self.root_href.strip_prefix(from) {
            self.root_href = format!("{}{}", to, rest);
        }
        changed
    }
}
