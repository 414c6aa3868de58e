use std::marker::PhantomData;
use serde::{Deserialize, Serialize};
use geojson::{FeatureCollection, Geometry, JsonObject};
use schemars::JsonSchema;

use crate::types::{LakeId, MatchResult};

/// Properties for matched lake features
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
#[schemars(description = "Properties for matched lake features")]
pub struct MatchProperties {
    #[schemars(description = "Identifier of the reference lake")]
    pub identifier: LakeId,
    #[schemars(description = "Acquisition date of the mask")]
    pub date: Option<String>,
    #[schemars(description = "Tile the mask was cut from")]
    pub tile: Option<String>,
}

impl From<&MatchResult> for MatchProperties {
    fn from(result: &MatchResult) -> Self {
        Self {
            identifier: result.id.clone(),
            date: result.date.clone(),
            tile: result.tile.clone(),
        }
    }
}

/// Type alias for match result GeoJSON
pub type LakeGeoJson = TypedFeatureCollection<MatchProperties>;

/// A typed GeoJSON Feature that is generic over its properties.
#[derive(Serialize, Deserialize, Debug)]
pub struct TypedFeature<P> {
    #[serde(flatten)]
    pub feature: geojson::Feature,
    #[serde(skip)]
    _properties: PhantomData<P>,
}

impl<P> TypedFeature<P>
where
    for<'de> P: Serialize + Deserialize<'de>,
{
    /// Creates a new TypedFeature.
    pub fn new(geometry: Option<Geometry>, properties: P) -> Self {
        let feature = geojson::Feature {
            bbox: None,
            geometry,
            id: None,
            properties: serde_json::to_value(properties).ok().and_then(|v| v.as_object().cloned()),
            foreign_members: None,
        };
        Self {
            feature,
            _properties: PhantomData,
        }
    }

    /// Tries to access the typed properties of the feature.
    pub fn properties(&self) -> Option<P> {
        self.feature.properties.as_ref().and_then(|p| {
            serde_json::from_value(serde_json::Value::Object(p.clone())).ok()
        })
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct TypedFeatureCollection<P> {
    pub bbox: Option<Vec<f64>>,
    pub features: Vec<TypedFeature<P>>,
    pub foreign_members: Option<JsonObject>,
}

impl<P> TypedFeatureCollection<P> {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl<P> From<TypedFeatureCollection<P>> for FeatureCollection {
    fn from(collection: TypedFeatureCollection<P>) -> Self {
        FeatureCollection {
            bbox: collection.bbox,
            features: collection.features.into_iter().map(|f| f.feature).collect(),
            foreign_members: collection.foreign_members,
        }
    }
}

impl LakeGeoJson {
    /// Identifiers of all features, in order
    pub fn identifiers(&self) -> Vec<LakeId> {
        self.features
            .iter()
            .filter_map(|feature| feature.properties())
            .map(|props| props.identifier)
            .collect()
    }

    /// Feature matched for the given reference lake
    pub fn find(&self, id: &LakeId) -> Option<&TypedFeature<MatchProperties>> {
        self.features.iter().find(|feature| {
            feature
                .properties()
                .map(|props| &props.identifier == id)
                .unwrap_or(false)
        })
    }
}
