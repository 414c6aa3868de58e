use std::path::Path;

use geojson::{feature::Id, Feature, FeatureCollection, GeoJson, JsonObject, Value};
use geo_types::MultiPolygon;
use tracing::warn;

use crate::{
    error::{LakeError, Result},
    typed_geojson::{LakeGeoJson, MatchProperties, TypedFeature, TypedFeatureCollection},
    types::{LakeId, MatchResult, ReferenceRecord},
};

/// Read reference lakes from a GeoJSON file.
pub fn read_references<P: AsRef<Path>>(path: P, id_field: &str) -> Result<Vec<ReferenceRecord>> {
    let content = std::fs::read_to_string(path)?;
    references_from_str(&content, id_field)
}

/// Parse reference lakes from GeoJSON text.
///
/// The identifier comes from the `id_field` property, falling back to the
/// feature id. `date` and `tile` properties are carried through when present.
/// Features without a Polygon or MultiPolygon geometry are skipped.
pub fn references_from_str(content: &str, id_field: &str) -> Result<Vec<ReferenceRecord>> {
    let features = match content.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => collection.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(_) => {
            return Err(LakeError::Configuration(
                "reference dataset must be a Feature or FeatureCollection".to_string(),
            ));
        }
    };

    let mut records = Vec::with_capacity(features.len());
    for (index, feature) in features.into_iter().enumerate() {
        let id = feature_id(&feature, id_field).ok_or_else(|| LakeError::MissingIdentifier {
            index,
            field: id_field.to_string(),
        })?;

        let Some(geometry) = reference_geometry(&feature)? else {
            warn!(%id, "skipping reference without polygon geometry");
            continue;
        };

        let mut record = ReferenceRecord::new(id, geometry);
        record.date = text_property(feature.properties.as_ref(), "date");
        record.tile = text_property(feature.properties.as_ref(), "tile");
        records.push(record);
    }

    Ok(records)
}

fn feature_id(feature: &Feature, id_field: &str) -> Option<LakeId> {
    let from_property = feature
        .properties
        .as_ref()
        .and_then(|props| props.get(id_field))
        .and_then(json_to_id);

    from_property.or_else(|| match feature.id.as_ref()? {
        Id::String(s) => Some(LakeId::Text(s.clone())),
        Id::Number(n) => json_to_id(&serde_json::Value::Number(n.clone())),
    })
}

fn json_to_id(value: &serde_json::Value) -> Option<LakeId> {
    match value {
        serde_json::Value::Number(n) => Some(match n.as_i64() {
            Some(i) => LakeId::Number(i),
            None => LakeId::Text(n.to_string()),
        }),
        serde_json::Value::String(s) if !s.is_empty() => Some(LakeId::Text(s.clone())),
        _ => None,
    }
}

fn reference_geometry(feature: &Feature) -> Result<Option<MultiPolygon<f64>>> {
    let Some(geometry) = feature.geometry.as_ref() else {
        return Ok(None);
    };

    match &geometry.value {
        Value::Polygon(_) | Value::MultiPolygon(_) => {
            let geometry: geo_types::Geometry<f64> = geometry.value.clone().try_into()?;
            Ok(match geometry {
                geo_types::Geometry::Polygon(polygon) => Some(polygon.into()),
                geo_types::Geometry::MultiPolygon(multi) => Some(multi),
                _ => None,
            })
        }
        _ => Ok(None),
    }
}

fn text_property(properties: Option<&JsonObject>, key: &str) -> Option<String> {
    match properties?.get(key)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Match results as a typed feature collection, one feature per result.
pub fn results_to_geojson(results: &[MatchResult]) -> LakeGeoJson {
    let features = results
        .iter()
        .map(|result| {
            let geometry = geojson::Geometry::new(Value::from(&result.geometry));
            TypedFeature::new(Some(geometry), MatchProperties::from(result))
        })
        .collect();

    TypedFeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

pub fn results_to_geojson_string(results: &[MatchResult]) -> Result<String> {
    let collection: FeatureCollection = results_to_geojson(results).into();
    Ok(serde_json::to_string_pretty(&collection)?)
}

/// Save match results to a GeoJSON file
pub fn write_results<P: AsRef<Path>>(path: P, results: &[MatchResult]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let collection = results_to_geojson(results);
    if collection.is_empty() {
        warn!(path = %path.display(), "no lake matched, writing an empty collection");
    }
    let collection: FeatureCollection = collection.into();
    std::fs::write(path, serde_json::to_string_pretty(&collection)?)?;
    Ok(())
}
