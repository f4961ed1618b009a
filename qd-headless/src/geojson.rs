//! GeoJSON interchange for rings and site descriptions
//!
//! Only the subset QD needs: geometries of every type, features with a `properties`
//! object, and feature collections.

use crate::error::CliError;
use geo_types::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};
use qd_core::{BufferRing, Facility, Organization, SurroundingFeature, WeightUnit};
use serde_json::{json, Map, Value};

type Result<T> = std::result::Result<T, CliError>;

fn ring_coordinates(ring: &LineString<f64>) -> Value {
    Value::Array(ring.0.iter().map(|c| json!([c.x, c.y])).collect())
}

fn polygon_coordinates(polygon: &Polygon<f64>) -> Value {
    let mut rings = vec![ring_coordinates(polygon.exterior())];
    rings.extend(polygon.interiors().iter().map(ring_coordinates));
    Value::Array(rings)
}

/// Buffer ring as a GeoJSON Feature
pub fn ring_feature(ring: &BufferRing) -> Value {
    json!({
        "type": "Feature",
        "geometry": {
            "type": "Polygon",
            "coordinates": polygon_coordinates(&ring.polygon),
        },
        "properties": {
            "k_factor_multiple": ring.k_factor_multiple,
            "radius_ft": ring.radius_ft,
            "label": ring.label,
            "citation": ring.citation,
            "hazard_division": ring.hazard_division,
            "k_factor_type": ring.k_factor_type,
            "is_uncertainty_band": ring.is_uncertainty_band,
            "is_qd_ring": true,
        },
    })
}

/// Wrap features in a FeatureCollection
pub fn feature_collection(features: Vec<Value>) -> Value {
    json!({ "type": "FeatureCollection", "features": features })
}

fn position(value: &Value) -> Result<Coord<f64>> {
    match value.as_array().map(Vec::as_slice) {
        Some([x, y, ..]) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => Ok(Coord { x, y }),
            _ => Err(CliError::geojson(format!("non-numeric position {value}"))),
        },
        _ => Err(CliError::geojson(format!("position must be [lon, lat], got {value}"))),
    }
}

fn array<'a>(value: &'a Value, what: &str) -> Result<&'a Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| CliError::geojson(format!("{what} must be an array")))
}

fn line(value: &Value) -> Result<LineString<f64>> {
    array(value, "line coordinates")?
        .iter()
        .map(position)
        .collect::<Result<Vec<_>>>()
        .map(LineString::new)
}

fn polygon(value: &Value) -> Result<Polygon<f64>> {
    let mut rings = array(value, "polygon coordinates")?
        .iter()
        .map(line)
        .collect::<Result<Vec<_>>>()?
        .into_iter();
    let exterior = rings.next().unwrap_or_else(|| LineString::new(vec![]));
    Ok(Polygon::new(exterior, rings.collect()))
}

/// Parse a GeoJSON geometry object; `null` is `None`
pub fn parse_geometry(value: &Value) -> Result<Option<Geometry<f64>>> {
    if value.is_null() {
        return Ok(None);
    }
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| CliError::geojson("geometry without a type"))?;
    if kind == "GeometryCollection" {
        let members = array(
            value.get("geometries").unwrap_or(&Value::Null),
            "geometries",
        )?
        .iter()
        .filter_map(|g| parse_geometry(g).transpose())
        .collect::<Result<Vec<_>>>()?;
        return Ok(Some(Geometry::GeometryCollection(GeometryCollection::new_from(
            members,
        ))));
    }

    let coords = value.get("coordinates").unwrap_or(&Value::Null);
    let geometry = match kind {
        "Point" => Geometry::Point(Point::from(position(coords)?)),
        "MultiPoint" => Geometry::MultiPoint(MultiPoint::new(
            array(coords, "coordinates")?
                .iter()
                .map(|p| position(p).map(Point::from))
                .collect::<Result<_>>()?,
        )),
        "LineString" => Geometry::LineString(line(coords)?),
        "MultiLineString" => Geometry::MultiLineString(MultiLineString::new(
            array(coords, "coordinates")?
                .iter()
                .map(line)
                .collect::<Result<_>>()?,
        )),
        "Polygon" => Geometry::Polygon(polygon(coords)?),
        "MultiPolygon" => Geometry::MultiPolygon(MultiPolygon::new(
            array(coords, "coordinates")?
                .iter()
                .map(polygon)
                .collect::<Result<_>>()?,
        )),
        other => return Err(CliError::geojson(format!("unsupported geometry type {other}"))),
    };
    Ok(Some(geometry))
}

fn feature_id(feature: &Value, properties: &Map<String, Value>, index: usize) -> String {
    let raw = feature.get("id").or_else(|| properties.get("id"));
    match raw {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => format!("feature-{index}"),
    }
}

fn string_property(properties: &Map<String, Value>, key: &str) -> Option<String> {
    properties.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Split a FeatureCollection into the facility (first feature) and its surroundings
pub fn parse_site(document: &Value) -> Result<(Facility, Vec<SurroundingFeature>)> {
    let features = array(
        document.get("features").unwrap_or(&Value::Null),
        "FeatureCollection.features",
    )?;
    let empty = Map::new();
    let mut parsed = features.iter().enumerate().map(|(index, feature)| {
        let properties = feature
            .get("properties")
            .and_then(Value::as_object)
            .unwrap_or(&empty);
        let geometry = parse_geometry(feature.get("geometry").unwrap_or(&Value::Null))?;
        Ok::<_, CliError>((feature_id(feature, properties, index), properties, geometry))
    });

    let (id, properties, geometry) = parsed
        .next()
        .ok_or_else(|| CliError::geojson("FeatureCollection has no facility feature"))??;
    let geometry = geometry.ok_or_else(|| CliError::geojson("facility has no geometry"))?;
    let organization = match properties.get("organization").and_then(Value::as_str) {
        Some(code) => code.parse::<Organization>()?,
        None => Organization::Dod,
    };
    let unit = properties
        .get("unit")
        .and_then(Value::as_str)
        .map(str::parse::<WeightUnit>)
        .transpose()?;
    let facility = Facility {
        name: string_property(properties, "name").unwrap_or_else(|| id.clone()),
        id,
        geometry,
        net_explosive_weight: properties.get("net_explosive_weight").and_then(Value::as_f64),
        unit,
        hazard_division: string_property(properties, "hazard_division")
            .unwrap_or_else(|| qd_core::core_types::DEFAULT_HAZARD_DIVISION.to_string()),
        organization,
        subtype: string_property(properties, "subtype"),
    };

    let surroundings = parsed
        .map(|entry| {
            let (id, properties, geometry) = entry?;
            Ok(SurroundingFeature {
                name: string_property(properties, "name").unwrap_or_else(|| id.clone()),
                id,
                geometry,
                is_qd_ring: properties
                    .get("is_qd_ring")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok((facility, surroundings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_every_geometry_type() {
        let cases = [
            json!({"type": "Point", "coordinates": [1.0, 2.0]}),
            json!({"type": "MultiPoint", "coordinates": [[1.0, 2.0], [3.0, 4.0]]}),
            json!({"type": "LineString", "coordinates": [[1.0, 2.0], [3.0, 4.0]]}),
            json!({"type": "MultiLineString", "coordinates": [[[1.0, 2.0], [3.0, 4.0]]]}),
            json!({"type": "Polygon", "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]}),
            json!({"type": "MultiPolygon", "coordinates": [[[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]]}),
            json!({"type": "GeometryCollection", "geometries": [{"type": "Point", "coordinates": [1.0, 2.0]}]}),
        ];
        for case in &cases {
            assert!(parse_geometry(case).unwrap().is_some(), "{case}");
        }
        assert!(parse_geometry(&Value::Null).unwrap().is_none());
        assert!(parse_geometry(&json!({"type": "Circle"})).is_err());
        assert!(parse_geometry(&json!({"type": "Point", "coordinates": ["a", 1]})).is_err());
    }

    #[test]
    fn test_parse_site_splits_facility_and_features() {
        let doc = json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "id": "M1",
                    "geometry": {"type": "Point", "coordinates": [-117.0, 34.0]},
                    "properties": {"net_explosive_weight": 1000.0, "unit": "kg", "organization": "DOE"}
                },
                {
                    "type": "Feature",
                    "geometry": null,
                    "properties": {"id": "road", "name": "Access road"}
                },
                {
                    "type": "Feature",
                    "id": 7,
                    "geometry": {"type": "Point", "coordinates": [-117.0, 34.1]},
                    "properties": {"is_qd_ring": true}
                }
            ]
        });
        let (facility, features) = parse_site(&doc).unwrap();
        assert_eq!(facility.id, "M1");
        assert_eq!(facility.organization, Organization::Doe);
        assert_eq!(facility.unit, Some(WeightUnit::Kilograms));
        assert_eq!(facility.hazard_division, "1.1");
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].name, "Access road");
        assert!(features[0].geometry.is_none());
        assert_eq!(features[1].id, "7");
        assert!(features[1].is_qd_ring);
    }

    #[test]
    fn test_empty_collection_rejected() {
        let doc = json!({"type": "FeatureCollection", "features": []});
        assert!(matches!(parse_site(&doc), Err(CliError::GeoJson(_))));
    }
}
