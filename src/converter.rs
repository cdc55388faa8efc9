use chrono::{DateTime, FixedOffset};
use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde_json::{Map, Value as JsonValue};

use crate::gpx;
use crate::options::GeoJsonOptions;
use crate::tcx::{self, Lap};
use crate::workout::Workout;

/// Convert extracted workout tables to a GeoJSON FeatureCollection.
///
/// GPX points become one feature. TCX points become one feature per lap that
/// has positioned points, carrying that lap's statistics as properties.
pub fn to_feature_collection(workout: &Workout, opts: &GeoJsonOptions) -> FeatureCollection {
    let mut features = Vec::new();

    match workout {
        Workout::Gpx(points) => {
            let points: Vec<&gpx::TrackPoint> = points.rows().iter().collect();
            let mut props = Map::new();
            props.insert("format".to_string(), JsonValue::from("gpx"));
            features.extend(points_feature(&points, props, opts));
        }
        Workout::Tcx(tables) => {
            for lap in tables.laps.rows() {
                let points: Vec<&tcx::TrackPoint> = tables
                    .points
                    .rows()
                    .iter()
                    .filter(|pt| pt.lap == lap.number)
                    .collect();
                features.extend(points_feature(&points, lap_props(lap), opts));
            }
        }
    }

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Per-point values the GeoJSON export reads from either point type.
trait GeoPoint {
    fn longitude(&self) -> f64;
    fn latitude(&self) -> f64;
    fn elevation(&self) -> Option<f64>;
    fn time(&self) -> DateTime<FixedOffset>;
    fn heart_rate(&self) -> Option<u32>;
    fn cadence(&self) -> Option<u32>;
    fn speed(&self) -> Option<f64> {
        None
    }
}

impl GeoPoint for gpx::TrackPoint {
    fn longitude(&self) -> f64 {
        self.longitude
    }
    fn latitude(&self) -> f64 {
        self.latitude
    }
    fn elevation(&self) -> Option<f64> {
        self.elevation
    }
    fn time(&self) -> DateTime<FixedOffset> {
        self.time
    }
    fn heart_rate(&self) -> Option<u32> {
        self.heart_rate
    }
    fn cadence(&self) -> Option<u32> {
        self.cadence
    }
}

impl GeoPoint for tcx::TrackPoint {
    fn longitude(&self) -> f64 {
        self.longitude
    }
    fn latitude(&self) -> f64 {
        self.latitude
    }
    fn elevation(&self) -> Option<f64> {
        self.elevation
    }
    fn time(&self) -> DateTime<FixedOffset> {
        self.time
    }
    fn heart_rate(&self) -> Option<u32> {
        self.heart_rate
    }
    fn cadence(&self) -> Option<u32> {
        self.cadence
    }
    fn speed(&self) -> Option<f64> {
        self.speed
    }
}

fn points_feature<P: GeoPoint>(
    points: &[&P],
    mut props: Map<String, JsonValue>,
    opts: &GeoJsonOptions,
) -> Option<Feature> {
    let mut coords: Vec<Vec<f64>> = points
        .iter()
        .map(|pt| point_coords(*pt, opts.include_elevation))
        .collect();

    let value = match coords.len() {
        0 => return None,
        1 => Value::Point(coords.remove(0)),
        _ => Value::LineString(coords),
    };

    let mut coord_props = Map::new();
    if opts.include_time {
        insert_series(
            &mut coord_props,
            "times",
            points
                .iter()
                .map(|pt| Some(JsonValue::from(pt.time().to_rfc3339()))),
        );
    }
    if opts.include_sensors {
        insert_series(
            &mut coord_props,
            "heartRates",
            points.iter().map(|pt| pt.heart_rate().map(JsonValue::from)),
        );
        insert_series(
            &mut coord_props,
            "cadences",
            points.iter().map(|pt| pt.cadence().map(JsonValue::from)),
        );
        insert_series(
            &mut coord_props,
            "speeds",
            points.iter().map(|pt| pt.speed().map(JsonValue::from)),
        );
    }
    if !coord_props.is_empty() {
        props.insert(
            "coordinateProperties".to_string(),
            JsonValue::Object(coord_props),
        );
    }

    Some(Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(props),
        foreign_members: None,
    })
}

fn lap_props(lap: &Lap) -> Map<String, JsonValue> {
    let mut props = Map::new();
    props.insert("format".to_string(), JsonValue::from("tcx"));
    props.insert("lap".to_string(), JsonValue::from(lap.number));
    props.insert(
        "startTime".to_string(),
        JsonValue::from(lap.start_time.to_rfc3339()),
    );
    insert_optional(&mut props, "distanceMeters", lap.distance_m);
    insert_optional(
        &mut props,
        "totalTimeSeconds",
        lap.total_time.map(|d| d.as_secs_f64()),
    );
    insert_optional(&mut props, "maximumSpeed", lap.max_speed);
    insert_optional(&mut props, "maximumHeartRate", lap.max_hr);
    insert_optional(&mut props, "averageHeartRate", lap.avg_hr);
    props
}

/// Build [lon, lat] or [lon, lat, ele] coordinate array.
fn point_coords<P: GeoPoint>(pt: &P, include_elevation: bool) -> Vec<f64> {
    match (include_elevation, pt.elevation()) {
        (true, Some(ele)) => vec![pt.longitude(), pt.latitude(), ele],
        _ => vec![pt.longitude(), pt.latitude()],
    }
}

fn insert_optional(props: &mut Map<String, JsonValue>, key: &str, value: Option<f64>) {
    if let Some(v) = value {
        props.insert(key.to_string(), JsonValue::from(v));
    }
}

/// Insert a per-coordinate array, unless every entry is missing.
fn insert_series(
    props: &mut Map<String, JsonValue>,
    key: &str,
    values: impl Iterator<Item = Option<JsonValue>>,
) {
    let values: Vec<JsonValue> = values.map(|v| v.unwrap_or(JsonValue::Null)).collect();
    if values.iter().any(|v| !v.is_null()) {
        props.insert(key.to_string(), JsonValue::Array(values));
    }
}
