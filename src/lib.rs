pub mod converter;
pub mod error;
pub mod fields;
pub mod gpx;
pub mod options;
pub mod table;
pub mod tcx;
pub mod workout;
pub mod xml_tree;

use serde::Serialize;
use serde::de::DeserializeOwned;
use wasm_bindgen::prelude::*;

pub use crate::error::ExtractError;
pub use crate::workout::Workout;

use crate::options::{GeoJsonOptions, TableOptions};

/// Extract tables from a GPX or TCX string, returned as a JS object
/// `{format, laps?, points}`.
#[wasm_bindgen(js_name = toTables)]
pub fn to_tables(xml: &str, options: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let opts: TableOptions = parse_options(options)?;
    let workout = Workout::parse(xml)?;
    to_js(&workout.view(opts.layout))
}

/// Convert a GPX or TCX string to GeoJSON, returned as a JS object.
#[wasm_bindgen(js_name = toGeoJson)]
pub fn to_geojson(xml: &str, options: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let opts: GeoJsonOptions = parse_options(options)?;
    let workout = Workout::parse(xml)?;
    let fc = converter::to_feature_collection(&workout, &opts);
    to_js(&fc)
}

/// Convert a GPX or TCX string to GeoJSON, returned as a JSON string.
#[wasm_bindgen(js_name = toGeoJsonString)]
pub fn to_geojson_string(xml: &str, options: JsValue) -> Result<String, JsValue> {
    console_error_panic_hook::set_once();

    let opts: GeoJsonOptions = parse_options(options)?;
    let workout = Workout::parse(xml)?;
    let fc = converter::to_feature_collection(&workout, &opts);
    serde_json::to_string(&fc).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn parse_options<T: DeserializeOwned + Default>(options: JsValue) -> Result<T, JsValue> {
    if options.is_undefined() || options.is_null() {
        Ok(T::default())
    } else {
        serde_wasm_bindgen::from_value(options).map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

/// Serialize maps as plain objects so rows and properties read like JSON.
fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}
