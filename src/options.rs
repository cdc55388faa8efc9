use serde::Deserialize;

/// How tables are laid out when serialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// One object per row, keyed by column name.
    #[default]
    Records,
    /// `{index, columns, data}` with rows as arrays.
    Split,
}

/// Options for table output.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableOptions {
    #[serde(default)]
    pub layout: Layout,
}

/// Options for GeoJSON export.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoJsonOptions {
    /// Include elevation as the 3rd coordinate value (default: true)
    #[serde(default = "default_true")]
    pub include_elevation: bool,

    /// Include timestamps in coordinateProperties.times (default: true)
    #[serde(default = "default_true")]
    pub include_time: bool,

    /// Include heart rate, cadence and speed arrays in coordinateProperties (default: true)
    #[serde(default = "default_true")]
    pub include_sensors: bool,
}

impl Default for GeoJsonOptions {
    fn default() -> Self {
        Self {
            include_elevation: true,
            include_time: true,
            include_sensors: true,
        }
    }
}

fn default_true() -> bool {
    true
}
