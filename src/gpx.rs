//! Track points from GPX files with Garmin track-point extensions.
//!
//! GPX elements are matched on local name so both GPX 1.0 and 1.1 files are
//! accepted. Heart rate and cadence live in the Garmin
//! `TrackPointExtension/v1` namespace and are matched on the full name.

use std::path::Path;

use chrono::{DateTime, FixedOffset};
use tracing::{debug, warn};

use crate::error::{ExtractError, Result};
use crate::fields::{optional_f64, optional_u32, required_timestamp};
use crate::table::{Cell, Record, Table};
use crate::xml_tree::{Document, Element, Tag};

pub const TRACK_POINT_EXTENSION_NS: &str =
    "http://www.garmin.com/xmlschemas/TrackPointExtension/v1";

const TRK: Tag = Tag::local("trk");
const TRKSEG: Tag = Tag::local("trkseg");
const TRKPT: Tag = Tag::local("trkpt");
const ELE: Tag = Tag::local("ele");
const TIME: Tag = Tag::local("time");
const EXTENSIONS: Tag = Tag::local("extensions");
const HR: Tag = Tag::qualified(TRACK_POINT_EXTENSION_NS, "hr");
const CAD: Tag = Tag::qualified(TRACK_POINT_EXTENSION_NS, "cad");

/// One `<trkpt>`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: Option<f64>,
    pub time: DateTime<FixedOffset>,
    pub heart_rate: Option<u32>,
    pub cadence: Option<u32>,
}

impl Record for TrackPoint {
    const COLUMNS: &'static [&'static str] = &[
        "latitude",
        "longitude",
        "elevation",
        "time",
        "heart_rate",
        "cadence",
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            self.latitude.into(),
            self.longitude.into(),
            self.elevation.into(),
            self.time.into(),
            self.heart_rate.into(),
            self.cadence.into(),
        ]
    }
}

/// Extract one `<trkpt>` element.
///
/// Heart rate and cadence come from the first element inside `<extensions>`;
/// either is `None` when its tag is missing there, or when the point has no
/// extensions at all.
pub fn extract_point(trkpt: &Element) -> Result<TrackPoint> {
    let latitude = coordinate(trkpt, "lat")?;
    let longitude = coordinate(trkpt, "lon")?;
    let elevation = optional_f64(trkpt, ELE)?;
    let time = required_timestamp(trkpt, TIME, "trkpt")?;

    let extension = trkpt.child(EXTENSIONS).and_then(Element::first_element);
    let (heart_rate, cadence) = match extension {
        Some(ext) => (optional_u32(ext, HR)?, optional_u32(ext, CAD)?),
        None => (None, None),
    };

    Ok(TrackPoint {
        latitude,
        longitude,
        elevation,
        time,
        heart_rate,
        cadence,
    })
}

fn coordinate(trkpt: &Element, attribute: &'static str) -> Result<f64> {
    let value = trkpt
        .attribute(attribute)
        .ok_or(ExtractError::MissingAttribute {
            element: "trkpt",
            attribute,
        })?;
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| ExtractError::InvalidAttribute {
            element: "trkpt",
            attribute,
            value: value.to_string(),
        })
}

/// Build the point table from the first segment of the first track.
///
/// A document without a track, or whose first track has no segment, is an
/// error. Further tracks and segments are skipped.
pub fn points_from_document(doc: &Document) -> Result<Table<TrackPoint>> {
    let mut tracks = doc.root().children_named(TRK);
    let track = tracks.next().ok_or(ExtractError::MissingElement {
        parent: "gpx",
        element: "trk",
    })?;
    let ignored = tracks.count();
    if ignored > 0 {
        warn!(ignored, "GPX file has more than one track, reading only the first");
    }

    let mut segments = track.children_named(TRKSEG);
    let segment = segments.next().ok_or(ExtractError::MissingElement {
        parent: "trk",
        element: "trkseg",
    })?;
    let ignored = segments.count();
    if ignored > 0 {
        warn!(ignored, "GPX track has more than one segment, reading only the first");
    }

    let points = segment
        .children_named(TRKPT)
        .map(extract_point)
        .collect::<Result<Table<_>>>()?;
    debug!(points = points.len(), "extracted GPX track points");

    Ok(points)
}

/// Parse a GPX string into its point table.
pub fn parse_gpx(xml: &str) -> Result<Table<TrackPoint>> {
    points_from_document(&Document::parse(xml)?)
}

/// Read a GPX file into its point table.
pub fn read_gpx(path: impl AsRef<Path>) -> Result<Table<TrackPoint>> {
    points_from_document(&Document::read(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gpx(points: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx creator="StravaGPX" version="1.1"
     xmlns="http://www.topografix.com/GPX/1/1"
     xmlns:gpxtpx="http://www.garmin.com/xmlschemas/TrackPointExtension/v1">
  <trk>
    <name>Morning Run</name>
    <trkseg>
{points}
    </trkseg>
  </trk>
</gpx>"#
        )
    }

    #[test]
    fn test_full_point() {
        let xml = gpx(r#"
      <trkpt lat="53.3498" lon="-6.2603">
        <ele>12.4</ele>
        <time>2021-05-01T10:00:00Z</time>
        <extensions>
          <gpxtpx:TrackPointExtension>
            <gpxtpx:hr>142</gpxtpx:hr>
            <gpxtpx:cad>84</gpxtpx:cad>
          </gpxtpx:TrackPointExtension>
        </extensions>
      </trkpt>"#);
        let table = parse_gpx(&xml).unwrap();
        assert_eq!(table.len(), 1);
        let pt = &table.rows()[0];
        assert!((pt.latitude - 53.3498).abs() < 1e-10);
        assert!((pt.longitude + 6.2603).abs() < 1e-10);
        assert_eq!(pt.elevation, Some(12.4));
        assert_eq!(pt.time.to_rfc3339(), "2021-05-01T10:00:00+00:00");
        assert_eq!(pt.heart_rate, Some(142));
        assert_eq!(pt.cadence, Some(84));
    }

    #[test]
    fn test_missing_heart_rate_is_null() {
        let xml = gpx(r#"
      <trkpt lat="53.3498" lon="-6.2603">
        <ele>12.4</ele>
        <time>2021-05-01T10:00:00Z</time>
        <extensions>
          <gpxtpx:TrackPointExtension>
            <gpxtpx:cad>84</gpxtpx:cad>
          </gpxtpx:TrackPointExtension>
        </extensions>
      </trkpt>"#);
        let table = parse_gpx(&xml).unwrap();
        let pt = &table.rows()[0];
        assert_eq!(pt.heart_rate, None);
        assert_eq!(pt.cadence, Some(84));
        assert_eq!(pt.elevation, Some(12.4));

        let cells = pt.cells();
        assert!(cells[4].is_null());
        assert!(cells.iter().enumerate().all(|(i, c)| i == 4 || !c.is_null()));
    }

    #[test]
    fn test_point_without_extensions() {
        let xml = gpx(r#"
      <trkpt lat="53.0" lon="-6.0"><time>2021-05-01T10:00:00Z</time></trkpt>"#);
        let table = parse_gpx(&xml).unwrap();
        let pt = &table.rows()[0];
        assert_eq!(pt.elevation, None);
        assert_eq!(pt.heart_rate, None);
        assert_eq!(pt.cadence, None);
    }

    #[test]
    fn test_extension_tags_in_other_namespace_ignored() {
        let xml = gpx(r#"
      <trkpt lat="53.0" lon="-6.0">
        <time>2021-05-01T10:00:00Z</time>
        <extensions>
          <ext xmlns="urn:example:other"><hr>150</hr></ext>
        </extensions>
      </trkpt>"#);
        let table = parse_gpx(&xml).unwrap();
        assert_eq!(table.rows()[0].heart_rate, None);
    }

    #[test]
    fn test_every_point_kept_in_order() {
        let xml = gpx(r#"
      <trkpt lat="53.0" lon="-6.0"><time>2021-05-01T10:00:00Z</time></trkpt>
      <trkpt lat="53.1" lon="-6.1"><time>2021-05-01T10:00:01Z</time></trkpt>
      <trkpt lat="53.2" lon="-6.2"><time>2021-05-01T10:00:02Z</time></trkpt>"#);
        let table = parse_gpx(&xml).unwrap();
        let lats: Vec<f64> = table.rows().iter().map(|p| p.latitude).collect();
        assert_eq!(lats, vec![53.0, 53.1, 53.2]);
    }

    #[test]
    fn test_column_order() {
        let table = parse_gpx(&gpx("")).unwrap();
        assert!(table.is_empty());
        assert_eq!(
            table.columns(),
            &["latitude", "longitude", "elevation", "time", "heart_rate", "cadence"]
        );
    }

    #[test]
    fn test_gpx10_namespace() {
        let xml = r#"<?xml version="1.0"?>
<gpx xmlns="http://www.topografix.com/GPX/1/0" version="1.0">
  <trk><trkseg>
    <trkpt lat="35.0" lon="139.0"><ele>5</ele><time>2021-05-01T10:00:00Z</time><speed>5.5</speed></trkpt>
  </trkseg></trk>
</gpx>"#;
        let table = parse_gpx(xml).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].elevation, Some(5.0));
    }

    #[test]
    fn test_only_first_track_and_segment() {
        let xml = r#"<gpx version="1.1">
  <trk>
    <trkseg><trkpt lat="1.0" lon="1.0"><time>2021-05-01T10:00:00Z</time></trkpt></trkseg>
    <trkseg><trkpt lat="2.0" lon="2.0"><time>2021-05-01T10:00:00Z</time></trkpt></trkseg>
  </trk>
  <trk>
    <trkseg><trkpt lat="3.0" lon="3.0"><time>2021-05-01T10:00:00Z</time></trkpt></trkseg>
  </trk>
</gpx>"#;
        let table = parse_gpx(xml).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].latitude, 1.0);
    }

    #[test]
    fn test_no_track_is_error() {
        let err = parse_gpx(r#"<gpx version="1.1"></gpx>"#).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::MissingElement {
                parent: "gpx",
                element: "trk"
            }
        ));
    }

    #[test]
    fn test_no_segment_is_error() {
        let err = parse_gpx(r#"<gpx version="1.1"><trk><name>x</name></trk></gpx>"#).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::MissingElement {
                parent: "trk",
                element: "trkseg"
            }
        ));
    }

    #[test]
    fn test_missing_time_is_error() {
        let xml = gpx(r#"<trkpt lat="53.0" lon="-6.0"><ele>1</ele></trkpt>"#);
        let err = parse_gpx(&xml).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::MissingElement {
                parent: "trkpt",
                element: "time"
            }
        ));
    }

    #[test]
    fn test_missing_lat_is_error() {
        let xml = gpx(r#"<trkpt lon="-6.0"><time>2021-05-01T10:00:00Z</time></trkpt>"#);
        let err = parse_gpx(&xml).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::MissingAttribute {
                element: "trkpt",
                attribute: "lat"
            }
        ));
    }

    #[test]
    fn test_invalid_lon_is_error() {
        let xml = gpx(r#"<trkpt lat="53.0" lon="west"><time>2021-05-01T10:00:00Z</time></trkpt>"#);
        let err = parse_gpx(&xml).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::InvalidAttribute {
                attribute: "lon",
                ..
            }
        ));
    }
}
