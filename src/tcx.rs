//! Laps and trackpoints from Garmin Training Center (TCX) files.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use tracing::{debug, warn};

use crate::error::{ExtractError, Result};
use crate::fields::{
    VALUE, optional_descendant_f64, optional_duration, optional_f64, optional_nested_f64,
    optional_nested_u32, optional_u32, parse_timestamp, required_child, required_f64,
    required_timestamp,
};
use crate::table::{Cell, Record, Table};
use crate::xml_tree::{Document, Element, Tag};

pub const TCX_NS: &str = "http://www.garmin.com/xmlschemas/TrainingCenterDatabase/v2";
pub const ACTIVITY_EXTENSION_NS: &str = "http://www.garmin.com/xmlschemas/ActivityExtension/v2";

const ACTIVITIES: Tag = Tag::qualified(TCX_NS, "Activities");
const ACTIVITY: Tag = Tag::qualified(TCX_NS, "Activity");
const LAP: Tag = Tag::qualified(TCX_NS, "Lap");
const TRACK: Tag = Tag::qualified(TCX_NS, "Track");
const TRACKPOINT: Tag = Tag::qualified(TCX_NS, "Trackpoint");
const POSITION: Tag = Tag::qualified(TCX_NS, "Position");
const LATITUDE: Tag = Tag::qualified(TCX_NS, "LatitudeDegrees");
const LONGITUDE: Tag = Tag::qualified(TCX_NS, "LongitudeDegrees");
const TIME: Tag = Tag::qualified(TCX_NS, "Time");
const ALTITUDE: Tag = Tag::qualified(TCX_NS, "AltitudeMeters");
const HEART_RATE: Tag = Tag::qualified(TCX_NS, "HeartRateBpm");
const CADENCE: Tag = Tag::qualified(TCX_NS, "Cadence");
const DISTANCE: Tag = Tag::qualified(TCX_NS, "DistanceMeters");
const TOTAL_TIME: Tag = Tag::qualified(TCX_NS, "TotalTimeSeconds");
const MAX_SPEED: Tag = Tag::qualified(TCX_NS, "MaximumSpeed");
const MAX_HEART_RATE: Tag = Tag::qualified(TCX_NS, "MaximumHeartRateBpm");
const AVG_HEART_RATE: Tag = Tag::qualified(TCX_NS, "AverageHeartRateBpm");
const HR_VALUE: Tag = Tag::qualified(TCX_NS, VALUE);
const SPEED: Tag = Tag::qualified(ACTIVITY_EXTENSION_NS, "Speed");

/// Trackpoint data before it is assigned to a lap.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: Option<f64>,
    pub time: DateTime<FixedOffset>,
    pub heart_rate: Option<u32>,
    pub cadence: Option<u32>,
    pub speed: Option<f64>,
}

impl Sample {
    pub fn in_lap(self, lap: u32) -> TrackPoint {
        TrackPoint {
            latitude: self.latitude,
            longitude: self.longitude,
            elevation: self.elevation,
            time: self.time,
            heart_rate: self.heart_rate,
            cadence: self.cadence,
            speed: self.speed,
            lap,
        }
    }
}

/// A positioned trackpoint and the lap it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: Option<f64>,
    pub time: DateTime<FixedOffset>,
    pub heart_rate: Option<u32>,
    pub cadence: Option<u32>,
    pub speed: Option<f64>,
    pub lap: u32,
}

impl Record for TrackPoint {
    const COLUMNS: &'static [&'static str] = &[
        "latitude",
        "longitude",
        "elevation",
        "time",
        "heart_rate",
        "cadence",
        "speed",
        "lap",
    ];

    fn cells(&self) -> Vec<Cell> {
        vec![
            self.latitude.into(),
            self.longitude.into(),
            self.elevation.into(),
            self.time.into(),
            self.heart_rate.into(),
            self.cadence.into(),
            self.speed.into(),
            self.lap.into(),
        ]
    }
}

/// Lap statistics as read from a `<Lap>` element.
#[derive(Debug, Clone, PartialEq)]
pub struct LapSummary {
    pub start_time: DateTime<FixedOffset>,
    pub distance_m: Option<f64>,
    pub total_time: Option<Duration>,
    pub max_speed: Option<f64>,
    pub max_hr: Option<f64>,
    pub avg_hr: Option<f64>,
}

impl LapSummary {
    pub fn numbered(self, number: u32) -> Lap {
        Lap {
            number,
            start_time: self.start_time,
            distance_m: self.distance_m,
            total_time: self.total_time,
            max_speed: self.max_speed,
            max_hr: self.max_hr,
            avg_hr: self.avg_hr,
        }
    }
}

/// A lap row. `number` counts laps from 1 in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct Lap {
    pub number: u32,
    pub start_time: DateTime<FixedOffset>,
    pub distance_m: Option<f64>,
    pub total_time: Option<Duration>,
    pub max_speed: Option<f64>,
    pub max_hr: Option<f64>,
    pub avg_hr: Option<f64>,
}

impl Record for Lap {
    const COLUMNS: &'static [&'static str] = &[
        "number",
        "start_time",
        "distance_m",
        "total_time",
        "max_speed",
        "max_hr",
        "avg_hr",
    ];
    const INDEX: Option<&'static str> = Some("number");

    fn cells(&self) -> Vec<Cell> {
        vec![
            self.number.into(),
            self.start_time.into(),
            self.distance_m.into(),
            self.total_time.into(),
            self.max_speed.into(),
            self.max_hr.into(),
            self.avg_hr.into(),
        ]
    }
}

/// Both tables extracted from one TCX activity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TcxTables {
    pub laps: Table<Lap>,
    pub points: Table<TrackPoint>,
}

/// Extract one `<Trackpoint>`.
///
/// Returns `Ok(None)` for points without a `<Position>`; those carry no
/// location and are left out of the point table.
pub fn extract_point(trackpoint: &Element) -> Result<Option<Sample>> {
    let Some(position) = trackpoint.child(POSITION) else {
        return Ok(None);
    };

    let latitude = required_f64(position, LATITUDE, "Position")?;
    let longitude = required_f64(position, LONGITUDE, "Position")?;
    let time = required_timestamp(trackpoint, TIME, "Trackpoint")?;

    Ok(Some(Sample {
        latitude,
        longitude,
        elevation: optional_f64(trackpoint, ALTITUDE)?,
        time,
        heart_rate: optional_nested_u32(trackpoint, HEART_RATE, HR_VALUE)?,
        cadence: optional_u32(trackpoint, CADENCE)?,
        speed: optional_descendant_f64(trackpoint, SPEED)?,
    }))
}

/// Extract the statistics of one `<Lap>`.
pub fn extract_lap(lap: &Element) -> Result<LapSummary> {
    let start_time = lap
        .attribute("StartTime")
        .ok_or(ExtractError::MissingAttribute {
            element: "Lap",
            attribute: "StartTime",
        })?;

    Ok(LapSummary {
        start_time: parse_timestamp(start_time)?,
        distance_m: optional_f64(lap, DISTANCE)?,
        total_time: optional_duration(lap, TOTAL_TIME)?,
        max_speed: optional_f64(lap, MAX_SPEED)?,
        max_hr: optional_nested_f64(lap, MAX_HEART_RATE, HR_VALUE)?,
        avg_hr: optional_nested_f64(lap, AVG_HEART_RATE, HR_VALUE)?,
    })
}

/// Build the lap and point tables from the first activity in the document.
pub fn tables_from_document(doc: &Document) -> Result<TcxTables> {
    let activities = required_child(doc.root(), ACTIVITIES, "TrainingCenterDatabase")?;
    let mut all = activities.children_named(ACTIVITY);
    let activity = all.next().ok_or(ExtractError::MissingElement {
        parent: "Activities",
        element: "Activity",
    })?;
    let ignored = all.count();
    if ignored > 0 {
        warn!(ignored, "TCX file has more than one activity, reading only the first");
    }

    let mut laps = Vec::new();
    let mut points = Vec::new();

    for (number, lap) in (1u32..).zip(activity.children_named(LAP)) {
        laps.push(extract_lap(lap)?.numbered(number));

        let track = required_child(lap, TRACK, "Lap")?;
        let ignored = lap.children_named(TRACK).count().saturating_sub(1);
        if ignored > 0 {
            warn!(lap = number, ignored, "lap has more than one track, reading only the first");
        }

        for trackpoint in track.children_named(TRACKPOINT) {
            if let Some(sample) = extract_point(trackpoint)? {
                points.push(sample.in_lap(number));
            }
        }
    }

    debug!(
        laps = laps.len(),
        points = points.len(),
        "extracted TCX activity"
    );

    Ok(TcxTables {
        laps: Table::new(laps),
        points: Table::new(points),
    })
}

/// Parse a TCX string into its lap and point tables.
pub fn parse_tcx(xml: &str) -> Result<TcxTables> {
    tables_from_document(&Document::parse(xml)?)
}

/// Read a TCX file into its lap and point tables.
pub fn read_tcx(path: impl AsRef<Path>) -> Result<TcxTables> {
    tables_from_document(&Document::read(path)?)
}
