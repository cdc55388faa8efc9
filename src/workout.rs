use std::fmt;
use std::path::Path;

use serde::Serialize;
use serde::ser::{SerializeStruct, Serializer};

use crate::error::{ExtractError, Result};
use crate::gpx;
use crate::options::Layout;
use crate::table::Table;
use crate::tcx::{self, TcxTables};
use crate::xml_tree::Document;

/// Source file format, decided by the document's root element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Gpx,
    Tcx,
}

/// Tables extracted from one workout file.
#[derive(Debug, Clone, PartialEq)]
pub enum Workout {
    Gpx(Table<gpx::TrackPoint>),
    Tcx(TcxTables),
}

impl Workout {
    pub fn from_document(doc: &Document) -> Result<Self> {
        match doc.root().name() {
            "gpx" => Ok(Self::Gpx(gpx::points_from_document(doc)?)),
            "TrainingCenterDatabase" => Ok(Self::Tcx(tcx::tables_from_document(doc)?)),
            other => Err(ExtractError::UnsupportedDocument {
                root: other.to_string(),
            }),
        }
    }

    /// Parse a GPX or TCX string.
    pub fn parse(xml: &str) -> Result<Self> {
        Self::from_document(&Document::parse(xml)?)
    }

    /// Read a GPX or TCX file.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_document(&Document::read(path)?)
    }

    pub fn format(&self) -> Format {
        match self {
            Self::Gpx(_) => Format::Gpx,
            Self::Tcx(_) => Format::Tcx,
        }
    }

    pub fn view(&self, layout: Layout) -> WorkoutView<'_> {
        WorkoutView {
            workout: self,
            layout,
        }
    }
}

impl fmt::Display for Workout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpx(points) => write!(f, "{points}"),
            Self::Tcx(tables) => write!(f, "LAPS:\n{}\n\nPOINTS:\n{}", tables.laps, tables.points),
        }
    }
}

/// Serializable form of a [`Workout`]: `{format, laps?, points}`.
pub struct WorkoutView<'a> {
    workout: &'a Workout,
    layout: Layout,
}

impl Serialize for WorkoutView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.workout {
            Workout::Gpx(points) => {
                let mut state = serializer.serialize_struct("Workout", 2)?;
                state.serialize_field("format", &Format::Gpx)?;
                state.serialize_field("points", &points.view(self.layout))?;
                state.end()
            }
            Workout::Tcx(tables) => {
                let mut state = serializer.serialize_struct("Workout", 3)?;
                state.serialize_field("format", &Format::Tcx)?;
                state.serialize_field("laps", &tables.laps.view(self.layout))?;
                state.serialize_field("points", &tables.points.view(self.layout))?;
                state.end()
            }
        }
    }
}
