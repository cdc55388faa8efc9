//! Fixed-column tables of extracted records.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use serde::ser::{Serialize, SerializeSeq, SerializeStruct, Serializer};

use crate::options::Layout;

/// A single table cell. Absent optional fields become [`Cell::Null`].
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Int(i64),
    Float(f64),
    Timestamp(DateTime<FixedOffset>),
    Duration(Duration),
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<u32> for Cell {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<DateTime<FixedOffset>> for Cell {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Self::Timestamp(v)
    }
}

impl From<Duration> for Cell {
    fn from(v: Duration) -> Self {
        Self::Duration(v)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NaN"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{v:.1}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.f%:z")),
            Self::Duration(d) => {
                let secs = d.as_secs();
                write!(
                    f,
                    "{} days {:02}:{:02}:{:02}",
                    secs / 86_400,
                    secs % 86_400 / 3_600,
                    secs % 3_600 / 60,
                    secs % 60
                )?;
                match d.subsec_micros() {
                    0 => Ok(()),
                    micros => write!(f, ".{micros:06}"),
                }
            }
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Int(v) => serializer.serialize_i64(*v),
            Self::Float(v) => serializer.serialize_f64(*v),
            Self::Timestamp(ts) => serializer.serialize_str(&ts.to_rfc3339()),
            Self::Duration(d) => serializer.serialize_f64(d.as_secs_f64()),
        }
    }
}

/// A record type with a fixed, declared column layout.
pub trait Record {
    /// Column names in output order.
    const COLUMNS: &'static [&'static str];

    /// Column used as the row label, if any.
    const INDEX: Option<&'static str> = None;

    /// One cell per entry of [`Record::COLUMNS`], in the same order.
    fn cells(&self) -> Vec<Cell>;
}

/// Ordered rows of one record type.
#[derive(Debug, Clone, PartialEq)]
pub struct Table<R> {
    rows: Vec<R>,
}

impl<R: Record> Table<R> {
    pub fn new(rows: Vec<R>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &'static [&'static str] {
        R::COLUMNS
    }

    pub fn index(&self) -> Option<&'static str> {
        R::INDEX
    }

    /// All cells of the named column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<Cell>> {
        let position = R::COLUMNS.iter().position(|c| *c == name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.cells().swap_remove(position))
                .collect(),
        )
    }

    pub fn view(&self, layout: Layout) -> TableView<'_, R> {
        TableView {
            table: self,
            layout,
        }
    }

    /// Column positions with the index column, if any, moved to the front.
    fn display_order() -> Vec<usize> {
        let index = R::INDEX.and_then(|name| R::COLUMNS.iter().position(|c| *c == name));
        index
            .into_iter()
            .chain((0..R::COLUMNS.len()).filter(|i| Some(*i) != index))
            .collect()
    }
}

impl<R> Default for Table<R> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

impl<R: Record> FromIterator<R> for Table<R> {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<R: Record> fmt::Display for Table<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rows.is_empty() {
            return write!(f, "Empty table\nColumns: [{}]", R::COLUMNS.join(", "));
        }

        let order = Self::display_order();
        let positional = R::INDEX.is_none();

        let mut lines: Vec<Vec<String>> = Vec::with_capacity(self.rows.len() + 1);
        let mut header: Vec<String> = Vec::new();
        if positional {
            header.push(String::new());
        }
        header.extend(order.iter().map(|&i| R::COLUMNS[i].to_string()));
        lines.push(header);

        for (position, row) in self.rows.iter().enumerate() {
            let cells = row.cells();
            let mut line = Vec::with_capacity(order.len() + 1);
            if positional {
                line.push(position.to_string());
            }
            line.extend(order.iter().map(|&i| cells[i].to_string()));
            lines.push(line);
        }

        let mut widths = vec![0; lines[0].len()];
        for line in &lines {
            for (width, text) in widths.iter_mut().zip(line) {
                *width = (*width).max(text.chars().count());
            }
        }

        for (n, line) in lines.iter().enumerate() {
            if n > 0 {
                writeln!(f)?;
            }
            let padded: Vec<String> = line
                .iter()
                .zip(widths.iter().copied())
                .map(|(text, width)| format!("{text:>width$}"))
                .collect();
            f.write_str(padded.join("  ").trim_end())?;
        }
        Ok(())
    }
}

/// Serializable view of a [`Table`] in a chosen [`Layout`].
pub struct TableView<'a, R> {
    table: &'a Table<R>,
    layout: Layout,
}

impl<R: Record> Serialize for TableView<'_, R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.layout {
            Layout::Records => {
                let mut seq = serializer.serialize_seq(Some(self.table.len()))?;
                for row in &self.table.rows {
                    seq.serialize_element(&RowObject::<R>::new(row.cells()))?;
                }
                seq.end()
            }
            Layout::Split => {
                let data: Vec<Vec<Cell>> = self.table.rows.iter().map(Record::cells).collect();
                let mut state = serializer.serialize_struct("Table", 3)?;
                state.serialize_field("index", &R::INDEX)?;
                state.serialize_field("columns", R::COLUMNS)?;
                state.serialize_field("data", &data)?;
                state.end()
            }
        }
    }
}

/// One row serialized as an object whose keys follow the column order.
struct RowObject<R> {
    cells: Vec<Cell>,
    record: std::marker::PhantomData<R>,
}

impl<R> RowObject<R> {
    fn new(cells: Vec<Cell>) -> Self {
        Self {
            cells,
            record: std::marker::PhantomData,
        }
    }
}

impl<R: Record> Serialize for RowObject<R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Row", R::COLUMNS.len())?;
        for (name, cell) in R::COLUMNS.iter().zip(&self.cells) {
            state.serialize_field(*name, cell)?;
        }
        state.end()
    }
}
