//! Typed field lookups over [`Element`].
//!
//! The `optional_*` helpers return `Ok(None)` when the source element is
//! absent, and fail only when a value is present but cannot be coerced.

use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};

use crate::error::{ExtractError, Result};
use crate::xml_tree::{Element, Tag};

/// Wrapper child holding the numeric value of heart-rate style elements.
pub const VALUE: &str = "Value";

/// Text of the first `tag` child, if present and non-blank.
pub fn optional_text(element: &Element, tag: Tag) -> Option<&str> {
    element
        .child(tag)
        .map(Element::text)
        .filter(|text| !text.is_empty())
}

pub fn optional_f64(element: &Element, tag: Tag) -> Result<Option<f64>> {
    optional_text(element, tag)
        .map(|text| parse_f64(text, tag.local_name()))
        .transpose()
}

pub fn optional_u32(element: &Element, tag: Tag) -> Result<Option<u32>> {
    optional_text(element, tag)
        .map(|text| parse_u32(text, tag.local_name()))
        .transpose()
}

/// Float in the first `tag` element at any depth below `element`.
pub fn optional_descendant_f64(element: &Element, tag: Tag) -> Result<Option<f64>> {
    element
        .descendant(tag)
        .map(Element::text)
        .filter(|text| !text.is_empty())
        .map(|text| parse_f64(text, tag.local_name()))
        .transpose()
}

/// Seconds in the `tag` child as a [`Duration`].
pub fn optional_duration(element: &Element, tag: Tag) -> Result<Option<Duration>> {
    optional_text(element, tag)
        .map(|text| parse_seconds(text, tag.local_name()))
        .transpose()
}

/// Float held in `<wrapper><Value>..</Value></wrapper>`.
///
/// Absent when either the wrapper or its `Value` child is missing.
pub fn optional_nested_f64(element: &Element, wrapper: Tag, value: Tag) -> Result<Option<f64>> {
    match element.child(wrapper) {
        Some(inner) => optional_f64(inner, value),
        None => Ok(None),
    }
}

pub fn optional_nested_u32(element: &Element, wrapper: Tag, value: Tag) -> Result<Option<u32>> {
    match element.child(wrapper) {
        Some(inner) => optional_u32(inner, value),
        None => Ok(None),
    }
}

pub fn required_child<'a>(
    element: &'a Element,
    tag: Tag,
    parent: &'static str,
) -> Result<&'a Element> {
    element.child(tag).ok_or(ExtractError::MissingElement {
        parent,
        element: tag.local_name(),
    })
}

pub fn required_f64(element: &Element, tag: Tag, parent: &'static str) -> Result<f64> {
    let child = required_child(element, tag, parent)?;
    parse_f64(child.text(), tag.local_name())
}

pub fn required_timestamp(
    element: &Element,
    tag: Tag,
    parent: &'static str,
) -> Result<DateTime<FixedOffset>> {
    let child = required_child(element, tag, parent)?;
    parse_timestamp(child.text())
}

pub fn parse_f64(text: &str, element: &'static str) -> Result<f64> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| ExtractError::InvalidValue {
            element,
            value: text.to_string(),
        })
}

pub fn parse_u32(text: &str, element: &'static str) -> Result<u32> {
    text.trim()
        .parse::<u32>()
        .map_err(|_| ExtractError::InvalidValue {
            element,
            value: text.to_string(),
        })
}

pub fn parse_seconds(text: &str, element: &'static str) -> Result<Duration> {
    let seconds = parse_f64(text, element)?;
    Duration::try_from_secs_f64(seconds).map_err(|_| ExtractError::InvalidValue {
        element,
        value: text.to_string(),
    })
}

const ZONED_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M%#z",
    "%Y%m%dT%H%M%S%.f%#z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y%m%dT%H%M%S%.f",
    "%Y%m%dT%H%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d"];

/// Parse an ISO-8601 date-time.
///
/// RFC 3339 is tried first, then extended and basic forms with or without
/// seconds, then bare dates (midnight). Values with no offset, or a trailing
/// `Z`, are taken to be UTC.
pub fn parse_timestamp(text: &str) -> Result<DateTime<FixedOffset>> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts);
    }
    if let Some(ts) = ZONED_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(text, format).ok())
    {
        return Ok(ts);
    }

    let naive = text.strip_suffix(['Z', 'z']).unwrap_or(text);
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(naive, format).ok())
        .or_else(|| {
            DATE_FORMATS.iter().find_map(|format| {
                NaiveDate::parse_from_str(naive, format)
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
            })
        })
        .map(|naive| naive.and_utc().fixed_offset())
        .ok_or_else(|| ExtractError::InvalidTimestamp {
            value: text.to_string(),
        })
}
