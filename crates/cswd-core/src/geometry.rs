//! WKT envelope handling for spatial predicates.
//!
//! The engine stores bounding geometries as WKT and evaluates spatial
//! predicates on their envelopes. Two scalar functions are registered on
//! every connection:
//!
//! - `bbox_overlaps(geometry, query)` - 1 when the envelopes overlap
//! - `bbox_ratio(geometry, query)` - overlap score in [0, 1], used for
//!   spatial ranking (descending)

use crate::error::{Error, Result};

/// An axis-aligned envelope: (minx, miny, maxx, maxy).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub minx: f64,
    pub miny: f64,
    pub maxx: f64,
    pub maxy: f64,
}

impl Envelope {
    /// Build an envelope, normalizing swapped bounds.
    pub fn new(minx: f64, miny: f64, maxx: f64, maxy: f64) -> Self {
        Self {
            minx: minx.min(maxx),
            miny: miny.min(maxy),
            maxx: minx.max(maxx),
            maxy: miny.max(maxy),
        }
    }

    /// Envelope area; zero for degenerate (point/line) envelopes.
    pub fn area(&self) -> f64 {
        (self.maxx - self.minx) * (self.maxy - self.miny)
    }

    /// Whether two envelopes overlap (touching counts).
    pub fn overlaps(&self, other: &Envelope) -> bool {
        self.minx <= other.maxx
            && self.maxx >= other.minx
            && self.miny <= other.maxy
            && self.maxy >= other.miny
    }

    /// Intersection of two envelopes, if any.
    pub fn intersection(&self, other: &Envelope) -> Option<Envelope> {
        if !self.overlaps(other) {
            return None;
        }
        Some(Envelope {
            minx: self.minx.max(other.minx),
            miny: self.miny.max(other.miny),
            maxx: self.maxx.min(other.maxx),
            maxy: self.maxy.min(other.maxy),
        })
    }
}

/// Parse the envelope of a WKT geometry.
///
/// Accepts `POLYGON`, `MULTIPOLYGON`, `LINESTRING`, `POINT`, and the
/// `ENVELOPE(minx, maxx, miny, maxy)` shorthand. Only the envelope is kept;
/// interior structure is ignored.
pub fn parse_envelope(wkt: &str) -> Result<Envelope> {
    let trimmed = wkt.trim();
    let upper = trimmed.to_ascii_uppercase();

    if let Some(rest) = upper.strip_prefix("ENVELOPE") {
        let numbers = extract_numbers(rest)?;
        if numbers.len() != 4 {
            return Err(Error::invalid_parameter(
                "geometry",
                format!("ENVELOPE needs 4 coordinates, found {}", numbers.len()),
            ));
        }
        // ENVELOPE coordinate order is minx, maxx, miny, maxy.
        return Ok(Envelope::new(numbers[0], numbers[2], numbers[1], numbers[3]));
    }

    let known = ["POLYGON", "MULTIPOLYGON", "LINESTRING", "POINT"];
    if !known.iter().any(|k| upper.starts_with(k)) {
        return Err(Error::invalid_parameter(
            "geometry",
            format!("unsupported WKT geometry: {trimmed}"),
        ));
    }

    // Scan only the coordinate body; keyword letters (the E in LINESTRING)
    // must not be mistaken for exponent characters.
    let body = trimmed.split_once('(').map(|(_, rest)| rest).unwrap_or("");
    let numbers = extract_numbers(body)?;
    if numbers.len() < 2 || numbers.len() % 2 != 0 {
        return Err(Error::invalid_parameter(
            "geometry",
            "WKT coordinate list is malformed",
        ));
    }

    let mut minx = f64::INFINITY;
    let mut miny = f64::INFINITY;
    let mut maxx = f64::NEG_INFINITY;
    let mut maxy = f64::NEG_INFINITY;
    for pair in numbers.chunks(2) {
        minx = minx.min(pair[0]);
        maxx = maxx.max(pair[0]);
        miny = miny.min(pair[1]);
        maxy = maxy.max(pair[1]);
    }

    Ok(Envelope::new(minx, miny, maxx, maxy))
}

/// Pull every numeric token out of a WKT coordinate body.
fn extract_numbers(body: &str) -> Result<Vec<f64>> {
    let mut numbers = Vec::new();
    let mut current = String::new();

    for ch in body.chars() {
        if ch.is_ascii_digit() || ch == '.' || ch == '-' || ch == '+' || ch == 'e' || ch == 'E' {
            current.push(ch);
        } else if !current.is_empty() {
            numbers.push(parse_number(&current)?);
            current.clear();
        }
    }
    if !current.is_empty() {
        numbers.push(parse_number(&current)?);
    }

    Ok(numbers)
}

fn parse_number(token: &str) -> Result<f64> {
    token
        .parse::<f64>()
        .map_err(|_| Error::invalid_parameter("geometry", format!("bad coordinate '{token}'")))
}

/// Overlap score of a stored geometry against a query geometry, in [0, 1].
///
/// The score is the intersection area divided by the query area. Degenerate
/// query envelopes (points, lines) score 1.0 on any overlap so that exact
/// hits still rank above misses.
pub fn overlap_ratio(geometry: &Envelope, query: &Envelope) -> f64 {
    match geometry.intersection(query) {
        Some(inter) => {
            let query_area = query.area();
            if query_area <= f64::EPSILON {
                1.0
            } else {
                (inter.area() / query_area).clamp(0.0, 1.0)
            }
        }
        None => 0.0,
    }
}
