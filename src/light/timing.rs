//! Reads fixed-cycle signal timings from a comma-separated table.
//!
//! The first line is a header. Each following row holds
//! `id, position, red duration, green duration, amber duration`.

use super::{TrafficLight, TrafficLightSet};
use crate::error::{Error, Result};
use std::path::Path;

/// Loads the timing table at `path` into `lights`.
///
/// Nothing is inserted if any row fails to parse.
pub fn load_timing_file(path: impl AsRef<Path>, lights: &mut TrafficLightSet) -> Result<usize> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed = parse_timing_table(&contents)?;
    let count = parsed.len();
    for light in parsed {
        log::info!("{}", light);
        lights.insert(light.id(), light);
    }
    Ok(count)
}

/// Parses a timing table. Later rows replace earlier rows with the same ID.
pub fn parse_timing_table(contents: &str) -> Result<Vec<TrafficLight>> {
    contents
        .lines()
        .enumerate()
        .skip(1)
        .filter(|(_, row)| !row.trim().is_empty())
        .map(|(idx, row)| parse_row(idx + 1, row))
        .collect()
}

fn parse_row(line: usize, row: &str) -> Result<TrafficLight> {
    let mut fields = row.split(',').map(str::trim);
    let mut next = |field: &'static str| fields.next().ok_or(Error::MissingField { line, field });

    let id = next("id")?
        .parse()
        .map_err(|source| Error::ParseInt { line, field: "id", source })?;
    let mut number = |field: &'static str| -> Result<f64> {
        next(field)?
            .parse()
            .map_err(|source| Error::ParseFloat { line, field, source })
    };
    let position = number("position")?;
    let red = number("red duration")?;
    let green = number("green duration")?;
    let amber = number("amber duration")?;

    Ok(TrafficLight::new(id, position, red, green, amber))
}
