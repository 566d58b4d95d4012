use serde::{Deserialize, Serialize};
use std::fmt;

/// One parsed temperature/pulse observation from the band.
///
/// Produced only by [`parse`]; never mutated afterwards. Temperature is in
/// degrees Fahrenheit, pulse in beats per minute, both as delivered by the
/// band firmware.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub temperature: f64,
    pub pulse: f64,
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Temperature: {} °F, Pulse: {} BPM",
            self.temperature, self.pulse
        )
    }
}

/// Payload could not be split into exactly two numeric fields.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid payload {payload:?}: {reason}")]
pub struct ParseError {
    /// The raw payload as received, for the log sink.
    pub payload: String,
    pub reason: String,
}

/// Parses a `"<temperature>,<pulse>"` payload into a [`Reading`].
///
/// Fields are trimmed before numeric conversion, so `" 98.6 , 72"` is
/// accepted. Anything other than exactly two float fields is a
/// [`ParseError`] carrying the original payload; this function never
/// panics.
pub fn parse(payload: &str) -> Result<Reading, ParseError> {
    let fields: Vec<&str> = payload.split(',').collect();
    if fields.len() != 2 {
        return Err(ParseError {
            payload: payload.to_string(),
            reason: format!("expected 2 comma-separated fields, got {}", fields.len()),
        });
    }

    let temperature = parse_field(payload, fields[0], "temperature")?;
    let pulse = parse_field(payload, fields[1], "pulse")?;

    Ok(Reading { temperature, pulse })
}

fn parse_field(payload: &str, field: &str, name: &str) -> Result<f64, ParseError> {
    field.trim().parse::<f64>().map_err(|_| ParseError {
        payload: payload.to_string(),
        reason: format!("{} field {:?} is not a number", name, field),
    })
}
