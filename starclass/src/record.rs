//! Star observations and the validation path shared by JSON requests and CSV rows.
//!
//! A [`RawStarRecord`] is whatever arrived over the wire: every field optional,
//! numbers possibly still text. [`RawStarRecord::into_record`] is the only way
//! to obtain a validated [`StarRecord`] from untrusted input.

use crate::error::MalformedRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Input fields in training column order.
///
/// The order of [`Field::ALL`] is the order of the classifier feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Temperature,
    Luminosity,
    Radius,
    AbsoluteMagnitude,
    Color,
    SpectralClass,
}

impl Field {
    /// All fields in feature-vector order.
    pub const ALL: [Field; 6] = [
        Field::Temperature,
        Field::Luminosity,
        Field::Radius,
        Field::AbsoluteMagnitude,
        Field::Color,
        Field::SpectralClass,
    ];

    /// Column header used by the training table and written to batch output.
    pub fn column(self) -> &'static str {
        match self {
            Field::Temperature => "Temperature",
            Field::Luminosity => "L",
            Field::Radius => "R",
            Field::AbsoluteMagnitude => "A_M",
            Field::Color => "Color",
            Field::SpectralClass => "Spectral_Class",
        }
    }

    /// Accepted header spellings, already passed through [`header_key`].
    fn header_keys(self) -> &'static [&'static str] {
        match self {
            Field::Temperature => &["temperature", "temperaturek", "temp"],
            Field::Luminosity => &["l", "luminosity", "luminositylo"],
            Field::Radius => &["r", "radius", "radiusro"],
            Field::AbsoluteMagnitude => &[
                "am",
                "absolutemagnitude",
                "absolutemagnitudemv",
                "absmag",
            ],
            Field::Color => &["color", "colour", "starcolor"],
            Field::SpectralClass => &["spectralclass", "spectraltype", "spectral"],
        }
    }

    /// Match a column header against this field's accepted spellings.
    ///
    /// Case, whitespace and punctuation are ignored, so `"Radius(R/Ro)"`,
    /// `"radius"` and `"R"` all name the radius column.
    pub fn matches_header(self, header: &str) -> bool {
        let key = header_key(header);
        self.header_keys().iter().any(|k| *k == key)
    }

    /// Whether this field is one of the four numeric features.
    pub fn is_numeric(self) -> bool {
        !matches!(self, Field::Color | Field::SpectralClass)
    }

    /// Inclusive range of typical values for a numeric field.
    ///
    /// Advisory only: values outside it are still classified.
    pub fn advisory_range(self) -> Option<(f64, f64)> {
        match self {
            Field::Temperature => Some((1000.0, 40000.0)),
            Field::Luminosity => Some((0.0, 1.0e6)),
            Field::Radius => Some((0.0, 1000.0)),
            Field::AbsoluteMagnitude => Some((-10.0, 20.0)),
            Field::Color | Field::SpectralClass => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::Temperature => "Temperature",
            Field::Luminosity => "Luminosity",
            Field::Radius => "Radius",
            Field::AbsoluteMagnitude => "Absolute Magnitude",
            Field::Color => "Color",
            Field::SpectralClass => "Spectral Class",
        })
    }
}

/// Reduce a header to lowercase ASCII alphanumerics.
fn header_key(header: &str) -> String {
    header
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Canonical form of a color category: trimmed, first character upper case,
/// remaining characters lower case.
pub fn normalize_color(color: &str) -> String {
    let mut chars = color.trim().chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Canonical form of a spectral class category: trimmed and fully upper case.
pub fn normalize_spectral_class(spectral_class: &str) -> String {
    spectral_class.trim().to_uppercase()
}

/// One validated star observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StarRecord {
    /// Effective temperature in Kelvin
    pub temperature: f64,
    /// Luminosity relative to the Sun (L/Lo)
    pub luminosity: f64,
    /// Radius relative to the Sun (R/Ro)
    pub radius: f64,
    /// Absolute visual magnitude (Mv)
    pub absolute_magnitude: f64,
    /// Observed color, in any casing
    pub color: String,
    /// Spectral class letter, in any casing
    pub spectral_class: String,
}

impl StarRecord {
    /// Build a record from its six fields. Call [`StarRecord::validate`]
    /// before trusting values that did not come from [`RawStarRecord`].
    pub fn new(
        temperature: f64,
        luminosity: f64,
        radius: f64,
        absolute_magnitude: f64,
        color: impl Into<String>,
        spectral_class: impl Into<String>,
    ) -> Self {
        Self {
            temperature,
            luminosity,
            radius,
            absolute_magnitude,
            color: color.into(),
            spectral_class: spectral_class.into(),
        }
    }

    /// The Sun: 5778 K, one solar luminosity and radius, Mv 4.83, yellow G.
    pub fn sun() -> Self {
        Self::new(5778.0, 1.0, 1.0, 4.83, "Yellow", "G")
    }

    /// Numeric fields in feature order.
    pub fn numeric(&self) -> [f64; 4] {
        [
            self.temperature,
            self.luminosity,
            self.radius,
            self.absolute_magnitude,
        ]
    }

    /// Numeric fields whose value lies outside [`Field::advisory_range`].
    pub fn outside_advisory_ranges(&self) -> Vec<Field> {
        Field::ALL
            .iter()
            .zip(self.numeric())
            .filter_map(|(&field, value)| {
                let (low, high) = field.advisory_range()?;
                (value < low || value > high).then_some(field)
            })
            .collect()
    }

    /// Check the physical constraints on every field.
    pub fn validate(&self) -> Result<(), MalformedRecord> {
        check_numeric(Field::Temperature, self.temperature)?;
        check_numeric(Field::Luminosity, self.luminosity)?;
        check_numeric(Field::Radius, self.radius)?;
        check_numeric(Field::AbsoluteMagnitude, self.absolute_magnitude)?;
        if self.color.trim().is_empty() {
            return Err(MalformedRecord::MissingField(Field::Color));
        }
        if self.spectral_class.trim().is_empty() {
            return Err(MalformedRecord::MissingField(Field::SpectralClass));
        }
        Ok(())
    }
}

fn check_numeric(field: Field, value: f64) -> Result<f64, MalformedRecord> {
    if !value.is_finite() {
        return Err(MalformedRecord::NonFinite { field, value });
    }
    // Absolute magnitude is a log scale and legitimately negative
    if field != Field::AbsoluteMagnitude && value <= 0.0 {
        return Err(MalformedRecord::NonPositive { field, value });
    }
    Ok(value)
}

/// A numeric cell as received: JSON number or text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl RawValue {
    fn parse(&self, field: Field) -> Result<f64, MalformedRecord> {
        let value = match self {
            RawValue::Number(v) => *v,
            RawValue::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return Err(MalformedRecord::MissingField(field));
                }
                text.parse::<f64>()
                    .map_err(|_| MalformedRecord::NotNumeric {
                        field,
                        value: text.to_string(),
                    })?
            }
        };
        check_numeric(field, value)
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Number(v)
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

/// Unvalidated record from a request body or CSV row.
///
/// Field names accept both snake_case and the training-table headers, so a
/// JSON body can be copied straight from a CSV row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawStarRecord {
    #[serde(default, alias = "Temperature")]
    pub temperature: Option<RawValue>,
    #[serde(default, alias = "L", alias = "Luminosity")]
    pub luminosity: Option<RawValue>,
    #[serde(default, alias = "R", alias = "Radius")]
    pub radius: Option<RawValue>,
    #[serde(default, alias = "A_M", alias = "Absolute_Magnitude")]
    pub absolute_magnitude: Option<RawValue>,
    #[serde(default, alias = "Color")]
    pub color: Option<String>,
    #[serde(default, alias = "Spectral_Class")]
    pub spectral_class: Option<String>,
}

impl RawStarRecord {
    /// Validate every field and produce a [`StarRecord`].
    ///
    /// Fields are checked in feature order; the first problem is reported.
    pub fn into_record(self) -> Result<StarRecord, MalformedRecord> {
        let numeric = |field: Field, raw: Option<RawValue>| -> Result<f64, MalformedRecord> {
            raw.ok_or(MalformedRecord::MissingField(field))?
                .parse(field)
        };
        let category = |field: Field, raw: Option<String>| -> Result<String, MalformedRecord> {
            match raw {
                Some(s) if !s.trim().is_empty() => Ok(s),
                _ => Err(MalformedRecord::MissingField(field)),
            }
        };

        Ok(StarRecord {
            temperature: numeric(Field::Temperature, self.temperature)?,
            luminosity: numeric(Field::Luminosity, self.luminosity)?,
            radius: numeric(Field::Radius, self.radius)?,
            absolute_magnitude: numeric(Field::AbsoluteMagnitude, self.absolute_magnitude)?,
            color: category(Field::Color, self.color)?,
            spectral_class: category(Field::SpectralClass, self.spectral_class)?,
        })
    }

    /// Set a field from a text cell.
    pub fn set_text(&mut self, field: Field, text: &str) {
        match field {
            Field::Temperature => self.temperature = Some(text.into()),
            Field::Luminosity => self.luminosity = Some(text.into()),
            Field::Radius => self.radius = Some(text.into()),
            Field::AbsoluteMagnitude => self.absolute_magnitude = Some(text.into()),
            Field::Color => self.color = Some(text.to_string()),
            Field::SpectralClass => self.spectral_class = Some(text.to_string()),
        }
    }
}

impl From<StarRecord> for RawStarRecord {
    fn from(record: StarRecord) -> Self {
        Self {
            temperature: Some(record.temperature.into()),
            luminosity: Some(record.luminosity.into()),
            radius: Some(record.radius.into()),
            absolute_magnitude: Some(record.absolute_magnitude.into()),
            color: Some(record.color),
            spectral_class: Some(record.spectral_class),
        }
    }
}
