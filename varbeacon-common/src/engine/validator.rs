//! Syntactic validation of allele queries

use serde::{Deserialize, Deserializer, Serialize};

use crate::variant::{Chromosome, UnknownChromosome};

/// JSON bodies may carry positions and chromosomes as numbers
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Integer(i64),
    Float(f64),
}

fn scalar_as_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|scalar| match scalar {
        Scalar::Text(text) => text,
        Scalar::Integer(n) => n.to_string(),
        Scalar::Float(x) => x.to_string(),
    }))
}

/// Allele query as received, every field optional and untyped
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawQuery {
    #[serde(rename = "referenceName", default, deserialize_with = "scalar_as_text")]
    pub chromosome: Option<String>,
    #[serde(default, deserialize_with = "scalar_as_text")]
    pub start: Option<String>,
    #[serde(default, deserialize_with = "scalar_as_text")]
    pub end: Option<String>,
    #[serde(rename = "referenceBases")]
    pub reference: Option<String>,
    #[serde(rename = "alternateBases")]
    pub alternate: Option<String>,
    #[serde(rename = "assemblyId")]
    pub assembly: Option<String>,
}

impl RawQuery {
    pub fn new(
        chromosome: &str,
        start: &str,
        end: &str,
        reference: &str,
        alternate: &str,
    ) -> Self {
        Self {
            chromosome: Some(chromosome.to_string()),
            start: Some(start.to_string()),
            end: Some(end.to_string()),
            reference: Some(reference.to_string()),
            alternate: Some(alternate.to_string()),
            assembly: None,
        }
    }

    pub fn with_assembly(mut self, assembly: &str) -> Self {
        self.assembly = Some(assembly.to_string());
        self
    }
}

/// Largest accepted position; the 1-based start must still fit a stored `i64`
pub const MAX_POSITION: u64 = i64::MAX as u64 - 1;

/// A well-formed allele query; `start` is 0-based as supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedQuery {
    pub chromosome: Chromosome,
    pub start: u64,
    pub end: u64,
    pub reference: String,
    pub alternate: String,
}

impl ValidatedQuery {
    /// Start in the store's 1-based convention
    pub fn one_based_start(&self) -> u64 {
        self.start.saturating_add(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing parameter '{0}'")]
    Missing(&'static str),

    #[error(transparent)]
    Chromosome(#[from] UnknownChromosome),

    #[error("parameter '{field}' is not a non-negative integer: '{value}'")]
    Position { field: &'static str, value: String },

    #[error("parameter '{field}' exceeds the largest position {max}: {value}")]
    PositionOutOfRange { field: &'static str, value: u64, max: u64 },

    #[error("start {start} lies after end {end}")]
    InvertedRange { start: u64, end: u64 },

    #[error("parameter '{field}' is not a sequence over A, C, G, T: '{value}'")]
    Bases { field: &'static str, value: String },
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, ValidationError> {
    value.as_deref().ok_or(ValidationError::Missing(field))
}

fn position(value: &str, field: &'static str) -> Result<u64, ValidationError> {
    let invalid = || ValidationError::Position {
        field,
        value: value.to_string(),
    };
    // u64::from_str accepts a leading '+'
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let position: u64 = value.parse().map_err(|_| invalid())?;
    if position > MAX_POSITION {
        return Err(ValidationError::PositionOutOfRange {
            field,
            value: position,
            max: MAX_POSITION,
        });
    }
    Ok(position)
}

fn bases(value: &str, field: &'static str) -> Result<String, ValidationError> {
    if value.is_empty() || !value.bytes().all(|b| matches!(b, b'A' | b'C' | b'G' | b'T')) {
        return Err(ValidationError::Bases {
            field,
            value: value.to_string(),
        });
    }
    Ok(value.to_string())
}

/// Check every coordinate and base field of the query
///
/// Fields are checked in request order; the first problem found is reported.
pub fn validate(raw: &RawQuery) -> Result<ValidatedQuery, ValidationError> {
    let chromosome = required(&raw.chromosome, "referenceName")?.parse::<Chromosome>()?;
    let start = position(required(&raw.start, "start")?, "start")?;
    let end = position(required(&raw.end, "end")?, "end")?;
    if start > end {
        return Err(ValidationError::InvertedRange { start, end });
    }
    let reference = bases(required(&raw.reference, "referenceBases")?, "referenceBases")?;
    let alternate = bases(required(&raw.alternate, "alternateBases")?, "alternateBases")?;

    Ok(ValidatedQuery {
        chromosome,
        start,
        end,
        reference,
        alternate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_query() {
        let query = validate(&RawQuery::new("X", "12345", "12345", "C", "T")).unwrap();
        assert_eq!(query.chromosome, Chromosome::X);
        assert_eq!(query.start, 12345);
        assert_eq!(query.reference, "C");
        assert_eq!(query.alternate, "T");
    }

    #[test]
    fn test_invalid_chromosome() {
        let err = validate(&RawQuery::new("99", "1", "1", "A", "C")).unwrap_err();
        assert_eq!(err, ValidationError::Chromosome(UnknownChromosome("99".to_string())));
    }

    #[test]
    fn test_missing_field() {
        let mut raw = RawQuery::new("1", "1", "1", "A", "C");
        raw.alternate = None;
        assert_eq!(validate(&raw).unwrap_err(), ValidationError::Missing("alternateBases"));
    }

    #[test]
    fn test_positions() {
        for bad in ["-1", "+5", "1.5", "", "abc", "99999999999999999999999"] {
            let err = validate(&RawQuery::new("1", bad, "10", "A", "C")).unwrap_err();
            assert!(matches!(err, ValidationError::Position { field: "start", .. }), "{}", bad);
        }
        assert!(validate(&RawQuery::new("1", "0", "0", "A", "C")).is_ok());
    }

    #[test]
    fn test_positions_beyond_store_range() {
        let max = u64::MAX.to_string();
        let err = validate(&RawQuery::new("1", &max, &max, "A", "C")).unwrap_err();
        assert_eq!(
            err,
            ValidationError::PositionOutOfRange {
                field: "start",
                value: u64::MAX,
                max: MAX_POSITION,
            }
        );

        let err = validate(&RawQuery::new("1", "5", &(MAX_POSITION + 1).to_string(), "A", "C")).unwrap_err();
        assert!(matches!(err, ValidationError::PositionOutOfRange { field: "end", .. }));

        let edge = MAX_POSITION.to_string();
        let query = validate(&RawQuery::new("1", &edge, &edge, "A", "C")).unwrap();
        assert_eq!(query.one_based_start(), i64::MAX as u64);
    }

    #[test]
    fn test_start_after_end() {
        let err = validate(&RawQuery::new("1", "11", "10", "A", "C")).unwrap_err();
        assert_eq!(err, ValidationError::InvertedRange { start: 11, end: 10 });
    }

    #[test]
    fn test_bases() {
        assert!(validate(&RawQuery::new("1", "1", "3", "ACG", "T")).is_ok());
        for bad in ["", "N", "acgt", "A-C"] {
            let err = validate(&RawQuery::new("1", "1", "1", "A", bad)).unwrap_err();
            assert!(matches!(err, ValidationError::Bases { field: "alternateBases", .. }), "{}", bad);
        }
    }

    #[test]
    fn test_deserializes_beacon_parameter_names() {
        let json = r#"{"referenceName": "1", "start": "100", "end": "100",
                       "referenceBases": "A", "alternateBases": "G", "assemblyId": "GRCh38"}"#;
        let raw: RawQuery = serde_json::from_str(json).unwrap();
        assert_eq!(raw, RawQuery::new("1", "100", "100", "A", "G").with_assembly("GRCh38"));
    }

    #[test]
    fn test_deserializes_numeric_positions() {
        let json = r#"{"referenceName": 7, "start": 100, "end": 101, "referenceBases": "AT"}"#;
        let raw: RawQuery = serde_json::from_str(json).unwrap();
        assert_eq!(raw.chromosome.as_deref(), Some("7"));
        assert_eq!(raw.start.as_deref(), Some("100"));
        assert_eq!(raw.end.as_deref(), Some("101"));
        assert_eq!(raw.alternate, None);

        let negative: RawQuery = serde_json::from_str(
            r#"{"referenceName": "1", "start": -4, "end": 1,
                "referenceBases": "A", "alternateBases": "C"}"#,
        )
        .unwrap();
        assert!(matches!(
            validate(&negative),
            Err(ValidationError::Position { field: "start", .. })
        ));
    }
}
