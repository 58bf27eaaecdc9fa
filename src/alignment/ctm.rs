//! CTM parsing.
//!
//! The engine writes one token per line as `start end token`. A single bad
//! line fails the whole file: a timing sequence with holes in it is worse
//! than no result.

use crate::alignment::types::WordAlignment;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CtmError {
    #[error("line {line}: expected 3 fields, found {found}")]
    FieldCount { line: usize, found: usize },

    #[error("line {line}: invalid {field} time {value:?}")]
    InvalidTime {
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("line {line}: start {start} is after end {end}")]
    Inverted { line: usize, start: f64, end: f64 },
}

/// Parse CTM text into alignments, keeping file order.
///
/// Blank lines are ignored. Order is never changed, even when the engine
/// emits overlapping or backwards spans for disfluencies.
pub fn parse(text: &str) -> Result<Vec<WordAlignment>, CtmError> {
    let mut alignments = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        if raw.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = raw.split_whitespace().collect();
        let [start, end, token] = fields.as_slice() else {
            return Err(CtmError::FieldCount { line, found: fields.len() });
        };

        let start = parse_time(start, line, "start")?;
        let end = parse_time(end, line, "end")?;
        if start > end {
            return Err(CtmError::Inverted { line, start, end });
        }

        alignments.push(WordAlignment {
            start,
            end,
            token: (*token).to_string(),
        });
    }

    Ok(alignments)
}

fn parse_time(value: &str, line: usize, field: &'static str) -> Result<f64, CtmError> {
    match value.parse::<f64>() {
        Ok(time) if time.is_finite() && time >= 0.0 => Ok(time),
        _ => Err(CtmError::InvalidTime {
            line,
            field,
            value: value.to_string(),
        }),
    }
}
