//! Memo reference numbers: `MEM-<4-digit-year>-<sequence>`.
//!
//! The sequence is 1-based within a year and zero-padded to three digits;
//! sequences past 999 are carried verbatim. Allocation is the storage
//! layer's job (a per-year counter row updated in the creating transaction);
//! this module only formats and parses.

use crate::errors::DomainError;

pub const REFERENCE_PREFIX: &str = "MEM";

/// Formats a reference number for the given year and 1-based sequence.
pub fn format_reference(year: i32, sequence: u32) -> String {
    format!("{REFERENCE_PREFIX}-{year:04}-{sequence:03}")
}

/// Parses a reference number back into (year, sequence).
pub fn parse_reference(reference: &str) -> Result<(i32, u32), DomainError> {
    let mut parts = reference.splitn(3, '-');
    let prefix = parts.next().unwrap_or_default();
    let year_part = parts.next().unwrap_or_default();
    let seq_part = parts.next().unwrap_or_default();

    if prefix != REFERENCE_PREFIX {
        return Err(DomainError::InvalidInput(format!(
            "reference `{reference}` does not start with `{REFERENCE_PREFIX}-`"
        )));
    }

    let year = year_part.parse::<i32>().map_err(|_| {
        DomainError::InvalidInput(format!("reference `{reference}` has a malformed year"))
    })?;
    let sequence = seq_part.parse::<u32>().map_err(|_| {
        DomainError::InvalidInput(format!("reference `{reference}` has a malformed sequence"))
    })?;

    if sequence == 0 {
        return Err(DomainError::InvalidInput(format!(
            "reference `{reference}` has a zero sequence"
        )));
    }

    Ok((year, sequence))
}

#[cfg(test)]
mod tests {
    use super::{format_reference, parse_reference};

    #[test]
    fn fourth_memo_of_2025_is_mem_2025_004() {
        assert_eq!(format_reference(2025, 4), "MEM-2025-004");
    }

    #[test]
    fn sequence_pads_to_three_digits() {
        assert_eq!(format_reference(2026, 1), "MEM-2026-001");
        assert_eq!(format_reference(2026, 42), "MEM-2026-042");
        assert_eq!(format_reference(2026, 999), "MEM-2026-999");
    }

    #[test]
    fn sequences_past_three_digits_are_carried_verbatim() {
        assert_eq!(format_reference(2026, 1000), "MEM-2026-1000");
    }

    #[test]
    fn parse_round_trips_formatting() {
        assert_eq!(parse_reference("MEM-2025-004").expect("parse"), (2025, 4));
        assert_eq!(parse_reference("MEM-2026-1000").expect("parse"), (2026, 1000));
    }

    #[test]
    fn parse_rejects_foreign_prefixes_and_garbage() {
        assert!(parse_reference("DOC-2025-004").is_err());
        assert!(parse_reference("MEM-20xx-004").is_err());
        assert!(parse_reference("MEM-2025-").is_err());
        assert!(parse_reference("MEM-2025-000").is_err());
    }
}
