//! `CT-<year>-<seq>` contract codes.

pub fn code_prefix(year: i32) -> String {
    format!("CT-{year}-")
}

pub fn format_code(year: i32, sequence: u32) -> String {
    format!("{}{sequence:04}", code_prefix(year))
}

/// Numeric suffix after the last dash, if any.
pub fn sequence_of(code: &str) -> Option<u32> {
    code.rsplit('-').next()?.trim().parse().ok()
}

/// Next code for `year` given the codes already issued with that prefix.
/// Unparseable suffixes are ignored; the first code of a year is `0001`.
pub fn next_code<'a, I>(year: i32, existing: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let prefix = code_prefix(year);
    let max = existing
        .into_iter()
        .filter(|code| code.starts_with(&prefix))
        .filter_map(sequence_of)
        .max()
        .unwrap_or(0);
    format_code(year, max + 1)
}

/// Year and sequence of a string shaped like `CT-2024-0007` (any case,
/// any zero padding).
pub fn parse_code(value: &str) -> Option<(i32, u32)> {
    let mut parts = value.trim().split('-');
    let (Some(tag), Some(year), Some(seq), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };
    let digits = |part: &str| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit());
    if !tag.eq_ignore_ascii_case("CT") || year.len() != 4 || !digits(year) || !digits(seq) {
        return None;
    }
    Some((year.parse().ok()?, seq.parse().ok()?))
}

/// True for strings shaped like `CT-2024-0007`.
pub fn is_contract_code(value: &str) -> bool {
    parse_code(value).is_some()
}

/// Canonical spelling of a contract code: `ct-2025-7` becomes `CT-2025-0007`.
pub fn canonical_code(value: &str) -> Option<String> {
    parse_code(value).map(|(year, sequence)| format_code(year, sequence))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_code_of_the_year_starts_at_one() {
        assert_eq!(next_code(2025, Vec::<&str>::new()), "CT-2025-0001");
    }

    #[test]
    fn next_code_follows_numeric_max_of_the_same_year() {
        let existing = ["CT-2025-0009", "CT-2025-0010", "CT-2024-0500", "CT-2025-0002"];
        assert_eq!(next_code(2025, existing), "CT-2025-0011");
        assert_eq!(next_code(2024, existing), "CT-2024-0501");
    }

    #[test]
    fn malformed_suffixes_are_ignored() {
        let existing = ["CT-2025-ABCD", "CT-2025-0003"];
        assert_eq!(next_code(2025, existing), "CT-2025-0004");
    }

    #[test]
    fn sequence_keeps_growing_past_four_digits() {
        assert_eq!(next_code(2025, ["CT-2025-9999"]), "CT-2025-10000");
    }

    #[test]
    fn recognizes_contract_codes() {
        assert!(is_contract_code("CT-2023-0012"));
        assert!(is_contract_code("ct-2023-7"));
        assert!(!is_contract_code("CT-23-0012"));
        assert!(!is_contract_code("contrato escaneado"));
        assert!(!is_contract_code("CT-2023-0012-B"));
    }

    #[test]
    fn codes_are_canonicalized() {
        assert_eq!(parse_code("ct-2025-7"), Some((2025, 7)));
        assert_eq!(canonical_code("ct-2025-7").as_deref(), Some("CT-2025-0007"));
        assert_eq!(canonical_code("CT-2025-00012").as_deref(), Some("CT-2025-0012"));
        assert_eq!(canonical_code("CT-2025-X"), None);
    }
}
