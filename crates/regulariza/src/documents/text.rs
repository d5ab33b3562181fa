//! Formatting helpers for Venezuelan amounts, dates and wrapped text.

use chrono::{Datelike, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};

const MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

pub fn month_name(month: u32) -> &'static str {
    MONTHS
        .get(month.saturating_sub(1) as usize)
        .copied()
        .unwrap_or("S/D")
}

/// `1234567.5` -> `1.234.567,50` with the given number of decimals.
pub fn format_amount(value: Decimal, decimals: u32) -> String {
    let rounded = value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let plain = format!("{:.*}", decimals as usize, rounded.abs());
    let (int_part, frac_part) = match plain.split_once('.') {
        Some((int_part, frac_part)) => (int_part.to_string(), Some(frac_part.to_string())),
        None => (plain, None),
    };

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::new();
    for (idx, digit) in digits.iter().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(*digit);
    }

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(frac_part) = frac_part {
        out.push(',');
        out.push_str(&frac_part);
    }
    out
}

/// Currency rendering used on receipts and contracts.
pub fn format_bs(value: Decimal) -> String {
    format!("Bs. {}", format_amount(value, 2))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Long legal form: "a los 5 días del mes de marzo de 2025".
pub fn legal_date(date: NaiveDate) -> String {
    format!(
        "a los {} días del mes de {} de {}",
        date.day(),
        month_name(date.month()),
        date.year()
    )
}

/// Greedy word wrap by character count; explicit newlines start new lines.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        let mut current_len = 0usize;
        for word in paragraph.split_whitespace() {
            let word_len = word.chars().count();
            if current_len > 0 && current_len + 1 + word_len > max_chars {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if word_len > max_chars {
                let chars: Vec<char> = word.chars().collect();
                for chunk in chars.chunks(max_chars) {
                    if current_len > 0 {
                        lines.push(std::mem::take(&mut current));
                    }
                    current = chunk.iter().collect();
                    current_len = chunk.len();
                }
                continue;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current.push_str(word);
            current_len += word_len;
        }
        lines.push(current);
    }

    lines
}

/// Cut `text` to `max_chars`, marking the cut with an ellipsis.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn amounts_use_venezuelan_separators() {
        assert_eq!(format_amount(dec!(1234567.5), 2), "1.234.567,50");
        assert_eq!(format_amount(dec!(12), 2), "12,00");
        assert_eq!(format_amount(dec!(-1000), 0), "-1.000");
        assert_eq!(format_amount(dec!(0.12345), 4), "0,1235");
        assert_eq!(format_bs(dec!(950.255)), "Bs. 950,26");
    }

    #[test]
    fn legal_dates_spell_the_month() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 5).expect("valid date");
        assert_eq!(legal_date(date), "a los 5 días del mes de marzo de 2025");
        assert_eq!(format_date(date), "05/03/2025");
    }

    #[test]
    fn wrap_breaks_on_words_and_keeps_paragraphs() {
        let lines = wrap_text("uno dos tres cuatro\ncinco", 9);
        assert_eq!(lines, vec!["uno dos", "tres", "cuatro", "cinco"]);
    }

    #[test]
    fn wrap_splits_words_longer_than_the_line() {
        let lines = wrap_text("abcdefghij", 4);
        assert_eq!(lines, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn truncate_marks_cut_text() {
        assert_eq!(truncate("CATEGORIAS", 7), "CATE...");
        assert_eq!(truncate("corto", 10), "corto");
    }
}
