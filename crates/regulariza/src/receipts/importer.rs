//! Spreadsheet import of receipts.
//!
//! Columns are positional after the header row; the header text itself is not
//! inspected. Each cell is coerced to its field type here, while duplicate
//! transfer references and the commit policy are handled by the service.

use std::io::Cursor;
use std::str::FromStr;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{Datelike, Days, NaiveDate, NaiveDateTime};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::domain::{Category, ReceiptInput, ReceiptStatus, CATEGORY_COUNT};
use crate::config::ImportConfig;

/// Expected column order, starting at the first column of the sheet.
pub const COLUMNS: [&str; 22] = [
    "Fecha",
    "Estado",
    "Nombre",
    "RIF/Cédula",
    "Dirección",
    "Ente Liquidado",
    "Gastos Adm",
    "Tasa Día",
    "Total Monto (Bs)",
    "N° Transferencia",
    "Conciliado",
    "Concepto",
    "Categoría 1",
    "Categoría 2",
    "Categoría 3",
    "Categoría 4",
    "Categoría 5",
    "Categoría 6",
    "Categoría 7",
    "Categoría 8",
    "Categoría 9",
    "Categoría 10",
];

const COL_FECHA: usize = 0;
const COL_ESTADO: usize = 1;
const COL_NOMBRE: usize = 2;
const COL_RIF: usize = 3;
const COL_DIRECCION: usize = 4;
const COL_ENTE: usize = 5;
const COL_GASTOS: usize = 6;
const COL_TASA: usize = 7;
const COL_TOTAL: usize = 8;
const COL_TRANSFERENCIA: usize = 9;
const COL_CONCILIADO: usize = 10;
const COL_CONCEPTO: usize = 11;
const COL_FIRST_CATEGORY: usize = 12;

const TRUE_TOKENS: [&str; 8] = ["SI", "SÍ", "S", "X", "1", "TRUE", "VERDADERO", "YES"];

const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d", "%d/%m/%y"];

/// What to do with the valid rows when some rows are rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportPolicy {
    /// Commit the valid rows and report the rejected ones.
    SkipInvalid,
    /// Abort on the first rejected row; nothing is committed.
    #[default]
    Atomic,
}

impl FromStr for ImportPolicy {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "atomic" | "atomico" => Ok(ImportPolicy::Atomic),
            "skip" | "skip_invalid" | "skip-invalid" | "omitir" => Ok(ImportPolicy::SkipInvalid),
            other => Err(format!("unknown import policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOptions {
    pub sheet_name: String,
    /// Zero-based index of the header row; data starts on the next row.
    pub header_row: usize,
    pub policy: ImportPolicy,
}

impl ImportOptions {
    pub fn from_config(config: &ImportConfig, policy: ImportPolicy) -> Self {
        Self {
            sheet_name: config.sheet_name.clone(),
            header_row: config.header_row,
            policy,
        }
    }
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self::from_config(&ImportConfig::default(), ImportPolicy::default())
    }
}

/// Row that passed cell coercion. `fila` is the 1-based spreadsheet row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRow {
    pub fila: usize,
    pub input: ReceiptInput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowRejection {
    pub fila: usize,
    pub motivo: String,
}

/// Outcome of reading every data row of the sheet.
#[derive(Debug, Clone, Default)]
pub struct SheetRows {
    pub parsed: Vec<ParsedRow>,
    pub rejected: Vec<RowRejection>,
}

impl SheetRows {
    pub fn is_empty(&self) -> bool {
        self.parsed.is_empty() && self.rejected.is_empty()
    }
}

/// Summary returned to the caller after a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub politica: ImportPolicy,
    pub filas_leidas: usize,
    pub importados: usize,
    pub numeros: Vec<u64>,
    pub rechazados: Vec<RowRejection>,
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("unable to read workbook: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("worksheet '{0}' not found")]
    MissingSheet(String),
    #[error("worksheet '{0}' has no receipt rows")]
    NoRows(String),
    #[error("row {fila}: {motivo}")]
    Rejected { fila: usize, motivo: String },
}

/// Read the configured sheet and coerce every non-blank data row.
pub fn read_rows(
    bytes: &[u8],
    options: &ImportOptions,
    default_date: NaiveDate,
) -> Result<SheetRows, ImportError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    if !workbook
        .sheet_names()
        .iter()
        .any(|name| name == &options.sheet_name)
    {
        return Err(ImportError::MissingSheet(options.sheet_name.clone()));
    }
    let range = workbook.worksheet_range(&options.sheet_name)?;

    // Ranges start at the first used cell, not at A1.
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let (start_row, start_col) = (start_row as usize, start_col as usize);

    let mut rows = SheetRows::default();
    for (offset, cells) in range.rows().enumerate() {
        let absolute = start_row + offset;
        if absolute <= options.header_row {
            continue;
        }
        let row = RowCells { cells, start_col };
        if (0..COLUMNS.len()).all(|column| is_blank(row.get(column))) {
            continue;
        }

        let fila = absolute + 1;
        match parse_row(&row, default_date) {
            Ok(input) => rows.parsed.push(ParsedRow { fila, input }),
            Err(motivo) => rows.rejected.push(RowRejection { fila, motivo }),
        }
    }

    if rows.is_empty() {
        return Err(ImportError::NoRows(options.sheet_name.clone()));
    }
    Ok(rows)
}

static EMPTY_CELL: Data = Data::Empty;

/// One sheet row addressed by logical column index.
struct RowCells<'a> {
    cells: &'a [Data],
    start_col: usize,
}

impl<'a> RowCells<'a> {
    fn get(&self, column: usize) -> &'a Data {
        column
            .checked_sub(self.start_col)
            .and_then(|idx| self.cells.get(idx))
            .unwrap_or(&EMPTY_CELL)
    }
}

fn parse_row(row: &RowCells<'_>, default_date: NaiveDate) -> Result<ReceiptInput, String> {
    let cell = |column: usize| row.get(column);
    let nombre = cell_text(cell(COL_NOMBRE)).ok_or_else(|| "missing Nombre".to_string())?;
    let rif_cedula_identidad =
        cell_text(cell(COL_RIF)).ok_or_else(|| "missing RIF/Cédula".to_string())?;

    let fecha = parse_date(cell(COL_FECHA))
        .map_err(|err| format!("Fecha: {err}"))?
        .unwrap_or(default_date);
    let estado = match cell_text(cell(COL_ESTADO)) {
        Some(raw) => {
            ReceiptStatus::parse(&raw).ok_or_else(|| format!("Estado: unknown status '{raw}'"))?
        }
        None => ReceiptStatus::Pagado,
    };

    let amount = |column: usize, label: &str, default: Decimal| {
        parse_decimal(cell(column))
            .map(|value| value.unwrap_or(default))
            .map_err(|err| format!("{label}: {err}"))
    };
    let gastos_administrativos = amount(COL_GASTOS, "Gastos Adm", Decimal::ZERO)?;
    let tasa_dia = amount(COL_TASA, "Tasa Día", Decimal::ONE)?;
    let total_monto_bs = amount(COL_TOTAL, "Total Monto (Bs)", Decimal::ZERO)?;

    let categorias = (0..CATEGORY_COUNT)
        .filter(|offset| parse_bool(cell(COL_FIRST_CATEGORY + offset)))
        .filter_map(|offset| Category::new(offset as u8 + 1))
        .collect();

    ReceiptInput {
        estado,
        nombre,
        rif_cedula_identidad,
        direccion_inmueble: cell_text(cell(COL_DIRECCION)),
        ente_liquidado: cell_text(cell(COL_ENTE)),
        gastos_administrativos,
        tasa_dia,
        total_monto_bs,
        numero_transferencia: cell_text(cell(COL_TRANSFERENCIA)),
        conciliado: parse_bool(cell(COL_CONCILIADO)),
        fecha,
        concepto: cell_text(cell(COL_CONCEPTO)).unwrap_or_else(|| "N/A".to_string()),
        categorias,
    }
    .normalized()
}

fn is_blank(data: &Data) -> bool {
    match data {
        Data::Empty => true,
        Data::String(value) => value.trim().is_empty(),
        _ => false,
    }
}

/// Cell rendered as trimmed text. Whole floats lose their `.0` so numeric
/// identity documents read as typed.
pub fn cell_text(data: &Data) -> Option<String> {
    let text = match data {
        Data::Empty | Data::Error(_) => return None,
        Data::String(value) | Data::DateTimeIso(value) | Data::DurationIso(value) => {
            value.trim().to_string()
        }
        Data::Float(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
            format!("{}", *value as i64)
        }
        Data::Float(value) => value.to_string(),
        Data::Int(value) => value.to_string(),
        Data::Bool(value) => if *value { "SI" } else { "NO" }.to_string(),
        Data::DateTime(value) => match value.as_datetime() {
            Some(datetime) => datetime.date().format("%Y-%m-%d").to_string(),
            None => value.as_f64().to_string(),
        },
    };
    (!text.is_empty()).then_some(text)
}

/// Membership in the accepted true-token set; anything else is false.
pub fn parse_bool(data: &Data) -> bool {
    match data {
        Data::Bool(value) => *value,
        Data::Int(value) => *value == 1,
        Data::Float(value) => *value == 1.0,
        Data::String(value) => {
            let token = value.trim().to_uppercase();
            TRUE_TOKENS.contains(&token.as_str())
        }
        _ => false,
    }
}

/// Decimal from a numeric cell or a localized string such as `1.234,56`,
/// `1,234.56` or `Bs. 1234,5`.
pub fn parse_decimal(data: &Data) -> Result<Option<Decimal>, String> {
    match data {
        Data::Empty => Ok(None),
        Data::Int(value) => Ok(Some(Decimal::from(*value))),
        Data::Float(value) => Decimal::from_f64(*value)
            .map(|value| Some(value.normalize()))
            .ok_or_else(|| format!("'{value}' is not a finite amount")),
        Data::String(value) => parse_decimal_text(value),
        other => Err(format!("unexpected cell '{other}'")),
    }
}

pub fn parse_decimal_text(raw: &str) -> Result<Option<Decimal>, String> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches("Bs.")
        .trim_start_matches("Bs")
        .trim_start_matches("BS")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '$')
        .collect();
    if cleaned.is_empty() {
        return Ok(None);
    }

    let dots = cleaned.matches('.').count();
    let commas = cleaned.matches(',').count();
    let canonical = match (dots, commas) {
        (0 | 1, 0) => cleaned.clone(),
        (_, 0) => cleaned.replace('.', ""),
        (0, 1) => cleaned.replace(',', "."),
        (0, _) => cleaned.replace(',', ""),
        _ => {
            let last_dot = cleaned.rfind('.').unwrap_or(0);
            let last_comma = cleaned.rfind(',').unwrap_or(0);
            if last_comma > last_dot {
                cleaned.replace('.', "").replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        }
    };

    Decimal::from_str(&canonical)
        .map(Some)
        .map_err(|_| format!("'{}' is not a valid amount", raw.trim()))
}

/// Spreadsheet serial day number (1900 date system) to a calendar date.
pub fn date_from_serial(serial: f64) -> Option<NaiveDate> {
    if !(1.0..2_958_466.0).contains(&serial) {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(serial.floor() as u64))
}

pub fn parse_date_text(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    // Timestamps such as `2025-01-15 00:00:00` keep only their date part.
    let date_part = raw.split_whitespace().next().unwrap_or(raw);
    let date_part = date_part.split('T').next().unwrap_or(date_part);
    DATE_FORMATS
        .iter()
        .find_map(|format| {
            NaiveDate::parse_from_str(date_part, format)
                .ok()
                // `%Y` also accepts two-digit years; leave those to `%y`.
                .filter(|date| format.contains("%y") || date.year() >= 1000)
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|datetime| datetime.date())
        })
}

pub fn parse_date(data: &Data) -> Result<Option<NaiveDate>, String> {
    match data {
        Data::Empty => Ok(None),
        Data::DateTime(value) => value
            .as_datetime()
            .map(|datetime| Some(datetime.date()))
            .ok_or_else(|| format!("'{}' is not a valid date", value.as_f64())),
        Data::Float(value) => date_from_serial(*value)
            .map(Some)
            .ok_or_else(|| format!("'{value}' is not a valid date serial")),
        Data::Int(value) => date_from_serial(*value as f64)
            .map(Some)
            .ok_or_else(|| format!("'{value}' is not a valid date serial")),
        Data::String(value) | Data::DateTimeIso(value) => {
            if value.trim().is_empty() {
                return Ok(None);
            }
            parse_date_text(value)
                .map(Some)
                .ok_or_else(|| format!("'{}' is not a recognized date", value.trim()))
        }
        other => Err(format!("unexpected cell '{other}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn text(value: &str) -> Data {
        Data::String(value.to_string())
    }

    #[test]
    fn boolean_tokens() {
        for token in ["si", "SÍ", " s ", "x", "1", "True", "VERDADERO", "yes"] {
            assert!(parse_bool(&text(token)), "{token} should be true");
        }
        for token in ["no", "", "0", "falso", "2"] {
            assert!(!parse_bool(&text(token)), "{token} should be false");
        }
        assert!(parse_bool(&Data::Bool(true)));
        assert!(parse_bool(&Data::Float(1.0)));
        assert!(!parse_bool(&Data::Int(0)));
        assert!(!parse_bool(&Data::Empty));
    }

    #[test]
    fn localized_amounts() {
        let cases = [
            ("1.234,56", dec!(1234.56)),
            ("1,234.56", dec!(1234.56)),
            ("Bs. 1234,5", dec!(1234.5)),
            ("1.500", dec!(1.5)),
            ("36.125", dec!(36.125)),
            ("12.5", dec!(12.5)),
            ("1.234.567", dec!(1234567)),
            ("2,75", dec!(2.75)),
            ("1,000,000", dec!(1000000)),
            ("$ 40", dec!(40)),
        ];
        for (raw, expected) in cases {
            assert_eq!(parse_decimal_text(raw), Ok(Some(expected)), "{raw}");
        }
        assert_eq!(parse_decimal_text("   "), Ok(None));
        assert!(parse_decimal_text("doce").is_err());
        assert_eq!(parse_decimal(&Data::Float(36.5)), Ok(Some(dec!(36.5))));
        assert_eq!(parse_decimal(&Data::Int(7)), Ok(Some(dec!(7))));
    }

    #[test]
    fn dates_from_text_and_serials() {
        let expected = NaiveDate::from_ymd_opt(2025, 1, 15);
        for raw in [
            "2025-01-15",
            "15/01/2025",
            "15-01-2025",
            "2025/01/15",
            "15/01/25",
            "2025-01-15 00:00:00",
        ] {
            assert_eq!(parse_date_text(raw), expected, "{raw}");
        }
        assert_eq!(parse_date_text("enero 15"), None);
        assert_eq!(date_from_serial(45672.0), expected);
        assert_eq!(parse_date(&Data::Float(45672.25)), Ok(expected));
        assert_eq!(parse_date(&Data::Empty), Ok(None));
        assert!(parse_date(&text("31/02/2025")).is_err());
        assert!(parse_date(&Data::Float(-3.0)).is_err());
    }

    #[test]
    fn cell_text_drops_float_suffix() {
        assert_eq!(cell_text(&Data::Float(12345678.0)).as_deref(), Some("12345678"));
        assert_eq!(cell_text(&text("  V-1 ")).as_deref(), Some("V-1"));
        assert_eq!(cell_text(&text("   ")), None);
        assert_eq!(cell_text(&Data::Empty), None);
    }

    #[test]
    fn policy_parsing() {
        assert_eq!("omitir".parse::<ImportPolicy>(), Ok(ImportPolicy::SkipInvalid));
        assert_eq!("ATOMIC".parse::<ImportPolicy>(), Ok(ImportPolicy::Atomic));
        assert!("maybe".parse::<ImportPolicy>().is_err());
        assert_eq!(ImportPolicy::default(), ImportPolicy::Atomic);
    }
}
