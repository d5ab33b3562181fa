//! Styled worksheet tables on top of `rust_xlsxwriter`.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Worksheet, XlsxError};

/// Value written into one spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetCell {
    Text(String),
    Number(f64),
    Integer(i64),
    Money(Decimal),
    Empty,
}

impl From<&str> for SheetCell {
    fn from(value: &str) -> Self {
        SheetCell::Text(value.to_string())
    }
}

impl From<String> for SheetCell {
    fn from(value: String) -> Self {
        SheetCell::Text(value)
    }
}

impl From<Option<String>> for SheetCell {
    fn from(value: Option<String>) -> Self {
        value.map(SheetCell::Text).unwrap_or(SheetCell::Empty)
    }
}

impl From<Decimal> for SheetCell {
    fn from(value: Decimal) -> Self {
        SheetCell::Money(value)
    }
}

impl From<u64> for SheetCell {
    fn from(value: u64) -> Self {
        SheetCell::Integer(value as i64)
    }
}

/// Header + rows block written starting at a given row.
#[derive(Debug, Clone)]
pub struct SheetTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<SheetCell>>,
    /// RGB header fill, e.g. `0x1F4E79`.
    pub header_fill: u32,
    pub header_font_white: bool,
}

impl SheetTable {
    pub fn new(headers: &[&str], header_fill: u32, header_font_white: bool) -> Self {
        Self {
            headers: headers.iter().map(|header| header.to_string()).collect(),
            rows: Vec::new(),
            header_fill,
            header_font_white,
        }
    }

    pub fn push(&mut self, row: Vec<SheetCell>) {
        self.rows.push(row);
    }

    fn header_format(&self) -> Format {
        let font = if self.header_font_white {
            Color::White
        } else {
            Color::Black
        };
        Format::new()
            .set_bold()
            .set_font_color(font)
            .set_background_color(Color::RGB(self.header_fill))
            .set_align(FormatAlign::Center)
            .set_border(FormatBorder::Thin)
    }

    /// Write the table at `first_row`; returns the next free row.
    pub fn write(&self, worksheet: &mut Worksheet, first_row: u32) -> Result<u32, XlsxError> {
        let header = self.header_format();
        let money = Format::new().set_num_format("#,##0.00");

        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for (col, title) in self.headers.iter().enumerate() {
            worksheet.write_string_with_format(first_row, col as u16, title.as_str(), &header)?;
        }

        let mut row_idx = first_row + 1;
        for row in &self.rows {
            for (col, cell) in row.iter().enumerate() {
                let col_idx = col as u16;
                let shown = match cell {
                    SheetCell::Text(value) => {
                        worksheet.write_string(row_idx, col_idx, value.as_str())?;
                        value.chars().count()
                    }
                    SheetCell::Number(value) => {
                        worksheet.write_number(row_idx, col_idx, *value)?;
                        value.to_string().len()
                    }
                    SheetCell::Integer(value) => {
                        worksheet.write_number(row_idx, col_idx, *value as f64)?;
                        value.to_string().len()
                    }
                    SheetCell::Money(value) => {
                        let number = value.to_f64().unwrap_or_default();
                        worksheet.write_number_with_format(row_idx, col_idx, number, &money)?;
                        value.to_string().len() + 3
                    }
                    SheetCell::Empty => 0,
                };
                if let Some(width) = widths.get_mut(col) {
                    *width = (*width).max(shown);
                }
            }
            row_idx += 1;
        }

        for (col, width) in widths.iter().enumerate() {
            worksheet.set_column_width(col as u16, (*width).clamp(8, 60) as f64 + 2.0)?;
        }

        Ok(row_idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use rust_xlsxwriter::Workbook;

    #[test]
    fn writes_header_and_rows() {
        let mut table = SheetTable::new(&["Nombre", "Monto"], 0x1F4E79, true);
        table.push(vec!["ANA".into(), dec!(10.5).into()]);
        table.push(vec![SheetCell::Empty, SheetCell::Integer(3)]);

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        let next = table.write(worksheet, 2).expect("table written");
        assert_eq!(next, 5);

        let bytes = workbook.save_to_buffer().expect("workbook saved");
        assert!(bytes.starts_with(b"PK"));
    }
}
