//! Document generation shared by contracts and receipts: a hand-placed PDF
//! canvas and styled spreadsheet helpers.

pub mod pdf;
pub mod sheet;
pub mod text;

pub use pdf::{Orientation, PdfCanvas, TextStyle};
pub use sheet::{SheetCell, SheetTable};

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("pdf rendering failed: {0}")]
    Pdf(String),
    #[error("spreadsheet rendering failed: {0}")]
    Sheet(#[from] rust_xlsxwriter::XlsxError),
}
