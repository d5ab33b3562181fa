//! Payment receipts: numbering, voiding, category flags, the spreadsheet
//! import and filtered reports.

pub mod domain;
pub mod filter;
pub mod importer;
pub mod pdf;
pub mod report;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    next_receipt_number, Category, CategoryFlags, Receipt, ReceiptInput, ReceiptStatus,
    CATEGORY_COUNT,
};
pub use filter::{ReceiptFilter, ReceiptFilterQuery, StatusFilter};
pub use importer::{ImportError, ImportOptions, ImportPolicy, ImportReport, RowRejection};
pub use report::{CategoryTotal, Dashboard, ReportSummary};
pub use repository::ReceiptRepository;
pub use router::receipt_router;
pub use service::{ReceiptError, ReceiptService};
