use super::domain::Receipt;
use crate::error::RepositoryError;

/// Storage abstraction for receipts.
///
/// Implementations assign ids and keep `numero_recibo` and
/// `numero_transferencia` unique, reporting clashes as
/// [`RepositoryError::Conflict`].
pub trait ReceiptRepository: Send + Sync {
    fn insert(&self, receipt: Receipt) -> Result<Receipt, RepositoryError>;
    /// All-or-nothing insert used by the spreadsheet import.
    fn insert_batch(&self, receipts: Vec<Receipt>) -> Result<Vec<Receipt>, RepositoryError>;
    fn update(&self, receipt: Receipt) -> Result<(), RepositoryError>;
    fn fetch(&self, id: u64) -> Result<Option<Receipt>, RepositoryError>;
    fn list(&self) -> Result<Vec<Receipt>, RepositoryError>;
    fn max_number(&self) -> Result<Option<u64>, RepositoryError>;
    fn transfer_exists(&self, reference: &str) -> Result<bool, RepositoryError>;
}
