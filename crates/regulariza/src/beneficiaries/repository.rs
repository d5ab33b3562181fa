use super::domain::{Beneficiary, ExpedienteDocument, Visit};
use crate::error::RepositoryError;

/// Storage abstraction for beneficiaries and the records they own.
///
/// Implementations assign ids on insert and enforce uniqueness of
/// `documento_identidad`, reporting clashes as [`RepositoryError::Conflict`].
pub trait BeneficiaryRepository: Send + Sync {
    fn insert(&self, beneficiary: Beneficiary) -> Result<Beneficiary, RepositoryError>;
    fn update(&self, beneficiary: Beneficiary) -> Result<(), RepositoryError>;
    fn fetch(&self, id: u64) -> Result<Option<Beneficiary>, RepositoryError>;
    fn find_by_document(&self, documento: &str) -> Result<Option<Beneficiary>, RepositoryError>;
    fn list(&self) -> Result<Vec<Beneficiary>, RepositoryError>;
    /// Removes the beneficiary together with its documents and visits.
    fn delete(&self, id: u64) -> Result<(), RepositoryError>;
    /// Number of contracts naming this beneficiary.
    fn contract_count(&self, id: u64) -> Result<usize, RepositoryError>;

    fn insert_document(
        &self,
        document: ExpedienteDocument,
    ) -> Result<ExpedienteDocument, RepositoryError>;
    fn documents(&self, beneficiary_id: u64) -> Result<Vec<ExpedienteDocument>, RepositoryError>;
    fn fetch_document(&self, id: u64) -> Result<Option<ExpedienteDocument>, RepositoryError>;
    fn delete_document(&self, id: u64) -> Result<(), RepositoryError>;

    fn insert_visit(&self, visit: Visit) -> Result<Visit, RepositoryError>;
    fn visits(&self, beneficiary_id: u64) -> Result<Vec<Visit>, RepositoryError>;
}
