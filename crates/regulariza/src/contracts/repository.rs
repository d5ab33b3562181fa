use super::domain::{Contract, HistoryEntry};
use super::institution::InstitutionalConfig;
use crate::error::RepositoryError;

/// Storage abstraction for contracts, their audit trail and the singleton
/// institutional configuration.
///
/// `insert` assigns the id and must reject a `codigo_contrato` that is
/// already taken with [`RepositoryError::Conflict`].
pub trait ContractRepository: Send + Sync {
    fn insert(&self, contract: Contract) -> Result<Contract, RepositoryError>;
    fn update(&self, contract: Contract) -> Result<(), RepositoryError>;
    fn fetch(&self, id: u64) -> Result<Option<Contract>, RepositoryError>;
    fn list(&self) -> Result<Vec<Contract>, RepositoryError>;
    /// Codes starting with `prefix`, in no particular order.
    fn codes_with_prefix(&self, prefix: &str) -> Result<Vec<String>, RepositoryError>;

    fn append_history(&self, entry: HistoryEntry) -> Result<HistoryEntry, RepositoryError>;
    fn history(&self, contract_id: u64) -> Result<Vec<HistoryEntry>, RepositoryError>;

    fn institution(&self) -> Result<InstitutionalConfig, RepositoryError>;
    fn save_institution(&self, config: InstitutionalConfig) -> Result<(), RepositoryError>;
}
