//! Process-local storage behind the repository traits, used by the API
//! binary and the tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::beneficiaries::{Beneficiary, BeneficiaryRepository, ExpedienteDocument, Visit};
use crate::contracts::{Contract, ContractRepository, HistoryEntry, InstitutionalConfig};
use crate::error::RepositoryError;
use crate::receipts::{Receipt, ReceiptRepository};
use crate::storage::{numbered_key, FileStore, StorageError};
use crate::users::{User, UserDirectory};

#[derive(Debug, Default)]
struct Tables {
    next_id: u64,
    beneficiaries: BTreeMap<u64, Beneficiary>,
    documents: BTreeMap<u64, ExpedienteDocument>,
    visits: BTreeMap<u64, Visit>,
    contracts: BTreeMap<u64, Contract>,
    history: Vec<HistoryEntry>,
    institution: InstitutionalConfig,
    receipts: BTreeMap<u64, Receipt>,
    users: BTreeMap<String, User>,
}

impl Tables {
    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn receipt_clash(&self, receipt: &Receipt) -> Option<String> {
        self.receipts.values().find_map(|stored| {
            if stored.id == receipt.id {
                return None;
            }
            if stored.numero_recibo == receipt.numero_recibo {
                return Some(format!(
                    "receipt number {} already exists",
                    receipt.numero_recibo
                ));
            }
            match (&stored.numero_transferencia, &receipt.numero_transferencia) {
                (Some(a), Some(b)) if a == b => {
                    Some(format!("transfer reference {b} already exists"))
                }
                _ => None,
            }
        })
    }
}

/// Every table behind one lock, so multi-table operations stay consistent.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }
}

impl BeneficiaryRepository for InMemoryStore {
    fn insert(&self, mut beneficiary: Beneficiary) -> Result<Beneficiary, RepositoryError> {
        let mut tables = self.lock()?;
        if tables
            .beneficiaries
            .values()
            .any(|stored| stored.documento_identidad == beneficiary.documento_identidad)
        {
            return Err(RepositoryError::Conflict(format!(
                "documento {} already registered",
                beneficiary.documento_identidad
            )));
        }
        beneficiary.id = tables.allocate();
        tables
            .beneficiaries
            .insert(beneficiary.id, beneficiary.clone());
        Ok(beneficiary)
    }

    fn update(&self, beneficiary: Beneficiary) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        if tables.beneficiaries.values().any(|stored| {
            stored.id != beneficiary.id
                && stored.documento_identidad == beneficiary.documento_identidad
        }) {
            return Err(RepositoryError::Conflict(format!(
                "documento {} already registered",
                beneficiary.documento_identidad
            )));
        }
        match tables.beneficiaries.get_mut(&beneficiary.id) {
            Some(stored) => {
                *stored = beneficiary;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, id: u64) -> Result<Option<Beneficiary>, RepositoryError> {
        Ok(self.lock()?.beneficiaries.get(&id).cloned())
    }

    fn find_by_document(&self, documento: &str) -> Result<Option<Beneficiary>, RepositoryError> {
        Ok(self
            .lock()?
            .beneficiaries
            .values()
            .find(|stored| stored.documento_identidad == documento)
            .cloned())
    }

    fn list(&self) -> Result<Vec<Beneficiary>, RepositoryError> {
        Ok(self.lock()?.beneficiaries.values().cloned().collect())
    }

    fn delete(&self, id: u64) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        if tables.beneficiaries.remove(&id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        tables.documents.retain(|_, doc| doc.beneficiary_id != id);
        tables.visits.retain(|_, visit| visit.beneficiary_id != id);
        Ok(())
    }

    fn contract_count(&self, id: u64) -> Result<usize, RepositoryError> {
        Ok(self
            .lock()?
            .contracts
            .values()
            .filter(|contract| contract.beneficiary_ids.contains(&id))
            .count())
    }

    fn insert_document(
        &self,
        mut document: ExpedienteDocument,
    ) -> Result<ExpedienteDocument, RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.beneficiaries.contains_key(&document.beneficiary_id) {
            return Err(RepositoryError::NotFound);
        }
        document.id = tables.allocate();
        tables.documents.insert(document.id, document.clone());
        Ok(document)
    }

    fn documents(&self, beneficiary_id: u64) -> Result<Vec<ExpedienteDocument>, RepositoryError> {
        Ok(self
            .lock()?
            .documents
            .values()
            .filter(|doc| doc.beneficiary_id == beneficiary_id)
            .cloned()
            .collect())
    }

    fn fetch_document(&self, id: u64) -> Result<Option<ExpedienteDocument>, RepositoryError> {
        Ok(self.lock()?.documents.get(&id).cloned())
    }

    fn delete_document(&self, id: u64) -> Result<(), RepositoryError> {
        self.lock()?
            .documents
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn insert_visit(&self, mut visit: Visit) -> Result<Visit, RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.beneficiaries.contains_key(&visit.beneficiary_id) {
            return Err(RepositoryError::NotFound);
        }
        visit.id = tables.allocate();
        tables.visits.insert(visit.id, visit.clone());
        Ok(visit)
    }

    fn visits(&self, beneficiary_id: u64) -> Result<Vec<Visit>, RepositoryError> {
        Ok(self
            .lock()?
            .visits
            .values()
            .filter(|visit| visit.beneficiary_id == beneficiary_id)
            .cloned()
            .collect())
    }
}

impl ContractRepository for InMemoryStore {
    fn insert(&self, mut contract: Contract) -> Result<Contract, RepositoryError> {
        let mut tables = self.lock()?;
        if tables
            .contracts
            .values()
            .any(|stored| stored.codigo_contrato == contract.codigo_contrato)
        {
            return Err(RepositoryError::Conflict(format!(
                "contract code {} already exists",
                contract.codigo_contrato
            )));
        }
        contract.id = tables.allocate();
        tables.contracts.insert(contract.id, contract.clone());
        Ok(contract)
    }

    fn update(&self, contract: Contract) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        match tables.contracts.get_mut(&contract.id) {
            Some(stored) => {
                *stored = contract;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, id: u64) -> Result<Option<Contract>, RepositoryError> {
        Ok(self.lock()?.contracts.get(&id).cloned())
    }

    fn list(&self) -> Result<Vec<Contract>, RepositoryError> {
        Ok(self.lock()?.contracts.values().cloned().collect())
    }

    fn codes_with_prefix(&self, prefix: &str) -> Result<Vec<String>, RepositoryError> {
        Ok(self
            .lock()?
            .contracts
            .values()
            .filter(|contract| contract.codigo_contrato.starts_with(prefix))
            .map(|contract| contract.codigo_contrato.clone())
            .collect())
    }

    fn append_history(&self, mut entry: HistoryEntry) -> Result<HistoryEntry, RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.contracts.contains_key(&entry.contract_id) {
            return Err(RepositoryError::NotFound);
        }
        entry.id = tables.allocate();
        tables.history.push(entry.clone());
        Ok(entry)
    }

    fn history(&self, contract_id: u64) -> Result<Vec<HistoryEntry>, RepositoryError> {
        Ok(self
            .lock()?
            .history
            .iter()
            .filter(|entry| entry.contract_id == contract_id)
            .cloned()
            .collect())
    }

    fn institution(&self) -> Result<InstitutionalConfig, RepositoryError> {
        Ok(self.lock()?.institution.clone())
    }

    fn save_institution(&self, config: InstitutionalConfig) -> Result<(), RepositoryError> {
        self.lock()?.institution = config;
        Ok(())
    }
}

impl ReceiptRepository for InMemoryStore {
    fn insert(&self, mut receipt: Receipt) -> Result<Receipt, RepositoryError> {
        let mut tables = self.lock()?;
        receipt.id = 0;
        if let Some(detail) = tables.receipt_clash(&receipt) {
            return Err(RepositoryError::Conflict(detail));
        }
        receipt.id = tables.allocate();
        tables.receipts.insert(receipt.id, receipt.clone());
        Ok(receipt)
    }

    fn insert_batch(&self, receipts: Vec<Receipt>) -> Result<Vec<Receipt>, RepositoryError> {
        let mut tables = self.lock()?;
        let mut numbers = HashMap::new();
        let mut references = HashMap::new();
        for (idx, receipt) in receipts.iter().enumerate() {
            if let Some(detail) = tables.receipt_clash(receipt) {
                return Err(RepositoryError::Conflict(detail));
            }
            if numbers.insert(receipt.numero_recibo, idx).is_some() {
                return Err(RepositoryError::Conflict(format!(
                    "receipt number {} repeated in batch",
                    receipt.numero_recibo
                )));
            }
            if let Some(reference) = &receipt.numero_transferencia {
                if references.insert(reference.clone(), idx).is_some() {
                    return Err(RepositoryError::Conflict(format!(
                        "transfer reference {reference} repeated in batch"
                    )));
                }
            }
        }

        let mut stored = Vec::with_capacity(receipts.len());
        for mut receipt in receipts {
            receipt.id = tables.allocate();
            tables.receipts.insert(receipt.id, receipt.clone());
            stored.push(receipt);
        }
        Ok(stored)
    }

    fn update(&self, receipt: Receipt) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.receipts.contains_key(&receipt.id) {
            return Err(RepositoryError::NotFound);
        }
        if let Some(detail) = tables.receipt_clash(&receipt) {
            return Err(RepositoryError::Conflict(detail));
        }
        tables.receipts.insert(receipt.id, receipt);
        Ok(())
    }

    fn fetch(&self, id: u64) -> Result<Option<Receipt>, RepositoryError> {
        Ok(self.lock()?.receipts.get(&id).cloned())
    }

    fn list(&self) -> Result<Vec<Receipt>, RepositoryError> {
        Ok(self.lock()?.receipts.values().cloned().collect())
    }

    fn max_number(&self) -> Result<Option<u64>, RepositoryError> {
        Ok(self
            .lock()?
            .receipts
            .values()
            .map(|receipt| receipt.numero_recibo)
            .max())
    }

    fn transfer_exists(&self, reference: &str) -> Result<bool, RepositoryError> {
        Ok(self
            .lock()?
            .receipts
            .values()
            .any(|receipt| receipt.numero_transferencia.as_deref() == Some(reference)))
    }
}

impl UserDirectory for InMemoryStore {
    fn find(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self.lock()?.users.get(username).cloned())
    }

    fn list(&self) -> Result<Vec<User>, RepositoryError> {
        Ok(self.lock()?.users.values().cloned().collect())
    }

    fn insert(&self, user: User) -> Result<User, RepositoryError> {
        let mut tables = self.lock()?;
        if tables.users.contains_key(&user.username) {
            return Err(RepositoryError::Conflict(format!(
                "username {} already exists",
                user.username
            )));
        }
        tables.users.insert(user.username.clone(), user.clone());
        Ok(user)
    }
}

/// File store kept in memory; a taken key gets a numbered suffix.
#[derive(Debug, Default, Clone)]
pub struct MemoryFileStore {
    files: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, Vec<u8>>>, StorageError> {
        self.files
            .lock()
            .map_err(|_| StorageError::Io(std::io::Error::other("file store mutex poisoned")))
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock()
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl FileStore for MemoryFileStore {
    fn save(&self, key: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let mut files = self.lock()?;
        let mut chosen = key.to_string();
        let mut attempt = 0;
        while files.contains_key(&chosen) {
            attempt += 1;
            chosen = numbered_key(key, attempt);
        }
        files.insert(chosen.clone(), bytes.to_vec());
        Ok(chosen)
    }

    fn read(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.lock()?
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.lock()?
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receipts::{ReceiptInput, ReceiptStatus};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn receipt(numero: u64, transferencia: Option<&str>) -> Receipt {
        let fecha = NaiveDate::from_ymd_opt(2025, 7, 1).expect("valid date");
        ReceiptInput {
            estado: ReceiptStatus::Pagado,
            nombre: "Caja".to_string(),
            rif_cedula_identidad: "V-1".to_string(),
            direccion_inmueble: None,
            ente_liquidado: None,
            gastos_administrativos: Decimal::ZERO,
            tasa_dia: Decimal::ONE,
            total_monto_bs: Decimal::TEN,
            numero_transferencia: transferencia.map(str::to_string),
            conciliado: false,
            fecha,
            concepto: "Pago".to_string(),
            categorias: Vec::new(),
        }
        .into_receipt(numero, None, fecha.and_hms_opt(8, 0, 0).expect("valid time"))
    }

    #[test]
    fn receipt_numbers_and_transfers_stay_unique() {
        let store = InMemoryStore::new();
        ReceiptRepository::insert(&store, receipt(1, Some("T-1"))).expect("first");

        assert!(matches!(
            ReceiptRepository::insert(&store, receipt(1, None)),
            Err(RepositoryError::Conflict(_))
        ));
        assert!(matches!(
            ReceiptRepository::insert(&store, receipt(2, Some("T-1"))),
            Err(RepositoryError::Conflict(_))
        ));

        let batch = vec![receipt(2, Some("T-2")), receipt(2, Some("T-3"))];
        assert!(matches!(
            store.insert_batch(batch),
            Err(RepositoryError::Conflict(_))
        ));
        assert_eq!(store.max_number().expect("max"), Some(1));

        let stored = store
            .insert_batch(vec![receipt(2, Some("T-2")), receipt(3, None)])
            .expect("batch");
        assert_eq!(stored.len(), 2);
        assert_eq!(store.max_number().expect("max"), Some(3));
    }

    #[test]
    fn file_store_numbers_taken_keys() {
        let store = MemoryFileStore::new();
        let first = store.save("expedientes/V1/cedula.pdf", b"a").expect("save");
        let second = store.save("expedientes/V1/cedula.pdf", b"b").expect("save");
        assert_eq!(first, "expedientes/V1/cedula.pdf");
        assert_eq!(second, "expedientes/V1/cedula_1.pdf");
        assert_eq!(store.read(&second).expect("read"), b"b".to_vec());
        store.remove(&first).expect("remove");
        assert!(matches!(store.read(&first), Err(StorageError::NotFound(_))));
    }
}
