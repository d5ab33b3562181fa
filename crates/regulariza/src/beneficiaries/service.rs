use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::NaiveDateTime;
use tracing::{info, warn};

use super::domain::{
    blank_to_none, Beneficiary, BeneficiaryDetail, BeneficiaryInput, BeneficiaryMatch,
    ExpedienteDocument, Visit, VisitInput,
};
use super::export::registry_workbook;
use super::repository::BeneficiaryRepository;
use crate::documents::DocumentError;
use crate::error::RepositoryError;
use crate::http::json_error;
use crate::storage::{expediente_key, FileStore, StorageError};

const SEARCH_LIMIT: usize = 10;

/// Raw upload handed to [`BeneficiaryService::attach_documents`].
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Service composing the beneficiary repository and the upload store.
pub struct BeneficiaryService<R, F> {
    repository: Arc<R>,
    files: Arc<F>,
}

impl<R, F> BeneficiaryService<R, F>
where
    R: BeneficiaryRepository + 'static,
    F: FileStore + 'static,
{
    pub fn new(repository: Arc<R>, files: Arc<F>) -> Self {
        Self { repository, files }
    }

    pub fn create(&self, input: BeneficiaryInput) -> Result<Beneficiary, BeneficiaryError> {
        let beneficiary = input.normalize(0).map_err(BeneficiaryError::Validation)?;
        if self
            .repository
            .find_by_document(&beneficiary.documento_identidad)?
            .is_some()
        {
            return Err(BeneficiaryError::DuplicateDocument(
                beneficiary.documento_identidad,
            ));
        }

        let stored = self.repository.insert(beneficiary)?;
        info!(id = stored.id, documento = %stored.full_document(), "beneficiary registered");
        Ok(stored)
    }

    pub fn update(
        &self,
        id: u64,
        input: BeneficiaryInput,
    ) -> Result<Beneficiary, BeneficiaryError> {
        self.get(id)?;
        let beneficiary = input.normalize(id).map_err(BeneficiaryError::Validation)?;
        if let Some(existing) = self
            .repository
            .find_by_document(&beneficiary.documento_identidad)?
        {
            if existing.id != id {
                return Err(BeneficiaryError::DuplicateDocument(
                    beneficiary.documento_identidad,
                ));
            }
        }

        self.repository.update(beneficiary.clone())?;
        info!(id, "beneficiary updated");
        Ok(beneficiary)
    }

    pub fn get(&self, id: u64) -> Result<Beneficiary, BeneficiaryError> {
        self.repository
            .fetch(id)?
            .ok_or(BeneficiaryError::NotFound)
    }

    /// Registry listing, filtered by a case-insensitive name/document match.
    pub fn list(&self, query: Option<&str>) -> Result<Vec<Beneficiary>, BeneficiaryError> {
        let mut beneficiaries = self.repository.list()?;
        if let Some(needle) = query.map(str::trim).filter(|q| !q.is_empty()) {
            let needle = needle.to_uppercase();
            beneficiaries.retain(|beneficiary| {
                beneficiary.nombre_completo.contains(&needle)
                    || beneficiary.documento_identidad.contains(&needle)
            });
        }
        beneficiaries.sort_by(|a, b| a.nombre_completo.cmp(&b.nombre_completo));
        Ok(beneficiaries)
    }

    pub fn search(&self, query: &str) -> Result<Vec<BeneficiaryMatch>, BeneficiaryError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .list(Some(query))?
            .iter()
            .take(SEARCH_LIMIT)
            .map(BeneficiaryMatch::from)
            .collect())
    }

    pub fn detail(&self, id: u64) -> Result<BeneficiaryDetail, BeneficiaryError> {
        let beneficiary = self.get(id)?;
        let mut documentos = self.repository.documents(id)?;
        documentos.sort_by(|a, b| b.fecha_subida.cmp(&a.fecha_subida));
        let mut visitas = self.repository.visits(id)?;
        visitas.sort_by(|a, b| b.fecha.cmp(&a.fecha).then(b.id.cmp(&a.id)));
        let contratos = self.repository.contract_count(id)?;

        Ok(BeneficiaryDetail {
            beneficiary,
            documentos,
            visitas,
            contratos,
        })
    }

    /// Hard delete; refused while any contract still names the beneficiary.
    pub fn delete(&self, id: u64) -> Result<Beneficiary, BeneficiaryError> {
        let beneficiary = self.get(id)?;
        let contracts = self.repository.contract_count(id)?;
        if contracts > 0 {
            return Err(BeneficiaryError::LinkedToContracts(contracts));
        }

        for document in self.repository.documents(id)? {
            if let Err(err) = self.files.remove(&document.archivo) {
                warn!(document = document.id, error = %err, "unable to remove expediente file");
            }
        }
        self.repository.delete(id)?;
        info!(id, nombre = %beneficiary.nombre_completo, "beneficiary deleted");
        Ok(beneficiary)
    }

    /// Store each upload in the beneficiary folder. The label defaults to the
    /// file name when none is given.
    pub fn attach_documents(
        &self,
        id: u64,
        label: Option<String>,
        uploads: Vec<UploadedDocument>,
        now: NaiveDateTime,
    ) -> Result<Vec<ExpedienteDocument>, BeneficiaryError> {
        let beneficiary = self.get(id)?;
        if uploads.is_empty() {
            return Err(BeneficiaryError::NoFiles);
        }
        let label = blank_to_none(label);

        let mut stored = Vec::with_capacity(uploads.len());
        for upload in uploads {
            let key = expediente_key(&beneficiary.documento_identidad, &upload.file_name);
            let archivo = self.files.save(&key, &upload.bytes)?;
            let document = self.repository.insert_document(ExpedienteDocument {
                id: 0,
                beneficiary_id: id,
                nombre_documento: label.clone().unwrap_or_else(|| upload.file_name.clone()),
                archivo,
                fecha_subida: now,
            })?;
            stored.push(document);
        }

        info!(id, files = stored.len(), "expediente documents uploaded");
        Ok(stored)
    }

    pub fn read_document(
        &self,
        document_id: u64,
    ) -> Result<(ExpedienteDocument, Vec<u8>), BeneficiaryError> {
        let document = self
            .repository
            .fetch_document(document_id)?
            .ok_or(BeneficiaryError::NotFound)?;
        let bytes = self.files.read(&document.archivo)?;
        Ok((document, bytes))
    }

    /// Removes the record and the stored file; returns the owning beneficiary id.
    pub fn delete_document(&self, document_id: u64) -> Result<u64, BeneficiaryError> {
        let document = self
            .repository
            .fetch_document(document_id)?
            .ok_or(BeneficiaryError::NotFound)?;
        self.files.remove(&document.archivo)?;
        self.repository.delete_document(document_id)?;
        info!(
            document = document_id,
            beneficiary = document.beneficiary_id,
            "expediente document removed"
        );
        Ok(document.beneficiary_id)
    }

    pub fn register_visit(
        &self,
        id: u64,
        input: VisitInput,
        registrado_por: &str,
        now: NaiveDateTime,
    ) -> Result<Visit, BeneficiaryError> {
        self.get(id)?;
        let motivo = input.motivo.trim().to_string();
        if motivo.is_empty() {
            return Err(BeneficiaryError::Validation("motivo is required".to_string()));
        }

        let visit = self.repository.insert_visit(Visit {
            id: 0,
            beneficiary_id: id,
            motivo,
            observaciones: blank_to_none(input.observaciones),
            fecha: now,
            registrado_por: registrado_por.to_string(),
        })?;
        info!(beneficiary = id, visit = visit.id, "visit registered");
        Ok(visit)
    }

    pub fn export_excel(&self) -> Result<Vec<u8>, BeneficiaryError> {
        let beneficiaries = self.list(None)?;
        Ok(registry_workbook(&beneficiaries)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BeneficiaryError {
    #[error("invalid beneficiary data: {0}")]
    Validation(String),
    #[error("document {0} is already registered")]
    DuplicateDocument(String),
    #[error("beneficiary not found")]
    NotFound,
    #[error("beneficiary is linked to {0} contract(s)")]
    LinkedToContracts(usize),
    #[error("no files were selected")]
    NoFiles,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Document(#[from] DocumentError),
}

impl BeneficiaryError {
    pub fn status(&self) -> StatusCode {
        match self {
            BeneficiaryError::Validation(_) | BeneficiaryError::NoFiles => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            BeneficiaryError::DuplicateDocument(_)
            | BeneficiaryError::LinkedToContracts(_)
            | BeneficiaryError::Repository(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
            BeneficiaryError::NotFound
            | BeneficiaryError::Repository(RepositoryError::NotFound)
            | BeneficiaryError::Storage(StorageError::NotFound(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BeneficiaryError {
    fn into_response(self) -> Response {
        json_error(self.status(), self.to_string())
    }
}
