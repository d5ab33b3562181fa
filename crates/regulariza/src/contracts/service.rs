use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{Datelike, NaiveDateTime};
use tracing::info;

use super::code::{canonical_code, code_prefix, format_code, next_code, parse_code};
use super::domain::{
    Contract, ContractDetail, ContractFilter, ContractInput, ContractState, ContractStats,
    HistoryEntry, DEFAULT_CONTRACT_TYPE,
};
use super::export::contracts_workbook;
use super::institution::InstitutionalConfig;
use super::legal_text::{assemble_legal_body, LegalContext};
use super::pdf::render_contract;
use super::repository::ContractRepository;
use crate::beneficiaries::{Beneficiary, BeneficiaryRepository};
use crate::documents::DocumentError;
use crate::error::RepositoryError;
use crate::http::json_error;
use crate::storage::{scanned_contract_key, FileStore, StorageError};

pub const ACTION_CREATED: &str = "CREACION";
pub const ACTION_EDITED: &str = "EDICION";
pub const ACTION_REGENERATED: &str = "REGENERACION";
pub const ACTION_SUBMITTED: &str = "ENVIO_REVISION";
pub const ACTION_APPROVED: &str = "APROBACION";
pub const ACTION_ANNULLED: &str = "ANULACION";
pub const ACTION_IMPORTED: &str = "IMPORTACION";

/// Digitized contract uploaded through the bulk import.
#[derive(Debug, Clone)]
pub struct ScannedContract {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ScannedContract {
    fn stem(&self) -> &str {
        let name = self.file_name.rsplit(['/', '\\']).next().unwrap_or_default();
        match name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem.trim(),
            _ => name.trim(),
        }
    }

    /// Code carried by the file name, when it has the contract code shape.
    pub fn embedded_code(&self) -> Option<String> {
        canonical_code(self.stem())
    }
}

/// Contract workflow: drafting, the approval lifecycle and document output.
pub struct ContractService<C, B, F> {
    contracts: Arc<C>,
    beneficiaries: Arc<B>,
    files: Arc<F>,
}

impl<C, B, F> ContractService<C, B, F>
where
    C: ContractRepository + 'static,
    B: BeneficiaryRepository + 'static,
    F: FileStore + 'static,
{
    pub fn new(contracts: Arc<C>, beneficiaries: Arc<B>, files: Arc<F>) -> Self {
        Self {
            contracts,
            beneficiaries,
            files,
        }
    }

    /// Resolve every id in order, rejecting empty or unknown selections.
    fn load_beneficiaries(&self, ids: &[u64]) -> Result<Vec<Beneficiary>, ContractError> {
        let mut seen = HashSet::new();
        let unique: Vec<u64> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();
        if unique.is_empty() {
            return Err(ContractError::Validation(
                "at least one beneficiary is required".to_string(),
            ));
        }

        unique
            .into_iter()
            .map(|id| {
                self.beneficiaries
                    .fetch(id)?
                    .ok_or(ContractError::UnknownBeneficiary(id))
            })
            .collect()
    }

    fn next_code_for(&self, year: i32) -> Result<String, ContractError> {
        let existing = self.contracts.codes_with_prefix(&code_prefix(year))?;
        Ok(next_code(year, existing.iter().map(String::as_str)))
    }

    fn record(
        &self,
        contract_id: u64,
        usuario: &str,
        accion: &str,
        descripcion: String,
        fecha: NaiveDateTime,
    ) -> Result<(), ContractError> {
        self.contracts.append_history(HistoryEntry {
            id: 0,
            contract_id,
            usuario: Some(usuario.to_string()),
            accion: accion.to_string(),
            descripcion,
            fecha,
        })?;
        Ok(())
    }

    fn body_for(
        &self,
        contract: &Contract,
        beneficiaries: &[Beneficiary],
        fecha: NaiveDateTime,
    ) -> Result<String, ContractError> {
        let config = self.contracts.institution()?;
        Ok(assemble_legal_body(&LegalContext {
            beneficiaries,
            tipo_contrato: &contract.tipo_contrato,
            codigo_contrato: &contract.codigo_contrato,
            property: &contract.property,
            config: &config,
            fecha: fecha.date(),
        }))
    }

    fn get(&self, id: u64) -> Result<Contract, ContractError> {
        self.contracts.fetch(id)?.ok_or(ContractError::NotFound)
    }

    pub fn create_draft(
        &self,
        input: ContractInput,
        usuario: &str,
        now: NaiveDateTime,
    ) -> Result<Contract, ContractError> {
        let beneficiaries = self.load_beneficiaries(&input.beneficiary_ids)?;
        let codigo_contrato = self.next_code_for(now.year())?;

        let mut contract = Contract {
            id: 0,
            beneficiary_ids: beneficiaries.iter().map(|b| b.id).collect(),
            codigo_contrato,
            tipo_contrato: contract_type(input.tipo_contrato),
            prioridad: input.prioridad.unwrap_or_default(),
            property: input.property,
            archivo_escaneado: None,
            fecha_creacion: now,
            fecha_actualizacion: now,
            fecha_aprobacion: None,
            estado: ContractState::Borrador,
            cuerpo_contrato: String::new(),
            version: 1,
            creado_por: Some(usuario.to_string()),
            aprobado_por: None,
        };
        contract.cuerpo_contrato = self.body_for(&contract, &beneficiaries, now)?;

        let stored = self.contracts.insert(contract)?;
        self.record(
            stored.id,
            usuario,
            ACTION_CREATED,
            format!("Contrato {} generado en borrador", stored.codigo_contrato),
            now,
        )?;
        info!(id = stored.id, codigo = %stored.codigo_contrato, "contract draft created");
        Ok(stored)
    }

    /// Replace the editable data of an open contract and rebuild its body.
    pub fn update(
        &self,
        id: u64,
        input: ContractInput,
        usuario: &str,
        now: NaiveDateTime,
    ) -> Result<Contract, ContractError> {
        let mut contract = self.get(id)?;
        ensure_open(&contract)?;
        let beneficiaries = self.load_beneficiaries(&input.beneficiary_ids)?;

        contract.beneficiary_ids = beneficiaries.iter().map(|b| b.id).collect();
        contract.tipo_contrato = contract_type(input.tipo_contrato);
        contract.prioridad = input.prioridad.unwrap_or(contract.prioridad);
        contract.property = input.property;
        contract.cuerpo_contrato = self.body_for(&contract, &beneficiaries, now)?;
        contract.version += 1;
        contract.fecha_actualizacion = now;

        self.contracts.update(contract.clone())?;
        self.record(
            id,
            usuario,
            ACTION_EDITED,
            format!("Datos actualizados, versión {}", contract.version),
            now,
        )?;
        info!(id, version = contract.version, "contract updated");
        Ok(contract)
    }

    /// Rebuild the body from current beneficiary and institutional data.
    pub fn regenerate_body(
        &self,
        id: u64,
        usuario: &str,
        now: NaiveDateTime,
    ) -> Result<Contract, ContractError> {
        let mut contract = self.get(id)?;
        ensure_open(&contract)?;
        let beneficiaries = self.load_beneficiaries(&contract.beneficiary_ids)?;
        contract.cuerpo_contrato = self.body_for(&contract, &beneficiaries, now)?;
        contract.version += 1;
        contract.fecha_actualizacion = now;

        self.contracts.update(contract.clone())?;
        self.record(
            id,
            usuario,
            ACTION_REGENERATED,
            format!("Texto legal regenerado, versión {}", contract.version),
            now,
        )?;
        Ok(contract)
    }

    fn transition(
        &self,
        id: u64,
        next: ContractState,
        usuario: &str,
        now: NaiveDateTime,
    ) -> Result<Contract, ContractError> {
        let mut contract = self.get(id)?;
        if !contract.estado.can_transition_to(next) {
            return Err(ContractError::InvalidTransition {
                from: contract.estado,
                to: next,
            });
        }
        contract.estado = next;
        contract.fecha_actualizacion = now;
        if next == ContractState::Aprobado {
            contract.fecha_aprobacion = Some(now);
            contract.aprobado_por = Some(usuario.to_string());
        }
        self.contracts.update(contract.clone())?;
        Ok(contract)
    }

    pub fn submit_for_review(
        &self,
        id: u64,
        usuario: &str,
        now: NaiveDateTime,
    ) -> Result<Contract, ContractError> {
        let contract = self.transition(id, ContractState::Revision, usuario, now)?;
        self.record(
            id,
            usuario,
            ACTION_SUBMITTED,
            "Contrato enviado a revisión".to_string(),
            now,
        )?;
        Ok(contract)
    }

    pub fn approve(
        &self,
        id: u64,
        usuario: &str,
        now: NaiveDateTime,
    ) -> Result<Contract, ContractError> {
        let contract = self.transition(id, ContractState::Aprobado, usuario, now)?;
        self.record(
            id,
            usuario,
            ACTION_APPROVED,
            format!("Contrato {} aprobado", contract.codigo_contrato),
            now,
        )?;
        info!(id, codigo = %contract.codigo_contrato, aprobado_por = usuario, "contract approved");
        Ok(contract)
    }

    pub fn annul(
        &self,
        id: u64,
        motivo: Option<&str>,
        usuario: &str,
        now: NaiveDateTime,
    ) -> Result<Contract, ContractError> {
        let contract = self.transition(id, ContractState::Anulado, usuario, now)?;
        let descripcion = match motivo.map(str::trim).filter(|m| !m.is_empty()) {
            Some(motivo) => format!("Contrato anulado: {motivo}"),
            None => "Contrato anulado".to_string(),
        };
        self.record(id, usuario, ACTION_ANNULLED, descripcion, now)?;
        info!(id, codigo = %contract.codigo_contrato, "contract annulled");
        Ok(contract)
    }

    /// Newest first.
    pub fn list(&self, filter: &ContractFilter) -> Result<Vec<Contract>, ContractError> {
        let mut contracts = self.contracts.list()?;
        contracts.retain(|contract| {
            filter.estado.map_or(true, |estado| contract.estado == estado)
                && filter
                    .beneficiary_id
                    .map_or(true, |id| contract.beneficiary_ids.contains(&id))
        });
        contracts.sort_by(|a, b| {
            b.fecha_creacion
                .cmp(&a.fecha_creacion)
                .then(b.id.cmp(&a.id))
        });
        Ok(contracts)
    }

    pub fn detail(&self, id: u64) -> Result<ContractDetail, ContractError> {
        let contract = self.get(id)?;
        let beneficiaries = self.known_beneficiaries(&contract.beneficiary_ids)?;
        let mut historial = self.contracts.history(id)?;
        historial.sort_by(|a, b| b.fecha.cmp(&a.fecha).then(b.id.cmp(&a.id)));
        Ok(ContractDetail {
            contract,
            beneficiaries,
            historial,
        })
    }

    /// Beneficiaries that still exist, skipping dangling ids.
    fn known_beneficiaries(&self, ids: &[u64]) -> Result<Vec<Beneficiary>, ContractError> {
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(beneficiary) = self.beneficiaries.fetch(*id)? {
                found.push(beneficiary);
            }
        }
        Ok(found)
    }

    pub fn stats(&self) -> Result<ContractStats, ContractError> {
        Ok(ContractStats::from_contracts(&self.contracts.list()?))
    }

    /// PDF bytes and the download file name.
    pub fn render_pdf(&self, id: u64) -> Result<(Vec<u8>, String), ContractError> {
        let contract = self.get(id)?;
        let beneficiaries = self.known_beneficiaries(&contract.beneficiary_ids)?;
        let bytes = render_contract(&contract, &beneficiaries)?;
        Ok((bytes, format!("Contrato_{}.pdf", contract.codigo_contrato)))
    }

    pub fn export_excel(&self) -> Result<Vec<u8>, ContractError> {
        let contracts = self.list(&ContractFilter::default())?;
        let beneficiaries: HashMap<u64, Beneficiary> = self
            .beneficiaries
            .list()?
            .into_iter()
            .map(|beneficiary| (beneficiary.id, beneficiary))
            .collect();
        Ok(contracts_workbook(&contracts, &beneficiaries)?)
    }

    /// Register already-signed paper contracts, one per uploaded scan.
    ///
    /// Embedded codes are checked before anything is written so a clash
    /// leaves the batch untouched.
    pub fn import_scanned(
        &self,
        beneficiary_ids: &[u64],
        scans: Vec<ScannedContract>,
        usuario: &str,
        now: NaiveDateTime,
    ) -> Result<Vec<Contract>, ContractError> {
        let beneficiaries = self.load_beneficiaries(beneficiary_ids)?;
        if scans.is_empty() {
            return Err(ContractError::NoFiles);
        }

        let mut claimed = HashSet::new();
        for scan in &scans {
            let Some((year, sequence)) = parse_code(scan.stem()) else {
                continue;
            };
            let taken = self.contracts.codes_with_prefix(&code_prefix(year))?;
            let issued = taken
                .iter()
                .any(|existing| parse_code(existing) == Some((year, sequence)));
            if issued || !claimed.insert((year, sequence)) {
                return Err(ContractError::DuplicateCode(format_code(year, sequence)));
            }
        }

        // Embedded codes go first so generated ones are numbered after them.
        let (coded, generated): (Vec<_>, Vec<_>) = scans
            .into_iter()
            .partition(|scan| scan.embedded_code().is_some());

        let ids: Vec<u64> = beneficiaries.iter().map(|b| b.id).collect();
        let mut imported = Vec::with_capacity(coded.len() + generated.len());
        for scan in coded.into_iter().chain(generated) {
            let codigo_contrato = match scan.embedded_code() {
                Some(code) => code,
                None => self.next_code_for(now.year())?,
            };
            let key = scanned_contract_key(now.date(), &scan.file_name);
            let archivo = self.files.save(&key, &scan.bytes)?;

            let contract = Contract {
                id: 0,
                beneficiary_ids: ids.clone(),
                codigo_contrato,
                tipo_contrato: DEFAULT_CONTRACT_TYPE.to_string(),
                prioridad: Default::default(),
                property: Default::default(),
                archivo_escaneado: Some(archivo),
                fecha_creacion: now,
                fecha_actualizacion: now,
                fecha_aprobacion: None,
                estado: ContractState::Firmado,
                cuerpo_contrato: format!(
                    "Contrato firmado digitalizado a partir del archivo {}.",
                    scan.file_name
                ),
                version: 1,
                creado_por: Some(usuario.to_string()),
                aprobado_por: None,
            };
            let stored = self.contracts.insert(contract)?;
            self.record(
                stored.id,
                usuario,
                ACTION_IMPORTED,
                format!("Expediente escaneado importado: {}", scan.file_name),
                now,
            )?;
            imported.push(stored);
        }

        info!(count = imported.len(), beneficiaries = ?ids, "scanned contracts imported");
        Ok(imported)
    }

    /// Scan bytes and file name of an imported contract.
    pub fn read_scan(&self, id: u64) -> Result<(Vec<u8>, String), ContractError> {
        let contract = self.get(id)?;
        let key = contract.archivo_escaneado.ok_or(ContractError::NotFound)?;
        let bytes = self.files.read(&key)?;
        let file_name = key.rsplit('/').next().unwrap_or(key.as_str()).to_string();
        Ok((bytes, file_name))
    }

    pub fn institution(&self) -> Result<InstitutionalConfig, ContractError> {
        Ok(self.contracts.institution()?)
    }

    pub fn update_institution(
        &self,
        config: InstitutionalConfig,
        usuario: &str,
    ) -> Result<InstitutionalConfig, ContractError> {
        let config = config.normalized();
        if config.monto_m2.is_sign_negative() {
            return Err(ContractError::Validation(
                "monto_m2 cannot be negative".to_string(),
            ));
        }
        self.contracts.save_institution(config.clone())?;
        info!(usuario, gerente = %config.nombre_gerente, "institutional configuration updated");
        Ok(config)
    }
}

fn contract_type(raw: Option<String>) -> String {
    raw.map(|value| value.trim().to_uppercase())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_CONTRACT_TYPE.to_string())
}

fn ensure_open(contract: &Contract) -> Result<(), ContractError> {
    if contract.estado.is_open() {
        Ok(())
    } else {
        Err(ContractError::Locked(contract.estado))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    #[error("invalid contract data: {0}")]
    Validation(String),
    #[error("beneficiary {0} does not exist")]
    UnknownBeneficiary(u64),
    #[error("contract not found")]
    NotFound,
    #[error("contract is {} and can no longer be edited", .0.label())]
    Locked(ContractState),
    #[error("cannot move a contract from {} to {}", .from.label(), .to.label())]
    InvalidTransition {
        from: ContractState,
        to: ContractState,
    },
    #[error("contract code {0} already exists")]
    DuplicateCode(String),
    #[error("no files were selected")]
    NoFiles,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Document(#[from] DocumentError),
}

impl ContractError {
    pub fn status(&self) -> StatusCode {
        match self {
            ContractError::Validation(_)
            | ContractError::UnknownBeneficiary(_)
            | ContractError::NoFiles => StatusCode::UNPROCESSABLE_ENTITY,
            ContractError::Locked(_)
            | ContractError::InvalidTransition { .. }
            | ContractError::DuplicateCode(_)
            | ContractError::Repository(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
            ContractError::NotFound
            | ContractError::Repository(RepositoryError::NotFound)
            | ContractError::Storage(StorageError::NotFound(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ContractError {
    fn into_response(self) -> Response {
        json_error(self.status(), self.to_string())
    }
}
