use std::collections::HashSet;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::NaiveDateTime;
use tracing::{info, warn};

use super::domain::{next_receipt_number, Receipt, ReceiptInput, ReceiptStatus};
use super::filter::ReceiptFilter;
use super::importer::{
    read_rows, ImportError, ImportOptions, ImportPolicy, ImportReport, ParsedRow, RowRejection,
};
use super::pdf::{render_receipt, render_report};
use super::report::{report_workbook, Dashboard, ReportSummary};
use super::repository::ReceiptRepository;
use crate::config::ImportConfig;
use crate::documents::DocumentError;
use crate::error::RepositoryError;
use crate::http::json_error;

/// Receipt registry: numbering, voiding, the spreadsheet import and reports.
pub struct ReceiptService<R> {
    receipts: Arc<R>,
    import: ImportConfig,
}

impl<R> ReceiptService<R>
where
    R: ReceiptRepository + 'static,
{
    pub fn new(receipts: Arc<R>) -> Self {
        Self {
            receipts,
            import: ImportConfig::default(),
        }
    }

    pub fn with_import_config(mut self, import: ImportConfig) -> Self {
        self.import = import;
        self
    }

    /// Import options for the configured sheet layout.
    pub fn import_options(&self, policy: ImportPolicy) -> ImportOptions {
        ImportOptions::from_config(&self.import, policy)
    }

    fn load(&self, id: u64) -> Result<Receipt, ReceiptError> {
        self.receipts.fetch(id)?.ok_or(ReceiptError::NotFound)
    }

    fn ensure_transfer_free(&self, reference: Option<&str>) -> Result<(), ReceiptError> {
        match reference {
            Some(reference) if self.receipts.transfer_exists(reference)? => {
                Err(ReceiptError::DuplicateTransfer(reference.to_string()))
            }
            _ => Ok(()),
        }
    }

    pub fn create(
        &self,
        input: ReceiptInput,
        usuario: &str,
        now: NaiveDateTime,
    ) -> Result<Receipt, ReceiptError> {
        let input = input.normalized().map_err(ReceiptError::Validation)?;
        self.ensure_transfer_free(input.numero_transferencia.as_deref())?;

        let numero = next_receipt_number(self.receipts.max_number()?);
        let mut receipt = input.into_receipt(numero, Some(usuario.to_string()), now);
        if receipt.anulado {
            receipt.fecha_anulacion = Some(now);
            receipt.anulado_por = Some(usuario.to_string());
        }
        let receipt = self.receipts.insert(receipt)?;
        info!(numero = receipt.numero_recibo, usuario, "receipt created");
        Ok(receipt)
    }

    /// Replace the editable fields. Number and audit stamps are kept;
    /// switching the status to ANULADO voids the receipt.
    pub fn update(
        &self,
        id: u64,
        input: ReceiptInput,
        usuario: &str,
        now: NaiveDateTime,
    ) -> Result<Receipt, ReceiptError> {
        let current = self.load(id)?;
        if current.anulado {
            return Err(ReceiptError::Voided(current.numero_recibo));
        }
        let input = input.normalized().map_err(ReceiptError::Validation)?;
        if input.numero_transferencia != current.numero_transferencia {
            self.ensure_transfer_free(input.numero_transferencia.as_deref())?;
        }

        let mut receipt = input.into_receipt(
            current.numero_recibo,
            current.usuario_creador.clone(),
            current.fecha_creacion,
        );
        receipt.id = current.id;
        if receipt.anulado {
            receipt.fecha_anulacion = Some(now);
            receipt.anulado_por = Some(usuario.to_string());
        }
        self.receipts.update(receipt.clone())?;
        info!(numero = receipt.numero_recibo, usuario, "receipt updated");
        Ok(receipt)
    }

    pub fn void(
        &self,
        id: u64,
        usuario: &str,
        now: NaiveDateTime,
    ) -> Result<Receipt, ReceiptError> {
        let mut receipt = self.load(id)?;
        if receipt.anulado {
            return Err(ReceiptError::AlreadyVoided(receipt.numero_recibo));
        }
        receipt.anulado = true;
        receipt.estado = ReceiptStatus::Anulado;
        receipt.fecha_anulacion = Some(now);
        receipt.anulado_por = Some(usuario.to_string());
        self.receipts.update(receipt.clone())?;
        info!(numero = receipt.numero_recibo, usuario, "receipt voided");
        Ok(receipt)
    }

    pub fn get(&self, id: u64) -> Result<Receipt, ReceiptError> {
        self.load(id)
    }

    pub fn list(&self, filter: &ReceiptFilter) -> Result<Vec<Receipt>, ReceiptError> {
        Ok(filter.apply(self.receipts.list()?))
    }

    /// Read the workbook, drop rows whose transfer reference is taken, then
    /// commit the remainder in one batch numbered from max+1.
    pub fn import(
        &self,
        bytes: &[u8],
        options: &ImportOptions,
        usuario: &str,
        now: NaiveDateTime,
    ) -> Result<ImportReport, ReceiptError> {
        let sheet = read_rows(bytes, options, now.date())?;
        let filas_leidas = sheet.parsed.len() + sheet.rejected.len();
        let mut rechazados = sheet.rejected;
        let mut accepted: Vec<ParsedRow> = Vec::with_capacity(sheet.parsed.len());
        let mut references = HashSet::new();

        for row in sheet.parsed {
            if let Some(reference) = row.input.numero_transferencia.as_deref() {
                let motivo = if !references.insert(reference.to_string()) {
                    Some(format!("transfer reference {reference} repeated in the file"))
                } else if self.receipts.transfer_exists(reference)? {
                    Some(format!("transfer reference {reference} already registered"))
                } else {
                    None
                };
                if let Some(motivo) = motivo {
                    rechazados.push(RowRejection {
                        fila: row.fila,
                        motivo,
                    });
                    continue;
                }
            }
            accepted.push(row);
        }
        rechazados.sort_by_key(|rejection| rejection.fila);

        if options.policy == ImportPolicy::Atomic {
            if let Some(first) = rechazados.first() {
                warn!(fila = first.fila, motivo = %first.motivo, "receipt import aborted");
                return Err(ImportError::Rejected {
                    fila: first.fila,
                    motivo: first.motivo.clone(),
                }
                .into());
            }
        }
        for rejection in &rechazados {
            warn!(fila = rejection.fila, motivo = %rejection.motivo, "receipt row skipped");
        }

        let numeros = if accepted.is_empty() {
            Vec::new()
        } else {
            let start = next_receipt_number(self.receipts.max_number()?);
            let batch = accepted
                .into_iter()
                .zip(start..)
                .map(|(row, numero)| {
                    let mut receipt =
                        row.input.into_receipt(numero, Some(usuario.to_string()), now);
                    if receipt.anulado {
                        receipt.fecha_anulacion = Some(now);
                        receipt.anulado_por = Some(usuario.to_string());
                    }
                    receipt
                })
                .collect();
            self.receipts
                .insert_batch(batch)?
                .iter()
                .map(|receipt| receipt.numero_recibo)
                .collect()
        };

        let report = ImportReport {
            politica: options.policy,
            filas_leidas,
            importados: numeros.len(),
            numeros,
            rechazados,
        };
        info!(
            usuario,
            importados = report.importados,
            rechazados = report.rechazados.len(),
            "receipt import committed"
        );
        Ok(report)
    }

    pub fn render_pdf(&self, id: u64) -> Result<(Vec<u8>, String), ReceiptError> {
        let receipt = self.load(id)?;
        let bytes = render_receipt(&receipt)?;
        Ok((bytes, format!("Recibo_{}.pdf", receipt.numero_recibo)))
    }

    pub fn report_pdf(
        &self,
        filter: &ReceiptFilter,
        usuario: &str,
        now: NaiveDateTime,
    ) -> Result<(Vec<u8>, String), ReceiptError> {
        let receipts = self.list(filter)?;
        let bytes = render_report(&receipts, usuario, now)?;
        Ok((bytes, format!("Reporte_Recibos_{}.pdf", now.format("%Y%m%d_%H%M"))))
    }

    pub fn report_excel(
        &self,
        filter: &ReceiptFilter,
        usuario: &str,
        now: NaiveDateTime,
    ) -> Result<(Vec<u8>, String), ReceiptError> {
        let receipts = self.list(filter)?;
        let bytes = report_workbook(&receipts, filter, usuario, now)?;
        Ok((bytes, format!("Reporte_Recibos_{}.xlsx", now.format("%Y%m%d_%H%M"))))
    }

    pub fn dashboard(&self, filter: &ReceiptFilter) -> Result<Dashboard, ReceiptError> {
        let receipts = self.list(filter)?;
        Ok(Dashboard {
            filtros: filter.clone(),
            resumen: ReportSummary::from_receipts(&receipts),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReceiptError {
    #[error("invalid receipt data: {0}")]
    Validation(String),
    #[error("receipt not found")]
    NotFound,
    #[error("receipt {0} is already voided")]
    AlreadyVoided(u64),
    #[error("receipt {0} is voided and can no longer be edited")]
    Voided(u64),
    #[error("transfer reference {0} is already registered")]
    DuplicateTransfer(String),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Document(#[from] DocumentError),
}

impl ReceiptError {
    pub fn status(&self) -> StatusCode {
        match self {
            ReceiptError::Validation(_) | ReceiptError::Import(ImportError::Rejected { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ReceiptError::Import(_) => StatusCode::BAD_REQUEST,
            ReceiptError::AlreadyVoided(_)
            | ReceiptError::Voided(_)
            | ReceiptError::DuplicateTransfer(_)
            | ReceiptError::Repository(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
            ReceiptError::NotFound | ReceiptError::Repository(RepositoryError::NotFound) => {
                StatusCode::NOT_FOUND
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ReceiptError {
    fn into_response(self) -> Response {
        json_error(self.status(), self.to_string())
    }
}
