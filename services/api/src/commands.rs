use crate::infra::{import_timestamp, parse_date};
use chrono::NaiveDate;
use clap::Args;
use regulariza::beneficiaries::{BeneficiaryInput, BeneficiaryService};
use regulariza::config::AppConfig;
use regulariza::contracts::{
    ContractInput, ContractService, InstitutionalConfig, Priority, PropertyData,
};
use regulariza::error::AppError;
use regulariza::memory::{InMemoryStore, MemoryFileStore};
use regulariza::receipts::{ImportPolicy, ImportReport, ReceiptService};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ReceiptImportArgs {
    /// Workbook (.xlsx) holding the receipts sheet
    pub(crate) file: PathBuf,
    /// `atomic` aborts on the first bad row, `skip` keeps the valid ones
    #[arg(long, default_value = "atomic")]
    pub(crate) policy: ImportPolicy,
    /// Worksheet name (defaults to APP_RECEIPT_SHEET)
    #[arg(long)]
    pub(crate) sheet: Option<String>,
    /// Zero-based header row (defaults to APP_RECEIPT_HEADER_ROW)
    #[arg(long)]
    pub(crate) header_row: Option<usize>,
    /// Username recorded as the creator of the imported receipts
    #[arg(long, default_value = "importador")]
    pub(crate) user: String,
    /// Date assigned to rows without one (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) date: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub(crate) struct ContractRenderArgs {
    /// JSON file with `beneficiarios`, the property data and optional `institucion`
    pub(crate) input: PathBuf,
    /// Where to write the PDF (defaults to Contrato_<code>.pdf)
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    /// Contract date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) date: Option<NaiveDate>,
    #[arg(long, default_value = "cli")]
    pub(crate) user: String,
}

/// Offline description of a contract to render.
#[derive(Debug, Deserialize)]
pub(crate) struct ContractRenderRequest {
    pub(crate) beneficiarios: Vec<BeneficiaryInput>,
    #[serde(default)]
    pub(crate) tipo_contrato: Option<String>,
    #[serde(default)]
    pub(crate) prioridad: Option<Priority>,
    #[serde(default)]
    pub(crate) institucion: Option<InstitutionalConfig>,
    #[serde(flatten)]
    pub(crate) property: PropertyData,
}

pub(crate) fn run_receipt_import(args: ReceiptImportArgs) -> Result<(), AppError> {
    let report = import_receipts(args)?;
    println!(
        "Imported {} of {} rows ({:?} policy)",
        report.importados, report.filas_leidas, report.politica
    );
    for rejection in &report.rechazados {
        println!("  row {}: {}", rejection.fila, rejection.motivo);
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn import_receipts(args: ReceiptImportArgs) -> Result<ImportReport, AppError> {
    let mut import = AppConfig::load()?.import;
    if let Some(sheet) = args.sheet {
        import.sheet_name = sheet;
    }
    if let Some(header_row) = args.header_row {
        import.header_row = header_row;
    }

    let bytes = fs::read(&args.file)?;
    let service = ReceiptService::new(Arc::new(InMemoryStore::new())).with_import_config(import);
    let options = service.import_options(args.policy);
    Ok(service.import(&bytes, &options, &args.user, import_timestamp(args.date))?)
}

pub(crate) fn run_contract_render(args: ContractRenderArgs) -> Result<(), AppError> {
    let raw = fs::read(&args.input)?;
    let request: ContractRenderRequest = serde_json::from_slice(&raw)?;
    let (bytes, file_name) = render_contract(request, &args.user, args.date)?;

    let output = args.output.unwrap_or_else(|| PathBuf::from(file_name));
    fs::write(&output, bytes)?;
    println!("Contract written to {}", output.display());
    Ok(())
}

fn render_contract(
    request: ContractRenderRequest,
    usuario: &str,
    date: Option<NaiveDate>,
) -> Result<(Vec<u8>, String), AppError> {
    let now = import_timestamp(date);
    let store = Arc::new(InMemoryStore::new());
    let files = Arc::new(MemoryFileStore::new());

    let beneficiaries = BeneficiaryService::new(store.clone(), files.clone());
    let mut beneficiary_ids = Vec::with_capacity(request.beneficiarios.len());
    for input in request.beneficiarios {
        beneficiary_ids.push(beneficiaries.create(input)?.id);
    }

    let contracts = ContractService::new(store.clone(), store, files);
    if let Some(config) = request.institucion {
        contracts.update_institution(config, usuario)?;
    }
    let draft = contracts.create_draft(
        ContractInput {
            beneficiary_ids,
            tipo_contrato: request.tipo_contrato,
            prioridad: request.prioridad,
            property: request.property,
        },
        usuario,
        now,
    )?;
    Ok(contracts.render_pdf(draft.id)?)
}
