use std::collections::HashMap;

use rust_xlsxwriter::Workbook;

use super::domain::Contract;
use crate::beneficiaries::Beneficiary;
use crate::documents::text::format_date;
use crate::documents::{DocumentError, SheetCell, SheetTable};

const HEADERS: [&str; 7] = [
    "Código",
    "Tipo",
    "Beneficiario",
    "Documento",
    "Estado",
    "Fecha Creación",
    "Creado Por",
];

/// Contract report; co-owned contracts list every beneficiary in one cell.
pub fn contracts_workbook(
    contracts: &[Contract],
    beneficiaries: &HashMap<u64, Beneficiary>,
) -> Result<Vec<u8>, DocumentError> {
    let mut table = SheetTable::new(&HEADERS, 0xF2F2F2, false);
    for contract in contracts {
        let parties: Vec<&Beneficiary> = contract
            .beneficiary_ids
            .iter()
            .filter_map(|id| beneficiaries.get(id))
            .collect();
        let names = parties
            .iter()
            .map(|b| b.nombre_completo.as_str())
            .collect::<Vec<_>>()
            .join(" / ");
        let documents = parties
            .iter()
            .map(|b| b.full_document())
            .collect::<Vec<_>>()
            .join(" / ");

        table.push(vec![
            contract.codigo_contrato.clone().into(),
            contract.tipo_contrato.clone().into(),
            names.into(),
            documents.into(),
            SheetCell::from(contract.estado.label()),
            format_date(contract.fecha_creacion.date()).into(),
            contract.creado_por.clone().into(),
        ]);
    }

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Reporte de Contratos")?;
    table.write(worksheet, 0)?;
    Ok(workbook.save_to_buffer()?)
}
