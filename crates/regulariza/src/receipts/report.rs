//! Aggregates and spreadsheet output for filtered receipt listings.

use chrono::NaiveDateTime;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;

use super::domain::{Category, Receipt};
use super::filter::ReceiptFilter;
use crate::documents::text::format_date;
use crate::documents::{DocumentError, SheetCell, SheetTable};

const HEADER_FILL: u32 = 0x1F4E79;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    pub categoria: u8,
    pub label: &'static str,
    pub cantidad: usize,
    pub monto: Decimal,
}

/// Counts and totals for a set of receipts. Amounts only include receipts
/// that are not voided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub total_recibos: usize,
    pub activos: usize,
    pub anulados: usize,
    pub conciliados: usize,
    pub total_monto_bs: Decimal,
    pub total_gastos_administrativos: Decimal,
    pub categorias: Vec<CategoryTotal>,
}

impl ReportSummary {
    pub fn from_receipts(receipts: &[Receipt]) -> Self {
        let active: Vec<&Receipt> = receipts.iter().filter(|r| !r.anulado).collect();
        let categorias = Category::all()
            .map(|category| {
                let marked: Vec<&&Receipt> =
                    active.iter().filter(|r| r.has_category(category)).collect();
                CategoryTotal {
                    categoria: category.number(),
                    label: category.label(),
                    cantidad: marked.len(),
                    monto: marked.iter().map(|r| r.total_monto_bs).sum(),
                }
            })
            .collect();

        Self {
            total_recibos: receipts.len(),
            activos: active.len(),
            anulados: receipts.len() - active.len(),
            conciliados: active.iter().filter(|r| r.conciliado).count(),
            total_monto_bs: active.iter().map(|r| r.total_monto_bs).sum(),
            total_gastos_administrativos: active.iter().map(|r| r.gastos_administrativos).sum(),
            categorias,
        }
    }
}

/// Dashboard payload: the applied filter next to its aggregates.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub filtros: ReceiptFilter,
    pub resumen: ReportSummary,
}

const DETAIL_HEADERS: [&str; 12] = [
    "N° Recibo",
    "Fecha",
    "Estado",
    "Nombre",
    "Cédula/RIF",
    "Monto Total (Bs)",
    "Conciliado",
    "N° Transf.",
    "Gasto Adm.",
    "Tasa Día",
    "Usuario Creador",
    "Categorías Seleccionadas",
];

fn yes_no(value: bool) -> &'static str {
    if value {
        "Sí"
    } else {
        "No"
    }
}

/// Two-sheet workbook: `Resumen` with filters and totals, then
/// `Recibos_Filtrados` with one row per receipt.
pub fn report_workbook(
    receipts: &[Receipt],
    filter: &ReceiptFilter,
    generated_by: &str,
    generated_at: NaiveDateTime,
) -> Result<Vec<u8>, DocumentError> {
    let summary = ReportSummary::from_receipts(receipts);
    let mut workbook = Workbook::new();

    let resumen = workbook.add_worksheet();
    resumen.set_name("Resumen")?;
    let title = Format::new().set_bold().set_font_size(14);
    let label = Format::new().set_bold();
    resumen.write_string_with_format(0, 0, "REPORTE DE RECIBOS", &title)?;
    resumen.write_string_with_format(1, 0, "Generado por", &label)?;
    resumen.write_string(1, 1, generated_by)?;
    resumen.write_string_with_format(2, 0, "Fecha de generación", &label)?;
    resumen.write_string(2, 1, generated_at.format("%d/%m/%Y %H:%M").to_string())?;

    let mut filters = SheetTable::new(&["Filtro", "Valor"], HEADER_FILL, true);
    for (name, value) in filter.describe() {
        filters.push(vec![name.into(), value.into()]);
    }
    let next = filters.write(resumen, 4)?;

    let mut totals = SheetTable::new(&["Indicador", "Valor"], HEADER_FILL, true);
    totals.push(vec!["Total recibos".into(), (summary.total_recibos as u64).into()]);
    totals.push(vec!["Recibos activos".into(), (summary.activos as u64).into()]);
    totals.push(vec!["Recibos anulados".into(), (summary.anulados as u64).into()]);
    totals.push(vec!["Conciliados".into(), (summary.conciliados as u64).into()]);
    totals.push(vec!["Monto total (Bs)".into(), summary.total_monto_bs.into()]);
    totals.push(vec![
        "Gastos administrativos (Bs)".into(),
        summary.total_gastos_administrativos.into(),
    ]);
    let next = totals.write(resumen, next + 1)?;

    let mut by_category = SheetTable::new(
        &["Categoría", "Cantidad", "Monto (Bs)"],
        HEADER_FILL,
        true,
    );
    for total in &summary.categorias {
        by_category.push(vec![
            total.label.into(),
            (total.cantidad as u64).into(),
            total.monto.into(),
        ]);
    }
    by_category.write(resumen, next + 1)?;

    let mut detail = SheetTable::new(&DETAIL_HEADERS, HEADER_FILL, true);
    for receipt in receipts {
        detail.push(vec![
            receipt.numero_recibo.into(),
            format_date(receipt.fecha).into(),
            receipt.display_status().into(),
            receipt.nombre.clone().into(),
            receipt.rif_cedula_identidad.clone().into(),
            receipt.total_monto_bs.into(),
            yes_no(receipt.conciliado).into(),
            receipt.numero_transferencia.clone().into(),
            receipt.gastos_administrativos.into(),
            SheetCell::Number(decimal_to_f64(receipt.tasa_dia)),
            receipt.usuario_creador.clone().into(),
            receipt.category_summary().into(),
        ]);
    }
    let detalle = workbook.add_worksheet();
    detalle.set_name("Recibos_Filtrados")?;
    detail.write(detalle, 0)?;

    Ok(workbook.save_to_buffer()?)
}

fn decimal_to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}
