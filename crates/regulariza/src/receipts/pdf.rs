//! Individual receipt and consolidated report PDFs.

use chrono::NaiveDateTime;

use super::domain::{Category, Receipt};
use super::report::ReportSummary;
use crate::contracts::pdf::INSTITUTION_NAME;
use crate::documents::pdf::Column;
use crate::documents::text::{format_amount, format_bs, format_date};
use crate::documents::{DocumentError, Orientation, PdfCanvas, TextStyle};

const RECEIPT_MARGIN_MM: f32 = 20.0;
const REPORT_MARGIN_MM: f32 = 12.7;
const REPORT_FONT: f32 = 8.0;

fn yes_no(value: bool) -> String {
    if value { "Sí" } else { "No" }.to_string()
}

pub fn render_receipt(receipt: &Receipt) -> Result<Vec<u8>, DocumentError> {
    let mut canvas = PdfCanvas::new(
        &format!("Recibo {}", receipt.numero_recibo),
        Orientation::Portrait,
        RECEIPT_MARGIN_MM,
    )?;

    canvas.centered(INSTITUTION_NAME, 12.0, TextStyle::Bold);
    canvas.centered(
        &format!("RECIBO DE PAGO N° {}", receipt.numero_recibo),
        16.0,
        TextStyle::Bold,
    );
    canvas.rule(0.8);

    if receipt.anulado {
        canvas.set_color(0.8, 0.0, 0.0);
        canvas.centered("ESTADO: ANULADO", 14.0, TextStyle::Bold);
        let detail = match (&receipt.anulado_por, receipt.fecha_anulacion) {
            (Some(user), Some(when)) => {
                format!("Anulado por {user} el {}", when.format("%d/%m/%Y %H:%M"))
            }
            (None, Some(when)) => format!("Anulado el {}", when.format("%d/%m/%Y %H:%M")),
            _ => "Recibo sin validez".to_string(),
        };
        canvas.centered(&detail, 9.0, TextStyle::Italic);
        canvas.reset_color();
        canvas.advance(3.0);
    }

    canvas.advance(2.0);
    let field = |label: &str, value: &str| format!("{label}: {value}");
    canvas.line(&field("Cliente", &receipt.nombre), 10.0, TextStyle::Regular);
    canvas.line(
        &field("Cédula/RIF", &receipt.rif_cedula_identidad),
        10.0,
        TextStyle::Regular,
    );
    canvas.paragraph(
        &field(
            "Dirección",
            receipt.direccion_inmueble.as_deref().unwrap_or("N/A"),
        ),
        10.0,
        TextStyle::Regular,
    );
    if let Some(ente) = &receipt.ente_liquidado {
        canvas.line(&field("Ente liquidado", ente), 10.0, TextStyle::Regular);
    }
    canvas.line(
        &field("Fecha de Emisión/Pago", &format_date(receipt.fecha)),
        10.0,
        TextStyle::Regular,
    );
    canvas.line(
        &field("Estado", receipt.display_status()),
        10.0,
        TextStyle::Regular,
    );
    canvas.advance(4.0);

    canvas.line("CATEGORÍAS", 10.0, TextStyle::Bold);
    let half = canvas.content_width() / 2.0;
    let columns = [Column { width_mm: half }, Column { width_mm: half }];
    let marks: Vec<String> = Category::all()
        .map(|category| {
            let mark = if receipt.has_category(category) { "X" } else { " " };
            format!("[{mark}] {}", category.label())
        })
        .collect();
    for pair in marks.chunks(2) {
        canvas.table_row(&columns, pair, 9.0, TextStyle::Regular);
    }
    canvas.advance(5.0);

    let amounts = [Column { width_mm: 80.0 }, Column { width_mm: 60.0 }];
    canvas.table_row(
        &amounts,
        &["Concepto".to_string(), "Monto (Bs.)".to_string()],
        10.0,
        TextStyle::Bold,
    );
    let rows = [
        ("Total Recibo", format_bs(receipt.total_monto_bs)),
        (
            "Gastos Administrativos",
            format_bs(receipt.gastos_administrativos),
        ),
        ("Tasa del Día", format_amount(receipt.tasa_dia, 4)),
        (
            "N° Transferencia",
            receipt
                .numero_transferencia
                .clone()
                .unwrap_or_else(|| "N/A".to_string()),
        ),
        ("Conciliado", yes_no(receipt.conciliado)),
    ];
    for (label, value) in rows {
        canvas.table_row(&amounts, &[label.to_string(), value], 10.0, TextStyle::Regular);
    }
    canvas.advance(8.0);

    canvas.paragraph(
        &field("Concepto", &receipt.concepto),
        10.0,
        TextStyle::Regular,
    );
    canvas.advance(4.0);
    canvas.line(
        &format!(
            "Creado por: {} el {}",
            receipt.usuario_creador.as_deref().unwrap_or("N/A"),
            format_date(receipt.fecha_creacion.date())
        ),
        8.0,
        TextStyle::Italic,
    );

    canvas.finish()
}

const REPORT_HEADERS: [&str; 7] = [
    "N°",
    "Fecha",
    "Estado",
    "Nombre",
    "Monto (Bs)",
    "Conciliado",
    "Categorías",
];

/// Column widths in millimetres; the name and category columns take the rest.
fn report_columns(content_width: f32) -> Vec<Column> {
    let fixed = [16.0, 22.0, 22.0, 32.0, 20.0];
    let flexible = ((content_width - fixed.iter().sum::<f32>()) / 2.0).max(30.0);
    vec![
        Column { width_mm: fixed[0] },
        Column { width_mm: fixed[1] },
        Column { width_mm: fixed[2] },
        Column { width_mm: flexible },
        Column { width_mm: fixed[3] },
        Column { width_mm: fixed[4] },
        Column { width_mm: flexible },
    ]
}

fn header_row(canvas: &mut PdfCanvas, columns: &[Column]) {
    let headers: Vec<String> = REPORT_HEADERS.iter().map(|h| h.to_string()).collect();
    canvas.set_color(0.12, 0.31, 0.47);
    canvas.table_row(columns, &headers, REPORT_FONT + 1.0, TextStyle::Bold);
    canvas.reset_color();
}

/// Landscape table of the filtered receipts; the column header is drawn
/// again at the top of every page.
pub fn render_report(
    receipts: &[Receipt],
    generated_by: &str,
    generated_at: NaiveDateTime,
) -> Result<Vec<u8>, DocumentError> {
    let mut canvas = PdfCanvas::new(
        "Reporte consolidado de recibos",
        Orientation::Landscape,
        REPORT_MARGIN_MM,
    )?;
    canvas.centered("REPORTE CONSOLIDADO DE RECIBOS", 14.0, TextStyle::Bold);
    canvas.line(
        &format!(
            "Generado por: {generated_by} el {}",
            generated_at.format("%d/%m/%Y %H:%M")
        ),
        9.0,
        TextStyle::Regular,
    );
    canvas.advance(3.0);

    let columns = report_columns(canvas.content_width());
    let row_height = PdfCanvas::line_height(REPORT_FONT) + 1.5;
    header_row(&mut canvas, &columns);

    for receipt in receipts {
        if canvas.ensure_space(row_height) {
            header_row(&mut canvas, &columns);
        }
        let values = vec![
            receipt.numero_recibo.to_string(),
            format_date(receipt.fecha),
            receipt.display_status().to_string(),
            receipt.nombre.clone(),
            format_bs(receipt.total_monto_bs),
            yes_no(receipt.conciliado),
            receipt.category_summary(),
        ];
        canvas.table_row(&columns, &values, REPORT_FONT, TextStyle::Regular);
    }

    let summary = ReportSummary::from_receipts(receipts);
    canvas.ensure_space(PdfCanvas::line_height(10.0) * 3.0);
    canvas.advance(4.0);
    canvas.line(
        &format!(
            "Recibos: {} (activos {}, anulados {})",
            summary.total_recibos, summary.activos, summary.anulados
        ),
        10.0,
        TextStyle::Bold,
    );
    canvas.line(
        &format!("Monto total activo: {}", format_bs(summary.total_monto_bs)),
        10.0,
        TextStyle::Bold,
    );

    canvas.finish()
}
