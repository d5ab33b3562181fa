use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal_macros::dec;
use rust_xlsxwriter::Workbook;

use super::*;
use crate::memory::InMemoryStore;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 2, d).expect("valid date")
}

fn at(d: u32) -> NaiveDateTime {
    day(d).and_hms_opt(11, 30, 0).expect("valid time")
}

fn numbers(receipt: &Receipt) -> Vec<u8> {
    receipt
        .marked_categories()
        .iter()
        .map(Category::number)
        .collect()
}

fn setup() -> (ReceiptService<InMemoryStore>, InMemoryStore) {
    let store = InMemoryStore::new();
    (ReceiptService::new(Arc::new(store.clone())), store)
}

fn input(nombre: &str, transferencia: Option<&str>, categorias: &[u8]) -> ReceiptInput {
    ReceiptInput {
        estado: ReceiptStatus::Pagado,
        nombre: nombre.to_string(),
        rif_cedula_identidad: "v-10000000".to_string(),
        direccion_inmueble: None,
        ente_liquidado: None,
        gastos_administrativos: dec!(3),
        tasa_dia: dec!(36.4),
        total_monto_bs: dec!(100),
        numero_transferencia: transferencia.map(str::to_string),
        conciliado: false,
        fecha: day(10),
        concepto: "Pago inicial".to_string(),
        categorias: categorias.iter().filter_map(|n| Category::new(*n)).collect(),
    }
}

#[test]
fn numbers_follow_the_current_maximum() {
    let (service, _) = setup();
    let first = service
        .create(input("Ana", Some("T-1"), &[1]), "caja", at(10))
        .expect("first");
    let second = service
        .create(input("Beto", None, &[2]), "caja", at(10))
        .expect("second");
    assert_eq!(first.numero_recibo, 1);
    assert_eq!(second.numero_recibo, 2);
    assert_eq!(first.rif_cedula_identidad, "V-10000000");
    assert_eq!(first.usuario_creador.as_deref(), Some("caja"));

    let err = service
        .create(input("Carla", Some("T-1"), &[]), "caja", at(10))
        .expect_err("duplicate transfer");
    assert!(matches!(err, ReceiptError::DuplicateTransfer(_)));
    assert_eq!(err.status(), StatusCode::CONFLICT);

    assert!(matches!(
        service.create(input("  ", None, &[]), "caja", at(10)),
        Err(ReceiptError::Validation(_))
    ));
}

#[test]
fn voiding_is_stamped_once() {
    let (service, _) = setup();
    let receipt = service
        .create(input("Dora", Some("T-9"), &[3]), "caja", at(11))
        .expect("create");

    let voided = service.void(receipt.id, "supervisor", at(12)).expect("void");
    assert!(voided.anulado);
    assert_eq!(voided.estado, ReceiptStatus::Anulado);
    assert_eq!(voided.anulado_por.as_deref(), Some("supervisor"));
    assert_eq!(voided.fecha_anulacion, Some(at(12)));

    let again = service
        .void(receipt.id, "supervisor", at(13))
        .expect_err("already voided");
    assert!(matches!(again, ReceiptError::AlreadyVoided(1)));
    assert_eq!(again.status(), StatusCode::CONFLICT);

    assert!(matches!(
        service.update(receipt.id, input("Dora", Some("T-9"), &[3]), "caja", at(13)),
        Err(ReceiptError::Voided(1))
    ));
}

#[test]
fn edits_keep_number_and_creator() {
    let (service, _) = setup();
    let original = service
        .create(input("Eva", Some("T-5"), &[1]), "caja", at(11))
        .expect("create");
    service
        .create(input("Fito", Some("T-6"), &[1]), "caja", at(11))
        .expect("create");

    let mut changed = input("Eva Maria", Some("T-5"), &[4, 5]);
    changed.conciliado = true;
    let edited = service
        .update(original.id, changed, "supervisor", at(12))
        .expect("edit with same transfer");
    assert_eq!(edited.numero_recibo, original.numero_recibo);
    assert_eq!(edited.usuario_creador.as_deref(), Some("caja"));
    assert_eq!(edited.fecha_creacion, original.fecha_creacion);
    assert_eq!(numbers(&edited), vec![4, 5]);
    assert!(service.get(original.id).expect("get").conciliado);

    assert!(matches!(
        service.update(original.id, input("Eva", Some("T-6"), &[]), "caja", at(12)),
        Err(ReceiptError::DuplicateTransfer(_))
    ));
}

#[test]
fn listing_applies_the_filter() {
    let (service, _) = setup();
    let mut early = input("Gil", None, &[1]);
    early.fecha = day(1);
    let mut late = input("Hugo", None, &[2]);
    late.fecha = day(20);
    let early = service.create(early, "caja", at(1)).expect("create");
    service.create(late, "caja", at(20)).expect("create");
    service.void(early.id, "caja", at(21)).expect("void");

    let all = service.list(&ReceiptFilter::default()).expect("list");
    assert_eq!(all.iter().map(|r| r.numero_recibo).collect::<Vec<_>>(), vec![2, 1]);

    let active = ReceiptFilter {
        estado: StatusFilter::Activo,
        ..Default::default()
    };
    assert_eq!(service.list(&active).expect("list").len(), 1);

    let category = ReceiptFilter {
        categorias: vec![Category::new(1).expect("c1")],
        fecha_inicio: Some(day(1)),
        fecha_fin: Some(day(1)),
        ..Default::default()
    };
    let matched = service.list(&category).expect("list");
    assert_eq!(matched.len(), 1);
    assert!(matched[0].anulado);

    let dashboard = service.dashboard(&ReceiptFilter::default()).expect("dashboard");
    assert_eq!(dashboard.resumen.total_recibos, 2);
    assert_eq!(dashboard.resumen.anulados, 1);
    assert_eq!(dashboard.resumen.total_monto_bs, dec!(100));
}

#[test]
fn documents_render_for_stored_receipts() {
    let (service, _) = setup();
    let receipt = service
        .create(input("Ines", Some("T-77"), &[7]), "caja", at(5))
        .expect("create");

    let (pdf, name) = service.render_pdf(receipt.id).expect("pdf");
    assert!(pdf.starts_with(b"%PDF"));
    assert_eq!(name, "Recibo_1.pdf");

    let (xlsx, name) = service
        .report_excel(&ReceiptFilter::default(), "caja", at(6))
        .expect("xlsx");
    assert!(xlsx.starts_with(b"PK"));
    assert_eq!(name, "Reporte_Recibos_20250206_1130.xlsx");

    let (report, _) = service
        .report_pdf(&ReceiptFilter::default(), "caja", at(6))
        .expect("report pdf");
    assert!(report.starts_with(b"%PDF"));
    assert!(matches!(service.render_pdf(42), Err(ReceiptError::NotFound)));
}

/// Rows after a header row, in import column order.
fn workbook(rows: &[Vec<String>]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Recibos").expect("sheet name");
    for (col, header) in importer::COLUMNS.iter().enumerate() {
        sheet.write_string(0, col as u16, *header).expect("header");
    }
    for (idx, row) in rows.iter().enumerate() {
        for (col, value) in row.iter().enumerate() {
            if !value.is_empty() {
                sheet
                    .write_string(idx as u32 + 1, col as u16, value)
                    .expect("cell");
            }
        }
    }
    workbook.save_to_buffer().expect("workbook")
}

fn row(fecha: &str, nombre: &str, rif: &str, total: &str, transferencia: &str) -> Vec<String> {
    let mut cells = vec![
        fecha,
        "PAGADO",
        nombre,
        rif,
        "Barrio Sucre",
        "",
        "1,50",
        "36,5",
        total,
        transferencia,
        "SI",
        "Cuota",
        "X",
    ];
    cells.resize(importer::COLUMNS.len() - 1, "");
    cells.push("1");
    cells.into_iter().map(str::to_string).collect()
}

#[test]
fn atomic_imports_abort_on_the_first_rejection() {
    let (service, _) = setup();
    service
        .create(input("Previo", Some("REF-1"), &[]), "caja", at(1))
        .expect("seed");

    let bytes = workbook(&[
        row("15/01/2025", "Juan", "V-1", "1.234,56", "REF-2"),
        row("2025-01-16", "Luisa", "V-2", "100", "REF-1"),
    ]);
    let options = service.import_options(ImportPolicy::Atomic);
    let err = service
        .import(&bytes, &options, "caja", at(2))
        .expect_err("stored transfer rejects the batch");

    assert!(matches!(err, ReceiptError::Import(ImportError::Rejected { fila: 3, .. })));
    assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(service.list(&ReceiptFilter::default()).expect("list").len(), 1);
}

#[test]
fn atomic_imports_reject_rows_without_a_payer() {
    let (service, _) = setup();
    service
        .create(input("Previo", Some("REF-1"), &[]), "caja", at(1))
        .expect("seed");
    let options = service.import_options(ImportPolicy::Atomic);

    let blank_name = workbook(&[
        row("15/01/2025", "Juan", "V-1", "100", "REF-2"),
        row("16/01/2025", "   ", "V-2", "200", "REF-3"),
        row("17/01/2025", "Pedro", "V-3", "300", "REF-4"),
    ]);
    let err = service
        .import(&blank_name, &options, "caja", at(2))
        .expect_err("blank Nombre rejects the batch");
    assert!(matches!(
        err,
        ReceiptError::Import(ImportError::Rejected { fila: 3, ref motivo }) if motivo == "missing Nombre"
    ));

    let blank_rif = workbook(&[
        row("15/01/2025", "Juan", "", "100", "REF-2"),
        row("16/01/2025", "Luisa", "V-2", "200", "REF-3"),
    ]);
    let err = service
        .import(&blank_rif, &options, "caja", at(2))
        .expect_err("blank RIF/Cédula rejects the batch");
    assert!(matches!(
        err,
        ReceiptError::Import(ImportError::Rejected { fila: 2, ref motivo }) if motivo == "missing RIF/Cédula"
    ));

    assert_eq!(service.list(&ReceiptFilter::default()).expect("list").len(), 1);
    let next = service
        .create(input("Siguiente", Some("REF-2"), &[]), "caja", at(3))
        .expect("transfer still free");
    assert_eq!(next.numero_recibo, 2);
}

#[test]
fn skip_invalid_imports_commit_valid_rows_in_sequence() {
    let (service, _) = setup();
    service
        .create(input("Previo", Some("REF-1"), &[]), "caja", at(1))
        .expect("seed");

    let bytes = workbook(&[
        row("15/01/2025", "Juan", "V-1", "1.234,56", "REF-2"),
        row("16/01/2025", "", "V-2", "100", ""),
        row("17/01/2025", "Pedro", "V-3", "Bs. 50,5", "REF-2"),
        row("", "Rita", "V-4", "75", ""),
    ]);
    let options = service.import_options(ImportPolicy::SkipInvalid);
    let report = service
        .import(&bytes, &options, "importador", at(2))
        .expect("import");

    assert_eq!(report.filas_leidas, 4);
    assert_eq!(report.importados, 2);
    assert_eq!(report.numeros, vec![2, 3]);
    assert_eq!(
        report.rechazados.iter().map(|r| r.fila).collect::<Vec<_>>(),
        vec![3, 4]
    );

    let imported = service.list(&ReceiptFilter::default()).expect("list");
    let juan = imported
        .iter()
        .find(|r| r.nombre == "Juan")
        .expect("juan imported");
    assert_eq!(juan.total_monto_bs, dec!(1234.56));
    assert_eq!(juan.gastos_administrativos, dec!(1.50));
    assert_eq!(juan.fecha, NaiveDate::from_ymd_opt(2025, 1, 15).expect("date"));
    assert!(juan.conciliado);
    assert_eq!(numbers(juan), vec![1, 10]);
    assert_eq!(juan.usuario_creador.as_deref(), Some("importador"));

    let rita = imported
        .iter()
        .find(|r| r.nombre == "Rita")
        .expect("rita imported");
    assert_eq!(rita.fecha, day(2));
}

#[test]
fn imports_report_missing_sheets() {
    let (service, _) = setup();
    let mut workbook = Workbook::new();
    workbook
        .add_worksheet()
        .set_name("Hoja1")
        .expect("sheet name");
    let bytes = workbook.save_to_buffer().expect("workbook");

    let err = service
        .import(&bytes, &ImportOptions::default(), "caja", at(2))
        .expect_err("missing sheet");
    assert!(matches!(err, ReceiptError::Import(ImportError::MissingSheet(_))));
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}
