use rust_xlsxwriter::Workbook;

use super::domain::Beneficiary;
use crate::documents::{DocumentError, SheetCell, SheetTable};

const HEADERS: [&str; 7] = [
    "Tipo",
    "Documento",
    "Nombre Completo",
    "Teléfono",
    "Email",
    "Dirección",
    "Género",
];

/// Registry export: one styled sheet with every beneficiary.
pub fn registry_workbook(beneficiaries: &[Beneficiary]) -> Result<Vec<u8>, DocumentError> {
    let mut table = SheetTable::new(&HEADERS, 0xF2F2F2, false);
    for beneficiary in beneficiaries {
        let genero = match beneficiary.genero {
            Some(super::Gender::Masculino) => "M",
            Some(super::Gender::Femenino) => "F",
            None => "",
        };
        table.push(vec![
            SheetCell::from(beneficiary.tipo_documento.label()),
            beneficiary.full_document().into(),
            beneficiary.nombre_completo.clone().into(),
            beneficiary.telefono.clone().into(),
            beneficiary.email.clone().into(),
            beneficiary.direccion.clone().into(),
            SheetCell::from(genero),
        ]);
    }

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Beneficiarios")?;
    table.write(worksheet, 0)?;
    Ok(workbook.save_to_buffer()?)
}
