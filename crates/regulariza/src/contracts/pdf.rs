//! Printable contract: institutional header, metadata, legal body and
//! signature block.

use super::domain::{Contract, ContractState};
use crate::beneficiaries::Beneficiary;
use crate::documents::text::format_date;
use crate::documents::{DocumentError, Orientation, PdfCanvas, TextStyle};

const MARGIN_MM: f32 = 25.4;
const BODY_SIZE: f32 = 11.0;

pub const INSTITUTION_NAME: &str = "INSTITUTO NACIONAL DE TIERRAS URBANAS (INTU)";
pub const LEGAL_OFFICE: &str = "Gerencia de Consultoría Jurídica";

/// Status stamp printed under the metadata for contracts that are not final.
fn status_stamp(estado: ContractState) -> Option<&'static str> {
    match estado {
        ContractState::Borrador | ContractState::Revision => {
            Some("BORRADOR - DOCUMENTO SIN VALIDEZ LEGAL")
        }
        ContractState::Anulado => Some("CONTRATO ANULADO"),
        ContractState::Aprobado | ContractState::Firmado => None,
    }
}

pub fn render_contract(
    contract: &Contract,
    beneficiaries: &[Beneficiary],
) -> Result<Vec<u8>, DocumentError> {
    let mut canvas = PdfCanvas::new(
        &format!("Contrato {}", contract.codigo_contrato),
        Orientation::Portrait,
        MARGIN_MM,
    )?;

    canvas.centered(INSTITUTION_NAME, 15.0, TextStyle::Bold);
    canvas.centered(LEGAL_OFFICE, 10.0, TextStyle::Regular);
    canvas.rule(0.8);
    canvas.advance(6.0);

    canvas.line(
        &format!("CÓDIGO DE EXPEDIENTE: {}", contract.codigo_contrato),
        10.0,
        TextStyle::Bold,
    );
    canvas.line(
        &format!(
            "FECHA DE EMISIÓN: {}",
            format_date(contract.fecha_creacion.date())
        ),
        10.0,
        TextStyle::Regular,
    );
    if let Some(stamp) = status_stamp(contract.estado) {
        canvas.set_color(0.75, 0.1, 0.1);
        canvas.line(stamp, 10.0, TextStyle::Bold);
        canvas.reset_color();
    }
    canvas.advance(8.0);

    canvas.centered(&contract.tipo_contrato.to_uppercase(), 13.0, TextStyle::Bold);
    canvas.advance(6.0);
    canvas.paragraph(&contract.cuerpo_contrato, BODY_SIZE, TextStyle::Regular);

    let mut captions = vec![vec!["POR EL INTU".to_string()]];
    let party = if beneficiaries.len() > 1 {
        "BENEFICIARIO(A)"
    } else {
        "EL BENEFICIARIO"
    };
    for beneficiary in beneficiaries {
        captions.push(vec![
            party.to_string(),
            beneficiary.nombre_completo.clone(),
            beneficiary.full_document(),
        ]);
    }
    // At most two signature slots per row.
    for row in captions.chunks(2) {
        canvas.signature_lines(row, 8.0);
    }

    canvas.finish()
}
