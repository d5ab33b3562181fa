use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Identity document class printed before the number (`V-12345678`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentType {
    #[default]
    #[serde(rename = "V")]
    Cedula,
    #[serde(rename = "J")]
    Rif,
    #[serde(rename = "E")]
    Extranjero,
    #[serde(rename = "G")]
    Gubernamental,
}

impl DocumentType {
    pub fn prefix(&self) -> char {
        match self {
            DocumentType::Cedula => 'V',
            DocumentType::Rif => 'J',
            DocumentType::Extranjero => 'E',
            DocumentType::Gubernamental => 'G',
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DocumentType::Cedula => "Cédula (V)",
            DocumentType::Rif => "Jurídico (J)",
            DocumentType::Extranjero => "Extranjero (E)",
            DocumentType::Gubernamental => "Gubernamental (G)",
        }
    }

    /// Legal entities are referred to without personal titles.
    pub fn is_entity(&self) -> bool {
        matches!(self, DocumentType::Rif | DocumentType::Gubernamental)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Masculino,
    #[serde(rename = "F")]
    Femenino,
}

/// Registered land-regularization beneficiary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beneficiary {
    pub id: u64,
    pub tipo_documento: DocumentType,
    pub documento_identidad: String,
    pub nombre_completo: String,
    pub telefono: Option<String>,
    pub email: Option<String>,
    pub direccion: Option<String>,
    pub genero: Option<Gender>,
}

impl Beneficiary {
    /// `V-12345678` style identity used in listings and legal text.
    pub fn full_document(&self) -> String {
        format!("{}-{}", self.tipo_documento.prefix(), self.documento_identidad)
    }
}

/// Create/update payload; normalized before it reaches storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeneficiaryInput {
    #[serde(default)]
    pub tipo_documento: DocumentType,
    pub documento_identidad: String,
    pub nombre_completo: String,
    #[serde(default)]
    pub telefono: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub direccion: Option<String>,
    #[serde(default)]
    pub genero: Option<Gender>,
}

impl BeneficiaryInput {
    /// Upper-case identity fields and drop blank optionals.
    pub fn normalize(self, id: u64) -> Result<Beneficiary, String> {
        let documento_identidad = self.documento_identidad.trim().to_uppercase();
        let nombre_completo = self
            .nombre_completo
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase();

        if documento_identidad.is_empty() {
            return Err("documento_identidad is required".to_string());
        }
        if nombre_completo.is_empty() {
            return Err("nombre_completo is required".to_string());
        }

        let email = blank_to_none(self.email);
        if let Some(email) = &email {
            if !email.contains('@') {
                return Err(format!("invalid email '{email}'"));
            }
        }

        Ok(Beneficiary {
            id,
            tipo_documento: self.tipo_documento,
            documento_identidad,
            nombre_completo,
            telefono: blank_to_none(self.telefono),
            email,
            direccion: blank_to_none(self.direccion),
            genero: self.genero,
        })
    }
}

pub(crate) fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// File stored in a beneficiary's digital folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpedienteDocument {
    pub id: u64,
    pub beneficiary_id: u64,
    pub nombre_documento: String,
    /// Storage key of the uploaded file.
    pub archivo: String,
    pub fecha_subida: NaiveDateTime,
}

/// Attention log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    pub id: u64,
    pub beneficiary_id: u64,
    pub motivo: String,
    pub observaciones: Option<String>,
    pub fecha: NaiveDateTime,
    pub registrado_por: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VisitInput {
    pub motivo: String,
    #[serde(default)]
    pub observaciones: Option<String>,
}

/// Beneficiary with its folder and visit history.
#[derive(Debug, Clone, Serialize)]
pub struct BeneficiaryDetail {
    pub beneficiary: Beneficiary,
    pub documentos: Vec<ExpedienteDocument>,
    pub visitas: Vec<Visit>,
    pub contratos: usize,
}

/// Compact row returned by the lookup endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BeneficiaryMatch {
    pub id: u64,
    pub documento: String,
    pub nombre: String,
    pub telefono: Option<String>,
}

impl From<&Beneficiary> for BeneficiaryMatch {
    fn from(beneficiary: &Beneficiary) -> Self {
        Self {
            id: beneficiary.id,
            documento: beneficiary.full_document(),
            nombre: beneficiary.nombre_completo.clone(),
            telefono: beneficiary.telefono.clone(),
        }
    }
}
