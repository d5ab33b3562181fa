use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::beneficiaries::Beneficiary;

pub const DEFAULT_CONTRACT_TYPE: &str = "VENTA PURA Y SIMPLE";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractState {
    #[default]
    Borrador,
    Revision,
    Aprobado,
    Firmado,
    Anulado,
}

impl ContractState {
    pub const ALL: [ContractState; 5] = [
        ContractState::Borrador,
        ContractState::Revision,
        ContractState::Aprobado,
        ContractState::Firmado,
        ContractState::Anulado,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ContractState::Borrador => "Borrador",
            ContractState::Revision => "En Revisión",
            ContractState::Aprobado => "Aprobado",
            ContractState::Firmado => "Firmado",
            ContractState::Anulado => "Anulado",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ContractState::Borrador => "borrador",
            ContractState::Revision => "revision",
            ContractState::Aprobado => "aprobado",
            ContractState::Firmado => "firmado",
            ContractState::Anulado => "anulado",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|state| state.code().eq_ignore_ascii_case(raw.trim()))
    }

    /// Draft and in-review contracts may still be edited or moved along.
    pub fn is_open(&self) -> bool {
        matches!(self, ContractState::Borrador | ContractState::Revision)
    }

    pub fn can_transition_to(&self, next: ContractState) -> bool {
        match (self, next) {
            (ContractState::Borrador, ContractState::Revision) => true,
            (from, ContractState::Aprobado | ContractState::Anulado) => from.is_open(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Baja,
    #[default]
    Media,
    Alta,
    Urgente,
}

impl Priority {
    pub fn label(&self) -> &'static str {
        match self {
            Priority::Baja => "Baja",
            Priority::Media => "Media",
            Priority::Alta => "Alta",
            Priority::Urgente => "Urgente",
        }
    }
}

/// Technical description of the adjudicated lot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyData {
    #[serde(default)]
    pub codigo_catastral: Option<String>,
    #[serde(default)]
    pub superficie_num: Option<Decimal>,
    #[serde(default)]
    pub superficie_letras: Option<String>,
    #[serde(default)]
    pub direccion_inmueble: Option<String>,
    #[serde(default)]
    pub lindero_norte: Option<String>,
    #[serde(default)]
    pub lindero_sur: Option<String>,
    #[serde(default)]
    pub lindero_este: Option<String>,
    #[serde(default)]
    pub lindero_oeste: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub id: u64,
    pub beneficiary_ids: Vec<u64>,
    pub codigo_contrato: String,
    pub tipo_contrato: String,
    pub prioridad: Priority,
    #[serde(flatten)]
    pub property: PropertyData,
    /// Storage key of the digitized contract, if one was uploaded.
    pub archivo_escaneado: Option<String>,
    pub fecha_creacion: NaiveDateTime,
    pub fecha_actualizacion: NaiveDateTime,
    pub fecha_aprobacion: Option<NaiveDateTime>,
    pub estado: ContractState,
    pub cuerpo_contrato: String,
    pub version: u32,
    pub creado_por: Option<String>,
    pub aprobado_por: Option<String>,
}

/// Audit trail entry appended on every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: u64,
    pub contract_id: u64,
    pub usuario: Option<String>,
    pub accion: String,
    pub descripcion: String,
    pub fecha: NaiveDateTime,
}

/// Create/update payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContractInput {
    pub beneficiary_ids: Vec<u64>,
    #[serde(default)]
    pub tipo_contrato: Option<String>,
    #[serde(default)]
    pub prioridad: Option<Priority>,
    #[serde(flatten)]
    pub property: PropertyData,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContractDetail {
    pub contract: Contract,
    pub beneficiaries: Vec<Beneficiary>,
    pub historial: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContractFilter {
    #[serde(default)]
    pub estado: Option<ContractState>,
    #[serde(default)]
    pub beneficiary_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateStat {
    pub estado: ContractState,
    pub label: &'static str,
    pub total: usize,
    pub porcentaje: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContractStats {
    pub total_general: usize,
    pub stats: Vec<StateStat>,
}

impl ContractStats {
    /// Per-state counts with percentages rounded to one decimal.
    pub fn from_contracts(contracts: &[Contract]) -> Self {
        let total_general = contracts.len();
        let stats = ContractState::ALL
            .into_iter()
            .filter_map(|estado| {
                let total = contracts.iter().filter(|c| c.estado == estado).count();
                if total == 0 {
                    return None;
                }
                let porcentaje = (total as f64 / total_general as f64 * 1000.0).round() / 10.0;
                Some(StateStat {
                    estado,
                    label: estado.label(),
                    total,
                    porcentaje,
                })
            })
            .collect();
        Self {
            total_general,
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approval_is_terminal() {
        assert!(ContractState::Borrador.can_transition_to(ContractState::Aprobado));
        assert!(ContractState::Revision.can_transition_to(ContractState::Aprobado));
        for next in ContractState::ALL {
            assert!(!ContractState::Aprobado.can_transition_to(next));
            assert!(!ContractState::Anulado.can_transition_to(next));
            assert!(!ContractState::Firmado.can_transition_to(next));
        }
        assert!(!ContractState::Revision.can_transition_to(ContractState::Borrador));
    }

    #[test]
    fn parses_state_codes() {
        assert_eq!(ContractState::parse(" Aprobado "), Some(ContractState::Aprobado));
        assert_eq!(ContractState::parse("pendiente"), None);
    }
}
