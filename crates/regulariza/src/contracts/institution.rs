use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Institutional data quoted in every generated contract. A single record
/// exists per deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstitutionalConfig {
    #[serde(default)]
    pub nombre_gerente: String,
    #[serde(default)]
    pub cedula_gerente: String,
    #[serde(default = "default_providencia")]
    pub providencia_nro: String,
    #[serde(default)]
    pub fecha_providencia: Option<NaiveDate>,
    #[serde(default = "default_gaceta")]
    pub gaceta_nro: String,
    /// Price per square metre, in bolívares.
    #[serde(default = "default_monto_m2")]
    pub monto_m2: Decimal,
}

fn default_providencia() -> String {
    "020-024".to_string()
}

fn default_gaceta() -> String {
    "43.063".to_string()
}

fn default_monto_m2() -> Decimal {
    Decimal::new(1, 3)
}

impl Default for InstitutionalConfig {
    fn default() -> Self {
        Self {
            nombre_gerente: String::new(),
            cedula_gerente: String::new(),
            providencia_nro: default_providencia(),
            fecha_providencia: None,
            gaceta_nro: default_gaceta(),
            monto_m2: default_monto_m2(),
        }
    }
}

impl InstitutionalConfig {
    pub fn normalized(mut self) -> Self {
        self.nombre_gerente = self.nombre_gerente.trim().to_uppercase();
        self.cedula_gerente = self.cedula_gerente.trim().to_uppercase();
        self.providencia_nro = self.providencia_nro.trim().to_string();
        self.gaceta_nro = self.gaceta_nro.trim().to_string();
        self
    }
}
