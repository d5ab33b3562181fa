use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::beneficiaries::domain::blank_to_none;

pub const CATEGORY_COUNT: usize = 10;

const CATEGORY_LABELS: [&str; CATEGORY_COUNT] = [
    "1.Título Tierra Urbana",
    "2.Título + Vivienda",
    "3.Municipal",
    "4.Tierra Privada",
    "5.Tierra INAVI",
    "6.Excedentes Título",
    "7.Excedentes INAVI",
    "8.Estudio Técnico",
    "9.Locales Comerciales",
    "10.Arrendamiento Terrenos",
];

/// One of the ten fixed regularization service categories, numbered 1..=10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Category(u8);

impl Category {
    pub fn new(number: u8) -> Option<Self> {
        (1..=CATEGORY_COUNT as u8)
            .contains(&number)
            .then_some(Self(number))
    }

    pub fn all() -> impl Iterator<Item = Category> {
        (1..=CATEGORY_COUNT as u8).map(Category)
    }

    pub fn number(&self) -> u8 {
        self.0
    }

    fn index(&self) -> usize {
        usize::from(self.0 - 1)
    }

    pub fn label(&self) -> &'static str {
        CATEGORY_LABELS[self.index()]
    }
}

impl TryFrom<u8> for Category {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Category::new(value).ok_or_else(|| format!("category {value} is outside 1..=10"))
    }
}

impl From<Category> for u8 {
    fn from(category: Category) -> Self {
        category.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReceiptStatus {
    #[default]
    Pagado,
    Anulado,
    Pendiente,
}

impl ReceiptStatus {
    pub const ALL: [ReceiptStatus; 3] = [
        ReceiptStatus::Pagado,
        ReceiptStatus::Anulado,
        ReceiptStatus::Pendiente,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            ReceiptStatus::Pagado => "PAGADO",
            ReceiptStatus::Anulado => "ANULADO",
            ReceiptStatus::Pendiente => "PENDIENTE",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReceiptStatus::Pagado => "Pagado",
            ReceiptStatus::Anulado => "Anulado",
            ReceiptStatus::Pendiente => "Pendiente",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.code().eq_ignore_ascii_case(raw))
    }
}

/// Flags for the ten categories, stored in category order.
pub type CategoryFlags = [bool; CATEGORY_COUNT];

pub fn flags_from(categories: &[Category]) -> CategoryFlags {
    let mut flags = [false; CATEGORY_COUNT];
    for category in categories {
        flags[category.index()] = true;
    }
    flags
}

/// Payment receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: u64,
    pub numero_recibo: u64,
    pub estado: ReceiptStatus,
    pub nombre: String,
    pub rif_cedula_identidad: String,
    pub direccion_inmueble: Option<String>,
    pub ente_liquidado: Option<String>,
    pub gastos_administrativos: Decimal,
    pub tasa_dia: Decimal,
    pub total_monto_bs: Decimal,
    pub numero_transferencia: Option<String>,
    pub conciliado: bool,
    pub fecha: NaiveDate,
    pub concepto: String,
    pub categorias: CategoryFlags,
    pub anulado: bool,
    pub fecha_anulacion: Option<NaiveDateTime>,
    pub anulado_por: Option<String>,
    pub usuario_creador: Option<String>,
    pub fecha_creacion: NaiveDateTime,
}

impl Receipt {
    pub fn has_category(&self, category: Category) -> bool {
        self.categorias[category.index()]
    }

    pub fn marked_categories(&self) -> Vec<Category> {
        Category::all()
            .filter(|category| self.has_category(*category))
            .collect()
    }

    /// Comma separated labels of the marked categories.
    pub fn category_summary(&self) -> String {
        self.marked_categories()
            .iter()
            .map(Category::label)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Status as printed on reports; voided receipts always read `ANULADO`.
    pub fn display_status(&self) -> &'static str {
        if self.anulado {
            ReceiptStatus::Anulado.code()
        } else {
            self.estado.code()
        }
    }
}

fn default_tasa() -> Decimal {
    Decimal::ONE
}

fn default_concepto() -> String {
    "N/A".to_string()
}

/// Create/edit payload, also produced by the spreadsheet importer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptInput {
    #[serde(default)]
    pub estado: ReceiptStatus,
    pub nombre: String,
    pub rif_cedula_identidad: String,
    #[serde(default)]
    pub direccion_inmueble: Option<String>,
    #[serde(default)]
    pub ente_liquidado: Option<String>,
    #[serde(default)]
    pub gastos_administrativos: Decimal,
    #[serde(default = "default_tasa")]
    pub tasa_dia: Decimal,
    #[serde(default)]
    pub total_monto_bs: Decimal,
    #[serde(default)]
    pub numero_transferencia: Option<String>,
    #[serde(default)]
    pub conciliado: bool,
    pub fecha: NaiveDate,
    #[serde(default = "default_concepto")]
    pub concepto: String,
    #[serde(default)]
    pub categorias: Vec<Category>,
}

impl ReceiptInput {
    /// Trim text fields and check the mandatory identity and amounts.
    pub fn normalized(self) -> Result<Self, String> {
        let nombre = self.nombre.split_whitespace().collect::<Vec<_>>().join(" ");
        let rif_cedula_identidad = self.rif_cedula_identidad.trim().to_uppercase();
        if nombre.is_empty() {
            return Err("nombre is required".to_string());
        }
        if rif_cedula_identidad.is_empty() {
            return Err("rif_cedula_identidad is required".to_string());
        }
        for (field, value) in [
            ("gastos_administrativos", self.gastos_administrativos),
            ("tasa_dia", self.tasa_dia),
            ("total_monto_bs", self.total_monto_bs),
        ] {
            if value.is_sign_negative() && !value.is_zero() {
                return Err(format!("{field} cannot be negative"));
            }
        }
        let concepto = self.concepto.trim().to_string();

        Ok(Self {
            nombre,
            rif_cedula_identidad,
            direccion_inmueble: blank_to_none(self.direccion_inmueble),
            ente_liquidado: blank_to_none(self.ente_liquidado),
            numero_transferencia: blank_to_none(self.numero_transferencia),
            concepto: if concepto.is_empty() {
                default_concepto()
            } else {
                concepto
            },
            ..self
        })
    }

    /// Materialize a receipt with the given number and audit stamp.
    pub fn into_receipt(
        self,
        numero_recibo: u64,
        usuario_creador: Option<String>,
        fecha_creacion: NaiveDateTime,
    ) -> Receipt {
        Receipt {
            id: 0,
            numero_recibo,
            estado: self.estado,
            nombre: self.nombre,
            rif_cedula_identidad: self.rif_cedula_identidad,
            direccion_inmueble: self.direccion_inmueble,
            ente_liquidado: self.ente_liquidado,
            gastos_administrativos: self.gastos_administrativos,
            tasa_dia: self.tasa_dia,
            total_monto_bs: self.total_monto_bs,
            numero_transferencia: self.numero_transferencia,
            conciliado: self.conciliado,
            fecha: self.fecha,
            concepto: self.concepto,
            categorias: flags_from(&self.categorias),
            anulado: self.estado == ReceiptStatus::Anulado,
            fecha_anulacion: None,
            anulado_por: None,
            usuario_creador,
            fecha_creacion,
        }
    }
}

/// Next receipt number after the current maximum.
pub fn next_receipt_number(current_max: Option<u64>) -> u64 {
    current_max.map_or(1, |max| max + 1)
}
