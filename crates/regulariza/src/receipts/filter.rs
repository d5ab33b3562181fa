//! Report filter shared by the listing, dashboard and exports.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{Category, Receipt};
use crate::documents::text::format_date;

/// Status criterion. `Todos` disables the filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum StatusFilter {
    #[default]
    Todos,
    /// Voided receipts only.
    Anulado,
    /// Everything not voided.
    Activo,
    /// Case-insensitive match on the stored status code.
    Estado(String),
}

impl StatusFilter {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim).filter(|raw| !raw.is_empty()) {
            None => StatusFilter::Todos,
            Some(raw) if raw.eq_ignore_ascii_case("todos") => StatusFilter::Todos,
            Some(raw) if raw.eq_ignore_ascii_case("anulado") => StatusFilter::Anulado,
            Some(raw) if raw.eq_ignore_ascii_case("activo") => StatusFilter::Activo,
            Some(raw) => StatusFilter::Estado(raw.to_string()),
        }
    }

    pub fn label(&self) -> String {
        match self {
            StatusFilter::Todos => "Todos".to_string(),
            StatusFilter::Anulado => "Anulado".to_string(),
            StatusFilter::Activo => "Activo".to_string(),
            StatusFilter::Estado(raw) => raw.to_uppercase(),
        }
    }

    fn matches(&self, receipt: &Receipt) -> bool {
        match self {
            StatusFilter::Todos => true,
            StatusFilter::Anulado => receipt.anulado,
            StatusFilter::Activo => !receipt.anulado,
            StatusFilter::Estado(raw) => receipt.estado.code().eq_ignore_ascii_case(raw),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReceiptFilter {
    pub fecha_inicio: Option<NaiveDate>,
    pub fecha_fin: Option<NaiveDate>,
    pub estado: StatusFilter,
    /// A receipt matches when any of these categories is marked.
    pub categorias: Vec<Category>,
}

impl ReceiptFilter {
    pub fn matches(&self, receipt: &Receipt) -> bool {
        self.fecha_inicio.map_or(true, |from| receipt.fecha >= from)
            && self.fecha_fin.map_or(true, |to| receipt.fecha <= to)
            && self.estado.matches(receipt)
            && (self.categorias.is_empty()
                || self
                    .categorias
                    .iter()
                    .any(|category| receipt.has_category(*category)))
    }

    /// Matching receipts, newest date first and ascending number within a day.
    pub fn apply(&self, receipts: Vec<Receipt>) -> Vec<Receipt> {
        let mut selected: Vec<Receipt> = receipts
            .into_iter()
            .filter(|receipt| self.matches(receipt))
            .collect();
        selected.sort_by(|a, b| {
            b.fecha
                .cmp(&a.fecha)
                .then(a.numero_recibo.cmp(&b.numero_recibo))
        });
        selected
    }

    /// Human readable criteria for report headers.
    pub fn describe(&self) -> Vec<(String, String)> {
        let date = |value: Option<NaiveDate>| {
            value
                .map(format_date)
                .unwrap_or_else(|| "Sin límite".to_string())
        };
        let categorias = if self.categorias.is_empty() {
            "Todas".to_string()
        } else {
            self.categorias
                .iter()
                .map(Category::label)
                .collect::<Vec<_>>()
                .join(", ")
        };
        vec![
            ("Fecha inicio".to_string(), date(self.fecha_inicio)),
            ("Fecha fin".to_string(), date(self.fecha_fin)),
            ("Estado".to_string(), self.estado.label()),
            ("Categorías".to_string(), categorias),
        ]
    }
}

/// Raw query string form: dates as `YYYY-MM-DD`, categories comma separated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReceiptFilterQuery {
    #[serde(default)]
    pub fecha_inicio: Option<String>,
    #[serde(default)]
    pub fecha_fin: Option<String>,
    #[serde(default)]
    pub estado: Option<String>,
    #[serde(default)]
    pub categorias: Option<String>,
}

fn parse_query_date(field: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, String> {
    match raw.map(str::trim).filter(|raw| !raw.is_empty()) {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| format!("{field} must use YYYY-MM-DD, got '{raw}'")),
    }
}

impl TryFrom<ReceiptFilterQuery> for ReceiptFilter {
    type Error = String;

    fn try_from(query: ReceiptFilterQuery) -> Result<Self, Self::Error> {
        let fecha_inicio = parse_query_date("fecha_inicio", query.fecha_inicio.as_deref())?;
        let fecha_fin = parse_query_date("fecha_fin", query.fecha_fin.as_deref())?;
        if let (Some(from), Some(to)) = (fecha_inicio, fecha_fin) {
            if from > to {
                return Err("fecha_inicio is after fecha_fin".to_string());
            }
        }

        let mut categorias = Vec::new();
        for part in query
            .categorias
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
        {
            let category = part
                .parse::<u8>()
                .ok()
                .and_then(Category::new)
                .ok_or_else(|| format!("invalid category '{part}'"))?;
            if !categorias.contains(&category) {
                categorias.push(category);
            }
        }

        Ok(Self {
            fecha_inicio,
            fecha_fin,
            estado: StatusFilter::parse(query.estado.as_deref()),
            categorias,
        })
    }
}
