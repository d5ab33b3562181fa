//! Legal body of adjudication contracts.
//!
//! The text is a fixed template; the variable parts are the beneficiary party
//! (with Spanish number and gender agreement), the lot description and the
//! institutional data. Missing inputs never abort generation: they are
//! replaced by placeholders so the draft can be completed later.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::domain::PropertyData;
use super::institution::InstitutionalConfig;
use crate::beneficiaries::{Beneficiary, DocumentType, Gender};
use crate::documents::text::{format_amount, format_bs, format_date, legal_date};

pub const NO_DATA: &str = "S/D";
pub const NO_NAME: &str = "SIN NOMBRE";
pub const NO_NUMBER: &str = "S/N";

/// Inputs of one assembly run.
#[derive(Debug, Clone, Copy)]
pub struct LegalContext<'a> {
    pub beneficiaries: &'a [Beneficiary],
    pub tipo_contrato: &'a str,
    pub codigo_contrato: &'a str,
    pub property: &'a PropertyData,
    pub config: &'a InstitutionalConfig,
    pub fecha: NaiveDate,
}

/// Grammatical number and gender of the beneficiary party.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Agreement {
    pub plural: bool,
    pub feminine: bool,
}

impl Agreement {
    /// Plural when more than one beneficiary signs; feminine only when every
    /// beneficiary is recorded as female.
    pub fn for_party(beneficiaries: &[Beneficiary]) -> Self {
        let plural = beneficiaries.len() > 1;
        let feminine = !beneficiaries.is_empty()
            && beneficiaries
                .iter()
                .all(|beneficiary| beneficiary.genero == Some(Gender::Femenino));
        Self { plural, feminine }
    }

    pub fn for_person(beneficiary: &Beneficiary) -> Self {
        Self::for_party(std::slice::from_ref(beneficiary))
    }

    fn pick(
        &self,
        singular_m: &'static str,
        singular_f: &'static str,
        plural_m: &'static str,
        plural_f: &'static str,
    ) -> &'static str {
        match (self.plural, self.feminine) {
            (false, false) => singular_m,
            (false, true) => singular_f,
            (true, false) => plural_m,
            (true, true) => plural_f,
        }
    }

    fn by_number(&self, singular: &'static str, plural: &'static str) -> &'static str {
        if self.plural {
            plural
        } else {
            singular
        }
    }

    pub fn article(&self) -> &'static str {
        self.pick("EL", "LA", "LOS", "LAS")
    }

    pub fn party_noun(&self) -> &'static str {
        self.pick(
            "BENEFICIARIO",
            "BENEFICIARIA",
            "BENEFICIARIOS",
            "BENEFICIARIAS",
        )
    }

    /// `EL BENEFICIARIO`, `LAS BENEFICIARIAS`, ...
    pub fn designation(&self) -> String {
        format!("{} {}", self.article(), self.party_noun())
    }

    /// Designation after the preposition `a` (`al BENEFICIARIO`).
    pub fn to_designation(&self) -> String {
        match (self.plural, self.feminine) {
            (false, false) => format!("AL {}", self.party_noun()),
            _ => format!("A {}", self.designation()),
        }
    }

    pub fn citizen(&self) -> &'static str {
        self.pick(
            "el ciudadano",
            "la ciudadana",
            "los ciudadanos",
            "las ciudadanas",
        )
    }

    pub fn nationality(&self, foreign: bool) -> &'static str {
        if foreign {
            self.pick("extranjero", "extranjera", "extranjeros", "extranjeras")
        } else {
            self.pick("venezolano", "venezolana", "venezolanos", "venezolanas")
        }
    }

    pub fn adult(&self) -> &'static str {
        self.by_number("mayor de edad", "mayores de edad")
    }

    pub fn domiciled(&self) -> &'static str {
        self.pick("domiciliado", "domiciliada", "domiciliados", "domiciliadas")
    }

    pub fn demonstrative(&self) -> &'static str {
        self.pick("este", "esta", "estos", "estas")
    }

    pub fn relative(&self) -> &'static str {
        self.by_number("quien", "quienes")
    }

    pub fn will_be_named(&self) -> &'static str {
        self.by_number("se denominará", "se denominarán")
    }

    pub fn declares(&self) -> &'static str {
        self.by_number("declara", "declaran")
    }

    pub fn accepts(&self) -> &'static str {
        self.by_number("acepta", "aceptan")
    }

    pub fn binds_itself(&self) -> &'static str {
        self.by_number("se obliga", "se obligan")
    }

    pub fn receives(&self) -> &'static str {
        self.by_number("recibe", "reciben")
    }
}

fn or_placeholder(value: Option<&str>, placeholder: &str) -> String {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| placeholder.to_string())
}

fn name_of(beneficiary: &Beneficiary) -> String {
    or_placeholder(Some(&beneficiary.nombre_completo), NO_NAME)
}

fn identity_of(beneficiary: &Beneficiary) -> String {
    let number = or_placeholder(Some(&beneficiary.documento_identidad), NO_NUMBER);
    let kind = if beneficiary.tipo_documento.is_entity() {
        "Registro de Información Fiscal (RIF) N°"
    } else {
        "cédula de identidad N°"
    };
    format!("{kind} {}-{number}", beneficiary.tipo_documento.prefix())
}

/// `A`, `A y B`, `A, B y C`.
fn join_spanish(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} y {}", init.join(", "), last),
    }
}

/// Identification of the beneficiary side of the contract.
fn party_clause(beneficiaries: &[Beneficiary], agreement: &Agreement) -> String {
    if beneficiaries.is_empty() {
        return format!(
            "{} {NO_NAME}, titular de la cédula de identidad N° {NO_NUMBER}, {} en {NO_DATA}",
            agreement.citizen(),
            agreement.domiciled()
        );
    }

    let domicile = or_placeholder(
        beneficiaries
            .iter()
            .find_map(|beneficiary| beneficiary.direccion.as_deref()),
        NO_DATA,
    );

    if beneficiaries.iter().all(|b| b.tipo_documento.is_entity()) {
        let entities: Vec<String> = beneficiaries
            .iter()
            .map(|b| format!("{}, inscrita en el {}", name_of(b), identity_of(b)))
            .collect();
        return format!(
            "{}, con domicilio en {domicile}",
            join_spanish(&entities)
        );
    }

    let foreign = beneficiaries
        .iter()
        .all(|b| b.tipo_documento == DocumentType::Extranjero);
    let people: Vec<String> = beneficiaries
        .iter()
        .map(|b| {
            if agreement.plural {
                format!("{} ({})", name_of(b), identity_of(b))
            } else {
                format!("{}, titular de la {}", name_of(b), identity_of(b))
            }
        })
        .collect();

    format!(
        "{} {}, {}, {}, {} en {domicile}",
        agreement.citizen(),
        join_spanish(&people),
        agreement.nationality(foreign),
        agreement.adult(),
        agreement.domiciled(),
    )
}

fn price_clause(property: &PropertyData, config: &InstitutionalConfig) -> (String, String) {
    let rate = format!("Bs. {}", format_amount(config.monto_m2, 4));
    let price = match property.superficie_num {
        Some(area) if area > Decimal::ZERO => format_bs(area * config.monto_m2),
        _ => NO_DATA.to_string(),
    };
    (price, rate)
}

/// Build the full contract body. Deterministic for a given context.
pub fn assemble_legal_body(ctx: &LegalContext<'_>) -> String {
    let agreement = Agreement::for_party(ctx.beneficiaries);
    let designation = agreement.designation();
    let config = ctx.config;
    let property = ctx.property;

    let gerente = or_placeholder(Some(&config.nombre_gerente), NO_DATA);
    let cedula_gerente = or_placeholder(Some(&config.cedula_gerente), NO_NUMBER);
    let providencia = or_placeholder(Some(&config.providencia_nro), NO_NUMBER);
    let gaceta = or_placeholder(Some(&config.gaceta_nro), NO_NUMBER);
    let fecha_providencia = config
        .fecha_providencia
        .map(|date| format!(" de fecha {}", format_date(date)))
        .unwrap_or_default();
    let tipo = or_placeholder(Some(ctx.tipo_contrato), NO_DATA).to_uppercase();
    let codigo = or_placeholder(Some(ctx.codigo_contrato), NO_NUMBER);

    let direccion = or_placeholder(property.direccion_inmueble.as_deref(), NO_DATA);
    let catastral = or_placeholder(property.codigo_catastral.as_deref(), NO_DATA);
    let superficie_letras = or_placeholder(property.superficie_letras.as_deref(), NO_DATA);
    let superficie_num = property
        .superficie_num
        .map(|area| format_amount(area, 2))
        .unwrap_or_else(|| NO_DATA.to_string());
    let norte = or_placeholder(property.lindero_norte.as_deref(), NO_DATA);
    let sur = or_placeholder(property.lindero_sur.as_deref(), NO_DATA);
    let este = or_placeholder(property.lindero_este.as_deref(), NO_DATA);
    let oeste = or_placeholder(property.lindero_oeste.as_deref(), NO_DATA);
    let (precio, tarifa) = price_clause(property, config);
    let copies = ctx.beneficiaries.len().max(1) + 1;

    let mut body = String::new();
    body.push_str(&format!("CONTRATO N° {codigo}\n\n"));
    body.push_str(&format!(
        "Entre el INSTITUTO NACIONAL DE TIERRAS URBANAS (INTU), representado en este acto por \
         el ciudadano {gerente}, titular de la cédula de identidad N° {cedula_gerente}, en su \
         carácter de Gerente, designado mediante Providencia Administrativa N° {providencia}\
         {fecha_providencia}, publicada en la Gaceta Oficial de la República Bolivariana de \
         Venezuela N° {gaceta}, quien en lo sucesivo y a los efectos del presente documento se \
         denominará EL INTU, por una parte; y por la otra, {party}, {relative} a los efectos de \
         este contrato {named} {designation}, se ha convenido en celebrar el presente contrato \
         de {tipo}, el cual se regirá por las cláusulas siguientes:\n\n",
        party = party_clause(ctx.beneficiaries, &agreement),
        relative = agreement.relative(),
        named = agreement.will_be_named(),
    ));
    body.push_str(&format!(
        "PRIMERA: EL INTU da en {tipo_lower} {to_party}, y {demonstrative} así lo {accepts}, un \
         lote de terreno urbano ubicado en {direccion}, identificado con el código catastral \
         N° {catastral}, con una superficie de {superficie_letras} ({superficie_num} m²), \
         comprendido dentro de los siguientes linderos: NORTE: {norte}; SUR: {sur}; ESTE: \
         {este}; y OESTE: {oeste}.\n\n",
        tipo_lower = tipo.to_lowercase(),
        to_party = agreement.to_designation(),
        demonstrative = agreement.demonstrative(),
        accepts = agreement.accepts(),
    ));
    body.push_str(&format!(
        "SEGUNDA: El precio de la presente negociación es la cantidad de {precio}, calculada a \
         razón de {tarifa} por metro cuadrado, que {designation} {declares} haber pagado a EL \
         INTU a su entera y cabal satisfacción.\n\n",
        declares = agreement.declares(),
    ));
    body.push_str(&format!(
        "TERCERA: {designation} {binds} a destinar el lote de terreno descrito a uso \
         residencial familiar, y a no enajenarlo ni gravarlo sin la autorización previa y por \
         escrito de EL INTU.\n\n",
        binds = agreement.binds_itself(),
    ));
    body.push_str(&format!(
        "CUARTA: {designation} {declares} conocer el inmueble objeto de este contrato y lo \
         {receives} en el estado en que se encuentra.\n\n",
        declares = agreement.declares(),
        receives = agreement.receives(),
    ));
    body.push_str(
        "QUINTA: Para todos los efectos derivados del presente contrato las partes eligen como \
         domicilio especial la jurisdicción del lugar de ubicación del inmueble, a la competencia \
         de cuyos tribunales declaran someterse.\n\n",
    );
    body.push_str(&format!(
        "Se hacen {copies} ejemplares de un mismo tenor y a un solo efecto, {}.",
        legal_date(ctx.fecha)
    ));

    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn person(id: u64, name: &str, genero: Option<Gender>) -> Beneficiary {
        Beneficiary {
            id,
            tipo_documento: DocumentType::Cedula,
            documento_identidad: format!("{}", 10_000_000 + id),
            nombre_completo: name.to_string(),
            telefono: None,
            email: None,
            direccion: Some("SECTOR LA PAZ, CASA 4".to_string()),
            genero,
        }
    }

    fn property() -> PropertyData {
        PropertyData {
            codigo_catastral: Some("13-05-01-U01-004".to_string()),
            superficie_num: Some(dec!(250.50)),
            superficie_letras: Some("DOSCIENTOS CINCUENTA METROS CON CINCUENTA".to_string()),
            direccion_inmueble: Some("CALLE 3, BARRIO EL CARMEN".to_string()),
            lindero_norte: Some("CALLE 3".to_string()),
            lindero_sur: Some("PARCELA 12".to_string()),
            lindero_este: None,
            lindero_oeste: Some("   ".to_string()),
        }
    }

    fn assemble(beneficiaries: &[Beneficiary], config: &InstitutionalConfig) -> String {
        let property = property();
        assemble_legal_body(&LegalContext {
            beneficiaries,
            tipo_contrato: "venta pura y simple",
            codigo_contrato: "CT-2025-0001",
            property: &property,
            config,
            fecha: NaiveDate::from_ymd_opt(2025, 3, 5).expect("valid date"),
        })
    }

    #[test]
    fn agreement_tracks_count_and_gender() {
        let ana = person(1, "ANA", Some(Gender::Femenino));
        let eva = person(2, "EVA", Some(Gender::Femenino));
        let luis = person(3, "LUIS", Some(Gender::Masculino));
        let sin_genero = person(4, "ALEX", None);

        let single_f = Agreement::for_party(std::slice::from_ref(&ana));
        assert_eq!(single_f.designation(), "LA BENEFICIARIA");
        assert_eq!(single_f.to_designation(), "A LA BENEFICIARIA");

        let plural_f = Agreement::for_party(&[ana.clone(), eva.clone()]);
        assert_eq!(plural_f.designation(), "LAS BENEFICIARIAS");
        assert_eq!(plural_f.declares(), "declaran");

        let mixed = Agreement::for_party(&[ana, luis]);
        assert_eq!(mixed.designation(), "LOS BENEFICIARIOS");
        assert_eq!(mixed.nationality(false), "venezolanos");

        let unknown = Agreement::for_person(&sin_genero);
        assert_eq!(unknown.designation(), "EL BENEFICIARIO");
        assert_eq!(unknown.to_designation(), "AL BENEFICIARIO");
        assert_eq!(unknown.relative(), "quien");
    }

    #[test]
    fn singular_feminine_body_agrees() {
        let config = InstitutionalConfig::default();
        let body = assemble(&[person(1, "MARIA PEREZ", Some(Gender::Femenino))], &config);

        assert!(
            body.contains("la ciudadana MARIA PEREZ, titular de la cédula de identidad N° V-10000001")
        );
        assert!(body.contains("venezolana, mayor de edad, domiciliada en SECTOR LA PAZ, CASA 4"));
        assert!(
            body.contains("quien a los efectos de este contrato se denominará LA BENEFICIARIA")
        );
        assert!(body.contains("A LA BENEFICIARIA, y esta así lo acepta"));
        assert!(body.contains("LA BENEFICIARIA declara haber pagado"));
    }

    #[test]
    fn plural_body_lists_every_beneficiary() {
        let config = InstitutionalConfig::default();
        let body = assemble(
            &[
                person(1, "JOSE DIAZ", Some(Gender::Masculino)),
                person(2, "ROSA DIAZ", Some(Gender::Femenino)),
                person(3, "LUIS DIAZ", None),
            ],
            &config,
        );

        assert!(body.contains(
            "los ciudadanos JOSE DIAZ (cédula de identidad N° V-10000001), ROSA DIAZ \
             (cédula de identidad N° V-10000002) y LUIS DIAZ (cédula de identidad N° V-10000003)"
        ));
        assert!(
            body.contains("quienes a los efectos de este contrato se denominarán LOS BENEFICIARIOS")
        );
        assert!(body.contains("LOS BENEFICIARIOS se obligan"));
        assert!(body.contains("lo reciben en el estado"));
        assert!(body.contains("Se hacen 4 ejemplares"));
    }

    #[test]
    fn missing_inputs_fall_back_to_placeholders() {
        let config = InstitutionalConfig {
            nombre_gerente: "   ".to_string(),
            cedula_gerente: String::new(),
            ..InstitutionalConfig::default()
        };
        let mut nameless = person(1, "", None);
        nameless.direccion = None;
        let body = assemble(&[nameless], &config);

        assert!(body.contains("el ciudadano S/D, titular de la cédula de identidad N° S/N"));
        assert!(body.contains("el ciudadano SIN NOMBRE"));
        assert!(body.contains("domiciliado en S/D"));
        assert!(body.contains("ESTE: S/D; y OESTE: S/D"));
    }

    #[test]
    fn empty_party_still_produces_a_draft() {
        let config = InstitutionalConfig::default();
        let body = assemble(&[], &config);
        assert!(body.contains("el ciudadano SIN NOMBRE, titular de la cédula de identidad N° S/N"));
        assert!(body.contains("Se hacen 2 ejemplares"));
    }

    #[test]
    fn price_uses_area_times_rate() {
        let config = InstitutionalConfig {
            monto_m2: dec!(2.5),
            ..InstitutionalConfig::default()
        };
        let body = assemble(&[person(1, "ANA", None)], &config);
        assert!(
            body.contains("la cantidad de Bs. 626,25, calculada a razón de Bs. 2,5000 por metro cuadrado")
        );
        assert!(body.contains("(250,50 m²)"));
    }

    #[test]
    fn entities_are_identified_by_rif() {
        let mut entity = person(1, "COOPERATIVA EL SOL", None);
        entity.tipo_documento = DocumentType::Rif;
        entity.documento_identidad = "123456789".to_string();
        let body = assemble(&[entity], &InstitutionalConfig::default());
        assert!(body.contains(
            "COOPERATIVA EL SOL, inscrita en el Registro de Información Fiscal (RIF) N° J-123456789, con domicilio en"
        ));
    }

    #[test]
    fn assembly_is_deterministic() {
        let config = InstitutionalConfig::default();
        let party = [person(1, "ANA", Some(Gender::Femenino))];
        assert_eq!(assemble(&party, &config), assemble(&party, &config));
    }
}
