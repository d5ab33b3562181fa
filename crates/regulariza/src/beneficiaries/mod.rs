//! Beneficiary registry: person/entity records, their digital expediente and
//! the visit log.

pub mod domain;
pub mod export;
pub mod repository;
pub mod router;
pub mod service;


pub use domain::{
    Beneficiary, BeneficiaryDetail, BeneficiaryInput, BeneficiaryMatch, DocumentType,
    ExpedienteDocument, Gender, Visit, VisitInput,
};
pub use repository::BeneficiaryRepository;
pub use router::beneficiary_router;
pub use service::{BeneficiaryError, BeneficiaryService, UploadedDocument};
