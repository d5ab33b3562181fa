//! Adjudication contracts: sequential codes, generated legal body, approval
//! lifecycle with an audit trail, PDF/Excel output and scanned imports.

pub mod code;
pub mod domain;
pub mod export;
pub mod institution;
pub mod legal_text;
pub mod pdf;
pub mod repository;
pub mod router;
pub mod service;


pub use code::{
    canonical_code, code_prefix, format_code, is_contract_code, next_code, parse_code, sequence_of,
};
pub use domain::{
    Contract, ContractDetail, ContractFilter, ContractInput, ContractState, ContractStats,
    HistoryEntry, Priority, PropertyData, StateStat,
};
pub use institution::InstitutionalConfig;
pub use legal_text::{assemble_legal_body, Agreement, LegalContext};
pub use repository::ContractRepository;
pub use router::contract_router;
pub use service::{ContractError, ContractService, ScannedContract};
