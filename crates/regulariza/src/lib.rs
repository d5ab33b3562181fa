//! Back office for the land-regularization institute: beneficiary registry,
//! adjudication contracts and payment receipts.

pub mod beneficiaries;
pub mod config;
pub mod contracts;
pub mod documents;
pub mod error;
pub mod memory;
pub mod receipts;
pub mod storage;
pub mod telemetry;
pub mod users;

pub(crate) mod http;
