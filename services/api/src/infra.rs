use chrono::{Local, NaiveDate, NaiveDateTime};
use metrics_exporter_prometheus::PrometheusHandle;
use regulariza::error::RepositoryError;
use regulariza::users::{Role, User, UserDirectory};
use std::collections::BTreeSet;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

pub(crate) const BOOTSTRAP_ADMIN: &str = "admin";

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Registers a superuser so a fresh in-memory deployment can create the
/// remaining accounts. Existing accounts are left untouched.
pub(crate) fn bootstrap_admin<D>(directory: &D, username: &str) -> Result<User, RepositoryError>
where
    D: UserDirectory + ?Sized,
{
    if let Some(existing) = directory.find(username)? {
        return Ok(existing);
    }
    let admin = directory.insert(User {
        username: username.to_string(),
        full_name: "Administrador".to_string(),
        email: None,
        cedula: None,
        telefono: None,
        role: Role::Admin,
        is_superuser: true,
        permissions: BTreeSet::new(),
    })?;
    info!(username = %admin.username, "bootstrap administrator registered");
    Ok(admin)
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// The given day at the current wall-clock time, or now.
pub(crate) fn import_timestamp(date: Option<NaiveDate>) -> NaiveDateTime {
    let now = Local::now().naive_local();
    match date {
        Some(date) => date.and_time(now.time()),
        None => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regulariza::memory::InMemoryStore;

    #[test]
    fn bootstrap_admin_is_idempotent() {
        let store = InMemoryStore::new();
        let first = bootstrap_admin(&store, "admin").expect("bootstrap");
        assert!(first.is_admin());
        bootstrap_admin(&store, "admin").expect("second bootstrap");
        assert_eq!(UserDirectory::list(&store).expect("list").len(), 1);
    }

    #[test]
    fn parse_date_rejects_other_formats() {
        assert_eq!(
            parse_date(" 2025-01-31 "),
            Ok(NaiveDate::from_ymd_opt(2025, 1, 31).expect("valid date"))
        );
        assert!(parse_date("31/01/2025").is_err());
    }

    #[test]
    fn import_timestamp_keeps_the_requested_day() {
        let day = NaiveDate::from_ymd_opt(2024, 12, 1).expect("valid date");
        assert_eq!(import_timestamp(Some(day)).date(), day);
    }
}
