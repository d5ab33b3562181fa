use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::RepositoryError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::Admin => "Administrador",
            Role::User => "Usuario (Lectura)",
        }
    }
}

/// Named permissions, one per back-office module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    VerGestorRecibos,
    VerGestorClientes,
    VerGestorPagos,
    VerGestorContratos,
    VerGestorSellos,
    VerGestorDocumental,
}

impl Permission {
    pub const ALL: [Permission; 6] = [
        Permission::VerGestorRecibos,
        Permission::VerGestorClientes,
        Permission::VerGestorPagos,
        Permission::VerGestorContratos,
        Permission::VerGestorSellos,
        Permission::VerGestorDocumental,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Permission::VerGestorRecibos => "ver_gestor_recibos",
            Permission::VerGestorClientes => "ver_gestor_clientes",
            Permission::VerGestorPagos => "ver_gestor_pagos",
            Permission::VerGestorContratos => "ver_gestor_contratos",
            Permission::VerGestorSellos => "ver_gestor_sellos",
            Permission::VerGestorDocumental => "ver_gestor_documental",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Permission::VerGestorRecibos => "Puede acceder al Gestor de Recibos",
            Permission::VerGestorClientes => "Puede acceder al Gestor de Clientes",
            Permission::VerGestorPagos => "Puede acceder al Sistema de Pagos",
            Permission::VerGestorContratos => "Puede usar el Gestor de Contratos",
            Permission::VerGestorSellos => "Puede usar el Gestor de Sellos",
            Permission::VerGestorDocumental => "Puede usar la Gestión Documental",
        }
    }
}

/// Back-office account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub cedula: Option<String>,
    #[serde(default)]
    pub telefono: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub permissions: BTreeSet<Permission>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.is_superuser || self.role == Role::Admin
    }

    pub fn has_perm(&self, permission: Permission) -> bool {
        self.is_admin() || self.permissions.contains(&permission)
    }

    /// Effective permission set, expanded for administrators.
    pub fn effective_permissions(&self) -> Vec<Permission> {
        Permission::ALL
            .into_iter()
            .filter(|permission| self.has_perm(*permission))
            .collect()
    }
}

/// Payload accepted when an administrator registers a new account.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub cedula: Option<String>,
    #[serde(default)]
    pub telefono: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub permissions: BTreeSet<Permission>,
}

impl NewUser {
    pub fn into_user(self) -> User {
        User {
            username: self.username.trim().to_string(),
            full_name: self.full_name.trim().to_string(),
            email: self.email,
            cedula: self.cedula.map(|value| value.trim().to_uppercase()),
            telefono: self.telefono,
            role: self.role,
            is_superuser: false,
            permissions: self.permissions,
        }
    }
}

/// Account lookup used to resolve the acting user of each request.
pub trait UserDirectory: Send + Sync {
    fn find(&self, username: &str) -> Result<Option<User>, RepositoryError>;
    fn list(&self) -> Result<Vec<User>, RepositoryError>;
    fn insert(&self, user: User) -> Result<User, RepositoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(permissions: &[Permission]) -> User {
        User {
            username: "lectura".to_string(),
            full_name: String::new(),
            email: None,
            cedula: None,
            telefono: None,
            role: Role::User,
            is_superuser: false,
            permissions: permissions.iter().copied().collect(),
        }
    }

    #[test]
    fn admin_role_grants_every_permission() {
        let mut user = reader(&[]);
        user.role = Role::Admin;
        assert_eq!(user.effective_permissions().len(), Permission::ALL.len());
    }

    #[test]
    fn reader_only_holds_assigned_permissions() {
        let user = reader(&[Permission::VerGestorRecibos]);
        assert!(user.has_perm(Permission::VerGestorRecibos));
        assert!(!user.has_perm(Permission::VerGestorContratos));
        assert!(!user.is_admin());
    }

    #[test]
    fn superuser_counts_as_admin() {
        let mut user = reader(&[]);
        user.is_superuser = true;
        assert!(user.is_admin());
        assert!(user.has_perm(Permission::VerGestorSellos));
    }
}
