//! Users, roles and the named permissions gating each back-office module.

pub mod access;
pub mod domain;
pub mod router;

pub use access::{Access, AccessError, Actor, DirectoryHandle, ACTOR_HEADER};
pub use domain::{NewUser, Permission, Role, User, UserDirectory};
pub use router::user_router;
