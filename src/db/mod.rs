//! Database module: subscription model and SQL repository.
//!
//! This module is split into two submodules:
//! - `model`: typed rows returned by repository queries.
//! - `repo`: SQL-only functions that map rows into entities.
//!
//! External modules should import from `tg_airwatch::db` — we re-export the
//! repository API and the row types for convenience.

pub mod model;
pub mod repo;

pub use model::Subscription;
pub use repo::*;
