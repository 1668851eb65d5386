//! # Page controllers
//!
//! The behaviour behind the three pages, decoupled from any rendering:
//!
//! - Login: CPF/phone masks while typing, checksum and DDD validation, login-or-register
//! - Name overlay: shown on the first visit until the user completes their name
//! - Creches panel: progress bar, admin edit overlay for the two counters
//!
//! Everything talks to the backend through [`api::ApiClient`], which keeps cookies the way a
//! browser would and echoes the CSRF cookie in `X-CSRF-Token`. [`store`] keeps that jar on disk between runs of
//! `creches-cli`.

pub mod api;
pub mod creches;
pub mod error;
pub mod fingerprint;
pub mod login;
pub mod overlay;
pub mod store;

pub use api::ApiClient;
pub use error::ClientError;
