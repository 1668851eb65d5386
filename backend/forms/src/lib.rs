//! # Forms
//!
//! Pure logic shared by the server and the client.
//!
//! ## Identification
//! - CPF: 11 digits, last two are modulo-11 check digits
//! - Phone: 11 digits, DDD (area code) from a fixed list, then a `9`
//! - Both are masked while typing and stripped back to digits before being sent
//!
//! ## Progress
//! - Two counters, delivered (`entregues`) and promised (`prometidas`)
//! - Percentage is clamped to 100, 0 when nothing was promised
//! - Delivered can never exceed promised, checked on both ends
//!
//! ## Payloads
//! JSON bodies exchanged between `/api/*` and the page controllers.

pub mod cpf;
pub mod mask;
pub mod name;
pub mod payloads;
pub mod phone;
pub mod progress;

pub use mask::{mask_cpf, mask_phone, only_digits};
pub use progress::{Campo, Progress};
