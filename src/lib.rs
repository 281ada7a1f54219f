//! # Ensaluto
//!
//! User registration and login service. Signup derives a salted PBKDF2
//! credential record from the password and stores it; login recomputes the
//! derived key and compares it in constant time. See the [`credential`]
//! module for the record format and its invariants.

pub mod cli;
pub mod credential;
pub mod ensaluto;
