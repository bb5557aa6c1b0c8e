//! # Auth Module
//!
//! This module handles all authentication-related functionality including:
//! - Google / Facebook / Apple social login
//! - Find-or-create mapping of verified identities to local users
//! - Session token generation and validation
//! - AuthedUser extractor for protected routes

pub mod extractors;
pub mod handlers;
pub mod models;
pub mod providers;
pub mod routes;
pub mod token;
pub mod users;

#[cfg(test)]
mod tests;

pub use extractors::AuthedUser;
pub use models::User;
pub use routes::auth_routes;
