//! taskvault: minimal task-management API with HTTP Basic Authentication.
//!
//! The interesting part is the authentication path: decode a `Basic` header,
//! look up the stored credential record, verify the salted hash in constant
//! time. Everything around it (registration endpoint, protected page,
//! console client) is thin glue over that check.

pub mod auth;
pub mod client;
pub mod config;
pub mod gateway;
