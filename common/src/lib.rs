//! Wire types shared by the Tax Desk backend and its clients.
//!
//! Everything here is plain data: serde models for submissions, templates and users,
//! plus the request payloads accepted by the JSON endpoints.

pub mod model;
pub mod requests;
