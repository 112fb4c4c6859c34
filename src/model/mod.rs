//! Types exchanged with browsers and with the backend.
//!
//! None of these are authoritative: they are projections of backend-owned
//! data, parsed at the boundary so that roles and IDs are checked once.

pub mod id;
pub mod role;
pub mod token;
pub mod user;
