// handlers/protected/mod.rs - endpoints behind JWT authentication (/api/*)
pub mod auth;
pub mod companies;
pub mod leads;
pub mod meta;
pub mod whatsapp;
