// handlers/mod.rs - handler tiers
//
// Public (no auth) → Protected (JWT) → Internal (JWT, platform admin)
pub mod internal;
pub mod protected;
pub mod public;
