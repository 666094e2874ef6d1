// handlers/public/mod.rs - endpoints reachable without a token
pub mod health;
pub mod leads;
pub mod webhooks;

pub use health::{health, root};
pub use leads::lead_capture;
pub use webhooks::whatsapp_webhook;
