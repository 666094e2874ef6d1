// handlers/internal/mod.rs - service-to-service endpoints
pub mod queue;

pub use queue::queue_consume;
