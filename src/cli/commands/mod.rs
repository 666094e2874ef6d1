pub mod keys;
pub mod sanitize;
pub mod token;
