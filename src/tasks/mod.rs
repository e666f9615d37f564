pub mod core;
pub mod payloads;
