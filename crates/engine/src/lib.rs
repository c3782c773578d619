pub mod alert;
pub mod evaluator;
pub mod lease;
pub mod memory;
pub mod scheduler;
pub mod store;
pub mod tracking;
