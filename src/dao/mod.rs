/// Hunt document storage backends.
pub mod hunt_store;
/// Database model definitions.
pub mod models;
/// Storage abstraction layer for database operations.
pub mod storage;
/// Optimistic read-modify-write over a single team document.
pub mod transaction;
