//! Synchronization primitives using parking_lot.
//!
//! Used for state that is only ever touched synchronously (in-memory documents,
//! test clocks). Anything held across an `.await` uses [`tokio::sync`](crate::tokio::sync).

/// Guards the manually advanced clock.
pub type Mutex<T> = parking_lot::Mutex<T>;

/// Guards the in-memory documents.
pub type RwLock<T> = parking_lot::RwLock<T>;
