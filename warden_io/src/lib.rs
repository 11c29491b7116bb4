pub mod standard;

pub use standard::locks::*;

pub use tokio;
