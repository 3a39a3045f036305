pub mod types;
pub mod errors;
pub mod canonical;

pub use types::*;
pub use errors::*;

// Re-export commonly used types
pub use uuid::Uuid;
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
