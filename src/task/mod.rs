pub mod normalize;
pub mod time;
pub mod types;

pub use normalize::{dedupe_by_id, dedupe_raw, normalize, normalize_task, NormalizedTasks};
pub use types::*;
