mod render;
mod snapshot;

pub use render::{describe_schema, render_model_brief};
pub use snapshot::{build_snapshot, SchemaSnapshot};
