mod extract;
pub mod history;
mod session;

pub use extract::extract_sql;
pub use session::{Assistant, Explanation, Outcome, Phase, Session};
