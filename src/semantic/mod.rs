mod inference;
pub mod rules;

pub use inference::SemanticInference;
pub use rules::TypeCategory;
