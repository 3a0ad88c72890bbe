mod category;
mod normalize;

pub use category::{CategoryRule, CategoryTable};
pub use normalize::{NormalizeError, Normalizer};
