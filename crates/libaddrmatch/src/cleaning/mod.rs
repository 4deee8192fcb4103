pub mod frequency;
pub mod normalize;
pub mod tokenize;

pub use frequency::{CommonEndTokens, FrequencyRow, FrequencySnapshot, FrequencyTable};
pub use normalize::{NormalizedAddress, normalize_address, normalize_postcode};
pub use tokenize::{Segment, Tokenizer};
