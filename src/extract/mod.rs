//! Keyphrase extraction and the automatic annotation source

pub mod auto;
pub mod keyphrase;
mod stopwords;

pub use auto::{AutoAnnotator, AutoOrigin};
pub use keyphrase::{extract, tokenize, ExtractOptions, Keyphrase, Token};
pub use stopwords::is_stopword;
