//! Rule-based grammar checks for hmmpos.
//!
//! Rules only see words and their tags, so any tagger implementing [`Tagger`] can drive them.

mod agreement;

pub use agreement::{AgreementRule, GrammarChecker};

use hmmpos::Predictor;

/// Trait of part-of-speech taggers.
pub trait Tagger {
    /// Tags a tokenized sentence.
    ///
    /// # Arguments
    ///
    /// * `words` - A tokenized sentence.
    ///
    /// # Returns
    ///
    /// Tags aligned with `words`.
    fn tag<'a>(&'a self, words: &[&str]) -> Vec<&'a str>;
}

impl Tagger for Predictor {
    fn tag<'a>(&'a self, words: &[&str]) -> Vec<&'a str> {
        self.predict(words)
    }
}
