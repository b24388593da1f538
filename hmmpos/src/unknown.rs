use crate::bpe::BpeTokenizer;
use crate::model::FLOOR_PROB;

/// Score added for each subword of an unknown word that is itself a training word.
pub const SUBWORD_BONUS: f64 = 1e-3;

/// Scorer of words without an emission probability.
///
/// The score starts from [`FLOOR_PROB`] and grows by [`SUBWORD_BONUS`] for every subword that is a
/// known word. Subwords are compared in the byte-level alphabet of
/// [`BpeTokenizer::encode_text()`], and a subword spelling the whole word never counts, so a known
/// word under a tag it was never seen with stays at the floor. The score is not normalized and may
/// exceed 1. It only ranks candidates inside one decoding and is not comparable across sentences.
#[derive(Debug)]
pub struct UnknownWordScorer {
    tokenizer: BpeTokenizer,
}

impl UnknownWordScorer {
    pub const fn new(tokenizer: BpeTokenizer) -> Self {
        Self { tokenizer }
    }

    pub const fn tokenizer(&self) -> &BpeTokenizer {
        &self.tokenizer
    }

    /// Scores a word.
    ///
    /// # Arguments
    ///
    /// * `word` - A word.
    /// * `is_known` - Returns `true` if the given string is a training word.
    pub fn score<F>(&self, word: &str, is_known: F) -> f64
    where
        F: Fn(&str) -> bool,
    {
        self.tokenizer
            .encode_text(word)
            .into_iter()
            .filter(|&subword| subword != word && is_known(subword))
            .fold(FLOOR_PROB, |score, _| score + SUBWORD_BONUS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use hashbrown::HashSet;

    use crate::bpe::{BpeModel, BpeTrainer};

    #[test]
    fn test_score_without_known_subwords() {
        let scorer = UnknownWordScorer::new(BpeTokenizer::new(&BpeModel::default()).unwrap());
        assert_eq!(FLOOR_PROB, scorer.score("ගස", |s| s == "ගස"));
        assert_eq!(FLOOR_PROB, scorer.score("xyz", |_| false));
        // A single-byte word is its own only subword.
        assert_eq!(FLOOR_PROB, scorer.score("x", |_| true));
    }

    #[test]
    fn test_score_counts_known_subwords() {
        let scorer = UnknownWordScorer::new(BpeTokenizer::new(&BpeModel::default()).unwrap());
        // Every byte of an ASCII word is a subword.
        let vocab: HashSet<&str> = ["a", "b"].into_iter().collect();
        let score = scorer.score("abca", |s| vocab.contains(s));
        assert!((score - (FLOOR_PROB + 3.0 * SUBWORD_BONUS)).abs() < 1e-12);
    }

    fn scorer(text: &str) -> UnknownWordScorer {
        let mut trainer = BpeTrainer::new(1000, 2);
        trainer.push_text(text);
        UnknownWordScorer::new(BpeTokenizer::new(&trainer.train()).unwrap())
    }

    #[test]
    fn test_score_with_learned_subwords() {
        let scorer = scorer("ab ab ab");
        let vocab: HashSet<&str> = ["ab"].into_iter().collect();
        let score = scorer.score("abab", |s| vocab.contains(s));
        assert!((score - (FLOOR_PROB + 2.0 * SUBWORD_BONUS)).abs() < 1e-12);
    }

    #[test]
    fn test_score_ignores_whole_word() {
        let scorer = scorer("ab ab ab");
        let vocab: HashSet<&str> = ["ab"].into_iter().collect();
        assert_eq!(FLOOR_PROB, scorer.score("ab", |s| vocab.contains(s)));
    }

    #[test]
    fn test_score_non_ascii_subwords_never_match() {
        let scorer = scorer("රෑ රෑ රෑ ගස ගස");
        let vocab: HashSet<&str> = ["රෑ", "ගස"].into_iter().collect();
        assert_eq!(FLOOR_PROB, scorer.score("රෑ", |s| vocab.contains(s)));
        assert_eq!(FLOOR_PROB, scorer.score("රෑගස", |s| vocab.contains(s)));
    }
}
