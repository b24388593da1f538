use hashbrown::HashMap;

use crate::bpe::BpeTokenizer;
use crate::errors::Result;
use crate::model::{tag_id, Model, FLOOR_PROB, START_TAG, UNKNOWN_TAG};
use crate::unknown::UnknownWordScorer;

/// Decoding lattice of one sentence.
///
/// `scores[i * n_tags + t]` is the best log-probability of a path ending with tag `t` at position
/// `i`, and `backptrs` at the same index is the previous tag of that path.
struct Lattice {
    n_tags: usize,
    scores: Vec<f64>,
    backptrs: Vec<usize>,
}

impl Lattice {
    fn new(n_words: usize, n_tags: usize) -> Self {
        Self {
            n_tags,
            scores: vec![f64::NEG_INFINITY; n_words * n_tags],
            backptrs: vec![0; n_words * n_tags],
        }
    }

    fn column(&self, i: usize) -> &[f64] {
        &self.scores[i * self.n_tags..(i + 1) * self.n_tags]
    }

    fn backtrace(&self, last_tag: usize, n_words: usize) -> Vec<usize> {
        let mut path = vec![0; n_words];
        let mut tag = last_tag;
        for i in (1..n_words).rev() {
            path[i] = tag;
            tag = self.backptrs[i * self.n_tags + tag];
        }
        if let Some(first) = path.first_mut() {
            *first = tag;
        }
        path
    }
}

// First maximum in index order.
fn argmax<I>(scores: I) -> Option<(usize, f64)>
where
    I: IntoIterator<Item = f64>,
{
    let mut best: Option<(usize, f64)> = None;
    for (i, score) in scores.into_iter().enumerate() {
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((i, score));
        }
    }
    best
}

/// Predictor.
///
/// Finds the most probable tag sequence of a sentence by the Viterbi algorithm in log space.
/// A predictor is immutable; one instance can serve concurrent predictions from multiple threads.
///
/// # Examples
///
/// ```
/// use hmmpos::{Model, Predictor};
///
/// let sentences = vec![vec!["මම", "ගියෙමි", "."], vec!["ගස", "වැටුණා", "."]];
/// let tags = vec![vec!["PRP", "VFM", "FS"], vec!["NNC", "VP", "FS"]];
/// let predictor = Predictor::new(Model::train(&sentences, &tags).unwrap()).unwrap();
///
/// assert_eq!(vec!["PRP", "VFM", "FS"], predictor.predict(&["මම", "ගියෙමි", "."]));
/// assert!(predictor.predict::<&str>(&[]).is_empty());
/// ```
#[derive(Debug)]
pub struct Predictor {
    tags: Vec<String>,

    // ln(P(tag | START) + FLOOR_PROB)
    start_scores: Vec<f64>,

    // ln(P(cur | prev) + FLOOR_PROB) at `prev * n_tags + cur`
    transition_scores: Vec<f64>,

    // (tag ID, probability), sorted by tag ID.
    emissions: HashMap<String, Vec<(usize, f64)>>,

    unknown_scorer: UnknownWordScorer,
}

impl Predictor {
    /// Creates a new predictor.
    ///
    /// # Arguments
    ///
    /// * `model` - A model data.
    ///
    /// # Returns
    ///
    /// A new predictor.
    ///
    /// # Errors
    ///
    /// If the subword merges of the model are invalid, an error variant will be returned.
    pub fn new(model: Model) -> Result<Self> {
        let tokenizer = BpeTokenizer::new(&model.tokenizer)?;
        let start_scores = model
            .start_probs
            .iter()
            .map(|&p| (p + FLOOR_PROB).ln())
            .collect();
        let transition_scores = model
            .transition_probs
            .iter()
            .map(|&p| (p + FLOOR_PROB).ln())
            .collect();
        let emissions = model
            .emissions
            .into_iter()
            .map(|record| {
                let probs = record
                    .probs
                    .into_iter()
                    .map(|(tag_id, prob)| (tag_id as usize, prob))
                    .collect();
                (record.word, probs)
            })
            .collect();
        Ok(Self {
            tags: model.tags,
            start_scores,
            transition_scores,
            emissions,
            unknown_scorer: UnknownWordScorer::new(tokenizer),
        })
    }

    /// Gets the tag inventory in lexicographic order.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    fn unknown_score(&self, word: &str) -> f64 {
        self.unknown_scorer
            .score(word, |subword| self.contains_word(subword))
    }

    /// Returns `true` if the word was observed in training.
    pub fn contains_word(&self, word: &str) -> bool {
        self.emissions.contains_key(word)
    }

    /// Gets P(`word` | `tag`) if observed in training, or the unknown-word score otherwise.
    ///
    /// Tags unknown to the model get the unknown-word score.
    pub fn emission_or_unknown(&self, word: &str, tag: &str) -> f64 {
        self.emissions
            .get(word)
            .zip(tag_id(&self.tags, tag))
            .and_then(|(probs, tag_id)| {
                probs
                    .iter()
                    .find(|&&(t, _)| t == tag_id)
                    .map(|&(_, prob)| prob)
            })
            .unwrap_or_else(|| self.unknown_score(word))
    }

    // Fills ln(emission_or_unknown(word, tag)) for every tag.
    fn emission_scores(&self, word: &str, scores: &mut [f64]) {
        match self.emissions.get(word) {
            Some(probs) => {
                if probs.len() < scores.len() {
                    scores.fill(self.unknown_score(word).ln());
                }
                for &(tag_id, prob) in probs {
                    scores[tag_id] = prob.ln();
                }
            }
            None => scores.fill(self.unknown_score(word).ln()),
        }
    }

    fn viterbi<S>(&self, words: &[S]) -> (Vec<usize>, f64)
    where
        S: AsRef<str>,
    {
        let n_tags = self.tags.len();
        let mut lattice = Lattice::new(words.len(), n_tags);
        let mut emission = vec![0.0; n_tags];

        self.emission_scores(words[0].as_ref(), &mut emission);
        for (cur, score) in lattice.scores[..n_tags].iter_mut().enumerate() {
            *score = self.start_scores[cur] + emission[cur];
        }

        for (i, word) in words.iter().enumerate().skip(1) {
            self.emission_scores(word.as_ref(), &mut emission);
            for cur in 0..n_tags {
                let candidates = lattice.column(i - 1).iter().enumerate().map(|(prev, &s)| {
                    s + self.transition_scores[prev * n_tags + cur] + emission[cur]
                });
                // n_tags > 0 here.
                let (prev, score) = argmax(candidates).unwrap_or((0, f64::NEG_INFINITY));
                lattice.scores[i * n_tags + cur] = score;
                lattice.backptrs[i * n_tags + cur] = prev;
            }
        }

        let (last_tag, score) = argmax(lattice.column(words.len() - 1).iter().copied())
            .unwrap_or((0, f64::NEG_INFINITY));
        (lattice.backtrace(last_tag, words.len()), score)
    }

    /// Predicts tags.
    ///
    /// # Arguments
    ///
    /// * `words` - A tokenized sentence.
    ///
    /// # Returns
    ///
    /// Tags aligned with `words`. An empty sentence gives an empty result. If the model has no tag,
    /// every word gets [`UNKNOWN_TAG`].
    pub fn predict<S>(&self, words: &[S]) -> Vec<&str>
    where
        S: AsRef<str>,
    {
        self.predict_with_score(words).0
    }

    /// Predicts tags. This function also returns the log-probability of the best path.
    ///
    /// The score is only meaningful relative to other paths of the same sentence. It is `0` for an
    /// empty sentence and negative infinity for a model without tags.
    pub fn predict_with_score<S>(&self, words: &[S]) -> (Vec<&str>, f64)
    where
        S: AsRef<str>,
    {
        if words.is_empty() {
            return (vec![], 0.0);
        }
        if self.tags.is_empty() {
            return (vec![UNKNOWN_TAG; words.len()], f64::NEG_INFINITY);
        }
        let (path, score) = self.viterbi(words);
        let tags = path
            .into_iter()
            .map(|tag_id| self.tags[tag_id].as_str())
            .collect();
        (tags, score)
    }

    /// Gets ln(P(`cur` | `prev`) + [`FLOOR_PROB`]) as used in decoding.
    ///
    /// `prev` may be [`START_TAG`]. Tags unknown to the model resolve to the floor.
    pub fn transition_score(&self, prev: &str, cur: &str) -> f64 {
        let floor = (FLOOR_PROB + FLOOR_PROB).ln();
        let Some(cur) = tag_id(&self.tags, cur) else {
            return floor;
        };
        if prev == START_TAG {
            return self.start_scores[cur];
        }
        tag_id(&self.tags, prev).map_or(floor, |prev| {
            self.transition_scores[prev * self.tags.len() + cur]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use crate::corpus::Corpus;
    use crate::trainer::{StartTransitions, Trainer};
    use crate::unknown::SUBWORD_BONUS;

    const CORPUS: &str = "\
මම PRP
රෑ NNC
කෑම NNC
කෑවෙමි VFM
. FS
අපි PRP
රෑ NNC
කෑම NNC
කෑවෙමු VFM
. FS
ඔහු PRP
රෑ VP
ආවේය VFM
. FS
ගස NNC
වැටුණා VP
. FS
";

    fn predictor() -> Predictor {
        let corpus = Corpus::from_reader(CORPUS.as_bytes()).unwrap();
        let model = Model::train(corpus.sentences(), corpus.tags()).unwrap();
        Predictor::new(model).unwrap()
    }

    #[test]
    fn test_predict_training_sentence() {
        let predictor = predictor();
        assert_eq!(
            vec!["PRP", "NNC", "NNC", "VFM", "FS"],
            predictor.predict(&["මම", "රෑ", "කෑම", "කෑවෙමි", "."])
        );
    }

    #[test]
    fn test_predict_length() {
        let predictor = predictor();
        for n in 0..6 {
            let words = vec!["රෑ"; n];
            assert_eq!(n, predictor.predict(&words).len());
        }
    }

    #[test]
    fn test_predict_empty() {
        let predictor = predictor();
        let (tags, score) = predictor.predict_with_score::<String>(&[]);
        assert!(tags.is_empty());
        assert_eq!(0.0, score);
    }

    #[test]
    fn test_predict_majority_tag() {
        let predictor = predictor();
        // "රෑ" is NNC twice and VP once.
        assert_eq!(vec!["NNC"], predictor.predict(&["රෑ"]));
    }

    #[test]
    fn test_predict_unknown_word() {
        let predictor = predictor();
        let tags = predictor.predict(&["පොත"]);
        assert_eq!(1, tags.len());
        assert!(predictor.tags().iter().any(|t| t == tags[0]));

        let tags = predictor.predict(&["මම", "පොත", "කියවමි", "."]);
        assert_eq!(4, tags.len());
        for tag in tags {
            assert!(predictor.tags().iter().any(|t| t == tag));
        }
    }

    #[test]
    fn test_predict_is_deterministic() {
        let words = ["අපි", "පොත", "රෑ", "xyz", "."];
        let first = predictor().predict(&words).join(" ");
        for _ in 0..5 {
            let predictor = predictor();
            assert_eq!(first, predictor.predict(&words).join(" "));
            assert_eq!(first, predictor.predict(&words).join(" "));
        }
    }

    #[test]
    fn test_tie_breaks_to_first_tag() {
        // Two tags with identical statistics.
        let model = Model::train(&[vec!["x"], vec!["x"]], &[vec!["BBB"], vec!["AAA"]]).unwrap();
        let predictor = Predictor::new(model).unwrap();
        assert_eq!(vec!["AAA"], predictor.predict(&["x"]));
        assert_eq!(vec!["AAA", "AAA"], predictor.predict(&["x", "x"]));
    }

    #[test]
    fn test_observed_emission_beats_unknown() {
        let model = Model::train(
            &[vec!["a", "b"], vec!["c", "d"]],
            &[vec!["X", "Y"], vec!["X", "Z"]],
        )
        .unwrap();
        let predictor = Predictor::new(model).unwrap();
        assert_eq!(0.5, predictor.emission_or_unknown("a", "X"));
        assert!(predictor.emission_or_unknown("a", "Y") < 1e-2);
        assert_eq!(vec!["X", "Z"], predictor.predict(&["c", "d"]));
    }

    #[test]
    fn test_observed_emission_beats_unknown_in_large_corpus() {
        // "ගස" is 2 of 4000 NNC tokens, so P(ගස | NNC) = 5e-4.
        let mut trainer = Trainer::default().start_transitions(StartTransitions::Floor);
        for _ in 0..2 {
            trainer.push_sentence(&["ගස"], &["NNC"]).unwrap();
        }
        for _ in 0..3998 {
            trainer.push_sentence(&["පොත"], &["NNC"]).unwrap();
        }
        for _ in 0..10 {
            trainer.push_sentence(&["ගියා"], &["VP"]).unwrap();
        }
        let predictor = Predictor::new(trainer.train().unwrap()).unwrap();

        assert!((predictor.emission_or_unknown("ගස", "NNC") - 5e-4).abs() < 1e-12);
        assert_eq!(FLOOR_PROB, predictor.emission_or_unknown("ගස", "VP"));
        assert_eq!(FLOOR_PROB, predictor.emission_or_unknown("පොත", "VP"));
        assert_eq!(vec!["NNC"], predictor.predict(&["ගස"]));
        assert_eq!(vec!["VP", "NNC"], predictor.predict(&["ගියා", "ගස"]));
    }

    #[test]
    fn test_contains_word() {
        let predictor = predictor();
        assert!(predictor.contains_word("රෑ"));
        assert!(predictor.contains_word("."));
        assert!(!predictor.contains_word("පොත"));
    }

    #[test]
    fn test_emission_or_unknown() {
        let predictor = predictor();
        // NNC occurs 5 times.
        assert!((predictor.emission_or_unknown("ගස", "NNC") - 0.2).abs() < 1e-12);
        // Known word under another tag, unknown word, and unknown tag fall back to the scorer.
        assert!(predictor.emission_or_unknown("ගස", "VFM") >= FLOOR_PROB);
        assert!(predictor.emission_or_unknown("ගස", "NOPE") >= FLOOR_PROB);
        let unknown = predictor.emission_or_unknown("zz", "VFM");
        assert!(unknown >= FLOOR_PROB && unknown < FLOOR_PROB + SUBWORD_BONUS);
    }

    #[test]
    fn test_transition_score() {
        let predictor = predictor();
        let floor = (2.0 * FLOOR_PROB).ln();
        assert_eq!(floor, predictor.transition_score("FS", "VP"));
        assert_eq!(floor, predictor.transition_score("NOPE", "VP"));
        assert_eq!(floor, predictor.transition_score(START_TAG, "NOPE"));
        assert!(predictor.transition_score(START_TAG, "PRP") > floor);
    }

    #[test]
    fn test_floor_start_transitions() {
        let corpus = Corpus::from_reader(CORPUS.as_bytes()).unwrap();
        let mut trainer = Trainer::default().start_transitions(StartTransitions::Floor);
        for (words, tags) in corpus.iter() {
            trainer.push_sentence(words, tags).unwrap();
        }
        let predictor = Predictor::new(trainer.train().unwrap()).unwrap();
        let floor = (2.0 * FLOOR_PROB).ln();
        for tag in predictor.tags() {
            assert_eq!(floor, predictor.transition_score(START_TAG, tag));
        }
        assert_eq!(5, predictor.predict(&["මම", "රෑ", "කෑම", "කෑවෙමි", "."]).len());
    }

    #[test]
    fn test_model_without_tags() {
        let predictor = Predictor::new(Trainer::default().train().unwrap()).unwrap();
        assert_eq!(vec![UNKNOWN_TAG, UNKNOWN_TAG], predictor.predict(&["a", "b"]));
        assert!(predictor.predict::<&str>(&[]).is_empty());
    }

    #[test]
    fn test_score() {
        let predictor = predictor();
        let (_, score) = predictor.predict_with_score(&["ගස", "වැටුණා", "."]);
        assert!(score < 0.0 && score.is_finite());
    }

    #[test]
    fn test_predict_after_write_read() {
        let corpus = Corpus::from_reader(CORPUS.as_bytes()).unwrap();
        let model = Model::train(corpus.sentences(), corpus.tags()).unwrap();
        let mut buf = vec![];
        model.write(&mut buf).unwrap();
        let loaded = Predictor::new(Model::read(&mut buf.as_slice()).unwrap()).unwrap();
        let in_memory = Predictor::new(model).unwrap();
        let words = ["අපි", "රෑ", "පොත", "කෑවෙමු", "."];
        assert_eq!(in_memory.predict(&words), loaded.predict(&words));
    }

    #[test]
    fn test_concurrent_predict() {
        let predictor = Arc::new(predictor());
        let expected = predictor.predict(&["අපි", "රෑ", "කෑම", "කෑවෙමු", "."]).join(" ");
        std::thread::scope(|s| {
            for _ in 0..4 {
                let predictor = Arc::clone(&predictor);
                let expected = &expected;
                s.spawn(move || {
                    let tags = predictor.predict(&["අපි", "රෑ", "කෑම", "කෑවෙමු", "."]);
                    assert_eq!(*expected, tags.join(" "));
                });
            }
        });
    }
}
