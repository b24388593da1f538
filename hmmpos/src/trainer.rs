use std::str::FromStr;

use hashbrown::HashMap;

use crate::bpe::{BpeTrainer, DEFAULT_MIN_FREQUENCY, DEFAULT_VOCAB_SIZE};
use crate::errors::{HmmposError, Result};
use crate::model::{EmissionRecord, Model, FLOOR_PROB};
use crate::utils::Indexer;

/// How transitions from the sentence start are estimated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StartTransitions {
    /// P(tag | START) is the ratio of sentences starting with the tag. Tags never starting a
    /// sentence get [`FLOOR_PROB`].
    #[default]
    Observed,

    /// Every P(tag | START) is [`FLOOR_PROB`], so the first word is decided by its emission only.
    Floor,
}

impl FromStr for StartTransitions {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "observed" => Ok(Self::Observed),
            "floor" => Ok(Self::Floor),
            _ => Err("Unsupported start transition policy."),
        }
    }
}

/// Trainer.
///
/// Counts tag unigrams, tag bigrams, and word/tag pairs, and estimates maximum-likelihood
/// probabilities from them. The subword tokenizer used for unknown words is trained on the same
/// sentences.
///
/// # Examples
///
/// ```
/// use hmmpos::{Corpus, StartTransitions, Trainer};
///
/// let corpus = Corpus::from_reader("මම PRP\nගියෙමි VFM\n. FS\n".as_bytes()).unwrap();
///
/// let mut trainer = Trainer::new(30000, 2)
///     .unwrap()
///     .start_transitions(StartTransitions::Observed);
/// for (words, tags) in corpus.iter() {
///     trainer.push_sentence(words, tags).unwrap();
/// }
/// let model = trainer.train().unwrap();
/// assert_eq!(3, model.vocab_size());
/// ```
pub struct Trainer {
    tag_ids: Indexer<String>,
    word_ids: Indexer<String>,
    tag_counts: Vec<usize>,
    start_counts: HashMap<usize, usize>,
    bigram_counts: HashMap<(usize, usize), usize>,
    joint_counts: HashMap<(usize, usize), usize>,
    n_sentences: usize,
    start_transitions: StartTransitions,
    tokenizer_trainer: BpeTrainer,
}

impl Default for Trainer {
    fn default() -> Self {
        Self::with_tokenizer_trainer(BpeTrainer::new(DEFAULT_VOCAB_SIZE, DEFAULT_MIN_FREQUENCY))
    }
}

impl Trainer {
    /// Creates a new trainer.
    ///
    /// # Arguments
    ///
    /// * `tokenizer_vocab_size` - The ceiling of the subword vocabulary, including 256 byte tokens.
    /// * `min_pair_frequency` - The minimum frequency of a subword pair to be merged.
    ///
    /// # Errors
    ///
    /// If `min_pair_frequency` is zero, an error variant will be returned.
    pub fn new(tokenizer_vocab_size: usize, min_pair_frequency: usize) -> Result<Self> {
        if min_pair_frequency == 0 {
            return Err(HmmposError::invalid_argument(
                "min_pair_frequency",
                "must be at least 1",
            ));
        }
        Ok(Self::with_tokenizer_trainer(BpeTrainer::new(
            tokenizer_vocab_size,
            min_pair_frequency,
        )))
    }

    fn with_tokenizer_trainer(tokenizer_trainer: BpeTrainer) -> Self {
        Self {
            tag_ids: Indexer::new(),
            word_ids: Indexer::new(),
            tag_counts: vec![],
            start_counts: HashMap::new(),
            bigram_counts: HashMap::new(),
            joint_counts: HashMap::new(),
            n_sentences: 0,
            start_transitions: StartTransitions::default(),
            tokenizer_trainer,
        }
    }

    /// Sets the estimation policy of transitions from the sentence start.
    pub fn start_transitions(mut self, policy: StartTransitions) -> Self {
        self.start_transitions = policy;
        self
    }

    /// Adds a tagged sentence.
    ///
    /// # Arguments
    ///
    /// * `words` - A word sequence.
    /// * `tags` - A tag sequence aligned with `words`.
    ///
    /// # Errors
    ///
    /// [`HmmposError::TrainingData`] will be returned if `words` and `tags` differ in length. The
    /// trainer is left unchanged in that case.
    pub fn push_sentence<W, T>(&mut self, words: &[W], tags: &[T]) -> Result<()>
    where
        W: AsRef<str>,
        T: AsRef<str>,
    {
        if words.len() != tags.len() {
            return Err(HmmposError::training_data(format!(
                "sentence #{} has {} words but {} tags",
                self.n_sentences,
                words.len(),
                tags.len(),
            )));
        }
        let mut prev_tag_id = None;
        for (word, tag) in words.iter().zip(tags) {
            let tag_id = self.tag_ids.get_id(tag.as_ref());
            if tag_id == self.tag_counts.len() {
                self.tag_counts.push(0);
            }
            let word_id = self.word_ids.get_id(word.as_ref());

            self.tag_counts[tag_id] += 1;
            *self.joint_counts.entry((word_id, tag_id)).or_insert(0) += 1;
            if let Some(prev_tag_id) = prev_tag_id {
                *self.bigram_counts.entry((prev_tag_id, tag_id)).or_insert(0) += 1;
            } else {
                *self.start_counts.entry(tag_id).or_insert(0) += 1;
            }
            prev_tag_id = Some(tag_id);
        }
        if !words.is_empty() {
            self.n_sentences += 1;
        }
        self.tokenizer_trainer.push_sentence(words);
        Ok(())
    }

    /// Gets the number of non-empty sentences added so far.
    pub fn n_sentences(&self) -> usize {
        self.n_sentences
    }

    /// Gets the number of distinct tags added so far.
    pub fn n_tags(&self) -> usize {
        self.tag_ids.len()
    }

    /// Estimates probabilities and trains the subword tokenizer.
    ///
    /// # Returns
    ///
    /// A trained model.
    ///
    /// # Errors
    ///
    /// If the number of tags exceeds the range of `u32`, an error variant will be returned.
    pub fn train(self) -> Result<Model> {
        let n_tags = self.tag_ids.len();

        // Tag IDs are reassigned in lexicographic order.
        let mut order: Vec<usize> = (0..n_tags).collect();
        order.sort_unstable_by(|&a, &b| self.tag_ids.keys()[a].cmp(&self.tag_ids.keys()[b]));
        let mut sorted_ids = vec![0; n_tags];
        for (new_id, &old_id) in order.iter().enumerate() {
            sorted_ids[old_id] = new_id;
        }
        let tags: Vec<String> = order
            .iter()
            .map(|&old_id| self.tag_ids.keys()[old_id].clone())
            .collect();

        let mut start_probs = vec![FLOOR_PROB; n_tags];
        if self.start_transitions == StartTransitions::Observed {
            for (&tag_id, &count) in &self.start_counts {
                start_probs[sorted_ids[tag_id]] = count as f64 / self.n_sentences as f64;
            }
        }

        let mut transition_probs = vec![FLOOR_PROB; n_tags * n_tags];
        for (&(prev, cur), &count) in &self.bigram_counts {
            transition_probs[sorted_ids[prev] * n_tags + sorted_ids[cur]] =
                count as f64 / self.tag_counts[prev] as f64;
        }

        let mut word_probs = vec![vec![]; self.word_ids.len()];
        for (&(word_id, tag_id), &count) in &self.joint_counts {
            word_probs[word_id].push((
                u32::try_from(sorted_ids[tag_id])?,
                count as f64 / self.tag_counts[tag_id] as f64,
            ));
        }
        let mut emissions: Vec<EmissionRecord> = self
            .word_ids
            .keys()
            .iter()
            .zip(word_probs)
            .map(|(word, mut probs)| {
                probs.sort_unstable_by_key(|&(tag_id, _)| tag_id);
                EmissionRecord {
                    word: word.clone(),
                    probs,
                }
            })
            .collect();
        emissions.sort_unstable_by(|a, b| a.word.cmp(&b.word));

        log::info!(
            "HMM estimated: {} sentences, {} tags, {} words, {} tag bigrams observed",
            self.n_sentences,
            n_tags,
            emissions.len(),
            self.bigram_counts.len(),
        );

        let tokenizer = self.tokenizer_trainer.train();

        Ok(Model {
            tags,
            start_probs,
            transition_probs,
            emissions,
            tokenizer,
        })
    }
}
