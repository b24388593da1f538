use std::io::{Read, Write};

use bincode::{Decode, Encode};

use crate::bpe::BpeModel;
use crate::errors::{HmmposError, Result};
use crate::trainer::Trainer;

/// Probability assigned to tag transitions never observed in training.
pub const FLOOR_PROB: f64 = 1e-6;

/// Pseudo-tag preceding the first word of a sentence. It is never part of the tag inventory.
pub const START_TAG: &str = "<S>";

/// Tag returned for every word when the model has no tag at all.
pub const UNKNOWN_TAG: &str = "UNK";

// Index of `tag` in a sorted tag inventory.
pub(crate) fn tag_id(tags: &[String], tag: &str) -> Option<usize> {
    tags.binary_search_by(|t| t.as_str().cmp(tag)).ok()
}

/// Emission probabilities of one word.
#[derive(Clone, Debug, PartialEq, Decode, Encode)]
pub(crate) struct EmissionRecord {
    pub(crate) word: String,

    // (tag ID, probability), sorted by tag ID.
    pub(crate) probs: Vec<(u32, f64)>,
}

/// Model data.
///
/// A model is created by [`Model::train()`] or [`Trainer::train()`] and is never modified
/// afterwards. Training again creates another model.
#[derive(Clone, Debug, PartialEq, Decode, Encode)]
pub struct Model {
    // Sorted and deduplicated. Tag IDs are indices of this vector.
    pub(crate) tags: Vec<String>,

    // P(tag | START) for each tag.
    pub(crate) start_probs: Vec<f64>,

    // P(cur | prev) at `prev * n_tags + cur`. Dense over all tag pairs.
    pub(crate) transition_probs: Vec<f64>,

    // Sorted by word.
    pub(crate) emissions: Vec<EmissionRecord>,

    pub(crate) tokenizer: BpeModel,
}

impl Model {
    /// Trains a model with default parameters.
    ///
    /// # Arguments
    ///
    /// * `sentences` - Word sequences.
    /// * `tags` - Tag sequences aligned with `sentences`.
    ///
    /// # Errors
    ///
    /// [`HmmposError::TrainingData`] will be returned if the number of sentences and tag sequences
    /// differ, or if a sentence and its tag sequence differ in length.
    ///
    /// # Examples
    ///
    /// ```
    /// use hmmpos::Model;
    ///
    /// let sentences = vec![vec!["මම", "ගියෙමි", "."]];
    /// let tags = vec![vec!["PRP", "VFM", "FS"]];
    /// let model = Model::train(&sentences, &tags).unwrap();
    /// assert_eq!(&["FS", "PRP", "VFM"], model.tags());
    ///
    /// assert!(Model::train(&sentences, &[vec!["PRP"]]).is_err());
    /// ```
    pub fn train<S, T, W, U>(sentences: &[S], tags: &[T]) -> Result<Self>
    where
        S: AsRef<[W]>,
        T: AsRef<[U]>,
        W: AsRef<str>,
        U: AsRef<str>,
    {
        if sentences.len() != tags.len() {
            return Err(HmmposError::training_data(format!(
                "{} sentences but {} tag sequences",
                sentences.len(),
                tags.len(),
            )));
        }
        let mut trainer = Trainer::default();
        for (words, tags) in sentences.iter().zip(tags) {
            trainer.push_sentence(words.as_ref(), tags.as_ref())?;
        }
        trainer.train()
    }

    /// Exports the model data.
    ///
    /// # Arguments
    ///
    /// * `wtr` - Byte-oriented sink object.
    ///
    /// # Errors
    ///
    /// When `wtr` generates an error, it will be returned as is.
    pub fn write<W>(&self, wtr: &mut W) -> Result<()>
    where
        W: Write,
    {
        let config = bincode::config::standard();
        bincode::encode_into_std_write(self, wtr, config)?;
        Ok(())
    }

    /// Creates a model from a reader.
    ///
    /// # Arguments
    ///
    /// * `rdr` - A data source.
    ///
    /// # Returns
    ///
    /// A model data read from `rdr`.
    ///
    /// # Errors
    ///
    /// When `rdr` generates an error, it will be returned as is. If the decoded tables are
    /// inconsistent, [`HmmposError::InvalidModel`] will be returned.
    pub fn read<R>(rdr: &mut R) -> Result<Self>
    where
        R: Read,
    {
        let config = bincode::config::standard();
        let model: Self = bincode::decode_from_std_read(rdr, config)?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<()> {
        let n_tags = self.tags.len();
        if self.tags.windows(2).any(|w| w[0] >= w[1]) {
            return Err(HmmposError::invalid_model("tags are not sorted"));
        }
        if self.start_probs.len() != n_tags {
            return Err(HmmposError::invalid_model(
                "size of start probabilities mismatches the number of tags",
            ));
        }
        if self.transition_probs.len() != n_tags * n_tags {
            return Err(HmmposError::invalid_model(
                "transition table is not square over the tags",
            ));
        }
        for record in &self.emissions {
            if record
                .probs
                .iter()
                .any(|&(tag_id, prob)| tag_id as usize >= n_tags || prob <= 0.0)
            {
                return Err(HmmposError::invalid_model(format!(
                    "invalid emission of {:?}",
                    record.word
                )));
            }
        }
        Ok(())
    }

    /// Gets the tag inventory in lexicographic order.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Gets the number of distinct words observed in training.
    pub fn vocab_size(&self) -> usize {
        self.emissions.len()
    }

    /// Gets the learned subword merges.
    pub fn tokenizer(&self) -> &BpeModel {
        &self.tokenizer
    }

    /// Gets P(`cur` | `prev`).
    ///
    /// `prev` may be [`START_TAG`]. Tags unknown to the model resolve to [`FLOOR_PROB`].
    pub fn transition_prob(&self, prev: &str, cur: &str) -> f64 {
        let Some(cur) = tag_id(&self.tags, cur) else {
            return FLOOR_PROB;
        };
        if prev == START_TAG {
            return self.start_probs[cur];
        }
        tag_id(&self.tags, prev).map_or(FLOOR_PROB, |prev| {
            self.transition_probs[prev * self.tags.len() + cur]
        })
    }

    /// Gets P(`word` | `tag`) if the pair was observed in training.
    pub fn emission_prob(&self, tag: &str, word: &str) -> Option<f64> {
        let id = u32::try_from(tag_id(&self.tags, tag)?).ok()?;
        let idx = self
            .emissions
            .binary_search_by(|r| r.word.as_str().cmp(word))
            .ok()?;
        self.emissions[idx]
            .probs
            .iter()
            .find(|&&(t, _)| t == id)
            .map(|&(_, prob)| prob)
    }

    /// Returns `true` if the word was observed in training.
    pub fn contains_word(&self, word: &str) -> bool {
        self.emissions
            .binary_search_by(|r| r.word.as_str().cmp(word))
            .is_ok()
    }
}
