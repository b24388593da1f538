#![cfg_attr(docsrs, feature(doc_cfg))]

//! # hmmpos
//!
//! hmmpos is a part-of-speech tagger based on a first-order hidden Markov model. Words never seen
//! in training are scored through their byte-level BPE subwords.
//!
//! ## Examples
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::{prelude::*, stdin, BufReader};
//!
//! use hmmpos::{Model, Predictor};
//!
//! let mut f = BufReader::new(File::open("model.bin").unwrap());
//! let model = Model::read(&mut f).unwrap();
//! let predictor = Predictor::new(model).unwrap();
//!
//! for line in stdin().lock().lines() {
//!     let line = line.unwrap();
//!     let words: Vec<&str> = line.split_whitespace().collect();
//!     let tags = predictor.predict(&words);
//!     println!("{}", tags.join(" "));
//! }
//! ```
//!
//! Models are trained from a tagged corpus. For more details, see [`Corpus`] and [`Trainer`].

mod bpe;
mod corpus;
mod model;
mod predictor;
mod trainer;
mod unknown;
mod utils;

pub mod errors;

pub use bpe::{BpeModel, BpeTokenizer, BpeTrainer, DEFAULT_MIN_FREQUENCY, DEFAULT_VOCAB_SIZE};
pub use corpus::{clean_tag, Corpus, SENTENCE_BOUNDARY_TAG};
pub use errors::{CorpusFormatError, HmmposError};
pub use model::{Model, FLOOR_PROB, START_TAG, UNKNOWN_TAG};
pub use predictor::Predictor;
pub use trainer::{StartTransitions, Trainer};
pub use unknown::{UnknownWordScorer, SUBWORD_BONUS};
