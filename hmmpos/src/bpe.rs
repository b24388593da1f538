//! Byte-level byte-pair encoding used to decompose unknown words.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use bincode::{Decode, Encode};
use hashbrown::{HashMap, HashSet};

use crate::errors::{HmmposError, Result};
use crate::utils::Indexer;

/// Number of single-byte base tokens.
const N_BYTE_TOKENS: usize = 256;

/// Default ceiling of the subword vocabulary, including the byte tokens.
pub const DEFAULT_VOCAB_SIZE: usize = 30000;

/// Default minimum frequency of a pair to be merged.
pub const DEFAULT_MIN_FREQUENCY: usize = 2;

type Pair = (u32, u32);

/// Learned merge rules. The i-th merge creates the token with ID `256 + i`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Decode, Encode)]
pub struct BpeModel {
    pub(crate) merges: Vec<Pair>,
}

impl BpeModel {
    /// Gets the number of learned merges.
    pub fn n_merges(&self) -> usize {
        self.merges.len()
    }
}

// Max-heap entry: higher frequency first, then the lexicographically smaller pair.
#[derive(Debug, PartialEq, Eq)]
struct PairScore {
    frequency: usize,
    key: (Vec<u8>, Vec<u8>),
    pair: Pair,
}

impl Ord for PairScore {
    fn cmp(&self, other: &Self) -> Ordering {
        self.frequency
            .cmp(&other.frequency)
            .then_with(|| other.key.cmp(&self.key))
            .then_with(|| other.pair.cmp(&self.pair))
    }
}

impl PartialOrd for PairScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn add_pairs(
    symbols: &[u32],
    word_id: usize,
    count: isize,
    pair_counts: &mut HashMap<Pair, usize>,
    pair_words: &mut HashMap<Pair, HashSet<usize>>,
    changed: &mut HashSet<Pair>,
) {
    for w in symbols.windows(2) {
        let pair = (w[0], w[1]);
        let c = pair_counts.entry(pair).or_insert(0);
        *c = c.checked_add_signed(count).unwrap_or(0);
        if *c == 0 {
            pair_counts.remove(&pair);
        } else if count > 0 {
            pair_words.entry(pair).or_default().insert(word_id);
        }
        changed.insert(pair);
    }
}

fn push_changed(
    heap: &mut BinaryHeap<PairScore>,
    changed: &mut HashSet<Pair>,
    pair_counts: &HashMap<Pair, usize>,
    pieces: &[Vec<u8>],
    min_frequency: usize,
) {
    for pair in changed.drain() {
        if let Some(&frequency) = pair_counts.get(&pair) {
            if frequency >= min_frequency {
                heap.push(PairScore {
                    frequency,
                    key: (
                        pieces[pair.0 as usize].clone(),
                        pieces[pair.1 as usize].clone(),
                    ),
                    pair,
                });
            }
        }
    }
}

fn merge_symbols(symbols: &[u32], pair: Pair, new_id: u32) -> Vec<u32> {
    let mut merged = Vec::with_capacity(symbols.len());
    let mut i = 0;
    while i < symbols.len() {
        if i + 1 < symbols.len() && (symbols[i], symbols[i + 1]) == pair {
            merged.push(new_id);
            i += 2;
        } else {
            merged.push(symbols[i]);
            i += 1;
        }
    }
    merged
}

/// Trainer of [`BpeModel`].
///
/// Words are collected with their frequencies; sentences are split on whitespace and no space
/// marker is attached to words.
pub struct BpeTrainer {
    vocab_size: usize,
    min_frequency: usize,
    words: Indexer<String>,
    word_counts: Vec<usize>,
}

impl BpeTrainer {
    /// Creates a new trainer.
    ///
    /// # Arguments
    ///
    /// * `vocab_size` - The ceiling of the vocabulary size including the 256 byte tokens.
    /// * `min_frequency` - Pairs occurring less often than this value are never merged.
    pub fn new(vocab_size: usize, min_frequency: usize) -> Self {
        Self {
            vocab_size,
            min_frequency: min_frequency.max(1),
            words: Indexer::new(),
            word_counts: vec![],
        }
    }

    /// Adds a whitespace-joined sentence.
    pub fn push_text(&mut self, text: &str) {
        for word in text.split_whitespace() {
            self.push_word(word);
        }
    }

    /// Adds a sentence given as a sequence of words.
    pub fn push_sentence<S>(&mut self, words: &[S])
    where
        S: AsRef<str>,
    {
        for word in words {
            self.push_text(word.as_ref());
        }
    }

    fn push_word(&mut self, word: &str) {
        let id = self.words.get_id(word);
        if id == self.word_counts.len() {
            self.word_counts.push(0);
        }
        self.word_counts[id] += 1;
    }

    /// Gets the number of distinct words.
    pub fn n_words(&self) -> usize {
        self.words.len()
    }

    /// Learns merges until the vocabulary ceiling is reached or no pair is frequent enough.
    pub fn train(self) -> BpeModel {
        let max_merges = self.vocab_size.saturating_sub(N_BYTE_TOKENS);
        let mut pieces: Vec<Vec<u8>> = (0..=u8::MAX).map(|b| vec![b]).collect();
        let mut symbols: Vec<Vec<u32>> = self
            .words
            .keys()
            .iter()
            .map(|w| w.bytes().map(u32::from).collect())
            .collect();

        let mut pair_counts = HashMap::new();
        let mut pair_words = HashMap::new();
        let mut changed = HashSet::new();
        for (word_id, (s, &count)) in symbols.iter().zip(&self.word_counts).enumerate() {
            add_pairs(
                s,
                word_id,
                count as isize,
                &mut pair_counts,
                &mut pair_words,
                &mut changed,
            );
        }

        let mut heap = BinaryHeap::new();
        push_changed(
            &mut heap,
            &mut changed,
            &pair_counts,
            &pieces,
            self.min_frequency,
        );

        let mut merges = vec![];
        while merges.len() < max_merges {
            let Some(best) = heap.pop() else {
                break;
            };
            if pair_counts.get(&best.pair) != Some(&best.frequency) {
                // stale entry
                continue;
            }
            let Ok(new_id) = u32::try_from(pieces.len()) else {
                break;
            };

            let mut word_ids: Vec<usize> = pair_words
                .remove(&best.pair)
                .map(|ids| ids.into_iter().collect())
                .unwrap_or_default();
            word_ids.sort_unstable();
            for word_id in word_ids {
                let merged = merge_symbols(&symbols[word_id], best.pair, new_id);
                if merged.len() == symbols[word_id].len() {
                    continue;
                }
                let count = self.word_counts[word_id] as isize;
                add_pairs(
                    &symbols[word_id],
                    word_id,
                    -count,
                    &mut pair_counts,
                    &mut pair_words,
                    &mut changed,
                );
                add_pairs(
                    &merged,
                    word_id,
                    count,
                    &mut pair_counts,
                    &mut pair_words,
                    &mut changed,
                );
                symbols[word_id] = merged;
            }

            let mut piece = pieces[best.pair.0 as usize].clone();
            piece.extend_from_slice(&pieces[best.pair.1 as usize]);
            pieces.push(piece);
            merges.push(best.pair);
            push_changed(
                &mut heap,
                &mut changed,
                &pair_counts,
                &pieces,
                self.min_frequency,
            );

            if merges.len() % 1000 == 0 {
                log::debug!(
                    "BPE merges: {}, last frequency: {}",
                    merges.len(),
                    best.frequency
                );
            }
        }

        log::info!(
            "BPE trained: {} distinct words, {} merges, vocabulary size {}",
            self.words.len(),
            merges.len(),
            pieces.len(),
        );
        BpeModel { merges }
    }
}

// Printable character standing for a byte in token text. Bytes that are printable in Latin-1
// stand for themselves; the others are shifted to U+0100 and above, in byte order.
fn byte_to_char(b: u8) -> char {
    let offset = match b {
        b'!'..=b'~' | 0xA1..=0xAC | 0xAE..=0xFF => return char::from(b),
        0x00..=0x20 => u32::from(b),
        0x7F..=0xA0 => 33 + u32::from(b - 0x7F),
        0xAD => 67,
    };
    char::from_u32(256 + offset).unwrap_or(char::REPLACEMENT_CHARACTER)
}

/// Byte-level BPE tokenizer.
///
/// Tokens are byte strings. Concatenating the tokens of a word reproduces the UTF-8 bytes of the
/// word.
#[derive(Debug)]
pub struct BpeTokenizer {
    ranks: HashMap<Pair, u32>,
    pieces: Vec<Vec<u8>>,

    // Token bytes written in the byte-level alphabet.
    texts: Vec<String>,
}

impl BpeTokenizer {
    /// Creates a tokenizer from learned merges.
    ///
    /// # Errors
    ///
    /// [`HmmposError::InvalidModel`] will be returned if a merge refers to a token that is not
    /// defined before it.
    pub fn new(model: &BpeModel) -> Result<Self> {
        let mut pieces: Vec<Vec<u8>> = (0..=u8::MAX).map(|b| vec![b]).collect();
        let mut ranks = HashMap::with_capacity(model.merges.len());
        for (rank, &(left, right)) in model.merges.iter().enumerate() {
            let (Some(l), Some(r)) = (pieces.get(left as usize), pieces.get(right as usize)) else {
                return Err(HmmposError::invalid_model(format!(
                    "merge #{rank} refers to an undefined token"
                )));
            };
            let mut piece = l.clone();
            piece.extend_from_slice(r);
            pieces.push(piece);
            ranks.insert((left, right), u32::try_from(rank).map_err(|_| {
                HmmposError::invalid_model("too many merges")
            })?);
        }
        let texts = pieces
            .iter()
            .map(|piece| piece.iter().copied().map(byte_to_char).collect())
            .collect();
        Ok(Self {
            ranks,
            pieces,
            texts,
        })
    }

    /// Gets the number of tokens, including the byte tokens.
    pub fn vocab_size(&self) -> usize {
        self.pieces.len()
    }

    fn encode_ids(&self, word: &str) -> Vec<u32> {
        let mut symbols: Vec<u32> = word.bytes().map(u32::from).collect();
        loop {
            let best = symbols
                .windows(2)
                .filter_map(|w| self.ranks.get(&(w[0], w[1])).map(|&rank| (rank, (w[0], w[1]))))
                .min();
            let Some((rank, pair)) = best else {
                break;
            };
            let new_id = N_BYTE_TOKENS as u32 + rank;
            symbols = merge_symbols(&symbols, pair, new_id);
        }
        symbols
    }

    /// Splits a word into subword tokens by applying merges in the order they were learned.
    ///
    /// # Examples
    ///
    /// ```
    /// use hmmpos::{BpeTokenizer, BpeTrainer};
    ///
    /// let mut trainer = BpeTrainer::new(1000, 2);
    /// trainer.push_text("low lower lowest");
    /// let tokenizer = BpeTokenizer::new(&trainer.train()).unwrap();
    ///
    /// let tokens = tokenizer.encode("lowly");
    /// assert_eq!(b"low", tokens[0]);
    /// assert_eq!(b"lowly".to_vec(), tokens.concat());
    /// ```
    pub fn encode(&self, word: &str) -> Vec<&[u8]> {
        self.encode_ids(word)
            .into_iter()
            .map(|id| self.pieces[id as usize].as_slice())
            .collect()
    }

    /// Splits a word into subword tokens written in the byte-level alphabet.
    ///
    /// Every byte is shown as one printable character: printable Latin-1 bytes as themselves and
    /// the rest (controls, space, and most UTF-8 continuation bytes) as characters from U+0100.
    /// Token texts of a non-ASCII word therefore never spell the word itself.
    ///
    /// # Examples
    ///
    /// ```
    /// use hmmpos::{BpeModel, BpeTokenizer};
    ///
    /// let tokenizer = BpeTokenizer::new(&BpeModel::default()).unwrap();
    /// assert_eq!(vec!["a", "Ġ", "b"], tokenizer.encode_text("a b"));
    /// ```
    pub fn encode_text(&self, word: &str) -> Vec<&str> {
        self.encode_ids(word)
            .into_iter()
            .map(|id| self.texts[id as usize].as_str())
            .collect()
    }
}
