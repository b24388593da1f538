use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::errors::{CorpusFormatError, Result};

/// Tag marking the end of a sentence (full stop).
pub const SENTENCE_BOUNDARY_TAG: &str = "FS";

/// Removes all characters except ASCII letters from a raw tag and uppercases the rest.
///
/// # Examples
///
/// ```
/// assert_eq!("NNC", hmmpos::clean_tag("nnc-1"));
/// assert_eq!("FS", hmmpos::clean_tag("\"FS\","));
/// ```
pub fn clean_tag(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

// Ok(None) is a blank line.
fn parse_line(line: &str) -> Result<Option<(&str, String)>, &'static str> {
    let mut fields = line.split_whitespace();
    let Some(word) = fields.next() else {
        return Ok(None);
    };
    let raw_tag = fields.next().ok_or("missing tag")?;
    if fields.next().is_some() {
        return Err("expected exactly one word and one tag");
    }
    Ok(Some((word, clean_tag(raw_tag))))
}

/// Tagged corpus.
///
/// Each sentence is a sequence of words aligned with a sequence of tags of the same length.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Corpus {
    sentences: Vec<Vec<String>>,
    tags: Vec<Vec<String>>,
    errors: Vec<CorpusFormatError>,
}

impl Corpus {
    /// Loads a corpus file.
    ///
    /// # Arguments
    ///
    /// * `path` - A file containing one `<word> <tag>` pair per line.
    ///
    /// # Errors
    ///
    /// If the file cannot be opened or read, or is not valid UTF-8, an error variant will be
    /// returned. Malformed lines are not errors; see [`Corpus::from_reader()`].
    pub fn from_path<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let f = File::open(path)?;
        Self::from_reader(BufReader::new(f))
    }

    /// Loads a corpus from a reader.
    ///
    /// Blank lines are skipped. A sentence ends with the line whose cleaned tag is
    /// [`SENTENCE_BOUNDARY_TAG`], and that line belongs to the sentence. A trailing sentence without
    /// a boundary is kept.
    ///
    /// When a line cannot be parsed, the sentence being read is dropped and all lines up to and
    /// including the next well-formed boundary line are skipped. Each such recovery is recorded in
    /// [`Corpus::errors()`] and logged.
    ///
    /// # Errors
    ///
    /// I/O errors of `rdr` are returned as is.
    ///
    /// # Examples
    ///
    /// ```
    /// use hmmpos::Corpus;
    ///
    /// let text = "මම PRP\nගියා VFM\n. FS\n";
    /// let corpus = Corpus::from_reader(text.as_bytes()).unwrap();
    /// assert_eq!(1, corpus.len());
    /// assert_eq!(&["PRP", "VFM", "FS"], corpus.tags()[0].as_slice());
    /// ```
    pub fn from_reader<R>(rdr: R) -> Result<Self>
    where
        R: BufRead,
    {
        let mut corpus = Self::default();
        let mut words = vec![];
        let mut tags = vec![];

        let mut lines = rdr.lines().enumerate();
        while let Some((i, line)) = lines.next() {
            let line = line?;
            match parse_line(&line) {
                Ok(None) => {}
                Ok(Some((word, tag))) => {
                    let is_boundary = tag == SENTENCE_BOUNDARY_TAG;
                    words.push(word.to_string());
                    tags.push(tag);
                    if is_boundary {
                        corpus.push(std::mem::take(&mut words), std::mem::take(&mut tags));
                    }
                }
                Err(msg) => {
                    let e = CorpusFormatError {
                        line: i + 1,
                        n_discarded: words.len(),
                        msg,
                    };
                    log::warn!("{e}: skipping to the next sentence boundary");
                    corpus.errors.push(e);
                    words.clear();
                    tags.clear();
                    for (_, line) in lines.by_ref() {
                        if let Ok(Some((_, tag))) = parse_line(&line?) {
                            if tag == SENTENCE_BOUNDARY_TAG {
                                break;
                            }
                        }
                    }
                }
            }
        }
        if !words.is_empty() {
            corpus.push(words, tags);
        }

        if !corpus.errors.is_empty() {
            log::warn!(
                "{} malformed line(s) found; {} sentence(s) loaded",
                corpus.errors.len(),
                corpus.len(),
            );
        }
        Ok(corpus)
    }

    fn push(&mut self, words: Vec<String>, tags: Vec<String>) {
        debug_assert_eq!(words.len(), tags.len());
        self.sentences.push(words);
        self.tags.push(tags);
    }

    /// Appends all sentences and recorded errors of another corpus.
    pub fn append(&mut self, other: Self) {
        self.sentences.extend(other.sentences);
        self.tags.extend(other.tags);
        self.errors.extend(other.errors);
    }

    /// Gets the word sequences.
    pub fn sentences(&self) -> &[Vec<String>] {
        &self.sentences
    }

    /// Gets the tag sequences aligned with [`Corpus::sentences()`].
    pub fn tags(&self) -> &[Vec<String>] {
        &self.tags
    }

    /// Gets the recoveries performed while loading.
    pub fn errors(&self) -> &[CorpusFormatError] {
        &self.errors
    }

    /// Gets the number of sentences.
    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    /// Returns `true` if the corpus contains no sentence.
    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    /// Iterates over pairs of a word sequence and its tag sequence.
    pub fn iter(&self) -> impl Iterator<Item = (&[String], &[String])> {
        self.sentences
            .iter()
            .zip(&self.tags)
            .map(|(words, tags)| (words.as_slice(), tags.as_slice()))
    }

    /// Splits the corpus into word sequences and tag sequences.
    pub fn into_parts(self) -> (Vec<Vec<String>>, Vec<Vec<String>>) {
        (self.sentences, self.tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    #[test]
    fn test_clean_tag() {
        assert_eq!("NNC", clean_tag("NNC"));
        assert_eq!("VFM", clean_tag("vfm"));
        assert_eq!("FS", clean_tag("FS."));
        assert_eq!("JJ", clean_tag("\"J-J1\""));
        assert_eq!("", clean_tag("123"));
    }

    #[test]
    fn test_load_sentences() {
        let text = "\
මම PRP
රෑ NNC
කෑමට NNC
ගියා VFM
. FS

අපි PRP
ආවා VFM
. FS
";
        let corpus = Corpus::from_reader(text.as_bytes()).unwrap();
        assert_eq!(2, corpus.len());
        assert_eq!(
            &["මම", "රෑ", "කෑමට", "ගියා", "."],
            corpus.sentences()[0].as_slice()
        );
        assert_eq!(
            &["PRP", "NNC", "NNC", "VFM", "FS"],
            corpus.tags()[0].as_slice()
        );
        assert_eq!(&["අපි", "ආවා", "."], corpus.sentences()[1].as_slice());
        assert_eq!(&["PRP", "VFM", "FS"], corpus.tags()[1].as_slice());
        assert!(corpus.errors().is_empty());
    }

    #[test]
    fn test_load_cleans_tags() {
        let text = "ගස nnc,\n. \"FS\"\n";
        let corpus = Corpus::from_reader(text.as_bytes()).unwrap();
        assert_eq!(1, corpus.len());
        assert_eq!(&["NNC", "FS"], corpus.tags()[0].as_slice());
    }

    #[test]
    fn test_load_unterminated_sentence() {
        let text = "අපි PRP\n. FS\nමම PRP\nගියෙමි VFM";
        let corpus = Corpus::from_reader(text.as_bytes()).unwrap();
        assert_eq!(2, corpus.len());
        assert_eq!(&["මම", "ගියෙමි"], corpus.sentences()[1].as_slice());
        assert_eq!(&["PRP", "VFM"], corpus.tags()[1].as_slice());
    }

    #[test]
    fn test_load_recovers_from_malformed_sentence() {
        let text = "\
අපි PRP
ආවා VFM
. FS
මම PRP
බත්
කෑවා VFM
. FS
ඔහු PRP
ගියේය VFM
. FS
";
        let corpus = Corpus::from_reader(text.as_bytes()).unwrap();
        assert_eq!(2, corpus.len());
        assert_eq!(&["අපි", "ආවා", "."], corpus.sentences()[0].as_slice());
        assert_eq!(&["ඔහු", "ගියේය", "."], corpus.sentences()[1].as_slice());
        assert_eq!(1, corpus.errors().len());
        assert_eq!(5, corpus.errors()[0].line());
        assert_eq!(1, corpus.errors()[0].n_discarded());
    }

    #[test]
    fn test_load_skips_malformed_lines_while_resynchronizing() {
        let text = "\
මම PRP
too many fields
x y z
. . FS
. FS
අපි PRP
. FS
";
        let corpus = Corpus::from_reader(text.as_bytes()).unwrap();
        assert_eq!(1, corpus.len());
        assert_eq!(&["අපි", "."], corpus.sentences()[0].as_slice());
        assert_eq!(1, corpus.errors().len());
        assert_eq!(2, corpus.errors()[0].line());
    }

    #[test]
    fn test_load_tag_without_letters() {
        // The tag is kept even if cleaning leaves nothing.
        let text = "මම 42\nගියා VFM\n. FS\nඅපි PRP\n. FS\n";
        let corpus = Corpus::from_reader(text.as_bytes()).unwrap();
        assert_eq!(2, corpus.len());
        assert_eq!(&["මම", "ගියා", "."], corpus.sentences()[0].as_slice());
        assert_eq!(&["", "VFM", "FS"], corpus.tags()[0].as_slice());
        assert_eq!(&["අපි", "."], corpus.sentences()[1].as_slice());
        assert!(corpus.errors().is_empty());
    }

    #[test]
    fn test_load_malformed_until_end() {
        let text = "මම PRP\nbroken\nගියා VFM\n";
        let corpus = Corpus::from_reader(text.as_bytes()).unwrap();
        assert!(corpus.is_empty());
        assert_eq!(1, corpus.errors().len());
    }

    #[test]
    fn test_load_from_path_is_idempotent() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "මම PRP\nරෑ NNC\n. FS\n\nඅපි PRP\nbad\n. FS\nගස NNC\n. FS").unwrap();
        f.flush().unwrap();

        let first = Corpus::from_path(f.path()).unwrap();
        let second = Corpus::from_path(f.path()).unwrap();
        assert_eq!(first, second);
        assert_eq!(2, first.len());
    }

    #[test]
    fn test_append() {
        let mut corpus = Corpus::from_reader("මම PRP\n. FS\n".as_bytes()).unwrap();
        corpus.append(Corpus::from_reader("අපි PRP\nbad\n. FS\n".as_bytes()).unwrap());
        assert_eq!(1, corpus.len());
        assert_eq!(1, corpus.errors().len());
        let pairs: Vec<_> = corpus.iter().collect();
        assert_eq!(1, pairs.len());
        assert_eq!(&["PRP", "FS"], pairs[0].1);
    }
}
