use std::ops::Range;

use crate::Tagger;

/// Subject-verb agreement rule.
///
/// When the subject occurs in a sentence, every later verb of the sentence must end with the
/// suffix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgreementRule {
    subject: String,
    suffix: String,
}

impl AgreementRule {
    /// Creates a new rule.
    ///
    /// # Arguments
    ///
    /// * `subject` - A subject word.
    /// * `suffix` - A suffix required for verbs following `subject`.
    pub fn new<S, T>(subject: S, suffix: T) -> Self
    where
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            subject: subject.into(),
            suffix: suffix.into(),
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    // Returns true if a verb after an occurrence of the subject lacks the suffix.
    fn is_violated(&self, words: &[&str], tags: &[&str], verb_tags: &[String]) -> bool {
        words
            .iter()
            .zip(tags)
            .skip_while(|&(&w, _)| w != self.subject)
            .skip(1)
            .any(|(word, &tag)| {
                verb_tags.iter().any(|v| v == tag) && !word.ends_with(self.suffix.as_str())
            })
    }
}

/// Grammar checker.
///
/// Splits a paragraph into sentences at `.`, tags every sentence, and reports the sentences that
/// break one of the agreement rules.
///
/// # Examples
///
/// ```
/// use hmmpos::{Model, Predictor};
/// use hmmpos_rules::GrammarChecker;
///
/// let model = Model::train(
///     &[vec!["මම", "ගියෙමි", "."], vec!["අපි", "ගියෙමු", "."]],
///     &[vec!["PRP", "VFM", "FS"], vec!["PRP", "VFM", "FS"]],
/// )
/// .unwrap();
/// let checker = GrammarChecker::new(Predictor::new(model).unwrap());
///
/// assert_eq!(vec![0..9], checker.check("මම ගියෙමු. අපි ගියෙමු."));
/// ```
pub struct GrammarChecker<T> {
    tagger: T,
    rules: Vec<AgreementRule>,
    verb_tags: Vec<String>,
}

impl<T> GrammarChecker<T>
where
    T: Tagger,
{
    /// Creates a new grammar checker with the default rules.
    ///
    /// The default rules require `මි` after `මම` and `මු` after `අපි`, and words tagged `VFM` or
    /// `VP` are verbs.
    pub fn new(tagger: T) -> Self {
        Self {
            tagger,
            rules: vec![
                AgreementRule::new("මම", "මි"),
                AgreementRule::new("අපි", "මු"),
            ],
            verb_tags: vec!["VFM".to_string(), "VP".to_string()],
        }
    }

    /// Replaces the agreement rules.
    pub fn rules(mut self, rules: Vec<AgreementRule>) -> Self {
        self.rules = rules;
        self
    }

    /// Replaces the tags regarded as verbs.
    pub fn verb_tags<S>(mut self, verb_tags: &[S]) -> Self
    where
        S: AsRef<str>,
    {
        self.verb_tags = verb_tags.iter().map(|t| t.as_ref().to_string()).collect();
        self
    }

    pub fn tagger(&self) -> &T {
        &self.tagger
    }

    /// Checks a paragraph.
    ///
    /// # Arguments
    ///
    /// * `paragraph` - A paragraph of sentences separated by `.`.
    ///
    /// # Returns
    ///
    /// Ranges of erroneous sentences in characters (not bytes), in order of appearance. A range
    /// covers the sentence text without its trailing `.`.
    pub fn check(&self, paragraph: &str) -> Vec<Range<usize>> {
        let mut ranges = vec![];
        let mut start = 0;
        for sentence in paragraph.split('.') {
            let end = start + sentence.chars().count();
            let words: Vec<&str> = sentence.split_whitespace().collect();
            if !words.is_empty() {
                let tags = self.tagger.tag(&words);
                if let Some(rule) = self
                    .rules
                    .iter()
                    .find(|rule| rule.is_violated(&words, &tags, &self.verb_tags))
                {
                    log::debug!(
                        "sentence at {start}..{end} breaks agreement of {:?}",
                        rule.subject()
                    );
                    ranges.push(start..end);
                }
            }
            start = end + 1;
        }
        ranges
    }
}
