//! Definition of errors.

use std::error::Error;
use std::fmt;

pub type Result<T, E = HmmposError> = std::result::Result<T, E>;

#[derive(Debug)]
pub enum HmmposError {
    TrainingData(TrainingDataError),
    InvalidModel(InvalidModelError),
    InvalidArgument(InvalidArgumentError),
    CastError(std::num::TryFromIntError),
    DecodeError(bincode::error::DecodeError),
    EncodeError(bincode::error::EncodeError),
    IOError(std::io::Error),
}

impl HmmposError {
    pub(crate) fn training_data<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::TrainingData(TrainingDataError { msg: msg.into() })
    }

    pub(crate) fn invalid_model<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidModel(InvalidModelError { msg: msg.into() })
    }

    pub(crate) fn invalid_argument<S>(arg: &'static str, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidArgument(InvalidArgumentError {
            arg,
            msg: msg.into(),
        })
    }
}

impl fmt::Display for HmmposError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::TrainingData(e) => e.fmt(f),
            Self::InvalidModel(e) => e.fmt(f),
            Self::InvalidArgument(e) => e.fmt(f),
            Self::CastError(e) => e.fmt(f),
            Self::DecodeError(e) => e.fmt(f),
            Self::EncodeError(e) => e.fmt(f),
            Self::IOError(e) => e.fmt(f),
        }
    }
}

impl Error for HmmposError {}

/// Error used when sentences and tag sequences given to the trainer are not aligned.
#[derive(Debug)]
pub struct TrainingDataError {
    /// Error message.
    pub(crate) msg: String,
}

impl fmt::Display for TrainingDataError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "TrainingDataError: {}", self.msg)
    }
}

impl Error for TrainingDataError {}

/// Error used when the model is invalid.
#[derive(Debug)]
pub struct InvalidModelError {
    /// Error message.
    pub(crate) msg: String,
}

impl fmt::Display for InvalidModelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidModelError: {}", self.msg)
    }
}

impl Error for InvalidModelError {}

/// Error used when the argument is invalid.
#[derive(Debug)]
pub struct InvalidArgumentError {
    /// Name of the argument.
    pub(crate) arg: &'static str,

    /// Error message.
    pub(crate) msg: String,
}

impl fmt::Display for InvalidArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidArgumentError: {}: {}", self.arg, self.msg)
    }
}

impl Error for InvalidArgumentError {}

/// Malformed corpus line.
///
/// The corpus loader never returns this error. It recovers by skipping to the next sentence
/// boundary and records the loss in [`Corpus::errors()`](crate::Corpus::errors).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorpusFormatError {
    /// 1-based line number of the malformed line.
    pub(crate) line: usize,

    /// Number of tokens of the in-progress sentence that were discarded.
    pub(crate) n_discarded: usize,

    /// Error message.
    pub(crate) msg: &'static str,
}

impl CorpusFormatError {
    /// Gets the 1-based line number of the malformed line.
    pub const fn line(&self) -> usize {
        self.line
    }

    /// Gets the number of already accumulated tokens that were discarded with the sentence.
    pub const fn n_discarded(&self) -> usize {
        self.n_discarded
    }
}

impl fmt::Display for CorpusFormatError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "CorpusFormatError: line {}: {}", self.line, self.msg)
    }
}

impl Error for CorpusFormatError {}

impl From<std::num::TryFromIntError> for HmmposError {
    fn from(error: std::num::TryFromIntError) -> Self {
        Self::CastError(error)
    }
}

impl From<bincode::error::DecodeError> for HmmposError {
    fn from(error: bincode::error::DecodeError) -> Self {
        Self::DecodeError(error)
    }
}

impl From<bincode::error::EncodeError> for HmmposError {
    fn from(error: bincode::error::EncodeError) -> Self {
        Self::EncodeError(error)
    }
}

impl From<std::io::Error> for HmmposError {
    fn from(error: std::io::Error) -> Self {
        Self::IOError(error)
    }
}
