use std::fs::File;
use std::path::PathBuf;

use clap::Parser;
use hmmpos::{Corpus, Model, Predictor};

#[derive(Parser, Debug)]
#[command(about = "A program to evaluate the accuracy of hmmpos.")]
struct Args {
    /// The model file to use when tagging text
    #[arg(long)]
    model: PathBuf,

    /// A tagged test corpus in the same format as the training corpus
    #[arg(long)]
    corpus: PathBuf,
}

#[derive(Debug, Default)]
struct Counter {
    n_correct: usize,
    n_total: usize,
}

impl Counter {
    fn add(&mut self, correct: bool) {
        self.n_total += 1;
        if correct {
            self.n_correct += 1;
        }
    }

    fn accuracy(&self) -> f64 {
        if self.n_total == 0 {
            return 0.0;
        }
        self.n_correct as f64 / self.n_total as f64
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    eprintln!("Loading model file...");
    let mut f = zstd::Decoder::new(File::open(args.model)?)?;
    let model = Model::read(&mut f)?;
    let predictor = Predictor::new(model)?;

    eprintln!("Loading test corpus...");
    let corpus = Corpus::from_path(args.corpus)?;
    if corpus.is_empty() {
        log::warn!("The test corpus contains no sentence");
    }

    let mut tokens = Counter::default();
    let mut unknown_tokens = Counter::default();
    let mut sentences = Counter::default();
    for (words, gold) in corpus.iter() {
        let tags = predictor.predict(words);
        let mut all_correct = true;
        for ((word, tag), gold) in words.iter().zip(tags).zip(gold) {
            let correct = tag == gold.as_str();
            tokens.add(correct);
            if !predictor.contains_word(word) {
                unknown_tokens.add(correct);
            }
            all_correct &= correct;
        }
        sentences.add(all_correct);
    }

    println!(
        "Token accuracy: {:.4} ({}/{})",
        tokens.accuracy(),
        tokens.n_correct,
        tokens.n_total
    );
    println!(
        "Unknown-word accuracy: {:.4} ({}/{})",
        unknown_tokens.accuracy(),
        unknown_tokens.n_correct,
        unknown_tokens.n_total
    );
    println!(
        "Sentence accuracy: {:.4} ({}/{})",
        sentences.accuracy(),
        sentences.n_correct,
        sentences.n_total
    );

    Ok(())
}
