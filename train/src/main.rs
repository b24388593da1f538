use std::fs::File;
use std::io::{prelude::*, stderr};
use std::path::PathBuf;

use clap::Parser;
use hmmpos::{Corpus, StartTransitions, Trainer, DEFAULT_MIN_FREQUENCY, DEFAULT_VOCAB_SIZE};

#[derive(Parser, Debug)]
#[command(about = "A program to train models of hmmpos.")]
struct Args {
    /// A tagged training corpus: one `word TAG` pair per line, sentences end with the FS tag
    #[arg(long, required = true)]
    corpus: Vec<PathBuf>,

    /// The file to write the trained model to
    #[arg(long)]
    model: PathBuf,

    /// The ceiling of the subword vocabulary, including 256 byte tokens
    #[arg(long, default_value_t = DEFAULT_VOCAB_SIZE)]
    vocab_size: usize,

    /// The minimum frequency of a subword pair to be merged
    #[arg(long, default_value_t = DEFAULT_MIN_FREQUENCY)]
    min_frequency: usize,

    /// Do not estimate transitions from the sentence start; every start tag gets the floor
    /// probability
    #[arg(long)]
    floor_start_transitions: bool,

    /// The compression level of zstd
    #[arg(long, default_value = "19")]
    zstd_level: i32,

    /// The number of workers for zstd (0 means multithreaded will be disabled)
    #[arg(long, default_value = "0")]
    zstd_workers: u32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    eprintln!("Loading dataset...");
    let mut corpus = Corpus::default();
    for path in &args.corpus {
        eprintln!("Loading {path:?} ...");
        corpus.append(Corpus::from_path(path)?);
        eprintln!("# of sentences: {}", corpus.len());
    }

    let start_transitions = if args.floor_start_transitions {
        StartTransitions::Floor
    } else {
        StartTransitions::Observed
    };
    let mut trainer =
        Trainer::new(args.vocab_size, args.min_frequency)?.start_transitions(start_transitions);
    for (i, (words, tags)) in corpus.iter().enumerate() {
        if i % 10000 == 0 {
            eprint!("# of sentences: {i}\r");
            stderr().flush()?;
        }
        trainer.push_sentence(words, tags)?;
    }
    eprintln!(
        "# of sentences: {}, # of tags: {}",
        trainer.n_sentences(),
        trainer.n_tags()
    );

    eprintln!("Start training...");
    let model = trainer.train()?;
    eprintln!("Finish training.");
    log::info!("Writing the model to {:?}", args.model);
    eprintln!(
        "# of words: {}, # of subword merges: {}",
        model.vocab_size(),
        model.tokenizer().n_merges()
    );

    let mut f = zstd::Encoder::new(File::create(args.model)?, args.zstd_level)?;
    f.multithread(args.zstd_workers)?;
    model.write(&mut f)?;
    f.finish()?;

    Ok(())
}
