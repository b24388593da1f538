use std::fs::File;
use std::io::{prelude::*, stdin, stdout, BufReader, BufWriter};
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use hmmpos::{Model, Predictor};

#[derive(Parser, Debug)]
#[command(about = "A program to perform part-of-speech tagging.")]
struct Args {
    /// The model file to use when tagging text
    #[arg(long)]
    model: PathBuf,

    /// Append the log-probability of the best tag sequence to each line
    #[arg(long)]
    score: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    eprintln!("Loading model file...");
    let mut f = zstd::Decoder::new(File::open(args.model)?)?;
    let model = Model::read(&mut f)?;
    log::info!(
        "{} tags, {} words in the model",
        model.tags().len(),
        model.vocab_size()
    );
    let predictor = Predictor::new(model)?;

    eprintln!("Start tagging");
    let mut n_words = 0;
    let start = Instant::now();
    let mut out = BufWriter::new(stdout().lock());
    for line in BufReader::new(stdin().lock()).lines() {
        let line = line?;
        let words: Vec<&str> = line.split_whitespace().collect();
        let (tags, score) = predictor.predict_with_score(&words);
        n_words += words.len();
        let toks: Vec<String> = words
            .iter()
            .zip(&tags)
            .map(|(word, tag)| format!("{word}/{tag}"))
            .collect();
        if args.score {
            writeln!(out, "{}\t{score}", toks.join(" "))?;
        } else {
            writeln!(out, "{}", toks.join(" "))?;
        }
    }
    out.flush()?;
    let duration = start.elapsed();
    eprintln!("Elapsed: {} [sec]", duration.as_secs_f64());
    eprintln!(
        "Speed: {} [words/sec]",
        n_words as f64 / duration.as_secs_f64()
    );

    Ok(())
}
