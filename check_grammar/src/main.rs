use std::fs::File;
use std::io::{prelude::*, stdin};
use std::path::PathBuf;

use clap::Parser;
use hmmpos::{Model, Predictor};
use hmmpos_rules::GrammarChecker;

#[derive(Parser, Debug)]
#[command(about = "A program to detect subject-verb agreement errors.")]
struct Args {
    /// The model file to use when tagging text
    #[arg(long)]
    model: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    eprintln!("Loading model file...");
    let mut f = zstd::Decoder::new(File::open(args.model)?)?;
    let model = Model::read(&mut f)?;
    let checker = GrammarChecker::new(Predictor::new(model)?);

    let mut n_errors = 0;
    for (i, line) in stdin().lock().lines().enumerate() {
        let paragraph = line?;
        let chars: Vec<char> = paragraph.chars().collect();
        for range in checker.check(&paragraph) {
            let text: String = chars[range.clone()].iter().collect();
            println!("{}\t{}..{}\t{}", i + 1, range.start, range.end, text.trim());
            n_errors += 1;
        }
    }
    log::info!("{n_errors} erroneous sentence(s) found");

    Ok(())
}
