mod literal;

use std::io::Read;

use clap::Parser as ClapParser;
use kiln_runtime::{Runtime, RuntimeError};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::literal::ParseError;

#[derive(Debug, Error)]
enum Error {
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let opt = Opt::parse();
    if let Err(e) = run(opt) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(opt: Opt) -> Result<(), Error> {
    let rt = Runtime::with_builtins()?;

    if opt.types {
        for (type_id, entry) in rt.vtable().iter() {
            println!("{} {}", type_id, entry);
        }
        return Ok(());
    }

    let input = if let Some(e) = opt.eval {
        e
    } else if let Some(f) = opt.file {
        std::fs::read_to_string(f)?
    } else {
        let mut s = String::new();
        std::io::stdin().lock().read_to_string(&mut s)?;
        s
    };

    let values = literal::read_values(&rt, &input)?;
    tracing::debug!(count = values.len(), "read values");
    rt.println(&rt.make_array(values))?;
    Ok(())
}

#[derive(clap::Parser)]
#[clap(about, version, author)]
struct Opt {
    /// Print the given comma-separated values.
    #[clap(short, long)]
    eval: Option<String>,

    /// Print the values in the given file.
    #[clap(short, long)]
    file: Option<String>,

    /// Only print the dispatch table of the builtin types.
    #[clap(long)]
    types: bool,
}
