use clap::Parser;
use mimalloc::MiMalloc;
use sieve_cli::{exit_code, run, Args};
use sieve_store::Outcome;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() {
    let args = Args::parse();

    if let Err(e) = sieve_tracing::TracingBuilder::default()
        .level(args.log_level)
        .json(args.json)
        .build()
    {
        eprintln!("unable to set up logging: {}", e);
    }

    let outcome = match run(&args, std::io::stdin().lock(), std::io::stdout().lock()) {
        Ok(()) => Outcome::Ok,
        Err(e) => {
            eprintln!("{}: {}", e.outcome(), e);
            e.outcome()
        }
    };

    std::process::exit(exit_code(outcome))
}
