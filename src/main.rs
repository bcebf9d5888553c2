use clap::Parser;
use downsort::cli::{Cli, run_cli};
use downsort::output::OutputFormatter;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run_cli(cli) {
        OutputFormatter::error(&e.to_string());
        std::process::exit(1);
    }
}
