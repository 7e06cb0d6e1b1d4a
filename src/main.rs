use std::process::ExitCode;

use clap::Parser;

use rasterpaint::{cli, logger};

fn main() -> ExitCode {
    let args = cli::CliArgs::parse();

    // -- Logging ------------------------------------------------------------
    // File logging goes to the platform data dir unless --log names a file;
    // --verbose also mirrors every line to stderr.
    match &args.log {
        Some(path) => logger::init_at(path, args.verbose),
        None if args.verbose => logger::init_at(&logger::default_log_path(), true),
        None => logger::init(),
    }
    rasterpaint::log_info!("CLI mode: script {}", args.script.display());

    cli::run(args)
}
