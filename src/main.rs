use std::fs::File;
use std::io::{BufReader, IsTerminal};
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use sh2ex::cli::Cli;
use sh2ex::disc::DiscReader;
use sh2ex::extract;
use sh2ex::formats::iso9660::Toc;
use sh2ex::title::{self, TITLES};

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version go to stdout and are not failures.
            let code = if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
            let _ = e.print();
            return code;
        }
    };

    let default_level = if cli.verbose {
        "sh2ex=debug"
    } else if cli.quiet {
        "sh2ex=warn"
    } else {
        "sh2ex=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .without_time()
        .init();

    if !cli.image.is_file() {
        error!("invalid filepath: {}", cli.image.display());
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> sh2ex::Result<()> {
    let mut disc = DiscReader::open(BufReader::new(File::open(&cli.image)?))?;
    let toc = Toc::read(&mut disc)?;
    let executable = title::identify(&mut disc, &toc, TITLES)?;
    info!(title = executable.title.name, "identified executable");

    let entries = executable.entries(&toc)?;

    if cli.list {
        for entry in &entries {
            println!(
                "{:#010X} {:>10} {} {}",
                entry.offset, entry.size, entry.container_path, entry.virtual_path
            );
        }
        return Ok(());
    }

    let root = cli
        .output
        .clone()
        .unwrap_or_else(|| extract::output_root(&cli.image));
    let summary = extract::extract_all(&mut disc, &toc, &entries, &root)?;
    info!(
        extracted = summary.extracted,
        truncated = summary.truncated,
        root = %root.display(),
        "All done."
    );
    Ok(())
}
