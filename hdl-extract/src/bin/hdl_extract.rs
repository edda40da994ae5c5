use std::io;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use hdl_extract::sink::{ExtractionSink, JsonSink};
use hdl_extract::{parse_vcs_style_args, Extractor};

#[derive(Parser)]
#[command(name = "hdl-extract")]
#[command(about = "Extract ports, signals, parameters and operations from Verilog modules")]
#[command(version)]
#[command(disable_help_flag = true)]
struct Cli {
    /// All arguments (mix of +incdir+/+define+ options and files)
    #[arg(allow_hyphen_values = true)]
    args: Vec<String>,

    /// Show help information
    #[arg(long = "help", short = 'h', action = clap::ArgAction::Help)]
    help: Option<bool>,

    /// Pretty-print the JSON output
    #[arg(short = 'p', long = "pretty")]
    pretty: bool,

    /// Match parameter names on identifier boundaries
    #[arg(long = "strict-params")]
    strict_params: bool,

    /// Directory for the structural parser's staging files
    #[arg(long = "staging-dir", value_name = "DIR")]
    staging_dir: Option<PathBuf>,
}

fn print_usage() {
    eprintln!("Usage: hdl-extract [OPTIONS] [+incdir+<path>]... [+define+<macro>[=<value>]]... <file>...");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -p, --pretty            Pretty-print the JSON output");
    eprintln!("      --strict-params     Match parameter names on identifier boundaries");
    eprintln!("      --staging-dir <DIR> Directory for structural parser staging files");
    eprintln!("  -h, --help              Show this help message");
    eprintln!();
    eprintln!("VCS-style options:");
    eprintln!("  +incdir+<path>          Add include directory for `include directives");
    eprintln!("  +define+<macro>=<val>   Define preprocessor macro");
    eprintln!();
    eprintln!("Set RUST_LOG=debug to see structural parser diagnostics.");
}

fn main() -> Result<()> {
    env_logger::init();
    let cli_args = Cli::parse();

    let parsed_args = match parse_vcs_style_args(cli_args.args, cli_args.pretty, cli_args.strict_params)
    {
        Ok(args) => args,
        Err(err) => {
            eprintln!("Error: {}", err);
            eprintln!();
            print_usage();
            process::exit(1);
        }
    };

    let mut config = parsed_args.to_config();
    if let Some(dir) = cli_args.staging_dir {
        config = config.with_staging_dir(dir);
    }
    let extractor = Extractor::new(config);

    let stdout = io::stdout();
    let mut sink = JsonSink::new(stdout.lock()).pretty(parsed_args.pretty);

    for file_path in &parsed_args.files {
        let extraction = extractor
            .extract_path(file_path)
            .with_context(|| format!("failed to extract {}", file_path.display()))?;
        if extraction.module.name.is_none() {
            log::warn!("{}: no module found", file_path.display());
        }
        sink.accept(&extraction)
            .with_context(|| format!("failed to write output for {}", file_path.display()))?;
    }

    sink.finish().context("failed to flush output")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> hdl_extract::ParsedArgs {
        let cli = Cli::try_parse_from(argv).unwrap();
        parse_vcs_style_args(cli.args, cli.pretty, cli.strict_params).unwrap()
    }

    #[test]
    fn flags_before_files_go_through_clap() {
        let parsed = parse(&["hdl-extract", "--pretty", "--strict-params", "design.v"]);
        assert!(parsed.pretty);
        assert!(parsed.strict_params);
        assert_eq!(parsed.files, vec![PathBuf::from("design.v")]);
    }

    #[test]
    fn flags_after_files_are_honoured() {
        let parsed = parse(&[
            "hdl-extract",
            "design.v",
            "--pretty",
            "--strict-params",
            "--staging-dir",
            "/tmp/x",
        ]);
        assert!(parsed.pretty);
        assert!(parsed.strict_params);
        assert_eq!(parsed.staging_dir, Some(PathBuf::from("/tmp/x")));
        assert_eq!(parsed.files, vec![PathBuf::from("design.v")]);
    }
}
