use std::collections::HashMap;
use std::path::PathBuf;

use log::warn;

use crate::extractor::ExtractorConfig;

#[derive(Debug, PartialEq)]
pub struct ParsedArgs {
    pub files: Vec<PathBuf>,
    pub include_dirs: Vec<PathBuf>,
    pub defines: Vec<String>,
    pub pretty: bool,
    pub strict_params: bool,
    pub staging_dir: Option<PathBuf>,
}

impl ParsedArgs {
    /// `NAME=VALUE` defines split into a macro table; a bare `NAME` defines
    /// an empty macro.
    pub fn define_map(&self) -> HashMap<String, String> {
        self.defines
            .iter()
            .map(|define| match define.split_once('=') {
                Some((name, value)) => (name.to_string(), value.to_string()),
                None => (define.clone(), String::new()),
            })
            .collect()
    }

    pub fn to_config(&self) -> ExtractorConfig {
        let mut config = ExtractorConfig::new()
            .with_include_dirs(self.include_dirs.iter().cloned())
            .with_word_boundary_parameters(self.strict_params);
        config.defines = self.define_map();
        config.staging_dir = self.staging_dir.clone();
        config
    }
}

pub fn parse_vcs_style_args(
    raw_args: Vec<String>,
    pretty: bool,
    strict_params: bool,
) -> Result<ParsedArgs, String> {
    let mut files = Vec::new();
    let mut include_dirs = Vec::new();
    let mut defines = Vec::new();
    let mut pretty = pretty;
    let mut strict_params = strict_params;
    let mut staging_dir = None;

    let mut args = raw_args.into_iter();
    while let Some(arg) = args.next() {
        if let Some(incdir_path) = arg.strip_prefix("+incdir+") {
            if incdir_path.is_empty() {
                return Err("Empty path in +incdir+ directive".to_string());
            }
            // +incdir+a+b names two directories
            include_dirs.extend(
                incdir_path
                    .split('+')
                    .filter(|dir| !dir.is_empty())
                    .map(PathBuf::from),
            );
        } else if let Some(define_str) = arg.strip_prefix("+define+") {
            if define_str.is_empty() {
                return Err("Empty define in +define+ directive".to_string());
            }
            defines.extend(
                define_str
                    .split('+')
                    .filter(|define| !define.is_empty())
                    .map(str::to_string),
            );
        } else if arg.starts_with('+') {
            warn!("Unsupported VCS option: {}", arg);
        } else if arg.starts_with('-') {
            // Flags written after the first file land here instead of in clap
            match arg.as_str() {
                "-p" | "--pretty" => pretty = true,
                "--strict-params" => strict_params = true,
                "--staging-dir" => {
                    let dir = args
                        .next()
                        .ok_or_else(|| "Missing directory after --staging-dir".to_string())?;
                    staging_dir = Some(PathBuf::from(dir));
                }
                other => match other.strip_prefix("--staging-dir=") {
                    Some(dir) if !dir.is_empty() => staging_dir = Some(PathBuf::from(dir)),
                    _ => return Err(format!("Unknown option: {}", arg)),
                },
            }
        } else {
            files.push(PathBuf::from(arg));
        }
    }

    if files.is_empty() {
        return Err("No input files specified".to_string());
    }

    Ok(ParsedArgs {
        files,
        include_dirs,
        defines,
        pretty,
        strict_params,
        staging_dir,
    })
}
