use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ExtractError, ExtractResult};

static IDX_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`IDX\(\s*(\d+)\s*\)").expect("valid IDX macro pattern"));

/// Rewrite every `` `IDX(<digits>) `` macro call to the bare token `IDX<digits>`.
///
/// This is the only rewrite applied before both extraction passes; everything
/// else in the text is left untouched.
pub fn normalize_macro_calls(code: &str) -> String {
    IDX_CALL.replace_all(code, "IDX$1").into_owned()
}

/// Directive handling for the structural pass: `include resolution,
/// `define substitution, and removal of conditional/compiler directives.
#[derive(Debug, Clone)]
pub struct DirectiveExpander {
    include_dirs: Vec<PathBuf>,
    defines: HashMap<String, String>,
    /// Files currently being expanded, outermost first
    open_files: Vec<PathBuf>,
}

impl DirectiveExpander {
    pub fn new(include_dirs: Vec<PathBuf>, defines: HashMap<String, String>) -> Self {
        Self {
            include_dirs,
            defines,
            open_files: Vec::new(),
        }
    }

    pub fn expand_file(&mut self, file_path: &Path) -> ExtractResult<String> {
        let content = fs::read_to_string(file_path)
            .map_err(|e| ExtractError::Read(file_path.to_path_buf(), e))?;

        self.open_files.push(canonical(file_path));
        let expanded = self.expand_content(&content, Some(file_path));
        self.open_files.pop();
        expanded
    }

    pub fn expand_content(
        &mut self,
        content: &str,
        current_file: Option<&Path>,
    ) -> ExtractResult<String> {
        let mut result = String::new();

        for (line_num, line) in content.lines().enumerate() {
            let trimmed = line.trim();

            if let Some(directive) = trimmed.strip_prefix('`') {
                if let Some(define_content) = directive.strip_prefix("define ") {
                    self.handle_define(define_content);
                    continue;
                } else if let Some(include_content) = directive.strip_prefix("include ") {
                    let included =
                        self.handle_include(include_content, current_file, line_num + 1)?;
                    result.push_str(&included);
                    result.push('\n');
                    continue;
                } else if is_dropped_directive(directive) {
                    // Both branches of a conditional are kept
                    continue;
                }
            }

            result.push_str(&self.expand_macros(line));
            result.push('\n');
        }

        Ok(result)
    }

    fn handle_define(&mut self, define_content: &str) {
        let mut parts = define_content.trim().splitn(2, char::is_whitespace);
        let Some(name) = parts.next().filter(|name| !name.is_empty()) else {
            return;
        };
        // Function-like macros are recorded under their bare name
        let name = name.split('(').next().unwrap_or(name);
        let value = parts.next().map(str::trim).unwrap_or_default();
        self.defines.insert(name.to_string(), value.to_string());
    }

    fn handle_include(
        &mut self,
        include_content: &str,
        current_file: Option<&Path>,
        line_num: usize,
    ) -> ExtractResult<String> {
        let filename = include_content.trim();
        let filename = filename
            .strip_prefix('"')
            .and_then(|f| f.strip_suffix('"'))
            .or_else(|| filename.strip_prefix('<').and_then(|f| f.strip_suffix('>')))
            .unwrap_or(filename);

        let relative = current_file
            .and_then(Path::parent)
            .map(|parent| parent.join(filename))
            .filter(|candidate| candidate.exists());

        let found = relative.or_else(|| {
            self.include_dirs
                .iter()
                .map(|dir| dir.join(filename))
                .find(|candidate| candidate.exists())
        });

        let include_path = found.ok_or_else(|| ExtractError::IncludeNotFound {
            file: filename.to_string(),
            line: line_num,
        })?;

        if self.open_files.contains(&canonical(&include_path)) {
            return Err(ExtractError::IncludeCycle {
                file: filename.to_string(),
                line: line_num,
            });
        }

        self.expand_file(&include_path)
    }

    fn expand_macros(&self, line: &str) -> String {
        if !line.contains('`') {
            return line.to_string();
        }

        let mut names: Vec<&String> = self.defines.keys().collect();
        // Longest first so `WIDTH_MAX is not clobbered by `WIDTH
        names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let mut result = line.to_string();
        for name in names {
            let usage = format!("`{}", name);
            if result.contains(&usage) {
                result = result.replace(&usage, &self.defines[name]);
            }
        }
        result
    }
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn is_dropped_directive(directive: &str) -> bool {
    let keyword = directive
        .split(|c: char| c.is_whitespace())
        .next()
        .unwrap_or_default();
    matches!(
        keyword,
        "ifdef"
            | "ifndef"
            | "elsif"
            | "else"
            | "endif"
            | "undef"
            | "timescale"
            | "default_nettype"
            | "resetall"
            | "celldefine"
            | "endcelldefine"
    )
}
