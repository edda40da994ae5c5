//! Runs both passes over one module's text and merges them.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, ExtractResult};
use crate::ids::{IdGenerator, UuidIds};
use crate::parser::{extract_ports, StructuralPorts, SystemVerilogParser};
use crate::preprocessor::normalize_macro_calls;
use crate::relations::{extract_entities, EntityTables, RelationOptions};
use crate::scanner::{scan_module, HeuristicScan};
use crate::{Direction, ExtractedModule, ParseError, Port};

/// Extractor settings, built up with the `with_*` methods.
#[derive(Debug, Clone, Default)]
pub struct ExtractorConfig {
    pub include_dirs: Vec<PathBuf>,
    pub defines: HashMap<String, String>,
    /// Where the structural pass stages its input; the system temp dir when unset
    pub staging_dir: Option<PathBuf>,
    pub relations: RelationOptions,
}

impl ExtractorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_include_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.include_dirs.push(dir.into());
        self
    }

    pub fn with_include_dirs<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.include_dirs.extend(dirs.into_iter().map(Into::into));
        self
    }

    pub fn with_define(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defines.insert(name.into(), value.into());
        self
    }

    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    pub fn with_word_boundary_parameters(mut self, enabled: bool) -> Self {
        self.relations.word_boundary_parameters = enabled;
        self
    }
}

/// The merged module record and the tables derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    pub module: ExtractedModule,
    pub tables: EntityTables,
}

#[derive(Debug, Clone, Default)]
pub struct Extractor {
    config: ExtractorConfig,
}

impl Extractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract the first module in `source`, with random operation ids.
    ///
    /// Never fails: malformed input yields fewer entities, and input with no
    /// module yields an empty record.
    pub fn extract(&self, source: &str) -> Extraction {
        self.extract_with_ids(source, &mut UuidIds)
    }

    pub fn extract_with_ids<G: IdGenerator + ?Sized>(&self, source: &str, ids: &mut G) -> Extraction {
        self.extract_with_hint(source, None, ids)
    }

    /// Read and extract `path`. Its directory is searched first for
    /// `` `include `` files.
    pub fn extract_path(&self, path: &Path) -> ExtractResult<Extraction> {
        let source =
            fs::read_to_string(path).map_err(|e| ExtractError::Read(path.to_path_buf(), e))?;
        Ok(self.extract_with_hint(&source, path.parent(), &mut UuidIds))
    }

    /// Extract every source in parallel. Results keep the input order.
    pub fn extract_batch<S>(&self, sources: &[S]) -> Vec<Extraction>
    where
        S: AsRef<str> + Sync,
    {
        sources
            .par_iter()
            .map(|source| self.extract(source.as_ref()))
            .collect()
    }

    fn extract_with_hint<G: IdGenerator + ?Sized>(
        &self,
        source: &str,
        include_hint: Option<&Path>,
        ids: &mut G,
    ) -> Extraction {
        let normalized = normalize_macro_calls(source);

        let structural = match self.structural_pass(&normalized, include_hint) {
            Ok(ports) => Some(ports),
            Err(e) => {
                debug!("structural pass unavailable: {}", e);
                None
            }
        };
        let scan = scan_module(&normalized, ids);
        let module = merge(structural, scan);

        if let Some(name) = &module.name {
            info!(
                "extracted module '{}' ({} ports, {} signals, {} parameters, {} operations)",
                name,
                module.input_ports.len() + module.output_ports.len(),
                module.signals.len(),
                module.parameters.len(),
                module.operations.len()
            );
        }

        let tables = extract_entities(&module, &self.config.relations);
        Extraction { module, tables }
    }

    /// Stage `text` in a uniquely named file and run the grammar over it. The
    /// staging file is removed when this returns, on every path.
    fn structural_pass(
        &self,
        text: &str,
        include_hint: Option<&Path>,
    ) -> ExtractResult<StructuralPorts> {
        let staging_dir = self
            .config
            .staging_dir
            .clone()
            .unwrap_or_else(env::temp_dir);

        let mut staged = tempfile::Builder::new()
            .prefix("hdl-extract-")
            .suffix(".v")
            .tempfile_in(&staging_dir)
            .map_err(ExtractError::Staging)?;
        staged
            .write_all(text.as_bytes())
            .and_then(|_| staged.flush())
            .map_err(ExtractError::Staging)?;

        let include_dirs = include_hint
            .map(Path::to_path_buf)
            .into_iter()
            .chain(self.config.include_dirs.iter().cloned())
            .collect();
        let mut parser = SystemVerilogParser::new(include_dirs, self.config.defines.clone());
        let result = parser.parse_file(staged.path())?;

        for error in &result.errors {
            debug!("structural: {}", error);
        }

        match result.ast {
            Some(unit) => Ok(extract_ports(&unit)),
            None => Err(ParseError::multiple(result.errors).into()),
        }
    }
}

/// Prefer the grammar's ports when it found any; everything else comes from
/// the scanner. Header names the grammar saw without a direction are
/// resolved against the scanner's declarations, defaulting to input.
fn merge(structural: Option<StructuralPorts>, scan: HeuristicScan) -> ExtractedModule {
    let HeuristicScan {
        module_name,
        mut input_ports,
        mut output_ports,
        mut signals,
        parameters,
        operations,
        port_decls,
    } = scan;
    let mut name = module_name;

    match structural {
        Some(ports) if ports.has_ports() => {
            name = ports.module_name.or(name);
            input_ports = ports.input_ports;
            output_ports = ports.output_ports;

            for port in input_ports.iter_mut().chain(output_ports.iter_mut()) {
                if port.net_type.is_none() {
                    port.net_type = port_decls.get(&port.name).and_then(|decl| decl.net_type);
                }
            }

            for port_name in ports.header_ports {
                let (direction, width, net_type) = match port_decls.get(&port_name) {
                    Some(decl) => (decl.direction, decl.width.clone(), decl.net_type),
                    None => (Direction::Input, "1".to_string(), None),
                };
                let port = Port {
                    name: port_name,
                    width,
                    net_type,
                    direction,
                };
                let list = match direction {
                    Direction::Input => &mut input_ports,
                    Direction::Output => &mut output_ports,
                    Direction::Inout | Direction::Internal => continue,
                };
                if !list.iter().any(|existing| existing.name == port.name) {
                    list.push(port);
                }
            }
        }
        Some(ports) => name = name.or(ports.module_name),
        None => {}
    }

    signals.retain(|signal| {
        !port_decls.contains_key(&signal.name)
            && !input_ports
                .iter()
                .chain(output_ports.iter())
                .any(|port| port.name == signal.name)
    });

    ExtractedModule {
        name,
        input_ports,
        output_ports,
        signals,
        parameters,
        operations,
    }
}
