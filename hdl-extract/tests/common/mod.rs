use std::fs;
use std::path::{Path, PathBuf};

use hdl_extract::{Extraction, Extractor, ExtractorConfig, Operation, Port, SequentialIds};

pub mod macros;

pub struct TestHarness {
    extractor: Extractor,
    fixtures_root: PathBuf,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(ExtractorConfig::new())
    }

    pub fn with_config(config: ExtractorConfig) -> Self {
        Self {
            extractor: Extractor::new(config),
            fixtures_root: default_fixtures_root(),
        }
    }

    #[allow(dead_code)]
    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    pub fn fixture_path(&self, relative: &str) -> PathBuf {
        self.fixtures_root.join(relative)
    }

    pub fn read_fixture(&self, relative: &str) -> String {
        let path = self.fixture_path(relative);
        fs::read_to_string(&path).unwrap_or_else(|err| {
            panic!("Failed to read fixture {}: {}", path.display(), err);
        })
    }

    /// Extract a fixture with deterministic `op-N` operation ids.
    pub fn extract_fixture(&self, relative: &str) -> Extraction {
        let content = self.read_fixture(relative);
        self.extract_source(&content)
    }

    pub fn extract_source(&self, source: &str) -> Extraction {
        self.extractor
            .extract_with_ids(source, &mut SequentialIds::new())
    }

    #[allow(dead_code)]
    pub fn extract_fixture_path(&self, relative: &str) -> Extraction {
        let path = self.fixture_path(relative);
        self.extractor
            .extract_path(&path)
            .unwrap_or_else(|err| panic!("Failed to extract {}: {}", path.display(), err))
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

pub fn default_fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("test_files")
}

#[allow(dead_code)]
pub fn port_names(ports: &[Port]) -> Vec<&str> {
    ports.iter().map(|port| port.name.as_str()).collect()
}

#[allow(dead_code)]
pub fn port_widths(ports: &[Port]) -> Vec<(&str, &str)> {
    ports
        .iter()
        .map(|port| (port.name.as_str(), port.width.as_str()))
        .collect()
}

#[allow(dead_code)]
pub fn operation_for<'a>(extraction: &'a Extraction, target: &str) -> &'a Operation {
    extraction
        .module
        .operations
        .iter()
        .find(|op| op.target == target)
        .unwrap_or_else(|| panic!("No operation targets '{}'", target))
}

/// Files in `dir` whose name starts with the extractor's staging prefix.
#[allow(dead_code)]
pub fn staging_files(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .unwrap_or_else(|err| panic!("Failed to read directory {}: {}", dir.display(), err))
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            let name = path.file_name()?.to_str()?;
            name.starts_with("hdl-extract-").then_some(path)
        })
        .collect()
}

#[allow(dead_code)]
pub fn assert_fixture_module(relative: &str, expected: Option<&str>) -> Extraction {
    let extraction = TestHarness::default().extract_fixture(relative);
    assert_eq!(
        extraction.module.name.as_deref(),
        expected,
        "Unexpected module name for fixture {}",
        relative
    );
    extraction
}
