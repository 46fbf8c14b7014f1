use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use super::cst::{CstNode, SyntaxTree};
use super::model::Module;
use super::walker::Walker;
use crate::config::Config;
use crate::error::{DocsmithError, Result};

/// One extracted source file with provenance metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedFile {
    /// CST input the module was extracted from
    pub path: PathBuf,

    /// Module name derived from the file stem
    pub module_name: String,

    /// SHA-256 of the raw input, for change detection
    pub content_hash: String,

    /// When the extraction ran
    pub generated_at: DateTime<Utc>,

    /// The documentation model
    pub module: Module,
}

/// Batch driver around the pure walk: finds CST inputs, runs one walker
/// per file and serializes the resulting models. A file that fails with a
/// structural error is reported and skipped; it never aborts the batch.
pub struct Engine {
    config: Config,
}

impl Engine {
    pub async fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load_or_default(config_path)?;
        Ok(Self { config })
    }

    /// Write a default configuration file into `path`.
    pub async fn init(&self, path: Option<PathBuf>) -> Result<()> {
        let dir = path.unwrap_or_else(|| PathBuf::from("."));
        std::fs::create_dir_all(&dir)?;
        let target = dir.join("Docsmith.toml");
        if target.exists() {
            return Err(DocsmithError::Config(format!(
                "{} already exists",
                target.display()
            )));
        }
        Config::default().save(&target)?;
        info!("Wrote default configuration to {}", target.display());
        Ok(())
    }

    /// Extract every CST input under `source` and write one model file
    /// per module into `output`.
    pub async fn extract(
        &self,
        source: Option<PathBuf>,
        output: Option<PathBuf>,
        pretty: bool,
    ) -> Result<()> {
        let source = source.unwrap_or_else(|| self.config.project.source_dir.clone());
        let output = output.unwrap_or_else(|| self.config.project.output_dir.clone());
        let pretty = pretty || self.config.output.pretty;

        let files = self.extract_directory(&source).await?;
        std::fs::create_dir_all(&output)?;
        for file in &files {
            let target = output.join(format!("{}.json", file.module_name));
            let raw = self.serialize(file, pretty)?;
            std::fs::write(&target, raw)?;
        }
        info!(
            "Extracted {} modules from {} into {}",
            files.len(),
            source.display(),
            output.display()
        );
        Ok(())
    }

    /// Print one file's model to stdout.
    pub async fn dump(&self, file: PathBuf, module_name: Option<String>) -> Result<()> {
        let mut extracted = self.extract_file(&file).await?;
        if let Some(name) = module_name {
            extracted.module.name = name.clone();
            extracted.module_name = name;
        }
        println!("{}", self.serialize(&extracted, true)?);
        Ok(())
    }

    /// Walk every input and report pass/fail without writing output.
    pub async fn check(&self, source: Option<PathBuf>) -> Result<()> {
        let source = source.unwrap_or_else(|| self.config.project.source_dir.clone());
        let inputs = self.cst_inputs(&source)?;
        let total = inputs.len();
        let mut failed = 0usize;
        for path in inputs {
            match self.extract_file(&path).await {
                Ok(_) => {}
                Err(err) => {
                    failed += 1;
                    warn!("{}: {}", path.display(), err);
                }
            }
        }
        if failed > 0 {
            return Err(DocsmithError::Check(format!(
                "{failed} of {total} inputs failed"
            )));
        }
        info!("All {} inputs extracted cleanly", total);
        Ok(())
    }

    /// Extract all CST inputs in a directory, skipping files that fail.
    pub async fn extract_directory(&self, dir: &Path) -> Result<Vec<ExtractedFile>> {
        let mut extracted = Vec::new();
        for path in self.cst_inputs(dir)? {
            match self.extract_file(&path).await {
                Ok(file) => extracted.push(file),
                Err(err) => warn!("skipping {}: {}", path.display(), err),
            }
        }
        Ok(extracted)
    }

    /// Extract a single CST input.
    pub async fn extract_file(&self, path: &Path) -> Result<ExtractedFile> {
        let raw = std::fs::read_to_string(path)?;
        if raw.len() > self.config.extraction.max_file_size {
            return Err(DocsmithError::Input(format!(
                "{} exceeds the maximum input size",
                path.display()
            )));
        }
        let content_hash = calculate_hash(&raw);
        let cst: CstNode = serde_json::from_str(&raw)?;
        let tree = SyntaxTree::from_cst(cst);
        let module_name = module_name_from_path(path);

        let mut walker = Walker::new(path.to_path_buf());
        let module = walker.walk_module(&tree, &module_name)?;

        Ok(ExtractedFile {
            path: path.to_path_buf(),
            module_name,
            content_hash,
            generated_at: Utc::now(),
            module,
        })
    }

    /// Candidate inputs under `dir`, honoring gitignore rules.
    fn cst_inputs(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        let walker = WalkBuilder::new(dir).hidden(false).git_ignore(true).build();
        for entry in walker {
            let entry = entry.map_err(|e| DocsmithError::FileSystem(e.to_string()))?;
            let path = entry.path();
            if path.is_file() && self.should_extract(path) {
                paths.push(path.to_path_buf());
            }
        }
        paths.sort();
        Ok(paths)
    }

    fn should_extract(&self, path: &Path) -> bool {
        let suffix = format!(".{}", self.config.extraction.cst_suffix);
        path.file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.ends_with(&suffix))
            .unwrap_or(false)
    }

    fn serialize(&self, file: &ExtractedFile, pretty: bool) -> Result<String> {
        let value = if self.config.output.include_metadata {
            serde_json::to_value(file)?
        } else {
            serde_json::to_value(&file.module)?
        };
        let raw = if pretty {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        };
        Ok(raw)
    }
}

/// Module name from the file stem; a trailing `.cst` component from the
/// conventional `name.cst.json` naming is stripped.
fn module_name_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("module");
    stem.strip_suffix(".cst").unwrap_or(stem).to_string()
}

/// SHA-256 hex digest of the input text.
fn calculate_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
