//! Location of all tables and the IEDB dump of a run
use std::path::{Path, PathBuf};

use crate::record::RecordKind;
use crate::{OntieError, OntieResult, EXTERNAL_NAMESPACE_THRESHOLD};

/// Default location of the index table, relative to the workspace root
pub const INDEX_PATH: &str = "ontology/index.tsv";
/// Default location of the external table, relative to the workspace root
pub const EXTERNAL_PATH: &str = "ontology/external.tsv";
/// Default location of the manually curated external table
pub const MANUAL_EXTERNAL_PATH: &str = "ontology/external_manual.tsv";
/// Default location of the Knotation source, relative to the workspace root
pub const ONTOLOGY_PATH: &str = "ontology/ontie.kn";
/// Default location of the organism mapping table, relative to the workspace root
pub const ORGANISM_MAP_PATH: &str = "organism_map.tsv";
/// Default location of the protein mapping table, relative to the workspace root
pub const SOURCE_MAP_PATH: &str = "source_map.tsv";

/// Configuration of a pipeline run
///
/// All table paths are resolved relative to the workspace root,
/// unless they are absolute.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use ontie::{Config, RecordKind};
///
/// let config = Config::new("/data/ontie", "/data/dump").with_threshold(20_000_000);
/// assert_eq!(config.index_path(), Path::new("/data/ontie/ontology/index.tsv"));
/// assert_eq!(config.mapping_path(RecordKind::Protein), Path::new("/data/ontie/source_map.tsv"));
/// assert_eq!(config.threshold(), 20_000_000);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    dump_dir: PathBuf,
    threshold: u32,
    index: PathBuf,
    external: PathBuf,
    manual_external: PathBuf,
    manual_required: bool,
    ontology: PathBuf,
    organism_map: PathBuf,
    source_map: PathBuf,
}

impl Config {
    /// Constructs a configuration with the default table layout
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(root: P, dump_dir: Q) -> Self {
        Self {
            root: root.into(),
            dump_dir: dump_dir.into(),
            threshold: EXTERNAL_NAMESPACE_THRESHOLD,
            index: INDEX_PATH.into(),
            external: EXTERNAL_PATH.into(),
            manual_external: MANUAL_EXTERNAL_PATH.into(),
            manual_required: false,
            ontology: ONTOLOGY_PATH.into(),
            organism_map: ORGANISM_MAP_PATH.into(),
            source_map: SOURCE_MAP_PATH.into(),
        }
    }

    /// Sets the first organism id that belongs to IEDB instead of NCBI Taxonomy
    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Overrides the location of the index table
    pub fn with_index<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.index = path.into();
        self
    }

    /// Overrides the location of the external table
    pub fn with_external<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.external = path.into();
        self
    }

    /// Overrides the location of the manually curated external table
    ///
    /// Unlike the default location, an explicitly set table must exist.
    pub fn with_manual_external<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.manual_external = path.into();
        self.manual_required = true;
        self
    }

    /// Overrides the location of the Knotation source
    pub fn with_ontology<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.ontology = path.into();
        self
    }

    /// Overrides the location of the mapping table of `kind`
    pub fn with_mapping<P: Into<PathBuf>>(mut self, kind: RecordKind, path: P) -> Self {
        match kind {
            RecordKind::Organism => self.organism_map = path.into(),
            RecordKind::Protein => self.source_map = path.into(),
        }
        self
    }

    /// The workspace root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The directory with the IEDB table exports
    pub fn dump_dir(&self) -> &Path {
        &self.dump_dir
    }

    /// The first organism id that belongs to IEDB
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Path of the index table
    pub fn index_path(&self) -> PathBuf {
        self.root.join(&self.index)
    }

    /// Path of the external table
    pub fn external_path(&self) -> PathBuf {
        self.root.join(&self.external)
    }

    /// Path of the manually curated external table
    pub fn manual_external_path(&self) -> PathBuf {
        self.root.join(&self.manual_external)
    }

    /// Returns `true` if the manually curated external table was set explicitly
    pub fn manual_external_required(&self) -> bool {
        self.manual_required
    }

    /// Path of the Knotation source
    pub fn ontology_path(&self) -> PathBuf {
        self.root.join(&self.ontology)
    }

    /// Path of the mapping table of `kind`
    pub fn mapping_path(&self, kind: RecordKind) -> PathBuf {
        match kind {
            RecordKind::Organism => self.root.join(&self.organism_map),
            RecordKind::Protein => self.root.join(&self.source_map),
        }
    }

    /// Checks that all tables can be created
    ///
    /// # Errors
    ///
    /// - [`OntieError::CannotOpenFile`]: The root or the directory of a table does not exist
    /// - [`OntieError::InvalidInput`]: The threshold is zero
    pub fn validate(&self) -> OntieResult<()> {
        if self.threshold == 0 {
            return Err(OntieError::InvalidInput(
                "the external namespace threshold must be positive".to_string(),
            ));
        }
        if !self.root.is_dir() {
            return Err(OntieError::not_found(&self.root));
        }
        let tables = [
            self.index_path(),
            self.external_path(),
            self.ontology_path(),
            self.mapping_path(RecordKind::Organism),
            self.mapping_path(RecordKind::Protein),
        ];
        for table in &tables {
            match table.parent() {
                Some(dir) if !dir.as_os_str().is_empty() && !dir.is_dir() => {
                    return Err(OntieError::not_found(dir));
                }
                _ => (),
            }
        }
        Ok(())
    }
}
