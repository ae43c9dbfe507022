//! Curation pipeline for ONTIE, the ontology of IEDB taxa and source proteins
//!
//! IEDB mints its own organism ids (starting at [`EXTERNAL_NAMESPACE_THRESHOLD`])
//! and tracks source proteins that are not part of any public ontology.
//! This crate assigns stable `ONTIE:` CURIEs to these records, keeps the
//! persisted mapping tables in sync and writes one Knotation stanza for
//! every new class.
//!
//! A run is idempotent: records whose external key is already present in a
//! mapping table are skipped, so the same source can be processed again
//! without creating duplicate classes.
//!
//! # Examples
//!
//! ```no_run
//! use ontie::{Config, DumpSource, Pipeline, RecordKind};
//!
//! let config = Config::new("/data/ontie", "/data/iedb-dump");
//! let mut source = DumpSource::open(&config).unwrap();
//! let mut pipeline = Pipeline::load(&config).unwrap();
//! let summary = pipeline.run(&mut source, RecordKind::all()).unwrap();
//! println!("{} new classes", summary.added());
//! ```
#![warn(missing_docs)]

use std::num::ParseIntError;
use std::path::Path;
use thiserror::Error;

pub mod config;
pub mod curie;
pub mod external;
pub mod known;
mod parser;
pub mod pipeline;
pub mod record;
pub mod registry;
pub mod source;
pub mod stanza;
pub mod taxdump;

pub use config::Config;
pub use curie::{OntieId, TaxonId};
pub use pipeline::{Pipeline, RunSummary};
pub use record::{OrganismRecord, ProteinRecord, Record, RecordKind};
pub use source::{DumpSource, RecordSource};
pub use stanza::Stanza;

/// Prefix of all locally minted CURIEs
pub const ONTIE_PREFIX: &str = "ONTIE";

/// Prefix of NCBI Taxonomy CURIEs
pub const NCBI_TAXON_PREFIX: &str = "NCBITaxon";

/// Organism ids at or above this value are minted by IEDB,
/// ids below belong to NCBI Taxonomy
pub const EXTERNAL_NAMESPACE_THRESHOLD: u32 = 10_000_000;

/// The `rdf:type` of every class written by this crate
pub const OWL_CLASS: &str = "owl:Class";

const DEFAULT_NUM_PARENTS: usize = 4;

/// Main Error type for this crate
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum OntieError {
    /// Failed to open or create a file
    #[error("unable to open file {path}")]
    CannotOpenFile {
        /// Path of the file or directory
        path: String,
        /// The underlying cause
        #[source]
        source: std::io::Error,
    },
    /// Failed to parse a line of input data
    #[error("invalid data: {0}")]
    InvalidInput(String),
    /// Failed to parse an integer
    #[error("unable to parse Integer")]
    ParseIntError,
    /// The last row of the index table does not hold a valid CURIE
    #[error("last row of the index table is malformed: {0}")]
    MalformedIndex(String),
    /// A persisted table contains a row with the wrong shape
    #[error("malformed row in {table}: {line}")]
    MalformedTable {
        /// Path of the table
        table: String,
        /// The offending row
        line: String,
    },
    /// An external key is mapped to two different CURIEs
    #[error("{key} is mapped to both {first} and {second}")]
    ConflictingMapping {
        /// The external key
        key: u32,
        /// The CURIE that was registered first
        first: OntieId,
        /// The CURIE of the conflicting row
        second: OntieId,
    },
    /// A source record lacks a field that every stanza requires
    #[error("record {key} has no {field}")]
    MissingField {
        /// External key of the record
        key: u32,
        /// Name of the missing field
        field: &'static str,
    },
    /// Reading or writing an already opened file failed
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<ParseIntError> for OntieError {
    fn from(_: ParseIntError) -> Self {
        OntieError::ParseIntError
    }
}

impl OntieError {
    pub(crate) fn cannot_open<P: AsRef<Path>>(path: P, source: std::io::Error) -> Self {
        OntieError::CannotOpenFile {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// A file or directory that must exist beforehand is absent
    pub(crate) fn not_found<P: AsRef<Path>>(path: P) -> Self {
        Self::cannot_open(path, std::io::Error::from(std::io::ErrorKind::NotFound))
    }
}

/// Shortcut for `Result<T, OntieError>`
pub type OntieResult<T> = Result<T, OntieError>;
