//! Index of IEDB records that already have an `ONTIE:` class
//!
//! The index is backed by one mapping table per [`RecordKind`]:
//!
//! ```text
//! TAX_ID    CURIE          LABEL
//! 10000005  ONTIE:0000001  Mus musculus BALB/c
//! ```
//!
//! ```text
//! SOURCE_ID  CURIE          NAME
//! 139        ONTIE:0000512  Envelope glycoprotein gp160
//! ```
use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use crate::parser;
use crate::record::RecordKind;
use crate::{OntieError, OntieId, OntieResult};

/// Maps external keys to their assigned [`OntieId`]
#[derive(Debug)]
pub struct KnownRecords {
    kind: RecordKind,
    ids: HashMap<u32, OntieId>,
}

impl KnownRecords {
    /// Constructs an empty index
    pub fn new(kind: RecordKind) -> Self {
        Self {
            kind,
            ids: HashMap::new(),
        }
    }

    /// Loads the index from the mapping table at `path`
    ///
    /// The first line is the header and is skipped. A missing table
    /// is created with the header of `kind`.
    ///
    /// # Errors
    ///
    /// - [`OntieError::MalformedTable`]: A row does not have exactly three columns or an unparseable key or CURIE
    /// - [`OntieError::ConflictingMapping`]: A key is mapped to two different CURIEs
    /// - [`OntieError::CannotOpenFile`]: The table can't be read or created
    pub fn load<P: AsRef<Path>>(path: P, kind: RecordKind) -> OntieResult<Self> {
        let path = path.as_ref();
        let mut known = Self::new(kind);
        if !path.exists() {
            debug!("No {} mapping at {}", kind, path.display());
            parser::ensure_table(path, kind.mapping_header())?;
            return Ok(known);
        }

        let table = path.display().to_string();
        let mut reader = parser::open(path)?;
        parser::remove_header(&mut reader, &table)?;
        for line in parser::rows(reader, &table) {
            let line = line?;
            let (key, id) = mapping_line(&line, &table)?;
            known.insert(key, id)?;
        }
        info!("Loaded {} known {} records", known.len(), kind);
        Ok(known)
    }

    /// The [`RecordKind`] of the indexed records
    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Returns `true` if the external key already has a CURIE
    pub fn is_known(&self, key: u32) -> bool {
        self.ids.contains_key(&key)
    }

    /// Returns the CURIE of the external key, if any
    pub fn get(&self, key: u32) -> Option<OntieId> {
        self.ids.get(&key).copied()
    }

    /// Registers a new mapping
    ///
    /// Registering the identical mapping twice is a no-op.
    ///
    /// # Errors
    ///
    /// [`OntieError::ConflictingMapping`] if the key is mapped to a different CURIE
    pub fn insert(&mut self, key: u32, id: OntieId) -> OntieResult<()> {
        match self.ids.get(&key) {
            Some(first) if *first != id => Err(OntieError::ConflictingMapping {
                key,
                first: *first,
                second: id,
            }),
            Some(_) => Ok(()),
            None => {
                self.ids.insert(key, id);
                Ok(())
            }
        }
    }

    /// The highest CURIE in the index
    pub fn max_id(&self) -> Option<OntieId> {
        self.ids.values().max().copied()
    }

    /// The number of known records
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if no record is known
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Parses a single row of a mapping table
fn mapping_line(line: &str, table: &str) -> OntieResult<(u32, OntieId)> {
    let malformed = || OntieError::MalformedTable {
        table: table.to_string(),
        line: line.to_string(),
    };
    let [key, curie, _label] = parser::split_row::<3>(line, table)?;
    let key = key.trim().parse::<u32>().map_err(|_| malformed())?;
    let id = OntieId::try_from(curie.trim()).map_err(|_| malformed())?;
    Ok((key, id))
}

/// Formats a row of a mapping table
pub(crate) fn mapping_row(key: u32, id: OntieId, label: &str) -> String {
    format!("{key}\t{id}\t{label}")
}
