//! Issues new sequential `ONTIE:` identifiers
use std::path::Path;

use tracing::{debug, info};

use crate::parser;
use crate::{OntieError, OntieId, OntieResult, OWL_CLASS};

/// Header of the index table
pub const INDEX_HEADER: &str = "CURIE\tlabel\ttype\tobsolete\treplacement";

/// Hands out new [`OntieId`]s
///
/// The registry only knows the most recently issued identifier. It is
/// seeded from the last row of the index table, so it must be loaded
/// before anything else is written to that table.
///
/// # Examples
///
/// ```
/// use ontie::registry::IdentifierRegistry;
/// use ontie::OntieId;
///
/// let mut registry = IdentifierRegistry::starting_after(OntieId::from(41u32));
/// assert_eq!(registry.next_id().unwrap().to_string(), "ONTIE:0000042");
/// assert_eq!(registry.next_id().unwrap().to_string(), "ONTIE:0000043");
/// assert_eq!(registry.issued(), 2);
/// ```
#[derive(Debug, Default)]
pub struct IdentifierRegistry {
    last: OntieId,
    issued: usize,
}

impl IdentifierRegistry {
    /// Constructs a registry whose first identifier follows `last`
    pub fn starting_after(last: OntieId) -> Self {
        Self { last, issued: 0 }
    }

    /// Seeds the registry from the index table at `path`
    ///
    /// A missing table is created with its header and the registry starts
    /// at zero. The same applies to a table that holds only its header.
    ///
    /// # Errors
    ///
    /// - [`OntieError::MalformedIndex`]: The first column of the last row is not an `ONTIE:` CURIE
    /// - [`OntieError::CannotOpenFile`]: The table can't be read or created
    pub fn load<P: AsRef<Path>>(path: P) -> OntieResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No index table at {}", path.display());
            parser::ensure_table(path, INDEX_HEADER)?;
            return Ok(Self::default());
        }

        let last = match parser::last_row(path)? {
            None => OntieId::default(),
            Some(row) => last_id_from_row(&row)?,
        };
        info!("Last ID: {}", last);
        Ok(Self::starting_after(last))
    }

    /// The most recently issued identifier
    pub fn last(&self) -> OntieId {
        self.last
    }

    /// The number of identifiers issued since the registry was created
    pub fn issued(&self) -> usize {
        self.issued
    }

    /// Issues the next identifier
    ///
    /// # Errors
    ///
    /// [`OntieError::InvalidInput`] if the identifier space is exhausted
    pub fn next_id(&mut self) -> OntieResult<OntieId> {
        self.last = self.last.successor()?;
        self.issued += 1;
        Ok(self.last)
    }
}

fn last_id_from_row(row: &str) -> OntieResult<OntieId> {
    if row == INDEX_HEADER {
        return Ok(OntieId::default());
    }
    let curie = row.split('\t').next().unwrap_or_default();
    OntieId::try_from(curie).map_err(|_| OntieError::MalformedIndex(row.to_string()))
}

/// Formats a row of the index table for a new, non-obsolete class
pub(crate) fn index_row(id: OntieId, label: &str) -> String {
    format!("{id}\t{label}\t{OWL_CLASS}\t\t")
}
