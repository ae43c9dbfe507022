//! Cross references from labels to NCBI Taxonomy classes
//!
//! Knotation stanzas refer to parent classes by label. Labels of
//! NCBI Taxonomy classes are resolved through the external table:
//!
//! ```text
//! label         CURIE           type
//! Homo sapiens  NCBITaxon:9606  owl:Class
//! ```
//!
//! The column order is fixed to `label`, `CURIE`, `type` for reading and writing.
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::parser;
use crate::{OntieError, OntieResult, TaxonId, OWL_CLASS};

/// Header of the external table
pub const EXTERNAL_HEADER: &str = "label\tCURIE\ttype";

/// The external table plus all references discovered during a run
///
/// New references are collected in memory and written in a single
/// pass by [`ExternalReferences::flush`], sorted by label.
#[derive(Debug)]
pub struct ExternalReferences {
    threshold: u32,
    known: HashMap<String, String>,
    added: BTreeMap<String, TaxonId>,
}

impl ExternalReferences {
    /// Constructs an empty table
    ///
    /// Only keys below `threshold` are considered NCBI Taxonomy classes.
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            known: HashMap::new(),
            added: BTreeMap::new(),
        }
    }

    /// Loads all existing references from the table at `path`
    ///
    /// A missing table is not an error, it will be created on [`ExternalReferences::flush`].
    ///
    /// # Errors
    ///
    /// - [`OntieError::MalformedTable`]: A row does not have exactly three columns
    /// - [`OntieError::CannotOpenFile`]: The table exists but can't be read
    pub fn load<P: AsRef<Path>>(path: P, threshold: u32) -> OntieResult<Self> {
        let path = path.as_ref();
        let mut external = Self::new(threshold);
        if !path.exists() {
            debug!("No external table at {}", path.display());
            return Ok(external);
        }

        let table = path.display().to_string();
        for line in parser::rows(parser::open(path)?, &table) {
            let line = line?;
            if line == EXTERNAL_HEADER {
                continue;
            }
            let [label, curie, _rdf_type] = parser::split_row::<3>(&line, &table)?;
            external.known.insert(label.to_string(), curie.to_string());
        }
        info!("Loaded {} external classes", external.known.len());
        Ok(external)
    }

    /// Returns `true` if the label is present, either on disk or added during this run
    pub fn contains(&self, label: &str) -> bool {
        self.known.contains_key(label) || self.added.contains_key(label)
    }

    /// Registers `label` as NCBI Taxonomy class `key`, if it is new
    ///
    /// Returns `true` if the reference was added. Keys at or above the
    /// threshold are local IEDB taxa and never become references.
    pub fn consider(&mut self, label: &str, key: u32) -> bool {
        if key >= self.threshold || self.contains(label) {
            return false;
        }
        debug!("New external class {}: {}", TaxonId::from(key), label);
        self.added.insert(label.to_string(), TaxonId::from(key));
        true
    }

    /// Iterates all references added during this run, sorted by label
    pub fn added(&self) -> impl Iterator<Item = (&str, TaxonId)> {
        self.added.iter().map(|(label, id)| (label.as_str(), *id))
    }

    /// The number of references loaded from disk
    pub fn len(&self) -> usize {
        self.known.len()
    }

    /// Returns `true` if no reference was loaded from disk
    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Appends all added references to the table at `path`
    ///
    /// Returns the number of written rows. Afterwards the references
    /// count as loaded, so flushing again writes nothing.
    ///
    /// # Errors
    ///
    /// [`OntieError::CannotOpenFile`] if the table can't be opened or created
    pub fn flush<P: AsRef<Path>>(&mut self, path: P) -> OntieResult<usize> {
        if self.added.is_empty() {
            return Ok(0);
        }
        let mut writer = parser::open_append(path, Some(EXTERNAL_HEADER))?;
        let added = std::mem::take(&mut self.added);
        for (label, id) in &added {
            writeln!(writer, "{}", external_row(label, &id.to_string()))?;
        }
        writer.flush()?;

        let count = added.len();
        self.known
            .extend(added.into_iter().map(|(label, id)| (label, id.to_string())));
        info!("{} new external classes added", count);
        Ok(count)
    }

    /// Rewrites the table at `path` from scratch
    ///
    /// The table starts with the header, followed by all rows of the
    /// manually curated table `manual` and then by `parents`, sorted by
    /// label. Parents whose label already occurs in the manual rows are
    /// skipped. If a label occurs more than once in `parents`, the last
    /// occurrence wins.
    ///
    /// Returns the number of rows written, excluding the header.
    ///
    /// # Errors
    ///
    /// - [`OntieError::MalformedTable`]: A manual row does not have exactly three columns
    /// - [`OntieError::CannotOpenFile`]: A file can't be read or written
    pub fn rebuild<P, Q, I>(path: P, manual: Option<Q>, parents: I) -> OntieResult<usize>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
        I: IntoIterator<Item = (String, TaxonId)>,
    {
        let mut manual_rows: Vec<String> = Vec::new();
        if let Some(manual) = manual {
            let table = manual.as_ref().display().to_string();
            for line in parser::rows(parser::open(manual)?, &table) {
                let line = line?;
                if line == EXTERNAL_HEADER {
                    continue;
                }
                parser::split_row::<3>(&line, &table)?;
                manual_rows.push(line);
            }
        }

        let mut generated: BTreeMap<String, TaxonId> = BTreeMap::new();
        for (label, id) in parents {
            generated.insert(label, id);
        }
        for row in &manual_rows {
            if let Some((label, _)) = row.split_once('\t') {
                generated.remove(label);
            }
        }

        let path = path.as_ref();
        let file = File::create(path).map_err(|err| OntieError::cannot_open(path, err))?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{EXTERNAL_HEADER}")?;
        for row in &manual_rows {
            writeln!(writer, "{row}")?;
        }
        for (label, id) in &generated {
            writeln!(writer, "{}", external_row(label, &id.to_string()))?;
        }
        writer.flush()?;
        Ok(manual_rows.len() + generated.len())
    }
}

fn external_row(label: &str, curie: &str) -> String {
    format!("{label}\t{curie}\t{OWL_CLASS}")
}
