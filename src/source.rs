//! Access to the IEDB curation database
//!
//! The pipeline never talks to the database directly. Everything it needs
//! is expressed by the [`RecordSource`] trait, so that the database driver
//! stays outside of this crate. [`DumpSource`] implements the trait on top
//! of tab separated exports of the relevant tables.
use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::parser;
use crate::record::{clean_name, OrganismRecord, ProteinRecord};
use crate::{OntieError, OntieResult, TaxonId};

/// Queries that the pipeline runs against the IEDB database
///
/// All methods return rows in a deterministic order, since the order of
/// records determines the order of newly assigned identifiers.
pub trait RecordSource {
    /// All `(tax_id, name)` synonyms of IEDB taxa, ordered by `tax_id`
    fn synonyms(&mut self) -> OntieResult<Vec<(u32, String)>>;

    /// All IEDB taxa without an IRI, joined with the name of their
    /// primary parent and ordered by organism id
    fn new_organisms(&mut self) -> OntieResult<Vec<OrganismRecord>>;

    /// All IEDB source proteins without an IRI that have an organism,
    /// ordered by source id
    fn new_proteins(&mut self) -> OntieResult<Vec<ProteinRecord>>;

    /// The name of the organism `id`, if it exists
    fn parent_label(&mut self, id: u32) -> OntieResult<Option<String>>;

    /// `(label, id)` of every NCBI Taxonomy class that is the parent of an
    /// IEDB taxon or the organism of an IEDB source protein
    fn external_parents(&mut self) -> OntieResult<Vec<(String, TaxonId)>>;
}

/// File names of the table exports inside the dump directory
pub const ORGANISM_TABLE: &str = "organism.tsv";
/// See [`ORGANISM_TABLE`]
pub const SOURCE_TABLE: &str = "source.tsv";
/// See [`ORGANISM_TABLE`]
pub const NAMES_TABLE: &str = "names.tsv";

#[derive(Debug, Clone)]
struct OrganismRow {
    name: String,
    rank: Option<String>,
    parent_tax_id: Option<u32>,
    parents: String,
    iri: Option<String>,
}

#[derive(Debug, Clone)]
struct SourceRow {
    source_id: u32,
    database: String,
    name: String,
    aliases: Option<String>,
    synonyms: Option<String>,
    organism_id: Option<u32>,
    organism_name: Option<String>,
    iri: Option<String>,
}

#[derive(Debug, Clone)]
struct NameRow {
    tax_id: u32,
    name: String,
    name_class: String,
}

/// A [`RecordSource`] backed by tab separated table exports
///
/// The dump directory holds one file per table, each with a header row.
/// Empty cells are `NULL`.
///
/// ```text
/// organism.tsv: organism_id  organism_name  rank  parent_tax_id  parent_tax_id_string  iri
/// source.tsv:   source_id  database  name  aliases  synonyms  organism_id  organism_name  iri
/// names.tsv:    tax_id  name_txt  name_class
/// ```
#[derive(Debug, Default)]
pub struct DumpSource {
    threshold: u32,
    organisms: BTreeMap<u32, OrganismRow>,
    sources: Vec<SourceRow>,
    names: Vec<NameRow>,
}

impl DumpSource {
    /// Reads all tables from the dump directory of `config`
    ///
    /// # Errors
    ///
    /// - [`OntieError::CannotOpenFile`]: The dump directory or one of the tables does not exist
    /// - [`OntieError::MalformedTable`]: A table row has the wrong number of columns or an invalid id
    pub fn open(config: &Config) -> OntieResult<Self> {
        let dir = config.dump_dir();
        if !dir.is_dir() {
            return Err(OntieError::not_found(dir));
        }
        let missing = missing_tables(dir);
        if !missing.is_empty() {
            return Err(OntieError::not_found(format!(
                "{} (missing {})",
                dir.display(),
                missing.join(", ")
            )));
        }
        info!("Reading IEDB tables from {}", dir.display());
        let source = Self::from_readers(
            parser::open(dir.join(ORGANISM_TABLE))?,
            parser::open(dir.join(SOURCE_TABLE))?,
            parser::open(dir.join(NAMES_TABLE))?,
            config.threshold(),
        )?;
        Ok(source)
    }

    /// Reads all tables from the given readers
    ///
    /// # Errors
    ///
    /// [`OntieError::MalformedTable`] if a row has the wrong number of columns or an invalid id
    pub fn from_readers<A: BufRead, B: BufRead, C: BufRead>(
        mut organisms: A,
        mut sources: B,
        mut names: C,
        threshold: u32,
    ) -> OntieResult<Self> {
        let mut dump = Self {
            threshold,
            ..Default::default()
        };

        parser::remove_header(&mut organisms, ORGANISM_TABLE)?;
        for line in parser::rows(organisms, ORGANISM_TABLE) {
            let line = line?;
            let (id, row) = organism_line(&line)?;
            if dump.organisms.insert(id, row).is_some() {
                warn!("Organism {} is listed more than once", id);
            }
        }

        parser::remove_header(&mut sources, SOURCE_TABLE)?;
        for line in parser::rows(sources, SOURCE_TABLE) {
            dump.sources.push(source_line(&line?)?);
        }

        parser::remove_header(&mut names, NAMES_TABLE)?;
        for line in parser::rows(names, NAMES_TABLE) {
            dump.names.push(name_line(&line?)?);
        }

        debug!(
            "Read {} organisms, {} sources, {} names",
            dump.organisms.len(),
            dump.sources.len(),
            dump.names.len()
        );
        Ok(dump)
    }

    fn iedb_sources(&self) -> impl Iterator<Item = &SourceRow> {
        self.sources.iter().filter(|src| src.database == "IEDB")
    }
}

impl RecordSource for DumpSource {
    fn synonyms(&mut self) -> OntieResult<Vec<(u32, String)>> {
        let mut res: Vec<(u32, String)> = self
            .names
            .iter()
            .filter(|name| name.name_class == "synonym" && name.tax_id >= self.threshold)
            .map(|name| (name.tax_id, name.name.clone()))
            .collect();
        res.sort_by_key(|(tax_id, _)| *tax_id);
        Ok(res)
    }

    fn new_organisms(&mut self) -> OntieResult<Vec<OrganismRecord>> {
        let mut res = Vec::new();
        for (id, org) in self.organisms.range(self.threshold..) {
            if org.iri.is_some() {
                continue;
            }
            let Some(parent_tax_id) = org.parent_tax_id else {
                debug!("Organism {} has no parent", id);
                continue;
            };
            let Some(parent) = self.organisms.get(&parent_tax_id) else {
                debug!("Parent {} of organism {} does not exist", parent_tax_id, id);
                continue;
            };
            res.push(OrganismRecord {
                organism_id: *id,
                label: org.name.clone(),
                rank: org.rank.clone(),
                parent_tax_id,
                parents: org.parents.clone(),
                parent: parent.name.clone(),
            });
        }
        Ok(res)
    }

    fn new_proteins(&mut self) -> OntieResult<Vec<ProteinRecord>> {
        let mut res: Vec<ProteinRecord> = self
            .iedb_sources()
            .filter(|src| src.iri.is_none())
            .filter_map(|src| match (src.organism_id, &src.organism_name) {
                (Some(organism_id), Some(organism)) => Some(ProteinRecord {
                    source_id: src.source_id,
                    name: src.name.clone(),
                    aliases: src.aliases.clone(),
                    synonyms: src.synonyms.clone(),
                    organism_id,
                    organism: organism.clone(),
                }),
                _ => None,
            })
            .collect();
        res.sort_by_key(|prot| prot.source_id);
        Ok(res)
    }

    fn parent_label(&mut self, id: u32) -> OntieResult<Option<String>> {
        Ok(self.organisms.get(&id).map(|org| org.name.clone()))
    }

    fn external_parents(&mut self) -> OntieResult<Vec<(String, TaxonId)>> {
        let mut res = Vec::new();
        for org in self.organisms.range(self.threshold..).map(|(_, org)| org) {
            let Some(parent_tax_id) = org.parent_tax_id else {
                continue;
            };
            if parent_tax_id >= self.threshold {
                continue;
            }
            if let Some(parent) = self.organisms.get(&parent_tax_id) {
                res.push((clean_name(&parent.name), TaxonId::from(parent_tax_id)));
            }
        }
        for src in self.iedb_sources() {
            if let (Some(organism_id), Some(organism)) = (src.organism_id, &src.organism_name) {
                if organism_id < self.threshold {
                    res.push((clean_name(organism), TaxonId::from(organism_id)));
                }
            }
        }
        Ok(res)
    }
}

fn malformed(table: &str, line: &str) -> OntieError {
    OntieError::MalformedTable {
        table: table.to_string(),
        line: line.to_string(),
    }
}

fn parse_id(cell: &str, table: &str, line: &str) -> OntieResult<u32> {
    cell.trim().parse::<u32>().map_err(|_| malformed(table, line))
}

fn parse_nullable_id(cell: &str, table: &str, line: &str) -> OntieResult<Option<u32>> {
    parser::nullable(cell)
        .map(|cell| parse_id(cell, table, line))
        .transpose()
}

fn owned(cell: &str) -> Option<String> {
    parser::nullable(cell).map(str::to_string)
}

/// Parses a single row of `organism.tsv`
fn organism_line(line: &str) -> OntieResult<(u32, OrganismRow)> {
    let [id, name, rank, parent_tax_id, parents, iri] =
        parser::split_row::<6>(line, ORGANISM_TABLE)?;
    Ok((
        parse_id(id, ORGANISM_TABLE, line)?,
        OrganismRow {
            name: name.to_string(),
            rank: owned(rank),
            parent_tax_id: parse_nullable_id(parent_tax_id, ORGANISM_TABLE, line)?,
            parents: parents.trim().to_string(),
            iri: owned(iri),
        },
    ))
}

/// Parses a single row of `source.tsv`
fn source_line(line: &str) -> OntieResult<SourceRow> {
    let [source_id, database, name, aliases, synonyms, organism_id, organism_name, iri] =
        parser::split_row::<8>(line, SOURCE_TABLE)?;
    Ok(SourceRow {
        source_id: parse_id(source_id, SOURCE_TABLE, line)?,
        database: database.trim().to_string(),
        name: name.to_string(),
        aliases: owned(aliases),
        synonyms: owned(synonyms),
        organism_id: parse_nullable_id(organism_id, SOURCE_TABLE, line)?,
        organism_name: owned(organism_name),
        iri: owned(iri),
    })
}

/// Parses a single row of `names.tsv`
fn name_line(line: &str) -> OntieResult<NameRow> {
    let [tax_id, name, name_class] = parser::split_row::<3>(line, NAMES_TABLE)?;
    Ok(NameRow {
        tax_id: parse_id(tax_id, NAMES_TABLE, line)?,
        name: name.to_string(),
        name_class: name_class.trim().to_string(),
    })
}

/// Loads synonyms into a lookup from `tax_id` to all its synonyms
///
/// The order of synonyms per taxon is the order of the source.
pub fn synonym_lookup<S: RecordSource + ?Sized>(
    source: &mut S,
) -> OntieResult<BTreeMap<u32, Vec<String>>> {
    let mut lookup: BTreeMap<u32, Vec<String>> = BTreeMap::new();
    for (tax_id, name) in source.synonyms()? {
        let name = clean_name(&name);
        if name.is_empty() {
            continue;
        }
        lookup.entry(tax_id).or_default().push(name);
    }
    Ok(lookup)
}

/// Returns the tables that are not present in the dump directory
fn missing_tables(dir: &Path) -> Vec<&'static str> {
    [ORGANISM_TABLE, SOURCE_TABLE, NAMES_TABLE]
        .into_iter()
        .filter(|table| !dir.join(table).is_file())
        .collect()
}
