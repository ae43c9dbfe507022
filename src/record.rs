//! Organism and protein records as delivered by the IEDB source
use std::fmt::Display;

use smallvec::SmallVec;

use crate::{OntieError, OntieResult, DEFAULT_NUM_PARENTS};

/// The two kinds of IEDB records that are turned into ONTIE classes
///
/// The kind selects the mapping table, the Knotation template and
/// the layout of the index label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// An IEDB taxon (organism id `>= 10000000`)
    Organism,
    /// An IEDB source protein
    Protein,
}

impl RecordKind {
    /// Both kinds, in the order in which a full run processes them
    pub fn all() -> &'static [RecordKind] {
        &[RecordKind::Organism, RecordKind::Protein]
    }

    /// Name of the Knotation template used for stanzas of this kind
    pub fn template(&self) -> &'static str {
        match self {
            RecordKind::Organism => "taxon class",
            RecordKind::Protein => "protein class",
        }
    }

    /// Header of the mapping table of this kind
    pub fn mapping_header(&self) -> &'static str {
        match self {
            RecordKind::Organism => "TAX_ID\tCURIE\tLABEL",
            RecordKind::Protein => "SOURCE_ID\tCURIE\tNAME",
        }
    }
}

impl Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Organism => write!(f, "organism"),
            RecordKind::Protein => write!(f, "protein"),
        }
    }
}

/// Removes surrounding whitespace and replaces tabs with spaces
///
/// Every label that ends up in a TSV table or in a stanza must pass
/// through this function first.
///
/// # Examples
///
/// ```
/// use ontie::record::clean_name;
///
/// assert_eq!(clean_name(" Mus\tmusculus "), "Mus musculus");
/// ```
pub fn clean_name(name: &str) -> String {
    name.trim().replace('\t', " ")
}

/// A new IEDB taxon, joined with the label of its primary parent
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrganismRecord {
    /// IEDB organism id
    pub organism_id: u32,
    /// Organism name, uncleaned
    pub label: String,
    /// Taxonomic rank, if known
    pub rank: Option<String>,
    /// Id of the primary parent
    pub parent_tax_id: u32,
    /// Comma separated ids of all parents
    pub parents: String,
    /// Name of the primary parent, uncleaned
    pub parent: String,
}

impl OrganismRecord {
    /// Returns the ids listed in [`OrganismRecord::parents`]
    ///
    /// A single parent does not count as multiple parents and
    /// yields an empty list.
    ///
    /// # Errors
    ///
    /// [`OntieError::InvalidInput`] if one of the ids is not numeric
    pub fn additional_parent_ids(&self) -> OntieResult<SmallVec<[u32; DEFAULT_NUM_PARENTS]>> {
        if !self.parents.contains(',') {
            return Ok(SmallVec::new());
        }
        self.parents
            .split(',')
            .map(|id| {
                id.trim().parse::<u32>().map_err(|_| {
                    OntieError::InvalidInput(format!(
                        "parent list of {}: {}",
                        self.organism_id, self.parents
                    ))
                })
            })
            .collect()
    }
}

/// A new IEDB source protein
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProteinRecord {
    /// IEDB source id
    pub source_id: u32,
    /// Protein name, uncleaned
    pub name: String,
    /// Comma separated aliases
    pub aliases: Option<String>,
    /// Comma separated synonyms
    pub synonyms: Option<String>,
    /// Id of the source organism
    pub organism_id: u32,
    /// Name of the source organism, uncleaned
    pub organism: String,
}

impl ProteinRecord {
    /// Returns all aliases followed by all synonyms, cleaned and without blanks
    pub fn alternative_terms(&self) -> Vec<String> {
        [self.aliases.as_deref(), self.synonyms.as_deref()]
            .into_iter()
            .flatten()
            .flat_map(|terms| terms.split(", "))
            .map(clean_name)
            .filter(|term| !term.is_empty())
            .collect()
    }
}

/// A record of either kind
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Record {
    /// See [`OrganismRecord`]
    Organism(OrganismRecord),
    /// See [`ProteinRecord`]
    Protein(ProteinRecord),
}

impl Record {
    /// The [`RecordKind`] of the record
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Organism(_) => RecordKind::Organism,
            Record::Protein(_) => RecordKind::Protein,
        }
    }

    /// The external key, i.e. the organism id or the source id
    pub fn key(&self) -> u32 {
        match self {
            Record::Organism(org) => org.organism_id,
            Record::Protein(prot) => prot.source_id,
        }
    }

    /// The cleaned stanza label
    pub fn label(&self) -> String {
        match self {
            Record::Organism(org) => clean_name(&org.label),
            Record::Protein(prot) => clean_name(&prot.name),
        }
    }

    /// The cleaned label of the parent class
    ///
    /// For organisms this is the primary parent taxon, for proteins
    /// the source organism.
    pub fn parent_label(&self) -> String {
        match self {
            Record::Organism(org) => clean_name(&org.parent),
            Record::Protein(prot) => clean_name(&prot.organism),
        }
    }

    /// The external key of the parent class
    pub fn parent_key(&self) -> u32 {
        match self {
            Record::Organism(org) => org.parent_tax_id,
            Record::Protein(prot) => prot.organism_id,
        }
    }

    /// The label written to the index table
    ///
    /// Proteins are qualified with their organism, since the same
    /// protein name occurs in many organisms.
    pub fn index_label(&self) -> String {
        match self {
            Record::Organism(_) => self.label(),
            Record::Protein(_) => format!("{} ({})", self.label(), self.parent_label()),
        }
    }

    /// Ensures that the record can be turned into a stanza
    ///
    /// # Errors
    ///
    /// [`OntieError::MissingField`] if the label or the parent label is
    /// empty after cleaning
    pub fn validate(&self) -> OntieResult<()> {
        if self.label().is_empty() {
            return Err(OntieError::MissingField {
                key: self.key(),
                field: "label",
            });
        }
        if self.parent_label().is_empty() {
            return Err(OntieError::MissingField {
                key: self.key(),
                field: match self.kind() {
                    RecordKind::Organism => "parent",
                    RecordKind::Protein => "organism",
                },
            });
        }
        Ok(())
    }
}

impl From<OrganismRecord> for Record {
    fn from(org: OrganismRecord) -> Self {
        Record::Organism(org)
    }
}

impl From<ProteinRecord> for Record {
    fn from(prot: ProteinRecord) -> Self {
        Record::Protein(prot)
    }
}
