//! Knotation stanzas for new ONTIE classes
use std::fmt::Display;

use crate::record::{clean_name, Record};
use crate::OntieId;

/// A single Knotation stanza describing one new class
///
/// Formatting is pure: the stanza only borrows the record and all
/// lookups (synonyms and additional superclasses) must be resolved
/// beforehand.
///
/// The layout depends on the [`RecordKind`](`crate::RecordKind`):
///
/// ```text
/// : ONTIE:0000001
/// apply template: taxon class
///  label: Mus musculus BALB/c
///  parent taxon: Mus musculus
/// subclass of: Mus
/// alternative term: BALB/c mouse
/// rank: subspecies
///
/// : ONTIE:0000002
/// apply template: protein class
///  label: Spike glycoprotein
///  taxon: Severe acute respiratory syndrome coronavirus 2
/// alternative term: S
///
/// ```
///
/// # Examples
///
/// ```
/// use ontie::{OntieId, OrganismRecord, Record, Stanza};
///
/// let record = Record::from(OrganismRecord {
///     organism_id: 10000005,
///     label: " Mus\tmusculus ".to_string(),
///     rank: Some("species".to_string()),
///     parent_tax_id: 9606,
///     parents: "9606".to_string(),
///     parent: "Homo sapiens".to_string(),
/// });
///
/// let stanza = Stanza::new(OntieId::from(1u32), &record).to_string();
/// assert_eq!(
///     stanza,
///     ": ONTIE:0000001\n\
///      apply template: taxon class\n \
///      label: Mus musculus\n \
///      parent taxon: Homo sapiens\n\
///      rank: species\n\n"
/// );
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Stanza<'a> {
    id: OntieId,
    record: &'a Record,
    synonyms: &'a [String],
    superclasses: &'a [String],
}

impl<'a> Stanza<'a> {
    /// Constructs a stanza without synonyms or additional superclasses
    pub fn new(id: OntieId, record: &'a Record) -> Self {
        Self {
            id,
            record,
            synonyms: &[],
            superclasses: &[],
        }
    }

    /// Adds synonyms, written as `alternative term` lines
    ///
    /// Protein records carry their own aliases and synonyms, which
    /// are always written before these.
    pub fn with_synonyms(mut self, synonyms: &'a [String]) -> Self {
        self.synonyms = synonyms;
        self
    }

    /// Adds the labels of additional parent classes, written as `subclass of` lines
    pub fn with_superclasses(mut self, superclasses: &'a [String]) -> Self {
        self.superclasses = superclasses;
        self
    }

    /// The identifier of the described class
    pub fn id(&self) -> OntieId {
        self.id
    }
}

impl Display for Stanza<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, ": {}", self.id)?;
        writeln!(f, "apply template: {}", self.record.kind().template())?;
        writeln!(f, " label: {}", self.record.label())?;

        match self.record {
            Record::Organism(_) => {
                writeln!(f, " parent taxon: {}", self.record.parent_label())?;
            }
            Record::Protein(_) => {
                writeln!(f, " taxon: {}", self.record.parent_label())?;
            }
        }

        for superclass in self.superclasses {
            writeln!(f, "subclass of: {}", superclass)?;
        }

        if let Record::Protein(prot) = self.record {
            for term in prot.alternative_terms() {
                writeln!(f, "alternative term: {}", term)?;
            }
        }
        for synonym in self.synonyms {
            writeln!(f, "alternative term: {}", synonym)?;
        }

        if let Record::Organism(org) = self.record {
            if let Some(rank) = org.rank.as_deref().map(clean_name) {
                if !rank.is_empty() {
                    writeln!(f, "rank: {}", rank)?;
                }
            }
        }

        writeln!(f)
    }
}
