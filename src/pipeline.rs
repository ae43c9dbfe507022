//! Reconciles IEDB records with the ONTIE tables and writes new classes
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::external::ExternalReferences;
use crate::known::KnownRecords;
use crate::parser;
use crate::record::{clean_name, OrganismRecord, Record, RecordKind};
use crate::registry::{self, IdentifierRegistry, INDEX_HEADER};
use crate::source::{synonym_lookup, RecordSource};
use crate::stanza::Stanza;
use crate::{known, OntieError, OntieId, OntieResult};

type SynonymLookup = BTreeMap<u32, Vec<String>>;

/// Counts of everything a run has added
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    organisms: usize,
    proteins: usize,
    skipped: usize,
    external: usize,
}

impl RunSummary {
    /// The number of new classes of both kinds
    pub fn added(&self) -> usize {
        self.organisms + self.proteins
    }

    /// The number of new classes of `kind`
    pub fn added_of(&self, kind: RecordKind) -> usize {
        match kind {
            RecordKind::Organism => self.organisms,
            RecordKind::Protein => self.proteins,
        }
    }

    /// The number of records that already had a class
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// The number of new rows in the external table
    pub fn external(&self) -> usize {
        self.external
    }
}

/// Open append handles of all files that receive rows per record
struct Sinks<W: Write> {
    ontology: W,
    index: W,
    organisms: W,
    proteins: W,
}

impl Sinks<BufWriter<File>> {
    fn open(config: &Config) -> OntieResult<Self> {
        Ok(Self {
            ontology: parser::open_append(config.ontology_path(), None)?,
            index: parser::open_append(config.index_path(), Some(INDEX_HEADER))?,
            organisms: parser::open_append(
                config.mapping_path(RecordKind::Organism),
                Some(RecordKind::Organism.mapping_header()),
            )?,
            proteins: parser::open_append(
                config.mapping_path(RecordKind::Protein),
                Some(RecordKind::Protein.mapping_header()),
            )?,
        })
    }
}

impl<W: Write> Sinks<W> {
    fn mapping(&mut self, kind: RecordKind) -> &mut W {
        match kind {
            RecordKind::Organism => &mut self.organisms,
            RecordKind::Protein => &mut self.proteins,
        }
    }

    fn flush(&mut self) -> OntieResult<()> {
        self.ontology.flush()?;
        self.index.flush()?;
        self.organisms.flush()?;
        self.proteins.flush()?;
        Ok(())
    }
}

#[cfg_attr(doc, aquamarine::aquamarine)]
/// The state of a single curation run
///
/// A `Pipeline` owns everything that is loaded from the workspace at
/// startup: the [`IdentifierRegistry`], one [`KnownRecords`] index per
/// [`RecordKind`] and the [`ExternalReferences`].
///
/// Every record from the [`RecordSource`] passes through the following steps:
///
/// ```mermaid
/// flowchart LR
///     S[RecordSource] --> K{known?}
///     K -- yes --> X[skip]
///     K -- no --> R[IdentifierRegistry::next_id]
///     R --> E[ExternalReferences::consider]
///     E --> W[append stanza, index row, mapping row]
/// ```
///
/// New external references are written once, after all records. This
/// happens even when a record fails, so that the references of all records
/// written before it are kept.
///
/// The rows of each record are flushed before the next record starts, in
/// the order index, mapping table, stanza. If the process is killed in
/// between, the next run either skips an issued id or, if only the stanza
/// is lost, finds the record known and does not write its stanza again.
///
/// Only one run may operate on a workspace at any time.
#[derive(Debug)]
pub struct Pipeline {
    config: Config,
    registry: IdentifierRegistry,
    organisms: KnownRecords,
    proteins: KnownRecords,
    external: ExternalReferences,
}

impl Pipeline {
    /// Loads the registry, both mapping tables and the external table
    ///
    /// Missing tables are created with their headers.
    ///
    /// # Errors
    ///
    /// - [`OntieError::CannotOpenFile`]: The workspace layout of `config` is invalid
    /// - [`OntieError::MalformedIndex`]: The index table is corrupt or behind the mapping tables
    /// - [`OntieError::MalformedTable`]: A mapping or external table is corrupt
    /// - [`OntieError::ConflictingMapping`]: A mapping table assigns two CURIEs to one key
    pub fn load(config: &Config) -> OntieResult<Self> {
        config.validate()?;
        info!("Loading reference data from {}", config.root().display());

        let registry = IdentifierRegistry::load(config.index_path())?;
        let organisms = KnownRecords::load(
            config.mapping_path(RecordKind::Organism),
            RecordKind::Organism,
        )?;
        let proteins =
            KnownRecords::load(config.mapping_path(RecordKind::Protein), RecordKind::Protein)?;
        let external = ExternalReferences::load(config.external_path(), config.threshold())?;

        if let Some(max) = organisms.max_id().max(proteins.max_id()) {
            if max > registry.last() {
                return Err(OntieError::MalformedIndex(format!(
                    "{} is mapped, but the index ends at {}",
                    max,
                    registry.last()
                )));
            }
        }

        Ok(Self {
            config: config.clone(),
            registry,
            organisms,
            proteins,
            external,
        })
    }

    /// The configuration of the run
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The identifier registry
    pub fn registry(&self) -> &IdentifierRegistry {
        &self.registry
    }

    /// The index of known records of `kind`
    pub fn known(&self, kind: RecordKind) -> &KnownRecords {
        match kind {
            RecordKind::Organism => &self.organisms,
            RecordKind::Protein => &self.proteins,
        }
    }

    fn known_mut(&mut self, kind: RecordKind) -> &mut KnownRecords {
        match kind {
            RecordKind::Organism => &mut self.organisms,
            RecordKind::Protein => &mut self.proteins,
        }
    }

    /// The external references, including those added during the run
    pub fn external(&self) -> &ExternalReferences {
        &self.external
    }

    /// Processes all new records of the given kinds
    ///
    /// All records are fetched from `source` before anything is written.
    /// Stanzas are appended in the order of the source.
    ///
    /// # Errors
    ///
    /// - [`OntieError::MissingField`]: A new record has an empty label or parent.
    ///   All records before it are already written, including their external references.
    /// - [`OntieError::CannotOpenFile`]: One of the tables can't be opened for appending
    /// - Any error of `source`
    pub fn run<S: RecordSource + ?Sized>(
        &mut self,
        source: &mut S,
        kinds: &[RecordKind],
    ) -> OntieResult<RunSummary> {
        let synonyms = if kinds.contains(&RecordKind::Organism) {
            synonym_lookup(source)?
        } else {
            SynonymLookup::new()
        };

        let mut records: Vec<Record> = Vec::new();
        for kind in kinds {
            match kind {
                RecordKind::Organism => {
                    records.extend(source.new_organisms()?.into_iter().map(Record::from))
                }
                RecordKind::Protein => {
                    records.extend(source.new_proteins()?.into_iter().map(Record::from))
                }
            }
        }
        info!("Received {} candidate records", records.len());

        let mut sinks = Sinks::open(&self.config)?;
        let res = self.emit_all(&records, source, &synonyms, &mut sinks);
        sinks.flush()?;

        // written records are known on the next run and won't be considered
        // again, so their references must be kept even if a later record fails
        let flushed = self.external.flush(self.config.external_path());
        if let (Err(_), Err(err)) = (&res, &flushed) {
            error!("Cannot write external classes: {}", err);
        }
        let mut summary = res?;
        summary.external = flushed?;

        for kind in kinds {
            match summary.added_of(*kind) {
                0 => info!("No new {}s to add", kind),
                n => info!("{} new {}s added", n, kind),
            }
        }
        Ok(summary)
    }

    fn emit_all<S: RecordSource + ?Sized, W: Write>(
        &mut self,
        records: &[Record],
        source: &mut S,
        synonyms: &SynonymLookup,
        sinks: &mut Sinks<W>,
    ) -> OntieResult<RunSummary> {
        let mut summary = RunSummary::default();
        for record in records {
            match self.reconcile(record, source, synonyms, sinks)? {
                Some(_) => match record.kind() {
                    RecordKind::Organism => summary.organisms += 1,
                    RecordKind::Protein => summary.proteins += 1,
                },
                None => summary.skipped += 1,
            }
        }
        Ok(summary)
    }

    /// Assigns a CURIE to a single record and writes all its rows
    ///
    /// Returns `None` if the record is already known.
    fn reconcile<S: RecordSource + ?Sized, W: Write>(
        &mut self,
        record: &Record,
        source: &mut S,
        synonyms: &SynonymLookup,
        sinks: &mut Sinks<W>,
    ) -> OntieResult<Option<OntieId>> {
        let kind = record.kind();
        let key = record.key();
        if let Some(id) = self.known(kind).get(key) {
            debug!("Skipping {} {}: already {}", kind, key, id);
            return Ok(None);
        }

        if let Err(err) = record.validate() {
            error!("Cannot create a class for {} {}: {}", kind, key, err);
            return Err(err);
        }

        let (synonyms, superclasses): (&[String], Vec<String>) = match record {
            Record::Organism(org) => (
                synonyms.get(&key).map(Vec::as_slice).unwrap_or_default(),
                superclasses(org, source)?,
            ),
            Record::Protein(_) => (&[][..], Vec::new()),
        };

        let id = self.registry.next_id()?;
        let label = record.label();
        self.external
            .consider(&record.parent_label(), record.parent_key());

        // index first, so an interrupted run never hands out the id again,
        // then the mapping, so the record is not emitted twice
        writeln!(
            sinks.index,
            "{}",
            registry::index_row(id, &record.index_label())
        )?;
        sinks.index.flush()?;
        writeln!(sinks.mapping(kind), "{}", known::mapping_row(key, id, &label))?;
        sinks.mapping(kind).flush()?;

        let stanza = Stanza::new(id, record)
            .with_synonyms(synonyms)
            .with_superclasses(&superclasses);
        write!(sinks.ontology, "{}", stanza)?;
        sinks.ontology.flush()?;

        self.known_mut(kind).insert(key, id)?;
        debug!("{} {} is {}", kind, key, id);
        Ok(Some(id))
    }
}

/// Resolves the labels of all additional parents of `org`
///
/// The primary parent is excluded, the order is that of the parent list.
fn superclasses<S: RecordSource + ?Sized>(
    org: &OrganismRecord,
    source: &mut S,
) -> OntieResult<Vec<String>> {
    let primary = clean_name(&org.parent);
    let mut res = Vec::new();
    for parent_id in org.additional_parent_ids()? {
        match source.parent_label(parent_id)? {
            Some(label) => {
                let label = clean_name(&label);
                if label != primary {
                    res.push(label);
                }
            }
            None => warn!(
                "Parent {} of organism {} does not exist",
                parent_id, org.organism_id
            ),
        }
    }
    Ok(res)
}

/// Rewrites the external table from all parents known to `source`
///
/// Rows of the manually curated external table come first. The table at
/// the default location is optional, one set with
/// [`Config::with_manual_external`] must exist.
/// Returns the number of rows written.
///
/// # Errors
///
/// - [`OntieError::MalformedTable`]: The manual table is corrupt
/// - [`OntieError::CannotOpenFile`]: The external table can't be written or an
///   explicitly set manual table does not exist. Nothing is written in that case.
/// - Any error of `source`
pub fn generate_external<S: RecordSource + ?Sized>(
    config: &Config,
    source: &mut S,
) -> OntieResult<usize> {
    let manual = config.manual_external_path();
    let manual = if manual.is_file() {
        Some(manual)
    } else if config.manual_external_required() {
        return Err(OntieError::not_found(manual));
    } else {
        warn!("No manual external table at {}", manual.display());
        None
    };
    let count = ExternalReferences::rebuild(
        config.external_path(),
        manual,
        source.external_parents()?,
    )?;
    info!(
        "Wrote {} external classes to {}",
        count,
        config.external_path().display()
    );
    Ok(count)
}

#[cfg(test)]
mod test {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::record::ProteinRecord;
    use crate::TaxonId;

    struct Fixed {
        labels: BTreeMap<u32, String>,
    }

    impl RecordSource for Fixed {
        fn synonyms(&mut self) -> OntieResult<Vec<(u32, String)>> {
            Ok(Vec::new())
        }
        fn new_organisms(&mut self) -> OntieResult<Vec<OrganismRecord>> {
            Ok(Vec::new())
        }
        fn new_proteins(&mut self) -> OntieResult<Vec<ProteinRecord>> {
            Ok(Vec::new())
        }
        fn parent_label(&mut self, id: u32) -> OntieResult<Option<String>> {
            Ok(self.labels.get(&id).cloned())
        }
        fn external_parents(&mut self) -> OntieResult<Vec<(String, TaxonId)>> {
            Ok(Vec::new())
        }
    }

    fn fixed() -> Fixed {
        Fixed {
            labels: [
                (10090, "Mus musculus"),
                (10088, "Mus\t"),
                (9606, "Homo sapiens"),
            ]
            .into_iter()
            .map(|(id, label)| (id, label.to_string()))
            .collect(),
        }
    }

    fn balb_c(parents: &str) -> OrganismRecord {
        OrganismRecord {
            organism_id: 10000001,
            label: "Mus musculus BALB/c".to_string(),
            rank: None,
            parent_tax_id: 10090,
            parents: parents.to_string(),
            parent: "Mus musculus".to_string(),
        }
    }

    #[test]
    fn superclasses_exclude_primary() {
        let res = superclasses(&balb_c("10090,10088,9606"), &mut fixed()).unwrap();
        assert_eq!(res, vec!["Mus", "Homo sapiens"]);
    }

    #[test]
    fn superclasses_keep_lookup_order() {
        let res = superclasses(&balb_c("9606,10088"), &mut fixed()).unwrap();
        assert_eq!(res, vec!["Homo sapiens", "Mus"]);
    }

    #[test]
    fn superclasses_single_parent() {
        let res = superclasses(&balb_c("10088"), &mut fixed()).unwrap();
        assert!(res.is_empty());
    }

    #[test]
    fn superclasses_unknown_parent() {
        let res = superclasses(&balb_c("10090,1"), &mut fixed()).unwrap();
        assert!(res.is_empty());
    }

    #[test]
    fn summary_counts() {
        let summary = RunSummary {
            organisms: 2,
            proteins: 3,
            skipped: 1,
            external: 1,
        };
        assert_eq!(summary.added(), 5);
        assert_eq!(summary.added_of(RecordKind::Protein), 3);
        assert_eq!(summary.skipped(), 1);
        assert_eq!(summary.external(), 1);
    }

    #[test]
    fn reconcile_into_memory() {
        let config = Config::new(".", ".");
        let mut pipeline = Pipeline {
            config,
            registry: IdentifierRegistry::default(),
            organisms: KnownRecords::new(RecordKind::Organism),
            proteins: KnownRecords::new(RecordKind::Protein),
            external: ExternalReferences::new(crate::EXTERNAL_NAMESPACE_THRESHOLD),
        };
        let mut sinks = Sinks {
            ontology: Vec::new(),
            index: Vec::new(),
            organisms: Vec::new(),
            proteins: Vec::new(),
        };
        let records = vec![
            Record::from(balb_c("10090,10088")),
            Record::from(balb_c("10090,10088")),
        ];
        let summary = pipeline
            .emit_all(&records, &mut fixed(), &SynonymLookup::new(), &mut sinks)
            .unwrap();

        assert_eq!(summary.added(), 1);
        assert_eq!(summary.skipped(), 1);
        assert_eq!(
            String::from_utf8(sinks.index).unwrap(),
            "ONTIE:0000001\tMus musculus BALB/c\towl:Class\t\t\n"
        );
        assert_eq!(
            String::from_utf8(sinks.organisms).unwrap(),
            "10000001\tONTIE:0000001\tMus musculus BALB/c\n"
        );
        assert!(sinks.proteins.is_empty());
        assert_eq!(
            String::from_utf8(sinks.ontology).unwrap(),
            ": ONTIE:0000001\napply template: taxon class\n label: Mus musculus BALB/c\n parent taxon: Mus musculus\nsubclass of: Mus\n\n"
        );
        assert_eq!(
            pipeline.external().added().collect::<Vec<_>>(),
            vec![("Mus musculus", TaxonId::from(10090u32))]
        );
    }

    /// Writer that logs every flush of non-empty content
    struct Recorder {
        name: &'static str,
        pending: usize,
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    impl Write for Recorder {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.pending += buf.len();
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if self.pending > 0 {
                self.log.borrow_mut().push(self.name);
                self.pending = 0;
            }
            Ok(())
        }
    }

    #[test]
    fn rows_are_flushed_per_record() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let recorder = |name| Recorder {
            name,
            pending: 0,
            log: Rc::clone(&log),
        };
        let mut sinks = Sinks {
            ontology: recorder("ontology"),
            index: recorder("index"),
            organisms: recorder("organisms"),
            proteins: recorder("proteins"),
        };
        let mut pipeline = Pipeline {
            config: Config::new(".", "."),
            registry: IdentifierRegistry::default(),
            organisms: KnownRecords::new(RecordKind::Organism),
            proteins: KnownRecords::new(RecordKind::Protein),
            external: ExternalReferences::new(crate::EXTERNAL_NAMESPACE_THRESHOLD),
        };
        let mut second = balb_c("10090");
        second.organism_id = 10000002;
        let records = vec![Record::from(balb_c("10090")), Record::from(second)];
        pipeline
            .emit_all(&records, &mut fixed(), &SynonymLookup::new(), &mut sinks)
            .unwrap();

        assert_eq!(
            *log.borrow(),
            vec!["index", "organisms", "ontology", "index", "organisms", "ontology"]
        );
        assert_eq!(pipeline.known(RecordKind::Organism).kind(), RecordKind::Organism);
        assert_eq!(pipeline.known(RecordKind::Organism).len(), 2);
    }

    #[test]
    fn reconcile_invalid_record() {
        let mut pipeline = Pipeline {
            config: Config::new(".", "."),
            registry: IdentifierRegistry::default(),
            organisms: KnownRecords::new(RecordKind::Organism),
            proteins: KnownRecords::new(RecordKind::Protein),
            external: ExternalReferences::new(crate::EXTERNAL_NAMESPACE_THRESHOLD),
        };
        let mut sinks = Sinks {
            ontology: Vec::new(),
            index: Vec::new(),
            organisms: Vec::new(),
            proteins: Vec::new(),
        };
        let mut org = balb_c("10090");
        org.label = "\t".to_string();
        let res = pipeline.emit_all(
            &[Record::from(org)],
            &mut fixed(),
            &SynonymLookup::new(),
            &mut sinks,
        );
        assert!(matches!(res, Err(OntieError::MissingField { .. })));
        assert!(sinks.ontology.is_empty());
        assert_eq!(pipeline.registry().issued(), 0);
    }
}
