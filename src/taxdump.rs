//! Turtle files with obsolete NCBI Taxonomy classes
//!
//! NCBI removes taxa from its taxonomy, either by merging them into another
//! taxon (`merged.dmp`) or by deleting them (`delnodes.dmp`). IEDB still
//! references some of them, so they are kept as deprecated classes.
//!
//! Both dump files use `|` separated cells:
//!
//! ```text
//! merged.dmp:    12	|	74109	|
//! delnodes.dmp:  3146	|
//! ```
use std::io::{BufRead, Write};

use tracing::{debug, info};

use crate::{OntieError, OntieResult, TaxonId};

const PREFIXES: &str = "@prefix rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
@prefix owl: <http://www.w3.org/2002/07/owl#> .
@prefix NCBITaxon: <http://purl.obolibrary.org/obo/NCBITaxon_> .
";

const IAO_PREFIX: &str = "@prefix IAO: <http://purl.obolibrary.org/obo/IAO_> .\n";

/// `IAO:0100001` is "term replaced by"
const REPLACED_BY: &str = "IAO:0100001";

fn taxon_cell(cell: &str, line: &str) -> OntieResult<TaxonId> {
    let cell = cell.trim();
    let id = cell
        .parse::<u32>()
        .map_err(|_| OntieError::InvalidInput(line.to_string()))?;
    Ok(TaxonId::from(id))
}

/// Parses a single line of `merged.dmp` into `(old, new)`
fn merged_line(line: &str) -> OntieResult<(TaxonId, TaxonId)> {
    let mut cells = line.split('|');
    let (Some(old), Some(new)) = (cells.next(), cells.next()) else {
        return Err(OntieError::InvalidInput(line.to_string()));
    };
    Ok((taxon_cell(old, line)?, taxon_cell(new, line)?))
}

/// Parses a single line of `delnodes.dmp`
fn delnodes_line(line: &str) -> OntieResult<TaxonId> {
    taxon_cell(line.trim().trim_matches('|'), line)
}

fn write_deprecated<W: Write>(writer: &mut W, id: TaxonId, last: bool) -> OntieResult<()> {
    writeln!(writer, "{}", id)?;
    writeln!(writer, "  rdf:type owl:Class ;")?;
    writeln!(writer, "  rdfs:label \"obsolete taxon {}\" ;", id.as_u32())?;
    let terminator = if last { "." } else { ";" };
    writeln!(writer, "  owl:deprecated \"true\"^^xsd:boolean {}", terminator)?;
    Ok(())
}

fn lines<R: BufRead>(reader: R) -> impl Iterator<Item = OntieResult<String>> {
    reader
        .lines()
        .map(|line| line.map_err(OntieError::from))
        .filter(|line| !matches!(line, Ok(l) if l.trim().is_empty()))
}

/// Writes one deprecated class with a replacement per line of `merged.dmp`
///
/// Returns the number of written classes.
///
/// # Errors
///
/// [`OntieError::InvalidInput`] if a line does not hold two numeric taxon ids
pub fn merged_to_turtle<R: BufRead, W: Write>(reader: R, mut writer: W) -> OntieResult<usize> {
    writeln!(writer, "{}{}", PREFIXES, IAO_PREFIX)?;
    let mut count = 0;
    for line in lines(reader) {
        let (old, new) = merged_line(&line?)?;
        write_deprecated(&mut writer, old, false)?;
        writeln!(writer, "  {} {} .\n", REPLACED_BY, new)?;
        count += 1;
    }
    writer.flush()?;
    info!("Wrote {} merged taxa", count);
    Ok(count)
}

/// Writes one deprecated class per line of `delnodes.dmp`
///
/// Returns the number of written classes.
///
/// # Errors
///
/// [`OntieError::InvalidInput`] if a line does not hold a numeric taxon id
pub fn obsolete_to_turtle<R: BufRead, W: Write>(reader: R, mut writer: W) -> OntieResult<usize> {
    writeln!(writer, "{}", PREFIXES)?;
    let mut count = 0;
    for line in lines(reader) {
        let id = delnodes_line(&line?)?;
        write_deprecated(&mut writer, id, true)?;
        writeln!(writer)?;
        count += 1;
    }
    writer.flush()?;
    debug!("Wrote {} deleted taxa", count);
    Ok(count)
}
