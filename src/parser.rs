//! Reading and creating the tab separated tables of the workspace
//!
//! All tables share the same conventions:
//!
//! - the first line is a header
//! - columns are separated by a single tab
//! - the number of columns is fixed per table
//!
//! ```text
//! TAX_ID    CURIE           LABEL
//! 10000005  ONTIE:0000001   Mus musculus BALB/c
//! ```
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::debug;

use crate::{OntieError, OntieResult};

/// Opens a table for reading
///
/// # Errors
///
/// [`OntieError::CannotOpenFile`] if the file does not exist or can't be read
pub(crate) fn open<P: AsRef<Path>>(path: P) -> OntieResult<BufReader<File>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|err| OntieError::cannot_open(path, err))?;
    Ok(BufReader::new(file))
}

/// Opens a table for appending rows, creating it with `header` if it does not exist
///
/// # Errors
///
/// [`OntieError::CannotOpenFile`] if the file can't be created or opened
pub(crate) fn open_append<P: AsRef<Path>>(
    path: P,
    header: Option<&str>,
) -> OntieResult<BufWriter<File>> {
    let path = path.as_ref();
    let exists = path.exists();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| OntieError::cannot_open(path, err))?;
    let mut writer = BufWriter::new(file);
    if let (false, Some(header)) = (exists, header) {
        debug!("Creating {}", path.display());
        writeln!(writer, "{header}")?;
    }
    Ok(writer)
}

/// Creates `path` with only its `header` row, unless it exists already
pub(crate) fn ensure_table<P: AsRef<Path>>(path: P, header: &str) -> OntieResult<()> {
    let mut writer = open_append(path, Some(header))?;
    writer.flush()?;
    Ok(())
}

/// Removes the first (header) line.
pub(crate) fn remove_header<R: BufRead>(reader: &mut R, table: &str) -> OntieResult<String> {
    let mut header = String::with_capacity(40);
    reader
        .read_line(&mut header)
        .map_err(|_| OntieError::InvalidInput(format!("Invalid data in {table}")))?;
    Ok(header.trim_end_matches(['\n', '\r']).to_string())
}

/// Iterates all non-empty lines of the reader
///
/// Trailing line breaks are removed, but tabs and whitespace inside
/// the line are preserved, so that empty trailing columns survive.
pub(crate) fn rows<'a, R: BufRead + 'a>(
    reader: R,
    table: &'a str,
) -> impl Iterator<Item = OntieResult<String>> + 'a {
    reader
        .lines()
        .map(move |line| {
            line.map(|line| line.trim_end_matches('\r').to_string())
                .map_err(|_| OntieError::InvalidInput(format!("Invalid data in {table}")))
        })
        .filter(|line| !matches!(line, Ok(l) if l.is_empty()))
}

/// Splits a row into exactly `N` columns
///
/// # Errors
///
/// [`OntieError::MalformedTable`] if the row has more or fewer columns
pub(crate) fn split_row<'a, const N: usize>(
    line: &'a str,
    table: &str,
) -> OntieResult<[&'a str; N]> {
    let malformed = || OntieError::MalformedTable {
        table: table.to_string(),
        line: line.to_string(),
    };
    let mut cols = line.split('\t');
    let mut res = [""; N];
    for col in res.iter_mut() {
        *col = cols.next().ok_or_else(malformed)?;
    }
    if cols.next().is_some() {
        return Err(malformed());
    }
    Ok(res)
}

/// Returns `None` for an empty cell
pub(crate) fn nullable(cell: &str) -> Option<&str> {
    if cell.trim().is_empty() {
        None
    } else {
        Some(cell)
    }
}

/// Returns the last non-empty line of the table, if any
pub(crate) fn last_row<P: AsRef<Path>>(path: P) -> OntieResult<Option<String>> {
    let table = path.as_ref().display().to_string();
    let reader = open(path)?;
    let mut last = None;
    for line in rows(reader, &table) {
        last = Some(line?);
    }
    Ok(last)
}
