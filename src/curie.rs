//! Identifiers of local and external classes
use core::fmt::Debug;
use std::fmt::Display;

use crate::{OntieError, OntieResult, NCBI_TAXON_PREFIX, ONTIE_PREFIX};

/// The numeric part of an `ONTIE:` CURIE
///
/// `OntieId`s are handed out by the [`IdentifierRegistry`](`crate::registry::IdentifierRegistry`)
/// in strictly increasing order and are never reused.
///
/// # Examples
///
/// ```
/// use ontie::OntieId;
///
/// let id = OntieId::try_from("ONTIE:0000042").unwrap();
/// assert_eq!(id.as_u32(), 42);
/// assert_eq!(id.to_string(), "ONTIE:0000042");
/// ```
#[derive(Copy, Clone, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct OntieId {
    inner: u32,
}

impl OntieId {
    /// Returns the numeric part of the CURIE
    pub fn as_u32(&self) -> u32 {
        self.inner
    }

    /// Returns the next identifier
    ///
    /// # Errors
    ///
    /// [`OntieError::InvalidInput`] if the identifier space is exhausted
    pub(crate) fn successor(&self) -> OntieResult<Self> {
        let inner = self.inner.checked_add(1).ok_or_else(|| {
            OntieError::InvalidInput(format!("no identifier left after {self}"))
        })?;
        Ok(Self { inner })
    }
}

impl TryFrom<&str> for OntieId {
    type Error = OntieError;
    fn try_from(s: &str) -> OntieResult<Self> {
        let Some((prefix, number)) = s.split_once(':') else {
            return Err(OntieError::InvalidInput(s.to_string()));
        };
        if prefix != ONTIE_PREFIX || number.is_empty() {
            return Err(OntieError::InvalidInput(s.to_string()));
        }
        Ok(OntieId {
            inner: number.parse::<u32>()?,
        })
    }
}

impl From<u32> for OntieId {
    fn from(inner: u32) -> Self {
        Self { inner }
    }
}

impl Debug for OntieId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OntieId({})", self)
    }
}

impl Display for OntieId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{:07}", ONTIE_PREFIX, self.inner)
    }
}

impl PartialEq<str> for OntieId {
    fn eq(&self, other: &str) -> bool {
        OntieId::try_from(other).map_or(false, |other| self == &other)
    }
}

impl PartialEq<&str> for OntieId {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

/// An NCBI Taxonomy identifier, e.g. `NCBITaxon:9606`
///
/// Unlike [`OntieId`] the number is not zero-padded.
#[derive(Copy, Clone, Default, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TaxonId {
    inner: u32,
}

impl TaxonId {
    /// Returns the NCBI Taxonomy number
    pub fn as_u32(&self) -> u32 {
        self.inner
    }
}

impl From<u32> for TaxonId {
    fn from(inner: u32) -> Self {
        Self { inner }
    }
}

impl TryFrom<&str> for TaxonId {
    type Error = OntieError;
    fn try_from(s: &str) -> OntieResult<Self> {
        let number = s
            .strip_prefix(NCBI_TAXON_PREFIX)
            .and_then(|rest| rest.strip_prefix(':'))
            .ok_or_else(|| OntieError::InvalidInput(s.to_string()))?;
        Ok(TaxonId {
            inner: number.parse::<u32>()?,
        })
    }
}

impl Display for TaxonId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", NCBI_TAXON_PREFIX, self.inner)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ontie_padding() {
        assert_eq!(OntieId::from(1u32).to_string(), "ONTIE:0000001");
        assert_eq!(OntieId::from(1234567u32).to_string(), "ONTIE:1234567");
        assert_eq!(OntieId::from(12345678u32).to_string(), "ONTIE:12345678");
    }

    #[test]
    fn ontie_parse() {
        let id = OntieId::try_from("ONTIE:0012345").expect("valid CURIE");
        assert_eq!(id.as_u32(), 12345);
        assert_eq!(id, "ONTIE:0012345");
    }

    #[test]
    fn ontie_parse_invalid() {
        assert!(OntieId::try_from("ONTIE:").is_err());
        assert!(OntieId::try_from("ONTIE_0000001").is_err());
        assert!(OntieId::try_from("HP:0000001").is_err());
        assert!(OntieId::try_from("ONTIE:00000A1").is_err());
        assert!(OntieId::try_from("CURIE").is_err());
    }

    #[test]
    fn successor() {
        let id = OntieId::from(9u32).successor().expect("not exhausted");
        assert_eq!(id.to_string(), "ONTIE:0000010");
        assert!(OntieId::from(u32::MAX).successor().is_err());
    }

    #[test]
    fn taxon() {
        let taxon = TaxonId::from(9606u32);
        assert_eq!(taxon.to_string(), "NCBITaxon:9606");
        assert_eq!(TaxonId::try_from("NCBITaxon:9606").unwrap(), taxon);
        assert!(TaxonId::try_from("NCBITaxon9606").is_err());
        assert!(TaxonId::try_from("ONTIE:9606").is_err());
    }
}
