use crate::{error::WgaError, utils::util::Result};

/// Reference bases for the 1-based coordinate space `1..=len`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceTable {
    name: String,
    bases: Vec<u8>,
}

impl ReferenceTable {
    pub fn new(name: impl Into<String>, bases: Vec<u8>) -> Self {
        let bases = bases.into_iter().map(|b| b.to_ascii_uppercase()).collect();
        Self {
            name: name.into(),
            bases,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> u64 {
        self.bases.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    pub fn base_at(&self, position: u64) -> Result<char> {
        if position == 0 {
            return Err(WgaError::UnresolvedAnchor { position });
        }
        usize::try_from(position - 1)
            .ok()
            .and_then(|idx| self.bases.get(idx))
            .map(|&b| b as char)
            .ok_or(WgaError::UnresolvedAnchor { position })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_at_is_one_based_and_uppercased() {
        let reference = ReferenceTable::new("chr", b"acgTA".to_vec());
        assert_eq!(reference.len(), 5);
        assert_eq!(reference.base_at(1).unwrap(), 'A');
        assert_eq!(reference.base_at(4).unwrap(), 'T');
        assert_eq!(reference.base_at(5).unwrap(), 'A');
    }

    #[test]
    fn test_base_at_outside_range_is_unresolved_anchor() {
        let reference = ReferenceTable::new("chr", b"ACGTA".to_vec());
        assert!(matches!(
            reference.base_at(0),
            Err(WgaError::UnresolvedAnchor { position: 0 })
        ));
        assert!(matches!(
            reference.base_at(6),
            Err(WgaError::UnresolvedAnchor { position: 6 })
        ));
    }
}
