use std::fmt;

/// Allele indices of one sample's GT field; `None` is a missing allele.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Genotype {
    pub alleles: Vec<Option<u32>>,
    pub phased: bool,
}

impl Genotype {
    pub fn new(alleles: Vec<Option<u32>>, phased: bool) -> Self {
        Self { alleles, phased }
    }

    pub fn homozygous(allele: u32) -> Self {
        Self::new(vec![Some(allele); 2], false)
    }

    pub fn hom_ref() -> Self {
        Self::homozygous(0)
    }

    pub fn missing(ploidy: usize) -> Self {
        Self::new(vec![None; ploidy], false)
    }

    pub fn is_missing(&self) -> bool {
        self.alleles.iter().all(Option::is_none)
    }
}

impl fmt::Display for Genotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = if self.phased { '|' } else { '/' };
        for (i, allele) in self.alleles.iter().enumerate() {
            if i > 0 {
                write!(f, "{separator}")?;
            }
            match allele {
                Some(idx) => write!(f, "{idx}")?,
                None => write!(f, ".")?,
            }
        }
        Ok(())
    }
}
