use crate::{
    constants::{GAP_FILL_SENTINEL, NO_DATA_ALLELE},
    utils::util::Result,
};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VariantKind {
    Substitution,
    Insertion,
    Deletion,
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantKind::Substitution => write!(f, "SUB"),
            VariantKind::Insertion => write!(f, "INS"),
            VariantKind::Deletion => write!(f, "DEL"),
        }
    }
}

/// Numeric alignment context carried along from the diff table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignmentStats {
    pub query_pos: i64,
    pub buff: i64,
    pub dist: i64,
    pub ref_len: i64,
    pub query_len: i64,
    pub ref_frame: i64,
    pub query_frame: i64,
}

impl AlignmentStats {
    /// Stats pinned onto synthesized no-data calls so they never pass for alignment output.
    pub fn gap_fill_sentinel() -> Self {
        Self {
            query_pos: GAP_FILL_SENTINEL,
            buff: GAP_FILL_SENTINEL,
            dist: GAP_FILL_SENTINEL,
            ref_len: GAP_FILL_SENTINEL,
            query_len: GAP_FILL_SENTINEL,
            ref_frame: GAP_FILL_SENTINEL,
            query_frame: GAP_FILL_SENTINEL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedVariant {
    pub position: u64,
    pub ref_allele: String,
    pub alt_allele: String,
    pub kind: VariantKind,
    pub sample: String,
    pub reference_tag: String,
    pub stats: AlignmentStats,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoDataCall {
    pub position: u64,
    pub ref_allele: String,
    pub stats: AlignmentStats,
}

impl NoDataCall {
    pub fn new(position: u64, ref_base: char) -> Self {
        Self {
            position,
            ref_allele: ref_base.to_string(),
            stats: AlignmentStats::gap_fill_sentinel(),
        }
    }
}

/// Explicit per-sample state of one reference position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus<'a> {
    ReferenceMatch,
    Variant { ref_allele: &'a str, alt_allele: &'a str },
    NoData { ref_allele: &'a str },
}

impl<'a> CallStatus<'a> {
    pub fn ref_allele(&self) -> Option<&'a str> {
        match *self {
            CallStatus::ReferenceMatch => None,
            CallStatus::Variant { ref_allele, .. } | CallStatus::NoData { ref_allele } => {
                Some(ref_allele)
            }
        }
    }

    pub fn alt_allele(&self) -> Option<&'a str> {
        match *self {
            CallStatus::ReferenceMatch => None,
            CallStatus::Variant { alt_allele, .. } => Some(alt_allele),
            CallStatus::NoData { .. } => Some(NO_DATA_ALLELE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleCall {
    Variant(NormalizedVariant),
    NoData(NoDataCall),
}

impl SampleCall {
    pub fn position(&self) -> u64 {
        match self {
            SampleCall::Variant(v) => v.position,
            SampleCall::NoData(n) => n.position,
        }
    }

    pub fn status(&self) -> CallStatus<'_> {
        match self {
            SampleCall::Variant(v) => CallStatus::Variant {
                ref_allele: &v.ref_allele,
                alt_allele: &v.alt_allele,
            },
            SampleCall::NoData(n) => CallStatus::NoData {
                ref_allele: &n.ref_allele,
            },
        }
    }
}

/// One sample's calls in ascending position order, at most one per position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleVariantSet {
    pub sample: String,
    pub reference_tag: Option<String>,
    calls: Vec<SampleCall>,
}

impl SampleVariantSet {
    pub fn new(
        sample: impl Into<String>,
        reference_tag: Option<String>,
        calls: Vec<SampleCall>,
    ) -> Result<Self> {
        let sample = sample.into();
        if let Some(pair) = calls
            .windows(2)
            .find(|pair| pair[0].position() >= pair[1].position())
        {
            return Err(crate::wga_error!(
                "Calls for sample {} are not strictly ascending: position {} followed by {}",
                sample,
                pair[0].position(),
                pair[1].position()
            ));
        }
        Ok(Self {
            sample,
            reference_tag,
            calls,
        })
    }

    pub fn calls(&self) -> &[SampleCall] {
        &self.calls
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

#[cfg(test)]
impl SampleVariantSet {
    /// Positions without a call match the reference.
    pub fn status_at(&self, position: u64) -> CallStatus<'_> {
        match self
            .calls
            .binary_search_by_key(&position, SampleCall::position)
        {
            Ok(idx) => self.calls[idx].status(),
            Err(_) => CallStatus::ReferenceMatch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snv(position: u64, ref_allele: &str, alt_allele: &str) -> SampleCall {
        SampleCall::Variant(NormalizedVariant {
            position,
            ref_allele: ref_allele.to_string(),
            alt_allele: alt_allele.to_string(),
            kind: VariantKind::Substitution,
            sample: "s1".to_string(),
            reference_tag: "chr".to_string(),
            stats: AlignmentStats::gap_fill_sentinel(),
        })
    }

    #[test]
    fn test_status_at_distinguishes_three_states() {
        let set = SampleVariantSet::new(
            "s1",
            Some("chr".to_string()),
            vec![snv(2, "C", "T"), SampleCall::NoData(NoDataCall::new(4, 'T'))],
        )
        .unwrap();

        assert_eq!(set.status_at(1), CallStatus::ReferenceMatch);
        assert_eq!(
            set.status_at(2),
            CallStatus::Variant {
                ref_allele: "C",
                alt_allele: "T"
            }
        );
        assert_eq!(set.status_at(4), CallStatus::NoData { ref_allele: "T" });
        assert_eq!(set.status_at(4).alt_allele(), Some("N"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_duplicate_positions_are_rejected() {
        let result = SampleVariantSet::new("s1", None, vec![snv(2, "C", "T"), snv(2, "C", "G")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_no_data_call_carries_sentinel_stats() {
        let call = NoDataCall::new(7, 'G');
        assert_eq!(call.ref_allele, "G");
        assert_eq!(call.stats.query_pos, 1);
        assert_eq!(call.stats.query_frame, 1);
    }
}
