//! Collapses per-base aligner diff rows into anchored REF/ALT events.
//!
//! Substitutions pass through. Insertion rows sharing a reference position are
//! joined onto the reference base at that position; runs of deletion rows at
//! consecutive positions are joined onto the reference base preceding the run.
//! Events left on the same anchor base are combined into one REF/ALT pair.

use super::{
    call::{AlignmentStats, NormalizedVariant, VariantKind},
    reference::ReferenceTable,
};
use crate::{constants::INDEL_PLACEHOLDER, utils::util::Result};

/// One raw row of the aligner's diff table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRecord {
    pub ref_pos: u64,
    pub sub_ref: String,
    pub sub_alt: String,
    pub stats: AlignmentStats,
    pub ref_tag: String,
    pub query_tag: String,
}

impl DiffRecord {
    pub fn kind(&self) -> Option<VariantKind> {
        match (
            self.sub_ref == INDEL_PLACEHOLDER,
            self.sub_alt == INDEL_PLACEHOLDER,
        ) {
            (false, false) => Some(VariantKind::Substitution),
            (true, false) => Some(VariantKind::Insertion),
            (false, true) => Some(VariantKind::Deletion),
            (true, true) => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct NormalizeOutcome {
    pub variants: Vec<NormalizedVariant>,
    /// Events dropped because their anchor already holds an event of the same kind.
    pub collisions: usize,
}

pub fn normalize_records(
    mut records: Vec<DiffRecord>,
    sample: &str,
    reference: &ReferenceTable,
) -> Result<NormalizeOutcome> {
    // Stable: insertion rows keep their file order within a position
    records.sort_by_key(|r| r.ref_pos);

    let mut variants = Vec::with_capacity(records.len());
    let mut i = 0;
    while i < records.len() {
        let first = &records[i];
        let Some(kind) = first.kind() else {
            return Err(crate::wga_error!(
                "Diff row at position {} has no bases on either side",
                first.ref_pos
            ));
        };
        let run_end = run_end(&records, i, kind);
        let run = &records[i..run_end];
        let variant = match kind {
            VariantKind::Substitution => NormalizedVariant {
                position: first.ref_pos,
                ref_allele: first.sub_ref.to_ascii_uppercase(),
                alt_allele: first.sub_alt.to_ascii_uppercase(),
                kind,
                sample: sample.to_string(),
                reference_tag: first.ref_tag.clone(),
                stats: first.stats,
            },
            VariantKind::Insertion => collapse_insertion(run, sample, reference)?,
            VariantKind::Deletion => collapse_deletion(run, sample, reference)?,
        };
        log::trace!(
            "{sample}: {} rows -> {} {}:{}>{}",
            run.len(),
            variant.kind,
            variant.position,
            variant.ref_allele,
            variant.alt_allele
        );
        variants.push(variant);
        i = run_end;
    }

    // Events sharing an anchor are combined: substitution, then insertion, then deletion
    variants.sort_by_key(|v| (v.position, v.kind));
    let mut merged = Vec::with_capacity(variants.len());
    let mut collisions = 0usize;
    let mut events = variants.into_iter().peekable();
    while let Some(first) = events.next() {
        let mut group = AnchorGroup::new(first);
        while let Some(next) = events.next_if(|v| v.position == group.base.position) {
            if !group.absorb(next, sample) {
                collisions += 1;
            }
        }
        merged.push(group.finish());
    }

    Ok(NormalizeOutcome {
        variants: merged,
        collisions,
    })
}

/// Events of one sample sharing an anchor base, at most one of each kind. `base` is the
/// highest-priority event; later ones only contribute their inserted or deleted bases.
struct AnchorGroup {
    base: NormalizedVariant,
    inserted: Option<String>,
    deleted: Option<String>,
}

impl AnchorGroup {
    fn new(base: NormalizedVariant) -> Self {
        Self {
            base,
            inserted: None,
            deleted: None,
        }
    }

    fn has(&self, kind: VariantKind) -> bool {
        self.base.kind == kind
            || match kind {
                VariantKind::Substitution => false,
                VariantKind::Insertion => self.inserted.is_some(),
                VariantKind::Deletion => self.deleted.is_some(),
            }
    }

    /// Returns `false` when `variant` cannot be combined and is dropped.
    fn absorb(&mut self, variant: NormalizedVariant, sample: &str) -> bool {
        let combinable = match variant.kind {
            VariantKind::Substitution => false,
            VariantKind::Insertion => true,
            // A deletion at the start of the sequence hangs off the base after it
            VariantKind::Deletion => leads_with_anchor(&variant),
        };
        if !combinable || self.has(variant.kind) {
            log::debug!(
                "{sample}: dropping {} {}>{} at {}, anchor already used by {} {}>{}",
                variant.kind,
                variant.ref_allele,
                variant.alt_allele,
                variant.position,
                self.base.kind,
                self.base.ref_allele,
                self.base.alt_allele
            );
            return false;
        }
        match variant.kind {
            VariantKind::Insertion => self.inserted = Some(variant.alt_allele[1..].to_string()),
            VariantKind::Deletion => self.deleted = Some(variant.ref_allele[1..].to_string()),
            VariantKind::Substitution => {}
        }
        true
    }

    /// REF = anchor REF + deleted bases, ALT = anchor ALT + inserted bases. An insertion
    /// base already carries its inserted bases, and a deletion base never has company.
    fn finish(self) -> NormalizedVariant {
        let AnchorGroup {
            mut base,
            inserted,
            deleted,
        } = self;
        if inserted.is_none() && deleted.is_none() {
            return base;
        }
        if let Some(bases) = &deleted {
            base.ref_allele.push_str(bases);
        }
        if let Some(bases) = &inserted {
            base.alt_allele.push_str(bases);
        }
        base.kind = if deleted.is_some() {
            VariantKind::Deletion
        } else {
            VariantKind::Insertion
        };
        base
    }
}

fn leads_with_anchor(deletion: &NormalizedVariant) -> bool {
    deletion.ref_allele.len() > deletion.alt_allele.len()
        && deletion.ref_allele.starts_with(&deletion.alt_allele)
}

/// Exclusive end index of the run of rows that collapse into one event with `records[start]`.
fn run_end(records: &[DiffRecord], start: usize, kind: VariantKind) -> usize {
    let mut end = start + 1;
    match kind {
        VariantKind::Substitution => {}
        VariantKind::Insertion => {
            while end < records.len()
                && records[end].kind() == Some(VariantKind::Insertion)
                && records[end].ref_pos == records[start].ref_pos
            {
                end += 1;
            }
        }
        VariantKind::Deletion => {
            while end < records.len()
                && records[end].kind() == Some(VariantKind::Deletion)
                && records[end].ref_pos == records[end - 1].ref_pos + 1
            {
                end += 1;
            }
        }
    }
    end
}

fn collapse_insertion(
    run: &[DiffRecord],
    sample: &str,
    reference: &ReferenceTable,
) -> Result<NormalizedVariant> {
    let first = &run[0];
    let anchor = reference.base_at(first.ref_pos)?;
    let inserted: String = run.iter().map(|r| r.sub_alt.as_str()).collect();

    let mut alt_allele = String::with_capacity(inserted.len() + 1);
    alt_allele.push(anchor);
    alt_allele.push_str(&inserted.to_ascii_uppercase());

    Ok(NormalizedVariant {
        position: first.ref_pos,
        ref_allele: anchor.to_string(),
        alt_allele,
        kind: VariantKind::Insertion,
        sample: sample.to_string(),
        reference_tag: first.ref_tag.clone(),
        stats: first.stats,
    })
}

fn collapse_deletion(
    run: &[DiffRecord],
    sample: &str,
    reference: &ReferenceTable,
) -> Result<NormalizedVariant> {
    let first = &run[0];
    let last = &run[run.len() - 1];
    let deleted = run
        .iter()
        .map(|r| r.sub_ref.as_str())
        .collect::<String>()
        .to_ascii_uppercase();

    let (position, ref_allele, alt_allele) = if first.ref_pos > 1 {
        let anchor_pos = first.ref_pos - 1;
        let anchor = reference.base_at(anchor_pos)?;
        (anchor_pos, format!("{anchor}{deleted}"), anchor.to_string())
    } else {
        // Nothing precedes position 1, anchor on the base after the run
        let anchor = reference.base_at(last.ref_pos + 1)?;
        (
            first.ref_pos,
            format!("{deleted}{anchor}"),
            anchor.to_string(),
        )
    };

    Ok(NormalizedVariant {
        position,
        ref_allele,
        alt_allele,
        kind: VariantKind::Deletion,
        sample: sample.to_string(),
        reference_tag: first.ref_tag.clone(),
        stats: first.stats,
    })
}
