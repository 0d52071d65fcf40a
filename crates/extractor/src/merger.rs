use atlas_model::{CandidateKey, CapabilityCandidate, CapabilityRecord, ServerIdentity};
use std::cmp::Ordering;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Collapse one server's candidates into one record per `(kind, name)`.
///
/// The winner of a group has the highest confidence; ties go to the longer
/// description, then the earlier source path, then the matcher id and
/// offset. Output is sorted by `(kind, name)` so the result does not depend
/// on input order.
pub fn merge<I>(server: &ServerIdentity, candidates: I) -> Vec<CapabilityRecord>
where
    I: IntoIterator<Item = CapabilityCandidate>,
{
    let mut groups: BTreeMap<CandidateKey, CapabilityCandidate> = BTreeMap::new();
    let mut dropped = 0usize;

    for candidate in candidates {
        if candidate.name.is_empty() {
            dropped += 1;
            continue;
        }
        match groups.entry(candidate.key()) {
            Entry::Vacant(slot) => {
                slot.insert(candidate);
            }
            Entry::Occupied(mut slot) => {
                dropped += 1;
                if precedence(&candidate, slot.get()) == Ordering::Less {
                    slot.insert(candidate);
                }
            }
        }
    }

    if dropped > 0 {
        log::debug!("{server}: merged away {dropped} duplicate candidates");
    }

    groups
        .into_values()
        .map(|winner| CapabilityRecord::from_candidate(server, winner))
        .collect()
}

/// Total order in which `Less` means `a` beats `b`
fn precedence(a: &CapabilityCandidate, b: &CapabilityCandidate) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| b.description.len().cmp(&a.description.len()))
        .then_with(|| a.source_file.cmp(&b.source_file))
        .then_with(|| a.source_matcher.cmp(&b.source_matcher))
        .then_with(|| a.offset.cmp(&b.offset))
        .then_with(|| a.description.cmp(&b.description))
        .then_with(|| a.parameter_count.cmp(&b.parameter_count))
        .then_with(|| a.uri.cmp(&b.uri))
}
