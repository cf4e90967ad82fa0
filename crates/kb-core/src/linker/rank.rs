use crate::linker::Candidate;
use crate::types::EntryId;
use std::collections::HashMap;

/// Drop candidates below `min_strength`, then keep a single candidate per
/// target: the strongest one, first seen on ties. Targets keep the order in
/// which they first survived the cutoff.
///
/// Only one link per target survives a detection pass, whatever signals
/// fired. The weaker signal's type and context are discarded.
pub fn rank_candidates(candidates: Vec<Candidate>, min_strength: f32) -> Vec<Candidate> {
    let mut ranked: Vec<Candidate> = Vec::new();
    let mut slot_by_target: HashMap<EntryId, usize> = HashMap::new();

    for candidate in candidates {
        if candidate.strength < min_strength {
            continue;
        }

        match slot_by_target.get(&candidate.to) {
            Some(&slot) => {
                if candidate.strength > ranked[slot].strength {
                    ranked[slot] = candidate;
                }
            }
            None => {
                slot_by_target.insert(candidate.to, ranked.len());
                ranked.push(candidate);
            }
        }
    }

    ranked
}
