//! Lead deduplication by identity key.
//!
//! Collapses records that describe the same business (equal normalised
//! name, URL and phone) into one canonical record. The output keeps the
//! position of each identity key's first occurrence; when a later record
//! for the same key is strictly richer it takes over that slot.

use std::collections::HashMap;

use crate::types::LeadRecord;

use super::normalize::identity_key;
use super::scoring::richness_score;

/// Deduplicate lead records.
///
/// Deterministic for a given input order. Ties in richness keep the
/// first-seen record. Records whose fields all normalise to empty share
/// the identity key `"||"` and therefore collapse into one.
pub fn dedupe(records: Vec<LeadRecord>) -> Vec<LeadRecord> {
    // Identity key → (slot in `kept`, score of the record in that slot).
    let mut slots: HashMap<String, (usize, u8)> = HashMap::new();
    let mut kept: Vec<LeadRecord> = Vec::with_capacity(records.len());

    for record in records {
        let key = identity_key(&record);
        let score = richness_score(&record);

        match slots.get_mut(&key) {
            Some((slot, best)) => {
                if score > *best {
                    tracing::debug!(
                        key = %key,
                        replaced = *best,
                        by = score,
                        source = %record.source,
                        "richer duplicate replaced kept lead"
                    );
                    kept[*slot] = record;
                    *best = score;
                }
            }
            None => {
                slots.insert(key, (kept.len(), score));
                kept.push(record);
            }
        }
    }

    kept
}
