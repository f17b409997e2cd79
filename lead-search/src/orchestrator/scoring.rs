//! Richness scoring for colliding lead records.
//!
//! When two records share an identity key, the one carrying more contact
//! information is kept. The score is a small integer:
//!
//! | Field present                      | Points |
//! |------------------------------------|--------|
//! | phone                              | 3      |
//! | url                                | 2      |
//! | description                        | 1      |
//! | company name longer than 5 chars   | 1      |

use crate::types::LeadRecord;

/// Names longer than this many characters earn a point.
const SHORT_NAME_CHARS: usize = 5;

/// Calculate the richness score of a record.
///
/// Length is measured in characters, not bytes, so umlauts count once.
pub fn richness_score(record: &LeadRecord) -> u8 {
    let mut score = 0;
    if record.phone.is_some() {
        score += 3;
    }
    if record.url.is_some() {
        score += 2;
    }
    if record.description.is_some() {
        score += 1;
    }
    if record.company_name.chars().count() > SHORT_NAME_CHARS {
        score += 1;
    }
    score
}
