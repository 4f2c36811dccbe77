use log::debug;

use crate::domains::Domains;
use crate::errors::DomainWipeout;
use crate::geometry::Geometry;
use crate::WordId;

/// Remove every candidate whose length doesn't match its slot. This is the only unary constraint
/// in a crossword, so one pass is enough. Returns the number of eliminations, or the first slot
/// left without candidates (including one that started out empty).
///
/// `domains` must have been built for `geometry`.
pub fn enforce_node_consistency(
    geometry: &Geometry,
    domains: &mut Domains,
) -> Result<usize, DomainWipeout> {
    debug_assert_eq!(domains.slot_count(), geometry.slot_count());
    let pool = domains.pool().clone();
    let mut elimination_count = 0;

    for (slot_id, slot) in geometry.slots().iter().enumerate() {
        let doomed: Vec<WordId> = domains
            .options(slot_id)
            .filter(|&word_id| pool[word_id].len() != slot.length)
            .collect();

        for word_id in doomed {
            domains.remove(slot_id, word_id);
            elimination_count += 1;
        }
    }

    debug!("Node consistency eliminated {elimination_count} options");

    domains.check_nonempty()?;
    Ok(elimination_count)
}
