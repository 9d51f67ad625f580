// src/votes.rs
//
// One-second rolling vote window. Many proposal producers, one tally
// consumer; the window swap happens under a single lock so a proposal lands
// either in the window being tallied or in the fresh one, never both.

use std::collections::HashMap;
use std::mem;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, info};

use crate::commands::Movement;

#[derive(Default)]
pub struct VoteAggregator {
    window: Mutex<HashMap<String, Movement>>,

    /// Voter count of the last non-empty window, kept sticky across empty
    /// windows for the viewcount stat.
    last_active: AtomicUsize,
}

impl VoteAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `raw_text` as the vote for `voter_id` in the current window.
    /// A voter's later vote replaces their earlier one; unrecognized text is
    /// dropped without surfacing an error to the submitter.
    pub fn propose(&self, voter_id: &str, raw_text: &str) {
        let movement = match raw_text.parse::<Movement>() {
            Ok(m) => m,
            Err(_) => {
                debug!("ignoring unrecognized vote '{}' from {}", raw_text, voter_id);
                return;
            }
        };
        let mut window = self.window.lock().unwrap();
        window.insert(voter_id.to_string(), movement);
    }

    /// Closes the current window and returns the winning movement, if any.
    ///
    /// The winner is the movement with the strictly highest vote count; ties
    /// go to the lexicographically smallest verb so repeated runs over the
    /// same votes always pick the same command. An empty window yields
    /// `None` and the previous winner is never re-emitted.
    pub fn tick(&self) -> Option<Movement> {
        let closed = {
            let mut window = self.window.lock().unwrap();
            mem::take(&mut *window)
        };
        if closed.is_empty() {
            return None;
        }
        self.last_active.store(closed.len(), Ordering::Relaxed);

        let mut counts: HashMap<Movement, usize> = HashMap::new();
        for movement in closed.values() {
            *counts.entry(*movement).or_insert(0) += 1;
        }

        let winner = counts
            .iter()
            .max_by(|&(a, ca), &(b, cb)| {
                // Higher count wins; on equal counts the smaller verb must
                // compare as the max, hence the flipped operands.
                ca.cmp(cb).then_with(|| b.as_str().cmp(a.as_str()))
            })
            .map(|(movement, _)| *movement);

        if let Some(m) = winner {
            info!("command '{}' won with {} votes", m, counts[&m]);
        }
        winner
    }

    /// Distinct voters with a pending vote in the current window. Display
    /// only; may be slightly stale relative to the next tick.
    pub fn live_count(&self) -> usize {
        self.window.lock().unwrap().len()
    }

    /// Voter count of the most recent non-empty window (the original
    /// "viewcount" behavior: it does not reset when chat goes quiet).
    pub fn last_active_count(&self) -> usize {
        self.last_active.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_vote_per_voter_wins() {
        let agg = VoteAggregator::new();
        agg.propose("a", "forward");
        agg.propose("a", "sit");
        agg.propose("b", "sit");
        assert_eq!(agg.tick(), Some(Movement::Sit));
    }

    #[test]
    fn majority_wins() {
        let agg = VoteAggregator::new();
        agg.propose("a", "forward");
        agg.propose("b", "forward");
        agg.propose("c", "forward");
        agg.propose("d", "sit");
        assert_eq!(agg.tick(), Some(Movement::Forward));
    }

    #[test]
    fn tie_breaks_to_lexicographically_smallest_verb() {
        for _ in 0..50 {
            let agg = VoteAggregator::new();
            agg.propose("a", "forward");
            agg.propose("b", "forward");
            agg.propose("c", "backward");
            agg.propose("d", "backward");
            // "backward" < "forward"
            assert_eq!(agg.tick(), Some(Movement::Backward));
        }
    }

    #[test]
    fn empty_window_has_no_winner() {
        let agg = VoteAggregator::new();
        assert_eq!(agg.tick(), None);

        // A winner from a previous window is not re-emitted either.
        agg.propose("a", "stand");
        assert_eq!(agg.tick(), Some(Movement::Stand));
        assert_eq!(agg.tick(), None);
    }

    #[test]
    fn invalid_text_is_not_a_vote() {
        let agg = VoteAggregator::new();
        agg.propose("a", "dance");
        agg.propose("b", "pause");
        assert_eq!(agg.live_count(), 0);
        assert_eq!(agg.tick(), None);
    }

    #[test]
    fn live_count_tracks_current_window_only() {
        let agg = VoteAggregator::new();
        agg.propose("a", "sit");
        agg.propose("b", "stand");
        agg.propose("a", "forward");
        assert_eq!(agg.live_count(), 2);
        agg.tick();
        assert_eq!(agg.live_count(), 0);
        assert_eq!(agg.last_active_count(), 2);
    }
}
