//! Scheduler collaborator contract.
//!
//! # Responsibility
//! - Define the minimal surface the collection needs from a scheduler:
//!   session reset, study counters, and unburying on cleanup.
//!
//! The spaced-repetition algorithm itself lives outside this crate; the
//! in-crate [`SimpleScheduler`] only tracks counters so that undo and
//! cleanup paths are exercisable without a full implementation.

use crate::model::card::CardQueue;
use crate::repo::RepoResult;
use rusqlite::Connection;

/// Collection-facing scheduler surface.
pub trait Scheduler {
    /// Clears session state ahead of a new study queue build.
    fn reset(&mut self);

    /// Total answers recorded this session.
    fn reps(&self) -> u32;

    fn bump_reps(&mut self);

    /// Adjusts the today-counter for the bucket the queue maps to.
    fn update_stats(&mut self, queue: CardQueue, delta: i32);

    /// Returns buried cards to their regular queues.
    fn unbury_cards(&self, conn: &Connection) -> RepoResult<()>;
}

/// Counter-only scheduler used as the in-crate default.
#[derive(Debug, Default)]
pub struct SimpleScheduler {
    new_today: i32,
    learn_today: i32,
    review_today: i32,
    reps: u32,
}

impl SimpleScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counts(&self) -> (i32, i32, i32) {
        (self.new_today, self.learn_today, self.review_today)
    }
}

impl Scheduler for SimpleScheduler {
    fn reset(&mut self) {
        self.new_today = 0;
        self.learn_today = 0;
        self.review_today = 0;
    }

    fn reps(&self) -> u32 {
        self.reps
    }

    fn bump_reps(&mut self) {
        self.reps += 1;
    }

    fn update_stats(&mut self, queue: CardQueue, delta: i32) {
        match queue {
            CardQueue::New => self.new_today += delta,
            CardQueue::Learn | CardQueue::DayLearn => self.learn_today += delta,
            CardQueue::Review => self.review_today += delta,
            CardQueue::Suspended | CardQueue::SchedBuried | CardQueue::UserBuried => {}
        }
    }

    fn unbury_cards(&self, conn: &Connection) -> RepoResult<()> {
        conn.execute(
            "UPDATE cards SET queue = type WHERE queue IN (-2, -3);",
            [],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Scheduler, SimpleScheduler};
    use crate::model::card::CardQueue;

    #[test]
    fn stats_track_queue_buckets() {
        let mut sched = SimpleScheduler::new();
        sched.update_stats(CardQueue::New, 1);
        sched.update_stats(CardQueue::Learn, 1);
        sched.update_stats(CardQueue::Review, 1);
        sched.update_stats(CardQueue::Review, -1);
        assert_eq!(sched.counts(), (1, 1, 0));

        sched.reset();
        assert_eq!(sched.counts(), (0, 0, 0));
    }

    #[test]
    fn suspended_queues_do_not_touch_counters() {
        let mut sched = SimpleScheduler::new();
        sched.update_stats(CardQueue::Suspended, 1);
        assert_eq!(sched.counts(), (0, 0, 0));
    }
}
