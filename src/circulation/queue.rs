//! Reservation queue: one FIFO waitlist per title

use std::collections::{HashMap, VecDeque};

use crate::models::Reservation;

/// What to do with the reservation at the head of a queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadDecision {
    /// Hand the copy to the head reader
    Assign,
    /// Keep the head where it is; nobody behind it is considered
    Hold,
    /// Drop the head without assigning
    Discard,
}

/// Result of [`ReservationQueue::resolve_head`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadOutcome {
    Empty,
    Assigned(Reservation),
    Held,
    Discarded(Reservation),
}

#[derive(Debug, Clone, Default)]
pub struct ReservationQueue {
    queues: HashMap<i32, VecDeque<Reservation>>,
}

impl ReservationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a title's queue wholesale (used when loading a snapshot)
    pub(crate) fn load(&mut self, title_id: i32, entries: Vec<Reservation>) {
        if entries.is_empty() {
            self.queues.remove(&title_id);
        } else {
            self.queues.insert(title_id, entries.into());
        }
    }

    /// Entries for a title, head first
    pub fn entries(&self, title_id: i32) -> Vec<Reservation> {
        self.queues
            .get(&title_id)
            .map(|queue| queue.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self, title_id: i32) -> usize {
        self.queues.get(&title_id).map_or(0, VecDeque::len)
    }

    /// 1-based position of a reader in a title's queue
    pub fn position(&self, title_id: i32, reader_id: &str) -> Option<usize> {
        self.queues
            .get(&title_id)?
            .iter()
            .position(|entry| entry.reader_id == reader_id)
            .map(|index| index + 1)
    }

    pub fn contains(&self, title_id: i32, reader_id: &str) -> bool {
        self.position(title_id, reader_id).is_some()
    }

    /// Append to the tail, returning the 1-based position
    pub(crate) fn enqueue(&mut self, title_id: i32, reservation: Reservation) -> usize {
        let queue = self.queues.entry(title_id).or_default();
        queue.push_back(reservation);
        queue.len()
    }

    /// Remove a reader's entry, keeping the order of the others
    pub(crate) fn remove(&mut self, title_id: i32, reader_id: &str) -> Option<Reservation> {
        let queue = self.queues.get_mut(&title_id)?;
        let index = queue.iter().position(|entry| entry.reader_id == reader_id)?;
        let removed = queue.remove(index);
        if queue.is_empty() {
            self.queues.remove(&title_id);
        }
        removed
    }

    /// Pop the head and let `decide` settle its fate.
    ///
    /// A held head goes back to the front, so an ineligible reader is never
    /// skipped in favour of someone behind them.
    pub(crate) fn resolve_head(
        &mut self,
        title_id: i32,
        decide: impl FnOnce(&Reservation) -> HeadDecision,
    ) -> HeadOutcome {
        let Some(queue) = self.queues.get_mut(&title_id) else {
            return HeadOutcome::Empty;
        };
        let Some(head) = queue.pop_front() else {
            return HeadOutcome::Empty;
        };

        let outcome = match decide(&head) {
            HeadDecision::Assign => HeadOutcome::Assigned(head),
            HeadDecision::Discard => HeadOutcome::Discarded(head),
            HeadDecision::Hold => {
                queue.push_front(head);
                HeadOutcome::Held
            }
        };

        if queue.is_empty() {
            self.queues.remove(&title_id);
        }
        outcome
    }

    /// Drop a title's whole queue
    pub(crate) fn drop_title(&mut self, title_id: i32) -> Vec<Reservation> {
        self.queues
            .remove(&title_id)
            .map(Vec::from)
            .unwrap_or_default()
    }

    /// Remove a reader from every queue, returning the affected title ids
    pub(crate) fn remove_reader(&mut self, reader_id: &str) -> Vec<i32> {
        let mut affected = Vec::new();
        for (title_id, queue) in self.queues.iter_mut() {
            let before = queue.len();
            queue.retain(|entry| entry.reader_id != reader_id);
            if queue.len() != before {
                affected.push(*title_id);
            }
        }
        self.queues.retain(|_, queue| !queue.is_empty());
        affected.sort_unstable();
        affected
    }
}
