//! Three-lane outbound command queue.
//!
//! Pending commands sit in one of three lanes until the dispatcher
//! drains them:
//!
//! - **priority**: power and handshake commands, strictly FIFO, drained
//!   before the normal lane.
//! - **normal**: everything else, FIFO with supersede rules per
//!   category (replace in place for idempotent setters, move to end for
//!   polls).
//! - **flood**: volume ramp steps. Capped; when full the whole lane is
//!   cleared before the newest step is appended, because only the most
//!   recent ramp position matters. Drained as a burst ahead of both
//!   other lanes.
//!
//! The queue is a plain data structure with no locking of its own; the
//! controller wraps it in a mutex and holds it only for the enqueue or
//! dequeue itself.

use std::collections::VecDeque;

use tracing::{debug, trace};

use lumen_protocol::{Command, Lane, QueueBehavior};

/// Pending commands awaiting dispatch, split across three lanes.
#[derive(Debug)]
pub struct CommandQueue {
    priority: VecDeque<Command>,
    normal: VecDeque<Command>,
    flood: VecDeque<Command>,

    /// Maximum flood-lane length before the lane is flushed.
    flood_cap: usize,
}

impl CommandQueue {
    pub fn new(flood_cap: usize) -> Self {
        Self {
            priority: VecDeque::new(),
            normal: VecDeque::new(),
            flood: VecDeque::with_capacity(flood_cap),
            flood_cap,
        }
    }

    /// Insert a command into the lane its category routes to.
    pub fn enqueue(&mut self, command: Command) {
        match command.lane() {
            Lane::Priority => {
                trace!(%command, "Enqueue priority");
                self.priority.push_back(command);
            }
            Lane::Flood => {
                if self.flood.len() >= self.flood_cap {
                    debug!(
                        dropped = self.flood.len(),
                        "Flood lane at cap, dropping stale ramp commands"
                    );
                    self.flood.clear();
                }
                trace!(%command, "Enqueue flood");
                self.flood.push_back(command);
            }
            Lane::Normal => self.enqueue_normal(command),
        }
    }

    fn enqueue_normal(&mut self, command: Command) {
        let category = command.category();
        let existing = self.normal.iter().position(|c| c.category() == category);

        match (category.queue_behavior(), existing) {
            (QueueBehavior::Replace, Some(pos)) => {
                trace!(%command, pos, "Superseding queued command in place");
                self.normal[pos] = command;
            }
            (QueueBehavior::MoveToEnd, Some(pos)) => {
                trace!(%command, pos, "Moving queued poll to tail");
                self.normal.remove(pos);
                self.normal.push_back(command);
            }
            _ => {
                trace!(%command, "Enqueue normal");
                self.normal.push_back(command);
            }
        }
    }

    /// Pop the next command to send.
    ///
    /// A non-empty flood lane is drained entirely before either other
    /// lane is considered; then priority, then normal.
    pub fn dequeue_next(&mut self) -> Option<Command> {
        if let Some(cmd) = self.flood.pop_front() {
            return Some(cmd);
        }
        if let Some(cmd) = self.priority.pop_front() {
            return Some(cmd);
        }
        self.normal.pop_front()
    }

    /// Drop every pending command. Invoked on disconnect; nothing queued
    /// before the drop may ever reach the device after a reconnect.
    pub fn clear_all(&mut self) {
        let dropped = self.len();
        if dropped > 0 {
            debug!(dropped, "Flushing command queue");
        }
        self.priority.clear();
        self.normal.clear();
        self.flood.clear();
    }

    pub fn len(&self) -> usize {
        self.priority.len() + self.normal.len() + self.flood.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    fn lane_lens(&self) -> (usize, usize, usize) {
        (self.priority.len(), self.normal.len(), self.flood.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_protocol::CommandCategory;
    use rstest::rstest;

    fn cmd(category: CommandCategory, payload: &'static [u8]) -> Command {
        Command::new(category, payload)
    }

    #[test]
    fn test_replace_keeps_position_and_latest_payload() {
        let mut queue = CommandQueue::new(5);

        queue.enqueue(cmd(CommandCategory::SetMute, b"MUTE ON"));
        queue.enqueue(cmd(CommandCategory::SetInput, b"INPT 1"));
        queue.enqueue(cmd(CommandCategory::VolumePoll, b"AVOL ?"));
        queue.enqueue(cmd(CommandCategory::SetInput, b"INPT 3"));

        assert_eq!(queue.len(), 3);

        // Position preserved: mute, input, poll.
        assert_eq!(queue.dequeue_next().unwrap().payload().as_ref(), b"MUTE ON");
        let superseded = queue.dequeue_next().unwrap();
        assert_eq!(superseded.category(), CommandCategory::SetInput);
        assert_eq!(superseded.payload().as_ref(), b"INPT 3");
    }

    #[rstest]
    #[case::power(CommandCategory::PowerPoll)]
    #[case::volume(CommandCategory::VolumePoll)]
    #[case::status(CommandCategory::StatusPoll)]
    #[case::lamp(CommandCategory::LampPoll)]
    fn test_poll_moves_to_end(#[case] poll: CommandCategory) {
        let mut queue = CommandQueue::new(5);

        queue.enqueue(cmd(poll, b"?"));
        queue.enqueue(cmd(CommandCategory::SetInput, b"INPT 2"));
        queue.enqueue(cmd(poll, b"?"));

        assert_eq!(queue.len(), 2);
        assert_eq!(
            queue.dequeue_next().unwrap().category(),
            CommandCategory::SetInput
        );
        assert_eq!(queue.dequeue_next().unwrap().category(), poll);
    }

    #[test]
    fn test_flood_cap_drops_stale_entries() {
        let mut queue = CommandQueue::new(5);

        for _ in 0..6 {
            queue.enqueue(cmd(CommandCategory::VolumeStep, b"AVOL +"));
        }

        let (_, _, flood) = queue.lane_lens();
        assert!(flood <= 5);
        assert_eq!(flood, 1); // lane flushed at cap, then newest appended
    }

    #[test]
    fn test_flood_drains_as_burst_before_other_lanes() {
        let mut queue = CommandQueue::new(5);

        queue.enqueue(cmd(CommandCategory::SetInput, b"INPT 2"));
        queue.enqueue(cmd(CommandCategory::PowerOn, b"POWR ON"));
        queue.enqueue(cmd(CommandCategory::VolumeStep, b"AVOL +"));
        queue.enqueue(cmd(CommandCategory::VolumeStep, b"AVOL +"));

        assert_eq!(
            queue.dequeue_next().unwrap().category(),
            CommandCategory::VolumeStep
        );
        assert_eq!(
            queue.dequeue_next().unwrap().category(),
            CommandCategory::VolumeStep
        );
        // Burst exhausted, then priority before normal.
        assert_eq!(
            queue.dequeue_next().unwrap().category(),
            CommandCategory::PowerOn
        );
        assert_eq!(
            queue.dequeue_next().unwrap().category(),
            CommandCategory::SetInput
        );
        assert!(queue.dequeue_next().is_none());
    }

    #[test]
    fn test_priority_lane_appends_in_order() {
        let mut queue = CommandQueue::new(5);

        queue.enqueue(cmd(CommandCategory::PowerOff, b"POWR OFF"));
        queue.enqueue(cmd(CommandCategory::PowerOn, b"POWR ON"));
        queue.enqueue(cmd(CommandCategory::PowerOff, b"POWR OFF"));

        // Order-significant: no dedup in the priority lane.
        assert_eq!(queue.len(), 3);
        assert_eq!(
            queue.dequeue_next().unwrap().category(),
            CommandCategory::PowerOff
        );
        assert_eq!(
            queue.dequeue_next().unwrap().category(),
            CommandCategory::PowerOn
        );
    }

    #[test]
    fn test_clear_all_empties_every_lane() {
        let mut queue = CommandQueue::new(5);

        queue.enqueue(cmd(CommandCategory::PowerOn, b"POWR ON"));
        queue.enqueue(cmd(CommandCategory::SetInput, b"INPT 2"));
        queue.enqueue(cmd(CommandCategory::VolumeStep, b"AVOL +"));

        queue.clear_all();

        assert!(queue.is_empty());
        assert!(queue.dequeue_next().is_none());
    }
}
