//! Three-slot prefetch pipeline and its step driver states.

use crate::error::CoreError;

/// States of the pipeline step driver.
///
/// The first two states only fetch; from the third state on, every step
/// fetches into one slot and executes another, cycling through the three
/// execute states. A flush returns the driver to [`Self::FetchFirst`], so
/// exactly two fetch-only steps separate a taken branch from the next
/// executed instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum PipelineStage {
    /// Fetching the first opcode after reset or flush.
    #[default]
    FetchFirst,
    /// Fetching the second opcode.
    FetchSecond,
    /// Executing slot 0 while fetching into slot 2.
    ExecuteSlot0,
    /// Executing slot 1 while fetching into slot 0.
    ExecuteSlot1,
    /// Executing slot 2 while fetching into slot 1.
    ExecuteSlot2,
}

impl PipelineStage {
    /// Slot the current step fetches into.
    #[must_use]
    pub const fn fetch_slot(self) -> usize {
        match self {
            Self::FetchFirst | Self::ExecuteSlot1 => 0,
            Self::FetchSecond | Self::ExecuteSlot2 => 1,
            Self::ExecuteSlot0 => 2,
        }
    }

    /// Slot the current step executes from, if the pipeline is full.
    #[must_use]
    pub const fn execute_slot(self) -> Option<usize> {
        match self {
            Self::FetchFirst | Self::FetchSecond => None,
            Self::ExecuteSlot0 => Some(0),
            Self::ExecuteSlot1 => Some(1),
            Self::ExecuteSlot2 => Some(2),
        }
    }

    /// The state entered after a step that did not flush.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::FetchFirst => Self::FetchSecond,
            Self::FetchSecond | Self::ExecuteSlot2 => Self::ExecuteSlot0,
            Self::ExecuteSlot0 => Self::ExecuteSlot1,
            Self::ExecuteSlot1 => Self::ExecuteSlot2,
        }
    }

    /// Stable index used in snapshots.
    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Self::FetchFirst => 0,
            Self::FetchSecond => 1,
            Self::ExecuteSlot0 => 2,
            Self::ExecuteSlot1 => 3,
            Self::ExecuteSlot2 => 4,
        }
    }

    /// Decodes a snapshot stage index.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidPipelineStage`] for indices above 4.
    pub const fn from_index(index: u8) -> Result<Self, CoreError> {
        match index {
            0 => Ok(Self::FetchFirst),
            1 => Ok(Self::FetchSecond),
            2 => Ok(Self::ExecuteSlot0),
            3 => Ok(Self::ExecuteSlot1),
            4 => Ok(Self::ExecuteSlot2),
            _ => Err(CoreError::InvalidPipelineStage { index }),
        }
    }
}

/// The prefetch pipeline: three opcode slots, the driver state and a
/// pending-flush marker set by branching instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Pipeline {
    stage: PipelineStage,
    slots: [u32; 3],
    flush_pending: bool,
}

impl Pipeline {
    /// Returns an empty pipeline in the initial fetch state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            stage: PipelineStage::FetchFirst,
            slots: [0; 3],
            flush_pending: false,
        }
    }

    /// Current driver state.
    #[must_use]
    pub const fn stage(self) -> PipelineStage {
        self.stage
    }

    /// Stores a fetched opcode into the slot the current state fetches to.
    pub fn store_fetch(&mut self, opcode: u32) {
        self.slots[self.stage.fetch_slot()] = opcode;
    }

    /// Opcode the current state executes, if the pipeline is full.
    #[must_use]
    pub fn executing_opcode(self) -> Option<u32> {
        self.stage.execute_slot().map(|slot| self.slots[slot])
    }

    /// Marks that the executed instruction redirected control flow.
    pub fn request_flush(&mut self) {
        self.flush_pending = true;
    }

    /// Whether a flush was requested during the current step.
    #[must_use]
    pub const fn flush_pending(self) -> bool {
        self.flush_pending
    }

    /// Discards the prefetched opcodes and restarts from the first fetch.
    pub fn reset(&mut self) {
        self.stage = PipelineStage::FetchFirst;
        self.flush_pending = false;
    }

    /// Moves the driver to the state for the next step.
    pub fn advance(&mut self) {
        self.stage = self.stage.next();
    }

    /// Restores the driver state from a snapshot.
    pub fn restore(&mut self, stage: PipelineStage, slots: [u32; 3], flush_pending: bool) {
        self.stage = stage;
        self.slots = slots;
        self.flush_pending = flush_pending;
    }

    /// Raw slot contents, used by snapshots.
    #[must_use]
    pub const fn slots(self) -> [u32; 3] {
        self.slots
    }
}

#[cfg(test)]
mod tests {
    use super::{Pipeline, PipelineStage};

    #[test]
    fn driver_cycles_through_the_execute_states() {
        let mut stage = PipelineStage::FetchFirst;
        let mut seen = Vec::new();
        for _ in 0..8 {
            seen.push(stage);
            stage = stage.next();
        }
        assert_eq!(
            seen,
            [
                PipelineStage::FetchFirst,
                PipelineStage::FetchSecond,
                PipelineStage::ExecuteSlot0,
                PipelineStage::ExecuteSlot1,
                PipelineStage::ExecuteSlot2,
                PipelineStage::ExecuteSlot0,
                PipelineStage::ExecuteSlot1,
                PipelineStage::ExecuteSlot2,
            ]
        );
    }

    #[test]
    fn execute_slot_trails_the_fetch_slot_by_two() {
        for stage in [
            PipelineStage::ExecuteSlot0,
            PipelineStage::ExecuteSlot1,
            PipelineStage::ExecuteSlot2,
        ] {
            let execute = stage.execute_slot().expect("steady state executes");
            assert_eq!(stage.fetch_slot(), (execute + 2) % 3);
        }
    }

    #[test]
    fn flush_restarts_fetching() {
        let mut pipeline = Pipeline::new();
        for _ in 0..3 {
            pipeline.store_fetch(0);
            pipeline.advance();
        }
        assert!(pipeline.executing_opcode().is_some());
        pipeline.request_flush();
        pipeline.reset();
        assert_eq!(pipeline.stage(), PipelineStage::FetchFirst);
        assert!(!pipeline.flush_pending());
        assert!(pipeline.executing_opcode().is_none());
    }

    #[test]
    fn stage_index_round_trip() {
        for index in 0u8..5 {
            let stage = PipelineStage::from_index(index).expect("valid index");
            assert_eq!(stage.index(), index);
        }
        assert!(PipelineStage::from_index(5).is_err());
    }
}
