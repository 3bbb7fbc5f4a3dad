//! Architectural register and pipeline state.

pub mod bank;
pub mod pipeline;

pub use bank::{RegisterBank, RegisterSlot};
pub use pipeline::{Pipeline, PipelineStage};
