use thiserror::Error;

/// Errors reported by host-facing surfaces of the core.
///
/// Instruction execution itself never fails; undefined or unimplemented
/// encodings retire without architectural effect. These errors only arise
/// when the host hands the core malformed data, such as a snapshot with
/// invalid mode bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The five mode bits do not name an architectural processor mode.
    #[error("invalid processor mode bits {bits:#04x}")]
    InvalidMode {
        /// The rejected mode bit pattern.
        bits: u32,
    },
    /// A serialized pipeline stage index was out of range.
    #[error("invalid pipeline stage index {index}")]
    InvalidPipelineStage {
        /// The rejected stage index.
        index: u8,
    },
    /// A condition field value was outside the 4-bit encoding space.
    #[error("invalid condition field {bits:#x}")]
    InvalidCondition {
        /// The rejected condition bits.
        bits: u32,
    },
}
