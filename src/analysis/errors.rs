use super::BlockId;
use crate::jvm::code::{InsnIndex, Instruction};

/// Why a single instruction (or a merge of two frames) could not be interpreted
///
/// These are always structural problems with the method: well-formed bytecode never produces
/// them. Arithmetic hazards such as division by a constant zero are not faults.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FaultKind {
    #[error("pop from an empty operand stack")]
    EmptyStack,

    #[error("operand stack exceeds its declared maximum of {0} slots")]
    StackOverflow(usize),

    #[error("operand of width {0} where a different width was expected")]
    InvalidWidth(usize),

    #[error("local variable {0} is out of range")]
    InvalidLocal(u16),

    #[error("invalid primitive array tag {0}")]
    InvalidArrayTag(u8),

    #[error("constant cannot be loaded: {0}")]
    IllegalConstant(String),

    #[error("incompatible stack heights {0} and {1} at a join point")]
    IncompatibleStackHeights(usize, usize),

    /// Should be unreachable (indicates a bug in the analysis)
    #[error("internal error: {0}")]
    Internal(&'static str),
}

/// Failure to analyze one method
///
/// No frames are produced for a method that fails to analyze. Callers analyzing many methods
/// should treat this as "method unanalyzable" and carry on with the next one.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    /// An instruction could not be interpreted
    #[error("{method}: instruction {index} ({instruction:?}): {kind}")]
    Instruction {
        method: String,
        index: InsnIndex,
        instruction: Instruction,
        kind: FaultKind,
    },

    /// The frame flowing into a block could not be merged with the one already recorded there
    #[error("{method}: cannot merge frames entering {block:?}: {kind}")]
    Frame {
        method: String,
        block: BlockId,
        kind: FaultKind,
    },

    /// The control flow graph doesn't fit the method's instructions
    #[error("{method}: invalid control flow graph: {reason}")]
    InvalidControlFlow { method: String, reason: String },

    /// The worklist did not empty within the configured number of block visits
    #[error("{method}: no fixed point after {limit} block visits")]
    IterationLimit { method: String, limit: usize },

    /// The method's parameters don't fit in its declared local variables
    #[error("{method}: cannot build entry frame: {kind}")]
    InvalidEntryFrame { method: String, kind: FaultKind },
}

impl AnalysisError {
    /// Method (rendered as `class.name descriptor`) whose analysis failed
    pub fn method(&self) -> &str {
        match self {
            AnalysisError::Instruction { method, .. }
            | AnalysisError::Frame { method, .. }
            | AnalysisError::InvalidControlFlow { method, .. }
            | AnalysisError::IterationLimit { method, .. }
            | AnalysisError::InvalidEntryFrame { method, .. } => method,
        }
    }
}
