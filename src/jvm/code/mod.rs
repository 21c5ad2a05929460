//! Method bytecode, as handed to the analysis
//!
//! Parsing the `Code` attribute is not done here: the instructions arrive with their constant
//! pool operands already resolved (see [`Instruction`]), in the order they appear in the method.
//! Positions in that order ([`InsnIndex`]) are what branch targets, control flow graph blocks,
//! and analysis results refer to.

mod instruction;

pub use instruction::*;
