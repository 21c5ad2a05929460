//! Constant-folding abstract interpretation of method bodies
//!
//! Every value on the operand stack and in the local variables is described by a [`Value`]: its
//! category (`int`, `long`, reference, ...) and, when it can be computed without running the
//! code, the literal it holds. Simulating instructions on these values (see [`Frame::execute`]
//! and the [`transfer`] functions) is enough to see through constant arithmetic, casts, and
//! string constants that have been split across several instructions.
//!
//! Things get more complicated when an instruction can be reached from several places (eg. it is
//! the target of jumps). The frames coming in from the different predecessors are merged slot by
//! slot, and anything that disagrees becomes [`Value::Top`] (or [`Value::WideTop`] when both
//! sides are `long`s or `double`s). This is a fixed-point computation (see [`Analyzer::analyze`])
//! which always terminates: a slot can only go from a specific value towards `top`, never back.
//!
//! The instructions and the control flow graph of the method are inputs. Building them from a
//! class file is someone else's job.

mod analyzer;
mod cfg;
mod errors;
mod frame;
mod settings;
pub mod transfer;
mod value;

pub use analyzer::*;
pub use cfg::*;
pub use errors::*;
pub use frame::*;
pub use settings::*;
pub use value::*;
