//! Abstract interpreter for JVM bytecode that folds constants
//!
//! Given a method's resolved instructions and control flow graph, [`analysis::Analyzer`] computes
//! the symbolic stack and local variables before every instruction. Downstream pattern detectors
//! read those frames to recover values (eg. a string assembled from pieces, or an `int` computed
//! through a chain of arithmetic) without executing anything.

pub mod analysis;
pub mod jvm;
mod util;
