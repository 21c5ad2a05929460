#![allow(dead_code)]

use jvmfold::analysis::{BlockId, ControlFlowGraph, MethodBody, Value};
use jvmfold::jvm::code::Instruction;
use jvmfold::jvm::{
    BinaryName, MethodAccessFlags, MethodDescriptor, Name, ParseDescriptor, UnqualifiedName,
};

/// Log output from the analysis shows up next to failing tests
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Static method on `me/lpk/Sample`
pub fn static_method(
    name: &str,
    descriptor: &str,
    max_locals: u16,
    max_stack: u16,
    instructions: Vec<Instruction>,
) -> MethodBody {
    MethodBody {
        class: BinaryName::from_str("me/lpk/Sample").unwrap(),
        name: UnqualifiedName::from_str(name).unwrap(),
        descriptor: MethodDescriptor::parse(descriptor).unwrap(),
        access_flags: MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
        max_locals,
        max_stack,
        instructions,
    }
}

/// Graph built from blocks (given by the instruction they start at) and edges between them
///
/// Blocks run up to the start of the next block, and the last one to the end of the method.
pub fn blocks(
    instruction_count: usize,
    starts: &[usize],
    edges: &[(usize, usize)],
) -> ControlFlowGraph {
    let mut cfg = ControlFlowGraph::new();
    for (idx, start) in starts.iter().enumerate() {
        let end = starts.get(idx + 1).copied().unwrap_or(instruction_count);
        cfg.add_block(*start..end);
    }
    for (from, to) in edges {
        cfg.add_edge(BlockId(*from), BlockId(*to));
    }
    cfg
}

pub fn int(i: i32) -> Value {
    Value::Int(Some(i))
}

pub fn long(l: i64) -> Value {
    Value::Long(Some(l))
}

pub fn class(name: &str) -> BinaryName {
    BinaryName::from_str(name).unwrap()
}
