use crate::jvm::code::InsnIndex;
use crate::jvm::BinaryName;
use std::fmt;
use std::ops::Range;

/// Identifier of a block in a [`ControlFlowGraph`]
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct BlockId(pub usize);

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block{}", self.0)
    }
}

/// Straight-line run of instructions
///
/// Control only enters at `start` and only leaves after the last instruction (or through an
/// exception edge).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BasicBlock {
    /// First instruction in the block
    pub start: InsnIndex,

    /// One past the last instruction in the block
    pub end: InsnIndex,
}

impl BasicBlock {
    pub fn instructions(&self) -> impl Iterator<Item = InsnIndex> {
        (self.start.0..self.end.0).map(InsnIndex)
    }

    pub fn len(&self) -> usize {
        self.end.0.saturating_sub(self.start.0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// How control gets from one block to the next
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EdgeKind {
    /// Fall-through, jump, switch, or subroutine edge
    Normal,

    /// Edge into an exception handler protecting the source block
    ///
    /// Carries the caught class, or `None` for a catch-all handler.
    Exception(Option<BinaryName>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Edge {
    pub target: BlockId,
    pub kind: EdgeKind,
}

/// Basic blocks and edges of one method, as produced by whatever structured the bytecode
///
/// The first block added is the entry block. Blocks don't need to cover every instruction
/// (unreachable code can be left out), but they must not overlap.
#[derive(Clone, Debug, Default)]
pub struct ControlFlowGraph {
    blocks: Vec<BasicBlock>,
    successors: Vec<Vec<Edge>>,

    /// Sources of edges added before their block existed
    dangling_edges: Vec<BlockId>,
}

impl ControlFlowGraph {
    pub fn new() -> ControlFlowGraph {
        ControlFlowGraph::default()
    }

    /// Graph made of a single block holding the first `instruction_count` instructions
    pub fn single_block(instruction_count: usize) -> ControlFlowGraph {
        let mut cfg = ControlFlowGraph::new();
        cfg.add_block(0..instruction_count);
        cfg
    }

    /// Add a block covering the given instruction indices
    pub fn add_block(&mut self, instructions: Range<usize>) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(BasicBlock {
            start: InsnIndex(instructions.start),
            end: InsnIndex(instructions.end),
        });
        self.successors.push(vec![]);
        id
    }

    /// Add a normal control flow edge
    ///
    /// An edge out of a block that doesn't exist yet is dropped and reported by [`Self::validate`].
    pub fn add_edge(&mut self, from: BlockId, to: BlockId) {
        self.push_edge(from, to, EdgeKind::Normal);
    }

    /// Add an edge from a protected block into its exception handler
    pub fn add_exception_edge(
        &mut self,
        from: BlockId,
        handler: BlockId,
        catch_type: Option<BinaryName>,
    ) {
        self.push_edge(from, handler, EdgeKind::Exception(catch_type));
    }

    fn push_edge(&mut self, from: BlockId, target: BlockId, kind: EdgeKind) {
        match self.successors.get_mut(from.0) {
            Some(edges) => edges.push(Edge { target, kind }),
            None => self.dangling_edges.push(from),
        }
    }

    pub fn entry(&self) -> BlockId {
        BlockId(0)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(id.0)
    }

    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &BasicBlock)> {
        self.blocks
            .iter()
            .enumerate()
            .map(|(idx, block)| (BlockId(idx), block))
    }

    pub fn successors(&self, id: BlockId) -> &[Edge] {
        self.successors.get(id.0).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Check that the graph makes sense for a method with this many instructions
    pub fn validate(&self, instruction_count: usize) -> Result<(), String> {
        if self.blocks.is_empty() {
            return Err(String::from("graph has no entry block"));
        }
        if let Some(from) = self.dangling_edges.first() {
            return Err(format!("edge from unknown block {:?}", from));
        }

        let mut ranges: Vec<(BlockId, &BasicBlock)> = self.blocks().collect();
        for (id, block) in &ranges {
            if block.is_empty() {
                return Err(format!("{:?} is empty", id));
            }
            if block.end.0 > instruction_count {
                return Err(format!(
                    "{:?} ends at {:?} but there are only {} instructions",
                    id, block.end, instruction_count
                ));
            }
            for edge in self.successors(*id) {
                if self.block(edge.target).is_none() {
                    return Err(format!("{:?} has an edge to unknown {:?}", id, edge.target));
                }
            }
        }

        ranges.sort_by_key(|(_, block)| block.start);
        for pair in ranges.windows(2) {
            let (first_id, first) = pair[0];
            let (second_id, second) = pair[1];
            if first.end > second.start {
                return Err(format!("{:?} overlaps {:?}", first_id, second_id));
            }
        }

        Ok(())
    }
}
