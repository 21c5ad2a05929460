use super::{
    AnalysisError, BlockId, ControlFlowGraph, EdgeKind, FaultKind, Frame, Settings, Value,
};
use crate::jvm::code::{InsnIndex, Instruction};
use crate::jvm::{
    BinaryName, MethodAccessFlags, MethodDescriptor, Name, RenderDescriptor, UnqualifiedName,
};
use log::{debug, trace, warn};
use std::collections::VecDeque;
use std::fmt;

/// Everything the analysis needs to know about one method
#[derive(Clone, Debug)]
pub struct MethodBody {
    /// Class declaring the method (type of `this` for instance methods)
    pub class: BinaryName,

    pub name: UnqualifiedName,

    pub descriptor: MethodDescriptor<BinaryName>,

    pub access_flags: MethodAccessFlags,

    /// Number of local variable slots, from the `Code` attribute
    pub max_locals: u16,

    /// Maximum depth of the operand stack in slots, from the `Code` attribute
    pub max_stack: u16,

    pub instructions: Vec<Instruction>,
}

impl fmt::Display for MethodBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}{}",
            self.class.as_str(),
            self.name.as_str(),
            self.descriptor.render()
        )
    }
}

/// Frames computed for every instruction of one method
///
/// Instructions that aren't in any block reachable from the entry block have no frames.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frames {
    before: Vec<Option<Frame>>,
    after: Vec<Option<Frame>>,
}

impl Frames {
    /// Frame just before the instruction executes
    pub fn before(&self, idx: InsnIndex) -> Option<&Frame> {
        self.before.get(idx.0).and_then(Option::as_ref)
    }

    /// Frame just after the instruction executes (before following any branch)
    pub fn after(&self, idx: InsnIndex) -> Option<&Frame> {
        self.after.get(idx.0).and_then(Option::as_ref)
    }

    pub fn is_reachable(&self, idx: InsnIndex) -> bool {
        self.before(idx).is_some()
    }

    /// Number of instructions in the method (reachable or not)
    pub fn len(&self) -> usize {
        self.before.len()
    }

    pub fn is_empty(&self) -> bool {
        self.before.is_empty()
    }

    /// Frames before each reachable instruction, in instruction order
    pub fn iter(&self) -> impl Iterator<Item = (InsnIndex, &Frame)> {
        self.before
            .iter()
            .enumerate()
            .filter_map(|(idx, frame)| frame.as_ref().map(|frame| (InsnIndex(idx), frame)))
    }
}

/// Fixed-point driver computing [`Frames`] for methods
///
/// Analyzing a method only reads the analyzer, so one analyzer can be shared across threads
/// analyzing different methods.
#[derive(Clone, Debug, Default)]
pub struct Analyzer {
    settings: Settings,
}

impl Analyzer {
    pub fn new(settings: Settings) -> Analyzer {
        Analyzer { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Compute the frame before and after every reachable instruction in the method
    ///
    /// Blocks are replayed from their entry frame, and the resulting frames are merged into the
    /// entry frames of their successors until no entry frame changes. Exception handlers are
    /// entered with the frame from before every instruction of the blocks they protect (as well
    /// as the frame at the end of the block), with the stack replaced by the caught exception.
    pub fn analyze(
        &self,
        method: &MethodBody,
        cfg: &ControlFlowGraph,
    ) -> Result<Frames, AnalysisError> {
        let method_name = method.to_string();
        debug!(
            "analyzing {} ({} instructions, {} blocks)",
            method_name,
            method.instructions.len(),
            cfg.len()
        );

        cfg.validate(method.instructions.len())
            .map_err(|reason| AnalysisError::InvalidControlFlow {
                method: method_name.clone(),
                reason,
            })?;

        let this_class = if method.access_flags.has_receiver() {
            Some(&method.class)
        } else {
            None
        };
        let entry_frame = Frame::entry(
            this_class,
            &method.descriptor,
            method.max_locals as usize,
            method.max_stack as usize,
        )
        .map_err(|kind| AnalysisError::InvalidEntryFrame {
            method: method_name.clone(),
            kind,
        })?;

        let mut worklist = Worklist::new(cfg.len());
        worklist
            .propagate(cfg.entry(), entry_frame)
            .map_err(|kind| AnalysisError::Frame {
                method: method_name.clone(),
                block: cfg.entry(),
                kind,
            })?;

        let mut before: Vec<Option<Frame>> = vec![None; method.instructions.len()];
        let mut after: Vec<Option<Frame>> = vec![None; method.instructions.len()];
        let mut visits: usize = 0;

        while let Some((block_id, mut frame)) = worklist.pop() {
            visits += 1;
            if let Some(limit) = self.settings.max_block_visits {
                if visits > limit {
                    return Err(AnalysisError::IterationLimit {
                        method: method_name,
                        limit,
                    });
                }
            }

            let block = cfg
                .block(block_id)
                .ok_or_else(|| AnalysisError::InvalidControlFlow {
                    method: method_name.clone(),
                    reason: format!("{:?} is not in the graph", block_id),
                })?;
            trace!("visiting {:?} with {:?}", block_id, frame);

            let handlers: Vec<(BlockId, Value)> = cfg
                .successors(block_id)
                .iter()
                .filter_map(|edge| match &edge.kind {
                    EdgeKind::Normal => None,
                    EdgeKind::Exception(catch_type) => {
                        let exception = catch_type
                            .clone()
                            .unwrap_or_else(|| self.settings.default_exception_type.clone());
                        Some((edge.target, Value::object(exception)))
                    }
                })
                .collect();

            let enter_handlers =
                |worklist: &mut Worklist, frame: &Frame| -> Result<(), AnalysisError> {
                    for (handler, exception) in &handlers {
                        worklist
                            .propagate(*handler, frame.exception_handler(exception.clone()))
                            .map_err(|kind| AnalysisError::Frame {
                                method: method_name.clone(),
                                block: *handler,
                                kind,
                            })?;
                    }
                    Ok(())
                };

            for idx in block.instructions() {
                let insn = method.instructions.get(idx.0).ok_or_else(|| {
                    AnalysisError::InvalidControlFlow {
                        method: method_name.clone(),
                        reason: format!("{:?} is past the end of the method", idx),
                    }
                })?;

                enter_handlers(&mut worklist, &frame)?;
                before[idx.0] = Some(frame.clone());
                frame
                    .execute(insn)
                    .map_err(|kind| AnalysisError::Instruction {
                        method: method_name.clone(),
                        index: idx,
                        instruction: insn.clone(),
                        kind,
                    })?;
                after[idx.0] = Some(frame.clone());
            }
            enter_handlers(&mut worklist, &frame)?;

            for edge in cfg.successors(block_id) {
                if edge.kind == EdgeKind::Normal {
                    worklist
                        .propagate(edge.target, frame.clone())
                        .map_err(|kind| AnalysisError::Frame {
                            method: method_name.clone(),
                            block: edge.target,
                            kind,
                        })?;
                }
            }
        }

        debug!("analyzed {} in {} block visits", method_name, visits);
        Ok(Frames { before, after })
    }

    /// Analyze several methods independently
    ///
    /// A method that fails to analyze is logged and reported in its slot of the output, but
    /// doesn't stop the remaining methods from being analyzed.
    pub fn analyze_all<'a>(
        &self,
        methods: impl IntoIterator<Item = (&'a MethodBody, &'a ControlFlowGraph)>,
    ) -> Vec<Result<Frames, AnalysisError>> {
        methods
            .into_iter()
            .map(|(method, cfg)| {
                let result = self.analyze(method, cfg);
                if let Err(err) = &result {
                    warn!("skipping unanalyzable method: {}", err);
                }
                result
            })
            .collect()
    }
}

/// Entry frames of blocks, along with the blocks whose entry frame changed since their last visit
struct Worklist {
    entry_frames: Vec<Option<Frame>>,
    queue: VecDeque<BlockId>,
    queued: Vec<bool>,
}

impl Worklist {
    fn new(block_count: usize) -> Worklist {
        Worklist {
            entry_frames: vec![None; block_count],
            queue: VecDeque::new(),
            queued: vec![false; block_count],
        }
    }

    /// Next block to visit, along with a copy of its entry frame
    fn pop(&mut self) -> Option<(BlockId, Frame)> {
        while let Some(block) = self.queue.pop_front() {
            self.queued[block.0] = false;
            if let Some(Some(frame)) = self.entry_frames.get(block.0) {
                return Some((block, frame.clone()));
            }
        }
        None
    }

    /// Merge a frame into a block's entry frame, queueing the block if the entry frame changed
    fn propagate(&mut self, block: BlockId, frame: Frame) -> Result<(), FaultKind> {
        let slot = self
            .entry_frames
            .get_mut(block.0)
            .ok_or(FaultKind::Internal("frame propagated to an unknown block"))?;
        let changed = match slot {
            None => {
                *slot = Some(frame);
                true
            }
            Some(existing) => existing.merge(&frame)?,
        };

        if changed {
            trace!("entry frame of {:?} changed", block);
            if !self.queued[block.0] {
                self.queued[block.0] = true;
                self.queue.push_back(block);
            }
        }
        Ok(())
    }
}
