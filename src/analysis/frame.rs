use super::transfer::{
    binary_operation, copy_operation, nary_operation, push_operation, ternary_operation,
    unary_operation,
};
use super::{FaultKind, Value};
use crate::jvm::code::Instruction;
use crate::jvm::{BinaryName, MethodDescriptor};
use crate::util::Width;

type Result<T> = std::result::Result<T, FaultKind>;

/// Snapshot of the operand stack and local variables at a point in a method
///
/// A `long` or `double` local takes up two slots: the value itself, followed by
/// [`Value::CONTINUATION`]. The stack holds one entry per value, but its depth is checked in
/// slots (see [`Frame::stack_depth`]) against the method's `max_stack`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Frame {
    /// Local variables, indexed by slot
    pub locals: Vec<Value>,

    /// Values on the stack, with the top of the stack last
    pub stack: Vec<Value>,

    /// Maximum depth of the stack, in slots
    max_stack: usize,
}

impl Frame {
    /// Frame with every local uninitialized and an empty stack
    pub fn new(max_locals: usize, max_stack: usize) -> Frame {
        Frame {
            locals: vec![Value::UNINITIALIZED; max_locals],
            stack: vec![],
            max_stack,
        }
    }

    /// Frame on entry to a method: `this` (if there is one) followed by the parameters
    pub fn entry(
        this_class: Option<&BinaryName>,
        descriptor: &MethodDescriptor<BinaryName>,
        max_locals: usize,
        max_stack: usize,
    ) -> Result<Frame> {
        let mut frame = Frame::new(max_locals, max_stack);
        let mut slot: usize = 0;

        if let Some(class) = this_class {
            frame.init_local(slot, Value::object(class.clone()))?;
            slot += 1;
        }
        for parameter in &descriptor.parameters {
            frame.init_local(slot, Value::from_field_type(parameter))?;
            slot += parameter.width();
        }

        Ok(frame)
    }

    fn init_local(&mut self, slot: usize, value: Value) -> Result<()> {
        let idx = u16::try_from(slot).map_err(|_| FaultKind::InvalidLocal(u16::MAX))?;
        self.set_local(idx, value)
    }

    pub fn max_stack(&self) -> usize {
        self.max_stack
    }

    /// Depth of the stack, in slots
    pub fn stack_depth(&self) -> usize {
        self.stack.width()
    }

    /// Value `depth` entries below the top of the stack (`0` is the top)
    pub fn peek(&self, depth: usize) -> Option<&Value> {
        self.stack.iter().rev().nth(depth)
    }

    pub fn local(&self, idx: u16) -> Result<&Value> {
        self.locals
            .get(idx as usize)
            .ok_or(FaultKind::InvalidLocal(idx))
    }

    /// Write a local variable, keeping `long` and `double` slot pairs consistent
    ///
    /// A wide value also overwrites the next slot with [`Value::CONTINUATION`], and any wide
    /// value whose second slot gets overwritten is invalidated.
    pub fn set_local(&mut self, idx: u16, value: Value) -> Result<()> {
        let slot = idx as usize;
        let needed = slot + value.width();
        if needed > self.locals.len() {
            return Err(FaultKind::InvalidLocal(idx));
        }

        if slot > 0 && self.locals[slot - 1].width() == 2 {
            self.locals[slot - 1] = Value::UNINITIALIZED;
        }
        if value.width() == 2 {
            self.locals[slot + 1] = Value::CONTINUATION;
        }
        self.locals[slot] = value;
        Ok(())
    }

    pub fn push(&mut self, value: Value) -> Result<()> {
        if self.stack_depth() + value.width() > self.max_stack {
            return Err(FaultKind::StackOverflow(self.max_stack));
        }
        self.stack.push(value);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Value> {
        self.stack.pop().ok_or(FaultKind::EmptyStack)
    }

    fn pop_expecting_width(&mut self, expected_width: usize) -> Result<Value> {
        let value = self.pop()?;
        let found_width = value.width();
        if found_width == expected_width {
            Ok(value)
        } else {
            Err(FaultKind::InvalidWidth(found_width))
        }
    }

    /// Pop `count` values, returned in the order they were pushed
    fn pop_many(&mut self, count: usize) -> Result<Vec<Value>> {
        if count > self.stack.len() {
            return Err(FaultKind::EmptyStack);
        }
        Ok(self.stack.split_off(self.stack.len() - count))
    }

    fn push_output(&mut self, output: Option<Value>) -> Result<()> {
        match output {
            Some(value) => self.push(value),
            None => Ok(()),
        }
    }

    /// Frame entering an exception handler: same locals, stack holding only the exception
    pub fn exception_handler(&self, exception: Value) -> Frame {
        Frame {
            locals: self.locals.clone(),
            stack: vec![exception],
            max_stack: self.max_stack,
        }
    }

    /// Merge another frame into this one, returning whether this frame changed
    ///
    /// Each slot is merged with [`Value::merge`]. Frames with stacks of different heights can't
    /// be merged.
    pub fn merge(&mut self, other: &Frame) -> Result<bool> {
        if self.stack.len() != other.stack.len() {
            return Err(FaultKind::IncompatibleStackHeights(
                self.stack.len(),
                other.stack.len(),
            ));
        }
        if self.locals.len() != other.locals.len() {
            return Err(FaultKind::Internal("frames with different numbers of locals"));
        }

        let mut changed = false;
        let slots = self.locals.iter_mut().zip(&other.locals);
        for (current, incoming) in slots.chain(self.stack.iter_mut().zip(&other.stack)) {
            let merged = current.merge(incoming);
            if merged != *current {
                *current = merged;
                changed = true;
            }
        }
        Ok(changed)
    }

    /// Update the frame to reflect the effects of the given instruction
    ///
    /// Branches only pop their operands: which successor is taken is up to the control flow
    /// graph. If this fails, the frame is left in an unspecified state.
    pub fn execute(&mut self, insn: &Instruction) -> Result<()> {
        use Instruction::*;

        match insn {
            Nop | Goto(_) | Ret(_) | Return => (),

            AConstNull | IConstM1 | IConst0 | IConst1 | IConst2 | IConst3 | IConst4 | IConst5
            | LConst0 | LConst1 | FConst0 | FConst1 | FConst2 | DConst0 | DConst1 | BiPush(_)
            | SiPush(_) | Ldc(_) | New(_) | GetStatic(_) | Jsr(_) => {
                let value = push_operation(insn)?;
                self.push(value)?;
            }

            ILoad(idx) | LLoad(idx) | FLoad(idx) | DLoad(idx) | ALoad(idx) => {
                let value = copy_operation(insn, self.local(*idx)?)?;
                self.push(value)?;
            }

            IStore(idx) | LStore(idx) | FStore(idx) | DStore(idx) | AStore(idx) => {
                let value = self.pop()?;
                let value = copy_operation(insn, &value)?;
                self.set_local(*idx, value)?;
            }

            IInc(idx, _) => {
                let value = unary_operation(insn, self.local(*idx)?)?
                    .ok_or(FaultKind::Internal("`iinc` produced no value"))?;
                self.set_local(*idx, value)?;
            }

            IAStore | LAStore | FAStore | DAStore | AAStore | BAStore | CAStore | SAStore => {
                let value = self.pop()?;
                let index = self.pop()?;
                let array = self.pop()?;
                let output = ternary_operation(insn, &array, &index, &value)?;
                self.push_output(output)?;
            }

            Pop => {
                let _ = self.pop_expecting_width(1)?;
            }

            Pop2 => {
                let arg1 = self.pop()?;
                match arg1.width() {
                    // Form 1
                    1 => {
                        let _ = self.pop_expecting_width(1)?;
                    }

                    // Form 2
                    2 => (),

                    other => return Err(FaultKind::InvalidWidth(other)),
                }
            }

            Dup => {
                let arg1 = self.pop_expecting_width(1)?;
                let copy1 = copy_operation(insn, &arg1)?;
                self.push(arg1)?;
                self.push(copy1)?;
            }

            DupX1 => {
                let arg1 = self.pop_expecting_width(1)?;
                let arg2 = self.pop_expecting_width(1)?;
                let copy1 = copy_operation(insn, &arg1)?;
                self.push(copy1)?;
                self.push(arg2)?;
                self.push(arg1)?;
            }

            DupX2 => {
                let arg1 = self.pop_expecting_width(1)?;
                let arg2 = self.pop()?;
                let copy1 = copy_operation(insn, &arg1)?;
                match arg2.width() {
                    // Form 1
                    1 => {
                        let arg3 = self.pop_expecting_width(1)?;
                        self.push(copy1)?;
                        self.push(arg3)?;
                        self.push(arg2)?;
                        self.push(arg1)?;
                    }

                    // Form 2
                    2 => {
                        self.push(copy1)?;
                        self.push(arg2)?;
                        self.push(arg1)?;
                    }

                    other => return Err(FaultKind::InvalidWidth(other)),
                }
            }

            Dup2 => {
                let arg1 = self.pop()?;
                let copy1 = copy_operation(insn, &arg1)?;
                match arg1.width() {
                    // Form 1
                    1 => {
                        let arg2 = self.pop_expecting_width(1)?;
                        let copy2 = copy_operation(insn, &arg2)?;
                        self.push(arg2)?;
                        self.push(arg1)?;
                        self.push(copy2)?;
                        self.push(copy1)?;
                    }

                    // Form 2
                    2 => {
                        self.push(arg1)?;
                        self.push(copy1)?;
                    }

                    other => return Err(FaultKind::InvalidWidth(other)),
                }
            }

            Dup2X1 => {
                let arg1 = self.pop()?;
                let copy1 = copy_operation(insn, &arg1)?;
                match arg1.width() {
                    // Form 1
                    1 => {
                        let arg2 = self.pop_expecting_width(1)?;
                        let arg3 = self.pop_expecting_width(1)?;
                        let copy2 = copy_operation(insn, &arg2)?;
                        self.push(copy2)?;
                        self.push(copy1)?;
                        self.push(arg3)?;
                        self.push(arg2)?;
                        self.push(arg1)?;
                    }

                    // Form 2
                    2 => {
                        let arg2 = self.pop_expecting_width(1)?;
                        self.push(copy1)?;
                        self.push(arg2)?;
                        self.push(arg1)?;
                    }

                    other => return Err(FaultKind::InvalidWidth(other)),
                }
            }

            Dup2X2 => {
                let arg1 = self.pop()?;
                let copy1 = copy_operation(insn, &arg1)?;
                match arg1.width() {
                    1 => {
                        let arg2 = self.pop_expecting_width(1)?;
                        let copy2 = copy_operation(insn, &arg2)?;
                        let arg3 = self.pop()?;
                        match arg3.width() {
                            // Form 1
                            1 => {
                                let arg4 = self.pop_expecting_width(1)?;
                                self.push(copy2)?;
                                self.push(copy1)?;
                                self.push(arg4)?;
                                self.push(arg3)?;
                                self.push(arg2)?;
                                self.push(arg1)?;
                            }

                            // Form 3
                            2 => {
                                self.push(copy2)?;
                                self.push(copy1)?;
                                self.push(arg3)?;
                                self.push(arg2)?;
                                self.push(arg1)?;
                            }

                            other => return Err(FaultKind::InvalidWidth(other)),
                        }
                    }

                    2 => {
                        let arg2 = self.pop()?;
                        match arg2.width() {
                            // Form 2
                            1 => {
                                let arg3 = self.pop_expecting_width(1)?;
                                self.push(copy1)?;
                                self.push(arg3)?;
                                self.push(arg2)?;
                                self.push(arg1)?;
                            }

                            // Form 4
                            2 => {
                                self.push(copy1)?;
                                self.push(arg2)?;
                                self.push(arg1)?;
                            }

                            other => return Err(FaultKind::InvalidWidth(other)),
                        }
                    }

                    other => return Err(FaultKind::InvalidWidth(other)),
                }
            }

            Swap => {
                let arg1 = self.pop_expecting_width(1)?;
                let arg2 = self.pop_expecting_width(1)?;
                let copy1 = copy_operation(insn, &arg1)?;
                let copy2 = copy_operation(insn, &arg2)?;
                self.push(copy1)?;
                self.push(copy2)?;
            }

            INeg | LNeg | FNeg | DNeg | I2L | I2F | I2D | L2I | L2F | L2D | F2I | F2L | F2D
            | D2I | D2L | D2F | I2B | I2C | I2S | GetField(_) | ArrayLength | InstanceOf(_)
            | CheckCast(_) | NewArray(_) | ANewArray(_) | If(_, _) | IfNull(_, _)
            | TableSwitch { .. } | LookupSwitch { .. } | IReturn | LReturn | FReturn | DReturn
            | AReturn | PutStatic(_) | AThrow | MonitorEnter | MonitorExit => {
                let value = self.pop()?;
                let output = unary_operation(insn, &value)?;
                self.push_output(output)?;
            }

            IAdd | LAdd | FAdd | DAdd | ISub | LSub | FSub | DSub | IMul | LMul | FMul | DMul
            | IDiv | LDiv | FDiv | DDiv | IRem | LRem | FRem | DRem | ISh(_) | LSh(_) | IAnd
            | LAnd | IOr | LOr | IXor | LXor | LCmp | FCmp(_) | DCmp(_) | IALoad | LALoad
            | FALoad | DALoad | AALoad | BALoad | CALoad | SALoad | IfICmp(_, _) | IfACmp(_, _)
            | PutField(_) => {
                let right = self.pop()?;
                let left = self.pop()?;
                let output = binary_operation(insn, &left, &right)?;
                self.push_output(output)?;
            }

            Invoke(invoke_type, method) => {
                let receiver = if invoke_type.has_receiver() { 1 } else { 0 };
                let values = self.pop_many(method.descriptor.parameters.len() + receiver)?;
                let output = nary_operation(insn, &values)?;
                self.push_output(output)?;
            }

            InvokeDynamic(call_site) => {
                let values = self.pop_many(call_site.descriptor.parameters.len())?;
                let output = nary_operation(insn, &values)?;
                self.push_output(output)?;
            }

            MultiANewArray(_, dimensions) => {
                let values = self.pop_many(*dimensions as usize)?;
                let output = nary_operation(insn, &values)?;
                self.push_output(output)?;
            }
        }

        Ok(())
    }
}
