//! Transfer functions: the values an instruction produces from the values it consumes
//!
//! There is one function per arity class. [`Frame::execute`](super::Frame::execute) takes care of
//! popping the inputs and pushing the output, so these functions never see the stack or the locals.
//! Calling a transfer function with an instruction from another arity class is an internal fault.
//!
//! Folding only happens when every input carries a literal of the expected category. Anything
//! else (missing literal, unexpected category, `top`) degrades to a value of the result's category
//! without a literal. Integer arithmetic wraps, shift amounts are masked to the operand width, and
//! division or remainder by a constant zero is left unfolded.

use super::{FaultKind, Value};
use crate::jvm::code::{Constant, Instruction, ShiftType};
use crate::jvm::{ArrayType, BaseType, BinaryName, FieldType, RefType};

type Result<T> = std::result::Result<T, FaultKind>;

/// Instructions that pop nothing and push one value
pub fn push_operation(insn: &Instruction) -> Result<Value> {
    use Instruction::*;

    let value = match insn {
        AConstNull => Value::Null,
        IConstM1 => Value::Int(Some(-1)),
        IConst0 => Value::Int(Some(0)),
        IConst1 => Value::Int(Some(1)),
        IConst2 => Value::Int(Some(2)),
        IConst3 => Value::Int(Some(3)),
        IConst4 => Value::Int(Some(4)),
        IConst5 => Value::Int(Some(5)),
        LConst0 => Value::Long(Some(0)),
        LConst1 => Value::Long(Some(1)),
        FConst0 => Value::Float(Some(0.0)),
        FConst1 => Value::Float(Some(1.0)),
        FConst2 => Value::Float(Some(2.0)),
        DConst0 => Value::Double(Some(0.0)),
        DConst1 => Value::Double(Some(1.0)),
        BiPush(byte) => Value::Int(Some(*byte as i32)),
        SiPush(short) => Value::Int(Some(*short as i32)),
        Ldc(constant) => constant_value(constant)?,
        New(class) => Value::object(class.clone()),
        GetStatic(field) => Value::from_field_type(&field.descriptor),
        Jsr(_) => Value::RETURN_ADDRESS,
        _ => return Err(FaultKind::Internal("not a push instruction")),
    };
    Ok(value)
}

fn constant_value(constant: &Constant) -> Result<Value> {
    let value = match constant {
        Constant::Integer(i) => Value::Int(Some(*i)),
        Constant::Float(f) => Value::Float(Some(*f)),
        Constant::Long(l) => Value::Long(Some(*l)),
        Constant::Double(d) => Value::Double(Some(*d)),
        Constant::String(s) => Value::string(s.as_str()),
        Constant::Class(FieldType::Ref(_)) => Value::object(BinaryName::CLASS),
        Constant::Class(FieldType::Base(base_type)) => {
            return Err(FaultKind::IllegalConstant(format!(
                "class literal for primitive type {:?}",
                base_type
            )))
        }
        Constant::MethodType(_) => Value::object(BinaryName::METHODTYPE),
        Constant::MethodHandle(_) => Value::object(BinaryName::METHODHANDLE),
        Constant::Dynamic { descriptor, .. } => Value::from_field_type(descriptor),
    };
    Ok(value)
}

/// Instructions that move a value between the stack and the locals unchanged
///
/// This covers loads, stores, and the `dup`/`swap` family.
pub fn copy_operation(insn: &Instruction, value: &Value) -> Result<Value> {
    use Instruction::*;

    match insn {
        ILoad(_) | LLoad(_) | FLoad(_) | DLoad(_) | ALoad(_) | IStore(_) | LStore(_)
        | FStore(_) | DStore(_) | AStore(_) | Dup | DupX1 | DupX2 | Dup2 | Dup2X1 | Dup2X2
        | Swap => Ok(value.clone()),
        _ => Err(FaultKind::Internal("not a copy instruction")),
    }
}

/// Instructions that pop one value and push at most one
pub fn unary_operation(insn: &Instruction, value: &Value) -> Result<Option<Value>> {
    use Instruction::*;

    let output = match insn {
        INeg => Value::Int(value.as_int().map(i32::wrapping_neg)),
        LNeg => Value::Long(value.as_long().map(i64::wrapping_neg)),
        FNeg => Value::Float(value.as_float().map(|f| -f)),
        DNeg => Value::Double(value.as_double().map(|d| -d)),
        IInc(_, increment) => {
            Value::Int(value.as_int().map(|i| i.wrapping_add(*increment as i32)))
        }

        I2L => Value::Long(value.as_int().map(|i| i as i64)),
        I2F => Value::Float(value.as_int().map(|i| i as f32)),
        I2D => Value::Double(value.as_int().map(|i| i as f64)),
        L2I => Value::Int(value.as_long().map(|l| l as i32)),
        L2F => Value::Float(value.as_long().map(|l| l as f32)),
        L2D => Value::Double(value.as_long().map(|l| l as f64)),

        // `as` saturates and sends NaN to 0, which is exactly `f2i`/`d2l`/...
        F2I => Value::Int(value.as_float().map(|f| f as i32)),
        F2L => Value::Long(value.as_float().map(|f| f as i64)),
        F2D => Value::Double(value.as_float().map(|f| f as f64)),
        D2I => Value::Int(value.as_double().map(|d| d as i32)),
        D2L => Value::Long(value.as_double().map(|d| d as i64)),
        D2F => Value::Float(value.as_double().map(|d| d as f32)),

        I2B => Value::Int(value.as_int().map(|i| i as i8 as i32)),
        I2C => Value::Int(value.as_int().map(|i| i as u16 as i32)),
        I2S => Value::Int(value.as_int().map(|i| i as i16 as i32)),

        GetField(field) => Value::from_field_type(&field.descriptor),
        ArrayLength | InstanceOf(_) => Value::INT,
        CheckCast(ref_type) => Value::Reference(ref_type.clone()),
        NewArray(tag) => {
            let base_type =
                BaseType::from_array_tag(*tag).ok_or(FaultKind::InvalidArrayTag(*tag))?;
            Value::Reference(RefType::array(FieldType::Base(base_type)))
        }
        ANewArray(element_type) => {
            Value::Reference(RefType::array(FieldType::Ref(element_type.clone())))
        }

        If(_, _) | IfNull(_, _) | TableSwitch { .. } | LookupSwitch { .. } | IReturn | LReturn
        | FReturn | DReturn | AReturn | PutStatic(_) | AThrow | MonitorEnter | MonitorExit => {
            return Ok(None)
        }

        _ => return Err(FaultKind::Internal("not a unary instruction")),
    };
    Ok(Some(output))
}

/// Instructions that pop two values and push at most one
///
/// `left` was pushed first (it is the deeper of the two operands) and `right` is the value that
/// was on top of the stack. For `isub`, the result is `left - right`.
pub fn binary_operation(
    insn: &Instruction,
    left: &Value,
    right: &Value,
) -> Result<Option<Value>> {
    use Instruction::*;

    let output = match insn {
        IAdd | ISub | IMul | IDiv | IRem | IAnd | IOr | IXor | ISh(_) => {
            Value::Int(match (left.as_int(), right.as_int()) {
                (Some(l), Some(r)) => fold_int(insn, l, r),
                _ => None,
            })
        }
        LAdd | LSub | LMul | LDiv | LRem | LAnd | LOr | LXor => {
            Value::Long(match (left.as_long(), right.as_long()) {
                (Some(l), Some(r)) => fold_long(insn, l, r),
                _ => None,
            })
        }

        // Shift amount is an `int`, not a `long`
        LSh(shift) => Value::Long(match (left.as_long(), right.as_int()) {
            (Some(l), Some(r)) => Some(shift_long(*shift, l, r)),
            _ => None,
        }),

        FAdd | FSub | FMul | FDiv | FRem => {
            Value::Float(match (left.as_float(), right.as_float()) {
                (Some(l), Some(r)) => fold_float(insn, l, r),
                _ => None,
            })
        }
        DAdd | DSub | DMul | DDiv | DRem => {
            Value::Double(match (left.as_double(), right.as_double()) {
                (Some(l), Some(r)) => fold_double(insn, l, r),
                _ => None,
            })
        }

        // Only equality is folded: equal literals give 1, different literals give 0
        LCmp | FCmp(_) | DCmp(_) => {
            if left.has_literal() && right.has_literal() {
                Value::Int(Some(if left == right { 1 } else { 0 }))
            } else {
                Value::INT
            }
        }

        IALoad | BALoad | CALoad | SALoad => Value::INT,
        LALoad => Value::LONG,
        FALoad => Value::FLOAT,
        DALoad => Value::DOUBLE,
        AALoad => array_element(left),

        IfICmp(_, _) | IfACmp(_, _) | PutField(_) => return Ok(None),

        _ => return Err(FaultKind::Internal("not a binary instruction")),
    };
    Ok(Some(output))
}

/// Instructions that pop three values and push nothing (array stores)
pub fn ternary_operation(
    insn: &Instruction,
    _array: &Value,
    _index: &Value,
    _value: &Value,
) -> Result<Option<Value>> {
    use Instruction::*;

    match insn {
        IAStore | LAStore | FAStore | DAStore | AAStore | BAStore | CAStore | SAStore => Ok(None),
        _ => Err(FaultKind::Internal("not a ternary instruction")),
    }
}

/// Instructions that pop a variable number of values (calls and `multianewarray`)
///
/// Nothing is ever folded across a call.
pub fn nary_operation(insn: &Instruction, _values: &[Value]) -> Result<Option<Value>> {
    use Instruction::*;

    match insn {
        Invoke(_, method) => Ok(Value::from_return_type(method.descriptor.return_type.as_ref())),
        InvokeDynamic(call_site) => Ok(Value::from_return_type(
            call_site.descriptor.return_type.as_ref(),
        )),
        MultiANewArray(array_type, _) => Ok(Some(Value::Reference(array_type.clone()))),
        _ => Err(FaultKind::Internal("not an n-ary instruction")),
    }
}

fn fold_int(insn: &Instruction, l: i32, r: i32) -> Option<i32> {
    use Instruction::*;

    match insn {
        IAdd => Some(l.wrapping_add(r)),
        ISub => Some(l.wrapping_sub(r)),
        IMul => Some(l.wrapping_mul(r)),
        IDiv if r != 0 => Some(l.wrapping_div(r)),
        IRem if r != 0 => Some(l.wrapping_rem(r)),
        IAnd => Some(l & r),
        IOr => Some(l | r),
        IXor => Some(l ^ r),
        ISh(ShiftType::Left) => Some(l.wrapping_shl(r as u32 & 31)),
        ISh(ShiftType::ArithmeticRight) => Some(l.wrapping_shr(r as u32 & 31)),
        ISh(ShiftType::LogicalRight) => Some(((l as u32) >> (r as u32 & 31)) as i32),
        _ => None,
    }
}

fn fold_long(insn: &Instruction, l: i64, r: i64) -> Option<i64> {
    use Instruction::*;

    match insn {
        LAdd => Some(l.wrapping_add(r)),
        LSub => Some(l.wrapping_sub(r)),
        LMul => Some(l.wrapping_mul(r)),
        LDiv if r != 0 => Some(l.wrapping_div(r)),
        LRem if r != 0 => Some(l.wrapping_rem(r)),
        LAnd => Some(l & r),
        LOr => Some(l | r),
        LXor => Some(l ^ r),
        _ => None,
    }
}

fn shift_long(shift: ShiftType, l: i64, r: i32) -> i64 {
    let amount = r as u32 & 63;
    match shift {
        ShiftType::Left => l.wrapping_shl(amount),
        ShiftType::ArithmeticRight => l.wrapping_shr(amount),
        ShiftType::LogicalRight => ((l as u64) >> amount) as i64,
    }
}

// `0.0 == -0.0`, so both zeros are left unfolded
fn fold_float(insn: &Instruction, l: f32, r: f32) -> Option<f32> {
    use Instruction::*;

    match insn {
        FAdd => Some(l + r),
        FSub => Some(l - r),
        FMul => Some(l * r),
        FDiv if r != 0.0 => Some(l / r),
        FRem if r != 0.0 => Some(l % r),
        _ => None,
    }
}

fn fold_double(insn: &Instruction, l: f64, r: f64) -> Option<f64> {
    use Instruction::*;

    match insn {
        DAdd => Some(l + r),
        DSub => Some(l - r),
        DMul => Some(l * r),
        DDiv if r != 0.0 => Some(l / r),
        DRem if r != 0.0 => Some(l % r),
        _ => None,
    }
}

/// Element loaded out of an `aaload`, if the array's static type is known
fn array_element(array: &Value) -> Value {
    match array {
        Value::Reference(RefType::ObjectArray(arr)) if arr.additional_dimensions == 0 => {
            Value::object(arr.element_type.clone())
        }
        Value::Reference(RefType::ObjectArray(arr)) => {
            Value::Reference(RefType::ObjectArray(ArrayType {
                additional_dimensions: arr.additional_dimensions - 1,
                element_type: arr.element_type.clone(),
            }))
        }
        Value::Reference(RefType::PrimitiveArray(arr)) if arr.additional_dimensions > 0 => {
            Value::Reference(RefType::PrimitiveArray(ArrayType {
                additional_dimensions: arr.additional_dimensions - 1,
                element_type: arr.element_type,
            }))
        }
        _ => Value::object(BinaryName::OBJECT),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::{CompareMode, FieldRef, InvokeType, MethodRef};
    use crate::jvm::{MethodDescriptor, Name, ParseDescriptor, UnqualifiedName};
    use Instruction::*;

    fn int(i: i32) -> Value {
        Value::Int(Some(i))
    }

    fn long(l: i64) -> Value {
        Value::Long(Some(l))
    }

    fn binary(insn: Instruction, left: Value, right: Value) -> Value {
        binary_operation(&insn, &left, &right).unwrap().unwrap()
    }

    fn unary(insn: Instruction, value: Value) -> Value {
        unary_operation(&insn, &value).unwrap().unwrap()
    }

    #[test]
    fn int_arithmetic() {
        assert_eq!(binary(IAdd, int(4), int(3)), int(7));
        assert_eq!(binary(ISub, int(10), int(3)), int(7));
        assert_eq!(binary(IMul, int(-6), int(7)), int(-42));
        assert_eq!(binary(IDiv, int(7), int(2)), int(3));
        assert_eq!(binary(IDiv, int(-7), int(2)), int(-3));
        assert_eq!(binary(IRem, int(-7), int(2)), int(-1));
        assert_eq!(binary(IAnd, int(0b1100), int(0b1010)), int(0b1000));
        assert_eq!(binary(IOr, int(0b1100), int(0b1010)), int(0b1110));
        assert_eq!(binary(IXor, int(0b1100), int(0b1010)), int(0b0110));
    }

    #[test]
    fn int_overflow_wraps() {
        assert_eq!(binary(IAdd, int(i32::MAX), int(1)), int(i32::MIN));
        assert_eq!(binary(IMul, int(0x10000), int(0x10000)), int(0));
        assert_eq!(binary(IDiv, int(i32::MIN), int(-1)), int(i32::MIN));
        assert_eq!(binary(IRem, int(i32::MIN), int(-1)), int(0));
        assert_eq!(unary(INeg, int(i32::MIN)), int(i32::MIN));
        assert_eq!(unary(IInc(0, -1), int(i32::MIN)), int(i32::MAX));
    }

    #[test]
    fn division_by_zero_is_not_folded() {
        assert_eq!(binary(IDiv, int(5), int(0)), Value::INT);
        assert_eq!(binary(IRem, int(5), int(0)), Value::INT);
        assert_eq!(binary(LDiv, long(5), long(0)), Value::LONG);
        assert_eq!(binary(LRem, long(5), long(0)), Value::LONG);
        assert_eq!(
            binary(FDiv, Value::Float(Some(1.0)), Value::Float(Some(-0.0))),
            Value::FLOAT
        );
        assert_eq!(
            binary(DRem, Value::Double(Some(1.0)), Value::Double(Some(0.0))),
            Value::DOUBLE
        );
    }

    #[test]
    fn shifts_are_masked() {
        assert_eq!(binary(ISh(ShiftType::Left), int(1), int(33)), int(2));
        assert_eq!(binary(ISh(ShiftType::ArithmeticRight), int(-8), int(1)), int(-4));
        assert_eq!(
            binary(ISh(ShiftType::LogicalRight), int(-1), int(28)),
            int(0xf)
        );
        assert_eq!(binary(LSh(ShiftType::Left), long(1), int(65)), long(2));
        assert_eq!(
            binary(LSh(ShiftType::LogicalRight), long(-1), int(60)),
            long(0xf)
        );
        assert_eq!(binary(LSh(ShiftType::Left), long(1), long(1)), Value::LONG);
    }

    #[test]
    fn missing_or_mismatched_literals() {
        assert_eq!(binary(IAdd, Value::INT, int(3)), Value::INT);
        assert_eq!(binary(IAdd, int(3), Value::TOP), Value::INT);
        assert_eq!(binary(IAdd, long(3), int(3)), Value::INT);
        assert_eq!(binary(LAdd, long(3), Value::LONG), Value::LONG);
        assert_eq!(unary(I2L, Value::TOP), Value::LONG);
        assert_eq!(unary(FNeg, int(1)), Value::FLOAT);
    }

    #[test]
    fn floating_point() {
        assert_eq!(
            binary(FAdd, Value::Float(Some(0.1)), Value::Float(Some(0.2))),
            Value::Float(Some(0.1f32 + 0.2f32))
        );
        assert_eq!(
            binary(DSub, Value::Double(Some(10.0)), Value::Double(Some(3.0))),
            Value::Double(Some(7.0))
        );
        assert_eq!(
            binary(DRem, Value::Double(Some(-7.5)), Value::Double(Some(2.0))),
            Value::Double(Some(-1.5))
        );
        assert_eq!(
            unary(DNeg, Value::Double(Some(0.0))),
            Value::Double(Some(-0.0))
        );
    }

    #[test]
    fn conversions() {
        assert_eq!(unary(L2I, unary(I2L, int(-123456))), int(-123456));
        assert_eq!(unary(L2I, long(0x1_0000_0005)), int(5));
        assert_eq!(unary(I2B, int(0x1ff)), int(-1));
        assert_eq!(unary(I2C, int(-1)), int(0xffff));
        assert_eq!(unary(I2S, int(0x18000)), int(-0x8000));
        assert_eq!(unary(F2I, Value::Float(Some(f32::NAN))), int(0));
        assert_eq!(unary(D2I, Value::Double(Some(1e20))), int(i32::MAX));
        assert_eq!(unary(D2L, Value::Double(Some(-1e40))), long(i64::MIN));
        assert_eq!(unary(F2I, Value::Float(Some(-2.9))), int(-2));
        assert_eq!(unary(I2D, int(3)), Value::Double(Some(3.0)));
    }

    #[test]
    fn comparisons_fold_on_equality_only() {
        assert_eq!(binary(LCmp, long(3), long(3)), int(1));
        assert_eq!(binary(LCmp, long(3), long(4)), int(0));
        assert_eq!(binary(LCmp, long(3), Value::LONG), Value::INT);
        assert_eq!(
            binary(
                FCmp(CompareMode::G),
                Value::Float(Some(1.5)),
                Value::Float(Some(1.5))
            ),
            int(1)
        );
        assert_eq!(
            binary(DCmp(CompareMode::L), Value::DOUBLE, Value::DOUBLE),
            Value::INT
        );
    }

    #[test]
    fn constants() {
        assert_eq!(push_operation(&IConstM1), Ok(int(-1)));
        assert_eq!(push_operation(&BiPush(-128)), Ok(int(-128)));
        assert_eq!(push_operation(&SiPush(1000)), Ok(int(1000)));
        assert_eq!(push_operation(&AConstNull), Ok(Value::Null));
        assert_eq!(
            push_operation(&Ldc(Constant::String(String::from("hi")))),
            Ok(Value::string("hi"))
        );
        assert_eq!(
            push_operation(&Ldc(Constant::Long(1 << 40))),
            Ok(long(1 << 40))
        );
        assert_eq!(
            push_operation(&Ldc(Constant::Class(FieldType::object(BinaryName::STRING)))),
            Ok(Value::object(BinaryName::CLASS))
        );
        assert!(matches!(
            push_operation(&Ldc(Constant::Class(FieldType::int()))),
            Err(FaultKind::IllegalConstant(_))
        ));
        assert_eq!(
            push_operation(&Ldc(Constant::MethodType(
                MethodDescriptor::parse("()V").unwrap()
            ))),
            Ok(Value::object(BinaryName::METHODTYPE))
        );
    }

    #[test]
    fn typed_results() {
        let field = FieldRef {
            class: BinaryName::from_str("Foo").unwrap(),
            name: UnqualifiedName::from_str("bar").unwrap(),
            descriptor: FieldType::long(),
        };
        assert_eq!(push_operation(&GetStatic(field.clone())), Ok(Value::LONG));
        assert_eq!(unary(GetField(field.clone()), Value::Null), Value::LONG);
        assert_eq!(
            binary_operation(&PutField(field), &Value::Null, &Value::LONG),
            Ok(None)
        );

        assert_eq!(
            unary(NewArray(10), int(3)),
            Value::Reference(RefType::parse("[I").unwrap())
        );
        assert_eq!(
            unary_operation(&NewArray(0), &int(3)),
            Err(FaultKind::InvalidArrayTag(0))
        );
        assert_eq!(
            unary(ANewArray(RefType::Object(BinaryName::STRING)), int(3)),
            Value::Reference(RefType::parse("[Ljava/lang/String;").unwrap())
        );
        assert_eq!(
            binary(
                AALoad,
                Value::Reference(RefType::parse("[[Ljava/lang/String;").unwrap()),
                int(0)
            ),
            Value::Reference(RefType::parse("[Ljava/lang/String;").unwrap())
        );
        assert_eq!(
            binary(
                AALoad,
                Value::Reference(RefType::parse("[Ljava/lang/String;").unwrap()),
                int(0)
            ),
            Value::object(BinaryName::STRING)
        );
        assert_eq!(binary(AALoad, Value::Null, int(0)), Value::object(BinaryName::OBJECT));
        assert_eq!(binary(BALoad, Value::Null, int(0)), Value::INT);
    }

    #[test]
    fn calls_are_opaque() {
        let method = MethodRef {
            class: BinaryName::STRING,
            name: UnqualifiedName::from_str("length").unwrap(),
            descriptor: MethodDescriptor::parse("()I").unwrap(),
        };
        assert_eq!(
            nary_operation(&Invoke(InvokeType::Virtual, method), &[Value::string("abc")]),
            Ok(Some(Value::INT))
        );

        let method = MethodRef {
            class: BinaryName::from_str("java/io/PrintStream").unwrap(),
            name: UnqualifiedName::from_str("println").unwrap(),
            descriptor: MethodDescriptor::parse("(I)V").unwrap(),
        };
        assert_eq!(
            nary_operation(&Invoke(InvokeType::Virtual, method), &[Value::Null, int(1)]),
            Ok(None)
        );
    }

    #[test]
    fn copies_are_identities() {
        for value in [int(3), Value::string("x"), Value::TOP, long(1)] {
            assert_eq!(copy_operation(&ILoad(0), &value), Ok(value.clone()));
            assert_eq!(copy_operation(&Dup, &value), Ok(value.clone()));
        }
    }

    #[test]
    fn wrong_arity_is_internal() {
        assert!(matches!(push_operation(&IAdd), Err(FaultKind::Internal(_))));
        assert!(matches!(
            unary_operation(&IAdd, &int(1)),
            Err(FaultKind::Internal(_))
        ));
        assert!(matches!(
            binary_operation(&INeg, &int(1), &int(1)),
            Err(FaultKind::Internal(_))
        ));
        assert!(matches!(
            copy_operation(&IAdd, &int(1)),
            Err(FaultKind::Internal(_))
        ));
    }
}
