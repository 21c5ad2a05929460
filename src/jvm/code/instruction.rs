//! This module contains the resolved form of JVM bytecode instructions, as consumed by the
//! analysis. Compared to the raw encoding:
//!
//!   - Constant pool indices are already resolved into the data they point to (class names,
//!     field and method references with their descriptors, loadable constants)
//!
//!   - The "wide" instruction doesn't show up at all, but instead gets merged into the
//!     instructions it is allowed to modify, and the short forms (`iload_0`, ...) are folded
//!     into their general form
//!
//!   - Some instructions (like the branches) get abstracted into one instruction with a field.
//!     This helps with repetitive pattern matches.
//!
//!   - Branch targets are indices into the method's instruction sequence

use crate::jvm::{BinaryName, FieldType, MethodDescriptor, RefType, UnqualifiedName};
use std::fmt;

/// Position of an instruction in a method's instruction sequence
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct InsnIndex(pub usize);

impl fmt::Debug for InsnIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for InsnIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// JVM bytecode instruction
#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    Nop,
    AConstNull,
    IConstM1,
    IConst0,
    IConst1,
    IConst2,
    IConst3,
    IConst4,
    IConst5,
    LConst0,
    LConst1,
    FConst0,
    FConst1,
    FConst2,
    DConst0,
    DConst1,
    BiPush(i8),
    SiPush(i16),
    Ldc(Constant), // covers `ldc`, `ldc_w`, and `ldc2_w`
    ILoad(u16),    // covers `iload`, `iload_{0,3}`, and `wide iload`
    LLoad(u16),
    FLoad(u16),
    DLoad(u16),
    ALoad(u16),
    IALoad,
    LALoad,
    FALoad,
    DALoad,
    AALoad,
    BALoad,
    CALoad,
    SALoad,
    IStore(u16), // covers `istore`, `istore_{0,3}`, and `wide istore`
    LStore(u16),
    FStore(u16),
    DStore(u16),
    AStore(u16),
    IAStore,
    LAStore,
    FAStore,
    DAStore,
    AAStore,
    BAStore,
    CAStore,
    SAStore,
    Pop,
    Pop2,
    Dup,
    DupX1,
    DupX2,
    Dup2,
    Dup2X1,
    Dup2X2,
    Swap,
    IAdd,
    LAdd,
    FAdd,
    DAdd,
    ISub,
    LSub,
    FSub,
    DSub,
    IMul,
    LMul,
    FMul,
    DMul,
    IDiv,
    LDiv,
    FDiv,
    DDiv,
    IRem,
    LRem,
    FRem,
    DRem,
    INeg,
    LNeg,
    FNeg,
    DNeg,
    ISh(ShiftType), // covers `ishl`, `ishr`, and `iushr`
    LSh(ShiftType), // covers `lshl`, `lshr`, and `lushr`
    IAnd,
    LAnd,
    IOr,
    LOr,
    IXor,
    LXor,
    IInc(u16, i16), // covers `iinc` and `wide iinc`
    I2L,
    I2F,
    I2D,
    L2I,
    L2F,
    L2D,
    F2I,
    F2L,
    F2D,
    D2I,
    D2L,
    D2F,
    I2B,
    I2C,
    I2S,
    LCmp,
    FCmp(CompareMode), // covers `fcmpl` and `fcmpg`
    DCmp(CompareMode), // covers `dcmpl` and `dcmpg`
    If(OrdComparison, InsnIndex), // covers `ifeq`, `ifne`, `iflt`, `ifge`, `ifgt`, `ifle`
    IfICmp(OrdComparison, InsnIndex), // covers `if_icmpeq`, ... `if_icmple`
    IfACmp(EqComparison, InsnIndex),  // covers `if_acmpeq`, `if_acmpne`
    Goto(InsnIndex),                  // covers `goto` and `goto_w`
    Jsr(InsnIndex),                   // covers `jsr` and `jsr_w`
    Ret(u16),
    TableSwitch {
        default: InsnIndex,
        low: i32,
        targets: Vec<InsnIndex>,
    },
    LookupSwitch {
        default: InsnIndex,
        targets: Vec<(i32, InsnIndex)>,
    },
    IReturn,
    LReturn,
    FReturn,
    DReturn,
    AReturn,
    Return,
    GetStatic(FieldRef),
    PutStatic(FieldRef),
    GetField(FieldRef),
    PutField(FieldRef),
    Invoke(InvokeType, MethodRef),
    InvokeDynamic(InvokeDynamicRef),
    New(BinaryName),
    /// Raw `atype` operand, see [`crate::jvm::BaseType::from_array_tag`]
    NewArray(u8),
    ANewArray(RefType<BinaryName>),
    ArrayLength,
    AThrow,
    CheckCast(RefType<BinaryName>),
    InstanceOf(RefType<BinaryName>),
    MonitorEnter,
    MonitorExit,
    /// Array type being created and the number of dimensions popped off the stack
    MultiANewArray(RefType<BinaryName>, u8),
    IfNull(EqComparison, InsnIndex), // covers `ifnull`, `ifnonnull`
}

/// Loadable constant, already resolved from the constant pool
#[derive(Clone, Debug, PartialEq)]
pub enum Constant {
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    String(String),

    /// Class literal (`Foo.class`, `int[].class`)
    ///
    /// Only object and array types are loadable: a base type here is a malformed constant.
    Class(FieldType<BinaryName>),

    MethodType(MethodDescriptor<BinaryName>),
    MethodHandle(MethodRef),

    /// Dynamically-computed constant (`CONSTANT_Dynamic`)
    Dynamic {
        name: UnqualifiedName,
        descriptor: FieldType<BinaryName>,
    },
}

/// Resolved `CONSTANT_Fieldref`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub class: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: FieldType<BinaryName>,
}

/// Resolved `CONSTANT_Methodref` or `CONSTANT_InterfaceMethodref`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub class: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor<BinaryName>,
}

/// Resolved `CONSTANT_InvokeDynamic` (the bootstrap method is irrelevant to the analysis)
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InvokeDynamicRef {
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor<BinaryName>,
}

/// Possible bit shifts
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum ShiftType {
    Left,
    LogicalRight,
    ArithmeticRight,
}

/// Comparison modes for floating point
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum CompareMode {
    /// -1 on NaN
    L,

    /// 1 on NaN
    G,
}

/// Binary comparison operators available for `int` branches
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum OrdComparison {
    EQ,
    GE,
    GT,
    LE,
    LT,
    NE,
}

/// Equality/inequality comparison operators
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum EqComparison {
    EQ,
    NE,
}

/// Type of method to invoke
///
/// Note: `InvokeDynamic` is kept separate because it has no receiver and references a call site
/// rather than a method.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum InvokeType {
    Virtual,
    Special,
    Static,
    Interface,
}

impl InvokeType {
    /// Does the call pop a receiver off the stack, under the arguments?
    pub fn has_receiver(&self) -> bool {
        !matches!(self, InvokeType::Static)
    }
}
