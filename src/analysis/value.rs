use crate::jvm::{BaseType, BinaryName, FieldType, RefType, RenderDescriptor};
use crate::util::Width;
use std::fmt;
use std::sync::Arc;

/// Coarse kind of a [`Value`]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Int,
    Long,
    Float,
    Double,
    Reference,
    ReturnAddress,
    Uninitialized,
    Top,
}

/// Symbolic description of one value on the operand stack or in a local variable
///
/// Primitive values optionally carry the literal they are known to hold. A value without a
/// literal is any value of that category. References never carry an identity: only string
/// constants, which are values rather than objects as far as the analysis cares, are tracked.
///
/// Equality is exact: values of different categories are never equal, and a value with a literal
/// is never equal to the same category without one. Floating point literals are compared by their
/// bit patterns, so `NaN` is equal to itself and `0.0` is not equal to `-0.0`.
#[derive(Clone)]
pub enum Value {
    Int(Option<i32>),
    Long(Option<i64>),
    Float(Option<f32>),
    Double(Option<f64>),

    /// The `null` reference (from `aconst_null`)
    Null,

    /// Reference of a statically known type
    Reference(RefType<BinaryName>),

    /// Constant `java/lang/String` (from `ldc`)
    String(Arc<str>),

    /// Address pushed by `jsr`
    ReturnAddress,

    /// Local variable not yet written to, or second slot of a `long` or `double` local
    Uninitialized,

    /// Result of merging values that disagree
    Top,

    /// Result of merging `long`s or `double`s that disagree
    ///
    /// Still takes up two slots, so `pop2`, `dup2` and the local after it keep working.
    WideTop,
}

impl Value {
    pub const INT: Value = Value::Int(None);
    pub const LONG: Value = Value::Long(None);
    pub const FLOAT: Value = Value::Float(None);
    pub const DOUBLE: Value = Value::Double(None);
    pub const RETURN_ADDRESS: Value = Value::ReturnAddress;
    pub const UNINITIALIZED: Value = Value::Uninitialized;
    pub const TOP: Value = Value::Top;
    pub const WIDE_TOP: Value = Value::WideTop;

    /// Marker stored in the local slot following a `long` or `double`
    pub const CONTINUATION: Value = Value::Uninitialized;

    /// Value of the given type, with no literal
    pub fn from_field_type(field_type: &FieldType<BinaryName>) -> Value {
        match field_type {
            FieldType::Base(BaseType::Boolean)
            | FieldType::Base(BaseType::Byte)
            | FieldType::Base(BaseType::Char)
            | FieldType::Base(BaseType::Short)
            | FieldType::Base(BaseType::Int) => Value::INT,
            FieldType::Base(BaseType::Float) => Value::FLOAT,
            FieldType::Base(BaseType::Long) => Value::LONG,
            FieldType::Base(BaseType::Double) => Value::DOUBLE,
            FieldType::Ref(ref_type) => Value::Reference(ref_type.clone()),
        }
    }

    /// Value of the given method return type, with no literal (`None` for `void`)
    pub fn from_return_type(return_type: Option<&FieldType<BinaryName>>) -> Option<Value> {
        return_type.map(Value::from_field_type)
    }

    /// Object reference of the given class
    pub fn object(class: BinaryName) -> Value {
        Value::Reference(RefType::Object(class))
    }

    pub fn string(value: impl Into<Arc<str>>) -> Value {
        Value::String(value.into())
    }

    pub fn category(&self) -> Category {
        match self {
            Value::Int(_) => Category::Int,
            Value::Long(_) => Category::Long,
            Value::Float(_) => Category::Float,
            Value::Double(_) => Category::Double,
            Value::Null | Value::Reference(_) | Value::String(_) => Category::Reference,
            Value::ReturnAddress => Category::ReturnAddress,
            Value::Uninitialized => Category::Uninitialized,
            Value::Top | Value::WideTop => Category::Top,
        }
    }

    /// Is the content of the value known?
    pub fn has_literal(&self) -> bool {
        match self {
            Value::Int(lit) => lit.is_some(),
            Value::Long(lit) => lit.is_some(),
            Value::Float(lit) => lit.is_some(),
            Value::Double(lit) => lit.is_some(),
            Value::String(_) => true,
            _ => false,
        }
    }

    /// Same category, but forgetting any literal
    ///
    /// Note that string constants become plain `java/lang/String` references.
    pub fn without_literal(&self) -> Value {
        match self {
            Value::Int(_) => Value::INT,
            Value::Long(_) => Value::LONG,
            Value::Float(_) => Value::FLOAT,
            Value::Double(_) => Value::DOUBLE,
            Value::String(_) => Value::object(BinaryName::STRING),
            other => other.clone(),
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(lit) => *lit,
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(lit) => *lit,
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(lit) => *lit,
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(lit) => *lit,
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(string) => Some(&**string),
            _ => None,
        }
    }

    /// Static type of a reference value (`None` for non-references and `null`)
    pub fn ref_type(&self) -> Option<RefType<BinaryName>> {
        match self {
            Value::Reference(ref_type) => Some(ref_type.clone()),
            Value::String(_) => Some(RefType::Object(BinaryName::STRING)),
            _ => None,
        }
    }

    /// Join of two values at a control flow merge point
    ///
    /// There is no partial join: anything but exact agreement gives [`Value::Top`]. In particular
    /// two `int`s with different literals do not merge into an `int` without a literal. The only
    /// thing kept is the width: two disagreeing two-slot values give [`Value::WideTop`]. A slot
    /// can change at most twice after it is first recorded.
    pub fn merge(&self, other: &Value) -> Value {
        if self == other {
            self.clone()
        } else if self.width() == 2 && other.width() == 2 {
            Value::WideTop
        } else {
            Value::Top
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.map(f32::to_bits) == b.map(f32::to_bits),
            (Value::Double(a), Value::Double(b)) => a.map(f64::to_bits) == b.map(f64::to_bits),
            (Value::Null, Value::Null) => true,
            (Value::Reference(a), Value::Reference(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::ReturnAddress, Value::ReturnAddress) => true,
            (Value::Uninitialized, Value::Uninitialized) => true,
            (Value::Top, Value::Top) => true,
            (Value::WideTop, Value::WideTop) => true,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Width for Value {
    fn width(&self) -> usize {
        match self {
            Value::Long(_) | Value::Double(_) | Value::WideTop => 2,
            _ => 1,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(None) => f.write_str("int"),
            Value::Int(Some(i)) => write!(f, "int {}", i),
            Value::Long(None) => f.write_str("long"),
            Value::Long(Some(l)) => write!(f, "long {}L", l),
            Value::Float(None) => f.write_str("float"),
            Value::Float(Some(x)) => write!(f, "float {:?}f", x),
            Value::Double(None) => f.write_str("double"),
            Value::Double(Some(x)) => write!(f, "double {:?}", x),
            Value::Null => f.write_str("null"),
            Value::Reference(ref_type) => f.write_str(&ref_type.render()),
            Value::String(string) => write!(f, "{:?}", string),
            Value::ReturnAddress => f.write_str("retaddr"),
            Value::Uninitialized => f.write_str("uninit"),
            Value::Top => f.write_str("top"),
            Value::WideTop => f.write_str("top2"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
