use super::{BinaryName, Name};
use crate::util::Width;
use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

/// Failure to parse a field or method descriptor
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    #[error("unexpected end of descriptor: {0}")]
    UnexpectedEnd(&'static str),

    #[error("unexpected character '{found}' in descriptor: {expected}")]
    Unexpected { found: char, expected: &'static str },

    #[error("invalid class name in descriptor: {0}")]
    InvalidClassName(String),
}

type Result<T> = std::result::Result<T, DescriptorError>;

/// Utility trait for rendering descriptors back to their string representation
pub trait RenderDescriptor {
    /// Turn the descriptor into a string
    fn render(&self) -> String {
        let mut string = String::new();
        self.render_to(&mut string);
        string
    }

    /// Write the descriptor to a string
    fn render_to(&self, write_to: &mut String);
}

pub trait ParseDescriptor: Sized {
    /// Parse a descriptor from a string, rejecting leftover input
    fn parse(source: &str) -> Result<Self> {
        let mut chars = source.chars().peekable();
        let ret = Self::parse_from(&mut chars)?;
        match chars.next() {
            None => Ok(ret),
            Some(found) => Err(DescriptorError::Unexpected {
                found,
                expected: "end of descriptor",
            }),
        }
    }

    /// Read the descriptor from a character buffer
    fn parse_from(source: &mut Peekable<Chars>) -> Result<Self>;
}

/// Primitive value types
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum BaseType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
}

impl BaseType {
    /// Decode the `atype` operand of `newarray`
    ///
    /// See <https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-6.html#jvms-6.5.newarray>
    pub fn from_array_tag(tag: u8) -> Option<BaseType> {
        match tag {
            4 => Some(BaseType::Boolean),
            5 => Some(BaseType::Char),
            6 => Some(BaseType::Float),
            7 => Some(BaseType::Double),
            8 => Some(BaseType::Byte),
            9 => Some(BaseType::Short),
            10 => Some(BaseType::Int),
            11 => Some(BaseType::Long),
            _ => None,
        }
    }
}

impl Width for BaseType {
    fn width(&self) -> usize {
        match self {
            BaseType::Double | BaseType::Long => 2,
            _ => 1,
        }
    }
}

impl RenderDescriptor for BaseType {
    fn render_to(&self, write_to: &mut String) {
        write_to.push(match self {
            BaseType::Byte => 'B',
            BaseType::Char => 'C',
            BaseType::Double => 'D',
            BaseType::Float => 'F',
            BaseType::Int => 'I',
            BaseType::Long => 'J',
            BaseType::Short => 'S',
            BaseType::Boolean => 'Z',
        });
    }
}

impl ParseDescriptor for BaseType {
    fn parse_from(source: &mut Peekable<Chars>) -> Result<Self> {
        match source.next() {
            Some('B') => Ok(BaseType::Byte),
            Some('C') => Ok(BaseType::Char),
            Some('D') => Ok(BaseType::Double),
            Some('F') => Ok(BaseType::Float),
            Some('I') => Ok(BaseType::Int),
            Some('J') => Ok(BaseType::Long),
            Some('S') => Ok(BaseType::Short),
            Some('Z') => Ok(BaseType::Boolean),
            Some(found) => Err(DescriptorError::Unexpected {
                found,
                expected: "base type",
            }),
            None => Err(DescriptorError::UnexpectedEnd("base type")),
        }
    }
}

/// Reference type
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum RefType<Class> {
    Object(Class),
    ObjectArray(ArrayType<Class>),
    PrimitiveArray(ArrayType<BaseType>),
}

/// Generic array type
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct ArrayType<T> {
    /// Additional dimensions (`A[]` has 0 additional dimensions, `A[][][][]` has 3)
    pub additional_dimensions: usize,

    /// Underlying element type (`A` is the underlying element type of `A[][]`)
    pub element_type: T,
}

impl<T> ArrayType<T> {
    /// Total number of dimensions in the array type
    pub const fn dimensions(&self) -> usize {
        self.additional_dimensions + 1
    }
}

impl<T: RenderDescriptor> RenderDescriptor for ArrayType<T> {
    fn render_to(&self, write_to: &mut String) {
        for _ in 0..self.dimensions() {
            write_to.push('[');
        }
        self.element_type.render_to(write_to);
    }
}

impl RenderDescriptor for BinaryName {
    fn render_to(&self, write_to: &mut String) {
        write_to.push('L');
        write_to.push_str(self.as_str());
        write_to.push(';');
    }
}

impl ParseDescriptor for BinaryName {
    fn parse_from(source: &mut Peekable<Chars>) -> Result<Self> {
        match source.next() {
            Some('L') => (),
            Some(found) => {
                return Err(DescriptorError::Unexpected {
                    found,
                    expected: "'L' to start an object type",
                })
            }
            None => return Err(DescriptorError::UnexpectedEnd("object type")),
        }

        let mut class_name = String::new();
        loop {
            match source.next() {
                Some(';') => {
                    return BinaryName::from_string(class_name)
                        .map_err(DescriptorError::InvalidClassName)
                }
                Some(c) => class_name.push(c),
                None => return Err(DescriptorError::UnexpectedEnd("';' after class name")),
            }
        }
    }
}

impl<C: RenderDescriptor> RenderDescriptor for RefType<C> {
    fn render_to(&self, write_to: &mut String) {
        match self {
            RefType::Object(cls) => cls.render_to(write_to),
            RefType::PrimitiveArray(arr) => arr.render_to(write_to),
            RefType::ObjectArray(arr) => arr.render_to(write_to),
        }
    }
}

impl<C: ParseDescriptor> ParseDescriptor for RefType<C> {
    fn parse_from(source: &mut Peekable<Chars>) -> Result<Self> {
        match source.peek().copied() {
            Some('L') => Ok(RefType::Object(C::parse_from(source)?)),
            Some('[') => {
                let mut dimensions = 0;
                while source.next_if_eq(&'[').is_some() {
                    dimensions += 1;
                }
                let additional_dimensions = dimensions - 1;
                if let Some('L') = source.peek().copied() {
                    Ok(RefType::ObjectArray(ArrayType {
                        additional_dimensions,
                        element_type: C::parse_from(source)?,
                    }))
                } else {
                    Ok(RefType::PrimitiveArray(ArrayType {
                        additional_dimensions,
                        element_type: BaseType::parse_from(source)?,
                    }))
                }
            }
            Some(found) => Err(DescriptorError::Unexpected {
                found,
                expected: "reference type",
            }),
            None => Err(DescriptorError::UnexpectedEnd("reference type")),
        }
    }
}

impl<C> RefType<C> {
    /// Array type whose elements are of the given type
    pub fn array(field_type: FieldType<C>) -> RefType<C> {
        match field_type {
            FieldType::Base(element_type) => RefType::PrimitiveArray(ArrayType {
                additional_dimensions: 0,
                element_type,
            }),
            FieldType::Ref(RefType::Object(element_type)) => RefType::ObjectArray(ArrayType {
                additional_dimensions: 0,
                element_type,
            }),
            FieldType::Ref(RefType::PrimitiveArray(arr)) => RefType::PrimitiveArray(ArrayType {
                additional_dimensions: arr.additional_dimensions + 1,
                element_type: arr.element_type,
            }),
            FieldType::Ref(RefType::ObjectArray(arr)) => RefType::ObjectArray(ArrayType {
                additional_dimensions: arr.additional_dimensions + 1,
                element_type: arr.element_type,
            }),
        }
    }

    /// Number of array dimensions (`0` for plain object types)
    pub fn dimensions(&self) -> usize {
        match self {
            RefType::Object(_) => 0,
            RefType::ObjectArray(arr) => arr.dimensions(),
            RefType::PrimitiveArray(arr) => arr.dimensions(),
        }
    }
}

impl<C: RenderDescriptor> fmt::Display for RefType<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Type of a field, local variable, parameter, or return value
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum FieldType<Class> {
    Base(BaseType),
    Ref(RefType<Class>),
}

impl<C> Width for FieldType<C> {
    fn width(&self) -> usize {
        match self {
            FieldType::Base(base_type) => base_type.width(),
            FieldType::Ref(_) => 1,
        }
    }
}

impl<C> FieldType<C> {
    pub fn array(field_type: FieldType<C>) -> FieldType<C> {
        FieldType::Ref(RefType::array(field_type))
    }

    pub const fn object(class_name: C) -> FieldType<C> {
        FieldType::Ref(RefType::Object(class_name))
    }

    pub const fn int() -> FieldType<C> {
        FieldType::Base(BaseType::Int)
    }

    pub const fn long() -> FieldType<C> {
        FieldType::Base(BaseType::Long)
    }

    pub const fn float() -> FieldType<C> {
        FieldType::Base(BaseType::Float)
    }

    pub const fn double() -> FieldType<C> {
        FieldType::Base(BaseType::Double)
    }

    pub const fn byte() -> FieldType<C> {
        FieldType::Base(BaseType::Byte)
    }

    pub const fn char() -> FieldType<C> {
        FieldType::Base(BaseType::Char)
    }
}

impl<C: RenderDescriptor> RenderDescriptor for FieldType<C> {
    fn render_to(&self, write_to: &mut String) {
        match self {
            FieldType::Base(base_type) => base_type.render_to(write_to),
            FieldType::Ref(reference_type) => reference_type.render_to(write_to),
        }
    }
}

impl<C: ParseDescriptor> ParseDescriptor for FieldType<C> {
    fn parse_from(source: &mut Peekable<Chars>) -> Result<Self> {
        match source.peek().copied() {
            Some('L' | '[') => RefType::parse_from(source).map(FieldType::Ref),
            Some(_) => BaseType::parse_from(source).map(FieldType::Base),
            None => Err(DescriptorError::UnexpectedEnd("field type")),
        }
    }
}

/// Signature of a method
#[derive(PartialEq, Eq, Hash, Debug, Clone)]
pub struct MethodDescriptor<Class> {
    pub parameters: Vec<FieldType<Class>>,

    /// `None` is for `void`
    pub return_type: Option<FieldType<Class>>,
}

impl<C> MethodDescriptor<C> {
    /// Number of local variable slots taken by the parameters, including `this` if there is one
    pub fn parameter_length(&self, has_this_param: bool) -> usize {
        let this_len = if has_this_param { 1 } else { 0 };
        this_len + self.parameters.width()
    }
}

impl<C: RenderDescriptor> RenderDescriptor for MethodDescriptor<C> {
    fn render_to(&self, write_to: &mut String) {
        write_to.push('(');
        for parameter in &self.parameters {
            parameter.render_to(write_to);
        }
        write_to.push(')');
        match &self.return_type {
            None => write_to.push('V'),
            Some(typ) => typ.render_to(write_to),
        };
    }
}

impl<C: ParseDescriptor> ParseDescriptor for MethodDescriptor<C> {
    fn parse_from(source: &mut Peekable<Chars>) -> Result<Self> {
        match source.next() {
            Some('(') => (),
            Some(found) => {
                return Err(DescriptorError::Unexpected {
                    found,
                    expected: "'(' to start a method descriptor",
                })
            }
            None => return Err(DescriptorError::UnexpectedEnd("method descriptor")),
        }

        let mut parameters = vec![];
        loop {
            match source.peek().copied() {
                Some(')') => {
                    source.next();
                    break;
                }
                Some(_) => parameters.push(FieldType::<C>::parse_from(source)?),
                None => return Err(DescriptorError::UnexpectedEnd("')' after parameters")),
            }
        }

        let return_type = if source.next_if_eq(&'V').is_some() {
            None
        } else {
            Some(FieldType::<C>::parse_from(source)?)
        };

        Ok(MethodDescriptor {
            parameters,
            return_type,
        })
    }
}
