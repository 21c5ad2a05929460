//! JVM vocabulary shared by the analysis
//!
//!   - [`BinaryName`] and [`UnqualifiedName`] for class and member names
//!   - [`FieldType`], [`RefType`], and [`MethodDescriptor`] for descriptors, which can be parsed
//!     from their string form with [`ParseDescriptor`]
//!   - [`MethodAccessFlags`]
//!   - [`code`] for the instructions themselves
//!
//! ### Example
//!
//! ```
//! use jvmfold::jvm::*;
//!
//! let desc = MethodDescriptor::<BinaryName>::parse("(ILjava/lang/String;J)[B").unwrap();
//! assert_eq!(desc.parameters.len(), 3);
//! assert_eq!(desc.parameter_length(false), 4);
//! assert_eq!(desc.return_type, Some(FieldType::array(FieldType::byte())));
//! assert_eq!(desc.render(), "(ILjava/lang/String;J)[B");
//! ```

mod access_flags;
pub mod code;
mod descriptors;
mod names;

pub use access_flags::*;
pub use descriptors::*;
pub use names::*;
