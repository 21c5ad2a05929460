use bitflags::bitflags;

bitflags! {
    /// Access flags on methods
    ///
    /// Only `STATIC` changes how a method is analyzed (it decides whether local 0 holds `this`),
    /// but the rest are kept so callers can pass the flags through unmodified.
    ///
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.6-200-A.1
    pub struct MethodAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SYNCHRONIZED = 0x0020;
        const BRIDGE = 0x0040;
        const VARARGS = 0x0080;
        const NATIVE = 0x0100;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
    }
}

impl MethodAccessFlags {
    /// Does the method take an implicit `this` as its first local?
    pub fn has_receiver(&self) -> bool {
        !self.contains(MethodAccessFlags::STATIC)
    }
}
