/// Elements with a width measured in JVM slots
///
/// `long` and `double` values take up two slots, both on the operand stack and in the local
/// variables. Everything else takes up one.
pub trait Width {
    fn width(&self) -> usize;
}

impl<T: Width> Width for [T] {
    fn width(&self) -> usize {
        self.iter().map(Width::width).sum()
    }
}

impl<T: Width> Width for Option<T> {
    fn width(&self) -> usize {
        self.as_ref().map_or(0, Width::width)
    }
}
