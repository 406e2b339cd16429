use core::fmt::{self, Formatter, Write};

/// Formatter adapter that indents every line written through it.
pub struct Indenter<'a, 'b> {
    inner: &'a mut Formatter<'b>,
    spaces: usize,
    needs_indent: bool,
}

impl<'a, 'b> Indenter<'a, 'b> {
    pub fn new(f: &'a mut Formatter<'b>) -> Self {
        Self::with_spaced(f, 4)
    }

    pub fn with_spaced(f: &'a mut Formatter<'b>, spaces: usize) -> Self {
        Self {
            inner: f,
            spaces,
            needs_indent: true,
        }
    }

    pub fn set_spaces(&mut self, spaces: usize) {
        self.spaces = spaces
    }

    fn write_indent(&mut self) -> fmt::Result {
        write!(self.inner, "{: >width$}", "", width = self.spaces)
    }
}

impl Write for Indenter<'_, '_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for (idx, line) in s.split('\n').enumerate() {
            if idx > 0 {
                self.inner.write_char('\n')?;

                // Update so we draw another indent at the start of the line
                self.needs_indent = true;
            }
            if line.is_empty() {
                continue;
            }

            if self.needs_indent {
                self.write_indent()?;
                // Make sure not to indent elements being formatted into the string
                self.needs_indent = false;
            }

            self.inner.write_str(line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use core::fmt::{self, Write};

    use super::Indenter;

    struct Nested;

    impl fmt::Display for Nested {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            writeln!(f, "Outer:")?;
            let mut indenter = Indenter::new(f);
            writeln!(indenter, "first")?;
            indenter.set_spaces(2);
            writeln!(indenter, "second\nthird")?;
            let mut wide = Indenter::with_spaced(f, 6);
            write!(wide, "item")
        }
    }

    #[test]
    fn indents_each_line() {
        assert_eq!(Nested.to_string(), "Outer:\n    first\n  second\n  third\n      item");
    }
}
