use std::io::{self, Write};

/// A writer normalizing all line terminators to CRLF.
///
/// A lone CR gets a LF appended, a LF not preceded by a CR gets a CR
/// inserted. Stored scripts may be quoted in outgoing notification mails,
/// which need CRLF line endings.
///
/// A CR at the very end of the input can only be completed once it is known
/// that nothing follows, so [CrlfWriter::finish] must be called when done.
pub struct CrlfWriter<W: Write> {
    inner: W,
    saw_cr: bool,
}

impl<W: Write> CrlfWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            saw_cr: false,
        }
    }

    /// Terminates a trailing lone CR, flushes, and returns the inner writer.
    pub fn finish(mut self) -> io::Result<W> {
        if self.saw_cr {
            self.inner.write_all(b"\n")?;
            self.saw_cr = false;
        }
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> Write for CrlfWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut out = Vec::with_capacity(buf.len() + buf.len() / 8 + 1);

        for &b in buf {
            if self.saw_cr {
                if b != b'\n' {
                    out.push(b'\n');
                }
            } else if b == b'\n' {
                out.push(b'\r');
            }
            out.push(b);
            self.saw_cr = b == b'\r';
        }

        self.inner.write_all(&out)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::CrlfWriter;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::io::Write;

    fn normalize(input: &[u8]) -> Vec<u8> {
        let mut w = CrlfWriter::new(Vec::new());
        w.write_all(input).expect("write must succeed");
        w.finish().expect("finish must succeed")
    }

    #[rstest]
    #[case::empty(b"", b"")]
    #[case::no_newline(b"keep;", b"keep;")]
    #[case::lf(b"keep;\nstop;\n", b"keep;\r\nstop;\r\n")]
    #[case::crlf(b"keep;\r\nstop;\r\n", b"keep;\r\nstop;\r\n")]
    #[case::cr(b"keep;\rstop;\r", b"keep;\r\nstop;\r\n")]
    #[case::mixed(b"a\nb\r\nc\rd", b"a\r\nb\r\nc\r\nd")]
    #[case::lf_cr(b"\n\r", b"\r\n\r\n")]
    #[case::double_cr(b"\r\r\n", b"\r\n\r\n")]
    #[case::blank_lines(b"\n\n", b"\r\n\r\n")]
    fn normalizes(#[case] input: &[u8], #[case] expected: &[u8]) {
        assert_eq!(expected, normalize(input).as_slice());
    }

    /// A CRLF pair split across two writes must not produce an extra LF.
    #[test]
    fn split_crlf() {
        let mut w = CrlfWriter::new(Vec::new());
        w.write_all(b"keep;\r").unwrap();
        w.write_all(b"\nstop;").unwrap();
        assert_eq!(b"keep;\r\nstop;".as_slice(), w.finish().unwrap().as_slice());
    }
}
