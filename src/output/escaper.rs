use std::io;

///
/// Writer adapter that escapes text for use inside a double-quoted
/// GraphViz label: `"` and `\` get a backslash, newlines become `\n`.
///
pub struct Escaper<W>
where
    W: io::Write,
{
    pub writer: W,
}


impl<W> Escaper<W>
where
    W: io::Write,
{
    pub fn new(writer: W) -> Self {
        Escaper { writer }
    }
}


impl<W> io::Write for Escaper<W>
where
    W: io::Write
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>
    {
        for &c in buf
        {
            match c
            {
                b'"' | b'\\' => self.writer.write_all(&[b'\\', c])?,
                b'\n'        => self.writer.write_all(b"\\n")?,
                _            => self.writer.write_all(&[c])?,
            }
        }
        // every input byte is consumed, however many bytes came out
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()>
    {
        self.writer.flush()
    }
}
