//! Character devices and the line editor the monitor reads commands with.
//!
//! The monitor itself only needs a [`LineReader`]. [`Readline`] provides one
//! on top of any byte-oriented [`Teletype`] such as a serial port.
use crate::MonitorError;
use arrayvec::ArrayString;

/// Size of the line buffer, including room for the terminator.
pub const BUFLEN: usize = 1024;

/// The `Teletype` trait represents a generic character-based input/output
/// device.
///
/// This abstraction allows different kinds of terminal or serial interfaces
/// to provide their own communication methods.
pub trait Teletype {
    /// Writes data to the teletype.
    ///
    /// # Returns
    /// - `Ok(usize)`: The number of bytes successfully written.
    /// - `Err(MonitorError)`: If the write operation failed.
    fn write(&mut self, data: &[u8]) -> Result<usize, MonitorError>;

    /// Reads data from the teletype, blocking until at least one byte is
    /// available.
    ///
    /// # Returns
    /// - `Ok(0)`: The device reached end of input.
    /// - `Ok(usize)`: The number of bytes successfully read.
    /// - `Err(MonitorError)`: If the read operation failed.
    fn read(&mut self, data: &mut [u8]) -> Result<usize, MonitorError>;
}

/// A source of command lines.
pub trait LineReader {
    /// Shows `prompt` and reads one line, without its terminator.
    ///
    /// Returns `None` if no line could be read; the monitor then prompts
    /// again.
    fn read_line(&mut self, prompt: &str) -> Option<&str>;
}

/// A minimal line editor over a [`Teletype`].
///
/// Printable ASCII characters are appended and echoed, backspace and DEL
/// erase the last character, and either CR or LF ends the line. Input beyond
/// `BUFLEN - 1` characters is dropped.
pub struct Readline<T: Teletype> {
    tty: T,
    buf: ArrayString<BUFLEN>,
    echo: bool,
}

impl<T: Teletype> Readline<T> {
    /// Creates a line editor that echoes its input.
    pub fn new(tty: T) -> Self {
        Self {
            tty,
            buf: ArrayString::new(),
            echo: true,
        }
    }

    /// Turns echoing of typed characters on or off.
    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Returns the underlying device.
    pub fn into_inner(self) -> T {
        self.tty
    }

    fn put(&mut self, data: &[u8]) {
        if self.echo {
            let _ = self.tty.write(data);
        }
    }
}

impl<T: Teletype> LineReader for Readline<T> {
    fn read_line(&mut self, prompt: &str) -> Option<&str> {
        let _ = self.tty.write(prompt.as_bytes());
        self.buf.clear();
        loop {
            let mut c = [0u8; 1];
            match self.tty.read(&mut c) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(_) => {
                    let _ = self.tty.write(b"read error\n");
                    return None;
                }
            }
            match c[0] {
                b'\x08' | b'\x7f' => {
                    if self.buf.pop().is_some() {
                        self.put(b"\x08 \x08");
                    }
                }
                b'\n' | b'\r' => {
                    self.put(b"\n");
                    return Some(self.buf.as_str());
                }
                b @ 0x20..=0x7e if self.buf.len() < BUFLEN - 1 => {
                    self.buf.push(b as char);
                    self.put(&c);
                }
                _ => {}
            }
        }
    }
}

/// Adapts a [`Teletype`] to [`core::fmt::Write`] so it can carry monitor
/// output.
pub struct TtyWriter<T: Teletype>(pub T);

impl<T: Teletype> core::fmt::Write for TtyWriter<T> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let mut data = s.as_bytes();
        while !data.is_empty() {
            match self.0.write(data) {
                Ok(0) | Err(_) => return Err(core::fmt::Error),
                Ok(n) => data = &data[n.min(data.len())..],
            }
        }
        Ok(())
    }
}
