//! The command loop.
//!
//! [`Monitor`] borrows everything it works on from the embedding kernel for
//! the duration of one trap: the output console, the kernel address space,
//! the symbol resolver and, if a process is suspended, its
//! [`ExecutionContext`]. [`Monitor::run`] reads lines until a command asks to
//! resume the suspended execution.
use crate::{
    MonitorError, Status,
    command::{self, KernelLayout},
    exec::ExecutionContext,
    mm::AddressSpace,
    symbols::SymbolResolver,
    teletype::LineReader,
};
use abyss::debug;
use arrayvec::ArrayVec;
use core::fmt::Write;

/// Capacity of the argument vector. One slot stays unused, so a line holds at
/// most `MAXARGS - 1` tokens.
pub const MAXARGS: usize = 16;

const WHITESPACE: [char; 4] = ['\t', '\r', '\n', ' '];

/// Runtime settings of the command loop.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    prompt: &'static str,
    banner: bool,
}

impl Config {
    /// The default configuration: `K> ` prompt, banner shown.
    pub const fn new() -> Self {
        Self {
            prompt: "K> ",
            banner: true,
        }
    }

    /// Sets the prompt.
    pub const fn prompt(mut self, prompt: &'static str) -> Self {
        self.prompt = prompt;
        self
    }

    /// Shows or hides the welcome banner.
    pub const fn banner(mut self, banner: bool) -> Self {
        self.banner = banner;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits a command line into whitespace-separated tokens.
///
/// # Returns
/// The tokens, or [`MonitorError::TooManyArguments`] if the line holds
/// `MAXARGS` tokens or more.
pub fn tokenize(line: &str) -> Result<ArrayVec<&str, MAXARGS>, MonitorError> {
    let mut argv = ArrayVec::new();
    for token in line.split(WHITESPACE).filter(|t| !t.is_empty()) {
        if argv.len() == MAXARGS - 1 {
            return Err(MonitorError::TooManyArguments);
        }
        argv.push(token);
    }
    Ok(argv)
}

/// The kernel monitor.
pub struct Monitor<'a> {
    pub(crate) out: &'a mut dyn Write,
    kernel: &'a mut dyn AddressSpace,
    pub(crate) context: Option<ExecutionContext<'a>>,
    pub(crate) symbols: &'a dyn SymbolResolver,
    pub(crate) layout: Option<KernelLayout>,
    pub(crate) frame_pointer: Option<usize>,
    config: Config,
}

impl<'a> Monitor<'a> {
    /// Creates a monitor with no suspended process.
    pub fn new(out: &'a mut dyn Write, kernel: &'a mut dyn AddressSpace, symbols: &'a dyn SymbolResolver) -> Self {
        Self {
            out,
            kernel,
            context: None,
            symbols,
            layout: None,
            frame_pointer: None,
            config: Config::new(),
        }
    }

    /// Attaches the suspended process. Its address space becomes the one
    /// every command inspects.
    pub fn with_context(mut self, context: ExecutionContext<'a>) -> Self {
        self.context = Some(context);
        self
    }

    /// Sets the kernel image layout reported by `kerninfo`.
    pub fn with_layout(mut self, layout: KernelLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Sets the frame pointer `bt` starts from, instead of the current
    /// `rbp`.
    pub fn with_frame_pointer(mut self, fp: usize) -> Self {
        self.frame_pointer = Some(fp);
        self
    }

    /// Replaces the loop settings.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// The suspended process, if any.
    pub fn context(&self) -> Option<&ExecutionContext<'a>> {
        self.context.as_ref()
    }

    /// The output console and the active address space.
    pub(crate) fn io(&mut self) -> (&mut (dyn Write + 'a), &mut (dyn AddressSpace + 'a)) {
        let space: &mut (dyn AddressSpace + 'a) = match self.context.as_mut() {
            Some(context) => &mut *context.space,
            None => &mut *self.kernel,
        };
        (&mut *self.out, space)
    }

    /// Runs one command line.
    ///
    /// Errors are reported on the console and never stop the monitor. A
    /// malformed argument keeps the monitor prompting instead of ending the
    /// loop, so the operator can retype the command.
    pub fn run_command(&mut self, line: &str) -> Status {
        let argv = match tokenize(line) {
            Ok(argv) => argv,
            Err(e) => {
                let _ = writeln!(self.out, "{e}");
                return Status::Prompt;
            }
        };
        let Some(&name) = argv.first() else {
            return Status::Prompt;
        };
        let Ok(cmd) = command::lookup(name) else {
            let _ = writeln!(self.out, "Unknown command '{name}'");
            return Status::Prompt;
        };
        debug!("monitor: {:?}", argv.as_slice());
        match (cmd.func)(&argv, self) {
            Ok(status) => status,
            Err(MonitorError::ArgumentCount) => {
                let _ = writeln!(self.out, "{}: {}\nusage: {}", name, MonitorError::ArgumentCount, cmd.usage);
                Status::Prompt
            }
            Err(e) => {
                let _ = writeln!(self.out, "{name}: {e}");
                Status::Prompt
            }
        }
    }

    /// Reads and runs commands until one resumes the suspended execution.
    pub fn run(&mut self, reader: &mut dyn LineReader) -> Status {
        if self.config.banner {
            let _ = writeln!(self.out, "Welcome to the KeOS kernel monitor!");
            let _ = writeln!(self.out, "Type 'help' for a list of commands.");
        }
        loop {
            if let Some(line) = reader.read_line(self.config.prompt)
                && self.run_command(line) == Status::Resume
            {
                return Status::Resume;
            }
        }
    }
}
