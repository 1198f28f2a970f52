//! Colored terminal output for repackaging runs
//!
//! Results (package paths, inspect reports) go to stdout undecorated so they can
//! be piped; progress is decorated and suppressed by `--quiet`; errors go to
//! stderr and are never suppressed.

use std::io::{self, Write};
use termcolor::{Buffer, BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

/// Output manager for consistent colored terminal output
#[derive(Debug)]
pub struct OutputManager {
    stdout: BufferWriter,
    verbose: bool,
    quiet: bool,
}

impl Clone for OutputManager {
    fn clone(&self) -> Self {
        Self::new(self.verbose, self.quiet)
    }
}

/// Writes `mark` in `color`, then the message in the default color.
fn marked_line(buffer: &mut Buffer, mark: &str, color: Color, message: &str) -> io::Result<()> {
    buffer.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    write!(buffer, "{mark}")?;
    buffer.reset()?;
    writeln!(buffer, " {message}")
}

impl OutputManager {
    /// Create a new output manager
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            stdout: BufferWriter::stdout(ColorChoice::Auto),
            verbose,
            quiet,
        }
    }

    fn emit(&self, mark: &str, color: Color, message: &str) -> io::Result<()> {
        let mut buffer = self.stdout.buffer();
        marked_line(&mut buffer, mark, color, message)?;
        self.stdout.print(&buffer)
    }

    /// Print a progress message, e.g. the image being processed
    pub fn progress(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.emit("⋯", Color::Magenta, message)
    }

    /// Print a success message
    pub fn success(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.emit("✓", Color::Green, message)
    }

    /// Print a detail message (only with `--verbose`)
    pub fn verbose(&self, message: &str) -> io::Result<()> {
        if !self.verbose || self.quiet {
            return Ok(());
        }
        self.emit("→", Color::Blue, message)
    }

    /// Print an error message to stderr (always shown)
    pub fn error(&self, message: &str) {
        let stderr = BufferWriter::stderr(ColorChoice::Auto);
        let mut buffer = stderr.buffer();
        if marked_line(&mut buffer, "✗", Color::Red, message).is_err()
            || stderr.print(&buffer).is_err()
        {
            // Stderr failed - fallback to stdout as last resort
            println!("[STDERR ERROR] ✗ {}", message);
        }
    }

    /// Print a command result (shown even in quiet mode)
    pub fn result(&self, message: &str) -> io::Result<()> {
        let mut buffer = self.stdout.buffer();
        writeln!(buffer, "{message}")?;
        self.stdout.print(&buffer)
    }

    /// Print a plain message (respects quiet mode)
    pub fn println(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.result(message)
    }

    /// Print indented text (respects quiet mode)
    pub fn indent(&self, message: &str) -> io::Result<()> {
        self.println(&format!("    {message}"))
    }
}
