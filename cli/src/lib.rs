//! Line-oriented driver for a [`StoreRegistry`]
//!
//! Stands in for the device-file layer: clients get small integer
//! descriptors, the driver maps them to session handles.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use bigbuf::{SessionHandle, StoreRegistry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Open(usize),
    Write(usize, Vec<u8>),
    Read(usize, usize),
    Close(usize),
    Resize(usize, usize),
    Stats,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("empty command")]
    Empty,

    #[error("unknown command: {0}")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("not a number: {0}")]
    NotANumber(String),
}

fn number(arg: Option<&str>, usage: &'static str) -> Result<usize, ParseError> {
    let arg = arg.ok_or(ParseError::Usage(usage))?;
    arg.parse()
        .map_err(|_| ParseError::NotANumber(arg.to_string()))
}

/// Parse one input line.
///
/// `write` takes the rest of the line verbatim, so the text may contain
/// spaces.
///
/// # Errors
///
/// Returns a `ParseError` describing what is wrong with the line.
pub fn parse_command(line: &str) -> Result<Command, ParseError> {
    let line = line.trim_start();
    let (name, rest) = line.split_once(' ').unwrap_or((line, ""));
    let mut args = rest.split_whitespace();

    match name.trim_end() {
        "" => Err(ParseError::Empty),
        "open" => Ok(Command::Open(number(args.next(), "open <store>")?)),
        "write" => {
            let (fd, text) = rest.split_once(' ').unwrap_or((rest, ""));
            let fd = number(Some(fd).filter(|fd| !fd.is_empty()), "write <fd> <text>")?;
            Ok(Command::Write(fd, text.as_bytes().to_vec()))
        }
        "read" => {
            let fd = number(args.next(), "read <fd> <count>")?;
            let count = number(args.next(), "read <fd> <count>")?;
            Ok(Command::Read(fd, count))
        }
        "close" => Ok(Command::Close(number(args.next(), "close <fd>")?)),
        "resize" => {
            let store = number(args.next(), "resize <store> <capacity>")?;
            let capacity = number(args.next(), "resize <store> <capacity>")?;
            Ok(Command::Resize(store, capacity))
        }
        "stats" => Ok(Command::Stats),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(ParseError::Unknown(other.to_string())),
    }
}

/// Descriptor table plus the registry it drives
pub struct Driver<'a> {
    registry: &'a StoreRegistry,
    fds: BTreeMap<usize, SessionHandle>,
}

impl<'a> Driver<'a> {
    #[must_use]
    pub fn new(registry: &'a StoreRegistry) -> Self {
        Self {
            registry,
            fds: BTreeMap::new(),
        }
    }

    /// Lowest descriptor not in use
    fn free_fd(&self) -> usize {
        (0..).find(|fd| !self.fds.contains_key(fd)).unwrap_or_default()
    }

    fn handle(&self, fd: usize) -> Result<SessionHandle, String> {
        self.fds
            .get(&fd)
            .copied()
            .ok_or_else(|| format!("error: bad descriptor {fd}"))
    }

    /// Run a command and return the text to print for it.
    pub fn execute(&mut self, command: Command) -> String {
        self.try_execute(command).unwrap_or_else(|message| message)
    }

    fn try_execute(&mut self, command: Command) -> Result<String, String> {
        match command {
            Command::Open(store) => {
                let handle = self
                    .registry
                    .open(store)
                    .map_err(|e| format!("error: {e}"))?;
                let fd = self.free_fd();
                self.fds.insert(fd, handle);
                Ok(format!("fd {fd}"))
            }
            Command::Write(fd, bytes) => {
                let handle = self.handle(fd)?;
                match self.registry.write(handle, &bytes) {
                    Ok(n) => Ok(format!("wrote {n}")),
                    Err(failure) => Err(format!("error: {failure}")),
                }
            }
            Command::Read(fd, count) => {
                let handle = self.handle(fd)?;
                let data = self
                    .registry
                    .read(handle, count)
                    .map_err(|e| format!("error: {e}"))?;
                Ok(format!("read {}: {}", data.len(), String::from_utf8_lossy(&data)))
            }
            Command::Close(fd) => {
                let handle = self.handle(fd)?;
                self.registry.close(handle);
                self.fds.remove(&fd);
                Ok("closed".to_string())
            }
            Command::Resize(store, capacity) => {
                self.registry
                    .resize(store, capacity)
                    .map_err(|e| format!("error: {e}"))?;
                Ok(format!("store {store} resized to {capacity}"))
            }
            Command::Stats => {
                let mut out = String::new();
                for stats in self.registry.stats() {
                    let _ = writeln!(
                        out,
                        "store {}: capacity={} used={} sessions={}",
                        stats.id, stats.capacity, stats.used, stats.sessions
                    );
                }
                Ok(out.trim_end().to_string())
            }
            Command::Quit => Ok(String::new()),
        }
    }

    /// Close every descriptor still open.
    pub fn close_all(&mut self) {
        for (_, handle) in std::mem::take(&mut self.fds) {
            self.registry.close(handle);
        }
    }
}
