//! `embedded_io` adapters for sessions
//!
//! Lets a session be handed to code written against `embedded_io::Read`
//! and `embedded_io::Write`.

use embedded_io::{ErrorType, Read, Write};
use std::sync::Arc;

use crate::error::StoreError;
use crate::session::Session;

/// Reader/writer over one session
///
/// A read returning `Ok(0)` means the cursor is at the end of the data
/// written so far, not that the store is closed for good.
#[derive(Debug, Clone)]
pub struct SessionIo {
    session: Arc<Session>,
}

impl SessionIo {
    #[must_use]
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }
}

impl ErrorType for SessionIo {
    type Error = StoreError;
}

impl Read for SessionIo {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let data = self.session.read(buf.len())?;
        buf[..data.len()].copy_from_slice(&data);
        Ok(data.len())
    }
}

impl Write for SessionIo {
    /// A write that stored some bytes before failing is reported as a short
    /// write; the error surfaces on the next call.
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        match self.session.write(buf) {
            Ok(n) => Ok(n),
            Err(failure) if failure.written > 0 => Ok(failure.written),
            Err(failure) => Err(failure.error),
        }
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
