//! Session mode state machine
//!
//! ```text
//!            upgrade                   close
//!   Plain ────────────► Secure ─────────────────► Closed
//!     ▲                   │
//!     └───── downgrade ───┘
//! ```
//!
//! `Secure` owns the previous plain handle as its TLS transport, so there is
//! no state in which both handles are present but only one is meaningful.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::tls::SecureStream;
use crate::transport::RawStream;

/// Which handle is the current I/O target
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionMode {
    Plain,
    Secure,
    Closed,
}

/// Connection handle storage
#[derive(Debug)]
pub enum SessionState {
    Plain(RawStream),
    Secure(Box<SecureStream>),
    Closed,
}

/// Borrowed view of the current handle
#[derive(Debug)]
pub enum ActiveHandle<'a> {
    Plain(&'a RawStream),
    Secure(&'a SecureStream),
    Closed,
}

impl SessionState {
    pub fn mode(&self) -> SessionMode {
        match self {
            Self::Plain(_) => SessionMode::Plain,
            Self::Secure(_) => SessionMode::Secure,
            Self::Closed => SessionMode::Closed,
        }
    }

    pub fn active(&self) -> ActiveHandle<'_> {
        match self {
            Self::Plain(stream) => ActiveHandle::Plain(stream),
            Self::Secure(stream) => ActiveHandle::Secure(stream),
            Self::Closed => ActiveHandle::Closed,
        }
    }

    /// The plain handle: the active one, or the one under the TLS layer
    pub fn plain(&self) -> Option<&RawStream> {
        match self {
            Self::Plain(stream) => Some(stream),
            Self::Secure(stream) => Some(stream.get_ref().0),
            Self::Closed => None,
        }
    }

    /// Install an encrypted stream as the active handle
    pub fn upgrade(&mut self, secure: SecureStream) {
        *self = Self::Secure(Box::new(secure));
    }

    /// Drop the TLS layer and fall back to the retained plain handle
    ///
    /// The TLS session is discarded without sending close_notify and the
    /// socket stays open. Returns false when there was nothing to drop.
    pub fn downgrade(&mut self) -> bool {
        match std::mem::replace(self, Self::Closed) {
            Self::Secure(stream) => {
                let (plain, _session) = (*stream).into_inner();
                *self = Self::Plain(plain);
                true
            }
            other => {
                *self = other;
                false
            }
        }
    }

    /// Move the state out, leaving `Closed` behind
    pub fn take_state(&mut self) -> Self {
        std::mem::replace(self, Self::Closed)
    }
}

fn not_connected() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "device connection is closed")
}

impl AsyncRead for SessionState {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_read(cx, buf),
            Self::Secure(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
            Self::Closed => Poll::Ready(Err(not_connected())),
        }
    }
}

impl AsyncWrite for SessionState {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_write(cx, buf),
            Self::Secure(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
            Self::Closed => Poll::Ready(Err(not_connected())),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_flush(cx),
            Self::Secure(s) => Pin::new(s.as_mut()).poll_flush(cx),
            Self::Closed => Poll::Ready(Err(not_connected())),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_shutdown(cx),
            Self::Secure(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
            Self::Closed => Poll::Ready(Err(not_connected())),
        }
    }
}
