//! Non-blocking serial port stream.
//!
//! The TTY is put in `O_NONBLOCK` mode and registered with Tokio's reactor,
//! so reads and writes wait for readiness instead of parking a thread. A
//! read dropped by a response timeout leaves nothing in flight: the next
//! transaction starts from a clean state.

use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd};
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use serialport::TTYPort;
use tokio::io::unix::AsyncFd;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// A configured serial port driven by the Tokio reactor.
#[derive(Debug)]
pub struct SerialStream {
    inner: AsyncFd<File>,
}

impl SerialStream {
    /// Take over a port opened and configured by `serialport`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn from_port(port: TTYPort) -> io::Result<Self> {
        let fd = port.into_raw_fd();
        // SAFETY: `into_raw_fd` released ownership of `fd`; the `File` now owns it.
        let file = unsafe { File::from_raw_fd(fd) };
        Self::from_file(file)
    }

    /// Wrap an already open character device.
    pub fn from_file(file: File) -> io::Result<Self> {
        set_nonblocking(&file)?;
        Ok(Self {
            inner: AsyncFd::new(file)?,
        })
    }
}

fn set_nonblocking(file: &File) -> io::Result<()> {
    let fd = file.as_raw_fd();
    // SAFETY: `fd` is a valid open descriptor owned by `file` for the whole call.
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        if flags < 0 {
            return Err(io::Error::last_os_error());
        }
        if libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) < 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

impl AsyncRead for SerialStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        loop {
            let mut guard = ready!(self.inner.poll_read_ready(cx))?;

            let unfilled = buf.initialize_unfilled();
            match guard.try_io(|inner| inner.get_ref().read(unfilled)) {
                Ok(Ok(len)) => {
                    buf.advance(len);
                    return Poll::Ready(Ok(()));
                }
                Ok(Err(err)) => return Poll::Ready(Err(err)),
                Err(_would_block) => continue,
            }
        }
    }
}

impl AsyncWrite for SerialStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        loop {
            let mut guard = ready!(self.inner.poll_write_ready(cx))?;

            match guard.try_io(|inner| inner.get_ref().write(buf)) {
                Ok(result) => return Poll::Ready(result),
                Err(_would_block) => continue,
            }
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
