use std::io::{Read, Write};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use std::thread::{self, JoinHandle};

use portable_pty::{Child, ChildKiller, CommandBuilder, MasterPty, PtySize, native_pty_system};

use crate::error::{Error, Result};

// Raw output kept for re-parsing after a resize.
const MAX_HISTORY_CAP: usize = 2 * 1024 * 1024;
const PRUNE_TARGET: usize = 1024 * 1024;

pub struct Pty {
    master: Box<dyn MasterPty + Send>,
    writer: Box<dyn Write + Send>,
    pending: Arc<Mutex<Vec<u8>>>,
    bytes_received: Arc<AtomicUsize>,
    dsr_requested: Arc<AtomicBool>,
    history: Vec<u8>,
    parser: vt100::Parser,
    size: PtySize,
    scrollback_len: usize,
    child: Option<Box<dyn Child + Send + Sync>>,
    exited: bool,
    _reader: JoinHandle<()>,
}

impl std::fmt::Debug for Pty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pty")
            .field("rows", &self.size.rows)
            .field("cols", &self.size.cols)
            .field("exited", &self.exited)
            .finish_non_exhaustive()
    }
}

impl Pty {
    pub fn spawn(command: CommandBuilder, size: PtySize, scrollback_len: usize) -> Result<Self> {
        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(size)
            .map_err(|err| Error::pty("openpty", err))?;
        let child = pair
            .slave
            .spawn_command(command)
            .map_err(|err| Error::pty("spawn_command", err))?;
        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|err| Error::pty("try_clone_reader", err))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|err| Error::pty("take_writer", err))?;
        let pending = Arc::new(Mutex::new(Vec::new()));
        let bytes_received = Arc::new(AtomicUsize::new(0));
        let dsr_requested = Arc::new(AtomicBool::new(false));
        let reader_pending = Arc::clone(&pending);
        let reader_bytes = Arc::clone(&bytes_received);
        let reader_dsr = Arc::clone(&dsr_requested);
        let reader_handle =
            thread::spawn(move || read_loop(reader, reader_pending, reader_bytes, reader_dsr));
        let parser = vt100::Parser::new(size.rows, size.cols, scrollback_len);
        Ok(Self {
            master: pair.master,
            writer,
            pending,
            bytes_received,
            dsr_requested,
            history: Vec::new(),
            parser,
            size,
            scrollback_len,
            child: Some(child),
            exited: false,
            _reader: reader_handle,
        })
    }

    pub fn resize(&mut self, size: PtySize) -> Result<()> {
        if size.rows == 0 || size.cols == 0 {
            return Ok(());
        }
        if size.rows == self.size.rows && size.cols == self.size.cols {
            return Ok(());
        }
        self.master
            .resize(size)
            .map_err(|err| Error::pty("resize", err))?;
        self.size = size;
        let mut parser = vt100::Parser::new(size.rows, size.cols, self.scrollback_len);
        parser.process(&self.history);
        self.parser = parser;
        Ok(())
    }

    pub fn write_bytes(&mut self, input: &[u8]) -> std::io::Result<()> {
        self.writer.write_all(input)?;
        self.writer.flush()
    }

    /// Feed output collected by the reader thread into the parser.
    pub fn update(&mut self) {
        let bytes = {
            let mut pending = self.pending.lock().unwrap_or_else(|err| err.into_inner());
            if pending.is_empty() {
                return;
            }
            pending.split_off(0)
        };
        self.history.extend_from_slice(&bytes);
        prune_history(&mut self.history);

        self.parser.process(&bytes);
        if self.dsr_requested.swap(false, Ordering::Relaxed) {
            let (row, col) = self.parser.screen().cursor_position();
            let response = format!("\x1b[{};{}R", row.saturating_add(1), col.saturating_add(1));
            if let Err(err) = self.write_bytes(response.as_bytes()) {
                tracing::warn!(%err, "failed to answer cursor position request");
            }
        }
    }

    pub fn has_exited(&mut self) -> bool {
        if self.exited {
            return true;
        }
        let Some(child) = self.child.as_mut() else {
            return true;
        };
        match child.try_wait() {
            Ok(Some(status)) => {
                tracing::debug!(?status, "pty child exited");
                self.exited = true;
                self.child = None;
                true
            }
            Ok(None) => false,
            Err(_) => false,
        }
    }

    pub fn kill(&mut self) -> Result<()> {
        let Some(child) = self.child.as_mut() else {
            return Ok(());
        };
        if let Err(err) = child.kill() {
            // already gone
            if child.try_wait().ok().flatten().is_none() {
                return Err(Error::pty("kill", err));
            }
        }
        self.exited = true;
        self.child = None;
        Ok(())
    }

    pub fn size(&self) -> PtySize {
        self.size
    }

    pub fn screen(&mut self) -> &vt100::Screen {
        self.update();
        self.parser.screen()
    }

    pub fn bytes_received(&self) -> usize {
        self.bytes_received.load(Ordering::Relaxed)
    }

    pub fn scrollback(&mut self) -> usize {
        self.screen().scrollback()
    }

    pub fn set_scrollback(&mut self, rows: usize) {
        self.update();
        let max = self.scrollback_len;
        self.parser.screen_mut().set_scrollback(rows.min(max));
    }
}

impl Drop for Pty {
    fn drop(&mut self) {
        if let Err(err) = self.kill() {
            tracing::debug!(%err, "pty kill on drop failed");
        }
    }
}

fn prune_history(history: &mut Vec<u8>) {
    if history.len() <= MAX_HISTORY_CAP {
        return;
    }
    let prune_amount = history.len() - PRUNE_TARGET;
    // prefer cutting at a line boundary
    let search_end = (prune_amount + 1024).min(history.len());
    let cut_index = history[prune_amount..search_end]
        .iter()
        .position(|&b| b == b'\n')
        .map(|i| prune_amount + i + 1)
        .unwrap_or(prune_amount);
    history.drain(0..cut_index);
}

fn read_loop(
    mut reader: Box<dyn Read + Send>,
    pending: Arc<Mutex<Vec<u8>>>,
    bytes_received: Arc<AtomicUsize>,
    dsr_requested: Arc<AtomicBool>,
) {
    let mut tail: Vec<u8> = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                bytes_received.fetch_add(n, Ordering::Relaxed);
                // the request may straddle two reads
                let mut combined = std::mem::take(&mut tail);
                combined.extend_from_slice(&buf[..n]);
                if combined.windows(4).any(|w| w == b"\x1b[6n") {
                    dsr_requested.store(true, Ordering::Relaxed);
                }
                tail = combined[combined.len().saturating_sub(3)..].to_vec();
                if let Ok(mut pending) = pending.lock() {
                    pending.extend_from_slice(&buf[..n]);
                }
            }
            Err(err) => {
                tracing::debug!(%err, "pty reader stopped");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn run_reader(chunks: Vec<Vec<u8>>) -> (Vec<u8>, usize, bool) {
        struct Chunked(std::vec::IntoIter<Vec<u8>>);
        impl Read for Chunked {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                match self.0.next() {
                    Some(chunk) => {
                        buf[..chunk.len()].copy_from_slice(&chunk);
                        Ok(chunk.len())
                    }
                    None => Ok(0),
                }
            }
        }
        let pending = Arc::new(Mutex::new(Vec::new()));
        let bytes = Arc::new(AtomicUsize::new(0));
        let dsr = Arc::new(AtomicBool::new(false));
        read_loop(
            Box::new(Chunked(chunks.into_iter())),
            Arc::clone(&pending),
            Arc::clone(&bytes),
            Arc::clone(&dsr),
        );
        let out = pending.lock().unwrap().clone();
        (out, bytes.load(Ordering::Relaxed), dsr.load(Ordering::Relaxed))
    }

    #[test]
    fn read_loop_collects_output_and_sees_cursor_request() {
        let pending = Arc::new(Mutex::new(Vec::new()));
        let bytes = Arc::new(AtomicUsize::new(0));
        let dsr = Arc::new(AtomicBool::new(false));
        read_loop(
            Box::new(Cursor::new(b"hello\r\n\x1b[6nworld".to_vec())),
            Arc::clone(&pending),
            Arc::clone(&bytes),
            Arc::clone(&dsr),
        );
        assert_eq!(pending.lock().unwrap().as_slice(), b"hello\r\n\x1b[6nworld");
        assert_eq!(bytes.load(Ordering::Relaxed), 16);
        assert!(dsr.load(Ordering::Relaxed));
    }

    #[test]
    fn cursor_request_split_across_reads_is_detected() {
        let (out, count, dsr) = run_reader(vec![b"ab\x1b[".to_vec(), b"6ncd".to_vec()]);
        assert_eq!(out, b"ab\x1b[6ncd");
        assert_eq!(count, 8);
        assert!(dsr);
    }

    #[test]
    fn plain_output_does_not_request_cursor() {
        let (_, _, dsr) = run_reader(vec![b"no escape here".to_vec()]);
        assert!(!dsr);
    }

    #[test]
    fn history_prunes_at_line_boundary() {
        let mut history = vec![b'x'; MAX_HISTORY_CAP];
        let newline_at = MAX_HISTORY_CAP - PRUNE_TARGET + 10;
        history[newline_at] = b'\n';
        history.extend_from_slice(b"tail");
        prune_history(&mut history);
        assert_eq!(history.len(), MAX_HISTORY_CAP + 4 - newline_at - 1);
        assert!(history.ends_with(b"tail"));
    }
}
