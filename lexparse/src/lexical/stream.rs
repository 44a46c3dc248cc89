//! The hand-off channel between the lexing task and the parser.

use super::lexeme::Lexeme;
use crate::utils::CancellationToken;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

/// Receiving end of a lexer's output.
///
/// Iterating blocks until the next lexeme arrives and ends when the lexing task
/// closes the stream.
pub struct Lexemes<K> {
    rx: Receiver<Lexeme<K>>,
}

impl<K> Lexemes<K> {
    pub(crate) fn new(rx: Receiver<Lexeme<K>>) -> Self {
        Self { rx }
    }

    /// A stream that is already closed
    pub(crate) fn closed() -> Self {
        let (_, rx) = mpsc::sync_channel(0);
        Self { rx }
    }

    /// Blocks for the next lexeme; `None` once the stream is closed.
    pub fn recv(&self) -> Option<Lexeme<K>> {
        self.rx.recv().ok()
    }

    /// Like [`Lexemes::recv`], but gives up with `None` once `cancel` fires.
    pub fn recv_until_cancelled(
        &self,
        cancel: &CancellationToken,
        poll_interval: Duration,
    ) -> Option<Lexeme<K>> {
        loop {
            if cancel.is_cancelled() {
                return None;
            }
            match self.rx.recv_timeout(poll_interval) {
                Ok(lexeme) => return Some(lexeme),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }
}

impl<K> Iterator for Lexemes<K> {
    type Item = Lexeme<K>;

    fn next(&mut self) -> Option<Self::Item> {
        self.recv()
    }
}

/// Builds an already-closed stream holding the given lexemes, for driving a
/// parser without a lexer.
impl<K> FromIterator<Lexeme<K>> for Lexemes<K> {
    fn from_iter<I: IntoIterator<Item = Lexeme<K>>>(iter: I) -> Self {
        let items: Vec<Lexeme<K>> = iter.into_iter().collect();
        let (tx, rx) = mpsc::sync_channel(items.len());
        for item in items {
            // Capacity matches the item count, so this never blocks.
            let _ = tx.send(item);
        }
        Self { rx }
    }
}
