//! The lexer: runs a state machine over a rune source on its own thread.
//!
//! States drive the lexer through its primitives (`read_rune`, `peek`,
//! `advance`, `discard`, `find`, `skip_to`, `ignore`), snapshot the pending text
//! with [`Lexer::lexeme`] and publish it with [`Lexer::emit`]. All position and
//! accumulation state sits behind one lock so `pos`, `line`, `column` and `err`
//! can be polled from other threads while the lexing task runs.

use super::error::LexerError;
use super::lexeme::{Lexeme, LexemeKind};
use super::reader::BufferedRuneReader;
use super::state::State;
use super::stream::Lexemes;
use crate::config::compile_time::lexical::{MAX_LEXEME_SIZE, MIN_ADVANCE_CHUNK};
use crate::config::compile_time::syntax::RECEIVE_POLL_INTERVAL_MS;
use crate::config::runtime::LexerPreferences;
use crate::logging::codes;
use crate::utils::{CancellationToken, Position};
use crate::{log_debug, log_error, log_success, log_warning};
use serde::Serialize;
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

const MIN_EMIT_BACKOFF: Duration = Duration::from_micros(50);

/// Counters kept while lexing, when enabled by `collect_metrics`
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct LexerMetrics {
    pub lexemes_emitted: usize,
    pub runes_read: usize,
    pub runes_discarded: usize,
    pub states_run: usize,
}

struct Input {
    reader: Box<dyn BufferedRuneReader>,
    text: String,
    cursor: Position,
    start: Position,
    err: Option<LexerError>,
    metrics: LexerMetrics,
    collect_metrics: bool,
}

impl Input {
    fn count(&mut self, update: impl FnOnce(&mut LexerMetrics)) {
        if self.collect_metrics {
            update(&mut self.metrics);
        }
    }

    fn ignore(&mut self) {
        self.start = self.cursor;
        self.text.clear();
    }

    fn read_rune(&mut self) -> Result<char, LexerError> {
        let rune = self.reader.read_rune()?;
        self.cursor = self.cursor.advance(rune);
        self.text.push(rune);
        self.count(|m| m.runes_read += 1);
        self.check_size()?;
        Ok(rune)
    }

    fn check_size(&self) -> Result<(), LexerError> {
        if self.text.len() > MAX_LEXEME_SIZE {
            return Err(LexerError::LexemeTooLong {
                size: self.text.len(),
            });
        }
        Ok(())
    }

    /// Consumes up to `n` runes in chunks sized by what the reader already holds.
    fn advance(&mut self, n: usize, discard: bool) -> Result<usize, LexerError> {
        let result = self.advance_chunks(n, discard);
        if discard {
            self.ignore();
        }
        result
    }

    fn advance_chunks(&mut self, n: usize, discard: bool) -> Result<usize, LexerError> {
        let mut advanced = 0;
        while advanced < n {
            let remaining = n - advanced;
            let mut step = self.reader.buffered().min(remaining);
            if step == 0 {
                step = MIN_ADVANCE_CHUNK.min(remaining);
            }

            let Input {
                reader,
                text,
                cursor,
                ..
            } = self;
            let (count, short) = match reader.peek(step) {
                Ok(runes) => (track(cursor, text, runes, discard), false),
                Err(LexerError::ShortPeek { runes }) => {
                    (track(cursor, text, &runes, discard), true)
                }
                Err(e) => return Err(e),
            };
            self.reader.discard(count)?;
            advanced += count;

            if discard {
                self.count(|m| m.runes_discarded += count);
            } else {
                self.count(|m| m.runes_read += count);
                self.check_size()?;
            }

            if short {
                return Err(LexerError::ShortRead {
                    consumed: advanced,
                    requested: n,
                });
            }
        }
        Ok(advanced)
    }
}

/// Moves `cursor` over `runes`, appending them to `text` unless discarding.
fn track(cursor: &mut Position, text: &mut String, runes: &[char], discard: bool) -> usize {
    for &rune in runes {
        *cursor = cursor.advance(rune);
        if !discard {
            text.push(rune);
        }
    }
    runes.len()
}

/// First token in list order that `window` starts with
fn first_match(window: &[char], tokens: &[Vec<char>]) -> Option<usize> {
    tokens.iter().position(|token| window.starts_with(token))
}

enum Scan {
    Found { offset: usize, token: usize },
    Skip(usize),
}

/// Scans `window` for the earliest offset where a token matches. Stops early at
/// an offset where an earlier-listed token could still match once more input is
/// peeked, so list order decides ties.
fn scan_window(window: &[char], tokens: &[Vec<char>], at_end: bool) -> Scan {
    for offset in 0..window.len() {
        let rest = &window[offset..];
        for (index, token) in tokens.iter().enumerate() {
            if rest.starts_with(token) {
                return Scan::Found {
                    offset,
                    token: index,
                };
            }
            if !at_end && token.starts_with(rest) {
                return Scan::Skip(offset);
            }
        }
    }
    Scan::Skip(window.len())
}

#[derive(Default)]
struct Completion {
    done: Mutex<bool>,
    signal: Condvar,
}

impl Completion {
    fn finish(&self) {
        let mut done = self.done.lock().unwrap_or_else(PoisonError::into_inner);
        *done = true;
        self.signal.notify_all();
    }

    fn is_done(&self) -> bool {
        *self.done.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait(&self) {
        let mut done = self.done.lock().unwrap_or_else(PoisonError::into_inner);
        while !*done {
            done = self
                .signal
                .wait(done)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn wait_timeout(&self, timeout: Duration) -> bool {
        let done = self.done.lock().unwrap_or_else(PoisonError::into_inner);
        let (done, _) = self
            .signal
            .wait_timeout_while(done, timeout, |done| !*done)
            .unwrap_or_else(PoisonError::into_inner);
        *done
    }
}

struct Shared<K> {
    input: Mutex<Input>,
    initial: Mutex<Option<Box<dyn State<K>>>>,
    output: Mutex<Option<SyncSender<Lexeme<K>>>>,
    cancel: Mutex<Option<CancellationToken>>,
    completion: Completion,
    preferences: LexerPreferences,
}

/// Closes the stream and signals completion when the lexing task exits,
/// including by panic.
struct TaskGuard<'a, K: LexemeKind>(&'a Lexer<K>);

impl<K: LexemeKind> Drop for TaskGuard<'_, K> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.set_err(LexerError::StatePanicked);
        }
        self.0.close();
    }
}

/// Lexer over a rune source.
///
/// Cloning yields another handle to the same lexer; the lexing task holds one.
pub struct Lexer<K> {
    shared: Arc<Shared<K>>,
}

impl<K> Clone for Lexer<K> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<K: LexemeKind> Lexer<K> {
    pub fn new<R>(reader: R, initial: Box<dyn State<K>>) -> Self
    where
        R: BufferedRuneReader + 'static,
    {
        Self::with_preferences(reader, initial, LexerPreferences::default())
    }

    pub fn with_preferences<R>(
        reader: R,
        initial: Box<dyn State<K>>,
        preferences: LexerPreferences,
    ) -> Self
    where
        R: BufferedRuneReader + 'static,
    {
        Self {
            shared: Arc::new(Shared {
                input: Mutex::new(Input {
                    reader: Box::new(reader),
                    text: String::new(),
                    cursor: Position::default(),
                    start: Position::default(),
                    err: None,
                    metrics: LexerMetrics::default(),
                    collect_metrics: preferences.collect_metrics,
                }),
                initial: Mutex::new(Some(initial)),
                output: Mutex::new(None),
                cancel: Mutex::new(None),
                completion: Completion::default(),
                preferences,
            }),
        }
    }

    fn input(&self) -> MutexGuard<'_, Input> {
        lock(&self.shared.input)
    }

    // ------------------------------------------------------------------
    // Position and status
    // ------------------------------------------------------------------

    /// Runes consumed so far
    pub fn pos(&self) -> usize {
        self.input().cursor.offset
    }

    pub fn line(&self) -> usize {
        self.input().cursor.line
    }

    pub fn column(&self) -> usize {
        self.input().cursor.column
    }

    pub fn position(&self) -> Position {
        self.input().cursor
    }

    /// Terminal error of the lexing task, if it failed or was cancelled.
    pub fn err(&self) -> Option<LexerError> {
        self.input().err.clone()
    }

    pub fn metrics(&self) -> LexerMetrics {
        self.input().metrics.clone()
    }

    /// Whether the lexing task has finished and closed its stream.
    pub fn is_done(&self) -> bool {
        self.shared.completion.is_done()
    }

    /// Blocks until the lexing task has finished. Returns immediately if the
    /// task was never started.
    pub fn wait(&self) {
        if lock(&self.shared.initial).is_some() {
            return;
        }
        self.shared.completion.wait();
    }

    /// Waits up to `timeout` for the lexing task; returns whether it finished.
    /// Like [`Lexer::wait`], returns `true` at once if the task was never
    /// started.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if lock(&self.shared.initial).is_some() {
            return true;
        }
        self.shared.completion.wait_timeout(timeout)
    }

    // ------------------------------------------------------------------
    // Primitives used by states
    // ------------------------------------------------------------------

    pub fn read_rune(&self) -> Result<char, LexerError> {
        self.input().read_rune()
    }

    /// Returns `n` runes without consuming them. At end of input the available
    /// runes come back inside [`LexerError::ShortPeek`].
    pub fn peek(&self, n: usize) -> Result<Vec<char>, LexerError> {
        self.input().reader.peek(n).map(<[char]>::to_vec)
    }

    /// Consumes `n` runes into the pending lexeme.
    pub fn advance(&self, n: usize) -> Result<usize, LexerError> {
        self.input().advance(n, false)
    }

    /// Consumes `n` runes and resets the lexeme start past them.
    pub fn discard(&self, n: usize) -> Result<usize, LexerError> {
        self.input().advance(n, true)
    }

    /// Reads into the pending lexeme until the upcoming input starts with one of
    /// `tokens`, which is left unconsumed. Earlier tokens win ties.
    pub fn find<'t>(&self, tokens: &[&'t str]) -> Result<&'t str, LexerError> {
        let candidates: Vec<Vec<char>> = tokens.iter().map(|t| t.chars().collect()).collect();
        let lookahead = candidates.iter().map(Vec::len).max().unwrap_or(0);

        let mut input = self.input();
        loop {
            let matched = match input.reader.peek(lookahead) {
                Ok(window) => first_match(window, &candidates),
                Err(LexerError::ShortPeek { runes }) => first_match(&runes, &candidates),
                Err(e) => return Err(e),
            };
            if let Some(index) = matched {
                return Ok(tokens[index]);
            }
            input.read_rune()?;
        }
    }

    /// Like [`Lexer::find`] but discards the skipped text; the pending lexeme
    /// starts at the matched token.
    pub fn skip_to<'t>(&self, tokens: &[&'t str]) -> Result<&'t str, LexerError> {
        let candidates: Vec<Vec<char>> = tokens.iter().map(|t| t.chars().collect()).collect();
        let lookahead = candidates.iter().map(Vec::len).max().unwrap_or(0);

        let mut input = self.input();
        loop {
            let want = input.reader.buffered().max(lookahead).max(1);
            let (window, at_end) = match input.reader.peek(want) {
                Ok(window) => (window.to_vec(), false),
                Err(LexerError::ShortPeek { runes }) => (runes, true),
                Err(e) => return Err(e),
            };

            match scan_window(&window, &candidates, at_end) {
                Scan::Found { offset, token } => {
                    input.advance(offset, true)?;
                    return Ok(tokens[token]);
                }
                Scan::Skip(offset) if at_end => {
                    input.advance(offset, true)?;
                    return Err(LexerError::EndOfInput);
                }
                Scan::Skip(offset) => {
                    input.advance(offset, true)?;
                }
            }
        }
    }

    /// Drops the pending text and moves the lexeme start to the current position.
    pub fn ignore(&self) {
        self.input().ignore();
    }

    /// Snapshot of the pending text as a lexeme of `kind`. Consumes nothing.
    pub fn lexeme(&self, kind: K) -> Lexeme<K> {
        let input = self.input();
        Lexeme::new(kind, input.text.clone(), input.start)
    }

    /// Hands `lexeme` to the parser, blocking until it is taken, then resets the
    /// pending lexeme. Gives up without resetting if the stream is dropped or
    /// lexing is cancelled, before or during the wait.
    pub fn emit(&self, lexeme: Lexeme<K>) {
        let Some(sender) = lock(&self.shared.output).clone() else {
            return;
        };

        let max_backoff = Duration::from_millis(RECEIVE_POLL_INTERVAL_MS);
        let mut backoff = MIN_EMIT_BACKOFF;
        let mut pending = lexeme;
        loop {
            if self.is_cancelled() {
                return;
            }
            match sender.try_send(pending) {
                Ok(()) => break,
                // No receiver waiting yet
                Err(TrySendError::Full(lexeme)) => {
                    pending = lexeme;
                    thread::sleep(backoff);
                    backoff = (backoff * 2).min(max_backoff);
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }

        let mut input = self.input();
        input.count(|m| m.lexemes_emitted += 1);
        input.ignore();
    }

    fn is_cancelled(&self) -> bool {
        lock(&self.shared.cancel)
            .as_ref()
            .map(CancellationToken::is_cancelled)
            .unwrap_or(false)
    }

    // ------------------------------------------------------------------
    // Lexing task
    // ------------------------------------------------------------------

    /// Starts the lexing task and returns its output stream.
    ///
    /// A lexer runs once; later calls get an already-closed stream.
    pub fn lex(&self, cancel: &CancellationToken) -> Lexemes<K> {
        let Some(initial) = lock(&self.shared.initial).take() else {
            return Lexemes::closed();
        };

        let (tx, rx) = mpsc::sync_channel(0);
        *lock(&self.shared.output) = Some(tx);
        *lock(&self.shared.cancel) = Some(cancel.clone());

        let lexer = self.clone();
        let task_cancel = cancel.clone();
        let spawned = thread::Builder::new()
            .name("lexparse-lexer".to_string())
            .spawn(move || lexer.run_task(initial, task_cancel));

        if let Err(e) = spawned {
            let err = LexerError::TaskSpawn {
                message: e.to_string(),
            };
            log_error!(err.error_code(), "Failed to start lexing task", "error" => &err);
            self.set_err(err);
            self.close();
        }

        Lexemes::new(rx)
    }

    fn run_task(&self, initial: Box<dyn State<K>>, cancel: CancellationToken) {
        let _guard = TaskGuard(self);
        let preferences = &self.shared.preferences;
        log_debug!("Lexing task started");

        let mut current = Some(initial);
        while let Some(state) = current.take() {
            if cancel.is_cancelled() {
                log_warning!(code = codes::pipeline::CANCELLED, "Lexing cancelled",
                    "pos" => self.position()
                );
                self.set_err(LexerError::Cancelled);
                break;
            }

            match state.run(self) {
                Ok(next) => {
                    self.input().count(|m| m.states_run += 1);
                    if preferences.log_state_transitions {
                        log_debug!("Lexer state transition",
                            "pos" => self.position(),
                            "finished" => next.is_none()
                        );
                    }
                    current = next;
                }
                Err(e) if e.is_end_of_input() => break,
                Err(e) => {
                    let position = e.position().unwrap_or_else(|| self.position());
                    log_error!(e.error_code(), "Lexing failed",
                        position = position,
                        "error" => &e
                    );
                    self.set_err(e);
                    break;
                }
            }
        }

        let metrics = self.metrics();
        log_success!(codes::success::LEXING_COMPLETE, "Lexing task finished",
            "lexemes" => metrics.lexemes_emitted,
            "runes_read" => metrics.runes_read,
            "runes_discarded" => metrics.runes_discarded,
            "states" => metrics.states_run
        );
    }

    fn set_err(&self, err: LexerError) {
        self.input().err = Some(err);
    }

    /// Closes the output stream and signals completion.
    fn close(&self) {
        lock(&self.shared.output).take();
        self.shared.completion.finish();
    }
}
