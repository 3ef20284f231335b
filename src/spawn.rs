//! Per-package build subprocesses
//!
//! Each package in the sync chain gets its continuous build command
//! (`yarn dev:sync`) spawned through the shell. Output is surfaced
//! line-by-line to the operator log with ANSI control sequences
//! stripped; a non-zero exit is reported but never stops the watch
//! loop. Children are registered so the shutdown coordinator can
//! terminate them.

use std::io::{BufRead, BufReader, Read};
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::shutdown::{ChildHandle, Registry};
use crate::watcher::event::{EventSink, SyncEvent};

/// Spawns build commands and streams their output.
pub struct CommandRunner {
    registry: Arc<Registry>,
    sink: EventSink,
}

impl CommandRunner {
    pub fn new(registry: Arc<Registry>, sink: EventSink) -> Self {
        Self { registry, sink }
    }

    /// Spawn `sh -c <command>`, stream its output, and register the
    /// child for shutdown. Spawn failure is logged, not fatal.
    pub fn execute(&self, command: &str) {
        (self.sink)(SyncEvent::Command {
            line: format!("Command: {command}"),
        });

        let spawned = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(err) => {
                (self.sink)(SyncEvent::Error {
                    message: format!("failed to spawn [{command}]: {err}"),
                });
                return;
            }
        };

        if let Some(stdout) = child.stdout.take() {
            stream_output(stdout, self.sink.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            stream_output(stderr, self.sink.clone());
        }

        let handle = ChildHandle {
            command: command.to_string(),
            child: Arc::new(Mutex::new(child)),
        };
        monitor_exit(handle.command.clone(), handle.child.clone(), self.sink.clone());
        self.registry.add_child(handle);
    }
}

/// Forward one output pipe to the sink, a cleaned line at a time.
fn stream_output(pipe: impl Read + Send + 'static, sink: EventSink) {
    thread::spawn(move || {
        for line in BufReader::new(pipe).lines() {
            let Ok(line) = line else { break };
            let plain = clean_chunk(&line);
            if plain.is_empty() {
                continue;
            }
            sink(SyncEvent::Command { line: plain });
        }
    });
}

/// Report a non-zero exit without blocking anyone: poll until the
/// child is gone. The shutdown coordinator owns the kill path.
fn monitor_exit(command: String, child: Arc<Mutex<std::process::Child>>, sink: EventSink) {
    thread::spawn(move || loop {
        {
            let mut child = child.lock().unwrap();
            match child.try_wait() {
                Ok(Some(status)) => {
                    if !status.success() {
                        sink(SyncEvent::CommandFailed { command });
                    }
                    return;
                }
                Ok(None) => {}
                Err(_) => return,
            }
        }
        thread::sleep(Duration::from_millis(200));
    });
}

/// Strip ANSI escape sequences and stray carriage returns from a chunk
/// of subprocess output.
pub fn clean_chunk(chunk: &str) -> String {
    let mut out = String::with_capacity(chunk.len());
    let mut chars = chunk.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\u{1b}' => {
                // ESC [ ... <final byte> or ESC ] ... (skip to terminator)
                if matches!(chars.peek(), Some('[') | Some(']') | Some('(')) {
                    let _ = chars.next();
                }
                for next in chars.by_ref() {
                    if next.is_ascii_alphabetic() {
                        break;
                    }
                }
            }
            '\r' | '\n' => out.push(' '),
            _ => out.push(c),
        }
    }
    out.trim().to_string()
}
