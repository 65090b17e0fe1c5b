//! Interactive REPL channel with line editing.
//!
//! Lets an operator drive the bridge from a terminal as a single chat user.
//! Uses rustyline for line editing, history, and tab-completion of command
//! names under the configured prefix.
//!
//! `/quit` or `/exit` (or Ctrl+D) leaves the REPL.

use std::borrow::Cow;
use std::path::PathBuf;

use async_trait::async_trait;
use rustyline::completion::Completer;
use rustyline::config::Config;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Editor, Helper};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::bootstrap::turbobot_home;
use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse};
use crate::commands::CommandKind;
use crate::error::ChannelError;

const CHANNEL_NAME: &str = "repl";

/// Local commands handled by the REPL itself.
const EXIT_COMMANDS: &[&str] = &["/quit", "/exit"];

/// Rustyline helper for command-name tab completion.
struct ReplHelper {
    prefix: String,
    commands: Vec<String>,
}

impl ReplHelper {
    fn new(prefix: &str) -> Self {
        let commands = CommandKind::ALL
            .iter()
            .map(|kind| format!("{prefix}{}", kind.name()))
            .collect();
        Self {
            prefix: prefix.to_string(),
            commands,
        }
    }

    fn candidates<'a>(&'a self, typed: &'a str) -> impl Iterator<Item = &'a String> + 'a {
        self.commands.iter().filter(move |cmd| cmd.starts_with(typed))
    }
}

impl Completer for ReplHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        if !line.starts_with(&self.prefix) {
            return Ok((0, vec![]));
        }

        let typed = &line[..pos];
        Ok((0, self.candidates(typed).cloned().collect()))
    }
}

impl Hinter for ReplHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        if !line.starts_with(&self.prefix) || pos < line.len() || line.contains(' ') {
            return None;
        }

        self.candidates(line)
            .find(|cmd| cmd.as_str() != line)
            .map(|cmd| cmd[line.len()..].to_string())
    }
}

impl Highlighter for ReplHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(format!("\x1b[90m{hint}\x1b[0m"))
    }
}

impl Validator for ReplHelper {}
impl Helper for ReplHelper {}

/// REPL channel speaking for one fixed chat identity.
pub struct ReplChannel {
    user_id: String,
    prefix: String,
}

impl ReplChannel {
    pub fn new(user_id: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            prefix: prefix.into(),
        }
    }
}

/// Get the history file path (~/.turbobot/history).
fn history_path() -> PathBuf {
    turbobot_home().join("history")
}

#[async_trait]
impl Channel for ReplChannel {
    fn name(&self) -> &str {
        CHANNEL_NAME
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = mpsc::channel(32);
        let user_id = self.user_id.clone();
        let prefix = self.prefix.clone();

        let config = Config::builder()
            .history_ignore_dups(true)
            .map_err(|e| ChannelError::StartupFailed {
                name: CHANNEL_NAME.to_string(),
                reason: e.to_string(),
            })?
            .auto_add_history(true)
            .completion_type(CompletionType::List)
            .build();

        std::thread::spawn(move || {
            let mut rl = match Editor::with_config(config) {
                Ok(editor) => editor,
                Err(e) => {
                    eprintln!("Failed to initialize line editor: {e}");
                    return;
                }
            };
            rl.set_helper(Some(ReplHelper::new(&prefix)));

            let hist_path = history_path();
            if let Some(parent) = hist_path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let _ = rl.load_history(&hist_path);

            println!("\x1b[1mturbobot\x1b[0m  {prefix}help for commands, /quit to exit");
            println!();

            loop {
                match rl.readline("\x1b[1;36m\u{203A}\x1b[0m ") {
                    Ok(line) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        if EXIT_COMMANDS.contains(&line.to_lowercase().as_str()) {
                            break;
                        }

                        let msg = IncomingMessage::new(CHANNEL_NAME, &user_id, line);
                        if tx.blocking_send(msg).is_err() {
                            break;
                        }
                    }
                    // Ctrl+C clears the line, Ctrl+D leaves.
                    Err(ReadlineError::Interrupted) => continue,
                    Err(ReadlineError::Eof) => break,
                    Err(e) => {
                        eprintln!("Input error: {e}");
                        break;
                    }
                }
            }

            let _ = rl.save_history(&hist_path);
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    async fn respond(
        &self,
        _msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        println!("{}", response.content);
        println!();
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}
