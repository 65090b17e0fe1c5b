//! Command recognition.
//!
//! Only text that starts with the configured prefix is a command. The first
//! word after the prefix names the command and the rest, trimmed, is its
//! argument. Non-ASCII aliases may also be glued to the argument
//! (`/机厅万达`), matching the longest alias first.

use std::cmp::max;

use super::CommandKind;

/// Result of routing one line of chat text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Command {
        kind: CommandKind,
        argument: String,
    },
    /// Prefixed text naming no command, with the closest known name if any.
    Unknown {
        name: String,
        suggestion: Option<&'static str>,
    },
}

/// Routes chat text to commands.
#[derive(Debug, Clone)]
pub struct Router {
    /// Command prefix (e.g., "/" or "#")
    command_prefix: String,
}

impl Router {
    pub fn new() -> Self {
        Self {
            command_prefix: "/".to_string(),
        }
    }

    /// Set the command prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.command_prefix = prefix.into();
        self
    }

    pub fn prefix(&self) -> &str {
        &self.command_prefix
    }

    /// Route a line of chat text. Returns `None` for plain chat and a bare prefix.
    pub fn route(&self, content: &str) -> Option<Route> {
        let without_prefix = content.trim().strip_prefix(&self.command_prefix)?;
        let without_prefix = without_prefix.trim_start();
        if without_prefix.is_empty() {
            return None;
        }

        let (head, rest) = match without_prefix.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (without_prefix, ""),
        };

        if let Some(kind) = CommandKind::from_name(head) {
            return Some(Route::Command {
                kind,
                argument: rest.to_string(),
            });
        }

        if let Some((kind, alias)) = longest_glued_alias(head) {
            let glued = &head[alias.len()..];
            let argument = if rest.is_empty() {
                glued.to_string()
            } else {
                format!("{glued} {rest}")
            };
            return Some(Route::Command {
                kind,
                argument: argument.trim().to_string(),
            });
        }

        Some(Route::Unknown {
            name: head.to_string(),
            suggestion: command_suggestion(head),
        })
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

fn longest_glued_alias(head: &str) -> Option<(CommandKind, &'static str)> {
    CommandKind::ALL
        .into_iter()
        .flat_map(|kind| kind.aliases().iter().map(move |alias| (kind, *alias)))
        .filter(|(_, alias)| !alias.is_ascii() && head.starts_with(alias) && head.len() > alias.len())
        .max_by_key(|(_, alias)| alias.len())
}

fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, a_ch) in a_chars.iter().enumerate() {
        curr[0] = i + 1;
        for (j, b_ch) in b_chars.iter().enumerate() {
            let cost = usize::from(a_ch != b_ch);
            curr[j + 1] = (curr[j] + 1).min(prev[j + 1] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Closest ASCII command name to a mistyped one.
fn command_suggestion(name: &str) -> Option<&'static str> {
    let normalized = name.trim().to_ascii_lowercase();
    if normalized.is_empty() || !normalized.is_ascii() {
        return None;
    }

    let threshold = if normalized.len() <= 4 {
        1
    } else if normalized.len() <= 8 {
        2
    } else {
        max(3, normalized.len() / 3)
    };

    CommandKind::ALL
        .into_iter()
        .flat_map(|kind| std::iter::once(kind.name()).chain(kind.aliases().iter().copied()))
        .filter(|candidate| candidate.is_ascii())
        .map(|candidate| {
            (
                candidate,
                levenshtein_distance(&normalized, &candidate.to_ascii_lowercase()),
            )
        })
        .filter(|(_, distance)| *distance <= threshold)
        .min_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)))
        .map(|(candidate, _)| candidate)
}
