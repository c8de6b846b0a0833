// src/identity.rs

//! Turns raw version-control log text into ranked, deduplicated authors.
//!
//! Author lines are recognised by the per-kind prefix (`Author:` for git,
//! `user:` for hg) and must contain an `@`. The rest of the line is read as a
//! mail header address (`Name <email>`, `"Last, First" <email>`, `email (Name)`
//! or a bare `email`), and only the first address on the line counts.
//!
//! Counts are keyed by the trimmed, lower-cased email. The stored display name
//! is the last non-empty one met while scanning, so the result depends on the
//! order the backend yields its log in. Both supported backends scan
//! newest-first, which means the name on the *oldest* commit carrying one wins.

use crate::model::RepositoryKind;
use indexmap::IndexMap;
use tracing::debug;

/// One author of a repository with the number of commits they made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub display_name: String,
    pub email: String,
    pub commits: u64,
}

#[derive(Default)]
struct Tally {
    name: Option<String>,
    commits: u64,
}

/// Aggregates the author lines of `lines` into identities, most commits first.
///
/// Ties keep the order in which each email was first seen. Calling this again
/// with the same lines yields the same sequence.
pub fn resolve<S: AsRef<str>>(kind: RepositoryKind, lines: &[S]) -> Vec<Identity> {
    let prefix = kind.author_prefix();
    let mut tallies: IndexMap<String, Tally> = IndexMap::new();

    for line in lines {
        let line = line.as_ref();
        let Some(rest) = line.strip_prefix(prefix) else { continue };
        if !line.contains('@') {
            continue;
        }
        let Some((name, email)) = parse_address(rest.trim()) else {
            debug!("Skipping unparseable author line: {}", line);
            continue;
        };
        let email = normalize_email(&email);
        if email.is_empty() {
            debug!("Skipping author line without an address: {}", line);
            continue;
        }

        let tally = tallies.entry(email).or_default();
        tally.commits += 1;
        if !name.is_empty() {
            tally.name = Some(name);
        }
    }

    let mut identities: Vec<Identity> = tallies
        .into_iter()
        .map(|(email, tally)| Identity {
            display_name: tally.name.unwrap_or_else(|| email.clone()),
            email,
            commits: tally.commits,
        })
        .collect();
    // Stable sort keeps first-seen order among equal counts.
    identities.sort_by(|a, b| b.commits.cmp(&a.commits));
    identities
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Parses the first address of a mail header value into `(name, email)`.
///
/// The name is empty when the address carries none.
pub fn parse_address(text: &str) -> Option<(String, String)> {
    let first = first_address(text);
    if first.trim().is_empty() {
        return None;
    }

    match find_unquoted(first, '<') {
        Some(open) => {
            let after = &first[open + 1..];
            let email = match find_unquoted(after, '>') {
                Some(close) => &after[..close],
                None => after,
            };
            let (phrase, _) = split_phrase(&first[..open]);
            Some((phrase, strip_whitespace(email)))
        }
        None => {
            let (addr, comments) = split_phrase(first);
            // `user@host (Full Name)`: the comment doubles as the name.
            let name = comments.last().cloned().unwrap_or_default();
            Some((name, strip_whitespace(&addr)))
        }
    }
}

/// Returns the text up to the first comma that is not quoted, bracketed or
/// inside a comment.
fn first_address(text: &str) -> &str {
    let mut in_quote = false;
    let mut escaped = false;
    let mut angle = 0usize;
    let mut paren = 0usize;

    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quote || paren > 0 => escaped = true,
            '"' if paren == 0 => in_quote = !in_quote,
            '(' if !in_quote => paren += 1,
            ')' if !in_quote && paren > 0 => paren -= 1,
            '<' if !in_quote && paren == 0 => angle += 1,
            '>' if !in_quote && paren == 0 && angle > 0 => angle -= 1,
            ',' if !in_quote && paren == 0 && angle == 0 => return &text[..i],
            _ => {}
        }
    }
    text
}

/// Byte offset of the first `target` outside quoted strings and comments.
fn find_unquoted(text: &str, target: char) -> Option<usize> {
    let mut in_quote = false;
    let mut escaped = false;
    let mut paren = 0usize;

    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quote || paren > 0 => escaped = true,
            '"' if paren == 0 => in_quote = !in_quote,
            '(' if !in_quote => paren += 1,
            ')' if !in_quote && paren > 0 => paren -= 1,
            c if c == target && !in_quote && paren == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

/// Splits header text into its phrase (quotes removed, whitespace collapsed)
/// and the contents of its comments.
fn split_phrase(text: &str) -> (String, Vec<String>) {
    let mut phrase = String::new();
    let mut comments = Vec::new();
    let mut comment = String::new();
    let mut in_quote = false;
    let mut escaped = false;
    let mut paren = 0usize;

    for c in text.chars() {
        if escaped {
            escaped = false;
            if paren > 0 {
                comment.push(c);
            } else {
                phrase.push(c);
            }
            continue;
        }
        match c {
            '\\' if in_quote || paren > 0 => escaped = true,
            '"' if paren == 0 => in_quote = !in_quote,
            '(' if !in_quote => {
                if paren > 0 {
                    comment.push(c);
                }
                paren += 1;
            }
            ')' if !in_quote && paren > 0 => {
                paren -= 1;
                if paren == 0 {
                    comments.push(collapse_whitespace(&comment));
                    comment.clear();
                    phrase.push(' ');
                } else {
                    comment.push(c);
                }
            }
            c if paren > 0 => comment.push(c),
            c => phrase.push(c),
        }
    }
    if paren > 0 && !comment.is_empty() {
        comments.push(collapse_whitespace(&comment));
    }

    (collapse_whitespace(&phrase), comments)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}
