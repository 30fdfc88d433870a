//! Turning operator input into validated recipients.
//!
//! Every input token is either an address or the path of a file holding one
//! address per line.  Bad tokens and bad lines never abort the batch; they
//! come back as [`Diagnostic`]s for the command layer to print.

use std::fmt;
use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use log::{debug, warn};

use crate::types::Recipient;

/// A non-fatal problem found while resolving input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The token is neither a valid address nor an existing file.
    UnrecognizedInput { token: String },
    /// A line of a recipient file is not a valid address.
    InvalidLine { file: String, line: String },
    /// The file exists but could not be read.
    UnreadableFile { file: String, reason: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnrecognizedInput { token } => {
                write!(f, "{token} does not appear to be an email address or a file")
            }
            Diagnostic::InvalidLine { file, line } => {
                write!(f, "{line} from file {file} does not appear to be an email address")
            }
            Diagnostic::UnreadableFile { file, reason } => {
                write!(f, "could not read recipients from {file}: {reason}")
            }
        }
    }
}

/// Output of [`resolve`]: accepted recipients in encounter order, plus
/// whatever was rejected along the way.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub recipients: Vec<Recipient>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Resolution {
    /// Drops repeated recipients, keeping the first occurrence of each.
    pub fn deduplicated(mut self) -> Self {
        let mut seen = std::collections::HashSet::new();
        self.recipients.retain(|r| seen.insert(r.clone()));
        self
    }
}

pub fn resolve<I, S>(inputs: I) -> Resolution
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut resolution = Resolution::default();

    for input in inputs {
        let token = input.as_ref();
        if let Some(recipient) = Recipient::parse(token) {
            resolution.recipients.push(recipient);
            continue;
        }

        let path = Path::new(token);
        if path.is_file() {
            debug!("Reading recipients from {}", path.display());
            if let Err(e) = read_recipient_file(path, token, &mut resolution) {
                let diagnostic = Diagnostic::UnreadableFile {
                    file: token.to_string(),
                    reason: e.to_string(),
                };
                warn!("{}", diagnostic);
                resolution.diagnostics.push(diagnostic);
            }
            continue;
        }

        let diagnostic = Diagnostic::UnrecognizedInput {
            token: token.to_string(),
        };
        warn!("{}", diagnostic);
        resolution.diagnostics.push(diagnostic);
    }

    resolution
}

fn read_recipient_file(path: &Path, token: &str, resolution: &mut Resolution) -> io::Result<()> {
    let mut reader = BufReader::new(fs::File::open(path)?);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        // Non-UTF-8 bytes can never form an address; report the line and move on.
        let parsed = std::str::from_utf8(&buf)
            .ok()
            .and_then(|line| Recipient::parse(line.trim()));
        match parsed {
            Some(recipient) => resolution.recipients.push(recipient),
            None => {
                let diagnostic = Diagnostic::InvalidLine {
                    file: token.to_string(),
                    line: String::from_utf8_lossy(&buf).trim().to_string(),
                };
                warn!("{}", diagnostic);
                resolution.diagnostics.push(diagnostic);
            }
        }
    }
}

// Address grammar.  Whole-string match only: local part, "@", domain.

fn is_atext(c: char) -> bool {
    matches!(c,
        '-' | '!' | '#'..='\'' | '*' | '+' | '/'..='9' | '=' | '?' | 'A'..='Z' | '^'..='~')
}

fn is_qtext(c: char) -> bool {
    matches!(c, ']' | '!' | '#'..='[' | '^'..='~' | ' ' | '\t')
}

fn is_quoted_pair_char(c: char) -> bool {
    matches!(c, '\t' | ' '..='~')
}

fn is_dtext(c: char) -> bool {
    matches!(c, '\t' | ' '..='Z' | '^'..='~')
}

/// Consumes a dot-atom from the front of `s`, returning the rest.
fn dot_atom(s: &str) -> Option<&str> {
    let mut rest = s;
    loop {
        let end = rest.find(|c: char| !is_atext(c)).unwrap_or(rest.len());
        if end == 0 {
            return None;
        }
        rest = &rest[end..];
        match rest.strip_prefix('.') {
            Some(after_dot) => rest = after_dot,
            None => return Some(rest),
        }
    }
}

fn quoted_string(s: &str) -> Option<&str> {
    let mut chars = s.strip_prefix('"')?.char_indices();
    let body_start = 1;
    let mut saw_content = false;
    while let Some((i, c)) = chars.next() {
        match c {
            '"' if saw_content => return Some(&s[body_start + i + 1..]),
            '\\' => match chars.next() {
                Some((_, escaped)) if is_quoted_pair_char(escaped) => saw_content = true,
                _ => return None,
            },
            c if is_qtext(c) => saw_content = true,
            _ => return None,
        }
    }
    None
}

fn domain_literal(s: &str) -> Option<&str> {
    let body = s.strip_prefix('[')?;
    let end = body.find(|c: char| !is_dtext(c)).unwrap_or(body.len());
    body[end..].strip_prefix(']')
}

/// Whether `candidate` is, in its entirety, a well-formed address.
pub fn is_valid_address(candidate: &str) -> bool {
    let after_local = if candidate.starts_with('"') {
        quoted_string(candidate)
    } else {
        dot_atom(candidate)
    };
    let Some(domain) = after_local.and_then(|rest| rest.strip_prefix('@')) else {
        return false;
    };
    let remainder = if domain.starts_with('[') {
        domain_literal(domain)
    } else {
        dot_atom(domain)
    };
    remainder == Some("")
}
