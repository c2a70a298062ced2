//! Reply interpretation
//!
//! The external system answers with a small markup document: a created
//! count and an assigned identifier on success, or a list of error
//! messages on rejection. An unparsable reply is its own outcome class,
//! distinct from a rejection, and the two are never conflated in results
//! or audit output.

/// Structured outcome of one raw reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// The voucher was created
    Created { external_id: Option<String> },
    /// The external system refused the voucher; messages are verbatim
    Rejected { messages: Vec<String> },
    /// The reply could not be parsed at all
    Malformed { detail: String },
}

/// Parse a raw reply into a structured outcome
pub fn interpret(raw: &str) -> ReplyOutcome {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return ReplyOutcome::Malformed {
            detail: "empty reply".to_string(),
        };
    }
    if !trimmed.starts_with('<') {
        return ReplyOutcome::Malformed {
            detail: "reply is not a markup document".to_string(),
        };
    }

    let line_errors = all_texts(trimmed, "LINEERROR");
    let error_count = text_of(trimmed, "ERRORS").and_then(|t| t.parse::<u32>().ok());
    if !line_errors.is_empty() || error_count.is_some_and(|n| n > 0) {
        return ReplyOutcome::Rejected {
            messages: line_errors,
        };
    }

    match text_of(trimmed, "CREATED") {
        Some(count) => match count.parse::<u32>() {
            Ok(n) if n >= 1 => ReplyOutcome::Created {
                external_id: text_of(trimmed, "LASTVCHID").map(|id| id.to_string()),
            },
            Ok(_) => ReplyOutcome::Rejected {
                messages: Vec::new(),
            },
            Err(_) => ReplyOutcome::Malformed {
                detail: format!("created count '{}' is not a number", count),
            },
        },
        None => ReplyOutcome::Malformed {
            detail: "missing CREATED element".to_string(),
        },
    }
}

/// Text content of the first `<TAG>...</TAG>` occurrence
fn text_of<'a>(raw: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = raw.find(&open)? + open.len();
    let end = raw[start..].find(&close)? + start;
    Some(raw[start..end].trim())
}

/// Text content of every `<TAG>...</TAG>` occurrence, entities unescaped
fn all_texts(raw: &str, tag: &str) -> Vec<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let mut texts = Vec::new();
    let mut rest = raw;
    while let Some(start) = rest.find(&open) {
        let after = &rest[start + open.len()..];
        match after.find(&close) {
            Some(end) => {
                texts.push(unescape(after[..end].trim()));
                rest = &after[end + close.len()..];
            }
            None => break,
        }
    }
    texts
}

/// Undo the basic entity escapes so messages read as the external system
/// wrote them
fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
