//! Text and JSON output.

use anyhow::Result;
use nostr::{encode_note, encode_npub};
use nostr_client::{
    ConnectionState, FeedPage, Note, PublishOutcome, PublishResult, RelayStatus, Thread,
    ThreadNode,
};
use serde_json::{Value, json};
use std::time::{SystemTime, UNIX_EPOCH};

/// How long ago `created_at` was, e.g. `5m`.
fn age(created_at: u64, now: u64) -> String {
    let secs = now.saturating_sub(created_at);
    match secs {
        0..60 => format!("{}s", secs),
        60..3600 => format!("{}m", secs / 60),
        3600..86400 => format!("{}h", secs / 3600),
        _ => format!("{}d", secs / 86400),
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

fn excerpt(content: &str, max_chars: usize) -> String {
    let line = content.lines().next().unwrap_or_default();
    if line.chars().count() > max_chars || content.lines().nth(1).is_some() {
        let cut: String = line.chars().take(max_chars).collect();
        format!("{}...", cut)
    } else {
        line.to_string()
    }
}

fn note_json(note: &Note) -> Value {
    json!({
        "id": note.id(),
        "pubkey": note.event.pubkey,
        "author": note.author_name(),
        "created_at": note.event.created_at,
        "content": note.event.content,
        "reply_count": note.reply_count,
        "parent": note.parent.as_ref().map(|p| note_json(p)),
    })
}

/// Lines for one note, indented by `indent` spaces.
fn note_lines(note: &Note, indent: usize, now: u64) -> Vec<String> {
    let pad = " ".repeat(indent);
    let mut lines = Vec::new();

    if let Some(parent) = &note.parent {
        lines.push(format!(
            "{}> {}: {}",
            pad,
            parent.author_name(),
            excerpt(&parent.event.content, 60)
        ));
    }

    let replies = match note.reply_count {
        0 => String::new(),
        1 => "  1 reply".to_string(),
        n => format!("  {} replies", n),
    };
    lines.push(format!(
        "{}{}  {}{}",
        pad,
        note.author_name(),
        age(note.event.created_at, now),
        replies
    ));
    for line in note.event.content.lines() {
        lines.push(format!("{}  {}", pad, line));
    }
    let id = encode_note(note.id()).unwrap_or_else(|_| note.id().to_string());
    lines.push(format!("{}  {}", pad, id));
    lines
}

pub fn print_page(page: &FeedPage, as_json: bool) -> Result<()> {
    if as_json {
        let value = json!({
            "notes": page.notes.iter().map(note_json).collect::<Vec<_>>(),
            "next_until": page.next_until,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    if page.notes.is_empty() {
        println!("No notes found.");
        return Ok(());
    }
    let now = now();
    for note in &page.notes {
        for line in note_lines(note, 0, now) {
            println!("{}", line);
        }
        println!();
    }
    if let Some(until) = page.next_until {
        println!("More: --until {}", until);
    }
    Ok(())
}

fn thread_json(node: &ThreadNode) -> Value {
    let mut value = note_json(&node.note);
    value["replies"] = Value::Array(node.replies.iter().map(thread_json).collect());
    value
}

fn thread_lines(node: &ThreadNode, depth: usize, now: u64, out: &mut Vec<String>) {
    out.extend(note_lines(&node.note, depth * 2, now));
    for reply in &node.replies {
        thread_lines(reply, depth + 1, now, out);
    }
}

pub fn print_thread(thread: &Thread, as_json: bool) -> Result<()> {
    if as_json {
        let value = json!({
            "root_id": thread.root_id,
            "focus": thread_json(&thread.focus),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let mut lines = Vec::new();
    thread_lines(&thread.focus, 0, now(), &mut lines);
    for line in lines {
        println!("{}", line);
    }
    println!("\n{} replies", thread.focus.descendant_count());
    Ok(())
}

pub fn print_pubkeys(pubkeys: &[String], as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(pubkeys)?);
        return Ok(());
    }
    for pubkey in pubkeys {
        println!("{}", encode_npub(pubkey)?);
    }
    println!("\n{} accounts", pubkeys.len());
    Ok(())
}

fn outcome_text(outcome: &PublishOutcome) -> String {
    match outcome {
        PublishOutcome::Accepted => "accepted".to_string(),
        PublishOutcome::Rejected(reason) => format!("rejected: {}", reason),
        PublishOutcome::TimedOut => "timed out".to_string(),
    }
}

pub fn print_publish(result: &PublishResult, as_json: bool) -> Result<()> {
    if as_json {
        let outcomes: serde_json::Map<String, Value> = result
            .outcomes
            .iter()
            .map(|(relay, outcome)| (relay.clone(), Value::String(outcome_text(outcome))))
            .collect();
        let value = json!({
            "id": result.event_id,
            "accepted": result.accepted_count(),
            "outcomes": outcomes,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Published {}", encode_note(&result.event_id)?);
    for (relay, outcome) in &result.outcomes {
        println!("  {}: {}", relay, outcome_text(outcome));
    }
    Ok(())
}

fn state_text(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Disconnected => "disconnected",
        ConnectionState::Connecting => "connecting",
        ConnectionState::Connected => "connected",
        ConnectionState::Failed => "failed",
    }
}

pub fn print_statuses(statuses: &[RelayStatus], as_json: bool) -> Result<()> {
    if as_json {
        let value: Vec<Value> = statuses
            .iter()
            .map(|s| {
                json!({
                    "url": s.url,
                    "state": state_text(s.state),
                    "error": s.last_error,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    for status in statuses {
        match &status.last_error {
            Some(error) => println!("{:<40} {} ({})", status.url, state_text(status.state), error),
            None => println!("{:<40} {}", status.url, state_text(status.state)),
        }
    }
    Ok(())
}
