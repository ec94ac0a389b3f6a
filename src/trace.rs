use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// JSON-lines layout diagnostics: event counters and span timings, flushed
/// with a summary record when a layout run finishes.
#[derive(Clone)]
pub struct TraceLog {
    inner: Arc<Mutex<TraceState>>,
}

struct TraceState {
    writer: BufWriter<File>,
    counters: HashMap<String, u64>,
    span_totals: HashMap<String, f64>,
    span_counts: HashMap<String, u64>,
}

impl TraceLog {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(TraceState {
                writer: BufWriter::new(file),
                counters: HashMap::new(),
                span_totals: HashMap::new(),
                span_counts: HashMap::new(),
            })),
        })
    }

    pub(crate) fn count(&self, key: &str, amount: u64) {
        if let Ok(mut state) = self.inner.lock() {
            let entry = state.counters.entry(key.to_string()).or_insert(0);
            *entry = entry.saturating_add(amount);
        }
    }

    pub(crate) fn span_ms(&self, name: &str, ms: f64) {
        let json = format!(
            "{{\"type\":\"trace.span\",\"name\":\"{}\",\"unit\":\"ms\",\"ms\":{:.3}}}",
            json_escape(name),
            ms
        );
        if let Ok(mut state) = self.inner.lock() {
            *state.span_totals.entry(name.to_string()).or_insert(0.0) += ms;
            let entry = state.span_counts.entry(name.to_string()).or_insert(0);
            *entry = entry.saturating_add(1);
            let _ = writeln!(state.writer, "{json}");
        }
    }

    /// Writes a summary record of drained counters and span totals, then
    /// flushes.
    pub fn finish(&self, context: &str) {
        if let Ok(mut state) = self.inner.lock() {
            let mut counters: Vec<(String, u64)> = state.counters.drain().collect();
            for (name, total) in state.span_totals.drain().collect::<Vec<_>>() {
                let count = state.span_counts.remove(&name).unwrap_or(0);
                counters.push((format!("{name}.count"), count));
                counters.push((format!("{name}.total_ms"), total.round() as u64));
            }
            counters.sort_by(|a, b| a.0.cmp(&b.0));
            let mut counts_json = String::from("{");
            for (index, (key, value)) in counters.iter().enumerate() {
                if index > 0 {
                    counts_json.push(',');
                }
                counts_json.push_str(&format!("\"{}\":{}", json_escape(key), value));
            }
            counts_json.push('}');
            let json = format!(
                "{{\"type\":\"trace.summary\",\"context\":\"{}\",\"counts\":{}}}",
                json_escape(context),
                counts_json
            );
            let _ = writeln!(state.writer, "{json}");
            let _ = state.writer.flush();
        }
    }
}

pub(crate) fn json_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_escape_handles_control_characters() {
        assert_eq!(json_escape("a\"b\\c\nd"), "a\\\"b\\\\c\\nd");
        assert_eq!(json_escape("plain"), "plain");
    }
}
