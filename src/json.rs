//! Lenient JSON extraction from model output.

/// Extract the JSON document from LLM output that might contain markdown or extra text.
///
/// Accepts objects and arrays. Trailing commas are removed.
pub fn extract_json(text: &str) -> String {
    let trimmed = text.trim();

    // Already JSON
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return strip_trailing_commas(trimmed);
    }

    // Wrapped in markdown code block
    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return strip_trailing_commas(after[..end].trim());
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') || inner.starts_with('[') {
                return strip_trailing_commas(inner);
            }
        }
    }

    // Try to find document bounds
    let start = trimmed.find(['{', '[']);
    let end = trimmed.rfind(['}', ']']);
    if let (Some(start), Some(end)) = (start, end)
        && end > start
    {
        return strip_trailing_commas(&trimmed[start..=end]);
    }

    trimmed.to_string()
}

/// Remove commas that directly precede `}` or `]`, ignoring string contents.
pub fn strip_trailing_commas(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_str = false;
    let mut escape = false;

    for (i, c) in input.char_indices() {
        if in_str {
            if escape {
                escape = false;
            } else if c == '\\' {
                escape = true;
            } else if c == '"' {
                in_str = false;
            }
            out.push(c);
            continue;
        }

        match c {
            '"' => {
                in_str = true;
                out.push(c);
            }
            ',' => {
                let next = input[i + 1..].trim_start().chars().next();
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Best-effort parse of an incomplete JSON document, as produced mid-stream.
///
/// Open strings and containers are closed. When the tail is not yet a complete value
/// (a dangling key, a half-written literal), it is cut back to the last member boundary.
/// Returns `None` until a container has been opened.
pub fn parse_partial_json(text: &str) -> Option<serde_json::Value> {
    const MAX_ATTEMPTS: usize = 8;

    let start = text.find(['{', '['])?;
    let doc = &text[start..];

    let scan = Scan::of(doc);
    if let Some(value) = scan.try_close(doc) {
        return Some(value);
    }

    for &cut in scan.cuts.iter().rev().take(MAX_ATTEMPTS) {
        let prefix = &doc[..cut];
        if let Some(value) = Scan::of(prefix).try_close(prefix) {
            return Some(value);
        }
    }
    None
}

/// Lexical state at the end of a JSON prefix.
struct Scan {
    /// Closers for the currently open containers, innermost last.
    open: Vec<char>,
    in_str: bool,
    /// Start of an escape sequence at the end of the open string that cannot be closed
    /// as-is: a lone `\`, a partial `\uXXXX`, or a high surrogate still missing its pair.
    dangling_escape: Option<usize>,
    /// Byte offsets where the prefix can be cut and still end at a member boundary.
    cuts: Vec<usize>,
}

/// An escape sequence being read inside a string.
struct Escape {
    start: usize,
    /// Hex digits collected so far, `None` until the escape turns out to be `\u`.
    hex: Option<String>,
}

impl Scan {
    fn of(doc: &str) -> Self {
        let mut open = Vec::new();
        let mut cuts = Vec::new();
        let mut in_str = false;
        let mut escape: Option<Escape> = None;
        let mut high_surrogate: Option<usize> = None;

        for (i, c) in doc.char_indices() {
            if in_str {
                if let Some(mut esc) = escape.take() {
                    match esc.hex {
                        None if c == 'u' => {
                            esc.hex = Some(String::with_capacity(4));
                            escape = Some(esc);
                        }
                        None => high_surrogate = None,
                        Some(ref mut hex) => {
                            hex.push(c);
                            if hex.len() < 4 {
                                escape = Some(esc);
                            } else if u16::from_str_radix(hex.as_str(), 16)
                                .is_ok_and(|unit| (0xD800..0xDC00).contains(&unit))
                            {
                                high_surrogate = Some(esc.start);
                            } else {
                                high_surrogate = None;
                            }
                        }
                    }
                } else if c == '\\' {
                    escape = Some(Escape {
                        start: i,
                        hex: None,
                    });
                } else if c == '"' {
                    in_str = false;
                    high_surrogate = None;
                } else {
                    high_surrogate = None;
                }
                continue;
            }
            match c {
                '"' => in_str = true,
                '{' => {
                    open.push('}');
                    cuts.push(i + 1);
                }
                '[' => {
                    open.push(']');
                    cuts.push(i + 1);
                }
                '}' | ']' => {
                    open.pop();
                    cuts.push(i + 1);
                }
                ',' => cuts.push(i),
                _ => {}
            }
        }

        let dangling_escape = if in_str {
            high_surrogate.or(escape.map(|esc| esc.start))
        } else {
            None
        };

        Self {
            open,
            in_str,
            dangling_escape,
            cuts,
        }
    }

    fn try_close(&self, doc: &str) -> Option<serde_json::Value> {
        let mut candidate = if self.in_str {
            doc[..self.dangling_escape.unwrap_or(doc.len())].to_string()
        } else {
            doc.trim_end().to_string()
        };
        if self.in_str {
            candidate.push('"');
        }
        candidate.extend(self.open.iter().rev());
        serde_json::from_str(&strip_trailing_commas(&candidate)).ok()
    }
}
