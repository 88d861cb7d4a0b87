//! Paragraph-boundary text chunker.
//!
//! Splits extracted document text into pieces that respect a `max_tokens`
//! budget, breaking on paragraph boundaries (`\n\n`) so each embedded chunk
//! stays semantically coherent.

/// Approximate chars-per-token ratio.
const CHARS_PER_TOKEN: usize = 4;

/// Split text into chunks on paragraph boundaries, respecting max_tokens.
///
/// Empty or whitespace-only input yields no chunks. A single paragraph
/// longer than the budget is hard-split at the nearest newline or space;
/// split points never land inside a multibyte character.
pub fn chunk_text(text: &str, max_tokens: usize) -> Vec<String> {
    let max_chars = max_tokens * CHARS_PER_TOKEN;

    let mut chunks: Vec<String> = Vec::new();
    let mut current_buf = String::new();

    for para in text.split("\n\n") {
        let trimmed = para.trim();
        if trimmed.is_empty() {
            continue;
        }

        // If adding this paragraph would exceed max, flush current buffer
        let would_be = if current_buf.is_empty() {
            trimmed.len()
        } else {
            current_buf.len() + 2 + trimmed.len() // +2 for \n\n separator
        };

        if would_be > max_chars && !current_buf.is_empty() {
            chunks.push(std::mem::take(&mut current_buf));
        }

        if trimmed.len() > max_chars {
            if !current_buf.is_empty() {
                chunks.push(std::mem::take(&mut current_buf));
            }
            // Hard split, preferring newline then space boundaries
            let mut remaining = trimmed;
            while !remaining.is_empty() {
                let mut end = remaining.len().min(max_chars);
                // Byte budgets can land inside a multibyte character
                while end > 0 && !remaining.is_char_boundary(end) {
                    end -= 1;
                }
                if end == 0 {
                    // Budget smaller than one character; take it whole
                    end = remaining
                        .chars()
                        .next()
                        .map(char::len_utf8)
                        .unwrap_or(remaining.len());
                }
                let actual_split = if end < remaining.len() {
                    remaining[..end]
                        .rfind('\n')
                        .or_else(|| remaining[..end].rfind(' '))
                        .map(|pos| pos + 1)
                        .unwrap_or(end)
                } else {
                    end
                };
                chunks.push(remaining[..actual_split].trim().to_string());
                remaining = &remaining[actual_split..];
            }
        } else {
            if !current_buf.is_empty() {
                current_buf.push_str("\n\n");
            }
            current_buf.push_str(trimmed);
        }
    }

    if !current_buf.is_empty() {
        chunks.push(current_buf);
    }

    chunks.retain(|c| !c.is_empty());
    chunks
}
