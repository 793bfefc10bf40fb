use super::anchors::DrugAnchor;

/// Half-open line range `[start, end)` attributed to one medication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscussionChunk {
    pub start: usize,
    pub end: usize,
}

/// Turn sorted anchors into consecutive ranges; the last one runs to `line_count`.
pub fn chunk_ranges(anchors: &[DrugAnchor], line_count: usize) -> Vec<DiscussionChunk> {
    anchors
        .iter()
        .enumerate()
        .map(|(k, anchor)| DiscussionChunk {
            start: anchor.line_index,
            end: anchors
                .get(k + 1)
                .map_or(line_count, |next| next.line_index),
        })
        .collect()
}

/// Remove the trailing word of the last non-blank line, dropping the line if
/// nothing is left. Lines after it (blank ones) are kept as they are.
pub fn trim_trailing_word(lines: &mut Vec<String>) {
    let Some(index) = lines.iter().rposition(|line| !line.trim().is_empty()) else {
        return;
    };

    let trimmed = lines[index].trim_end();
    let kept = match trimmed.rfind(char::is_whitespace) {
        Some(split) => trimmed[..split].trim_end().to_string(),
        None => String::new(),
    };

    if kept.is_empty() {
        lines.remove(index);
    } else {
        lines[index] = kept;
    }
}
