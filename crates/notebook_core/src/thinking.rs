const OPEN_TAG: &str = "<think>";
const CLOSE_TAG: &str = "</think>";

/// Splits the first `<think>…</think>` block out of `content`.
///
/// Returns the displayed content and the trimmed reasoning text. Without a
/// complete tag pair the content is returned untouched and the reasoning is
/// `None`.
pub fn split_thinking(content: &str) -> (String, Option<String>) {
    let Some(open) = content.find(OPEN_TAG) else {
        return (content.to_string(), None);
    };
    let inner_start = open + OPEN_TAG.len();
    let Some(close_rel) = content[inner_start..].find(CLOSE_TAG) else {
        return (content.to_string(), None);
    };
    let inner_end = inner_start + close_rel;
    let block_end = inner_end + CLOSE_TAG.len();

    let reasoning = content[inner_start..inner_end].trim().to_string();
    let mut remaining = String::with_capacity(content.len() - (block_end - open));
    remaining.push_str(&content[..open]);
    remaining.push_str(&content[block_end..]);

    (remaining.trim().to_string(), Some(reasoning))
}
