//! Thinking-tag cleanup for accumulated turns.
//!
//! Reasoning-tuned models wrap their chain of thought in `<think>` or
//! `<thinking>` blocks inside the content stream. Those blocks are stripped
//! from the accumulated turn before protocol parsing and before the turn is
//! appended to the conversation; the structured event logger records whether
//! cleanup changed anything.

const THINK_OPEN_TAGS: [&str; 2] = ["<thinking>", "<think>"];
const THINK_CLOSE_TAGS: [&str; 2] = ["</thinking>", "</think>"];

/// Remove `<think>`/`<thinking>` blocks from a completed turn.
///
/// An opening tag with no matching close (the model was cut off mid-thought)
/// drops everything from the tag to the end of the text. Text outside the
/// blocks is preserved verbatim.
pub fn strip_think_blocks(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    loop {
        match find_first_tag(rest, &THINK_OPEN_TAGS) {
            None => {
                out.push_str(rest);
                break;
            }
            Some((open_idx, open_len)) => {
                out.push_str(&rest[..open_idx]);
                let after_open = &rest[open_idx + open_len..];
                match find_first_tag(after_open, &THINK_CLOSE_TAGS) {
                    Some((close_idx, close_len)) => {
                        rest = &after_open[close_idx + close_len..];
                    }
                    None => break, // unclosed block swallows the tail
                }
            }
        }
    }

    out
}

/// Earliest occurrence of any tag; longer tags win ties so `<thinking>` is
/// not mis-read as `<think>` followed by `ing>`.
fn find_first_tag(haystack: &str, tags: &[&str]) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize)> = None;
    for tag in tags {
        if let Some(idx) = haystack.find(tag) {
            let should_replace = match best {
                None => true,
                Some((best_idx, best_len)) => {
                    idx < best_idx || (idx == best_idx && tag.len() > best_len)
                }
            };
            if should_replace {
                best = Some((idx, tag.len()));
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_tags_passes_through() {
        let text = "plain answer with no reasoning tags";
        assert_eq!(strip_think_blocks(text), text);
    }

    #[test]
    fn test_strips_single_block() {
        let text = "before <think>secret reasoning</think>after";
        assert_eq!(strip_think_blocks(text), "before after");
    }

    #[test]
    fn test_strips_thinking_variant() {
        let text = "<thinking>plan the call</thinking>Done.";
        assert_eq!(strip_think_blocks(text), "Done.");
    }

    #[test]
    fn test_strips_multiple_blocks() {
        let text = "a<think>1</think>b<think>2</think>c";
        assert_eq!(strip_think_blocks(text), "abc");
    }

    #[test]
    fn test_unclosed_block_drops_tail() {
        let text = "visible text <think>never closed";
        assert_eq!(strip_think_blocks(text), "visible text ");
    }

    #[test]
    fn test_thinking_not_misread_as_think() {
        let text = "<thinking>x</thinking>kept";
        assert_eq!(strip_think_blocks(text), "kept");
    }

    #[test]
    fn test_tool_call_outside_block_survives() {
        let text = "<think>should I?</think>[[qwen-tool-start]]\n```\n{\"name\":\"get_cwd\"}\n```";
        let cleaned = strip_think_blocks(text);
        assert!(cleaned.starts_with("[[qwen-tool-start]]"));
        assert!(cleaned.contains("get_cwd"));
    }
}
