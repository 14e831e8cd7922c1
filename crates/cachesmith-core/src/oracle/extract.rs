//! Fenced C++ code extraction from oracle replies.

use std::sync::OnceLock;

use regex::Regex;

fn cpp_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```cpp(.*?)```").expect("cpp block pattern is valid"))
}

/// Every ```` ```cpp ```` block in `text`, trimmed, in order.
pub fn extract_cpp_blocks(text: &str) -> Vec<String> {
    cpp_block_re()
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .collect()
}

/// The first non-empty block, if any.
pub fn first_cpp_block(text: &str) -> Option<String> {
    extract_cpp_blocks(text).into_iter().find(|b| !b.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_all_blocks_in_order() {
        let reply = "Here you go:\n```cpp\nint a;\n```\nand\n```cpp\nint b;\n```\n";
        assert_eq!(extract_cpp_blocks(reply), vec!["int a;", "int b;"]);
    }

    #[test]
    fn test_ignores_other_languages() {
        let reply = "```python\nprint(1)\n```\n```cpp\n#include <vector>\n```";
        assert_eq!(first_cpp_block(reply).as_deref(), Some("#include <vector>"));
    }

    #[test]
    fn test_no_block() {
        assert!(extract_cpp_blocks("plain prose").is_empty());
        assert_eq!(first_cpp_block("```cpp\n\n```"), None);
    }
}
