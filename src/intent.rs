//! Pattern matching over free text: `@file` mentions in user input, and code
//! edits suggested by the model. Everything here is best-effort; no match is
//! never an error.

use std::sync::OnceLock;

use regex::Regex;

use crate::session::FileEditIntent;

fn mention_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@([\w.\-/\\]+)").expect("valid mention regex"))
}

fn code_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```[^\n`]*\n([\s\S]*?)```").expect("valid code block regex"))
}

fn target_file_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\b(?:in|of|to|replace|update|overwrite)\s+[`'"]?([\w./\\-]+\.\w+)"#)
            .expect("valid target file regex")
    })
}

/// The path from the first `@path` token, without the `@`.
pub fn parse_file_mention(input: &str) -> Option<String> {
    mention_re()
        .captures(input)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Body of the first fenced code block, including its trailing newline.
pub fn find_code_block(reply: &str) -> Option<String> {
    code_block_re()
        .captures(reply)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// A file name introduced by "in", "to", "update", ... that has an extension.
pub fn find_target_file(reply: &str) -> Option<String> {
    target_file_re()
        .captures(reply)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Pair the first code block with a target file. When the reply names no file,
/// `fallback_file` (the file the user mentioned this turn, if any) is used.
pub fn extract_edit_intent(reply: &str, fallback_file: Option<&str>) -> Option<FileEditIntent> {
    let new_code = find_code_block(reply)?;
    let file_name = find_target_file(reply).or_else(|| fallback_file.map(str::to_string))?;

    Some(FileEditIntent {
        file_name,
        new_code,
    })
}

/// Bullet lines from a follow-up suggestion reply.
pub fn parse_follow_ups(reply: &str) -> Vec<String> {
    reply
        .lines()
        .map(str::trim)
        .filter_map(|line| {
            line.strip_prefix('-')
                .or_else(|| line.strip_prefix('•'))
                .or_else(|| line.strip_prefix("* "))
        })
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mention_extracts_path() {
        assert_eq!(
            parse_file_mention("please fix @src/app.ts"),
            Some("src/app.ts".to_string())
        );
    }

    #[test]
    fn test_mention_stops_at_whitespace_and_punctuation() {
        assert_eq!(
            parse_file_mention("look at @lib\\util-v2.rs, then explain"),
            Some("lib\\util-v2.rs".to_string())
        );
        assert_eq!(
            parse_file_mention("@a.py and @b.py"),
            Some("a.py".to_string())
        );
    }

    #[test]
    fn test_no_mention() {
        assert_eq!(parse_file_mention("email me at noone"), None);
        assert_eq!(parse_file_mention("a lone @ sign"), None);
    }

    #[test]
    fn test_edit_intent_from_update_phrase() {
        let reply = "Update `foo.py`:\n```py\nprint(1)\n```";
        assert_eq!(
            extract_edit_intent(reply, None),
            Some(FileEditIntent {
                file_name: "foo.py".to_string(),
                new_code: "print(1)\n".to_string(),
            })
        );
    }

    #[test]
    fn test_edit_intent_phrase_is_case_insensitive() {
        let reply = "You should OVERWRITE \"src/lib.rs\" with:\n```rust\nfn main() {}\n```\n";
        let intent = extract_edit_intent(reply, None).unwrap();
        assert_eq!(intent.file_name, "src/lib.rs");
        assert_eq!(intent.new_code, "fn main() {}\n");
    }

    #[test]
    fn test_code_without_file_and_no_fallback() {
        let reply = "Try this:\n```\nx = 1\n```";
        assert_eq!(extract_edit_intent(reply, None), None);
    }

    #[test]
    fn test_code_without_file_uses_fallback() {
        let reply = "Here's a cleaner version:\n```ts\nexport const x = 1;\n```";
        let intent = extract_edit_intent(reply, Some("src/app.ts")).unwrap();
        assert_eq!(intent.file_name, "src/app.ts");
        assert_eq!(intent.new_code, "export const x = 1;\n");
    }

    #[test]
    fn test_named_file_wins_over_fallback() {
        let reply = "Change it in main.go:\n```go\npackage main\n```";
        let intent = extract_edit_intent(reply, Some("other.go")).unwrap();
        assert_eq!(intent.file_name, "main.go");
    }

    #[test]
    fn test_file_without_code_is_not_an_edit() {
        assert_eq!(extract_edit_intent("The bug is in app.ts line 4.", Some("app.ts")), None);
    }

    #[test]
    fn test_only_first_code_block_is_used() {
        let reply = "Update a.js:\n```js\nfirst\n```\nand\n```js\nsecond\n```";
        assert_eq!(extract_edit_intent(reply, None).unwrap().new_code, "first\n");
    }

    #[test]
    fn test_follow_up_bullets() {
        let reply = "Here are some ideas:\n- How do I test this?\n  - What about errors? \n* Can it be faster?\n**Note:** none\n-   \n";
        assert_eq!(
            parse_follow_ups(reply),
            vec![
                "How do I test this?".to_string(),
                "What about errors?".to_string(),
                "Can it be faster?".to_string(),
            ]
        );
    }
}
