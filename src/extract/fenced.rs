use super::{Extraction, OutputExtractor};

/// Fence languages accepted as engine code. An untagged fence is accepted too.
const ACCEPTED_LANGUAGES: &[&str] = &["js", "javascript", "strudel", "ts", "typescript"];

const NO_CODE_MESSAGE: &str = "No code found in AI response. Try rephrasing your request.";

/// Extracts the last fenced code block from markdown-ish model output.
#[derive(Debug, Clone, Default)]
pub struct FencedCodeExtractor;

struct CodeBlock {
    language: String,
    body: String,
    closed: bool,
}

impl FencedCodeExtractor {
    pub fn new() -> Self {
        Self
    }

    fn code_blocks(text: &str) -> Vec<CodeBlock> {
        let mut blocks = Vec::new();
        let mut current: Option<CodeBlock> = None;

        for line in text.lines() {
            let trimmed = line.trim_start();
            match current.take() {
                None => {
                    if let Some(lang) = trimmed.strip_prefix("```") {
                        current = Some(CodeBlock {
                            language: lang.trim().to_lowercase(),
                            body: String::new(),
                            closed: false,
                        });
                    }
                }
                Some(mut block) => {
                    if trimmed.starts_with("```") {
                        block.closed = true;
                        blocks.push(block);
                    } else {
                        block.body.push_str(line);
                        block.body.push('\n');
                        current = Some(block);
                    }
                }
            }
        }

        // Stream ended inside a fence
        blocks.extend(current);
        blocks
    }

    fn accepts_language(language: &str) -> bool {
        language.is_empty() || ACCEPTED_LANGUAGES.contains(&language)
    }
}

impl OutputExtractor for FencedCodeExtractor {
    fn parse(&self, text: &str) -> Extraction {
        let failure = |error: String| Extraction::Failure {
            error,
            raw_response: text.to_string(),
        };

        let Some(block) = Self::code_blocks(text)
            .into_iter()
            .filter(|b| Self::accepts_language(&b.language))
            .filter(|b| !b.body.trim().is_empty())
            .last()
        else {
            return failure(NO_CODE_MESSAGE.to_string());
        };

        let code = block.body.trim().to_string();
        if !block.closed {
            tracing::debug!("extract: using unterminated code fence");
        }

        if let Err(problem) = check_brackets(&code) {
            return failure(format!("Generated code appears incomplete: {}", problem));
        }

        Extraction::Success { code }
    }

    fn is_unchanged(&self, old_code: &str, new_code: &str) -> bool {
        old_code.split_whitespace().eq(new_code.split_whitespace())
    }
}

/// Check that (), [] and {} balance outside strings and comments.
fn check_brackets(code: &str) -> Result<(), String> {
    let mut stack: Vec<char> = Vec::new();
    let mut chars = code.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            if c == '\\' {
                chars.next();
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' | '`' => quote = Some(c),
            '/' if chars.peek() == Some(&'/') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            '(' | '[' | '{' => stack.push(c),
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                if stack.pop() != Some(expected) {
                    return Err(format!("unexpected '{}'", c));
                }
            }
            _ => {}
        }
    }

    if quote.is_some() {
        return Err("unterminated string".to_string());
    }
    match stack.last() {
        Some(open) => Err(format!("unclosed '{}'", open)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code_of(extraction: Extraction) -> String {
        match extraction {
            Extraction::Success { code } => code,
            Extraction::Failure { error, .. } => panic!("expected code, got error: {}", error),
        }
    }

    #[test]
    fn test_extracts_js_block() {
        let extractor = FencedCodeExtractor::new();
        assert_eq!(code_of(extractor.parse("```js\ncode();\n```")), "code();");
    }

    #[test]
    fn test_prefers_last_accepted_block() {
        let text = "Here is the idea:\n```text\nnot code\n```\nfirst:\n```javascript\ns(\"bd\")\n```\n\
                    final:\n```\ns(\"bd sd\").fast(2)\n```\nEnjoy!";
        assert_eq!(
            code_of(FencedCodeExtractor::new().parse(text)),
            "s(\"bd sd\").fast(2)"
        );
    }

    #[test]
    fn test_accepts_unterminated_fence() {
        let text = "```js\nnote(\"c e g\").slow(2)\n";
        assert_eq!(
            code_of(FencedCodeExtractor::new().parse(text)),
            "note(\"c e g\").slow(2)"
        );
    }

    #[test]
    fn test_no_code_keeps_raw_text() {
        let text = "I'm sorry, I can't help with that.";
        assert_eq!(
            FencedCodeExtractor::new().parse(text),
            Extraction::Failure {
                error: NO_CODE_MESSAGE.to_string(),
                raw_response: text.to_string(),
            }
        );
    }

    #[test]
    fn test_unbalanced_code_is_rejected() {
        let text = "```js\nstack(s(\"bd\"), note(\"<c [e g]>\")\n```";
        match FencedCodeExtractor::new().parse(text) {
            Extraction::Failure { error, raw_response } => {
                assert!(error.contains("unclosed '('"), "{}", error);
                assert_eq!(raw_response, text);
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_brackets_inside_strings_and_comments_are_ignored() {
        assert!(check_brackets("note(\"<c [e g]>\") // ) trailing\n/* ( */ s('['")
            .is_err());
        assert!(check_brackets("note(\"<c [e g]>\") // ) trailing\n/* ( */ s('[')").is_ok());
    }

    #[test]
    fn test_is_unchanged_ignores_whitespace() {
        let extractor = FencedCodeExtractor::new();
        assert!(extractor.is_unchanged("s(\"bd sd\")\n  .fast(2)", "s(\"bd sd\") .fast(2)\n"));
        assert!(!extractor.is_unchanged("s(\"bd sd\")", "s(\"bd hh\")"));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn reflowed_whitespace_is_unchanged(
                tokens in prop::collection::vec("[a-z()\".]{1,8}", 1..12),
                seps in prop::collection::vec(prop::sample::select(vec![" ", "\n", "  ", "\t", "\n    "]), 12),
            ) {
                let compact = tokens.join(" ");
                let mut reflowed = String::new();
                for (i, token) in tokens.iter().enumerate() {
                    reflowed.push_str(token);
                    reflowed.push_str(seps[i]);
                }
                prop_assert!(FencedCodeExtractor::new().is_unchanged(&compact, &reflowed));
            }

            #[test]
            fn parse_never_loses_raw_text(text in "\\PC{0,200}") {
                if let Extraction::Failure { raw_response, .. } = FencedCodeExtractor::new().parse(&text) {
                    prop_assert_eq!(raw_response, text);
                }
            }
        }
    }
}
