//! Rule-file lexer and parser
//!
//! Turns rule-file text into a forest of [`Rule`] values in three steps:
//!
//! 1. logical lines: `#` comments stripped, blank lines skipped, trailing
//!    `\` spliced with the next logical line;
//! 2. indentation: a stack of leading-space widths computes a depth for each
//!    logical line, rejecting dedents that match no open width;
//! 3. grammar: the first token must be a keyword, and each keyword dictates
//!    the rest of the line; indent-tagged rules are then nested into compound
//!    bodies by a block stack.
//!
//! Any violation is a [`GrammarError`] carrying the file path and the 1-based
//! line number of the offending logical line.

use crate::error::{GrammarError, GrammarErrorKind};
use crate::rule::{AtomicRule, BlockKind, CompoundRule, Keyword, Origin, Rule, Selection, Target, Wildcard};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\w+").unwrap());
static TARGET_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w.*]+$").unwrap());

/// Parse one rule file's text into its top-level rules, compound bodies fully
/// populated
pub fn parse_rules(text: &str, path: &Path) -> Result<Vec<Rule>, GrammarError> {
    let mut lexer = Lexer::new(text, path);
    let mut top_level = Vec::new();
    let mut blocks: Vec<CompoundRule> = Vec::new();

    while let Some(rule) = lexer.next_rule()? {
        let depth = rule.origin().depth;

        if depth == 0 {
            flush_blocks(&mut blocks, &mut top_level);
            match rule {
                Rule::Compound(block) => blocks.push(block),
                atomic => top_level.push(atomic),
            }
            continue;
        }

        if blocks.is_empty() {
            return Err(GrammarError::new(
                path,
                rule.origin().line,
                GrammarErrorKind::OrphanedIndent,
            ));
        }

        // Close blocks deeper than this rule's parent depth.
        let open_depth = blocks.last().map(|b| b.origin.depth).unwrap_or(0);
        let mut pops = (open_depth + 1).saturating_sub(depth);
        while pops > 0 && blocks.len() > 1 {
            let closed = blocks.pop().map(Rule::Compound);
            if let (Some(parent), Some(closed)) = (blocks.last_mut(), closed) {
                parent.body.push(closed);
            }
            pops -= 1;
        }

        match rule {
            Rule::Compound(block) => blocks.push(block),
            atomic => {
                if let Some(parent) = blocks.last_mut() {
                    parent.body.push(atomic);
                }
            }
        }
    }

    flush_blocks(&mut blocks, &mut top_level);
    Ok(top_level)
}

/// Collapse the open block stack bottom-up and append the outermost block
fn flush_blocks(blocks: &mut Vec<CompoundRule>, top_level: &mut Vec<Rule>) {
    while blocks.len() > 1 {
        let closed = blocks.pop().map(Rule::Compound);
        if let (Some(parent), Some(closed)) = (blocks.last_mut(), closed) {
            parent.body.push(closed);
        }
    }
    if let Some(outermost) = blocks.pop() {
        top_level.push(Rule::Compound(outermost));
    }
}

struct Lexer<'a> {
    path: &'a Path,
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
    /// Stack of indentation widths, always starting at 0
    stack: Vec<usize>,
    depth: usize,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str, path: &'a Path) -> Self {
        Self {
            path,
            lines: text.lines().enumerate(),
            stack: vec![0],
            depth: 0,
        }
    }

    fn error(&self, line: usize, kind: GrammarErrorKind) -> GrammarError {
        GrammarError::new(self.path, line, kind)
    }

    /// Next logical line: comments stripped, blanks skipped, continuations
    /// spliced. Returns the line number of the first physical line.
    fn next_logical_line(&mut self) -> Result<Option<(usize, String)>, GrammarError> {
        while let Some((index, raw)) = self.lines.next() {
            let line = index + 1;
            let stripped = raw.split('#').next().unwrap_or("").trim_end();
            if stripped.is_empty() {
                continue;
            }

            let mut text = stripped.to_string();
            while text.ends_with('\\') {
                text.pop();
                match self.next_logical_line()? {
                    Some((_, continuation)) => text.push_str(&continuation),
                    None => {
                        return Err(
                            self.error(line, GrammarErrorKind::UnterminatedContinuation)
                        )
                    }
                }
            }
            return Ok(Some((line, text)));
        }
        Ok(None)
    }

    /// Compute the indentation depth of a logical line and strip its indent
    fn measure_indent<'t>(
        &mut self,
        line: usize,
        text: &'t str,
    ) -> Result<(usize, &'t str), GrammarError> {
        let content = text.trim_start();
        let width = text.chars().take_while(|c| c.is_whitespace()).count();

        if width == 0 {
            self.stack = vec![0];
            self.depth = 0;
            return Ok((0, content));
        }

        let top = *self.stack.last().unwrap_or(&0);
        if width > top {
            self.stack.push(width);
            self.depth += 1;
        } else if width < top {
            let mut matched = false;
            while self.stack.len() > 1 {
                self.stack.pop();
                self.depth -= 1;
                let top = *self.stack.last().unwrap_or(&0);
                if width == top {
                    matched = true;
                    break;
                }
                if width > top {
                    return Err(self.error(line, GrammarErrorKind::InconsistentIndent));
                }
            }
            if !matched {
                return Err(self.error(line, GrammarErrorKind::InconsistentIndent));
            }
        }

        Ok((self.depth, content))
    }

    /// Read and parse the next rule, or `None` at end of input
    fn next_rule(&mut self) -> Result<Option<Rule>, GrammarError> {
        let (line, text) = match self.next_logical_line()? {
            Some(logical) => logical,
            None => return Ok(None),
        };
        let (depth, content) = self.measure_indent(line, &text)?;
        let origin = Origin::new(self.path, line, depth);

        let (word, rest) = read_identifier(content);
        let word = word.ok_or_else(|| self.error(line, GrammarErrorKind::MissingKeyword))?;
        let keyword = Keyword::from_word(word)
            .ok_or_else(|| self.error(line, GrammarErrorKind::UnknownKeyword(word.to_string())))?;
        if rest.is_empty() {
            return Err(self.error(line, GrammarErrorKind::MissingContent));
        }

        let rule = match keyword {
            Keyword::Top => {
                if rest != ":" {
                    return Err(self.error(line, GrammarErrorKind::MissingColon));
                }
                Rule::Compound(CompoundRule {
                    origin,
                    kind: BlockKind::Top,
                    body: Vec::new(),
                })
            }

            Keyword::Module | Keyword::Type => {
                let (name, rest) = read_identifier(rest);
                let name = name.ok_or_else(|| self.error(line, GrammarErrorKind::MissingName))?;

                let (new_name, rest) = if let Some(after_arrow) = rest.strip_prefix("->") {
                    let (new_name, rest) = read_identifier(after_arrow.trim_start());
                    let new_name =
                        new_name.ok_or_else(|| self.error(line, GrammarErrorKind::BadRename))?;
                    (Some(new_name.to_string()), rest)
                } else {
                    (None, rest)
                };

                if rest != ":" {
                    return Err(self.error(line, GrammarErrorKind::MissingColon));
                }

                let name = name.to_string();
                let kind = match keyword {
                    Keyword::Module => BlockKind::Module { name, new_name },
                    _ => BlockKind::Type { name, new_name },
                };
                Rule::Compound(CompoundRule {
                    origin,
                    kind,
                    body: Vec::new(),
                })
            }

            Keyword::Public | Keyword::Private => {
                let mut targets = Vec::new();
                for token in rest.split(',') {
                    let token = token.trim();
                    if let Some(wildcard) = Wildcard::from_token(token) {
                        targets.push(Target::Wildcard(wildcard));
                    } else if TARGET_TOKEN.is_match(token) {
                        targets.push(Target::Name(token.to_string()));
                    } else {
                        return Err(self.error(
                            line,
                            GrammarErrorKind::InvalidIdentifier(token.to_string()),
                        ));
                    }
                }
                let selection = match keyword {
                    Keyword::Public => Selection::Public,
                    _ => Selection::Private,
                };
                Rule::Atomic(AtomicRule {
                    origin,
                    selection,
                    targets,
                })
            }
        };

        Ok(Some(rule))
    }
}

/// Split a leading `\w+` identifier off the front of `content`; the remainder
/// is returned with leading whitespace removed
fn read_identifier(content: &str) -> (Option<&str>, &str) {
    match IDENTIFIER.find(content) {
        Some(found) => (
            Some(found.as_str()),
            content[found.end()..].trim_start(),
        ),
        None => (None, content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GrammarErrorKind;
    use std::path::Path;

    fn parse(text: &str) -> Result<Vec<Rule>, GrammarError> {
        parse_rules(text, Path::new("rules.txt"))
    }

    fn parse_ok(text: &str) -> Vec<Rule> {
        parse(text).expect("rule text should parse")
    }

    fn kind(result: Result<Vec<Rule>, GrammarError>) -> GrammarErrorKind {
        result.expect_err("rule text should not parse").kind
    }

    #[test]
    fn test_top_block_with_children() {
        let rules = parse_ok("top:\n  public m.*\n  private unwanted\n");
        assert_eq!(rules.len(), 1);
        let block = match &rules[0] {
            Rule::Compound(block) => block,
            other => panic!("expected compound rule, got {:?}", other),
        };
        assert_eq!(block.kind, BlockKind::Top);
        assert_eq!(block.body.len(), 2);
        assert_eq!(block.origin.line, 1);
        assert_eq!(block.body[1].origin().line, 3);
    }

    #[test]
    fn test_comments_and_blank_lines_ignored() {
        let rules = parse_ok("# header\n\ntop:   # open\n\n  public *  # keep all\n");
        assert_eq!(rules.len(), 1);
        match &rules[0] {
            Rule::Compound(block) => assert_eq!(block.body.len(), 1),
            other => panic!("expected compound rule, got {:?}", other),
        }
    }

    #[test]
    fn test_continuation_splicing() {
        let rules = parse_ok("public alpha, \\\n  beta, gamma\n");
        match &rules[0] {
            Rule::Atomic(rule) => {
                assert_eq!(rule.targets.len(), 3);
                assert_eq!(rule.targets[1], Target::Name("beta".to_string()));
                assert_eq!(rule.origin.line, 1);
            }
            other => panic!("expected atomic rule, got {:?}", other),
        }
    }

    #[test]
    fn test_continuation_skips_comment_lines() {
        let rules = parse_ok("public alpha, \\\n# interleaved comment\n  beta\n");
        match &rules[0] {
            Rule::Atomic(rule) => assert_eq!(rule.targets.len(), 2),
            other => panic!("expected atomic rule, got {:?}", other),
        }
    }

    #[test]
    fn test_unterminated_continuation() {
        assert_eq!(
            kind(parse("public alpha, \\\n")),
            GrammarErrorKind::UnterminatedContinuation
        );
    }

    #[test]
    fn test_inconsistent_dedent() {
        // widths 2, 4, then 3: 3 matches no open width
        let err = parse("top:\n  public a\n    public b\n   public c\n").unwrap_err();
        assert_eq!(err.kind, GrammarErrorKind::InconsistentIndent);
        assert_eq!(err.line, 4);
    }

    #[test]
    fn test_dedent_to_known_width() {
        let rules = parse_ok(
            "top:\n  module moda:\n    private *\n  public prog.*\n",
        );
        let top = match &rules[0] {
            Rule::Compound(block) => block,
            other => panic!("expected compound rule, got {:?}", other),
        };
        assert_eq!(top.body.len(), 2);
        match &top.body[0] {
            Rule::Compound(module) => {
                assert_eq!(module.body.len(), 1);
                assert!(matches!(module.kind, BlockKind::Module { .. }));
            }
            other => panic!("expected nested module block, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_indent_resets_stack() {
        let rules = parse_ok("top:\n  public a\ntop:\n    public b\n");
        assert_eq!(rules.len(), 2);
        match (&rules[0], &rules[1]) {
            (Rule::Compound(first), Rule::Compound(second)) => {
                assert_eq!(first.body.len(), 1);
                assert_eq!(second.body.len(), 1);
            }
            other => panic!("expected two compound rules, got {:?}", other),
        }
    }

    #[test]
    fn test_orphaned_indent() {
        assert_eq!(
            kind(parse("  public a\n")),
            GrammarErrorKind::OrphanedIndent
        );
        // an atomic rule at depth 0 clears the block stack
        assert_eq!(
            kind(parse("top:\n  public a\npublic b\n  public c\n")),
            GrammarErrorKind::OrphanedIndent
        );
    }

    #[test]
    fn test_unknown_keyword() {
        let err = parse("top:\n  export foo\n").unwrap_err();
        assert_eq!(
            err.kind,
            GrammarErrorKind::UnknownKeyword("export".to_string())
        );
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_keyword_without_content() {
        assert_eq!(kind(parse("public\n")), GrammarErrorKind::MissingContent);
        assert_eq!(kind(parse("top\n")), GrammarErrorKind::MissingContent);
    }

    #[test]
    fn test_top_requires_bare_colon() {
        assert_eq!(kind(parse("top extra:\n")), GrammarErrorKind::MissingColon);
    }

    #[test]
    fn test_module_grammar() {
        assert_eq!(kind(parse("module :\n")), GrammarErrorKind::MissingName);
        assert_eq!(kind(parse("module moda\n")), GrammarErrorKind::MissingColon);
        assert_eq!(
            kind(parse("module moda -> :\n")),
            GrammarErrorKind::BadRename
        );
    }

    #[test]
    fn test_module_rename_parses() {
        let rules = parse_ok("module moda -> modb:\n  public *\n");
        match &rules[0] {
            Rule::Compound(block) => assert_eq!(
                block.kind,
                BlockKind::Module {
                    name: "moda".to_string(),
                    new_name: Some("modb".to_string()),
                }
            ),
            other => panic!("expected compound rule, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_target_token() {
        assert_eq!(
            kind(parse("public good, bad-name\n")),
            GrammarErrorKind::InvalidIdentifier("bad-name".to_string())
        );
        assert_eq!(
            kind(parse("public a,,b\n")),
            GrammarErrorKind::InvalidIdentifier(String::new())
        );
    }

    #[test]
    fn test_wildcards_recognized_in_target_list() {
        let rules = parse_ok("private *, e.*, routine1\n");
        match &rules[0] {
            Rule::Atomic(rule) => assert_eq!(
                rule.targets,
                vec![
                    Target::Wildcard(Wildcard::All),
                    Target::Wildcard(Wildcard::Elements),
                    Target::Name("routine1".to_string()),
                ]
            ),
            other => panic!("expected atomic rule, got {:?}", other),
        }
    }

    #[test]
    fn test_deep_nesting() {
        let rules = parse_ok(
            "top:\n  module moda:\n    type t1:\n      public p.*\n    public e.*\n",
        );
        let top = match &rules[0] {
            Rule::Compound(block) => block,
            other => panic!("expected compound rule, got {:?}", other),
        };
        let module = match &top.body[0] {
            Rule::Compound(block) => block,
            other => panic!("expected module block, got {:?}", other),
        };
        assert_eq!(module.body.len(), 2);
        match &module.body[0] {
            Rule::Compound(ty) => {
                assert!(matches!(ty.kind, BlockKind::Type { .. }));
                assert_eq!(ty.body.len(), 1);
            }
            other => panic!("expected type block, got {:?}", other),
        }
    }

    #[test]
    fn test_render_round_trip() {
        let text = "top:\n  module moda -> modb:\n    private *\n    public routine1, i.*";
        let rules = parse_ok(text);
        let rendered = rules
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(rendered, text);
        // rendering parses back to the same forest
        assert_eq!(parse_ok(&rendered), rules);
    }
}
