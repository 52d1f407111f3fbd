//! Word expansion: variables, command substitution, tilde.
//!
//! Expansion is late: it runs against a [`WordContext`] the executor
//! supplies, right before a command is launched. Quoting decided at lex
//! time controls what applies where — single-quoted segments pass through
//! untouched, double-quoted segments expand `$`-forms only, unquoted
//! segments additionally get word-initial tilde treatment.

use crate::ParseResult;
use crate::error::ParseError;
use crate::lexer::{Segment, Word};

/// Execution-side services the expander needs.
pub trait WordContext {
    /// Value of a variable (shell-local, environment, or the specials
    /// `?`, `!`, `$`). `None` expands to the empty string.
    fn var(&mut self, name: &str) -> Option<String>;

    /// Run `script`, capture its stdout. Trailing newlines are stripped by
    /// the expander, not here.
    fn command_output(&mut self, script: &str) -> ParseResult<String>;

    /// Home directory of `user`, or of the current user for `None`.
    fn home(&mut self, user: Option<&str>) -> Option<String>;
}

/// Expand one word to the final argument string.
pub fn expand_word(word: &Word, ctx: &mut dyn WordContext) -> ParseResult<String> {
    let mut out = String::new();
    for (idx, segment) in word.segments.iter().enumerate() {
        match segment {
            Segment::SingleQuoted(text) => out.push_str(text),
            Segment::DoubleQuoted(text) => expand_dollar(text, ctx, &mut out)?,
            Segment::Unquoted(text) => {
                let rest = if idx == 0 {
                    expand_tilde(text, ctx, &mut out)
                } else {
                    text.as_str()
                };
                expand_dollar(rest, ctx, &mut out)?;
            }
        }
    }
    Ok(out)
}

/// Handle a word-initial `~` or `~user`. Returns the remainder of the text
/// still to be expanded; on no match the full text is returned untouched.
fn expand_tilde<'a>(text: &'a str, ctx: &mut dyn WordContext, out: &mut String) -> &'a str {
    let Some(rest) = text.strip_prefix('~') else {
        return text;
    };
    let (name, remainder) = match rest.find('/') {
        Some(slash) => (&rest[..slash], &rest[slash..]),
        None => (rest, ""),
    };
    if name.chars().any(|c| !c.is_alphanumeric() && c != '_' && c != '-') {
        return text;
    }
    let home = if name.is_empty() {
        ctx.home(None)
    } else {
        ctx.home(Some(name))
    };
    match home {
        Some(dir) => {
            out.push_str(&dir);
            remainder
        }
        None => text,
    }
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Expand `$NAME`, `${NAME}`, `$(cmd)`, backticks and the specials inside
/// `text`, appending to `out`. Text with no `$` or backtick passes through.
fn expand_dollar(text: &str, ctx: &mut dyn WordContext, out: &mut String) -> ParseResult<()> {
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '`' => {
                let mut script = String::new();
                loop {
                    match chars.next() {
                        Some('\\') => {
                            if let Some(&next) = chars.peek()
                                && matches!(next, '$' | '`' | '\\')
                            {
                                chars.next();
                                script.push(next);
                            } else {
                                script.push('\\');
                            }
                        }
                        Some('`') => break,
                        Some(c) => script.push(c),
                        None => return Err(ParseError::UnterminatedSubstitution),
                    }
                }
                push_substitution(&script, ctx, out)?;
            }
            '$' => match chars.peek() {
                Some('(') => {
                    chars.next();
                    let script = take_balanced(&mut chars)?;
                    push_substitution(&script, ctx, out)?;
                }
                Some('{') => {
                    chars.next();
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(c) => name.push(c),
                            None => return Err(ParseError::BadSubstitution),
                        }
                    }
                    if name.is_empty()
                        || !(name.chars().all(is_name_char) || is_special(&name))
                    {
                        return Err(ParseError::BadSubstitution);
                    }
                    push_var(&name, ctx, out);
                }
                Some(&c) if matches!(c, '?' | '!' | '$') => {
                    chars.next();
                    push_var(&c.to_string(), ctx, out);
                }
                Some(&c) if is_name_start(c) => {
                    let mut name = String::new();
                    while let Some(&c) = chars.peek() {
                        if !is_name_char(c) {
                            break;
                        }
                        name.push(c);
                        chars.next();
                    }
                    push_var(&name, ctx, out);
                }
                Some(&c) if c.is_ascii_digit() => {
                    chars.next();
                    push_var(&c.to_string(), ctx, out);
                }
                _ => out.push('$'),
            },
            _ => out.push(c),
        }
    }
    Ok(())
}

fn is_special(name: &str) -> bool {
    matches!(name, "?" | "!" | "$")
}

fn push_var(name: &str, ctx: &mut dyn WordContext, out: &mut String) {
    if let Some(value) = ctx.var(name) {
        out.push_str(&value);
    }
}

fn push_substitution(script: &str, ctx: &mut dyn WordContext, out: &mut String) -> ParseResult<()> {
    let output = ctx.command_output(script)?;
    out.push_str(output.trim_end_matches('\n'));
    Ok(())
}

/// Collect the body of a `$(...)`, the opening paren already consumed.
/// Mirrors the lexer's scan: nesting and quoted regions are honored.
fn take_balanced(chars: &mut std::iter::Peekable<std::str::Chars>) -> ParseResult<String> {
    let mut body = String::new();
    let mut depth = 1usize;
    loop {
        match chars.next() {
            Some('(') => {
                depth += 1;
                body.push('(');
            }
            Some(')') => {
                depth -= 1;
                if depth == 0 {
                    return Ok(body);
                }
                body.push(')');
            }
            Some(q @ ('\'' | '"')) => {
                body.push(q);
                loop {
                    match chars.next() {
                        Some('\\') if q == '"' => {
                            body.push('\\');
                            if let Some(c) = chars.next() {
                                body.push(c);
                            }
                        }
                        Some(c) => {
                            body.push(c);
                            if c == q {
                                break;
                            }
                        }
                        None => return Err(ParseError::UnterminatedSubstitution),
                    }
                }
            }
            Some(c) => body.push(c),
            None => return Err(ParseError::UnterminatedSubstitution),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{Token, lex};
    use std::collections::HashMap;

    struct MockContext {
        vars: HashMap<String, String>,
    }

    impl MockContext {
        fn new(pairs: &[(&str, &str)]) -> Self {
            MockContext {
                vars: pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            }
        }
    }

    impl WordContext for MockContext {
        fn var(&mut self, name: &str) -> Option<String> {
            self.vars.get(name).cloned()
        }

        fn command_output(&mut self, script: &str) -> ParseResult<String> {
            // Canned substitution: `echo X` yields "X\n", like the real thing.
            match script.strip_prefix("echo ") {
                Some(rest) => Ok(format!("{rest}\n")),
                None => Err(ParseError::Substitution(script.to_string())),
            }
        }

        fn home(&mut self, user: Option<&str>) -> Option<String> {
            match user {
                None => Some("/home/me".into()),
                Some("other") => Some("/home/other".into()),
                Some(_) => None,
            }
        }
    }

    fn expand_first(input: &str, ctx: &mut MockContext) -> ParseResult<String> {
        let tokens = lex(input).unwrap();
        let Token::Word(word) = &tokens[0] else {
            panic!("expected word");
        };
        expand_word(word, ctx)
    }

    #[test]
    fn plain_words_pass_through() {
        let mut ctx = MockContext::new(&[]);
        assert_eq!(expand_first("hello", &mut ctx).unwrap(), "hello");
    }

    #[test]
    fn variable_forms() {
        let mut ctx = MockContext::new(&[("NAME", "world")]);
        assert_eq!(expand_first("$NAME", &mut ctx).unwrap(), "world");
        assert_eq!(expand_first("${NAME}", &mut ctx).unwrap(), "world");
        assert_eq!(expand_first("x${NAME}y", &mut ctx).unwrap(), "xworldy");
    }

    #[test]
    fn unset_variable_is_empty() {
        let mut ctx = MockContext::new(&[]);
        assert_eq!(expand_first("a$MISSING-b", &mut ctx).unwrap(), "a-b");
    }

    #[test]
    fn specials_route_through_context() {
        let mut ctx = MockContext::new(&[("?", "42"), ("!", "999"), ("$", "1234")]);
        assert_eq!(expand_first("$?", &mut ctx).unwrap(), "42");
        assert_eq!(expand_first("$!", &mut ctx).unwrap(), "999");
        assert_eq!(expand_first("$$", &mut ctx).unwrap(), "1234");
    }

    #[test]
    fn single_quotes_suppress_expansion() {
        let mut ctx = MockContext::new(&[("NAME", "world")]);
        assert_eq!(expand_first("'$NAME'", &mut ctx).unwrap(), "$NAME");
    }

    #[test]
    fn double_quotes_expand() {
        let mut ctx = MockContext::new(&[("NAME", "world")]);
        assert_eq!(
            expand_first("\"hi $NAME!\"", &mut ctx).unwrap(),
            "hi world!"
        );
    }

    #[test]
    fn command_substitution_trims_trailing_newlines() {
        let mut ctx = MockContext::new(&[]);
        assert_eq!(expand_first("$(echo hi)", &mut ctx).unwrap(), "hi");
        assert_eq!(expand_first("`echo hi`", &mut ctx).unwrap(), "hi");
        assert_eq!(
            expand_first("\"a $(echo b) c\"", &mut ctx).unwrap(),
            "a b c"
        );
    }

    #[test]
    fn failed_substitution_surfaces() {
        let mut ctx = MockContext::new(&[]);
        assert_eq!(
            expand_first("$(boom)", &mut ctx),
            Err(ParseError::Substitution("boom".into()))
        );
    }

    #[test]
    fn tilde_expands_word_initial_only() {
        let mut ctx = MockContext::new(&[]);
        assert_eq!(expand_first("~", &mut ctx).unwrap(), "/home/me");
        assert_eq!(expand_first("~/src", &mut ctx).unwrap(), "/home/me/src");
        assert_eq!(
            expand_first("~other/x", &mut ctx).unwrap(),
            "/home/other/x"
        );
        // Unknown user and quoted tildes stay literal.
        assert_eq!(expand_first("~nobody", &mut ctx).unwrap(), "~nobody");
        assert_eq!(expand_first("'~'", &mut ctx).unwrap(), "~");
        assert_eq!(expand_first("a~b", &mut ctx).unwrap(), "a~b");
    }

    #[test]
    fn lone_dollar_is_literal() {
        let mut ctx = MockContext::new(&[]);
        assert_eq!(expand_first("$", &mut ctx).unwrap(), "$");
        assert_eq!(expand_first("a$-b", &mut ctx).unwrap(), "a$-b");
    }

    #[test]
    fn empty_braces_are_rejected() {
        let mut ctx = MockContext::new(&[]);
        assert_eq!(
            expand_first("${}", &mut ctx),
            Err(ParseError::BadSubstitution)
        );
    }
}
