//! Source scanning for textual macro expansion.
//!
//! A small character-level scanner that understands just enough of the
//! surface syntax to be safe: identifiers (Unicode letters, digits, `_`),
//! string literals with `\` escapes, `#` line comments and parentheses.

use std::iter::Peekable;
use std::ops::Range;
use std::str::CharIndices;

use rustc_hash::FxHashMap;

use crate::errors::{unterminated_macro_call, EvalResult};

/// Keywords that introduce a definition header; `name(params)` after them
/// is not a call site.
const DEFINITION_KEYWORDS: &[&str] = &["macro", "function", "ماكرو", "دالة"];

/// A matched `name(args)` call site.
#[derive(Debug, PartialEq)]
pub(super) struct CallSite {
    pub name: String,
    pub args: Vec<String>,
    /// Byte range of the whole call, name through closing parenthesis.
    pub range: Range<usize>,
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_separator(c: char) -> bool {
    c == ',' || c == '،'
}

/// Advance past a string literal whose opening quote was already consumed.
/// Returns the byte offset just past the closing quote (or end of input).
fn skip_string(chars: &mut Peekable<CharIndices<'_>>, quote: char, len: usize) -> usize {
    while let Some((i, c)) = chars.next() {
        if c == '\\' {
            chars.next();
        } else if c == quote {
            return i + c.len_utf8();
        }
    }
    len
}

fn skip_comment(chars: &mut Peekable<CharIndices<'_>>) {
    while let Some(&(_, c)) = chars.peek() {
        if c == '\n' {
            break;
        }
        chars.next();
    }
}

/// Consume the rest of a word whose first character `first` (at `start`)
/// was already consumed; returns its end offset.
fn take_ident(chars: &mut Peekable<CharIndices<'_>>, start: usize, first: char) -> usize {
    let mut end = start + first.len_utf8();
    while let Some(&(i, c)) = chars.peek() {
        if !is_ident_continue(c) {
            break;
        }
        end = i + c.len_utf8();
        chars.next();
    }
    end
}

/// Parse a parenthesized argument list starting at `open` (the `(`).
/// Returns the trimmed arguments and the offset just past `)`.
fn parse_args(text: &str, open: usize) -> Option<(Vec<String>, usize)> {
    let mut chars = text[open + 1..].char_indices().peekable();
    let base = open + 1;
    let mut depth = 0usize;
    let mut args = Vec::new();
    let mut arg_start = base;

    while let Some((i, c)) = chars.next() {
        match c {
            '"' | '\'' => {
                skip_string(&mut chars, c, text.len() - base);
            }
            '(' | '[' => depth += 1,
            ')' | ']' if depth > 0 => depth -= 1,
            ')' => {
                let last = text[arg_start..base + i].trim();
                if !last.is_empty() || !args.is_empty() {
                    args.push(last.to_owned());
                }
                return Some((args, base + i + 1));
            }
            c if is_separator(c) && depth == 0 => {
                args.push(text[arg_start..base + i].trim().to_owned());
                arg_start = base + i + c.len_utf8();
            }
            _ => {}
        }
    }
    None
}

/// Find outermost call sites of names accepted by `is_macro`.
///
/// Calls nested inside another call's argument list are left for the next
/// expansion round.
pub(super) fn find_calls(
    text: &str,
    is_macro: impl Fn(&str) -> bool,
) -> EvalResult<Vec<CallSite>> {
    let mut calls = Vec::new();
    let mut chars = text.char_indices().peekable();
    let mut previous_word: Option<&str> = None;

    while let Some((start, c)) = chars.next() {
        if c == '"' || c == '\'' {
            skip_string(&mut chars, c, text.len());
            previous_word = None;
            continue;
        }
        if c == '#' {
            skip_comment(&mut chars);
            continue;
        }
        if c.is_ascii_digit() {
            // Numeric literal such as `2e5`; never an identifier.
            take_ident(&mut chars, start, c);
            previous_word = None;
            continue;
        }
        if !is_ident_start(c) {
            if !c.is_whitespace() {
                previous_word = None;
            }
            continue;
        }

        let end = take_ident(&mut chars, start, c);
        let name = &text[start..end];
        let after_keyword = previous_word.is_some_and(|w| DEFINITION_KEYWORDS.contains(&w));
        previous_word = Some(name);
        if after_keyword || !is_macro(name) {
            continue;
        }

        let open = end + (text[end..].len() - text[end..].trim_start().len());
        if !text[open..].starts_with('(') {
            continue;
        }
        let Some((args, close)) = parse_args(text, open) else {
            return Err(unterminated_macro_call(name));
        };
        calls.push(CallSite {
            name: name.to_owned(),
            args,
            range: start..close,
        });
        // Resume scanning after the call.
        while chars.peek().is_some_and(|&(i, _)| i < close) {
            chars.next();
        }
        previous_word = None;
    }
    Ok(calls)
}

/// Whether `arg` can be substituted without parentheses.
fn is_atomic(arg: &str) -> bool {
    let Some(first) = arg.chars().next() else {
        return true;
    };
    if is_ident_start(first) {
        return arg.chars().all(is_ident_continue);
    }
    if first.is_ascii_digit() {
        return arg.chars().all(|c| c.is_ascii_digit() || c == '.');
    }
    if first == '"' || first == '\'' {
        let mut inner = arg[first.len_utf8()..].char_indices().peekable();
        let end = skip_string(&mut inner, first, arg.len());
        return end + first.len_utf8() == arg.len();
    }
    if first == '(' {
        return parse_args(arg, 0).is_some_and(|(_, close)| close == arg.len());
    }
    false
}

pub(super) fn wrap_argument(arg: &str) -> String {
    if is_atomic(arg) {
        arg.to_owned()
    } else {
        format!("({arg})")
    }
}

/// Replace whole-identifier occurrences of `bindings` keys in `template`.
///
/// String literals and comments are copied verbatim.
pub(super) fn substitute(template: &str, bindings: &FxHashMap<&str, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();
    let mut copied_to = 0;

    while let Some((start, c)) = chars.next() {
        if c == '"' || c == '\'' {
            skip_string(&mut chars, c, template.len());
            continue;
        }
        if c == '#' {
            skip_comment(&mut chars);
            continue;
        }
        if c.is_ascii_digit() {
            take_ident(&mut chars, start, c);
            continue;
        }
        if !is_ident_start(c) {
            continue;
        }
        let end = take_ident(&mut chars, start, c);
        if let Some(replacement) = bindings.get(&template[start..end]) {
            out.push_str(&template[copied_to..start]);
            out.push_str(replacement);
            copied_to = end;
        }
    }
    out.push_str(&template[copied_to..]);
    out
}
