//! # Expression Rewriter
//!
//! Turns the Zig operators LLDB's C-like evaluator doesn't understand into
//! member accesses it does.
//!
//! | Zig                | Rewritten                           | When `<p>` is   |
//! |--------------------|-------------------------------------|-----------------|
//! | `p[i]`             | `p.ptr[i]`                          | a slice         |
//! | `p[i]`             | `p.items.ptr[i]`                    | a dynamic array |
//! | `p.?`              | `p.data`                            | an optional     |
//! | `p catch d`        | `(p.tag == 0 ? p.value : d)`        | an error union  |
//!
//! `<p>` is a variable path such as `list` or `state.items`. The shape is
//! checked against the live variable in the selected frame; if the variable
//! can't be found or has a different shape, the text is left alone.
//!
//! The default `d` of a `catch` runs to the next `,`, `;` or closing bracket
//! that is not nested inside the default itself, so `r catch n + 1` and
//! `f(r catch 0, n)` both take the whole operand.
//!
//! The three passes run in the order above and then repeat until nothing
//! changes, so chained forms like `a.?.b.?` and `opt.?[0]` rewrite fully and
//! rewriting an already rewritten expression is a no-op. Every round that
//! changes the text consumes at least one operator, so the number of operators
//! in the input bounds the number of rounds.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::trace;

use crate::value::{ValueHandle, is_dynamic_array, is_error_union, is_optional, is_slice};

static SUBSCRIPT: Lazy<Regex> = Lazy::new(|| Regex::new(r"([A-Za-z_][\w.]*)\[([^\[\]]*)\]").expect("valid regex"));
static OPTIONAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"([A-Za-z_][\w.]*)\.\?").expect("valid regex"));
static CATCH: Lazy<Regex> = Lazy::new(|| Regex::new(r"([A-Za-z_][\w.]*)\s+catch\s+").expect("valid regex"));

/// Variables visible at the point an expression is evaluated.
pub trait VariableScope
{
    type Value: ValueHandle;

    /// Look up a dotted variable path (`a`, `a.b.c`).
    fn find_variable(&self, path: &str) -> Option<Self::Value>;
}

/// Rewrites Zig operator syntax using live variable shapes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionRewriter;

impl ExpressionRewriter
{
    pub const fn new() -> Self
    {
        Self
    }

    /// Rewrite `expression` against `scope`.
    ///
    /// Returns the input unchanged when no rule applies.
    pub fn rewrite<S>(&self, expression: &str, scope: &S) -> String
    where
        S: VariableScope + ?Sized,
    {
        let mut current = expression.to_string();

        // One extra round to observe that nothing changes.
        for _ in 0..=operator_sites(expression) {
            let next = self.round(&current, scope);
            if next == current {
                break;
            }
            trace!(from = %current, to = %next, "rewrote expression");
            current = next;
        }

        current
    }

    fn round<S>(&self, expression: &str, scope: &S) -> String
    where
        S: VariableScope + ?Sized,
    {
        let text = subscripts(expression, scope);
        let text = optionals(&text, scope);
        catches(&text, scope).into_owned()
    }
}

/// How many places in `text` could be rewritten, counted generously.
fn operator_sites(text: &str) -> usize
{
    text.matches('[').count() + text.matches(".?").count() + text.matches("catch").count()
}

/// A path match only counts at the start of an operand: not after `.`, an
/// identifier character, or the end of a call, index or generic argument.
fn starts_operand(text: &str, start: usize) -> bool
{
    match text[..start].chars().next_back() {
        None => true,
        Some(c) => !(c.is_alphanumeric() || matches!(c, '_' | '.' | ']' | ')' | '>')),
    }
}

fn lookup<S>(scope: &S, path: &str) -> Option<S::Value>
where
    S: VariableScope + ?Sized,
{
    scope.find_variable(path).filter(|value| !value.is_pointer())
}

fn replace_paths<'t, F>(pattern: &Regex, text: &'t str, mut rewrite: F) -> Cow<'t, str>
where
    F: FnMut(&Captures<'_>) -> Option<String>,
{
    pattern.replace_all(text, |caps: &Captures<'_>| {
        let whole = &caps[0];
        let start = caps.get(0).map_or(0, |m| m.start());
        if !starts_operand(text, start) {
            return whole.to_string();
        }
        rewrite(caps).unwrap_or_else(|| whole.to_string())
    })
}

fn subscripts<'t, S>(text: &'t str, scope: &S) -> Cow<'t, str>
where
    S: VariableScope + ?Sized,
{
    replace_paths(&SUBSCRIPT, text, |caps| {
        let (path, index) = (&caps[1], &caps[2]);
        let value = lookup(scope, path)?;

        if is_dynamic_array(&value) {
            Some(format!("{path}.items.ptr[{index}]"))
        } else if is_slice(&value) {
            Some(format!("{path}.ptr[{index}]"))
        } else {
            None
        }
    })
}

fn optionals<'t, S>(text: &'t str, scope: &S) -> Cow<'t, str>
where
    S: VariableScope + ?Sized,
{
    replace_paths(&OPTIONAL, text, |caps| {
        let path = &caps[1];
        let value = lookup(scope, path)?;
        is_optional(&value).then(|| format!("{path}.data"))
    })
}

fn catches<'t, S>(text: &'t str, scope: &S) -> Cow<'t, str>
where
    S: VariableScope + ?Sized,
{
    let mut out = String::new();
    let mut last = 0;

    for caps in CATCH.captures_iter(text) {
        let (Some(whole), Some(path)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        // Already swallowed as part of an earlier default.
        if whole.start() < last || !starts_operand(text, whole.start()) {
            continue;
        }

        let default = text[whole.end()..operand_end(text, whole.end())].trim_end();
        if default.is_empty() {
            continue;
        }

        let path = path.as_str();
        if !lookup(scope, path).is_some_and(|value| is_error_union(&value)) {
            continue;
        }

        out.push_str(&text[last..whole.start()]);
        let replacement = format!("({path}.tag == 0 ? {path}.value : {default})");
        out.push_str(&replacement);
        last = whole.end() + default.len();
    }

    if last == 0 {
        return Cow::Borrowed(text);
    }
    out.push_str(&text[last..]);
    Cow::Owned(out)
}

/// End of the operand starting at `from`: the first `,` or `;` outside any
/// brackets opened after `from`, or the first bracket closed that was opened
/// before it.
fn operand_end(text: &str, from: usize) -> usize
{
    let mut depth = 0usize;

    for (offset, c) in text[from..].char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' if depth == 0 => return from + offset,
            ')' | ']' => depth -= 1,
            ',' | ';' if depth == 0 => return from + offset,
            _ => {}
        }
    }

    text.len()
}
