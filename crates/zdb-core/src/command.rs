//! # Print Command
//!
//! `p <expr>` with Zig operators.
//!
//! The plugin registers `__zdb_print`, rebinds `p` to it, and adds
//! `zig print` / `zig p`. All of them end up in [`run_print`], which needs a
//! selected frame, rewrites the expression with [`ExpressionRewriter`] and
//! evaluates the result with a 5 second timeout.

use thiserror::Error;
use tracing::debug;

use crate::rewrite::{ExpressionRewriter, VariableScope};

/// Ceiling on one expression evaluation, in microseconds.
pub const EVALUATION_TIMEOUT_US: u32 = 5_000_000;

/// Internal name of the print command.
pub const PRINT_COMMAND: &str = "__zdb_print";
/// Short form rebound to [`PRINT_COMMAND`].
pub const PRINT_ALIAS: &str = "p";
/// Command group for explicit invocation.
pub const COMMAND_GROUP: &str = "zig";
/// Sub-commands of [`COMMAND_GROUP`] that run the print command.
pub const GROUP_SUBCOMMANDS: [&str; 2] = ["print", "p"];

/// Errors reported back to the debugger's command output.
///
/// The messages are stable: they are what the user sees after `error:`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError
{
    #[error("invalid target, create one with 'target create'")]
    NoTarget,

    #[error("invalid process, launch or attach to a process first")]
    NoProcess,

    #[error("no selected thread")]
    NoThread,

    #[error("no selected frame")]
    NoFrame,

    #[error("expression required: p <expr>")]
    EmptyExpression,

    /// The evaluator's own error text.
    #[error("{0}")]
    Evaluation(String),
}

/// A stack frame expressions can be evaluated in.
pub trait EvaluationFrame: VariableScope
{
    /// Evaluate `expression`, returning the value's description or the
    /// evaluator's error message.
    fn evaluate(&self, expression: &str, timeout_us: u32) -> Result<String, String>;
}

/// The debugger state a command runs against.
pub trait ExecutionContext
{
    type Frame: EvaluationFrame;

    fn has_target(&self) -> bool;
    fn has_process(&self) -> bool;
    fn has_thread(&self) -> bool;
    fn selected_frame(&self) -> Option<&Self::Frame>;
}

/// Check target, process, thread and frame in that order.
pub fn require_frame<C>(context: &C) -> Result<&C::Frame, CommandError>
where
    C: ExecutionContext + ?Sized,
{
    if !context.has_target() {
        return Err(CommandError::NoTarget);
    }
    if !context.has_process() {
        return Err(CommandError::NoProcess);
    }
    if !context.has_thread() {
        return Err(CommandError::NoThread);
    }
    context.selected_frame().ok_or(CommandError::NoFrame)
}

/// Run the print command with the words the user typed after it.
///
/// If the rewritten expression fails to evaluate, the original text is tried
/// once more and that attempt's error is the one reported.
pub fn run_print<C, A>(context: &C, args: &[A], rewriter: &ExpressionRewriter) -> Result<String, CommandError>
where
    C: ExecutionContext + ?Sized,
    A: AsRef<str>,
{
    let expression = args.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(" ");
    let expression = expression.trim();
    if expression.is_empty() {
        return Err(CommandError::EmptyExpression);
    }

    let frame = require_frame(context)?;

    let rewritten = rewriter.rewrite(expression, frame);
    if rewritten != expression {
        debug!(original = expression, rewritten = %rewritten, "evaluating rewritten expression");
    }

    match frame.evaluate(&rewritten, EVALUATION_TIMEOUT_US) {
        Ok(description) => Ok(description),
        Err(error) if rewritten == expression => Err(CommandError::Evaluation(error)),
        Err(error) => {
            debug!(%error, "rewritten expression failed, retrying original");
            frame.evaluate(expression, EVALUATION_TIMEOUT_US).map_err(CommandError::Evaluation)
        }
    }
}
