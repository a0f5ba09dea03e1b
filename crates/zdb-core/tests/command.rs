//! Tests for the print command

mod support;

use support::{MockContext, MockFrame, array_list, uint};
use zdb_core::command::{self, CommandError, EVALUATION_TIMEOUT_US};
use zdb_core::ExpressionRewriter;

fn print(context: &MockContext, args: &[&str]) -> Result<String, CommandError>
{
    command::run_print(context, args, &ExpressionRewriter::new())
}

#[test]
fn test_timeout_is_five_seconds()
{
    assert_eq!(EVALUATION_TIMEOUT_US, 5_000_000);
}

#[test]
fn test_missing_links_are_reported_in_order()
{
    let frame = || Some(MockFrame::default());
    let cases = [
        (MockContext { target: false, process: true, thread: true, frame: frame() }, CommandError::NoTarget),
        (MockContext { target: true, process: false, thread: true, frame: frame() }, CommandError::NoProcess),
        (MockContext { target: true, process: true, thread: false, frame: frame() }, CommandError::NoThread),
        (MockContext { target: true, process: true, thread: true, frame: None }, CommandError::NoFrame),
    ];

    for (context, expected) in cases {
        assert_eq!(print(&context, &["x"]), Err(expected));
    }
}

#[test]
fn test_error_messages_are_stable()
{
    assert_eq!(CommandError::NoTarget.to_string(), "invalid target, create one with 'target create'");
    assert_eq!(CommandError::NoProcess.to_string(), "invalid process, launch or attach to a process first");
    assert_eq!(CommandError::NoThread.to_string(), "no selected thread");
    assert_eq!(CommandError::NoFrame.to_string(), "no selected frame");
    assert_eq!(CommandError::EmptyExpression.to_string(), "expression required: p <expr>");
}

#[test]
fn test_empty_expression_is_checked_first()
{
    assert_eq!(print(&MockContext::default(), &[]), Err(CommandError::EmptyExpression));
    assert_eq!(print(&MockContext::default(), &["  ", ""]), Err(CommandError::EmptyExpression));
}

#[test]
fn test_arguments_are_joined()
{
    let frame = MockFrame::new(vec![uint("a", 1), uint("b", 2)]).answer("a + b", Ok("(int) 3"));
    let context = MockContext::stopped(frame);

    assert_eq!(print(&context, &["a", "+", "b"]).as_deref(), Ok("(int) 3"));
}

#[test]
fn test_rewritten_expression_is_evaluated()
{
    let frame = MockFrame::new(vec![array_list("xs", 3, 4)]).answer("xs.items.ptr[0]", Ok("(u32) 10"));
    let context = MockContext::stopped(frame);

    assert_eq!(print(&context, &["xs[0]"]).as_deref(), Ok("(u32) 10"));
    assert_eq!(context.frame.as_ref().unwrap().evaluated(), ["xs.items.ptr[0]"]);
}

#[test]
fn test_failed_rewrite_retries_original()
{
    let frame = MockFrame::new(vec![array_list("xs", 3, 4)])
        .answer("xs.items.ptr[0]", Err("no member named 'items'"))
        .answer("xs[0]", Err("subscripted value is not an array"));
    let context = MockContext::stopped(frame);

    assert_eq!(print(&context, &["xs[0]"]), Err(CommandError::Evaluation("subscripted value is not an array".into())));
    assert_eq!(context.frame.as_ref().unwrap().evaluated(), ["xs.items.ptr[0]", "xs[0]"]);
}

#[test]
fn test_retry_can_succeed()
{
    let frame = MockFrame::new(vec![array_list("xs", 3, 4)])
        .answer("xs.items.ptr[0]", Err("no member named 'items'"))
        .answer("xs[0]", Ok("(u32) 10"));
    let context = MockContext::stopped(frame);

    assert_eq!(print(&context, &["xs[0]"]).as_deref(), Ok("(u32) 10"));
}

#[test]
fn test_unchanged_expression_is_not_retried()
{
    let frame = MockFrame::new(vec![]).answer("1 +", Err("expected expression"));
    let context = MockContext::stopped(frame);

    assert_eq!(print(&context, &["1", "+"]), Err(CommandError::Evaluation("expected expression".into())));
    assert_eq!(context.frame.as_ref().unwrap().evaluated(), ["1 +"]);
}
