//! Tests for the Zig operator rewriter

mod support;

use support::{MockFrame, MockValue, array_list, error_union, optional, slice, uint};
use zdb_core::ExpressionRewriter;

fn frame() -> MockFrame
{
    let point = MockValue::new("data").with_child(slice("name", 0x10, 3)).with_child(optional("next", Some(uint("data", 4))));

    MockFrame::new(vec![
        slice("xs", 0x1000, 3),
        array_list("list", 4, 8),
        optional("maybe", Some(uint("data", 42))),
        optional("chain", Some(point)),
        error_union("result", None, uint("value", 7)),
        MockValue::new("state").with_child(array_list("items", 2, 4)),
        uint("n", 5),
        MockValue::new("raw").pointing_to(0x5000, None),
    ])
}

fn rewrite(expression: &str) -> String
{
    ExpressionRewriter::new().rewrite(expression, &frame())
}

#[test]
fn test_dynamic_array_subscript()
{
    assert_eq!(rewrite("xs[0]"), "xs.ptr[0]");
    assert_eq!(rewrite("list[0]"), "list.items.ptr[0]");
}

#[test]
fn test_nested_path_subscript()
{
    assert_eq!(rewrite("state.items[i + 1]"), "state.items.items.ptr[i + 1]");
}

#[test]
fn test_optional_unwrap()
{
    assert_eq!(rewrite("maybe.?"), "maybe.data");
    assert_eq!(rewrite("maybe.? + 1"), "maybe.data + 1");
}

#[test]
fn test_catch()
{
    assert_eq!(rewrite("result catch 0"), "(result.tag == 0 ? result.value : 0)");
    assert_eq!(rewrite("result catch (n * 2)"), "(result.tag == 0 ? result.value : (n * 2))");
}

#[test]
fn test_catch_default_runs_to_the_end_of_the_operand()
{
    assert_eq!(rewrite("result catch n + 1"), "(result.tag == 0 ? result.value : n + 1)");
    assert_eq!(rewrite("f(result catch 0, n)"), "f((result.tag == 0 ? result.value : 0), n)");
    assert_eq!(rewrite("(result catch g(1, 2))"), "((result.tag == 0 ? result.value : g(1, 2)))");
    assert_eq!(rewrite("result catch"), "result catch");
}

#[test]
fn test_chained_forms()
{
    assert_eq!(rewrite("chain.?.next.?"), "chain.data.next.data");
    assert_eq!(rewrite("chain.?.name[1]"), "chain.data.name.ptr[1]");
}

#[test]
fn test_rewriting_twice_is_a_no_op()
{
    for expression in ["xs[0]", "list[2]", "maybe.?", "result catch 1", "chain.?.name[0]", "state.items[0]"] {
        let once = rewrite(expression);
        assert_eq!(rewrite(&once), once, "{expression}");
    }
}

#[test]
fn test_unknown_or_mismatched_variables_are_left_alone()
{
    assert_eq!(rewrite("missing[0]"), "missing[0]");
    assert_eq!(rewrite("n[0]"), "n[0]");
    assert_eq!(rewrite("n.?"), "n.?");
    assert_eq!(rewrite("maybe catch 0"), "maybe catch 0");
}

#[test]
fn test_pointers_are_not_rewritten()
{
    assert_eq!(rewrite("raw[3]"), "raw[3]");
}

#[test]
fn test_plain_c_expressions_pass_through()
{
    for expression in ["1 + 2", "n * 3", "sizeof(int)", "(char)n", "foo(1, 2)"] {
        assert_eq!(rewrite(expression), expression);
    }
}

#[test]
fn test_member_after_call_is_not_an_operand()
{
    assert_eq!(rewrite("get().xs[0]"), "get().xs[0]");
    assert_eq!(rewrite("other.xs[0]"), "other.xs[0]");
}

#[test]
fn test_operators_inside_larger_expressions()
{
    assert_eq!(rewrite("xs[0] + list[1]"), "xs.ptr[0] + list.items.ptr[1]");
    assert_eq!(rewrite("(maybe.?)"), "(maybe.data)");
}

/// `o.?.n.?. ... .n.?.v` with `depth` optionals.
fn optional_chain(depth: usize) -> (MockFrame, String)
{
    let mut inner = MockValue::new("data").with_child(uint("v", 1));
    for _ in 1..depth {
        inner = MockValue::new("data").with_child(optional("n", Some(inner)));
    }

    let expression = format!("o.?{}.v", ".n.?".repeat(depth - 1));
    (MockFrame::new(vec![optional("o", Some(inner))]), expression)
}

#[test]
fn test_deep_optional_chain_rewrites_fully()
{
    let (frame, expression) = optional_chain(12);
    let rewriter = ExpressionRewriter::new();

    let once = rewriter.rewrite(&expression, &frame);
    assert_eq!(once, format!("o.data{}.v", ".n.data".repeat(11)));
    assert!(!once.contains(".?"));
    assert_eq!(rewriter.rewrite(&once, &frame), once);
}
