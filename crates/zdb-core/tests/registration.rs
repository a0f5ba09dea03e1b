//! Tests for formatter registration against a recording category

mod support;

use support::{MockFactory, RecordingCategory};
use zdb_core::abi::MatchType;
use zdb_core::abi::surgery::SummaryRegistry;
use zdb_core::error::ZdbError;
use zdb_core::offsets::EntryPoint;
use zdb_core::registration::{self, CATEGORY_NAME, PATTERNS};
use zdb_core::SummaryKind;

fn install(category: &RecordingCategory, factory: &MockFactory) -> Result<registration::Registration, ZdbError>
{
    let mut registry = SummaryRegistry::new();
    registration::install_formatters(category, factory, &mut registry)
}

#[test]
fn test_installs_every_pattern_in_order()
{
    let category = RecordingCategory::default();
    let outcome = install(&category, &MockFactory::default()).unwrap();

    assert_eq!(outcome.installed, PATTERNS.len());
    assert!(outcome.skipped.is_empty());
    assert!(outcome.enabled);
    assert_eq!(*category.enabled_at.borrow(), Some(0));
    assert_eq!(category.lookups.borrow().as_slice(), [(CATEGORY_NAME.to_string(), true)]);

    let added = category.added.borrow();
    let patterns: Vec<&str> = added.iter().map(|entry| entry.pattern.as_str()).collect();
    let expected: Vec<&str> = PATTERNS.iter().map(|entry| entry.pattern).collect();
    assert_eq!(patterns, expected);
    assert!(added.iter().all(|entry| entry.match_type == MatchType::Regex));
}

#[test]
fn test_summaries_carry_their_descriptions()
{
    let factory = MockFactory::default();
    install(&RecordingCategory::default(), &factory).unwrap();

    let created = factory.created.borrow();
    assert_eq!(created.len(), PATTERNS.len());
    assert_eq!(created[0], (SummaryKind::Struct, String::from("Zig struct/enum")));
    assert_eq!(created.last().map(|(_, description)| description.as_str()), Some("Zig string"));
}

#[test]
fn test_last_added_pattern_wins()
{
    let category = RecordingCategory::default();
    install(&category, &MockFactory::default()).unwrap();

    let cases = [
        ("[]u8", SummaryKind::String),
        ("[]const u8", SummaryKind::String),
        ("[]i32", SummaryKind::Slice),
        ("[4]i32", SummaryKind::Array),
        ("?i32", SummaryKind::Optional),
        ("error{OutOfMemory}!i32", SummaryKind::ErrorUnion),
        ("union(enum)", SummaryKind::TaggedUnion),
        ("*i32", SummaryKind::Pointer),
        ("[*]u8", SummaryKind::Pointer),
        ("[*:0]const u8", SummaryKind::CString),
        ("[*:0]u8", SummaryKind::CString),
        ("array_list.ArrayListAligned(u8,null)", SummaryKind::ArrayList),
        ("hash_map.HashMap(u32,u32,hash_map.AutoContext(u32),80)", SummaryKind::HashMap),
        ("main.Point", SummaryKind::Struct),
        ("Color", SummaryKind::Struct),
    ];

    for (type_name, expected) in cases {
        assert_eq!(category.summary_for(type_name), Some(expected), "{type_name}");
    }
    assert_eq!(category.summary_for("int"), None);
}

#[test]
fn test_failed_summary_is_skipped()
{
    let category = RecordingCategory::default();
    let outcome = install(&category, &MockFactory::failing(&[SummaryKind::Pointer])).unwrap();

    assert_eq!(outcome.skipped, [r"^\*.*$", r"^\[\*\].*$", r"^\[\*:.*\].*$"]);
    assert_eq!(outcome.installed, PATTERNS.len() - 3);
    assert_eq!(category.summary_for("*i32"), None);
    assert_eq!(category.summary_for("[]u8"), Some(SummaryKind::String));
}

#[test]
fn test_missing_enable_leaves_category_disabled()
{
    let category = RecordingCategory::without(&[EntryPoint::EnableCategory]);
    let outcome = install(&category, &MockFactory::default()).unwrap();

    assert!(!outcome.enabled);
    assert_eq!(outcome.installed, PATTERNS.len());
    assert_eq!(*category.enabled_at.borrow(), None);
}

#[test]
fn test_missing_required_entry_point_aborts()
{
    for entry in [EntryPoint::GetCategory, EntryPoint::AddTypeSummary] {
        let category = RecordingCategory::without(&[entry]);
        let error = install(&category, &MockFactory::default()).unwrap_err();

        assert!(matches!(error, ZdbError::EntryPointMissing(missing) if missing == entry), "{error}");
        assert!(category.added.borrow().is_empty());
    }
}

#[test]
fn test_empty_category_aborts()
{
    let category = RecordingCategory { empty_category: true, ..RecordingCategory::default() };
    let error = install(&category, &MockFactory::default()).unwrap_err();

    assert!(matches!(error, ZdbError::CategoryUnavailable(ref name) if name == "zig"));
    assert_eq!(error.to_string(), "failed to create 'zig' category");
    assert!(category.added.borrow().is_empty());
}

#[test]
fn test_registry_keeps_installed_wrappers()
{
    let mut registry = SummaryRegistry::new();
    registration::install_formatters(&RecordingCategory::default(), &MockFactory::failing(&[SummaryKind::HashMap]), &mut registry)
        .unwrap();

    assert_eq!(registry.len(), PATTERNS.len() - 1);
}
