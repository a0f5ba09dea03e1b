//! In-memory stand-ins for the debugger used by the integration tests

#![allow(dead_code, unsafe_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::c_void;

use regex::Regex;
use zdb_core::abi::surgery::{HandleWrapper, SummaryFactory};
use zdb_core::abi::{CategoryApi, MatchType, SharedHandle};
use zdb_core::command::{EvaluationFrame, ExecutionContext};
use zdb_core::error::{Result, ZdbError};
use zdb_core::offsets::EntryPoint;
use zdb_core::rewrite::VariableScope;
use zdb_core::value::ValueHandle;
use zdb_core::SummaryKind;

/// A value tree with optional process memory attached to each node.
#[derive(Debug, Clone, Default)]
pub struct MockValue
{
    name: Option<String>,
    value: Option<String>,
    summary: Option<String>,
    unsigned: u64,
    type_name: Option<String>,
    pointee: Option<Box<MockValue>>,
    pointer: bool,
    children: Vec<MockValue>,
    memory: Vec<(u64, Vec<u8>)>,
}

impl MockValue
{
    pub fn new(name: &str) -> Self
    {
        Self { name: Some(name.to_string()), ..Self::default() }
    }

    pub fn with_value(mut self, text: &str) -> Self
    {
        self.value = Some(text.to_string());
        self
    }

    pub fn with_summary(mut self, text: &str) -> Self
    {
        self.summary = Some(text.to_string());
        self
    }

    pub fn with_unsigned(mut self, value: u64) -> Self
    {
        self.unsigned = value;
        self
    }

    pub fn with_type(mut self, type_name: &str) -> Self
    {
        self.type_name = Some(type_name.to_string());
        self
    }

    pub fn with_child(mut self, child: MockValue) -> Self
    {
        self.children.push(child);
        self
    }

    /// Make this a pointer to `pointee`, at `address`.
    pub fn pointing_to(mut self, address: u64, pointee: Option<MockValue>) -> Self
    {
        self.pointer = true;
        self.unsigned = address;
        self.pointee = pointee.map(Box::new);
        self
    }

    /// A pointer value without a pointee (e.g. `ptr` inside a slice).
    pub fn as_pointer(mut self) -> Self
    {
        self.pointer = true;
        self
    }

    pub fn with_memory(mut self, address: u64, bytes: &[u8]) -> Self
    {
        self.memory.push((address, bytes.to_vec()));
        self
    }

    fn region(&self, address: u64) -> Option<&[u8]>
    {
        self.memory.iter().find_map(|(start, bytes)| {
            let offset = address.checked_sub(*start)? as usize;
            (offset < bytes.len()).then(|| &bytes[offset..])
        })
    }
}

impl ValueHandle for MockValue
{
    fn child_member(&self, name: &str) -> Option<Self>
    {
        self.children.iter().find(|child| child.name.as_deref() == Some(name)).cloned()
    }

    fn child_at_index(&self, index: u32) -> Option<Self>
    {
        self.children.get(index as usize).cloned()
    }

    fn num_children(&self) -> u32
    {
        self.children.len() as u32
    }

    fn name(&self) -> Option<String>
    {
        self.name.clone()
    }

    fn value(&self) -> Option<String>
    {
        self.value.clone()
    }

    fn summary(&self) -> Option<String>
    {
        self.summary.clone()
    }

    fn value_as_unsigned(&self) -> u64
    {
        self.unsigned
    }

    fn type_name(&self) -> Option<String>
    {
        self.type_name.clone()
    }

    fn is_pointer(&self) -> bool
    {
        self.pointer
    }

    fn dereference(&self) -> Option<Self>
    {
        self.pointee.as_deref().cloned()
    }

    fn read_memory(&self, address: u64, len: usize) -> Option<Vec<u8>>
    {
        let region = self.region(address)?;
        (region.len() >= len).then(|| region[..len].to_vec())
    }

    fn read_c_string(&self, address: u64, max_len: usize) -> Option<Vec<u8>>
    {
        let region = self.region(address)?;
        let limit = region.len().min(max_len.saturating_sub(1));
        let end = region[..limit].iter().position(|byte| *byte == 0).unwrap_or(limit);
        (end > 0).then(|| region[..end].to_vec())
    }
}

pub fn uint(name: &str, value: u64) -> MockValue
{
    MockValue::new(name).with_unsigned(value).with_value(&value.to_string())
}

/// `[]T` with `{ ptr, len }`.
pub fn slice(name: &str, ptr: u64, len: u64) -> MockValue
{
    MockValue::new(name)
        .with_child(MockValue::new("ptr").with_unsigned(ptr).as_pointer())
        .with_child(uint("len", len))
}

/// `std.ArrayList` with `{ items: []T, capacity }`.
pub fn array_list(name: &str, len: u64, capacity: u64) -> MockValue
{
    MockValue::new(name).with_child(slice("items", 0x2000, len)).with_child(uint("capacity", capacity))
}

/// `?T` with `{ some, data }`.
pub fn optional(name: &str, data: Option<MockValue>) -> MockValue
{
    match data {
        Some(data) => MockValue::new(name).with_child(uint("some", 1)).with_child(data),
        None => MockValue::new(name).with_child(uint("some", 0)).with_child(MockValue::new("data")),
    }
}

/// `E!T` with `{ tag, value }`; `error` is `Some((code, name))` for an error.
pub fn error_union(name: &str, error: Option<(u64, &str)>, payload: MockValue) -> MockValue
{
    let tag = match error {
        Some((code, error_name)) => MockValue::new("tag").with_unsigned(code).with_value(error_name),
        None => uint("tag", 0),
    };
    MockValue::new(name).with_child(tag).with_child(payload)
}

/// A frame holding `variables` and scripted evaluation results.
#[derive(Default)]
pub struct MockFrame
{
    variables: Vec<MockValue>,
    results: HashMap<String, std::result::Result<String, String>>,
    evaluated: RefCell<Vec<String>>,
}

impl MockFrame
{
    pub fn new(variables: Vec<MockValue>) -> Self
    {
        Self { variables, ..Self::default() }
    }

    pub fn answer(mut self, expression: &str, result: std::result::Result<&str, &str>) -> Self
    {
        self.results.insert(expression.to_string(), result.map(str::to_string).map_err(str::to_string));
        self
    }

    /// Every expression passed to `evaluate`, in order.
    pub fn evaluated(&self) -> Vec<String>
    {
        self.evaluated.borrow().clone()
    }
}

impl VariableScope for MockFrame
{
    type Value = MockValue;

    fn find_variable(&self, path: &str) -> Option<MockValue>
    {
        let mut parts = path.split('.');
        let root = parts.next()?;
        let mut current = self.variables.iter().find(|value| value.name.as_deref() == Some(root))?.clone();
        for part in parts {
            current = current.child_member(part)?;
        }
        Some(current)
    }
}

impl EvaluationFrame for MockFrame
{
    fn evaluate(&self, expression: &str, _timeout_us: u32) -> std::result::Result<String, String>
    {
        self.evaluated.borrow_mut().push(expression.to_string());
        self.results
            .get(expression)
            .cloned()
            .unwrap_or_else(|| Err(format!("use of undeclared identifier '{expression}'")))
    }
}

/// Which links of the target/process/thread/frame chain exist.
#[derive(Default)]
pub struct MockContext
{
    pub target: bool,
    pub process: bool,
    pub thread: bool,
    pub frame: Option<MockFrame>,
}

impl MockContext
{
    /// A fully stopped process with `frame` selected.
    pub fn stopped(frame: MockFrame) -> Self
    {
        Self { target: true, process: true, thread: true, frame: Some(frame) }
    }
}

impl ExecutionContext for MockContext
{
    type Frame = MockFrame;

    fn has_target(&self) -> bool
    {
        self.target
    }

    fn has_process(&self) -> bool
    {
        self.process
    }

    fn has_thread(&self) -> bool
    {
        self.thread
    }

    fn selected_frame(&self) -> Option<&MockFrame>
    {
        self.frame.as_ref()
    }
}

/// One `AddTypeSummary` call as the category saw it.
#[derive(Debug, Clone)]
pub struct AddedSummary
{
    pub pattern: String,
    pub match_type: MatchType,
    pub handle: SharedHandle,
}

/// A category backend that records calls and matches like LLDB: the most
/// recently added matching regex wins.
#[derive(Default)]
pub struct RecordingCategory
{
    pub unsupported: Vec<EntryPoint>,
    pub empty_category: bool,
    pub added: RefCell<Vec<AddedSummary>>,
    pub enabled_at: RefCell<Option<u32>>,
    pub lookups: RefCell<Vec<(String, bool)>>,
}

impl RecordingCategory
{
    pub fn without(entries: &[EntryPoint]) -> Self
    {
        Self { unsupported: entries.to_vec(), ..Self::default() }
    }

    /// The summary LLDB would pick for `type_name`.
    pub fn summary_for(&self, type_name: &str) -> Option<SummaryKind>
    {
        self.added
            .borrow()
            .iter()
            .rev()
            .find(|added| Regex::new(&added.pattern).is_ok_and(|pattern| pattern.is_match(type_name)))
            .and_then(|added| MockFactory::kind_of(&added.handle))
    }
}

impl CategoryApi for RecordingCategory
{
    fn get_category(&self, name: &str, create: bool) -> Result<SharedHandle>
    {
        self.lookups.borrow_mut().push((name.to_string(), create));
        if self.empty_category {
            return Ok(SharedHandle::empty());
        }
        Ok(SharedHandle { payload: 0xca7 as *mut c_void, control: 0xc0 as *mut c_void })
    }

    fn enable_category(&self, category: &SharedHandle, position: u32) -> Result<()>
    {
        if !self.supports(EntryPoint::EnableCategory) {
            return Err(ZdbError::EntryPointMissing(EntryPoint::EnableCategory));
        }
        assert!(!category.is_empty());
        *self.enabled_at.borrow_mut() = Some(position);
        Ok(())
    }

    fn add_type_summary(
        &self,
        category: &SharedHandle,
        pattern: &str,
        match_type: MatchType,
        summary: &mut SharedHandle,
    ) -> Result<()>
    {
        if !self.supports(EntryPoint::AddTypeSummary) {
            return Err(ZdbError::EntryPointMissing(EntryPoint::AddTypeSummary));
        }
        assert!(!category.is_empty());
        self.added.borrow_mut().push(AddedSummary { pattern: pattern.to_string(), match_type, handle: *summary });
        Ok(())
    }

    fn supports(&self, entry: EntryPoint) -> bool
    {
        !self.unsupported.contains(&entry)
    }
}

/// Wrapper whose handle payload encodes the summary kind.
pub struct MockSummary
{
    handle: SharedHandle,
}

unsafe impl HandleWrapper for MockSummary
{
    fn is_valid(&self) -> bool
    {
        !self.handle.is_empty()
    }

    fn shared_handle(&mut self) -> &mut SharedHandle
    {
        &mut self.handle
    }
}

/// Builds [`MockSummary`] wrappers; kinds in `failing` come back invalid.
#[derive(Default)]
pub struct MockFactory
{
    pub failing: Vec<SummaryKind>,
    pub created: RefCell<Vec<(SummaryKind, String)>>,
}

impl MockFactory
{
    pub fn failing(kinds: &[SummaryKind]) -> Self
    {
        Self { failing: kinds.to_vec(), ..Self::default() }
    }

    pub fn kind_of(handle: &SharedHandle) -> Option<SummaryKind>
    {
        let index = (handle.payload as usize).checked_sub(1)?;
        SummaryKind::ALL.get(index).copied()
    }
}

impl SummaryFactory for MockFactory
{
    type Wrapper = MockSummary;

    fn create(&self, kind: SummaryKind, description: &str) -> Option<MockSummary>
    {
        self.created.borrow_mut().push((kind, description.to_string()));
        if self.failing.contains(&kind) {
            return Some(MockSummary { handle: SharedHandle::empty() });
        }

        let index = SummaryKind::ALL.iter().position(|candidate| *candidate == kind)?;
        Some(MockSummary { handle: SharedHandle { payload: (index + 1) as *mut c_void, control: 0x1 as *mut c_void } })
    }
}
