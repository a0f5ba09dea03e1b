//! The selected target/process/thread/frame chain and expression evaluation.

use std::ffi::{CString, c_void};

use super::SbApi;
use super::ffi::{Destructor, ObjectGetter, Predicate};
use super::object::SbObject;
use super::value::SbValue;
use crate::command::{EvaluationFrame, ExecutionContext};
use crate::rewrite::VariableScope;
use crate::value::ValueHandle;

/// An `lldb::SBFrame`.
pub struct SbFrame
{
    api: &'static SbApi,
    object: SbObject,
}

impl VariableScope for SbFrame
{
    type Value = SbValue;

    fn find_variable(&self, path: &str) -> Option<SbValue>
    {
        let path = CString::new(path).ok()?;
        // SAFETY: `path` is NUL-terminated and outlives the call.
        let storage = unsafe { (self.api.frame_variable_path)(self.object.as_ptr(), path.as_ptr()) };
        let value = SbValue::from_returned(self.api, storage);
        value.is_valid().then_some(value)
    }
}

impl EvaluationFrame for SbFrame
{
    fn evaluate(&self, expression: &str, timeout_us: u32) -> Result<String, String>
    {
        let api = self.api;
        let expression = CString::new(expression).map_err(|_| String::from("expression contains a NUL byte"))?;

        let options = SbObject::construct(api.options_ctor, api.options_dtor);
        // SAFETY: `options` holds a constructed SBExpressionOptions.
        unsafe { (api.options_set_timeout)(options.as_ptr(), timeout_us) };

        // SAFETY: EvaluateExpression returns an SBValue by value; both
        // arguments outlive the call.
        let storage = unsafe { (api.frame_evaluate)(self.object.as_ptr(), expression.as_ptr(), options.as_ptr()) };
        let value = SbValue::from_returned(api, storage);

        if let Some(message) = value.error_message() {
            return Err(message);
        }
        if !value.is_valid() {
            return Err(String::from("expression produced no value"));
        }

        Ok(value.description().or_else(|| value.value()).unwrap_or_default())
    }
}

/// Whatever is selected in a debugger when a command runs.
///
/// The chain is walked once, up front; a missing link leaves every later
/// link empty.
pub struct SbContext
{
    target: Option<SbObject>,
    process: Option<SbObject>,
    thread: Option<SbObject>,
    frame: Option<SbFrame>,
}

fn link(parent: Option<&SbObject>, get: ObjectGetter, valid: Predicate, dtor: Destructor) -> Option<SbObject>
{
    let parent = parent?;
    // SAFETY: `get` is a member of the parent's class returning an SB object by value.
    let object = SbObject::from_returned(unsafe { get(parent.as_ptr()) }, dtor);
    // SAFETY: `valid` is the IsValid member of the returned class.
    unsafe { valid(object.as_ptr()) }.then_some(object)
}

impl SbContext
{
    /// Walk debugger -> target -> process -> thread -> frame.
    ///
    /// # Safety
    ///
    /// `debugger` must point at a live `SBDebugger`.
    pub unsafe fn from_debugger(api: &'static SbApi, debugger: *mut c_void) -> Self
    {
        // SAFETY: forwarded from the caller.
        let debugger = unsafe { SbObject::borrowed(debugger) };

        let target = link(debugger.as_ref(), api.debugger_selected_target, api.target_is_valid, api.target_dtor);
        let process = link(target.as_ref(), api.target_process, api.process_is_valid, api.process_dtor);
        let thread = link(process.as_ref(), api.process_selected_thread, api.thread_is_valid, api.thread_dtor);
        let frame = link(thread.as_ref(), api.thread_selected_frame, api.frame_is_valid, api.frame_dtor)
            .map(|object| SbFrame { api, object });

        Self { target, process, thread, frame }
    }
}

impl ExecutionContext for SbContext
{
    type Frame = SbFrame;

    fn has_target(&self) -> bool
    {
        self.target.is_some()
    }

    fn has_process(&self) -> bool
    {
        self.process.is_some()
    }

    fn has_thread(&self) -> bool
    {
        self.thread.is_some()
    }

    fn selected_frame(&self) -> Option<&SbFrame>
    {
        self.frame.as_ref()
    }
}
