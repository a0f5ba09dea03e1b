//! # Command Registration
//!
//! LLDB runs plugin commands through `lldb::SBCommandPluginInterface`, a
//! C++ class with a virtual destructor and one virtual `DoExecute`. The print
//! command is a static object whose vtable is laid out by hand in the Itanium
//! format:
//!
//! ```text
//! offset-to-top | type_info | ~D1 | ~D0 | DoExecute
//!                             ^ vptr
//! ```
//!
//! LLDB keeps the object in a `shared_ptr` and eventually deletes it through
//! the deleting destructor, which is a no-op here because the object is static.

use std::ffi::{CStr, CString, c_char, c_void};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;

use tracing::{debug, warn};

use super::SbApi;
use super::ffi::{RETURN_STATUS_FAILED, RETURN_STATUS_INVALID, RETURN_STATUS_SUCCESS_FINISH_RESULT};
use super::object::host_text;
use super::frame::SbContext;
use super::object::SbObject;
use crate::command::{self, CommandError, COMMAND_GROUP, GROUP_SUBCOMMANDS, PRINT_ALIAS, PRINT_COMMAND};
use crate::error::{Result, ZdbError};
use crate::rewrite::ExpressionRewriter;

const PRINT_HELP: &str = "Evaluate an expression with Zig operators (v[i], v.?, lhs catch rhs).";
const GROUP_HELP: &str = "Zig debugging commands.";

static REWRITER: ExpressionRewriter = ExpressionRewriter::new();

type Dtor = unsafe extern "C" fn(this: *mut PluginObject);

/// `bool DoExecute(SBDebugger, char **command, SBCommandReturnObject &result)`
type DoExecuteFn =
    unsafe extern "C" fn(this: *mut PluginObject, debugger: *mut c_void, command: *mut *mut c_char, result: *mut c_void) -> bool;

#[repr(C)]
struct PluginVtable
{
    offset_to_top: isize,
    type_info: *const c_void,
    complete_dtor: Dtor,
    deleting_dtor: Dtor,
    do_execute: DoExecuteFn,
}

// SAFETY: immutable after construction; the raw pointer is always null.
unsafe impl Sync for PluginVtable {}

#[repr(C)]
struct PluginObject
{
    vptr: *const Dtor,
}

// SAFETY: the object has no state besides its vtable pointer.
unsafe impl Sync for PluginObject {}

static PRINT_VTABLE: PluginVtable = PluginVtable {
    offset_to_top: 0,
    type_info: ptr::null(),
    complete_dtor: destroy,
    deleting_dtor: destroy,
    do_execute: execute_print,
};

static PRINT_PLUGIN: PluginObject = PluginObject { vptr: &PRINT_VTABLE.complete_dtor };

unsafe extern "C" fn destroy(_this: *mut PluginObject) {}

unsafe extern "C" fn execute_print(
    _this: *mut PluginObject,
    debugger: *mut c_void,
    argv: *mut *mut c_char,
    result: *mut c_void,
) -> bool
{
    let run = AssertUnwindSafe(|| {
        let Some(api) = super::api() else {
            return false;
        };
        // SAFETY: LLDB passes a NULL-terminated argument vector.
        let args = unsafe { command_words(argv) };
        // SAFETY: LLDB passes the debugger the command runs in.
        let context = unsafe { SbContext::from_debugger(api, debugger) };

        let outcome = command::run_print(&context, &args, &REWRITER);
        // SAFETY: LLDB passes a live SBCommandReturnObject.
        unsafe { report(api, result, &outcome) };
        outcome.is_ok()
    });

    panic::catch_unwind(run).unwrap_or(false)
}

/// Collect the words of a `char **` argument vector.
///
/// # Safety
///
/// `argv` must be null or a NULL-terminated array of C strings.
unsafe fn command_words(argv: *mut *mut c_char) -> Vec<String>
{
    let mut words = Vec::new();
    if argv.is_null() {
        return words;
    }

    let mut cursor = argv;
    // SAFETY: the array ends at the first null entry.
    while let Some(word) = unsafe { (*cursor).as_ref() } {
        // SAFETY: non-null entries are NUL-terminated.
        words.push(unsafe { CStr::from_ptr(word) }.to_string_lossy().into_owned());
        // SAFETY: still inside the array, which has a terminating entry.
        cursor = unsafe { cursor.add(1) };
    }
    words
}

/// Write a command outcome into an `SBCommandReturnObject`.
///
/// # Safety
///
/// `result` must be null or point at a live `SBCommandReturnObject`.
unsafe fn report(api: &SbApi, result: *mut c_void, outcome: &std::result::Result<String, CommandError>)
{
    if result.is_null() {
        return;
    }

    let (text, status) = match outcome {
        Ok(description) => (description.clone(), RETURN_STATUS_SUCCESS_FINISH_RESULT),
        Err(error) => (error.to_string(), RETURN_STATUS_FAILED),
    };
    let text = CString::new(text.replace('\0', "\\x00")).unwrap_or_default();

    // SAFETY: `result` is live per the contract; `text` outlives the calls.
    unsafe {
        match outcome {
            Ok(_) => (api.return_append_message)(result, text.as_ptr()),
            Err(_) => (api.return_set_error)(result, text.as_ptr()),
        }
        (api.return_set_status)(result, status);
    }
}

fn c_text(text: &str) -> Result<CString>
{
    CString::new(text).map_err(|_| ZdbError::CommandRegistration { command: text.to_string() })
}

/// Map the status of an interpreter command to a result, using the host's
/// error text when it gave one.
fn command_status(line: &str, status: i32, error: Option<String>) -> Result<()>
{
    if status != RETURN_STATUS_FAILED && status != RETURN_STATUS_INVALID {
        return Ok(());
    }

    let message = error.map_or_else(|| "command failed".to_string(), |text| text.trim_end().to_string());
    Err(ZdbError::HostCommandFailed { line: line.to_string(), message })
}

/// Run one command line through the interpreter.
fn handle_command(api: &SbApi, interpreter: &SbObject, line: &str) -> Result<()>
{
    let line_text = c_text(line)?;
    let result = SbObject::construct(api.return_ctor, api.return_dtor);
    // SAFETY: `interpreter` and `result` are live; `line_text` outlives the call.
    let status = unsafe { (api.interpreter_handle_command)(interpreter.as_ptr(), line_text.as_ptr(), result.as_ptr(), false) };
    // SAFETY: GetError returns a string owned by `result`, copied before it drops.
    let error = unsafe { host_text((api.return_get_error)(result.as_ptr())) };
    command_status(line, status, error)
}

/// Register the print command, rebind `p` to it and add the `zig` group.
///
/// # Safety
///
/// `debugger` must point at a live `SBDebugger`.
pub unsafe fn install_commands(api: &SbApi, debugger: *mut c_void) -> Result<()>
{
    // SAFETY: forwarded from the caller.
    let Some(debugger) = (unsafe { SbObject::borrowed(debugger) }) else {
        return Err(ZdbError::CommandRegistration { command: PRINT_COMMAND.to_string() });
    };
    // SAFETY: GetCommandInterpreter returns an SBCommandInterpreter by value.
    let interpreter =
        SbObject::from_returned(unsafe { (api.debugger_interpreter)(debugger.as_ptr()) }, api.interpreter_dtor);

    let plugin = ptr::addr_of!(PRINT_PLUGIN).cast_mut().cast::<c_void>();
    let help = c_text(PRINT_HELP)?;

    let name = c_text(PRINT_COMMAND)?;
    // SAFETY: `plugin` is a static SBCommandPluginInterface; the strings are copied.
    let command = SbObject::from_returned(
        unsafe { (api.interpreter_add_command)(interpreter.as_ptr(), name.as_ptr(), plugin, help.as_ptr()) },
        api.command_dtor,
    );
    // SAFETY: `command` holds an SBCommand.
    if !unsafe { (api.command_is_valid)(command.as_ptr()) } {
        return Err(ZdbError::CommandRegistration { command: PRINT_COMMAND.to_string() });
    }

    // `p` is not an alias on every host, so there may be nothing to remove.
    if let Err(error) = handle_command(api, &interpreter, &format!("command unalias {PRINT_ALIAS}")) {
        debug!(%error, alias = PRINT_ALIAS, "no alias to remove");
    }
    handle_command(api, &interpreter, &format!("command alias {PRINT_ALIAS} {PRINT_COMMAND}"))?;

    let group_name = c_text(COMMAND_GROUP)?;
    let group_help = c_text(GROUP_HELP)?;
    // SAFETY: both strings outlive the call.
    let group = SbObject::from_returned(
        unsafe { (api.interpreter_add_multiword)(interpreter.as_ptr(), group_name.as_ptr(), group_help.as_ptr()) },
        api.command_dtor,
    );
    // SAFETY: `group` holds an SBCommand.
    if !unsafe { (api.command_is_valid)(group.as_ptr()) } {
        warn!(group = COMMAND_GROUP, "could not create command group");
        return Ok(());
    }

    for subcommand in GROUP_SUBCOMMANDS {
        let sub_name = c_text(subcommand)?;
        // SAFETY: as for the top-level command.
        let added = SbObject::from_returned(
            unsafe { (api.command_add_command)(group.as_ptr(), sub_name.as_ptr(), plugin, help.as_ptr()) },
            api.command_dtor,
        );
        // SAFETY: `added` holds an SBCommand.
        if !unsafe { (api.command_is_valid)(added.as_ptr()) } {
            warn!(group = COMMAND_GROUP, subcommand, "could not add sub-command");
        }
    }

    debug!(command = PRINT_COMMAND, alias = PRINT_ALIAS, group = COMMAND_GROUP, "commands installed");
    Ok(())
}

#[cfg(test)]
mod tests
{
    use std::mem::size_of;

    use super::*;

    #[test]
    fn test_vptr_points_past_the_header()
    {
        let vtable = ptr::addr_of!(PRINT_VTABLE) as usize;
        assert_eq!(PRINT_PLUGIN.vptr as usize, vtable + 2 * size_of::<usize>());
    }

    #[test]
    fn test_do_execute_is_third_slot()
    {
        let first = ptr::addr_of!(PRINT_VTABLE.complete_dtor) as usize;
        let slot = ptr::addr_of!(PRINT_VTABLE.do_execute) as usize;
        assert_eq!(slot, first + 2 * size_of::<usize>());
    }

    #[test]
    fn test_command_words()
    {
        let words = [CString::new("a").unwrap(), CString::new("+").unwrap(), CString::new("1").unwrap()];
        let mut argv: Vec<*mut c_char> = words.iter().map(|word| word.as_ptr().cast_mut()).collect();
        argv.push(ptr::null_mut());

        let collected = unsafe { command_words(argv.as_mut_ptr()) };
        assert_eq!(collected, ["a", "+", "1"]);
        assert!(unsafe { command_words(ptr::null_mut()) }.is_empty());
    }

    #[test]
    fn test_successful_statuses_pass()
    {
        for status in 1..=5 {
            assert!(command_status("command alias p __zdb_print", status, None).is_ok(), "{status}");
        }
    }

    #[test]
    fn test_failed_status_carries_host_error()
    {
        let error = command_status(
            "command alias p __zdb_print",
            RETURN_STATUS_FAILED,
            Some("error: alias 'p' conflicts with an existing command\n".to_string()),
        )
        .unwrap_err();

        assert!(matches!(&error, ZdbError::HostCommandFailed { line, .. } if line == "command alias p __zdb_print"));
        assert_eq!(
            error.to_string(),
            "'command alias p __zdb_print' failed: error: alias 'p' conflicts with an existing command"
        );
    }

    #[test]
    fn test_failed_status_without_text()
    {
        let error = command_status("command unalias p", RETURN_STATUS_INVALID, None).unwrap_err();
        assert_eq!(error.to_string(), "'command unalias p' failed: command failed");
    }

    #[test]
    fn test_execute_without_api_is_unhandled()
    {
        let handled = unsafe {
            execute_print(ptr::addr_of!(PRINT_PLUGIN).cast_mut(), ptr::null_mut(), ptr::null_mut(), ptr::null_mut())
        };
        assert!(!handled);
    }
}
