//! # Scripting-Bridge Symbols
//!
//! Mangled names and C-level signatures of the public `lldb::SB*` members the
//! plugin calls, resolved once from the host library into [`SbApi`].
//!
//! ## ABI Rules
//!
//! - Member functions take `this` as their first argument.
//! - SB classes are non-trivial (user-declared copy constructor and
//!   destructor), so the Itanium ABI returns them through a hidden pointer.
//!   Those functions are declared as returning [`SbStorage`], whose 32 bytes
//!   push the C ABI onto the same indirect-return path (`rdi` ahead of `this`
//!   on x86-64, `x8` on AArch64).
//! - SB objects passed by value or by reference both arrive as pointers.
//! - `uint64_t` mangles as `m` on Linux and `y` on macOS, so the three members
//!   taking one have per-platform names.

use std::ffi::{c_char, c_void};

use super::object::SbStorage;
use crate::error::{Result, ZdbError};
use crate::offsets::SymbolResolver;

pub type Constructor = unsafe extern "C" fn(this: *mut c_void);
pub type Destructor = unsafe extern "C" fn(this: *mut c_void);
pub type Predicate = unsafe extern "C" fn(this: *mut c_void) -> bool;
pub type ObjectGetter = unsafe extern "C" fn(this: *mut c_void) -> SbStorage;
pub type TextGetter = unsafe extern "C" fn(this: *mut c_void) -> *const c_char;
pub type NamedObjectGetter = unsafe extern "C" fn(this: *mut c_void, name: *const c_char) -> SbStorage;
pub type IndexedObjectGetter = unsafe extern "C" fn(this: *mut c_void, index: u32) -> SbStorage;
pub type CountGetter = unsafe extern "C" fn(this: *mut c_void) -> u32;
pub type UnsignedGetter = unsafe extern "C" fn(this: *mut c_void, fail_value: u64) -> u64;
pub type DescriptionFn = unsafe extern "C" fn(this: *mut c_void, stream: *mut c_void) -> bool;
pub type ReadMemoryFn =
    unsafe extern "C" fn(this: *mut c_void, address: u64, buffer: *mut c_void, size: usize, error: *mut c_void) -> usize;
pub type PrintfFn = unsafe extern "C" fn(this: *mut c_void, format: *const c_char, ...);
pub type VersionStringFn = unsafe extern "C" fn() -> *const c_char;
pub type EvaluateFn = unsafe extern "C" fn(this: *mut c_void, expression: *const c_char, options: *mut c_void) -> SbStorage;
pub type SetTimeoutFn = unsafe extern "C" fn(this: *mut c_void, timeout_us: u32);
pub type AddCommandFn =
    unsafe extern "C" fn(this: *mut c_void, name: *const c_char, command: *mut c_void, help: *const c_char) -> SbStorage;
pub type AddMultiwordFn = unsafe extern "C" fn(this: *mut c_void, name: *const c_char, help: *const c_char) -> SbStorage;
pub type HandleCommandFn =
    unsafe extern "C" fn(this: *mut c_void, command: *const c_char, result: *mut c_void, add_to_history: bool) -> i32;
pub type MessageFn = unsafe extern "C" fn(this: *mut c_void, message: *const c_char);
pub type SetStatusFn = unsafe extern "C" fn(this: *mut c_void, status: i32);

/// `bool (*)(SBValue, SBTypeSummaryOptions, SBStream&)`
pub type SummaryCallback = unsafe extern "C" fn(value: *mut c_void, options: *mut c_void, stream: *mut c_void) -> bool;
pub type CreateWithCallbackFn =
    unsafe extern "C" fn(callback: SummaryCallback, options: u32, description: *const c_char) -> SbStorage;

/// `lldb::eTypeOptionCascade`
pub const TYPE_OPTION_CASCADE: u32 = 1;
/// `lldb::eReturnStatusInvalid`
pub const RETURN_STATUS_INVALID: i32 = 0;
/// `lldb::eReturnStatusSuccessFinishResult`
pub const RETURN_STATUS_SUCCESS_FINISH_RESULT: i32 = 2;
/// `lldb::eReturnStatusFailed`
pub const RETURN_STATUS_FAILED: i32 = 6;

/// Mangled names of every member in [`SbApi`].
pub mod names
{
    pub const VALUE_CHILD_MEMBER: &str = "_ZN4lldb7SBValue22GetChildMemberWithNameEPKc";
    pub const VALUE_CHILD_AT_INDEX: &str = "_ZN4lldb7SBValue15GetChildAtIndexEj";
    pub const VALUE_NUM_CHILDREN: &str = "_ZN4lldb7SBValue14GetNumChildrenEv";
    pub const VALUE_NAME: &str = "_ZN4lldb7SBValue7GetNameEv";
    pub const VALUE_VALUE: &str = "_ZN4lldb7SBValue8GetValueEv";
    pub const VALUE_SUMMARY: &str = "_ZN4lldb7SBValue10GetSummaryEv";
    pub const VALUE_TYPE_NAME: &str = "_ZN4lldb7SBValue11GetTypeNameEv";
    #[cfg(target_os = "macos")]
    pub const VALUE_AS_UNSIGNED: &str = "_ZN4lldb7SBValue18GetValueAsUnsignedEy";
    #[cfg(not(target_os = "macos"))]
    pub const VALUE_AS_UNSIGNED: &str = "_ZN4lldb7SBValue18GetValueAsUnsignedEm";
    pub const VALUE_IS_VALID: &str = "_ZN4lldb7SBValue7IsValidEv";
    pub const VALUE_DEREFERENCE: &str = "_ZN4lldb7SBValue11DereferenceEv";
    pub const VALUE_TYPE_IS_POINTER: &str = "_ZN4lldb7SBValue17TypeIsPointerTypeEv";
    pub const VALUE_PROCESS: &str = "_ZN4lldb7SBValue10GetProcessEv";
    pub const VALUE_DESCRIPTION: &str = "_ZN4lldb7SBValue14GetDescriptionERNS_8SBStreamE";
    pub const VALUE_ERROR: &str = "_ZN4lldb7SBValue8GetErrorEv";
    pub const VALUE_DTOR: &str = "_ZN4lldb7SBValueD1Ev";

    #[cfg(target_os = "macos")]
    pub const PROCESS_READ_MEMORY: &str = "_ZN4lldb9SBProcess10ReadMemoryEyPvmRNS_7SBErrorE";
    #[cfg(not(target_os = "macos"))]
    pub const PROCESS_READ_MEMORY: &str = "_ZN4lldb9SBProcess10ReadMemoryEmPvmRNS_7SBErrorE";
    #[cfg(target_os = "macos")]
    pub const PROCESS_READ_C_STRING: &str = "_ZN4lldb9SBProcess21ReadCStringFromMemoryEyPvmRNS_7SBErrorE";
    #[cfg(not(target_os = "macos"))]
    pub const PROCESS_READ_C_STRING: &str = "_ZN4lldb9SBProcess21ReadCStringFromMemoryEmPvmRNS_7SBErrorE";
    pub const PROCESS_IS_VALID: &str = "_ZNK4lldb9SBProcess7IsValidEv";
    pub const PROCESS_SELECTED_THREAD: &str = "_ZNK4lldb9SBProcess17GetSelectedThreadEv";
    pub const PROCESS_DTOR: &str = "_ZN4lldb9SBProcessD1Ev";

    pub const ERROR_CTOR: &str = "_ZN4lldb7SBErrorC1Ev";
    pub const ERROR_DTOR: &str = "_ZN4lldb7SBErrorD1Ev";
    pub const ERROR_SUCCESS: &str = "_ZNK4lldb7SBError7SuccessEv";
    pub const ERROR_C_STRING: &str = "_ZNK4lldb7SBError10GetCStringEv";

    pub const STREAM_CTOR: &str = "_ZN4lldb8SBStreamC1Ev";
    pub const STREAM_DTOR: &str = "_ZN4lldb8SBStreamD1Ev";
    pub const STREAM_PRINTF: &str = "_ZN4lldb8SBStream6PrintfEPKcz";
    pub const STREAM_DATA: &str = "_ZN4lldb8SBStream7GetDataEv";

    pub const DEBUGGER_VERSION_STRING: &str = "_ZN4lldb10SBDebugger16GetVersionStringEv";
    pub const DEBUGGER_INTERPRETER: &str = "_ZN4lldb10SBDebugger21GetCommandInterpreterEv";
    pub const DEBUGGER_SELECTED_TARGET: &str = "_ZN4lldb10SBDebugger17GetSelectedTargetEv";

    pub const TARGET_IS_VALID: &str = "_ZNK4lldb8SBTarget7IsValidEv";
    pub const TARGET_PROCESS: &str = "_ZN4lldb8SBTarget10GetProcessEv";
    pub const TARGET_DTOR: &str = "_ZN4lldb8SBTargetD1Ev";

    pub const THREAD_IS_VALID: &str = "_ZNK4lldb8SBThread7IsValidEv";
    pub const THREAD_SELECTED_FRAME: &str = "_ZN4lldb8SBThread16GetSelectedFrameEv";
    pub const THREAD_DTOR: &str = "_ZN4lldb8SBThreadD1Ev";

    pub const FRAME_IS_VALID: &str = "_ZNK4lldb7SBFrame7IsValidEv";
    pub const FRAME_VARIABLE_PATH: &str = "_ZN4lldb7SBFrame23GetValueForVariablePathEPKc";
    pub const FRAME_EVALUATE: &str = "_ZN4lldb7SBFrame18EvaluateExpressionEPKcRKNS_19SBExpressionOptionsE";
    pub const FRAME_DTOR: &str = "_ZN4lldb7SBFrameD1Ev";

    pub const OPTIONS_CTOR: &str = "_ZN4lldb19SBExpressionOptionsC1Ev";
    pub const OPTIONS_DTOR: &str = "_ZN4lldb19SBExpressionOptionsD1Ev";
    pub const OPTIONS_SET_TIMEOUT: &str = "_ZN4lldb19SBExpressionOptions24SetTimeoutInMicroSecondsEj";

    pub const INTERPRETER_ADD_COMMAND: &str =
        "_ZN4lldb20SBCommandInterpreter10AddCommandEPKcPNS_24SBCommandPluginInterfaceES2_";
    pub const INTERPRETER_ADD_MULTIWORD: &str = "_ZN4lldb20SBCommandInterpreter19AddMultiwordCommandEPKcS2_";
    pub const INTERPRETER_HANDLE_COMMAND: &str =
        "_ZN4lldb20SBCommandInterpreter13HandleCommandEPKcRNS_21SBCommandReturnObjectEb";
    pub const INTERPRETER_DTOR: &str = "_ZN4lldb20SBCommandInterpreterD1Ev";

    pub const COMMAND_ADD_COMMAND: &str = "_ZN4lldb9SBCommand10AddCommandEPKcPNS_24SBCommandPluginInterfaceES2_";
    pub const COMMAND_IS_VALID: &str = "_ZN4lldb9SBCommand7IsValidEv";
    pub const COMMAND_DTOR: &str = "_ZN4lldb9SBCommandD1Ev";

    pub const RETURN_CTOR: &str = "_ZN4lldb21SBCommandReturnObjectC1Ev";
    pub const RETURN_DTOR: &str = "_ZN4lldb21SBCommandReturnObjectD1Ev";
    pub const RETURN_APPEND_MESSAGE: &str = "_ZN4lldb21SBCommandReturnObject13AppendMessageEPKc";
    pub const RETURN_SET_ERROR: &str = "_ZN4lldb21SBCommandReturnObject8SetErrorEPKc";
    pub const RETURN_SET_STATUS: &str = "_ZN4lldb21SBCommandReturnObject9SetStatusENS_12ReturnStatusE";
    pub const RETURN_GET_ERROR: &str = "_ZN4lldb21SBCommandReturnObject8GetErrorEv";

    pub const SUMMARY_CREATE_WITH_CALLBACK: &str =
        "_ZN4lldb13SBTypeSummary18CreateWithCallbackEPFbNS_7SBValueENS_20SBTypeSummaryOptionsERNS_8SBStreamEEjPKc";
    pub const SUMMARY_IS_VALID: &str = "_ZNK4lldb13SBTypeSummary7IsValidEv";
    pub const SUMMARY_DTOR: &str = "_ZN4lldb13SBTypeSummaryD1Ev";
}

/// Every public member the plugin calls, as typed function pointers.
#[derive(Clone, Copy)]
pub struct SbApi
{
    pub value_child_member: NamedObjectGetter,
    pub value_child_at_index: IndexedObjectGetter,
    pub value_num_children: CountGetter,
    pub value_name: TextGetter,
    pub value_value: TextGetter,
    pub value_summary: TextGetter,
    pub value_type_name: TextGetter,
    pub value_as_unsigned: UnsignedGetter,
    pub value_is_valid: Predicate,
    pub value_dereference: ObjectGetter,
    pub value_type_is_pointer: Predicate,
    pub value_process: ObjectGetter,
    pub value_description: DescriptionFn,
    pub value_error: ObjectGetter,
    pub value_dtor: Destructor,

    pub process_read_memory: ReadMemoryFn,
    pub process_read_c_string: ReadMemoryFn,
    pub process_is_valid: Predicate,
    pub process_selected_thread: ObjectGetter,
    pub process_dtor: Destructor,

    pub error_ctor: Constructor,
    pub error_dtor: Destructor,
    pub error_success: Predicate,
    pub error_c_string: TextGetter,

    pub stream_ctor: Constructor,
    pub stream_dtor: Destructor,
    pub stream_printf: PrintfFn,
    pub stream_data: TextGetter,

    pub debugger_version_string: VersionStringFn,
    pub debugger_interpreter: ObjectGetter,
    pub debugger_selected_target: ObjectGetter,

    pub target_is_valid: Predicate,
    pub target_process: ObjectGetter,
    pub target_dtor: Destructor,

    pub thread_is_valid: Predicate,
    pub thread_selected_frame: ObjectGetter,
    pub thread_dtor: Destructor,

    pub frame_is_valid: Predicate,
    pub frame_variable_path: NamedObjectGetter,
    pub frame_evaluate: EvaluateFn,
    pub frame_dtor: Destructor,

    pub options_ctor: Constructor,
    pub options_dtor: Destructor,
    pub options_set_timeout: SetTimeoutFn,

    pub interpreter_add_command: AddCommandFn,
    pub interpreter_add_multiword: AddMultiwordFn,
    pub interpreter_handle_command: HandleCommandFn,
    pub interpreter_dtor: Destructor,

    pub command_add_command: AddCommandFn,
    pub command_is_valid: Predicate,
    pub command_dtor: Destructor,

    pub return_ctor: Constructor,
    pub return_dtor: Destructor,
    pub return_append_message: MessageFn,
    pub return_set_error: MessageFn,
    pub return_set_status: SetStatusFn,
    pub return_get_error: TextGetter,

    pub summary_create_with_callback: CreateWithCallbackFn,
    pub summary_is_valid: Predicate,
    pub summary_dtor: Destructor,
}

/// Resolve `$name` and reinterpret it as `$ty`.
macro_rules! symbol {
    ($resolver:expr, $name:expr, $ty:ty) => {{
        let address = $resolver
            .symbol_address($name)
            .ok_or_else(|| ZdbError::HostApiMissing { symbol: String::from($name) })?;
        // SAFETY: `$name` is the mangled name of a function with signature `$ty`.
        unsafe { std::mem::transmute::<usize, $ty>(address) }
    }};
}

impl SbApi
{
    /// Resolve every member from the host library.
    ///
    /// Fails on the first symbol the library does not export.
    pub fn resolve<R>(resolver: &R) -> Result<Self>
    where
        R: SymbolResolver + ?Sized,
    {
        use names::*;

        Ok(Self {
            value_child_member: symbol!(resolver, VALUE_CHILD_MEMBER, NamedObjectGetter),
            value_child_at_index: symbol!(resolver, VALUE_CHILD_AT_INDEX, IndexedObjectGetter),
            value_num_children: symbol!(resolver, VALUE_NUM_CHILDREN, CountGetter),
            value_name: symbol!(resolver, VALUE_NAME, TextGetter),
            value_value: symbol!(resolver, VALUE_VALUE, TextGetter),
            value_summary: symbol!(resolver, VALUE_SUMMARY, TextGetter),
            value_type_name: symbol!(resolver, VALUE_TYPE_NAME, TextGetter),
            value_as_unsigned: symbol!(resolver, VALUE_AS_UNSIGNED, UnsignedGetter),
            value_is_valid: symbol!(resolver, VALUE_IS_VALID, Predicate),
            value_dereference: symbol!(resolver, VALUE_DEREFERENCE, ObjectGetter),
            value_type_is_pointer: symbol!(resolver, VALUE_TYPE_IS_POINTER, Predicate),
            value_process: symbol!(resolver, VALUE_PROCESS, ObjectGetter),
            value_description: symbol!(resolver, VALUE_DESCRIPTION, DescriptionFn),
            value_error: symbol!(resolver, VALUE_ERROR, ObjectGetter),
            value_dtor: symbol!(resolver, VALUE_DTOR, Destructor),

            process_read_memory: symbol!(resolver, PROCESS_READ_MEMORY, ReadMemoryFn),
            process_read_c_string: symbol!(resolver, PROCESS_READ_C_STRING, ReadMemoryFn),
            process_is_valid: symbol!(resolver, PROCESS_IS_VALID, Predicate),
            process_selected_thread: symbol!(resolver, PROCESS_SELECTED_THREAD, ObjectGetter),
            process_dtor: symbol!(resolver, PROCESS_DTOR, Destructor),

            error_ctor: symbol!(resolver, ERROR_CTOR, Constructor),
            error_dtor: symbol!(resolver, ERROR_DTOR, Destructor),
            error_success: symbol!(resolver, ERROR_SUCCESS, Predicate),
            error_c_string: symbol!(resolver, ERROR_C_STRING, TextGetter),

            stream_ctor: symbol!(resolver, STREAM_CTOR, Constructor),
            stream_dtor: symbol!(resolver, STREAM_DTOR, Destructor),
            stream_printf: symbol!(resolver, STREAM_PRINTF, PrintfFn),
            stream_data: symbol!(resolver, STREAM_DATA, TextGetter),

            debugger_version_string: symbol!(resolver, DEBUGGER_VERSION_STRING, VersionStringFn),
            debugger_interpreter: symbol!(resolver, DEBUGGER_INTERPRETER, ObjectGetter),
            debugger_selected_target: symbol!(resolver, DEBUGGER_SELECTED_TARGET, ObjectGetter),

            target_is_valid: symbol!(resolver, TARGET_IS_VALID, Predicate),
            target_process: symbol!(resolver, TARGET_PROCESS, ObjectGetter),
            target_dtor: symbol!(resolver, TARGET_DTOR, Destructor),

            thread_is_valid: symbol!(resolver, THREAD_IS_VALID, Predicate),
            thread_selected_frame: symbol!(resolver, THREAD_SELECTED_FRAME, ObjectGetter),
            thread_dtor: symbol!(resolver, THREAD_DTOR, Destructor),

            frame_is_valid: symbol!(resolver, FRAME_IS_VALID, Predicate),
            frame_variable_path: symbol!(resolver, FRAME_VARIABLE_PATH, NamedObjectGetter),
            frame_evaluate: symbol!(resolver, FRAME_EVALUATE, EvaluateFn),
            frame_dtor: symbol!(resolver, FRAME_DTOR, Destructor),

            options_ctor: symbol!(resolver, OPTIONS_CTOR, Constructor),
            options_dtor: symbol!(resolver, OPTIONS_DTOR, Destructor),
            options_set_timeout: symbol!(resolver, OPTIONS_SET_TIMEOUT, SetTimeoutFn),

            interpreter_add_command: symbol!(resolver, INTERPRETER_ADD_COMMAND, AddCommandFn),
            interpreter_add_multiword: symbol!(resolver, INTERPRETER_ADD_MULTIWORD, AddMultiwordFn),
            interpreter_handle_command: symbol!(resolver, INTERPRETER_HANDLE_COMMAND, HandleCommandFn),
            interpreter_dtor: symbol!(resolver, INTERPRETER_DTOR, Destructor),

            command_add_command: symbol!(resolver, COMMAND_ADD_COMMAND, AddCommandFn),
            command_is_valid: symbol!(resolver, COMMAND_IS_VALID, Predicate),
            command_dtor: symbol!(resolver, COMMAND_DTOR, Destructor),

            return_ctor: symbol!(resolver, RETURN_CTOR, Constructor),
            return_dtor: symbol!(resolver, RETURN_DTOR, Destructor),
            return_append_message: symbol!(resolver, RETURN_APPEND_MESSAGE, MessageFn),
            return_set_error: symbol!(resolver, RETURN_SET_ERROR, MessageFn),
            return_set_status: symbol!(resolver, RETURN_SET_STATUS, SetStatusFn),
            return_get_error: symbol!(resolver, RETURN_GET_ERROR, TextGetter),

            summary_create_with_callback: symbol!(resolver, SUMMARY_CREATE_WITH_CALLBACK, CreateWithCallbackFn),
            summary_is_valid: symbol!(resolver, SUMMARY_IS_VALID, Predicate),
            summary_dtor: symbol!(resolver, SUMMARY_DTOR, Destructor),
        })
    }
}

#[cfg(test)]
mod tests
{
    use std::collections::HashMap;

    use super::*;

    struct Partial(HashMap<&'static str, usize>);

    impl SymbolResolver for Partial
    {
        fn symbol_address(&self, symbol: &str) -> Option<usize>
        {
            self.0.get(symbol).copied()
        }
    }

    #[test]
    fn test_missing_symbol_is_named()
    {
        let resolver = Partial(HashMap::new());
        match SbApi::resolve(&resolver) {
            Err(ZdbError::HostApiMissing { symbol }) => assert_eq!(symbol, names::VALUE_CHILD_MEMBER),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_names_are_itanium_lldb_symbols()
    {
        for name in [names::VALUE_AS_UNSIGNED, names::PROCESS_READ_MEMORY, names::SUMMARY_CREATE_WITH_CALLBACK] {
            assert!(name.starts_with("_ZN4lldb") || name.starts_with("_ZNK4lldb"));
        }
    }
}
