//! # zdb-core
//!
//! Zig value presentation and expression support for LLDB.
//!
//! This crate provides everything the zdb plugin does once it is loaded into
//! the debugger process:
//! - Loading a version-specific offset table for private LLDB entry points
//! - Calling those entry points with the host's C++ calling convention
//! - Installing Zig summary formatters into the `zig` type category
//! - Rendering Zig slices, strings, optionals, error unions and std containers
//! - Rewriting `v[i]`, `v.?` and `lhs catch rhs` into expressions LLDB accepts
//!
//! ## Layers
//!
//! The formatting and rewriting logic is written against small traits
//! ([`value::ValueHandle`], [`rewrite::VariableScope`], [`command::ExecutionContext`])
//! so it can be exercised without a debugger. The [`sb`] module implements
//! those traits on top of LLDB's public scripting-bridge API.
//!
//! ## Why unsafe code is needed
//!
//! LLDB only exposes its formatter registry through C++ symbols. Reaching them
//! means resolving addresses at runtime and calling through raw function
//! pointers whose signatures we assert ourselves. Those calls are wrapped in
//! safe functions that check every address before use; a wrong offset table
//! is the one failure mode they cannot detect.

#![allow(unsafe_code)] // Required for dlopen/dlsym and calls into liblldb

pub mod abi;
pub mod command;
pub mod config;
pub mod error;
pub mod image;
pub mod offsets;
pub mod registration;
pub mod rewrite;
pub mod sb;
pub mod summaries;
pub mod value;

pub use config::PluginConfig;
pub use error::{Result, ZdbError};
pub use offsets::{EntryPoint, OffsetTable, ResolvedSymbols};
pub use rewrite::ExpressionRewriter;
pub use summaries::SummaryKind;
