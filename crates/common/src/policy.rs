//! Generation policies
//!
//! Every fallible axis of the pipeline can either abort the current task
//! or record an issue and continue. Abort surfaces as the [`PolicyAbort`]
//! sentinel; skip hands a structured entry to the issues bag.

use thiserror::Error;

/// What to do when a recoverable condition fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Fail the current task with [`PolicyAbort`].
    Abort,
    /// Record an issue and continue.
    Skip,
}

/// Sentinel error raised when an `Abort` policy fires.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("abort policy fired ({context}: {item})")]
pub struct PolicyAbort {
    pub context: String,
    pub item: String,
}

/// Per-service-file dispatch policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServicePolicy {
    /// A service file failed to process end to end.
    pub process: Policy,
    /// A service file failed to parse.
    pub parse: Policy,
    /// A service failed during code generation.
    pub codegen: Policy,
}

/// Parser-level policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsePolicy {
    /// An object property the state machine does not recognize.
    pub property: Policy,
    /// A trait id with no registered parser.
    pub traits: Policy,
}

/// Codegen-level policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodegenPolicy {
    /// A reachable shape the writers cannot handle.
    pub unknown_shape: Policy,
    /// The model has no usable service root.
    pub invalid_root: Policy,
    /// A single shape writer failed.
    pub shape_fail: Policy,
}

/// The full policy set threaded through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policies {
    pub service: ServicePolicy,
    pub parse: ParsePolicy,
    pub codegen: CodegenPolicy,
}

impl Default for Policies {
    fn default() -> Self {
        Policies {
            // Keep processing sibling service files, but surface anything
            // wrong inside a model loudly.
            service: ServicePolicy {
                process: Policy::Skip,
                parse: Policy::Abort,
                codegen: Policy::Abort,
            },
            parse: ParsePolicy {
                property: Policy::Abort,
                traits: Policy::Skip,
            },
            codegen: CodegenPolicy {
                unknown_shape: Policy::Abort,
                invalid_root: Policy::Abort,
                shape_fail: Policy::Abort,
            },
        }
    }
}
