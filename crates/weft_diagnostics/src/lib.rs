//! Structured diagnostics for the Weft placement core.
//!
//! Non-fatal conditions (refused cluster links, explain-mode legality
//! traces) are reported as [`Diagnostic`] values accumulated in a
//! [`DiagnosticSink`], leaving the placement loop's return values free to
//! carry only verdicts. Fatal conditions use `weft_common::InternalError`
//! or the settings error types instead.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use severity::Severity;
pub use sink::DiagnosticSink;
