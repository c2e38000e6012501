/*! Render analysis reports for people and for tools.
 *
 * A report is read in two places: a terminal, where each finding should fit on one line next to
 * the location it points at, and a pipeline, where another program wants the whole thing as
 * JSON. `ReportEmitter` covers both, driven by an `EmitterConfig`.
 */

pub mod config;
pub mod emitter;
pub mod output;
pub mod report_emitter;

pub use config::{EmitterConfig, IndentStyle, VerbosityLevel};
pub use emitter::{EmitContext, EmitHelper, EmitResult, Emitter};
pub use output::OutputFormat;
pub use report_emitter::ReportEmitter;
