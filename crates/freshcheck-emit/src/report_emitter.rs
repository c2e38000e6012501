use crate::config::EmitterConfig;
use crate::emitter::{EmitContext, EmitHelper, EmitResult, Emitter};
use crate::output::OutputFormat;
use colored::Color;
use freshcheck_core::{AnalysisReport, Diagnostic, FunctionSummary, Severity};
use std::collections::BTreeSet;
use std::io::Write;

/// Writes an `AnalysisReport` as diagnostic lines or as JSON.
#[derive(Debug, Clone, Default)]
pub struct ReportEmitter {
    config: EmitterConfig,
    format: OutputFormat,
}

impl ReportEmitter {
    pub fn new(config: EmitterConfig, format: OutputFormat) -> Self {
        Self { config, format }
    }

    pub fn text(config: EmitterConfig) -> Self {
        Self::new(config, OutputFormat::Text)
    }

    pub fn json() -> Self {
        Self::new(EmitterConfig::plain(), OutputFormat::Json)
    }

    pub fn config(&self) -> &EmitterConfig {
        &self.config
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    fn is_shown(&self, diagnostic: &Diagnostic) -> bool {
        diagnostic.severity != Severity::Note || self.config.verbosity.should_print_notes()
    }

    fn emit_text<W: Write>(
        &self,
        report: &AnalysisReport,
        writer: &mut W,
        context: &mut EmitContext,
    ) -> EmitResult {
        let shown: Vec<&Diagnostic> = report
            .diagnostics
            .iter()
            .filter(|d| self.is_shown(d))
            .collect();

        if shown.is_empty() {
            EmitHelper::write_colored_line(writer, context, "no stale reads found", Color::Green)?;
        }
        for diagnostic in shown {
            self.emit_diagnostic(diagnostic, writer, context)?;
        }

        if self.config.show_summaries && !report.summaries.is_empty() {
            EmitHelper::write_section(writer, context, "Summaries")?;
            for summary in report.summaries.values() {
                self.emit_summary(summary, writer, context)?;
            }
        }

        if self.config.verbosity.should_print_order() {
            EmitHelper::write_section(writer, context, "Analysis Order")?;
            for (index, function) in report.order.order.iter().enumerate() {
                EmitHelper::write_line(writer, context, &format!("{}. {}", index + 1, function))?;
            }
            for (caller, callee) in &report.order.back_edges {
                EmitHelper::write_line(
                    writer,
                    context,
                    &format!("recursive: {} -> {}", caller, callee),
                )?;
            }
        }

        if self.config.verbosity.should_print_points_to() && !report.points_to.is_empty() {
            EmitHelper::write_section(writer, context, "Points-To")?;
            for (pointer, targets) in report.points_to.iter().filter(|(_, t)| !t.is_empty()) {
                EmitHelper::write_line(
                    writer,
                    context,
                    &format!("{} -> {}", pointer, join(targets)),
                )?;
            }
        }

        Ok(())
    }

    fn emit_diagnostic<W: Write>(
        &self,
        diagnostic: &Diagnostic,
        writer: &mut W,
        context: &EmitContext,
    ) -> EmitResult {
        let mut line = format!(
            "{}: {}",
            EmitHelper::severity_label(context, diagnostic.severity),
            diagnostic.kind
        );
        if let Some(location) = diagnostic.location {
            line.push_str(&format!(" at {}", location));
        }
        line.push_str(&format!(" in `{}`", diagnostic.function));
        EmitHelper::write_line(writer, context, &line)
    }

    fn emit_summary<W: Write>(
        &self,
        summary: &FunctionSummary,
        writer: &mut W,
        context: &mut EmitContext,
    ) -> EmitResult {
        let header = EmitHelper::paint(context, &summary.name, Color::BrightBlue);
        EmitHelper::write_block(writer, context, &header, |w, c| {
            EmitHelper::write_line(w, c, &format!("pre: {}", join(&summary.preconditions)))?;
            EmitHelper::write_line(w, c, &format!("post: {}", join(&summary.postconditions)))
        })
    }
}

fn join(names: &BTreeSet<String>) -> String {
    if names.is_empty() {
        "(none)".to_string()
    } else {
        names.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}

impl Emitter for ReportEmitter {
    type Item = AnalysisReport;

    fn emit<W: Write>(
        &self,
        report: &AnalysisReport,
        writer: &mut W,
        context: &mut EmitContext,
    ) -> EmitResult {
        match self.format {
            OutputFormat::Text => self.emit_text(report, writer, context),
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut *writer, report)?;
                writeln!(writer)?;
                Ok(())
            }
        }
    }

    fn context(&self) -> EmitContext {
        EmitContext::from_config(&self.config)
    }
}
