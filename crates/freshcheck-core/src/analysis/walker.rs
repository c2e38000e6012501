use super::alias::PointsToGraph;
use super::dependency_graph::DependencyGraph;
use super::validity::ValidityGraph;
use crate::config::AnalysisConfig;
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::event::{Event, FunctionTrace, Step};
use crate::source_location::SourceLocation;
use crate::summary::{FunctionSummary, SummaryLookup, SummaryTable};
use crate::variable::{ValidityState, Variable};
use crate::{CheckError, Result};
use indexmap::IndexMap;
use tracing::{debug, trace, warn};

/// Globals of a translation unit and the graph their declarations build.
#[derive(Debug, Clone, Default)]
pub struct GlobalScope {
    pub variables: IndexMap<String, Variable>,
    pub graph: DependencyGraph,
}

impl GlobalScope {
    pub fn from_steps(steps: &[Step]) -> Self {
        let mut scope = GlobalScope::default();
        for step in steps {
            match &step.event {
                Event::Declare {
                    var,
                    is_pointer,
                    init_refs,
                } => {
                    scope
                        .variables
                        .insert(var.clone(), Variable::global(var.clone(), *is_pointer));
                    scope.graph.insert(var, init_refs);
                }
                event if event.is_pointer_shape() => {}
                other => debug!(event = ?other, "ignoring non-declaration at global scope"),
            }
        }
        scope
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }
}

/// Walks one function body, turning events into graph operations.
pub struct FunctionWalker<'a> {
    function: &'a FunctionTrace,
    points_to: &'a PointsToGraph,
    summaries: &'a SummaryTable,
    config: &'a AnalysisConfig,
    graph: ValidityGraph,
    known: IndexMap<String, Variable>,
    summary: FunctionSummary,
    diagnostics: Vec<Diagnostic>,
    location: Option<SourceLocation>,
}

impl<'a> FunctionWalker<'a> {
    pub fn new(
        function: &'a FunctionTrace,
        globals: &GlobalScope,
        points_to: &'a PointsToGraph,
        summaries: &'a SummaryTable,
        config: &'a AnalysisConfig,
    ) -> Self {
        let mut graph = ValidityGraph::from_graph(globals.graph.clone());
        if !config.is_entry_point(&function.name) {
            for name in globals.variables.keys() {
                graph.mark_undecided(name);
            }
        }

        let mut walker = Self {
            function,
            points_to,
            summaries,
            config,
            graph,
            known: globals.variables.clone(),
            summary: FunctionSummary::new(function.name.clone()),
            diagnostics: Vec::new(),
            location: None,
        };

        for param in &function.params {
            walker.declare(Variable::parameter(param.name.clone(), param.is_pointer), &[]);
        }
        walker
    }

    pub fn run(mut self) -> Result<(FunctionSummary, Vec<Diagnostic>)> {
        debug!(function = %self.function.name, events = self.function.body.len(), "walking function");

        let function = self.function;
        for step in &function.body {
            self.step(step)?;
        }

        if !self.graph.is_balanced() {
            return Err(CheckError::UnbalancedScope(format!(
                "`{}` ends with {} open branch or scope frame(s)",
                self.function.name,
                self.graph.depth()
            )));
        }

        Ok((self.summary, self.diagnostics))
    }

    pub fn graph(&self) -> &ValidityGraph {
        &self.graph
    }

    fn step(&mut self, step: &Step) -> Result<()> {
        self.location = step.location;
        trace!(event = ?step.event, "event");

        match &step.event {
            Event::EnterFunction { name, .. } => {
                return Err(CheckError::MalformedEvents(format!(
                    "function `{}` entered inside `{}`",
                    name, self.function.name
                )));
            }
            Event::ExitFunction => {
                return Err(CheckError::MalformedEvents(
                    "exit_function inside a function body".to_string(),
                ));
            }
            Event::Declare {
                var,
                is_pointer,
                init_refs,
            } => {
                for r in init_refs {
                    self.read(r);
                }
                self.declare(Variable::local(var.clone(), *is_pointer), init_refs);
            }
            Event::Assign {
                lhs,
                rhs_refs,
                is_compound,
            } => {
                if *is_compound {
                    self.read(lhs);
                }
                for r in rhs_refs {
                    self.read(r);
                }
                self.write(lhs, rhs_refs, *is_compound);
            }
            Event::IncDec { var } => {
                self.read(var);
                self.write(var, &[], true);
            }
            Event::Use { var } => self.read(var),
            Event::DereferenceRead { ptr } => {
                self.read(ptr);
                self.dereference(ptr);
            }
            Event::AddressOf { .. }
            | Event::PointerCopy { .. }
            | Event::PointerLoad { .. }
            | Event::PointerStoreAddr { .. }
            | Event::PointerStoreCopy { .. }
            | Event::PointerStoreLoad { .. } => {}
            Event::EnterIf => {
                self.graph.entry_scope();
                self.graph.entry_branch()?;
            }
            Event::EnterElse => self.graph.entry_branch()?,
            Event::ExitBranch => self.graph.exit_branch()?,
            Event::ExitIf => self.graph.exit_scope()?,
            Event::EnterLoopBody => {
                self.graph.entry_scope();
                self.graph.entry_branch()?;
            }
            Event::ExitLoop => {
                self.graph.exit_branch()?;
                self.graph.exit_scope()?;
            }
            Event::Call { callee, arg_refs } => {
                for r in arg_refs {
                    self.read(r);
                }
                self.call(callee);
            }
        }

        Ok(())
    }

    fn declare(&mut self, variable: Variable, init_refs: &[String]) {
        let name = variable.name.clone();
        if self.known.get(&name).is_some_and(|v| v.storage.is_global()) {
            debug!(var = %name, function = %self.function.name, "global shadowed");
            self.graph.ignore(std::iter::once(&name));
        }
        self.known.insert(name.clone(), variable);
        self.graph.insert(&name, init_refs);
    }

    /// Checks one read, returning the removal reason when the variable is stale.
    fn observe(&mut self, var: &str) -> Option<String> {
        let variable = self.known.get(var)?;
        if variable.is_pointer && !self.config.check_pointer_reads {
            return None;
        }
        let is_global = variable.storage.is_global();

        match self.graph.state(var) {
            ValidityState::Fresh => None,
            ValidityState::Undecided => {
                self.graph.resolve(var);
                if is_global {
                    self.summary.preconditions.insert(var.to_string());
                }
                None
            }
            ValidityState::Stale => Some(self.graph.removal_reason(var).to_string()),
        }
    }

    fn read(&mut self, var: &str) {
        if let Some(reason) = self.observe(var) {
            self.report(DiagnosticKind::StaleUse {
                variable: var.to_string(),
                reason,
            });
        }
    }

    fn dereference(&mut self, ptr: &str) {
        let targets = self.points_to.targets(ptr);
        if targets.is_empty() {
            trace!(ptr, "dereference with no known targets");
            return;
        }

        for target in targets {
            if let Some(reason) = self.observe(&target) {
                self.report(DiagnosticKind::StaleDereference {
                    target: target.clone(),
                    pointer: ptr.to_string(),
                    reason,
                });
            }
        }
    }

    fn write(&mut self, var: &str, rhs: &[String], keep_existing: bool) {
        let is_global = match self.known.get(var) {
            Some(variable) => variable.storage.is_global(),
            None => {
                debug!(var, "write to undeclared name, tracking it as a local");
                self.known
                    .insert(var.to_string(), Variable::local(var, false));
                false
            }
        };

        if self.graph.resolve(var) && is_global {
            self.summary.preconditions.insert(var.to_string());
        }
        if is_global {
            self.summary.postconditions.insert(var.to_string());
        }

        self.graph.reassign(var, rhs, keep_existing);
    }

    fn call(&mut self, callee: &str) {
        let summaries = self.summaries;
        let summary = match summaries.lookup(callee) {
            SummaryLookup::Ready(summary) => summary,
            SummaryLookup::Pending => {
                warn!(caller = %self.function.name, callee, "callee summary not available");
                if self.config.report_unresolved_callees {
                    self.report(DiagnosticKind::UnresolvedCallee {
                        callee: callee.to_string(),
                    });
                }
                return;
            }
            SummaryLookup::External => {
                trace!(callee, "external callee");
                return;
            }
        };

        for var in &summary.preconditions {
            if !self.is_visible_global(var) {
                continue;
            }
            if self.graph.state(var) != ValidityState::Fresh {
                self.report(DiagnosticKind::MissingPrecondition {
                    callee: callee.to_string(),
                    variable: var.clone(),
                });
            }
        }

        for var in &summary.postconditions {
            if !self.is_visible_global(var) {
                continue;
            }
            let reason = format!(
                "changed because of `{}`, written by call to `{}`",
                var, callee
            );
            self.graph
                .reassign_because(var, Vec::<&str>::new(), false, &reason);
            self.summary.postconditions.insert(var.clone());
        }
    }

    fn is_visible_global(&self, var: &str) -> bool {
        self.known.get(var).is_some_and(|v| v.storage.is_global())
    }

    fn report(&mut self, kind: DiagnosticKind) {
        debug!(function = %self.function.name, diagnostic = %kind, "diagnostic");
        self.diagnostics
            .push(Diagnostic::new(self.function.name.clone(), kind, self.location));
    }
}
