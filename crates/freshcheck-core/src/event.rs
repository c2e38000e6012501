/*! Syntactic events delivered by the front end.
 *
 * The checker never sees a syntax tree. A walker over the host language emits these events in
 * textual order, one function at a time, with nesting made explicit by the branch and loop
 * markers. Everything the engine knows about a program arrives through this vocabulary.
 */

use crate::source_location::SourceLocation;
use crate::{CheckError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    EnterFunction {
        name: String,
        params: Vec<Param>,
    },
    ExitFunction,
    Declare {
        var: String,
        is_pointer: bool,
        init_refs: Vec<String>,
    },
    Assign {
        lhs: String,
        rhs_refs: Vec<String>,
        is_compound: bool,
    },
    IncDec {
        var: String,
    },
    Use {
        var: String,
    },
    DereferenceRead {
        ptr: String,
    },
    AddressOf {
        ptr: String,
        target: String,
    },
    PointerCopy {
        dst: String,
        src: String,
    },
    PointerLoad {
        dst: String,
        src: String,
    },
    PointerStoreAddr {
        dst_ptr: String,
        target: String,
    },
    PointerStoreCopy {
        dst_ptr: String,
        src: String,
    },
    PointerStoreLoad {
        dst_ptr: String,
        src_ptr: String,
    },
    EnterIf,
    EnterElse,
    ExitBranch,
    ExitIf,
    EnterLoopBody,
    ExitLoop,
    Call {
        callee: String,
        arg_refs: Vec<String>,
    },
}

fn names(refs: &[&str]) -> Vec<String> {
    refs.iter().map(|r| r.to_string()).collect()
}

impl Event {
    pub fn declare(var: &str, init_refs: &[&str]) -> Self {
        Event::Declare {
            var: var.to_string(),
            is_pointer: false,
            init_refs: names(init_refs),
        }
    }

    pub fn declare_pointer(var: &str) -> Self {
        Event::Declare {
            var: var.to_string(),
            is_pointer: true,
            init_refs: Vec::new(),
        }
    }

    pub fn assign(lhs: &str, rhs_refs: &[&str]) -> Self {
        Event::Assign {
            lhs: lhs.to_string(),
            rhs_refs: names(rhs_refs),
            is_compound: false,
        }
    }

    pub fn compound_assign(lhs: &str, rhs_refs: &[&str]) -> Self {
        Event::Assign {
            lhs: lhs.to_string(),
            rhs_refs: names(rhs_refs),
            is_compound: true,
        }
    }

    pub fn inc_dec(var: &str) -> Self {
        Event::IncDec {
            var: var.to_string(),
        }
    }

    pub fn use_var(var: &str) -> Self {
        Event::Use {
            var: var.to_string(),
        }
    }

    pub fn deref(ptr: &str) -> Self {
        Event::DereferenceRead {
            ptr: ptr.to_string(),
        }
    }

    pub fn address_of(ptr: &str, target: &str) -> Self {
        Event::AddressOf {
            ptr: ptr.to_string(),
            target: target.to_string(),
        }
    }

    pub fn pointer_copy(dst: &str, src: &str) -> Self {
        Event::PointerCopy {
            dst: dst.to_string(),
            src: src.to_string(),
        }
    }

    pub fn call(callee: &str, arg_refs: &[&str]) -> Self {
        Event::Call {
            callee: callee.to_string(),
            arg_refs: names(arg_refs),
        }
    }

    pub fn is_pointer_shape(&self) -> bool {
        matches!(
            self,
            Event::AddressOf { .. }
                | Event::PointerCopy { .. }
                | Event::PointerLoad { .. }
                | Event::PointerStoreAddr { .. }
                | Event::PointerStoreCopy { .. }
                | Event::PointerStoreLoad { .. }
        )
    }

    fn allowed_at_top_level(&self) -> bool {
        matches!(self, Event::Declare { .. }) || self.is_pointer_shape()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    #[serde(flatten)]
    pub event: Event,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
}

impl Step {
    pub fn new(event: Event) -> Self {
        Self {
            event,
            location: None,
        }
    }

    pub fn at(event: Event, line: u32, column: u32) -> Self {
        Self {
            event,
            location: Some(SourceLocation::new(line, column)),
        }
    }
}

impl From<Event> for Step {
    fn from(event: Event) -> Self {
        Step::new(event)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(default)]
    pub is_pointer: bool,
}

impl Param {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_pointer: false,
        }
    }

    pub fn pointer(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_pointer: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionTrace {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Vec<Step>,
}

impl FunctionTrace {
    pub fn new(name: impl Into<String>, params: Vec<Param>) -> Self {
        Self {
            name: name.into(),
            params,
            body: Vec::new(),
        }
    }

    pub fn with_body(
        name: impl Into<String>,
        params: Vec<Param>,
        body: impl IntoIterator<Item = Event>,
    ) -> Self {
        Self {
            name: name.into(),
            params,
            body: body.into_iter().map(Step::new).collect(),
        }
    }

    pub fn push(&mut self, step: impl Into<Step>) -> &mut Self {
        self.body.push(step.into());
        self
    }

    /// Callee names in call order, duplicates included.
    pub fn callees(&self) -> impl Iterator<Item = &str> {
        self.body.iter().filter_map(|step| match &step.event {
            Event::Call { callee, .. } => Some(callee.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationUnit {
    pub globals: Vec<Step>,
    pub functions: Vec<FunctionTrace>,
}

impl TranslationUnit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_global(&mut self, step: impl Into<Step>) -> &mut Self {
        self.globals.push(step.into());
        self
    }

    pub fn add_function(&mut self, function: FunctionTrace) -> &mut Self {
        self.functions.push(function);
        self
    }

    pub fn function(&self, name: &str) -> Option<&FunctionTrace> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn defines(&self, name: &str) -> bool {
        self.function(name).is_some()
    }

    /// Splits one flat event stream into global declarations and function bodies.
    pub fn from_events(steps: impl IntoIterator<Item = Step>) -> Result<Self> {
        let mut unit = TranslationUnit::new();
        let mut current: Option<FunctionTrace> = None;

        for step in steps {
            match step.event {
                Event::EnterFunction {
                    ref name,
                    ref params,
                } => {
                    if let Some(open) = &current {
                        return Err(CheckError::MalformedEvents(format!(
                            "function `{}` entered while `{}` is still open",
                            name, open.name
                        )));
                    }
                    current = Some(FunctionTrace::new(name.clone(), params.clone()));
                }
                Event::ExitFunction => match current.take() {
                    Some(done) => unit.functions.push(done),
                    None => {
                        return Err(CheckError::MalformedEvents(
                            "exit_function without a matching enter_function".to_string(),
                        ));
                    }
                },
                _ => match current.as_mut() {
                    Some(open) => open.body.push(step),
                    None if step.event.allowed_at_top_level() => unit.globals.push(step),
                    None => {
                        return Err(CheckError::MalformedEvents(format!(
                            "{:?} outside of any function",
                            step.event
                        )));
                    }
                },
            }
        }

        if let Some(open) = current {
            return Err(CheckError::MalformedEvents(format!(
                "function `{}` never exits",
                open.name
            )));
        }

        Ok(unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_events_splits_globals_and_functions() {
        let steps = vec![
            Step::new(Event::declare("g", &[])),
            Step::new(Event::EnterFunction {
                name: "main".to_string(),
                params: vec![Param::new("argc")],
            }),
            Step::at(Event::use_var("g"), 3, 5),
            Step::new(Event::ExitFunction),
            Step::new(Event::address_of("p", "g")),
        ];

        let unit = TranslationUnit::from_events(steps).unwrap();
        assert_eq!(unit.globals.len(), 2);
        assert_eq!(unit.functions.len(), 1);
        assert_eq!(unit.functions[0].name, "main");
        assert_eq!(unit.functions[0].params, vec![Param::new("argc")]);
        assert_eq!(
            unit.functions[0].body,
            vec![Step::at(Event::use_var("g"), 3, 5)]
        );
    }

    #[test]
    fn test_from_events_rejects_unterminated_function() {
        let steps = vec![Step::new(Event::EnterFunction {
            name: "f".to_string(),
            params: vec![],
        })];
        assert!(matches!(
            TranslationUnit::from_events(steps),
            Err(CheckError::MalformedEvents(_))
        ));
    }

    #[test]
    fn test_from_events_rejects_statements_outside_functions() {
        let steps = vec![Step::new(Event::use_var("g"))];
        assert!(TranslationUnit::from_events(steps).is_err());
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_string(&Event::inc_dec("i")).unwrap();
        assert_eq!(json, r#"{"event":"inc_dec","var":"i"}"#);

        let back: Event = serde_json::from_str(r#"{"event":"enter_if"}"#).unwrap();
        assert_eq!(back, Event::EnterIf);
    }

    #[test]
    fn test_callees_in_call_order() {
        let f = FunctionTrace::with_body(
            "f",
            vec![],
            vec![
                Event::call("g", &[]),
                Event::use_var("x"),
                Event::call("h", &["x"]),
                Event::call("g", &[]),
            ],
        );
        assert_eq!(f.callees().collect::<Vec<_>>(), vec!["g", "h", "g"]);
    }
}
