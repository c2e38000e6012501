use crate::{Result, Rule, TraceError};
use freshcheck_core::{Event, FunctionTrace, Param, SourceLocation, Step, TranslationUnit};
use pest::iterators::Pair;

/// Lowers a parsed `unit` pair into globals and function bodies.
pub fn lower_unit(unit: Pair<'_, Rule>) -> Result<TranslationUnit> {
    let mut result = TranslationUnit::new();

    for item in unit.into_inner() {
        match item.as_rule() {
            Rule::global_decl => {
                let declaration = child(item, Rule::declaration)?;
                for step in lower_declaration(declaration, true)? {
                    result.add_global(step);
                }
            }
            Rule::pointer_stmt => {
                result.add_global(lower_pointer_stmt(item)?);
            }
            Rule::function => {
                result.add_function(lower_function(item)?);
            }
            _ => {}
        }
    }

    Ok(result)
}

fn lower_function(pair: Pair<'_, Rule>) -> Result<FunctionTrace> {
    let mut name = String::new();
    let mut params = Vec::new();
    let mut body = Vec::new();

    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::ident => name = part.as_str().to_string(),
            Rule::params => {
                for param in part.into_inner() {
                    let mut is_pointer = false;
                    let mut param_name = String::new();
                    for piece in param.into_inner() {
                        match piece.as_rule() {
                            Rule::star => is_pointer = true,
                            Rule::ident => param_name = piece.as_str().to_string(),
                            _ => {}
                        }
                    }
                    params.push(Param {
                        name: param_name,
                        is_pointer,
                    });
                }
            }
            Rule::block => lower_block(part, &mut body)?,
            _ => {}
        }
    }

    Ok(FunctionTrace { name, params, body })
}

fn lower_block(block: Pair<'_, Rule>, out: &mut Vec<Step>) -> Result<()> {
    for stmt in block.into_inner() {
        lower_stmt(stmt, out)?;
    }
    Ok(())
}

fn lower_stmt(stmt: Pair<'_, Rule>, out: &mut Vec<Step>) -> Result<()> {
    let location = location_of(&stmt);

    match stmt.as_rule() {
        Rule::decl_stmt => {
            let declaration = child(stmt, Rule::declaration)?;
            out.extend(lower_declaration(declaration, false)?);
        }
        Rule::set_stmt => {
            let mut lhs = String::new();
            let mut is_compound = false;
            let mut rhs = Vec::new();
            for part in stmt.into_inner() {
                match part.as_rule() {
                    Rule::ident => lhs = part.as_str().to_string(),
                    Rule::assign_op => {
                        is_compound = part.into_inner().next().is_some();
                    }
                    Rule::refs => rhs = names(part),
                    _ => {}
                }
            }
            out.push(step(
                Event::Assign {
                    lhs,
                    rhs_refs: rhs,
                    is_compound,
                },
                location,
            ));
        }
        Rule::incdec_stmt => {
            let var = ident_of(stmt)?;
            out.push(step(Event::IncDec { var }, location));
        }
        Rule::use_stmt => {
            let refs = child(stmt, Rule::refs)?;
            for var in names(refs) {
                out.push(step(Event::Use { var }, location));
            }
        }
        Rule::deref_stmt => {
            let ptr = ident_of(stmt)?;
            out.push(step(Event::DereferenceRead { ptr }, location));
        }
        Rule::call_stmt => {
            let mut callee = String::new();
            let mut arg_refs = Vec::new();
            for part in stmt.into_inner() {
                match part.as_rule() {
                    Rule::ident => callee = part.as_str().to_string(),
                    Rule::refs => arg_refs = names(part),
                    _ => {}
                }
            }
            out.push(step(Event::Call { callee, arg_refs }, location));
        }
        Rule::if_stmt => {
            let mut arms = 0;
            for part in stmt.into_inner() {
                match part.as_rule() {
                    Rule::refs => {
                        for var in names(part) {
                            out.push(step(Event::Use { var }, location));
                        }
                    }
                    Rule::block => {
                        out.push(step(Event::EnterIf, location));
                        lower_block(part, out)?;
                        out.push(Step::new(Event::ExitBranch));
                        arms += 1;
                    }
                    Rule::else_clause => {
                        let block = child(part, Rule::block)?;
                        out.push(Step::new(Event::EnterElse));
                        lower_block(block, out)?;
                        out.push(Step::new(Event::ExitBranch));
                        arms += 1;
                    }
                    _ => {}
                }
            }
            if arms > 0 {
                out.push(Step::new(Event::ExitIf));
            }
        }
        Rule::while_stmt => {
            for part in stmt.into_inner() {
                match part.as_rule() {
                    Rule::refs => {
                        for var in names(part) {
                            out.push(step(Event::Use { var }, location));
                        }
                    }
                    Rule::block => {
                        out.push(step(Event::EnterLoopBody, location));
                        lower_block(part, out)?;
                        out.push(Step::new(Event::ExitLoop));
                    }
                    _ => {}
                }
            }
        }
        Rule::pointer_stmt => out.push(lower_pointer_stmt(stmt)?),
        _ => {}
    }

    Ok(())
}

/// Lowers `kind name [= init]`. Pointer initializers become pointer shapes after the declaration.
fn lower_declaration(pair: Pair<'_, Rule>, global: bool) -> Result<Vec<Step>> {
    let (line, column) = pair.as_span().start_pos().line_col();
    let location = location_of(&pair);
    let mut is_pointer = false;
    let mut var = String::new();
    let mut init: Option<Pair<'_, Rule>> = None;

    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::kind => {
                is_pointer = part
                    .into_inner()
                    .next()
                    .is_some_and(|kw| kw.as_rule() == Rule::kw_ptr);
            }
            Rule::ident => var = part.as_str().to_string(),
            Rule::initializer => init = part.into_inner().next(),
            _ => {}
        }
    }

    let invalid = |message: String| TraceError::Invalid {
        line,
        column,
        message,
    };

    let mut steps = Vec::new();
    let mut init_refs = Vec::new();
    let mut after = None;

    if let Some(init) = init {
        match (init.as_rule(), is_pointer) {
            (Rule::refs, false) => init_refs = names(init),
            (Rule::refs, true) => {
                let mut sources = names(init).into_iter();
                match (sources.next(), sources.next()) {
                    (Some(src), None) => {
                        after = Some(Event::PointerCopy {
                            dst: var.clone(),
                            src,
                        })
                    }
                    _ => {
                        return Err(invalid(format!(
                            "pointer `{}` must be initialized from exactly one pointer",
                            var
                        )))
                    }
                }
            }
            (Rule::address, true) => {
                after = Some(Event::AddressOf {
                    ptr: var.clone(),
                    target: ident_of(init)?,
                })
            }
            (Rule::load, true) => {
                after = Some(Event::PointerLoad {
                    dst: var.clone(),
                    src: ident_of(init)?,
                })
            }
            (Rule::load, false) if !global => {
                steps.push(step(
                    Event::DereferenceRead {
                        ptr: ident_of(init)?,
                    },
                    location,
                ));
            }
            (Rule::load, false) => {
                return Err(invalid(format!(
                    "global `{}` cannot be initialized through a dereference",
                    var
                )))
            }
            _ => {
                return Err(invalid(format!(
                    "`{}` is not a pointer and cannot hold an address",
                    var
                )))
            }
        }
    }

    steps.push(step(
        Event::Declare {
            var,
            is_pointer,
            init_refs,
        },
        location,
    ));
    if let Some(event) = after {
        steps.push(step(event, location));
    }
    Ok(steps)
}

fn lower_pointer_stmt(pair: Pair<'_, Rule>) -> Result<Step> {
    let location = location_of(&pair);
    let mut inner = pair.into_inner();

    let target = inner.next().ok_or_else(|| missing("pointer target"))?;
    let through = target.clone().into_inner().any(|p| p.as_rule() == Rule::star);
    let dst = ident_of(target)?;

    let source = inner
        .next()
        .and_then(|p| p.into_inner().next())
        .ok_or_else(|| missing("pointer source"))?;

    let event = match (through, source.as_rule()) {
        (false, Rule::address) => Event::AddressOf {
            ptr: dst,
            target: ident_of(source)?,
        },
        (false, Rule::load) => Event::PointerLoad {
            dst,
            src: ident_of(source)?,
        },
        (false, _) => Event::PointerCopy {
            dst,
            src: source.as_str().to_string(),
        },
        (true, Rule::address) => Event::PointerStoreAddr {
            dst_ptr: dst,
            target: ident_of(source)?,
        },
        (true, Rule::load) => Event::PointerStoreLoad {
            dst_ptr: dst,
            src_ptr: ident_of(source)?,
        },
        (true, _) => Event::PointerStoreCopy {
            dst_ptr: dst,
            src: source.as_str().to_string(),
        },
    };

    Ok(step(event, location))
}

fn step(event: Event, location: Option<SourceLocation>) -> Step {
    Step { event, location }
}

fn names(refs: Pair<'_, Rule>) -> Vec<String> {
    refs.into_inner()
        .filter(|p| p.as_rule() == Rule::ident)
        .map(|p| p.as_str().to_string())
        .collect()
}

fn ident_of(pair: Pair<'_, Rule>) -> Result<String> {
    pair.into_inner()
        .find(|p| p.as_rule() == Rule::ident)
        .map(|p| p.as_str().to_string())
        .ok_or_else(|| missing("identifier"))
}

fn child(pair: Pair<'_, Rule>, rule: Rule) -> Result<Pair<'_, Rule>> {
    let (line, column) = pair.as_span().start_pos().line_col();
    pair.into_inner()
        .find(|p| p.as_rule() == rule)
        .ok_or_else(|| TraceError::Invalid {
            line,
            column,
            message: format!("expected {:?}", rule),
        })
}

fn location_of(pair: &Pair<'_, Rule>) -> Option<SourceLocation> {
    let loc = pair
        .clone()
        .into_inner()
        .find(|p| p.as_rule() == Rule::location)?;
    let mut numbers = loc.into_inner().filter_map(|n| n.as_str().parse::<u32>().ok());
    match (numbers.next(), numbers.next()) {
        (Some(line), Some(column)) => Some(SourceLocation::new(line, column)),
        _ => None,
    }
}

fn missing(what: &str) -> TraceError {
    TraceError::Invalid {
        line: 0,
        column: 0,
        message: format!("missing {}", what),
    }
}

#[cfg(test)]
mod tests {
    use crate::parse_unit;
    use freshcheck_core::{Event, Param, SourceLocation, Step};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_lowers_globals() {
        let unit = parse_unit("global var a\nglobal var b = a, 3\nglobal ptr c = &b\n").unwrap();
        assert_eq!(
            unit.globals,
            vec![
                Step::new(Event::declare("a", &[])),
                Step::new(Event::declare("b", &["a"])),
                Step::new(Event::declare_pointer("c")),
                Step::new(Event::address_of("c", "b")),
            ]
        );
    }

    #[test]
    fn test_lowers_statements_with_locations() {
        let input = "fn main(x, *p) {\n    decl var t = x @2:5\n    set t += x\n    inc t\n    use t, x @5:5\n}\n";
        let unit = parse_unit(input).unwrap();
        let main = &unit.functions[0];

        assert_eq!(main.params, vec![Param::new("x"), Param::pointer("p")]);
        assert_eq!(
            main.body,
            vec![
                Step::at(Event::declare("t", &["x"]), 2, 5),
                Step::new(Event::compound_assign("t", &["x"])),
                Step::new(Event::inc_dec("t")),
                Step::at(Event::use_var("t"), 5, 5),
                Step::at(Event::use_var("x"), 5, 5),
            ]
        );
    }

    #[test]
    fn test_if_else_brackets_arms() {
        let input = "fn f(c) {\n    if c {\n        set c = 1\n    } else {\n        dec c\n    }\n}\n";
        let unit = parse_unit(input).unwrap();
        let events: Vec<Event> = unit.functions[0]
            .body
            .iter()
            .map(|s| s.event.clone())
            .collect();

        assert_eq!(
            events,
            vec![
                Event::use_var("c"),
                Event::EnterIf,
                Event::assign("c", &[]),
                Event::ExitBranch,
                Event::EnterElse,
                Event::inc_dec("c"),
                Event::ExitBranch,
                Event::ExitIf,
            ]
        );
    }

    #[test]
    fn test_while_is_a_single_arm() {
        let unit = parse_unit("fn f(n) {\n    while n @2:5 {\n        dec n\n    }\n}\n").unwrap();
        let body = &unit.functions[0].body;

        assert_eq!(body[0], Step::at(Event::use_var("n"), 2, 5));
        assert_eq!(body[1], Step::at(Event::EnterLoopBody, 2, 5));
        assert_eq!(body[3].event, Event::ExitLoop);
    }

    #[test]
    fn test_all_six_pointer_shapes() {
        let input = "fn f() {\n    p = &x\n    q = p\n    r = *pp\n    *p = &y\n    *p = q\n    *p = *q\n}\n";
        let unit = parse_unit(input).unwrap();
        let events: Vec<Event> = unit.functions[0]
            .body
            .iter()
            .map(|s| s.event.clone())
            .collect();

        assert_eq!(
            events,
            vec![
                Event::address_of("p", "x"),
                Event::pointer_copy("q", "p"),
                Event::PointerLoad {
                    dst: "r".to_string(),
                    src: "pp".to_string(),
                },
                Event::PointerStoreAddr {
                    dst_ptr: "p".to_string(),
                    target: "y".to_string(),
                },
                Event::PointerStoreCopy {
                    dst_ptr: "p".to_string(),
                    src: "q".to_string(),
                },
                Event::PointerStoreLoad {
                    dst_ptr: "p".to_string(),
                    src_ptr: "q".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_value_read_through_pointer() {
        let unit = parse_unit("fn f() {\n    decl var v = *p @2:5\n}\n").unwrap();
        assert_eq!(
            unit.functions[0].body,
            vec![
                Step::at(Event::deref("p"), 2, 5),
                Step::at(Event::declare("v", &[]), 2, 5),
            ]
        );
    }

    #[test]
    fn test_address_into_plain_variable_is_invalid() {
        let err = parse_unit("fn f() {\n    decl var v = &x\n}\n").unwrap_err();
        assert!(err.to_string().contains("not a pointer"));
    }

    #[test]
    fn test_call_arguments() {
        let unit = parse_unit("fn f() {\n    call g(a, 1, b) @2:5\n}\n").unwrap();
        assert_eq!(
            unit.functions[0].body[0],
            Step::at(Event::call("g", &["a", "b"]), 2, 5)
        );
        assert_eq!(unit.functions[0].body[0].location, Some(SourceLocation::new(2, 5)));
    }
}
