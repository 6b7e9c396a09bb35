use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Assignment(Assignment),
    FunctionDef(FunctionDef),
    FunctionInvocation(FunctionInvocation),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub identifier: String,
    pub selection: Selection,
}

/// `def name` followed by its body. Bodies hold assignments and invocations only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    pub identifier: String,
    pub body: Vec<Statement>,
    pub returns: ReturnSpec,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionInvocation {
    pub identifiers: Vec<String>,
    pub function_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnSpec {
    pub names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub selector: String,
    pub range: Range,
    pub attributes: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Range {
    pub start: Option<usize>,
    pub end: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeMode {
    Whole,
    Index(usize),
    From(usize),
    Slice(usize, usize),
}

impl Range {
    pub fn whole() -> Self {
        Self::default()
    }

    pub fn index(index: usize) -> Self {
        Self {
            start: Some(index),
            end: Some(index),
        }
    }

    pub fn open_ended(start: usize) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    pub fn slice(start: usize, end: usize) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn mode(&self) -> RangeMode {
        match (self.start, self.end) {
            (None, _) => RangeMode::Whole,
            (Some(start), Some(end)) if start == end => RangeMode::Index(start),
            (Some(start), None) => RangeMode::From(start),
            (Some(start), Some(end)) => RangeMode::Slice(start, end),
        }
    }
}

// Canonical source rendering, used by `munge fmt`.

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, statement) in self.statements.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
                if matches!(statement, Statement::FunctionDef(_))
                    || matches!(self.statements[i - 1], Statement::FunctionDef(_))
                {
                    writeln!(f)?;
                }
            }
            write!(f, "{}", statement)?;
        }
        if !self.statements.is_empty() {
            writeln!(f)?;
        }
        Ok(())
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Assignment(assignment) => {
                write!(f, "{} = {}", assignment.identifier, assignment.selection)
            }
            Statement::FunctionDef(function) => {
                writeln!(f, "def {}", function.identifier)?;
                for statement in &function.body {
                    writeln!(f, "  {}", statement)?;
                }
                write!(f, "  return {}", function.returns)
            }
            Statement::FunctionInvocation(invocation) => write!(
                f,
                "{} = do {}",
                invocation.identifiers.join(", "),
                invocation.function_name
            ),
        }
    }
}

impl fmt::Display for ReturnSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.names.join(", "))
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.selector)?;
        if let Some(attributes) = &self.attributes {
            write!(f, " {{{}}}", attributes.join(", "))?;
        }
        match self.range.mode() {
            RangeMode::Whole => Ok(()),
            RangeMode::Index(index) => write!(f, " ({})", index),
            RangeMode::From(start) => write!(f, " ({},)", start),
            RangeMode::Slice(start, end) => write!(f, " ({}, {})", start, end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_modes() {
        assert_eq!(Range::whole().mode(), RangeMode::Whole);
        assert_eq!(Range::index(3).mode(), RangeMode::Index(3));
        assert_eq!(Range::open_ended(2).mode(), RangeMode::From(2));
        assert_eq!(Range::slice(0, 4).mode(), RangeMode::Slice(0, 4));
    }

    #[test]
    fn renders_canonical_source() {
        let program = Program {
            statements: vec![
                Statement::FunctionDef(FunctionDef {
                    identifier: "f".to_string(),
                    body: vec![Statement::Assignment(Assignment {
                        identifier: "x".to_string(),
                        selection: Selection {
                            selector: "#viewport".to_string(),
                            range: Range::whole(),
                            attributes: None,
                        },
                    })],
                    returns: ReturnSpec {
                        names: vec!["x".to_string()],
                    },
                }),
                Statement::FunctionInvocation(FunctionInvocation {
                    identifiers: vec!["a".to_string()],
                    function_name: "f".to_string(),
                }),
                Statement::Assignment(Assignment {
                    identifier: "links".to_string(),
                    selection: Selection {
                        selector: "a.social".to_string(),
                        range: Range::open_ended(1),
                        attributes: Some(vec!["href".to_string(), "text".to_string()]),
                    },
                }),
            ],
        };

        assert_eq!(
            program.to_string(),
            "def f\n  x = #viewport\n  return {x}\n\na = do f\nlinks = a.social {href, text} (1,)\n"
        );
    }
}
