use std::collections::{BTreeMap, HashMap};

use serde::{Serialize, Serializer};
use tracing::debug;

use crate::{
    ast::{FunctionDef, FunctionInvocation, Program, RangeMode, Selection, Statement},
    document::{Document, Node},
    error::{MungeResult, RuntimeError},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Value<N> {
    Null,
    Node(N),
    Text(String),
    List(Vec<Value<N>>),
}

impl<N> Value<N> {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_node(&self) -> Option<&N> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value<N>]> {
        match self {
            Value::List(values) => Some(values),
            _ => None,
        }
    }
}

/// Nodes serialize as their outer HTML.
impl<N: Node> Serialize for Value<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Node(node) => serializer.serialize_str(&node.outer_html()),
            Value::Text(text) => serializer.serialize_str(text),
            Value::List(values) => values.serialize(serializer),
        }
    }
}

/// Identifier bindings of one scope: the top level or a single function frame.
pub type Environment<N> = BTreeMap<String, Value<N>>;

enum Frame<N> {
    Pending,
    Evaluating,
    Done(Vec<Value<N>>),
}

struct FunctionEntry<'p, N> {
    definition: &'p FunctionDef,
    frame: Frame<N>,
}

/// Walks a program once against one document.
///
/// The function table and the cached invocation results live here, so each
/// run starts from nothing.
pub struct Executor<'p, 'd, D>
where
    D: Document + ?Sized + 'd,
{
    document: &'d D,
    functions: HashMap<&'p str, FunctionEntry<'p, D::Element<'d>>>,
}

/// Runs `program` against `document` and returns the top-level bindings.
pub fn run<'d, D>(program: &Program, document: &'d D) -> MungeResult<Environment<D::Element<'d>>>
where
    D: Document + ?Sized,
{
    Executor::new(document).run(program)
}

impl<'p, 'd, D> Executor<'p, 'd, D>
where
    D: Document + ?Sized + 'd,
{
    pub fn new(document: &'d D) -> Self {
        Self {
            document,
            functions: HashMap::new(),
        }
    }

    pub fn run(mut self, program: &'p Program) -> MungeResult<Environment<D::Element<'d>>> {
        let mut results = Environment::new();
        for statement in &program.statements {
            self.execute(statement, &mut results)?;
        }
        Ok(results)
    }

    fn execute(
        &mut self,
        statement: &'p Statement,
        env: &mut Environment<D::Element<'d>>,
    ) -> MungeResult<()> {
        match statement {
            Statement::Assignment(assignment) => {
                let value = self.select(&assignment.selection)?;
                env.insert(assignment.identifier.clone(), value);
            }
            Statement::FunctionDef(function) => self.define(function)?,
            Statement::FunctionInvocation(invocation) => self.invoke(invocation, env)?,
        }
        Ok(())
    }

    fn define(&mut self, function: &'p FunctionDef) -> MungeResult<()> {
        let name = function.identifier.as_str();
        if self.functions.contains_key(name) {
            return Err(RuntimeError::DuplicateFunction {
                name: name.to_string(),
            }
            .into());
        }

        debug!(function = name, "defined function");
        self.functions.insert(
            name,
            FunctionEntry {
                definition: function,
                frame: Frame::Pending,
            },
        );
        Ok(())
    }

    fn invoke(
        &mut self,
        invocation: &FunctionInvocation,
        env: &mut Environment<D::Element<'d>>,
    ) -> MungeResult<()> {
        let name = invocation.function_name.as_str();
        let values = self.evaluate(name)?;

        if invocation.identifiers.len() > values.len() {
            return Err(RuntimeError::Arity {
                function: name.to_string(),
                returned: values.len(),
                requested: invocation.identifiers.len(),
            }
            .into());
        }

        // Surplus return values are dropped.
        for (identifier, value) in invocation.identifiers.iter().zip(values) {
            env.insert(identifier.clone(), value);
        }
        Ok(())
    }

    /// The function's return values in declared order, evaluating its body on first use.
    fn evaluate(&mut self, name: &str) -> MungeResult<Vec<Value<D::Element<'d>>>> {
        let entry = self
            .functions
            .get_mut(name)
            .ok_or_else(|| RuntimeError::UndefinedFunction {
                name: name.to_string(),
            })?;

        match &entry.frame {
            Frame::Done(values) => {
                debug!(function = name, cached = true, "invoked function");
                return Ok(values.clone());
            }
            Frame::Evaluating => {
                return Err(RuntimeError::RecursiveInvocation {
                    name: name.to_string(),
                }
                .into())
            }
            Frame::Pending => {}
        }

        entry.frame = Frame::Evaluating;
        let definition = entry.definition;
        debug!(function = name, cached = false, "invoked function");

        let mut frame = Environment::new();
        for statement in &definition.body {
            self.execute(statement, &mut frame)?;
        }

        let values: Vec<_> = definition
            .returns
            .names
            .iter()
            .map(|name| frame.get(name).cloned().unwrap_or(Value::Null))
            .collect();

        if let Some(entry) = self.functions.get_mut(name) {
            entry.frame = Frame::Done(values.clone());
        }
        Ok(values)
    }

    fn select(&self, selection: &Selection) -> MungeResult<Value<D::Element<'d>>> {
        let selector = selection.selector.as_str();
        let attributes = selection.attributes.as_deref();
        let mode = selection.range.mode();
        debug!(selector, ?mode, "selecting");

        let value = match mode {
            RangeMode::Whole => match self.document.query(selector)? {
                Some(node) => project(node, attributes),
                None => Value::Null,
            },
            RangeMode::Index(index) => self
                .document
                .query_all(selector)?
                .into_iter()
                .nth(index)
                .map(|node| project(node, attributes))
                .unwrap_or(Value::Null),
            RangeMode::From(start) => Value::List(
                self.document
                    .query_all(selector)?
                    .into_iter()
                    .skip(start)
                    .map(|node| project(node, attributes))
                    .collect(),
            ),
            RangeMode::Slice(start, end) => Value::List(
                self.document
                    .query_all(selector)?
                    .into_iter()
                    .skip(start)
                    .take(end.saturating_sub(start))
                    .map(|node| project(node, attributes))
                    .collect(),
            ),
        };
        Ok(value)
    }
}

fn project<N: Node>(node: N, attributes: Option<&[String]>) -> Value<N> {
    match attributes {
        None | Some([]) => Value::Node(node),
        Some([name]) => resolve_attribute(&node, name),
        Some(names) => Value::List(
            names
                .iter()
                .map(|name| resolve_attribute(&node, name))
                .collect(),
        ),
    }
}

/// `text`, `html` and `outer` shadow real attributes of the same name.
fn resolve_attribute<N: Node>(node: &N, name: &str) -> Value<N> {
    match name {
        "text" => Value::Text(node.text()),
        "html" => Value::Text(node.inner_html()),
        "outer" => Value::Text(node.outer_html()),
        other => node.attribute(other).map(Value::Text).unwrap_or(Value::Null),
    }
}
