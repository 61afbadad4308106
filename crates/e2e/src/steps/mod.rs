//! Step definitions and step matching
//!
//! A step definition pairs a cucumber-style expression with an async handler.
//! Expressions compile to anchored regexes; `{string}`, `{int}`, `{float}`
//! and `{word}` become capture groups handed to the handler as `StepArgs`.
//! Keywords do not take part in matching.

use std::fmt;
use std::str::FromStr;

use futures::future::BoxFuture;
use regex::Regex;
use tracing::debug;

use crate::error::{E2eError, E2eResult};
use crate::spec::StepSpec;
use crate::world::World;

mod api;
mod ui;

pub type StepFuture<'w> = BoxFuture<'w, E2eResult<()>>;

/// Handler signature: borrow the world for the duration of the step
pub type StepFn = for<'w> fn(&'w mut World, StepArgs) -> StepFuture<'w>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Given,
    When,
    Then,
    /// Usable under any keyword
    Any,
}

/// Parameters captured from the step text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepArgs {
    values: Vec<String>,
}

impl StepArgs {
    pub fn new(values: Vec<String>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn str(&self, index: usize) -> E2eResult<&str> {
        self.values
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| E2eError::StepFailed {
                step: format!("argument {}", index),
                reason: format!("step captured only {} argument(s)", self.values.len()),
            })
    }

    pub fn parse<T>(&self, index: usize) -> E2eResult<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let raw = self.str(index)?;
        raw.trim().parse().map_err(|e: T::Err| E2eError::StepFailed {
            step: format!("argument {}", index),
            reason: format!("'{}' is not valid: {}", raw, e),
        })
    }
}

struct StepDefinition {
    kind: StepKind,
    expression: String,
    pattern: Regex,
    handler: StepFn,
}

/// Registered step definitions
#[derive(Default)]
pub struct StepRegistry {
    definitions: Vec<StepDefinition>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the Toolshop API and UI steps
    pub fn toolshop() -> E2eResult<Self> {
        let mut registry = Self::new();
        api::register(&mut registry)?;
        ui::register(&mut registry)?;
        Ok(registry)
    }

    pub fn given(&mut self, expression: &str, handler: StepFn) -> E2eResult<&mut Self> {
        self.step(StepKind::Given, expression, handler)
    }

    pub fn when(&mut self, expression: &str, handler: StepFn) -> E2eResult<&mut Self> {
        self.step(StepKind::When, expression, handler)
    }

    pub fn then(&mut self, expression: &str, handler: StepFn) -> E2eResult<&mut Self> {
        self.step(StepKind::Then, expression, handler)
    }

    pub fn step(
        &mut self,
        kind: StepKind,
        expression: &str,
        handler: StepFn,
    ) -> E2eResult<&mut Self> {
        let pattern = compile_expression(expression)?;
        self.definitions.push(StepDefinition {
            kind,
            expression: expression.to_string(),
            pattern,
            handler,
        });
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Registered expressions with their keyword
    pub fn expressions(&self) -> impl Iterator<Item = (StepKind, &str)> {
        self.definitions
            .iter()
            .map(|d| (d.kind, d.expression.as_str()))
    }

    fn find(&self, text: &str) -> E2eResult<(&StepDefinition, StepArgs)> {
        let mut matches = self
            .definitions
            .iter()
            .filter_map(|definition| {
                definition
                    .pattern
                    .captures(text)
                    .map(|captures| (definition, captures))
            })
            .collect::<Vec<_>>();

        match matches.len() {
            0 => Err(E2eError::UndefinedStep(text.to_string())),
            1 => {
                let (definition, captures) = matches.remove(0);
                let values = captures
                    .iter()
                    .skip(1)
                    .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
                    .collect();
                Ok((definition, StepArgs::new(values)))
            }
            _ => Err(E2eError::AmbiguousStep {
                step: text.to_string(),
                patterns: matches
                    .iter()
                    .map(|(d, _)| d.expression.clone())
                    .collect(),
            }),
        }
    }

    /// Captured arguments for `text`, or why it does not resolve
    pub fn match_text(&self, text: &str) -> E2eResult<StepArgs> {
        self.find(text).map(|(_, args)| args)
    }

    /// Run the single definition matching the step
    pub async fn run(&self, world: &mut World, step: &StepSpec) -> E2eResult<()> {
        let (definition, args) = self.find(&step.text)?;
        debug!("{} -> '{}' {:?}", step, definition.expression, args);
        (definition.handler)(world, args).await
    }
}

impl fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepRegistry")
            .field("definitions", &self.definitions.len())
            .finish()
    }
}

/// Translate a cucumber expression into an anchored regex
fn compile_expression(expression: &str) -> E2eResult<Regex> {
    let placeholder = Regex::new(r"\{(\w*)\}")?;
    let mut pattern = String::from("^");
    let mut last = 0;

    for found in placeholder.captures_iter(expression) {
        let (Some(whole), Some(name)) = (found.get(0), found.get(1)) else {
            continue;
        };
        pattern.push_str(&regex::escape(&expression[last..whole.start()]));
        pattern.push_str(match name.as_str() {
            "string" => r#""([^"]*)""#,
            "int" => r"(-?\d+)",
            "float" => r"(-?\d+(?:\.\d+)?)",
            "word" => r"(\S+)",
            "" => r"(.*)",
            other => {
                return Err(E2eError::Config(format!(
                    "Unknown parameter type {{{}}} in step '{}'",
                    other, expression
                )))
            }
        });
        last = whole.end();
    }
    pattern.push_str(&regex::escape(&expression[last..]));
    pattern.push('$');

    Ok(Regex::new(&pattern)?)
}
