//! Symbol pattern definitions
//!
//! A pattern names a symbol series and the template that renders it, e.g.
//!
//! ```yaml
//! patterns:
//!   - name: Main Committee Drafts
//!     template: "A/C.{committee}/{session}/L.{number}"
//!     session: 80
//!     committee: [1, 2, 3, 4, 5, 6]
//! ```
//!
//! Every key besides `name`, `template` and `start` is a variable: a scalar
//! substitutes a fixed value, a list expands combinatorially at each
//! sequence number. Patterns are validated when loaded, so a [`Pattern`]
//! can always render its template.

use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::collections::HashSet;
use std::path::Path;
use undocs_common::{Error, Result};

/// Placeholder bound to the sequence number
pub const NUMBER_PLACEHOLDER: &str = "number";

const RESERVED_KEYS: [&str; 4] = ["name", "template", "start", NUMBER_PLACEHOLDER];

#[derive(Debug, Clone, PartialEq, Eq)]
enum TemplatePart {
    Literal(String),
    Placeholder(String),
}

/// Parsed `{name}`-style template; `{{` and `}}` are literal braces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    parts: Vec<TemplatePart>,
}

impl Template {
    pub fn parse(source: &str) -> std::result::Result<Self, String> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('{') | None => {
                                return Err(format!("unclosed placeholder in '{}'", source))
                            }
                            Some(ch) => name.push(ch),
                        }
                    }
                    let name = name.trim().to_string();
                    if name.is_empty() {
                        return Err(format!("empty placeholder in '{}'", source));
                    }
                    if name.contains(':') || name.contains('!') {
                        return Err(format!(
                            "format specification in placeholder '{{{}}}' is not supported",
                            name
                        ));
                    }
                    if !literal.is_empty() {
                        parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
                    }
                    parts.push(TemplatePart::Placeholder(name));
                }
                '}' => return Err(format!("unmatched '}}' in '{}'", source)),
                ch => literal.push(ch),
            }
        }

        if !literal.is_empty() {
            parts.push(TemplatePart::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            parts,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Placeholder names in order of appearance (may repeat)
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|p| match p {
            TemplatePart::Placeholder(name) => Some(name.as_str()),
            TemplatePart::Literal(_) => None,
        })
    }

    /// Render with `lookup` resolving each placeholder.
    ///
    /// Returns `None` if a placeholder is unbound.
    pub fn render<'a, F>(&self, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let mut out = String::with_capacity(self.source.len() + 8);
        for part in &self.parts {
            match part {
                TemplatePart::Literal(text) => out.push_str(text),
                TemplatePart::Placeholder(name) => out.push_str(lookup(name)?),
            }
        }
        Some(out)
    }
}

/// Value bound to a pattern variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variable {
    Scalar(String),
    List(Vec<String>),
}

impl Variable {
    pub fn scalar(value: impl ToString) -> Self {
        Variable::Scalar(value.to_string())
    }

    pub fn list<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        Variable::List(values.into_iter().map(|v| v.to_string()).collect())
    }
}

/// A validated symbol series definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    name: String,
    template: Template,
    start: u64,
    scalars: Vec<(String, String)>,
    lists: Vec<(String, Vec<String>)>,
}

impl Pattern {
    /// Build and validate a pattern. Variable order is declaration order.
    pub fn from_parts(
        name: impl Into<String>,
        template: &str,
        start: u64,
        variables: Vec<(String, Variable)>,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::pattern(name, "name must not be empty"));
        }
        // The name doubles as a directory under the PDF root
        if name.contains(['/', '\\']) || name.contains("..") {
            return Err(Error::pattern(
                name,
                "name must not contain path separators or '..'",
            ));
        }
        let template = Template::parse(template).map_err(|reason| Error::pattern(&name, reason))?;

        let mut scalars = Vec::new();
        let mut lists = Vec::new();
        let mut declared = HashSet::new();

        for (key, value) in variables {
            if RESERVED_KEYS.contains(&key.as_str()) {
                return Err(Error::pattern(
                    &name,
                    format!("'{}' is reserved and cannot be a variable", key),
                ));
            }
            if !declared.insert(key.clone()) {
                return Err(Error::pattern(&name, format!("variable '{}' declared twice", key)));
            }
            match value {
                Variable::Scalar(v) => scalars.push((key, v)),
                Variable::List(values) if values.is_empty() => {
                    return Err(Error::pattern(&name, format!("list variable '{}' is empty", key)))
                }
                Variable::List(values) => lists.push((key, values)),
            }
        }

        for placeholder in template.placeholders() {
            if placeholder != NUMBER_PLACEHOLDER && !declared.contains(placeholder) {
                return Err(Error::pattern(
                    &name,
                    format!("placeholder '{{{}}}' has no bound variable", placeholder),
                ));
            }
        }

        Ok(Self {
            name,
            template,
            start,
            scalars,
            lists,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    /// First sequence number of the series
    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn scalars(&self) -> &[(String, String)] {
        &self.scalars
    }

    pub fn lists(&self) -> &[(String, Vec<String>)] {
        &self.lists
    }

    pub fn has_lists(&self) -> bool {
        !self.lists.is_empty()
    }

    /// Same pattern, resumed at `start`
    pub fn with_start(&self, start: u64) -> Self {
        Self {
            start,
            ..self.clone()
        }
    }

    /// Directory name for this pattern's documents (spaces → `_`)
    pub fn directory_name(&self) -> String {
        self.name.replace(' ', "_")
    }
}

#[derive(Debug, Deserialize)]
struct PatternFile {
    #[serde(default)]
    patterns: Vec<RawPattern>,
}

#[derive(Debug, Deserialize)]
struct RawPattern {
    name: String,
    template: String,
    #[serde(default)]
    start: Option<u64>,
    #[serde(flatten)]
    variables: Mapping,
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl RawPattern {
    fn into_pattern(self) -> Result<Pattern> {
        let mut variables = Vec::with_capacity(self.variables.len());

        for (key, value) in &self.variables {
            let key = key
                .as_str()
                .ok_or_else(|| Error::pattern(&self.name, "variable names must be strings"))?
                .to_string();

            let variable = match value {
                Value::Sequence(items) => {
                    let values = items
                        .iter()
                        .map(scalar_to_string)
                        .collect::<Option<Vec<_>>>()
                        .ok_or_else(|| {
                            Error::pattern(
                                &self.name,
                                format!("list variable '{}' must contain only scalars", key),
                            )
                        })?;
                    Variable::List(values)
                }
                other => Variable::Scalar(scalar_to_string(other).ok_or_else(|| {
                    Error::pattern(
                        &self.name,
                        format!("variable '{}' must be a scalar or a list of scalars", key),
                    )
                })?),
            };
            variables.push((key, variable));
        }

        Pattern::from_parts(self.name, &self.template, self.start.unwrap_or(1), variables)
    }
}

/// Parse and validate a YAML pattern document
pub fn parse_patterns(yaml: &str) -> Result<Vec<Pattern>> {
    let file: PatternFile = serde_yaml::from_str(yaml)?;
    let mut names = HashSet::new();
    let mut patterns = Vec::with_capacity(file.patterns.len());

    for raw in file.patterns {
        let pattern = raw.into_pattern()?;
        if !names.insert(pattern.name().to_string()) {
            return Err(Error::pattern(pattern.name(), "duplicate pattern name"));
        }
        patterns.push(pattern);
    }

    Ok(patterns)
}

/// Load patterns from a YAML file; a missing file is a configuration error
pub fn load_patterns(path: &Path) -> Result<Vec<Pattern>> {
    if !path.exists() {
        return Err(Error::Config(format!(
            "Pattern file not found: {}",
            path.display()
        )));
    }
    let content = std::fs::read_to_string(path)?;
    let patterns = parse_patterns(&content)?;
    tracing::info!(
        path = %path.display(),
        count = patterns.len(),
        "Loaded symbol patterns"
    );
    Ok(patterns)
}
