//! Resource URI resolution.
//!
//! Literal URIs always win. Templates are tried in registration order and the
//! first full match is returned together with its captured parameters.

use crate::error::{Category, RegistryError, RegistryResult};
use crate::registry::handler::UriParams;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::trace;

/// Valid placeholder names.
static PARAM_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Invalid regex: placeholder name pattern")
});

/// Pattern a placeholder expands to: one or more non-separator characters.
const PLACEHOLDER_PATTERN: &str = "([^/]+)";

/// A compiled `{param}` URI template.
#[derive(Debug, Clone)]
pub struct UriTemplate {
    template: String,
    pattern: Regex,
    params: Vec<String>,
}

impl UriTemplate {
    pub fn parse(template: &str) -> RegistryResult<Self> {
        let invalid = |reason: &'static str| RegistryError::InvalidTemplate {
            template: template.to_string(),
            reason: reason.into(),
        };

        let mut pattern = String::from("^");
        let mut params: Vec<String> = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars();

        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('{') => return Err(invalid("nested '{'")),
                            Some(c) => name.push(c),
                            None => return Err(invalid("unterminated placeholder")),
                        }
                    }
                    if !PARAM_NAME.is_match(&name) {
                        return Err(invalid("placeholder name must be an identifier"));
                    }
                    if params.contains(&name) {
                        return Err(invalid("duplicate placeholder name"));
                    }
                    pattern.push_str(&regex::escape(&literal));
                    literal.clear();
                    pattern.push_str(PLACEHOLDER_PATTERN);
                    params.push(name);
                }
                '}' => return Err(invalid("unmatched '}'")),
                c => literal.push(c),
            }
        }

        if params.is_empty() {
            return Err(invalid("template has no placeholders"));
        }

        pattern.push_str(&regex::escape(&literal));
        pattern.push('$');

        let pattern = Regex::new(&pattern).map_err(|_| invalid("template does not compile"))?;
        Ok(Self {
            template: template.to_string(),
            pattern,
            params,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Match the full `uri`, returning the captured parameters.
    pub fn matches(&self, uri: &str) -> Option<UriParams> {
        let captures = self.pattern.captures(uri)?;
        Some(
            self.params
                .iter()
                .enumerate()
                .filter_map(|(i, name)| {
                    captures
                        .get(i + 1)
                        .map(|m| (name.clone(), m.as_str().to_string()))
                })
                .collect(),
        )
    }
}

/// Which registry entry a URI resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// `Category::Resource` for literal hits, `Category::ResourceTemplate` otherwise.
    pub category: Category,
    /// Registry key: the literal URI or the template string.
    pub key: String,
    pub params: UriParams,
}

/// Matches URIs against literal resources, then templates.
#[derive(Debug, Default)]
pub struct UriResolver {
    literals: HashSet<String>,
    templates: Vec<UriTemplate>,
}

impl UriResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_literal(&mut self, uri: impl Into<String>) {
        self.literals.insert(uri.into());
    }

    pub fn add_template(&mut self, template: UriTemplate) {
        self.templates.push(template);
    }

    pub fn resolve(&self, uri: &str) -> RegistryResult<Resolution> {
        if self.literals.contains(uri) {
            trace!(uri, "Resolved literal resource");
            return Ok(Resolution {
                category: Category::Resource,
                key: uri.to_string(),
                params: UriParams::new(),
            });
        }

        for template in &self.templates {
            if let Some(params) = template.matches(uri) {
                trace!(uri, template = template.as_str(), "Resolved resource template");
                return Ok(Resolution {
                    category: Category::ResourceTemplate,
                    key: template.as_str().to_string(),
                    params,
                });
            }
        }

        Err(RegistryError::NotFound {
            category: Category::Resource,
            key: uri.to_string(),
        })
    }
}
