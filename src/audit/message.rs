//! Audit message rendering
//!
//! A message code names a template; `{0}`, `{1}`, ... placeholders are
//! replaced by the rendered variables in order.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Source of message templates
pub trait MessageSource: Send + Sync {
    /// Template registered for a code, if any
    fn template(&self, code: &str) -> Option<String>;

    /// Render a code with positional arguments
    ///
    /// An unknown code is used as the template itself. Placeholders without
    /// a matching argument are left as they are.
    fn render(&self, code: &str, args: &[String]) -> String {
        let template = self.template(code).unwrap_or_else(|| code.to_string());
        substitute(&template, args)
    }
}

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{(\d+)\}").expect("static pattern"))
}

/// Replace `{n}` placeholders with `args[n]`
pub fn substitute(template: &str, args: &[String]) -> String {
    placeholder()
        .replace_all(template, |caps: &Captures<'_>| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|index| args.get(index))
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// In-memory template registry
#[derive(Debug, Clone, Default)]
pub struct TemplateMessages {
    templates: HashMap<String, String>,
}

impl TemplateMessages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template, replacing any previous one for the code
    pub fn register(&mut self, code: impl Into<String>, template: impl Into<String>) -> &mut Self {
        self.templates.insert(code.into(), template.into());
        self
    }

    pub fn with(mut self, code: impl Into<String>, template: impl Into<String>) -> Self {
        self.register(code, template);
        self
    }
}

impl MessageSource for TemplateMessages {
    fn template(&self, code: &str) -> Option<String> {
        self.templates.get(code).cloned()
    }
}
