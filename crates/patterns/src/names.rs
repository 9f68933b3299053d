use ir::FileAst;
use std::collections::HashMap;

fn last_segment(name: &str) -> &str {
    let name = name.trim_start_matches('\\');
    name.rsplit('\\').next().unwrap_or(name)
}

/// Recognizes facade and class names, optionally through the `use ... as`
/// aliases of one file.
///
/// Resolution is best effort: names reached through variables, string class
/// names or re-exported facades are not followed.
#[derive(Debug, Clone, Default)]
pub struct NameResolver {
    // lowercase short name -> name as configured
    known: HashMap<String, String>,
    // lowercase alias -> configured name it stands for
    aliases: HashMap<String, String>,
}

impl NameResolver {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let known = names
            .into_iter()
            .map(|n| {
                let short = last_segment(n.as_ref()).to_string();
                (short.to_ascii_lowercase(), short)
            })
            .collect();
        Self {
            known,
            aliases: HashMap::new(),
        }
    }

    /// Adds `(alias, full path)` imports whose last path segment is a known
    /// name.
    pub fn with_imports(mut self, imports: &[(String, String)]) -> Self {
        for (alias, path) in imports {
            let target = last_segment(path).to_ascii_lowercase();
            if let Some(canonical) = self.known.get(&target) {
                self.aliases
                    .insert(alias.to_ascii_lowercase(), canonical.clone());
            }
        }
        self
    }

    pub fn for_file<I, S>(names: I, ast: &FileAst) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(names).with_imports(&ast.imports())
    }

    /// Configured name that `class` refers to, if any.
    pub fn resolve(&self, class: &str) -> Option<&str> {
        let short = last_segment(class).to_ascii_lowercase();
        self.known
            .get(&short)
            .or_else(|| self.aliases.get(&short))
            .map(String::as_str)
    }

    pub fn is_known(&self, class: &str) -> bool {
        self.resolve(class).is_some()
    }

    /// Whether `class` resolves to the configured name `expected`.
    pub fn matches(&self, class: &str, expected: &str) -> bool {
        self.resolve(class)
            .is_some_and(|r| r.eq_ignore_ascii_case(last_segment(expected)))
    }
}
