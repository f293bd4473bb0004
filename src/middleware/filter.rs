use regex::Regex;

use crate::error::{ObservatoryError, Result};

/// Compiled include/exclude globs.
///
/// `*` matches within one path segment, `**` matches across segments.
/// A pattern also matches a path that equals it literally.
#[derive(Debug, Clone)]
pub struct PathFilter {
    include: Vec<Glob>,
    exclude: Vec<Glob>,
}

#[derive(Debug, Clone)]
struct Glob {
    raw: String,
    regex: Regex,
}

impl Glob {
    fn compile(pattern: &str) -> Result<Self> {
        let mut source = String::with_capacity(pattern.len() + 8);
        source.push('^');
        for (i, literal) in pattern.split("**").enumerate() {
            if i > 0 {
                source.push_str(".*");
            }
            for (j, part) in literal.split('*').enumerate() {
                if j > 0 {
                    source.push_str("[^/]*");
                }
                source.push_str(&regex::escape(part));
            }
        }
        source.push('$');

        let regex = Regex::new(&source).map_err(|source| ObservatoryError::InvalidGlob {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            raw: pattern.to_string(),
            regex,
        })
    }

    fn matches(&self, path: &str) -> bool {
        self.raw == path || self.regex.is_match(path)
    }
}

impl PathFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        let compile = |patterns: &[String]| {
            patterns
                .iter()
                .map(|p| Glob::compile(p))
                .collect::<Result<Vec<_>>>()
        };
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }

    /// Excluded paths lose; a non-empty include list must match; otherwise track.
    pub fn should_track(&self, path: &str) -> bool {
        if matches_any(path, &self.exclude) {
            return false;
        }
        if !self.include.is_empty() {
            return matches_any(path, &self.include);
        }
        true
    }
}

fn matches_any(path: &str, globs: &[Glob]) -> bool {
    globs.iter().any(|g| g.matches(path))
}
