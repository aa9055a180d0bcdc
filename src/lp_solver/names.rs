//! Name bookkeeping for variables and constraints.
//!
//! Every entity carries two names: the model name chosen by the caller and the
//! export name handed to the solver. The export name depends on the
//! [`NamingStyle`] of the model. Both must be unique within their namespace.

use std::collections::HashSet;
use std::sync::Arc;

use lazy_static::*;
use regex::Regex;

use super::ModelError;

/// How entities are named in the solver-facing problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum NamingStyle {
    /// Export names are the model names with LP-unsafe characters replaced.
    #[default]
    #[value(name = "long")]
    UniqueLongNames,
    /// Export names are generated (`x<N>` for columns, `c<N>` for rows).
    #[value(name = "short")]
    ShortNames,
}

/// Make a name acceptable to LP-format readers.
///
/// Characters outside `[A-Za-z0-9_.]` become `_`, and a name starting with a
/// digit or a dot gets a leading underscore.
pub fn sanitize(name: &str) -> String {
    lazy_static! {
        static ref UNSAFE_RE: Regex = Regex::new(r"[^A-Za-z0-9_.]").unwrap();
    }

    let name = UNSAFE_RE.replace_all(name, "_");
    match name.chars().next() {
        Some(c) if c.is_ascii_digit() || c == '.' => format!("_{}", name),
        Some(_) => name.into_owned(),
        None => "_".to_string(),
    }
}

/// One namespace (columns or rows) of a model.
#[derive(Debug, Clone)]
pub(crate) struct NameRegistry {
    style: NamingStyle,
    short_prefix: char,
    names: HashSet<Arc<str>>,
    exported: HashSet<String>,
}

impl NameRegistry {
    pub(crate) fn new(style: NamingStyle, short_prefix: char) -> Self {
        Self {
            style,
            short_prefix,
            names: HashSet::new(),
            exported: HashSet::new(),
        }
    }

    fn export_name(&self, name: &str, index: usize) -> String {
        match self.style {
            NamingStyle::UniqueLongNames => sanitize(name),
            NamingStyle::ShortNames => format!("{}{}", self.short_prefix, index),
        }
    }

    /// Validate a batch of names that would receive consecutive indices
    /// starting at `first_index`, and register them only if all are free.
    ///
    /// Returns the export names in the same order.
    pub(crate) fn register_all(
        &mut self,
        names: &[Arc<str>],
        first_index: usize,
    ) -> Result<Vec<String>, ModelError> {
        let mut batch_names = HashSet::new();
        let mut batch_exported = HashSet::new();
        let mut exports = Vec::with_capacity(names.len());

        for (offset, name) in names.iter().enumerate() {
            let export = self.export_name(name, first_index + offset);
            if self.names.contains(name) || !batch_names.insert(name.clone()) {
                return Err(ModelError::DuplicateName(name.to_string()));
            }
            if self.exported.contains(&export) || !batch_exported.insert(export.clone()) {
                return Err(ModelError::DuplicateName(export));
            }
            exports.push(export);
        }

        self.names.extend(batch_names);
        self.exported.extend(batch_exported);
        Ok(exports)
    }

    pub(crate) fn register(&mut self, name: Arc<str>, index: usize) -> Result<String, ModelError> {
        let mut exports = self.register_all(&[name], index)?;
        Ok(exports.remove(0))
    }

    /// Export names a row occupies: its own, plus the `_lo`/`_hi` halves a
    /// ranged row is split into when written out.
    fn row_exports(&self, name: &str, index: usize, ranged: bool) -> Vec<String> {
        let export = self.export_name(name, index);
        if ranged {
            vec![format!("{}_lo", export), format!("{}_hi", export), export]
        } else {
            vec![export]
        }
    }

    /// Register a row name, reserving the split names of ranged rows
    ///
    /// Returns the export name of the row itself.
    pub(crate) fn register_row(
        &mut self,
        name: Arc<str>,
        index: usize,
        ranged: bool,
    ) -> Result<String, ModelError> {
        if self.names.contains(&name) {
            return Err(ModelError::DuplicateName(name.to_string()));
        }
        let mut exports = self.row_exports(&name, index, ranged);
        if let Some(taken) = exports.iter().find(|export| self.exported.contains(*export)) {
            return Err(ModelError::DuplicateName(taken.clone()));
        }

        self.names.insert(name);
        let export = exports.pop().unwrap_or_default();
        self.exported.extend(exports);
        self.exported.insert(export.clone());
        Ok(export)
    }

    /// A generated row name that collides with nothing registered so far
    pub(crate) fn fresh_row_name(&self, prefix: &str, index: usize, ranged: bool) -> Arc<str> {
        let is_free = |candidate: &str| {
            !self.names.contains(candidate)
                && self
                    .row_exports(candidate, index, ranged)
                    .iter()
                    .all(|export| !self.exported.contains(export))
        };

        let base = format!("{}{}", prefix, index);
        if is_free(&base) {
            return Arc::from(base);
        }
        (1..)
            .map(|k| format!("{}_{}", base, k))
            .find(|candidate| is_free(candidate))
            .map(Arc::from)
            .unwrap_or_else(|| Arc::from(base))
    }
}
