//! Override Resolver
//!
//! A field or table may carry `%code_override=$key`, meaning "use whatever
//! `#define key = ...` declares". This pass finds the define, classifies its value as if it
//! were a source line, and links the result into the override slot.
//!
//! Resolution is memoized per key, so every reference to the same key shares one `Rc`. A
//! resolved line that itself carries a `$key` override is resolved in turn; a key that is
//! already being resolved further up the chain is a cycle and fails the parse.

use super::classify::classify_line;
use super::error::ParseError;
use super::line::{CodeOverride, Line, Record};
use std::collections::HashMap;
use std::rc::Rc;

/// Resolved override targets, keyed by define condition
pub type OverrideCache = HashMap<String, Rc<Line>>;

/// Link every `$key` override in `records` to its define. Returns the memo so callers can
/// keep it alongside the document.
pub fn resolve_overrides(records: &mut [Record]) -> Result<OverrideCache, ParseError> {
    let mut resolver = Resolver::new(records);

    for record in records.iter_mut() {
        let Some(slot) = record.line.code_override_mut() else {
            continue;
        };
        let key = match slot {
            CodeOverride::Indirect(key) => key.clone(),
            _ => continue,
        };
        let target = resolver.resolve(&key, record.line_no)?;
        *slot = CodeOverride::Resolved { key, target };
    }

    Ok(resolver.cache)
}

struct Resolver {
    /// condition -> every (line number, value) declaring it
    defines: HashMap<String, Vec<(usize, String)>>,
    cache: OverrideCache,
    /// Keys currently being resolved, outermost first
    in_progress: Vec<String>,
}

impl Resolver {
    fn new(records: &[Record]) -> Self {
        let mut defines: HashMap<String, Vec<(usize, String)>> = HashMap::new();
        for record in records {
            if let Line::Define(define) = &record.line {
                defines
                    .entry(define.condition.clone())
                    .or_default()
                    .push((record.line_no, define.value.clone()));
            }
        }
        Resolver {
            defines,
            cache: HashMap::new(),
            in_progress: Vec::new(),
        }
    }

    fn resolve(&mut self, key: &str, referenced_at: usize) -> Result<Rc<Line>, ParseError> {
        if let Some(target) = self.cache.get(key) {
            return Ok(Rc::clone(target));
        }
        if self.in_progress.iter().any(|k| k == key) {
            let mut chain = self.in_progress.clone();
            chain.push(key.to_string());
            return Err(ParseError::OverrideCycle { chain });
        }

        let (define_line, value) = self.define(key, referenced_at)?;
        let mut line = classify_line(&value, define_line)?;

        self.in_progress.push(key.to_string());
        if let Some(slot) = line.code_override_mut() {
            if let CodeOverride::Indirect(inner) = slot {
                let inner = inner.clone();
                let target = self.resolve(&inner, define_line)?;
                *slot = CodeOverride::Resolved { key: inner, target };
            }
        }
        self.in_progress.pop();

        let line = Rc::new(line);
        self.cache.insert(key.to_string(), Rc::clone(&line));
        Ok(line)
    }

    /// The single define declaring `key`
    fn define(&self, key: &str, referenced_at: usize) -> Result<(usize, String), ParseError> {
        match self.defines.get(key).map(Vec::as_slice) {
            None | Some([]) => Err(ParseError::UndefinedOverride {
                line: referenced_at,
                key: key.to_string(),
            }),
            Some([(line_no, value)]) => Ok((*line_no, value.clone())),
            Some(many) => Err(ParseError::AmbiguousDefine {
                key: key.to_string(),
                lines: many.iter().map(|(line_no, _)| *line_no).collect(),
            }),
        }
    }
}
