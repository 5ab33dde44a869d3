use std::rc::Rc;

use crate::lib::base::{HashSet, Result};
use crate::tree::{debug_repr, head_signature, Tree};

pub type Signature = (String, Option<crate::morph::Case>, Vec<Option<crate::morph::Case>>);

/// One stored equation: `pattern` is matched (spec.md §4.7) against the tree
/// being reduced; on success `body` is substituted and returned. `impure`
/// marks an equation declared with the `.epäpuhdas` adverb (spec.md §4.4),
/// the only kind of rule allowed to perform I/O. `where_bindings` holds
/// `?mikä` ("where") clauses and desugared `&kun` ("when") phase witnesses,
/// each an (identifier, tree) pair folded into the match substitution before
/// `body` is rendered (spec.md §4.6 step 5).
#[derive(Clone)]
pub struct Equation {
  pub pattern: Rc<Tree>,
  pub body: Rc<Tree>,
  pub impure: bool,
  pub where_bindings: Vec<(String, Rc<Tree>)>,
}

/// An append-only, first-match-wins store of equations (spec.md §4.5),
/// plus the set of builtin/operator signatures restricted mode protects
/// from being shadowed by a user equation (spec.md §4.9).
pub struct RuleStore {
  equations: Vec<Equation>,
  protected: HashSet<Signature>,
}

impl RuleStore {
  pub fn new(protected: Vec<Signature>) -> Self {
    RuleStore { equations: Vec::new(), protected: protected.into_iter().collect() }
  }

  pub fn equations(&self) -> &[Equation] {
    &self.equations
  }

  /// Checks whether `pattern`'s head signature collides with a protected
  /// builtin. Call before `define` when the interpreter is in restricted
  /// (the default) mode; skip it when `-i`/`-p` was passed (spec.md §6).
  pub fn check_restricted(&self, pattern: &Rc<Tree>) -> Result<()> {
    if let Tree::Call(node) = pattern.as_ref() {
      let node = node.borrow();
      if let Some(sig) = head_signature(&node) {
        if self.protected.contains(&sig) {
          return Err(crate::diagnostics::restricted_mode_error(&sig.0));
        }
      }
    }
    Ok(())
  }

  pub fn define(&mut self, pattern: Rc<Tree>, body: Rc<Tree>, impure: bool) {
    self.define_with_where(pattern, body, impure, Vec::new());
  }

  pub fn define_with_where(&mut self, pattern: Rc<Tree>, body: Rc<Tree>, impure: bool, where_bindings: Vec<(String, Rc<Tree>)>) {
    self.equations.push(Equation { pattern, body, impure, where_bindings });
  }

  pub fn debug_dump(&self) -> String {
    self
      .equations
      .iter()
      .enumerate()
      .map(|(i, eq)| {
        let mut visited = HashSet::default();
        let pattern = debug_repr(&eq.pattern, &mut visited);
        visited.clear();
        let body = debug_repr(&eq.body, &mut visited);
        format!("#{}: {} = {}", i, pattern, body)
      })
      .collect::<Vec<_>>()
      .join("\n")
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::tree::{call, num, var};

  #[test]
  fn restricted_mode_rejects_protected_head() {
    let seuraaja_sig: Signature = ("$seuraaja".to_string(), None, vec![Some(crate::morph::Case::Genitive)]);
    let store = RuleStore::new(vec![seuraaja_sig]);
    let pattern = call(var("$seuraaja"), vec![var(".n")], None, vec![Some(crate::morph::Case::Genitive)]);
    assert!(store.check_restricted(&pattern).is_err());
  }

  #[test]
  fn restricted_mode_allows_unrelated_head() {
    let store = RuleStore::new(vec![]);
    let pattern = call(var("$tekijä"), vec![num(0)], None, vec![Some(crate::morph::Case::Genitive)]);
    assert!(store.check_restricted(&pattern).is_ok());
  }
}
