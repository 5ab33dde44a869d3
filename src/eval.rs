use std::cell::Cell;
use std::io::{BufRead, Write};
use std::rc::Rc;

use crate::lib::base::{Error, HashMap, HashSet, Result};
use crate::morph::{Case, MorphologyAnalyzer};
use crate::rules::{RuleStore, Signature};
use crate::tree::{call, copy_tree, inflect_tree, match_tree, num, substitute, world, CallNode, Tree};

/// The builtin/operator signatures spec.md §4.9 protects from being
/// shadowed by a user equation in restricted mode. Also doubles as the
/// dispatch table `peephole` and `try_builtin` switch on.
pub fn protected_signatures() -> Vec<Signature> {
  use Case::*;
  vec![
    ("$seuraaja".to_string(), None, vec![Some(Genitive)]),
    ("$plus".to_string(), None, vec![None, None]),
    ("$miinus".to_string(), None, vec![None, None]),
    ("$modulo".to_string(), None, vec![None, None]),
    ("$kerrottu".to_string(), Some(Essive), vec![None, Some(Adessive)]),
    ("$jaettu".to_string(), Some(Essive), vec![None, Some(Adessive)]),
    ("$luettu".to_string(), Some(Essive), vec![None, Some(Elative)]),
    ("$tulostettu".to_string(), Some(Essive), vec![None, Some(Illative)]),
    ("$pari".to_string(), Some(Essive), vec![None, Some(Allative)]),
  ]
}

fn signature_of(node: &CallNode) -> Option<Signature> {
  crate::tree::head_signature(node)
}

/// Evaluates a tree to normal form by outermost lazy reduction (spec.md
/// §4.7), threading a monotonic "world" counter through the impure I/O
/// builtins (spec.md §4.6). Holds no morphological state — the evaluator
/// only ever sees already-parsed trees.
pub struct Evaluator<'a> {
  pub rules: &'a mut RuleStore,
  pub magic: bool,
  pub free_impure: bool,
  pub free_pure: bool,
  world: Cell<u64>,
  input: &'a mut dyn BufRead,
  output: &'a mut dyn Write,
  /// `read`/`print` (spec.md §4.6) need an analyzer to inflect a prompt or a
  /// result into Finnish surface text, so this is always present, unlike the
  /// `visualize` flag below which only gates whether it's also used for
  /// tracing intermediate steps.
  analyzer: &'a dyn MorphologyAnalyzer,
  /// Set by `--visualize`/`-V` to also trace the fully inflected surface
  /// form of each intermediate reduction step (spec.md §4.6
  /// "Visualization"); off by default in tests and ordinary batch/REPL runs
  /// where no one reads the trace output.
  visualize: bool,
}

impl<'a> Evaluator<'a> {
  pub fn new(
    rules: &'a mut RuleStore,
    magic: bool,
    free_impure: bool,
    free_pure: bool,
    input: &'a mut dyn BufRead,
    output: &'a mut dyn Write,
    analyzer: &'a dyn MorphologyAnalyzer,
  ) -> Self {
    Evaluator { rules, magic, free_impure, free_pure, world: Cell::new(0), input, output, analyzer, visualize: false }
  }

  /// Enables tracing each step's inflected form (spec.md §4.6 "Visualization").
  pub fn with_visualizer(mut self, visualize: bool) -> Self {
    self.visualize = visualize;
    self
  }

  pub fn world_counter(&self) -> u64 {
    self.world.get()
  }

  /// Reduces `tree` to normal form, repeatedly applying single steps until
  /// a pass makes no further change. Termination is not guaranteed for
  /// arbitrary user programs (spec.md Non-goals).
  pub fn evals(&mut self, tree: &Rc<Tree>) -> Result<Rc<Tree>> {
    let mut current = Rc::clone(tree);
    loop {
      let (next, changed) = self.step(&current)?;
      current = next;
      if self.visualize {
        let mut visited = HashSet::default();
        tracing::debug!(
          target: "tampio::visualize",
          "{}",
          inflect_tree(&current, self.analyzer, Case::Nominative, &mut visited)
        );
      }
      if !changed {
        return Ok(current);
      }
    }
  }

  /// A single outermost reduction step (`suomi.py`'s `evals_`): tries the
  /// arithmetic peephole table, then the impure builtins, then a scan over
  /// stored equations, and only then recurses into the head and arguments,
  /// mutating the `Call` node's children in place when they change.
  fn step(&mut self, tree: &Rc<Tree>) -> Result<(Rc<Tree>, bool)> {
    match tree.as_ref() {
      Tree::Var(_) | Tree::Num(_) | Tree::World(_) => {
        if let Some(body) = self.try_equations(tree)? {
          return Ok((body, true));
        }
        Ok((Rc::clone(tree), false))
      }
      Tree::Call(node) => {
        if self.magic {
          if let Some(result) = self.peephole(tree, node)? {
            return Ok((result, true));
          }
        }
        if let Some(result) = self.try_builtin(tree, node)? {
          return Ok((result, true));
        }
        if let Some(body) = self.try_equations(tree)? {
          return Ok((body, true));
        }

        let (head, args, head_case, arg_cases, reverse) = {
          let borrowed = node.borrow();
          (Rc::clone(&borrowed.head), borrowed.args.clone(), borrowed.head_case, borrowed.arg_cases.clone(), borrowed.reverse)
        };
        let (new_head, mut changed) = self.step(&head)?;
        let mut new_args = Vec::with_capacity(args.len());
        for a in &args {
          let (na, c) = self.step(a)?;
          changed |= c;
          new_args.push(na);
        }
        if changed {
          *node.borrow_mut() = CallNode { head: new_head, args: new_args, head_case, arg_cases, reverse };
        }
        Ok((Rc::clone(tree), changed))
      }
    }
  }

  fn try_equations(&mut self, tree: &Rc<Tree>) -> Result<Option<Rc<Tree>>> {
    // Impure equations match normally once stored; the restriction is on
    // *defining* new ones outside free mode (spec.md §4.9), enforced at
    // registration time in `RuleStore::check_restricted`.
    for (index, eq) in self.rules.equations().iter().enumerate() {
      if let Some(mut subs) = match_tree(&eq.pattern, tree) {
        tracing::trace!(target: "tampio::match", equation = index, "matched");
        for (name, binding) in eq.where_bindings.iter().rev() {
          if subs.contains_key(name) {
            return Err(Error::definition(format!("illegal redefinition of '{}' in a where/when clause", name)));
          }
          let copied = copy_tree(binding, &mut HashMap::default());
          let resolved = substitute(&copied, &subs, &mut HashMap::default());
          subs.insert(name.clone(), resolved);
        }
        let copied = copy_tree(&eq.body, &mut HashMap::default());
        let body = substitute(&copied, &subs, &mut HashMap::default());
        return Ok(Some(body));
      }
    }
    tracing::trace!(target: "tampio::match", "no equation matched");
    Ok(None)
  }

  fn peephole(&self, _tree: &Rc<Tree>, node: &std::cell::RefCell<CallNode>) -> Result<Option<Rc<Tree>>> {
    let node = node.borrow();
    let sig = match signature_of(&node) {
      Some(s) => s,
      None => return Ok(None),
    };
    let protected = protected_signatures();
    if !protected.iter().any(|p| *p == sig) {
      return Ok(None);
    }
    let name = sig.0.as_str();
    let nums: Vec<i64> = node.args.iter().filter_map(|a| if let Tree::Num(n) = a.as_ref() { Some(*n) } else { None }).collect();
    if nums.len() != node.args.len() {
      return Ok(None);
    }
    match name {
      "$seuraaja" if nums.len() == 1 => Ok(Some(num(nums[0] + 1))),
      "$plus" if nums.len() == 2 => Ok(Some(num(nums[0] + nums[1]))),
      "$miinus" if nums.len() == 2 => Ok(Some(num(nums[0] - nums[1]))),
      "$modulo" if nums.len() == 2 => {
        if nums[1] == 0 {
          return Err(crate::lib::base::Error::runtime("modulo by zero"));
        }
        Ok(Some(num(nums[0].rem_euclid(nums[1]))))
      }
      "$kerrottu" if nums.len() == 2 => Ok(Some(num(nums[0] * nums[1]))),
      "$jaettu" if nums.len() == 2 => {
        if nums[1] == 0 {
          return Err(crate::lib::base::Error::runtime("division by zero"));
        }
        Ok(Some(num(nums[0].div_euclid(nums[1]))))
      }
      _ => Ok(None),
    }
  }

  fn try_builtin(&mut self, _tree: &Rc<Tree>, node: &std::cell::RefCell<CallNode>) -> Result<Option<Rc<Tree>>> {
    let (sig, args) = {
      let node = node.borrow();
      match signature_of(&node) {
        Some(s) => (s, node.args.clone()),
        None => return Ok(None),
      }
    };
    match sig.0.as_str() {
      "$luettu" => {
        if args.len() != 2 || !matches!(args[1].as_ref(), Tree::World(_)) {
          return Ok(None);
        }
        let Tree::World(w) = args[1].as_ref() else { return Ok(None) };
        let mut visited = HashSet::default();
        let prompt = inflect_tree(&args[0], self.analyzer, Case::Nominative, &mut visited);
        write!(self.output, "{}> ", prompt)?;
        self.output.flush()?;
        let mut line = String::new();
        self.input.read_line(&mut line)?;
        let tokens = crate::lexer::tokenize(line.trim(), self.analyzer)?;
        let (_, pattern) = crate::parser::parse_pattern(&tokens)?;
        let value = self.evals(&pattern)?;
        let next = w + 1;
        self.world.set(self.world.get().max(next));
        Ok(Some(call(
          crate::tree::var("$pari"),
          vec![value, world(next)],
          Some(Case::Essive),
          vec![None, Some(Case::Allative)],
        )))
      }
      "$tulostettu" => {
        if args.len() != 2 || !matches!(args[1].as_ref(), Tree::World(_)) {
          return Ok(None);
        }
        let Tree::World(w) = args[1].as_ref() else { return Ok(None) };
        let value = self.evals(&args[0])?;
        let mut visited = HashSet::default();
        let display = inflect_tree(&value, self.analyzer, Case::Nominative, &mut visited);
        writeln!(self.output, "{}", display)?;
        let next = w + 1;
        self.world.set(self.world.get().max(next));
        Ok(Some(call(
          crate::tree::var("$pari"),
          vec![crate::tree::var("$tyhjyys"), world(next)],
          Some(Case::Essive),
          vec![None, Some(Case::Allative)],
        )))
      }
      _ => Ok(None),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::morph::dictionary::DictionaryAnalyzer;
  use crate::rules::RuleStore;
  use crate::tree::{call, num, var};
  use std::io::Cursor;

  fn eval_tree(tree: Rc<Tree>) -> Rc<Tree> {
    let mut rules = RuleStore::new(protected_signatures());
    let mut input = Cursor::new(Vec::new());
    let mut output = Vec::new();
    let analyzer = DictionaryAnalyzer::new();
    let mut ev = Evaluator::new(&mut rules, true, false, false, &mut input, &mut output, &analyzer);
    ev.evals(&tree).unwrap()
  }

  #[test]
  fn successor_peephole_increments() {
    let tree = call(var("$seuraaja"), vec![num(4)], None, vec![Some(Case::Genitive)]);
    let result = eval_tree(tree);
    assert!(matches!(result.as_ref(), Tree::Num(5)));
  }

  #[test]
  fn plus_peephole_adds() {
    let tree = call(var("$plus"), vec![num(1), num(2)], None, vec![None, None]);
    let result = eval_tree(tree);
    assert!(matches!(result.as_ref(), Tree::Num(3)));
  }

  #[test]
  fn recursive_equation_reduces_through_successor() {
    let mut rules = RuleStore::new(protected_signatures());
    // "n:n seuraajan tulos on n:n seuraaja plus yksi." toy recursive rule
    // exercising equation lookup plus the successor peephole together.
    let pattern = call(
      var("$tulos"),
      vec![call(var("$seuraaja"), vec![var(".n")], None, vec![Some(Case::Genitive)])],
      None,
      vec![Some(Case::Genitive)],
    );
    let body = call(
      var("$plus"),
      vec![call(var("$seuraaja"), vec![var(".n")], None, vec![Some(Case::Genitive)]), num(1)],
      None,
      vec![None, None],
    );
    rules.define(pattern, body, false);
    let mut input = Cursor::new(Vec::new());
    let mut output = Vec::new();
    let analyzer = DictionaryAnalyzer::new();
    let mut ev = Evaluator::new(&mut rules, true, false, false, &mut input, &mut output, &analyzer);
    let target = call(var("$tulos"), vec![num(5)], None, vec![Some(Case::Genitive)]);
    let result = ev.evals(&target).unwrap();
    assert!(matches!(result.as_ref(), Tree::Num(6)));
  }

  // Property-based tests (spec.md §8's testable properties).
  use proptest::prelude::*;

  proptest! {
    /// Addition and subtraction peepholes compute the exact integer result
    /// (spec.md §4.6 step 3), for any pair small enough not to overflow.
    #[test]
    fn addition_peephole_matches_checked_add(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000) {
      let tree = call(var("$plus"), vec![num(a), num(b)], None, vec![None, None]);
      let result = eval_tree(tree);
      prop_assert!(matches!(result.as_ref(), Tree::Num(n) if *n == a + b));
    }

    #[test]
    fn subtraction_peephole_matches_checked_sub(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000) {
      let tree = call(var("$miinus"), vec![num(a), num(b)], None, vec![None, None]);
      let result = eval_tree(tree);
      prop_assert!(matches!(result.as_ref(), Tree::Num(n) if *n == a - b));
    }

    /// Modulus always returns a non-negative remainder in `[0, |b|)`,
    /// matching the Euclidean convention spec.md §4.6 names.
    #[test]
    fn modulo_peephole_is_euclidean(a in -10_000i64..10_000, b in 1i64..1_000) {
      let tree = call(var("$modulo"), vec![num(a), num(b)], None, vec![None, None]);
      let result = eval_tree(tree);
      match result.as_ref() {
        Tree::Num(n) => {
          prop_assert!(*n >= 0 && *n < b);
          prop_assert_eq!(*n, a.rem_euclid(b));
        }
        other => prop_assert!(false, "expected Num, got {:?}", other),
      }
    }

    /// The successor peephole is strictly monotonic: `seuraaja(n) = n + 1`
    /// for every representable `n` the prelude's recursion can reach.
    #[test]
    fn successor_peephole_is_monotonic(n in 0i64..1_000_000) {
      let tree = call(var("$seuraaja"), vec![num(n)], None, vec![Some(Case::Genitive)]);
      let result = eval_tree(tree);
      prop_assert!(matches!(result.as_ref(), Tree::Num(m) if *m == n + 1));
    }

    /// Normal forms are idempotent: reducing an already-reduced `Num` leaf
    /// returns it unchanged (spec.md §4.6's fixed-point guarantee).
    #[test]
    fn normal_form_is_idempotent(n in any::<i64>()) {
      let once = eval_tree(num(n));
      let twice = eval_tree(Rc::clone(&once));
      prop_assert!(matches!((once.as_ref(), twice.as_ref()), (Tree::Num(a), Tree::Num(b)) if a == b));
    }
  }
}
