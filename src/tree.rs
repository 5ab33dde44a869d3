use std::cell::RefCell;
use std::rc::Rc;

use crate::lib::base::{HashMap, HashSet};
use crate::morph::{Case, MorphologyAnalyzer};

/// The expression tree spec.md §3 describes. `Call` holds its mutable parts
/// behind a `RefCell` because the evaluator reduces a tree by mutating a
/// `Call` node's head/args in place (spec.md §4.7) rather than rebuilding the
/// whole spine on every step — the same node can be reached through more
/// than one parent, and in-place reduction is what makes that sharing (and,
/// in pathological/cyclic user programs, recursion through a node back to
/// itself) behave sanely instead of diverging on repeated work.
#[derive(Debug)]
pub enum Tree {
  Var(String),
  Num(i64),
  World(u64),
  Call(RefCell<CallNode>),
}

#[derive(Debug, Clone)]
pub struct CallNode {
  pub head: Rc<Tree>,
  pub args: Vec<Rc<Tree>>,
  /// The case the head itself carries. `None` is the genitive/owner-
  /// application reading; `Some(Case::Essive)` marks the n-ary essive-headed
  /// application form (spec.md §4.8).
  pub head_case: Option<Case>,
  /// Per-argument case. `None` means the argument carries no case marking
  /// of its own (the first argument of an essive-headed call, spec.md §4.8).
  pub arg_cases: Vec<Option<Case>>,
  /// Set for an essive-headed call parsed in the "reverse word-order" form
  /// (spec.md §4.4: `arg[:case] [&conj peer:case] head:essive`, used for
  /// "by X Y-ed" phrasing) — `inflect_tree` prints the essive head last
  /// instead of between the two arguments. Otherwise always `false`; the
  /// underlying tree shape is identical either way.
  pub reverse: bool,
}

/// A pattern-variable name is `<sigil><single non-digit char>` (spec.md §3;
/// `suomi.py`'s `re.fullmatch(r".[^0-9]", name)` — the dot there matches any
/// character, so the rule is keyed only on length and the digit-ness of the
/// second character, not on which sigil is used).
pub fn is_pattern_var(name: &str) -> bool {
  let mut chars = name.chars();
  match (chars.next(), chars.next(), chars.next()) {
    (Some(_), Some(c), None) => !c.is_ascii_digit(),
    _ => false,
  }
}

fn ptr_key(t: &Rc<Tree>) -> usize {
  Rc::as_ptr(t) as usize
}

pub fn var(name: impl Into<String>) -> Rc<Tree> {
  Rc::new(Tree::Var(name.into()))
}

pub fn num(n: i64) -> Rc<Tree> {
  Rc::new(Tree::Num(n))
}

pub fn world(n: u64) -> Rc<Tree> {
  Rc::new(Tree::World(n))
}

pub fn call(head: Rc<Tree>, args: Vec<Rc<Tree>>, head_case: Option<Case>, arg_cases: Vec<Option<Case>>) -> Rc<Tree> {
  Rc::new(Tree::Call(RefCell::new(CallNode { head, args, head_case, arg_cases, reverse: false })))
}

impl Tree {
  /// The canonical internal name, for `Var`, the lemma string (`Num`/`World`
  /// leaves have no name and matching against one of those must fall back to
  /// comparing their literal value instead; spec.md §4.7's Num/Var bridge).
  pub fn var_name(&self) -> Option<&str> {
    match self {
      Tree::Var(name) => Some(name),
      _ => None,
    }
  }

  pub fn is_pattern_var(&self) -> bool {
    self.var_name().map(is_pattern_var).unwrap_or(false)
  }
}

/// Structural equality, cycle-safe: a pair of node identities already seen on
/// this comparison path is assumed equal rather than recursed into again.
pub fn trees_equal(a: &Rc<Tree>, b: &Rc<Tree>, visited: &mut HashSet<(usize, usize)>) -> bool {
  let key = (ptr_key(a), ptr_key(b));
  if Rc::ptr_eq(a, b) || visited.contains(&key) {
    return true;
  }
  match (a.as_ref(), b.as_ref()) {
    (Tree::Var(x), Tree::Var(y)) => x == y,
    (Tree::Num(x), Tree::Num(y)) => x == y,
    (Tree::World(x), Tree::World(y)) => x == y,
    (Tree::Call(x), Tree::Call(y)) => {
      visited.insert(key);
      let (x, y) = (x.borrow(), y.borrow());
      if x.head_case != y.head_case || x.arg_cases != y.arg_cases || x.args.len() != y.args.len() || x.reverse != y.reverse {
        return false;
      }
      if !trees_equal(&x.head, &y.head, visited) {
        return false;
      }
      x.args.iter().zip(y.args.iter()).all(|(p, q)| trees_equal(p, q, visited))
    }
    _ => false,
  }
}

/// Deep copy, preserving shared structure and cycles: a node already copied
/// on this pass is returned again rather than duplicated.
pub fn copy_tree(t: &Rc<Tree>, visited: &mut HashMap<usize, Rc<Tree>>) -> Rc<Tree> {
  if let Some(existing) = visited.get(&ptr_key(t)) {
    return Rc::clone(existing);
  }
  match t.as_ref() {
    Tree::Var(_) | Tree::Num(_) | Tree::World(_) => Rc::clone(t),
    Tree::Call(node) => {
      let placeholder = Rc::new(Tree::Call(RefCell::new(CallNode {
        head: Rc::clone(t),
        args: Vec::new(),
        head_case: None,
        arg_cases: Vec::new(),
        reverse: false,
      })));
      visited.insert(ptr_key(t), Rc::clone(&placeholder));
      let borrowed = node.borrow();
      let head = copy_tree(&borrowed.head, visited);
      let args = borrowed.args.iter().map(|a| copy_tree(a, visited)).collect();
      if let Tree::Call(cell) = placeholder.as_ref() {
        *cell.borrow_mut() = CallNode {
          head,
          args,
          head_case: borrowed.head_case,
          arg_cases: borrowed.arg_cases.clone(),
          reverse: borrowed.reverse,
        };
      }
      placeholder
    }
  }
}

/// Substitutes the bindings in `subs` for free pattern-variable occurrences,
/// cycle-safe in the same way as `copy_tree`. Non-pattern-variable `Var`
/// leaves (ordinary atoms) are never substituted even if `subs` happens to
/// contain a matching key — only pattern variables are bound by `match_tree`.
pub fn substitute(t: &Rc<Tree>, subs: &HashMap<String, Rc<Tree>>, visited: &mut HashMap<usize, Rc<Tree>>) -> Rc<Tree> {
  if subs.is_empty() {
    return Rc::clone(t);
  }
  if let Some(existing) = visited.get(&ptr_key(t)) {
    return Rc::clone(existing);
  }
  match t.as_ref() {
    Tree::Var(name) => {
      if is_pattern_var(name) {
        subs.get(name).cloned().unwrap_or_else(|| Rc::clone(t))
      } else {
        Rc::clone(t)
      }
    }
    Tree::Num(_) | Tree::World(_) => Rc::clone(t),
    Tree::Call(node) => {
      let placeholder = Rc::new(Tree::Call(RefCell::new(CallNode {
        head: Rc::clone(t),
        args: Vec::new(),
        head_case: None,
        arg_cases: Vec::new(),
        reverse: false,
      })));
      visited.insert(ptr_key(t), Rc::clone(&placeholder));
      let borrowed = node.borrow();
      let head = substitute(&borrowed.head, subs, visited);
      let args = borrowed.args.iter().map(|a| substitute(a, subs, visited)).collect();
      if let Tree::Call(cell) = placeholder.as_ref() {
        *cell.borrow_mut() = CallNode {
          head,
          args,
          head_case: borrowed.head_case,
          arg_cases: borrowed.arg_cases.clone(),
          reverse: borrowed.reverse,
        };
      }
      placeholder
    }
  }
}

/// Matches `pattern` against `tree`, returning the bindings for any pattern
/// variables in `pattern` on success. Mirrors `suomi.py`'s `CallTree.match`,
/// including the Peano bridge (a `$seuraaja`-headed, genitive-argument call
/// pattern matches a positive `Num` by peeling one off and recursing) and the
/// `Num`/`$nolla`/`$0` equivalence (spec.md §4.7).
pub fn match_tree(pattern: &Rc<Tree>, tree: &Rc<Tree>) -> Option<HashMap<String, Rc<Tree>>> {
  let mut visited = HashSet::default();
  match_tree_inner(pattern, tree, &mut visited)
}

fn match_tree_inner(
  pattern: &Rc<Tree>,
  tree: &Rc<Tree>,
  visited: &mut HashSet<(usize, usize)>,
) -> Option<HashMap<String, Rc<Tree>>> {
  let key = (ptr_key(pattern), ptr_key(tree));
  if visited.contains(&key) {
    return Some(HashMap::default());
  }

  match pattern.as_ref() {
    Tree::Var(name) if is_pattern_var(name) => {
      let mut subs = HashMap::default();
      subs.insert(name.clone(), Rc::clone(tree));
      Some(subs)
    }
    Tree::Var(name) => match tree.as_ref() {
      Tree::Var(other) if name == other => Some(HashMap::default()),
      Tree::Num(0) if name == "$nolla" => Some(HashMap::default()),
      _ => None,
    },
    Tree::Num(n) => match tree.as_ref() {
      Tree::Num(m) if n == m => Some(HashMap::default()),
      Tree::Var(other) if *n == 0 && other == "$nolla" => Some(HashMap::default()),
      _ => None,
    },
    Tree::World(n) => match tree.as_ref() {
      Tree::World(m) if n == m => Some(HashMap::default()),
      _ => None,
    },
    Tree::Call(pnode) => {
      let pnode = pnode.borrow();
      if is_successor_head(&pnode) {
        if let Tree::Num(m) = tree.as_ref() {
          if *m > 0 {
            return match_tree_inner(&pnode.args[0], &num(m - 1), visited);
          }
          return None;
        }
      }
      match tree.as_ref() {
        Tree::Call(tnode) => {
          visited.insert(key);
          let tnode = tnode.borrow();
          if pnode.head_case != tnode.head_case
            || pnode.arg_cases != tnode.arg_cases
            || pnode.args.len() != tnode.args.len()
          {
            return None;
          }
          let mut subs = match_tree_inner(&pnode.head, &tnode.head, visited)?;
          for (p, t) in pnode.args.iter().zip(tnode.args.iter()) {
            let more = match_tree_inner(p, t, visited)?;
            for (k, v) in more {
              subs.insert(k, v);
            }
          }
          Some(subs)
        }
        _ => None,
      }
    }
  }
}

fn is_successor_head(node: &CallNode) -> bool {
  node.head_case.is_none()
    && node.arg_cases == vec![Some(Case::Genitive)]
    && node.args.len() == 1
    && node.head.var_name() == Some("$seuraaja")
}

/// Renders a tree back into Finnish surface text (spec.md §4.8), inflecting
/// leaves through `analyzer` and dispatching on the case conventions
/// `CallNode` follows (essive-headed n-ary application vs. the default
/// genitive-owner rendering). `case` is the grammatical case the whole tree
/// should be inflected into at this position.
pub fn inflect_tree(t: &Rc<Tree>, analyzer: &dyn MorphologyAnalyzer, case: Case, visited: &mut HashSet<usize>) -> String {
  if !visited.insert(ptr_key(t)) {
    return "<sykli>".to_string();
  }
  let result = match t.as_ref() {
    Tree::Var(name) => analyzer.inflect(name, case),
    Tree::Num(n) if *n >= 0 => crate::morph::numeral::inflect_numeral(*n as u64, case),
    Tree::Num(n) => format!("miinus {}", crate::morph::numeral::inflect_numeral((-n) as u64, case)),
    Tree::World(n) => format!("{}:{}", n, case.tag()),
    Tree::Call(node) => {
      let node = node.borrow();
      if node.head_case == Some(Case::Essive) {
        let arg0 = inflect_tree(&node.args[0], analyzer, case, visited);
        let head_word = analyzer.inflect(node.head.var_name().unwrap_or(""), Case::Essive);
        if node.reverse && node.args.len() == 2 {
          // Reverse word-order essive (spec.md §4.4/§4.8): the essive head
          // prints after its argument instead of before it.
          let arg1 = inflect_tree(&node.args[1], analyzer, node.arg_cases[1].unwrap_or(Case::Nominative), visited);
          format!("{} {} {}", arg0, arg1, head_word)
        } else {
          let mut parts = vec![arg0, head_word];
          for (arg, arg_case) in node.args[1..].iter().zip(node.arg_cases[1..].iter()) {
            parts.push(inflect_tree(arg, analyzer, arg_case.unwrap_or(Case::Nominative), visited));
          }
          parts.join(" ")
        }
      } else if node.args.len() == 1 && node.arg_cases == vec![Some(Case::Genitive)] {
        format!(
          "{} {}",
          inflect_tree(&node.args[0], analyzer, Case::Genitive, visited),
          inflect_tree(&node.head, analyzer, case, visited)
        )
      } else if node.args.len() == 2 && node.arg_cases == vec![None, None] {
        // Binary operators and conjunctions (spec.md §4.2/§4.8): rendered
        // infix, with the head in nominative and both operands inheriting
        // the surrounding case.
        format!(
          "{} {} {}",
          inflect_tree(&node.args[0], analyzer, case, visited),
          inflect_tree(&node.head, analyzer, Case::Nominative, visited),
          inflect_tree(&node.args[1], analyzer, case, visited)
        )
      } else {
        let head = inflect_tree(&node.head, analyzer, case, visited);
        let args: Vec<_> = node
          .args
          .iter()
          .zip(node.arg_cases.iter())
          .map(|(a, c)| inflect_tree(a, analyzer, c.unwrap_or(Case::Nominative), visited))
          .collect();
        format!("{} {}", head, args.join(" "))
      }
    }
  };
  visited.remove(&ptr_key(t));
  result
}

/// The `(head lemma, head case, arg cases)` triple spec.md §4.9 calls a
/// "function head" — the thing restricted mode forbids matching against.
pub fn head_signature(node: &CallNode) -> Option<(String, Option<Case>, Vec<Option<Case>>)> {
  node.head.var_name().map(|name| (name.to_string(), node.head_case, node.arg_cases.clone()))
}

/// Renders a tree using its internal var/lemma names rather than inflected
/// surface forms, cycle-safe like `inflect_tree` but with no analyzer
/// dependency — used by `rules::debug_dump` to dump stored equations
/// verbatim under `--debug` (spec.md §7).
pub fn debug_repr(t: &Rc<Tree>, visited: &mut HashSet<usize>) -> String {
  if !visited.insert(ptr_key(t)) {
    return "...".to_string();
  }
  let result = match t.as_ref() {
    Tree::Var(name) => name.clone(),
    Tree::Num(n) => n.to_string(),
    Tree::World(n) => format!("world#{}", n),
    Tree::Call(node) => {
      let node = node.borrow();
      let head = debug_repr(&node.head, visited);
      let args: Vec<_> = node.args.iter().map(|a| debug_repr(a, visited)).collect();
      format!("{}({})", head, args.join(", "))
    }
  };
  visited.remove(&ptr_key(t));
  result
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn pattern_var_convention() {
    assert!(is_pattern_var("$n"));
    assert!(is_pattern_var(".x"));
    assert!(!is_pattern_var("$nolla"));
    assert!(!is_pattern_var("$0"));
  }

  #[test]
  fn structural_equality_ignores_identity() {
    let mut visited = HashSet::default();
    let a = call(var("$plus"), vec![num(1), num(2)], None, vec![None, None]);
    let b = call(var("$plus"), vec![num(1), num(2)], None, vec![None, None]);
    assert!(trees_equal(&a, &b, &mut visited));
  }

  #[test]
  fn successor_pattern_matches_positive_num() {
    let pattern = call(var("$seuraaja"), vec![var("$n")], None, vec![Some(Case::Genitive)]);
    let subs = match_tree(&pattern, &num(5)).expect("should match");
    match subs.get("$n").map(|t| t.as_ref()) {
      Some(Tree::Num(4)) => {}
      other => panic!("expected Num(4), got {:?}", other),
    }
  }

  #[test]
  fn cyclic_call_equality_terminates() {
    let head = var("$x");
    let cell = Rc::new(Tree::Call(RefCell::new(CallNode {
      head,
      args: Vec::new(),
      head_case: None,
      arg_cases: Vec::new(),
      reverse: false,
    })));
    if let Tree::Call(node) = cell.as_ref() {
      node.borrow_mut().args.push(Rc::clone(&cell));
      node.borrow_mut().arg_cases.push(None);
    }
    let mut visited = HashSet::default();
    assert!(trees_equal(&cell, &cell, &mut visited));
  }

  // Property-based tests (spec.md §8's testable properties).
  use proptest::prelude::*;

  proptest! {
    /// A bare pattern variable matches any `Num` and binds it unchanged
    /// (spec.md §4.7, §8 "matcher soundness").
    #[test]
    fn pattern_var_matches_any_num(n in any::<i64>()) {
      let pattern = var("$n");
      let subs = match_tree(&pattern, &num(n)).expect("pattern var always matches");
      prop_assert!(matches!(subs.get("$n").map(|t| t.as_ref()), Some(Tree::Num(m)) if *m == n));
    }

    /// `Num(0)` and `Var("$nolla")` are interchangeable on both sides of a
    /// match (spec.md §4.7, §9 Open Question).
    #[test]
    fn zero_and_nolla_are_interchangeable(use_nolla_pattern in any::<bool>(), use_nolla_tree in any::<bool>()) {
      let pattern = if use_nolla_pattern { var("$nolla") } else { num(0) };
      let tree = if use_nolla_tree { var("$nolla") } else { num(0) };
      prop_assert!(match_tree(&pattern, &tree).is_some());
    }

    /// The successor pattern only matches positive naturals and always
    /// peels off exactly one (spec.md §4.7's Peano bridge).
    #[test]
    fn successor_pattern_peels_one(n in 0i64..10_000) {
      let pattern = call(var("$seuraaja"), vec![var("$n")], None, vec![Some(Case::Genitive)]);
      if n == 0 {
        prop_assert!(match_tree(&pattern, &num(0)).is_none());
      } else {
        let subs = match_tree(&pattern, &num(n)).expect("should match a positive Num");
        prop_assert!(matches!(subs.get("$n").map(|t| t.as_ref()), Some(Tree::Num(m)) if *m == n - 1));
      }
    }

    /// A non-pattern-variable leaf only matches a structurally identical
    /// tree (spec.md §4.7): two distinct multi-letter identifiers never
    /// unify.
    #[test]
    fn distinct_literal_vars_never_match(a in "[a-z]{3,8}", b in "[a-z]{3,8}") {
      prop_assume!(a != b);
      let pattern = var(format!("${}", a));
      let tree = var(format!("${}", b));
      prop_assert!(match_tree(&pattern, &tree).is_none());
    }

    /// `copy_tree` produces a structurally equal but distinct tree for any
    /// `Num` leaf wrapped in a one-argument call (a cheap proxy for the
    /// general copy-preserves-shape property, since leaves themselves have
    /// no identity to preserve).
    #[test]
    fn copy_tree_preserves_structure(n in any::<i64>()) {
      let original = call(var("$seuraaja"), vec![num(n)], None, vec![Some(Case::Genitive)]);
      let copied = copy_tree(&original, &mut HashMap::default());
      let mut visited = HashSet::default();
      prop_assert!(trees_equal(&original, &copied, &mut visited));
      prop_assert!(!Rc::ptr_eq(&original, &copied));
    }
  }
}
