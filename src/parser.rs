use std::rc::Rc;

use crate::lexer::Lexeme;
use crate::lib::base::{Error, HashMap, Result};
use crate::morph::{Analysis, Case, WordClass};
use crate::tree::{call, num, substitute, var, Tree};

/// A parsed equation, ready to be registered in a `RuleStore` (spec.md
/// §4.4). `where_bindings` collects both `?mikä` ("where") clauses and the
/// desugared witnesses of an `&kun` ("when") phase chain (spec.md §4.4,
/// `SPEC_FULL.md` §10).
pub struct ParsedEquation {
  pub pattern: Rc<Tree>,
  pub body: Rc<Tree>,
  pub impure: bool,
  pub where_bindings: Vec<(String, Rc<Tree>)>,
}

const BINARY_OPERATORS: &[&str] = &["ynnä", "plus", "miinus", "modulo"];
const CONJUNCTIONS: &[&str] = &["ja", "sekä", "tai"];
const PROMOTED_LEMMAS: &[&str] = &["yksi", "ehto"];
const WHEN_CONJUNCTION: &str = "kun";
const WHERE_PRONOUN: &str = "mikä";

struct Cursor<'a> {
  tokens: &'a [Lexeme],
  pos: usize,
}

impl<'a> Cursor<'a> {
  fn new(tokens: &'a [Lexeme]) -> Self {
    Cursor { tokens, pos: 0 }
  }

  fn peek(&self) -> Option<&Lexeme> {
    self.tokens.get(self.pos)
  }

  fn advance(&mut self) -> Option<&'a Lexeme> {
    let t = self.tokens.get(self.pos);
    self.pos += 1;
    t
  }

  fn is_empty(&self) -> bool {
    self.pos >= self.tokens.len()
  }
}

/// The word classes spec.md §4.3's rule 2 treats as "a Noun" — everything
/// the analyzer can tag as a nominal reading, as opposed to a Verb,
/// Conjunction, Pronoun, or Adverb.
fn is_noun_class(class: WordClass) -> bool {
  matches!(
    class,
    WordClass::CommonNoun
      | WordClass::Abbreviation
      | WordClass::Numeral
      | WordClass::Adjective
      | WordClass::NounAdjective
      | WordClass::ProperName
  )
}

/// Picks the analysis to use for a token that carries more than one
/// candidate reading, by spec.md §4.3's three-rule priority: (1) a
/// promoted lemma wins outright; (2) otherwise a Noun-class reading wins
/// over a Verb/Conjunction/Pronoun/Adverb one; (3) otherwise the *last*
/// alternative in the analyzer's own order wins (`suomi.py`'s
/// `sorted(w, key=...)[-1]`) — spec.md §9 warns this ordering must be
/// preserved verbatim or programs may silently change meaning.
fn disambiguate(analyses: &[Analysis]) -> &Analysis {
  analyses
    .iter()
    .enumerate()
    .max_by_key(|(index, a)| {
      let tier = if PROMOTED_LEMMAS.contains(&a.lemma.as_str()) {
        2
      } else if is_noun_class(a.class) {
        1
      } else {
        0
      };
      (tier, *index)
    })
    .map(|(_, a)| a)
    .unwrap_or(&analyses[0])
}

/// spec.md §4.4's "case validation": an explicit expected-vs-got check with
/// a message naming the fragment that failed. The parser never silently
/// accepts a case mismatch.
fn check_case(got: Case, expected: Case, place: &str) -> Result<()> {
  if got != expected {
    return Err(Error::syntax(format!("expected {} case, got {} ({})", expected.english(), got.english(), place)));
  }
  Ok(())
}

fn parse_var(analysis: &Analysis) -> Rc<Tree> {
  let name = analysis.atom_name();
  if name == "$nolla" {
    return num(0);
  }
  if let Some(digits) = name.strip_prefix('$') {
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
      if let Ok(n) = digits.parse::<i64>() {
        return num(n);
      }
    }
  }
  var(name)
}

/// Parses the comma-separated contents of a `[...]` list literal into the
/// `$lisätty`/`$tyhjyys` chain `inflect_tree` already knows how to print
/// back out (spec.md §4.8, §8 scenario 3).
fn parse_list(cursor: &mut Cursor) -> Result<Rc<Tree>> {
  let mut elements = Vec::new();
  loop {
    match cursor.peek() {
      Some(Lexeme::ListClose) => {
        cursor.advance();
        break;
      }
      Some(Lexeme::Comma) => {
        cursor.advance();
      }
      Some(_) => {
        let (_, elem) = parse_unary(cursor)?;
        elements.push(elem);
      }
      None => return Err(Error::syntax("unterminated list literal")),
    }
  }
  let mut tail = var("$tyhjyys");
  for elem in elements.into_iter().rev() {
    tail = call(var("$lisätty"), vec![elem, tail], Some(Case::Essive), vec![None, Some(Case::Illative)]);
  }
  Ok(tail)
}

/// Reads one noun-headed primary term, handling list literals and magic
/// numerals, and returns its surface case alongside the tree. spec.md §4.4
/// requires the head of a unary to be a noun (a named syntax error,
/// "expected noun", spec.md §7); a promoted lemma is exempted since rule 1
/// of the priority disambiguation already lets it win regardless of class.
fn parse_primary(cursor: &mut Cursor) -> Result<(Case, Rc<Tree>)> {
  match cursor.advance() {
    Some(Lexeme::ListOpen) => Ok((Case::Nominative, parse_list(cursor)?)),
    Some(Lexeme::Word { surface, analyses }) => {
      if analyses.is_empty() {
        return Err(Error::syntax(format!("no morphological analysis for '{}'", surface)));
      }
      let chosen = disambiguate(analyses);
      if !is_noun_class(chosen.class) && !PROMOTED_LEMMAS.contains(&chosen.lemma.as_str()) {
        return Err(Error::syntax(format!("expected noun, got '{}'", surface)));
      }
      Ok((chosen.case, parse_var(chosen)))
    }
    Some(other) => Err(Error::syntax(format!("unexpected token {:?}", other))),
    None => Err(Error::syntax("unexpected end of input")),
  }
}

/// Parses the genitive-owner chain and binary-operator/conjunction forms
/// (spec.md §4.3): `X:n Y:n Z` nests as `Z(Y(X))`, `X op Y` (where `op` is
/// one of the fixed operator/conjunction words) builds a two-argument,
/// uncased call.
fn parse_unary(cursor: &mut Cursor) -> Result<(Case, Rc<Tree>)> {
  let (mut case, mut root) = parse_primary(cursor)?;

  while case == Case::Genitive {
    let (next_case, owner_applied) = parse_primary(cursor)?;
    root = call(owner_applied, vec![root], None, vec![Some(Case::Genitive)]);
    case = next_case;
  }

  loop {
    let op_name = match cursor.peek() {
      Some(Lexeme::Word { analyses, .. }) => {
        let chosen = disambiguate(analyses);
        if BINARY_OPERATORS.contains(&chosen.lemma.as_str()) || CONJUNCTIONS.contains(&chosen.lemma.as_str()) {
          Some(chosen.clone())
        } else {
          None
        }
      }
      _ => None,
    };
    let Some(op) = op_name else { break };
    let is_conjunction = CONJUNCTIONS.contains(&op.lemma.as_str());
    cursor.advance();
    let (rhs_case, rhs) = parse_unary(cursor)?;
    // Conjunction operands must share a case (spec.md §4.4); operators
    // simply propagate the right operand's case forward for whatever
    // follows.
    if is_conjunction {
      check_case(rhs_case, case, &format!("'{}'", op.lemma))?;
    }
    case = rhs_case;
    let head = parse_var(&op);
    root = call(head, vec![root, rhs], None, vec![None, None]);
  }

  Ok((case, root))
}

/// A case eligible for the essive form's single additional argument
/// (spec.md §4.4: "one additional argument in any case other than
/// nominative/genitive/essive" — those three are reserved for the head
/// noun phrase itself).
fn is_extra_arg_case(case: Case) -> bool {
  !matches!(case, Case::Nominative | Case::Genitive | Case::Essive)
}

/// Parses the essive-headed n-ary application form (spec.md §4.3/§4.8):
/// `root` (already read) optionally continues in forward order as `root
/// head:essive arg?` (one additional argument at most, spec.md §4.4), or
/// in reverse order as `root arg [&conj peer] head:essive` ("by X Y-ed"
/// phrasing) when `root`'s own case rules out a forward reading.
fn parse_essive(cursor: &mut Cursor, case: Case, root: Rc<Tree>) -> Result<(Case, Rc<Tree>)> {
  let is_essive_head =
    matches!(cursor.peek(), Some(Lexeme::Word { analyses, .. }) if disambiguate(analyses).case == Case::Essive);
  if is_essive_head {
    let Some(Lexeme::Word { analyses, .. }) = cursor.advance() else { unreachable!() };
    let head_analysis = disambiguate(analyses).clone();
    let head = parse_var(&head_analysis);

    let mut args = vec![root];
    let mut arg_cases = vec![None];
    let saved = cursor.pos;
    if matches!(cursor.peek(), Some(Lexeme::Word { analyses, .. }) if is_extra_arg_case(disambiguate(analyses).case)) {
      let (arg_case, arg) = parse_unary(cursor)?;
      if is_extra_arg_case(arg_case) {
        args.push(arg);
        arg_cases.push(Some(arg_case));
      } else {
        cursor.pos = saved;
      }
    }
    return Ok((case, call(head, args, Some(Case::Essive), arg_cases)));
  }

  if matches!(cursor.peek(), Some(Lexeme::Word { analyses, .. }) if is_extra_arg_case(disambiguate(analyses).case)) {
    let saved = cursor.pos;
    if let Some(result) = try_parse_reverse_essive(cursor, case, &root)? {
      return Ok(result);
    }
    cursor.pos = saved;
  }

  Ok((case, root))
}

/// The reverse-order essive form (spec.md §4.4): `arg[:case] [&conj
/// peer:case] head:essive`. Speculative — restores `cursor`'s position and
/// returns `None` if the head doesn't materialize, so the caller can fall
/// back to treating `root` as a plain pattern.
fn try_parse_reverse_essive(cursor: &mut Cursor, case: Case, root: &Rc<Tree>) -> Result<Option<(Case, Rc<Tree>)>> {
  let (arg_case, mut arg) = parse_primary(cursor)?;
  if !is_extra_arg_case(arg_case) {
    return Ok(None);
  }

  if let Some(Lexeme::Word { analyses, .. }) = cursor.peek() {
    let chosen = disambiguate(analyses);
    if CONJUNCTIONS.contains(&chosen.lemma.as_str()) {
      let conj = chosen.clone();
      let before_conj = cursor.pos;
      cursor.advance();
      match parse_primary(cursor) {
        Ok((peer_case, peer)) if peer_case == arg_case => {
          arg = call(parse_var(&conj), vec![arg, peer], None, vec![None, None]);
        }
        _ => cursor.pos = before_conj,
      }
    }
  }

  let Some(Lexeme::Word { analyses, .. }) = cursor.peek() else { return Ok(None) };
  if disambiguate(analyses).case != Case::Essive {
    return Ok(None);
  }
  let Some(Lexeme::Word { analyses, .. }) = cursor.advance() else { unreachable!() };
  let head_analysis = disambiguate(analyses).clone();
  let head = parse_var(&head_analysis);

  let tree = call(head, vec![Rc::clone(root), arg], Some(Case::Essive), vec![None, Some(arg_case)]);
  if let Tree::Call(node) = tree.as_ref() {
    node.borrow_mut().reverse = true;
  }
  Ok(Some((case, tree)))
}

/// Parses one full noun-phrase pattern (an equation side), combining the
/// genitive/operator layer with the essive n-ary layer.
pub fn parse_pattern(tokens: &[Lexeme]) -> Result<(Case, Rc<Tree>)> {
  let mut cursor = Cursor::new(tokens);
  let (case, root) = parse_unary(&mut cursor)?;
  let (case, root) = parse_essive(&mut cursor, case, root)?;
  if !cursor.is_empty() {
    return Err(Error::syntax("trailing tokens after expression"));
  }
  Ok((case, root))
}

/// Splits a token stream at top-level occurrences of a word with the given
/// lemma, whatever its word class — used for the `&kun` ("when") phase chain
/// and the `?mikä` ("where") clause marker (spec.md §4.4). Bracket nesting
/// (list literals) is tracked so a marker inside `[...]` never splits the
/// stream.
fn split_on_conjunction<'a>(tokens: &'a [Lexeme], lemma: &str) -> Vec<&'a [Lexeme]> {
  let mut segments = Vec::new();
  let mut start = 0;
  let mut depth = 0i32;
  for (i, tok) in tokens.iter().enumerate() {
    match tok {
      Lexeme::ListOpen => depth += 1,
      Lexeme::ListClose => depth -= 1,
      Lexeme::Word { analyses, .. } if depth == 0 && analyses.iter().any(|a| a.lemma == lemma) => {
        segments.push(&tokens[start..i]);
        start = i + 1;
      }
      _ => {}
    }
  }
  segments.push(&tokens[start..]);
  segments
}

/// Parses one equation body: `LHS on|esitetään [epäpuhdas] RHS [mikä ID on
/// BODY]*` (spec.md §4.4). Each `?mikä` clause records a `where` binding and
/// is substituted into the left-hand side immediately.
fn parse_equation_single(tokens: &[Lexeme]) -> Result<ParsedEquation> {
  let clauses = split_on_conjunction(tokens, WHERE_PRONOUN);
  let verb_pos = clauses[0]
    .iter()
    .position(|t| matches!(t, Lexeme::Word { analyses, .. } if analyses.iter().any(|a| a.class == WordClass::Verb)))
    .ok_or_else(|| Error::syntax("equation is missing its verb ('on'/'esitetään')"))?;

  let (lhs_tokens, rest) = clauses[0].split_at(verb_pos);
  let rest = &rest[1..];

  let (impure, rhs_tokens) = match rest.first() {
    Some(Lexeme::Word { analyses, .. })
      if analyses.iter().any(|a| a.class == WordClass::Adverb && a.lemma == "epäpuhdas") =>
    {
      (true, &rest[1..])
    }
    _ => (false, rest),
  };

  let (lhs_case, mut pattern) = parse_pattern(lhs_tokens)?;
  check_case(lhs_case, Case::Nominative, "left-hand side of equation")?;
  let (rhs_case, body) = parse_pattern(rhs_tokens)?;
  check_case(rhs_case, Case::Nominative, "right-hand side of equation")?;

  let mut where_bindings = Vec::new();
  for clause in &clauses[1..] {
    let equation = parse_equation_single(clause)?;
    let name = equation
      .pattern
      .var_name()
      .ok_or_else(|| Error::syntax("expected a bare identifier after 'mikä'"))?
      .to_string();
    let mut singleton = HashMap::default();
    singleton.insert(name.clone(), Rc::clone(&equation.body));
    pattern = substitute(&pattern, &singleton, &mut HashMap::default());
    where_bindings.push((name, equation.body));
  }

  Ok(ParsedEquation { pattern, body, impure, where_bindings })
}

/// Parses a whole equation line, including an `&kun` ("when") phase chain
/// (spec.md §4.4, `SPEC_FULL.md` §10): `eq0 kun w1 on b1 kun w2 on b2 …`.
/// Each witness after the first `kun` must itself be a bare identifier
/// equation; its binding is folded into `eq0`'s `where` bindings, the same
/// substitute-immediately treatment a `?mikä` clause gets, so later phases
/// and the final right-hand side can refer to earlier witnesses by name.
pub fn parse_equation(tokens: &[Lexeme]) -> Result<ParsedEquation> {
  let phases = split_on_conjunction(tokens, WHEN_CONJUNCTION);
  let mut equation = parse_equation_single(phases[0])?;
  for phase in &phases[1..] {
    let witness = parse_equation_single(phase)?;
    let name = witness
      .pattern
      .var_name()
      .ok_or_else(|| Error::syntax("complex expression where an identifier is required after 'when'"))?
      .to_string();
    let mut singleton = HashMap::default();
    singleton.insert(name.clone(), Rc::clone(&witness.body));
    equation.pattern = substitute(&equation.pattern, &singleton, &mut HashMap::default());
    equation.where_bindings.push((name, witness.body));
  }
  Ok(equation)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::lexer::tokenize;
  use crate::morph::dictionary::DictionaryAnalyzer;

  fn lex(line: &str) -> Vec<Lexeme> {
    let dict = DictionaryAnalyzer::new();
    tokenize(line, &dict).unwrap()
  }

  #[test]
  fn parses_simple_equation() {
    let eq = parse_equation(&lex("tulos on yksi plus kaksi")).unwrap();
    assert!(!eq.impure);
    match eq.body.as_ref() {
      Tree::Call(node) => {
        let node = node.borrow();
        assert_eq!(node.head.var_name(), Some("$plus"));
        assert_eq!(node.args.len(), 2);
      }
      _ => panic!("expected a Call"),
    }
  }

  #[test]
  fn parses_genitive_chain() {
    let eq = parse_equation(&lex("tulos on viiden tekijä")).unwrap();
    match eq.body.as_ref() {
      Tree::Call(node) => {
        let node = node.borrow();
        assert_eq!(node.head.var_name(), Some("$tekijä"));
        assert_eq!(node.arg_cases, vec![Some(Case::Genitive)]);
      }
      _ => panic!("expected a Call"),
    }
  }

  #[test]
  fn parses_list_literal() {
    let eq = parse_equation(&lex("lista on [1, 2, 3]")).unwrap();
    match eq.body.as_ref() {
      Tree::Call(node) => {
        let node = node.borrow();
        assert_eq!(node.head.var_name(), Some("$lisätty"));
        assert!(matches!(node.args[0].as_ref(), Tree::Num(1)));
      }
      _ => panic!("expected a Call"),
    }
  }

  #[test]
  fn parses_where_clause_binding() {
    let eq = parse_equation(&lex("tulos on a kerrottu:na a:lla mikä a on kaksi")).unwrap();
    assert_eq!(eq.where_bindings.len(), 1);
    assert_eq!(eq.where_bindings[0].0, "$a");
    match eq.where_bindings[0].1.as_ref() {
      Tree::Var(name) => assert_eq!(name, "$kaksi"),
      _ => panic!("expected a Var"),
    }
    match eq.body.as_ref() {
      Tree::Call(node) => assert_eq!(node.borrow().head.var_name(), Some("$kerrottu")),
      _ => panic!("expected a Call"),
    }
  }

  #[test]
  fn parses_when_phase_chain() {
    let eq = parse_equation(&lex("tulos on a kerrottu:na a:lla kun a on kaksi")).unwrap();
    assert_eq!(eq.where_bindings.len(), 1);
    assert_eq!(eq.where_bindings[0].0, "$a");
  }

  #[test]
  fn rejects_non_identifier_when_witness() {
    let err = parse_equation(&lex("tulos on a kerrottu:na a:lla kun kaksi plus yksi on kolme"));
    assert!(err.is_err());
  }
}
