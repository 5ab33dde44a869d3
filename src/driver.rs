use std::io::{BufRead, Write};

use crate::eval::{protected_signatures, Evaluator};
use crate::lexer::{split_sentences, tokenize};
use crate::lib::base::{Error, Result};
use crate::morph::dictionary::DictionaryAnalyzer;
use crate::morph::{Case, MorphologyAnalyzer};
use crate::parser::{parse_equation, parse_pattern};
use crate::rules::RuleStore;
use crate::tree::{call, inflect_tree, num, var};

/// The standard prelude: successor-chain bridges from spelled Finnish
/// cardinals to native `Num`s, plus `tekijä` (factorial) and `pituus`
/// (list length), the two recursive operations spec.md §8's scenarios
/// exercise. Embedded so the interpreter works without a sibling data file
/// (spec.md §6, "standard prelude located next to the interpreter binary").
pub const EMBEDDED_PRELUDE: &str = include_str!("../std.tampio");

pub struct Options {
  pub magic: bool,
  pub free_impure: bool,
  pub free_pure: bool,
  pub debug: bool,
  pub io_mode: bool,
  pub visualize: bool,
}

impl Default for Options {
  fn default() -> Self {
    Options { magic: true, free_impure: false, free_pure: false, debug: false, io_mode: false, visualize: false }
  }
}

/// Owns the state a Tampio session accumulates: the rule store, the
/// analyzer, and the interpreter's flags. One `Session` backs both a batch
/// file run and a REPL loop.
pub struct Session {
  pub rules: RuleStore,
  pub analyzer: DictionaryAnalyzer,
  pub options: Options,
}

impl Session {
  pub fn new(options: Options) -> Self {
    let mut rules = RuleStore::new(protected_signatures());
    install_structural_equations(&mut rules);
    Session { rules, analyzer: DictionaryAnalyzer::new(), options }
  }

  /// Loads the prelude, trying a sibling `std.tampio` next to the running
  /// executable before falling back to the embedded copy (spec.md §6).
  pub fn load_prelude(&mut self) -> Result<()> {
    let sibling = std::env::current_exe().ok().and_then(|p| p.parent().map(|d| d.join("std.tampio")));
    let text = match sibling.as_ref().and_then(|p| std::fs::read_to_string(p).ok()) {
      Some(text) => text,
      None => EMBEDDED_PRELUDE.to_string(),
    };
    self.load_source(&text)
  }

  /// Registers every equation in `source`, in order (spec.md §4.4/§4.5).
  pub fn load_source(&mut self, source: &str) -> Result<()> {
    for sentence in split_sentences(source) {
      self.define_line(&sentence)?;
    }
    Ok(())
  }

  fn define_line(&mut self, sentence: &str) -> Result<()> {
    let tokens = tokenize(sentence, &self.analyzer)?;
    let equation = parse_equation(&tokens)?;
    if !self.options.free_impure && !self.options.free_pure {
      self.rules.check_restricted(&equation.pattern)?;
    }
    self.rules.define_with_where(equation.pattern, equation.body, equation.impure, equation.where_bindings);
    Ok(())
  }

  /// Processes one REPL line: a full equation is registered; a bare
  /// expression (no verb) is evaluated immediately and its printed form
  /// returned, matching an interactive read-eval-print convention the
  /// batch driver doesn't need (spec.md §6).
  pub fn process_repl_line(
    &mut self,
    sentence: &str,
    input: &mut dyn BufRead,
    output: &mut dyn Write,
  ) -> Result<Option<String>> {
    let tokens = tokenize(sentence, &self.analyzer)?;
    match parse_equation(&tokens) {
      Ok(equation) => {
        if !self.options.free_impure && !self.options.free_pure {
          self.rules.check_restricted(&equation.pattern)?;
        }
        self.rules.define_with_where(equation.pattern, equation.body, equation.impure, equation.where_bindings);
        Ok(None)
      }
      Err(_) => {
        let (case, tree) = parse_pattern(&tokens)?;
        let mut ev = Evaluator::new(
          &mut self.rules,
          self.options.magic,
          self.options.free_impure,
          self.options.free_pure,
          input,
          output,
          &self.analyzer,
        );
        ev = ev.with_visualizer(self.options.visualize);
        let result = ev.evals(&tree)?;
        let mut visited = Default::default();
        Ok(Some(inflect_tree(&result, &self.analyzer, case, &mut visited)))
      }
    }
  }

  /// Runs a whole program: loads every equation, then evaluates and prints
  /// the "tulos" binding, the convention spec.md §8's scenarios all use for
  /// a program's observable output.
  pub fn run_program(&mut self, source: &str, input: &mut dyn BufRead, output: &mut dyn Write) -> Result<()> {
    self.load_source(source)?;
    let target = var("$tulos");
    let io_mode = self.options.io_mode;
    let mut ev = Evaluator::new(
      &mut self.rules,
      self.options.magic,
      self.options.free_impure,
      self.options.free_pure,
      input,
      output,
      &self.analyzer,
    );
    ev = ev.with_visualizer(self.options.visualize);
    let result = ev.evals(&target)?;
    let world_counter = ev.world_counter();
    let mut visited = Default::default();
    let rendered = inflect_tree(&result, &self.analyzer, Case::Nominative, &mut visited);
    writeln!(output, "{}", rendered).map_err(Error::from)?;
    if io_mode {
      writeln!(output, "maailman laskuri: {}", world_counter).map_err(Error::from)?;
    }
    Ok(())
  }
}

/// `pituus` (list length) needs an equation whose argument position matches
/// a `$lisätty` cons cell structurally — a pattern a genitive-chain owner
/// position (one primary token per step) can't spell out in surface text,
/// since the owner here is itself an essive-headed call, not a single noun.
/// Installed directly as trees rather than parsed source for that reason;
/// everything else in the prelude is ordinary Tampio text.
fn install_structural_equations(rules: &mut RuleStore) {
  let base_pattern = call(var("$pituus"), vec![var("$tyhjyys")], None, vec![Some(Case::Genitive)]);
  rules.define(base_pattern, num(0), false);

  let cons_pattern = call(
    var("$lisätty"),
    vec![var(".a"), var(".b")],
    Some(Case::Essive),
    vec![None, Some(Case::Illative)],
  );
  let recursive_pattern = call(var("$pituus"), vec![cons_pattern], None, vec![Some(Case::Genitive)]);
  let recursive_body = call(
    var("$seuraaja"),
    vec![call(var("$pituus"), vec![var(".b")], None, vec![Some(Case::Genitive)])],
    None,
    vec![Some(Case::Genitive)],
  );
  rules.define(recursive_pattern, recursive_body, false);
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Cursor;

  fn run(source: &str) -> String {
    let mut session = Session::new(Options::default());
    session.load_prelude().unwrap();
    let mut input = Cursor::new(Vec::new());
    let mut output = Vec::new();
    session.run_program(source, &mut input, &mut output).unwrap();
    String::from_utf8(output).unwrap().trim().to_string()
  }

  #[test]
  fn scenario_addition() {
    assert_eq!(run("tulos on yksi plus kaksi."), "kolme");
  }

  #[test]
  fn scenario_factorial() {
    assert_eq!(run("tulos on viiden tekijä."), "satakaksikymmentä");
  }

  #[test]
  fn scenario_list_length() {
    assert_eq!(run("lista on [1, 2, 3]. tulos on listan pituus."), "kolme");
  }
}
