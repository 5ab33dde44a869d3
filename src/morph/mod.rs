pub mod case;
pub mod dictionary;
pub mod numeral;

pub use case::Case;

/// The word classes the analyzer is allowed to return (spec.md §4.1). Classes
/// outside this set are dropped by the caller with a debug diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WordClass {
  CommonNoun,
  Abbreviation,
  Numeral,
  Adjective,
  NounAdjective,
  ProperName,
  Pronoun,
  Adverb,
  Verb,
  NegationVerb,
  Conjunction,
}

/// Number marking: Empty covers words (e.g. verbs, conjunctions) for which
/// number is not meaningful; Adverbial is the synthetic "na" marker the
/// lexer assigns when it recodes an adverb as a nominative noun.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Number {
  Singular,
  Plural,
  Empty,
  Adverbial,
}

/// One candidate reading of a surface word, as spec.md §3 describes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Analysis {
  pub lemma: String,
  pub class: WordClass,
  pub case: Case,
  pub number: Number,
}

impl Analysis {
  pub fn new(lemma: impl Into<String>, class: WordClass, case: Case, number: Number) -> Self {
    Analysis { lemma: lemma.into(), class, case, number }
  }

  /// The sigil-prefixed internal atom name (spec.md §3): the sigil encodes
  /// word class (and, for nominal readings, number), and concatenating it
  /// with the lemma gives the canonical `Var`/head name used everywhere
  /// else in the tree.
  pub fn atom_name(&self) -> String {
    let sigil = match self.class {
      WordClass::Verb | WordClass::NegationVerb => '#',
      WordClass::Conjunction => '&',
      WordClass::Pronoun => '?',
      WordClass::Adverb => '.',
      _ if self.number == Number::Plural => '@',
      _ => '$',
    };
    format!("{}{}", sigil, self.lemma)
  }
}

/// The injectable external collaborator spec.md §1 and §4.1 describe: given a
/// surface word, return its analyses; given a lemma and case, inflect it.
pub trait MorphologyAnalyzer {
  fn analyze(&self, word: &str) -> Vec<Analysis>;
  fn inflect(&self, lemma: &str, case: Case) -> String;
}
