/// The fifteen grammatical cases the spec's data model recognizes, plus the
/// adverb pseudo-case used for adverbs recoded as nouns (spec.md §4.2).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Case {
  Nominative,
  Genitive,
  Partitive,
  Essive,
  Translative,
  Allative,
  Adessive,
  Ablative,
  Illative,
  Inessive,
  Elative,
  Abessive,
  Instructive,
  Comitative,
  Adverb,
}

impl Case {
  pub const ALL: [Case; 15] = [
    Case::Nominative,
    Case::Genitive,
    Case::Partitive,
    Case::Essive,
    Case::Translative,
    Case::Allative,
    Case::Adessive,
    Case::Ablative,
    Case::Illative,
    Case::Inessive,
    Case::Elative,
    Case::Abessive,
    Case::Instructive,
    Case::Comitative,
    Case::Adverb,
  ];

  /// The English name used in diagnostics (spec.md §7's "expected X, got Y").
  pub fn english(self) -> &'static str {
    match self {
      Case::Nominative => "nominative",
      Case::Genitive => "genitive",
      Case::Partitive => "partitive",
      Case::Essive => "essive",
      Case::Translative => "translative",
      Case::Allative => "allative",
      Case::Adessive => "adessive",
      Case::Ablative => "ablative",
      Case::Illative => "illative",
      Case::Inessive => "inessive",
      Case::Elative => "elative",
      Case::Abessive => "abessive",
      Case::Instructive => "instructive",
      Case::Comitative => "comitative",
      Case::Adverb => "adverb",
    }
  }

  /// The short tag used in the `lemma:case` inflection fallback (spec.md §4.1).
  pub fn tag(self) -> &'static str {
    self.english()
  }

  /// Back-harmony (a/o/u) suffix used by the generic inflector fallback.
  pub fn suffix_back(self) -> &'static str {
    match self {
      Case::Nominative => "",
      Case::Genitive => "n",
      Case::Partitive => "a",
      Case::Essive => "na",
      Case::Translative => "ksi",
      Case::Allative => "lle",
      Case::Adessive => "lla",
      Case::Ablative => "lta",
      Case::Illative => "an",
      Case::Inessive => "ssa",
      Case::Elative => "sta",
      Case::Abessive => "tta",
      Case::Instructive => "in",
      Case::Comitative => "ine",
      Case::Adverb => "sti",
    }
  }

  /// Front-harmony (ä/ö/y) suffix used by the generic inflector fallback.
  pub fn suffix_front(self) -> &'static str {
    match self {
      Case::Nominative => "",
      Case::Genitive => "n",
      Case::Partitive => "ä",
      Case::Essive => "nä",
      Case::Translative => "ksi",
      Case::Allative => "lle",
      Case::Adessive => "llä",
      Case::Ablative => "ltä",
      Case::Illative => "än",
      Case::Inessive => "ssä",
      Case::Elative => "stä",
      Case::Abessive => "ttä",
      Case::Instructive => "in",
      Case::Comitative => "ine",
      Case::Adverb => "sti",
    }
  }
}
