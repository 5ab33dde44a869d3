use crate::lib::base::HashMap;

use super::case::Case;
use super::numeral::lookup_inflected_numeral;
use super::{Analysis, MorphologyAnalyzer, Number, WordClass};

/// A small hand-built vocabulary standing in for the Voikko-backed analyzer
/// the original interpreter calls out to. Covers exactly the function words,
/// builtin lemmas and everyday nouns the prelude and the example programs
/// need; everything else falls through to the fallback common-noun rule.
pub struct DictionaryAnalyzer {
  entries: HashMap<String, Vec<Analysis>>,
}

fn noun(lemma: &str, case: Case, number: Number) -> Analysis {
  Analysis::new(lemma, WordClass::CommonNoun, case, number)
}

impl DictionaryAnalyzer {
  pub fn new() -> Self {
    let mut entries: HashMap<String, Vec<Analysis>> = HashMap::default();
    let mut add = |surface: &str, analysis: Analysis| {
      entries.entry(surface.to_string()).or_default().push(analysis);
    };

    // Verbs of being (spec.md §4.3): "on" (is), "esitetään" (presents).
    add("on", Analysis::new("olla", WordClass::Verb, Case::Nominative, Number::Empty));
    add("esitetään", Analysis::new("esittää", WordClass::Verb, Case::Nominative, Number::Empty));

    // Conjunctions.
    add("ja", Analysis::new("ja", WordClass::Conjunction, Case::Nominative, Number::Empty));
    add("sekä", Analysis::new("sekä", WordClass::Conjunction, Case::Nominative, Number::Empty));
    add("tai", Analysis::new("tai", WordClass::Conjunction, Case::Nominative, Number::Empty));
    add("kun", Analysis::new("kun", WordClass::Conjunction, Case::Nominative, Number::Empty));

    // Pronouns: the `where`-clause marker and the promoted "condition" word.
    add("mikä", Analysis::new("mikä", WordClass::Pronoun, Case::Nominative, Number::Singular));
    add("ehto", Analysis::new("ehto", WordClass::Pronoun, Case::Nominative, Number::Singular));

    // Impurity marker adverb.
    add("epäpuhdas", Analysis::new("epäpuhdas", WordClass::Adverb, Case::Nominative, Number::Singular));

    // Binary-operator and builtin nouns (spec.md §4.2/§4.7), always bare
    // nominative when they appear as operator words between operands.
    for lemma in ["plus", "miinus", "modulo", "kerrottu", "jaettu", "seuraaja", "tekijä", "pituus",
      "lisätty", "tyhjyys", "pari", "luettu", "tulostettu", "maailma", "summa"]
    {
      add(lemma, noun(lemma, Case::Nominative, Number::Singular));
    }
    add("ynnä", Analysis::new("ynnä", WordClass::Adverb, Case::Nominative, Number::Singular));

    // "lista" needs a genuine Finnish genitive surface form ("listan"),
    // since spec.md §8 scenario 3 writes it without colon notation.
    add("lista", noun("lista", Case::Nominative, Number::Singular));
    add("listan", noun("lista", Case::Genitive, Number::Singular));

    // Everyday result/variable nouns used bare, nominative only.
    for lemma in ["tulos", "eka", "toka", "luku", "arvo"] {
      add(lemma, noun(lemma, Case::Nominative, Number::Singular));
    }

    // Spelled-out cardinals, nominative and (where irregular) genitive.
    for n in 0..=20u64 {
      if let Some(word) = super::numeral::spell_nominative(n) {
        let analysis = Analysis::new(word.clone(), WordClass::Numeral, Case::Nominative, Number::Singular);
        add(&word, analysis);
      }
    }

    DictionaryAnalyzer { entries }
  }
}

impl Default for DictionaryAnalyzer {
  fn default() -> Self {
    Self::new()
  }
}

impl MorphologyAnalyzer for DictionaryAnalyzer {
  fn analyze(&self, word: &str) -> Vec<Analysis> {
    if let Some(analyses) = self.entries.get(word) {
      return analyses.clone();
    }
    if let Some((n, case)) = lookup_inflected_numeral(word) {
      if let Some(spelled) = super::numeral::spell_nominative(n) {
        return vec![Analysis::new(spelled, WordClass::Numeral, case, Number::Singular)];
      }
    }
    Vec::new()
  }

  fn inflect(&self, lemma: &str, case: Case) -> String {
    format!("{}:{}", lemma, case.tag())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn recognizes_verb_of_being() {
    let dict = DictionaryAnalyzer::new();
    let analyses = dict.analyze("on");
    assert_eq!(analyses.len(), 1);
    assert_eq!(analyses[0].lemma, "olla");
    assert_eq!(analyses[0].class, WordClass::Verb);
  }

  #[test]
  fn recognizes_list_genitive() {
    let dict = DictionaryAnalyzer::new();
    let analyses = dict.analyze("listan");
    assert_eq!(analyses[0].case, Case::Genitive);
    assert_eq!(analyses[0].lemma, "lista");
  }

  #[test]
  fn unknown_word_has_no_analyses() {
    let dict = DictionaryAnalyzer::new();
    assert!(dict.analyze("tuntematon_jargon_xyz").is_empty());
  }
}
