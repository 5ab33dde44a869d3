use regex::Regex;

use crate::lib::base::{Error, Result};
use crate::morph::{Analysis, Case, MorphologyAnalyzer, Number, WordClass};

/// One token out of a line of Tampio source. `Word` carries every candidate
/// morphological reading the analyzer (or a colon-notation override, or the
/// bare-digit rule) produced; the parser picks among them by case as it
/// descends (spec.md §4.2 — "case-directed recursive descent").
#[derive(Clone, Debug)]
pub enum Lexeme {
  Word { surface: String, analyses: Vec<Analysis> },
  ListOpen,
  ListClose,
  Comma,
}

/// The case-suffix colon-notation overrides (spec.md §4.2), lifted from
/// `suomi.py`'s `CASE_REGEXES` table: a raw word written `lemma:suffix`
/// is read as that lemma in the case the suffix names, bypassing the
/// analyzer entirely. Longest suffixes are listed first so `"lla"` doesn't
/// shadow `"lta"` or vice versa on overlapping prefixes.
const CASE_SUFFIXES: &[(&str, Case)] = &[
  ("ssa", Case::Inessive),
  ("ssä", Case::Inessive),
  ("sta", Case::Elative),
  ("stä", Case::Elative),
  ("lla", Case::Adessive),
  ("llä", Case::Adessive),
  ("lta", Case::Ablative),
  ("ltä", Case::Ablative),
  ("lle", Case::Allative),
  ("tta", Case::Abessive),
  ("ttä", Case::Abessive),
  ("ksi", Case::Translative),
  ("ine", Case::Comitative),
  ("sti", Case::Adverb),
  ("na", Case::Essive),
  ("nä", Case::Essive),
  ("an", Case::Illative),
  ("än", Case::Illative),
  ("in", Case::Instructive),
  ("a", Case::Partitive),
  ("ä", Case::Partitive),
  ("n", Case::Genitive),
];

fn colon_override(word: &str) -> Option<(&str, Case)> {
  let (lemma, suffix) = word.split_once(':')?;
  if lemma.is_empty() {
    return None;
  }
  CASE_SUFFIXES.iter().find(|(s, _)| *s == suffix).map(|(_, case)| (lemma, *case))
}

/// Strips `#`-to-end-of-line comments (spec.md §4.2/§6), line by line so a
/// `#` inside one line never swallows text on the next.
fn strip_comments(source: &str) -> String {
  source
    .lines()
    .map(|line| match line.find('#') {
      Some(idx) => &line[..idx],
      None => line,
    })
    .collect::<Vec<_>>()
    .join("\n")
}

/// Splits raw source text into lines at `.` sentence terminators, the same
/// granularity `suomi.py`'s `lexLine` operates at — each line becomes one
/// equation (or one REPL command).
pub fn split_sentences(source: &str) -> Vec<String> {
  strip_comments(source)
    .split('.')
    .map(|s| s.trim())
    .filter(|s| !s.is_empty())
    .map(|s| s.to_string())
    .collect()
}

/// Tokenizes one sentence (without its trailing `.`) into lexemes, querying
/// `analyzer` for each raw word not otherwise special-cased.
pub fn tokenize(line: &str, analyzer: &dyn MorphologyAnalyzer) -> Result<Vec<Lexeme>> {
  let bracket_re = Regex::new(r"[\[\],]").expect("static regex");
  let spaced = bracket_re.replace_all(line, |c: &regex::Captures| format!(" {} ", &c[0]));
  let mut out = Vec::new();
  for raw in spaced.split_whitespace() {
    out.push(lex_word(raw, analyzer)?);
  }
  Ok(out)
}

fn lex_word(raw: &str, analyzer: &dyn MorphologyAnalyzer) -> Result<Lexeme> {
  match raw {
    "[" => return Ok(Lexeme::ListOpen),
    "]" => return Ok(Lexeme::ListClose),
    "," => return Ok(Lexeme::Comma),
    _ => {}
  }

  if let Some((lemma, case)) = colon_override(raw) {
    let class = if lemma.chars().all(|c| c.is_ascii_digit()) { WordClass::Numeral } else { WordClass::CommonNoun };
    return Ok(Lexeme::Word {
      surface: raw.to_string(),
      analyses: vec![Analysis::new(lemma, class, case, Number::Singular)],
    });
  }
  if raw.contains(':') {
    return Err(fatal_unknown_case(raw));
  }

  if raw.chars().all(|c| c.is_ascii_digit()) && !raw.is_empty() {
    return Ok(Lexeme::Word {
      surface: raw.to_string(),
      analyses: vec![Analysis::new(raw, WordClass::Numeral, Case::Nominative, Number::Singular)],
    });
  }

  let analyses = analyzer.analyze(raw);
  let analyses = if analyses.is_empty() {
    vec![Analysis::new(raw, WordClass::CommonNoun, Case::Nominative, Number::Singular)]
  } else {
    analyses
  };
  Ok(Lexeme::Word { surface: raw.to_string(), analyses })
}

pub fn fatal_unknown_case(word: &str) -> Error {
  Error::syntax(format!("unrecognized case suffix on '{}'", word))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::morph::dictionary::DictionaryAnalyzer;

  #[test]
  fn splits_sentences_on_dot() {
    let sentences = split_sentences("tulos on yksi plus kaksi. tulos on viiden tekijä.");
    assert_eq!(sentences.len(), 2);
  }

  #[test]
  fn colon_override_reads_genitive() {
    let dict = DictionaryAnalyzer::new();
    let lexemes = tokenize("nolla:n seuraaja", &dict).unwrap();
    match &lexemes[0] {
      Lexeme::Word { analyses, .. } => {
        assert_eq!(analyses[0].case, Case::Genitive);
        assert_eq!(analyses[0].lemma, "nolla");
      }
      _ => panic!("expected Word lexeme"),
    }
  }

  #[test]
  fn bracket_list_tokens() {
    let dict = DictionaryAnalyzer::new();
    let lexemes = tokenize("lista on [1, 2, 3]", &dict).unwrap();
    assert!(matches!(lexemes[2], Lexeme::ListOpen));
    assert!(matches!(lexemes[4], Lexeme::Comma));
    assert!(matches!(lexemes[8], Lexeme::ListClose));
  }

  #[test]
  fn bare_digit_is_numeral() {
    let dict = DictionaryAnalyzer::new();
    let lexemes = tokenize("x on 5", &dict).unwrap();
    match &lexemes[2] {
      Lexeme::Word { analyses, .. } => assert_eq!(analyses[0].class, WordClass::Numeral),
      _ => panic!("expected Word lexeme"),
    }
  }
}
