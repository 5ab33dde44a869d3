use tracing::{debug, error};

use crate::lib::base::Error;
use crate::rules::RuleStore;

/// Formats a fatal evaluation error the way spec.md §7 describes: the
/// message itself, and, when `--debug` is set, a dump of every stored
/// equation so far (`suomi.py`'s `printStack`).
pub fn report_fatal(err: &Error, rules: &RuleStore, debug_mode: bool) -> String {
  error!(%err, "evaluation failed");
  if debug_mode {
    debug!(equations = %rules.debug_dump(), "stored equations at failure");
    format!("{}\n  (defined equations: {})", err, rules.debug_dump())
  } else {
    err.to_string()
  }
}

/// The message restricted mode raises when a new equation's head collides
/// with a protected builtin (spec.md §4.9); kept as a thin wrapper so the
/// wording lives in one place.
pub fn restricted_mode_error(head: &str) -> Error {
  Error::definition(format!(
    "'{}' is a built-in function; redefining it requires -i or -p",
    head
  ))
}
