use std::io::{stdin, stdout, BufReader};

use reedline::{DefaultPrompt, FileBackedHistory, Reedline, Signal};

use crate::driver::Session;
use crate::lexer::split_sentences;
use crate::lib::base::Result;

const HISTORY_FILE: &str = ".tampio_history";

/// Drives an interactive read-eval-print loop (spec.md §6): each submitted
/// line is split into sentences and fed to the session one at a time, with
/// a persisted history file the way a REPL is expected to behave.
pub fn run(mut session: Session) -> Result<()> {
  let history_path = dirs_home().join(HISTORY_FILE);
  let history = Box::new(FileBackedHistory::with_file(1000, history_path).unwrap_or_else(|_| FileBackedHistory::new(1000).expect("in-memory history")));
  let mut editor = Reedline::create().with_history(history);
  let prompt = DefaultPrompt::default();

  loop {
    match editor.read_line(&prompt) {
      Ok(Signal::Success(line)) => {
        for sentence in split_sentences(&line) {
          let mut input = BufReader::new(stdin());
          let mut output = stdout();
          match session.process_repl_line(&sentence, &mut input, &mut output) {
            Ok(Some(text)) => println!("{}", text),
            Ok(None) => {}
            Err(err) => eprintln!("{}", crate::diagnostics::report_fatal(&err, &session.rules, session.options.debug)),
          }
        }
      }
      Ok(Signal::CtrlD) | Ok(Signal::CtrlC) => break,
      Err(err) => {
        eprintln!("repl error: {}", err);
        break;
      }
    }
  }
  Ok(())
}

fn dirs_home() -> std::path::PathBuf {
  std::env::var_os("HOME").map(std::path::PathBuf::from).unwrap_or_else(|| std::path::PathBuf::from("."))
}
