pub type HashMap<K, V> = rustc_hash::FxHashMap<K, V>;
pub type HashSet<T> = rustc_hash::FxHashSet<T>;

pub type Result<T> = std::result::Result<T, Error>;

// The taxonomy from the spec's error-handling design: syntax errors happen
// while reading a single equation, definition errors while storing one,
// runtime errors while reducing a tree. Io is the one ambient addition,
// for prelude/source file loading.
#[derive(thiserror::Error, Debug, PartialEq, Eq, Clone)]
pub enum Error {
  #[error("Syntax error: {0}")]
  Syntax(String),
  #[error("Error: {0}")]
  Definition(String),
  #[error("Error: {0}")]
  Runtime(String),
  #[error("{0}")]
  Io(String),
}

impl Error {
  pub fn syntax<T: Into<String>>(message: T) -> Self {
    Error::Syntax(message.into())
  }

  pub fn definition<T: Into<String>>(message: T) -> Self {
    Error::Definition(message.into())
  }

  pub fn runtime<T: Into<String>>(message: T) -> Self {
    Error::Runtime(message.into())
  }
}

impl From<std::io::Error> for Error {
  fn from(x: std::io::Error) -> Error {
    Error::Io(x.to_string())
  }
}
