//! Entry-point validation.
//!
//! The toolchain happily compiles a library package into nothing useful, so
//! every build is checked for `package main` with a `func main()` before any
//! target is compiled.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum EntryPointError {
  #[error("build for {binary} does not contain a main function")]
  Missing { binary: String },

  #[error("failed to read entry point {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Check that `main` (a `.go` file or a package directory, relative to
/// `root`) declares the program entry point.
///
/// The same error is returned whether `main` names a file or a directory.
pub fn check_main(root: &Path, main: &str, binary: &str) -> Result<(), EntryPointError> {
  let path = root.join(main);
  let files = source_files(&path)?;
  debug!(path = %path.display(), files = files.len(), "checking for main function");

  for file in files {
    let source = std::fs::read_to_string(&file).map_err(|source| EntryPointError::Read {
      path: file.clone(),
      source,
    })?;
    if has_main(&source) {
      return Ok(());
    }
  }

  Err(EntryPointError::Missing {
    binary: binary.to_string(),
  })
}

/// Go sources that make up the package at `path`.
fn source_files(path: &Path) -> Result<Vec<PathBuf>, EntryPointError> {
  if path.extension().is_some_and(|ext| ext == "go") {
    if !path.is_file() {
      return Err(EntryPointError::Read {
        path: path.to_path_buf(),
        source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
      });
    }
    return Ok(vec![path.to_path_buf()]);
  }

  let mut files = Vec::new();
  for entry in WalkDir::new(path).min_depth(1).max_depth(1).sort_by_file_name() {
    let entry = entry.map_err(|e| EntryPointError::Read {
      path: path.to_path_buf(),
      source: e.into(),
    })?;
    let name = entry.file_name().to_string_lossy();
    if entry.file_type().is_file() && name.ends_with(".go") && !name.ends_with("_test.go") {
      files.push(entry.into_path());
    }
  }
  Ok(files)
}

/// Whether a Go source file is in `package main` and declares `func main()`.
pub fn has_main(source: &str) -> bool {
  let tokens = tokenize(&strip_comments_and_literals(source));

  let package = tokens.iter().position(|t| t == "package");
  if !package.is_some_and(|i| tokens.get(i + 1).is_some_and(|name| name == "main")) {
    return false;
  }

  let mut depth = 0usize;
  for (i, token) in tokens.iter().enumerate() {
    match token.as_str() {
      "{" | "(" => depth += 1,
      "}" | ")" => depth = depth.saturating_sub(1),
      "func" if depth == 0 => {
        let rest = &tokens[i + 1..];
        if rest.len() >= 3 && rest[0] == "main" && rest[1] == "(" && rest[2] == ")" {
          return true;
        }
      }
      _ => {}
    }
  }
  false
}

/// Blank out comments and string/rune literals so their contents can't
/// look like declarations.
fn strip_comments_and_literals(source: &str) -> String {
  let mut out = String::with_capacity(source.len());
  let mut chars = source.chars().peekable();

  while let Some(c) = chars.next() {
    match c {
      '/' if chars.peek() == Some(&'/') => {
        for c in chars.by_ref() {
          if c == '\n' {
            out.push('\n');
            break;
          }
        }
      }
      '/' if chars.peek() == Some(&'*') => {
        chars.next();
        let mut prev = '\0';
        for c in chars.by_ref() {
          if prev == '*' && c == '/' {
            break;
          }
          prev = c;
        }
        out.push(' ');
      }
      '"' | '\'' => {
        let mut escaped = false;
        for inner in chars.by_ref() {
          if escaped {
            escaped = false;
          } else if inner == '\\' {
            escaped = true;
          } else if inner == c || inner == '\n' {
            break;
          }
        }
        out.push_str("\"\"");
      }
      '`' => {
        for inner in chars.by_ref() {
          if inner == '`' {
            break;
          }
        }
        out.push_str("\"\"");
      }
      _ => out.push(c),
    }
  }
  out
}

fn tokenize(source: &str) -> Vec<String> {
  let mut tokens = Vec::new();
  let mut word = String::new();
  for c in source.chars() {
    if c == '_' || c.is_alphanumeric() {
      word.push(c);
      continue;
    }
    if !word.is_empty() {
      tokens.push(std::mem::take(&mut word));
    }
    if matches!(c, '{' | '}' | '(' | ')') {
      tokens.push(c.to_string());
    }
  }
  if !word.is_empty() {
    tokens.push(word);
  }
  tokens
}
