//! Name and flag templates.
//!
//! Binary names and linker flags are user-supplied templates rendered once per
//! target. The syntax is the subset of Go's `text/template` that release
//! configs use in practice, and diagnostics use the same wording as Go's
//! engine so that existing configs and tooling keep matching on them.
//!
//! # Syntax
//!
//! - `{{ .Field }}` / `{{ .Env.NAME }}` - field chains into the render data
//! - `{{ . }}` - the data itself
//! - `{{ "text" }}`, `` {{ `raw` }} `` - string literals
//! - `{{ .Os | toupper }}` - pipelines; the piped value becomes the last argument
//! - `{{- ... -}}` - trim surrounding whitespace
//! - `{{/* comment */}}`
//!
//! Functions: `tolower`, `toupper`, `trim`, `replace OLD NEW S`.
//!
//! # Example
//!
//! ```
//! use buildmatrix_lib::template::{render, Value};
//!
//! let data = Value::map([("Binary", "app"), ("Os", "linux")]);
//! assert_eq!(render("name", "{{ .Binary }}_{{ .Os }}", &data).unwrap(), "app_linux");
//!
//! let err = render("ldflags", "-X main.version={{.Version}", &data).unwrap_err();
//! assert_eq!(err.to_string(), r#"template: ldflags:1: unexpected "}" in operand"#);
//! ```

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

const LEFT_DELIM: &str = "{{";
const RIGHT_DELIM: &str = "}}";
const FUNCS: &[&str] = &["replace", "tolower", "toupper", "trim"];

/// Errors from parsing or executing a template.
///
/// The message is the complete diagnostic, including the `template: <name>:`
/// prefix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
  #[error("{0}")]
  Parse(String),

  #[error("{0}")]
  Exec(String),
}

/// Data a template is rendered against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
  Str(String),
  Map(BTreeMap<String, Value>),
}

impl Value {
  /// Build a map value from key/value pairs.
  pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
  where
    K: Into<String>,
    V: Into<Value>,
  {
    Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
  }

  fn kind(&self) -> &'static str {
    match self {
      Value::Str(_) => "string",
      Value::Map(_) => "map",
    }
  }
}

impl From<&str> for Value {
  fn from(s: &str) -> Self {
    Value::Str(s.to_string())
  }
}

impl From<String> for Value {
  fn from(s: String) -> Self {
    Value::Str(s)
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::Str(s) => f.write_str(s),
      Value::Map(m) => {
        f.write_str("map[")?;
        for (i, (k, v)) in m.iter().enumerate() {
          if i > 0 {
            f.write_str(" ")?;
          }
          write!(f, "{k}:{v}")?;
        }
        f.write_str("]")
      }
    }
  }
}

/// Parse and execute a template in one step.
pub fn render(name: &str, text: &str, data: &Value) -> Result<String, TemplateError> {
  Template::parse(name, text)?.execute(data)
}

/// A parsed template.
#[derive(Debug, Clone)]
pub struct Template {
  name: String,
  nodes: Vec<Node>,
}

#[derive(Debug, Clone)]
enum Node {
  Text(String),
  Action(Vec<Command>),
}

#[derive(Debug, Clone)]
struct Command {
  args: Vec<Arg>,
}

#[derive(Debug, Clone)]
struct Arg {
  kind: ArgKind,
  /// Source text, used in exec diagnostics
  text: String,
  line: usize,
  col: usize,
}

#[derive(Debug, Clone)]
enum ArgKind {
  Dot,
  Field(Vec<String>),
  Str(String),
  Func(String),
}

impl Template {
  /// Parse `text` into a template called `name`.
  ///
  /// # Errors
  ///
  /// Returns [`TemplateError::Parse`] with Go-compatible wording, e.g.
  /// `template: name:1: unexpected "}" in operand`.
  pub fn parse(name: &str, text: &str) -> Result<Self, TemplateError> {
    let items = Lexer::new(text).run();
    let mut parser = Parser {
      name,
      items,
      pos: 0,
    };
    let nodes = parser.parse()?;
    Ok(Self {
      name: name.to_string(),
      nodes,
    })
  }

  /// Render the template against `data`.
  ///
  /// Missing map keys are errors rather than empty strings.
  pub fn execute(&self, data: &Value) -> Result<String, TemplateError> {
    let mut out = String::new();
    for node in &self.nodes {
      match node {
        Node::Text(text) => out.push_str(text),
        Node::Action(cmds) => {
          let mut piped: Option<Value> = None;
          for cmd in cmds {
            piped = Some(self.eval_command(cmd, data, piped)?);
          }
          if let Some(value) = piped {
            out.push_str(&value.to_string());
          }
        }
      }
    }
    Ok(out)
  }

  fn eval_command(&self, cmd: &Command, data: &Value, piped: Option<Value>) -> Result<Value, TemplateError> {
    let Some(first) = cmd.args.first() else {
      return Err(TemplateError::Exec(format!("template: {}: empty command", self.name)));
    };

    if let ArgKind::Func(func) = &first.kind {
      let mut args = Vec::with_capacity(cmd.args.len());
      for arg in &cmd.args[1..] {
        args.push(self.eval_arg(arg, data)?);
      }
      args.extend(piped);
      return self.call(first, func, args);
    }

    if cmd.args.len() > 1 || piped.is_some() {
      return Err(self.exec_error(first, format!("can't give argument to non-function {}", first.text)));
    }
    self.eval_arg(first, data)
  }

  fn eval_arg(&self, arg: &Arg, data: &Value) -> Result<Value, TemplateError> {
    match &arg.kind {
      ArgKind::Dot => Ok(data.clone()),
      ArgKind::Str(s) => Ok(Value::Str(s.clone())),
      ArgKind::Field(chain) => {
        let mut current = data;
        for key in chain {
          current = match current {
            Value::Map(map) => map
              .get(key)
              .ok_or_else(|| self.exec_error(arg, format!("map has no entry for key {key:?}")))?,
            Value::Str(_) => {
              return Err(self.exec_error(arg, format!("can't evaluate field {key} in type string")));
            }
          };
        }
        Ok(current.clone())
      }
      // Nested function calls need parentheses, which are not supported
      ArgKind::Func(name) => Err(self.exec_error(arg, format!("can't use function {name} as an argument"))),
    }
  }

  fn call(&self, at: &Arg, func: &str, args: Vec<Value>) -> Result<Value, TemplateError> {
    let want = if func == "replace" { 3 } else { 1 };
    if args.len() != want {
      return Err(self.exec_error(
        at,
        format!("wrong number of args for {func}: want {want} got {}", args.len()),
      ));
    }

    let mut strings = Vec::with_capacity(args.len());
    for arg in args {
      match arg {
        Value::Str(s) => strings.push(s),
        other => {
          return Err(self.exec_error(
            at,
            format!("wrong type for value; expected string; got {}", other.kind()),
          ));
        }
      }
    }

    let result = match func {
      "tolower" => strings[0].to_lowercase(),
      "toupper" => strings[0].to_uppercase(),
      "trim" => strings[0].trim().to_string(),
      "replace" => strings[2].replace(&strings[0], &strings[1]),
      _ => return Err(self.exec_error(at, format!("function {func:?} not defined"))),
    };
    Ok(Value::Str(result))
  }

  fn exec_error(&self, at: &Arg, message: String) -> TemplateError {
    TemplateError::Exec(format!(
      "template: {name}:{line}:{col}: executing {name:?} at <{text}>: {message}",
      name = self.name,
      line = at.line,
      col = at.col,
      text = at.text,
    ))
  }
}

// =============================================================================
// Lexer
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
  Text,
  LeftDelim,
  RightDelim,
  Space,
  Dot,
  Field,
  Ident,
  Str,
  RawStr,
  Number,
  Pipe,
  Char,
  Error,
  Eof,
}

#[derive(Debug, Clone)]
struct Item {
  token: Token,
  val: String,
  line: usize,
  col: usize,
}

impl fmt::Display for Item {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.token {
      Token::Eof => f.write_str("EOF"),
      Token::Error => f.write_str(&self.val),
      _ if self.val.chars().count() > 10 => {
        let head: String = self.val.chars().take(10).collect();
        write!(f, "{head:?}...")
      }
      _ => write!(f, "{:?}", self.val),
    }
  }
}

struct Lexer {
  input: Vec<char>,
  pos: usize,
  line: usize,
  line_start: usize,
  items: Vec<Item>,
  trim_next_text: bool,
}

impl Lexer {
  fn new(text: &str) -> Self {
    Self {
      input: text.chars().collect(),
      pos: 0,
      line: 1,
      line_start: 0,
      items: Vec::new(),
      trim_next_text: false,
    }
  }

  fn run(mut self) -> Vec<Item> {
    loop {
      let done = self.lex_text();
      if done {
        break;
      }
      if !self.lex_action() {
        break;
      }
    }
    self.items
  }

  fn starts_with(&self, s: &str) -> bool {
    let mut i = self.pos;
    for c in s.chars() {
      if self.input.get(i) != Some(&c) {
        return false;
      }
      i += 1;
    }
    true
  }

  fn find(&self, s: &str) -> Option<usize> {
    let needle: Vec<char> = s.chars().collect();
    (self.pos..self.input.len()).find(|&i| self.input[i..].starts_with(&needle))
  }

  fn advance(&mut self, n: usize) -> String {
    let end = (self.pos + n).min(self.input.len());
    let taken: String = self.input[self.pos..end].iter().collect();
    for i in self.pos..end {
      if self.input[i] == '\n' {
        self.line += 1;
        self.line_start = i + 1;
      }
    }
    self.pos = end;
    taken
  }

  /// Byte offset of the current position within its line.
  fn col(&self) -> usize {
    self.input[self.line_start..self.pos].iter().map(|c| c.len_utf8()).sum()
  }

  fn emit(&mut self, token: Token, val: String, line: usize, col: usize) {
    self.items.push(Item { token, val, line, col });
  }

  fn error(&mut self, message: &str) {
    let (line, col) = (self.line, self.col());
    self.emit(Token::Error, message.to_string(), line, col);
  }

  /// Lex plain text up to the next action. Returns true at end of input.
  fn lex_text(&mut self) -> bool {
    let line = self.line;
    let col = self.col();
    let end = self.find(LEFT_DELIM).unwrap_or(self.input.len());
    let mut text = self.advance(end - self.pos);

    if std::mem::take(&mut self.trim_next_text) {
      text = text.trim_start().to_string();
    }
    let left_trim = self.starts_with("{{-") && self.input.get(self.pos + 3).is_some_and(|c| c.is_whitespace());
    if left_trim {
      text = text.trim_end().to_string();
    }
    if !text.is_empty() {
      self.emit(Token::Text, text, line, col);
    }

    if self.pos >= self.input.len() {
      let (line, col) = (self.line, self.col());
      self.emit(Token::Eof, String::new(), line, col);
      return true;
    }

    let (line, col) = (self.line, self.col());
    self.advance(if left_trim { 3 } else { 2 });
    self.emit(Token::LeftDelim, LEFT_DELIM.to_string(), line, col);
    false
  }

  /// Lex the inside of an action. Returns false once an error was emitted.
  fn lex_action(&mut self) -> bool {
    // Comments occupy a whole action
    let after_space = self.input[self.pos..]
      .iter()
      .position(|c| !c.is_whitespace())
      .map(|n| self.pos + n)
      .unwrap_or(self.input.len());
    if self.input[after_space..].starts_with(&['/', '*']) {
      return self.lex_comment(after_space);
    }

    loop {
      let (line, col) = (self.line, self.col());
      let Some(&c) = self.input.get(self.pos) else {
        self.error("unclosed action");
        return false;
      };

      if self.starts_with(RIGHT_DELIM) {
        let val = self.advance(2);
        self.emit(Token::RightDelim, val, line, col);
        return true;
      }

      if c.is_whitespace() {
        let len = self.input[self.pos..].iter().take_while(|c| c.is_whitespace()).count();
        let rest = &self.input[self.pos + len..];
        if rest.starts_with(&['-', '}', '}']) {
          self.advance(len + 1);
          let (line, col) = (self.line, self.col());
          let val = self.advance(2);
          self.emit(Token::RightDelim, val, line, col);
          self.trim_next_text = true;
          return true;
        }
        let val = self.advance(len);
        self.emit(Token::Space, val, line, col);
        continue;
      }

      match c {
        '|' => {
          let val = self.advance(1);
          self.emit(Token::Pipe, val, line, col);
        }
        '"' => {
          if !self.lex_quote(line, col) {
            return false;
          }
        }
        '`' => {
          let Some(close) = self.input[self.pos + 1..].iter().position(|&c| c == '`') else {
            self.error("unterminated raw quoted string");
            return false;
          };
          let val = self.advance(close + 2);
          self.emit(Token::RawStr, val, line, col);
        }
        '.' => {
          let next = self.input.get(self.pos + 1).copied();
          if next.is_some_and(is_ident_char) {
            let len = 1 + self.input[self.pos + 1..]
              .iter()
              .take_while(|&&c| is_ident_char(c) || c == '.')
              .count();
            let val = self.advance(len);
            self.emit(Token::Field, val, line, col);
          } else {
            let val = self.advance(1);
            self.emit(Token::Dot, val, line, col);
          }
        }
        c if c.is_ascii_digit() => {
          let len = self.input[self.pos..].iter().take_while(|c| c.is_ascii_alphanumeric()).count();
          let val = self.advance(len);
          self.emit(Token::Number, val, line, col);
        }
        c if is_ident_char(c) => {
          let len = self.input[self.pos..].iter().take_while(|&&c| is_ident_char(c)).count();
          let val = self.advance(len);
          self.emit(Token::Ident, val, line, col);
        }
        _ => {
          let val = self.advance(1);
          self.emit(Token::Char, val, line, col);
        }
      }
    }
  }

  fn lex_quote(&mut self, line: usize, col: usize) -> bool {
    let mut i = self.pos + 1;
    loop {
      match self.input.get(i) {
        None | Some('\n') => {
          self.error("unterminated quoted string");
          return false;
        }
        Some('\\') => i += 2,
        Some('"') => break,
        Some(_) => i += 1,
      }
    }
    let val = self.advance(i + 1 - self.pos);
    self.emit(Token::Str, val, line, col);
    true
  }

  fn lex_comment(&mut self, start: usize) -> bool {
    self.advance(start + 2 - self.pos);
    let Some(close) = self.find("*/") else {
      self.error("unclosed comment");
      return false;
    };
    self.advance(close + 2 - self.pos);

    if self.starts_with(RIGHT_DELIM) {
      self.advance(2);
      return true;
    }
    let len = self.input[self.pos..].iter().take_while(|c| c.is_whitespace()).count();
    if self.input[self.pos + len..].starts_with(&['-', '}', '}']) {
      self.advance(len + 3);
      self.trim_next_text = true;
      return true;
    }
    self.error("comment ends before closing delimiter");
    false
  }
}

fn is_ident_char(c: char) -> bool {
  c == '_' || c.is_alphanumeric()
}

// =============================================================================
// Parser
// =============================================================================

struct Parser<'a> {
  name: &'a str,
  items: Vec<Item>,
  pos: usize,
}

impl Parser<'_> {
  fn parse(&mut self) -> Result<Vec<Node>, TemplateError> {
    let mut nodes = Vec::new();
    loop {
      let item = self.next();
      match item.token {
        Token::Eof => return Ok(nodes),
        Token::Text => nodes.push(Node::Text(item.val)),
        Token::LeftDelim => {
          // Comment actions produce no tokens before the next text
          if matches!(self.peek().token, Token::Text | Token::Eof | Token::LeftDelim) {
            continue;
          }
          nodes.push(Node::Action(self.pipeline()?));
        }
        _ => return Err(self.unexpected(&item, "input")),
      }
    }
  }

  fn next(&mut self) -> Item {
    let item = self.peek();
    self.pos += 1;
    item
  }

  fn peek(&self) -> Item {
    self.items.get(self.pos).cloned().unwrap_or_else(|| Item {
      token: Token::Eof,
      val: String::new(),
      line: self.items.last().map(|i| i.line).unwrap_or(1),
      col: 0,
    })
  }

  fn next_non_space(&mut self) -> Item {
    loop {
      let item = self.next();
      if item.token != Token::Space {
        return item;
      }
    }
  }

  fn skip_space(&mut self) {
    while self.peek().token == Token::Space {
      self.pos += 1;
    }
  }

  fn pipeline(&mut self) -> Result<Vec<Command>, TemplateError> {
    let mut cmds = Vec::new();
    loop {
      let item = self.next_non_space();
      match item.token {
        Token::RightDelim => {
          if cmds.is_empty() {
            return Err(self.error(item.line, "missing value for command"));
          }
          return Ok(cmds);
        }
        Token::Dot | Token::Field | Token::Ident | Token::Str | Token::RawStr | Token::Number => {
          self.pos -= 1;
          let cmd = self.command()?;
          if let Some(first) = cmd.args.first().filter(|_| !cmds.is_empty()) {
            if !matches!(first.kind, ArgKind::Func(_)) {
              return Err(self.error(
                first.line,
                &format!("non executable command in pipeline stage {}", cmds.len() + 1),
              ));
            }
          }
          cmds.push(cmd);
        }
        _ => return Err(self.unexpected(&item, "command")),
      }
    }
  }

  fn command(&mut self) -> Result<Command, TemplateError> {
    let mut args = Vec::new();
    loop {
      self.skip_space();
      if let Some(arg) = self.operand()? {
        args.push(arg);
      }
      let item = self.next();
      match item.token {
        Token::Space => continue,
        Token::RightDelim => self.pos -= 1,
        Token::Pipe => {
          if self.peek_non_space().token == Token::RightDelim {
            return Err(self.error(item.line, "missing command"));
          }
        }
        _ => return Err(self.unexpected(&item, "operand")),
      }
      break;
    }
    if args.is_empty() {
      return Err(self.error(self.peek().line, "empty command"));
    }
    Ok(Command { args })
  }

  fn peek_non_space(&self) -> Item {
    self
      .items
      .iter()
      .skip(self.pos)
      .find(|i| i.token != Token::Space)
      .cloned()
      .unwrap_or_else(|| self.peek())
  }

  fn operand(&mut self) -> Result<Option<Arg>, TemplateError> {
    let item = self.peek();
    let kind = match item.token {
      Token::Dot => ArgKind::Dot,
      Token::Field => {
        let chain: Vec<String> = item.val.split('.').skip(1).map(str::to_string).collect();
        if chain.iter().any(String::is_empty) {
          return Err(self.error(item.line, &format!("bad field name {:?}", item.val)));
        }
        ArgKind::Field(chain)
      }
      Token::Ident => {
        if !FUNCS.contains(&item.val.as_str()) {
          return Err(self.error(item.line, &format!("function {:?} not defined", item.val)));
        }
        ArgKind::Func(item.val.clone())
      }
      Token::Str => ArgKind::Str(unquote(&item.val)),
      Token::RawStr => ArgKind::Str(item.val.trim_matches('`').to_string()),
      Token::Number => ArgKind::Str(item.val.clone()),
      _ => return Ok(None),
    };
    self.pos += 1;
    Ok(Some(Arg {
      kind,
      text: item.val,
      line: item.line,
      col: item.col,
    }))
  }

  fn unexpected(&self, item: &Item, context: &str) -> TemplateError {
    if item.token == Token::Error {
      return self.error(item.line, &item.to_string());
    }
    self.error(item.line, &format!("unexpected {item} in {context}"))
  }

  fn error(&self, line: usize, message: &str) -> TemplateError {
    TemplateError::Parse(format!("template: {}:{}: {}", self.name, line, message))
  }
}

fn unquote(quoted: &str) -> String {
  let inner = &quoted[1..quoted.len() - 1];
  let mut out = String::with_capacity(inner.len());
  let mut chars = inner.chars();
  while let Some(c) = chars.next() {
    if c != '\\' {
      out.push(c);
      continue;
    }
    match chars.next() {
      Some('n') => out.push('\n'),
      Some('t') => out.push('\t'),
      Some('r') => out.push('\r'),
      Some(other) => out.push(other),
      None => out.push('\\'),
    }
  }
  out
}
