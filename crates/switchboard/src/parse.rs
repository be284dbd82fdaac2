//! The command language.
//!
//! A command string is a key optionally followed by `=` and a
//! comma-separated argument list:
//!
//! ```text
//! d.get_name
//! d.set_custom=label,"two words"
//! d.views.push_back_unique={main,started}
//! ```
//!
//! Arguments are bare words (trimmed), double-quoted strings with backslash
//! escapes, or brace-delimited nested lists. No arguments parse to
//! [`Value::Empty`], one argument to that value, several to a list. Scripts
//! join statements with `;`.

use crate::error::CommandError;
use crate::value::Value;

/// A parsed command string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Registry key.
    pub key: String,
    /// Argument value.
    pub args: Value,
}

/// Parses a single command string.
///
/// # Errors
///
/// Returns [`CommandError::Parse`] for an empty or malformed key and for
/// unbalanced quotes or braces.
pub fn parse_command(text: &str) -> Result<ParsedCommand, CommandError> {
    let (key, rest) = match text.split_once('=') {
        Some((key, rest)) => (key.trim(), Some(rest)),
        None => (text.trim(), None),
    };
    if key.is_empty() {
        return Err(CommandError::parse(format!("missing command key in \"{text}\"")));
    }
    if key
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '"' | '{' | '}' | ',' | ';'))
    {
        return Err(CommandError::parse(format!("invalid command key \"{key}\"")));
    }
    let args = match rest {
        Some(rest) => parse_arguments(rest)?,
        None => Value::Empty,
    };
    Ok(ParsedCommand {
        key: key.to_owned(),
        args,
    })
}

/// Parses an argument list on its own.
///
/// # Errors
///
/// Returns [`CommandError::Parse`] for unbalanced quotes or braces and for
/// text trailing a closed list.
pub fn parse_arguments(text: &str) -> Result<Value, CommandError> {
    if text.trim().is_empty() {
        return Ok(Value::Empty);
    }
    let mut parser = Parser::new(text);
    let mut items = parser.elements(false)?;
    if items.len() == 1 {
        Ok(items.remove(0))
    } else {
        Ok(Value::List(items))
    }
}

/// Splits a script into statements on `;` outside quotes and braces.
///
/// # Errors
///
/// Returns [`CommandError::Parse`] for unbalanced quotes or braces.
pub fn split_script(script: &str) -> Result<Vec<&str>, CommandError> {
    let mut statements = Vec::new();
    let mut depth = 0_usize;
    let mut quoted = false;
    let mut escaped = false;
    let mut start = 0;
    for (index, c) in script.char_indices() {
        if quoted {
            match (escaped, c) {
                (true, _) => escaped = false,
                (false, '\\') => escaped = true,
                (false, '"') => quoted = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => quoted = true,
            '{' => depth += 1,
            '}' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| CommandError::parse("unbalanced '}' in script"))?;
            }
            ';' if depth == 0 => {
                statements.push(script.get(start..index).unwrap_or_default().trim());
                start = index + 1;
            }
            _ => {}
        }
    }
    if quoted {
        return Err(CommandError::parse("unterminated string in script"));
    }
    if depth != 0 {
        return Err(CommandError::parse("unterminated list in script"));
    }
    statements.push(script.get(start..).unwrap_or_default().trim());
    Ok(statements)
}

struct Parser<'a> {
    text: &'a str,
    position: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, position: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.text
            .get(self.position..)
            .and_then(|rest| rest.chars().next())
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.position += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// Parses elements until the end of input or, when `nested`, a closing
    /// brace.
    fn elements(&mut self, nested: bool) -> Result<Vec<Value>, CommandError> {
        let mut items = Vec::new();
        self.skip_whitespace();
        if nested && self.peek() == Some('}') {
            self.bump();
            return Ok(items);
        }
        loop {
            items.push(self.element()?);
            self.skip_whitespace();
            match self.bump() {
                Some(',') => {}
                Some('}') if nested => return Ok(items),
                None if !nested => return Ok(items),
                None => return Err(CommandError::parse("unterminated list")),
                Some(other) => {
                    return Err(CommandError::parse(format!(
                        "unexpected '{other}' at byte {}",
                        self.position - other.len_utf8()
                    )));
                }
            }
        }
    }

    fn element(&mut self) -> Result<Value, CommandError> {
        self.skip_whitespace();
        match self.peek() {
            Some('"') => {
                self.bump();
                self.quoted().map(Value::String)
            }
            Some('{') => {
                self.bump();
                self.elements(true).map(Value::List)
            }
            _ => Ok(Value::from(self.bare())),
        }
    }

    fn quoted(&mut self) -> Result<String, CommandError> {
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(other) => out.push(other),
                    None => break,
                },
                Some(other) => out.push(other),
                None => break,
            }
        }
        Err(CommandError::parse("unterminated string"))
    }

    fn bare(&mut self) -> &'a str {
        let start = self.position;
        while self.peek().is_some_and(|c| !matches!(c, ',' | '}')) {
            self.bump();
        }
        self.text
            .get(start..self.position)
            .unwrap_or_default()
            .trim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn list(items: &[Value]) -> Value {
        Value::List(items.to_vec())
    }

    #[rstest]
    #[case("d.get_name", "d.get_name", Value::Empty)]
    #[case("d.get_name=", "d.get_name", Value::Empty)]
    #[case(" d.set_message = hello ", "d.set_message", Value::from("hello"))]
    #[case("d.set_custom=label,music", "d.set_custom", list(&[Value::from("label"), Value::from("music")]))]
    #[case("print=\"a, b\"", "print", Value::from("a, b"))]
    #[case("print=\"say \\\"hi\\\"\"", "print", Value::from("say \"hi\""))]
    #[case("x={a,{b,c}},d", "x", list(&[
        list(&[Value::from("a"), list(&[Value::from("b"), Value::from("c")])]),
        Value::from("d"),
    ]))]
    #[case("x={}", "x", Value::list())]
    #[case("x=a,", "x", list(&[Value::from("a"), Value::from("")]))]
    fn parses_commands(#[case] text: &str, #[case] key: &str, #[case] args: Value) {
        let parsed = parse_command(text).expect("parses");
        assert_eq!(parsed.key, key);
        assert_eq!(parsed.args, args);
    }

    #[rstest]
    #[case("")]
    #[case("=value")]
    #[case("two words=x")]
    #[case("x=\"open")]
    #[case("x={a,b")]
    #[case("x={a}b")]
    fn rejects_malformed_commands(#[case] text: &str) {
        let error = parse_command(text).expect_err("malformed");
        assert!(matches!(error, CommandError::Parse { .. }), "{error:?}");
    }

    #[test]
    fn splits_scripts_outside_quotes_and_braces() {
        let statements =
            split_script("a=1 ;b=\"x;y\";c={p;q}; ").expect("splits");
        assert_eq!(statements, vec!["a=1", "b=\"x;y\"", "c={p;q}", ""]);
    }

    #[rstest]
    #[case("a=\"open")]
    #[case("a={")]
    #[case("a=}")]
    fn rejects_unbalanced_scripts(#[case] script: &str) {
        assert!(split_script(script).is_err());
    }
}
