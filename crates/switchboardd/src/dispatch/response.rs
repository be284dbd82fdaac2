//! Response lines written back to RPC clients.

use std::io::Write;

use serde::Serialize;
use switchboard::Value;

use super::errors::DispatchError;

/// One response line, tagged by `kind`.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseMessage<'a> {
    /// The command's return value.
    Result {
        /// Returned value.
        value: &'a Value,
    },
    /// Why the request failed.
    Error {
        /// Stable error code.
        code: &'static str,
        /// Rendered error.
        message: String,
    },
    /// Final line of every response.
    Exit {
        /// Zero on success, see [`DispatchError::exit_status`] otherwise.
        status: i32,
    },
}

/// JSONL writer for [`ResponseMessage`]s.
pub struct ResponseWriter<W> {
    writer: W,
}

impl<W: Write> ResponseWriter<W> {
    /// Wraps an output stream.
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes one message followed by a newline.
    ///
    /// # Errors
    ///
    /// Fails when encoding or writing fails.
    pub fn write_message(&mut self, message: &ResponseMessage<'_>) -> Result<(), DispatchError> {
        serde_json::to_writer(&mut self.writer, message).map_err(DispatchError::SerializeResponse)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    /// Writes a successful outcome.
    ///
    /// # Errors
    ///
    /// Fails when encoding or writing fails.
    pub fn write_result(&mut self, value: &Value) -> Result<(), DispatchError> {
        self.write_message(&ResponseMessage::Result { value })
    }

    /// Writes a failed outcome.
    ///
    /// # Errors
    ///
    /// Fails when writing fails.
    pub fn write_error(&mut self, error: &DispatchError) -> Result<(), DispatchError> {
        self.write_message(&ResponseMessage::Error {
            code: error.code(),
            message: error.to_string(),
        })
    }

    /// Writes the closing line and flushes.
    ///
    /// # Errors
    ///
    /// Fails when writing or flushing fails.
    pub fn write_exit(&mut self, status: i32) -> Result<(), DispatchError> {
        self.write_message(&ResponseMessage::Exit { status })?;
        self.writer.flush()?;
        Ok(())
    }

    /// Writes a full response for `outcome`: the outcome line, then the exit
    /// line.
    ///
    /// # Errors
    ///
    /// Fails when encoding or writing fails.
    pub fn write_outcome(&mut self, outcome: &Result<Value, DispatchError>) -> Result<(), DispatchError> {
        match outcome {
            Ok(value) => {
                self.write_result(value)?;
                self.write_exit(0)
            }
            Err(error) => {
                self.write_error(error)?;
                self.write_exit(error.exit_status())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use switchboard::CommandError;

    use super::*;

    fn lines(buffer: &[u8]) -> Vec<String> {
        String::from_utf8(buffer.to_vec())
            .expect("utf-8")
            .lines()
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn success_writes_result_then_exit() {
        let mut buffer = Vec::new();
        let value = Value::List(vec![Value::Int(3), Value::from("x"), Value::Empty]);
        ResponseWriter::new(&mut buffer)
            .write_outcome(&Ok(value))
            .expect("write");
        assert_eq!(
            lines(&buffer),
            vec![
                r#"{"kind":"result","value":[3,"x",null]}"#.to_owned(),
                r#"{"kind":"exit","status":0}"#.to_owned(),
            ]
        );
    }

    #[test]
    fn failure_writes_code_message_and_status() {
        let mut buffer = Vec::new();
        let error = DispatchError::command("f.multicall", CommandError::TooFewArguments);
        ResponseWriter::new(&mut buffer)
            .write_outcome(&Err(error))
            .expect("write");
        assert_eq!(
            lines(&buffer),
            vec![
                r#"{"kind":"error","code":"too_few_arguments","message":"too few arguments"}"#
                    .to_owned(),
                r#"{"kind":"exit","status":1}"#.to_owned(),
            ]
        );
    }

    #[test]
    fn maps_serialise_as_objects() {
        let mut buffer = Vec::new();
        let mut map = Value::map();
        map.insert_key("ratio", Value::Int(2)).expect("insert");
        ResponseWriter::new(&mut buffer)
            .write_result(&map)
            .expect("write");
        assert_eq!(lines(&buffer), vec![r#"{"kind":"result","value":{"ratio":2}}"#.to_owned()]);
    }
}
