//! Per-connection request handling.

use std::io::{BufRead, BufReader, Read};

use switchboard::Value;
use tracing::{debug, warn};

use super::DISPATCH_TARGET;
use super::errors::DispatchError;
use super::request::RpcRequest;
use super::response::ResponseWriter;
use crate::reactor::ReactorHandle;
use crate::transport::{ConnectionHandler, ConnectionStream};

/// Largest accepted request line, newline included.
pub const MAX_REQUEST_BYTES: u64 = 64 * 1024;

/// Reads one request from each connection and forwards it to the reactor.
#[derive(Debug, Clone)]
pub struct RpcConnectionHandler {
    reactor: ReactorHandle,
}

impl RpcConnectionHandler {
    /// Creates a handler submitting to `reactor`.
    #[must_use]
    pub const fn new(reactor: ReactorHandle) -> Self {
        Self { reactor }
    }

    fn serve(&self, stream: &mut ConnectionStream) -> Option<Result<Value, DispatchError>> {
        let line = match read_request_line(stream) {
            Ok(Some(line)) => line,
            Ok(None) => return None,
            Err(error) => return Some(Err(error)),
        };
        Some(RpcRequest::parse(&line).and_then(|request| {
            debug!(
                target: DISPATCH_TARGET,
                method = %request.method,
                target_spec = ?request.target,
                "dispatching request"
            );
            self.reactor.call(request)
        }))
    }
}

impl ConnectionHandler for RpcConnectionHandler {
    fn handle(&self, mut stream: ConnectionStream) {
        let Some(outcome) = self.serve(&mut stream) else {
            debug!(target: DISPATCH_TARGET, "connection closed without a request");
            return;
        };
        if let Err(error) = &outcome {
            debug!(
                target: DISPATCH_TARGET,
                code = error.code(),
                error = %error,
                "request failed"
            );
        }
        if let Err(error) = ResponseWriter::new(&mut stream).write_outcome(&outcome) {
            warn!(target: DISPATCH_TARGET, error = %error, "failed to write response");
        }
    }
}

/// Reads bytes up to and including the first newline, or to end of stream.
/// Returns `None` when the peer sent nothing.
fn read_request_line<R: Read>(stream: &mut R) -> Result<Option<Vec<u8>>, DispatchError> {
    let mut line = Vec::new();
    let mut reader = BufReader::new(stream.by_ref().take(MAX_REQUEST_BYTES + 1));
    if reader.read_until(b'\n', &mut line)? == 0 {
        return Ok(None);
    }
    if line.len() as u64 > MAX_REQUEST_BYTES {
        return Err(DispatchError::RequestTooLarge {
            limit: MAX_REQUEST_BYTES,
        });
    }
    Ok(Some(line))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(b"{\"method\":\"x\"}\nignored".as_slice(), b"{\"method\":\"x\"}\n".as_slice())]
    #[case(b"{\"method\":\"x\"}".as_slice(), b"{\"method\":\"x\"}".as_slice())]
    fn reads_first_line(#[case] input: &[u8], #[case] expected: &[u8]) {
        let mut cursor = Cursor::new(input);
        let line = read_request_line(&mut cursor).expect("read").expect("line");
        assert_eq!(line, expected);
    }

    #[test]
    fn empty_stream_has_no_request() {
        let mut cursor = Cursor::new(Vec::new());
        assert!(read_request_line(&mut cursor).expect("read").is_none());
    }

    #[test]
    fn oversized_line_is_rejected() {
        let size = usize::try_from(MAX_REQUEST_BYTES).expect("fits") + 10;
        let mut cursor = Cursor::new(vec![b'a'; size]);
        let error = read_request_line(&mut cursor).expect_err("too large");
        assert!(matches!(error, DispatchError::RequestTooLarge { .. }));
    }
}
