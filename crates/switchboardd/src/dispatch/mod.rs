//! JSONL request dispatch.
//!
//! A connection carries one request line and receives one outcome line (a
//! `result` or an `error`) followed by an `exit` line:
//!
//! ```text
//! -> {"method":"d.get_name","target":{"download":"0A1B…"}}
//! <- {"kind":"result","value":"ubuntu.iso"}
//! <- {"kind":"exit","status":0}
//! ```

mod errors;
mod handler;
mod request;
mod response;

pub use self::errors::DispatchError;
pub use self::handler::{MAX_REQUEST_BYTES, RpcConnectionHandler};
pub use self::request::{RpcRequest, TargetSpec};
pub use self::response::{ResponseMessage, ResponseWriter};

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
