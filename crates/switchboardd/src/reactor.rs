//! The thread that owns the command engine.
//!
//! [`Engine`] holds reference-counted callables and is confined to one
//! thread. Connection threads submit requests through a [`ReactorHandle`]
//! and block on a per-request reply channel, so calls run one at a time in
//! arrival order.

use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use switchboard::{Engine, RegistryError, Session, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::bridge::{MethodInfo, MethodTable};
use crate::dispatch::{DispatchError, RpcRequest};

const REACTOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::reactor");

/// Lists the published keys.
pub const LIST_METHODS: &str = "system.listMethods";
/// Returns the parameter signatures of a published key.
pub const METHOD_SIGNATURE: &str = "system.methodSignature";
/// Returns the help text of a published key.
pub const METHOD_HELP: &str = "system.methodHelp";

/// Errors raised while starting or stopping the reactor.
#[derive(Debug, Error)]
pub enum ReactorError {
    /// The built-in command set failed to register.
    #[error("failed to register built-in commands: {0}")]
    Registry(#[from] RegistryError),
    /// The thread could not be spawned.
    #[error("failed to spawn reactor thread: {0}")]
    Spawn(#[source] io::Error),
    /// The thread exited before reporting readiness.
    #[error("reactor thread exited during startup")]
    Startup,
    /// The thread panicked.
    #[error("reactor thread panicked")]
    ThreadPanic,
}

/// Engine plus the method table mirrored from it.
pub struct Reactor {
    engine: Engine,
    methods: MethodTable,
}

impl Reactor {
    /// Builds an engine with the built-in commands over `session` and
    /// publishes its public entries.
    ///
    /// # Errors
    ///
    /// Fails when the built-in set registers a key twice.
    pub fn new(session: Session) -> Result<Self, RegistryError> {
        let mut engine = Engine::with_builtin_commands(session)?;
        let methods = MethodTable::new();
        engine.commands.attach_bridge(Box::new(methods.clone()));
        Ok(Self { engine, methods })
    }

    /// Published methods.
    #[must_use]
    pub const fn methods(&self) -> &MethodTable {
        &self.methods
    }

    /// Runs one request.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownMethod`] for keys that are not
    /// published, [`DispatchError::UnknownDownload`] for unresolvable
    /// targets and [`DispatchError::Command`] when the command fails.
    pub fn handle(&mut self, request: &RpcRequest) -> Result<Value, DispatchError> {
        match request.method.as_str() {
            LIST_METHODS => Ok(Value::List(
                self.methods.keys().into_iter().map(Value::from).collect(),
            )),
            METHOD_SIGNATURE => {
                let info = self.describe(&request.params)?;
                Ok(Value::List(vec![Value::from(info.param_spec)]))
            }
            METHOD_HELP => Ok(Value::from(self.describe(&request.params)?.doc)),
            method => {
                if !self.methods.contains(method) {
                    return Err(DispatchError::unknown_method(method));
                }
                let target = request.target.resolve(&self.engine.session)?;
                self.engine
                    .call(method, &target, &request.params)
                    .map_err(|source| DispatchError::command(method, source))
            }
        }
    }

    fn describe(&self, params: &Value) -> Result<MethodInfo, DispatchError> {
        let key = params
            .argument()
            .as_str()
            .map_err(|error| DispatchError::invalid_structure(error.to_string()))?;
        self.methods
            .get(key)
            .ok_or_else(|| DispatchError::unknown_method(key))
    }

    fn run(mut self, jobs: &Receiver<Job>) -> usize {
        while let Ok(Job { request, reply }) = jobs.recv() {
            let outcome = self.handle(&request);
            if reply.send(outcome).is_err() {
                debug!(target: REACTOR_TARGET, method = %request.method, "caller went away");
            }
        }
        let released = self.engine.shutdown();
        info!(target: REACTOR_TARGET, released, "released command map");
        released
    }

    /// Starts a reactor thread over `session`.
    ///
    /// The engine is built on the new thread; this call returns once it is
    /// ready or has failed.
    ///
    /// # Errors
    ///
    /// Fails when the thread cannot be spawned or the command set does not
    /// register.
    pub fn spawn(session: Session) -> Result<(ReactorHandle, ReactorThread), ReactorError> {
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), RegistryError>>(1);
        let (jobs_tx, jobs_rx) = mpsc::channel::<Job>();
        let thread = thread::Builder::new()
            .name("switchboard-reactor".to_owned())
            .spawn(move || match Self::new(session) {
                Ok(reactor) => {
                    if ready_tx.send(Ok(())).is_err() {
                        return 0;
                    }
                    reactor.run(&jobs_rx)
                }
                Err(error) => {
                    if ready_tx.send(Err(error)).is_err() {
                        debug!(target: REACTOR_TARGET, "startup abandoned");
                    }
                    0
                }
            })
            .map_err(ReactorError::Spawn)?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok((
                ReactorHandle { jobs: jobs_tx },
                ReactorThread { thread },
            )),
            Ok(Err(error)) => Err(ReactorError::Registry(error)),
            Err(_) => Err(ReactorError::Startup),
        }
    }
}

struct Job {
    request: RpcRequest,
    reply: Sender<Result<Value, DispatchError>>,
}

/// Cloneable submission side of the reactor.
///
/// The reactor stops once every handle is dropped.
#[derive(Clone)]
pub struct ReactorHandle {
    jobs: Sender<Job>,
}

impl std::fmt::Debug for ReactorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactorHandle").finish_non_exhaustive()
    }
}

impl ReactorHandle {
    /// Submits `request` and waits for its outcome.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::ReactorUnavailable`] when the reactor has
    /// stopped, and otherwise whatever the request produced.
    pub fn call(&self, request: RpcRequest) -> Result<Value, DispatchError> {
        let (reply, outcome) = mpsc::channel();
        self.jobs
            .send(Job { request, reply })
            .map_err(|_| DispatchError::ReactorUnavailable)?;
        outcome
            .recv()
            .map_err(|_| DispatchError::ReactorUnavailable)?
    }
}

/// Join handle of the reactor thread.
#[derive(Debug)]
pub struct ReactorThread {
    thread: JoinHandle<usize>,
}

impl ReactorThread {
    /// Waits for the reactor to stop and returns how many commands it
    /// released. Every [`ReactorHandle`] must be dropped first.
    ///
    /// # Errors
    ///
    /// Returns [`ReactorError::ThreadPanic`] when the thread panicked.
    pub fn join(self) -> Result<usize, ReactorError> {
        self.thread.join().map_err(|_| ReactorError::ThreadPanic)
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};
    use switchboard::Download;

    use super::*;
    use crate::dispatch::TargetSpec;

    const HASH: &str = "2A2A2A2A2A2A2A2A2A2A2A2A2A2A2A2A2A2A2A2A";

    fn request(method: &str, target: TargetSpec, params: Value) -> RpcRequest {
        RpcRequest {
            method: method.to_owned(),
            target,
            params,
        }
    }

    #[fixture]
    fn reactor() -> Reactor {
        let mut session = Session::new();
        session.insert(Download::new("debian.iso", [0x2a; 20]));
        Reactor::new(session).expect("reactor")
    }

    #[rstest]
    fn serves_public_commands(mut reactor: Reactor) {
        let value = reactor
            .handle(&request(
                "d.get_name",
                TargetSpec::Download(HASH.to_owned()),
                Value::Empty,
            ))
            .expect("call");
        assert_eq!(value, Value::from("debian.iso"));
    }

    #[rstest]
    fn refuses_private_commands(mut reactor: Reactor) {
        assert!(reactor.engine.commands.contains("print"));
        let error = reactor
            .handle(&request("print", TargetSpec::Generic, Value::from("hi")))
            .expect_err("private");
        assert!(matches!(error, DispatchError::UnknownMethod { .. }));
    }

    #[rstest]
    fn lists_exactly_the_published_keys(mut reactor: Reactor) {
        let listed = reactor
            .handle(&request(LIST_METHODS, TargetSpec::Generic, Value::Empty))
            .expect("list");
        let Value::List(listed) = listed else {
            panic!("expected a list, got {listed:?}");
        };
        let listed: Vec<String> = listed.iter().map(ToString::to_string).collect();
        let mut published: Vec<String> = reactor
            .engine
            .commands
            .public_keys()
            .into_iter()
            .map(str::to_owned)
            .collect();
        published.sort();
        assert_eq!(listed, published);
        assert!(listed.iter().any(|key| key == "d.multicall"));
        assert!(!listed.iter().any(|key| key == "print"));
    }

    #[rstest]
    fn describes_published_methods(mut reactor: Reactor) {
        let signature = reactor
            .handle(&request(METHOD_SIGNATURE, TargetSpec::Generic, Value::from("less")))
            .expect("signature");
        assert_eq!(signature, Value::List(vec![Value::from("i:s")]));

        let error = reactor
            .handle(&request(METHOD_HELP, TargetSpec::Generic, Value::from("print")))
            .expect_err("private");
        assert!(matches!(error, DispatchError::UnknownMethod { .. }));
    }

    #[rstest]
    fn command_failures_are_wrapped(mut reactor: Reactor) {
        let error = reactor
            .handle(&request("d.get_name", TargetSpec::Generic, Value::Empty))
            .expect_err("mismatch");
        assert_eq!(error.code(), "target_type_mismatch");
    }

    #[rstest]
    fn methods_inserted_at_runtime_become_callable(mut reactor: Reactor) {
        reactor
            .handle(&request(
                "method.insert",
                TargetSpec::Generic,
                Value::List(vec![
                    Value::from("d.label"),
                    Value::from("simple|public"),
                    Value::from("d.get_name"),
                ]),
            ))
            .expect("insert");
        assert!(reactor.methods().contains("d.label"));
        let value = reactor
            .handle(&request(
                "d.label",
                TargetSpec::Download(HASH.to_owned()),
                Value::Empty,
            ))
            .expect("call");
        assert_eq!(value, Value::from("debian.iso"));
    }

    #[test]
    fn spawned_reactor_stops_when_handles_drop() {
        let (handle, thread) = Reactor::spawn(Session::new()).expect("spawn");
        let listed = handle
            .call(request(LIST_METHODS, TargetSpec::Generic, Value::Empty))
            .expect("list");
        assert!(matches!(listed, Value::List(ref keys) if !keys.is_empty()));
        drop(handle);
        assert!(thread.join().expect("join") > 0);
    }
}
