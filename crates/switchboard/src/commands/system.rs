//! Session-wide commands and runtime method management.

use tracing::info;

use crate::command::{Callable, CommandFlags};
use crate::dispatch::{DISPATCH_TARGET, Engine};
use crate::error::{CommandError, RegistryError};
use crate::multicall;
use crate::value::Value;

use super::{Registrar, script_command, string_argument};

pub(super) fn register(registrar: &mut Registrar<'_>) -> Result<(), RegistryError> {
    registrar
        .public(
            "download_list",
            Callable::generic(|engine, _| {
                Ok(Value::List(
                    engine
                        .session
                        .iter()
                        .map(|(_, download)| download.hash_hex().into())
                        .collect(),
                ))
            }),
            "A:",
        )?
        .public("d.multicall", Callable::generic(multicall::download_multicall), "A:s")?
        .private("print", Callable::generic(print), "i:s")?
        .public("method.insert", Callable::generic(method_insert), "i:sss")?
        .public("method.alias", Callable::generic(method_alias), "i:ss")?
        .public(
            "method.erase",
            Callable::generic(|engine, args| {
                let key = string_argument(args)?;
                Ok(engine.commands.erase(&key).into())
            }),
            "i:s",
        )?
        .public(
            "method.exists",
            Callable::generic(|engine, args| {
                let key = string_argument(args)?;
                Ok(engine.commands.contains(&key).into())
            }),
            "i:s",
        )?;
    Ok(())
}

fn print(engine: &mut Engine, args: &Value) -> Result<Value, CommandError> {
    let message = match args {
        Value::List(parts) => parts.iter().map(ToString::to_string).collect::<String>(),
        other => other.to_string(),
    };
    info!(target: DISPATCH_TARGET, "{message}");
    engine.messages.push(message);
    Ok(Value::Empty)
}

/// Positional string arguments of a method-management command.
fn strings<const N: usize>(args: &Value, usage: &str) -> Result<[String; N], CommandError> {
    let list = match args {
        Value::List(list) => list.as_slice(),
        other => std::slice::from_ref(other),
    };
    if list.len() < N {
        return Err(CommandError::missing_argument(usage));
    }
    let mut out: [String; N] = std::array::from_fn(|_| String::new());
    for (slot, value) in out.iter_mut().zip(list) {
        value.as_str()?.clone_into(slot);
    }
    Ok(out)
}

/// `method.insert=key,kind,script` registers `script` under `key`.
///
/// `kind` is `simple`, optionally followed by `|public` or `|private`.
fn method_insert(engine: &mut Engine, args: &Value) -> Result<Value, CommandError> {
    let [key, kind, script] = strings::<3>(args, "expected key, kind and script")?;
    let mut flags = CommandFlags::empty();
    let mut parts = kind.split('|').map(str::trim);
    if parts.next() != Some("simple") {
        return Err(CommandError::input(format!("unsupported method kind \"{kind}\"")));
    }
    for modifier in parts {
        match modifier {
            "public" => flags |= CommandFlags::PUBLIC_RPC,
            "private" => flags.remove(CommandFlags::PUBLIC_RPC),
            other => {
                return Err(CommandError::input(format!(
                    "unknown method modifier \"{other}\""
                )));
            }
        }
    }
    if key.is_empty() {
        return Err(CommandError::missing_argument("expected a method key"));
    }
    engine
        .commands
        .insert(key, script_command(script), flags, "i:", "")?;
    Ok(Value::Empty)
}

/// `method.alias=new_key,existing_key`.
fn method_alias(engine: &mut Engine, args: &Value) -> Result<Value, CommandError> {
    let [alias, source] = strings::<2>(args, "expected alias and source keys")?;
    engine.commands.insert_alias(alias, &source)?;
    Ok(Value::Empty)
}
