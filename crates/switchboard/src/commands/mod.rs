//! Built-in command sets and the adapters that bind entity accessors to
//! callables.
//!
//! Every registration goes through [`Registrar`], which forwards to
//! [`CommandMap::insert`] so duplicate keys surface as
//! [`RegistryError::DuplicateKey`].

mod download;
mod file;
mod pair;
mod peer;
mod system;
mod tracker;

use std::borrow::Cow;

use crate::command::{Callable, CommandFlags};
use crate::error::{CommandError, RegistryError};
use crate::registry::CommandMap;
use crate::session::Download;
use crate::value::Value;

/// Registers every built-in command.
///
/// # Errors
///
/// Fails when a key is registered twice.
pub fn initialize(map: &mut CommandMap) -> Result<(), RegistryError> {
    let mut registrar = Registrar::new(map);
    download::register(&mut registrar)?;
    file::register(&mut registrar)?;
    peer::register(&mut registrar)?;
    tracker::register(&mut registrar)?;
    pair::register(&mut registrar)?;
    system::register(&mut registrar)?;
    Ok(())
}

/// Builder funnelling registrations into a [`CommandMap`].
pub struct Registrar<'a> {
    map: &'a mut CommandMap,
}

impl<'a> Registrar<'a> {
    /// Wraps a command map.
    pub fn new(map: &'a mut CommandMap) -> Self {
        Self { map }
    }

    /// Registers a command visible to the RPC bridge.
    ///
    /// # Errors
    ///
    /// Fails when `key` is already registered.
    pub fn public(
        &mut self,
        key: &'static str,
        callable: Callable,
        param_spec: &'static str,
    ) -> Result<&mut Self, RegistryError> {
        self.add(key, callable, CommandFlags::PUBLIC_RPC, param_spec, "")
    }

    /// Registers a command only reachable from the command language.
    ///
    /// # Errors
    ///
    /// Fails when `key` is already registered.
    pub fn private(
        &mut self,
        key: &'static str,
        callable: Callable,
        param_spec: &'static str,
    ) -> Result<&mut Self, RegistryError> {
        self.add(key, callable, CommandFlags::empty(), param_spec, "")
    }

    /// Registers a command with explicit flags and documentation.
    ///
    /// # Errors
    ///
    /// Fails when `key` is already registered.
    pub fn add(
        &mut self,
        key: impl Into<Cow<'static, str>>,
        callable: Callable,
        flags: CommandFlags,
        param_spec: impl Into<Cow<'static, str>>,
        doc: impl Into<Cow<'static, str>>,
    ) -> Result<&mut Self, RegistryError> {
        self.map.insert(key, callable, flags, param_spec, doc)?;
        Ok(self)
    }

    /// Registers a command that runs a `;`-separated script against the
    /// target it receives.
    ///
    /// # Errors
    ///
    /// Fails when `key` is already registered.
    pub fn script(
        &mut self,
        key: impl Into<Cow<'static, str>>,
        script: impl Into<String>,
        flags: CommandFlags,
    ) -> Result<&mut Self, RegistryError> {
        self.add(key, script_command(script.into()), flags, "i:", "")
    }
}

/// Wraps a script into an untyped callable.
pub(crate) fn script_command(script: String) -> Callable {
    Callable::any(move |engine, target, _| engine.execute_script(target, &script))
}

/// Reads an integer argument, accepting decimal strings.
///
/// # Errors
///
/// Fails for missing arguments and text that is not a decimal integer.
pub fn int_argument(args: &Value) -> Result<i64, CommandError> {
    match args.argument() {
        Value::Int(value) => Ok(*value),
        Value::String(text) => text
            .trim()
            .parse()
            .map_err(|_| CommandError::input(format!("\"{text}\" is not a number"))),
        Value::Empty => Err(CommandError::missing_argument("expected an integer")),
        other => Err(CommandError::from(crate::value::ValueError::TypeMismatch {
            expected: "int",
            found: other.type_name(),
        })),
    }
}

/// Reads a string argument; an absent argument reads as the empty string and
/// integers are rendered in decimal.
///
/// # Errors
///
/// Fails for lists, maps and raw values.
pub fn string_argument(args: &Value) -> Result<String, CommandError> {
    match args.argument() {
        Value::String(text) => Ok(text.clone()),
        Value::Int(value) => Ok(value.to_string()),
        Value::Empty => Ok(String::new()),
        other => Err(CommandError::from(crate::value::ValueError::TypeMismatch {
            expected: "string",
            found: other.type_name(),
        })),
    }
}

/// Binds a read-only download accessor.
pub fn download_getter(get: impl Fn(&Download) -> Value + 'static) -> Callable {
    Callable::download(move |engine, id, _| Ok(get(engine.session.download(id)?)))
}

/// Binds a fallible download accessor.
pub fn download_try_getter(
    get: impl Fn(&Download) -> Result<Value, CommandError> + 'static,
) -> Callable {
    Callable::download(move |engine, id, _| get(engine.session.download(id)?))
}

/// Binds an integer setter.
pub fn download_int_setter(
    set: impl Fn(&mut Download, i64) -> Result<(), CommandError> + 'static,
) -> Callable {
    Callable::download(move |engine, id, args| {
        let value = int_argument(args)?;
        set(engine.session.download_mut(id)?, value)?;
        Ok(Value::Empty)
    })
}

/// Binds a string setter.
pub fn download_string_setter(
    set: impl Fn(&mut Download, &str) -> Result<(), CommandError> + 'static,
) -> Callable {
    Callable::download(move |engine, id, args| {
        let value = string_argument(args)?;
        set(engine.session.download_mut(id)?, &value)?;
        Ok(Value::Empty)
    })
}

/// Binds an argument-less download action.
pub fn download_action(
    act: impl Fn(&mut Download) -> Result<(), CommandError> + 'static,
) -> Callable {
    Callable::download(move |engine, id, _| {
        act(engine.session.download_mut(id)?)?;
        Ok(Value::Empty)
    })
}

/// Reads a variable of the download's state section.
pub fn variable_getter(key: &'static str) -> Callable {
    download_try_getter(move |download| Ok(download.section()?.get_key(key)?.clone()))
}

/// Writes an integer variable of the download's state section.
pub fn variable_int_setter(key: &'static str) -> Callable {
    download_int_setter(move |download, value| {
        download.section_mut()?.insert_key(key, Value::Int(value))?;
        Ok(())
    })
}

/// Writes a string variable of the download's state section.
pub fn variable_string_setter(key: &'static str) -> Callable {
    download_string_setter(move |download, value| {
        download.section_mut()?.insert_key(key, Value::from(value))?;
        Ok(())
    })
}

/// Operations on a list stored in the download's state section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOp {
    /// Returns a copy of the list.
    Get,
    /// Returns 1 when a structurally equal element exists.
    Has,
    /// Removes every structurally equal element.
    Remove,
    /// Appends the argument.
    PushBack,
    /// Appends the argument unless an element equal to its first element
    /// exists.
    PushBackUnique,
}

/// Binds a list-field operation on `key` of the state section.
///
/// Lookups compare against [`Value::argument`] of the call's argument.
/// Appends store a single-element list as its element and any other
/// argument whole.
pub fn list_field(key: &'static str, op: ListOp) -> Callable {
    Callable::download(move |engine, id, args| {
        let list = engine.session.download_mut(id)?.section_mut()?.get_key_mut(key)?;
        let element = args.argument();
        let appended = match args {
            Value::List(items) if items.len() == 1 => element,
            other => other,
        };
        match op {
            ListOp::Get => Ok(list.as_list()?.clone().into()),
            ListOp::Has => Ok(Value::from(list.list_has(element)?)),
            ListOp::Remove => {
                list.list_remove(element)?;
                Ok(Value::Empty)
            }
            ListOp::PushBack => {
                list.push_back(appended.clone())?;
                Ok(Value::Empty)
            }
            ListOp::PushBackUnique => {
                if !list.list_has(element)? {
                    list.push_back(appended.clone())?;
                }
                Ok(Value::Empty)
            }
        }
    })
}
