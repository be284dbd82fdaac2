//! `f.*` commands on files and `fi.*` commands on file cursors.

use crate::command::Callable;
use crate::error::{CommandError, RegistryError};
use crate::session::{File, FileList};
use crate::value::Value;

use super::{Registrar, int_argument};

fn file_getter(get: impl Fn(&FileList, usize, &File) -> Value + 'static) -> Callable {
    Callable::file(move |engine, file, _| {
        let list = &engine.session.download(file.download)?.files;
        let entry = list
            .files
            .get(file.index)
            .ok_or_else(|| CommandError::invalid_handle(file))?;
        Ok(get(list, file.index, entry))
    })
}

/// Binds a cursor command that only runs while the cursor points at a file.
fn cursor_getter(get: impl Fn(usize, usize) -> Value + 'static) -> Callable {
    Callable::file_iterator(move |engine, cursor, _| {
        let len = engine.session.download(cursor.download)?.files.len();
        if cursor.position >= len {
            return Err(CommandError::invalid_handle(cursor));
        }
        Ok(get(cursor.position, len))
    })
}

pub(super) fn register(registrar: &mut Registrar<'_>) -> Result<(), RegistryError> {
    registrar
        .public(
            "f.get_path",
            file_getter(|_, _, file| file.path_string().into()),
            "s:",
        )?
        .public(
            "f.get_path_components",
            file_getter(|_, _, file| {
                Value::List(file.path.iter().map(|part| part.as_str().into()).collect())
            }),
            "i:",
        )?
        .public(
            "f.get_size_bytes",
            file_getter(|_, _, file| file.size_bytes.into()),
            "i:",
        )?
        .public(
            "f.get_size_chunks",
            file_getter(|list, index, _| list.file_chunks(index).into()),
            "i:",
        )?
        .public(
            "f.get_completed_chunks",
            file_getter(|_, _, file| file.completed_chunks.into()),
            "i:",
        )?
        .public(
            "f.get_offset",
            file_getter(|list, index, _| list.offset(index).into()),
            "i:",
        )?
        .public(
            "f.get_priority",
            file_getter(|_, _, file| file.priority.into()),
            "i:",
        )?
        .public(
            "f.set_priority",
            Callable::file(|engine, file, args| {
                let priority = int_argument(args)?;
                if !(0..=2).contains(&priority) {
                    return Err(CommandError::input("invalid file priority"));
                }
                engine.session.file_mut(file)?.priority = priority;
                Ok(Value::Empty)
            }),
            "i:i",
        )?
        .public(
            "fi.get_position",
            cursor_getter(|position, _| i64::try_from(position).unwrap_or(i64::MAX).into()),
            "i:",
        )?
        .public(
            "fi.is_last",
            cursor_getter(|position, len| (position == len - 1).into()),
            "i:",
        )?;
    Ok(())
}
