//! `d.*` commands operating on a single download.

use tracing::warn;

use crate::command::{Callable, CommandFlags};
use crate::dispatch::{DISPATCH_TARGET, Engine};
use crate::error::{CommandError, RegistryError};
use crate::multicall;
use crate::session::{ConnectionType, Download};
use crate::target::{DownloadId, Target};
use crate::value::Value;

use super::{
    ListOp, Registrar, download_action, download_getter, download_int_setter,
    download_string_setter, download_try_getter, list_field, string_argument, variable_getter,
    variable_int_setter, variable_string_setter,
};

type IntGetter = fn(&Download) -> i64;

pub(super) fn register(registrar: &mut Registrar<'_>) -> Result<(), RegistryError> {
    register_identity(registrar)?;
    register_lifecycle(registrar)?;
    register_variables(registrar)?;
    register_custom(registrar)?;
    register_views(registrar)?;
    register_statistics(registrar)?;
    register_settings(registrar)?;

    registrar
        .public(
            "f.multicall",
            Callable::download(multicall::file_multicall),
            "i:",
        )?
        .public(
            "p.multicall",
            Callable::download(multicall::peer_multicall),
            "i:",
        )?
        .public(
            "t.multicall",
            Callable::download(multicall::tracker_multicall),
            "i:",
        )?;

    registrar
        .script(
            "d.start",
            "d.set_hashing_failed=0 ;d.views.push_back_unique=started ;d.views.remove=stopped ;d.resume",
            CommandFlags::PUBLIC_RPC,
        )?
        .script(
            "d.stop",
            "d.views.push_back_unique=stopped ;d.views.remove=started ;d.pause",
            CommandFlags::PUBLIC_RPC,
        )?;
    Ok(())
}

fn register_identity(registrar: &mut Registrar<'_>) -> Result<(), RegistryError> {
    registrar
        .public("d.get_hash", download_getter(|d| d.hash_hex().into()), "s:")?
        .public(
            "d.get_local_id",
            download_getter(|d| hex::encode_upper(d.local_id).into()),
            "s:",
        )?
        .public(
            "d.get_local_id_html",
            download_getter(|d| escape_html(&d.local_id).into()),
            "s:",
        )?
        .public("d.get_base_path", download_getter(|d| d.base_path().into()), "s:")?
        .public(
            "d.get_base_filename",
            download_getter(|d| d.base_filename().into()),
            "s:",
        )?
        .public("d.get_name", download_getter(|d| d.name.as_str().into()), "s:")?
        .public("d.get_bitfield", download_getter(|d| d.bitfield_hex().into()), "s:")?;
    Ok(())
}

fn register_lifecycle(registrar: &mut Registrar<'_>) -> Result<(), RegistryError> {
    registrar
        .public("d.resume", download_action(Download::resume), "i:")?
        .public(
            "d.pause",
            download_action(Download::pause),
            "i:",
        )?
        .public(
            "d.open",
            download_action(|d| {
                d.open();
                Ok(())
            }),
            "i:",
        )?
        .public("d.close", download_action(Download::close), "i:")?
        .public("d.erase", Callable::download(erase), "i:")?
        .public("d.check_hash", download_action(Download::check_hash), "i:")?
        .public("d.add_peer", download_string_setter(Download::add_peer), "i:s")?
        .public("d.delete_tied", Callable::download(delete_tied), "i:")?
        .public("d.try_start", Callable::download(try_start), "i:")?
        .public("d.try_stop", Callable::download(try_stop), "i:")?
        .public("d.try_close", Callable::download(try_close), "i:")?;

    let flags: [(&'static str, IntGetter); 7] = [
        ("d.is_open", |d| i64::from(d.open)),
        ("d.is_active", |d| i64::from(d.active)),
        ("d.is_hash_checked", |d| i64::from(d.hash_checked)),
        ("d.is_hash_checking", |d| i64::from(d.hash_checking)),
        ("d.is_multi_file", |d| i64::from(d.files.multi_file)),
        ("d.is_private", |d| i64::from(d.private)),
        ("d.is_pex_active", |d| i64::from(d.pex_active)),
    ];
    register_int_getters(registrar, &flags)
}

fn register_variables(registrar: &mut Registrar<'_>) -> Result<(), RegistryError> {
    for (name, get, set) in [
        ("state", "d.get_state", "d.set_state"),
        ("complete", "d.get_complete", "d.set_complete"),
        ("mode", "d.get_mode", "d.set_mode"),
        ("hashing", "d.get_hashing", "d.set_hashing"),
        ("state_changed", "d.get_state_changed", "d.set_state_changed"),
        ("state_counter", "d.get_state_counter", "d.set_state_counter"),
    ] {
        registrar
            .public(get, variable_getter(name), "i:")?
            .private(set, variable_int_setter(name), "i:i")?;
    }
    registrar
        .public("d.get_ignore_commands", variable_getter("ignore_commands"), "i:")?
        .public(
            "d.set_ignore_commands",
            variable_int_setter("ignore_commands"),
            "i:i",
        )?
        .public("d.get_tied_to_file", variable_getter("tied_to_file"), "s:")?
        .public(
            "d.set_tied_to_file",
            variable_string_setter("tied_to_file"),
            "i:s",
        )?
        .public("d.get_loaded_file", variable_getter("loaded_file"), "s:")?
        .private(
            "d.set_loaded_file",
            variable_string_setter("loaded_file"),
            "i:s",
        )?
        .public(
            "d.get_connection_leech",
            variable_getter("connection_leech"),
            "s:",
        )?
        .private(
            "d.set_connection_leech",
            variable_string_setter("connection_leech"),
            "i:s",
        )?
        .public(
            "d.get_connection_seed",
            variable_getter("connection_seed"),
            "s:",
        )?
        .private(
            "d.set_connection_seed",
            variable_string_setter("connection_seed"),
            "i:s",
        )?
        .public(
            "d.get_throttle_name",
            variable_getter("throttle_name"),
            "s:",
        )?
        .public(
            "d.set_throttle_name",
            variable_string_setter("throttle_name"),
            "i:s",
        )?
        .public(
            "d.get_connection_current",
            download_getter(|d| d.connection_type.as_str().into()),
            "s:",
        )?
        .public(
            "d.set_connection_current",
            download_string_setter(|d, name| {
                d.connection_type = name.parse::<ConnectionType>()?;
                Ok(())
            }),
            "i:s",
        )?;
    Ok(())
}

fn register_custom(registrar: &mut Registrar<'_>) -> Result<(), RegistryError> {
    for (name, get, set) in [
        ("custom1", "d.get_custom1", "d.set_custom1"),
        ("custom2", "d.get_custom2", "d.set_custom2"),
        ("custom3", "d.get_custom3", "d.set_custom3"),
        ("custom4", "d.get_custom4", "d.set_custom4"),
        ("custom5", "d.get_custom5", "d.set_custom5"),
    ] {
        registrar
            .public(get, variable_getter(name), "s:")?
            .public(set, variable_string_setter(name), "i:s")?;
    }
    registrar
        .public("d.set_custom", Callable::download(set_custom), "i:")?
        .public(
            "d.get_custom",
            Callable::download(|engine, id, args| {
                let key = string_argument(args)?;
                Ok(custom_field(engine.session.download(id)?, &key)
                    .unwrap_or_default()
                    .into())
            }),
            "s:s",
        )?
        .public(
            "d.get_custom_throw",
            Callable::download(|engine, id, args| {
                let key = string_argument(args)?;
                custom_field(engine.session.download(id)?, &key)
                    .map(Value::from)
                    .ok_or_else(|| CommandError::input("no such custom value"))
            }),
            "s:s",
        )?;
    Ok(())
}

fn register_views(registrar: &mut Registrar<'_>) -> Result<(), RegistryError> {
    registrar
        .public("d.views", list_field("views", ListOp::Get), "i:")?
        .public("d.views.has", list_field("views", ListOp::Has), "i:")?
        .public("d.views.remove", list_field("views", ListOp::Remove), "i:")?
        .public(
            "d.views.push_back",
            list_field("views", ListOp::PushBack),
            "i:",
        )?
        .public(
            "d.views.push_back_unique",
            list_field("views", ListOp::PushBackUnique),
            "i:",
        )?;
    Ok(())
}

fn register_statistics(registrar: &mut Registrar<'_>) -> Result<(), RegistryError> {
    let getters: [(&'static str, IntGetter); 25] = [
        ("d.get_peers_connected", |d| count(d.peers.len())),
        ("d.get_peers_not_connected", |d| count(d.pending_peers.len())),
        ("d.get_peers_complete", |d| d.peers_complete),
        ("d.get_peers_accounted", |d| d.peers_accounted),
        ("d.get_up_rate", |d| d.up.rate),
        ("d.get_up_total", |d| d.up.total),
        ("d.get_down_rate", |d| d.down.rate),
        ("d.get_down_total", |d| d.down.total),
        ("d.get_skip_rate", |d| d.skip.rate),
        ("d.get_skip_total", |d| d.skip.total),
        ("d.get_creation_date", |d| d.creation_date),
        ("d.get_bytes_done", |d| d.bytes_done),
        ("d.get_ratio", Download::ratio),
        ("d.get_chunks_hashed", |d| d.chunks_hashed),
        ("d.get_size_files", |d| count(d.files.len())),
        ("d.get_size_bytes", |d| d.files.size_bytes()),
        ("d.get_size_chunks", |d| d.files.size_chunks()),
        ("d.get_completed_bytes", |d| d.files.completed_bytes()),
        ("d.get_completed_chunks", |d| d.files.completed_chunks()),
        ("d.get_left_bytes", |d| d.files.left_bytes()),
        ("d.get_chunk_size", |d| d.files.chunk_size),
        ("d.get_tracker_focus", |d| count(d.trackers.focus)),
        ("d.get_tracker_size", |d| count(d.trackers.trackers.len())),
        ("d.get_size_pex", |d| d.size_pex),
        ("d.get_max_size_pex", |d| d.max_size_pex),
    ];
    register_int_getters(registrar, &getters)
}

fn register_settings(registrar: &mut Registrar<'_>) -> Result<(), RegistryError> {
    registrar
        .public(
            "d.get_hashing_failed",
            download_getter(|d| d.hash_failed.into()),
            "i:",
        )?
        .public(
            "d.set_hashing_failed",
            download_int_setter(|d, value| {
                d.hash_failed = value != 0;
                Ok(())
            }),
            "i:i",
        )?
        .public(
            "d.get_peer_exchange",
            download_getter(|d| d.pex_enabled.into()),
            "i:",
        )?
        .public(
            "d.set_peer_exchange",
            download_int_setter(|d, value| {
                d.set_peer_exchange(value != 0);
                Ok(())
            }),
            "i:i",
        )?
        .public("d.get_message", download_getter(|d| d.message.as_str().into()), "s:")?
        .public(
            "d.set_message",
            download_string_setter(|d, message| {
                message.clone_into(&mut d.message);
                Ok(())
            }),
            "i:s",
        )?
        .public(
            "d.get_max_file_size",
            download_getter(|d| d.files.max_file_size.into()),
            "i:",
        )?
        .public(
            "d.set_max_file_size",
            download_int_setter(|d, value| {
                d.files.max_file_size = non_negative(value)?;
                Ok(())
            }),
            "i:i",
        )?
        .public("d.get_peers_min", download_getter(|d| d.peers_min.into()), "i:")?
        .public(
            "d.set_peers_min",
            download_int_setter(|d, value| {
                d.peers_min = non_negative(value)?;
                Ok(())
            }),
            "i:i",
        )?
        .public("d.get_peers_max", download_getter(|d| d.peers_max.into()), "i:")?
        .public(
            "d.set_peers_max",
            download_int_setter(|d, value| {
                d.peers_max = non_negative(value)?;
                Ok(())
            }),
            "i:i",
        )?
        .public(
            "d.get_uploads_max",
            download_getter(|d| d.uploads_max.into()),
            "i:",
        )?
        .public(
            "d.set_uploads_max",
            download_int_setter(|d, value| {
                d.uploads_max = non_negative(value)?;
                Ok(())
            }),
            "i:i",
        )?
        .public(
            "d.get_tracker_numwant",
            download_getter(|d| d.trackers.numwant.into()),
            "i:",
        )?
        .public(
            "d.set_tracker_numwant",
            download_int_setter(|d, value| {
                d.trackers.numwant = value;
                Ok(())
            }),
            "i:i",
        )?
        .public(
            "d.get_directory",
            download_getter(|d| d.files.root_dir.as_str().into()),
            "s:",
        )?
        .public(
            "d.set_directory",
            download_string_setter(|d, directory| {
                d.set_directory(directory);
                Ok(())
            }),
            "i:s",
        )?
        .public(
            "d.get_directory_base",
            download_getter(|d| d.files.root_dir.as_str().into()),
            "s:",
        )?
        .public(
            "d.set_directory_base",
            download_string_setter(|d, directory| {
                directory.clone_into(&mut d.files.root_dir);
                Ok(())
            }),
            "i:s",
        )?
        .public("d.get_priority", download_getter(|d| d.priority.into()), "i:")?
        .public(
            "d.set_priority",
            download_int_setter(|d, value| {
                if !(0..=3).contains(&value) {
                    return Err(CommandError::input("priority out of range"));
                }
                d.priority = value;
                Ok(())
            }),
            "i:i",
        )?
        .public(
            "d.get_priority_str",
            download_try_getter(|d| Ok(d.priority_str()?.into())),
            "s:",
        )?;
    Ok(())
}

fn register_int_getters(
    registrar: &mut Registrar<'_>,
    getters: &[(&'static str, IntGetter)],
) -> Result<(), RegistryError> {
    for &(key, get) in getters {
        registrar.public(key, download_getter(move |d| Value::Int(get(d))), "i:")?;
    }
    Ok(())
}

fn count(len: usize) -> i64 {
    i64::try_from(len).unwrap_or(i64::MAX)
}

fn non_negative(value: i64) -> Result<i64, CommandError> {
    if value < 0 {
        return Err(CommandError::input(format!("{value} is negative")));
    }
    Ok(value)
}

fn escape_html(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|byte| {
            if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
                char::from(*byte).to_string()
            } else {
                format!("%{byte:02X}")
            }
        })
        .collect()
}

fn custom_field(download: &Download, key: &str) -> Option<String> {
    download
        .section()
        .ok()?
        .get_key("custom")
        .ok()?
        .get_key(key)
        .ok()?
        .as_str()
        .ok()
        .map(str::to_owned)
}

fn set_custom(engine: &mut Engine, id: DownloadId, args: &Value) -> Result<Value, CommandError> {
    let mut items = args.as_list()?.iter();
    let key = items
        .next()
        .ok_or_else(|| CommandError::missing_argument("missing key argument"))?
        .as_str()?
        .to_owned();
    let value = items
        .next()
        .ok_or_else(|| CommandError::missing_argument("missing value argument"))?
        .as_str()?
        .to_owned();
    engine
        .session
        .download_mut(id)?
        .section_mut()?
        .insert_preserve("custom", Value::map())?
        .insert_key(key, Value::String(value))?;
    Ok(Value::Empty)
}

fn erase(engine: &mut Engine, id: DownloadId, _args: &Value) -> Result<Value, CommandError> {
    engine
        .session
        .remove(id)
        .ok_or_else(|| CommandError::invalid_handle(id))?;
    Ok(Value::Empty)
}

/// Starts the download unless its last verification failed or it ignores
/// commands.
fn try_start(engine: &mut Engine, id: DownloadId, _args: &Value) -> Result<Value, CommandError> {
    let download = engine.session.download(id)?;
    if download.hash_failed || download.ignores_commands()? {
        return Ok(Value::Empty);
    }
    engine.call("d.start", &Target::download(id), &Value::Empty)?;
    Ok(Value::Empty)
}

/// Stops the download unless it ignores commands.
fn try_stop(engine: &mut Engine, id: DownloadId, _args: &Value) -> Result<Value, CommandError> {
    if engine.session.download(id)?.ignores_commands()? {
        return Ok(Value::Empty);
    }
    engine.call("d.stop", &Target::download(id), &Value::Empty)?;
    Ok(Value::Empty)
}

/// Stops and closes the download unless it ignores commands.
fn try_close(engine: &mut Engine, id: DownloadId, _args: &Value) -> Result<Value, CommandError> {
    if engine.session.download(id)?.ignores_commands()? {
        return Ok(Value::Empty);
    }
    let target = Target::download(id);
    engine.call("d.stop", &target, &Value::Empty)?;
    engine.call("d.close", &target, &Value::Empty)?;
    Ok(Value::Empty)
}

fn delete_tied(engine: &mut Engine, id: DownloadId, _args: &Value) -> Result<Value, CommandError> {
    let target = Target::download(id);
    let tie = engine.call_string("d.get_tied_to_file", &target, &Value::Empty)?;
    if tie.is_empty() {
        return Ok(Value::Empty);
    }
    if let Err(error) = std::fs::remove_file(&tie) {
        let message = format!("Could not unlink tied file: {error}");
        warn!(target: DISPATCH_TARGET, path = %tie, %error, "could not unlink tied file");
        engine.messages.push(message);
    }
    engine.call("d.set_tied_to_file", &target, &Value::from(""))?;
    Ok(Value::Empty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{File, Session};
    use rstest::{fixture, rstest};

    struct Fixture {
        engine: Engine,
        target: Target,
    }

    #[fixture]
    fn fixture() -> Fixture {
        let mut session = Session::new();
        let mut download = Download::new("payload", [0x5a; 20]);
        download.files.chunk_size = 4;
        download.files.files = vec![File::new("a", 6), File::new("b", 6)];
        let id = session.insert(download);
        let engine = Engine::with_builtin_commands(session).expect("commands register");
        Fixture {
            engine,
            target: Target::download(id),
        }
    }

    impl Fixture {
        fn run(&mut self, text: &str) -> Result<Value, CommandError> {
            self.engine.execute(&self.target, text)
        }
    }

    #[rstest]
    fn hash_is_uppercase_hex(mut fixture: Fixture) {
        assert_eq!(
            fixture.run("d.get_hash").expect("hash"),
            Value::from("5A".repeat(20))
        );
    }

    #[rstest]
    fn custom_fields_round_trip(mut fixture: Fixture) {
        fixture.run("d.set_custom=label,music").expect("set");
        assert_eq!(
            fixture.run("d.get_custom=label").expect("get"),
            Value::from("music")
        );
        assert_eq!(fixture.run("d.get_custom=other").expect("get"), Value::from(""));
        let error = fixture.run("d.get_custom_throw=other").expect_err("missing");
        assert_eq!(error.to_string(), "no such custom value");
    }

    #[rstest]
    #[case("d.set_custom={}", "missing argument: missing key argument")]
    #[case("d.set_custom={label}", "missing argument: missing value argument")]
    fn set_custom_requires_key_and_value(
        mut fixture: Fixture,
        #[case] text: &str,
        #[case] message: &str,
    ) {
        let error = fixture.run(text).expect_err("missing");
        assert_eq!(error.to_string(), message);
    }

    #[rstest]
    fn views_follow_list_semantics(mut fixture: Fixture) {
        fixture.run("d.views.push_back_unique=main").expect("push");
        fixture.run("d.views.push_back_unique=main").expect("push again");
        fixture.run("d.views.push_back=extra").expect("push");
        fixture.run("d.views.push_back=main").expect("push duplicate");
        assert_eq!(
            fixture.run("d.views").expect("views"),
            Value::List(vec![
                Value::from("main"),
                Value::from("extra"),
                Value::from("main"),
            ])
        );
        assert_eq!(fixture.run("d.views.has=main").expect("has"), Value::Int(1));
        fixture.run("d.views.remove=main").expect("remove");
        assert_eq!(
            fixture.run("d.views").expect("views"),
            Value::List(vec![Value::from("extra")])
        );
        assert_eq!(fixture.run("d.views.has=main").expect("has"), Value::Int(0));
    }

    #[rstest]
    fn start_and_stop_scripts_toggle_views_and_activity(mut fixture: Fixture) {
        fixture.run("d.set_hashing_failed=1").expect("flag");
        fixture.run("d.start").expect("start");
        assert_eq!(fixture.run("d.is_active").expect("active"), Value::Int(1));
        assert_eq!(fixture.run("d.get_hashing_failed").expect("flag"), Value::Int(0));
        assert_eq!(fixture.run("d.views.has=started").expect("has"), Value::Int(1));

        fixture.run("d.stop").expect("stop");
        assert_eq!(fixture.run("d.is_active").expect("active"), Value::Int(0));
        assert_eq!(fixture.run("d.views.has=started").expect("has"), Value::Int(0));
        assert_eq!(fixture.run("d.views.has=stopped").expect("has"), Value::Int(1));
    }

    #[rstest]
    fn integer_setters_accept_decimal_strings(mut fixture: Fixture) {
        fixture.run("d.set_peers_max=250").expect("set");
        assert_eq!(fixture.run("d.get_peers_max").expect("get"), Value::Int(250));
        assert!(fixture.run("d.set_peers_max=many").is_err());
        assert!(fixture.run("d.set_peers_max=-1").is_err());
    }

    #[rstest]
    #[case("leech")]
    #[case("seed")]
    #[case("initial_seed")]
    fn connection_type_round_trips(mut fixture: Fixture, #[case] name: &str) {
        fixture
            .run(&format!("d.set_connection_current={name}"))
            .expect("set");
        assert_eq!(
            fixture.run("d.get_connection_current").expect("get"),
            Value::from(name)
        );
    }

    #[rstest]
    fn priority_string_tracks_priority(mut fixture: Fixture) {
        fixture.run("d.set_priority=3").expect("set");
        assert_eq!(fixture.run("d.get_priority_str").expect("get"), Value::from("high"));
        assert!(fixture.run("d.set_priority=4").is_err());
    }

    #[rstest]
    fn payload_statistics_follow_file_list(mut fixture: Fixture) {
        assert_eq!(fixture.run("d.get_size_bytes").expect("bytes"), Value::Int(12));
        assert_eq!(fixture.run("d.get_size_chunks").expect("chunks"), Value::Int(3));
        assert_eq!(fixture.run("d.get_size_files").expect("files"), Value::Int(2));
        assert_eq!(fixture.run("d.get_left_bytes").expect("left"), Value::Int(12));
    }

    #[rstest]
    fn erase_invalidates_target(mut fixture: Fixture) {
        fixture.run("d.erase").expect("erase");
        let error = fixture.run("d.get_name").expect_err("gone");
        assert!(matches!(error, CommandError::InvalidHandle { .. }));
    }

    #[rstest]
    fn erase_removes_active_download(mut fixture: Fixture) {
        fixture.run("d.resume").expect("resume");
        fixture.run("d.erase").expect("erase");
        assert!(fixture.engine.session.is_empty());
    }

    #[rstest]
    fn multi_element_push_back_appends_whole_argument(mut fixture: Fixture) {
        fixture.run("d.views.push_back=seeding,archive").expect("push pair");
        fixture.run("d.views.push_back={main}").expect("push singleton");
        fixture.run("d.views.push_back_unique=main,other").expect("unique pair");
        fixture.run("d.views.push_back_unique=fresh,other").expect("unique pair");
        assert_eq!(
            fixture.run("d.views").expect("views"),
            Value::List(vec![
                Value::List(vec![Value::from("seeding"), Value::from("archive")]),
                Value::from("main"),
                Value::List(vec![Value::from("fresh"), Value::from("other")]),
            ])
        );
    }

    #[rstest]
    fn bitfield_renders_uppercase_hex(mut fixture: Fixture) {
        assert_eq!(fixture.run("d.get_bitfield").expect("empty"), Value::from(""));
        let id = fixture.engine.session.ids()[0];
        fixture
            .engine
            .session
            .download_mut(id)
            .expect("download")
            .bitfield = vec![0xe0];
        assert_eq!(fixture.run("d.get_bitfield").expect("bits"), Value::from("E0"));
    }

    #[rstest]
    fn disabling_peer_exchange_stops_it(mut fixture: Fixture) {
        assert_eq!(fixture.run("d.get_peer_exchange").expect("get"), Value::Int(1));
        let id = fixture.engine.session.ids()[0];
        fixture
            .engine
            .session
            .download_mut(id)
            .expect("download")
            .pex_active = true;
        fixture.run("d.set_peer_exchange=0").expect("disable");
        assert_eq!(fixture.run("d.get_peer_exchange").expect("get"), Value::Int(0));
        assert_eq!(fixture.run("d.is_pex_active").expect("active"), Value::Int(0));
        assert_eq!(fixture.run("d.get_size_pex").expect("size"), Value::Int(0));
        assert_eq!(fixture.run("d.get_max_size_pex").expect("max"), Value::Int(8));
    }

    #[rstest]
    fn try_commands_respect_ignore_commands(mut fixture: Fixture) {
        fixture.run("d.set_ignore_commands=1").expect("ignore");
        fixture.run("d.try_start").expect("try start");
        assert_eq!(fixture.run("d.is_active").expect("active"), Value::Int(0));

        fixture.run("d.set_ignore_commands=0").expect("obey");
        fixture.run("d.try_start").expect("try start");
        assert_eq!(fixture.run("d.is_active").expect("active"), Value::Int(1));

        fixture.run("d.set_ignore_commands=1").expect("ignore");
        fixture.run("d.try_stop").expect("try stop");
        fixture.run("d.try_close").expect("try close");
        assert_eq!(fixture.run("d.is_active").expect("active"), Value::Int(1));

        fixture.run("d.set_ignore_commands=0").expect("obey");
        fixture.run("d.try_close").expect("try close");
        assert_eq!(fixture.run("d.is_active").expect("active"), Value::Int(0));
        assert_eq!(fixture.run("d.is_open").expect("open"), Value::Int(0));
        assert_eq!(fixture.run("d.views.has=stopped").expect("has"), Value::Int(1));
    }

    #[rstest]
    fn try_start_skips_failed_verification(mut fixture: Fixture) {
        fixture.run("d.set_hashing_failed=1").expect("flag");
        fixture.run("d.try_start").expect("try start");
        assert_eq!(fixture.run("d.is_active").expect("active"), Value::Int(0));
    }

    #[rstest]
    fn delete_tied_removes_file_and_clears_variable(mut fixture: Fixture) {
        let dir = tempfile::tempdir().expect("temp dir");
        let tied = dir.path().join("payload.torrent");
        std::fs::write(&tied, b"d4:infoe").expect("write tied file");
        let path = tied.to_str().expect("utf-8 path");
        fixture
            .run(&format!("d.set_tied_to_file=\"{path}\""))
            .expect("tie");
        fixture.run("d.delete_tied").expect("delete");
        assert!(!tied.exists());
        assert_eq!(fixture.run("d.get_tied_to_file").expect("get"), Value::from(""));
    }

    #[test]
    fn html_escape_keeps_unreserved_bytes() {
        assert_eq!(escape_html(b"-AZaz09 /"), "-AZaz09%20%2F");
    }
}
