//! End-to-end properties of the registry, dispatcher and multicall engine
//! exercised through the public API and the built-in command set.

use rstest::{fixture, rstest};
use switchboard::session::{Download, File, Session};
use switchboard::{
    Callable, CommandError, CommandFlags, DownloadId, Engine, FileCursor, FileRef,
    RegistryError, Target, TargetKind, Value,
};

struct Harness {
    engine: Engine,
    download: DownloadId,
}

impl Harness {
    fn on_download(&mut self, text: &str) -> Result<Value, CommandError> {
        let target = Target::download(self.download);
        self.engine.execute(&target, text)
    }
}

#[fixture]
fn harness() -> Harness {
    let mut session = Session::new();
    let mut download = Download::new("album", [0x42; 20]);
    download.files.files = vec![
        File::new("album/01.flac", 1_000),
        File::new("album/02.flac", 2_500),
        File::new("album/cover.jpg", 40),
    ];
    let id = session.insert(download);
    Harness {
        engine: Engine::with_builtin_commands(session).expect("built-in commands register"),
        download: id,
    }
}

#[rstest]
fn erase_is_destructive_and_idempotent(mut harness: Harness) {
    let keys: Vec<String> = harness
        .engine
        .commands
        .keys()
        .into_iter()
        .map(str::to_owned)
        .collect();
    assert!(!keys.is_empty());
    for key in &keys {
        assert!(harness.engine.commands.find(key).is_some());
        assert!(harness.engine.commands.erase(key));
        assert!(harness.engine.commands.find(key).is_none());
        assert!(!harness.engine.commands.erase(key));
    }
    assert!(harness.engine.commands.is_empty());
}

#[rstest]
fn rejected_duplicate_leaves_registry_unchanged(mut harness: Harness) {
    let before = harness.engine.commands.len();
    let original = harness
        .engine
        .commands
        .find("d.get_name")
        .expect("registered")
        .clone();
    let error = harness
        .engine
        .commands
        .insert(
            "d.get_name",
            Callable::generic(|_, _| Ok(Value::from("replaced"))),
            CommandFlags::empty(),
            "",
            "",
        )
        .expect_err("duplicate");
    assert!(matches!(error, RegistryError::DuplicateKey { .. }));
    assert_eq!(harness.engine.commands.len(), before);
    let current = harness.engine.commands.find("d.get_name").expect("kept");
    assert!(current.callable().ptr_eq(original.callable()));
    assert_eq!(harness.on_download("d.get_name"), Ok(Value::from("album")));
}

#[rstest]
#[case(Target::generic())]
#[case(Target::any())]
#[case(Target::unbound(TargetKind::Download))]
#[case(Target::unbound(TargetKind::File))]
fn unknown_key_fails_for_any_target(mut harness: Harness, #[case] target: Target) {
    let error = harness
        .engine
        .call("d.no_such_command", &target, &Value::from("x"))
        .expect_err("unknown");
    assert_eq!(error, CommandError::unknown_command("d.no_such_command"));
}

#[rstest]
fn download_command_requires_download_target(mut harness: Harness) {
    let error = harness
        .engine
        .call("d.get_name", &Target::generic(), &Value::Empty)
        .expect_err("generic target");
    assert!(matches!(error, CommandError::TargetTypeMismatch { .. }));

    let error = harness
        .engine
        .call("d.get_name", &Target::unbound(TargetKind::Download), &Value::Empty)
        .expect_err("null download");
    assert!(matches!(error, CommandError::TargetTypeMismatch { .. }));

    assert_eq!(harness.on_download("d.get_name"), Ok(Value::from("album")));
}

#[rstest]
#[case(0, 1_000)]
#[case(1, 2_500)]
#[case(2, 40)]
fn file_command_narrows_cursor(mut harness: Harness, #[case] position: usize, #[case] size: i64) {
    let cursor = Target::file_cursor(FileCursor {
        download: harness.download,
        position,
    });
    let value = harness
        .engine
        .call("f.get_size_bytes", &cursor, &Value::Empty)
        .expect("narrowed");
    assert_eq!(value, Value::Int(size));
}

#[rstest]
fn file_multicall_rows_match_direct_calls(mut harness: Harness) {
    let rows = harness
        .on_download("f.multicall=ignored,f.get_size_bytes")
        .expect("multicall");
    let Value::List(rows) = rows else {
        panic!("expected rows, got {rows:?}");
    };
    assert_eq!(rows.len(), 3);
    for (index, row) in rows.into_iter().enumerate() {
        let file = Target::file(FileRef {
            download: harness.download,
            index,
        });
        let direct = harness
            .engine
            .call("f.get_size_bytes", &file, &Value::Empty)
            .expect("direct");
        assert_eq!(row, Value::List(vec![direct]));
    }
}

#[rstest]
fn file_multicall_without_commands_is_too_few(mut harness: Harness) {
    let target = Target::download(harness.download);
    let error = harness
        .engine
        .call("f.multicall", &target, &Value::list())
        .expect_err("too few");
    assert_eq!(error, CommandError::TooFewArguments);
}

#[rstest]
fn file_multicall_with_only_reserved_element_is_too_few(mut harness: Harness) {
    assert_eq!(
        harness.on_download("f.multicall={\"\"}"),
        Err(CommandError::TooFewArguments)
    );
}

#[rstest]
fn list_field_operations_compare_structurally(mut harness: Harness) {
    for view in ["main", "seeding", "main", "hidden", "main"] {
        harness
            .on_download(&format!("d.views.push_back={view}"))
            .expect("push");
    }
    harness
        .on_download("d.views.push_back_unique=seeding")
        .expect("unique push");
    assert_eq!(
        harness.on_download("d.views"),
        Ok(Value::List(
            ["main", "seeding", "main", "hidden", "main"]
                .into_iter()
                .map(Value::from)
                .collect()
        ))
    );
    assert_eq!(harness.on_download("d.views.has=hidden"), Ok(Value::Int(1)));
    assert_eq!(harness.on_download("d.views.has=missing"), Ok(Value::Int(0)));

    harness.on_download("d.views.remove=main").expect("remove");
    assert_eq!(
        harness.on_download("d.views"),
        Ok(Value::List(vec![Value::from("seeding"), Value::from("hidden")]))
    );
}

#[rstest]
fn alias_matches_source_and_outlives_it(mut harness: Harness) {
    harness
        .engine
        .commands
        .insert_alias("d.title", "d.get_name")
        .expect("alias");
    assert_eq!(harness.on_download("d.title"), harness.on_download("d.get_name"));

    assert!(harness.engine.commands.erase("d.get_name"));
    assert_eq!(harness.on_download("d.title"), Ok(Value::from("album")));
    assert_eq!(
        harness.on_download("d.get_name"),
        Err(CommandError::unknown_command("d.get_name"))
    );
}

#[rstest]
fn removed_download_invalidates_handles(mut harness: Harness) {
    assert!(harness.engine.session.remove(harness.download).is_some());
    let error = harness.on_download("d.get_name").expect_err("stale");
    assert_eq!(error.code(), "invalid_handle");
}

#[rstest]
fn shutdown_releases_every_command(mut harness: Harness) {
    let registered = harness.engine.commands.len();
    assert_eq!(harness.engine.shutdown(), registered);
    assert!(harness.engine.commands.is_empty());
}
