//! Comparison commands over a pair of downloads.
//!
//! Each takes the key of a download command, calls it on both downloads and
//! orders the two results. Used to sort views.

use std::cmp::Ordering;

use crate::command::Callable;
use crate::dispatch::Engine;
use crate::error::{CommandError, RegistryError};
use crate::target::{DownloadId, Target};
use crate::value::Value;

use super::Registrar;

fn compare_downloads(
    engine: &mut Engine,
    first: DownloadId,
    second: DownloadId,
    args: &Value,
) -> Result<Ordering, CommandError> {
    let key = args.argument().as_str()?;
    if key.is_empty() {
        return Err(CommandError::missing_argument("expected a command to compare by"));
    }
    let left = engine.execute(&Target::download(first), key)?;
    let right = engine.execute(&Target::download(second), key)?;
    Ok(left.compare(&right)?)
}

pub(super) fn register(registrar: &mut Registrar<'_>) -> Result<(), RegistryError> {
    registrar
        .public(
            "less",
            Callable::download_pair(|engine, first, second, args| {
                let ordering = compare_downloads(engine, first, second, args)?;
                Ok(ordering.is_lt().into())
            }),
            "i:s",
        )?
        .public(
            "greater",
            Callable::download_pair(|engine, first, second, args| {
                let ordering = compare_downloads(engine, first, second, args)?;
                Ok(ordering.is_gt().into())
            }),
            "i:s",
        )?
        .public(
            "compare",
            Callable::download_pair(|engine, first, second, args| {
                Ok(match compare_downloads(engine, first, second, args)? {
                    Ordering::Less => Value::Int(-1),
                    Ordering::Equal => Value::Int(0),
                    Ordering::Greater => Value::Int(1),
                })
            }),
            "i:s",
        )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Download, Session};
    use crate::target::TargetKind;
    use rstest::rstest;

    fn engine() -> (Engine, DownloadId, DownloadId) {
        let mut session = Session::new();
        let alpha = session.insert(Download::new("alpha", [1; 20]));
        let beta = session.insert(Download::new("beta", [2; 20]));
        let engine = Engine::with_builtin_commands(session).expect("commands register");
        (engine, alpha, beta)
    }

    #[rstest]
    #[case("less", 1)]
    #[case("greater", 0)]
    #[case("compare", -1)]
    fn orders_by_named_command(#[case] key: &str, #[case] expected: i64) {
        let (mut engine, alpha, beta) = engine();
        let target = Target::download_pair(alpha, beta);
        let value = engine
            .call(key, &target, &Value::from("d.get_name"))
            .expect("compare");
        assert_eq!(value, Value::Int(expected));
    }

    #[test]
    fn equal_results_compare_equal() {
        let (mut engine, alpha, beta) = engine();
        let target = Target::download_pair(alpha, beta);
        let value = engine
            .execute(&target, "compare=d.get_priority")
            .expect("compare");
        assert_eq!(value, Value::Int(0));
    }

    #[test]
    fn requires_pair_target() {
        let (mut engine, alpha, _) = engine();
        let error = engine
            .call("less", &Target::download(alpha), &Value::from("d.get_name"))
            .expect_err("single download");
        assert_eq!(
            error,
            CommandError::type_mismatch("less", TargetKind::DownloadPair, TargetKind::Download)
        );
    }

    #[test]
    fn missing_command_key_is_reported() {
        let (mut engine, alpha, beta) = engine();
        let target = Target::download_pair(alpha, beta);
        let error = engine.call("less", &target, &Value::Empty).expect_err("no key");
        assert_eq!(error.code(), "value_type");
    }
}
