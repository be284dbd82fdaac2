//! `t.*` commands on trackers.

use crate::command::Callable;
use crate::error::RegistryError;
use crate::session::Tracker;
use crate::value::Value;

use super::{Registrar, int_argument};

fn tracker_getter(get: impl Fn(&Tracker) -> Value + 'static) -> Callable {
    Callable::tracker(move |engine, tracker, _| Ok(get(engine.session.tracker(tracker)?)))
}

pub(super) fn register(registrar: &mut Registrar<'_>) -> Result<(), RegistryError> {
    registrar
        .public("t.get_url", tracker_getter(|t| t.url.as_str().into()), "s:")?
        .public("t.get_group", tracker_getter(|t| t.group.into()), "i:")?
        .public("t.get_type", tracker_getter(|t| t.kind.code().into()), "i:")?
        .public("t.is_enabled", tracker_getter(|t| t.enabled.into()), "i:")?
        .public(
            "t.set_enabled",
            Callable::tracker(|engine, tracker, args| {
                let enabled = int_argument(args)? != 0;
                engine.session.tracker_mut(tracker)?.enabled = enabled;
                Ok(Value::Empty)
            }),
            "i:i",
        )?
        .public(
            "t.get_scrape_complete",
            tracker_getter(|t| t.scrape_complete.into()),
            "i:",
        )?
        .public(
            "t.get_scrape_incomplete",
            tracker_getter(|t| t.scrape_incomplete.into()),
            "i:",
        )?
        .public(
            "t.get_scrape_downloaded",
            tracker_getter(|t| t.scrape_downloaded.into()),
            "i:",
        )?;
    Ok(())
}
