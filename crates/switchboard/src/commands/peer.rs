//! `p.*` commands on peer connections.

use crate::command::Callable;
use crate::error::RegistryError;
use crate::session::Peer;
use crate::value::Value;

use super::Registrar;

fn peer_getter(get: impl Fn(&Peer) -> Value + 'static) -> Callable {
    Callable::peer(move |engine, peer, _| Ok(get(engine.session.peer(peer)?)))
}

pub(super) fn register(registrar: &mut Registrar<'_>) -> Result<(), RegistryError> {
    registrar
        .public("p.get_address", peer_getter(|p| p.address.as_str().into()), "s:")?
        .public("p.get_port", peer_getter(|p| p.port.into()), "i:")?
        .public(
            "p.get_client_version",
            peer_getter(|p| p.client_version.as_str().into()),
            "s:",
        )?
        .public("p.get_id", peer_getter(|p| hex::encode_upper(p.id).into()), "s:")?
        .public("p.get_up_rate", peer_getter(|p| p.up.rate.into()), "i:")?
        .public("p.get_up_total", peer_getter(|p| p.up.total.into()), "i:")?
        .public("p.get_down_rate", peer_getter(|p| p.down.rate.into()), "i:")?
        .public("p.get_down_total", peer_getter(|p| p.down.total.into()), "i:")?
        .public("p.is_encrypted", peer_getter(|p| p.encrypted.into()), "i:")?
        .public("p.is_incoming", peer_getter(|p| p.incoming.into()), "i:")?
        .public(
            "p.get_completed_percent",
            peer_getter(|p| p.completed_percent.into()),
            "i:",
        )?;
    Ok(())
}
