use tracing::debug;

use crate::protocol::chat_line;
use crate::room::Room;

/// Sends `"<sender>: <body>"` to every member except `sender`.
///
/// Works on a snapshot of the membership, so admissions and departures that
/// race with the fan-out are simply not seen by it. A member that cannot take
/// the line loses it; nobody else notices. Returns how many members it reached.
pub fn broadcast(room: &Room, sender: &str, body: &str) -> usize {
    let line = chat_line(sender, body);
    let mut delivered = 0;

    for name in room.members() {
        if name == sender {
            continue;
        }

        match room.deliver(&name, &line) {
            Ok(()) => delivered += 1,
            Err(err) => debug!(%sender, error = %err, "dropped line for recipient"),
        }
    }

    delivered
}

/// Broadcast from the server identity; every member receives it.
pub fn announce(room: &Room, text: &str) -> usize {
    broadcast(room, room.server_name(), text)
}
