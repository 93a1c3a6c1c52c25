//! HTTP-task → main-loop communication channel.
//!
//! Uses an `embassy-sync` bounded MPMC channel to bridge the httpd task
//! (which runs websocket handlers) with the synchronous monitor loop.
//! Both tasks share the static channel without heap allocation.
//!
//! ```text
//! ┌──────────────┐   ClientMsg   ┌──────────────┐
//! │  httpd task  │──────────────▶│ Monitor loop │
//! │  (ws handler)│               │  (sync)      │
//! └──────────────┘               └──────────────┘
//! ```
//!
//! Separate from the tick event queue in [`crate::events`]: that queue
//! carries data-less discriminants from timer context, while these
//! messages carry a payload and originate in an ordinary task.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

/// Websocket client lifecycle, delivered to the monitor loop for logging
/// and client accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientMsg {
    Connected { session: i32 },
    Disconnected { session: i32 },
}

/// Channel depth: lifecycle messages are rare; overflow just drops the
/// log line, never the client.
const CLIENT_DEPTH: usize = 8;

pub static CLIENT_CHANNEL: Channel<CriticalSectionRawMutex, ClientMsg, CLIENT_DEPTH> =
    Channel::new();

#[cfg(test)]
mod tests {
    use super::*;

    // Single test touching the global channel so parallel tests never race.
    #[test]
    fn try_send_try_receive_round_trip() {
        while CLIENT_CHANNEL.try_receive().is_ok() {}

        CLIENT_CHANNEL
            .try_send(ClientMsg::Connected { session: 7 })
            .unwrap();
        CLIENT_CHANNEL
            .try_send(ClientMsg::Disconnected { session: 7 })
            .unwrap();

        assert_eq!(
            CLIENT_CHANNEL.try_receive().unwrap(),
            ClientMsg::Connected { session: 7 }
        );
        assert_eq!(
            CLIENT_CHANNEL.try_receive().unwrap(),
            ClientMsg::Disconnected { session: 7 }
        );
        assert!(CLIENT_CHANNEL.try_receive().is_err());
    }
}
