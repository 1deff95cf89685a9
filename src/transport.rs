//! Serialized message channel between the panel and the host.
//!
//! The two sides share nothing but JSON strings. Each endpoint posts values of
//! one type and receives values of another; anything that fails to decode is
//! logged and skipped rather than surfaced to the receiver.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::warn;

use crate::protocol::{Command, HostMessage};

/// The panel side: posts commands, receives host messages.
pub type PanelEndpoint = Endpoint<Command, HostMessage>;
/// The host side: posts host messages, receives commands.
pub type HostEndpoint = Endpoint<HostMessage, Command>;

/// Cloneable sending half of an endpoint.
pub struct Poster<Out> {
    tx: mpsc::UnboundedSender<String>,
    _out: PhantomData<fn(Out)>,
}

impl<Out> Clone for Poster<Out> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            _out: PhantomData,
        }
    }
}

impl<Out: Serialize> Poster<Out> {
    /// Serialize and send. Returns false once the other side has gone away.
    pub fn post(&self, message: &Out) -> bool {
        let encoded = match serde_json::to_string(message) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("failed to encode outbound message: {}", e);
                return false;
            }
        };
        self.tx.send(encoded).is_ok()
    }
}

pub struct Endpoint<Out, In> {
    poster: Poster<Out>,
    inbox: Inbox<In>,
}

impl<Out: Serialize, In: DeserializeOwned> Endpoint<Out, In> {
    pub fn post(&self, message: &Out) -> bool {
        self.poster.post(message)
    }

    pub async fn recv(&mut self) -> Option<In> {
        self.inbox.recv().await
    }

    /// Split into the sending half and a receiver of decoded messages.
    pub fn split(self) -> (Poster<Out>, Inbox<In>) {
        (self.poster, self.inbox)
    }
}

/// Receiving half of an endpoint.
pub struct Inbox<In> {
    rx: mpsc::UnboundedReceiver<String>,
    _in: PhantomData<fn() -> In>,
}

impl<In: DeserializeOwned> Inbox<In> {
    /// Next decodable message, or None when the channel is closed.
    pub async fn recv(&mut self) -> Option<In> {
        loop {
            let raw = self.rx.recv().await?;
            match serde_json::from_str(&raw) {
                Ok(message) => return Some(message),
                Err(e) => warn!("dropping undecodable message ({}): {}", e, raw),
            }
        }
    }
}

fn endpoint<Out, In>(
    tx: mpsc::UnboundedSender<String>,
    rx: mpsc::UnboundedReceiver<String>,
) -> Endpoint<Out, In> {
    Endpoint {
        poster: Poster {
            tx,
            _out: PhantomData,
        },
        inbox: Inbox {
            rx,
            _in: PhantomData,
        },
    }
}

/// Create a connected pair of endpoints.
pub fn channel() -> (PanelEndpoint, HostEndpoint) {
    let (to_host, from_panel) = mpsc::unbounded_channel();
    let (to_panel, from_host) = mpsc::unbounded_channel();
    (endpoint(to_host, from_host), endpoint(to_panel, from_panel))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_messages_cross_as_json() {
        let (panel, mut host) = channel();

        assert!(panel.post(&Command::RequestContext { request_id: Some(1) }));
        let received = host.recv().await.unwrap();
        assert_eq!(received, Command::RequestContext { request_id: Some(1) });
    }

    #[tokio::test]
    async fn test_undecodable_message_is_skipped() {
        let (panel, host) = channel();
        let (_host_poster, mut inbox) = host.split();

        panel.poster.tx.send("{\"command\":\"nope\"}".to_string()).unwrap();
        panel.post(&Command::GetWorkspaceFiles { request_id: None });

        let received = inbox.recv().await.unwrap();
        assert_eq!(received, Command::GetWorkspaceFiles { request_id: None });
    }

    #[tokio::test]
    async fn test_endpoint_recv_skips_undecodable_message() {
        let (panel, mut host) = channel();

        panel.poster.tx.send("not json".to_string()).unwrap();
        panel.post(&Command::RequestContext { request_id: Some(2) });

        assert_eq!(
            host.recv().await.unwrap(),
            Command::RequestContext { request_id: Some(2) }
        );
    }

    #[tokio::test]
    async fn test_recv_ends_when_peer_dropped() {
        let (panel, mut host) = channel();
        drop(panel);
        assert!(host.recv().await.is_none());
    }
}
