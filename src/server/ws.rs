//! Per-connection WebSocket loop
//!
//! Each connection runs one select loop over inbound frames and the
//! snapshot broadcast. A connection is a silent socket until `HELO`
//! names its user; commands sent before that are dropped. Successful
//! mutations answer nobody directly, the broadcast snapshot is the
//! acknowledgement; failures go back to the initiator as `ERR`.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use hyper::upgrade::Upgraded;
use hyper_util::rt::TokioIo;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, info, warn};

use crate::protocol::{self, Command};
use crate::service::MapService;

type ClientSocket = hyper_tungstenite::WebSocketStream<TokioIo<Upgraded>>;
type WsResult = std::result::Result<(), tokio_tungstenite::tungstenite::Error>;

pub async fn serve(ws: ClientSocket, service: Arc<MapService>) -> WsResult {
    let (mut sink, mut stream) = ws.split();
    // Subscribed before the first command so no commit can slip between
    // the HELO snapshot and the update stream.
    let mut updates = service.subscribe();
    let mut username: Option<String> = None;

    loop {
        tokio::select! {
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        let reply =
                            handle_frame(&service, &mut username, &mut updates, &text).await;
                        if let Some(reply) = reply {
                            sink.send(Message::Text(reply)).await?;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        sink.send(Message::Pong(data)).await?;
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!(user = username.as_deref().unwrap_or("-"), "client disconnected");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "receive error");
                        break;
                    }
                    None => break,
                }
            }

            update = updates.recv() => {
                match update {
                    Ok(json) => {
                        if username.is_some() {
                            sink.send(Message::Text(format!("MAP {json}"))).await?;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "viewer lagged, resyncing");
                        if username.is_some() {
                            if let Ok(json) = service.snapshot().await {
                                sink.send(Message::Text(format!("MAP {json}"))).await?;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    Ok(())
}

/// Process one text frame; the return value goes back to this client only.
async fn handle_frame(
    service: &MapService,
    username: &mut Option<String>,
    updates: &mut broadcast::Receiver<String>,
    text: &str,
) -> Option<String> {
    let command = match protocol::parse(text) {
        Ok(command) => command,
        Err(e) => {
            debug!(error = %e, "unparseable frame");
            return username.is_some().then(|| format!("ERR {e}"));
        }
    };

    if let Command::Helo { username: name } = command {
        info!(user = %name, "viewer attached");
        *username = Some(name);
        // Fresh subscription before the snapshot: anything queued while
        // the socket was anonymous is older than the reply and must not
        // be replayed after it.
        *updates = service.subscribe();
        return match service.snapshot().await {
            Ok(json) => Some(format!("MAP {json}")),
            Err(e) => Some(format!("ERR {e}")),
        };
    }

    let Some(actor) = username.clone() else {
        debug!("command before HELO ignored");
        return None;
    };

    let result = match command {
        Command::Helo { .. } => unreachable!("handled above"),
        Command::Add(request) => service.add(&actor, request).await,
        Command::Delete { name } => service.delete(&actor, &name).await,
        Command::Detach { name } => service.detach(&actor, &name).await,
        Command::Toggle { flag, src, dest } => {
            service.toggle_edge(&actor, &src, &dest, flag).await
        }
        Command::Autocomplete { prefix } => {
            return Some(match service.autocomplete(&prefix) {
                Ok(names) => match serde_json::to_string(&names) {
                    Ok(json) => format!("SYS {json}"),
                    Err(e) => format!("ERR {e}"),
                },
                Err(e) => format!("ERR {e}"),
            });
        }
        Command::Signatures { system, mode, sigs } => {
            if sigs.is_empty() {
                return None;
            }
            service.update_signatures(&actor, &system, &mode, sigs).await
        }
        Command::SignatureNote { system, id, note } => {
            service.set_signature_note(&actor, &system, &id, &note).await
        }
        Command::DeleteSignature { system, id } => {
            service.delete_signature(&actor, &system, id.as_deref()).await
        }
    };

    // Success is acknowledged by the broadcast snapshot, not here.
    match result {
        Ok(_) => None,
        Err(e) => Some(format!("ERR {e}")),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use async_trait::async_trait;

    use super::*;
    use crate::catalog::{Catalog, CatalogSystem};
    use crate::error::Result;
    use crate::model::Hop;
    use crate::routes::RouteProvider;
    use crate::store::MapStore;

    struct NoRoutes;

    #[async_trait]
    impl RouteProvider for NoRoutes {
        async fn hub_routes(&self, _system_id: u32) -> Result<BTreeMap<String, Vec<Hop>>> {
            Ok(BTreeMap::new())
        }
    }

    fn service() -> MapService {
        let store = MapStore::open_temporary().unwrap();
        let catalog = Catalog::open(store.db()).unwrap();
        catalog
            .insert_system(&CatalogSystem {
                id: 30_000_142,
                name: "Jita".to_string(),
                region: "The Forge".to_string(),
                class: "highsec".to_string(),
                effect: None,
                static1: None,
                static2: None,
            })
            .unwrap();
        MapService::new(store, catalog, Arc::new(NoRoutes)).unwrap()
    }

    #[tokio::test]
    async fn commands_before_helo_are_dropped() {
        let service = service();
        let mut username = None;
        let mut updates = service.subscribe();

        let reply =
            handle_frame(&service, &mut username, &mut updates, r#"ADD {"dest":"Jita"}"#).await;
        assert!(reply.is_none());
        assert!(service.snapshot().await.unwrap().starts_with("[]"));

        // Garbage is also dropped silently for anonymous sockets.
        let reply = handle_frame(&service, &mut username, &mut updates, "NOPE").await;
        assert!(reply.is_none());
    }

    #[tokio::test]
    async fn helo_attaches_and_replies_with_the_snapshot() {
        let service = service();
        let mut username = None;
        let mut updates = service.subscribe();

        let reply = handle_frame(&service, &mut username, &mut updates, "HELO alice")
            .await
            .unwrap();
        assert_eq!(reply, "MAP []");
        assert_eq!(username.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn helo_does_not_replay_snapshots_older_than_its_reply() {
        let service = service();
        let mut username = None;
        let mut updates = service.subscribe();

        // Commit while the socket is still anonymous; the broadcast is
        // already queued on the receiver by the time HELO arrives.
        service
            .add(
                "bob",
                crate::model::AddRequest {
                    dest: "Jita".to_string(),
                    src: None,
                },
            )
            .await
            .unwrap();

        let reply = handle_frame(&service, &mut username, &mut updates, "HELO alice")
            .await
            .unwrap();
        assert!(reply.contains("Jita"));
        // The stale queued snapshot is gone; the stream resumes with the
        // next commit only.
        assert!(updates.try_recv().is_err());
    }

    #[tokio::test]
    async fn mutations_answer_with_silence_or_err() {
        let service = service();
        let mut username = Some("alice".to_string());
        let mut updates = service.subscribe();

        let reply =
            handle_frame(&service, &mut username, &mut updates, r#"ADD {"dest":"Jita"}"#).await;
        assert!(reply.is_none());

        let reply = handle_frame(&service, &mut username, &mut updates, "DELETE Nowhere")
            .await
            .unwrap();
        assert_eq!(reply, "ERR system not found");

        let reply = handle_frame(&service, &mut username, &mut updates, "NOPE")
            .await
            .unwrap();
        assert!(reply.starts_with("ERR "));
    }

    #[tokio::test]
    async fn autocomplete_replies_directly() {
        let service = service();
        let mut username = Some("alice".to_string());
        let mut updates = service.subscribe();

        let reply = handle_frame(&service, &mut username, &mut updates, "SYS jit")
            .await
            .unwrap();
        assert_eq!(reply, r#"SYS ["Jita"]"#);
    }

    #[tokio::test]
    async fn empty_signature_batch_is_a_no_op() {
        let service = service();
        let mut username = Some("alice".to_string());
        let mut updates = service.subscribe();
        handle_frame(&service, &mut username, &mut updates, r#"ADD {"dest":"Jita"}"#).await;
        // A fresh receiver so only traffic after the add is observed.
        let mut updates = service.subscribe();

        let reply = handle_frame(&service, &mut username, &mut updates, "SIGS Jita replace").await;
        assert!(reply.is_none());
        assert!(updates.try_recv().is_err());
    }
}
