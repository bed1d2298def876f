use crate::domain_model::*;
use crate::server::*;
use anyhow::anyhow;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const MAILBOX_CAP: usize = 256;

pub struct ClientRecord {
    pub principal: Principal,
    pub control: Sender<ConnMessage>,
    pub mailbox: Sender<ConnMessage>,
    pub actor_handle: Mutex<Option<JoinHandle<()>>>,
    pub cancellation_token: CancellationToken,
    conn_id: u64,
}

/// Registry of live streaming connections, keyed by subject. Each accepted
/// connection runs as its own actor carrying the principal that the
/// handshake verified.
pub struct SessionHub {
    online_users: Arc<DashMap<Username, ClientRecord>>,
    conn_counter: AtomicU64,
}

impl SessionHub {
    pub fn new() -> Self {
        Self {
            online_users: Arc::new(DashMap::new()),
            conn_counter: AtomicU64::new(0),
        }
    }

    pub fn online_count(&self) -> usize {
        self.online_users.len()
    }

    pub async fn shutdown(&self) {
        tracing::info!("SessionHub shutting down...");

        for entry in self.online_users.iter() {
            entry.cancellation_token.cancel();
        }

        let mut handles = Vec::new();
        for entry in self.online_users.iter() {
            if let Ok(mut lock) = entry.actor_handle.lock() {
                if let Some(handle) = lock.take() {
                    handles.push(handle);
                }
            }
        }

        for handle in handles {
            let _ = handle.await;
        }

        tracing::info!("All SessionHub actors shut down.");
    }
}

// region connection acceptor

#[async_trait::async_trait]
impl ConnectionAcceptor for SessionHub {
    async fn accept_connection(
        &self,
        s2c_channel: Box<dyn ConnSender>,
        c2s_channel: Box<dyn ConnReceiver>,
        principal: Principal,
    ) -> anyhow::Result<()> {
        let conn_id = self.conn_counter.fetch_add(1, Ordering::Relaxed);
        let actor_cancel = CancellationToken::new();

        let (sender_control_tx, sender_control_rx) = tokio::sync::mpsc::channel(MAILBOX_CAP);
        let (sender_buffer_tx, sender_buffer_rx) = tokio::sync::mpsc::channel(MAILBOX_CAP);

        let actor_handle = tokio::spawn(client_actor(
            principal.clone(),
            conn_id,
            s2c_channel,
            c2s_channel,
            sender_control_tx.clone(),
            sender_control_rx,
            sender_buffer_rx,
            actor_cancel.clone(),
            self.online_users.clone(),
        ));

        let record = ClientRecord {
            principal: principal.clone(),
            control: sender_control_tx,
            mailbox: sender_buffer_tx,
            actor_handle: Mutex::new(Some(actor_handle)),
            cancellation_token: actor_cancel,
            conn_id,
        };
        if let Some(displaced) = self.online_users.insert(principal.username, record) {
            // a newer connection for the same subject wins
            displaced.cancellation_token.cancel();
        }

        Ok(())
    }
}

async fn client_actor(
    principal: Principal,
    conn_id: u64,
    s2c_channel: Box<dyn ConnSender>,
    c2s_channel: Box<dyn ConnReceiver>,
    sender_control_tx: Sender<ConnMessage>,
    sender_control_rx: Receiver<ConnMessage>,
    sender_data_rx: Receiver<ConnMessage>,
    actor_cancel: CancellationToken,
    online_users: Arc<DashMap<Username, ClientRecord>>,
) {
    tracing::info!("ClientActor [{}] starting", principal.username);

    let sender_token = actor_cancel.clone();
    let sender_handle = tokio::spawn(outbound_sender(
        s2c_channel,
        sender_control_rx,
        sender_data_rx,
        sender_token,
    ));

    let receiver_token = actor_cancel.clone();
    let receiver_principal = principal.clone();
    let receiver_handle = tokio::spawn(inbound_receiver(
        receiver_principal,
        c2s_channel,
        sender_control_tx,
        receiver_token,
    ));

    let _ = tokio::select! {
        res = sender_handle => {
            tracing::debug!("Sender task ended first ({}): {:?}", principal.username, res);
        },
        res = receiver_handle => {
            tracing::debug!("Receiver task ended first ({}): {:?}", principal.username, res);
        }
    };
    online_users.remove_if(&principal.username, |_, record| record.conn_id == conn_id);
    tracing::debug!("online_users: {}", online_users.len());
}

async fn outbound_sender(
    mut s2c_channel: Box<dyn ConnSender>,
    mut sender_control_rx: Receiver<ConnMessage>,
    mut sender_data_rx: Receiver<ConnMessage>,
    actor_cancel: CancellationToken,
) {
    while let Some(msg) = tokio::select! {
        biased;
        _ = actor_cancel.cancelled() => None,
        m = sender_control_rx.recv() => m,
        m = sender_data_rx.recv() => m,
    } {
        tracing::trace!("outbound_sender: {:?}", msg);
        if s2c_channel.send(msg).await.is_err() {
            tracing::trace!("outbound_sender shutting down");
            actor_cancel.cancel();
            break;
        }
    }
}

async fn inbound_receiver(
    principal: Principal,
    mut c2s_channel: Box<dyn ConnReceiver>,
    sender_control_tx: Sender<ConnMessage>,
    actor_cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;

            _ = actor_cancel.cancelled() => {
                tracing::info!("ClientActor [{}] shutdown by cancel", principal.username);
                break;
            },

            maybe_message = c2s_channel.next() => {
                let result = match maybe_message {
                    Some(result) => result,
                    None => break,  // connection closed
                };

                let conn_msg = match result {
                    Ok(m) => m,
                    Err(_) => break,  // low level error
                };

                if let Err(e) = handle_incoming_message(
                    &principal,
                    conn_msg,
                    &sender_control_tx,
                    &actor_cancel,
                ).await {
                    tracing::error!("handling message from [{}]: {e}", principal.username);
                }
            }
        }
    }

    actor_cancel.cancel();
    tracing::info!("ClientActor [{}] shutting down", principal.username);
}

async fn handle_incoming_message(
    principal: &Principal,
    conn_msg: ConnMessage,
    sender_control_tx: &Sender<ConnMessage>,
    actor_cancel: &CancellationToken,
) -> anyhow::Result<()> {
    match conn_msg {
        ConnMessage::Text(t) => {
            if let Ok(request) = serde_json::from_str::<C2SCommand>(&t) {
                let event = match request {
                    C2SCommand::WhoAmI => S2CEvent::Identity(IdentitySummary {
                        username: principal.username.clone(),
                        roles: principal.roles.clone(),
                    }),
                };
                sender_control_tx
                    .send(ConnMessage::Text(serde_json::to_string(&event)?))
                    .await?;
                Ok(())
            } else {
                tracing::error!("failed to deserialize message: {}", t);
                sender_control_tx
                    .send(ConnMessage::Text("malformed message".to_owned()))
                    .await?;
                Ok(())
            }
        }
        ConnMessage::Binary(_) => {
            tracing::error!(
                "unexpected binary message from [{}]",
                principal.username
            );
            Ok(())
        }
        ConnMessage::Ping => {
            sender_control_tx.send(ConnMessage::Pong).await?;
            Ok(())
        }
        ConnMessage::Pong => Ok(()),
        ConnMessage::Close => {
            actor_cancel.cancel();
            Ok(())
        }
    }
}

// endregion

// region outbound queue

#[async_trait::async_trait]
impl OutboundQueue for SessionHub {
    async fn enqueue(&self, receiver: &Username, event: &S2CEvent) -> anyhow::Result<()> {
        if let Some(record) = self.online_users.get(receiver) {
            let message = serde_json::to_string(event)?;
            match record.mailbox.try_send(ConnMessage::Text(message)) {
                Ok(_) => Ok(()),
                Err(TrySendError::Full(..)) => Err(anyhow!("backpressure retry")),
                Err(e) => Err(anyhow!("failed to enqueue message: {e}")),
            }
        } else {
            Err(anyhow!("user {} not connected", receiver))
        }
    }
}

// endregion
