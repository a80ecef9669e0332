use futures_util::{SinkExt, StreamExt};
use guild_api::chat::{KEEPALIVE_SECS, PING_FRAME, parse_frame, socket_url};
use guild_api::client::GuildApi;
use guild_api::{ChatContext, ChatMessage};
use log::{debug, warn};
use tokio::sync::mpsc;
use tokio::time::{Duration, MissedTickBehavior, interval, sleep};
use tokio_tungstenite::{connect_async, tungstenite::Message};

pub const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatCommand {
    Join(ChatContext),
    Leave,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    State { context: ChatContext, state: ConnectionState },
    Message { context: ChatContext, message: ChatMessage },
    Error { context: ChatContext, message: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Waiting this long before the next attempt.
    Backoff(Duration),
}

impl ConnectionState {
    pub fn label(&self) -> String {
        match self {
            ConnectionState::Disconnected => "offline".to_string(),
            ConnectionState::Connecting => "connecting".to_string(),
            ConnectionState::Connected => "online".to_string(),
            ConnectionState::Backoff(delay) => format!("retry in {}s", delay.as_secs()),
        }
    }
}

/// Exponential delay: doubles per failure, capped, reset on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    next: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self { next: INITIAL_BACKOFF }
    }
}

impl Backoff {
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(MAX_BACKOFF);
        delay
    }

    pub fn reset(&mut self) {
        self.next = INITIAL_BACKOFF;
    }
}

/// Disconnected -> Connecting -> Connected -> Backoff -> Connecting.
/// `leave` returns to Disconnected from anywhere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionMachine {
    state: ConnectionState,
    backoff: Backoff,
}

impl ConnectionMachine {
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn join(&mut self) -> ConnectionState {
        self.backoff.reset();
        self.state = ConnectionState::Connecting;
        self.state
    }

    pub fn connected(&mut self) -> ConnectionState {
        self.backoff.reset();
        self.state = ConnectionState::Connected;
        self.state
    }

    pub fn lost(&mut self) -> ConnectionState {
        self.state = ConnectionState::Backoff(self.backoff.next_delay());
        self.state
    }

    pub fn retry(&mut self) -> ConnectionState {
        self.state = ConnectionState::Connecting;
        self.state
    }

    pub fn leave(&mut self) -> ConnectionState {
        self.backoff.reset();
        self.state = ConnectionState::Disconnected;
        self.state
    }
}

/// What the worker does after a socket session ends.
enum Flow {
    Reconnect,
    Switch(ChatContext),
    Leave,
    Shutdown,
}

impl From<Option<ChatCommand>> for Flow {
    fn from(cmd: Option<ChatCommand>) -> Self {
        match cmd {
            Some(ChatCommand::Join(context)) => Flow::Switch(context),
            Some(ChatCommand::Leave) => Flow::Leave,
            None => Flow::Shutdown,
        }
    }
}

/// One receive-only socket for the open chat room. Messages go out over REST.
#[derive(Debug)]
pub struct ChatWorker {
    pub api: GuildApi,
    pub ws_base: String,
    pub commands: mpsc::Receiver<ChatCommand>,
    pub events: mpsc::Sender<ChatEvent>,
}

impl ChatWorker {
    pub async fn run(mut self) {
        let mut room: Option<ChatContext> = None;
        let mut machine = ConnectionMachine::default();

        loop {
            let Some(context) = room else {
                match Flow::from(self.commands.recv().await) {
                    Flow::Switch(next) => {
                        room = Some(next);
                        self.emit_state(next, machine.join()).await;
                    }
                    Flow::Leave | Flow::Reconnect => {}
                    Flow::Shutdown => return,
                }
                continue;
            };

            let flow = self.session(context, &mut machine).await;
            let flow = match flow {
                Flow::Reconnect => {
                    let delay = match machine.lost() {
                        ConnectionState::Backoff(delay) => delay,
                        _ => INITIAL_BACKOFF,
                    };
                    self.emit_state(context, machine.state()).await;
                    tokio::select! {
                        _ = sleep(delay) => {
                            self.emit_state(context, machine.retry()).await;
                            Flow::Reconnect
                        }
                        cmd = self.commands.recv() => Flow::from(cmd),
                    }
                }
                other => other,
            };

            match flow {
                Flow::Reconnect => {}
                Flow::Switch(next) => {
                    self.emit_state(context, machine.leave()).await;
                    room = Some(next);
                    self.emit_state(next, machine.join()).await;
                }
                Flow::Leave => {
                    room = None;
                    self.emit_state(context, machine.leave()).await;
                }
                Flow::Shutdown => return,
            }
        }
    }

    /// Connect, then pump frames until the socket drops or a command arrives.
    async fn session(&mut self, context: ChatContext, machine: &mut ConnectionMachine) -> Flow {
        let Some(token) = self.api.token() else {
            self.emit_error(context, "sign in to join the chat").await;
            return Flow::Leave;
        };
        let url = match socket_url(&self.ws_base, context, &token) {
            Ok(url) => url,
            Err(e) => {
                self.emit_error(context, &e.to_string()).await;
                return Flow::Leave;
            }
        };

        let stream = tokio::select! {
            connected = connect_async(url.as_str()) => match connected {
                Ok((stream, _)) => stream,
                Err(e) => {
                    self.emit_error(context, &format!("chat connect failed: {e}")).await;
                    return Flow::Reconnect;
                }
            },
            cmd = self.commands.recv() => return Flow::from(cmd),
        };

        debug!("chat connected to {context}");
        self.emit_state(context, machine.connected()).await;
        let (mut write, mut read) = stream.split();

        let mut keepalive = interval(Duration::from_secs(KEEPALIVE_SECS));
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
        keepalive.tick().await;

        loop {
            tokio::select! {
                cmd = self.commands.recv() => {
                    let _ = write.send(Message::Close(None)).await;
                    return Flow::from(cmd);
                }
                _ = keepalive.tick() => {
                    if let Err(e) = write.send(Message::Text(PING_FRAME.into())).await {
                        warn!("chat keep-alive failed: {e}");
                        return Flow::Reconnect;
                    }
                }
                inbound = read.next() => match inbound {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(message) = parse_frame(text.as_str()) {
                            let _ = self.events.send(ChatEvent::Message { context, message }).await;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => return Flow::Reconnect,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        self.emit_error(context, &format!("chat read failed: {e}")).await;
                        return Flow::Reconnect;
                    }
                },
            }
        }
    }

    async fn emit_state(&self, context: ChatContext, state: ConnectionState) {
        let _ = self.events.send(ChatEvent::State { context, state }).await;
    }

    async fn emit_error(&self, context: ChatContext, message: &str) {
        let _ = self
            .events
            .send(ChatEvent::Error { context, message: message.to_string() })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_up_to_cap() {
        let mut backoff = Backoff::default();
        let delays: Vec<u64> = (0..8).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(delays, [1, 2, 4, 8, 16, 30, 30, 30]);
    }

    #[test]
    fn successful_connect_resets_backoff() {
        let mut machine = ConnectionMachine::default();
        assert_eq!(machine.join(), ConnectionState::Connecting);
        assert_eq!(machine.lost(), ConnectionState::Backoff(Duration::from_secs(1)));
        assert_eq!(machine.retry(), ConnectionState::Connecting);
        assert_eq!(machine.lost(), ConnectionState::Backoff(Duration::from_secs(2)));
        assert_eq!(machine.retry(), ConnectionState::Connecting);
        assert_eq!(machine.connected(), ConnectionState::Connected);
        assert_eq!(machine.lost(), ConnectionState::Backoff(Duration::from_secs(1)));
    }

    #[test]
    fn leave_from_any_state_disconnects() {
        let mut machine = ConnectionMachine::default();
        machine.join();
        machine.lost();
        assert_eq!(machine.leave(), ConnectionState::Disconnected);
        machine.join();
        machine.connected();
        assert_eq!(machine.leave(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn join_without_session_reports_and_goes_offline() {
        let (cmd_tx, cmd_rx) = mpsc::channel(4);
        let (evt_tx, mut evt_rx) = mpsc::channel(16);
        let worker = ChatWorker {
            api: GuildApi::new("http://127.0.0.1:9"),
            ws_base: "ws://127.0.0.1:9".to_string(),
            commands: cmd_rx,
            events: evt_tx,
        };
        tokio::spawn(worker.run());

        let room = ChatContext::match_room(3);
        cmd_tx.send(ChatCommand::Join(room)).await.unwrap();

        assert_eq!(
            evt_rx.recv().await,
            Some(ChatEvent::State { context: room, state: ConnectionState::Connecting })
        );
        assert!(matches!(evt_rx.recv().await, Some(ChatEvent::Error { context, .. }) if context == room));
        assert_eq!(
            evt_rx.recv().await,
            Some(ChatEvent::State { context: room, state: ConnectionState::Disconnected })
        );
    }
}
