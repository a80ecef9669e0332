use crate::state::messages::NetworkRequest;
use guild_api::notifications::POLL_INTERVAL_SECS;
use log::debug;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{MissedTickBehavior, interval};

/// Re-polls the unread notification summary while someone is signed in.
/// Idles on the authenticated flag otherwise.
pub struct PeriodicRefresher {
    network_requests: mpsc::Sender<NetworkRequest>,
    authenticated: watch::Receiver<bool>,
    period: Duration,
}

impl PeriodicRefresher {
    pub fn new(
        network_requests: mpsc::Sender<NetworkRequest>,
        authenticated: watch::Receiver<bool>,
    ) -> Self {
        Self {
            network_requests,
            authenticated,
            period: Duration::from_secs(POLL_INTERVAL_SECS),
        }
    }

    pub async fn run(mut self) {
        loop {
            if !*self.authenticated.borrow_and_update() {
                if self.authenticated.changed().await.is_err() {
                    return;
                }
                continue;
            }

            debug!("notification polling started");
            let mut ticks = interval(self.period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick fires immediately; sign-in already loaded the list.
            ticks.tick().await;

            loop {
                tokio::select! {
                    _ = ticks.tick() => {
                        if self.network_requests.send(NetworkRequest::RefreshUnread).await.is_err() {
                            return;
                        }
                    }
                    changed = self.authenticated.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        if !*self.authenticated.borrow() {
                            debug!("notification polling paused");
                            break;
                        }
                    }
                }
            }
        }
    }
}
