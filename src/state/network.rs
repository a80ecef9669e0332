use crate::state::messages::{
    EventAction, MatchAction, NetworkRequest, NetworkResponse, TournamentAction,
};
use chrono::Utc;
use guild_api::client::{ApiError, ApiResult};
use guild_api::notifications::NotificationQuery;
use guild_api::session::{Session, TokenStore};
use guild_api::tournaments::TournamentFilter;
use log::{debug, error, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, watch};

const SPINNER_CHARS: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
pub const ERROR_CHAR: char = '!';

#[derive(Debug, Copy, Clone)]
pub struct LoadingState {
    pub is_loading: bool,
    pub spinner_char: char,
}

impl Default for LoadingState {
    fn default() -> Self {
        Self { is_loading: false, spinner_char: ' ' }
    }
}

/// Runs every backend call on behalf of the UI and owns the session.
pub struct NetworkWorker<S: TokenStore> {
    session: Session<S>,
    requests: mpsc::Receiver<NetworkRequest>,
    responses: mpsc::Sender<NetworkResponse>,
    authenticated: watch::Sender<bool>,
    is_loading: Arc<AtomicBool>,
}

impl<S: TokenStore + 'static> NetworkWorker<S> {
    pub fn new(
        session: Session<S>,
        requests: mpsc::Receiver<NetworkRequest>,
        responses: mpsc::Sender<NetworkResponse>,
        authenticated: watch::Sender<bool>,
    ) -> Self {
        Self {
            session,
            requests,
            responses,
            authenticated,
            is_loading: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn run(mut self) {
        while let Some(request) = self.requests.recv().await {
            let quiet = matches!(request, NetworkRequest::RefreshUnread);
            if !quiet {
                self.start_loading_animation().await;
            }

            let was_authenticated = self.session.is_authenticated();
            let result = self.handle(request).await;
            debug!("network request complete");

            if let Err(err) = &result {
                self.session.observe(err);
            }
            if !quiet {
                self.stop_loading_animation(result.is_ok()).await;
            }

            let response = result.unwrap_or_else(|err| {
                error!("request failed: {err}");
                NetworkResponse::Error { message: err.user_message() }
            });
            let mut outgoing = Vec::with_capacity(2);
            if was_authenticated
                && !self.session.is_authenticated()
                && !matches!(response, NetworkResponse::SessionChanged { .. })
            {
                outgoing.push(NetworkResponse::SessionChanged { user: None });
            }
            outgoing.push(response);
            self.publish_auth();

            for response in outgoing {
                if let Err(e) = self.responses.send(response).await {
                    error!("Failed to send network response: {e}");
                    return;
                }
            }
        }
    }

    async fn handle(&mut self, request: NetworkRequest) -> ApiResult<NetworkResponse> {
        let api = self.session.api().clone();
        match request {
            NetworkRequest::RestoreSession => {
                let user = self.session.restore().await?.cloned();
                Ok(NetworkResponse::SessionChanged { user })
            }
            NetworkRequest::LoginWithToken { token } => {
                let user = self.session.login_with_token(&token).await?.clone();
                Ok(NetworkResponse::SessionChanged { user: Some(user) })
            }
            NetworkRequest::CompleteLogin { code, state } => {
                let user = self.session.complete_login(&code, &state).await?.clone();
                Ok(NetworkResponse::SessionChanged { user: Some(user) })
            }
            NetworkRequest::FetchLoginUrl => {
                let url = self.session.login_url().await?;
                Ok(NetworkResponse::LoginUrl { url })
            }
            NetworkRequest::Logout => {
                if let Err(e) = self.session.logout().await {
                    warn!("logout call failed, local session cleared anyway: {e}");
                }
                Ok(NetworkResponse::SessionChanged { user: None })
            }
            NetworkRequest::LoadTournaments => {
                let tournaments = api.tournaments().list(&TournamentFilter::default()).await?;
                Ok(NetworkResponse::TournamentsLoaded { tournaments })
            }
            NetworkRequest::LoadTournament { slug } => {
                let tournament = api.tournaments().get(&slug).await?;
                Ok(NetworkResponse::TournamentLoaded { tournament })
            }
            NetworkRequest::Tournament { slug, action } => {
                let outcome = self.tournament_action(&slug, action).await;
                self.refetch_after(&slug, outcome).await
            }
            NetworkRequest::Match { slug, match_id, action } => {
                let outcome = self.match_action(match_id, action).await;
                self.refetch_after(&slug, outcome).await
            }
            NetworkRequest::LoadEvents => {
                let events = api.events().upcoming().await?;
                Ok(NetworkResponse::EventsLoaded { events })
            }
            NetworkRequest::Event { slug, action } => {
                let events = api.events();
                let notice = match action {
                    EventAction::SignUp => events.sign_up(&slug, None).await.map(|_| "Signed up"),
                    EventAction::Withdraw => events.withdraw(&slug).await.map(|_| "Signup withdrawn"),
                    EventAction::CheckIn => events.check_in(&slug).await.map(|_| "Checked in"),
                };
                match notice {
                    Ok(message) => self.notice(message).await,
                    Err(err) => {
                        self.session.observe(&err);
                        self.report(&err).await;
                    }
                }
                let events = api.events().upcoming().await?;
                Ok(NetworkResponse::EventsLoaded { events })
            }
            NetworkRequest::LoadNotifications => {
                let notifications = api.notifications();
                let items = notifications.list(&NotificationQuery::default()).await?;
                let summary = notifications.unread_summary().await?;
                Ok(NetworkResponse::NotificationsLoaded { items, summary })
            }
            NetworkRequest::RefreshUnread => {
                let summary = api.notifications().unread_summary().await?;
                Ok(NetworkResponse::UnreadSummary { summary })
            }
            NetworkRequest::MarkRead { id } => {
                let read_at = api.notifications().mark_read(id).await?.unwrap_or_else(Utc::now);
                Ok(NetworkResponse::NotificationRead { id, read_at })
            }
            NetworkRequest::MarkAllRead => {
                let updated = api.notifications().mark_all_read().await?;
                debug!("{updated} notifications marked read");
                Ok(NetworkResponse::AllNotificationsRead { read_at: Utc::now() })
            }
            NetworkRequest::LoadChatHistory { context } => {
                let messages = api.chat().history(context).await?;
                Ok(NetworkResponse::ChatHistoryLoaded { context, messages })
            }
            NetworkRequest::SendChat { context, content } => {
                let message = api.chat().send(context, &content).await?;
                Ok(NetworkResponse::ChatMessageSent { context, message })
            }
        }
    }

    async fn tournament_action(&self, slug: &str, action: TournamentAction) -> ApiResult<&'static str> {
        let tournaments = self.session.api().tournaments();
        match action {
            TournamentAction::OpenRegistration => {
                tournaments.open_registration(slug).await.map(|_| "Registration opened")
            }
            TournamentAction::CloseRegistration => {
                tournaments.close_registration(slug).await.map(|_| "Registration closed")
            }
            TournamentAction::ReopenRegistration => {
                tournaments.reopen_registration(slug).await.map(|_| "Registration reopened")
            }
            TournamentAction::Start => {
                let current = tournaments.get(slug).await?;
                tournaments.start(&current).await.map(|_| "Tournament started")
            }
            TournamentAction::Cancel => tournaments.cancel(slug).await.map(|_| "Tournament cancelled"),
            TournamentAction::RegisterTeam { name } => {
                tournaments.register_team(slug, &name).await.map(|_| "Team registered")
            }
            TournamentAction::WithdrawTeam { team_id } => {
                tournaments.withdraw_team(slug, team_id).await.map(|_| "Team withdrawn")
            }
        }
    }

    async fn match_action(&self, match_id: u64, action: MatchAction) -> ApiResult<&'static str> {
        let tournaments = self.session.api().tournaments();
        match action {
            MatchAction::ReportScore(report) => {
                tournaments.report_score(match_id, report).await.map(|_| "Score reported")
            }
            MatchAction::Verify => tournaments.verify(match_id).await.map(|_| "Score verified"),
            MatchAction::Dispute { reason } => {
                tournaments.dispute(match_id, &reason).await.map(|_| "Dispute filed")
            }
            MatchAction::Schedule { at } => {
                tournaments.schedule(match_id, at, Utc::now()).await.map(|_| "Match scheduled")
            }
        }
    }

    /// The tournament is re-fetched whether the action succeeded or not.
    /// A failed action is reported once, even if the re-fetch fails too.
    async fn refetch_after(
        &mut self,
        slug: &str,
        outcome: ApiResult<&'static str>,
    ) -> ApiResult<NetworkResponse> {
        let refetched = self.session.api().tournaments().get(slug).await;
        match (outcome, refetched) {
            (Ok(message), refetched) => {
                self.notice(message).await;
                Ok(NetworkResponse::TournamentLoaded { tournament: refetched? })
            }
            (Err(err), Ok(tournament)) => {
                self.session.observe(&err);
                self.report(&err).await;
                Ok(NetworkResponse::TournamentLoaded { tournament })
            }
            (Err(err), Err(refetch_err)) => {
                warn!("re-fetch of {slug} failed as well: {refetch_err}");
                self.session.observe(&refetch_err);
                Err(err)
            }
        }
    }

    async fn report(&self, err: &ApiError) {
        error!("action failed: {err}");
        let _ = self
            .responses
            .send(NetworkResponse::Error { message: err.user_message() })
            .await;
    }

    async fn notice(&self, message: &str) {
        let _ = self
            .responses
            .send(NetworkResponse::Notice { message: message.to_string() })
            .await;
    }

    fn publish_auth(&self) {
        let authenticated = self.session.is_authenticated();
        self.authenticated.send_if_modified(|current| {
            let changed = *current != authenticated;
            *current = authenticated;
            changed
        });
    }

    async fn start_loading_animation(&self) {
        self.is_loading.store(true, Ordering::Relaxed);

        let mut loading_state =
            LoadingState { is_loading: true, spinner_char: SPINNER_CHARS[0] };
        let _ = self
            .responses
            .send(NetworkResponse::LoadingStateChanged { loading_state })
            .await;

        let responses = self.responses.clone();
        let is_loading = self.is_loading.clone();

        tokio::spawn(async move {
            let mut spinner_index = 1;
            let mut interval = tokio::time::interval(Duration::from_millis(33));
            loop {
                interval.tick().await;
                if !is_loading.load(Ordering::Relaxed) {
                    break;
                }
                loading_state.spinner_char = SPINNER_CHARS[spinner_index];
                spinner_index = (spinner_index + 1) % SPINNER_CHARS.len();
                let _ = responses
                    .send(NetworkResponse::LoadingStateChanged { loading_state })
                    .await;
            }
        });
    }

    async fn stop_loading_animation(&self, is_ok: bool) {
        self.is_loading.store(false, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(15)).await;

        let spinner_char = if is_ok { ' ' } else { ERROR_CHAR };
        let _ = self
            .responses
            .send(NetworkResponse::LoadingStateChanged {
                loading_state: LoadingState { is_loading: false, spinner_char },
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guild_api::client::GuildApi;
    use guild_api::session::MemoryTokenStore;
    use guild_api::tournaments::ScoreReport;

    const TOURNAMENT_JSON: &str = r#"{"data": {"id": 4, "slug": "cup", "name": "Cup",
        "format": "se", "state": "ongoing", "team_size": 1, "created_by": 1}}"#;

    struct Harness {
        requests: mpsc::Sender<NetworkRequest>,
        responses: mpsc::Receiver<NetworkResponse>,
        authenticated: watch::Receiver<bool>,
    }

    fn spawn_worker(server: &mockito::Server, store: MemoryTokenStore) -> Harness {
        let session = Session::new(GuildApi::new(server.url()), store);
        let (req_tx, req_rx) = mpsc::channel(16);
        let (resp_tx, resp_rx) = mpsc::channel(256);
        let (auth_tx, auth_rx) = watch::channel(false);
        tokio::spawn(NetworkWorker::new(session, req_rx, resp_tx, auth_tx).run());
        Harness { requests: req_tx, responses: resp_rx, authenticated: auth_rx }
    }

    /// Next response that is not a spinner update.
    async fn next(harness: &mut Harness) -> NetworkResponse {
        loop {
            match harness.responses.recv().await {
                Some(NetworkResponse::LoadingStateChanged { .. }) => continue,
                Some(other) => return other,
                None => panic!("worker stopped"),
            }
        }
    }

    #[tokio::test]
    async fn failed_match_action_still_refetches_tournament() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/matches/9/verify")
            .with_status(409)
            .with_body(r#"{"message": "Match already verified"}"#)
            .create_async()
            .await;
        let refetch = server
            .mock("GET", "/api/v1/tournaments/cup")
            .with_status(200)
            .with_body(TOURNAMENT_JSON)
            .expect(1)
            .create_async()
            .await;

        let mut harness = spawn_worker(&server, MemoryTokenStore::default());
        harness
            .requests
            .send(NetworkRequest::Match { slug: "cup".into(), match_id: 9, action: MatchAction::Verify })
            .await
            .unwrap();

        match next(&mut harness).await {
            NetworkResponse::Error { message } => assert_eq!(message, "Match already verified"),
            other => panic!("unexpected {other:?}"),
        }
        match next(&mut harness).await {
            NetworkResponse::TournamentLoaded { tournament } => assert_eq!(tournament.slug, "cup"),
            other => panic!("unexpected {other:?}"),
        }
        refetch.assert_async().await;
    }

    #[tokio::test]
    async fn failed_action_and_failed_refetch_report_one_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/matches/9/verify")
            .with_status(409)
            .with_body(r#"{"message": "Match already verified"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v1/tournaments/cup")
            .with_status(500)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v1/tournaments")
            .with_status(200)
            .with_body(r#"{"data": []}"#)
            .create_async()
            .await;

        let mut harness = spawn_worker(&server, MemoryTokenStore::default());
        harness
            .requests
            .send(NetworkRequest::Match { slug: "cup".into(), match_id: 9, action: MatchAction::Verify })
            .await
            .unwrap();
        harness.requests.send(NetworkRequest::LoadTournaments).await.unwrap();

        match next(&mut harness).await {
            NetworkResponse::Error { message } => assert_eq!(message, "Match already verified"),
            other => panic!("unexpected {other:?}"),
        }
        match next(&mut harness).await {
            NetworkResponse::TournamentsLoaded { tournaments } => assert!(tournaments.is_empty()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn equal_scores_never_reach_the_server() {
        let mut server = mockito::Server::new_async().await;
        let report = server
            .mock("POST", "/api/v1/matches/9/report")
            .expect(0)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v1/tournaments/cup")
            .with_status(200)
            .with_body(TOURNAMENT_JSON)
            .create_async()
            .await;

        let mut harness = spawn_worker(&server, MemoryTokenStore::default());
        let action = MatchAction::ReportScore(ScoreReport::new(2, 2));
        harness
            .requests
            .send(NetworkRequest::Match { slug: "cup".into(), match_id: 9, action })
            .await
            .unwrap();

        match next(&mut harness).await {
            NetworkResponse::Error { message } => assert_eq!(message, "scores cannot be equal"),
            other => panic!("unexpected {other:?}"),
        }
        report.assert_async().await;
    }

    #[tokio::test]
    async fn unauthorized_response_signs_the_user_out() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/auth/check")
            .with_status(200)
            .with_body(r#"{"id": 7, "handle": "ace"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v1/notifications/unread-count")
            .with_status(401)
            .create_async()
            .await;

        let mut harness = spawn_worker(&server, MemoryTokenStore::with_token("stored"));
        harness.requests.send(NetworkRequest::RestoreSession).await.unwrap();
        match next(&mut harness).await {
            NetworkResponse::SessionChanged { user } => assert_eq!(user.unwrap().handle, "ace"),
            other => panic!("unexpected {other:?}"),
        }
        harness.authenticated.changed().await.unwrap();
        assert!(*harness.authenticated.borrow());

        harness.requests.send(NetworkRequest::RefreshUnread).await.unwrap();
        match next(&mut harness).await {
            NetworkResponse::SessionChanged { user } => assert!(user.is_none()),
            other => panic!("unexpected {other:?}"),
        }
        match next(&mut harness).await {
            NetworkResponse::Error { message } => {
                assert_eq!(message, "Session expired, please reconnect.")
            }
            other => panic!("unexpected {other:?}"),
        }
        harness.authenticated.changed().await.unwrap();
        assert!(!*harness.authenticated.borrow());
    }

    #[tokio::test]
    async fn logout_reports_signed_out_even_when_backend_fails() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/auth/check")
            .with_status(200)
            .with_body(r#"{"id": 7, "handle": "ace"}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/api/v1/auth/logout")
            .with_status(503)
            .create_async()
            .await;

        let mut harness = spawn_worker(&server, MemoryTokenStore::with_token("stored"));
        harness.requests.send(NetworkRequest::RestoreSession).await.unwrap();
        let _ = next(&mut harness).await;

        harness.requests.send(NetworkRequest::Logout).await.unwrap();
        match next(&mut harness).await {
            NetworkResponse::SessionChanged { user } => assert!(user.is_none()),
            other => panic!("unexpected {other:?}"),
        }
        harness.authenticated.changed().await.unwrap();
        assert!(!*harness.authenticated.borrow());
    }
}
