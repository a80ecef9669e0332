use crate::client::{ApiResult, GuildApi};
use crate::wire::{MarkAllResponse, ReadResponse};
use crate::{Notification, NotificationPreferences, UnreadSummary};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// How often the unread summary is re-polled while authenticated.
pub const POLL_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Clone, Default, Serialize)]
pub struct NotificationQuery {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub unread_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

#[derive(Debug, Clone, Copy)]
pub struct Notifications<'a> {
    api: &'a GuildApi,
}

impl GuildApi {
    pub fn notifications(&self) -> Notifications<'_> {
        Notifications { api: self }
    }
}

impl Notifications<'_> {
    pub async fn list(&self, query: &NotificationQuery) -> ApiResult<Vec<Notification>> {
        self.api.get_query("/notifications", query).await
    }

    pub async fn unread_summary(&self) -> ApiResult<UnreadSummary> {
        self.api.get("/notifications/unread-count").await
    }

    /// Returns the server's `read_at`, when it sends one.
    pub async fn mark_read(&self, id: u64) -> ApiResult<Option<DateTime<Utc>>> {
        let response: ReadResponse = self
            .api
            .post(&format!("/notifications/{id}/read"), &serde_json::json!({}))
            .await?;
        Ok(response.read_at)
    }

    pub async fn mark_all_read(&self) -> ApiResult<u32> {
        let response: MarkAllResponse = self
            .api
            .post("/notifications/read-all", &serde_json::json!({}))
            .await?;
        Ok(response.updated)
    }

    pub async fn delete(&self, id: u64) -> ApiResult<()> {
        self.api.delete(&format!("/notifications/{id}")).await
    }

    pub async fn preferences(&self) -> ApiResult<NotificationPreferences> {
        self.api.get("/notifications/preferences").await
    }

    pub async fn update_preferences(
        &self,
        preferences: &NotificationPreferences,
    ) -> ApiResult<NotificationPreferences> {
        self.api.put("/notifications/preferences", preferences).await
    }
}

/// Client-side copy of the notification list and unread counter.
///
/// Mutations are applied only after the server confirmed them.
#[derive(Debug, Clone, Default)]
pub struct Inbox {
    pub items: Vec<Notification>,
    pub unread_count: u32,
    pub urgent_count: u32,
}

impl Inbox {
    pub fn replace(&mut self, items: Vec<Notification>) {
        self.items = items;
    }

    pub fn apply_summary(&mut self, summary: UnreadSummary) {
        self.unread_count = summary.unread_count;
        self.urgent_count = summary.urgent_count;
    }

    pub fn get(&self, id: u64) -> Option<&Notification> {
        self.items.iter().find(|n| n.id == id)
    }

    /// Record a confirmed single read. Returns false if the item was unknown
    /// or already read, in which case the counter is untouched.
    pub fn apply_read(&mut self, id: u64, read_at: DateTime<Utc>) -> bool {
        let Some(item) = self.items.iter_mut().find(|n| n.id == id) else {
            return false;
        };
        if item.is_read {
            return false;
        }
        item.is_read = true;
        item.read_at = Some(read_at);
        self.unread_count = self.unread_count.saturating_sub(1);
        true
    }

    pub fn apply_all_read(&mut self, read_at: DateTime<Utc>) {
        for item in self.items.iter_mut().filter(|n| !n.is_read) {
            item.is_read = true;
            item.read_at = Some(read_at);
        }
        self.unread_count = 0;
        self.urgent_count = 0;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NotificationType, Priority};
    use chrono::TimeZone;

    fn notification(id: u64, is_read: bool) -> Notification {
        let created_at = Utc.with_ymd_and_hms(2026, 4, 2, 9, 0, 0).unwrap();
        Notification {
            id,
            kind: NotificationType::MatchReady,
            title: format!("match {id}"),
            message: String::new(),
            priority: Priority::High,
            is_read,
            read_at: is_read.then_some(created_at),
            action_url: None,
            created_at,
        }
    }

    fn inbox() -> Inbox {
        let mut inbox = Inbox::default();
        inbox.replace(vec![notification(1, false), notification(2, false), notification(3, true)]);
        inbox.apply_summary(UnreadSummary { unread_count: 2, urgent_count: 0 });
        inbox
    }

    #[test]
    fn single_read_decrements_by_one() {
        let mut inbox = inbox();
        let now = Utc::now();
        assert!(inbox.apply_read(1, now));
        assert_eq!(inbox.unread_count, 1);
        let item = inbox.get(1).unwrap();
        assert!(item.is_read);
        assert_eq!(item.read_at, Some(now));
        assert!(!inbox.get(2).unwrap().is_read);
    }

    #[test]
    fn reading_twice_does_not_double_count() {
        let mut inbox = inbox();
        assert!(inbox.apply_read(1, Utc::now()));
        assert!(!inbox.apply_read(1, Utc::now()));
        assert!(!inbox.apply_read(3, Utc::now()), "already read");
        assert!(!inbox.apply_read(99, Utc::now()), "unknown id");
        assert_eq!(inbox.unread_count, 1);
    }

    #[test]
    fn mark_all_zeroes_counter_and_reads_every_item() {
        let mut inbox = inbox();
        inbox.apply_all_read(Utc::now());
        assert_eq!(inbox.unread_count, 0);
        assert!(inbox.items.iter().all(|n| n.is_read && n.read_at.is_some()));
    }

    #[tokio::test]
    async fn mark_read_returns_server_timestamp() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/notifications/7/read")
            .with_status(200)
            .with_body(r#"{"data": {"read_at": "2026-04-02T10:30:00Z"}}"#)
            .create_async()
            .await;

        let api = GuildApi::new(server.url());
        let read_at = api.notifications().mark_read(7).await.unwrap();
        assert_eq!(read_at, Some(Utc.with_ymd_and_hms(2026, 4, 2, 10, 30, 0).unwrap()));
    }

    #[tokio::test]
    async fn list_unread_only() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/notifications")
            .match_query(mockito::Matcher::UrlEncoded("unread_only".into(), "true".into()))
            .with_status(200)
            .with_body(
                r#"{"data": [{"id": 1, "type": "score_disputed", "title": "Dispute",
                    "priority": "urgent", "is_read": false,
                    "action_url": "/tournaments/cup/matches/4",
                    "created_at": "2026-04-02T09:00:00Z"}]}"#,
            )
            .create_async()
            .await;

        let api = GuildApi::new(server.url());
        let query = NotificationQuery { unread_only: true, page: None };
        let items = api.notifications().list(&query).await.unwrap();
        assert_eq!(items[0].kind, NotificationType::ScoreDisputed);
        assert_eq!(items[0].priority, Priority::Urgent);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unread_summary_parses_bare_payload() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/notifications/unread-count")
            .with_status(200)
            .with_body(r#"{"unread_count": 4, "urgent_count": 1}"#)
            .create_async()
            .await;

        let api = GuildApi::new(server.url());
        let summary = api.notifications().unread_summary().await.unwrap();
        assert_eq!(summary, UnreadSummary { unread_count: 4, urgent_count: 1 });
    }
}
