use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::{broadcast, Notify};

use crate::config::ClientConfig;
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::types::{ChangeEvent, EventFilter, Session};

const HUB_CAPACITY: usize = 256;

/// Client for the Remote Data Service's row-level change feed.
///
/// One broadcast hub fans each `ChangeEvent` out to every open
/// `Subscription`; table and event-kind filtering happens per subscription.
/// The hub is cheap to clone.
#[derive(Clone)]
pub struct RealtimeClient {
    tx: broadcast::Sender<ChangeEvent>,
    open: Arc<AtomicUsize>,
}

impl RealtimeClient {
    /// A hub with no transport attached. Events only arrive via `emit`;
    /// used offline and in tests.
    pub fn detached() -> Self {
        let (tx, _) = broadcast::channel(HUB_CAPACITY);
        Self {
            tx,
            open: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Connect to the service's change feed and spawn the reader task that
    /// feeds the hub. The stream is not reconnected on failure; a dropped
    /// connection stops live updates until the caller rebuilds the client.
    pub async fn connect(config: &ClientConfig, session: &Session) -> AppResult<Self> {
        config.validate()?;

        let http = reqwest::Client::builder().build()?;
        let url = config.changes_url();
        let bearer = session.access_token().unwrap_or(&config.anon_key);

        let response = http
            .get(&url)
            .header("apikey", &config.anon_key)
            .header("Accept", "text/event-stream")
            .bearer_auth(bearer)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::new(
                ErrorCode::StreamDisconnected,
                format!("change feed refused with {status}"),
            ));
        }

        tracing::info!(url = %url, "change feed connected");

        let client = Self::detached();
        let tx = client.tx.clone();
        tokio::spawn(read_change_stream(response, url, tx));

        Ok(client)
    }

    /// Publish an event to every open subscription. Returns the number of
    /// receivers; zero receivers is normal and not an error.
    pub fn emit(&self, event: ChangeEvent) -> usize {
        tracing::debug!(kind = %event.kind, table = %event.table, "change event emitted");
        self.tx.send(event).unwrap_or(0)
    }

    pub fn channel(&self, name: &str) -> ChannelBuilder<'_> {
        ChannelBuilder {
            client: self,
            name: name.to_string(),
            table: None,
            filter: EventFilter::All,
        }
    }

    /// Number of subscriptions that have been opened and not yet closed.
    pub fn open_subscriptions(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }
}

/// Builder for one change-event subscription, keyed by channel name,
/// table, and event-kind filter.
pub struct ChannelBuilder<'a> {
    client: &'a RealtimeClient,
    name: String,
    table: Option<String>,
    filter: EventFilter,
}

impl<'a> ChannelBuilder<'a> {
    pub fn on_table_changes(mut self, table: &str, filter: EventFilter) -> Self {
        self.table = Some(table.to_string());
        self.filter = filter;
        self
    }

    pub fn subscribe(self) -> Subscription {
        self.client.open.fetch_add(1, Ordering::SeqCst);
        tracing::info!(
            channel = %self.name,
            table = self.table.as_deref().unwrap_or("*"),
            events = self.filter.as_str(),
            "subscription opened"
        );
        Subscription {
            channel: self.name,
            table: self.table,
            filter: self.filter,
            rx: self.client.tx.subscribe(),
            state: Arc::new(SubscriptionState {
                closed: AtomicBool::new(false),
                notify: Notify::new(),
            }),
            open: self.client.open.clone(),
        }
    }
}

struct SubscriptionState {
    closed: AtomicBool,
    notify: Notify,
}

/// One open change-event subscription.
///
/// Closing is idempotent: whichever of `close`, a `SubscriptionCloser`, or
/// drop gets there first decrements the client's open count; the rest are
/// no-ops.
pub struct Subscription {
    channel: String,
    table: Option<String>,
    filter: EventFilter,
    rx: broadcast::Receiver<ChangeEvent>,
    state: Arc<SubscriptionState>,
    open: Arc<AtomicUsize>,
}

impl Subscription {
    /// Handle for closing this subscription from outside the task that
    /// consumes its events.
    pub fn closer(&self) -> SubscriptionCloser {
        SubscriptionCloser {
            channel: self.channel.clone(),
            state: self.state.clone(),
            open: self.open.clone(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst)
    }

    pub fn close(&mut self) {
        close_shared(&self.channel, &self.state, &self.open);
    }

    /// Next event matching this subscription's table and kind filter, or
    /// `None` once the subscription is closed.
    pub async fn next_event(&mut self) -> Option<ChangeEvent> {
        loop {
            if self.is_closed() {
                return None;
            }

            tokio::select! {
                _ = self.state.notify.notified() => {
                    if self.is_closed() {
                        return None;
                    }
                }
                result = self.rx.recv() => match result {
                    Ok(event) => {
                        if self.matches(&event) {
                            return Some(event);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(channel = %self.channel, skipped, "subscription lagged, events skipped");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        self.close();
                        return None;
                    }
                },
            }
        }
    }

    fn matches(&self, event: &ChangeEvent) -> bool {
        if let Some(table) = &self.table {
            if &event.table != table {
                return false;
            }
        }
        self.filter.matches(event.kind)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}

/// Clonable close handle for a `Subscription`.
#[derive(Clone)]
pub struct SubscriptionCloser {
    channel: String,
    state: Arc<SubscriptionState>,
    open: Arc<AtomicUsize>,
}

impl SubscriptionCloser {
    pub fn close(&self) {
        close_shared(&self.channel, &self.state, &self.open);
    }
}

fn close_shared(channel: &str, state: &SubscriptionState, open: &AtomicUsize) {
    if !state.closed.swap(true, Ordering::SeqCst) {
        open.fetch_sub(1, Ordering::SeqCst);
        // notify_one stores a permit, so a receiver that has not yet
        // registered its waiter still wakes; each subscription has exactly
        // one consumer, and the consumer re-checks the closed flag.
        state.notify.notify_one();
        tracing::info!(channel = %channel, "subscription closed");
    }
}

/// Read the service's SSE change feed and publish each frame to the hub.
///
/// Frames follow the `data: <json>` / blank-line convention; comment lines
/// (heartbeats) and non-data fields are ignored.
async fn read_change_stream(
    response: reqwest::Response,
    url: String,
    tx: broadcast::Sender<ChangeEvent>,
) {
    let mut stream = response.bytes_stream();
    let mut buffer = String::new();
    let mut data = String::new();

    while let Some(chunk) = stream.next().await {
        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "change feed read error");
                break;
            }
        };
        buffer.push_str(&String::from_utf8_lossy(&bytes));

        while let Some(pos) = buffer.find('\n') {
            let line = buffer[..pos].trim_end_matches('\r').to_string();
            buffer.drain(..=pos);

            if line.is_empty() {
                if !data.is_empty() {
                    match serde_json::from_str::<ChangeEvent>(&data) {
                        Ok(event) => {
                            let _ = tx.send(event);
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "failed to parse change event frame");
                        }
                    }
                    data.clear();
                }
            } else if let Some(rest) = line.strip_prefix("data:") {
                if !data.is_empty() {
                    data.push('\n');
                }
                data.push_str(rest.trim_start());
            }
        }
    }

    tracing::warn!(url = %url, "change feed disconnected, live updates stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChangeKind;

    #[tokio::test]
    async fn hub_fans_out_to_matching_subscriptions() {
        let client = RealtimeClient::detached();
        let mut categories = client
            .channel("category-changes")
            .on_table_changes("categories", EventFilter::All)
            .subscribe();
        let mut inserts_only = client
            .channel("category-inserts")
            .on_table_changes("categories", EventFilter::Only(ChangeKind::Insert))
            .subscribe();

        let n = client.emit(ChangeEvent::new(ChangeKind::Update, "categories"));
        assert_eq!(n, 2);

        let event = categories.next_event().await.unwrap();
        assert_eq!(event.kind, ChangeKind::Update);

        // The insert-only subscription skips the update and sees the insert.
        client.emit(ChangeEvent::new(ChangeKind::Insert, "categories"));
        let event = inserts_only.next_event().await.unwrap();
        assert_eq!(event.kind, ChangeKind::Insert);
    }

    #[tokio::test]
    async fn other_tables_are_filtered_out() {
        let client = RealtimeClient::detached();
        let mut sub = client
            .channel("category-changes")
            .on_table_changes("categories", EventFilter::All)
            .subscribe();

        client.emit(ChangeEvent::new(ChangeKind::Insert, "posts"));
        client.emit(ChangeEvent::new(ChangeKind::Delete, "categories"));

        let event = sub.next_event().await.unwrap();
        assert_eq!(event.table, "categories");
        assert_eq!(event.kind, ChangeKind::Delete);
    }

    #[tokio::test]
    async fn close_is_idempotent_and_tracked() {
        let client = RealtimeClient::detached();
        let mut sub = client
            .channel("category-changes")
            .on_table_changes("categories", EventFilter::All)
            .subscribe();
        assert_eq!(client.open_subscriptions(), 1);

        sub.close();
        assert_eq!(client.open_subscriptions(), 0);
        sub.close();
        assert_eq!(client.open_subscriptions(), 0);

        assert!(sub.next_event().await.is_none());
        drop(sub);
        assert_eq!(client.open_subscriptions(), 0);
    }

    #[tokio::test]
    async fn closer_unblocks_pending_receive() {
        let client = RealtimeClient::detached();
        let mut sub = client
            .channel("category-changes")
            .on_table_changes("categories", EventFilter::All)
            .subscribe();
        let closer = sub.closer();

        let task = tokio::spawn(async move { sub.next_event().await });
        tokio::task::yield_now().await;
        closer.close();

        let received = task.await.unwrap();
        assert!(received.is_none());
        assert_eq!(client.open_subscriptions(), 0);
    }

    #[tokio::test]
    async fn close_wakes_a_receiver_that_registers_afterwards() {
        // The consumer can check the closed flag, lose the race to a
        // concurrent close, and only then register its waiter. The close
        // signal must survive as a permit until that registration.
        let state = SubscriptionState {
            closed: AtomicBool::new(false),
            notify: Notify::new(),
        };
        let open = AtomicUsize::new(1);

        close_shared("category-changes", &state, &open);
        assert_eq!(open.load(Ordering::SeqCst), 0);

        tokio::time::timeout(std::time::Duration::from_secs(1), state.notify.notified())
            .await
            .expect("close permit was lost");
        assert!(state.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn drop_closes_subscription() {
        let client = RealtimeClient::detached();
        let sub = client
            .channel("category-changes")
            .on_table_changes("categories", EventFilter::All)
            .subscribe();
        assert_eq!(client.open_subscriptions(), 1);
        drop(sub);
        assert_eq!(client.open_subscriptions(), 0);
    }
}
