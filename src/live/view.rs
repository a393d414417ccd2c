//! Live Collection View
//!
//! Keeps an ordered rendering of one collection in sync with the record
//! store. Every notification carries the complete result set; the view
//! replaces its mirror, renders from scratch and then notifies listeners.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::mirror::{lock, read, write, LocalMirror};
use crate::store::{Query, QuerySnapshot, RecordStore, SnapshotStream, StoreResult};

/// Turns a view's entities into markup
pub trait ViewRenderer<T>: Send + Sync {
    /// Markup for a non-empty result set
    fn render(&self, items: &[T]) -> String;

    /// Markup shown instead of an empty list
    fn placeholder(&self) -> String;
}

/// What listeners see after each re-render
pub struct ViewUpdate<'a, T> {
    pub view: &'a str,
    pub items: &'a [T],
    pub markup: &'a str,
}

/// Callback run synchronously after every re-render
pub type ViewListener<T> = Arc<dyn Fn(&ViewUpdate<'_, T>) + Send + Sync>;

/// Health of a view's subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum ViewStatus {
    /// Waiting for the first snapshot, or for the store to reconnect
    Connecting,
    Live,
    /// Terminal; the view stops updating
    Failed(String),
    /// Torn down on purpose
    Closed,
}

struct ViewState<T> {
    name: String,
    renderer: Arc<dyn ViewRenderer<T>>,
    listeners: RwLock<Vec<ViewListener<T>>>,
    mirror: RwLock<LocalMirror<T>>,
    markup: RwLock<String>,
    status: RwLock<ViewStatus>,
    generation: watch::Sender<u64>,
    /// Serializes snapshot application with on-demand refreshes
    rendering: Mutex<()>,
}

/// Handle to a running view. Cheap to clone.
pub struct LiveCollectionView<T> {
    state: Arc<ViewState<T>>,
}

impl<T> Clone for LiveCollectionView<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> LiveCollectionView<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Subscribe to `query` and start keeping the view in sync.
    ///
    /// The returned [`Subscription`] owns the background task; dropping or
    /// cancelling it tears the view down.
    pub async fn start(
        name: impl Into<String>,
        store: Arc<dyn RecordStore>,
        query: Query,
        renderer: Arc<dyn ViewRenderer<T>>,
        listeners: Vec<ViewListener<T>>,
    ) -> StoreResult<(Self, Subscription)> {
        let name = name.into();
        let stream = store.subscribe(query.clone()).await?;
        let (generation, _) = watch::channel(0);

        let state = Arc::new(ViewState {
            name: name.clone(),
            markup: RwLock::new(renderer.placeholder()),
            renderer,
            listeners: RwLock::new(listeners),
            mirror: RwLock::new(LocalMirror::new()),
            status: RwLock::new(ViewStatus::Connecting),
            generation,
            rendering: Mutex::new(()),
        });

        let task = tokio::spawn(run(Arc::clone(&state), stream));
        tracing::info!(view = %name, collection = %query.collection, "Live view started");

        let teardown_state = Arc::clone(&state);
        let subscription = Subscription {
            name,
            task: Some(task),
            teardown: Some(Box::new(move || {
                write(&teardown_state.mirror).clear();
                write(&teardown_state.listeners).clear();
                set_status(&teardown_state, ViewStatus::Closed);
            })),
        };

        Ok((Self { state }, subscription))
    }
}

impl<T: Clone> LiveCollectionView<T> {
    pub fn name(&self) -> &str {
        &self.state.name
    }

    /// Copy of the current mirror, in query order
    pub fn items(&self) -> Vec<T> {
        read(&self.state.mirror).to_vec()
    }

    pub fn len(&self) -> usize {
        read(&self.state.mirror).len()
    }

    pub fn is_empty(&self) -> bool {
        read(&self.state.mirror).is_empty()
    }

    /// Find an item in the mirror
    pub fn find(&self, predicate: impl Fn(&T) -> bool) -> Option<T> {
        read(&self.state.mirror)
            .items()
            .iter()
            .find(|item| predicate(item))
            .cloned()
    }

    /// Run `listener` after every subsequent re-render
    pub fn add_listener(&self, listener: ViewListener<T>) {
        write(&self.state.listeners).push(listener);
    }

    /// Re-render the current mirror and notify listeners.
    ///
    /// For renderers that read other views: call when their inputs change.
    /// Does nothing before the first snapshot or after teardown, and does
    /// not count as a snapshot for [`generation`](Self::generation).
    pub fn refresh(&self) {
        if self.generation() == 0 || self.status() == ViewStatus::Closed {
            return;
        }
        let _rendering = lock(&self.state.rendering);
        let items = read(&self.state.mirror).to_vec();
        publish(&self.state, &items);
        tracing::debug!(view = %self.state.name, items = items.len(), "View refreshed");
    }

    /// Latest rendered markup
    pub fn markup(&self) -> String {
        read(&self.state.markup).clone()
    }

    pub fn status(&self) -> ViewStatus {
        read(&self.state.status).clone()
    }

    /// Number of snapshots applied so far
    pub fn generation(&self) -> u64 {
        *self.state.generation.borrow()
    }

    /// Wait until at least `target` snapshots have been applied.
    ///
    /// Returns early if the view stops before reaching it.
    pub async fn wait_for_generation(&self, target: u64) {
        let mut rx = self.state.generation.subscribe();
        loop {
            if *rx.borrow_and_update() >= target {
                return;
            }
            if matches!(self.status(), ViewStatus::Failed(_) | ViewStatus::Closed) {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

fn set_status<T>(state: &ViewState<T>, status: ViewStatus) {
    *write(&state.status) = status;
    // Wake waiters so they can observe terminal states
    state.generation.send_modify(|_| {});
}

async fn run<T>(state: Arc<ViewState<T>>, mut stream: SnapshotStream)
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    while let Some(next) = stream.next().await {
        match next {
            Ok(snapshot) => apply(&state, snapshot),
            Err(e) if e.is_transient() => {
                tracing::warn!(view = %state.name, error = %e, "Subscription interrupted, waiting for store to recover");
                set_status(&state, ViewStatus::Connecting);
            }
            Err(e) => {
                tracing::error!(view = %state.name, error = %e, "Subscription failed");
                set_status(&state, ViewStatus::Failed(e.to_string()));
                return;
            }
        }
    }

    tracing::error!(view = %state.name, "Subscription closed by store");
    set_status(&state, ViewStatus::Failed("subscription closed".to_string()));
}

fn apply<T>(state: &ViewState<T>, snapshot: QuerySnapshot)
where
    T: DeserializeOwned + Clone,
{
    let _rendering = lock(&state.rendering);
    let mut items = Vec::with_capacity(snapshot.len());
    for record in &snapshot.records {
        match record.decode::<T>() {
            Ok(item) => items.push(item),
            Err(e) => {
                tracing::warn!(view = %state.name, record_id = %record.id, error = %e, "Skipping malformed record");
            }
        }
    }

    write(&state.mirror).replace(items.clone());
    *write(&state.status) = ViewStatus::Live;
    publish(state, &items);

    state.generation.send_modify(|g| *g += 1);
    tracing::debug!(view = %state.name, items = items.len(), "View re-rendered");
}

/// Render `items`, store the markup and run the listeners
fn publish<T>(state: &ViewState<T>, items: &[T]) {
    let markup = if items.is_empty() {
        state.renderer.placeholder()
    } else {
        state.renderer.render(items)
    };
    *write(&state.markup) = markup.clone();

    let listeners = read(&state.listeners).clone();
    let update = ViewUpdate {
        view: &state.name,
        items,
        markup: &markup,
    };
    for listener in &listeners {
        listener(&update);
    }
}

/// Owns a view's background task
///
/// Cancelling (or dropping) stops the task, clears the mirror and marks the
/// view closed.
pub struct Subscription {
    name: String,
    task: Option<JoinHandle<()>>,
    teardown: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }

    pub fn cancel(mut self) {
        self.dispose();
    }

    fn dispose(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!(view = %self.name, "Subscription cancelled");
        }
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{
        Collection, Direction, MemoryRecordStore, StoreError,
    };
    use serde::Deserialize;
    use serde_json::{json, Map, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Row {
        id: String,
        rank: i64,
    }

    struct RowRenderer;

    impl ViewRenderer<Row> for RowRenderer {
        fn render(&self, items: &[Row]) -> String {
            items.iter().map(|r| format!("<li>{}</li>", r.id)).collect()
        }

        fn placeholder(&self) -> String {
            "<p>empty</p>".to_string()
        }
    }

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn ranked() -> Query {
        Query::collection(Collection::Investors).order_by("rank", Direction::Desc)
    }

    #[tokio::test]
    async fn test_mirror_tracks_every_snapshot() {
        let store = Arc::new(MemoryRecordStore::new());
        let (view, _sub) = LiveCollectionView::<Row>::start(
            "rows",
            store.clone(),
            ranked(),
            Arc::new(RowRenderer),
            Vec::new(),
        )
        .await
        .unwrap();

        view.wait_for_generation(1).await;
        assert!(view.is_empty());
        assert_eq!(view.markup(), "<p>empty</p>");
        assert_eq!(view.status(), ViewStatus::Live);

        store
            .set(Collection::Investors, "a", fields(json!({"rank": 1})))
            .await
            .unwrap();
        store
            .set(Collection::Investors, "b", fields(json!({"rank": 2})))
            .await
            .unwrap();
        view.wait_for_generation(3).await;

        let ids: Vec<_> = view.items().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(view.markup(), "<li>b</li><li>a</li>");

        store.delete(Collection::Investors, "b").await.unwrap();
        view.wait_for_generation(4).await;
        assert_eq!(view.items(), vec![Row { id: "a".to_string(), rank: 1 }]);
    }

    #[tokio::test]
    async fn test_listeners_run_after_each_render() {
        let store = Arc::new(MemoryRecordStore::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let listener: ViewListener<Row> = Arc::new(move |update| {
            assert_eq!(update.view, "rows");
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let (view, _sub) = LiveCollectionView::<Row>::start(
            "rows",
            store.clone(),
            ranked(),
            Arc::new(RowRenderer),
            vec![listener],
        )
        .await
        .unwrap();

        store
            .set(Collection::Investors, "a", fields(json!({"rank": 1})))
            .await
            .unwrap();
        view.wait_for_generation(2).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_malformed_records_are_skipped() {
        let store = Arc::new(MemoryRecordStore::new());
        store
            .set(Collection::Investors, "good", fields(json!({"rank": 1})))
            .await
            .unwrap();
        store
            .set(Collection::Investors, "bad", fields(json!({"rank": "high"})))
            .await
            .unwrap();

        let (view, _sub) = LiveCollectionView::<Row>::start(
            "rows",
            store,
            ranked(),
            Arc::new(RowRenderer),
            Vec::new(),
        )
        .await
        .unwrap();
        view.wait_for_generation(1).await;
        assert_eq!(view.len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_tears_down() {
        let store = Arc::new(MemoryRecordStore::new());
        store
            .set(Collection::Investors, "a", fields(json!({"rank": 1})))
            .await
            .unwrap();

        let (view, sub) = LiveCollectionView::<Row>::start(
            "rows",
            store.clone(),
            ranked(),
            Arc::new(RowRenderer),
            Vec::new(),
        )
        .await
        .unwrap();
        view.wait_for_generation(1).await;
        assert!(sub.is_active());

        sub.cancel();
        assert!(view.is_empty());
        assert_eq!(view.status(), ViewStatus::Closed);
    }

    /// Renders each row with a label it reads from outside the view
    struct LabelledRenderer {
        label: Arc<RwLock<String>>,
    }

    impl ViewRenderer<Row> for LabelledRenderer {
        fn render(&self, items: &[Row]) -> String {
            let label = self.label.read().unwrap();
            items.iter().map(|r| format!("<li>{} {}</li>", r.id, label)).collect()
        }

        fn placeholder(&self) -> String {
            "<p>empty</p>".to_string()
        }
    }

    #[tokio::test]
    async fn test_refresh_rerenders_current_mirror() {
        let store = Arc::new(MemoryRecordStore::new());
        store
            .set(Collection::Investors, "a", fields(json!({"rank": 1})))
            .await
            .unwrap();
        let label = Arc::new(RwLock::new("old".to_string()));
        let (view, _sub) = LiveCollectionView::<Row>::start(
            "rows",
            store,
            ranked(),
            Arc::new(LabelledRenderer {
                label: Arc::clone(&label),
            }),
            Vec::new(),
        )
        .await
        .unwrap();
        view.wait_for_generation(1).await;
        assert_eq!(view.markup(), "<li>a old</li>");

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        view.add_listener(Arc::new(move |update: &ViewUpdate<'_, Row>| {
            sink.lock().unwrap().push(update.markup.to_string());
        }));

        *label.write().unwrap() = "new".to_string();
        view.refresh();
        assert_eq!(view.markup(), "<li>a new</li>");
        assert_eq!(*seen.lock().unwrap(), vec!["<li>a new</li>".to_string()]);
        assert_eq!(view.generation(), 1);
    }

    #[tokio::test]
    async fn test_refresh_is_noop_after_teardown() {
        let store = Arc::new(MemoryRecordStore::new());
        let (view, sub) = LiveCollectionView::<Row>::start(
            "rows",
            store,
            ranked(),
            Arc::new(RowRenderer),
            Vec::new(),
        )
        .await
        .unwrap();
        view.wait_for_generation(1).await;

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        view.add_listener(Arc::new(move |_: &ViewUpdate<'_, Row>| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        sub.cancel();
        view.refresh();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(view.status(), ViewStatus::Closed);
    }

    /// Store whose subscriptions are driven by the test
    struct ScriptedStore {
        stream: std::sync::Mutex<Option<SnapshotStream>>,
    }

    #[async_trait::async_trait]
    impl RecordStore for ScriptedStore {
        async fn subscribe(&self, _query: Query) -> StoreResult<SnapshotStream> {
            self.stream
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| StoreError::internal("already subscribed"))
        }

        async fn add(&self, _: Collection, _: Map<String, Value>) -> StoreResult<String> {
            unimplemented!()
        }

        async fn set(&self, _: Collection, _: &str, _: Map<String, Value>) -> StoreResult<()> {
            unimplemented!()
        }

        async fn get(&self, _: Collection, _: &str) -> StoreResult<Option<crate::store::Record>> {
            unimplemented!()
        }

        async fn delete(&self, _: Collection, _: &str) -> StoreResult<()> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn test_transient_errors_recover_and_terminal_errors_fail() {
        let (tx, stream): (mpsc::UnboundedSender<_>, _) = SnapshotStream::channel();
        let store = Arc::new(ScriptedStore {
            stream: std::sync::Mutex::new(Some(stream)),
        });

        let (view, _sub) = LiveCollectionView::<Row>::start(
            "rows",
            store,
            ranked(),
            Arc::new(RowRenderer),
            Vec::new(),
        )
        .await
        .unwrap();

        tx.send(Err(StoreError::unavailable("reconnecting"))).unwrap();
        tx.send(Ok(QuerySnapshot::default())).unwrap();
        view.wait_for_generation(1).await;
        assert_eq!(view.status(), ViewStatus::Live);

        tx.send(Err(StoreError::internal("permission revoked"))).unwrap();
        view.wait_for_generation(2).await;
        assert!(matches!(view.status(), ViewStatus::Failed(_)));
    }
}
