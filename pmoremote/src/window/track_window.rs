//! Sparse, bounded, index-addressable view over a remote list.
//!
//! The window never blocks: `get` answers from the cache immediately and
//! schedules at most one page fetch in the background. Every asynchronous
//! completion (count, page, debounce expiry, server push) is posted into an
//! internal channel and applied when the owner calls [`TrackWindow::pump`]
//! or [`TrackWindow::pump_pending`], so the window's state is only ever
//! mutated from the owner's task.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::debounce::Debouncer;
use crate::errors::Result;
use crate::observers::{ObserverSet, ObserverToken};
use crate::protocol::names::broadcast as pushed;
use crate::transport::{Transport, TransportEvent};

use super::WindowSettings;
use super::cache::PageCache;
use super::query::{Page, QuerySource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowEvent {
    /// A requery completed; `count` is 0 after any failure.
    Reloaded { count: usize },
    /// Rows `offset..offset + count` were written to the cache.
    MetadataLoaded { offset: usize, count: usize },
    /// Visible rows should be redrawn.
    AdapterChanged,
    /// One-shot scroll to the initial position.
    ScrollTo { index: usize },
}

enum Signal<T> {
    CountLoaded {
        generation: u64,
        result: Result<Option<usize>>,
    },
    PageLoaded {
        generation: u64,
        offset: usize,
        result: Result<Option<Page<T>>>,
    },
    AdapterChanged,
    Requery,
    QueueChanged,
    ConnectionChanged,
}

pub struct TrackWindow<T> {
    source: Arc<dyn QuerySource<T>>,
    transport: Arc<dyn Transport>,
    settings: WindowSettings,
    cache: PageCache<T>,
    count: usize,
    filter: String,

    /// Inclusive bounds of the page being fetched.
    in_flight: Option<(usize, usize)>,
    count_task: Option<JoinHandle<()>>,
    page_task: Option<JoinHandle<()>>,
    count_generation: u64,
    page_generation: u64,

    initial_position: Option<usize>,
    scrolling: bool,
    fast_scrolling: bool,

    forwarder: Option<JoinHandle<()>>,
    adapter_debounce: Debouncer<()>,
    requery_debounce: Debouncer<()>,

    signals_tx: mpsc::UnboundedSender<Signal<T>>,
    signals_rx: mpsc::UnboundedReceiver<Signal<T>>,
    observers: ObserverSet<WindowEvent>,
}

impl<T> std::fmt::Debug for TrackWindow<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackWindow")
            .field("source", &self.source)
            .field("count", &self.count)
            .field("filter", &self.filter)
            .field("cached", &self.cache.len())
            .field("in_flight", &self.in_flight)
            .finish()
    }
}

impl<T> TrackWindow<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(
        source: Arc<dyn QuerySource<T>>,
        transport: Arc<dyn Transport>,
        settings: WindowSettings,
    ) -> Self {
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();

        let adapter_tx = signals_tx.clone();
        let adapter_debounce = Debouncer::new(settings.adapter_debounce, move |_| {
            let _ = adapter_tx.send(Signal::AdapterChanged);
        });

        let requery_tx = signals_tx.clone();
        let requery_debounce = Debouncer::new(settings.requery_debounce, move |_| {
            let _ = requery_tx.send(Signal::Requery);
        });

        Self {
            source,
            transport,
            cache: PageCache::new(settings.cache_capacity),
            settings,
            count: 0,
            filter: String::new(),
            in_flight: None,
            count_task: None,
            page_task: None,
            count_generation: 0,
            page_generation: 0,
            initial_position: None,
            scrolling: false,
            fast_scrolling: false,
            forwarder: None,
            adapter_debounce,
            requery_debounce,
            signals_tx,
            signals_rx,
            observers: ObserverSet::new(),
        }
    }

    pub fn subscribe(&mut self) -> (ObserverToken, mpsc::UnboundedReceiver<WindowEvent>) {
        self.observers.subscribe()
    }

    pub fn unsubscribe(&mut self, token: ObserverToken) -> bool {
        self.observers.unsubscribe(token)
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn settings(&self) -> &WindowSettings {
        &self.settings
    }

    pub fn in_flight(&self) -> Option<(usize, usize)> {
        self.in_flight
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_scrolling(&self) -> bool {
        self.scrolling || self.fast_scrolling
    }

    /// Offline-capable sources work without a connection.
    pub fn is_usable(&self) -> bool {
        self.source.is_offline_capable() || self.transport.is_connected()
    }

    /// Best-effort, non-blocking read. A missing or stale row schedules a
    /// page fetch around `index`.
    pub fn get(&mut self, index: usize) -> Option<&T> {
        if index >= self.count {
            return None;
        }

        let fresh = matches!(self.cache.get(index), Some(entry) if !entry.dirty);
        if !fresh && !self.is_scrolling() {
            self.fetch_page_around(index);
        }

        self.cache.get(index).map(|entry| &entry.value)
    }

    pub fn fetch_page_around(&mut self, index: usize) {
        if !self.is_usable() || self.is_scrolling() {
            return;
        }
        if let Some((start, end)) = self.in_flight {
            if index >= start && index <= end {
                return;
            }
        }

        let offset = index.saturating_sub(self.settings.lookbehind);
        let limit = self.settings.window_size;

        self.cancel_page();
        self.in_flight = Some((offset, offset + limit));

        let generation = self.page_generation;
        let source = Arc::clone(&self.source);
        let transport = Arc::clone(&self.transport);
        let filter = self.filter.clone();
        let tx = self.signals_tx.clone();

        trace!(offset, limit, "Fetching page");
        self.page_task = Some(tokio::spawn(async move {
            let result = source.page(transport.as_ref(), offset, limit, &filter).await;
            let _ = tx.send(Signal::PageLoaded {
                generation,
                offset,
                result,
            });
        }));
    }

    pub fn requery(&mut self) {
        self.cancel_count();
        self.cancel_page();

        if !self.is_usable() {
            debug!("Track window not usable; reporting empty list");
            self.apply_count(0);
            self.observers.broadcast(WindowEvent::Reloaded { count: 0 });
            return;
        }

        let generation = self.count_generation;
        let source = Arc::clone(&self.source);
        let transport = Arc::clone(&self.transport);
        let filter = self.filter.clone();
        let tx = self.signals_tx.clone();

        debug!(filter = %self.filter, "Requerying track count");
        self.count_task = Some(tokio::spawn(async move {
            let result = source.count(transport.as_ref(), &filter).await;
            let _ = tx.send(Signal::CountLoaded { generation, result });
        }));
    }

    /// Stops the page fetch and marks every cached row stale. Values stay
    /// readable until replaced.
    pub fn invalidate(&mut self) {
        self.cancel_page();
        self.cache.mark_all_dirty();
    }

    /// Authoritative size setter; only a change has effect.
    pub fn set_count(&mut self, count: usize) {
        if count != self.count {
            self.apply_count(count);
        }
    }

    pub fn set_initial_position(&mut self, index: usize) {
        self.initial_position = Some(index);
    }

    pub fn set_window_size(&mut self, window_size: usize) {
        self.settings.window_size = window_size.max(1);
    }

    /// Debounced: a burst of edits results in a single requery.
    pub fn set_filter(&mut self, filter: impl Into<String>) {
        let filter = filter.into();
        if filter != self.filter {
            self.filter = filter;
            self.requery_debounce.call();
        }
    }

    pub fn set_query_source(&mut self, source: Arc<dyn QuerySource<T>>) {
        self.source = source;
        self.cache.clear();
        self.requery();
    }

    pub fn set_scrolling(&mut self, scrolling: bool) {
        let stopped = self.scrolling && !scrolling;
        self.scrolling = scrolling;
        if stopped {
            self.adapter_debounce.call();
        }
    }

    pub fn set_fast_scrolling(&mut self, fast_scrolling: bool) {
        let stopped = self.fast_scrolling && !fast_scrolling;
        self.fast_scrolling = fast_scrolling;
        if stopped {
            self.requery();
        }
    }

    /// Detaches from server pushes and abandons every pending operation.
    /// A count in flight is reported as `Reloaded { count: 0 }`.
    pub fn pause(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }

        let count_pending = self.count_task.is_some();
        self.cancel_count();
        self.cancel_page();
        self.adapter_debounce.cancel();
        self.requery_debounce.cancel();

        if count_pending {
            self.apply_count(0);
            self.observers.broadcast(WindowEvent::Reloaded { count: 0 });
        }
    }

    /// Subscribes to queue changes (each triggers a requery) and connection
    /// flips (each triggers a debounced requery).
    pub fn resume(&mut self) {
        self.scrolling = false;
        self.fast_scrolling = false;

        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }

        let mut events = self.transport.subscribe();
        let tx = self.signals_tx.clone();
        self.forwarder = Some(tokio::spawn(async move {
            loop {
                let signal = match events.recv().await {
                    Ok(TransportEvent::Message(message)) if message.is(pushed::PLAY_QUEUE_CHANGED) => {
                        Signal::QueueChanged
                    }
                    Ok(TransportEvent::Message(_)) => continue,
                    Ok(TransportEvent::StateChanged { .. }) => Signal::ConnectionChanged,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Track window lagged behind transport events");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                if tx.send(signal).is_err() {
                    break;
                }
            }
        }));
    }

    /// Waits for the next asynchronous completion and applies it.
    pub async fn pump(&mut self) {
        if let Some(signal) = self.signals_rx.recv().await {
            self.apply(signal);
        }
    }

    /// Applies every completion already queued; returns how many there were.
    pub fn pump_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(signal) = self.signals_rx.try_recv() {
            self.apply(signal);
            applied += 1;
        }
        applied
    }

    fn apply(&mut self, signal: Signal<T>) {
        match signal {
            Signal::CountLoaded { generation, result } => {
                if generation != self.count_generation {
                    trace!(generation, "Discarding stale count");
                    return;
                }
                self.count_task = None;
                self.on_count(result);
            }
            Signal::PageLoaded {
                generation,
                offset,
                result,
            } => {
                if generation != self.page_generation {
                    trace!(generation, offset, "Discarding stale page");
                    return;
                }
                self.page_task = None;
                self.in_flight = None;
                self.on_page(offset, result);
            }
            Signal::AdapterChanged => self.observers.broadcast(WindowEvent::AdapterChanged),
            Signal::Requery | Signal::QueueChanged => self.requery(),
            Signal::ConnectionChanged => self.requery_debounce.call(),
        }
    }

    fn on_count(&mut self, result: Result<Option<usize>>) {
        let loaded = match result {
            Ok(Some(count)) => Some(count),
            Ok(None) => {
                debug!("No count query available");
                None
            }
            Err(err) if err.is_cancellation() => None,
            Err(err) => {
                warn!("Track count failed: {err}");
                None
            }
        };
        let count = loaded.unwrap_or(0);

        self.apply_count(count);

        if loaded.is_some() {
            if let Some(index) = self.initial_position.take() {
                self.observers.broadcast(WindowEvent::ScrollTo { index });
            }
        }
        self.observers.broadcast(WindowEvent::Reloaded { count });
    }

    fn on_page(&mut self, offset: usize, result: Result<Option<Page<T>>>) {
        match result {
            Ok(Some(rows)) => {
                let loaded = rows.len();
                for (i, row) in rows.into_iter().enumerate() {
                    match row {
                        Some(row) => self.cache.insert(offset + i, row),
                        None => trace!(index = offset + i, "Row left uncached"),
                    }
                }
                self.adapter_debounce.call();
                self.observers.broadcast(WindowEvent::MetadataLoaded {
                    offset,
                    count: loaded,
                });
            }
            Ok(None) => trace!(offset, "No page query available"),
            Err(err) => debug!(offset, "Page fetch dropped: {err}"),
        }
    }

    fn apply_count(&mut self, count: usize) {
        self.count = count;
        self.invalidate();
        self.in_flight = None;
        self.adapter_debounce.call();
        self.observers
            .broadcast(WindowEvent::MetadataLoaded { offset: 0, count: 0 });
    }

    fn cancel_count(&mut self) {
        if let Some(task) = self.count_task.take() {
            task.abort();
        }
        self.count_generation += 1;
    }

    fn cancel_page(&mut self) {
        if let Some(task) = self.page_task.take() {
            task.abort();
        }
        self.page_generation += 1;
        self.in_flight = None;
    }
}

impl<T> Drop for TrackWindow<T> {
    fn drop(&mut self) {
        for task in [
            self.count_task.take(),
            self.page_task.take(),
            self.forwarder.take(),
        ]
        .into_iter()
        .flatten()
        {
            task.abort();
        }
    }
}
