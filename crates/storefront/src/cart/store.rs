//! Cart store.
//!
//! The canonical in-memory cart, kept in sync with a [`CartStorage`].
//!
//! A store starts out *hydrating*: the persisted cart is being loaded by a
//! background task and the in-memory list is provisionally empty. Mutations
//! are accepted in this phase but nothing is saved, so an empty provisional
//! list can never overwrite the persisted one. Once the load completes the
//! store becomes *ready* (exactly once), mutations made while hydrating are
//! replayed on top of the loaded items, and from then on every mutation
//! schedules a save.
//!
//! Saves run on the same background task. They are requested through a
//! `watch` channel which only ever holds the latest list, so a burst of
//! mutations results in the final state being persisted, never a stale one.
//!
//! [`CartHandle::try_add_to_cart`] refuses an item when the resulting list
//! would be too large for the backing store to keep.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use brightline_core::{LineItem, LineItemId};
use thiserror::Error;
use tokio::sync::watch;
use tracing::debug;

use super::storage::{CartStorage, LocalStore};

/// The cart could not be persisted with the item added.
#[derive(Debug, Clone, Copy, Error)]
#[error("cart is full: the item would not fit in cart storage")]
pub struct CartFullError;

/// Lifecycle phase of a cart store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Persisted items not loaded yet; saves are suppressed.
    Hydrating,
    /// Loaded; every mutation is persisted.
    Ready,
}

/// A structural mutation of the cart.
#[derive(Debug, Clone)]
enum CartOp {
    Add(LineItem),
    Remove(LineItemId),
    Clear,
}

impl CartOp {
    fn apply(self, items: &mut Vec<LineItem>) {
        match self {
            Self::Add(item) => add_item(items, item),
            Self::Remove(id) => items.retain(|item| item.id != id),
            Self::Clear => items.clear(),
        }
    }
}

/// Merge `item` into `items`.
///
/// An existing item for the same `(type, domain)` keeps its position and
/// fields and gains the new quantity; anything else is appended.
fn add_item(items: &mut Vec<LineItem>, item: LineItem) {
    if let Some(existing) = items.iter_mut().find(|existing| existing.same_purchase(&item)) {
        existing.quantity = existing.quantity.saturating_add(item.quantity.get());
    } else {
        items.push(item);
    }
}

/// A save request: the full list as of `revision`.
#[derive(Debug, Clone, Default)]
struct Snapshot {
    revision: u64,
    items: Vec<LineItem>,
}

#[derive(Debug)]
struct CartState {
    items: Vec<LineItem>,
    phase: Phase,
    /// Mutations applied while hydrating, replayed onto the loaded items.
    pending: Vec<CartOp>,
    /// Revision of the most recently scheduled save.
    revision: u64,
}

type CapacityCheck = Box<dyn Fn(&[LineItem]) -> bool + Send + Sync>;

struct CartStore {
    state: Mutex<CartState>,
    saves: watch::Sender<Snapshot>,
    phase: watch::Sender<Phase>,
    saved: watch::Sender<u64>,
    fits: CapacityCheck,
}

impl fmt::Debug for CartStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartStore")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl CartStore {
    fn state(&self) -> MutexGuard<'_, CartState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn schedule_save(&self, state: &mut CartState) {
        state.revision += 1;
        self.saves.send_replace(Snapshot {
            revision: state.revision,
            items: state.items.clone(),
        });
    }

    fn mutate(&self, op: CartOp) {
        let mut state = self.state();
        self.apply(&mut state, op);
    }

    /// Apply `op` only if the resulting list can be persisted.
    ///
    /// While hydrating the check runs against the provisional list.
    fn try_mutate(&self, op: CartOp) -> Result<(), CartFullError> {
        let mut state = self.state();
        let mut next = state.items.clone();
        op.clone().apply(&mut next);
        if !(self.fits)(&next) {
            return Err(CartFullError);
        }

        self.apply(&mut state, op);
        Ok(())
    }

    fn apply(&self, state: &mut CartState, op: CartOp) {
        match state.phase {
            Phase::Hydrating => {
                state.pending.push(op.clone());
                op.apply(&mut state.items);
            }
            Phase::Ready => {
                op.apply(&mut state.items);
                self.schedule_save(state);
            }
        }
    }

    fn hydrate(&self, loaded: Vec<LineItem>) {
        let mut state = self.state();
        if state.phase == Phase::Ready {
            return;
        }

        let replay = std::mem::take(&mut state.pending);
        let replayed = replay.len();
        state.items = loaded;
        for op in replay {
            op.apply(&mut state.items);
        }
        state.phase = Phase::Ready;

        if replayed > 0 {
            self.schedule_save(&mut state);
        }
        debug!(items = state.items.len(), replayed, "Cart hydrated");
        drop(state);

        self.phase.send_replace(Phase::Ready);
    }
}

/// Shared handle to a cart store.
///
/// Cheap to clone; all clones see the same cart. Mutations and reads are
/// synchronous, persistence happens in the background.
#[derive(Debug, Clone)]
pub struct CartHandle {
    inner: Arc<CartStore>,
}

impl CartHandle {
    /// Create a cart store over `storage` and start hydrating it.
    ///
    /// Spawns the store's persistence task, so this must be called from
    /// within a tokio runtime. The task ends once every handle is dropped and
    /// the last requested save has been written.
    #[must_use]
    pub fn mount<S: LocalStore>(storage: CartStorage<S>) -> Self {
        let storage = Arc::new(storage);
        let capacity = Arc::clone(&storage);
        let (saves, save_requests) = watch::channel(Snapshot::default());
        let inner = Arc::new(CartStore {
            state: Mutex::new(CartState {
                items: Vec::new(),
                phase: Phase::Hydrating,
                pending: Vec::new(),
                revision: 0,
            }),
            saves,
            phase: watch::Sender::new(Phase::Hydrating),
            saved: watch::Sender::new(0),
            fits: Box::new(move |items: &[LineItem]| capacity.can_store(items)),
        });

        tokio::spawn(persist(storage, Arc::downgrade(&inner), save_requests));

        Self { inner }
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.inner.state().phase
    }

    /// Whether the persisted cart has been loaded.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.phase() == Phase::Ready
    }

    /// Wait until the persisted cart has been loaded.
    pub async fn ready(&self) {
        let mut phase = self.inner.phase.subscribe();
        // The sender lives in `self.inner`, so the channel cannot close here
        let _ = phase.wait_for(|phase| *phase == Phase::Ready).await;
    }

    /// Wait until the cart is loaded and every scheduled save has been
    /// written.
    pub async fn flush(&self) {
        self.ready().await;
        let target = self.inner.state().revision;
        let mut saved = self.inner.saved.subscribe();
        let _ = saved.wait_for(|saved| *saved >= target).await;
    }

    /// Snapshot of the items, in cart order.
    #[must_use]
    pub fn items(&self) -> Vec<LineItem> {
        self.inner.state().items.clone()
    }

    /// Number of distinct line items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.state().items.len()
    }

    /// Whether the cart has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.state().items.is_empty()
    }

    /// Add an item, merging it into an existing item for the same
    /// `(type, domain)` pair.
    pub fn add_to_cart(&self, item: LineItem) {
        self.inner.mutate(CartOp::Add(item));
    }

    /// Add an item like [`add_to_cart`](Self::add_to_cart), unless the
    /// resulting cart could not be persisted.
    ///
    /// # Errors
    ///
    /// Returns [`CartFullError`] and leaves the cart unchanged when the
    /// backing store would reject the new list.
    pub fn try_add_to_cart(&self, item: LineItem) -> Result<(), CartFullError> {
        self.inner.try_mutate(CartOp::Add(item))
    }

    /// Remove the item with `id`. Does nothing if there is none.
    pub fn remove_from_cart(&self, id: &LineItemId) {
        self.inner.mutate(CartOp::Remove(id.clone()));
    }

    /// Remove every item.
    pub fn clear_cart(&self) {
        self.inner.mutate(CartOp::Clear);
    }

    /// Sum of `price * quantity` over all items.
    #[must_use]
    pub fn total_price(&self) -> f64 {
        self.inner.state().items.iter().map(LineItem::line_total).sum()
    }

    /// Sum of quantities over all items.
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.inner
            .state()
            .items
            .iter()
            .map(|item| u64::from(item.quantity.get()))
            .sum()
    }
}

/// Persistence task: load, hydrate, then write every requested save.
async fn persist<S: LocalStore>(
    storage: Arc<CartStorage<S>>,
    cart: Weak<CartStore>,
    mut save_requests: watch::Receiver<Snapshot>,
) {
    let loaded = storage.load().await;
    match cart.upgrade() {
        Some(store) => store.hydrate(loaded),
        None => return,
    }

    while save_requests.changed().await.is_ok() {
        let snapshot = save_requests.borrow_and_update().clone();
        storage.save(&snapshot.items).await;

        if let Some(store) = cart.upgrade() {
            store.saved.send_replace(snapshot.revision);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::future::Future;
    use std::num::NonZeroU32;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::Notify;

    use super::*;
    use crate::cart::storage::{CART_STORAGE_KEY, StoreError};
    use crate::cart::stores::MemoryStore;

    fn item(kind: &str, domain: &str, price: f64, quantity: u32) -> LineItem {
        LineItem::new(
            kind,
            domain,
            price,
            NonZeroU32::new(quantity).unwrap(),
            "owner@shop.example",
        )
        .unwrap()
    }

    async fn ready_cart(store: &MemoryStore) -> CartHandle {
        let cart = CartHandle::mount(CartStorage::new(store.clone()));
        cart.ready().await;
        cart
    }

    fn persisted(store: &MemoryStore) -> Vec<LineItem> {
        serde_json::from_str(&store.get(CART_STORAGE_KEY).unwrap()).unwrap()
    }

    /// A store whose first read blocks until released, and which counts writes.
    #[derive(Clone, Default)]
    struct GatedStore {
        memory: MemoryStore,
        gate: Arc<Notify>,
        writes: Arc<AtomicUsize>,
    }

    impl LocalStore for GatedStore {
        fn get_item(
            &self,
            key: &str,
        ) -> impl Future<Output = Result<Option<String>, StoreError>> + Send {
            let this = self.clone();
            let key = key.to_owned();
            async move {
                this.gate.notified().await;
                this.memory.get_item(&key).await
            }
        }

        async fn set_item(&self, key: &str, value: String) -> Result<(), StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.memory.set_item(key, value).await
        }
    }

    /// A memory store that only keeps values up to `limit` bytes.
    #[derive(Clone)]
    struct LimitedStore {
        memory: MemoryStore,
        limit: usize,
    }

    impl LocalStore for LimitedStore {
        async fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.memory.get_item(key).await
        }

        async fn set_item(&self, key: &str, value: String) -> Result<(), StoreError> {
            if !self.fits(key, &value) {
                return Err(StoreError::TooLarge {
                    size: value.len(),
                    max: self.limit,
                });
            }
            self.memory.set_item(key, value).await
        }

        fn fits(&self, _key: &str, value: &str) -> bool {
            value.len() <= self.limit
        }
    }

    #[tokio::test]
    async fn test_try_add_refuses_items_the_store_cannot_keep() {
        let first = item("starter", "a.example", 1.0, 1);
        let limit = serde_json::to_string(&vec![first.clone()]).unwrap().len() + 10;
        let store = LimitedStore {
            memory: MemoryStore::new(),
            limit,
        };
        let cart = CartHandle::mount(CartStorage::new(store.clone()));
        cart.ready().await;

        cart.try_add_to_cart(first).unwrap();
        // A merge only grows the quantity, so it still fits
        cart.try_add_to_cart(item("starter", "a.example", 1.0, 2)).unwrap();
        assert!(cart.try_add_to_cart(item("pro", "b.example", 1.0, 1)).is_err());
        cart.flush().await;

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.items()[0].quantity.get(), 3);
        assert_eq!(persisted(&store.memory), cart.items());
    }

    #[tokio::test]
    async fn test_distinct_pairs_append_in_first_seen_order() {
        let cart = ready_cart(&MemoryStore::new()).await;
        cart.add_to_cart(item("starter", "a.example", 1.0, 1));
        cart.add_to_cart(item("starter", "b.example", 1.0, 1));
        cart.add_to_cart(item("pro", "a.example", 1.0, 1));
        cart.add_to_cart(item("starter", "a.example", 1.0, 1));

        let pairs: Vec<(String, String)> = cart
            .items()
            .into_iter()
            .map(|item| (item.kind, item.domain))
            .collect();
        assert_eq!(
            pairs,
            [
                ("starter".to_owned(), "a.example".to_owned()),
                ("starter".to_owned(), "b.example".to_owned()),
                ("pro".to_owned(), "a.example".to_owned()),
            ]
        );
    }

    #[tokio::test]
    async fn test_matching_pair_merges_quantity_in_place() {
        let cart = ready_cart(&MemoryStore::new()).await;
        let first = item("starter", "a.example", 10.0, 2);
        cart.add_to_cart(first.clone());
        cart.add_to_cart(item("pro", "b.example", 5.0, 1));

        let mut duplicate = item("starter", "a.example", 99.0, 3);
        duplicate.email = "someone-else@shop.example".to_owned();
        cart.add_to_cart(duplicate);

        let items = cart.items();
        assert_eq!(items.len(), 2);
        let merged = &items[0];
        assert_eq!(merged.id, first.id);
        assert_eq!(merged.quantity.get(), 5);
        assert!((merged.price - 10.0).abs() < f64::EPSILON);
        assert_eq!(merged.email, first.email);
        assert_eq!(merged.timestamp, first.timestamp);
    }

    #[tokio::test]
    async fn test_merge_saturates_quantity() {
        let cart = ready_cart(&MemoryStore::new()).await;
        cart.add_to_cart(item("starter", "a.example", 1.0, u32::MAX));
        cart.add_to_cart(item("starter", "a.example", 1.0, 10));

        assert_eq!(cart.items()[0].quantity.get(), u32::MAX);
    }

    #[tokio::test]
    async fn test_totals() {
        let cart = ready_cart(&MemoryStore::new()).await;
        assert!(cart.total_price().abs() < f64::EPSILON);
        assert_eq!(cart.total_items(), 0);

        cart.add_to_cart(item("starter", "a.example", 10.0, 2));
        cart.add_to_cart(item("pro", "b.example", 5.0, 3));

        assert!((cart.total_price() - 35.0).abs() < f64::EPSILON);
        assert_eq!(cart.total_items(), 5);
    }

    #[tokio::test]
    async fn test_remove_unknown_id_leaves_cart_unchanged() {
        let cart = ready_cart(&MemoryStore::new()).await;
        cart.add_to_cart(item("starter", "a.example", 10.0, 1));
        cart.add_to_cart(item("pro", "b.example", 5.0, 1));
        let before = cart.items();

        cart.remove_from_cart(&LineItemId::from("does-not-exist"));
        assert_eq!(cart.items(), before);
    }

    #[tokio::test]
    async fn test_remove_by_id() {
        let store = MemoryStore::new();
        let cart = ready_cart(&store).await;
        let keep = item("starter", "a.example", 10.0, 1);
        let drop_me = item("pro", "b.example", 5.0, 1);
        cart.add_to_cart(keep.clone());
        cart.add_to_cart(drop_me.clone());

        cart.remove_from_cart(&drop_me.id);
        cart.flush().await;

        assert_eq!(cart.items(), vec![keep.clone()]);
        assert_eq!(persisted(&store), vec![keep]);
    }

    #[tokio::test]
    async fn test_clear_persists_empty_list() {
        let store = MemoryStore::new();
        let cart = ready_cart(&store).await;
        cart.add_to_cart(item("starter", "a.example", 10.0, 1));
        cart.flush().await;
        assert_eq!(persisted(&store).len(), 1);

        cart.clear_cart();
        cart.flush().await;

        assert!(cart.is_empty());
        assert_eq!(store.get(CART_STORAGE_KEY).as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_hydrates_from_persisted_items() {
        let store = MemoryStore::new();
        let saved = vec![
            item("starter", "a.example", 10.0, 1),
            item("pro", "b.example", 5.0, 2),
        ];
        store.insert(CART_STORAGE_KEY, serde_json::to_string(&saved).unwrap());

        let cart = ready_cart(&store).await;
        assert_eq!(cart.items(), saved);
        assert_eq!(cart.phase(), Phase::Ready);
    }

    #[tokio::test]
    async fn test_malformed_persisted_cart_starts_empty() {
        let store = MemoryStore::new();
        store.insert(CART_STORAGE_KEY, "[{\"id\":");

        let cart = ready_cart(&store).await;
        assert!(cart.is_empty());
        assert!(cart.is_ready());
    }

    #[tokio::test]
    async fn test_no_save_while_hydrating_and_pending_ops_replay() {
        let gated = GatedStore::default();
        let persisted_item = item("starter", "a.example", 10.0, 1);
        gated.memory.insert(
            CART_STORAGE_KEY,
            serde_json::to_string(&vec![persisted_item.clone()]).unwrap(),
        );

        let cart = CartHandle::mount(CartStorage::new(gated.clone()));
        assert_eq!(cart.phase(), Phase::Hydrating);

        // Provisional mutations apply to the empty list and are not saved
        cart.add_to_cart(item("starter", "a.example", 10.0, 2));
        cart.add_to_cart(item("pro", "b.example", 5.0, 1));
        assert_eq!(cart.len(), 2);
        tokio::task::yield_now().await;
        assert_eq!(gated.writes.load(Ordering::SeqCst), 0);

        gated.gate.notify_one();
        cart.flush().await;

        let items = cart.items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, persisted_item.id);
        assert_eq!(items[0].quantity.get(), 3);
        assert_eq!(items[1].kind, "pro");
        assert_eq!(
            serde_json::to_string(&items).unwrap(),
            gated.memory.get(CART_STORAGE_KEY).unwrap()
        );
    }

    #[tokio::test]
    async fn test_hydration_without_pending_ops_does_not_save() {
        let store = MemoryStore::new();
        store.insert(CART_STORAGE_KEY, "not json");

        let cart = ready_cart(&store).await;
        cart.flush().await;

        // Malformed value left alone until the first real mutation
        assert_eq!(store.get(CART_STORAGE_KEY).as_deref(), Some("not json"));
    }

    #[tokio::test]
    async fn test_last_mutation_wins() {
        let store = MemoryStore::new();
        let cart = ready_cart(&store).await;

        for n in 0..50 {
            cart.add_to_cart(item("starter", &format!("site{n}.example"), 1.0, 1));
        }
        cart.remove_from_cart(&cart.items()[0].id.clone());
        cart.flush().await;

        let saved = persisted(&store);
        assert_eq!(saved.len(), 49);
        assert_eq!(saved, cart.items());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let cart = ready_cart(&MemoryStore::new()).await;
        let other = cart.clone();
        other.add_to_cart(item("starter", "a.example", 1.0, 1));
        assert_eq!(cart.len(), 1);
    }
}
