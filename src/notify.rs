//! Change-notification framework
//!
//! Every stateful control mutates its fields inside a [`Transaction`] and
//! delivers the resulting [`ChangeSet`] to registered listeners. A field
//! only appears in the delivered set when its final value differs from its
//! value at transaction start, so same-value writes never notify.

use std::cell::RefCell;
use std::rc::Rc;

/// A typed change record for one field of a control.
///
/// Each control defines its own enum of `(field, new value)` variants and
/// implements this trait on it. The `name` identifies the field within its
/// control and is what makes repeated assignments to the same field collapse
/// into one entry.
pub trait Field: Clone + PartialEq {
    /// Stable name of the field this change belongs to.
    fn name(&self) -> &'static str;
}

/// Immutable snapshot of the fields that changed in one transaction.
#[derive(Debug, Clone)]
pub struct ChangeSet<F: Field> {
    changes: Vec<F>,
}

impl<F: Field> ChangeSet<F> {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, F> {
        self.changes.iter()
    }

    /// Look up the change recorded for a field, if any.
    pub fn field(&self, name: &'static str) -> Option<&F> {
        self.changes.iter().find(|c| c.name() == name)
    }

    pub fn contains(&self, name: &'static str) -> bool {
        self.field(name).is_some()
    }
}

impl<'a, F: Field> IntoIterator for &'a ChangeSet<F> {
    type Item = &'a F;
    type IntoIter = std::slice::Iter<'a, F>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

/// One entry per touched field: the value at transaction start and the
/// latest assigned value.
struct TxEntry<F> {
    name: &'static str,
    start: F,
    latest: F,
}

/// A scoped diff-and-notify transaction.
///
/// ```ignore
/// let mut tx = Transaction::begin();
/// {
///     let mut st = inner.state.borrow_mut();
///     tx.assign(&mut st.pressed, pressed, ButtonField::Pressed);
/// }
/// inner.listeners.notify(&tx.commit());
/// ```
pub struct Transaction<F: Field> {
    entries: Vec<TxEntry<F>>,
}

impl<F: Field> Transaction<F> {
    pub fn begin() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Store `new` into `slot`, recording the change for notification when
    /// the value actually differs. Assigning a field back to its value at
    /// transaction start removes it from the pending set again.
    pub fn assign<T, W>(&mut self, slot: &mut T, new: T, wrap: W)
    where
        T: Clone + PartialEq,
        W: Fn(T) -> F,
    {
        let latest = wrap(new.clone());
        let name = latest.name();
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => entry.latest = latest,
            None => self.entries.push(TxEntry {
                name,
                start: wrap(slot.clone()),
                latest,
            }),
        }
        *slot = new;
    }

    /// Close the transaction, keeping exactly the fields whose final value
    /// differs from their value at transaction start.
    pub fn commit(self) -> ChangeSet<F> {
        ChangeSet {
            changes: self
                .entries
                .into_iter()
                .filter(|e| e.start != e.latest)
                .map(|e| e.latest)
                .collect(),
        }
    }
}

/// Listener callback invoked with the committed change set.
pub type Listener<F> = Rc<dyn Fn(&ChangeSet<F>)>;

/// Ordered listener list for one control.
///
/// Registration order is preserved and duplicates are allowed. Delivery is
/// synchronous and skipped entirely for empty sets. The internal borrow is
/// released before any callback runs, so listeners are free to mutate the
/// control they are observing.
pub struct Listeners<F: Field> {
    inner: RefCell<Vec<Listener<F>>>,
}

impl<F: Field> Listeners<F> {
    pub fn new() -> Self {
        Self {
            inner: RefCell::new(Vec::new()),
        }
    }

    pub fn register(&self, listener: impl Fn(&ChangeSet<F>) + 'static) {
        self.inner.borrow_mut().push(Rc::new(listener));
    }

    pub fn notify(&self, set: &ChangeSet<F>) {
        if set.is_empty() {
            return;
        }
        let listeners: Vec<Listener<F>> = self.inner.borrow().clone();
        for listener in listeners {
            listener(set);
        }
    }
}

impl<F: Field> Default for Listeners<F> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cell::Cell;

    #[derive(Debug, Clone, PartialEq)]
    enum TestField {
        A(i32),
        B(bool),
        C(f32),
    }

    impl Field for TestField {
        fn name(&self) -> &'static str {
            match self {
                TestField::A(_) => "a",
                TestField::B(_) => "b",
                TestField::C(_) => "c",
            }
        }
    }

    #[test]
    fn unchanged_assignment_is_not_recorded() {
        let mut a = 3;
        let mut tx = Transaction::begin();
        tx.assign(&mut a, 3, TestField::A);
        assert!(tx.commit().is_empty());
        assert_eq!(a, 3);
    }

    #[test]
    fn changed_assignment_is_recorded_and_applied() {
        let mut a = 3;
        let mut b = false;
        let mut tx = Transaction::begin();
        tx.assign(&mut a, 7, TestField::A);
        tx.assign(&mut b, false, TestField::B);
        let set = tx.commit();
        assert_eq!(set.len(), 1);
        assert_eq!(set.field("a"), Some(&TestField::A(7)));
        assert!(!set.contains("b"));
        assert_eq!(a, 7);
    }

    #[test]
    fn reverting_within_one_transaction_cancels_the_change() {
        let mut a = 3;
        let mut tx = Transaction::begin();
        tx.assign(&mut a, 9, TestField::A);
        tx.assign(&mut a, 3, TestField::A);
        assert!(tx.commit().is_empty());
        assert_eq!(a, 3);
    }

    #[test]
    fn listeners_run_in_registration_order_without_dedup() {
        let listeners: Listeners<TestField> = Listeners::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for tag in [1, 2, 1] {
            let order = order.clone();
            listeners.register(move |_| order.borrow_mut().push(tag));
        }

        let mut a = 0;
        let mut tx = Transaction::begin();
        tx.assign(&mut a, 1, TestField::A);
        listeners.notify(&tx.commit());

        assert_eq!(*order.borrow(), vec![1, 2, 1]);
    }

    #[test]
    fn empty_set_is_not_delivered() {
        let listeners: Listeners<TestField> = Listeners::new();
        let fired = Rc::new(Cell::new(false));
        {
            let fired = fired.clone();
            listeners.register(move |_| fired.set(true));
        }
        listeners.notify(&Transaction::begin().commit());
        assert!(!fired.get());
    }

    #[test]
    fn listener_may_register_another_listener_while_notified() {
        let listeners: Rc<Listeners<TestField>> = Rc::new(Listeners::new());
        let count = Rc::new(Cell::new(0));
        {
            let listeners = listeners.clone();
            let count = count.clone();
            listeners.clone().register(move |_| {
                count.set(count.get() + 1);
                let count = count.clone();
                listeners.register(move |_| count.set(count.get() + 1));
            });
        }

        let mut a = 0;
        let mut tx = Transaction::begin();
        tx.assign(&mut a, 1, TestField::A);
        listeners.notify(&tx.commit());
        // Only the listener registered at delivery time ran.
        assert_eq!(count.get(), 1);
    }

    proptest! {
        /// The delivered set contains exactly the fields whose final value
        /// differs from its value at transaction start.
        #[test]
        fn changeset_is_the_diff_against_transaction_start(
            ops in prop::collection::vec((0..3usize, -5..5i32), 0..24)
        ) {
            let start = [0i32, 1, 2];
            let mut fields = start;
            let wrap = |idx: usize| match idx {
                0 => TestField::A as fn(i32) -> TestField,
                1 => (|v| TestField::B(v != 0)) as fn(i32) -> TestField,
                _ => (|v| TestField::C(v as f32)) as fn(i32) -> TestField,
            };
            // Model: bool/float fields coerce through the same i32 input.
            let mut tx = Transaction::begin();
            for &(idx, val) in &ops {
                let mut slot = fields[idx];
                tx.assign(&mut slot, val, wrap(idx));
                fields[idx] = slot;
            }
            let set = tx.commit();

            for (idx, name) in ["a", "b", "c"].into_iter().enumerate() {
                let expect_changed = match idx {
                    1 => (fields[idx] != 0) != (start[idx] != 0),
                    _ => fields[idx] != start[idx],
                };
                prop_assert_eq!(set.contains(name), expect_changed);
            }
        }
    }
}
