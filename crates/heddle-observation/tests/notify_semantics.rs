//! Fan-out protocol semantics, exercised through spy subscribers:
//!
//! 1. An empty record notifies nobody.
//! 2. Within one flush every snapshotted subscriber is delivered at most
//!    once per queued change.
//! 3. A nested notify merges into the outer flush (last write wins) and
//!    drains only after the outer entries.
//! 4. Subscribers added mid-flush are not delivered in that flush.
//! 5. Subscribers removed mid-flush still receive the snapshotted delivery.
//! 6. Unbounded recursive notification panics past the depth limit.
//! 7. Collection fan-out is slot-ordered and shares one map instance.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use heddle_observation::{
    ChangeFlags, CollectionSubscriber, CollectionSubscriberRecord, IndexMap, Subscriber,
    SubscriberRecord,
};

type DeliveryLog = Rc<RefCell<Vec<(&'static str, i32, i32)>>>;

/// Records every delivery; an optional reaction runs once, on the first
/// delivery after it was installed.
struct Spy {
    name: &'static str,
    log: DeliveryLog,
    #[allow(clippy::type_complexity)]
    reaction: RefCell<Option<Box<dyn Fn(i32)>>>,
}

impl Spy {
    fn new(name: &'static str, log: &DeliveryLog) -> Rc<Self> {
        Rc::new(Self {
            name,
            log: Rc::clone(log),
            reaction: RefCell::new(None),
        })
    }

    fn react_once(&self, reaction: impl Fn(i32) + 'static) {
        *self.reaction.borrow_mut() = Some(Box::new(reaction));
    }
}

impl Subscriber<i32> for Spy {
    fn handle_change(&self, new: &i32, old: &i32, _flags: ChangeFlags) {
        self.log.borrow_mut().push((self.name, *new, *old));
        let reaction = self.reaction.borrow_mut().take();
        if let Some(reaction) = reaction {
            reaction(*new);
        }
    }
}

fn delivery_log() -> DeliveryLog {
    Rc::new(RefCell::new(Vec::new()))
}

#[test]
fn empty_record_notifies_nobody() {
    let log = delivery_log();
    let spy = Spy::new("a", &log);
    let record: SubscriberRecord<i32> = SubscriberRecord::new();
    // The spy exists but was never added.
    record.notify(&1, &0, ChangeFlags::empty());
    assert!(log.borrow().is_empty());
    drop(spy);
}

#[test]
fn all_slots_and_overflow_are_delivered() {
    let log = delivery_log();
    let record = SubscriberRecord::new();
    let names = ["s1", "s2", "s3", "s4", "s5"];
    for name in names {
        record.add(Spy::new(name, &log) as Rc<dyn Subscriber<i32>>);
    }
    record.notify(&1, &0, ChangeFlags::empty());
    let seen: Vec<&str> = log.borrow().iter().map(|(n, _, _)| *n).collect();
    assert_eq!(seen, names);
}

#[test]
fn nested_notify_merges_into_outer_flush() {
    // A's handler re-notifies while B is still pending: B must see only
    // the newer change (last write wins), and A's second delivery comes
    // after the outer entries.
    let log = delivery_log();
    let record = Rc::new(SubscriberRecord::new());
    let a = Spy::new("a", &log);
    let b = Spy::new("b", &log);
    {
        let record = Rc::clone(&record);
        a.react_once(move |_| record.notify(&2, &1, ChangeFlags::empty()));
    }
    record.add(Rc::clone(&a) as Rc<dyn Subscriber<i32>>);
    record.add(Rc::clone(&b) as Rc<dyn Subscriber<i32>>);

    record.notify(&1, &0, ChangeFlags::empty());

    assert_eq!(*log.borrow(), vec![("a", 1, 0), ("b", 2, 1), ("a", 2, 1)]);
}

#[test]
fn nested_notify_delivers_nothing_itself() {
    // The nested call only merges; no delivery happens inside it.
    let log = delivery_log();
    let record = Rc::new(SubscriberRecord::new());
    let a = Spy::new("a", &log);
    let b = Spy::new("b", &log);
    record.add(Rc::clone(&a) as Rc<dyn Subscriber<i32>>);
    record.add(Rc::clone(&b) as Rc<dyn Subscriber<i32>>);
    {
        let record = Rc::clone(&record);
        let log = Rc::clone(&log);
        a.react_once(move |_| {
            record.notify(&2, &1, ChangeFlags::empty());
            // Back from the nested call: still only A's own delivery.
            assert_eq!(log.borrow().len(), 1);
        });
    }

    record.notify(&1, &0, ChangeFlags::empty());

    let log = log.borrow();
    assert_eq!(log[0], ("a", 1, 0));
    // B was delivered exactly once, with the merged (newest) change.
    let b_entries: Vec<_> = log.iter().filter(|(n, _, _)| *n == "b").collect();
    assert_eq!(b_entries, vec![&("b", 2, 1)]);
}

#[test]
fn subscriber_added_during_flush_is_not_delivered() {
    let log = delivery_log();
    let record = Rc::new(SubscriberRecord::new());
    let a = Spy::new("a", &log);
    let late = Spy::new("late", &log);
    {
        let record = Rc::clone(&record);
        let late = Rc::clone(&late);
        a.react_once(move |_| {
            record.add(Rc::clone(&late) as Rc<dyn Subscriber<i32>>);
        });
    }
    record.add(Rc::clone(&a) as Rc<dyn Subscriber<i32>>);

    record.notify(&1, &0, ChangeFlags::empty());
    assert_eq!(*log.borrow(), vec![("a", 1, 0)]);

    // The late subscriber is part of the next flush.
    record.notify(&2, &1, ChangeFlags::empty());
    let seen: Vec<&str> = log.borrow().iter().map(|(n, _, _)| *n).collect();
    assert_eq!(seen, vec!["a", "a", "late"]);
}

#[test]
fn subscriber_removed_during_flush_still_receives_snapshot() {
    let log = delivery_log();
    let record = Rc::new(SubscriberRecord::new());
    let a = Spy::new("a", &log);
    let b = Spy::new("b", &log);
    {
        let record = Rc::clone(&record);
        let b = Rc::clone(&b);
        a.react_once(move |_| {
            let sub = Rc::clone(&b) as Rc<dyn Subscriber<i32>>;
            assert!(record.remove(&sub));
        });
    }
    record.add(Rc::clone(&a) as Rc<dyn Subscriber<i32>>);
    record.add(Rc::clone(&b) as Rc<dyn Subscriber<i32>>);

    record.notify(&1, &0, ChangeFlags::empty());
    // B was already snapshotted when A removed it.
    assert_eq!(*log.borrow(), vec![("a", 1, 0), ("b", 1, 0)]);

    record.notify(&2, &1, ChangeFlags::empty());
    let seen: Vec<&str> = log.borrow().iter().map(|(n, _, _)| *n).collect();
    assert_eq!(seen, vec!["a", "b", "a"]);
}

#[test]
#[should_panic(expected = "recursive change notification")]
fn unbounded_recursion_is_fatal() {
    struct Recurse {
        record: RefCell<Option<Rc<SubscriberRecord<i32>>>>,
        invocations: Cell<u32>,
    }
    impl Subscriber<i32> for Recurse {
        fn handle_change(&self, new: &i32, _old: &i32, _flags: ChangeFlags) {
            self.invocations.set(self.invocations.get() + 1);
            let record = self.record.borrow().clone();
            if let Some(record) = record {
                record.notify(&(new + 1), new, ChangeFlags::empty());
            }
        }
    }

    let record = Rc::new(SubscriberRecord::new());
    let recurse = Rc::new(Recurse {
        record: RefCell::new(Some(Rc::clone(&record))),
        invocations: Cell::new(0),
    });
    record.add(Rc::clone(&recurse) as Rc<dyn Subscriber<i32>>);
    record.notify(&0, &-1, ChangeFlags::empty());
}

// ── Collection fan-out ────────────────────────────────────────────────

struct CollSpy {
    name: &'static str,
    log: Rc<RefCell<Vec<(&'static str, usize, ChangeFlags)>>>,
}

impl CollSpy {
    fn new(
        name: &'static str,
        log: &Rc<RefCell<Vec<(&'static str, usize, ChangeFlags)>>>,
    ) -> Rc<Self> {
        Rc::new(Self {
            name,
            log: Rc::clone(log),
        })
    }
}

impl CollectionSubscriber for CollSpy {
    fn handle_collection_change(&self, index_map: &IndexMap, flags: ChangeFlags) {
        let map_addr = std::ptr::from_ref(index_map) as usize;
        self.log.borrow_mut().push((self.name, map_addr, flags));
    }
}

#[test]
fn collection_fan_out_is_slot_ordered_with_one_shared_map() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let record = CollectionSubscriberRecord::new();
    let names = ["s1", "s2", "s3", "s4"];
    for name in names {
        record.add(CollSpy::new(name, &log) as Rc<dyn CollectionSubscriber>);
    }

    let map = IndexMap::identity(2);
    record.notify_collection(&map, ChangeFlags::UPDATE_TARGET);

    let log = log.borrow();
    let order: Vec<&str> = log.iter().map(|(n, _, _)| *n).collect();
    assert_eq!(order, names);
    // Every subscriber saw the same map instance and the same flags.
    assert!(log.iter().all(|(_, addr, _)| *addr == log[0].1));
    assert!(log.iter().all(|(_, _, f)| *f == ChangeFlags::UPDATE_TARGET));
}

#[test]
fn freed_fast_slot_changes_delivery_order() {
    // S1..S4 with S4 in overflow; removing S1 frees slot 0, which the next
    // add reuses, so S5 is delivered first. Slot order is an artifact, but
    // it is the artifact the storage promises.
    let log = Rc::new(RefCell::new(Vec::new()));
    let record = CollectionSubscriberRecord::new();
    let spies: Vec<_> = ["s1", "s2", "s3", "s4"]
        .into_iter()
        .map(|name| CollSpy::new(name, &log))
        .collect();
    for spy in &spies {
        record.add(Rc::clone(spy) as Rc<dyn CollectionSubscriber>);
    }
    let first = Rc::clone(&spies[0]) as Rc<dyn CollectionSubscriber>;
    assert!(record.remove(&first));
    record.add(CollSpy::new("s5", &log) as Rc<dyn CollectionSubscriber>);

    record.notify_collection(&IndexMap::identity(0), ChangeFlags::empty());
    let order: Vec<&str> = log.borrow().iter().map(|(n, _, _)| *n).collect();
    assert_eq!(order, vec!["s5", "s2", "s3", "s4"]);
}

#[test]
fn unsubscribe_during_collection_fan_out_does_not_disturb_snapshot() {
    struct SelfRemover {
        record: Rc<CollectionSubscriberRecord>,
        this: RefCell<Option<Rc<dyn CollectionSubscriber>>>,
        log: Rc<RefCell<Vec<&'static str>>>,
    }
    impl CollectionSubscriber for SelfRemover {
        fn handle_collection_change(&self, _map: &IndexMap, _flags: ChangeFlags) {
            self.log.borrow_mut().push("remover");
            if let Some(this) = self.this.borrow_mut().take() {
                assert!(self.record.remove(&this));
            }
        }
    }
    struct Tail {
        log: Rc<RefCell<Vec<&'static str>>>,
    }
    impl CollectionSubscriber for Tail {
        fn handle_collection_change(&self, _map: &IndexMap, _flags: ChangeFlags) {
            self.log.borrow_mut().push("tail");
        }
    }

    let log = Rc::new(RefCell::new(Vec::new()));
    let record = Rc::new(CollectionSubscriberRecord::new());
    let remover = Rc::new(SelfRemover {
        record: Rc::clone(&record),
        this: RefCell::new(None),
        log: Rc::clone(&log),
    });
    *remover.this.borrow_mut() = Some(Rc::clone(&remover) as Rc<dyn CollectionSubscriber>);
    record.add(Rc::clone(&remover) as Rc<dyn CollectionSubscriber>);
    record.add(Rc::new(Tail {
        log: Rc::clone(&log),
    }) as Rc<dyn CollectionSubscriber>);

    record.notify_collection(&IndexMap::identity(0), ChangeFlags::empty());
    assert_eq!(*log.borrow(), vec!["remover", "tail"]);
    assert_eq!(record.count(), 1);

    // The remover is gone from subsequent fan-outs.
    record.notify_collection(&IndexMap::identity(0), ChangeFlags::empty());
    assert_eq!(*log.borrow(), vec!["remover", "tail", "tail"]);
}
