//! §24.1 Map objects and §24.2 Set objects, with their iterators.
//!
//! Both collections keep entries in insertion order. Deleting an entry
//! leaves a tombstone so an iterator's position stays meaningful while the
//! collection is mutated underneath it; entries added during iteration are
//! visited.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::abstract_ops::iterator::{IteratorHint, create_iter_result_object, get_iterator, iterator_close, iterator_step_value};
use crate::abstract_ops::{EnumerableKind, call, create_array_from_list, get, ordinary_create_from_constructor};
use crate::builtins::{arg, define_constructor, define_getter, define_method, define_species, define_tag, define_value};
use crate::completion::Completion;
use crate::engine::{Agent, ErrorKind, IntrinsicId, Message, Realm};
use crate::object::{JsObject, ObjectKind, PropertyKey};
use crate::types::{JsString, JsSymbol, JsValue, WellKnownSymbol};

/// SameValueZero identity of a key, usable as a hash key.
#[derive(Clone, PartialEq, Eq, Hash)]
enum EntryKey {
    Undefined,
    Null,
    Boolean(bool),
    Number(u64),
    String(JsString),
    Symbol(JsSymbol),
    BigInt(Rc<num_bigint::BigInt>),
    Object(usize),
}

impl EntryKey {
    fn of(value: &JsValue) -> Self {
        match value {
            JsValue::Undefined => EntryKey::Undefined,
            JsValue::Null => EntryKey::Null,
            JsValue::Boolean(b) => EntryKey::Boolean(*b),
            JsValue::Number(n) if n.is_nan() => EntryKey::Number(f64::NAN.to_bits()),
            JsValue::Number(n) if *n == 0.0 => EntryKey::Number(0.0_f64.to_bits()),
            JsValue::Number(n) => EntryKey::Number(n.to_bits()),
            JsValue::String(s) => EntryKey::String(s.clone()),
            JsValue::Symbol(s) => EntryKey::Symbol(s.clone()),
            JsValue::BigInt(b) => EntryKey::BigInt(b.value.clone()),
            JsValue::Object(o) => EntryKey::Object(o.addr()),
        }
    }
}

/// [[MapData]] / [[SetData]]: insertion-ordered entries with tombstones.
#[derive(Default)]
pub struct OrderedTable {
    entries: Vec<Option<(JsValue, JsValue)>>,
    index: FxHashMap<EntryKey, usize>,
}

pub type MapData = OrderedTable;
pub type SetData = OrderedTable;

impl OrderedTable {
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn get(&self, key: &JsValue) -> Option<JsValue> {
        let slot = *self.index.get(&EntryKey::of(key))?;
        self.entries[slot].as_ref().map(|(_, v)| v.clone())
    }

    pub fn has(&self, key: &JsValue) -> bool {
        self.index.contains_key(&EntryKey::of(key))
    }

    /// Updates in place when present, appends otherwise. `-0` is stored as `+0`.
    pub fn insert(&mut self, key: JsValue, value: JsValue) {
        let key = match key {
            JsValue::Number(n) if n == 0.0 => JsValue::Number(0.0),
            other => other,
        };
        let id = EntryKey::of(&key);
        if let Some(&slot) = self.index.get(&id)
            && let Some(entry) = &mut self.entries[slot]
        {
            entry.1 = value;
            return;
        }
        self.index.insert(id, self.entries.len());
        self.entries.push(Some((key, value)));
    }

    pub fn remove(&mut self, key: &JsValue) -> bool {
        match self.index.remove(&EntryKey::of(key)) {
            Some(slot) => {
                self.entries[slot] = None;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.index.clear();
        for entry in &mut self.entries {
            *entry = None;
        }
    }

    /// The first live entry at or after `from`, with its slot.
    fn next_entry(&self, from: usize) -> Option<(usize, JsValue, JsValue)> {
        self.entries
            .iter()
            .enumerate()
            .skip(from)
            .find_map(|(slot, e)| e.as_ref().map(|(k, v)| (slot, k.clone(), v.clone())))
    }
}

/// State of a Map or Set Iterator (§24.1.5, §24.2.5).
pub struct CollectionIteratorState {
    iterated: RefCell<Option<JsObject>>,
    next_slot: Cell<usize>,
    kind: EnumerableKind,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Collection {
    Map,
    Set,
}

impl Collection {
    fn name(self) -> &'static str {
        match self {
            Collection::Map => "Map",
            Collection::Set => "Set",
        }
    }
}

pub(super) fn init(realm: &Realm) {
    init_map(realm);
    init_set(realm);
}

fn init_map(realm: &Realm) {
    let proto = JsObject::ordinary(Some(realm.intrinsic(IntrinsicId::ObjectPrototype)));
    define_method(realm, &proto, "clear", 0, |agent, this, _| {
        q!(with_table(agent, this, Collection::Map, OrderedTable::clear));
        Completion::Normal(JsValue::Undefined)
    });
    define_method(realm, &proto, "delete", 1, |agent, this, args| {
        with_table(agent, this, Collection::Map, |t| t.remove(&arg(args, 0))).map(JsValue::Boolean)
    });
    let entries = define_method(realm, &proto, "entries", 0, |agent, this, _| {
        create_collection_iterator(agent, this, Collection::Map, EnumerableKind::KeyValue)
    });
    define_method(realm, &proto, "forEach", 1, |agent, this, args| for_each(agent, this, args, Collection::Map));
    define_method(realm, &proto, "get", 1, |agent, this, args| {
        with_table(agent, this, Collection::Map, |t| t.get(&arg(args, 0)).unwrap_or(JsValue::Undefined))
    });
    define_method(realm, &proto, "has", 1, |agent, this, args| {
        with_table(agent, this, Collection::Map, |t| t.has(&arg(args, 0))).map(JsValue::Boolean)
    });
    define_method(realm, &proto, "keys", 0, |agent, this, _| {
        create_collection_iterator(agent, this, Collection::Map, EnumerableKind::Key)
    });
    define_method(realm, &proto, "set", 2, |agent, this, args| {
        q!(with_table(agent, this, Collection::Map, |t| t.insert(arg(args, 0), arg(args, 1))));
        Completion::Normal(this.clone())
    });
    define_getter(realm, &proto, "size", |agent, this, _| {
        with_table(agent, this, Collection::Map, |t| JsValue::Number(t.len() as f64))
    });
    define_method(realm, &proto, "values", 0, |agent, this, _| {
        create_collection_iterator(agent, this, Collection::Map, EnumerableKind::Value)
    });
    define_value(&proto, PropertyKey::symbol(WellKnownSymbol::Iterator), JsValue::Object(entries));
    define_tag(&proto, "Map");

    let ctor = define_constructor(realm, "Map", 0, |agent, _this, args, new_target| {
        collection_constructor(agent, args, new_target, Collection::Map)
    }, &proto);
    define_species(realm, &ctor);
    realm.set_intrinsic(IntrinsicId::MapPrototype, proto);
    realm.set_intrinsic(IntrinsicId::Map, ctor);

    let iter_proto = JsObject::ordinary(Some(realm.intrinsic(IntrinsicId::IteratorPrototype)));
    define_method(realm, &iter_proto, "next", 0, |agent, this, _| collection_iterator_next(agent, this, Collection::Map));
    define_tag(&iter_proto, "Map Iterator");
    realm.set_intrinsic(IntrinsicId::MapIteratorPrototype, iter_proto);
}

fn init_set(realm: &Realm) {
    let proto = JsObject::ordinary(Some(realm.intrinsic(IntrinsicId::ObjectPrototype)));
    define_method(realm, &proto, "add", 1, |agent, this, args| {
        let value = arg(args, 0);
        q!(with_table(agent, this, Collection::Set, |t| t.insert(value.clone(), value)));
        Completion::Normal(this.clone())
    });
    define_method(realm, &proto, "clear", 0, |agent, this, _| {
        q!(with_table(agent, this, Collection::Set, OrderedTable::clear));
        Completion::Normal(JsValue::Undefined)
    });
    define_method(realm, &proto, "delete", 1, |agent, this, args| {
        with_table(agent, this, Collection::Set, |t| t.remove(&arg(args, 0))).map(JsValue::Boolean)
    });
    define_method(realm, &proto, "entries", 0, |agent, this, _| {
        create_collection_iterator(agent, this, Collection::Set, EnumerableKind::KeyValue)
    });
    define_method(realm, &proto, "forEach", 1, |agent, this, args| for_each(agent, this, args, Collection::Set));
    define_method(realm, &proto, "has", 1, |agent, this, args| {
        with_table(agent, this, Collection::Set, |t| t.has(&arg(args, 0))).map(JsValue::Boolean)
    });
    define_getter(realm, &proto, "size", |agent, this, _| {
        with_table(agent, this, Collection::Set, |t| JsValue::Number(t.len() as f64))
    });
    let values = define_method(realm, &proto, "values", 0, |agent, this, _| {
        create_collection_iterator(agent, this, Collection::Set, EnumerableKind::Value)
    });
    define_value(&proto, "keys", JsValue::Object(values.clone()));
    define_value(&proto, PropertyKey::symbol(WellKnownSymbol::Iterator), JsValue::Object(values));
    define_tag(&proto, "Set");

    let ctor = define_constructor(realm, "Set", 0, |agent, _this, args, new_target| {
        collection_constructor(agent, args, new_target, Collection::Set)
    }, &proto);
    define_species(realm, &ctor);
    realm.set_intrinsic(IntrinsicId::SetPrototype, proto);
    realm.set_intrinsic(IntrinsicId::Set, ctor);

    let iter_proto = JsObject::ordinary(Some(realm.intrinsic(IntrinsicId::IteratorPrototype)));
    define_method(realm, &iter_proto, "next", 0, |agent, this, _| collection_iterator_next(agent, this, Collection::Set));
    define_tag(&iter_proto, "Set Iterator");
    realm.set_intrinsic(IntrinsicId::SetIteratorPrototype, iter_proto);
}

/// Runs `f` over the table of `this`, which must be a `which` object.
fn with_table<R>(
    agent: &Agent,
    this: &JsValue,
    which: Collection,
    f: impl FnOnce(&mut OrderedTable) -> R,
) -> Completion<R> {
    if let JsValue::Object(o) = this {
        let mut data = o.borrow_mut();
        match (&mut data.kind, which) {
            (ObjectKind::Map(t), Collection::Map) | (ObjectKind::Set(t), Collection::Set) => {
                return Completion::Normal(f(t));
            }
            _ => {}
        }
    }
    agent.throw(ErrorKind::Type, Message::NotATypeObject(agent.inspect(this), which.name()))
}

// §24.1.1.1 Map ( [ iterable ] ), §24.2.2.1 Set ( [ iterable ] )
fn collection_constructor(
    agent: &Agent,
    args: &[JsValue],
    new_target: Option<&JsObject>,
    which: Collection,
) -> Completion {
    let Some(new_target) = new_target else {
        return agent.throw(ErrorKind::Type, Message::ConstructorRequiresNew(which.name().into()));
    };
    let (default_proto, kind, adder_name) = match which {
        Collection::Map => (IntrinsicId::MapPrototype, ObjectKind::Map(MapData::default()), "set"),
        Collection::Set => (IntrinsicId::SetPrototype, ObjectKind::Set(SetData::default()), "add"),
    };
    let collection = q!(ordinary_create_from_constructor(agent, new_target, default_proto, kind));
    let iterable = arg(args, 0);
    if iterable.is_nullish() {
        return Completion::Normal(JsValue::Object(collection));
    }
    let adder = q!(get(agent, &collection, &PropertyKey::from(adder_name)));
    if !adder.is_callable() {
        return agent.throw(ErrorKind::Type, Message::NotAFunction(agent.inspect(&adder)));
    }
    let target = JsValue::Object(collection.clone());
    let record = q!(get_iterator(agent, &iterable, IteratorHint::Sync));
    while let Some(next) = q!(iterator_step_value(agent, &record)) {
        let status = match which {
            Collection::Set => call(agent, &adder, &target, &[next]),
            // §24.1.1.2 AddEntriesFromIterable
            Collection::Map => add_entry(agent, &adder, &target, &next),
        };
        if status.is_abrupt() {
            return iterator_close(agent, &record, status);
        }
    }
    Completion::Normal(target)
}

fn add_entry(agent: &Agent, adder: &JsValue, target: &JsValue, item: &JsValue) -> Completion {
    let JsValue::Object(item) = item else {
        return agent.throw(ErrorKind::Type, Message::NotAnObject(agent.inspect(item)));
    };
    let k = q!(get(agent, item, &PropertyKey::from_index(0)));
    let v = q!(get(agent, item, &PropertyKey::from_index(1)));
    call(agent, adder, target, &[k, v])
}

// §24.1.3.5 Map.prototype.forEach, §24.2.3.6 Set.prototype.forEach
fn for_each(agent: &Agent, this: &JsValue, args: &[JsValue], which: Collection) -> Completion {
    q!(with_table(agent, this, which, |_| ()));
    let callback = arg(args, 0);
    if !callback.is_callable() {
        return agent.throw(ErrorKind::Type, Message::NotAFunction(agent.inspect(&callback)));
    }
    let this_arg = arg(args, 1);
    let mut slot = 0;
    while let Some((found, key, value)) = q!(with_table(agent, this, which, |t| t.next_entry(slot))) {
        slot = found + 1;
        q!(call(agent, &callback, &this_arg, &[value, key, this.clone()]));
    }
    Completion::Normal(JsValue::Undefined)
}

// §24.1.5.1 CreateMapIterator, §24.2.5.1 CreateSetIterator
fn create_collection_iterator(agent: &Agent, this: &JsValue, which: Collection, kind: EnumerableKind) -> Completion {
    q!(with_table(agent, this, which, |_| ()));
    let JsValue::Object(o) = this else {
        unreachable!("with_table accepted a non-object");
    };
    let state = CollectionIteratorState {
        iterated: RefCell::new(Some(o.clone())),
        next_slot: Cell::new(0),
        kind,
    };
    let (proto, kind) = match which {
        Collection::Map => (IntrinsicId::MapIteratorPrototype, ObjectKind::MapIterator(state)),
        Collection::Set => (IntrinsicId::SetIteratorPrototype, ObjectKind::SetIterator(state)),
    };
    Completion::Normal(JsValue::Object(JsObject::new(Some(agent.intrinsic(proto)), kind)))
}

// %MapIteratorPrototype%.next, %SetIteratorPrototype%.next
fn collection_iterator_next(agent: &Agent, this: &JsValue, which: Collection) -> Completion {
    let state = match this {
        JsValue::Object(o) => match (&o.borrow().kind, which) {
            (ObjectKind::MapIterator(s), Collection::Map) | (ObjectKind::SetIterator(s), Collection::Set) => {
                Some((s.iterated.borrow().clone(), s.next_slot.get(), s.kind))
            }
            _ => None,
        },
        _ => None,
    };
    let Some((iterated, slot, kind)) = state else {
        let expected = match which {
            Collection::Map => "Map Iterator",
            Collection::Set => "Set Iterator",
        };
        return agent.throw(ErrorKind::Type, Message::NotATypeObject(agent.inspect(this), expected));
    };
    let Some(collection) = iterated else {
        return Completion::Normal(create_iter_result_object(agent, JsValue::Undefined, true));
    };
    let found = x!(with_table(agent, &JsValue::Object(collection), which, |t| t.next_entry(slot)));
    let JsValue::Object(o) = this else {
        unreachable!("iterator state came from an object");
    };
    let update = |exhausted: bool, next: usize| {
        if let ObjectKind::MapIterator(s) | ObjectKind::SetIterator(s) = &o.borrow().kind {
            if exhausted {
                *s.iterated.borrow_mut() = None;
            }
            s.next_slot.set(next);
        }
    };
    let Some((found, key, value)) = found else {
        update(true, slot);
        return Completion::Normal(create_iter_result_object(agent, JsValue::Undefined, true));
    };
    update(false, found + 1);
    let result = match kind {
        EnumerableKind::Key => key,
        EnumerableKind::Value => value,
        EnumerableKind::KeyValue => JsValue::Object(create_array_from_list(agent, &[key, value])),
    };
    Completion::Normal(create_iter_result_object(agent, result, false))
}

#[cfg(test)]
mod tests {
    use crate::evaluator::test_support::eval_to_string;

    use super::OrderedTable;
    use crate::types::JsValue;

    #[test]
    fn table_uses_same_value_zero() {
        let mut t = OrderedTable::default();
        t.insert(JsValue::Number(-0.0), JsValue::from_str("zero"));
        t.insert(JsValue::Number(f64::NAN), JsValue::from_str("nan"));
        assert!(t.has(&JsValue::Number(0.0)));
        assert!(t.has(&JsValue::Number(f64::NAN)));
        assert_eq!(t.len(), 2);
        assert!(t.remove(&JsValue::Number(0.0)));
        assert!(!t.remove(&JsValue::Number(-0.0)));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn maps_keep_insertion_order() {
        let src = "var m = new Map([[1, 'a'], ['1', 'b']]); m.set(NaN, 'n').set(1, 'c'); \
                   [...m].map(([k, v]) => typeof k + ':' + v).join() + '|' + m.get(NaN) + '|' + m.size";
        assert_eq!(eval_to_string(src), "number:c,string:b,number:n|n|3");
        assert_eq!(eval_to_string("var o = {}; var m = new Map(); m.set(o, 1); m.get(o) + ',' + m.get({})"), "1,undefined");
        assert_eq!(eval_to_string("1 / [...new Map([[-0, 1]]).keys()][0]"), "Infinity");
    }

    #[test]
    fn iteration_sees_live_mutation() {
        let src = "var m = new Map([[1, 1], [2, 2], [3, 3]]); var seen = []; \
                   for (var [k] of m) { seen.push(k); if (k === 1) { m.delete(2); m.set(4, 4); } } seen.join()";
        assert_eq!(eval_to_string(src), "1,3,4");
        let src = "var s = new Set([1, 2]); var it = s.values(); it.next(); s.clear(); s.add(9); \
                   var r = it.next(); r.value + ',' + r.done + ',' + it.next().done";
        assert_eq!(eval_to_string(src), "9,false,true");
    }

    #[test]
    fn sets_deduplicate() {
        assert_eq!(eval_to_string("var s = new Set('hello'); [...s].join('') + s.size"), "helo4");
        assert_eq!(eval_to_string("[...new Set([1, 2]).entries()].join('|')"), "1,1|2,2");
        assert_eq!(eval_to_string("Set.prototype.keys === Set.prototype.values"), "true");
        assert_eq!(eval_to_string("Map.prototype[Symbol.iterator] === Map.prototype.entries"), "true");
    }

    #[test]
    fn for_each_passes_value_key_and_collection() {
        let src = "var out = []; var m = new Map([['a', 1]]); \
                   m.forEach(function (v, k, c) { out.push(v, k, c === m, this.tag); }, { tag: 't' }); out.join()";
        assert_eq!(eval_to_string(src), "1,a,true,t");
    }

    #[test]
    fn constructors_validate() {
        assert!(eval_to_string("Map()").starts_with("Throw: TypeError"));
        assert!(eval_to_string("new Map([1])").starts_with("Throw: TypeError"));
        assert!(eval_to_string("Map.prototype.get.call(new Set(), 1)").starts_with("Throw: TypeError"));
        let src = "var closed = false; \
                   var iter = { [Symbol.iterator]() { return { next() { return { value: 5, done: false }; }, \
                     return() { closed = true; return {}; } }; } }; \
                   try { new Map(iter); } catch (e) { closed }";
        assert_eq!(eval_to_string(src), "true");
        assert_eq!(eval_to_string("Object.prototype.toString.call(new Map().keys())"), "[object Map Iterator]");
    }
}
