//! §27.1 Iteration: the iterator prototypes, the array, string and for-in
//! iterators, %AsyncFromSyncIteratorPrototype%, and the Generator and
//! AsyncGenerator prototype objects (§27.5, §27.6).

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use crate::abstract_ops::iterator::{
    IteratorRecord, create_iter_result_object, iterator_close, iterator_complete, iterator_next, iterator_value,
};
use crate::abstract_ops::{EnumerableKind, call, create_array_from_list, get, get_method, length_of_array_like};
use crate::builtins::promise::{PromiseCapability, if_abrupt_reject_promise, new_promise_capability, perform_promise_then, promise_resolve};
use crate::builtins::{arg, builtin_function, define_method, define_tag, plain_object};
use crate::completion::Completion;
use crate::engine::{Agent, ErrorKind, IntrinsicId, Message, Realm};
use crate::evaluator::coroutine::{async_generator_enqueue, generator_resume};
use crate::object::{JsObject, ObjectKind, PropertyKey};
use crate::types::{JsString, JsValue, WellKnownSymbol};

/// State of an Array Iterator (§23.1.5).
pub struct ArrayIteratorState {
    iterated: RefCell<Option<JsObject>>,
    next_index: Cell<u64>,
    kind: EnumerableKind,
}

/// State of a String Iterator (§22.1.5).
pub struct StringIteratorState {
    string: RefCell<Option<JsString>>,
    position: Cell<usize>,
}

/// State of a For-In Iterator (§14.7.5.10).
pub struct ForInIteratorState {
    object: RefCell<JsObject>,
    object_was_visited: Cell<bool>,
    visited_keys: RefCell<FxHashSet<PropertyKey>>,
    remaining_keys: RefCell<VecDeque<PropertyKey>>,
}

pub(super) fn init(realm: &Realm) {
    let iterator_proto = plain_object(realm);
    define_method(realm, &iterator_proto, PropertyKey::symbol(WellKnownSymbol::Iterator), 0, |_, this, _| {
        Completion::Normal(this.clone())
    });
    realm.set_intrinsic(IntrinsicId::IteratorPrototype, iterator_proto.clone());

    let async_iterator_proto = plain_object(realm);
    define_method(
        realm,
        &async_iterator_proto,
        PropertyKey::symbol(WellKnownSymbol::AsyncIterator),
        0,
        |_, this, _| Completion::Normal(this.clone()),
    );
    realm.set_intrinsic(IntrinsicId::AsyncIteratorPrototype, async_iterator_proto.clone());

    let array_iter = JsObject::ordinary(Some(iterator_proto.clone()));
    define_method(realm, &array_iter, "next", 0, array_iterator_next);
    define_tag(&array_iter, "Array Iterator");
    realm.set_intrinsic(IntrinsicId::ArrayIteratorPrototype, array_iter);

    let string_iter = JsObject::ordinary(Some(iterator_proto.clone()));
    define_method(realm, &string_iter, "next", 0, string_iterator_next);
    define_tag(&string_iter, "String Iterator");
    realm.set_intrinsic(IntrinsicId::StringIteratorPrototype, string_iter);

    let for_in = JsObject::ordinary(Some(iterator_proto.clone()));
    define_method(realm, &for_in, "next", 0, for_in_iterator_next);
    realm.set_intrinsic(IntrinsicId::ForInIteratorPrototype, for_in);

    let async_from_sync = JsObject::ordinary(Some(async_iterator_proto.clone()));
    define_method(realm, &async_from_sync, "next", 1, async_from_sync_next);
    define_method(realm, &async_from_sync, "return", 1, async_from_sync_return);
    define_method(realm, &async_from_sync, "throw", 1, async_from_sync_throw);
    realm.set_intrinsic(IntrinsicId::AsyncFromSyncIteratorPrototype, async_from_sync);

    let generator = JsObject::ordinary(Some(iterator_proto));
    define_method(realm, &generator, "next", 1, |agent, this, args| {
        generator_resume(agent, this, Completion::Normal(arg(args, 0)))
    });
    define_method(realm, &generator, "return", 1, |agent, this, args| {
        generator_resume(agent, this, Completion::Return(arg(args, 0)))
    });
    define_method(realm, &generator, "throw", 1, |agent, this, args| {
        generator_resume(agent, this, Completion::Throw(arg(args, 0)))
    });
    define_tag(&generator, "Generator");
    realm.set_intrinsic(IntrinsicId::GeneratorPrototype, generator);

    let async_generator = JsObject::ordinary(Some(async_iterator_proto));
    define_method(realm, &async_generator, "next", 1, |agent, this, args| {
        async_generator_enqueue(agent, this, Completion::Normal(arg(args, 0)))
    });
    define_method(realm, &async_generator, "return", 1, |agent, this, args| {
        async_generator_enqueue(agent, this, Completion::Return(arg(args, 0)))
    });
    define_method(realm, &async_generator, "throw", 1, |agent, this, args| {
        async_generator_enqueue(agent, this, Completion::Throw(arg(args, 0)))
    });
    define_tag(&async_generator, "AsyncGenerator");
    realm.set_intrinsic(IntrinsicId::AsyncGeneratorPrototype, async_generator);
}

fn incompatible<T>(agent: &Agent, this: &JsValue, expected: &'static str) -> Completion<T> {
    agent.throw(ErrorKind::Type, Message::NotATypeObject(agent.inspect(this), expected))
}

// §23.1.5.1 CreateArrayIterator
pub fn create_array_iterator(agent: &Agent, array: JsObject, kind: EnumerableKind) -> JsObject {
    JsObject::new(
        Some(agent.intrinsic(IntrinsicId::ArrayIteratorPrototype)),
        ObjectKind::ArrayIterator(ArrayIteratorState {
            iterated: RefCell::new(Some(array)),
            next_index: Cell::new(0),
            kind,
        }),
    )
}

// §23.1.5.2.1 %ArrayIteratorPrototype%.next
fn array_iterator_next(agent: &Agent, this: &JsValue, _args: &[JsValue]) -> Completion {
    let JsValue::Object(o) = this else {
        return incompatible(agent, this, "Array Iterator");
    };
    let (iterated, index, kind) = match &o.borrow().kind {
        ObjectKind::ArrayIterator(s) => (s.iterated.borrow().clone(), s.next_index.get(), s.kind),
        _ => return incompatible(agent, this, "Array Iterator"),
    };
    let Some(array) = iterated else {
        return Completion::Normal(create_iter_result_object(agent, JsValue::Undefined, true));
    };
    let len = q!(length_of_array_like(agent, &array));
    let update = |iterated: Option<JsObject>, next: u64| {
        if let ObjectKind::ArrayIterator(s) = &o.borrow().kind {
            *s.iterated.borrow_mut() = iterated;
            s.next_index.set(next);
        }
    };
    if index >= len {
        update(None, index);
        return Completion::Normal(create_iter_result_object(agent, JsValue::Undefined, true));
    }
    update(Some(array.clone()), index + 1);
    let key = JsValue::Number(index as f64);
    let result = match kind {
        EnumerableKind::Key => key,
        EnumerableKind::Value => q!(get(agent, &array, &PropertyKey::from_f64(index as f64))),
        EnumerableKind::KeyValue => {
            let value = q!(get(agent, &array, &PropertyKey::from_f64(index as f64)));
            JsValue::Object(create_array_from_list(agent, &[key, value]))
        }
    };
    Completion::Normal(create_iter_result_object(agent, result, false))
}

// §22.1.5.1 CreateStringIterator
pub fn create_string_iterator(agent: &Agent, string: JsString) -> JsObject {
    JsObject::new(
        Some(agent.intrinsic(IntrinsicId::StringIteratorPrototype)),
        ObjectKind::StringIterator(StringIteratorState {
            string: RefCell::new(Some(string)),
            position: Cell::new(0),
        }),
    )
}

// §22.1.5.2.1 %StringIteratorPrototype%.next
fn string_iterator_next(agent: &Agent, this: &JsValue, _args: &[JsValue]) -> Completion {
    let JsValue::Object(o) = this else {
        return incompatible(agent, this, "String Iterator");
    };
    let next = match &o.borrow().kind {
        ObjectKind::StringIterator(s) => {
            let mut string = s.string.borrow_mut();
            match string.as_ref() {
                Some(text) if s.position.get() < text.len() => {
                    let position = s.position.get();
                    let (_, units) = text.code_point_at(position);
                    s.position.set(position + units);
                    Some(text.slice(position, position + units))
                }
                _ => {
                    *string = None;
                    None
                }
            }
        }
        _ => return incompatible(agent, this, "String Iterator"),
    };
    Completion::Normal(match next {
        Some(unit) => create_iter_result_object(agent, JsValue::String(unit), false),
        None => create_iter_result_object(agent, JsValue::Undefined, true),
    })
}

// §14.7.5.9 CreateForInIterator
pub fn create_for_in_iterator(agent: &Agent, object: JsObject) -> JsObject {
    JsObject::new(
        Some(agent.intrinsic(IntrinsicId::ForInIteratorPrototype)),
        ObjectKind::ForInIterator(ForInIteratorState {
            object: RefCell::new(object),
            object_was_visited: Cell::new(false),
            visited_keys: RefCell::new(FxHashSet::default()),
            remaining_keys: RefCell::new(VecDeque::new()),
        }),
    )
}

// §14.7.5.10.2.1 %ForInIteratorPrototype%.next
//
// The visited set is only consulted for keys of objects further down the
// chain; a key deleted and re-added on the same object is not revisited.
fn for_in_iterator_next(agent: &Agent, this: &JsValue, _args: &[JsValue]) -> Completion {
    let JsValue::Object(iterator) = this else {
        return incompatible(agent, this, "For-In Iterator");
    };
    let with_state = |f: &mut dyn FnMut(&ForInIteratorState)| {
        if let ObjectKind::ForInIterator(s) = &iterator.borrow().kind {
            f(s);
        }
    };
    if !matches!(iterator.borrow().kind, ObjectKind::ForInIterator(_)) {
        return incompatible(agent, this, "For-In Iterator");
    }
    loop {
        let mut object = None;
        let mut visited = true;
        with_state(&mut |s| {
            object = Some(s.object.borrow().clone());
            visited = s.object_was_visited.get();
        });
        let Some(object) = object else {
            unreachable!("for-in iterator state vanished");
        };
        if !visited {
            let keys = q!(object.own_property_keys(agent));
            with_state(&mut |s| {
                let mut remaining = s.remaining_keys.borrow_mut();
                remaining.extend(keys.iter().filter(|k| !k.is_symbol()).cloned());
                s.object_was_visited.set(true);
            });
        }
        loop {
            let mut next = None;
            with_state(&mut |s| next = s.remaining_keys.borrow_mut().pop_front());
            let Some(key) = next else {
                break;
            };
            let mut seen = false;
            with_state(&mut |s| seen = s.visited_keys.borrow().contains(&key));
            if seen {
                continue;
            }
            let Some(desc) = q!(object.get_own_property(agent, &key)) else {
                continue;
            };
            with_state(&mut |s| {
                s.visited_keys.borrow_mut().insert(key.clone());
            });
            if desc.enumerable() {
                return Completion::Normal(create_iter_result_object(agent, key.to_value(), false));
            }
        }
        match q!(object.get_prototype_of(agent)) {
            None => return Completion::Normal(create_iter_result_object(agent, JsValue::Undefined, true)),
            Some(proto) => with_state(&mut |s| {
                *s.object.borrow_mut() = proto.clone();
                s.object_was_visited.set(false);
            }),
        }
    }
}

// §27.1.6.1 CreateAsyncFromSyncIterator
pub fn create_async_from_sync_iterator(agent: &Agent, record: IteratorRecord) -> IteratorRecord {
    let iterator = JsObject::new(
        Some(agent.intrinsic(IntrinsicId::AsyncFromSyncIteratorPrototype)),
        ObjectKind::AsyncFromSyncIterator(record),
    );
    let next_method = x!(get(agent, &iterator, &PropertyKey::from("next")));
    IteratorRecord {
        iterator,
        next_method,
        done: Cell::new(false),
    }
}

fn sync_record(this: &JsValue) -> Option<IteratorRecord> {
    match this {
        JsValue::Object(o) => match &o.borrow().kind {
            ObjectKind::AsyncFromSyncIterator(record) => Some(record.clone()),
            _ => None,
        },
        _ => None,
    }
}

fn intrinsic_capability(agent: &Agent) -> PromiseCapability {
    x!(new_promise_capability(agent, &JsValue::Object(agent.intrinsic(IntrinsicId::Promise))))
}

fn reject_with_type_error(agent: &Agent, capability: &PromiseCapability, message: Message) -> Completion {
    let error = agent.new_error(ErrorKind::Type, message);
    q!(call(agent, &capability.reject, &JsValue::Undefined, &[JsValue::Object(error)]));
    Completion::Normal(JsValue::Object(capability.promise.clone()))
}

// §27.1.6.2.1 %AsyncFromSyncIteratorPrototype%.next
fn async_from_sync_next(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let capability = intrinsic_capability(agent);
    let Some(record) = sync_record(this) else {
        return reject_with_type_error(agent, &capability, Message::NotATypeObject(agent.inspect(this), "Async-from-Sync Iterator"));
    };
    let value = args.first().cloned();
    let result = if_abrupt_reject_promise!(agent, iterator_next(agent, &record, value), capability);
    async_from_sync_continuation(agent, &result, &capability, &record, true)
}

// §27.1.6.2.2 %AsyncFromSyncIteratorPrototype%.return
fn async_from_sync_return(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let capability = intrinsic_capability(agent);
    let Some(record) = sync_record(this) else {
        return reject_with_type_error(agent, &capability, Message::NotATypeObject(agent.inspect(this), "Async-from-Sync Iterator"));
    };
    let sync_iterator = JsValue::Object(record.iterator.clone());
    let method = if_abrupt_reject_promise!(agent, get_method(agent, &sync_iterator, &PropertyKey::from("return")), capability);
    let Some(method) = method else {
        let result = create_iter_result_object(agent, arg(args, 0), true);
        q!(call(agent, &capability.resolve, &JsValue::Undefined, &[result]));
        return Completion::Normal(JsValue::Object(capability.promise));
    };
    let call_args: &[JsValue] = match args.first() {
        Some(_) => &args[..1],
        None => &[],
    };
    let result = if_abrupt_reject_promise!(agent, call(agent, &JsValue::Object(method), &sync_iterator, call_args), capability);
    let JsValue::Object(result) = result else {
        return reject_with_type_error(agent, &capability, Message::NotAnObject(agent.inspect(&result)));
    };
    async_from_sync_continuation(agent, &result, &capability, &record, false)
}

// §27.1.6.2.3 %AsyncFromSyncIteratorPrototype%.throw
fn async_from_sync_throw(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let capability = intrinsic_capability(agent);
    let Some(record) = sync_record(this) else {
        return reject_with_type_error(agent, &capability, Message::NotATypeObject(agent.inspect(this), "Async-from-Sync Iterator"));
    };
    let sync_iterator = JsValue::Object(record.iterator.clone());
    let method = if_abrupt_reject_promise!(agent, get_method(agent, &sync_iterator, &PropertyKey::from("throw")), capability);
    let Some(method) = method else {
        let closed = iterator_close(agent, &record, Completion::Normal(JsValue::Undefined));
        if_abrupt_reject_promise!(agent, closed, capability);
        return reject_with_type_error(agent, &capability, Message::NotAFunction("throw".into()));
    };
    let call_args: &[JsValue] = match args.first() {
        Some(_) => &args[..1],
        None => &[],
    };
    let result = if_abrupt_reject_promise!(agent, call(agent, &JsValue::Object(method), &sync_iterator, call_args), capability);
    let JsValue::Object(result) = result else {
        return reject_with_type_error(agent, &capability, Message::NotAnObject(agent.inspect(&result)));
    };
    async_from_sync_continuation(agent, &result, &capability, &record, true)
}

// §27.1.6.4 AsyncFromSyncIteratorContinuation
fn async_from_sync_continuation(
    agent: &Agent,
    result: &JsObject,
    capability: &PromiseCapability,
    record: &IteratorRecord,
    close_on_rejection: bool,
) -> Completion {
    let done = if_abrupt_reject_promise!(agent, iterator_complete(agent, result), capability);
    let value = if_abrupt_reject_promise!(agent, iterator_value(agent, result), capability);
    let mut wrapper = promise_resolve(agent, &agent.intrinsic(IntrinsicId::Promise), value);
    if wrapper.is_abrupt() && !done && close_on_rejection {
        wrapper = iterator_close(agent, record, wrapper);
    }
    let wrapper = if_abrupt_reject_promise!(agent, wrapper, capability);
    let on_fulfilled = builtin_function(agent, "", 1, move |agent, _this, args, _new_target| {
        Completion::Normal(create_iter_result_object(agent, arg(args, 0), done))
    });
    let on_rejected = if done || !close_on_rejection {
        JsValue::Undefined
    } else {
        let record = record.clone();
        JsValue::Object(builtin_function(agent, "", 1, move |agent, _this, args, _new_target| {
            iterator_close(agent, &record, Completion::Throw(arg(args, 0)))
        }))
    };
    perform_promise_then(agent, &wrapper, JsValue::Object(on_fulfilled), on_rejected, Some(capability.clone()));
    Completion::Normal(JsValue::Object(capability.promise.clone()))
}

#[cfg(test)]
mod tests {
    use crate::evaluator::test_support::{eval_after_jobs, eval_to_string};

    #[test]
    fn array_iterators_track_live_length() {
        assert_eq!(eval_to_string("var a = [1, 2]; var out = []; for (var v of a) { out.push(v); if (a.length < 4) a.push(v * 10); } out.join()"), "1,2,10,20");
        assert_eq!(eval_to_string("[...['a', 'b'].entries()].join('|')"), "0,a|1,b");
        assert_eq!(eval_to_string("[...[7, 8].keys()].join()"), "0,1");
        assert_eq!(eval_to_string("Object.prototype.toString.call([].values())"), "[object Array Iterator]");
    }

    #[test]
    fn exhausted_array_iterators_stay_done() {
        assert_eq!(
            eval_to_string("var a = [1]; var it = a.values(); it.next(); it.next(); a.push(2); it.next().done"),
            "true"
        );
    }

    #[test]
    fn string_iterators_yield_code_points() {
        assert_eq!(eval_to_string("[...'a\\u{1F600}b'].length"), "3");
        assert_eq!(eval_to_string("var it = 'x'[Symbol.iterator](); it.next().value + it.next().done"), "xtrue");
    }

    #[test]
    fn for_in_walks_the_prototype_chain_once_per_key() {
        assert_eq!(
            eval_to_string("var p = { a: 1, shadow: 1 }; var o = Object.create(p); o.b = 2; o.shadow = 2; var k = []; for (var x in o) k.push(x); k.join()"),
            "b,shadow,a"
        );
        assert_eq!(
            eval_to_string("var o = { a: 1, b: 2 }; var k = []; for (var x in o) { k.push(x); delete o.b; } k.join()"),
            "a"
        );
        assert_eq!(eval_to_string("var k = []; for (var x in [5, 6]) k.push(typeof x); k.join()"), "string,string");
    }

    #[test]
    fn iterator_prototypes_return_themselves() {
        assert_eq!(eval_to_string("var it = [].values(); it[Symbol.iterator]() === it"), "true");
        assert_eq!(
            eval_to_string("var g = (function* () {})(); Object.getPrototypeOf(Object.getPrototypeOf(Object.getPrototypeOf(g))) === Object.getPrototypeOf(Object.getPrototypeOf([].values()))"),
            "true"
        );
    }

    #[test]
    fn async_from_sync_iterators_unwrap_promises() {
        assert_eq!(
            eval_after_jobs(
                "var out = [];
                 (async () => { for await (var v of [Promise.resolve(1), 2]) out.push(v); })();",
                "out.join()"
            ),
            "1,2"
        );
    }

    #[test]
    fn async_from_sync_closes_on_rejection() {
        assert_eq!(
            eval_after_jobs(
                "var closed = false, caught;
                 var iterable = { [Symbol.iterator]() { return { next() { return { value: Promise.reject('bad'), done: false }; }, return() { closed = true; return {}; } }; } };
                 (async () => { try { for await (var v of iterable) {} } catch (e) { caught = e; } })();",
                "caught + ',' + closed"
            ),
            "bad,true"
        );
    }
}
