//! §7.4 Operations on Iterator Objects.

use std::cell::Cell;

use crate::abstract_ops::conversion::to_boolean;
use crate::abstract_ops::{call, create_data_property_or_throw, get, get_method, make_basic_object};
use crate::completion::Completion;
use crate::engine::{Agent, ErrorKind, Message};
use crate::object::{JsObject, PropertyKey};
use crate::types::{JsValue, WellKnownSymbol};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum IteratorHint {
    Sync,
    Async,
}

/// §7.4.1 Iterator Records. `done` flips once the iterator is exhausted or
/// has thrown, after which it must not be closed.
#[derive(Clone, Debug)]
pub struct IteratorRecord {
    pub iterator: JsObject,
    pub next_method: JsValue,
    pub done: Cell<bool>,
}

// §7.4.2 GetIteratorFromMethod
pub fn get_iterator_from_method(
    agent: &Agent,
    obj: &JsValue,
    method: &JsValue,
) -> Completion<IteratorRecord> {
    let iterator = q!(call(agent, method, obj, &[]));
    let JsValue::Object(iterator) = iterator else {
        return agent.throw(ErrorKind::Type, Message::NotAnObject(agent.inspect(&iterator)));
    };
    let next_method = q!(get(agent, &iterator, &PropertyKey::from("next")));
    Completion::Normal(IteratorRecord {
        iterator,
        next_method,
        done: Cell::new(false),
    })
}

// §7.4.3 GetIterator
pub fn get_iterator(agent: &Agent, obj: &JsValue, hint: IteratorHint) -> Completion<IteratorRecord> {
    let method = match hint {
        IteratorHint::Async => {
            let method = q!(get_method(
                agent,
                obj,
                &PropertyKey::symbol(WellKnownSymbol::AsyncIterator)
            ));
            match method {
                Some(m) => Some(m),
                None => {
                    let sync = q!(get_method(agent, obj, &PropertyKey::symbol(WellKnownSymbol::Iterator)));
                    let Some(sync) = sync else {
                        return agent.throw(ErrorKind::Type, Message::NotIterable(agent.inspect(obj)));
                    };
                    let record = q!(get_iterator_from_method(agent, obj, &JsValue::Object(sync)));
                    return Completion::Normal(
                        crate::builtins::iterators::create_async_from_sync_iterator(agent, record),
                    );
                }
            }
        }
        IteratorHint::Sync => q!(get_method(agent, obj, &PropertyKey::symbol(WellKnownSymbol::Iterator))),
    };
    let Some(method) = method else {
        return agent.throw(ErrorKind::Type, Message::NotIterable(agent.inspect(obj)));
    };
    get_iterator_from_method(agent, obj, &JsValue::Object(method))
}

// §7.4.4 IteratorNext
pub fn iterator_next(agent: &Agent, record: &IteratorRecord, value: Option<JsValue>) -> Completion<JsObject> {
    let args: &[JsValue] = match &value {
        Some(v) => std::slice::from_ref(v),
        None => &[],
    };
    let result = call(agent, &record.next_method, &JsValue::Object(record.iterator.clone()), args);
    let result = match result {
        Completion::Normal(v) => v,
        abrupt => {
            record.done.set(true);
            return abrupt.into_abrupt();
        }
    };
    match result {
        JsValue::Object(o) => Completion::Normal(o),
        other => {
            record.done.set(true);
            agent.throw(ErrorKind::Type, Message::NotAnObject(agent.inspect(&other)))
        }
    }
}

// §7.4.5 IteratorComplete
pub fn iterator_complete(agent: &Agent, result: &JsObject) -> Completion<bool> {
    get(agent, result, &PropertyKey::from("done")).map(|v| to_boolean(&v))
}

// §7.4.6 IteratorValue
pub fn iterator_value(agent: &Agent, result: &JsObject) -> Completion {
    get(agent, result, &PropertyKey::from("value"))
}

// §7.4.7 IteratorStep
pub fn iterator_step(agent: &Agent, record: &IteratorRecord) -> Completion<Option<JsObject>> {
    let result = match iterator_next(agent, record, None) {
        Completion::Normal(result) => result,
        abrupt => {
            record.done.set(true);
            return abrupt.into_abrupt();
        }
    };
    let done = match iterator_complete(agent, &result) {
        Completion::Normal(done) => done,
        abrupt => {
            record.done.set(true);
            return abrupt.into_abrupt();
        }
    };
    if done {
        record.done.set(true);
        return Completion::Normal(None);
    }
    Completion::Normal(Some(result))
}

// §7.4.8 IteratorStepValue
pub fn iterator_step_value(agent: &Agent, record: &IteratorRecord) -> Completion<Option<JsValue>> {
    let Some(result) = q!(iterator_step(agent, record)) else {
        return Completion::Normal(None);
    };
    match iterator_value(agent, &result) {
        Completion::Normal(v) => Completion::Normal(Some(v)),
        abrupt => {
            record.done.set(true);
            abrupt.into_abrupt()
        }
    }
}

// §7.4.9 IteratorClose. `completion` is what the caller was about to
// produce; a throw in it wins over anything `return` does.
pub fn iterator_close<T>(agent: &Agent, record: &IteratorRecord, completion: Completion<T>) -> Completion<T> {
    let iterator = JsValue::Object(record.iterator.clone());
    let inner = get_method(agent, &iterator, &PropertyKey::from("return"));
    let inner = match inner {
        Completion::Normal(Some(ret)) => call(agent, &JsValue::Object(ret), &iterator, &[]),
        Completion::Normal(None) => return completion,
        abrupt => abrupt.into_abrupt(),
    };
    if completion.is_throw() {
        return completion;
    }
    match inner {
        Completion::Normal(JsValue::Object(_)) => completion,
        Completion::Normal(other) => {
            agent.throw(ErrorKind::Type, Message::NotAnObject(agent.inspect(&other)))
        }
        abrupt => abrupt.into_abrupt(),
    }
}

// §7.4.14 CreateIterResultObject
pub fn create_iter_result_object(agent: &Agent, value: JsValue, done: bool) -> JsValue {
    let obj = make_basic_object(agent);
    x!(create_data_property_or_throw(agent, &obj, PropertyKey::from("value"), value));
    x!(create_data_property_or_throw(agent, &obj, PropertyKey::from("done"), JsValue::Boolean(done)));
    JsValue::Object(obj)
}

// §7.4.16 IteratorToList over an iterable value
pub fn iterable_to_list(agent: &Agent, items: &JsValue) -> Completion<Vec<JsValue>> {
    let record = q!(get_iterator(agent, items, IteratorHint::Sync));
    let mut values = Vec::new();
    while let Some(value) = q!(iterator_step_value(agent, &record)) {
        values.push(value);
    }
    Completion::Normal(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abstract_ops::create_array_from_list;
    use crate::engine::test_agent;

    #[test]
    fn array_values_iterate_in_order() {
        let agent = test_agent();
        let array = create_array_from_list(&agent, &[JsValue::Number(1.0), JsValue::Number(2.0)]);
        let list = x!(iterable_to_list(&agent, &JsValue::Object(array)));
        assert_eq!(list.len(), 2);
        assert!(matches!(list[1], JsValue::Number(n) if n == 2.0));
    }

    #[test]
    fn non_iterables_throw() {
        let agent = test_agent();
        assert!(get_iterator(&agent, &JsValue::Number(1.0), IteratorHint::Sync).is_throw());
    }
}
