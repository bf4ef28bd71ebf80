//! §25.5 The JSON object.
//!
//! Parsing works on UTF-16 code units so lone surrogates inside string
//! literals survive a round trip. Serialization likewise builds its output
//! as code units.

use crate::abstract_ops::conversion::{to_integer_or_infinity, to_number, to_string};
use crate::abstract_ops::{
    EnumerableKind, call, create_array_from_list, create_data_property, enumerable_own_properties, get, get_v, is_array,
    length_of_array_like, make_basic_object,
};
use crate::builtins::{arg, define_method, define_tag, plain_object};
use crate::completion::Completion;
use crate::engine::{Agent, ErrorKind, IntrinsicId, Message, Realm};
use crate::object::{JsObject, ObjectKind, PropertyKey};
use crate::types::{JsString, JsValue, number_ops};

/// Deepest array/object nesting accepted by `JSON.parse`.
const MAX_NESTING: usize = 512;

pub(super) fn init(realm: &Realm) {
    let json = plain_object(realm);
    define_method(realm, &json, "parse", 2, json_parse);
    define_method(realm, &json, "stringify", 3, json_stringify);
    define_tag(&json, "JSON");
    realm.set_intrinsic(IntrinsicId::Json, json);
}

// §25.5.1 JSON.parse ( text [ , reviver ] )
fn json_parse(agent: &Agent, _this: &JsValue, args: &[JsValue]) -> Completion {
    let text = q!(to_string(agent, &arg(args, 0)));
    let mut parser = Parser { agent, units: text.units(), pos: 0, depth: 0 };
    parser.skip_whitespace();
    let unfiltered = q!(parser.value());
    parser.skip_whitespace();
    if parser.pos < parser.units.len() {
        return parser.unexpected();
    }
    let reviver = arg(args, 1);
    if !reviver.is_callable() {
        return Completion::Normal(unfiltered);
    }
    let root = make_basic_object(agent);
    x!(create_data_property(agent, &root, PropertyKey::from(""), unfiltered));
    internalize_json_property(agent, &root, PropertyKey::from(""), &reviver)
}

struct Parser<'a> {
    agent: &'a Agent,
    units: &'a [u16],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<u16> {
        self.units.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(0x09 | 0x0A | 0x0D | 0x20)) {
            self.pos += 1;
        }
    }

    fn unexpected<T>(&self) -> Completion<T> {
        let detail = match self.peek() {
            Some(u) => format!("'{}' at position {}", String::from_utf16_lossy(&[u]), self.pos),
            None => "end of input".to_owned(),
        };
        self.agent.throw(ErrorKind::Syntax, Message::JsonParse(detail))
    }

    fn expect(&mut self, unit: u8) -> Completion<()> {
        if self.peek() != Some(u16::from(unit)) {
            return self.unexpected();
        }
        self.pos += 1;
        Completion::Normal(())
    }

    fn keyword(&mut self, word: &str, value: JsValue) -> Completion {
        for b in word.bytes() {
            q!(self.expect(b));
        }
        Completion::Normal(value)
    }

    fn value(&mut self) -> Completion {
        match self.peek().map(|u| u8::try_from(u).unwrap_or(0)) {
            Some(b'{') => self.nested(Self::object),
            Some(b'[') => self.nested(Self::array),
            Some(b'"') => self.string().map(JsValue::String),
            Some(b't') => self.keyword("true", JsValue::Boolean(true)),
            Some(b'f') => self.keyword("false", JsValue::Boolean(false)),
            Some(b'n') => self.keyword("null", JsValue::Null),
            Some(b'-' | b'0'..=b'9') => self.number(),
            _ => self.unexpected(),
        }
    }

    fn nested(&mut self, body: fn(&mut Self) -> Completion) -> Completion {
        if self.depth == MAX_NESTING {
            return self.agent.throw(ErrorKind::Range, Message::StackOverflow);
        }
        self.depth += 1;
        let result = body(self);
        self.depth -= 1;
        result
    }

    fn object(&mut self) -> Completion {
        q!(self.expect(b'{'));
        let object = make_basic_object(self.agent);
        self.skip_whitespace();
        if self.peek() == Some(u16::from(b'}')) {
            self.pos += 1;
            return Completion::Normal(JsValue::Object(object));
        }
        loop {
            self.skip_whitespace();
            if self.peek() != Some(u16::from(b'"')) {
                return self.unexpected();
            }
            let key = q!(self.string());
            self.skip_whitespace();
            q!(self.expect(b':'));
            self.skip_whitespace();
            let value = q!(self.value());
            q!(create_data_property(self.agent, &object, PropertyKey::from(key), value));
            self.skip_whitespace();
            match self.peek() {
                Some(0x2C) => self.pos += 1,
                Some(0x7D) => {
                    self.pos += 1;
                    return Completion::Normal(JsValue::Object(object));
                }
                _ => return self.unexpected(),
            }
        }
    }

    fn array(&mut self) -> Completion {
        q!(self.expect(b'['));
        let mut elements = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(u16::from(b']')) {
            self.pos += 1;
            return Completion::Normal(JsValue::Object(create_array_from_list(self.agent, &elements)));
        }
        loop {
            self.skip_whitespace();
            elements.push(q!(self.value()));
            self.skip_whitespace();
            match self.peek() {
                Some(0x2C) => self.pos += 1,
                Some(0x5D) => {
                    self.pos += 1;
                    return Completion::Normal(JsValue::Object(create_array_from_list(self.agent, &elements)));
                }
                _ => return self.unexpected(),
            }
        }
    }

    fn string(&mut self) -> Completion<JsString> {
        q!(self.expect(b'"'));
        let mut out = Vec::new();
        loop {
            let Some(u) = self.peek() else {
                return self.unexpected();
            };
            self.pos += 1;
            match u {
                0x22 => return Completion::Normal(JsString::from_units(out)),
                0x5C => {
                    let Some(escape) = self.peek() else {
                        return self.unexpected();
                    };
                    self.pos += 1;
                    let decoded = match u8::try_from(escape).unwrap_or(0) {
                        b'"' => 0x22,
                        b'\\' => 0x5C,
                        b'/' => 0x2F,
                        b'b' => 0x08,
                        b'f' => 0x0C,
                        b'n' => 0x0A,
                        b'r' => 0x0D,
                        b't' => 0x09,
                        b'u' => q!(self.hex4()),
                        _ => {
                            self.pos -= 1;
                            return self.unexpected();
                        }
                    };
                    out.push(decoded);
                }
                u if u < 0x20 => {
                    self.pos -= 1;
                    return self.unexpected();
                }
                u => out.push(u),
            }
        }
    }

    fn hex4(&mut self) -> Completion<u16> {
        let mut value = 0u16;
        for _ in 0..4 {
            let digit = self.peek().and_then(|u| char::from_u32(u32::from(u))).and_then(|c| c.to_digit(16));
            let Some(digit) = digit else {
                return self.unexpected();
            };
            value = value * 16 + digit as u16;
            self.pos += 1;
        }
        Completion::Normal(value)
    }

    fn number(&mut self) -> Completion {
        let start = self.pos;
        let is_digit = |u: Option<u16>| matches!(u, Some(0x30..=0x39));
        if self.peek() == Some(u16::from(b'-')) {
            self.pos += 1;
        }
        match self.peek() {
            Some(0x30) => self.pos += 1,
            Some(0x31..=0x39) => {
                while is_digit(self.peek()) {
                    self.pos += 1;
                }
            }
            _ => return self.unexpected(),
        }
        if self.peek() == Some(u16::from(b'.')) {
            self.pos += 1;
            if !is_digit(self.peek()) {
                return self.unexpected();
            }
            while is_digit(self.peek()) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some(0x45 | 0x65)) {
            self.pos += 1;
            if matches!(self.peek(), Some(0x2B | 0x2D)) {
                self.pos += 1;
            }
            if !is_digit(self.peek()) {
                return self.unexpected();
            }
            while is_digit(self.peek()) {
                self.pos += 1;
            }
        }
        let literal = String::from_utf16_lossy(&self.units[start..self.pos]);
        Completion::Normal(JsValue::Number(literal.parse::<f64>().unwrap_or(f64::NAN)))
    }
}

// §25.5.1.1 InternalizeJSONProperty
fn internalize_json_property(agent: &Agent, holder: &JsObject, name: PropertyKey, reviver: &JsValue) -> Completion {
    let value = q!(get(agent, holder, &name));
    if let JsValue::Object(object) = &value {
        if q!(is_array(agent, &value)) {
            let len = q!(length_of_array_like(agent, object));
            for index in 0..len {
                q!(revive_member(agent, object, PropertyKey::from_f64(index as f64), reviver));
            }
        } else {
            let keys = q!(enumerable_own_properties(agent, object, EnumerableKind::Key));
            for key in keys {
                let JsValue::String(key) = key else { continue };
                q!(revive_member(agent, object, PropertyKey::from(key), reviver));
            }
        }
    }
    let name = name.to_value();
    call(agent, reviver, &JsValue::Object(holder.clone()), &[name, value])
}

fn revive_member(agent: &Agent, object: &JsObject, key: PropertyKey, reviver: &JsValue) -> Completion<()> {
    let element = q!(internalize_json_property(agent, object, key.clone(), reviver));
    if element.is_undefined() {
        q!(object.delete(agent, &key));
    } else {
        q!(create_data_property(agent, object, key, element));
    }
    Completion::Normal(())
}

/// JSON Serialization Record (§25.5.2.1).
struct Serializer<'a> {
    agent: &'a Agent,
    replacer: Option<JsValue>,
    property_list: Option<Vec<JsString>>,
    stack: Vec<JsObject>,
    indent: Vec<u16>,
    gap: Vec<u16>,
}

// §25.5.2 JSON.stringify ( value [ , replacer [ , space ] ] )
fn json_stringify(agent: &Agent, _this: &JsValue, args: &[JsValue]) -> Completion {
    let replacer = arg(args, 1);
    let mut serializer = Serializer {
        agent,
        replacer: None,
        property_list: None,
        stack: Vec::new(),
        indent: Vec::new(),
        gap: Vec::new(),
    };
    if let JsValue::Object(r) = &replacer {
        if r.is_callable() {
            serializer.replacer = Some(replacer.clone());
        } else if q!(is_array(agent, &replacer)) {
            serializer.property_list = Some(q!(property_list(agent, r)));
        }
    }
    serializer.gap = q!(gap(agent, arg(args, 2)));

    let wrapper = make_basic_object(agent);
    x!(create_data_property(agent, &wrapper, PropertyKey::from(""), arg(args, 0)));
    let serialized = q!(serializer.property(&PropertyKey::from(""), &wrapper));
    Completion::Normal(serialized.map_or(JsValue::Undefined, |units| JsValue::String(JsString::from_units(units))))
}

/// Keys named by an array replacer, deduplicated in first-seen order.
fn property_list(agent: &Agent, replacer: &JsObject) -> Completion<Vec<JsString>> {
    let len = q!(length_of_array_like(agent, replacer));
    let mut list: Vec<JsString> = Vec::new();
    for index in 0..len {
        let v = q!(get(agent, replacer, &PropertyKey::from_f64(index as f64)));
        let item = match &v {
            JsValue::String(s) => Some(s.clone()),
            JsValue::Number(_) => Some(q!(to_string(agent, &v))),
            JsValue::Object(o) if matches!(o.borrow().kind, ObjectKind::String(_) | ObjectKind::Number(_)) => {
                Some(q!(to_string(agent, &v)))
            }
            _ => None,
        };
        if let Some(item) = item
            && !list.contains(&item)
        {
            list.push(item);
        }
    }
    Completion::Normal(list)
}

/// The indentation unit named by the `space` argument.
fn gap(agent: &Agent, space: JsValue) -> Completion<Vec<u16>> {
    let space = match unbox(&space) {
        Boxed::Number => JsValue::Number(q!(to_number(agent, &space))),
        Boxed::String => JsValue::String(q!(to_string(agent, &space))),
        _ => space,
    };
    Completion::Normal(match space {
        JsValue::Number(_) => {
            let count = q!(to_integer_or_infinity(agent, &space)).clamp(0.0, 10.0) as usize;
            vec![u16::from(b' '); count]
        }
        JsValue::String(s) => s.units()[..s.len().min(10)].to_vec(),
        _ => Vec::new(),
    })
}

/// Primitive wrapper objects serialize as their primitive value.
enum Boxed {
    Number,
    String,
    Primitive(JsValue),
    No,
}

fn unbox(value: &JsValue) -> Boxed {
    let JsValue::Object(o) = value else {
        return Boxed::No;
    };
    match &o.borrow().kind {
        ObjectKind::Number(_) => Boxed::Number,
        ObjectKind::String(_) => Boxed::String,
        ObjectKind::Boolean(b) => Boxed::Primitive(JsValue::Boolean(*b)),
        ObjectKind::BigInt(b) => Boxed::Primitive(JsValue::BigInt(b.clone())),
        _ => Boxed::No,
    }
}

fn ascii(text: &str) -> Vec<u16> {
    text.encode_utf16().collect()
}

impl Serializer<'_> {
    // §25.5.2.2 SerializeJSONProperty
    fn property(&mut self, key: &PropertyKey, holder: &JsObject) -> Completion<Option<Vec<u16>>> {
        let agent = self.agent;
        let mut value = q!(get(agent, holder, key));
        if matches!(value, JsValue::Object(_) | JsValue::BigInt(_)) {
            let to_json = q!(get_v(agent, &value, &PropertyKey::from("toJSON")));
            if to_json.is_callable() {
                value = q!(call(agent, &to_json, &value, &[key.to_value()]));
            }
        }
        if let Some(replacer) = &self.replacer {
            value = q!(call(agent, replacer, &JsValue::Object(holder.clone()), &[key.to_value(), value]));
        }
        value = match unbox(&value) {
            Boxed::Number => JsValue::Number(q!(to_number(agent, &value))),
            Boxed::String => JsValue::String(q!(to_string(agent, &value))),
            Boxed::Primitive(v) => v,
            Boxed::No => value,
        };
        let text = match &value {
            JsValue::Null => ascii("null"),
            JsValue::Boolean(true) => ascii("true"),
            JsValue::Boolean(false) => ascii("false"),
            JsValue::String(s) => quote(s.units()),
            JsValue::Number(n) if n.is_finite() => number_ops::to_string(*n).encode_utf16().collect(),
            JsValue::Number(_) => ascii("null"),
            JsValue::BigInt(_) => return agent.throw(ErrorKind::Type, Message::BigIntSerialize),
            JsValue::Object(o) if !o.is_callable() => {
                if q!(is_array(agent, &value)) {
                    q!(self.array(o))
                } else {
                    q!(self.object(o))
                }
            }
            _ => return Completion::Normal(None),
        };
        Completion::Normal(Some(text))
    }

    fn enter(&mut self, value: &JsObject) -> Completion<Vec<u16>> {
        if self.stack.iter().any(|o| o.ptr_eq(value)) {
            return self.agent.throw(ErrorKind::Type, Message::JsonCircular);
        }
        self.stack.push(value.clone());
        let stepback = self.indent.clone();
        self.indent.extend_from_slice(&self.gap);
        Completion::Normal(stepback)
    }

    fn leave(&mut self, stepback: Vec<u16>) {
        self.stack.pop();
        self.indent = stepback;
    }

    fn wrap(&self, open: u8, close: u8, partial: Vec<Vec<u16>>, stepback: &[u16]) -> Vec<u16> {
        let mut out = vec![u16::from(open)];
        if partial.is_empty() {
            out.push(u16::from(close));
            return out;
        }
        let pretty = !self.gap.is_empty();
        for (i, member) in partial.into_iter().enumerate() {
            if i > 0 {
                out.push(u16::from(b','));
            }
            if pretty {
                out.push(u16::from(b'\n'));
                out.extend_from_slice(&self.indent);
            }
            out.extend(member);
        }
        if pretty {
            out.push(u16::from(b'\n'));
            out.extend_from_slice(stepback);
        }
        out.push(u16::from(close));
        out
    }

    // §25.5.2.5 SerializeJSONObject
    fn object(&mut self, value: &JsObject) -> Completion<Vec<u16>> {
        let stepback = q!(self.enter(value));
        let result = self.object_members(value).map(|partial| self.wrap(b'{', b'}', partial, &stepback));
        self.leave(stepback);
        result
    }

    fn object_members(&mut self, value: &JsObject) -> Completion<Vec<Vec<u16>>> {
        let keys: Vec<JsString> = match &self.property_list {
            Some(list) => list.clone(),
            None => q!(enumerable_own_properties(self.agent, value, EnumerableKind::Key))
                .into_iter()
                .filter_map(|k| if let JsValue::String(s) = k { Some(s) } else { None })
                .collect(),
        };
        let mut partial = Vec::new();
        for key in keys {
            let Some(text) = q!(self.property(&PropertyKey::from(key.clone()), value)) else {
                continue;
            };
            let mut member = quote(key.units());
            member.push(u16::from(b':'));
            if !self.gap.is_empty() {
                member.push(u16::from(b' '));
            }
            member.extend(text);
            partial.push(member);
        }
        Completion::Normal(partial)
    }

    // §25.5.2.6 SerializeJSONArray
    fn array(&mut self, value: &JsObject) -> Completion<Vec<u16>> {
        let stepback = q!(self.enter(value));
        let result = self.array_elements(value).map(|partial| self.wrap(b'[', b']', partial, &stepback));
        self.leave(stepback);
        result
    }

    fn array_elements(&mut self, value: &JsObject) -> Completion<Vec<Vec<u16>>> {
        let len = q!(length_of_array_like(self.agent, value));
        let mut partial = Vec::new();
        for index in 0..len {
            let text = q!(self.property(&PropertyKey::from_f64(index as f64), value));
            partial.push(text.unwrap_or_else(|| ascii("null")));
        }
        Completion::Normal(partial)
    }
}

// §25.5.2.3 QuoteJSONString
fn quote(units: &[u16]) -> Vec<u16> {
    let mut out = Vec::with_capacity(units.len() + 2);
    out.push(u16::from(b'"'));
    let mut i = 0;
    while i < units.len() {
        let u = units[i];
        let short = match u {
            0x08 => Some(b'b'),
            0x09 => Some(b't'),
            0x0A => Some(b'n'),
            0x0C => Some(b'f'),
            0x0D => Some(b'r'),
            0x22 => Some(b'"'),
            0x5C => Some(b'\\'),
            _ => None,
        };
        if let Some(c) = short {
            out.extend([u16::from(b'\\'), u16::from(c)]);
        } else if u < 0x20 {
            out.extend(format!("\\u{u:04x}").encode_utf16());
        } else if (0xD800..0xDC00).contains(&u) && units.get(i + 1).is_some_and(|n| (0xDC00..0xE000).contains(n)) {
            out.extend([u, units[i + 1]]);
            i += 1;
        } else if (0xD800..0xE000).contains(&u) {
            out.extend(format!("\\u{u:04x}").encode_utf16());
        } else {
            out.push(u);
        }
        i += 1;
    }
    out.push(u16::from(b'"'));
    out
}

#[cfg(test)]
mod tests {
    use crate::evaluator::test_support::eval_to_string;

    #[test]
    fn parse_builds_values() {
        assert_eq!(eval_to_string("JSON.parse(' [1, -2.5e1, \"a\\\\u0041\", true, null, {}] ').join('|')"), "1|-25|aA|true||[object Object]");
        assert_eq!(eval_to_string("var o = JSON.parse('{\"a\": {\"b\": [1, 2]}, \"a\": 3}'); o.a"), "3");
        assert_eq!(eval_to_string("Object.getPrototypeOf(JSON.parse('{\"__proto__\": 1}')) === Object.prototype"), "true");
    }

    #[test]
    fn parse_rejects_malformed_text() {
        for text in ["'{'", "'[1,]'", "'01'", "'1.'", "'\"\\\\x\"'", "'tru'", "'1 2'", "'{\"a\" 1}'", "''"] {
            let result = eval_to_string(&format!("JSON.parse({text})"));
            assert!(result.starts_with("Throw: SyntaxError"), "{text}: {result}");
        }
    }

    #[test]
    fn reviver_sees_members_bottom_up() {
        let src = "var seen = []; \
                   var r = JSON.parse('{\"a\": [1, 2], \"b\": 3}', function (k, v) { \
                     seen.push(k); return typeof v === 'number' && v > 1 ? undefined : v; }); \
                   seen.join(',') + ';' + JSON.stringify(r)";
        assert_eq!(eval_to_string(src), "0,1,a,b,;{\"a\":[1,null]}");
    }

    #[test]
    fn stringify_handles_primitives_and_wrappers() {
        assert_eq!(eval_to_string("JSON.stringify({a: [1, 'x', null, undefined, NaN], b: undefined, c: () => 1})"), "{\"a\":[1,\"x\",null,null,null]}");
        assert_eq!(eval_to_string("JSON.stringify([new Number(3), new String('s'), new Boolean(false)])"), "[3,\"s\",false]");
        assert_eq!(eval_to_string("String(JSON.stringify(undefined))"), "undefined");
        assert_eq!(eval_to_string("JSON.stringify('\\u2028\\ud800\\n\"')"), "\"\u{2028}\\ud800\\n\\\"\"");
        assert!(eval_to_string("JSON.stringify(1n)").starts_with("Throw: TypeError"));
    }

    #[test]
    fn stringify_calls_to_json_and_replacers() {
        assert_eq!(eval_to_string("JSON.stringify({ d: { toJSON(k) { return 'at ' + k; } } })"), "{\"d\":\"at d\"}");
        assert_eq!(eval_to_string("JSON.stringify({a: 1, b: 2, c: 3}, ['c', 'a', 'c'])"), "{\"c\":3,\"a\":1}");
        assert_eq!(
            eval_to_string("JSON.stringify({a: 1, b: 'x'}, function (k, v) { return typeof v === 'number' ? v * 10 : v; })"),
            "{\"a\":10,\"b\":\"x\"}"
        );
    }

    #[test]
    fn stringify_indents() {
        assert_eq!(eval_to_string("JSON.stringify({a: [1], b: {}}, null, 2)"), "{\n  \"a\": [\n    1\n  ],\n  \"b\": {}\n}");
        assert_eq!(eval_to_string("JSON.stringify([1], null, '--')"), "[\n--1\n]");
        assert_eq!(eval_to_string("JSON.stringify([1], null, 20).split('\\n')[1].length"), "11");
    }

    #[test]
    fn stringify_detects_cycles() {
        let result = eval_to_string("var a = []; a.push({ back: a }); JSON.stringify(a)");
        assert!(result.starts_with("Throw: TypeError"), "{result}");
        assert_eq!(eval_to_string("var shared = {}; JSON.stringify([shared, shared])"), "[{},{}]");
    }
}
