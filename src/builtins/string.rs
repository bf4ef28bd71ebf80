//! §22.1 String objects.

use crate::abstract_ops::conversion::{
    is_js_whitespace, relative_index, to_integer_or_infinity, to_length, to_number, to_object, to_string, to_uint16,
    to_uint32,
};
use crate::abstract_ops::{
    call, create_array_from_list, get, get_method, get_prototype_from_constructor, is_regexp, length_of_array_like,
    require_object_coercible,
};
use crate::builtins::iterators::create_string_iterator;
use crate::builtins::{arg, define_constructor, define_method};
use crate::completion::Completion;
use crate::engine::{Agent, ErrorKind, IntrinsicId, Message, Realm};
use crate::object::string::string_create;
use crate::object::{JsObject, ObjectKind, PropertyKey};
use crate::types::{JsString, JsValue, WellKnownSymbol};

/// Longest string `repeat` and the padding methods will build.
const MAX_STRING_LENGTH: usize = (1 << 30) - 25;

pub(super) fn init(realm: &Realm) {
    let proto = string_create(JsString::empty(), realm.intrinsic(IntrinsicId::ObjectPrototype));
    realm.set_intrinsic(IntrinsicId::StringPrototype, proto.clone());

    define_method(realm, &proto, "at", 1, at);
    define_method(realm, &proto, "charAt", 1, char_at);
    define_method(realm, &proto, "charCodeAt", 1, char_code_at);
    define_method(realm, &proto, "codePointAt", 1, code_point_at);
    define_method(realm, &proto, "concat", 1, concat);
    define_method(realm, &proto, "endsWith", 1, ends_with);
    define_method(realm, &proto, "includes", 1, includes);
    define_method(realm, &proto, "indexOf", 1, index_of);
    define_method(realm, &proto, "lastIndexOf", 1, last_index_of);
    define_method(realm, &proto, "padEnd", 1, |agent, this, args| pad(agent, this, args, false));
    define_method(realm, &proto, "padStart", 1, |agent, this, args| pad(agent, this, args, true));
    define_method(realm, &proto, "repeat", 1, repeat);
    define_method(realm, &proto, "slice", 2, slice);
    define_method(realm, &proto, "split", 2, split);
    define_method(realm, &proto, "startsWith", 1, starts_with);
    define_method(realm, &proto, "substring", 2, substring);
    define_method(realm, &proto, "toLowerCase", 0, |agent, this, _| change_case(agent, this, false));
    define_method(realm, &proto, "toString", 0, |agent, this, _| this_string_value(agent, this).map(JsValue::String));
    define_method(realm, &proto, "toUpperCase", 0, |agent, this, _| change_case(agent, this, true));
    define_method(realm, &proto, "trim", 0, |agent, this, _| trim(agent, this, true, true));
    define_method(realm, &proto, "trimEnd", 0, |agent, this, _| trim(agent, this, false, true));
    define_method(realm, &proto, "trimStart", 0, |agent, this, _| trim(agent, this, true, false));
    define_method(realm, &proto, "valueOf", 0, |agent, this, _| this_string_value(agent, this).map(JsValue::String));
    define_method(realm, &proto, PropertyKey::symbol(WellKnownSymbol::Iterator), 0, |agent, this, _| {
        let s = q!(this_str(agent, this));
        Completion::Normal(JsValue::Object(create_string_iterator(agent, s)))
    });

    let ctor = define_constructor(realm, "String", 1, string_constructor, &proto);
    define_method(realm, &ctor, "fromCharCode", 1, from_char_code);
    define_method(realm, &ctor, "fromCodePoint", 1, from_code_point);
    define_method(realm, &ctor, "raw", 1, raw);
    realm.set_intrinsic(IntrinsicId::String, ctor);
}

// §22.1.1.1 String ( value )
fn string_constructor(agent: &Agent, _this: &JsValue, args: &[JsValue], new_target: Option<&JsObject>) -> Completion {
    let s = match args.first() {
        None => JsString::empty(),
        Some(JsValue::Symbol(sym)) if new_target.is_none() => sym.descriptive_string(),
        Some(value) => q!(to_string(agent, value)),
    };
    let Some(new_target) = new_target else {
        return Completion::Normal(JsValue::String(s));
    };
    let proto = q!(get_prototype_from_constructor(agent, new_target, IntrinsicId::StringPrototype));
    Completion::Normal(JsValue::Object(string_create(s, proto)))
}

// §22.1.3.35.1 thisStringValue
fn this_string_value(agent: &Agent, value: &JsValue) -> Completion<JsString> {
    match value {
        JsValue::String(s) => return Completion::Normal(s.clone()),
        JsValue::Object(o) => {
            if let ObjectKind::String(s) = &o.borrow().kind {
                return Completion::Normal(s.clone());
            }
        }
        _ => {}
    }
    agent.throw(ErrorKind::Type, Message::NotATypeObject(agent.inspect(value), "String"))
}

/// RequireObjectCoercible(this) then ToString, the prologue of the
/// generic prototype methods.
fn this_str(agent: &Agent, this: &JsValue) -> Completion<JsString> {
    q!(require_object_coercible(agent, this));
    to_string(agent, this)
}

fn integer_arg(agent: &Agent, args: &[JsValue], index: usize) -> Completion<f64> {
    to_integer_or_infinity(agent, &arg(args, index))
}

fn clamp(n: f64, len: usize) -> usize {
    n.clamp(0.0, len as f64) as usize
}

// §22.1.3.1 String.prototype.at
fn at(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let s = q!(this_str(agent, this));
    let relative = q!(integer_arg(agent, args, 0));
    let k = if relative >= 0.0 { relative } else { s.len() as f64 + relative };
    if k < 0.0 || k >= s.len() as f64 {
        return Completion::Normal(JsValue::Undefined);
    }
    let k = k as usize;
    Completion::Normal(JsValue::String(s.slice(k, k + 1)))
}

// §22.1.3.2 String.prototype.charAt
fn char_at(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let s = q!(this_str(agent, this));
    let position = q!(integer_arg(agent, args, 0));
    if position < 0.0 || position >= s.len() as f64 {
        return Completion::Normal(JsValue::String(JsString::empty()));
    }
    let p = position as usize;
    Completion::Normal(JsValue::String(s.slice(p, p + 1)))
}

// §22.1.3.3 String.prototype.charCodeAt
fn char_code_at(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let s = q!(this_str(agent, this));
    let position = q!(integer_arg(agent, args, 0));
    if position < 0.0 || position >= s.len() as f64 {
        return Completion::Normal(JsValue::Number(f64::NAN));
    }
    Completion::Normal(JsValue::Number(f64::from(s.units()[position as usize])))
}

// §22.1.3.4 String.prototype.codePointAt
fn code_point_at(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let s = q!(this_str(agent, this));
    let position = q!(integer_arg(agent, args, 0));
    if position < 0.0 || position >= s.len() as f64 {
        return Completion::Normal(JsValue::Undefined);
    }
    let (cp, _) = s.code_point_at(position as usize);
    Completion::Normal(JsValue::Number(f64::from(cp)))
}

// §22.1.3.5 String.prototype.concat
fn concat(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let mut r = q!(this_str(agent, this));
    for next in args {
        let next = q!(to_string(agent, next));
        r = r.concat(&next);
    }
    Completion::Normal(JsValue::String(r))
}

/// The search string of includes/startsWith/endsWith, rejecting RegExps.
fn search_string(agent: &Agent, value: &JsValue, method: &str) -> Completion<JsString> {
    if q!(is_regexp(agent, value)) {
        return agent.throw(ErrorKind::Type, Message::RegExpArgumentNotAllowed(method.to_owned()));
    }
    to_string(agent, value)
}

// §22.1.3.7 String.prototype.endsWith
fn ends_with(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let s = q!(this_str(agent, this));
    let search = q!(search_string(agent, &arg(args, 0), "endsWith"));
    let end = match arg(args, 1) {
        JsValue::Undefined => s.len(),
        end => clamp(q!(to_integer_or_infinity(agent, &end)), s.len()),
    };
    let Some(start) = end.checked_sub(search.len()) else {
        return Completion::Normal(JsValue::Boolean(false));
    };
    Completion::Normal(JsValue::Boolean(s.units()[start..end] == *search.units()))
}

// §22.1.3.8 String.prototype.includes
fn includes(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let s = q!(this_str(agent, this));
    let search = q!(search_string(agent, &arg(args, 0), "includes"));
    let start = clamp(q!(integer_arg(agent, args, 1)), s.len());
    Completion::Normal(JsValue::Boolean(s.index_of(&search, start).is_some()))
}

// §22.1.3.9 String.prototype.indexOf
fn index_of(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let s = q!(this_str(agent, this));
    let search = q!(to_string(agent, &arg(args, 0)));
    let start = clamp(q!(integer_arg(agent, args, 1)), s.len());
    let found = s.index_of(&search, start).map_or(-1.0, |i| i as f64);
    Completion::Normal(JsValue::Number(found))
}

// §22.1.3.11 String.prototype.lastIndexOf
fn last_index_of(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let s = q!(this_str(agent, this));
    let search = q!(to_string(agent, &arg(args, 0)));
    let num_pos = q!(to_number(agent, &arg(args, 1)));
    let pos = if num_pos.is_nan() {
        f64::INFINITY
    } else {
        q!(to_integer_or_infinity(agent, &JsValue::Number(num_pos)))
    };
    let start = clamp(pos, s.len());
    let found = s.last_index_of(&search, start).map_or(-1.0, |i| i as f64);
    Completion::Normal(JsValue::Number(found))
}

// §22.1.3.17.2 StringPad via padStart/padEnd
fn pad(agent: &Agent, this: &JsValue, args: &[JsValue], at_start: bool) -> Completion {
    let s = q!(this_str(agent, this));
    let max_length = q!(to_length(agent, &arg(args, 0)));
    let len = s.len() as u64;
    if max_length <= len {
        return Completion::Normal(JsValue::String(s));
    }
    let filler = match arg(args, 1) {
        JsValue::Undefined => JsString::from_str(" "),
        fill => q!(to_string(agent, &fill)),
    };
    if filler.is_empty() {
        return Completion::Normal(JsValue::String(s));
    }
    if max_length > MAX_STRING_LENGTH as u64 {
        return agent.throw(ErrorKind::Range, Message::OutOfRange(max_length.to_string()));
    }
    let fill_len = (max_length - len) as usize;
    let padding: Vec<u16> = filler.units().iter().copied().cycle().take(fill_len).collect();
    let padding = JsString::from_units(padding);
    let result = if at_start { padding.concat(&s) } else { s.concat(&padding) };
    Completion::Normal(JsValue::String(result))
}

// §22.1.3.18 String.prototype.repeat
fn repeat(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let s = q!(this_str(agent, this));
    let n = q!(integer_arg(agent, args, 0));
    if n < 0.0 || n == f64::INFINITY {
        return agent.throw(ErrorKind::Range, Message::StringRepeatCount(agent.inspect(&arg(args, 0))));
    }
    if n == 0.0 || s.is_empty() {
        return Completion::Normal(JsValue::String(JsString::empty()));
    }
    if s.len() as f64 * n > MAX_STRING_LENGTH as f64 {
        return agent.throw(ErrorKind::Range, Message::StringRepeatCount(agent.inspect(&arg(args, 0))));
    }
    Completion::Normal(JsValue::String(JsString::from_units(s.units().repeat(n as usize))))
}

// §22.1.3.22 String.prototype.slice
fn slice(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let s = q!(this_str(agent, this));
    let len = s.len() as u64;
    let from = relative_index(q!(integer_arg(agent, args, 0)), len);
    let to = match arg(args, 1) {
        JsValue::Undefined => len,
        end => relative_index(q!(to_integer_or_infinity(agent, &end)), len),
    };
    Completion::Normal(JsValue::String(s.slice(from as usize, to as usize)))
}

// §22.1.3.23 String.prototype.split
fn split(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    q!(require_object_coercible(agent, this));
    let separator = arg(args, 0);
    let limit = arg(args, 1);
    if !separator.is_nullish() {
        let splitter = q!(get_method(agent, &separator, &PropertyKey::symbol(WellKnownSymbol::Split)));
        if let Some(splitter) = splitter {
            return call(agent, &JsValue::Object(splitter), &separator, &[this.clone(), limit]);
        }
    }
    let s = q!(to_string(agent, this));
    let lim = match limit {
        JsValue::Undefined => u32::MAX as usize,
        limit => q!(to_uint32(agent, &limit)) as usize,
    };
    let r = q!(to_string(agent, &separator));
    if lim == 0 {
        return Completion::Normal(JsValue::Object(create_array_from_list(agent, &[])));
    }
    if separator.is_undefined() {
        return Completion::Normal(JsValue::Object(create_array_from_list(agent, &[JsValue::String(s)])));
    }
    let len = s.len();
    if r.is_empty() {
        let head: Vec<JsValue> = (0..len.min(lim)).map(|i| JsValue::String(s.slice(i, i + 1))).collect();
        return Completion::Normal(JsValue::Object(create_array_from_list(agent, &head)));
    }
    if len == 0 {
        return Completion::Normal(JsValue::Object(create_array_from_list(agent, &[JsValue::String(s)])));
    }
    let mut substrings = Vec::new();
    let mut i = 0;
    while let Some(j) = s.index_of(&r, i) {
        substrings.push(JsValue::String(s.slice(i, j)));
        if substrings.len() >= lim {
            return Completion::Normal(JsValue::Object(create_array_from_list(agent, &substrings)));
        }
        i = j + r.len();
    }
    substrings.push(JsValue::String(s.slice(i, len)));
    Completion::Normal(JsValue::Object(create_array_from_list(agent, &substrings)))
}

// §22.1.3.24 String.prototype.startsWith
fn starts_with(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let s = q!(this_str(agent, this));
    let search = q!(search_string(agent, &arg(args, 0), "startsWith"));
    let start = clamp(q!(integer_arg(agent, args, 1)), s.len());
    let end = start + search.len();
    if end > s.len() {
        return Completion::Normal(JsValue::Boolean(false));
    }
    Completion::Normal(JsValue::Boolean(s.units()[start..end] == *search.units()))
}

// §22.1.3.25 String.prototype.substring
fn substring(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let s = q!(this_str(agent, this));
    let len = s.len();
    let start = clamp(q!(integer_arg(agent, args, 0)), len);
    let end = match arg(args, 1) {
        JsValue::Undefined => len,
        end => clamp(q!(to_integer_or_infinity(agent, &end)), len),
    };
    Completion::Normal(JsValue::String(s.slice(start.min(end), start.max(end))))
}

// §22.1.3.28 toLowerCase and §22.1.3.30 toUpperCase. Unpaired surrogates
// pass through unchanged.
fn change_case(agent: &Agent, this: &JsValue, upper: bool) -> Completion {
    let s = q!(this_str(agent, this));
    let mut units = Vec::with_capacity(s.len());
    let mut buf = [0u16; 2];
    for decoded in char::decode_utf16(s.units().iter().copied()) {
        match decoded {
            Ok(c) if upper => c.to_uppercase().for_each(|m| units.extend_from_slice(m.encode_utf16(&mut buf))),
            Ok(c) => c.to_lowercase().for_each(|m| units.extend_from_slice(m.encode_utf16(&mut buf))),
            Err(e) => units.push(e.unpaired_surrogate()),
        }
    }
    Completion::Normal(JsValue::String(JsString::from_units(units)))
}

fn is_whitespace_unit(unit: u16) -> bool {
    char::from_u32(u32::from(unit)).is_some_and(is_js_whitespace)
}

// §22.1.3.32.1 TrimString
fn trim(agent: &Agent, this: &JsValue, start: bool, end: bool) -> Completion {
    let s = q!(this_str(agent, this));
    let units = s.units();
    let mut from = 0;
    let mut to = units.len();
    if start {
        while from < to && is_whitespace_unit(units[from]) {
            from += 1;
        }
    }
    if end {
        while to > from && is_whitespace_unit(units[to - 1]) {
            to -= 1;
        }
    }
    Completion::Normal(JsValue::String(s.slice(from, to)))
}

// §22.1.2.1 String.fromCharCode
fn from_char_code(agent: &Agent, _this: &JsValue, args: &[JsValue]) -> Completion {
    let mut units = Vec::with_capacity(args.len());
    for code in args {
        units.push(q!(to_uint16(agent, code)));
    }
    Completion::Normal(JsValue::String(JsString::from_units(units)))
}

// §22.1.2.2 String.fromCodePoint
fn from_code_point(agent: &Agent, _this: &JsValue, args: &[JsValue]) -> Completion {
    let mut units = Vec::with_capacity(args.len());
    let mut buf = [0u16; 2];
    for code in args {
        let n = q!(to_number(agent, code));
        let valid = n.fract() == 0.0 && (0.0..=f64::from(0x10FFFF)).contains(&n);
        if !valid {
            return agent.throw(ErrorKind::Range, Message::InvalidCodePoint(agent.inspect(code)));
        }
        let cp = n as u32;
        match char::from_u32(cp) {
            Some(c) => units.extend_from_slice(c.encode_utf16(&mut buf)),
            None => units.push(cp as u16),
        }
    }
    Completion::Normal(JsValue::String(JsString::from_units(units)))
}

// §22.1.2.4 String.raw
fn raw(agent: &Agent, _this: &JsValue, args: &[JsValue]) -> Completion {
    let cooked = q!(to_object(agent, &arg(args, 0)));
    let literals = q!(get(agent, &cooked, &PropertyKey::from("raw")));
    let literals = q!(to_object(agent, &literals));
    let literal_count = q!(length_of_array_like(agent, &literals));
    let substitutions = args.get(1..).unwrap_or_default();
    let mut r = JsString::empty();
    for i in 0..literal_count {
        let segment = q!(get(agent, &literals, &PropertyKey::from_f64(i as f64)));
        r = r.concat(&q!(to_string(agent, &segment)));
        if i + 1 == literal_count {
            break;
        }
        if let Some(sub) = substitutions.get(i as usize) {
            r = r.concat(&q!(to_string(agent, sub)));
        }
    }
    Completion::Normal(JsValue::String(r))
}

#[cfg(test)]
mod tests {
    use crate::evaluator::test_support::eval_to_string;

    #[test]
    fn constructor_and_wrappers() {
        assert_eq!(eval_to_string("String(12) + String(Symbol('s'))"), "12Symbol(s)");
        assert_eq!(eval_to_string("typeof new String('a')"), "object");
        assert_eq!(eval_to_string("new String('abc').length"), "3");
        assert_eq!(eval_to_string("new String('abc')[1]"), "b");
        assert!(eval_to_string("String.prototype.toString.call({})").starts_with("Throw: TypeError"));
        assert!(eval_to_string("new String(Symbol())").starts_with("Throw: TypeError"));
    }

    #[test]
    fn character_access() {
        assert_eq!(eval_to_string("'abc'.charAt(1) + 'abc'.charAt(5)"), "b");
        assert_eq!(eval_to_string("'abc'.charCodeAt(0)"), "97");
        assert_eq!(eval_to_string("'\\u{1F600}'.codePointAt(0)"), "128512");
        assert_eq!(eval_to_string("'abc'.at(-1) + 'abc'.at(0)"), "ca");
        assert_eq!(eval_to_string("'abc'.at(3)"), "undefined");
    }

    #[test]
    fn searching() {
        assert_eq!(eval_to_string("'hello'.indexOf('l') + ',' + 'hello'.lastIndexOf('l')"), "2,3");
        assert_eq!(eval_to_string("'hello'.indexOf('') + ',' + 'hello'.indexOf('', 9)"), "0,5");
        assert_eq!(eval_to_string("'canal'.lastIndexOf('a', 2)"), "1");
        assert_eq!(eval_to_string("'abc'.includes('bc') && 'abc'.startsWith('ab') && 'abc'.endsWith('b', 2)"), "true");
        assert!(eval_to_string("'abc'.startsWith(/a/)").starts_with("Throw: TypeError"));
    }

    #[test]
    fn slicing() {
        assert_eq!(eval_to_string("'abcdef'.slice(1, -2)"), "bcd");
        assert_eq!(eval_to_string("'abcdef'.substring(4, 1)"), "bcd");
        assert_eq!(eval_to_string("'abc'.slice(-2)"), "bc");
    }

    #[test]
    fn split_follows_separator_and_limit() {
        assert_eq!(eval_to_string("'a,b,,c'.split(',').length"), "4");
        assert_eq!(eval_to_string("'abc'.split('').join('|')"), "a|b|c");
        assert_eq!(eval_to_string("'a,b,c'.split(',', 2).join('|')"), "a|b");
        assert_eq!(eval_to_string("'abc'.split().length + ',' + ''.split(',').length + ',' + ''.split('').length"), "1,1,0");
    }

    #[test]
    fn case_trim_pad_repeat() {
        assert_eq!(eval_to_string("'Straße'.toUpperCase()"), "STRASSE");
        assert_eq!(eval_to_string("'ÀB'.toLowerCase()"), "àb");
        assert_eq!(eval_to_string("'[' + '\\n  x \\t'.trim() + ']'"), "[x]");
        assert_eq!(eval_to_string("'[' + '  x '.trimStart() + '|' + ' x  '.trimEnd() + ']'"), "[x | x]");
        assert_eq!(eval_to_string("'5'.padStart(3, '0') + '|' + 'ab'.padEnd(5, 'xy')"), "005|abxyx");
        assert_eq!(eval_to_string("'ab'.repeat(3)"), "ababab");
        assert!(eval_to_string("'a'.repeat(-1)").starts_with("Throw: RangeError"));
    }

    #[test]
    fn static_constructors() {
        assert_eq!(eval_to_string("String.fromCharCode(104, 105)"), "hi");
        assert_eq!(eval_to_string("String.fromCodePoint(0x1F600).length"), "2");
        assert!(eval_to_string("String.fromCodePoint(1.5)").starts_with("Throw: RangeError"));
        assert_eq!(eval_to_string("String.raw`a\\n${1}b`"), "a\\n1b");
        assert_eq!(eval_to_string("String.raw({ raw: ['x', 'y', 'z'] }, 1)"), "x1yz");
    }

    #[test]
    fn concat_and_iteration() {
        assert_eq!(eval_to_string("'a'.concat(1, null)"), "a1null");
        assert_eq!(eval_to_string("[...'ab'].join('-')"), "a-b");
    }
}
