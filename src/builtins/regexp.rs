//! §22.2 RegExp objects.
//!
//! Patterns are rewritten into the Rust regex dialect and compiled with
//! `fancy_regex`, which handles backreferences and lookaround. Patterns it
//! rejects are retried with the `regex` crate. Matching runs on the UTF-8
//! form of the subject; offsets are mapped back to UTF-16 code units, so
//! `index`, `lastIndex` and captured substrings refer to the original string.

use std::rc::Rc;

use tracing::debug;

use crate::abstract_ops::conversion::{to_length, to_string};
use crate::abstract_ops::{
    call, construct, create_array_from_list, create_data_property_or_throw, define_property_or_throw, get,
    is_regexp, length_of_array_like, ordinary_create_from_constructor, set, species_constructor,
};
use crate::builtins::{arg, define_constructor, define_getter, define_method, define_species};
use crate::completion::Completion;
use crate::engine::{Agent, ErrorKind, IntrinsicId, Message, Realm};
use crate::object::array::array_create;
use crate::object::{JsObject, ObjectKind, PropertyDescriptor, PropertyKey};
use crate::types::{JsString, JsValue, WellKnownSymbol};

const FLAG_ORDER: &str = "dgimsuy";

/// [[OriginalSource]], [[OriginalFlags]] and the compiled matcher.
pub struct RegExpData {
    source: JsString,
    flags: String,
    matcher: Rc<Matcher>,
}

/// Capture spans in bytes, group 0 first.
type Spans = Vec<Option<(usize, usize)>>;

enum Matcher {
    Fancy(fancy_regex::Regex),
    Standard(regex::Regex),
}

impl Matcher {
    fn new(pattern: &str) -> Result<Self, String> {
        match fancy_regex::Regex::new(pattern) {
            Ok(r) => Ok(Matcher::Fancy(r)),
            Err(fancy) => regex::Regex::new(pattern).map(Matcher::Standard).map_err(|e| {
                debug!(%fancy, "backtracking compile failed, standard compile failed too");
                e.to_string()
            }),
        }
    }

    fn capture_names(&self) -> Vec<Option<String>> {
        match self {
            Matcher::Fancy(r) => r.capture_names().map(|n| n.map(str::to_owned)).collect(),
            Matcher::Standard(r) => r.capture_names().map(|n| n.map(str::to_owned)).collect(),
        }
    }

    /// The leftmost match starting at or after byte `start`.
    fn captures_at(&self, text: &str, start: usize) -> Result<Option<Spans>, String> {
        match self {
            Matcher::Fancy(r) => {
                let captures = r.captures_from_pos(text, start).map_err(|e| e.to_string())?;
                Ok(captures.map(|c| (0..c.len()).map(|i| c.get(i).map(|m| (m.start(), m.end()))).collect()))
            }
            Matcher::Standard(r) => Ok(r
                .captures_at(text, start)
                .map(|c| (0..c.len()).map(|i| c.get(i).map(|m| (m.start(), m.end()))).collect())),
        }
    }
}

impl RegExpData {
    fn has(&self, flag: char) -> bool {
        self.flags.contains(flag)
    }
}

pub(super) fn init(realm: &Realm) {
    let proto = JsObject::ordinary(Some(realm.intrinsic(IntrinsicId::ObjectPrototype)));
    define_method(realm, &proto, "exec", 1, regexp_exec_method);
    define_getter(realm, &proto, "flags", regexp_flags);
    for (name, flag) in [
        ("dotAll", 's'),
        ("global", 'g'),
        ("hasIndices", 'd'),
        ("ignoreCase", 'i'),
        ("multiline", 'm'),
        ("sticky", 'y'),
        ("unicode", 'u'),
    ] {
        define_flag_getter(realm, &proto, name, flag);
    }
    define_getter(realm, &proto, "source", regexp_source);
    define_method(realm, &proto, PropertyKey::symbol(WellKnownSymbol::Split), 2, regexp_split);
    define_method(realm, &proto, "test", 1, |agent, this, args| {
        let r = q!(require_object(agent, this));
        let s = q!(to_string(agent, &arg(args, 0)));
        let result = q!(regexp_exec(agent, &r, &s));
        Completion::Normal(JsValue::Boolean(!result.is_null()))
    });
    define_method(realm, &proto, "toString", 0, |agent, this, _| {
        let r = q!(require_object(agent, this));
        let source = q!(to_string(agent, &q!(get(agent, &r, &PropertyKey::from("source")))));
        let flags = q!(to_string(agent, &q!(get(agent, &r, &PropertyKey::from("flags")))));
        let text = format!("/{}/{}", source.to_rust_string(), flags.to_rust_string());
        Completion::Normal(JsValue::from_str(&text))
    });

    let ctor = define_constructor(realm, "RegExp", 2, regexp_constructor, &proto);
    define_species(realm, &ctor);
    realm.set_intrinsic(IntrinsicId::RegExpPrototype, proto);
    realm.set_intrinsic(IntrinsicId::RegExp, ctor);
}

/// `get RegExp.prototype.<name>`: undefined on the prototype itself.
fn define_flag_getter(realm: &Realm, proto: &JsObject, name: &'static str, flag: char) {
    // Getters are plain fn pointers, so each flag gets its own body.
    let body: fn(&Agent, &JsValue, &[JsValue]) -> Completion = match flag {
        's' => |agent, this, _| flag_value(agent, this, 's'),
        'g' => |agent, this, _| flag_value(agent, this, 'g'),
        'd' => |agent, this, _| flag_value(agent, this, 'd'),
        'i' => |agent, this, _| flag_value(agent, this, 'i'),
        'm' => |agent, this, _| flag_value(agent, this, 'm'),
        'y' => |agent, this, _| flag_value(agent, this, 'y'),
        _ => |agent, this, _| flag_value(agent, this, 'u'),
    };
    define_getter(realm, proto, name, body);
}

// §22.2.6.4.1 RegExpHasFlag
fn flag_value(agent: &Agent, this: &JsValue, flag: char) -> Completion {
    let JsValue::Object(o) = this else {
        return agent.throw(ErrorKind::Type, Message::NotAnObject(agent.inspect(this)));
    };
    if let ObjectKind::RegExp(data) = &o.borrow().kind {
        return Completion::Normal(JsValue::Boolean(data.has(flag)));
    }
    if o.ptr_eq(&agent.intrinsic(IntrinsicId::RegExpPrototype)) {
        return Completion::Normal(JsValue::Undefined);
    }
    agent.throw(ErrorKind::Type, Message::NotATypeObject(agent.inspect(this), "RegExp"))
}

fn require_object(agent: &Agent, this: &JsValue) -> Completion<JsObject> {
    match this {
        JsValue::Object(o) => Completion::Normal(o.clone()),
        _ => agent.throw(ErrorKind::Type, Message::NotAnObject(agent.inspect(this))),
    }
}

// §22.2.6.4 get RegExp.prototype.flags
fn regexp_flags(agent: &Agent, this: &JsValue, _args: &[JsValue]) -> Completion {
    let r = q!(require_object(agent, this));
    let mut out = String::new();
    for (name, flag) in [
        ("hasIndices", 'd'),
        ("global", 'g'),
        ("ignoreCase", 'i'),
        ("multiline", 'm'),
        ("dotAll", 's'),
        ("unicode", 'u'),
        ("sticky", 'y'),
    ] {
        let value = q!(get(agent, &r, &PropertyKey::from(name)));
        if crate::abstract_ops::conversion::to_boolean(&value) {
            out.push(flag);
        }
    }
    Completion::Normal(JsValue::from_str(&out))
}

// §22.2.6.13 get RegExp.prototype.source
fn regexp_source(agent: &Agent, this: &JsValue, _args: &[JsValue]) -> Completion {
    let r = q!(require_object(agent, this));
    if let ObjectKind::RegExp(data) = &r.borrow().kind {
        return Completion::Normal(JsValue::from_str(&escape_pattern(&data.source.to_rust_string())));
    }
    if r.ptr_eq(&agent.intrinsic(IntrinsicId::RegExpPrototype)) {
        return Completion::Normal(JsValue::from_str("(?:)"));
    }
    agent.throw(ErrorKind::Type, Message::NotATypeObject(agent.inspect(this), "RegExp"))
}

// §22.2.6.13.1 EscapeRegExpPattern
fn escape_pattern(source: &str) -> String {
    if source.is_empty() {
        return "(?:)".to_owned();
    }
    let mut out = String::with_capacity(source.len());
    let mut in_class = false;
    let mut chars = source.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                out.push(c);
                if let Some(next) = chars.next() {
                    out.push(next);
                }
                continue;
            }
            '[' => in_class = true,
            ']' => in_class = false,
            '/' if !in_class => {
                out.push_str("\\/");
                continue;
            }
            '\n' => {
                out.push_str("\\n");
                continue;
            }
            '\r' => {
                out.push_str("\\r");
                continue;
            }
            '\u{2028}' => {
                out.push_str("\\u2028");
                continue;
            }
            '\u{2029}' => {
                out.push_str("\\u2029");
                continue;
            }
            _ => {}
        }
        out.push(c);
    }
    out
}

// §22.2.4.1 RegExp ( pattern, flags )
fn regexp_constructor(agent: &Agent, _this: &JsValue, args: &[JsValue], new_target: Option<&JsObject>) -> Completion {
    let pattern = arg(args, 0);
    let flags = arg(args, 1);
    let pattern_is_regexp = q!(is_regexp(agent, &pattern));
    let new_target = match new_target {
        Some(nt) => nt.clone(),
        None => {
            let Some(active) = agent.active_function_object() else {
                return agent.throw(ErrorKind::Type, Message::ConstructorRequiresNew("RegExp".into()));
            };
            if pattern_is_regexp && flags.is_undefined() {
                let JsValue::Object(p) = &pattern else {
                    unreachable!("IsRegExp holds only for objects");
                };
                let pattern_ctor = q!(get(agent, p, &PropertyKey::from("constructor")));
                if let JsValue::Object(pc) = &pattern_ctor
                    && pc.ptr_eq(&active)
                {
                    return Completion::Normal(pattern);
                }
            }
            active
        }
    };
    let existing = match &pattern {
        JsValue::Object(p) => match &p.borrow().kind {
            ObjectKind::RegExp(data) => Some((data.source.clone(), data.flags.clone())),
            _ => None,
        },
        _ => None,
    };
    let (p, f) = if let Some((source, original_flags)) = existing {
        let f = if flags.is_undefined() { JsValue::from_str(&original_flags) } else { flags };
        (JsValue::String(source), f)
    } else if pattern_is_regexp {
        let JsValue::Object(po) = &pattern else {
            unreachable!("IsRegExp holds only for objects");
        };
        let source = q!(get(agent, po, &PropertyKey::from("source")));
        let f = if flags.is_undefined() { q!(get(agent, po, &PropertyKey::from("flags"))) } else { flags };
        (source, f)
    } else {
        (pattern, flags)
    };
    let o = q!(regexp_alloc(agent, &new_target));
    regexp_initialize(agent, &o, &p, &f).map(JsValue::Object)
}

// §22.2.3.2 RegExpAlloc
fn regexp_alloc(agent: &Agent, new_target: &JsObject) -> Completion<JsObject> {
    let o = q!(ordinary_create_from_constructor(agent, new_target, IntrinsicId::RegExpPrototype, ObjectKind::Ordinary));
    let desc = PropertyDescriptor {
        writable: Some(true),
        enumerable: Some(false),
        configurable: Some(false),
        ..PropertyDescriptor::default()
    };
    q!(define_property_or_throw(agent, &o, PropertyKey::from("lastIndex"), desc));
    Completion::Normal(o)
}

// §22.2.3.3 RegExpInitialize
fn regexp_initialize(agent: &Agent, o: &JsObject, pattern: &JsValue, flags: &JsValue) -> Completion<JsObject> {
    let p = if pattern.is_undefined() { JsString::empty() } else { q!(to_string(agent, pattern)) };
    let f = if flags.is_undefined() { String::new() } else { q!(to_string(agent, flags)).to_rust_string() };
    if !valid_flags(&f) {
        return agent.throw(ErrorKind::Syntax, Message::InvalidRegExpFlags(f));
    }
    let source = p.to_rust_string();
    let matcher = match compile(&source, &f) {
        Ok(m) => m,
        Err(e) => {
            debug!(pattern = %source, error = %e, "regular expression rejected");
            return agent.throw(ErrorKind::Syntax, Message::InvalidRegExp(format!("/{source}/: {e}")));
        }
    };
    o.borrow_mut().kind = ObjectKind::RegExp(RegExpData { source: p, flags: f, matcher: Rc::new(matcher) });
    q!(set(agent, o, PropertyKey::from("lastIndex"), JsValue::Number(0.0), true));
    Completion::Normal(o.clone())
}

/// RegExpCreate (§22.2.3.1), used for literals.
pub fn regexp_create(agent: &Agent, pattern: &str, flags: &str) -> Completion<JsObject> {
    let o = q!(regexp_alloc(agent, &agent.intrinsic(IntrinsicId::RegExp)));
    regexp_initialize(agent, &o, &JsValue::from_str(pattern), &JsValue::from_str(flags))
}

fn valid_flags(flags: &str) -> bool {
    let mut seen = String::new();
    flags.chars().all(|c| {
        let ok = FLAG_ORDER.contains(c) && !seen.contains(c);
        seen.push(c);
        ok
    })
}

fn compile(source: &str, flags: &str) -> Result<Matcher, String> {
    let mut pattern = String::new();
    if flags.contains('i') {
        pattern.push_str("(?i)");
    }
    if flags.contains('m') {
        pattern.push_str("(?m)");
    }
    pattern.push_str(&translate(source, flags.contains('s')));
    Matcher::new(&pattern)
}

const LINE_TERMINATORS: &str = "\\n\\r\\x{2028}\\x{2029}";

fn push_literal(out: &mut String, c: char) {
    if regex::escape(c.encode_utf8(&mut [0; 4])).len() > c.len_utf8() || matches!(c, '&' | '~' | '-') {
        out.push('\\');
    }
    out.push(c);
}

/// Rewrites an ECMAScript pattern into `regex` syntax: ASCII-only `\d`, `\w`
/// and `\b`, ECMAScript line terminators for `.`, and code unit escapes as
/// literal characters.
fn translate(source: &str, dot_all: bool) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len() + 8);
    let mut in_class = false;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' if i + 1 < chars.len() => {
                i += translate_escape(&chars, i + 1, in_class, &mut out);
                continue;
            }
            '[' if !in_class => {
                if chars.get(i + 1) == Some(&']') {
                    out.push_str("[^\\x{0}-\\x{10FFFF}]");
                    i += 2;
                    continue;
                }
                if chars.get(i + 1) == Some(&'^') && chars.get(i + 2) == Some(&']') {
                    out.push_str("(?s:.)");
                    i += 3;
                    continue;
                }
                in_class = true;
                out.push('[');
                if chars.get(i + 1) == Some(&'^') {
                    out.push('^');
                    i += 1;
                }
            }
            ']' if in_class => {
                in_class = false;
                out.push(']');
            }
            '[' | '&' | '~' if in_class => {
                out.push('\\');
                out.push(c);
            }
            '.' if !in_class => {
                if dot_all {
                    out.push_str("(?s:.)");
                } else {
                    out.push_str("[^");
                    out.push_str(LINE_TERMINATORS);
                    out.push(']');
                }
            }
            '(' if !in_class && chars.get(i + 1) == Some(&'?') && chars.get(i + 2) == Some(&'<') => {
                if matches!(chars.get(i + 3), Some('=' | '!')) {
                    out.push_str("(?<");
                    i += 3;
                    continue;
                }
                out.push_str("(?P<");
                i += 3;
                continue;
            }
            _ => out.push(c),
        }
        i += 1;
    }
    out
}

/// Translates the escape whose letter is at `at`; returns characters consumed
/// including the backslash.
fn translate_escape(chars: &[char], at: usize, in_class: bool, out: &mut String) -> usize {
    let next = chars[at];
    let hex = |from: usize, len: usize| -> Option<u32> {
        let digits: String = chars.get(from..from + len)?.iter().collect();
        if digits.chars().all(|c| c.is_ascii_hexdigit()) { u32::from_str_radix(&digits, 16).ok() } else { None }
    };
    let literal = |out: &mut String, cp: u32| push_literal(out, char::from_u32(cp).unwrap_or('\u{FFFD}'));
    match next {
        'd' => out.push_str(if in_class { "0-9" } else { "[0-9]" }),
        'D' => out.push_str(if in_class { "\\x00-/:-\\x{10FFFF}" } else { "[^0-9]" }),
        'w' => out.push_str(if in_class { "A-Za-z0-9_" } else { "[A-Za-z0-9_]" }),
        'W' => out.push_str(if in_class { "\\x00-/:-@\\[-^`{-\\x{10FFFF}" } else { "[^A-Za-z0-9_]" }),
        'b' if in_class => out.push_str("\\x08"),
        'b' | 'B' | 's' | 'S' | 'n' | 'r' | 't' | 'f' => {
            out.push('\\');
            out.push(next);
        }
        'v' => out.push_str("\\x0B"),
        '0' if !chars.get(at + 1).is_some_and(char::is_ascii_digit) => out.push_str("\\x00"),
        'c' if chars.get(at + 1).is_some_and(char::is_ascii_alphabetic) => {
            literal(out, chars[at + 1] as u32 % 32);
            return 3;
        }
        'x' => {
            if let Some(cp) = hex(at + 1, 2) {
                literal(out, cp);
                return 4;
            }
            out.push('x');
        }
        'u' => {
            if chars.get(at + 1) == Some(&'{')
                && let Some(len) = chars[at + 2..].iter().position(|&c| c == '}')
                && let Some(cp) = hex(at + 2, len)
            {
                literal(out, cp);
                return len + 4;
            }
            if let Some(cp) = hex(at + 1, 4) {
                let mut consumed = 6;
                let mut cp = cp;
                // \uD83D\uDE00 names one astral code point.
                if (0xD800..0xDC00).contains(&cp)
                    && chars.get(at + 5) == Some(&'\\')
                    && chars.get(at + 6) == Some(&'u')
                    && let Some(low) = hex(at + 7, 4)
                    && (0xDC00..0xE000).contains(&low)
                {
                    cp = 0x10000 + ((cp - 0xD800) << 10) + (low - 0xDC00);
                    consumed = 12;
                }
                literal(out, cp);
                return consumed;
            }
            out.push('u');
        }
        'k' if chars.get(at + 1) == Some(&'<') => out.push_str("\\k"),
        '1'..='9' => {
            out.push('\\');
            out.push(next);
        }
        c if c.is_ascii_alphanumeric() => out.push(c),
        c => push_literal(out, c),
    }
    2
}

/// Byte offsets of the UTF-8 subject paired with UTF-16 offsets of the
/// original string, at every character boundary.
struct OffsetMap {
    bytes: Vec<usize>,
    units: Vec<usize>,
}

impl OffsetMap {
    fn new(text: &str) -> Self {
        let mut bytes = Vec::with_capacity(text.len() + 1);
        let mut units = Vec::with_capacity(text.len() + 1);
        let mut unit = 0;
        for (byte, c) in text.char_indices() {
            bytes.push(byte);
            units.push(unit);
            unit += c.len_utf16();
        }
        bytes.push(text.len());
        units.push(unit);
        OffsetMap { bytes, units }
    }

    /// The first character boundary at or after code unit `unit`.
    fn byte_at(&self, unit: usize) -> usize {
        let i = self.units.partition_point(|&u| u < unit);
        self.bytes.get(i).copied().unwrap_or(*self.bytes.last().unwrap_or(&0))
    }

    fn unit_at(&self, byte: usize) -> usize {
        let i = self.bytes.partition_point(|&b| b < byte);
        self.units.get(i).copied().unwrap_or(*self.units.last().unwrap_or(&0))
    }
}

// §22.2.6.2 RegExp.prototype.exec ( string )
fn regexp_exec_method(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let r = match this {
        JsValue::Object(o) if matches!(o.borrow().kind, ObjectKind::RegExp(_)) => o.clone(),
        _ => return agent.throw(ErrorKind::Type, Message::NotATypeObject(agent.inspect(this), "RegExp")),
    };
    let s = q!(to_string(agent, &arg(args, 0)));
    regexp_builtin_exec(agent, &r, &s)
}

// §22.2.7.1 RegExpExec
fn regexp_exec(agent: &Agent, r: &JsObject, s: &JsString) -> Completion {
    let exec = q!(get(agent, r, &PropertyKey::from("exec")));
    if exec.is_callable() {
        let result = q!(call(agent, &exec, &JsValue::Object(r.clone()), &[JsValue::String(s.clone())]));
        if !matches!(result, JsValue::Object(_) | JsValue::Null) {
            return agent.throw(ErrorKind::Type, Message::NotAnObject(agent.inspect(&result)));
        }
        return Completion::Normal(result);
    }
    if !matches!(r.borrow().kind, ObjectKind::RegExp(_)) {
        return agent.throw(ErrorKind::Type, Message::NotATypeObject(agent.inspect(&JsValue::Object(r.clone())), "RegExp"));
    }
    regexp_builtin_exec(agent, r, s)
}

// §22.2.7.2 RegExpBuiltinExec
fn regexp_builtin_exec(agent: &Agent, r: &JsObject, s: &JsString) -> Completion {
    let last_index_key = PropertyKey::from("lastIndex");
    let last_index = q!(get(agent, r, &last_index_key));
    let mut last_index = q!(to_length(agent, &last_index)) as usize;
    let (matcher, global, sticky, has_indices) = match &r.borrow().kind {
        ObjectKind::RegExp(data) => (data.matcher.clone(), data.has('g'), data.has('y'), data.has('d')),
        _ => unreachable!("caller checked [[RegExpMatcher]]"),
    };
    if !global && !sticky {
        last_index = 0;
    }
    let fail = |agent: &Agent| -> Completion {
        if global || sticky {
            q!(set(agent, r, last_index_key.clone(), JsValue::Number(0.0), true));
        }
        Completion::Normal(JsValue::Null)
    };
    if last_index > s.len() {
        return fail(agent);
    }
    let text = s.to_rust_string();
    let offsets = OffsetMap::new(&text);
    let start = offsets.byte_at(last_index);
    let spans = match matcher.captures_at(&text, start) {
        Ok(Some(spans)) => spans,
        Ok(None) => return fail(agent),
        Err(e) => return agent.throw(ErrorKind::Range, Message::RegExpExecution(e)),
    };
    let Some(Some((whole_start, whole_end))) = spans.first().copied() else {
        return fail(agent);
    };
    if sticky && whole_start != start {
        return fail(agent);
    }
    let match_start = offsets.unit_at(whole_start);
    let match_end = offsets.unit_at(whole_end);
    if global || sticky {
        q!(set(agent, r, last_index_key.clone(), JsValue::Number(match_end as f64), true));
    }

    let a = x!(array_create(agent, 0, None));
    x!(create_data_property_or_throw(agent, &a, PropertyKey::from("index"), JsValue::Number(match_start as f64)));
    x!(create_data_property_or_throw(agent, &a, PropertyKey::from("input"), JsValue::String(s.clone())));
    let names = matcher.capture_names();
    let groups = if names.iter().any(Option::is_some) {
        Some(JsObject::ordinary(None))
    } else {
        None
    };
    let spans: Vec<Option<(usize, usize)>> = spans
        .into_iter()
        .map(|span| span.map(|(from, to)| (offsets.unit_at(from), offsets.unit_at(to))))
        .collect();
    for (i, span) in spans.iter().enumerate() {
        let value = span.map_or(JsValue::Undefined, |(from, to)| JsValue::String(s.slice(from, to)));
        x!(create_data_property_or_throw(agent, &a, PropertyKey::from_index(i as u32), value.clone()));
        if let (Some(groups), Some(Some(name))) = (&groups, names.get(i)) {
            x!(create_data_property_or_throw(agent, groups, PropertyKey::from(name.as_str()), value));
        }
    }
    let groups_value = groups.clone().map_or(JsValue::Undefined, JsValue::Object);
    x!(create_data_property_or_throw(agent, &a, PropertyKey::from("groups"), groups_value));
    if has_indices {
        let indices = match_indices(agent, &spans, &names);
        x!(create_data_property_or_throw(agent, &a, PropertyKey::from("indices"), indices));
    }
    Completion::Normal(JsValue::Object(a))
}

// §22.2.7.8 MakeMatchIndicesIndexPairArray
fn match_indices(agent: &Agent, spans: &[Option<(usize, usize)>], names: &[Option<String>]) -> JsValue {
    let pair = |span: &Option<(usize, usize)>| match span {
        Some((from, to)) => JsValue::Object(create_array_from_list(
            agent,
            &[JsValue::Number(*from as f64), JsValue::Number(*to as f64)],
        )),
        None => JsValue::Undefined,
    };
    let pairs: Vec<JsValue> = spans.iter().map(pair).collect();
    let a = create_array_from_list(agent, &pairs);
    let groups = if names.iter().any(Option::is_some) {
        let g = JsObject::ordinary(None);
        for (value, name) in pairs.iter().zip(names) {
            if let Some(name) = name {
                x!(create_data_property_or_throw(agent, &g, PropertyKey::from(name.as_str()), value.clone()));
            }
        }
        JsValue::Object(g)
    } else {
        JsValue::Undefined
    };
    x!(create_data_property_or_throw(agent, &a, PropertyKey::from("groups"), groups));
    JsValue::Object(a)
}

// §22.2.7.3 AdvanceStringIndex
fn advance_string_index(s: &JsString, index: usize, unicode: bool) -> usize {
    if !unicode || index + 1 >= s.len() {
        return index + 1;
    }
    index + s.code_point_at(index).1
}

// §22.2.6.14 RegExp.prototype [ @@split ] ( string, limit )
fn regexp_split(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let rx = q!(require_object(agent, this));
    let s = q!(to_string(agent, &arg(args, 0)));
    let c = q!(species_constructor(agent, &rx, IntrinsicId::RegExp));
    let flags = q!(to_string(agent, &q!(get(agent, &rx, &PropertyKey::from("flags"))))).to_rust_string();
    let unicode = flags.contains('u');
    let new_flags = if flags.contains('y') { flags } else { format!("{flags}y") };
    let splitter = q!(construct(agent, &c, &[JsValue::Object(rx), JsValue::from_str(&new_flags)], None));
    let mut parts: Vec<JsValue> = Vec::new();
    let limit = match arg(args, 1) {
        JsValue::Undefined => u32::MAX,
        l => q!(crate::abstract_ops::conversion::to_uint32(agent, &l)),
    };
    if limit == 0 {
        return Completion::Normal(JsValue::Object(create_array_from_list(agent, &parts)));
    }
    let size = s.len();
    if size == 0 {
        let z = q!(regexp_exec(agent, &splitter, &s));
        if z.is_null() {
            parts.push(JsValue::String(s));
        }
        return Completion::Normal(JsValue::Object(create_array_from_list(agent, &parts)));
    }
    let last_index_key = PropertyKey::from("lastIndex");
    let mut p = 0;
    let mut q = p;
    while q < size {
        q!(set(agent, &splitter, last_index_key.clone(), JsValue::Number(q as f64), true));
        let z = q!(regexp_exec(agent, &splitter, &s));
        let JsValue::Object(z) = z else {
            q = advance_string_index(&s, q, unicode);
            continue;
        };
        let e = q!(to_length(agent, &q!(get(agent, &splitter, &last_index_key)))).min(size as u64) as usize;
        if e == p {
            q = advance_string_index(&s, q, unicode);
            continue;
        }
        parts.push(JsValue::String(s.slice(p, q)));
        if parts.len() as u32 == limit {
            return Completion::Normal(JsValue::Object(create_array_from_list(agent, &parts)));
        }
        p = e;
        let captures = q!(length_of_array_like(agent, &z)).saturating_sub(1);
        for i in 1..=captures {
            parts.push(q!(get(agent, &z, &PropertyKey::from_f64(i as f64))));
            if parts.len() as u32 == limit {
                return Completion::Normal(JsValue::Object(create_array_from_list(agent, &parts)));
            }
        }
        q = p;
    }
    parts.push(JsValue::String(s.slice(p, size)));
    Completion::Normal(JsValue::Object(create_array_from_list(agent, &parts)))
}

#[cfg(test)]
mod tests {
    use crate::evaluator::test_support::eval_to_string;

    use super::{escape_pattern, translate};

    #[test]
    fn translation_narrows_classes_to_ascii() {
        assert_eq!(translate("\\d+", false), "[0-9]+");
        assert_eq!(translate("[\\w-]", false), "[A-Za-z0-9_-]");
        assert_eq!(translate("a.b", true), "a(?s:.)b");
        assert_eq!(translate("(?<year>\\d{4})", false), "(?P<year>[0-9]{4})");
        assert_eq!(translate("\\u0041\\x2e", false), "A\\.");
    }

    #[test]
    fn source_is_escaped_for_display() {
        assert_eq!(escape_pattern(""), "(?:)");
        assert_eq!(escape_pattern("a/b[/]"), "a\\/b[/]");
        assert_eq!(eval_to_string("String(new RegExp('a/b', 'gi'))"), "/a\\/b/gi");
        assert_eq!(eval_to_string("new RegExp('').source + RegExp.prototype.source"), "(?:)(?:)");
    }

    #[test]
    fn exec_reports_index_input_and_groups() {
        let src = "var m = /(?<word>[a-z]+)(\\d)?/.exec('12 abc'); \
                   [m.index, m[0], m[1], m[2], m.groups.word, m.input].join('|')";
        assert_eq!(eval_to_string(src), "3|abc|abc||abc|12 abc");
        assert_eq!(eval_to_string("/x/.exec('abc')"), "null");
        assert_eq!(eval_to_string("/a/.exec('a').groups"), "undefined");
    }

    #[test]
    fn global_and_sticky_track_last_index() {
        let src = "var r = /o/g; var s = 'foo boo'; var out = []; var m; \
                   while ((m = r.exec(s)) !== null) out.push(m.index + '@' + r.lastIndex); out.join() + ';' + r.lastIndex";
        assert_eq!(eval_to_string(src), "1@2,2@3,5@6,6@7;0");
        assert_eq!(eval_to_string("var r = /b/y; r.test('ab') + ',' + (r.lastIndex = 1, r.test('ab')) + ',' + r.lastIndex"), "false,true,2");
    }

    #[test]
    fn offsets_count_utf16_code_units() {
        assert_eq!(eval_to_string("/b/.exec('\\u{1F600}ab').index"), "3");
        assert_eq!(eval_to_string("var r = /./gu; r.exec('\\u{1F600}x'); r.lastIndex"), "2");
    }

    #[test]
    fn flags_and_accessors() {
        assert_eq!(eval_to_string("/a/ysmig.flags"), "gimsy");
        assert_eq!(eval_to_string("/a/g.global + ',' + /a/.global + ',' + RegExp.prototype.global"), "true,false,undefined");
        assert!(eval_to_string("new RegExp('a', 'gg')").starts_with("Throw: SyntaxError"));
        assert!(eval_to_string("new RegExp('(')").starts_with("Throw: SyntaxError"));
        assert!(eval_to_string("Object.getOwnPropertyDescriptor(RegExp.prototype, 'global').get.call({})").starts_with("Throw: TypeError"));
    }

    #[test]
    fn constructor_reuses_and_copies_regexps() {
        assert_eq!(eval_to_string("var r = /a/g; RegExp(r) === r"), "true");
        assert_eq!(eval_to_string("var r = /a/g; new RegExp(r) === r"), "false");
        assert_eq!(eval_to_string("new RegExp(/a/g, 'i').flags"), "i");
        assert_eq!(eval_to_string("Object.getOwnPropertyDescriptor(/a/, 'lastIndex').enumerable"), "false");
    }

    #[test]
    fn dot_excludes_line_terminators() {
        assert_eq!(eval_to_string("/a.b/.test('a\\rb') + ',' + /a.b/s.test('a\\rb')"), "false,true");
        assert_eq!(eval_to_string("/^b$/m.test('a\\nb') + ',' + /^B/i.test('b')"), "true,true");
        assert_eq!(eval_to_string("/\\bfoo\\b/.test('a foo.')"), "true");
    }

    #[test]
    fn backreferences_and_lookaround() {
        assert_eq!(eval_to_string("/(a)\\1/.test('aa') + ',' + /(?<q>['\"]).*?\\k<q>/.exec('say \"hi\"')[0]"), "true,\"hi\"");
        assert_eq!(eval_to_string("/\\d+(?=px)/.exec('12em 40px')[0] + ',' + /(?<!-)\\b\\d/.exec('-1 2')[0]"), "40,2");
    }

    #[test]
    fn split_uses_the_symbol_protocol() {
        assert_eq!(eval_to_string("'a1b22c'.split(/\\d+/).join('|')"), "a|b|c");
        assert_eq!(eval_to_string("'a1b2c'.split(/(\\d)/).join('|')"), "a|1|b|2|c");
        assert_eq!(eval_to_string("'abc'.split(/(?:)/).join('|')"), "a|b|c");
        assert_eq!(eval_to_string("'a,b,c'.split(/,/, 2).join('|')"), "a|b");
        assert_eq!(eval_to_string("''.split(/x/).length + ',' + ''.split(/(?:)/).length"), "1,0");
    }

    #[test]
    fn has_indices_reports_spans() {
        assert_eq!(eval_to_string("/b(c)/d.exec('abc').indices.join('|')"), "1,3|2,3");
    }
}
