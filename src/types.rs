use std::cell::Cell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::object::JsObject;

#[derive(Clone)]
pub enum JsValue {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(JsString),
    Symbol(JsSymbol),
    BigInt(JsBigInt),
    Object(JsObject),
}

// §6.1.4 The String Type: a sequence of UTF-16 code units.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JsString(Rc<[u16]>);

impl JsString {
    pub fn from_str(s: &str) -> Self {
        JsString(s.encode_utf16().collect::<Vec<u16>>().into())
    }

    pub fn from_units(units: Vec<u16>) -> Self {
        JsString(units.into())
    }

    pub fn empty() -> Self {
        JsString(Rc::from(Vec::<u16>::new()))
    }

    pub fn units(&self) -> &[u16] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn to_rust_string(&self) -> String {
        String::from_utf16_lossy(&self.0)
    }

    pub fn concat(&self, other: &JsString) -> JsString {
        let mut units = Vec::with_capacity(self.len() + other.len());
        units.extend_from_slice(&self.0);
        units.extend_from_slice(&other.0);
        JsString::from_units(units)
    }

    pub fn slice(&self, start: usize, end: usize) -> JsString {
        let s = start.min(self.len());
        let e = end.min(self.len());
        if s >= e {
            return JsString::empty();
        }
        JsString::from_units(self.0[s..e].to_vec())
    }

    // §6.1.4.1 StringIndexOf
    pub fn index_of(&self, search: &JsString, from: usize) -> Option<usize> {
        let len = self.len();
        let search_len = search.len();
        if search_len == 0 {
            return (from <= len).then_some(from);
        }
        if from + search_len > len {
            return None;
        }
        (from..=(len - search_len)).find(|&i| self.0[i..i + search_len] == search.0[..])
    }

    pub fn last_index_of(&self, search: &JsString, from: usize) -> Option<usize> {
        let len = self.len();
        let search_len = search.len();
        if search_len > len {
            return None;
        }
        let max_start = from.min(len - search_len);
        (0..=max_start)
            .rev()
            .find(|&i| self.0[i..i + search_len] == search.0[..])
    }

    // §6.1.4.2 CodePointAt
    pub fn code_point_at(&self, index: usize) -> (u32, usize) {
        let first = self.0[index];
        if !(0xD800..=0xDBFF).contains(&first) || index + 1 == self.len() {
            return (u32::from(first), 1);
        }
        let second = self.0[index + 1];
        if !(0xDC00..=0xDFFF).contains(&second) {
            return (u32::from(first), 1);
        }
        let cp = ((u32::from(first) - 0xD800) << 10) + (u32::from(second) - 0xDC00) + 0x10000;
        (cp, 2)
    }
}

impl From<&str> for JsString {
    fn from(s: &str) -> Self {
        JsString::from_str(s)
    }
}

impl From<String> for JsString {
    fn from(s: String) -> Self {
        JsString::from_str(&s)
    }
}

impl fmt::Display for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rust_string())
    }
}

impl fmt::Debug for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_rust_string())
    }
}

thread_local! {
    static NEXT_SYMBOL_ID: Cell<u64> = const { Cell::new(WELL_KNOWN_SYMBOL_COUNT) };
}

const WELL_KNOWN_SYMBOL_COUNT: u64 = 16;

/// Symbol identity is the id; the description is informational only.
#[derive(Clone)]
pub struct JsSymbol {
    id: u64,
    description: Option<JsString>,
}

impl JsSymbol {
    pub fn new(description: Option<JsString>) -> Self {
        let id = NEXT_SYMBOL_ID.with(|next| {
            let id = next.get();
            next.set(id + 1);
            id
        });
        JsSymbol { id, description }
    }

    pub fn well_known(which: WellKnownSymbol) -> Self {
        JsSymbol {
            id: which as u64,
            description: Some(JsString::from_str(which.description())),
        }
    }

    pub fn description(&self) -> Option<&JsString> {
        self.description.as_ref()
    }

    // §20.4.3.3.1 SymbolDescriptiveString
    pub fn descriptive_string(&self) -> JsString {
        let desc = self.description.clone().unwrap_or_else(JsString::empty);
        JsString::from_str("Symbol(")
            .concat(&desc)
            .concat(&JsString::from_str(")"))
    }
}

impl PartialEq for JsSymbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for JsSymbol {}

impl Hash for JsSymbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for JsSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.descriptive_string())
    }
}

// §6.1.5.1 Well-Known Symbols
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WellKnownSymbol {
    AsyncIterator = 1,
    HasInstance,
    IsConcatSpreadable,
    Iterator,
    Match,
    MatchAll,
    Replace,
    Search,
    Species,
    Split,
    ToPrimitive,
    ToStringTag,
    Unscopables,
}

impl WellKnownSymbol {
    pub const ALL: [WellKnownSymbol; 13] = [
        WellKnownSymbol::AsyncIterator,
        WellKnownSymbol::HasInstance,
        WellKnownSymbol::IsConcatSpreadable,
        WellKnownSymbol::Iterator,
        WellKnownSymbol::Match,
        WellKnownSymbol::MatchAll,
        WellKnownSymbol::Replace,
        WellKnownSymbol::Search,
        WellKnownSymbol::Species,
        WellKnownSymbol::Split,
        WellKnownSymbol::ToPrimitive,
        WellKnownSymbol::ToStringTag,
        WellKnownSymbol::Unscopables,
    ];

    pub fn description(self) -> &'static str {
        match self {
            WellKnownSymbol::AsyncIterator => "Symbol.asyncIterator",
            WellKnownSymbol::HasInstance => "Symbol.hasInstance",
            WellKnownSymbol::IsConcatSpreadable => "Symbol.isConcatSpreadable",
            WellKnownSymbol::Iterator => "Symbol.iterator",
            WellKnownSymbol::Match => "Symbol.match",
            WellKnownSymbol::MatchAll => "Symbol.matchAll",
            WellKnownSymbol::Replace => "Symbol.replace",
            WellKnownSymbol::Search => "Symbol.search",
            WellKnownSymbol::Species => "Symbol.species",
            WellKnownSymbol::Split => "Symbol.split",
            WellKnownSymbol::ToPrimitive => "Symbol.toPrimitive",
            WellKnownSymbol::ToStringTag => "Symbol.toStringTag",
            WellKnownSymbol::Unscopables => "Symbol.unscopables",
        }
    }

    /// Property name on the Symbol constructor, e.g. `iterator`.
    pub fn property_name(self) -> &'static str {
        &self.description()["Symbol.".len()..]
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct JsBigInt {
    pub value: Rc<num_bigint::BigInt>,
}

impl JsBigInt {
    pub fn new(value: num_bigint::BigInt) -> Self {
        JsBigInt {
            value: Rc::new(value),
        }
    }
}

impl JsValue {
    pub fn from_str(s: &str) -> Self {
        JsValue::String(JsString::from_str(s))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, JsValue::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, JsValue::Null)
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, JsValue::Undefined | JsValue::Null)
    }

    pub fn is_object(&self) -> bool {
        matches!(self, JsValue::Object(_))
    }

    pub fn as_object(&self) -> Option<&JsObject> {
        match self {
            JsValue::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, JsValue::Object(o) if o.is_callable())
    }

    pub fn is_constructor(&self) -> bool {
        matches!(self, JsValue::Object(o) if o.is_constructor())
    }

    /// The `typeof` result for this value.
    pub fn type_of(&self) -> &'static str {
        match self {
            JsValue::Undefined => "undefined",
            JsValue::Null => "object",
            JsValue::Boolean(_) => "boolean",
            JsValue::Number(_) => "number",
            JsValue::String(_) => "string",
            JsValue::Symbol(_) => "symbol",
            JsValue::BigInt(_) => "bigint",
            JsValue::Object(o) => {
                if o.is_callable() {
                    "function"
                } else {
                    "object"
                }
            }
        }
    }
}

impl From<bool> for JsValue {
    fn from(b: bool) -> Self {
        JsValue::Boolean(b)
    }
}

impl From<f64> for JsValue {
    fn from(n: f64) -> Self {
        JsValue::Number(n)
    }
}

impl From<JsString> for JsValue {
    fn from(s: JsString) -> Self {
        JsValue::String(s)
    }
}

impl From<JsObject> for JsValue {
    fn from(o: JsObject) -> Self {
        JsValue::Object(o)
    }
}

impl From<JsSymbol> for JsValue {
    fn from(s: JsSymbol) -> Self {
        JsValue::Symbol(s)
    }
}

impl From<Option<JsObject>> for JsValue {
    fn from(o: Option<JsObject>) -> Self {
        match o {
            Some(o) => JsValue::Object(o),
            None => JsValue::Null,
        }
    }
}

impl fmt::Debug for JsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => write!(f, "undefined"),
            JsValue::Null => write!(f, "null"),
            JsValue::Boolean(b) => write!(f, "{b}"),
            JsValue::Number(n) => write!(f, "{}", number_ops::to_string(*n)),
            JsValue::String(s) => write!(f, "{s:?}"),
            JsValue::Symbol(s) => write!(f, "{s:?}"),
            JsValue::BigInt(b) => write!(f, "{}n", b.value),
            JsValue::Object(o) => write!(f, "{o:?}"),
        }
    }
}

// §6.1.6.1 Number type operations
pub mod number_ops {
    pub fn exponentiate(base: f64, exponent: f64) -> f64 {
        if exponent.is_nan() {
            return f64::NAN;
        }
        if (base == 1.0 || base == -1.0) && exponent.is_infinite() {
            return f64::NAN;
        }
        base.powf(exponent)
    }

    pub fn remainder(n: f64, d: f64) -> f64 {
        if n.is_nan() || d.is_nan() || n.is_infinite() || d == 0.0 {
            return f64::NAN;
        }
        if d.is_infinite() || n == 0.0 {
            return n;
        }
        n % d
    }

    pub fn left_shift(x: f64, y: f64) -> f64 {
        f64::from(to_int32(x).wrapping_shl(to_uint32(y) & 0x1F))
    }

    pub fn signed_right_shift(x: f64, y: f64) -> f64 {
        f64::from(to_int32(x).wrapping_shr(to_uint32(y) & 0x1F))
    }

    pub fn unsigned_right_shift(x: f64, y: f64) -> f64 {
        f64::from(to_uint32(x).wrapping_shr(to_uint32(y) & 0x1F))
    }

    pub fn same_value(x: f64, y: f64) -> bool {
        if x.is_nan() && y.is_nan() {
            return true;
        }
        if x == 0.0 && y == 0.0 {
            return x.is_sign_positive() == y.is_sign_positive();
        }
        x == y
    }

    pub fn same_value_zero(x: f64, y: f64) -> bool {
        if x.is_nan() && y.is_nan() {
            return true;
        }
        x == y
    }

    // §6.1.6.1.20 Number::toString(x, 10)
    pub fn to_string(x: f64) -> String {
        if x.is_nan() {
            return "NaN".to_string();
        }
        if x == 0.0 {
            return "0".to_string();
        }
        if x.is_infinite() {
            return if x > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
        }
        let mut buf = ryu_js::Buffer::new();
        buf.format(x).to_string()
    }

    pub fn to_string_radix(mut x: f64, radix: u32) -> String {
        if radix == 10 || x.is_nan() || x.is_infinite() || x == 0.0 {
            return to_string(x);
        }
        let negative = x < 0.0;
        if negative {
            x = -x;
        }
        let mut int_part = x.trunc();
        let mut frac = x - int_part;
        let mut digits = Vec::new();
        while int_part >= 1.0 {
            let d = (int_part % f64::from(radix)) as u32;
            digits.push(std::char::from_digit(d, radix).unwrap_or('0'));
            int_part = (int_part / f64::from(radix)).trunc();
        }
        if digits.is_empty() {
            digits.push('0');
        }
        digits.reverse();
        let mut out: String = digits.into_iter().collect();
        if frac > 0.0 {
            out.push('.');
            let mut count = 0;
            while frac > 0.0 && count < 52 {
                frac *= f64::from(radix);
                let d = frac.trunc() as u32;
                out.push(std::char::from_digit(d, radix).unwrap_or('0'));
                frac -= f64::from(d);
                count += 1;
            }
        }
        if negative {
            out.insert(0, '-');
        }
        out
    }

    // §7.1.6 ToInt32 (on an already-converted Number)
    pub fn to_int32(x: f64) -> i32 {
        to_uint32(x) as i32
    }

    // §7.1.7 ToUint32
    pub fn to_uint32(x: f64) -> u32 {
        if x.is_nan() || x.is_infinite() || x == 0.0 {
            return 0;
        }
        let int = x.trunc();
        int.rem_euclid(4_294_967_296.0) as u32
    }

    pub fn to_uint16(x: f64) -> u16 {
        to_uint32(x) as u16
    }
}

// §6.1.6.2 BigInt type operations
pub mod bigint_ops {
    use num_bigint::BigInt;
    use num_traits::{Signed, ToPrimitive, Zero};

    pub fn bitwise_not(x: &BigInt) -> BigInt {
        -(x + BigInt::from(1u8))
    }

    pub fn exponentiate(base: &BigInt, exponent: &BigInt) -> Option<BigInt> {
        if exponent.is_negative() {
            return None;
        }
        let e = exponent.to_u32()?;
        Some(num_traits::pow(base.clone(), e as usize))
    }

    pub fn divide(x: &BigInt, y: &BigInt) -> Option<BigInt> {
        if y.is_zero() { None } else { Some(x / y) }
    }

    pub fn remainder(x: &BigInt, y: &BigInt) -> Option<BigInt> {
        if y.is_zero() { None } else { Some(x % y) }
    }

    pub fn left_shift(x: &BigInt, y: &BigInt) -> BigInt {
        match y.to_i64() {
            Some(s) if s >= 0 => x << (s as usize),
            Some(s) => x >> ((-s) as usize),
            None => BigInt::zero(),
        }
    }

    pub fn signed_right_shift(x: &BigInt, y: &BigInt) -> BigInt {
        left_shift(x, &-y)
    }

    pub fn to_f64(x: &BigInt) -> f64 {
        x.to_f64().unwrap_or(f64::NAN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int32_wraps_large_values() {
        assert_eq!(number_ops::to_int32(4_294_967_296.0 + 5.0), 5);
        assert_eq!(number_ops::to_int32(2_147_483_648.0), -2_147_483_648);
        assert_eq!(number_ops::to_uint32(-1.0), 4_294_967_295);
        assert_eq!(number_ops::to_int32(f64::NAN), 0);
    }

    #[test]
    fn number_to_string_forms() {
        assert_eq!(number_ops::to_string(-0.0), "0");
        assert_eq!(number_ops::to_string(1e21), "1e+21");
        assert_eq!(number_ops::to_string(0.1), "0.1");
        assert_eq!(number_ops::to_string_radix(255.0, 16), "ff");
        assert_eq!(number_ops::to_string_radix(-8.5, 2), "-1000.1");
    }

    #[test]
    fn same_value_distinguishes_zero_and_nan() {
        assert!(number_ops::same_value(f64::NAN, f64::NAN));
        assert!(!number_ops::same_value(0.0, -0.0));
        assert!(number_ops::same_value_zero(0.0, -0.0));
    }

    #[test]
    fn symbols_compare_by_identity() {
        let a = JsSymbol::new(Some(JsString::from_str("x")));
        let b = JsSymbol::new(Some(JsString::from_str("x")));
        assert_ne!(a, b);
        assert_eq!(a.clone(), a);
        assert_eq!(
            JsSymbol::well_known(WellKnownSymbol::Iterator),
            JsSymbol::well_known(WellKnownSymbol::Iterator)
        );
        assert_eq!(WellKnownSymbol::Iterator.property_name(), "iterator");
    }

    #[test]
    fn string_search() {
        let s = JsString::from_str("abcabc");
        assert_eq!(s.index_of(&JsString::from_str("bc"), 2), Some(4));
        assert_eq!(s.last_index_of(&JsString::from_str("a"), 5), Some(3));
        assert_eq!(s.slice(1, 3).to_rust_string(), "bc");
    }
}
