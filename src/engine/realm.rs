//! §9.3 Realms.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::engine::Agent;
use crate::environment::Environment;
use crate::modules::ModuleId;
use crate::object::JsObject;

/// The well-known intrinsic objects (Table 6) this engine provides.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum IntrinsicId {
    Array,
    ArrayIteratorPrototype,
    ArrayPrototype,
    ArrayProtoValues,
    AsyncFromSyncIteratorPrototype,
    AsyncFunction,
    AsyncFunctionPrototype,
    AsyncGenerator,
    AsyncGeneratorFunction,
    AsyncGeneratorPrototype,
    AsyncIteratorPrototype,
    BigInt,
    BigIntPrototype,
    Boolean,
    BooleanPrototype,
    Error,
    ErrorPrototype,
    Eval,
    EvalError,
    EvalErrorPrototype,
    ForInIteratorPrototype,
    Function,
    FunctionPrototype,
    Generator,
    GeneratorFunction,
    GeneratorPrototype,
    IsFinite,
    IsNaN,
    IteratorPrototype,
    Json,
    Map,
    MapIteratorPrototype,
    MapPrototype,
    Math,
    Number,
    NumberPrototype,
    Object,
    ObjectPrototype,
    ParseFloat,
    ParseInt,
    Promise,
    PromisePrototype,
    Proxy,
    RangeError,
    RangeErrorPrototype,
    ReferenceError,
    ReferenceErrorPrototype,
    Reflect,
    RegExp,
    RegExpPrototype,
    Set,
    SetIteratorPrototype,
    SetPrototype,
    String,
    StringIteratorPrototype,
    StringPrototype,
    Symbol,
    SymbolPrototype,
    SyntaxError,
    SyntaxErrorPrototype,
    ThrowTypeError,
    TypeError,
    TypeErrorPrototype,
    UriError,
    UriErrorPrototype,
}

pub struct RealmRecord {
    intrinsics: RefCell<FxHashMap<IntrinsicId, JsObject>>,
    global_object: RefCell<Option<JsObject>>,
    global_env: RefCell<Option<Environment>>,
    /// [[TemplateMap]], keyed by the address of the template literal node.
    template_map: RefCell<FxHashMap<usize, JsObject>>,
    /// Host module resolution cache keyed `referrer\0specifier`.
    module_map: RefCell<FxHashMap<String, ModuleId>>,
}

#[derive(Clone)]
pub struct Realm(Rc<RealmRecord>);

impl Realm {
    pub fn ptr_eq(&self, other: &Realm) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Panics if the intrinsic was never created; the intrinsic table is
    /// closed and fully populated by CreateIntrinsics.
    pub fn intrinsic(&self, id: IntrinsicId) -> JsObject {
        match self.0.intrinsics.borrow().get(&id) {
            Some(o) => o.clone(),
            None => panic!("intrinsic {id:?} is missing"),
        }
    }

    pub fn set_intrinsic(&self, id: IntrinsicId, object: JsObject) {
        self.0.intrinsics.borrow_mut().insert(id, object);
    }

    pub fn global_object(&self) -> JsObject {
        match &*self.0.global_object.borrow() {
            Some(o) => o.clone(),
            None => panic!("realm has no global object"),
        }
    }

    pub fn global_env(&self) -> Environment {
        match &*self.0.global_env.borrow() {
            Some(e) => e.clone(),
            None => panic!("realm has no global environment"),
        }
    }

    pub fn set_global(&self, object: JsObject, env: Environment) {
        *self.0.global_object.borrow_mut() = Some(object);
        *self.0.global_env.borrow_mut() = Some(env);
    }

    pub fn template(&self, site: usize) -> Option<JsObject> {
        self.0.template_map.borrow().get(&site).cloned()
    }

    pub fn remember_template(&self, site: usize, template: JsObject) {
        self.0.template_map.borrow_mut().insert(site, template);
    }

    pub fn cached_module(&self, key: &str) -> Option<ModuleId> {
        self.0.module_map.borrow().get(key).copied()
    }

    pub fn cache_module(&self, key: String, module: ModuleId) {
        self.0.module_map.borrow_mut().insert(key, module);
    }
}

// §9.3.1 CreateRealm
pub fn create_realm(agent: &Agent) -> Realm {
    let realm = Realm(Rc::new(RealmRecord {
        intrinsics: RefCell::new(FxHashMap::default()),
        global_object: RefCell::new(None),
        global_env: RefCell::new(None),
        template_map: RefCell::new(FxHashMap::default()),
        module_map: RefCell::new(FxHashMap::default()),
    }));
    crate::builtins::create_intrinsics(agent, &realm);
    debug!(intrinsics = realm.0.intrinsics.borrow().len(), "realm created");
    realm
}
