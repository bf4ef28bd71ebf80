//! §15.7 Class definitions and §13.2.5 object initializers, which share
//! method definition evaluation.

use std::rc::Rc;

use crate::abstract_ops::{call, copy_data_properties, create_data_property_or_throw, define_property_or_throw, get};
use crate::ast::{
    ClassElement, ClassNode, Expression, FunctionBody, FunctionKind, FunctionNode, MethodDefinition, MethodKind,
    Pattern, PropertyDefinition, Statement,
};
use crate::completion::Completion;
use crate::engine::{Agent, ErrorKind, IntrinsicId, Message};
use crate::environment::{Environment, new_declarative_environment};
use crate::evaluator::expressions::{evaluate_expression, evaluate_property_name, named_evaluation, resolve_binding};
use crate::evaluator::functions::{instantiate_named, make_constructor, make_method, ordinary_function_create};
use crate::object::function::{ClassFieldDefinition, ConstructorKind, set_function_name};
use crate::object::{JsObject, PropertyDescriptor, PropertyKey};
use crate::types::JsValue;

// §13.2.5.4 object initializer evaluation
pub async fn object_literal_evaluation(agent: &Agent, properties: &[PropertyDefinition]) -> Completion<JsObject> {
    let object = JsObject::ordinary(Some(agent.intrinsic(IntrinsicId::ObjectPrototype)));
    for property in properties {
        match property {
            PropertyDefinition::KeyValue(name, value) => {
                let key = q!(evaluate_property_name(agent, name).await);
                let value = q!(named_evaluation(agent, value, &key).await);
                x!(create_data_property_or_throw(agent, &object, key, value));
            }
            PropertyDefinition::Shorthand(name) => {
                let value = q!(q!(resolve_binding(agent, name, None)).get_value(agent));
                x!(create_data_property_or_throw(agent, &object, PropertyKey::from(&**name), value));
            }
            PropertyDefinition::Proto(value) => {
                let value = q!(evaluate_expression(agent, value).await);
                match value {
                    JsValue::Object(proto) => {
                        q!(object.set_prototype_of(agent, Some(proto)));
                    }
                    JsValue::Null => {
                        q!(object.set_prototype_of(agent, None));
                    }
                    _ => {}
                }
            }
            PropertyDefinition::Method(method) => {
                let env = agent.running_execution_context().lexical_environment();
                q!(method_definition_evaluation(agent, &object, method, &env, true).await);
            }
            PropertyDefinition::Spread(value) => {
                let value = q!(evaluate_expression(agent, value).await);
                q!(copy_data_properties(agent, &object, &value, &[]));
            }
        }
    }
    Completion::Normal(object)
}

// §15.4.4 MethodDefinitionEvaluation
async fn method_definition_evaluation(
    agent: &Agent,
    object: &JsObject,
    method: &MethodDefinition,
    env: &Environment,
    enumerable: bool,
) -> Completion<()> {
    let key = q!(evaluate_property_name(agent, &method.key).await);
    let desc = match method.kind {
        MethodKind::Method => {
            let closure = instantiate_named(agent, &method.function, env, &key);
            make_method(&closure, object);
            PropertyDescriptor::data(JsValue::Object(closure), true, enumerable, true)
        }
        MethodKind::Get | MethodKind::Set => {
            let closure = ordinary_function_create(
                agent,
                agent.intrinsic(IntrinsicId::FunctionPrototype),
                &method.function,
                env,
            );
            make_method(&closure, object);
            let accessor = JsValue::Object(closure.clone());
            if method.kind == MethodKind::Get {
                set_function_name(&closure, &key, Some("get"));
                PropertyDescriptor {
                    get: Some(accessor),
                    enumerable: Some(enumerable),
                    configurable: Some(true),
                    ..Default::default()
                }
            } else {
                set_function_name(&closure, &key, Some("set"));
                PropertyDescriptor {
                    set: Some(accessor),
                    enumerable: Some(enumerable),
                    configurable: Some(true),
                    ..Default::default()
                }
            }
        }
    };
    define_property_or_throw(agent, object, key, desc).map(|_| ())
}

/// The constructor of a class without one: `constructor() {}`, or
/// `constructor(...args) { super(...args); }` for a derived class.
fn default_constructor(class: &ClassNode) -> Rc<FunctionNode> {
    let derived = class.heritage.is_some();
    let (rest, body) = if derived {
        let args: Rc<str> = Rc::from("args");
        let super_call = Expression::SuperCall(
            vec![Expression::Spread(Box::new(Expression::Identifier(args.clone())))],
            Default::default(),
        );
        (Some(Pattern::Identifier(args)), vec![Statement::Expression(super_call)])
    } else {
        (None, Vec::new())
    };
    Rc::new(FunctionNode {
        name: class.name.clone(),
        params: Vec::new(),
        rest,
        body: FunctionBody::Block(body),
        kind: FunctionKind::ClassConstructor,
        is_async: false,
        is_generator: false,
        strict: true,
        derived,
        source_text: class.source_text.clone(),
        position: Default::default(),
    })
}

/// A field definition waiting for the class constructor to exist.
struct FieldRecord {
    name: PropertyKey,
    initializer: Option<JsObject>,
}

// §15.7.14 ClassDefinitionEvaluation
pub async fn class_definition_evaluation(
    agent: &Agent,
    class: &Rc<ClassNode>,
    binding: Option<Rc<str>>,
    name: PropertyKey,
) -> Completion<JsObject> {
    let ctx = agent.running_execution_context();
    let env = ctx.lexical_environment();
    let class_env = new_declarative_environment(Some(env.clone()));
    if let Some(binding) = &binding {
        x!(class_env.create_immutable_binding(agent, binding, true));
    }

    let (proto_parent, constructor_parent) = match &class.heritage {
        None => (
            Some(agent.intrinsic(IntrinsicId::ObjectPrototype)),
            agent.intrinsic(IntrinsicId::FunctionPrototype),
        ),
        Some(heritage) => {
            ctx.set_lexical_environment(class_env.clone());
            let superclass = evaluate_expression(agent, heritage).await;
            ctx.set_lexical_environment(env.clone());
            match q!(superclass) {
                JsValue::Null => (None, agent.intrinsic(IntrinsicId::FunctionPrototype)),
                JsValue::Object(superclass) if superclass.is_constructor() => {
                    let proto_parent = q!(get(agent, &superclass, &PropertyKey::from("prototype")));
                    match proto_parent {
                        JsValue::Object(p) => (Some(p), superclass),
                        JsValue::Null => (None, superclass),
                        other => {
                            return agent.throw(ErrorKind::Type, Message::PrototypeNotObject(agent.inspect(&other)));
                        }
                    }
                }
                other => {
                    return agent.throw(ErrorKind::Type, Message::NotAConstructor(agent.inspect(&other)));
                }
            }
        }
    };
    let proto = JsObject::ordinary(proto_parent);

    ctx.set_lexical_environment(class_env.clone());
    let constructor_node = class.constructor.clone().unwrap_or_else(|| default_constructor(class));
    let f = ordinary_function_create(agent, constructor_parent, &constructor_node, &class_env);
    set_function_name(&f, &name, None);
    make_constructor(agent, &f, false, Some(proto.clone()));
    if let Some(data) = f.function_data() {
        if class.heritage.is_some() {
            data.constructor_kind.set(ConstructorKind::Derived);
        }
        data.is_class_constructor.set(true);
    }
    make_method(&f, &proto);
    x!(define_property_or_throw(
        agent,
        &proto,
        PropertyKey::from("constructor"),
        PropertyDescriptor::data(JsValue::Object(f.clone()), true, false, true),
    ));

    let mut instance_fields = Vec::new();
    let mut static_fields = Vec::new();
    for element in &class.elements {
        let result = class_element_evaluation(agent, element, &f, &proto, &class_env).await;
        match result {
            Completion::Normal(Some((true, field))) => static_fields.push(field),
            Completion::Normal(Some((false, field))) => instance_fields.push(ClassFieldDefinition {
                name: field.name,
                initializer: field.initializer,
            }),
            Completion::Normal(None) => {}
            abrupt => {
                ctx.set_lexical_environment(env);
                return abrupt.into_abrupt();
            }
        }
    }
    ctx.set_lexical_environment(env);
    if let Some(binding) = &binding {
        x!(class_env.initialize_binding(agent, binding, JsValue::Object(f.clone())));
    }
    if let Some(data) = f.function_data() {
        *data.fields.borrow_mut() = instance_fields;
    }
    let receiver = JsValue::Object(f.clone());
    for field in static_fields {
        let value = match &field.initializer {
            Some(init) => q!(call(agent, &JsValue::Object(init.clone()), &receiver, &[])),
            None => JsValue::Undefined,
        };
        q!(create_data_property_or_throw(agent, &f, field.name, value));
    }
    Completion::Normal(f)
}

// §15.7.13 ClassElementEvaluation. Fields come back for the caller to
// install, tagged with whether they are static.
async fn class_element_evaluation(
    agent: &Agent,
    element: &ClassElement,
    constructor: &JsObject,
    proto: &JsObject,
    class_env: &Environment,
) -> Completion<Option<(bool, FieldRecord)>> {
    match element {
        ClassElement::Method(method) => {
            let home = if method.is_static { constructor } else { proto };
            q!(method_definition_evaluation(agent, home, method, class_env, false).await);
            Completion::Normal(None)
        }
        ClassElement::Field {
            key,
            initializer,
            is_static,
        } => {
            // §15.7.10 ClassFieldDefinitionEvaluation
            let home = if *is_static { constructor } else { proto };
            let name = q!(evaluate_property_name(agent, key).await);
            let initializer = initializer.as_ref().map(|node| {
                let init = ordinary_function_create(
                    agent,
                    agent.intrinsic(IntrinsicId::FunctionPrototype),
                    node,
                    class_env,
                );
                make_method(&init, home);
                init
            });
            Completion::Normal(Some((*is_static, FieldRecord { name, initializer })))
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::evaluator::test_support::eval_to_string;

    #[test]
    fn object_literals_cover_every_property_form() {
        assert_eq!(
            eval_to_string(
                "var k = 'dyn', a = 1; var o = { a, [k]: 2, m() { return this.a; }, get g() { return 3; }, ...{ s: 4 } }; [o.a, o.dyn, o.m(), o.g, o.s].join()"
            ),
            "1,2,1,3,4"
        );
        assert_eq!(eval_to_string("var p = { x: 1 }; var o = { __proto__: p }; o.x"), "1");
        assert_eq!(eval_to_string("var o = { f: function () {} }; o.f.name"), "f");
        assert_eq!(eval_to_string("var o = { get x() { return 1; } }; Object.getOwnPropertyDescriptor(o, 'x').get.name"), "get x");
    }

    #[test]
    fn getter_and_setter_pairs_share_one_property() {
        assert_eq!(
            eval_to_string("var o = { v: 0, get x() { return this.v; }, set x(n) { this.v = n * 2; } }; o.x = 4; o.x"),
            "8"
        );
    }

    #[test]
    fn classes_with_methods_statics_and_accessors() {
        assert_eq!(
            eval_to_string(
                "class A { constructor(x) { this.x = x; } get double() { return this.x * 2; } static make() { return new A(4); } }
                 A.make().double"
            ),
            "8"
        );
        assert_eq!(eval_to_string("class A { m() {} } Object.keys(A.prototype).length"), "0");
    }

    #[test]
    fn derived_classes_and_super() {
        assert_eq!(
            eval_to_string(
                "class A { constructor(n) { this.n = n; } hi() { return 'A' + this.n; } }
                 class B extends A { hi() { return super.hi() + 'B'; } }
                 new B(1).hi()"
            ),
            "A1B"
        );
        assert!(
            eval_to_string("class A {} class B extends A { constructor() { this.x = 1; super(); } } new B()")
                .starts_with("Throw: ReferenceError")
        );
        assert!(eval_to_string("class B extends 3 {}").starts_with("Throw: TypeError"));
        assert_eq!(eval_to_string("class N extends null {} Object.getPrototypeOf(N.prototype)"), "null");
    }

    #[test]
    fn fields_initialize_per_instance_and_statics_once() {
        assert_eq!(
            eval_to_string(
                "var n = 0; class A { x = ++n; y = this.x * 10; static count = 'static'; }
                 var a = new A(), b = new A(); [a.x, a.y, b.x, A.count].join()"
            ),
            "1,10,2,static"
        );
        assert_eq!(
            eval_to_string("class A { a = 1; } class B extends A { b = this.a + 1; } new B().b"),
            "2"
        );
    }

    #[test]
    fn class_binding_is_immutable_inside_and_tdz_outside() {
        assert!(eval_to_string("class C { static m() { C = 1; } } C.m()").starts_with("Throw: TypeError"));
        assert!(eval_to_string("new C(); class C {}").starts_with("Throw: ReferenceError"));
    }
}
