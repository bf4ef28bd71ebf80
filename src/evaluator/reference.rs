//! §6.2.5 The Reference Record Specification Type.

use crate::abstract_ops::conversion::to_object;
use crate::completion::Completion;
use crate::engine::{Agent, ErrorKind, Message};
use crate::environment::Environment;
use crate::object::PropertyKey;
use crate::types::JsValue;

pub enum ReferenceBase {
    /// A property reference on a value (`o.p`, `o[k]`, `super.p`).
    Value(JsValue),
    Environment(Environment),
    Unresolvable,
}

pub struct Reference {
    pub base: ReferenceBase,
    pub name: PropertyKey,
    pub strict: bool,
    /// Set only for `super` references.
    pub this_value: Option<JsValue>,
}

impl Reference {
    pub fn property(base: JsValue, name: PropertyKey, strict: bool) -> Self {
        Reference {
            base: ReferenceBase::Value(base),
            name,
            strict,
            this_value: None,
        }
    }

    pub fn is_property_reference(&self) -> bool {
        matches!(self.base, ReferenceBase::Value(_))
    }

    pub fn is_unresolvable(&self) -> bool {
        matches!(self.base, ReferenceBase::Unresolvable)
    }

    pub fn is_super_reference(&self) -> bool {
        self.this_value.is_some()
    }

    fn binding_name(&self) -> String {
        self.name.to_string()
    }

    // §6.2.5.7 GetThisValue
    pub fn get_this_value(&self) -> JsValue {
        if let Some(this) = &self.this_value {
            return this.clone();
        }
        match &self.base {
            ReferenceBase::Value(v) => v.clone(),
            _ => unreachable!("GetThisValue on a non-property reference"),
        }
    }

    // §6.2.5.5 GetValue
    pub fn get_value(&self, agent: &Agent) -> Completion {
        match &self.base {
            ReferenceBase::Unresolvable => {
                agent.throw(ErrorKind::Reference, Message::NotDefined(self.binding_name()))
            }
            ReferenceBase::Value(base) => {
                let object = q!(to_object(agent, base));
                object.get(agent, &self.name, &self.get_this_value())
            }
            ReferenceBase::Environment(env) => {
                env.get_binding_value(agent, &self.binding_name(), self.strict)
            }
        }
    }

    // §6.2.5.6 PutValue
    pub fn put_value(&self, agent: &Agent, value: JsValue) -> Completion<()> {
        match &self.base {
            ReferenceBase::Unresolvable => {
                if self.strict {
                    return agent.throw(ErrorKind::Reference, Message::NotDefined(self.binding_name()));
                }
                let global = agent.current_realm().global_object();
                q!(global.set(agent, self.name.clone(), value, &JsValue::Object(global.clone())));
                Completion::Normal(())
            }
            ReferenceBase::Value(base) => {
                let object = q!(to_object(agent, base));
                let succeeded = q!(object.set(agent, self.name.clone(), value, &self.get_this_value()));
                if !succeeded && self.strict {
                    return agent.throw(
                        ErrorKind::Type,
                        Message::CannotSetProperty(format!("{} of {}", self.name, agent.inspect(base))),
                    );
                }
                Completion::Normal(())
            }
            ReferenceBase::Environment(env) => {
                env.set_mutable_binding(agent, &self.binding_name(), value, self.strict)
            }
        }
    }

    // §6.2.5.8 InitializeReferencedBinding
    pub fn initialize_referenced_binding(&self, agent: &Agent, value: JsValue) -> Completion<()> {
        match &self.base {
            ReferenceBase::Environment(env) => env.initialize_binding(agent, &self.binding_name(), value),
            _ => unreachable!("InitializeReferencedBinding on a non-environment reference"),
        }
    }

    // §13.5.1.2 the `delete` operator applied to a reference
    pub fn delete(&self, agent: &Agent) -> Completion<bool> {
        match &self.base {
            ReferenceBase::Unresolvable => Completion::Normal(true),
            ReferenceBase::Value(base) => {
                if self.is_super_reference() {
                    return agent.throw(
                        ErrorKind::Reference,
                        Message::Syntax("Unsupported reference to 'super'".to_owned()),
                    );
                }
                let object = q!(to_object(agent, base));
                let deleted = q!(object.delete(agent, &self.name));
                if !deleted && self.strict {
                    return agent.throw(ErrorKind::Type, Message::StrictModeDelete(self.binding_name()));
                }
                Completion::Normal(deleted)
            }
            ReferenceBase::Environment(env) => env.delete_binding(agent, &self.binding_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abstract_ops::{create_data_property_or_throw, make_basic_object};
    use crate::engine::test_agent;

    #[test]
    fn unresolvable_reads_throw_and_sloppy_writes_create_globals() {
        let agent = test_agent();
        let reference = Reference {
            base: ReferenceBase::Unresolvable,
            name: PropertyKey::from("fresh"),
            strict: false,
            this_value: None,
        };
        assert!(reference.get_value(&agent).is_throw());
        x!(reference.put_value(&agent, JsValue::Number(4.0)));
        let global = agent.current_realm().global_object();
        assert!(matches!(
            global.own_data_value(&PropertyKey::from("fresh")),
            Some(JsValue::Number(n)) if n == 4.0
        ));

        let strict = Reference {
            strict: true,
            name: PropertyKey::from("other"),
            ..reference
        };
        assert!(strict.put_value(&agent, JsValue::Null).is_throw());
    }

    #[test]
    fn property_references_read_through_primitives() {
        let agent = test_agent();
        let reference = Reference::property(JsValue::from_str("abc"), PropertyKey::from("length"), true);
        let length = x!(reference.get_value(&agent));
        assert!(matches!(length, JsValue::Number(n) if n == 3.0));
    }

    #[test]
    fn strict_delete_of_non_configurable_throws() {
        let agent = test_agent();
        let o = make_basic_object(&agent);
        x!(create_data_property_or_throw(&agent, &o, "x".into(), JsValue::Null));
        let sloppy = Reference::property(JsValue::Object(o.clone()), "x".into(), false);
        assert!(x!(sloppy.delete(&agent)));
        let frozen = Reference::property(JsValue::from_str("abc"), "length".into(), true);
        assert!(frozen.delete(&agent).is_throw());
    }
}
