//! `bind` - one-way propagation from a source property to a target attribute.

use std::rc::Rc;

use super::Directive;
use crate::app::Application;
use crate::builder::pre_hook;
use crate::template::{Scope, ValueFn};
use crate::types::{ObjectId, Value};

pub struct Bind;

impl Directive for Bind {
    fn bind(
        &self,
        app: &Application,
        source: ObjectId,
        target: ObjectId,
        argument: &str,
        value: &ValueFn,
        triggers: &[String],
    ) {
        for trigger in triggers {
            if app.view_models().category(source, trigger).is_none() {
                // Not reactive on the source: the initial value is all it gets.
                tracing::trace!(%source, trigger = trigger.as_str(), "bind trigger is not reactive");
                continue;
            }
            let value = Rc::clone(value);
            let argument = argument.to_string();
            app.view_models().add_dependency(
                source,
                trigger,
                Rc::new(move |app: &Application, _changed: &Value| {
                    if !app.is_live(source) || !app.is_live(target) {
                        return;
                    }
                    let tag = app.objects().blueprint_of(target).unwrap_or_default();
                    let next = pre_hook(app, source, &tag, &argument, value(&Scope::new(app, source)));
                    app.assign(target, &argument, next);
                }),
            );
        }
    }
}
