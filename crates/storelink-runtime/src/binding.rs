#![forbid(unsafe_code)]

//! Store-to-property binding for one element.
//!
//! A [`Binding`] is computed once per bind from the component's flattened
//! property declarations. It remembers which properties are store-derived
//! and how to compute them; [`Binding::apply`] then pushes a state snapshot
//! into an element with as little observable churn as possible.
//!
//! # Update pass
//!
//! 1. Evaluate every bound property (path lookup or compute function).
//! 2. Merge in the values from `map_state_to_props`. On a collision the
//!    [`DoubleBindingPolicy`] picks the winner.
//! 3. For each value, skip it if it equals the element's current value.
//! 4. Array properties: a falsy value (`null`, `false`, `0`, `""`) becomes
//!    `[]`, both as the new value and as the previous one. Any other
//!    non-array fails that property only. Splices are computed before the
//!    assignment and announced after it.
//! 5. Read-only properties go through the private setter.
//! 6. If anything changed, call `properties_changed` once.
//!
//! # Invariants
//!
//! 1. The set of bound properties never changes after [`Binding::compute`].
//! 2. The two-way-binding warning is reported exactly once per property per
//!    binding, at compute time.
//! 3. The double-binding warning is reported at most once per property per
//!    binding, however many updates follow.
//! 4. An element whose properties already match the state sees no setter
//!    calls and no `properties_changed` call.
//!
//! # Failure Modes
//!
//! | Failure | Effect |
//! |---------|--------|
//! | Array property given a truthy non-array | That property is skipped; `PropertyUpdateFailed` is reported and the error is returned in the report |
//! | Missing state path | The property receives `null` |

use std::cell::RefCell;

use ahash::AHashSet;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use storelink_core::error::json_type_name;
use storelink_core::{BindingSource, Diagnostic, DiagnosticSink, Error, calculate_splices};

use crate::config::DoubleBindingPolicy;
use crate::descriptor::{PropertyDescriptor, PropertyDescriptorSet, PropertyKind, StateSource};
use crate::element::Element;

/// Outcome of one update pass.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ApplyReport {
    /// Properties that were assigned, in assignment order.
    pub changed: Vec<String>,
    /// Number of splices announced per array property.
    pub splices: IndexMap<String, usize>,
    /// Per-property failures. Other properties were still applied.
    pub errors: Vec<Error>,
}

impl ApplyReport {
    /// Whether nothing was assigned and nothing failed.
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.changed.is_empty() && self.errors.is_empty()
    }
}

/// The store-derived properties of one bound element.
#[derive(Debug)]
pub struct Binding {
    component: String,
    descriptors: PropertyDescriptorSet,
    bound: Vec<String>,
    policy: DoubleBindingPolicy,
    double_reported: RefCell<AHashSet<String>>,
}

impl Binding {
    /// Select the bound properties of `descriptors`.
    ///
    /// Reports a [`Diagnostic::TwoWayBinding`] for every bound property that
    /// is writable and notifies upward.
    pub fn compute(
        component: impl Into<String>,
        descriptors: &PropertyDescriptorSet,
        policy: DoubleBindingPolicy,
        sink: &dyn DiagnosticSink,
    ) -> Self {
        let component = component.into();
        let mut bound = Vec::new();
        for (name, descriptor) in descriptors {
            if !descriptor.is_bound() {
                continue;
            }
            if !descriptor.read_only && descriptor.notify {
                sink.report(Diagnostic::TwoWayBinding {
                    component: component.clone(),
                    property: name.clone(),
                });
            }
            bound.push(name.clone());
        }
        Self {
            component,
            descriptors: descriptors.clone(),
            bound,
            policy,
            double_reported: RefCell::new(AHashSet::new()),
        }
    }

    /// Tag of the component this binding was computed for.
    #[must_use]
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Names of the store-derived properties.
    #[must_use]
    pub fn bound_properties(&self) -> &[String] {
        &self.bound
    }

    /// Whether `name` is store-derived.
    #[must_use]
    pub fn is_bound(&self, name: &str) -> bool {
        self.bound.iter().any(|bound| bound == name)
    }

    /// Number of store-derived properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bound.len()
    }

    /// Whether no property is store-derived; updates then only carry
    /// `map_state_to_props` values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }

    /// Compute every bound property's value from `state`.
    #[must_use]
    pub fn evaluate(&self, element: &dyn Element, state: &Value) -> IndexMap<String, Value> {
        self.bound
            .iter()
            .filter_map(|name| {
                let source = self.source(name)?;
                Some((name.clone(), source.evaluate(state, element)))
            })
            .collect()
    }

    /// Push `state` (and optional mapped values) into `element`.
    pub fn apply(
        &self,
        element: &mut dyn Element,
        state: &Value,
        mapped: Option<Map<String, Value>>,
        sink: &dyn DiagnosticSink,
    ) -> ApplyReport {
        let updates = self.merge(self.evaluate(&*element, state), mapped, sink);

        let mut report = ApplyReport::default();
        for (name, value) in updates {
            let descriptor = self.descriptors.get(&name);
            match self.apply_one(element, &name, value, descriptor) {
                Ok(Some(spliced)) => {
                    if spliced > 0 {
                        report.splices.insert(name.clone(), spliced);
                    }
                    report.changed.push(name);
                }
                Ok(None) => {}
                Err(err) => {
                    sink.report(Diagnostic::PropertyUpdateFailed {
                        component: self.component.clone(),
                        property: name,
                        reason: err.to_string(),
                    });
                    report.errors.push(err);
                }
            }
        }

        if !report.changed.is_empty() {
            element.properties_changed(&report.changed);
        }
        tracing::trace!(
            target: "storelink::binding",
            component = %self.component,
            changed = report.changed.len(),
            errors = report.errors.len(),
            "applied state"
        );
        report
    }

    fn source(&self, name: &str) -> Option<&StateSource> {
        self.descriptors.get(name)?.state_path.as_ref()
    }

    fn merge(
        &self,
        mut values: IndexMap<String, Value>,
        mapped: Option<Map<String, Value>>,
        sink: &dyn DiagnosticSink,
    ) -> IndexMap<String, Value> {
        let Some(mapped) = mapped else {
            return values;
        };
        for (name, value) in mapped {
            if let Some(existing) = values.get_mut(&name) {
                if self.double_reported.borrow_mut().insert(name.clone()) {
                    sink.report(Diagnostic::DoubleBinding {
                        component: self.component.clone(),
                        property: name.clone(),
                        winner: self.policy.winner(),
                    });
                }
                if self.policy.winner() == BindingSource::MappedState {
                    *existing = value;
                }
            } else {
                values.insert(name, value);
            }
        }
        values
    }

    /// Assign one value. Returns the splice count when the property changed.
    fn apply_one(
        &self,
        element: &mut dyn Element,
        name: &str,
        value: Value,
        descriptor: Option<&PropertyDescriptor>,
    ) -> Result<Option<usize>, Error> {
        let previous = element.property(name).unwrap_or(Value::Null);
        if value == previous {
            return Ok(None);
        }

        let kind = descriptor.map(|d| d.kind).unwrap_or_default();
        let read_only = descriptor.is_some_and(|d| d.read_only);

        let mut splices = Vec::new();
        let value = if kind == PropertyKind::Array {
            let next = match value {
                Value::Array(items) => Value::Array(items),
                falsy if is_falsy(&falsy) => Value::Array(Vec::new()),
                other => {
                    return Err(Error::ArrayTypeMismatch {
                        component: self.component.clone(),
                        property: name.to_owned(),
                        found: json_type_name(&other),
                    });
                }
            };
            let before: &[Value] = match &previous {
                Value::Array(items) => items.as_slice(),
                _ => &[],
            };
            if let Value::Array(after) = &next {
                splices = calculate_splices(before, after);
            }
            if next == previous {
                return Ok(None);
            }
            next
        } else {
            value
        };

        if read_only {
            element.set_read_only_property(name, value);
        } else {
            element.set_property(name, value);
        }
        if !splices.is_empty() {
            element.notify_splices(name, &splices);
        }
        Ok(Some(splices.len()))
    }
}

/// `null`, `false`, `0`, and `""` stand for an empty array.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}
