//! Handler registry and compatibility checking.
//!
//! A form's submit step may only bind to a handler already present in a
//! caller-supplied registry, matched by exact name, field-type list, and
//! capability set. The same check runs twice: once when the form is
//! built (construction time) and again when a submitted form's
//! serialized metadata comes back (the registry on the receiving side
//! may differ from the one the form was built against).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::handler::{EffectError, Result};

/// The type of one form field, as accumulated during form construction
/// and recorded in handler registrations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    /// Free text.
    Text,
    /// Integer.
    Int,
    /// Boolean.
    Bool,
    /// Floating point.
    Float,
    /// A group of selections, one value per chosen option. A checkbox
    /// group over element type `t` yields `List(t)`, not `t`.
    List(Box<FieldType>),
}

/// An effect capability a form handler may require from its execution
/// environment. The core never implements these; it only records and
/// compares them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Capability {
    /// Web request/response access.
    Cgi,
    /// Session state access.
    Session,
    /// Database access.
    Sqlite,
}

/// The set of capabilities declared for a handler. Ordered so that
/// equality and serialization are canonical.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    /// The empty capability set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one capability, builder style.
    pub fn with(mut self, cap: Capability) -> Self {
        self.0.insert(cap);
        self
    }

    /// Membership test.
    pub fn contains(&self, cap: Capability) -> bool {
        self.0.contains(&cap)
    }

    /// Number of capabilities in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no capability is declared.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<T: IntoIterator<Item = Capability>>(iter: T) -> Self {
        CapabilitySet(iter.into_iter().collect())
    }
}

/// The equality-comparable reification of a handler's shape: its name,
/// its field types in source order, and its capability set. This is
/// what crosses the wire inside a rendered form and comes back with a
/// submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerMetadata {
    /// Registry name of the handler.
    pub name: String,
    /// Field types in source order.
    pub fields: Vec<FieldType>,
    /// Capabilities the handler requires.
    pub caps: CapabilitySet,
}

/// A parsed submission value. Every position is absent-capable: a
/// missing or malformed input parses to `None` in that position rather
/// than failing the whole submission.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Text field value.
    Text(Option<String>),
    /// Integer field value.
    Int(Option<i64>),
    /// Boolean field value.
    Bool(Option<bool>),
    /// Float field value.
    Float(Option<f64>),
    /// Selection-group values, one per chosen option.
    List(Option<Vec<FieldValue>>),
}

impl FieldValue {
    /// True when this value is of the given field type's shape.
    pub fn matches(&self, ty: &FieldType) -> bool {
        match (self, ty) {
            (FieldValue::Text(_), FieldType::Text) => true,
            (FieldValue::Int(_), FieldType::Int) => true,
            (FieldValue::Bool(_), FieldType::Bool) => true,
            (FieldValue::Float(_), FieldType::Float) => true,
            (FieldValue::List(None), FieldType::List(_)) => true,
            (FieldValue::List(Some(items)), FieldType::List(elem)) => {
                items.iter().all(|item| item.matches(elem))
            }
            _ => false,
        }
    }
}

/// Parses the raw strings submitted for one field position into a
/// [`FieldValue`] of the registered type. Scalars use the first
/// submitted value; a selection group parses every submitted value with
/// the element type. Malformed input becomes `None`, never an error.
pub fn parse_field(ty: &FieldType, raw: &[String]) -> FieldValue {
    match ty {
        FieldType::Text => FieldValue::Text(raw.first().cloned()),
        FieldType::Int => FieldValue::Int(raw.first().and_then(|s| s.trim().parse().ok())),
        FieldType::Bool => FieldValue::Bool(raw.first().and_then(|s| parse_bool(s))),
        FieldType::Float => FieldValue::Float(raw.first().and_then(|s| s.trim().parse().ok())),
        FieldType::List(elem) => FieldValue::List(Some(
            raw.iter()
                .map(|value| parse_field(elem, std::slice::from_ref(value)))
                .collect(),
        )),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        "true" | "1" | "on" | "yes" => Some(true),
        "false" | "0" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// The function a registration stores. Invoked with the parsed,
/// absent-capable field values; the registered capability set names the
/// context features it may use.
pub type HandlerFn<C> = fn(&mut C, &[FieldValue]) -> Result<()>;

/// One registry entry: field types, capability set, function, name.
pub struct HandlerRegistration<C> {
    /// Registry name, unique within the list.
    pub name: String,
    /// Field types in source order.
    pub fields: Vec<FieldType>,
    /// Declared capability set.
    pub caps: CapabilitySet,
    /// The handler function itself.
    pub func: HandlerFn<C>,
}

impl<C> HandlerRegistration<C> {
    /// The entry's reified shape.
    pub fn metadata(&self) -> HandlerMetadata {
        HandlerMetadata {
            name: self.name.clone(),
            fields: self.fields.clone(),
            caps: self.caps.clone(),
        }
    }
}

impl<C> Clone for HandlerRegistration<C> {
    fn clone(&self) -> Self {
        HandlerRegistration {
            name: self.name.clone(),
            fields: self.fields.clone(),
            caps: self.caps.clone(),
            func: self.func,
        }
    }
}

impl<C> std::fmt::Debug for HandlerRegistration<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistration")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("caps", &self.caps)
            .finish()
    }
}

/// Proof that a handler shape was resolved against a registry. The only
/// way to obtain one is [`HandlerList::resolve_handler`], so a submit
/// step cannot name an unregistered handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedHandler(HandlerMetadata);

impl ResolvedHandler {
    /// The resolved shape.
    pub fn metadata(&self) -> &HandlerMetadata {
        &self.0
    }
}

/// Ordered list of handler registrations, searched by linear scan.
pub struct HandlerList<C> {
    entries: Vec<HandlerRegistration<C>>,
}

impl<C> Default for HandlerList<C> {
    fn default() -> Self {
        HandlerList {
            entries: Vec::new(),
        }
    }
}

impl<C> HandlerList<C> {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a registration. Names are unique; re-registering a name is
    /// rejected rather than shadowed.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        fields: Vec<FieldType>,
        caps: CapabilitySet,
        func: HandlerFn<C>,
    ) -> Result<()> {
        let name = name.into();
        if self.find(&name).is_some() {
            return Err(EffectError::DuplicateHandler(name));
        }
        debug!(name = %name, fields = ?fields, "registering form handler");
        self.entries.push(HandlerRegistration {
            name,
            fields,
            caps,
            func,
        });
        Ok(())
    }

    /// Looks up an entry by name.
    pub fn find(&self, name: &str) -> Option<&HandlerRegistration<C>> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact-match lookup: the named entry must exist and its field
    /// types and capability set must equal the given shape. No
    /// structural coercion is attempted.
    pub fn resolve(
        &self,
        name: &str,
        fields: &[FieldType],
        caps: &CapabilitySet,
    ) -> Result<&HandlerRegistration<C>> {
        let entry = self
            .find(name)
            .ok_or_else(|| EffectError::UnknownHandler(name.to_string()))?;
        if entry.fields == fields && entry.caps == *caps {
            Ok(entry)
        } else {
            warn!(
                name = %name,
                expected = ?entry.fields,
                submitted = ?fields,
                "handler shape mismatch"
            );
            Err(EffectError::HandlerMismatch {
                name: name.to_string(),
            })
        }
    }

    /// Resolves a shape into a token usable by the form effect's submit
    /// operation.
    pub fn resolve_handler(
        &self,
        name: &str,
        fields: &[FieldType],
        caps: &CapabilitySet,
    ) -> Result<ResolvedHandler> {
        self.resolve(name, fields, caps)
            .map(|entry| ResolvedHandler(entry.metadata()))
    }

    /// Lookup-and-invoke for a submitted form.
    ///
    /// Deserializes the submission's handler metadata, repeats the
    /// exact-match compatibility check against this registry, parses
    /// the raw field values with the registered field types, and
    /// invokes the stored function. Every mismatch is a rejection
    /// value; adversarial input never panics.
    pub fn dispatch(&self, ctx: &mut C, metadata_bytes: &[u8], raw: &[Vec<String>]) -> Result<()> {
        let metadata: HandlerMetadata = bincode::deserialize(metadata_bytes)
            .map_err(|err| EffectError::Metadata(err.to_string()))?;
        let entry = self.resolve(&metadata.name, &metadata.fields, &metadata.caps)?;
        let values: Vec<FieldValue> = entry
            .fields
            .iter()
            .enumerate()
            .map(|(position, ty)| {
                let submitted = raw.get(position).map(Vec::as_slice).unwrap_or(&[]);
                parse_field(ty, submitted)
            })
            .collect();
        debug!(name = %entry.name, values = ?values, "dispatching submitted form");
        (entry.func)(ctx, &values)
    }
}

impl<C> std::fmt::Debug for HandlerList<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerList")
            .field("entries", &self.entries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_parsing_is_absent_capable() {
        let int = parse_field(&FieldType::Int, &["41".to_string()]);
        assert_eq!(int, FieldValue::Int(Some(41)));
        let bad = parse_field(&FieldType::Int, &["forty-one".to_string()]);
        assert_eq!(bad, FieldValue::Int(None));
        let missing = parse_field(&FieldType::Text, &[]);
        assert_eq!(missing, FieldValue::Text(None));
    }

    #[test]
    fn list_parsing_uses_the_element_type() {
        let ty = FieldType::List(Box::new(FieldType::Bool));
        let parsed = parse_field(&ty, &["on".to_string(), "off".to_string()]);
        assert_eq!(
            parsed,
            FieldValue::List(Some(vec![
                FieldValue::Bool(Some(true)),
                FieldValue::Bool(Some(false)),
            ]))
        );
        assert!(parsed.matches(&ty));
        assert!(!parsed.matches(&FieldType::Bool));
    }

    #[test]
    fn empty_selection_is_an_empty_list() {
        let ty = FieldType::List(Box::new(FieldType::Text));
        assert_eq!(parse_field(&ty, &[]), FieldValue::List(Some(vec![])));
    }
}
