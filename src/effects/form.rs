//! Form-construction protocol effect.
//!
//! A form is built field by field, declares the effect capabilities its
//! handler will need, and terminates with a submit step - the only
//! transition that returns the build state to empty. Submit requires a
//! handler whose registered shape exactly matches the accumulated field
//! types and declared capabilities; anything else is rejected before
//! the form exists.
//!
//! Two surfaces drive the same state machine. The builder methods on
//! [`FormBuilder`]/[`ReadyForm`] are the direct, construction-time path
//! used when rendering a page. The [`Operation`] types let the same
//! transitions run inside an effect program, where
//! [`DeclareEffects`] and [`Submit`] change the resource's type - the
//! shape-changing steps that need [`EffM`](crate::EffM).

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::algebra::Operation;
use crate::handler::{EffectError, Result};
use crate::registry::{CapabilitySet, FieldType, HandlerList, HandlerMetadata, ResolvedHandler};

/// One rendered form element. HTML rendering belongs to the transport
/// layer; the core only records what was built, in source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Element {
    /// Single-value text input.
    TextBox {
        /// Type the submitted value parses as.
        ty: FieldType,
        /// Optional initial contents.
        initial: Option<String>,
    },
    /// Drop-down selection over (value, shown label) pairs.
    SelectionBox {
        /// Type the submitted value parses as.
        ty: FieldType,
        /// Options as (submitted value, displayed label).
        options: Vec<(String, String)>,
    },
    /// Radio group; yields the chosen option's integer value.
    RadioGroup {
        /// Submitted values, one per button.
        options: Vec<String>,
        /// Index of the initially selected button.
        default: usize,
    },
    /// Checkbox group; yields one value per checked option.
    CheckBoxes {
        /// Element type of each checked value.
        ty: FieldType,
        /// Options as (submitted value, initially checked).
        options: Vec<(String, bool)>,
    },
}

/// Form build state: fields accumulated so far. Field types are
/// prepended as built and reversed into source order at submit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormBuilder {
    fields: Vec<FieldType>,
    elements: Vec<Element>,
}

impl FormBuilder {
    /// Starts a form with no fields.
    pub fn new() -> Self {
        Self::default()
    }

    /// Field types accumulated so far, newest first.
    pub fn fields(&self) -> &[FieldType] {
        &self.fields
    }

    fn push(mut self, ty: FieldType, element: Element) -> Self {
        self.fields.insert(0, ty);
        self.elements.push(element);
        self
    }

    /// Adds a text box of the given type.
    pub fn text_box(self, ty: FieldType, initial: Option<String>) -> Self {
        self.push(ty.clone(), Element::TextBox { ty, initial })
    }

    /// Adds a selection box of the given type.
    pub fn selection_box(self, ty: FieldType, options: Vec<(String, String)>) -> Self {
        self.push(ty.clone(), Element::SelectionBox { ty, options })
    }

    /// Adds a radio group; the field it contributes is an integer.
    pub fn radio_group(self, options: Vec<String>, default: usize) -> Self {
        self.push(FieldType::Int, Element::RadioGroup { options, default })
    }

    /// Adds a checkbox group over element type `ty`; the field it
    /// contributes is `List(ty)`, one value per checked option.
    pub fn check_boxes(self, ty: FieldType, options: Vec<(String, bool)>) -> Self {
        self.push(
            FieldType::List(Box::new(ty.clone())),
            Element::CheckBoxes { ty, options },
        )
    }

    /// Declares the capability set the eventual handler runs under,
    /// independent of field count. No further fields can be added.
    pub fn declare(self, caps: CapabilitySet) -> ReadyForm {
        ReadyForm {
            fields: self.fields,
            elements: self.elements,
            caps,
        }
    }
}

/// Form build state after capability declaration: ready to submit.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadyForm {
    fields: Vec<FieldType>,
    elements: Vec<Element>,
    caps: CapabilitySet,
}

impl ReadyForm {
    /// Field types in source order: accumulation is newest-first, so
    /// the list is reversed before use.
    pub fn shape(&self) -> Vec<FieldType> {
        let mut shape = self.fields.clone();
        shape.reverse();
        shape
    }

    /// Declared capability set.
    pub fn caps(&self) -> &CapabilitySet {
        &self.caps
    }

    /// Terminates form construction against a registry entry.
    ///
    /// Succeeds only if `name` is registered with exactly this form's
    /// field shape and capability set; any mismatch rejects the form
    /// before it can be rendered or submitted.
    pub fn submit<C>(self, registry: &HandlerList<C>, name: &str) -> Result<Form> {
        let shape = self.shape();
        let entry = registry.resolve(name, &shape, &self.caps)?;
        let metadata = entry.metadata();
        debug!(name = %metadata.name, "form accepted at construction");
        Ok(self.into_form(metadata))
    }

    /// Terminates form construction against a pre-resolved handler
    /// token, auditing the accumulated state against the token's shape.
    /// Used by the [`Submit`] operation inside effect programs.
    pub fn submit_resolved(self, handler: ResolvedHandler) -> Result<Form> {
        let metadata = handler.metadata();
        if self.shape() == metadata.fields && self.caps == metadata.caps {
            Ok(self.into_form(handler.metadata().clone()))
        } else {
            Err(EffectError::HandlerMismatch {
                name: metadata.name.clone(),
            })
        }
    }

    fn into_form(self, metadata: HandlerMetadata) -> Form {
        Form {
            elements: self.elements,
            metadata,
        }
    }
}

/// Terminal state: a finished form. The build state is empty again;
/// only [`Submit`] produces this.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormDone;

/// A validated form: its elements in source order plus the handler
/// metadata a transport embeds for the round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct Form {
    /// Rendered elements in source order.
    pub elements: Vec<Element>,
    /// The shape that travels with the form and comes back with the
    /// submission.
    pub metadata: HandlerMetadata,
}

impl Form {
    /// Serializes the handler metadata for embedding in the rendered
    /// form.
    pub fn metadata_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(&self.metadata).map_err(|err| EffectError::Metadata(err.to_string()))
    }
}

/// Adds a text box. Build state stays open.
pub struct AddTextBox {
    /// Type the field parses as.
    pub ty: FieldType,
    /// Optional initial contents.
    pub initial: Option<String>,
}

impl Operation for AddTextBox {
    type Entry = FormBuilder;
    type Exit = FormBuilder;
    type Out = ();
    const NAME: &'static str = "form.add_text_box";
}

/// Adds a selection box. Build state stays open.
pub struct AddSelectionBox {
    /// Type the field parses as.
    pub ty: FieldType,
    /// Options as (submitted value, displayed label).
    pub options: Vec<(String, String)>,
}

impl Operation for AddSelectionBox {
    type Entry = FormBuilder;
    type Exit = FormBuilder;
    type Out = ();
    const NAME: &'static str = "form.add_selection_box";
}

/// Adds a radio group. Build state stays open.
pub struct AddRadioGroup {
    /// Submitted values, one per button.
    pub options: Vec<String>,
    /// Index of the initially selected button.
    pub default: usize,
}

impl Operation for AddRadioGroup {
    type Entry = FormBuilder;
    type Exit = FormBuilder;
    type Out = ();
    const NAME: &'static str = "form.add_radio_group";
}

/// Adds a checkbox group; accumulates `List(ty)`.
pub struct AddCheckBoxes {
    /// Element type of each checked value.
    pub ty: FieldType,
    /// Options as (submitted value, initially checked).
    pub options: Vec<(String, bool)>,
}

impl Operation for AddCheckBoxes {
    type Entry = FormBuilder;
    type Exit = FormBuilder;
    type Out = ();
    const NAME: &'static str = "form.add_check_boxes";
}

/// Declares the handler's capability set. Changes the resource's type
/// from open build state to ready-to-submit.
pub struct DeclareEffects {
    /// Capabilities the handler will run under.
    pub caps: CapabilitySet,
}

impl Operation for DeclareEffects {
    type Entry = FormBuilder;
    type Exit = ReadyForm;
    type Out = ();
    const NAME: &'static str = "form.declare_effects";
}

/// Submits the form against a registry-resolved handler token. The only
/// operation that produces [`FormDone`], and the only way to terminate
/// form construction inside a program.
pub struct Submit {
    /// Token from [`HandlerList::resolve_handler`].
    pub handler: ResolvedHandler,
}

impl Operation for Submit {
    type Entry = ReadyForm;
    type Exit = FormDone;
    type Out = Form;
    const NAME: &'static str = "form.submit";
}
