//! In-memory automation host for unit tests.
//!
//! Mimics the shape of the Solid Edge object model closely enough for the
//! engine: `Application.Documents`, `Document.Properties` (property sets),
//! `PropertySet.Item(..)` / `Add(..)`, `Property.Value`.  Every object handed
//! out is counted while alive so tests can assert that a call released all
//! of its references.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::NaiveDateTime;

use crate::errors::SolidEdgeError;
use crate::session::Runtime;
use crate::variant::{AutomationObject, Handle, NativeItems, Variant};

// ---------------------------------------------------------------------------
// Host-side data
// ---------------------------------------------------------------------------

/// Value as stored by the fake host.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FakeValue {
    Empty,
    Bool(bool),
    Int(i64),
    Float(f64),
    Date(NaiveDateTime),
    Text(String),
}

impl FakeValue {
    fn to_variant(&self) -> Variant {
        match self {
            FakeValue::Empty => Variant::Empty,
            FakeValue::Bool(b) => Variant::Bool(*b),
            FakeValue::Int(n) => Variant::Int(*n),
            FakeValue::Float(f) => Variant::Float(*f),
            FakeValue::Date(d) => Variant::Date(*d),
            FakeValue::Text(s) => Variant::Text(s.clone()),
        }
    }

    fn from_variant(value: Variant) -> Result<Self, SolidEdgeError> {
        Ok(match value {
            Variant::Empty => FakeValue::Empty,
            Variant::Bool(b) => FakeValue::Bool(b),
            Variant::Int(n) => FakeValue::Int(n),
            Variant::Float(f) => FakeValue::Float(f),
            Variant::Date(d) => FakeValue::Date(d),
            Variant::Text(s) => FakeValue::Text(s),
            Variant::Object(_) => {
                return Err(SolidEdgeError::PropertyError(
                    "cannot store an object in a property".into(),
                ))
            }
        })
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FakePropertySet {
    pub name: String,
    pub properties: Vec<(String, FakeValue)>,
    /// Property names whose writes the host rejects.
    pub read_only: Vec<String>,
}

impl FakePropertySet {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            properties: Vec::new(),
            read_only: Vec::new(),
        }
    }

    pub fn with(mut self, name: &str, value: FakeValue) -> Self {
        self.properties.push((name.to_owned(), value));
        self
    }

    pub fn value(&self, name: &str) -> Option<&FakeValue> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FakeDocument {
    pub name: Option<String>,
    pub full_name: Option<String>,
    pub type_code: Option<i64>,
    pub property_sets: Vec<FakePropertySet>,
    pub property_sets_enumerable: bool,
    /// Property sets can only be fetched by name (no `_NewEnum`, `Count`).
    pub property_sets_opaque: bool,
    /// `Name` raises.
    pub broken_name: bool,
    /// Retrieving this document from the collection raises.
    pub broken_item: bool,
}

impl FakeDocument {
    pub fn new(name: &str, full_name: &str) -> Self {
        Self {
            name: Some(name.to_owned()),
            full_name: Some(full_name.to_owned()).filter(|s| !s.is_empty()),
            type_code: None,
            property_sets: vec![
                FakePropertySet::new("SummaryInformation"),
                FakePropertySet::new("Custom"),
            ],
            property_sets_enumerable: true,
            property_sets_opaque: false,
            broken_name: false,
            broken_item: false,
        }
    }

    pub fn with_type_code(mut self, code: i64) -> Self {
        self.type_code = Some(code);
        self
    }

    pub fn with_custom(mut self, name: &str, value: FakeValue) -> Self {
        if let Some(set) = self.property_sets.iter_mut().find(|s| s.name == "Custom") {
            set.properties.push((name.to_owned(), value));
        }
        self
    }

    pub fn with_property_sets(mut self, sets: Vec<FakePropertySet>) -> Self {
        self.property_sets = sets;
        self
    }
}

#[derive(Debug)]
struct HostState {
    running: bool,
    /// Upcoming `attach` calls that fail even though the host runs.
    failing_attaches: usize,
    owns_apartment: bool,
    visible: bool,
    documents_enumerable: bool,
    documents_hidden: bool,
    documents: Vec<FakeDocument>,
    active: Option<usize>,
    live: usize,
    opened: usize,
    closed: usize,
    reclaims: usize,
    activations: usize,
}

// ---------------------------------------------------------------------------
// FakeHost
// ---------------------------------------------------------------------------

/// Shared handle to the fake application; clones observe the same state.
#[derive(Debug, Clone)]
pub(crate) struct FakeHost {
    state: Rc<RefCell<HostState>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(HostState {
                running: true,
                failing_attaches: 0,
                owns_apartment: true,
                visible: true,
                documents_enumerable: true,
                documents_hidden: false,
                documents: Vec::new(),
                active: None,
                live: 0,
                opened: 0,
                closed: 0,
                reclaims: 0,
                activations: 0,
            })),
        }
    }

    /// Add a document and return its index.
    pub fn add(&self, document: FakeDocument) -> usize {
        let mut state = self.state.borrow_mut();
        state.documents.push(document);
        state.documents.len() - 1
    }

    pub fn set_active(&self, index: Option<usize>) {
        self.state.borrow_mut().active = index;
    }

    pub fn active(&self) -> Option<usize> {
        self.state.borrow().active
    }

    pub fn set_running(&self, running: bool) {
        self.state.borrow_mut().running = running;
    }

    /// Make the next `count` attaches fail, then recover.
    pub fn fail_next_attaches(&self, count: usize) {
        self.state.borrow_mut().failing_attaches = count;
    }

    pub fn set_owns_apartment(&self, owns: bool) {
        self.state.borrow_mut().owns_apartment = owns;
    }

    pub fn set_visible(&self, visible: bool) {
        self.state.borrow_mut().visible = visible;
    }

    /// Hide `_NewEnum` on the document collection (count/item access only).
    pub fn set_documents_enumerable(&self, enumerable: bool) {
        self.state.borrow_mut().documents_enumerable = enumerable;
    }

    /// Make `Application.Documents` raise, leaving only `ActiveDocument`.
    pub fn set_documents_hidden(&self, hidden: bool) {
        self.state.borrow_mut().documents_hidden = hidden;
    }

    pub fn custom(&self, document: usize, name: &str) -> Option<FakeValue> {
        let state = self.state.borrow();
        state.documents[document]
            .property_sets
            .iter()
            .find(|s| s.name == "Custom")
            .and_then(|s| s.value(name).cloned())
    }

    pub fn edit_document(&self, index: usize, edit: impl FnOnce(&mut FakeDocument)) {
        edit(&mut self.state.borrow_mut().documents[index]);
    }

    pub fn live_handles(&self) -> usize {
        self.state.borrow().live
    }

    pub fn sessions_opened(&self) -> usize {
        self.state.borrow().opened
    }

    pub fn sessions_closed(&self) -> usize {
        self.state.borrow().closed
    }

    pub fn reclaims(&self) -> usize {
        self.state.borrow().reclaims
    }

    pub fn activations(&self) -> usize {
        self.state.borrow().activations
    }

    fn object(&self, target: Target) -> Handle {
        Box::new(FakeObject::new(self.state.clone(), target))
    }
}

impl Runtime for FakeHost {
    fn initialize(&self) -> Result<bool, SolidEdgeError> {
        let mut state = self.state.borrow_mut();
        state.opened += 1;
        Ok(state.owns_apartment)
    }

    fn attach(&self) -> Result<Handle, SolidEdgeError> {
        {
            let mut state = self.state.borrow_mut();
            if state.failing_attaches > 0 {
                state.failing_attaches -= 1;
                return Err(SolidEdgeError::ComError("GetActiveObject failed".into()));
            }
        }
        if !self.state.borrow().running {
            return Err(SolidEdgeError::HostUnavailable(
                "SolidEdge.Application is not running".into(),
            ));
        }
        Ok(self.object(Target::Application))
    }

    fn reclaim(&self) {
        self.state.borrow_mut().reclaims += 1;
    }

    fn uninitialize(&self) {
        self.state.borrow_mut().closed += 1;
    }
}

// ---------------------------------------------------------------------------
// Objects
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Target {
    Application,
    Documents,
    Document(usize),
    PropertySets(usize),
    PropertySet(usize, usize),
    Property(usize, usize, usize),
}

struct FakeObject {
    state: Rc<RefCell<HostState>>,
    target: Target,
}

impl FakeObject {
    fn new(state: Rc<RefCell<HostState>>, target: Target) -> Self {
        state.borrow_mut().live += 1;
        Self { state, target }
    }

    fn child(&self, target: Target) -> Variant {
        Variant::Object(Box::new(FakeObject::new(self.state.clone(), target)))
    }

    fn missing(&self, member: &str) -> SolidEdgeError {
        SolidEdgeError::ComError(format!("{:?} has no member {member}", self.target))
    }

    fn index_arg(args: &[Variant], len: usize) -> Option<usize> {
        match args.first() {
            Some(Variant::Int(i)) if *i >= 1 && (*i as usize) <= len => Some(*i as usize - 1),
            _ => None,
        }
    }

    fn name_arg(args: &[Variant]) -> Option<&str> {
        match args.first() {
            Some(Variant::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    fn document(&self, index: usize) -> Result<Variant, SolidEdgeError> {
        if self.state.borrow().documents[index].broken_item {
            return Err(SolidEdgeError::ComError(format!("Item({}) failed", index + 1)));
        }
        Ok(self.child(Target::Document(index)))
    }
}

impl Drop for FakeObject {
    fn drop(&mut self) {
        self.state.borrow_mut().live -= 1;
    }
}

impl AutomationObject for FakeObject {
    fn get(&self, member: &str) -> Result<Variant, SolidEdgeError> {
        let state = self.state.borrow();
        match (self.target, member) {
            (Target::Application, "Caption") => Ok(Variant::Text("Solid Edge".into())),
            (Target::Application, "Visible") => Ok(Variant::Bool(state.visible)),
            (Target::Application, "Documents") => {
                if state.documents_hidden {
                    return Err(SolidEdgeError::ComError("Documents unavailable".into()));
                }
                drop(state);
                Ok(self.child(Target::Documents))
            }
            (Target::Application, "ActiveDocument") => {
                let active = state.active;
                drop(state);
                match active {
                    Some(index) => Ok(self.child(Target::Document(index))),
                    None => Err(SolidEdgeError::ComError("no active document".into())),
                }
            }
            (Target::Documents, "Count") => Ok(Variant::Int(state.documents.len() as i64)),
            (Target::Document(d), "Name") => {
                let doc = &state.documents[d];
                if doc.broken_name {
                    return Err(SolidEdgeError::ComError("Name unavailable".into()));
                }
                Ok(doc.name.clone().map(Variant::Text).unwrap_or(Variant::Empty))
            }
            (Target::Document(d), "FullName") => Ok(state.documents[d]
                .full_name
                .clone()
                .map(Variant::Text)
                .unwrap_or(Variant::Empty)),
            (Target::Document(d), "Type") => state.documents[d]
                .type_code
                .map(Variant::Int)
                .ok_or_else(|| self.missing(member)),
            (Target::Document(d), "Properties") => {
                drop(state);
                Ok(self.child(Target::PropertySets(d)))
            }
            (Target::PropertySets(d), "Count") if !state.documents[d].property_sets_opaque => {
                Ok(Variant::Int(state.documents[d].property_sets.len() as i64))
            }
            (Target::PropertySet(d, s), "Name") => {
                Ok(Variant::Text(state.documents[d].property_sets[s].name.clone()))
            }
            (Target::PropertySet(d, s), "Count") => Ok(Variant::Int(
                state.documents[d].property_sets[s].properties.len() as i64,
            )),
            (Target::Property(d, s, p), "Name") => Ok(Variant::Text(
                state.documents[d].property_sets[s].properties[p].0.clone(),
            )),
            (Target::Property(d, s, p), "Value") => {
                Ok(state.documents[d].property_sets[s].properties[p].1.to_variant())
            }
            _ => Err(self.missing(member)),
        }
    }

    fn get_with(&self, member: &str, args: &[Variant]) -> Result<Variant, SolidEdgeError> {
        if member != "Item" {
            return Err(self.missing(member));
        }
        let state = self.state.borrow();
        match self.target {
            Target::Documents => {
                let index = Self::index_arg(args, state.documents.len())
                    .ok_or_else(|| self.missing("Item"))?;
                drop(state);
                self.document(index)
            }
            Target::PropertySets(d) => {
                let sets = &state.documents[d].property_sets;
                let index = Self::index_arg(args, sets.len()).or_else(|| {
                    Self::name_arg(args).and_then(|n| sets.iter().position(|s| s.name == n))
                });
                let index = index.ok_or_else(|| self.missing("Item"))?;
                drop(state);
                Ok(self.child(Target::PropertySet(d, index)))
            }
            Target::PropertySet(d, s) => {
                let properties = &state.documents[d].property_sets[s].properties;
                let index = Self::index_arg(args, properties.len()).or_else(|| {
                    Self::name_arg(args).and_then(|n| properties.iter().position(|(pn, _)| pn == n))
                });
                let index = index.ok_or_else(|| self.missing("Item"))?;
                drop(state);
                Ok(self.child(Target::Property(d, s, index)))
            }
            _ => Err(self.missing(member)),
        }
    }

    fn put(&self, member: &str, value: Variant) -> Result<(), SolidEdgeError> {
        let mut state = self.state.borrow_mut();
        match (self.target, member) {
            (Target::Property(d, s, p), "Value") => {
                let set = &mut state.documents[d].property_sets[s];
                let name = set.properties[p].0.clone();
                if set.read_only.contains(&name) {
                    return Err(SolidEdgeError::PropertyError(format!("{name} is read-only")));
                }
                set.properties[p].1 = FakeValue::from_variant(value)?;
                Ok(())
            }
            (Target::Application, "Visible") => {
                state.visible = value.as_bool().unwrap_or(false);
                Ok(())
            }
            _ => Err(self.missing(member)),
        }
    }

    fn call(&self, member: &str, args: &[Variant]) -> Result<Variant, SolidEdgeError> {
        let mut state = self.state.borrow_mut();
        match (self.target, member) {
            (Target::Document(d), "Activate") => {
                state.active = Some(d);
                state.activations += 1;
                Ok(Variant::Empty)
            }
            (Target::PropertySet(d, s), "Add") => {
                let name = Self::name_arg(args)
                    .ok_or_else(|| SolidEdgeError::PropertyError("Add needs a name".into()))?
                    .to_owned();
                let value = match args.get(1) {
                    Some(v) => FakeValue::from_variant(clone_scalar(v)?)?,
                    None => FakeValue::Empty,
                };
                let set = &mut state.documents[d].property_sets[s];
                if set.read_only.contains(&name) {
                    return Err(SolidEdgeError::PropertyError(format!("{name} is read-only")));
                }
                set.properties.push((name, value));
                let index = set.properties.len() - 1;
                drop(state);
                Ok(self.child(Target::Property(d, s, index)))
            }
            _ => Err(self.missing(member)),
        }
    }

    fn new_enum(&self) -> Result<Option<NativeItems<'_>>, SolidEdgeError> {
        let state = self.state.borrow();
        match self.target {
            Target::Documents if state.documents_enumerable => {
                let count = state.documents.len();
                drop(state);
                let items: Vec<_> = (0..count).map(|i| self.document(i)).collect();
                Ok(Some(Box::new(items.into_iter())))
            }
            Target::PropertySets(d)
                if state.documents[d].property_sets_enumerable
                    && !state.documents[d].property_sets_opaque =>
            {
                let count = state.documents[d].property_sets.len();
                drop(state);
                let items: Vec<_> = (0..count)
                    .map(|s| Ok(self.child(Target::PropertySet(d, s))))
                    .collect();
                Ok(Some(Box::new(items.into_iter())))
            }
            _ => Ok(None),
        }
    }
}

fn clone_scalar(value: &Variant) -> Result<Variant, SolidEdgeError> {
    Ok(match value {
        Variant::Empty => Variant::Empty,
        Variant::Bool(b) => Variant::Bool(*b),
        Variant::Int(n) => Variant::Int(*n),
        Variant::Float(f) => Variant::Float(*f),
        Variant::Date(d) => Variant::Date(*d),
        Variant::Text(s) => Variant::Text(s.clone()),
        Variant::Object(_) => {
            return Err(SolidEdgeError::PropertyError("object argument".into()))
        }
    })
}
