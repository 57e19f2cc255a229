//! The class object decorators and the DTO factory act on.
//!
//! A [`DtoClass`] is declared once with a name, an optional own schema, an
//! optional legacy schema slot and an optional parent. Decoration then fills
//! in GraphQL metadata and, when missing, the schema algebra.

use crate::dto::{SchemaAlgebra, SchemaDto};
use crate::schema::Schema;
use crate::types::{TypeFlavor, TypeThunk};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_CLASS_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u64);

/// Linear lifecycle of a decorated class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DecorationState {
    Undecorated,
    SchemaResolved,
    FieldsMapped,
    Registered,
}

/// One GraphQL field recorded on a class during decoration.
#[derive(Debug, Clone)]
pub struct FieldMeta {
    pub name: String,
    pub nullable: bool,
    pub description: Option<String>,
    pub ty: TypeThunk,
}

#[derive(Debug)]
struct GraphqlMeta {
    state: DecorationState,
    flavor: Option<TypeFlavor>,
    graphql_name: Option<String>,
    fields: Vec<FieldMeta>,
}

struct ClassInner {
    id: ClassId,
    name: String,
    description: Option<String>,
    schema: Option<Schema>,
    legacy_schema: Option<Schema>,
    parent: Option<DtoClass>,
    generated: bool,
    properties: Mutex<Vec<String>>,
    algebra: OnceCell<SchemaDto>,
    graphql: Mutex<GraphqlMeta>,
}

#[derive(Clone)]
pub struct DtoClass(Arc<ClassInner>);

impl PartialEq for DtoClass {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for DtoClass {}

impl fmt::Debug for DtoClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DtoClass")
            .field("id", &self.0.id)
            .field("name", &self.0.name)
            .field("state", &self.decoration_state())
            .finish()
    }
}

pub struct ClassBuilder {
    name: String,
    description: Option<String>,
    schema: Option<Schema>,
    legacy_schema: Option<Schema>,
    parent: Option<DtoClass>,
    properties: Vec<String>,
    generated: bool,
}

impl ClassBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Schema stored in the pre-`schema` slot older DTOs used.
    pub fn legacy_schema(mut self, schema: Schema) -> Self {
        self.legacy_schema = Some(schema);
        self
    }

    pub fn extends(mut self, parent: &DtoClass) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    pub fn property(mut self, name: impl Into<String>) -> Self {
        self.properties.push(name.into());
        self
    }

    pub(crate) fn generated(mut self) -> Self {
        self.generated = true;
        self
    }

    pub fn finish(self) -> DtoClass {
        DtoClass(Arc::new(ClassInner {
            id: ClassId(NEXT_CLASS_ID.fetch_add(1, Ordering::Relaxed)),
            name: self.name,
            description: self.description,
            schema: self.schema,
            legacy_schema: self.legacy_schema,
            parent: self.parent,
            generated: self.generated,
            properties: Mutex::new(self.properties),
            algebra: OnceCell::new(),
            graphql: Mutex::new(GraphqlMeta {
                state: DecorationState::Undecorated,
                flavor: None,
                graphql_name: None,
                fields: Vec::new(),
            }),
        }))
    }
}

impl DtoClass {
    pub fn declare(name: impl Into<String>) -> ClassBuilder {
        ClassBuilder {
            name: name.into(),
            description: None,
            schema: None,
            legacy_schema: None,
            parent: None,
            properties: Vec::new(),
            generated: false,
        }
    }

    pub fn id(&self) -> ClassId {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn description(&self) -> Option<&str> {
        self.0.description.as_deref()
    }

    pub fn own_schema(&self) -> Option<&Schema> {
        self.0.schema.as_ref()
    }

    pub fn legacy_schema(&self) -> Option<&Schema> {
        self.0.legacy_schema.as_ref()
    }

    pub fn parent(&self) -> Option<&DtoClass> {
        self.0.parent.as_ref()
    }

    /// Synthesized by the registry rather than declared by user code.
    pub fn is_generated(&self) -> bool {
        self.0.generated
    }

    /// Own properties followed by inherited ones.
    pub fn properties(&self) -> Vec<String> {
        let mut all = self.0.properties.lock().clone();
        if let Some(parent) = self.parent() {
            for inherited in parent.properties() {
                if !all.contains(&inherited) {
                    all.push(inherited);
                }
            }
        }
        all
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.0.properties.lock().iter().any(|p| p == name)
            || self.parent().is_some_and(|parent| parent.has_property(name))
    }

    /// Adds an own property unless it is already visible; returns whether it was added.
    pub fn ensure_property(&self, name: &str) -> bool {
        if self.has_property(name) {
            return false;
        }
        self.0.properties.lock().push(name.to_string());
        true
    }

    pub fn algebra(&self) -> Option<&SchemaDto> {
        self.0.algebra.get()
    }

    /// Attaches the schema algebra if none is present; returns whether it was attached.
    pub fn attach_algebra(&self, algebra: SchemaDto) -> bool {
        self.0.algebra.set(algebra).is_ok()
    }

    /// Capability marker: the class validates through a schema.
    pub fn is_zod_dto(&self) -> bool {
        self.algebra().is_some()
    }

    /// The schema the class validates with, if any.
    pub fn schema(&self) -> Option<&Schema> {
        self.algebra().map(|dto| dto.schema()).or(self.own_schema())
    }

    pub fn decoration_state(&self) -> DecorationState {
        self.0.graphql.lock().state
    }

    pub(crate) fn advance(&self, state: DecorationState) {
        let mut meta = self.0.graphql.lock();
        if state > meta.state {
            meta.state = state;
        }
    }

    pub fn flavor(&self) -> Option<TypeFlavor> {
        self.0.graphql.lock().flavor
    }

    pub fn is_input_type(&self) -> bool {
        self.flavor() == Some(TypeFlavor::Input)
    }

    /// Name the class is known by in GraphQL, falling back to the declared name.
    pub fn display_name(&self) -> String {
        self.0
            .graphql
            .lock()
            .graphql_name
            .clone()
            .unwrap_or_else(|| self.0.name.clone())
    }

    pub(crate) fn set_graphql_identity(&self, flavor: TypeFlavor, name: &str) {
        let mut meta = self.0.graphql.lock();
        meta.flavor = Some(flavor);
        meta.graphql_name = Some(name.to_string());
    }

    pub(crate) fn push_field(&self, field: FieldMeta) {
        self.0.graphql.lock().fields.push(field);
    }

    pub fn fields(&self) -> Vec<FieldMeta> {
        self.0.graphql.lock().fields.clone()
    }

    pub fn field(&self, name: &str) -> Option<FieldMeta> {
        self.0
            .graphql
            .lock()
            .fields
            .iter()
            .find(|f| f.name == name)
            .cloned()
    }
}
