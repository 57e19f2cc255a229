//! The DTO factory and the schema algebra every DTO exposes.

use crate::bridge::Bridge;
use crate::class::DtoClass;
use crate::decorate::TypeArgs;
use crate::error::{Error, Result};
use crate::introspect::{self, NodeKind};
use crate::schema::{Issue, RefinementContext, SafeParse, Schema, ValidationError};
use once_cell::sync::Lazy;
use serde_json::Value;

/// Validation and schema-algebra operations backed by one schema.
///
/// Derived operations (`partial`, `pick`, …) build a new [`DtoClass`] around
/// the derived schema, so chains keep returning DTOs.
pub trait SchemaAlgebra {
    fn schema(&self) -> &Schema;

    fn dto_name(&self) -> &str;

    fn is_zod_dto(&self) -> bool {
        true
    }

    /// Parses `input` into the validated representation.
    fn create(&self, input: &Value) -> Result<Value> {
        Ok(self.schema().parse(input)?)
    }

    fn parse(&self, input: &Value) -> std::result::Result<Value, ValidationError> {
        self.schema().parse(input)
    }

    fn safe_parse(&self, input: &Value) -> SafeParse {
        self.schema().safe_parse(input)
    }

    fn validate(&self, input: &Value) -> std::result::Result<(), ValidationError> {
        self.parse(input).map(|_| ())
    }

    fn strip(&self) -> Result<DtoClass> {
        Ok(create_dto(self.dto_name(), self.schema().strip()?))
    }

    fn partial(&self) -> Result<DtoClass> {
        Ok(create_dto(self.dto_name(), self.schema().partial()?))
    }

    fn pick(&self, keys: &[&str]) -> Result<DtoClass> {
        Ok(create_dto(self.dto_name(), self.schema().pick(keys)?))
    }

    fn omit(&self, keys: &[&str]) -> Result<DtoClass> {
        Ok(create_dto(self.dto_name(), self.schema().omit(keys)?))
    }

    fn extend(&self, fields: Vec<(String, Schema)>) -> Result<DtoClass> {
        Ok(create_dto(self.dto_name(), self.schema().extend(fields)?))
    }

    fn merge(&self, other: &Schema) -> Result<DtoClass> {
        Ok(create_dto(self.dto_name(), self.schema().merge(other)?))
    }

    fn optional(&self) -> DtoClass {
        create_dto(self.dto_name(), self.schema().optional())
    }

    fn nullable(&self) -> DtoClass {
        create_dto(self.dto_name(), self.schema().nullable())
    }

    fn array(&self) -> DtoClass {
        create_dto(self.dto_name(), self.schema().array())
    }

    fn refine(
        &self,
        check: impl Fn(&Value) -> bool + Send + Sync + 'static,
        message: &str,
    ) -> DtoClass {
        create_dto(self.dto_name(), self.schema().refine(check, message))
    }

    fn super_refine(
        &self,
        refine: impl Fn(&Value, &mut RefinementContext) + Send + Sync + 'static,
    ) -> DtoClass {
        create_dto(self.dto_name(), self.schema().super_refine(refine))
    }

    fn transform(&self, map: impl Fn(Value) -> Value + Send + Sync + 'static) -> DtoClass {
        create_dto(self.dto_name(), self.schema().transform(map))
    }

    fn preprocess(&self, map: impl Fn(Value) -> Value + Send + Sync + 'static) -> DtoClass {
        create_dto(self.dto_name(), self.schema().preprocess(map))
    }

    fn brand(&self, brand: &str) -> DtoClass {
        create_dto(self.dto_name(), self.schema().brand(brand))
    }

    /// Same definition under a fresh schema identity.
    fn clone_dto(&self) -> DtoClass {
        create_dto(self.dto_name(), self.schema().fork())
    }

    fn field_names(&self) -> Vec<String> {
        introspect::unwrap(self.schema())
            .as_object()
            .map(|shape| shape.field_names().map(str::to_string).collect())
            .unwrap_or_default()
    }

    fn field_schema(&self, field: &str) -> Option<Schema> {
        introspect::unwrap(self.schema())
            .as_object()
            .and_then(|shape| shape.field(field))
            .cloned()
    }

    /// Outermost node kind of the field, wrappers included.
    fn field_type(&self, field: &str) -> Option<NodeKind> {
        self.field_schema(field).map(|schema| introspect::kind_of(&schema))
    }

    fn is_optional(&self, field: &str) -> bool {
        self.field_schema(field)
            .is_some_and(|schema| introspect::accepts_absent(&schema))
    }

    fn is_nullable(&self, field: &str) -> bool {
        self.field_schema(field)
            .is_some_and(|schema| introspect::accepts_null(&schema))
    }

    fn default_value(&self, field: &str) -> Option<Value> {
        self.field_schema(field)
            .and_then(|schema| introspect::default_of(&schema).cloned())
    }

    fn description(&self) -> Option<String> {
        introspect::description_of(self.schema()).map(str::to_string)
    }

    fn field_description(&self, field: &str) -> Option<String> {
        self.field_schema(field)
            .and_then(|schema| introspect::description_of(&schema).map(str::to_string))
    }

    /// Validates one field value on its own.
    fn validate_field(&self, field: &str, value: &Value) -> Result<Value> {
        let schema = self
            .field_schema(field)
            .ok_or_else(|| Error::UnknownField(field.to_string()))?;
        Ok(schema.parse(value)?)
    }

    /// Issues for `input`; empty when it is valid.
    fn validation_errors(&self, input: &Value) -> Vec<Issue> {
        match self.parse(input) {
            Ok(_) => Vec::new(),
            Err(error) => error.into_issues(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchemaDto {
    name: String,
    schema: Schema,
}

impl SchemaDto {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

impl SchemaAlgebra for SchemaDto {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn dto_name(&self) -> &str {
        &self.name
    }
}

/// Stands in for classes decorated without any schema.
static UNTYPED: Lazy<Schema> = Lazy::new(Schema::any);

impl SchemaAlgebra for DtoClass {
    fn schema(&self) -> &Schema {
        DtoClass::schema(self).unwrap_or(&*UNTYPED)
    }

    fn dto_name(&self) -> &str {
        self.name()
    }

    fn is_zod_dto(&self) -> bool {
        DtoClass::is_zod_dto(self)
    }
}

#[derive(Debug, Clone, Default)]
pub struct GraphqlOptions {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Explicit flavour; inferred from the name when absent.
    pub is_input: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct DtoOptions {
    pub name: Option<String>,
    pub graphql: Option<GraphqlOptions>,
}

impl DtoOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            graphql: None,
        }
    }

    pub fn graphql(mut self, graphql: GraphqlOptions) -> Self {
        self.graphql = Some(graphql);
        self
    }
}

/// Names containing `input`, `create` or `update` are input types.
pub fn infers_input(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    ["input", "create", "update"].iter().any(|marker| name.contains(marker))
}

/// A DTO class around `schema` with no GraphQL side effects.
pub fn create_dto(name: &str, schema: Schema) -> DtoClass {
    let class = DtoClass::declare(name).schema(schema.clone()).finish();
    class.attach_algebra(SchemaDto::new(name, schema));
    class
}

impl Bridge {
    /// Builds a DTO class; with `options.graphql` it is also decorated.
    pub fn dto(&self, schema: Schema, options: DtoOptions) -> DtoClass {
        let name = options
            .name
            .clone()
            .or_else(|| options.graphql.as_ref().and_then(|g| g.name.clone()))
            .unwrap_or_else(|| "SchemaDto".to_string());
        let class = create_dto(&name, schema.clone());

        if let Some(graphql) = options.graphql {
            let graphql_name = graphql.name.unwrap_or_else(|| name.clone());
            let is_input = graphql.is_input.unwrap_or_else(|| infers_input(&graphql_name));
            let mut args = TypeArgs::with_schema(schema).name(graphql_name);
            args.description = graphql.description;
            if is_input {
                self.input_type(&class, args);
            } else {
                self.object_type(&class, args);
            }
        }
        class
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::host::TypeCollector;
    use crate::schema::IssueCode;
    use crate::types::TypeFlavor;
    use serde_json::json;
    use std::sync::Arc;

    fn user() -> DtoClass {
        create_dto(
            "UserDto",
            Schema::object([
                ("id", Schema::int()),
                ("name", Schema::string().describe("Display name")),
                ("role", Schema::string().default_value("member")),
                ("bio", Schema::string().nullable()),
            ]),
        )
    }

    #[test]
    fn parse_round_trips_valid_input() {
        let input = json!({"id": 1, "name": "Ada", "role": "admin", "bio": null});
        assert_eq!(user().parse(&input).unwrap(), input);
        assert_eq!(user().create(&input).unwrap(), input);
    }

    #[test]
    fn missing_required_field_is_reported_at_its_path() {
        let error = user().parse(&json!({"name": "Ada", "bio": null})).unwrap_err();
        let issue = error.issue_for_field("id").expect("issue for id");
        assert_eq!(issue.code, IssueCode::Required);
        assert!(!user().safe_parse(&json!({})).success());
        assert!(!user().validation_errors(&json!({})).is_empty());
    }

    #[test]
    fn partial_keeps_field_names_and_makes_them_optional() {
        let dto = user();
        let partial = dto.partial().unwrap();
        assert_eq!(partial.field_names(), dto.field_names());
        assert!(partial.field_names().iter().all(|f| partial.is_optional(f)));
        assert!(partial.is_zod_dto());
        assert!(partial.validate(&json!({})).is_ok());
    }

    #[test]
    fn chained_algebra_returns_dtos() {
        let picked = user().pick(&["id", "name"]).unwrap();
        assert_eq!(picked.field_names(), ["id", "name"]);
        let extended = picked
            .extend(vec![("email".to_string(), Schema::string().email())])
            .unwrap()
            .omit(&["name"])
            .unwrap();
        assert_eq!(extended.field_names(), ["id", "email"]);
        assert!(matches!(user().array().parse(&json!([])), Ok(_)));
        assert!(user().optional().parse(&Value::Null).is_err());
        assert!(user().pick(&[]).unwrap().field_names().is_empty());
        assert!(matches!(
            create_dto("Tag", Schema::string()).partial(),
            Err(Error::NotAnObject { operation: "partial" })
        ));
    }

    #[test]
    fn introspection_helpers() {
        let dto = user();
        assert_eq!(dto.field_type("role"), Some(NodeKind::Default));
        assert_eq!(dto.default_value("role"), Some(json!("member")));
        assert!(dto.is_optional("role"));
        assert!(!dto.is_optional("id"));
        assert!(dto.is_nullable("bio"));
        assert_eq!(dto.field_description("name").as_deref(), Some("Display name"));
        assert!(dto.field_schema("nope").is_none());
        assert!(dto.validate_field("id", &json!(3)).is_ok());
        assert!(matches!(dto.validate_field("id", &json!("3")), Err(Error::Validation(_))));
        assert!(matches!(dto.validate_field("nope", &json!(1)), Err(Error::UnknownField(_))));
    }

    #[test]
    fn refinements_run_on_parse() {
        let dto = create_dto("Even", Schema::int())
            .refine(|v| v.as_i64().is_some_and(|n| n % 2 == 0), "must be even");
        assert!(dto.parse(&json!(2)).is_ok());
        let issues = dto.validation_errors(&json!(3));
        assert_eq!(issues[0].message, "must be even");
    }

    #[test]
    fn graphql_options_decorate_with_inferred_flavor() {
        let host = Arc::new(TypeCollector::new());
        let bridge = Bridge::builder().host(host.clone()).build();
        let schema = Schema::object([("title", Schema::string())]);

        let input = bridge.dto(
            schema.clone(),
            DtoOptions::named("CreatePostDto").graphql(GraphqlOptions::default()),
        );
        assert!(input.is_input_type());

        let output = bridge.dto(
            Schema::object([("title", Schema::string())]),
            DtoOptions::named("PostDto").graphql(GraphqlOptions {
                name: Some("Post".into()),
                ..GraphqlOptions::default()
            }),
        );
        assert_eq!(output.display_name(), "Post");
        assert_eq!(host.type_names(TypeFlavor::Input), ["CreatePostDto"]);
        assert_eq!(host.type_names(TypeFlavor::Object), ["Post"]);
    }

    #[test]
    fn plain_dtos_stay_out_of_the_registry() {
        let bridge = Bridge::new(BridgeConfig::default());
        let schema = Schema::object([("a", Schema::int())]);
        let class = bridge.dto(schema.clone(), DtoOptions::named("A"));
        assert!(class.is_zod_dto());
        assert!(bridge.registry().class_for(&schema).is_none());
    }

    #[test]
    fn name_inference() {
        assert!(infers_input("UpdateUserInput"));
        assert!(infers_input("userCreate"));
        assert!(!infers_input("UserDto"));
    }
}
