use super::issue::{Issue, IssueCode, PathSegment, RefinementContext, ValidationError};
use super::kind::{Effect, NumberRules, SchemaKind, StringFormat, StringRules, UnknownKeys};
use super::Schema;
use chrono::{DateTime, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static email pattern"));
static UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("static uuid pattern")
});
static URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*://\S+$").expect("static url pattern"));

enum Parsed {
    Value(Value),
    Absent,
    Invalid,
}

struct Walker {
    path: Vec<PathSegment>,
    issues: Vec<Issue>,
}

pub(super) fn parse_root(schema: &Schema, input: &Value) -> Result<Value, ValidationError> {
    let mut walker = Walker {
        path: Vec::new(),
        issues: Vec::new(),
    };
    let parsed = walker.walk(schema, Some(input));
    if !walker.issues.is_empty() {
        return Err(ValidationError::new(walker.issues));
    }
    match parsed {
        Parsed::Value(value) => Ok(value),
        Parsed::Absent => Ok(Value::Null),
        Parsed::Invalid => Err(ValidationError::new(vec![Issue::new(
            &[],
            IssueCode::Custom,
            "Invalid input",
        )])),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl Walker {
    fn issue(&mut self, code: IssueCode, message: impl Into<String>) -> Parsed {
        self.issues.push(Issue::new(&self.path, code, message));
        Parsed::Invalid
    }

    fn invalid_type(&mut self, expected: &str, received: &Value) -> Parsed {
        let message = format!("Expected {}, received {}", expected, type_name(received));
        self.issue(IssueCode::InvalidType, message)
    }

    fn nested<F: FnOnce(&mut Self) -> Parsed>(&mut self, segment: PathSegment, f: F) -> Parsed {
        self.path.push(segment);
        let parsed = f(self);
        self.path.pop();
        parsed
    }

    fn walk(&mut self, schema: &Schema, input: Option<&Value>) -> Parsed {
        // Wrappers that decide what "absent" means come first.
        match schema.kind() {
            SchemaKind::Optional(inner) => {
                return match input {
                    None => Parsed::Absent,
                    Some(value) => self.walk(inner, Some(value)),
                }
            }
            SchemaKind::Default { inner, value } => {
                return match input {
                    None => self.walk(inner, Some(value)),
                    Some(given) => self.walk(inner, Some(given)),
                }
            }
            SchemaKind::Nullable(inner) => {
                return match input {
                    Some(Value::Null) => Parsed::Value(Value::Null),
                    other => self.walk(inner, other),
                }
            }
            SchemaKind::Lazy(lazy) => return self.walk(lazy.get(), input),
            SchemaKind::Branded { inner, .. } => return self.walk(inner, input),
            SchemaKind::Effects { inner, effect } => return self.walk_effect(inner, effect, input),
            SchemaKind::Any => {
                return match input {
                    None => Parsed::Absent,
                    Some(value) => Parsed::Value(value.clone()),
                }
            }
            _ => {}
        }

        let Some(value) = input else {
            return self.issue(IssueCode::Required, "Required");
        };

        match schema.kind() {
            SchemaKind::String(rules) => self.walk_string(rules, value),
            SchemaKind::Number(rules) => self.walk_number(rules, value),
            SchemaKind::Boolean => match value {
                Value::Bool(_) => Parsed::Value(value.clone()),
                other => self.invalid_type("boolean", other),
            },
            SchemaKind::Date => self.walk_date(value),
            SchemaKind::Literal(expected) => {
                if value == expected {
                    Parsed::Value(value.clone())
                } else {
                    self.issue(IssueCode::InvalidLiteral, format!("Invalid literal value, expected {}", expected))
                }
            }
            SchemaKind::Object(shape) => {
                let Value::Object(map) = value else {
                    return self.invalid_type("object", value);
                };
                let mut out = Map::new();
                let mut failed = false;
                for (name, field) in &shape.fields {
                    let parsed = self.nested(PathSegment::Key(name.clone()), |w| w.walk(field, map.get(name)));
                    match parsed {
                        Parsed::Value(v) => {
                            out.insert(name.clone(), v);
                        }
                        Parsed::Absent => {}
                        Parsed::Invalid => failed = true,
                    }
                }
                let unknown: Vec<&String> = map.keys().filter(|k| shape.field(k).is_none()).collect();
                match shape.unknown_keys {
                    UnknownKeys::Strip => {}
                    UnknownKeys::Passthrough => {
                        for key in unknown {
                            out.insert(key.clone(), map[key].clone());
                        }
                    }
                    UnknownKeys::Strict if !unknown.is_empty() => {
                        let keys = unknown.iter().map(|k| format!("'{}'", k)).collect::<Vec<_>>().join(", ");
                        self.issue(IssueCode::UnrecognizedKeys, format!("Unrecognized key(s) in object: {}", keys));
                        failed = true;
                    }
                    UnknownKeys::Strict => {}
                }
                if failed {
                    Parsed::Invalid
                } else {
                    Parsed::Value(Value::Object(out))
                }
            }
            SchemaKind::Array(element) => {
                let Value::Array(items) = value else {
                    return self.invalid_type("array", value);
                };
                let mut out = Vec::with_capacity(items.len());
                let mut failed = false;
                for (i, item) in items.iter().enumerate() {
                    match self.nested(PathSegment::Index(i), |w| w.walk(element, Some(item))) {
                        Parsed::Value(v) => out.push(v),
                        Parsed::Absent => out.push(Value::Null),
                        Parsed::Invalid => failed = true,
                    }
                }
                if failed {
                    Parsed::Invalid
                } else {
                    Parsed::Value(Value::Array(out))
                }
            }
            SchemaKind::Record(element) => {
                let Value::Object(map) = value else {
                    return self.invalid_type("object", value);
                };
                let mut out = Map::new();
                let mut failed = false;
                for (key, item) in map {
                    match self.nested(PathSegment::Key(key.clone()), |w| w.walk(element, Some(item))) {
                        Parsed::Value(v) => {
                            out.insert(key.clone(), v);
                        }
                        Parsed::Absent => {}
                        Parsed::Invalid => failed = true,
                    }
                }
                if failed {
                    Parsed::Invalid
                } else {
                    Parsed::Value(Value::Object(out))
                }
            }
            SchemaKind::Enum(values) => match value {
                Value::String(s) if values.iter().any(|v| v == s) => Parsed::Value(value.clone()),
                _ => {
                    let options = values.iter().map(|v| format!("'{}'", v)).collect::<Vec<_>>().join(" | ");
                    self.issue(IssueCode::InvalidEnumValue, format!("Invalid enum value. Expected {}", options))
                }
            },
            SchemaKind::NativeEnum(native) => {
                if native.contains(value) {
                    Parsed::Value(value.clone())
                } else {
                    self.issue(IssueCode::InvalidEnumValue, format!("Invalid {} value", native.name()))
                }
            }
            SchemaKind::Union(options) => {
                for option in options {
                    let mut trial = Walker {
                        path: self.path.clone(),
                        issues: Vec::new(),
                    };
                    let parsed = trial.walk(option, Some(value));
                    if trial.issues.is_empty() {
                        if let Parsed::Value(v) = parsed {
                            return Parsed::Value(v);
                        }
                    }
                }
                self.issue(IssueCode::InvalidUnion, "Invalid input")
            }
            SchemaKind::Optional(_)
            | SchemaKind::Nullable(_)
            | SchemaKind::Default { .. }
            | SchemaKind::Lazy(_)
            | SchemaKind::Branded { .. }
            | SchemaKind::Effects { .. }
            | SchemaKind::Any => unreachable!("wrapper kinds are handled above"),
        }
    }

    fn walk_effect(&mut self, inner: &Schema, effect: &Effect, input: Option<&Value>) -> Parsed {
        match effect {
            Effect::Preprocess(map) => match input {
                Some(value) => {
                    let mapped = map(value.clone());
                    self.walk(inner, Some(&mapped))
                }
                None => self.walk(inner, None),
            },
            Effect::Transform(map) => match self.walk(inner, input) {
                Parsed::Value(value) => Parsed::Value(map(value)),
                other => other,
            },
            Effect::Refine { check, message } => match self.walk(inner, input) {
                Parsed::Value(value) if !check(&value) => self.issue(IssueCode::Custom, message.clone()),
                other => other,
            },
            Effect::SuperRefine(refine) => match self.walk(inner, input) {
                Parsed::Value(value) => {
                    let mut ctx = RefinementContext::new(&self.path);
                    refine(&value, &mut ctx);
                    let issues = ctx.into_issues();
                    if issues.is_empty() {
                        Parsed::Value(value)
                    } else {
                        self.issues.extend(issues);
                        Parsed::Invalid
                    }
                }
                other => other,
            },
        }
    }

    fn walk_string(&mut self, rules: &StringRules, value: &Value) -> Parsed {
        let Value::String(s) = value else {
            return self.invalid_type("string", value);
        };
        let len = s.chars().count();
        if let Some(min) = rules.min_len.filter(|min| len < *min) {
            return self.issue(
                IssueCode::TooSmall,
                format!("String must contain at least {} character(s)", min),
            );
        }
        if let Some(max) = rules.max_len.filter(|max| len > *max) {
            return self.issue(
                IssueCode::TooBig,
                format!("String must contain at most {} character(s)", max),
            );
        }
        if let Some(pattern) = &rules.pattern {
            if !pattern.is_match(s) {
                return self.issue(IssueCode::InvalidString, "Invalid");
            }
        }
        let format_ok = match rules.format {
            None => true,
            Some(StringFormat::Email) => EMAIL.is_match(s),
            Some(StringFormat::Uuid) => UUID.is_match(s),
            Some(StringFormat::Url) => URL.is_match(s),
        };
        if !format_ok {
            let label = match rules.format {
                Some(StringFormat::Email) => "email",
                Some(StringFormat::Uuid) => "uuid",
                _ => "url",
            };
            return self.issue(IssueCode::InvalidString, format!("Invalid {}", label));
        }
        Parsed::Value(value.clone())
    }

    fn walk_number(&mut self, rules: &NumberRules, value: &Value) -> Parsed {
        let Some(n) = value.as_f64() else {
            return self.invalid_type("number", value);
        };
        if rules.integer && n.fract() != 0.0 {
            return self.invalid_type("integer", value);
        }
        if let Some(min) = rules.min.filter(|min| n < *min) {
            return self.issue(
                IssueCode::TooSmall,
                format!("Number must be greater than or equal to {}", min),
            );
        }
        if let Some(max) = rules.max.filter(|max| n > *max) {
            return self.issue(
                IssueCode::TooBig,
                format!("Number must be less than or equal to {}", max),
            );
        }
        Parsed::Value(value.clone())
    }

    fn walk_date(&mut self, value: &Value) -> Parsed {
        let Value::String(s) = value else {
            return self.invalid_type("date", value);
        };
        let valid = DateTime::parse_from_rfc3339(s).is_ok()
            || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok();
        if valid {
            Parsed::Value(value.clone())
        } else {
            self.issue(IssueCode::InvalidDate, "Invalid date")
        }
    }
}
