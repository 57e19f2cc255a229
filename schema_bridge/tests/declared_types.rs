use once_cell::sync::Lazy;
use schema_bridge::{input_type, object_type, Bridge, DeclaredDto, Schema, TypeCollector, TypeFlavor};
use std::sync::Arc;

static PROFILE: Lazy<Schema> = Lazy::new(|| Schema::object([("handle", Schema::string())]));

static ACCOUNT: Lazy<Schema> = Lazy::new(|| {
    Schema::object([("id", Schema::int()), ("profile", PROFILE.clone().optional())])
});

static SIGNUP: Lazy<Schema> = Lazy::new(|| {
    Schema::object([("email", Schema::string().email()), ("profile", PROFILE.clone())])
});

/// An account holder.
#[object_type(schema = ACCOUNT, name = "Account")]
pub struct AccountDto;

#[object_type(schema = PROFILE, name = "Profile")]
pub struct ProfileDto;

#[input_type(schema = SIGNUP, name = "SignupInput", description = "Sign-up form")]
pub struct SignupDto;

#[test]
fn declarations_bootstrap_in_one_batch() {
    let host = Arc::new(TypeCollector::new());
    let bridge = Bridge::builder().host(host.clone()).build();

    assert_eq!(bridge.bootstrap(), 3);
    assert_eq!(bridge.bootstrap(), 0);
    assert!(bridge.is_settled());

    let account = bridge.declared(AccountDto::NAME).unwrap();
    let profile = bridge.declared("ProfileDto").unwrap();
    let signup = bridge.declared("SignupDto").unwrap();
    assert_eq!(account.display_name(), "Account");
    assert_eq!(account.description(), Some("An account holder."));
    assert!(signup.is_input_type());

    assert_eq!(
        bridge.graphql_field_type(&account, "profile").and_then(|t| t.as_class().cloned()),
        Some(profile)
    );

    let sdl = host.to_sdl();
    assert!(sdl.contains("\"\"\"An account holder.\"\"\"\ntype Account {\n  id: Int!\n  profile: Profile\n}"));
    assert!(sdl.contains("\"\"\"Sign-up form\"\"\"\ninput SignupInput {"));
    assert!(sdl.contains("  profile: ProfileInput!\n"));
    assert_eq!(host.type_names(TypeFlavor::Input), ["SignupInput", "ProfileInput"]);
}

#[test]
fn declared_schemas_share_identity_with_their_statics() {
    assert!(ProfileDto::schema().ptr_eq(&PROFILE));
    assert_eq!(SignupDto::NAME, "SignupDto");
}

#[test]
fn classes_are_looked_up_on_the_global_bridge() {
    Bridge::global().bootstrap();
    let class = ProfileDto::class().unwrap();
    assert_eq!(class.display_name(), "Profile");
    assert_eq!(Bridge::global().registry().class_for(&PROFILE), Some(class));
}
