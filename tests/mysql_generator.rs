//! MySQL-family fragment generation.
//!
//! These assertions are bit-exact: the emitted fragments are a wire contract
//! with the tests of downstream consumers.

mod common;

use aggrel::{AggrelError, MySqlGenerator, RelationMode, SqlGenerator};
use common::{FakeSchema, partner, request};

fn generator() -> MySqlGenerator {
    MySqlGenerator::new("base")
}

#[test]
fn single_object_wraps_json_object_in_null_guard() {
    let partner = partner();
    let req = request(partner.as_ref(), "profile", RelationMode::Single, &["id", "name"]);

    let expr = generator().single_object_expr(&req.metadata, req.columns.columns(), "profile");
    assert_eq!(
        expr,
        "CASE WHEN profile.id IS NULL THEN NULL ELSE \
         JSON_OBJECT('id', profile.id, 'name', profile.name) END AS profile"
    );
}

#[test]
fn belongs_to_join_targets_owner_key() {
    let partner = partner();
    let req = request(partner.as_ref(), "profile", RelationMode::Single, &["id", "name"]);

    let joins = generator().build_join_list(std::slice::from_ref(&req)).unwrap();
    assert_eq!(joins, "LEFT JOIN profiles profile ON profile.id = base.profile_id");
}

#[test]
fn has_one_join_targets_foreign_key_on_related() {
    let partner = partner();
    let req = request(partner.as_ref(), "avatar", RelationMode::Single, &["id", "url"]);

    let joins = generator().build_join_list(std::slice::from_ref(&req)).unwrap();
    assert_eq!(joins, "LEFT JOIN avatars avatar ON avatar.partner_id = base.id");
}

#[test]
fn collection_coalesces_to_empty_json_array() {
    let partner = partner();
    let req = request(partner.as_ref(), "promocodes", RelationMode::Collection, &["id", "code"]);

    let expr = generator().collection_expr(&req.metadata, req.columns.columns(), "promocodes");
    assert_eq!(
        expr,
        "(SELECT COALESCE(JSON_ARRAYAGG(JSON_OBJECT('id', promocodes.id, 'code', promocodes.code)), \
         JSON_ARRAY()) FROM promocodes WHERE promocodes.partner_id = base.id) AS promocodes"
    );
}

#[test]
fn count_is_a_correlated_subquery() {
    let partner = partner();
    let req = request(partner.as_ref(), "promocodes", RelationMode::Count, &[]);

    let expr = generator().count_expr(&req.metadata, "promocodes_count");
    assert_eq!(
        expr,
        "(SELECT COUNT(*) FROM promocodes WHERE promocodes.partner_id = base.id) AS promocodes_count"
    );
}

#[test]
fn select_list_keeps_registration_order_after_base_columns() {
    let partner = partner();
    let requests = vec![
        request(partner.as_ref(), "profile", RelationMode::Single, &["id"]),
        request(partner.as_ref(), "promocodes", RelationMode::Count, &[]),
    ];

    let select = generator().build_select_list(&["base.*".to_string()], &requests);
    let parts: Vec<&str> = select.split(",\n       ").collect();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0], "base.*");
    assert!(parts[1].starts_with("CASE WHEN profile.id IS NULL"));
    assert!(parts[2].starts_with("(SELECT COUNT(*) FROM promocodes"));
}

#[test]
fn explicit_columns_are_enumerated_in_given_order() {
    let partner = partner();
    let req = request(
        partner.as_ref(),
        "profile",
        RelationMode::Single,
        &["name", "id", "email"],
    );

    let expr = generator().single_object_expr(&req.metadata, req.columns.columns(), "profile");
    assert!(expr.contains(
        "JSON_OBJECT('name', profile.name, 'id', profile.id, 'email', profile.email)"
    ));
}

#[test]
fn collection_and_count_requests_never_join() {
    let partner = partner();
    let requests = vec![
        request(partner.as_ref(), "promocodes", RelationMode::Collection, &["id"]),
        request(partner.as_ref(), "promocodes", RelationMode::Count, &[]),
    ];

    assert_eq!(generator().build_join_list(&requests).unwrap(), "");
}

#[test]
fn has_many_reaching_the_join_path_is_rejected() {
    let partner = partner();
    // A collection-shaped relation forced onto the single-object path.
    let mut req = request(partner.as_ref(), "promocodes", RelationMode::Collection, &["id"]);
    req.mode = RelationMode::Single;

    assert!(matches!(
        generator().build_join_list(std::slice::from_ref(&req)),
        Err(AggrelError::UnsupportedRelationKind(_))
    ));
}

#[test]
fn column_listings_resolve_one_query_per_table() {
    let schema = FakeSchema::new(&[
        ("profiles", &["id", "name"]),
        ("promocodes", &["id", "code"]),
    ]);

    let listings = generator()
        .resolve_column_listings(&schema, &["profiles", "promocodes"])
        .unwrap();
    assert_eq!(listings["profiles"], vec!["id", "name"]);
    assert_eq!(listings["promocodes"], vec!["id", "code"]);
    assert_eq!(
        *schema.calls.borrow(),
        vec!["list:profiles".to_string(), "list:promocodes".to_string()]
    );
}
