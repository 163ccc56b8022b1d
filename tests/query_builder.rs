use serde_json::json;
use shop_admin_api::{
    error::AppError,
    routes::params::{FilterCondition, FilterOp, ListQuery, Projection, SortKey},
};

fn parse(raw: &[(&str, &str)]) -> Result<ListQuery, AppError> {
    ListQuery::from_pairs(
        raw.iter()
            .map(|(key, value)| (key.to_string(), value.to_string())),
    )
}

#[test]
fn pagination_defaults_and_clamps() {
    let query = parse(&[]).unwrap();
    assert_eq!(query.pagination(), (1, 20, 0));

    let query = parse(&[("page", "3"), ("limit", "10")]).unwrap();
    assert_eq!(query.pagination(), (3, 10, 20));

    let query = parse(&[("page", "0"), ("limit", "1000")]).unwrap();
    assert_eq!(query.pagination(), (1, 100, 0));

    let query = parse(&[("limit", "0")]).unwrap();
    assert_eq!(query.pagination(), (1, 1, 0));
}

#[test]
fn non_numeric_page_is_a_bad_request() {
    assert!(matches!(parse(&[("page", "two")]), Err(AppError::BadRequest(_))));
    assert!(matches!(parse(&[("limit", "-5")]), Err(AppError::BadRequest(_))));
}

#[test]
fn bracket_operators_become_conditions() {
    let query = parse(&[("price[gte]", "100"), ("stock[lt]", "5"), ("title", "Mug")]).unwrap();
    assert_eq!(
        query.filters,
        vec![
            FilterCondition {
                field: "price".into(),
                op: FilterOp::Gte,
                value: "100".into()
            },
            FilterCondition {
                field: "stock".into(),
                op: FilterOp::Lt,
                value: "5".into()
            },
            FilterCondition {
                field: "title".into(),
                op: FilterOp::Eq,
                value: "Mug".into()
            },
        ]
    );
}

#[test]
fn unknown_operators_are_rejected() {
    assert!(matches!(
        parse(&[("price[like]", "1")]),
        Err(AppError::BadRequest(_))
    ));
    assert!(parse(&[("price[gte", "1")]).is_err());
}

#[test]
fn json_filter_accepts_dollar_operators_and_scalars() {
    let filter = json!({ "price": { "$gt": 10, "lte": 99 }, "is_active": true }).to_string();
    let query = parse(&[("filter", filter.as_str())]).unwrap();

    assert!(query.filters.contains(&FilterCondition {
        field: "price".into(),
        op: FilterOp::Gt,
        value: "10".into()
    }));
    assert!(query.filters.contains(&FilterCondition {
        field: "price".into(),
        op: FilterOp::Lte,
        value: "99".into()
    }));
    assert!(query.filters.contains(&FilterCondition {
        field: "is_active".into(),
        op: FilterOp::Eq,
        value: "true".into()
    }));
}

#[test]
fn json_filter_must_be_an_object_of_scalars() {
    assert!(parse(&[("filter", "[1,2]")]).is_err());
    assert!(parse(&[("filter", "{not json")]).is_err());
    assert!(parse(&[("filter", r#"{"tags":["a"]}"#)]).is_err());
}

#[test]
fn sort_defaults_to_newest_first() {
    let query = parse(&[]).unwrap();
    assert_eq!(
        query.sort_keys(),
        vec![SortKey {
            field: "created_at".into(),
            descending: true
        }]
    );

    let query = parse(&[("sort", "-price, title")]).unwrap();
    assert_eq!(
        query.sort_keys(),
        vec![
            SortKey {
                field: "price".into(),
                descending: true
            },
            SortKey {
                field: "title".into(),
                descending: false
            },
        ]
    );
}

#[test]
fn inclusion_projection_always_keeps_id() {
    let query = parse(&[("fields", "title,price")]).unwrap();
    let item = json!({ "id": "x", "title": "Mug", "price": 10, "stock": 3 });
    assert_eq!(
        query.projection.apply(item),
        json!({ "id": "x", "title": "Mug", "price": 10 })
    );
}

#[test]
fn exclusion_projection_drops_named_fields() {
    let query = parse(&[("fields", "-stock,-price")]).unwrap();
    assert_eq!(
        query.projection,
        Projection::Exclude(vec!["stock".into(), "price".into()])
    );
    let item = json!({ "id": "x", "title": "Mug", "price": 10, "stock": 3 });
    assert_eq!(query.projection.apply(item), json!({ "id": "x", "title": "Mug" }));
}

#[test]
fn mixed_projection_is_rejected() {
    assert!(parse(&[("fields", "title,-stock")]).is_err());
    assert_eq!(parse(&[("fields", " , ")]).unwrap().projection, Projection::All);
}
