use chrono::{TimeZone, Utc};
use remapper::{
    remap, DefinitionError, FormatError, MessageCatalog, MessageDescriptor, MessageFormat, RemapError, Remapper,
    RemapperContext,
};
use serde_json::{json, Value};

fn context() -> RemapperContext {
    RemapperContext::builder()
        .with_now(Utc.with_ymd_and_hms(2022, 3, 14, 15, 9, 26).unwrap())
        .build()
}

#[test]
fn test_prop_name() {
    let output = remap(&json!([{"prop": "name"}]), &json!({"name": "Spongebob"}), &context()).unwrap();
    assert_eq!(output, json!("Spongebob"));
}

#[test]
fn test_object_from_with_nested_prop() {
    let definition = json!([{"object.from": {"x": [{"prop": "y"}]}}]);
    assert_eq!(remap(&definition, &json!({"y": 7}), &context()).unwrap(), json!({"x": 7}));
}

#[test]
fn test_date_year_extraction() {
    let definition = json!({"string.format": {
        "template": "{date, date, ::yyyy}",
        "values": {"date": [{"prop": "date"}, {"date.parse": "yyyy-MM-dd'T'HH:mm:ss.SSSX"}]}
    }});
    let output = remap(&definition, &json!({"date": "1970-01-01T00:00:00.000Z"}), &context()).unwrap();
    assert_eq!(output, json!("1970"));
}

#[test]
fn test_duplicate_operator_is_raised() {
    let err = remap(&json!({"prop": "a", "static": "b"}), &json!({}), &context()).unwrap_err();
    assert!(matches!(
        err,
        RemapError::Definition(DefinitionError::DuplicateOperator { found: 2, .. })
    ));
}

#[test]
fn test_missing_placeholder_gives_diagnostic() {
    let definition = json!([{"string.format": {"template": "Hello {name}!"}}]);
    let output = remap(&definition, &json!({}), &context()).unwrap();
    assert_eq!(
        output,
        json!("The intl string context variable \"name\" was not provided to the string \"Hello {name}!\"")
    );
}

#[test]
fn test_translated_message_with_plural() {
    let context = RemapperContext::builder()
        .with_locale("nl")
        .with_messages([("items", "{count, plural, =0 {Geen items} one {Eén item} other {# items}}")])
        .build();
    let definition = json!([{"string.format": {
        "messageId": "items",
        "template": "{count} items",
        "values": {"count": [{"prop": "length"}]}
    }}]);

    assert_eq!(remap(&definition, &json!([]), &context).unwrap(), json!("Geen items"));
    assert_eq!(remap(&definition, &json!(["a"]), &context).unwrap(), json!("Eén item"));
    assert_eq!(remap(&definition, &json!([1, 2, 3]), &context).unwrap(), json!("3 items"));
}

#[test]
fn test_custom_message_provider() {
    let context = RemapperContext::builder()
        .with_message_provider(|descriptor: &MessageDescriptor| match descriptor.id.as_deref() {
            Some("title") => MessageFormat::new("{page} | Bikini Bottom", Default::default()),
            Some(id) => Err(FormatError::MissingMessage { id: id.to_string() }),
            None => MessageFormat::new(descriptor.default_message.as_deref().unwrap_or(""), Default::default()),
        })
        .build();

    let title = json!([{"string.format": {"messageId": "title", "values": {"page": [{"prop": "page"}]}}}]);
    assert_eq!(
        remap(&title, &json!({"page": "Krusty Krab"}), &context).unwrap(),
        json!("Krusty Krab | Bikini Bottom")
    );

    let unknown = json!([{"string.format": {"messageId": "nope"}}]);
    assert_eq!(remap(&unknown, &json!(null), &context).unwrap(), json!("{nope}"));
}

#[test]
fn test_conditional_display_name() {
    let definition = json!([{"if": {
        "condition": [{"prop": "nickname"}],
        "then": [{"prop": "nickname"}],
        "else": [{"prop": "name"}, {"string.case": "upper"}]
    }}]);
    assert_eq!(
        remap(&definition, &json!({"name": "sandy", "nickname": "Squirrel"}), &context()).unwrap(),
        json!("Squirrel")
    );
    assert_eq!(
        remap(&definition, &json!({"name": "sandy", "nickname": ""}), &context()).unwrap(),
        json!("SANDY")
    );
}

#[test]
fn test_list_rendering_pipeline() {
    let definition = json!([
        {"prop": "orders"},
        {"array.map": [{"object.from": {
            "label": [{"string.format": {
                "template": "#{position}: {item}",
                "values": {
                    "position": [{"array": "index"}],
                    "item": [{"prop": "item"}, {"string.replace": {"\\s+": "-"}}]
                }
            }}],
            "paid": [{"not": [{"prop": "outstanding"}]}]
        }}]}
    ]);
    let input = json!({"orders": [
        {"item": "krabby patty", "outstanding": 0},
        {"item": "kelp shake", "outstanding": 2.5}
    ]});

    assert_eq!(
        remap(&definition, &input, &context()).unwrap(),
        json!([
            {"label": "#0: krabby-patty", "paid": true},
            {"label": "#1: kelp-shake", "paid": false}
        ])
    );
}

#[test]
fn test_date_parse_without_format() {
    let definition = json!([{"date.parse": null}]);
    assert_eq!(
        remap(&definition, &json!("2022-01-02T03:04:05+01:00"), &context()).unwrap(),
        json!("2022-01-02T02:04:05.000Z")
    );
    assert_eq!(remap(&definition, &json!("not a date"), &context()).unwrap(), Value::Null);
}

#[test]
fn test_missing_data_is_lenient() {
    let definition = json!([
        {"prop": "profile.address.city"},
        {"string.case": "lower"}
    ]);
    assert_eq!(remap(&definition, &json!({}), &context()).unwrap(), json!("null"));

    let definition = json!([{"array.map": [[{"prop": "id"}]]}]);
    assert_eq!(remap(&definition, &json!(null), &context()).unwrap(), json!([null]));
}

#[test]
fn test_parsed_remapper_is_reusable_across_contexts() {
    let remapper = Remapper::parse(&json!([{"context": "appName"}])).unwrap();
    let first = RemapperContext::builder().with_context("appName", json!("Chum Bucket")).build();
    let second = first.with_variables(json!({"appName": "Krusty Krab"}));

    assert_eq!(remapper.remap(&json!(null), &first).unwrap(), json!("Chum Bucket"));
    assert_eq!(remapper.remap(&json!(null), &second).unwrap(), json!("Krusty Krab"));
}

#[test]
fn test_catalog_provider_through_builder() {
    let catalog = MessageCatalog::new("en").with_messages([("greet", "Ahoy {name}")]);
    let context = RemapperContext::builder().with_message_provider(catalog).build();
    let definition = json!([{"string.format": {"messageId": "greet", "values": {"name": [{"user": "name"}]}}}]);
    assert_eq!(remap(&definition, &json!(null), &context).unwrap(), json!("Ahoy "));
}

#[test]
fn test_depth_exceeded() {
    let mut definition = json!([{"prop": "x"}]);
    for _ in 0..100 {
        definition = json!([{"if": {"condition": true, "then": definition}}]);
    }
    let err = remap(&definition, &json!(null), &context()).unwrap_err();
    assert!(matches!(err, RemapError::DepthExceeded { max_depth: 64 }));

    // an empty array never evaluates the nested remapper
    let mut definition = json!([{"prop": "x"}]);
    for _ in 0..100 {
        definition = json!([{"array.map": [definition]}]);
    }
    assert_eq!(remap(&definition, &json!([]), &context()).unwrap(), json!([]));
}

#[test]
fn test_date_parse_out_of_range_is_null() {
    let formatted = json!([{"date.parse": "yyyyyy-MM-dd HH:mm XXX"}]);
    assert_eq!(
        remap(&formatted, &json!("262142-12-31 23:00 -02:00"), &context()).unwrap(),
        Value::Null
    );

    let iso = json!([{"date.parse": null}]);
    assert_eq!(
        remap(&iso, &json!("+262142-12-31T23:00:00-02:00"), &context()).unwrap(),
        Value::Null
    );
}

#[test]
fn test_russian_plural_forms() {
    let context = RemapperContext::builder().with_locale("ru").build();
    let definition = json!([{"string.format": {
        "template": "{n, plural, one {# файл} few {# файла} many {# файлов} other {# файла}}",
        "values": {"n": [{"prop": "length"}]}
    }}]);

    assert_eq!(remap(&definition, &json!([1]), &context).unwrap(), json!("1 файл"));
    assert_eq!(remap(&definition, &json!([1, 2]), &context).unwrap(), json!("2 файла"));
    assert_eq!(remap(&definition, &json!([1, 2, 3, 4, 5]), &context).unwrap(), json!("5 файлов"));
}

#[test]
fn test_replacement_group_beyond_pattern_groups() {
    let definition = json!([{"string.replace": {"(\\d)": "$10"}}]);
    assert_eq!(remap(&definition, &json!("a1b2"), &context()).unwrap(), json!("a10b20"));
}
