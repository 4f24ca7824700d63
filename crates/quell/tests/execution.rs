use std::sync::{Arc, Mutex};

use async_graphql_parser::parse_query;
use async_trait::async_trait;
use quell::{
    BoundedStrategy, ConstValue, Data, DataFetcher, ErrorClassification, FetchContext, FetchError, FetchResult,
    FetchedValue, InterfaceType, MetaField, MetaInputValue, ObjectType, Registry, Request, Resolver, Schema,
    ServerError, TypeResolution, UnionType, Variables,
};
use serde_json::json;

struct Fetch<F>(F);

#[async_trait]
impl<F> DataFetcher for Fetch<F>
where
    F: Fn(FetchContext<'_>) -> FetchResult + Send + Sync,
{
    async fn fetch(&self, ctx: FetchContext<'_>) -> FetchResult {
        (self.0)(ctx)
    }
}

/// Returns a fixed value after yielding to the scheduler a number of times, so completion order
/// can be decoupled from selection order.
struct YieldingFetcher {
    yields: usize,
    value: serde_json::Value,
    completions: Option<Arc<Mutex<Vec<&'static str>>>>,
    label: &'static str,
}

#[async_trait]
impl DataFetcher for YieldingFetcher {
    async fn fetch(&self, _ctx: FetchContext<'_>) -> FetchResult {
        for _ in 0..self.yields {
            tokio::task::yield_now().await;
        }
        if let Some(completions) = &self.completions {
            completions.lock().unwrap().push(self.label);
        }
        Ok(self.value.clone().into())
    }
}

fn json_fetcher(value: serde_json::Value) -> Resolver {
    Resolver::custom(Fetch(move |_ctx: FetchContext<'_>| Ok(value.clone().into())))
}

fn request(query: &str) -> Request {
    Request::new(parse_query(query).unwrap())
}

#[tokio::test]
async fn test_result_keys_follow_selection_order_not_completion_order() {
    let completions = Arc::new(Mutex::new(Vec::new()));
    let fetcher = |label, yields| YieldingFetcher {
        yields,
        value: json!(label),
        completions: Some(Arc::clone(&completions)),
        label,
    };

    let mut registry = Registry::new();
    registry.insert_type(ObjectType::new(
        "Query",
        [
            MetaField::new("a", "String").with_resolver(Resolver::custom(fetcher("a", 6))),
            MetaField::new("b", "String").with_resolver(Resolver::custom(fetcher("b", 3))),
            MetaField::new("c", "String").with_resolver(Resolver::custom(fetcher("c", 0))),
        ],
    ));
    let schema = Schema::new(registry);

    let response = schema.execute(request("{ a b c }")).await;
    assert!(response.is_ok(), "{:?}", response.errors);

    let ConstValue::Object(data) = &response.data else {
        unreachable!("expected an object, got {:?}", response.data);
    };
    let keys: Vec<_> = data.keys().map(|key| key.as_str()).collect();
    assert_eq!(keys, ["a", "b", "c"]);

    // The slowest field was selected first but finished last.
    assert_eq!(*completions.lock().unwrap(), ["c", "b", "a"]);
}

#[tokio::test]
async fn test_null_propagation_collapses_to_nearest_nullable_ancestor() {
    let mut registry = Registry::new();
    registry.insert_type(ObjectType::new(
        "Query",
        [MetaField::new("user", "User").with_resolver(json_fetcher(json!({ "name": null })))],
    ));
    registry.insert_type(ObjectType::new("User", [MetaField::new("name", "String!")]));
    let schema = Schema::new(registry);

    let response = schema.execute(request("{ user { name } }")).await;

    assert_eq!(serde_json::to_value(&response.data).unwrap(), json!({ "user": null }));
    assert_eq!(response.errors.len(), 1);
    let error = &response.errors[0];
    assert_eq!(error.classification, ErrorClassification::NullValueInNonNullableField);
    assert_eq!(serde_json::to_value(&error.path).unwrap(), json!(["user", "name"]));
}

#[tokio::test]
async fn test_null_propagation_can_null_the_whole_data() {
    let mut registry = Registry::new();
    registry.insert_type(ObjectType::new(
        "Query",
        [MetaField::new("user", "User!").with_resolver(json_fetcher(json!({ "name": null })))],
    ));
    registry.insert_type(ObjectType::new("User", [MetaField::new("name", "String!")]));
    let schema = Schema::new(registry);

    let response = schema.execute(request("{ user { name } }")).await;

    assert_eq!(response.data, ConstValue::Null);
    assert_eq!(response.errors.len(), 1);
    assert_eq!(
        serde_json::to_value(&response.errors[0].path).unwrap(),
        json!(["user", "name"])
    );
}

#[tokio::test]
async fn test_null_violations_are_recorded_once_per_path() {
    let mut registry = Registry::new();
    registry.insert_type(ObjectType::new(
        "Query",
        [MetaField::new("user", "User").with_resolver(json_fetcher(json!({ "name": null })))],
    ));
    registry.insert_type(ObjectType::new("User", [MetaField::new("name", "String!")]));
    let schema = Schema::new(registry);

    // The same field twice and once more through a fragment: everything merges onto one path.
    let response = schema
        .execute(request(
            "{ user { name } user { name } ...F } fragment F on Query { user { name } }",
        ))
        .await;

    assert_eq!(serde_json::to_value(&response.data).unwrap(), json!({ "user": null }));
    assert_eq!(response.errors.len(), 1);

    // Distinct aliases are distinct paths, so both get their own error.
    let response = schema.execute(request("{ a: user { name } b: user { name } }")).await;
    assert_eq!(
        serde_json::to_value(&response.data).unwrap(),
        json!({ "a": null, "b": null })
    );
    assert_eq!(response.errors.len(), 2);
}

#[tokio::test]
async fn test_skip_and_include_through_execution() {
    let mut registry = Registry::new();
    registry.insert_type(ObjectType::new(
        "Query",
        [
            MetaField::new("a", "String").with_resolver(json_fetcher(json!("a"))),
            MetaField::new("b", "String").with_resolver(json_fetcher(json!("b"))),
        ],
    ));
    let schema = Schema::new(registry);

    let response = schema
        .execute(request("{ a @skip(if: true) b @skip(if: false) @include(if: true) }"))
        .await;
    assert_eq!(serde_json::to_value(&response.data).unwrap(), json!({ "b": "b" }));

    let response = schema
        .execute(
            request("query ($v: Boolean!) { a @include(if: $v) b }")
                .variables(Variables::from_json(json!({ "v": false }))),
        )
        .await;
    assert_eq!(serde_json::to_value(&response.data).unwrap(), json!({ "b": "b" }));

    // A conditional directive without a usable `if` is fatal for the whole request.
    let response = schema.execute(request("{ a @skip b }")).await;
    assert_eq!(response.data, ConstValue::Null);
    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].classification, ErrorClassification::ValidationError);
}

#[tokio::test]
async fn test_fragment_cycles_do_not_recurse() {
    let mut registry = Registry::new();
    registry.insert_type(ObjectType::new(
        "Query",
        [MetaField::new("a", "String").with_resolver(json_fetcher(json!("a")))],
    ));
    let schema = Schema::new(registry);

    let response = schema
        .execute(request("{ ...A } fragment A on Query { a ...A }"))
        .await;
    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(serde_json::to_value(&response.data).unwrap(), json!({ "a": "a" }));
}

#[tokio::test]
async fn test_variables_reach_arguments() {
    let mut registry = Registry::new();
    registry.insert_type(ObjectType::new(
        "Query",
        [MetaField::new("user", "User")
            .with_argument(MetaInputValue::new("id", "ID!"))
            .with_resolver(Resolver::custom(Fetch(|ctx: FetchContext<'_>| {
                let ConstValue::String(id) = ctx.argument("id").unwrap() else {
                    return Err(FetchError::Failure(quell::Error::new("expected an ID")));
                };
                Ok(json!({ "name": format!("user-{id}") }).into())
            })))],
    ));
    registry.insert_type(ObjectType::new("User", [MetaField::new("name", "String!")]));
    let schema = Schema::new(registry);

    let response = schema
        .execute(
            request("query ($id: ID!) { user(id: $id) { name } }")
                .variables(Variables::from_json(json!({ "id": 42 }))),
        )
        .await;
    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(
        serde_json::to_value(&response.data).unwrap(),
        json!({ "user": { "name": "user-42" } })
    );
}

#[tokio::test]
async fn test_variable_coercion_failure_short_circuits() {
    let fetched = Arc::new(Mutex::new(false));
    let fetched_flag = Arc::clone(&fetched);

    let mut registry = Registry::new();
    registry.insert_type(ObjectType::new(
        "Query",
        [MetaField::new("a", "Int")
            .with_argument(MetaInputValue::new("x", "Int"))
            .with_resolver(Resolver::custom(Fetch(move |_ctx: FetchContext<'_>| {
                *fetched_flag.lock().unwrap() = true;
                Ok(json!(1).into())
            })))],
    ));
    let schema = Schema::new(registry);

    let response = schema
        .execute(
            request("query ($x: Int!) { a(x: $x) }").variables(Variables::from_json(json!({ "x": null }))),
        )
        .await;

    assert_eq!(response.data, ConstValue::Null);
    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].classification, ErrorClassification::ValidationError);
    assert!(!*fetched.lock().unwrap(), "no field may resolve after a variable fails");
}

#[tokio::test]
async fn test_sibling_failure_leaves_partial_results() {
    let mut registry = Registry::new();
    registry.insert_type(ObjectType::new(
        "Query",
        [
            MetaField::new("good", "String").with_resolver(json_fetcher(json!("fine"))),
            MetaField::new("bad", "String").with_resolver(Resolver::custom(Fetch(|_ctx: FetchContext<'_>| {
                Err(FetchError::Failure(quell::Error::new("database exploded")))
            }))),
        ],
    ));
    let schema = Schema::new(registry);

    let response = schema.execute(request("{ good bad }")).await;

    assert_eq!(
        serde_json::to_value(&response.data).unwrap(),
        json!({ "good": "fine", "bad": null })
    );
    assert_eq!(response.errors.len(), 1);
    let error = &response.errors[0];
    assert_eq!(error.classification, ErrorClassification::DataFetchingException);
    assert!(error.message.contains("database exploded"), "{}", error.message);
    assert_eq!(serde_json::to_value(&error.path).unwrap(), json!(["bad"]));
}

#[tokio::test]
async fn test_union_resolution_via_remote_typename() {
    let mut registry = Registry::new();
    registry.insert_type(ObjectType::new(
        "Query",
        [MetaField::new("pet", "Pet")
            .with_resolver(json_fetcher(json!({ "__typename": "Dog", "name": "Rex", "barkVolume": 11 })))],
    ));
    registry.insert_type(ObjectType::new(
        "Dog",
        [MetaField::new("name", "String!"), MetaField::new("barkVolume", "Int")],
    ));
    registry.insert_type(ObjectType::new("Cat", [MetaField::new("name", "String!")]));
    registry.insert_type(UnionType::new("Pet", ["Dog", "Cat"]));
    let schema = Schema::new(registry);

    let response = schema
        .execute(request("{ pet { __typename ... on Dog { name barkVolume } ... on Cat { meow: name } } }"))
        .await;
    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(
        serde_json::to_value(&response.data).unwrap(),
        json!({ "pet": { "__typename": "Dog", "name": "Rex", "barkVolume": 11 } })
    );
}

#[tokio::test]
async fn test_interface_resolution_via_type_resolver() {
    let mut registry = Registry::new();
    registry.insert_type(ObjectType::new(
        "Query",
        [MetaField::new("character", "Character")
            .with_resolver(json_fetcher(json!({ "kind": "droid", "name": "R2-D2" })))],
    ));
    registry.insert_type(ObjectType::new("Human", [MetaField::new("name", "String!")]));
    registry.insert_type(ObjectType::new("Droid", [MetaField::new("name", "String!")]));
    registry.insert_type(
        InterfaceType::new("Character").with_type_resolver(|resolution: TypeResolution<'_>| {
            match resolution.value.data_resolved()["kind"].as_str() {
                Some("droid") => Some("Droid".to_string()),
                _ => Some("Human".to_string()),
            }
        }),
    );
    registry.register_implements("Human", "Character");
    registry.register_implements("Droid", "Character");
    let schema = Schema::new(registry);

    let response = schema
        .execute(request("{ character { __typename name } }"))
        .await;
    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(
        serde_json::to_value(&response.data).unwrap(),
        json!({ "character": { "__typename": "Droid", "name": "R2-D2" } })
    );
}

#[tokio::test]
async fn test_type_resolver_returning_a_non_member_fails_the_field() {
    let mut registry = Registry::new();
    registry.insert_type(ObjectType::new(
        "Query",
        [MetaField::new("pet", "Pet").with_resolver(json_fetcher(json!({ "name": "?" })))],
    ));
    registry.insert_type(ObjectType::new("Dog", [MetaField::new("name", "String!")]));
    registry.insert_type(ObjectType::new("Alien", [MetaField::new("name", "String!")]));
    registry.insert_type(
        UnionType::new("Pet", ["Dog"])
            .with_type_resolver(|_resolution: TypeResolution<'_>| Some("Alien".to_string())),
    );
    let schema = Schema::new(registry);

    let response = schema.execute(request("{ pet { ... on Dog { name } } }")).await;

    assert_eq!(serde_json::to_value(&response.data).unwrap(), json!({ "pet": null }));
    assert_eq!(response.errors.len(), 1);
    let error = &response.errors[0];
    assert_eq!(error.classification, ErrorClassification::UnresolvedType);
    assert!(error.message.contains("not a possible type"), "{}", error.message);
}

#[tokio::test]
async fn test_lists_recurse_per_element_with_indexed_paths() {
    let mut registry = Registry::new();
    registry.insert_type(ObjectType::new(
        "Query",
        [MetaField::new("users", "[User]")
            .with_resolver(json_fetcher(json!([{ "name": "Ada" }, { "name": "Grace" }])))],
    ));
    registry.insert_type(ObjectType::new("User", [MetaField::new("name", "String!")]));
    let schema = Schema::new(registry);

    let response = schema.execute(request("{ users { name } }")).await;
    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(
        serde_json::to_value(&response.data).unwrap(),
        json!({ "users": [{ "name": "Ada" }, { "name": "Grace" }] })
    );
}

#[tokio::test]
async fn test_non_null_list_element_collapses_the_list() {
    let mut registry = Registry::new();
    registry.insert_type(ObjectType::new(
        "Query",
        [MetaField::new("tags", "[String!]").with_resolver(json_fetcher(json!(["a", null, "c"])))],
    ));
    let schema = Schema::new(registry);

    let response = schema.execute(request("{ tags }")).await;

    assert_eq!(serde_json::to_value(&response.data).unwrap(), json!({ "tags": null }));
    assert_eq!(response.errors.len(), 1);
    assert_eq!(serde_json::to_value(&response.errors[0].path).unwrap(), json!(["tags", 1]));
}

#[tokio::test]
async fn test_nullable_list_elements_absorb_their_own_failures() {
    let mut registry = Registry::new();
    registry.insert_type(ObjectType::new(
        "Query",
        [MetaField::new("tags", "[String]").with_resolver(json_fetcher(json!(["a", null, "c"])))],
    ));
    let schema = Schema::new(registry);

    let response = schema.execute(request("{ tags }")).await;
    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(
        serde_json::to_value(&response.data).unwrap(),
        json!({ "tags": ["a", null, "c"] })
    );
}

#[tokio::test]
async fn test_non_list_value_in_list_position_is_an_error() {
    let mut registry = Registry::new();
    registry.insert_type(ObjectType::new(
        "Query",
        [MetaField::new("tags", "[String]").with_resolver(json_fetcher(json!("oops")))],
    ));
    let schema = Schema::new(registry);

    let response = schema.execute(request("{ tags }")).await;
    assert_eq!(serde_json::to_value(&response.data).unwrap(), json!({ "tags": null }));
    assert_eq!(response.errors.len(), 1);
    assert!(
        response.errors[0].message.contains("expected a list"),
        "{}",
        response.errors[0].message
    );
}

#[tokio::test]
async fn test_mutations_run_serially_in_selection_order() {
    let completions = Arc::new(Mutex::new(Vec::new()));
    let fetcher = |label, yields| YieldingFetcher {
        yields,
        value: json!(label),
        completions: Some(Arc::clone(&completions)),
        label,
    };

    let mut registry = Registry::new();
    registry.mutation_type = Some("Mutation".to_string());
    registry.insert_type(ObjectType::new("Query", []));
    registry.insert_type(ObjectType::new(
        "Mutation",
        [
            MetaField::new("first", "String").with_resolver(Resolver::custom(fetcher("first", 5))),
            MetaField::new("second", "String").with_resolver(Resolver::custom(fetcher("second", 0))),
        ],
    ));
    let schema = Schema::new(registry);

    // The first field is much slower; a concurrent schedule would complete `second` first.
    let response = schema.execute(request("mutation { first second }")).await;
    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(*completions.lock().unwrap(), ["first", "second"]);
}

#[tokio::test]
async fn test_serial_mutation_observes_prior_side_effects() {
    let counter = Arc::new(Mutex::new(0));
    let bump = {
        let counter = Arc::clone(&counter);
        Resolver::custom(Fetch(move |_ctx: FetchContext<'_>| {
            let mut counter = counter.lock().unwrap();
            *counter += 1;
            Ok(json!(*counter).into())
        }))
    };

    let mut registry = Registry::new();
    registry.mutation_type = Some("Mutation".to_string());
    registry.insert_type(ObjectType::new("Query", []));
    registry.insert_type(ObjectType::new(
        "Mutation",
        [MetaField::new("bump", "Int").with_resolver(bump)],
    ));
    let schema = Schema::new(registry);

    let response = schema.execute(request("mutation { a: bump b: bump c: bump }")).await;
    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(
        serde_json::to_value(&response.data).unwrap(),
        json!({ "a": 1, "b": 2, "c": 3 })
    );
}

#[tokio::test]
async fn test_missing_mutation_root_is_a_configuration_error() {
    let mut registry = Registry::new();
    registry.insert_type(ObjectType::new("Query", []));
    let schema = Schema::new(registry);

    let response = schema.execute(request("mutation { anything }")).await;
    assert_eq!(response.data, ConstValue::Null);
    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].classification, ErrorClassification::OperationNotSupported);
}

#[tokio::test]
async fn test_subscriptions_are_rejected_on_this_transport() {
    let mut registry = Registry::new();
    registry.subscription_type = Some("Subscription".to_string());
    registry.insert_type(ObjectType::new("Query", []));
    registry.insert_type(ObjectType::new("Subscription", [MetaField::new("events", "String")]));
    let schema = Schema::new(registry);

    let response = schema.execute(request("subscription { events }")).await;
    assert_eq!(response.data, ConstValue::Null);
    assert_eq!(response.errors.len(), 1);
    assert!(
        response.errors[0].message.contains("not supported on this transport"),
        "{}",
        response.errors[0].message
    );
}

#[tokio::test]
async fn test_operation_selection() {
    let mut registry = Registry::new();
    registry.insert_type(ObjectType::new(
        "Query",
        [MetaField::new("a", "String").with_resolver(json_fetcher(json!("a")))],
    ));
    let schema = Schema::new(registry);

    let query = "query First { a } query Second { a }";

    let response = schema.execute(request(query).with_operation_name("Second")).await;
    assert!(response.is_ok(), "{:?}", response.errors);

    let response = schema.execute(request(query)).await;
    assert_eq!(response.errors[0].message, "Operation name required in request.");

    let response = schema.execute(request(query).with_operation_name("Third")).await;
    assert!(
        response.errors[0].message.contains(r#"Unknown operation named "Third""#),
        "{}",
        response.errors[0].message
    );
}

#[tokio::test]
async fn test_abort_bypasses_normal_completion() {
    let mut registry = Registry::new();
    registry.insert_type(ObjectType::new(
        "Query",
        [
            MetaField::new("ok", "String").with_resolver(json_fetcher(json!("fine"))),
            MetaField::new("halt", "String").with_resolver(Resolver::custom(Fetch(
                |_ctx: FetchContext<'_>| Err(FetchError::abort("request rejected by policy")),
            ))),
        ],
    ));
    let schema = Schema::new(registry);

    let response = schema.execute(request("{ ok halt }")).await;

    assert_eq!(response.data, ConstValue::Null);
    assert!(
        response
            .errors
            .iter()
            .any(|error| error.classification == ErrorClassification::ExecutionAborted
                && error.message.contains("request rejected by policy")),
        "{:?}",
        response.errors
    );
}

#[tokio::test]
async fn test_fetcher_envelope_errors_and_local_context_propagate() {
    #[derive(Debug, PartialEq)]
    struct Tenant(&'static str);

    let mut registry = Registry::new();
    registry.insert_type(ObjectType::new(
        "Query",
        [MetaField::new("account", "Account").with_resolver(Resolver::custom(Fetch(
            |_ctx: FetchContext<'_>| {
                let mut local = Data::default();
                local.insert(Tenant("acme"));
                Ok(FetchedValue::new(quell::ResolvedValue::new(json!({})))
                    .with_errors(vec![ServerError::new("stale cache entry", None)])
                    .with_local_context(local))
            },
        )))],
    ));
    registry.insert_type(ObjectType::new(
        "Account",
        [MetaField::new("tenant", "String").with_resolver(Resolver::custom(Fetch(
            |ctx: FetchContext<'_>| {
                let tenant = ctx
                    .local_context
                    .and_then(|data| data.get::<Tenant>())
                    .map(|tenant| tenant.0)
                    .unwrap_or("unknown");
                Ok(json!(tenant).into())
            },
        )))],
    ));
    let schema = Schema::new(registry);

    let response = schema.execute(request("{ account { tenant } }")).await;

    assert_eq!(
        serde_json::to_value(&response.data).unwrap(),
        json!({ "account": { "tenant": "acme" } })
    );
    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].message, "stale cache entry");
}

#[tokio::test]
async fn test_property_resolvers_read_mapped_source_keys() {
    let mut registry = Registry::new();
    registry.insert_type(ObjectType::new(
        "Query",
        [MetaField::new("user", "User")
            .with_resolver(json_fetcher(json!({ "full_name": "Ada Lovelace", "email": "ada@example.com" })))],
    ));
    registry.insert_type(ObjectType::new(
        "User",
        [
            MetaField::new("fullName", "String!").with_mapped_name("full_name"),
            MetaField::new("email", "String!"),
        ],
    ));
    let schema = Schema::new(registry);

    let response = schema.execute(request("{ user { fullName email } }")).await;
    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(
        serde_json::to_value(&response.data).unwrap(),
        json!({ "user": { "fullName": "Ada Lovelace", "email": "ada@example.com" } })
    );
}

#[tokio::test]
async fn test_bounded_strategy_preserves_order() {
    let mut registry = Registry::new();
    registry.insert_type(ObjectType::new(
        "Query",
        [
            MetaField::new("a", "String").with_resolver(Resolver::custom(YieldingFetcher {
                yields: 4,
                value: json!("a"),
                completions: None,
                label: "a",
            })),
            MetaField::new("b", "String").with_resolver(Resolver::custom(YieldingFetcher {
                yields: 2,
                value: json!("b"),
                completions: None,
                label: "b",
            })),
            MetaField::new("c", "String").with_resolver(Resolver::custom(YieldingFetcher {
                yields: 0,
                value: json!("c"),
                completions: None,
                label: "c",
            })),
        ],
    ));
    let schema = Schema::build(registry).query_strategy(BoundedStrategy::new(2)).finish();

    let response = schema.execute(request("{ a b c }")).await;
    assert!(response.is_ok(), "{:?}", response.errors);

    let ConstValue::Object(data) = &response.data else {
        unreachable!("expected an object, got {:?}", response.data);
    };
    let keys: Vec<_> = data.keys().map(|key| key.as_str()).collect();
    assert_eq!(keys, ["a", "b", "c"]);
}

#[tokio::test]
async fn test_batch_execution_preserves_request_order() {
    let mut registry = Registry::new();
    registry.insert_type(ObjectType::new(
        "Query",
        [MetaField::new("echo", "String")
            .with_argument(MetaInputValue::new("value", "String!"))
            .with_resolver(Resolver::custom(Fetch(|ctx: FetchContext<'_>| {
                let value = match ctx.argument("value") {
                    Some(ConstValue::String(value)) => value.clone(),
                    _ => String::new(),
                };
                Ok(json!(value).into())
            })))],
    ));
    let schema = Schema::new(registry);

    let batch = quell::BatchRequest::Batch(vec![
        request(r#"{ echo(value: "one") }"#),
        request(r#"{ echo(value: "two") }"#),
    ]);
    let response = schema.execute_batch(batch).await;
    assert!(response.is_ok());

    let serialized = serde_json::to_value(&response).unwrap();
    assert_eq!(serialized[0]["data"]["echo"], json!("one"));
    assert_eq!(serialized[1]["data"]["echo"], json!("two"));
}

#[tokio::test]
async fn test_leaf_serialization_failures_are_recorded() {
    let mut registry = Registry::new();
    registry.insert_type(ObjectType::new(
        "Query",
        [MetaField::new("count", "Int").with_resolver(json_fetcher(json!("not a number")))],
    ));
    let schema = Schema::new(registry);

    let response = schema.execute(request("{ count }")).await;
    assert_eq!(serde_json::to_value(&response.data).unwrap(), json!({ "count": null }));
    assert_eq!(response.errors.len(), 1);
}

#[tokio::test]
async fn test_enum_output_values() {
    let mut registry = Registry::new();
    registry.insert_type(quell::EnumType::new("Color", ["RED", "GREEN"]));
    registry.insert_type(ObjectType::new(
        "Query",
        [
            MetaField::new("good", "Color").with_resolver(json_fetcher(json!("RED"))),
            MetaField::new("bad", "Color").with_resolver(json_fetcher(json!("MAGENTA"))),
        ],
    ));
    let schema = Schema::new(registry);

    let response = schema.execute(request("{ good bad }")).await;
    assert_eq!(
        serde_json::to_value(&response.data).unwrap(),
        json!({ "good": "RED", "bad": null })
    );
    assert_eq!(response.errors.len(), 1);
    assert!(
        response.errors[0].message.contains("Invalid value"),
        "{}",
        response.errors[0].message
    );
}

#[tokio::test]
async fn test_parent_resolver_hands_the_source_down() {
    let mut registry = Registry::new();
    registry.insert_type(ObjectType::new(
        "Query",
        [MetaField::new("viewer", "Viewer")
            .with_resolver(json_fetcher(json!({ "name": "Ada" })))],
    ));
    registry.insert_type(ObjectType::new(
        "Viewer",
        [MetaField::new("self", "User").with_resolver(Resolver::Parent)],
    ));
    registry.insert_type(ObjectType::new("User", [MetaField::new("name", "String!")]));
    let schema = Schema::new(registry);

    let response = schema.execute(request("{ viewer { self { name } } }")).await;
    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(
        serde_json::to_value(&response.data).unwrap(),
        json!({ "viewer": { "self": { "name": "Ada" } } })
    );
}
