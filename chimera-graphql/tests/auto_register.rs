use chimera_graphql::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(SchemaModel, Debug, Clone, Serialize, Deserialize)]
#[schema(crate = "chimera_graphql::chimera_schema")]
struct Tally {
    #[schema(not_blank)]
    label: String,

    #[schema(range(max = 100))]
    count: u8,
}

#[derive(Default)]
struct TallyResolver;

#[resolver(auto_register)]
impl TallyResolver {
    #[query_with_schema(Tally, name = "tally")]
    fn tally(&self) -> Result<Tally, WebError> {
        Ok(Tally {
            label: "votes".to_string(),
            count: 3,
        })
    }

    #[query_with_schema(Tally, name = "pinnedTally", parse_to_instance = true)]
    async fn pinned_tally(&self) -> Result<Tally, WebError> {
        self.tally()
    }

    #[mutation_with_schema(Tally, name = "overflow")]
    fn overflow(&self) -> Result<Value, WebError> {
        Ok(json!({ "label": "votes", "count": 300 }))
    }
}

#[tokio::test]
async fn test_from_inventory_collects_resolver() {
    let registry = ResolverRegistry::from_inventory().unwrap();
    assert_eq!(registry.len(), TallyResolver::__get_operations().len());

    let tally = registry.query("tally", json!({})).await.unwrap();
    let instance = tally.as_instance().unwrap();
    assert_eq!(instance.class().name(), "Tally");
    assert_eq!(instance.get("count"), Some(json!(3)));
}

#[tokio::test]
async fn test_inventory_resolver_validates_output() {
    let registry = ResolverRegistry::from_inventory().unwrap();

    let error = registry.mutation("overflow", json!({})).await.unwrap_err();
    assert!(error.is_bad_request());
    let issues = error.issues().unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].path_string(), "count");
}

#[tokio::test]
async fn test_from_inventory_with_config_applies_defaults() {
    let config = GraphqlConfig::from_toml_str("[graphql]\nparse_to_instance = false").unwrap();
    let registry = ResolverRegistry::from_inventory_with_config(config).unwrap();
    assert!(!registry.config().graphql.parse_to_instance);

    let plain = registry.query("tally", json!({})).await.unwrap();
    assert!(plain.is_plain());
    assert_eq!(plain.to_value(), json!({ "label": "votes", "count": 3 }));

    // 操作上显式设置的选项优先于配置
    let pinned = registry.query("pinnedTally", json!({})).await.unwrap();
    assert!(pinned.as_instance().is_some());
}

#[test]
fn test_each_inventory_registry_is_independent() {
    let first = ResolverRegistry::from_inventory().unwrap();
    let second = ResolverRegistry::from_inventory().unwrap();
    assert_eq!(first.len(), second.len());
    assert!(second.sdl().contains("type Tally {\n  label: String!\n  count: Int!\n}"));
}

#[test]
fn test_out_of_range_argument_reports_field_issue() {
    let error = parse_args::<Tally>(&json!({ "label": "votes", "count": -1 })).unwrap_err();
    let issues = error.issues().unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].path_string(), "count");
    assert_eq!(issues[0].code, IssueCode::TooSmall);
}
