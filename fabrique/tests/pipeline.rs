//! End-to-end coverage for pipelines chaining several factories.

use anyhow::{Result, ensure};
use fabrique::Pipeline;
use fabrique::pipeline::StageOverride;
use rstest::rstest;
use serde::Deserialize;
use serde_json::json;
use test_helpers::fixtures::{
    Child, Grandparent, Parent, async_child_factory, async_parent_factory, birthday,
    grandparent_factory,
};

#[derive(Debug, Deserialize)]
struct Family {
    hello: String,
    hola: String,
    byebye: String,
    corner: String,
    golf: String,
    kiddo: Child,
    dad: Parent,
    gramps: Grandparent,
}

#[rstest]
#[tokio::test]
async fn builds_data_in_steps() -> Result<()> {
    let family = Pipeline::start()
        .add_values(json!({"hello": "kitty", "hola": "espanol"}))
        .add_values_async(|_| async { json!({"byebye": "birdie"}) })
        .add_values_with(|acc| {
            json!({
                "corner": format!("{} corner", acc["hello"].as_str().unwrap_or_default()),
                "golf": acc["byebye"],
            })
        })
        .add_factory(&async_child_factory(), "kiddo", json!({"grade": 2}))
        .add_factory(
            &async_parent_factory(),
            "dad",
            StageOverride::deferred(|acc| async move {
                json!({"name": "Dad", "children": [acc["kiddo"]]})
            }),
        )
        .add_tx_factory(
            &grandparent_factory(),
            "gramps",
            StageOverride::with(|acc| json!({"name": "Gramps", "children": [acc["dad"]]})),
        )
        .finish::<Family>()
        .await?;

    ensure!(family.hello == "kitty" && family.hola == "espanol", "literal stage lost");
    ensure!(family.byebye == "birdie" && family.golf == "birdie", "async stage lost");
    ensure!(family.corner == "kitty corner", "got {}", family.corner);
    ensure!(family.kiddo.grade == 2 && family.kiddo.name == "Kid", "got {:?}", family.kiddo);
    ensure!(family.dad.name == "Dad", "got {}", family.dad.name);
    ensure!(family.dad.birthday == birthday(0), "got {}", family.dad.birthday);
    ensure!(family.dad.children.len() == 1, "dad should have one child");
    let first_child: Option<Child> = family
        .dad
        .children
        .first()
        .cloned()
        .map(serde_json::from_value)
        .transpose()?;
    ensure!(first_child.as_ref() == Some(&family.kiddo), "dad's child should be kiddo");
    ensure!(family.gramps.parent.name == "Gramps", "got {}", family.gramps.parent.name);
    ensure!(family.gramps.spoils, "grandparents spoil");
    let first_grandchild: Option<Parent> = family
        .gramps
        .parent
        .children
        .first()
        .cloned()
        .map(serde_json::from_value)
        .transpose()?;
    ensure!(first_grandchild.as_ref() == Some(&family.dad), "gramps' child should be dad");
    Ok(())
}

#[rstest]
#[tokio::test]
async fn stage_factories_keep_their_own_counters() -> Result<()> {
    let parents = async_parent_factory();
    let composite = Pipeline::start()
        .add_factory(&parents, "first", StageOverride::None)
        .add_factory(&parents, "second", StageOverride::None)
        .await?;
    let birthdays: Vec<&str> = ["first", "second"]
        .iter()
        .filter_map(|key| composite.get(*key))
        .filter_map(|parent| parent["birthday"].as_str())
        .collect();
    ensure!(birthdays == [birthday(0), birthday(1)], "got {birthdays:?}");
    ensure!(parents.sequence_number() == 2, "pipeline shares the factory counter");
    Ok(())
}
