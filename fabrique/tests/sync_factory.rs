//! End-to-end coverage for synchronous factories.

use anyhow::{Result, ensure};
use fabrique::source::{each, val};
use fabrique::{Builder, Factory, make_factory};
use rstest::{fixture, rstest};
use serde::Deserialize;
use serde_json::{Value, json};
use test_helpers::fixtures::{Child, birthday, child_factory};

#[derive(Debug, Deserialize)]
struct Parent {
    name: String,
    birthday: String,
    children: Vec<Child>,
    spouse: Option<Box<Parent>>,
}

#[fixture]
fn parents() -> Factory<Parent> {
    make_factory(
        Builder::new()
            .field("name", "Parent")
            .field("birthday", each(birthday))
            .field("children", each(|_| Vec::<Child>::new()))
            .field("spouse", Value::Null),
    )
}

#[rstest]
fn override_and_defaults() -> Result<()> {
    let children = child_factory();
    let jimmy = children.build_with(json!({"name": "Jimmy"}))?;
    let expected = Child {
        name: "Jimmy".into(),
        grade: 1,
    };
    ensure!(jimmy == expected, "unexpected child {jimmy:?}");
    let kid = children.build()?;
    ensure!(kid.name == "Kid", "default name should apply");
    Ok(())
}

#[rstest]
fn sequence_numbers_drive_generators(parents: Factory<Parent>) -> Result<()> {
    let susan = parents.build_with(json!({"name": "Susan"}))?;
    let edward = parents.build_with(json!({"name": "Edward"}))?;
    ensure!(susan.birthday == "2017-05-01", "got {}", susan.birthday);
    ensure!(edward.birthday == "2017-05-02", "got {}", edward.birthday);
    ensure!(susan.spouse.is_none() && edward.name == "Edward", "unexpected parents");
    Ok(())
}

#[rstest]
fn has_many_relationships(parents: Factory<Parent>) -> Result<()> {
    let children = child_factory();
    let jimmy = children.build_with(json!({"name": "Jimmy"}))?;
    let alice = children.build_with(json!({"name": "Alice", "grade": 3}))?;
    let susan = parents.build_with(json!({
        "name": "Susan",
        "children": [
            {"name": jimmy.name, "grade": jimmy.grade},
            {"name": alice.name, "grade": alice.grade}
        ]
    }))?;
    let names: Vec<&str> = susan.children.iter().map(|c| c.name.as_str()).collect();
    ensure!(names == ["Jimmy", "Alice"], "unexpected children {names:?}");
    Ok(())
}

#[rstest]
fn generators_can_call_other_factories() -> Result<()> {
    let children = child_factory();
    let with_kids = make_factory::<Parent>(
        Builder::new()
            .field("name", "Timothy")
            .field("birthday", each(birthday))
            .field(
                "children",
                each(move |_| {
                    ["Bobby", "Jane"]
                        .into_iter()
                        .filter_map(|name| children.build_with(json!({"name": name})).ok())
                        .collect::<Vec<_>>()
                }),
            )
            .field("spouse", Value::Null),
    );
    let tim = with_kids.build_with(json!({"birthday": "2017-02-01"}))?;
    let names: Vec<&str> = tim.children.iter().map(|c| c.name.as_str()).collect();
    ensure!(names == ["Bobby", "Jane"], "unexpected children {names:?}");
    ensure!(tim.birthday == "2017-02-01", "override should win");
    Ok(())
}

#[rstest]
fn extended_factories_replace_sources() -> Result<()> {
    let geniuses = child_factory().extend(Builder::new().field("grade", each(|n| (n + 1) * 2)));
    let colin = geniuses.build_with(json!({"name": "Colin"}))?;
    let albert = geniuses.build_with(json!({"name": "Albert"}))?;
    ensure!(colin.grade == 2 && albert.grade == 4, "grades {} {}", colin.grade, albert.grade);
    Ok(())
}

#[rstest]
fn derived_name_reflects_override() -> Result<()> {
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Person {
        first_name: String,
        full_name: String,
    }
    let people = make_factory::<Person>(
        Builder::new()
            .field("firstName", "")
            .field("lastName", "Bond")
            .field("fullName", ""),
    )
    .with_derivation2(("firstName", "lastName"), "fullName", |first: String, last: String, _| {
        format!("{first} {last}")
    });
    let bond = people.build_with(json!({"firstName": "James"}))?;
    ensure!(bond.full_name == "James Bond", "got {}", bond.full_name);
    ensure!(bond.first_name == "James", "override lost");
    Ok(())
}

#[rstest]
fn build_list_applies_override() -> Result<()> {
    let bruces = child_factory().build_list_with(3, json!({"name": "Bruce"}))?;
    ensure!(bruces.len() == 3, "expected three children");
    ensure!(
        bruces.iter().all(|c| c.name == "Bruce" && c.grade == 1),
        "unexpected children {bruces:?}"
    );
    Ok(())
}

#[rstest]
fn combined_factories_share_mixins() -> Result<()> {
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Post {
        content: String,
        created_at: u64,
        updated_at: u64,
        is_deleted: bool,
    }
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct User {
        email: String,
        created_at: u64,
        is_deleted: bool,
    }
    let time_stamps = make_factory::<Value>(
        Builder::new()
            .field("createdAt", val(1_700_000_000_u64))
            .field("updatedAt", each(|n| 1_700_000_000 + n)),
    );
    let soft_delete = make_factory::<Value>(Builder::new().field("isDeleted", false));

    let posts = make_factory::<Value>(Builder::new().field("content", "lorem ipsum"))
        .combine::<Value, Value>(&time_stamps)?
        .combine::<Value, Post>(&soft_delete)?;
    let users = make_factory::<Value>(Builder::new().field("email", "test@user.com"))
        .combine::<Value, Value>(&time_stamps)?
        .combine::<Value, User>(&soft_delete)?;

    let post = posts.build_with(json!({"content": "yadda yadda", "isDeleted": true}))?;
    ensure!(post.is_deleted && post.content == "yadda yadda", "unexpected post {post:?}");
    ensure!(post.updated_at == post.created_at, "first build has sequence 0");

    let user = users.build_with(json!({"email": "foo@bar.com", "createdAt": 1_514_851_200}))?;
    ensure!(user.created_at == 1_514_851_200, "override should win");
    ensure!(user.email == "foo@bar.com" && !user.is_deleted, "unexpected user {user:?}");
    Ok(())
}

#[rstest]
fn nested_overrides_keep_unmentioned_fields() -> Result<()> {
    let stores = make_factory::<Value>(Builder::new().field(
        "aisle",
        json!({"name": "Junk Food Aisle", "typeOfFood": "Junk Food", "tags": ["a", "b", "c"]}),
    ));
    let store = stores.build_with(json!({"aisle": {"budget": 9999, "tags": ["a", "b"]}}))?;
    let expected = json!({"aisle": {
        "name": "Junk Food Aisle",
        "typeOfFood": "Junk Food",
        "tags": ["a", "b"],
        "budget": 9999
    }});
    ensure!(store == expected, "unexpected store {store}");
    Ok(())
}

#[rstest]
fn self_derivation_wraps_original_value(parents: Factory<Parent>) -> Result<()> {
    let formal = parents.with_self_derivation1("name", |name: String, _| format!("Dr. {name}"));
    let first = formal.build()?;
    let second = formal.build_with(json!({"name": "Who"}))?;
    ensure!(first.name == "Dr. Parent", "got {}", first.name);
    ensure!(second.name == "Who", "direct override must win, got {}", second.name);
    ensure!(first.birthday == "2017-05-01", "self-derivation must not advance the counter");
    Ok(())
}
