//! Record types and factories shared by integration tests.

use fabrique::asynchronous::{AsyncBuilder, AsyncTransformFactory, async_each, make_async_factory};
use fabrique::source::each;
use fabrique::{AsyncFactory, Builder, Factory, make_factory};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A school child.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Child {
    /// Given name.
    pub name: String,
    /// School grade.
    pub grade: u32,
}

/// A parent with a birthday and any number of children.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Parent {
    /// Given name.
    pub name: String,
    /// ISO-8601 calendar date.
    pub birthday: String,
    /// Children, possibly built by other factories.
    pub children: Vec<Value>,
    /// The parent's spouse, when one is recorded.
    pub spouse: Option<Box<Self>>,
}

/// A parent who has earned the right to spoil grandchildren.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Grandparent {
    /// The underlying parent record.
    #[serde(flatten)]
    pub parent: Parent,
    /// Always `true`.
    pub spoils: bool,
}

/// Birthday handed to the parent built with sequence number `n`.
#[must_use]
pub fn birthday(n: u64) -> String {
    format!("2017-05-{:02}", n + 1)
}

/// Synchronous factory for [`Child`] with fixed defaults.
#[must_use]
pub fn child_factory() -> Factory<Child> {
    make_factory(Builder::new().field("name", "Kid").field("grade", 1))
}

/// Asynchronous factory for [`Child`] with fixed defaults.
#[must_use]
pub fn async_child_factory() -> AsyncFactory<Child> {
    make_async_factory(AsyncBuilder::new().field("name", "Kid").field("grade", 1))
}

/// Asynchronous factory for [`Parent`] whose birthday advances with the
/// sequence number.
#[must_use]
pub fn async_parent_factory() -> AsyncFactory<Parent> {
    make_async_factory(
        AsyncBuilder::new()
            .field("name", "Parent")
            .field("birthday", async_each(|n| async move { birthday(n) }))
            .field("children", each(|_| Vec::<Value>::new()))
            .field("spouse", Value::Null),
    )
}

/// [`async_parent_factory`] transformed into a [`Grandparent`].
#[must_use]
pub fn grandparent_factory() -> AsyncTransformFactory<Parent, Grandparent> {
    async_parent_factory().transform(|parent| Grandparent {
        parent,
        spoils: true,
    })
}
