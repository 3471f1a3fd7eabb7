//! Customizable JSON rendering of a [`Page`].
//!
//! With default names a page of `UserResponse`s renders as:
//!
//! ```text
//! {
//!   "users":    [ {...}, {...} ],
//!   "page":     { "number": 0, "size": 20, "total": 1, "first": true, "last": true },
//!   "elements": { "total": 2, "exposed": 2 },
//!   "sort":     [ { "property": "name", "direction": "ASC" } ]
//! }
//! ```
//!
//! The content key is omitted for an empty page and the sort block for an
//! unsorted one. Every block and field name is configurable.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue, json};

use crudkit_core::{ContentAlias, CrudResult, Page};

use crate::naming::{first_word, snake_case};
use crate::pluralize::{EnglishPluralizer, Pluralizer};

/// How the content key is derived when the response type declares no alias.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentAliasMode {
    /// Plural of the lower-cased first word: `UserResponse` → `users`.
    #[default]
    FirstWord,
    /// Snake case of the plural type name: `UserResponse` → `user_responses`.
    SnakeCase,
    /// Plural type name as is: `UserResponse` → `UserResponses`.
    CamelCase,
    /// Always [`PageSerializerConfig::default_content_name`].
    DefaultName,
}

/// Names used by [`PageSerializer`]. Missing fields take their defaults when
/// deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSerializerConfig {
    pub content_alias_mode: ContentAliasMode,
    pub default_content_name: String,

    pub page_block: String,
    pub page_number: String,
    pub page_size: String,
    pub page_total: String,
    pub page_first: String,
    pub page_last: String,

    pub elements_block: String,
    pub elements_total: String,
    pub elements_exposed: String,

    pub sort_block: String,
    pub sort_property: String,
    pub sort_direction: String,
}

impl Default for PageSerializerConfig {
    fn default() -> Self {
        Self {
            content_alias_mode: ContentAliasMode::FirstWord,
            default_content_name: "content".into(),
            page_block: "page".into(),
            page_number: "number".into(),
            page_size: "size".into(),
            page_total: "total".into(),
            page_first: "first".into(),
            page_last: "last".into(),
            elements_block: "elements".into(),
            elements_total: "total".into(),
            elements_exposed: "exposed".into(),
            sort_block: "sort".into(),
            sort_property: "property".into(),
            sort_direction: "direction".into(),
        }
    }
}

macro_rules! name_setters {
    ($($setter:ident => $field:ident),* $(,)?) => {
        $(
            pub fn $setter(mut self, name: impl Into<String>) -> Self {
                self.$field = name.into();
                self
            }
        )*
    };
}

impl PageSerializerConfig {
    pub fn with_content_alias_mode(mut self, mode: ContentAliasMode) -> Self {
        self.content_alias_mode = mode;
        self
    }

    name_setters!(
        with_default_content_name => default_content_name,
        with_page_block => page_block,
        with_page_number => page_number,
        with_page_size => page_size,
        with_page_total => page_total,
        with_page_first => page_first,
        with_page_last => page_last,
        with_elements_block => elements_block,
        with_elements_total => elements_total,
        with_elements_exposed => elements_exposed,
        with_sort_block => sort_block,
        with_sort_property => sort_property,
        with_sort_direction => sort_direction,
    );
}

/// Renders pages to JSON documents.
#[derive(Clone)]
pub struct PageSerializer {
    config: PageSerializerConfig,
    pluralizer: Arc<dyn Pluralizer>,
}

impl PageSerializer {
    pub fn new(config: PageSerializerConfig) -> Self {
        Self {
            config,
            pluralizer: Arc::new(EnglishPluralizer),
        }
    }

    pub fn with_pluralizer(mut self, pluralizer: impl Pluralizer + 'static) -> Self {
        self.pluralizer = Arc::new(pluralizer);
        self
    }

    pub fn config(&self) -> &PageSerializerConfig {
        &self.config
    }

    /// Content key for a page of `R`.
    ///
    /// A declared [`ContentAlias::CONTENT_ALIAS`] always wins over the mode.
    pub fn content_alias<R: ContentAlias>(&self) -> String {
        if let Some(alias) = R::CONTENT_ALIAS {
            return alias.to_string();
        }
        let type_name = R::type_name();
        match self.config.content_alias_mode {
            ContentAliasMode::FirstWord => self.pluralizer.plural(&first_word(type_name)),
            ContentAliasMode::SnakeCase => snake_case(&self.pluralizer.plural(type_name)),
            ContentAliasMode::CamelCase => self.pluralizer.plural(type_name),
            ContentAliasMode::DefaultName => self.config.default_content_name.clone(),
        }
    }

    pub fn to_value<R>(&self, page: &Page<R>) -> CrudResult<JsonValue>
    where
        R: ContentAlias + Serialize,
    {
        let c = &self.config;
        let mut root = Map::new();

        if page.has_content() {
            root.insert(self.content_alias::<R>(), serde_json::to_value(page.content())?);
        }

        let mut block = Map::new();
        block.insert(c.page_number.clone(), json!(page.number()));
        block.insert(c.page_size.clone(), json!(page.size()));
        block.insert(c.page_total.clone(), json!(page.total_pages()));
        block.insert(c.page_first.clone(), json!(page.is_first()));
        block.insert(c.page_last.clone(), json!(page.is_last()));
        root.insert(c.page_block.clone(), JsonValue::Object(block));

        let mut block = Map::new();
        block.insert(c.elements_total.clone(), json!(page.total_elements()));
        block.insert(c.elements_exposed.clone(), json!(page.number_of_elements()));
        root.insert(c.elements_block.clone(), JsonValue::Object(block));

        if page.sort().is_sorted() {
            let orders = page
                .sort()
                .iter()
                .map(|order| {
                    let mut entry = Map::new();
                    entry.insert(c.sort_property.clone(), json!(order.property));
                    entry.insert(c.sort_direction.clone(), json!(order.direction.as_str()));
                    JsonValue::Object(entry)
                })
                .collect();
            root.insert(c.sort_block.clone(), JsonValue::Array(orders));
        }

        Ok(JsonValue::Object(root))
    }

    pub fn to_string<R>(&self, page: &Page<R>) -> CrudResult<String>
    where
        R: ContentAlias + Serialize,
    {
        Ok(serde_json::to_string(&self.to_value(page)?)?)
    }
}

impl Default for PageSerializer {
    fn default() -> Self {
        Self::new(PageSerializerConfig::default())
    }
}

impl std::fmt::Debug for PageSerializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageSerializer").field("config", &self.config).finish_non_exhaustive()
    }
}
