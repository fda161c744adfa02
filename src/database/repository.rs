use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::database::document::{id_of, reference, Document, ID_FIELD};
use crate::database::manager::DatabaseError;
use crate::database::store::SharedStore;
use crate::filter::{Condition, Filter, FilterOp, FindQuery, Populate, QueryParams};
use crate::types::Collection;

/// Page reference attached to an advanced-results listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: u32,
    pub limit: u32,
    pub total_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page: Option<PageInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_page: Option<PageInfo>,
}

impl Pagination {
    /// `nextPage` exists iff `endIndex < total`, `prevPage` iff `startIndex > 0`
    pub fn compute(params: &QueryParams, total_count: u64) -> Self {
        let page = params.page;
        let next_page = (page.end_index() < total_count).then(|| PageInfo {
            page: page.page + 1,
            limit: page.limit,
            total_count,
        });
        let prev_page = (page.start_index() > 0).then(|| PageInfo {
            page: page.page - 1,
            limit: page.limit,
            total_count,
        });
        Self { next_page, prev_page }
    }
}

/// One page of results plus the metadata needed for the response envelope
#[derive(Debug, Clone, PartialEq)]
pub struct AdvancedResults {
    pub count: usize,
    pub total_count: u64,
    pub pagination: Pagination,
    pub data: Vec<Document>,
}

/// Collection-scoped access to a document store
#[derive(Clone)]
pub struct Repository {
    store: SharedStore,
    collection: Collection,
}

impl Repository {
    pub fn new(store: SharedStore, collection: Collection) -> Self {
        Self { store, collection }
    }

    pub async fn select_one(&self, conditions: Vec<Condition>) -> Result<Option<Document>, DatabaseError> {
        let query = FindQuery {
            limit: Some(1),
            ..FindQuery::matching(self.collection, conditions)
        };
        Ok(self.store.find(&query).await?.into_iter().next())
    }

    pub async fn select_404(&self, id: Uuid) -> Result<Document, DatabaseError> {
        self.store
            .find_by_id(self.collection, id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("No {} found with id {}", self.singular(), id)))
    }

    pub async fn count(&self, conditions: &[Condition]) -> Result<u64, DatabaseError> {
        self.store.count(self.collection, conditions).await
    }

    /// Filtered, projected, sorted and paginated listing with optional population
    pub async fn advanced_results(
        &self,
        params: &QueryParams,
        populate: Option<&Populate>,
    ) -> Result<AdvancedResults, DatabaseError> {
        let filter = Filter::from_params(self.collection, params);
        let total_count = self.store.count(self.collection, filter.conditions()).await?;

        let query = filter.to_find_query();
        debug!(
            "{}: {} condition(s), skip {}, limit {:?}, total {}",
            self.collection,
            query.conditions.len(),
            query.skip,
            query.limit,
            total_count
        );

        let mut data = self.store.find(&query).await?;
        if let Some(populate) = populate {
            data = self.populate(data, populate).await?;
        }

        Ok(AdvancedResults {
            count: data.len(),
            total_count,
            pagination: Pagination::compute(params, total_count),
            data,
        })
    }

    /// Attach related documents to each result
    pub async fn populate(&self, mut docs: Vec<Document>, populate: &Populate) -> Result<Vec<Document>, DatabaseError> {
        match populate {
            Populate::Parent { field, collection, select } => {
                let ids: BTreeSet<Uuid> = docs.iter().filter_map(|d| reference(d, field)).collect();
                let parents = self.fetch_by_ids(*collection, &ids, Some(select)).await?;
                for doc in docs.iter_mut() {
                    if let Some(id) = reference(doc, field) {
                        let parent = parents.get(&id).cloned().map(Value::Object).unwrap_or(Value::Null);
                        doc.insert(field.to_string(), parent);
                    }
                }
            }
            Populate::Children { as_field, collection, foreign_field } => {
                let ids: Vec<Value> = docs
                    .iter()
                    .filter_map(id_of)
                    .map(|id| Value::String(id.to_string()))
                    .collect();
                let mut grouped: HashMap<Uuid, Vec<Value>> = HashMap::new();
                if !ids.is_empty() {
                    let query = FindQuery::matching(
                        *collection,
                        vec![Condition::new(*foreign_field, FilterOp::In, Value::Array(ids))],
                    );
                    for child in self.store.find(&query).await? {
                        if let Some(parent_id) = reference(&child, foreign_field) {
                            grouped.entry(parent_id).or_default().push(Value::Object(child));
                        }
                    }
                }
                for doc in docs.iter_mut() {
                    let children = id_of(doc).and_then(|id| grouped.remove(&id)).unwrap_or_default();
                    doc.insert(as_field.to_string(), Value::Array(children));
                }
            }
        }
        Ok(docs)
    }

    async fn fetch_by_ids(
        &self,
        collection: Collection,
        ids: &BTreeSet<Uuid>,
        select: Option<&[&str]>,
    ) -> Result<HashMap<Uuid, Document>, DatabaseError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let values = ids.iter().map(|id| Value::String(id.to_string())).collect();
        let query = FindQuery {
            select: select.map(|fields| fields.iter().map(|f| f.to_string()).collect()),
            ..FindQuery::matching(collection, vec![Condition::new(ID_FIELD, FilterOp::In, Value::Array(values))])
        };
        Ok(self
            .store
            .find(&query)
            .await?
            .into_iter()
            .filter_map(|doc| id_of(&doc).map(|id| (id, doc)))
            .collect())
    }

    fn singular(&self) -> &'static str {
        match self.collection {
            Collection::Bootcamps => "bootcamp",
            Collection::Courses => "course",
            Collection::Reviews => "review",
            Collection::Users => "user",
        }
    }
}
