//! Datastore facade
//!
//! Each public operation opens its own connection, runs inside one
//! start/end logging bracket, and tags any error with the call's request id.
//! `Datastore` is cheap to clone and safe to share between threads.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use relstore_core::errors::{ExError, ExErrorKind};
use relstore_core::model::LifecycleFilter;
use relstore_core::{
    log_op_end, log_op_error, log_op_start, Assertion, AuthorizationModel, IdGenerator, Pagination,
    Store, Tuple, TupleChange, TupleKey, UlidLikeGenerator, WriteOptions,
};
use relstore_core_types::RequestContext;
use rusqlite::Connection;

use crate::classifier::{ErrorClassifier, SqliteErrorClassifier};
use crate::config::StoreConfig;
use crate::dialect::{SqlDialect, SqliteDialect};
use crate::errors::Result;
use crate::read::{
    ChangelogReader, Pager, ReadChangesFilter, ReadChangesOptions, ReadPageOptions,
    ReadStartingWithUserFilter, ReadUsersetTuplesFilter, ScanOrder, TupleFilter, TupleIterator,
    UserPredicate,
};
use crate::stores::ListStoresOptions;
use crate::write::WriteEngine;
use crate::{assertions, db, migrations, models, stores};

/// Result of the readiness probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessStatus {
    pub ready: bool,
    /// Newest applied migration
    pub revision: Option<String>,
}

#[derive(Clone)]
pub struct Datastore {
    config: Arc<StoreConfig>,
    dialect: Arc<dyn SqlDialect>,
    classifier: Arc<dyn ErrorClassifier>,
    ids: Arc<dyn IdGenerator>,
}

impl std::fmt::Debug for Datastore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Datastore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Datastore {
    /// Validate `config`, open the database and bring its schema up to date
    ///
    /// # Errors
    ///
    /// `Config` for invalid settings, `Migration` or `Persistence` if the
    /// database cannot be prepared.
    pub fn open(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let datastore = Self {
            config: Arc::new(config),
            dialect: Arc::new(SqliteDialect),
            classifier: Arc::new(SqliteErrorClassifier),
            ids: Arc::new(UlidLikeGenerator::new()),
        };
        let mut conn = datastore.connect()?;
        migrations::apply_migrations(&mut conn)?;
        tracing::info!(
            database_path = %datastore.config.database_path.display(),
            "datastore opened"
        );
        Ok(datastore)
    }

    /// Replace the id generator (tests use a deterministic one)
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// A fresh monotonic id, for callers that name stores and models
    pub fn generate_id(&self) -> String {
        self.ids.next_id()
    }

    pub fn max_tuples_per_write(&self) -> usize {
        self.config.max_tuples_per_write
    }

    pub fn max_types_per_authorization_model(&self) -> usize {
        self.config.max_types_per_authorization_model
    }

    fn connect(&self) -> Result<Connection> {
        let conn = db::open(&self.config.database_path)?;
        db::configure(&conn, self.config.busy_timeout())?;
        Ok(conn)
    }

    fn instrumented<T>(
        &self,
        op: &'static str,
        store_id: &str,
        f: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        let ctx = if store_id.is_empty() {
            RequestContext::new()
        } else {
            RequestContext::for_store(store_id)
        };
        log_op_start!(op, store_id = store_id, request_id = %ctx.request_id);
        let start = Instant::now();

        let result = f().map_err(|e| {
            let e = e.with_request_id(ctx.request_id.clone());
            match &ctx.store_id {
                Some(id) if e.store_id().is_none() => e.with_store_id(id.clone()),
                _ => e,
            }
        });

        let elapsed = start.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => log_op_end!(op, duration_ms = elapsed, store_id = store_id),
            Err(e) => log_op_error!(op, e.clone(), duration_ms = elapsed, store_id = store_id),
        }
        result
    }

    fn pager(&self) -> Pager<'_> {
        Pager {
            dialect: self.dialect.as_ref(),
            classifier: self.classifier.as_ref(),
        }
    }

    fn scan(
        &self,
        store: &str,
        filter: &TupleFilter,
        order: ScanOrder,
        pagination: &Pagination,
        op: &str,
    ) -> Result<(Vec<Tuple>, Option<String>)> {
        let conn = self.connect()?;
        self.pager()
            .page(&conn, store, filter, order, pagination, op)
    }

    fn iterate(
        &self,
        store: &str,
        filter: TupleFilter,
        order: ScanOrder,
        op: &'static str,
    ) -> TupleIterator {
        let page_size = match order {
            ScanOrder::Ulid => self.config.batch_size,
            ScanOrder::ObjectId => 0,
        };
        let datastore = self.clone();
        let store = store.to_string();
        TupleIterator::new(
            page_size,
            Box::new(move |pagination: &Pagination| {
                datastore.scan(&store, &filter, order, pagination, op)
            }),
        )
    }

    // ── Tuples ───────────────────────────────────────────────────────────────

    /// All tuples matching `key`, where empty fields match anything
    ///
    /// The object may be `type:id` or `type:` for every object of a type.
    pub fn read(&self, store: &str, key: &TupleKey) -> Result<TupleIterator> {
        self.instrumented("read", store, || {
            Ok(self.iterate(store, filter_from_key(key), ScanOrder::Ulid, "read"))
        })
    }

    /// One page of tuples matching `key`
    ///
    /// # Errors
    ///
    /// `InvalidContinuationToken` for a token this store did not issue.
    pub fn read_page(
        &self,
        store: &str,
        key: &TupleKey,
        options: ReadPageOptions,
    ) -> Result<(Vec<Tuple>, Option<String>)> {
        self.instrumented("read_page", store, || {
            self.scan(
                store,
                &filter_from_key(key),
                ScanOrder::Ulid,
                &options.pagination,
                "read_page",
            )
        })
    }

    /// The tuple with exactly this object, relation and user
    ///
    /// # Errors
    ///
    /// `NotFound` if it does not exist.
    pub fn read_user_tuple(&self, store: &str, key: &TupleKey) -> Result<Tuple> {
        self.instrumented("read_user_tuple", store, || {
            let filter = TupleFilter {
                object: key.object.clone(),
                relation: Some(key.relation.clone()),
                user: UserPredicate::Exact(key.user.clone()),
                object_ids: None,
            };
            let (rows, _) = self.scan(
                store,
                &filter,
                ScanOrder::Ulid,
                &Pagination::new(1),
                "read_user_tuple",
            )?;
            rows.into_iter().next().ok_or_else(|| {
                ExError::new(ExErrorKind::NotFound)
                    .with_op("read_user_tuple")
                    .with_tuple_key(key.to_string())
                    .with_message("tuple not found")
            })
        })
    }

    /// Tuples on `filter.object` and relation whose user is a userset (or typed wildcard)
    pub fn read_userset_tuples(
        &self,
        store: &str,
        filter: ReadUsersetTuplesFilter,
    ) -> Result<TupleIterator> {
        self.instrumented("read_userset_tuples", store, || {
            let filter = TupleFilter {
                object: filter.object,
                relation: Some(filter.relation),
                user: UserPredicate::Usersets(filter.allowed_user_type_restrictions),
                object_ids: None,
            };
            Ok(self.iterate(store, filter, ScanOrder::Ulid, "read_userset_tuples"))
        })
    }

    /// Tuples whose user is one of `filter.user_filter`, ordered by object id
    pub fn read_starting_with_user(
        &self,
        store: &str,
        filter: ReadStartingWithUserFilter,
    ) -> Result<TupleIterator> {
        self.instrumented("read_starting_with_user", store, || {
            let users = filter.user_filter.iter().map(|u| u.as_user()).collect();
            let filter = TupleFilter {
                object: filter.object_type,
                relation: Some(filter.relation),
                user: UserPredicate::AnyOf(users),
                object_ids: filter.object_ids,
            };
            Ok(self.iterate(store, filter, ScanOrder::ObjectId, "read_starting_with_user"))
        })
    }

    /// Delete and write tuples atomically
    ///
    /// See [`WriteEngine::write`] for the error contract.
    pub fn write(
        &self,
        store: &str,
        deletes: &[TupleKey],
        writes: &[TupleKey],
        options: WriteOptions,
    ) -> Result<()> {
        self.instrumented("write", store, || {
            let mut conn = self.connect()?;
            let engine = WriteEngine {
                dialect: self.dialect.as_ref(),
                classifier: self.classifier.as_ref(),
                ids: self.ids.as_ref(),
                batch_size: self.config.batch_size,
                max_tuples_per_write: self.config.max_tuples_per_write,
                busy_timeout: self.config.busy_timeout(),
            };
            engine
                .write(&mut conn, store, deletes, writes, &options)
                .map(|_| ())
        })
    }

    // ── Changelog ────────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// `NotFound` when no change is older than the horizon.
    pub fn read_changes(
        &self,
        store: &str,
        filter: ReadChangesFilter,
        options: ReadChangesOptions,
    ) -> Result<(Vec<TupleChange>, Option<String>)> {
        self.instrumented("read_changes", store, || {
            let conn = self.connect()?;
            let reader = ChangelogReader {
                dialect: self.dialect.as_ref(),
                classifier: self.classifier.as_ref(),
                default_horizon_offset: self.config.changelog_horizon_offset(),
            };
            reader.read(&conn, store, &filter, &options)
        })
    }

    // ── Stores ───────────────────────────────────────────────────────────────

    pub fn create_store(&self, id: &str, name: &str) -> Result<Store> {
        self.instrumented("create_store", id, || {
            let conn = self.connect()?;
            stores::insert_store(&conn, self.classifier.as_ref(), id, name, Utc::now())
        })
    }

    /// # Errors
    ///
    /// `NotFound` for unknown and deleted stores.
    pub fn get_store(&self, id: &str) -> Result<Store> {
        self.instrumented("get_store", id, || {
            let conn = self.connect()?;
            stores::get_store(&conn, self.classifier.as_ref(), id, LifecycleFilter::ActiveOnly)
        })
    }

    pub fn list_stores(&self, options: ListStoresOptions) -> Result<(Vec<Store>, Option<String>)> {
        self.instrumented("list_stores", "", || {
            let conn = self.connect()?;
            stores::list_stores(
                &conn,
                self.classifier.as_ref(),
                self.dialect.as_ref(),
                &options,
                LifecycleFilter::ActiveOnly,
            )
        })
    }

    /// Soft delete; the store's rows are kept
    pub fn delete_store(&self, id: &str) -> Result<()> {
        self.instrumented("delete_store", id, || {
            let conn = self.connect()?;
            stores::soft_delete_store(&conn, self.classifier.as_ref(), id, Utc::now())
        })
    }

    // ── Authorization models ─────────────────────────────────────────────────

    pub fn write_authorization_model(&self, store: &str, model: &AuthorizationModel) -> Result<()> {
        self.instrumented("write_authorization_model", store, || {
            let conn = self.connect()?;
            models::insert_model(
                &conn,
                self.classifier.as_ref(),
                store,
                model,
                self.config.max_types_per_authorization_model,
            )
        })
    }

    pub fn read_authorization_model(&self, store: &str, id: &str) -> Result<AuthorizationModel> {
        self.instrumented("read_authorization_model", store, || {
            let conn = self.connect()?;
            models::get_model(&conn, self.classifier.as_ref(), store, id)
        })
    }

    /// Newest first
    pub fn read_authorization_models(
        &self,
        store: &str,
        pagination: Pagination,
    ) -> Result<(Vec<AuthorizationModel>, Option<String>)> {
        self.instrumented("read_authorization_models", store, || {
            let conn = self.connect()?;
            models::list_models(
                &conn,
                self.classifier.as_ref(),
                self.dialect.as_ref(),
                store,
                &pagination,
            )
        })
    }

    pub fn find_latest_authorization_model(&self, store: &str) -> Result<AuthorizationModel> {
        self.instrumented("find_latest_authorization_model", store, || {
            let conn = self.connect()?;
            models::latest_model(&conn, self.classifier.as_ref(), store)
        })
    }

    // ── Assertions ───────────────────────────────────────────────────────────

    pub fn write_assertions(
        &self,
        store: &str,
        model_id: &str,
        assertions: &[Assertion],
    ) -> Result<()> {
        self.instrumented("write_assertions", store, || {
            let conn = self.connect()?;
            assertions::upsert_assertions(&conn, self.classifier.as_ref(), store, model_id, assertions)
        })
    }

    pub fn read_assertions(&self, store: &str, model_id: &str) -> Result<Vec<Assertion>> {
        self.instrumented("read_assertions", store, || {
            let conn = self.connect()?;
            assertions::read_assertions(&conn, self.classifier.as_ref(), store, model_id)
        })
    }

    // ── Health ───────────────────────────────────────────────────────────────

    /// Ready once the database opens and the schema has been migrated
    pub fn is_ready(&self) -> Result<ReadinessStatus> {
        self.instrumented("is_ready", "", || {
            let conn = self.connect()?;
            let revision = migrations::applied_revision(&conn)?;
            Ok(ReadinessStatus {
                ready: revision.is_some(),
                revision,
            })
        })
    }
}

fn filter_from_key(key: &TupleKey) -> TupleFilter {
    TupleFilter {
        object: key.object.clone(),
        relation: Some(key.relation.clone()).filter(|r| !r.is_empty()),
        user: if key.user.is_empty() {
            UserPredicate::Any
        } else {
            UserPredicate::Exact(key.user.clone())
        },
        object_ids: None,
    }
}
