use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::sync::Arc;

use serde_json::Value;

use crate::backend::PersistenceBackend;
use crate::config::EngineContext;
use crate::errors::{RevisionError, RevisionResult};
use crate::observability::Event;
use crate::outcome::Outcome;
use crate::record::Revisionable;
use crate::revision::{
    RecordId, RevisionAuthority, RevisionData, RevisionNumber, LABEL_KEY, SETTINGS_PART,
};
use crate::state::RevisionStatus;
use crate::storage::{DbRevisionStorage, RevisionStorage, StubRevisionStorage};

use super::SettingHandlers;

/// Author recorded on stub data
const STUB_AUTHOR: &str = "system";

/// Owner of loaded records and allocator of new ones.
#[derive(Debug)]
pub struct RevisionableCollection {
    context: Rc<EngineContext>,
    authority: Rc<RevisionAuthority>,
    settings: SettingHandlers,
    records: HashMap<RecordId, Revisionable>,
}

impl RevisionableCollection {
    /// Create a collection over `backend` with the default setting handlers.
    ///
    /// Logs the configuration through the context's final logger.
    pub fn new(context: Rc<EngineContext>, backend: Arc<dyn PersistenceBackend>) -> Self {
        let parts = context.schema().len().to_string();
        let simulation = context.simulation().to_string();
        context.logger().info(
            Event::ConfigLoaded,
            &[("parts", parts.as_str()), ("simulation", simulation.as_str())],
        );

        Self {
            context,
            authority: Rc::new(RevisionAuthority::new(backend)),
            settings: SettingHandlers::default(),
            records: HashMap::new(),
        }
    }

    /// Replace the setting handler table
    pub fn with_setting_handlers(mut self, settings: SettingHandlers) -> Self {
        self.settings = settings;
        self
    }

    pub fn context(&self) -> &EngineContext {
        &self.context
    }

    pub fn setting_handlers(&self) -> &SettingHandlers {
        &self.settings
    }

    /// Create and persist a record with its first revision in Draft.
    ///
    /// Settings are validated before any id or number is allocated.
    pub fn create_new_record(
        &mut self,
        label: &str,
        author: &str,
        settings: &BTreeMap<String, Value>,
    ) -> RevisionResult<&mut Revisionable> {
        self.context.schema().kind_of(SETTINGS_PART)?;
        let mut data = RevisionData::new(RevisionStatus::Draft, author);
        data.set_key(SETTINGS_PART, LABEL_KEY, Value::from(label));
        self.settings.apply_all(&self.context, &mut data, settings)?;

        let id = self.authority.allocate_record_id()?;
        let revision = self.authority.allocate(id)?;
        self.authority.backend().write_revision(id, revision, &data)?;

        let storage = DbRevisionStorage::open(id, Rc::clone(&self.authority), revision);
        let record = Revisionable::persisted(
            Rc::clone(&self.context),
            Rc::clone(&self.authority),
            storage,
        );

        let id_str = id.to_string();
        let rev = revision.to_string();
        self.context.logger().info(
            Event::RecordCreated,
            &[
                ("author", author),
                ("record_id", id_str.as_str()),
                ("revision", rev.as_str()),
            ],
        );

        self.records.insert(id, record);
        self.records
            .get_mut(&id)
            .ok_or(RevisionError::UnknownRecord(id))
    }

    /// Loaded instance of `id`, loading it at its latest revision if it is
    /// not held or was disposed.
    ///
    /// `UnknownRecord` if no persisted revision exists.
    pub fn get_by_id(&mut self, id: RecordId) -> RevisionResult<&mut Revisionable> {
        let needs_load = self
            .records
            .get(&id)
            .map(Revisionable::is_disposed)
            .unwrap_or(true);

        if needs_load {
            let storage = DbRevisionStorage::open_latest(id, Rc::clone(&self.authority))?;
            let revision = storage.get_revision()?;
            let record = Revisionable::persisted(
                Rc::clone(&self.context),
                Rc::clone(&self.authority),
                storage,
            );

            let id_str = id.to_string();
            let rev = revision.to_string();
            self.context.logger().trace(
                Event::RecordLoaded,
                &[("record_id", id_str.as_str()), ("revision", rev.as_str())],
            );
            self.records.insert(id, record);
        }

        self.records
            .get_mut(&id)
            .ok_or(RevisionError::UnknownRecord(id))
    }

    /// Like [`get_by_id`](Self::get_by_id), with an unknown id turned into a
    /// redirect to `target`
    pub fn fetch_or_redirect(&mut self, id: RecordId, target: &str) -> Outcome<&mut Revisionable> {
        match self.get_by_id(id) {
            Ok(record) => Outcome::Continue(record),
            Err(RevisionError::UnknownRecord(_)) => Outcome::Redirect(target.to_string()),
            Err(err) => Outcome::Error(err.kind()),
        }
    }

    /// True if a persisted revision of `id` exists
    pub fn id_exists(&self, id: RecordId) -> RevisionResult<bool> {
        self.authority.backend().record_exists(id)
    }

    /// True if any record has a persisted revision numbered `revision`
    pub fn revision_exists(&self, revision: RevisionNumber) -> RevisionResult<bool> {
        self.authority.backend().revision_exists(revision)
    }

    /// Latest persisted revision of `id`; None for unknown and stub ids
    pub fn get_current_revision(&self, id: RecordId) -> RevisionResult<Option<RevisionNumber>> {
        self.authority.backend().fetch_current_revision(id)
    }

    /// Transient stub record. Not held by the collection.
    pub fn create_dummy_record(&self) -> Revisionable {
        let data = RevisionData::new(RevisionStatus::Draft, STUB_AUTHOR);
        let record = Revisionable::stub(Rc::clone(&self.context), StubRevisionStorage::new(data));
        self.context.logger().trace(Event::StubCreated, &[]);
        record
    }

    /// True if a live instance of `id` is held
    pub fn is_loaded(&self, id: RecordId) -> bool {
        self.records
            .get(&id)
            .map(|record| !record.is_disposed())
            .unwrap_or(false)
    }

    /// Ids of live held instances, ascending
    pub fn loaded_ids(&self) -> Vec<RecordId> {
        let mut ids: Vec<RecordId> = self
            .records
            .iter()
            .filter(|(_, record)| !record.is_disposed())
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    /// Dispose and drop the held instance of `id`.
    ///
    /// `UnknownRecord` if no instance is held. A dependency failure is
    /// returned after the instance is disposed and dropped.
    pub fn dispose_record(&mut self, id: RecordId) -> RevisionResult<()> {
        let mut record = self
            .records
            .remove(&id)
            .ok_or(RevisionError::UnknownRecord(id))?;
        if record.is_disposed() {
            return Ok(());
        }
        record.dispose()
    }

    /// Dispose every held instance and forget them. Returns how many live
    /// instances were disposed.
    ///
    /// Every instance is disposed and the collection emptied even if some
    /// disposals fail; the first failure is then returned.
    pub fn reset_collection(&mut self) -> RevisionResult<usize> {
        let mut disposed = 0;
        let mut first_error = None;
        for (_, mut record) in self.records.drain() {
            if record.is_disposed() {
                continue;
            }
            disposed += 1;
            if let Err(err) = record.dispose() {
                first_error.get_or_insert(err);
            }
        }

        let count = disposed.to_string();
        self.context
            .logger()
            .info(Event::CollectionReset, &[("disposed", count.as_str())]);
        match first_error {
            Some(err) => Err(err),
            None => Ok(disposed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::observability::Logger;
    use crate::revision::STUB_REVISION;
    use serde_json::json;

    fn collection() -> RevisionableCollection {
        let context = EngineContext::with_defaults()
            .unwrap()
            .with_logger(Logger::disabled());
        RevisionableCollection::new(Rc::new(context), Arc::new(MemoryBackend::new()))
    }

    #[test]
    fn test_create_new_record() {
        let mut collection = collection();
        let record = collection
            .create_new_record("FooBar", "tester", &BTreeMap::new())
            .unwrap();

        let id = record.id();
        assert_eq!(record.status().unwrap(), RevisionStatus::Draft);
        assert_eq!(record.label().unwrap().as_deref(), Some("FooBar"));
        let revision = record.revision().unwrap();

        assert!(collection.id_exists(id).unwrap());
        assert!(collection.revision_exists(revision).unwrap());
        assert_eq!(collection.get_current_revision(id).unwrap(), Some(revision));
        assert!(collection.is_loaded(id));
    }

    #[test]
    fn test_unknown_setting_allocates_nothing() {
        let mut collection = collection();
        let settings: BTreeMap<String, Value> =
            [("colour".to_string(), json!("red"))].into_iter().collect();

        let result = collection.create_new_record("X", "tester", &settings);
        assert!(matches!(result, Err(RevisionError::UnknownSetting(_))));
        assert!(collection.loaded_ids().is_empty());
        assert!(!collection.id_exists(RecordId::new(1)).unwrap());
    }

    #[test]
    fn test_stub_has_no_current_revision() {
        let collection = collection();
        let stub = collection.create_dummy_record();

        assert!(stub.is_stub());
        assert_eq!(stub.revision().unwrap(), STUB_REVISION);
        assert_eq!(collection.get_current_revision(stub.id()).unwrap(), None);
        assert!(!collection.is_loaded(stub.id()));
    }

    #[test]
    fn test_get_by_id_unknown() {
        let mut collection = collection();
        assert!(matches!(
            collection.get_by_id(RecordId::new(99)),
            Err(RevisionError::UnknownRecord(_))
        ));
    }
}
