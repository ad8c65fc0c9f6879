use crate::client::{
    CachingSessionProvider, HttpOrgClient, OrgClient, Session, SessionProvider, StaticSessionProvider,
};
use crate::models::{EntityInfo, FieldMetadata, SelectionSet, filter_entities, find_entity, sort_entities};
use crate::processor::{BatchOrchestrator, MetadataCache, RunOutcome, build_details};
use crate::render::{ChartGeometry, RenderedReport, ReportView, SortKey, SortState, ViewState};
use crate::report::{Report, ReportAggregator};
use crate::storage::{InMemoryReportStore, ReportStore};
use common::config::{ProfilerConfig, Settings};
use common::{Error, Result};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::OnceCell;
use tracing::{error, info};

pub const DEFAULT_CONTEXT: &str = "default";
pub const NO_SELECTION: &str = "Select at least one SObject before processing.";
pub const NO_FIELDS: &str = "No fields available to process.";
pub const REPORT_NOT_OPEN: &str = "Report is not open.";

/// Builds the remote client for a freshly acquired session.
pub type ClientFactory = Arc<dyn Fn(&Session) -> Result<Arc<dyn OrgClient>> + Send + Sync>;

/// Clears the run flag when the run ends, however it ends.
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::RunInProgress)?;
        Ok(Self(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// State bound to one org session: entity list, describe cache and the
/// single active run.
pub struct ProfilerSession {
    client: Arc<dyn OrgClient>,
    metadata: MetadataCache,
    orchestrator: BatchOrchestrator,
    entities: OnceCell<Arc<Vec<EntityInfo>>>,
    running: AtomicBool,
    batch_size: usize,
}

impl ProfilerSession {
    pub fn new(client: Arc<dyn OrgClient>, api_version: &str, batch_size: usize) -> Self {
        Self {
            metadata: MetadataCache::new(Arc::clone(&client)),
            orchestrator: BatchOrchestrator::new(Arc::clone(&client), api_version),
            client,
            entities: OnceCell::new(),
            running: AtomicBool::new(false),
            batch_size,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Queryable entities sorted by label, listed once per session.
    pub async fn entities(&self) -> Result<Arc<Vec<EntityInfo>>> {
        let entities = self
            .entities
            .get_or_try_init(|| async {
                let mut entities = self.client.list_entities().await?;
                sort_entities(&mut entities);
                info!(entities = entities.len(), "Loaded entities");
                Ok::<_, Error>(Arc::new(entities))
            })
            .await?;
        Ok(Arc::clone(entities))
    }

    pub async fn search(&self, filter: &str) -> Result<Vec<EntityInfo>> {
        let entities = self.entities().await?;
        Ok(filter_entities(&entities, filter).into_iter().cloned().collect())
    }

    pub async fn fields(&self, entity: &str) -> Result<Arc<Vec<FieldMetadata>>> {
        self.metadata.describe(entity).await
    }

    /// Runs the query-plan profile of `selection`. With nothing selected, an
    /// entity whose name or label equals `filter_text` is profiled instead.
    pub async fn process<F>(
        &self,
        selection: &SelectionSet,
        filter_text: &str,
        on_progress: F,
    ) -> Result<RunOutcome>
    where
        F: FnMut(usize, usize) + Send,
    {
        let _guard = RunGuard::acquire(&self.running)?;
        let entities = self.entities().await?;

        let targets: Vec<String> = if selection.is_empty() {
            find_entity(&entities, filter_text)
                .map(|entity| vec![entity.name.clone()])
                .unwrap_or_default()
        } else {
            selection.entities().to_vec()
        };
        if targets.is_empty() {
            return Err(Error::Precondition(NO_SELECTION.to_string()));
        }

        self.metadata.ensure_loaded(&targets).await.map_err(|e| {
            error!(error = %e, "Describe failed");
            Error::Precondition(format!("Unable to load fields: {}", e.user_message()))
        })?;

        let pairs = selection.pairs(&targets, |entity| self.metadata.field_names(entity));
        if pairs.is_empty() {
            return Err(Error::Precondition(NO_FIELDS.to_string()));
        }

        let label_of = |name: &str| {
            entities
                .iter()
                .find(|e| e.name == name)
                .map(EntityInfo::display_key)
                .unwrap_or_else(|| name.to_string())
        };
        let details = build_details(&pairs, &self.metadata, label_of);
        info!(entities = targets.len(), fields = details.len(), "Processing selections");

        self.orchestrator.run(&details, self.batch_size, on_progress).await
    }
}

/// Entry point shared by the CLI and the HTTP API.
pub struct ProfilerService {
    sessions: Arc<dyn SessionProvider>,
    clients: ClientFactory,
    store: Arc<dyn ReportStore>,
    config: ProfilerConfig,
    api_version: String,
    active: DashMap<String, Arc<ProfilerSession>>,
    /// Opened reports. The store hands a report out once; its view lives here
    /// until closed.
    views: DashMap<String, ReportView>,
}

impl ProfilerService {
    pub fn new(settings: &Settings) -> Self {
        let api_version = settings.org.api_version.clone();
        let factory_version = api_version.clone();
        let clients: ClientFactory = Arc::new(move |session: &Session| -> Result<Arc<dyn OrgClient>> {
            let client = HttpOrgClient::new(session, &factory_version)?;
            Ok(Arc::new(client))
        });
        Self::with_parts(
            Arc::new(CachingSessionProvider::new(StaticSessionProvider::new(&settings.org))),
            clients,
            Arc::new(InMemoryReportStore::new()),
            settings.profiler.clone(),
            &api_version,
        )
    }

    pub fn with_parts(
        sessions: Arc<dyn SessionProvider>,
        clients: ClientFactory,
        store: Arc<dyn ReportStore>,
        config: ProfilerConfig,
        api_version: &str,
    ) -> Self {
        Self {
            sessions,
            clients,
            store,
            config,
            api_version: api_version.to_string(),
            active: DashMap::new(),
            views: DashMap::new(),
        }
    }

    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    /// Session state for `context`, created on first use.
    pub async fn session(&self, context: &str) -> Result<Arc<ProfilerSession>> {
        let session = self.sessions.session(context).await.map_err(|e| match e {
            Error::Precondition(_) => e,
            other => Error::Precondition(format!("Unable to read Salesforce session: {}", other)),
        })?;

        if let Some(existing) = self.active.get(&session.domain) {
            return Ok(Arc::clone(existing.value()));
        }
        let client = (self.clients)(&session)?;
        let profiler = Arc::new(ProfilerSession::new(
            client,
            &self.api_version,
            self.config.batch_size,
        ));
        info!(domain = %session.domain, "Connected to org");
        Ok(Arc::clone(
            self.active.entry(session.domain.clone()).or_insert(profiler).value(),
        ))
    }

    pub async fn list_entities(&self, context: &str, filter: &str) -> Result<Vec<EntityInfo>> {
        self.session(context).await?.search(filter).await
    }

    /// Profiles `selection` and returns the report without storing it.
    pub async fn run(&self, context: &str, selection: &SelectionSet, filter_text: &str) -> Result<Report> {
        let session = self.session(context).await?;
        let outcome = session
            .process(selection, filter_text, |completed, total| {
                info!("Query plans: {}/{} completed.", completed, total);
            })
            .await?;
        ReportAggregator::from_outcome(outcome)
    }

    /// Profiles `selection` and stores the report; returns its id.
    pub async fn profile(&self, context: &str, selection: &SelectionSet, filter_text: &str) -> Result<String> {
        let report = self.run(context, selection, filter_text).await?;
        info!(report_id = report.id(), results = report.results().len(), "Report stored");
        self.store.store(report).await
    }

    /// Stores an externally produced (typically distribution) payload.
    pub async fn submit(&self, payload: Value) -> Result<String> {
        let report = ReportAggregator::from_payload(payload)?;
        self.store.store(report).await
    }

    /// Opens a report and renders it with `sort`. The first open consumes
    /// the stored report; later opens re-render the kept view.
    pub async fn open_report(&self, report_id: &str, sort: SortState) -> Result<RenderedReport> {
        let report_id = report_id.trim();
        if let Some(mut view) = self.views.get_mut(report_id) {
            view.set_sort(sort);
            return view.render().cloned();
        }

        let mut view = ReportView::new(
            self.config.chart_page_size,
            ChartGeometry::from_config(&self.config),
        );
        view.begin(Some(report_id))?;
        if let ViewState::Failed(message) = view.state() {
            return Err(Error::InvalidInput(message.clone()));
        }

        let report = match self.store.fetch(report_id).await {
            Ok(report) => Some(report),
            Err(Error::NotFound(_)) => None,
            Err(e) => return Err(e),
        };
        view.receive(report)?;
        if let ViewState::Failed(message) = view.state() {
            return Err(Error::NotFound(message.clone()));
        }

        view.set_sort(sort);
        let rendered = view.render().cloned()?;
        self.views.insert(report_id.to_string(), view);
        Ok(rendered)
    }

    /// Header click on an open report: the active key flips direction, a new
    /// key sorts ascending.
    pub fn sort_report(&self, report_id: &str, key: SortKey) -> Result<RenderedReport> {
        let mut view = self
            .views
            .get_mut(report_id.trim())
            .ok_or_else(|| Error::NotFound(REPORT_NOT_OPEN.to_string()))?;
        view.sort_by(key).cloned()
    }

    /// Drops an open report. Returns false when it was not open.
    pub fn close_report(&self, report_id: &str) -> bool {
        self.views.remove(report_id.trim()).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{SubRequest, SubResponse};
    use crate::models::FieldRef;
    use crate::render::{SortDirection, SortKey};
    use crate::report::ReportMode;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    /// Two entities; `Contact` fails to describe. Optionally blocks the first
    /// composite call until released.
    #[derive(Default)]
    struct FakeOrg {
        composite_calls: Mutex<Vec<usize>>,
        gate: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl OrgClient for FakeOrg {
        async fn list_entities(&self) -> Result<Vec<EntityInfo>> {
            Ok(vec![
                EntityInfo::new("Lead", Some("Lead")),
                EntityInfo::new("Account", Some("Account")),
                EntityInfo::new("Contact", Some("Contact")),
            ])
        }

        async fn describe(&self, entity: &str) -> Result<Vec<FieldMetadata>> {
            match entity {
                "Account" => Ok(vec![
                    FieldMetadata::new("Name", Some("Account Name"), Some("string")),
                    FieldMetadata::new("Description", Some("Description"), Some("textarea")),
                    FieldMetadata::new("Industry", Some("Industry"), Some("picklist")),
                ]),
                "Lead" => Ok(vec![FieldMetadata::new("Company", Some("Company"), Some("string"))]),
                "Contact" => Err(Error::Api {
                    status: 403,
                    body: "insufficient access".into(),
                }),
                _ => Ok(Vec::new()),
            }
        }

        async fn composite(&self, requests: &[SubRequest]) -> Result<Vec<SubResponse>> {
            self.composite_calls.lock().unwrap().push(requests.len());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            Ok(requests
                .iter()
                .map(|_| SubResponse {
                    body: json!({ "plans": [{ "cardinality": 3, "sobjectCardinality": 4 }] }),
                    http_status_code: 200,
                    reference_id: None,
                })
                .collect())
        }
    }

    fn service(org: Arc<FakeOrg>) -> ProfilerService {
        let settings: Settings = serde_json::from_value(json!({
            "org": { "domain": ".acme.my.salesforce.com", "token": "00Dxx" }
        }))
        .unwrap();
        let clients: ClientFactory = Arc::new(move |_session: &Session| -> Result<Arc<dyn OrgClient>> { Ok(org.clone()) });
        ProfilerService::with_parts(
            Arc::new(StaticSessionProvider::new(&settings.org)),
            clients,
            Arc::new(InMemoryReportStore::new()),
            settings.profiler.clone(),
            &settings.org.api_version,
        )
    }

    #[tokio::test]
    async fn test_entity_without_fields_expands_to_all_fields() {
        let org = Arc::new(FakeOrg::default());
        let service = service(org.clone());
        let mut selection = SelectionSet::new();
        selection.add_entity("Account");

        let report = service.run(DEFAULT_CONTEXT, &selection, "").await.unwrap();
        let crate::report::ReportResults::Summary(entries) = report.results() else {
            panic!("expected a summary report");
        };
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].status.to_string(), "Skipped: textarea/address fields cannot be used as filter criteria.");
        assert_eq!(entries[1].entity_label, "Account (Account)");
        assert_eq!(entries[1].non_null_percentage, Some(0.75));
        assert_eq!(*org.composite_calls.lock().unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn test_filter_text_is_used_without_selection() {
        let service = service(Arc::new(FakeOrg::default()));
        let report = service.run(DEFAULT_CONTEXT, &SelectionSet::new(), "lead").await.unwrap();
        assert_eq!(report.results().len(), 1);

        let err = service.run(DEFAULT_CONTEXT, &SelectionSet::new(), "Lea").await.unwrap_err();
        assert_eq!(err.to_string(), NO_SELECTION);
    }

    #[tokio::test]
    async fn test_describe_failure_is_a_precondition() {
        let org = Arc::new(FakeOrg::default());
        let service = service(org.clone());
        let mut selection = SelectionSet::new();
        selection.add_field(&FieldRef::new("Contact", "Email"));

        let err = service.run(DEFAULT_CONTEXT, &selection, "").await.unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
        assert_eq!(
            err.to_string(),
            "Unable to load fields: Salesforce API error (403): insufficient access"
        );
        assert!(org.composite_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_session_is_a_precondition() {
        let settings: Settings = serde_json::from_value(json!({
            "org": { "domain": " ", "token": "00Dxx" }
        }))
        .unwrap();
        let service = ProfilerService::new(&settings);
        let err = service.list_entities(DEFAULT_CONTEXT, "").await.unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
    }

    #[tokio::test]
    async fn test_second_run_is_rejected_while_active() {
        let gate = Arc::new(Notify::new());
        let org = Arc::new(FakeOrg {
            gate: Some(gate.clone()),
            ..Default::default()
        });
        let service = Arc::new(service(org));
        let mut selection = SelectionSet::new();
        selection.add_field(&FieldRef::new("Lead", "Company"));

        let session = service.session(DEFAULT_CONTEXT).await.unwrap();
        let first = {
            let session = session.clone();
            let selection = selection.clone();
            tokio::spawn(async move { session.process(&selection, "", |_, _| {}).await })
        };
        while !session.is_running() {
            tokio::task::yield_now().await;
        }

        let second = session.process(&selection, "", |_, _| {}).await;
        assert!(matches!(second, Err(Error::RunInProgress)));

        gate.notify_one();
        let outcome = first.await.unwrap().unwrap();
        assert_eq!(outcome.entries.len(), 1);
        assert!(!session.is_running());
    }

    #[tokio::test]
    async fn test_stored_report_is_consumed_on_first_open() {
        let service = service(Arc::new(FakeOrg::default()));
        let mut selection = SelectionSet::new();
        selection.add_entity("Account");
        selection.add_entity("Lead");
        let id = service.profile(DEFAULT_CONTEXT, &selection, "").await.unwrap();

        let sort = SortState::new(SortKey::Field, SortDirection::Desc);
        let rendered = service.open_report(&id, sort).await.unwrap();
        assert_eq!(rendered.mode, ReportMode::Summary);
        assert_eq!(rendered.sort_direction, SortDirection::Desc);
        let fields: Vec<_> = rendered.rows.iter().map(|r| r.field.as_str()).collect();
        assert_eq!(fields, vec!["Industry", "Description", "Company", "Account Name"]);

        // The view is kept; the store no longer holds the report.
        let again = service.open_report(&id, SortState::default()).await.unwrap();
        assert_eq!(again.sort_key, None);
        assert!(service.close_report(&id));
        let err = service.open_report(&id, SortState::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "Not found: No data available for this report.");
    }

    #[tokio::test]
    async fn test_header_clicks_toggle_sort_on_open_report() {
        let service = service(Arc::new(FakeOrg::default()));
        let id = service
            .submit(json!([
                { "entityLabel": "Account (Account)", "fieldLabel": "b", "nonNullPercentage": 0.2, "status": "Success" },
                { "entityLabel": "Account (Account)", "fieldLabel": "n", "status": "Skipped: field metadata unavailable." },
                { "entityLabel": "Account (Account)", "fieldLabel": "a", "nonNullPercentage": 0.5, "status": "Success" }
            ]))
            .await
            .unwrap();
        service.open_report(&id, SortState::default()).await.unwrap();

        let fields = |r: &RenderedReport| r.rows.iter().map(|row| row.field.clone()).collect::<Vec<_>>();
        let first = service.sort_report(&id, SortKey::NonNullPercentage).unwrap();
        assert_eq!(first.sort_direction, SortDirection::Asc);
        assert_eq!(fields(&first), vec!["b", "a", "n"]);

        let second = service.sort_report(&id, SortKey::NonNullPercentage).unwrap();
        assert_eq!(second.sort_direction, SortDirection::Desc);
        assert_eq!(fields(&second), vec!["a", "b", "n"]);

        let other = service.sort_report(&id, SortKey::Field).unwrap();
        assert_eq!(other.sort_direction, SortDirection::Asc);
        assert_eq!(fields(&other), vec!["a", "b", "n"]);

        let err = service.sort_report("report-0-missing", SortKey::Field).unwrap_err();
        assert_eq!(err.to_string(), "Not found: Report is not open.");
    }

    #[tokio::test]
    async fn test_submitted_distribution_payload() {
        let service = service(Arc::new(FakeOrg::default()));
        let id = service
            .submit(json!({
                "generatedAt": 1_700_000_000_000i64,
                "results": [{
                    "entityLabel": "Lead (Lead)",
                    "fieldLabel": "Source",
                    "recordCount": 2,
                    "status": "Success",
                    "rows": [{ "value": "Web", "count": 2, "percentage": 1.0 }],
                    "timeline": [{ "year": 2024, "month": 5, "value": "Web", "count": 2, "percentage": 1.0 }]
                }]
            }))
            .await
            .unwrap();
        let rendered = service.open_report(&id, SortState::default()).await.unwrap();
        assert_eq!(rendered.mode, ReportMode::Distribution);
        assert_eq!(rendered.charts.len(), 1);

        let err = service.open_report("", SortState::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: Missing report identifier.");
    }
}
