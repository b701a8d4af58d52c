use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::rc::Rc;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::runtime::Runtime;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use workbench_core::{Indicator, LoadPhase, OverlapPolicy};
use workbench_jobs::{
    BindingConfig, DefaultResourceLoader, FailureKind, JobManager, JobManagerConfig, JobMonitor, ParseError,
    ResourceError, ResourceLoader, ResourceStream, StructureBuilder, ViewBinding,
};

const WAIT: Duration = Duration::from_secs(5);

/// Serves resources from memory; anything unknown fails like an unreachable host.
#[derive(Default)]
struct MemoryLoader {
    resources: Mutex<HashMap<String, String>>,
}

impl MemoryLoader {
    fn with(entries: &[(&str, &str)]) -> Self {
        let loader = Self::default();
        for (id, content) in entries {
            loader.put(id, content);
        }
        loader
    }

    fn put(&self, id: &str, content: &str) {
        self.resources
            .lock()
            .unwrap()
            .insert(id.to_string(), content.to_string());
    }
}

impl ResourceLoader for MemoryLoader {
    fn open(&self, identifier: &str, _monitor: &JobMonitor) -> Result<ResourceStream, ResourceError> {
        match self.resources.lock().unwrap().get(identifier) {
            Some(content) => Ok(Box::new(Cursor::new(content.clone().into_bytes()))),
            None => Err(ResourceError::new(
                FailureKind::Network,
                format!("cannot reach {identifier}"),
            )),
        }
    }
}

/// Blocks every open until the test releases it.
struct GatedLoader {
    inner: MemoryLoader,
    gate: Mutex<mpsc::Receiver<()>>,
}

impl GatedLoader {
    fn new(inner: MemoryLoader) -> (Self, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel();
        (
            Self {
                inner,
                gate: Mutex::new(rx),
            },
            tx,
        )
    }
}

impl ResourceLoader for GatedLoader {
    fn open(&self, identifier: &str, monitor: &JobMonitor) -> Result<ResourceStream, ResourceError> {
        self.gate.lock().unwrap().recv().unwrap();
        self.inner.open(identifier, monitor)
    }
}

/// Structure is the trimmed text; blank text is "nothing to display".
struct TextBuilder;

impl StructureBuilder for TextBuilder {
    type Structure = String;

    fn build(
        &self,
        stream: &mut dyn Read,
        _monitor: &JobMonitor,
    ) -> Result<Option<String>, ParseError> {
        let mut text = String::new();
        stream
            .read_to_string(&mut text)
            .map_err(|err| ParseError::new(err.to_string()))?;
        let text = text.trim();
        if text.starts_with("invalid") {
            return Err(ParseError::at_line(1, "unknown statement"));
        }
        Ok((!text.is_empty()).then(|| text.to_string()))
    }
}

type Notifications = Rc<RefCell<Vec<Option<String>>>>;

fn binding_with(
    loader: Arc<dyn ResourceLoader>,
    overlap: OverlapPolicy,
) -> (ViewBinding<String>, Notifications, JobManager) {
    let jobs = JobManager::new(JobManagerConfig::default()).unwrap();
    let notifications: Notifications = Rc::default();
    let sink = notifications.clone();
    let config = BindingConfig {
        overlap,
        ..BindingConfig::default()
    };
    let binding = ViewBinding::new(config, jobs.clone(), loader, Arc::new(TextBuilder))
        .with_set_input(move |resource| sink.borrow_mut().push(resource.map(ToOwned::to_owned)));
    (binding, notifications, jobs)
}

fn binding(loader: MemoryLoader) -> (ViewBinding<String>, Notifications, JobManager) {
    binding_with(Arc::new(loader), OverlapPolicy::LastCompletionWins)
}

#[test]
fn successful_load_records_resource_and_notifies_consumer() {
    let (mut view, notifications, _jobs) =
        binding(MemoryLoader::with(&[("file:///tmp/shape.shp", "sphere")]));

    view.load("file:///tmp/shape.shp");
    assert_eq!(view.state().phase(), LoadPhase::Loading);
    assert!(view.wait_until_settled(WAIT));

    assert_eq!(view.current_resource(), Some("file:///tmp/shape.shp"));
    assert_eq!(view.state().indicator(), Indicator::Normal);
    assert_eq!(view.structure().map(String::as_str), Some("sphere"));
    assert_eq!(view.state().input_text(), "file:///tmp/shape.shp");
    assert_eq!(
        *notifications.borrow(),
        vec![Some("file:///tmp/shape.shp".to_string())]
    );
}

#[test]
fn failed_open_flags_input_logs_once_and_skips_consumer() {
    let capture = engine_logging::capture::start();
    let (mut view, notifications, _jobs) = binding(MemoryLoader::default());

    view.load("http://bad.host/missing.shp");
    assert!(view.wait_until_settled(WAIT));

    assert_eq!(view.state().indicator(), Indicator::Error);
    assert_eq!(view.state().phase(), LoadPhase::Error);
    assert_eq!(view.current_resource(), None);
    assert!(notifications.borrow().is_empty());

    let warnings = capture.warnings();
    assert_eq!(warnings.len(), 1, "warnings: {warnings:?}");
    assert!(warnings[0].contains("http://bad.host/missing.shp"));
    assert!(warnings[0].contains("cannot reach"));
}

#[test]
fn failure_keeps_previous_resource_and_structure() {
    let (mut view, notifications, _jobs) = binding(MemoryLoader::with(&[("file:///ok.shp", "ok")]));

    view.load("file:///ok.shp");
    assert!(view.wait_until_settled(WAIT));
    view.submit_input("http://bad.host/missing.shp");
    assert!(view.wait_until_settled(WAIT));

    assert_eq!(view.current_resource(), Some("file:///ok.shp"));
    assert_eq!(view.structure().map(String::as_str), Some("ok"));
    assert_eq!(view.state().indicator(), Indicator::Error);
    assert_eq!(notifications.borrow().len(), 1);
}

#[test]
fn parse_failure_is_reported_like_open_failure() {
    let capture = engine_logging::capture::start();
    let (mut view, _notifications, _jobs) =
        binding(MemoryLoader::with(&[("file:///broken.shp", "invalid(1)")]));

    view.load("file:///broken.shp");
    assert!(view.wait_until_settled(WAIT));

    assert_eq!(view.state().indicator(), Indicator::Error);
    assert_eq!(view.current_resource(), None);
    let warnings = capture.warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("line 1: unknown statement"));
}

#[test]
fn empty_structure_leaves_display_untouched() {
    let (mut view, _notifications, _jobs) = binding(MemoryLoader::with(&[
        ("file:///a.shp", "a"),
        ("file:///empty.shp", "   "),
    ]));

    view.load("file:///a.shp");
    assert!(view.wait_until_settled(WAIT));
    view.load("file:///empty.shp");
    assert!(view.wait_until_settled(WAIT));

    assert_eq!(view.structure().map(String::as_str), Some("a"));
    assert_eq!(view.state().indicator(), Indicator::Normal);
}

#[test]
fn refresh_without_prior_load_does_nothing() {
    let (mut view, notifications, _jobs) = binding(MemoryLoader::default());
    let before = view.view();

    view.refresh();

    assert_eq!(view.view(), before);
    assert!(!view.state().is_loading());
    assert_eq!(view.wait_for_message(Duration::from_millis(50)), 0);
    assert!(notifications.borrow().is_empty());
}

#[test]
fn refresh_rereads_current_resource() {
    let loader = Arc::new(MemoryLoader::with(&[("file:///a.shp", "first")]));
    let (mut view, _notifications, _jobs) =
        binding_with(loader.clone(), OverlapPolicy::LastCompletionWins);

    view.load("file:///a.shp");
    assert!(view.wait_until_settled(WAIT));
    loader.put("file:///a.shp", "second");
    view.refresh();
    assert!(view.wait_until_settled(WAIT));

    assert_eq!(view.structure().map(String::as_str), Some("second"));
}

#[test]
fn clear_notifies_consumer_with_none() {
    let (mut view, notifications, _jobs) = binding(MemoryLoader::with(&[("file:///a.shp", "a")]));
    view.load("file:///a.shp");
    assert!(view.wait_until_settled(WAIT));

    view.clear();

    assert_eq!(view.current_resource(), None);
    assert_eq!(view.structure(), None);
    assert_eq!(view.state().input_text(), "");
    assert_eq!(
        *notifications.borrow(),
        vec![Some("file:///a.shp".to_string()), None]
    );
}

#[test]
fn load_finishing_after_clear_still_applies() {
    let (loader, release) = GatedLoader::new(MemoryLoader::with(&[("file:///a.shp", "a")]));
    let (mut view, notifications, _jobs) =
        binding_with(Arc::new(loader), OverlapPolicy::LastCompletionWins);

    view.load("file:///a.shp");
    view.clear();
    assert_eq!(view.current_resource(), None);
    assert_eq!(*notifications.borrow(), vec![None]);

    release.send(()).unwrap();
    assert!(view.wait_until_settled(WAIT));

    assert_eq!(view.current_resource(), Some("file:///a.shp"));
    assert_eq!(
        *notifications.borrow(),
        vec![None, Some("file:///a.shp".to_string())]
    );
}

#[test]
fn results_apply_only_when_owner_pumps() {
    let (mut view, notifications, _jobs) = binding(MemoryLoader::with(&[("file:///a.shp", "a")]));

    view.load("file:///a.shp");
    thread::sleep(Duration::from_millis(100));

    assert_eq!(view.current_resource(), None);
    assert_eq!(view.state().phase(), LoadPhase::Loading);
    assert!(notifications.borrow().is_empty());

    assert!(view.wait_until_settled(WAIT));
    assert_eq!(view.current_resource(), Some("file:///a.shp"));
}

#[test]
fn latest_request_policy_discards_superseded_load() {
    let capture = engine_logging::capture::start();
    let (loader, release) = GatedLoader::new(MemoryLoader::with(&[
        ("file:///old.shp", "old"),
        ("file:///new.shp", "new"),
    ]));
    let (mut view, notifications, _jobs) =
        binding_with(Arc::new(loader), OverlapPolicy::LatestRequestWins);

    view.load("file:///old.shp");
    view.load("file:///new.shp");
    release.send(()).unwrap();
    release.send(()).unwrap();

    assert!(view.wait_until_settled(WAIT));
    // Let the cancelled job post its result too, then drain it.
    thread::sleep(Duration::from_millis(100));
    view.process_pending();

    assert_eq!(view.current_resource(), Some("file:///new.shp"));
    assert_eq!(view.structure().map(String::as_str), Some("new"));
    assert_eq!(
        *notifications.borrow(),
        vec![Some("file:///new.shp".to_string())]
    );
    assert!(capture.warnings().is_empty());
}

#[test]
fn load_after_shutdown_fails_instead_of_hanging() {
    let capture = engine_logging::capture::start();
    let (mut view, notifications, jobs) = binding(MemoryLoader::with(&[("file:///a.shp", "a")]));
    jobs.shutdown();

    view.load("file:///a.shp");
    assert!(view.wait_until_settled(WAIT));

    assert_eq!(view.state().indicator(), Indicator::Error);
    assert!(notifications.borrow().is_empty());
    assert_eq!(capture.warnings().len(), 1);
}

/// Starts a mock server on its own runtime; keep the runtime alive while it serves.
fn serve(route: &str, response: ResponseTemplate) -> (Runtime, MockServer) {
    let runtime = Runtime::new().unwrap();
    let server = runtime.block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(response)
            .mount(&server)
            .await;
        server
    });
    (runtime, server)
}

#[test]
fn http_resource_loads_inside_a_job() {
    let (_runtime, server) = serve("/a.shp", ResponseTemplate::new(200).set_body_string("remote"));
    let (mut view, notifications, _jobs) = binding_with(
        Arc::new(DefaultResourceLoader::default()),
        OverlapPolicy::LastCompletionWins,
    );
    let url = format!("{}/a.shp", server.uri());

    view.load(url.clone());
    assert!(view.wait_until_settled(WAIT));

    assert_eq!(view.state().indicator(), Indicator::Normal);
    assert_eq!(view.current_resource(), Some(url.as_str()));
    assert_eq!(view.structure().map(String::as_str), Some("remote"));
    assert_eq!(*notifications.borrow(), vec![Some(url)]);
}

#[test]
fn http_not_found_inside_a_job_flags_input_once() {
    let capture = engine_logging::capture::start();
    let (_runtime, server) = serve("/a.shp", ResponseTemplate::new(200).set_body_string("remote"));
    let (mut view, notifications, _jobs) = binding_with(
        Arc::new(DefaultResourceLoader::default()),
        OverlapPolicy::LastCompletionWins,
    );
    let good = format!("{}/a.shp", server.uri());
    let missing = format!("{}/missing.shp", server.uri());

    view.load(good.clone());
    assert!(view.wait_until_settled(WAIT));
    view.load(missing.clone());
    assert!(view.wait_until_settled(WAIT));

    assert_eq!(view.state().indicator(), Indicator::Error);
    assert_eq!(view.current_resource(), Some(good.as_str()));
    assert_eq!(view.structure().map(String::as_str), Some("remote"));
    assert_eq!(notifications.borrow().len(), 1);

    let warnings = capture.warnings();
    assert_eq!(warnings.len(), 1, "warnings: {warnings:?}");
    assert!(warnings[0].contains(&missing));
    assert!(warnings[0].contains("http status 404"));
}
