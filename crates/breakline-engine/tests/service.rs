//! End-to-end lifecycle: attach, react to a simulated host, detach.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use assert_matches::assert_matches;
use breakline_core::{Document, NodeId};
use breakline_engine::{
    Breakline, EngineError, HostSignal, LogNotifier, RunSource, SignalKind, SubtreeChange,
};
use breakline_settings::{BreaklineSettings, MemoryPolicyStore, PolicyField, PolicyStore};
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};

const CHAT: &str = r#"<div id="chat"><div class="mes"><div class="mes_text"><br>Hi<br><br>there</div></div></div>"#;

const TWO_MESSAGES: &str = r#"<div id="chat"><div class="mes"><div class="mes_text"><br>Hi<br><br>there</div></div><div class="mes"><div class="mes_text"><br>Second<br><br>reply</div></div></div>"#;

/// A host that renders messages into the shared document and forwards the
/// recorded mutations the way a mutation observer would.
struct Host {
    document: Arc<Mutex<Document>>,
    chat: NodeId,
    mutations: mpsc::Sender<Vec<breakline_core::MutationRecord>>,
    signals: broadcast::Sender<HostSignal>,
}

impl Host {
    async fn render(&self, html: &str) -> Vec<NodeId> {
        let (added, batch) = {
            let mut doc = self.document.lock();
            let added = doc.append_html(self.chat, html);
            (added, doc.take_mutations())
        };
        self.mutations.send(batch).await.unwrap();
        added
    }

    fn scopes(&self, breakline: &Breakline) -> Vec<NodeId> {
        let doc = self.document.lock();
        doc.select(self.chat, breakline.context().scope_selectors())
    }
}

fn setup(
    store: Arc<MemoryPolicyStore>,
) -> (
    Breakline,
    Host,
    mpsc::Receiver<Vec<breakline_core::MutationRecord>>,
    broadcast::Receiver<HostSignal>,
) {
    setup_with(CHAT, store)
}

fn setup_with(
    html: &str,
    store: Arc<MemoryPolicyStore>,
) -> (
    Breakline,
    Host,
    mpsc::Receiver<Vec<breakline_core::MutationRecord>>,
    broadcast::Receiver<HostSignal>,
) {
    let mut doc = Document::from_html(html);
    doc.set_recording(true);
    let chat = doc.children(doc.root())[0];
    let document = Arc::new(Mutex::new(doc));

    let breakline = Breakline::new(
        Arc::clone(&document),
        BreaklineSettings::default(),
        store,
        Arc::new(LogNotifier),
    )
    .unwrap();

    let (mutations, mutation_rx) = mpsc::channel(16);
    let (signals, signal_rx) = broadcast::channel(16);
    let host = Host {
        document,
        chat,
        mutations,
        signals,
    };
    (breakline, host, mutation_rx, signal_rx)
}

fn hidden(document: &Arc<Mutex<Document>>, scope: NodeId) -> Vec<bool> {
    let doc = document.lock();
    doc.elements_by_tag(scope, "br")
        .into_iter()
        .map(|br| doc.is_hidden(br))
        .collect()
}

fn stored_policy() -> Arc<MemoryPolicyStore> {
    Arc::new(MemoryPolicyStore::with_stored(serde_json::json!({
        "hideLeading": true,
        "mergeConsecutive": true,
    })))
}

#[tokio::test(start_paused = true)]
async fn attach_apply_react_and_detach() {
    let (breakline, host, mutation_rx, signal_rx) = setup(stored_policy());
    let service = breakline.start(|| true, mutation_rx, signal_rx).await.unwrap();

    let first_scope = {
        let doc = host.document.lock();
        doc.select(host.chat, service.breakline().context().scope_selectors())[0]
    };
    assert_eq!(service.initial().report().unwrap().source, RunSource::Init);
    assert_eq!(hidden(&host.document, first_scope), vec![true, false, true]);

    // Three messages arrive less than one debounce window apart; the
    // batches coalesce into a single mutation run.
    for text in ["One", "Two", "Three"] {
        let _ = host
            .render(&format!(
                r#"<div class="mes"><div class="mes_text"><br><br>{text}</div></div>"#
            ))
            .await;
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(service.breakline().context().stats().completed, 1);
    assert!(service.breakline().scheduler().is_pending());

    tokio::time::sleep(Duration::from_millis(300)).await;
    let stats = service.breakline().context().stats();
    assert_eq!(stats.completed, 2);
    let report = stats.last_report.unwrap();
    assert_eq!(report.source, RunSource::Mutation);
    assert_eq!(report.scopes_processed, 4);

    let scopes = host.scopes(service.breakline());
    assert_eq!(scopes.len(), 4);
    for &scope in &scopes[1..] {
        assert_eq!(hidden(&host.document, scope), vec![true, true]);
    }

    // A host signal triggers its own run.
    let _ = host
        .signals
        .send(HostSignal::new(SignalKind::MessageReceived))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(
        service.breakline().context().stats().last_report.unwrap().source,
        RunSource::MessageReceived
    );

    let restored = service.shutdown().await;
    assert_eq!(restored, 9);
    assert_eq!(hidden(&host.document, first_scope), vec![false, false, false]);
    for &scope in &scopes[1..] {
        assert_eq!(hidden(&host.document, scope), vec![false, false]);
    }
}

#[tokio::test(start_paused = true)]
async fn edit_session_isolates_its_scope() {
    let (breakline, host, mutation_rx, signal_rx) = setup(stored_policy());
    let service = breakline.start(|| true, mutation_rx, signal_rx).await.unwrap();
    let scope = {
        let doc = host.document.lock();
        doc.select(host.chat, service.breakline().context().scope_selectors())[0]
    };
    assert_eq!(hidden(&host.document, scope), vec![true, false, true]);

    // Entering an edit reverts the scope synchronously with the batch.
    let editor = {
        let mut doc = host.document.lock();
        doc.append_html(scope, r#"<textarea class="edit_textarea">Hi</textarea>"#)[0]
    };
    let batch = host.document.lock().take_mutations();
    let changes = service.breakline().watcher().handle_batch(&batch);
    assert_eq!(changes, vec![SubtreeChange::EditEntered { scope }]);
    assert_eq!(hidden(&host.document, scope), vec![false, false, false]);
    assert!(!service.breakline().scheduler().is_pending());

    // Leaving it re-applies only that scope after the settle delay.
    host.document.lock().remove(editor).unwrap();
    let batch = host.document.lock().take_mutations();
    let changes = service.breakline().watcher().handle_batch(&batch);
    assert_eq!(changes, vec![SubtreeChange::EditExited { scope }]);
    tokio::time::sleep(Duration::from_millis(150)).await;

    let report = service.breakline().context().stats().last_report.unwrap();
    assert_eq!(report.source, RunSource::EditExited);
    assert_eq!(report.target, Some(scope));
    assert_eq!(hidden(&host.document, scope), vec![true, false, true]);

    let _ = service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn edit_session_leaves_other_scopes_untouched() {
    let (breakline, host, mutation_rx, signal_rx) = setup_with(TWO_MESSAGES, stored_policy());
    let service = breakline.start(|| true, mutation_rx, signal_rx).await.unwrap();
    let scopes = host.scopes(service.breakline());
    let (edited, other) = (scopes[0], scopes[1]);
    assert_eq!(hidden(&host.document, edited), vec![true, false, true]);
    assert_eq!(hidden(&host.document, other), vec![true, false, true]);
    let other_before = host.document.lock().inner_html(other);

    let editor = {
        let mut doc = host.document.lock();
        doc.append_html(edited, r#"<textarea class="edit_textarea">Hi</textarea>"#)[0]
    };
    let batch = host.document.lock().take_mutations();
    let changes = service.breakline().watcher().handle_batch(&batch);
    assert_eq!(changes, vec![SubtreeChange::EditEntered { scope: edited }]);
    assert_eq!(hidden(&host.document, edited), vec![false, false, false]);
    assert_eq!(hidden(&host.document, other), vec![true, false, true]);
    assert_eq!(host.document.lock().inner_html(other), other_before);

    host.document.lock().remove(editor).unwrap();
    let batch = host.document.lock().take_mutations();
    let _ = service.breakline().watcher().handle_batch(&batch);
    tokio::time::sleep(Duration::from_millis(150)).await;

    let report = service.breakline().context().stats().last_report.unwrap();
    assert_eq!(report.target, Some(edited));
    assert_eq!(report.scopes_processed, 1);
    assert_eq!(hidden(&host.document, edited), vec![true, false, true]);
    assert_eq!(host.document.lock().inner_html(other), other_before);

    let _ = service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn settings_panel_toggle_persists_and_reapplies() {
    let store = Arc::new(MemoryPolicyStore::new());
    let (breakline, host, mutation_rx, signal_rx) = setup(Arc::clone(&store));
    let service = breakline.start(|| true, mutation_rx, signal_rx).await.unwrap();
    let scope = {
        let doc = host.document.lock();
        doc.select(host.chat, service.breakline().context().scope_selectors())[0]
    };
    assert_eq!(hidden(&host.document, scope), vec![false, false, false]);

    let _ = service
        .breakline()
        .panel()
        .toggle(PolicyField::HideAllInScope, true);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(hidden(&host.document, scope), vec![true, true, true]);
    assert!(store.load().unwrap().hide_all_in_scope);

    let _ = service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn host_that_never_loads_fails_after_max_attempts() {
    let (breakline, _host, mutation_rx, signal_rx) = setup(stored_policy());
    let probes = Arc::new(AtomicU32::new(0));
    let probe = {
        let probes = Arc::clone(&probes);
        move || {
            let _ = probes.fetch_add(1, Ordering::SeqCst);
            false
        }
    };
    let result = breakline.start(probe, mutation_rx, signal_rx).await;
    assert_matches!(result, Err(EngineError::HostUnavailable { attempts: 20 }));
    assert_eq!(probes.load(Ordering::SeqCst), 20);
}
