use std::sync::{Arc, Mutex};

use bbup::cli::{run_with, Commands};
use bbup::console::{Console, ScriptedPrompt};
use bbup_core::contract::MockStorage;
use bbup_core::progress::NoProgress;
use bbup_core::store::ConfigStore;
use tempfile::tempdir;
use tracing_subscriber::prelude::*; // needed for .with()
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{:?}", event));
    }
}

#[tokio::test]
async fn emits_trace_initialised_and_failure_events() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    let dir = tempdir().unwrap();
    let store = ConfigStore::new(dir.path());
    let storage = MockStorage::new();
    let mut console = Console::new(ScriptedPrompt::new(Vec::<String>::new()), Vec::new());

    let result = run_with(
        Commands::LocalUpload {
            bucket: None,
            content_type: None,
        },
        &store,
        &storage,
        &mut console,
        &mut NoProgress,
    )
    .await;
    assert!(result.is_err(), "no input should end the command");

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
    assert!(
        event_msgs.iter().any(|msg| msg.contains("Command failed")),
        "Expected a 'Command failed' event, got: {:?}",
        event_msgs
    );
}
