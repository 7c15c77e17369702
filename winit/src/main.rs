// Prevent console window in addition to Slint window in Windows release builds when, e.g., starting the app via file manager. Ignored on other platforms.
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

slint::include_modules!();

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use smart_monitor_common::{
    reconcile, Actuator, Command, CommandSinkPointer, ConnectionManager, ConnectionState,
    Evaluation, EventQueue, MonitorConfig, MqttConnector, Registry, StateStore,
    ThresholdClassifier,
};

/// Our App struct that holds the UI and the ingestion pipeline.
///
/// A repeated timer drives one render cycle per tick: drain the inbound
/// queue, reconcile it into the state store, run the classifier/actuator,
/// and push the result into the view model. The connection manager runs on
/// its own thread and only ever touches the event queue.
struct App {
    ui: AppWindow,
    queue: EventQueue,
    store: Rc<RefCell<StateStore>>,
    registry: Arc<Registry>,
    actuator: Rc<Actuator>,
    timer: slint::Timer,
    tick: std::time::Duration,
}

impl App {
    /// Create a new App struct from a validated configuration.
    fn new(config: MonitorConfig) -> anyhow::Result<Self> {
        // Make a new AppWindow
        let ui = AppWindow::new()?;

        let registry = Arc::new(config.registry());
        let queue = EventQueue::new();
        let store = Rc::new(RefCell::new(StateStore::new(config.history_cap)));

        // The connector feeds the queue from its own thread; the publisher
        // half stays here for the actuator and the manual controls.
        let (connector, publisher) = MqttConnector::new(&config);
        ConnectionManager::new(connector, registry.clone(), queue.clone(), config.backoff())
            .spawn();

        let sink: CommandSinkPointer = Arc::new(publisher);
        let actuator = Rc::new(Actuator::new(Box::new(ThresholdClassifier::new()?), sink.clone()));

        // Manual override buttons bypass the classifier and publish the
        // operator's command directly.
        let actuation_topic = registry.actuation_topic().to_string();
        ui.global::<ViewModel>().on_publish_command(move |on| {
            let command = if on { Command::On } else { Command::Off };
            if let Err(err) = sink.publish(&actuation_topic, command.payload()) {
                log::warn!("manual {} publish failed: {err}", command.payload());
            }
        });

        Ok(Self { ui, queue, store, registry, actuator, timer: slint::Timer::default(), tick: config.tick() })
    }

    /// Run the App: start the render tick and enter the UI event loop.
    fn run(&mut self) -> anyhow::Result<()> {
        // Get the handle to the UI as a weak reference for the timer closure.
        let ui_handle = self.ui.as_weak();

        let queue = self.queue.clone();
        let store = self.store.clone();
        let registry = self.registry.clone();
        let actuator = self.actuator.clone();

        self.timer.start(slint::TimerMode::Repeated, self.tick, move || {
            let ui = ui_handle.unwrap();

            // drain → reconcile → classify/actuate → render, in that order.
            let mut store = store.borrow_mut();
            reconcile(&queue, &mut store);
            let evaluation = actuator.evaluate(&registry, &store);

            render(&ui, &registry, &store, &evaluation);
        });

        // Run the UI (and map an error to an anyhow::Error).
        self.ui.run().map_err(|e| e.into())
    }
}

/// Pushes the reconciled state into the view model.
fn render(ui: &AppWindow, registry: &Registry, store: &StateStore, evaluation: &Evaluation) {
    let model = ui.global::<ViewModel>();

    // One metric tile per sensor channel.
    let tiles: Vec<ChannelTile> = registry
        .sensor_channels()
        .map(|channel| {
            let latest = store.latest(&channel.topic);
            ChannelTile {
                label: channel.label.clone().into(),
                unit: channel.unit.clone().into(),
                value: latest
                    .map(|r| slint::format!("{:.1}", r.value))
                    .unwrap_or_else(|| "-".into()),
                status: latest
                    .map(|r| match &r.status {
                        Some(status) => status.clone().into(),
                        None => slint::format!("{}", r.timestamp.format("%H:%M:%S")),
                    })
                    .unwrap_or_default(),
            }
        })
        .collect();
    model.set_tiles(slint::ModelRc::from(Rc::new(slint::VecModel::from(tiles))));

    // History bars for the channel selected in the UI, scaled to its peak.
    let sensor_count = registry.sensor_channels().count();
    let selected = (model.get_selected().max(0) as usize).min(sensor_count.saturating_sub(1));
    if let Some(channel) = registry.sensor_channels().nth(selected) {
        let peak = store
            .history(&channel.topic)
            .map(|r| r.value)
            .fold(f64::MIN, f64::max)
            .max(1.0);
        let bars: Vec<f32> = store
            .history(&channel.topic)
            .map(|r| (r.value / peak).clamp(0.0, 1.0) as f32)
            .collect();
        model.set_history(slint::ModelRc::from(Rc::new(slint::VecModel::from(bars))));
        model.set_history_label(channel.label.clone().into());
    }

    // Status banner. A failed evaluation keeps the previous status on
    // screen; the failure itself only goes to the log.
    match evaluation {
        Evaluation::AwaitingData => {
            model.set_status_text("Awaiting sensor data…".into());
            model.set_status_kind(0);
        }
        Evaluation::Classified { label, command } => {
            model.set_status_text(slint::format!("Status: {label}"));
            model.set_status_kind(if *command == Command::On { 2 } else { 1 });
        }
        Evaluation::Failed => {}
    }

    // Connection indicator.
    let connection = store.connection();
    model.set_connected(connection == ConnectionState::Connected);
    model.set_connection_text(
        match connection {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting…",
            ConnectionState::Connected => "Connected",
            ConnectionState::Backoff => "Reconnecting…",
        }
        .into(),
    );
}

/// A minimal main function that loads the configuration, initializes the
/// App and runs it.
fn main() -> anyhow::Result<()> {
    env_logger::init();

    // An optional first argument points at a JSON configuration override;
    // a bad configuration aborts here, before any connection attempt.
    let config = match std::env::args().nth(1) {
        Some(path) => MonitorConfig::from_file(path)?,
        None => MonitorConfig::builtin()?,
    };

    let mut app = App::new(config)?;

    app.run()
}
