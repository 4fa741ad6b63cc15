use crate::encoder::write_sequence;
use crate::engine::ModelBackend;
use crate::engine::prompt::build_messages;
use crate::error::GenerationError;
use crate::model::config::GeneratorConfig;
use crate::model::request::{AttemptState, GenerationRequest, GenerationResult};
use crate::recovery::recover;
use anyhow::bail;
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::thread::JoinHandle;

enum ControlMsg {
    Cancel,
}

/// What a running attempt reports back to whoever started it.
#[derive(Debug)]
pub enum GenerationUpdate {
    State(AttemptState),
    /// Rough encoding progress, 0..=100. Advisory only.
    Progress(u8),
    Finished(GenerationResult),
}

/// Runs generation attempts: prompt the model, recover its notes, write them as MIDI.
/// One attempt at a time, each on its own worker thread.
pub struct Generator<B: ModelBackend> {
    backend: Arc<B>,
    config: GeneratorConfig,
    control_tx: Mutex<Option<Sender<ControlMsg>>>,
    worker_handle: Mutex<Option<JoinHandle<()>>>,
}

impl<B: ModelBackend + 'static> Generator<B> {
    pub fn new(backend: B, config: GeneratorConfig) -> Self {
        Self {
            backend: Arc::new(backend),
            config,
            control_tx: Mutex::new(None),
            worker_handle: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker_handle
            .lock()
            .map(|guard| guard.as_ref().is_some_and(|handle| !handle.is_finished()))
            .unwrap_or(false)
    }

    /// Starts one attempt on a worker thread and returns the channel its updates arrive on.
    /// The last update is always [`GenerationUpdate::Finished`].
    pub fn start(&self, request: GenerationRequest) -> anyhow::Result<Receiver<GenerationUpdate>> {
        // Held until the new handle is stored.
        let Ok(mut guard) = self.worker_handle.lock() else {
            bail!("Failed to lock worker handle..!")
        };

        if let Some(handle) = guard.as_ref()
            && !handle.is_finished()
        {
            bail!("Generation already running..!")
        }

        if let Some(previous) = guard.take()
            && previous.join().is_err()
        {
            warn!("Previous generation thread panicked..!");
        }

        let (ctl_tx, ctl_rx) = mpsc::channel::<ControlMsg>();
        let (update_tx, update_rx) = mpsc::channel::<GenerationUpdate>();

        {
            let Ok(mut ctl) = self.control_tx.lock() else {
                bail!("Failed to lock control_tx..!")
            };

            *ctl = Some(ctl_tx);
        }

        let backend = Arc::clone(&self.backend);
        let config = self.config.clone();

        let handle = thread::Builder::new()
            .name(String::from("generation"))
            .spawn(move || {
                let result = attempt(&*backend, &config, &request, Some(&ctl_rx), &update_tx);
                let _ = update_tx.send(GenerationUpdate::Finished(result));
            })?;

        *guard = Some(handle);

        Ok(update_rx)
    }

    /// Runs one attempt on the calling thread. No cancellation, updates go to `updates`.
    pub fn run(
        &self,
        request: &GenerationRequest,
        updates: &Sender<GenerationUpdate>,
    ) -> GenerationResult {
        attempt(&*self.backend, &self.config, request, None, updates)
    }

    /// Asks the running attempt to stop at its next stage boundary. A model call that is
    /// already in flight is allowed to return first; nothing is written after cancelling.
    pub fn cancel(&self) -> anyhow::Result<()> {
        let tx = {
            let Ok(mut lock) = self.control_tx.lock() else {
                bail!("Failed to lock control_tx..!")
            };
            lock.take()
        };

        let Some(tx) = tx else {
            bail!("No generation is running..!")
        };

        if tx.send(ControlMsg::Cancel).is_err() {
            debug!("Generation thread already finished before cancel..!");
        }

        info!("Cancellation requested..!");
        Ok(())
    }

    /// Blocks until the current worker thread (if any) has exited.
    pub fn wait(&self) -> anyhow::Result<()> {
        let handle = {
            let Ok(mut lock) = self.worker_handle.lock() else {
                bail!("Failed to lock worker_handle..!")
            };
            lock.take()
        };

        if let Some(handle) = handle {
            if handle.join().is_err() {
                bail!("Generation thread panicked..!")
            }
            debug!("Generation thread joined..!");
        }

        if let Ok(mut ctl) = self.control_tx.lock() {
            ctl.take();
        }

        Ok(())
    }
}

fn cancelled(control: Option<&Receiver<ControlMsg>>) -> bool {
    matches!(control.map(|rx| rx.try_recv()), Some(Ok(ControlMsg::Cancel)))
}

fn attempt<B: ModelBackend + ?Sized>(
    backend: &B,
    config: &GeneratorConfig,
    request: &GenerationRequest,
    control: Option<&Receiver<ControlMsg>>,
    updates: &Sender<GenerationUpdate>,
) -> GenerationResult {
    let result = match run_stages(backend, config, request, control, updates) {
        Ok(path) => {
            info!("Generation finished: '{}'..!", path.display());
            GenerationResult::Success(path)
        }
        Err(why) => {
            warn!("Generation failed: {}..!", why);
            GenerationResult::Failure(why)
        }
    };

    let _ = updates.send(GenerationUpdate::State(AttemptState::Done));
    result
}

fn run_stages<B: ModelBackend + ?Sized>(
    backend: &B,
    config: &GeneratorConfig,
    request: &GenerationRequest,
    control: Option<&Receiver<ControlMsg>>,
    updates: &Sender<GenerationUpdate>,
) -> Result<PathBuf, GenerationError> {
    if cancelled(control) {
        return Err(GenerationError::Cancelled);
    }

    let _ = updates.send(GenerationUpdate::State(AttemptState::Requesting));
    info!(
        "Asking {} for {} bars of '{}'..!",
        backend.describe(),
        request.bars(),
        request.style()
    );

    let text = backend.complete(&build_messages(request))?;
    debug!("Model output: {}", text);

    if cancelled(control) {
        return Err(GenerationError::Cancelled);
    }

    let _ = updates.send(GenerationUpdate::State(AttemptState::Recovering));
    let notes = recover(&text)?;
    info!("Recovered {} notes from the model output..!", notes.len());

    if cancelled(control) {
        return Err(GenerationError::Cancelled);
    }

    let _ = updates.send(GenerationUpdate::State(AttemptState::Encoding));
    let mut last_progress = None;
    let mut on_progress = |percent: u8| {
        if last_progress != Some(percent) {
            last_progress = Some(percent);
            let _ = updates.send(GenerationUpdate::Progress(percent));
        }
    };

    write_sequence(
        &notes,
        request.program(),
        config.timing,
        &config.output_dir,
        &config.base_name,
        &mut on_progress,
    )
    .map_err(GenerationError::Encoding)
}
