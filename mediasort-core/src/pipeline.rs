//! The pipeline engine.
//!
//! Three phases run concurrently, joined by bounded queues:
//!
//! 1. **Ingestion** - one task per [`Input`], all sending into one shared
//!    queue. The queue closes only after every input task has joined.
//! 2. **Processing** - processors chained in order, each reading the previous
//!    stage's queue and writing a fresh one, ending in [`Forward`]. A stage's
//!    output queue closes when the stage returns, so shutdown flows down the
//!    chain on its own.
//! 3. **Output** - a coordinator copies every processed record into each
//!    output's private queue and waits for all deliveries before taking the
//!    next record.

use async_trait::async_trait;
use futures::future::join_all;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::error::{ConfigError, EngineError};
use crate::plugin::{Input, Output, Processor, RecordReceiver, RecordSender, forward};

/// Queue capacity used unless configured otherwise.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1;

/// Terminal pass-through stage appended to every processor chain.
#[derive(Debug, Default, Clone, Copy)]
pub struct Forward;

#[async_trait]
impl Processor for Forward {
    async fn process(
        &mut self,
        mut input: RecordReceiver,
        output: RecordSender,
        _cancel: CancellationToken,
    ) {
        while let Some(record) = input.recv().await {
            if !forward(&output, record, "forward").await {
                break;
            }
        }
    }
}

/// Inputs, a processor chain and fan-out outputs, run as one dataflow graph.
#[derive(Debug)]
pub struct PipelineEngine {
    capacity: usize,
    inputs: Vec<Box<dyn Input>>,
    processors: Vec<Box<dyn Processor>>,
    outputs: Vec<Box<dyn Output>>,
}

impl Default for PipelineEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineEngine {
    /// Engine with [`DEFAULT_QUEUE_CAPACITY`].
    pub fn new() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
            inputs: Vec::new(),
            processors: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Engine whose queues hold `capacity` records. Zero is rejected.
    pub fn with_capacity(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(Self {
            capacity,
            ..Self::new()
        })
    }

    /// Capacity of every inter-stage queue.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Add inputs. They run concurrently and share the ingestion queue.
    pub fn with_inputs(mut self, inputs: impl IntoIterator<Item = Box<dyn Input>>) -> Self {
        self.inputs.extend(inputs);
        self
    }

    /// Appends to the chain; processors run in the order they are added.
    pub fn with_processors(
        mut self,
        processors: impl IntoIterator<Item = Box<dyn Processor>>,
    ) -> Self {
        self.processors.extend(processors);
        self
    }

    /// Add outputs. Each receives every record.
    pub fn with_outputs(mut self, outputs: impl IntoIterator<Item = Box<dyn Output>>) -> Self {
        self.outputs.extend(outputs);
        self
    }

    /// See [`with_inputs`](Self::with_inputs).
    pub fn add_input(&mut self, input: Box<dyn Input>) {
        self.inputs.push(input);
    }

    /// Append to the chain.
    pub fn add_processor(&mut self, processor: Box<dyn Processor>) {
        self.processors.push(processor);
    }

    /// See [`with_outputs`](Self::with_outputs).
    pub fn add_output(&mut self, output: Box<dyn Output>) {
        self.outputs.push(output);
    }

    /// Put a processor at the head of the chain.
    pub fn prepend_processor(&mut self, processor: Box<dyn Processor>) {
        self.processors.insert(0, processor);
    }

    /// Drive the graph until every queue drains.
    ///
    /// `cancel` is handed to every stage entry point but never polled by the
    /// engine itself. Per-record failures are the stages' business; only a
    /// stage task that panics surfaces here.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), EngineError> {
        let Self {
            capacity,
            inputs,
            processors,
            outputs,
        } = self;

        info!(
            inputs = inputs.len(),
            processors = processors.len(),
            outputs = outputs.len(),
            capacity,
            "pipeline: starting"
        );

        let (ingest_tx, ingest_rx) = mpsc::channel(capacity);
        let ingestion = tokio::spawn(run_ingestion(inputs, ingest_tx, cancel.clone()));

        let (processed_rx, chain) = spawn_chain(processors, ingest_rx, capacity, &cancel);
        let processing = tokio::spawn(join_phase("processing", chain));

        let output = tokio::spawn(run_outputs(outputs, processed_rx, capacity, cancel));

        let mut first_error = None;
        for (phase, handle) in [
            ("ingestion", ingestion),
            ("processing", processing),
            ("output", output),
        ] {
            let outcome = match handle.await {
                Ok(result) => result,
                Err(source) => Err(EngineError::TaskFailed { phase, source }),
            };
            if let Err(err) = outcome {
                warn!(phase, error = %err, "pipeline: phase failed");
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => {
                info!("pipeline: drained");
                Ok(())
            }
        }
    }
}

async fn run_ingestion(
    inputs: Vec<Box<dyn Input>>,
    ingest_tx: RecordSender,
    cancel: CancellationToken,
) -> Result<(), EngineError> {
    let workers: Vec<JoinHandle<()>> = inputs
        .into_iter()
        .map(|mut input| {
            let tx = ingest_tx.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                trace!(?input, "pipeline: input started");
                input.consume(tx, cancel).await;
            })
        })
        .collect();

    let result = join_phase("ingestion", workers).await;

    // Every input has joined; closing now cannot truncate the stream.
    drop(ingest_tx);
    debug!("pipeline: ingestion closed");
    result
}

fn spawn_chain(
    processors: Vec<Box<dyn Processor>>,
    ingest_rx: RecordReceiver,
    capacity: usize,
    cancel: &CancellationToken,
) -> (RecordReceiver, Vec<JoinHandle<()>>) {
    let mut upstream = ingest_rx;
    let mut handles = Vec::with_capacity(processors.len() + 1);

    let chain = processors
        .into_iter()
        .chain(std::iter::once(Box::new(Forward) as Box<dyn Processor>));
    for mut stage in chain {
        let (tx, rx) = mpsc::channel(capacity);
        let input = std::mem::replace(&mut upstream, rx);
        let cancel = cancel.clone();
        handles.push(tokio::spawn(async move {
            trace!(?stage, "pipeline: processor started");
            stage.process(input, tx, cancel).await;
        }));
    }

    (upstream, handles)
}

async fn run_outputs(
    outputs: Vec<Box<dyn Output>>,
    mut processed_rx: RecordReceiver,
    capacity: usize,
    cancel: CancellationToken,
) -> Result<(), EngineError> {
    let mut senders = Vec::with_capacity(outputs.len());
    let mut workers = Vec::with_capacity(outputs.len());
    for mut output in outputs {
        let (tx, rx) = mpsc::channel(capacity);
        senders.push(tx);
        let cancel = cancel.clone();
        workers.push(tokio::spawn(async move {
            trace!(?output, "pipeline: output started");
            output.receive(rx, cancel).await;
        }));
    }

    let coordinator = tokio::spawn(async move {
        let mut delivered = 0usize;
        while let Some(record) = processed_rx.recv().await {
            let deliveries = senders.iter().enumerate().map(|(idx, tx)| {
                let record = record.clone();
                async move {
                    if tx.send(record).await.is_err() {
                        warn!(output = idx, "pipeline: output queue closed early");
                    }
                }
            });
            join_all(deliveries).await;
            delivered += 1;
        }
        debug!(records = delivered, "pipeline: fan-out complete");
        drop(senders);
    });

    let coordinated = match coordinator.await {
        Ok(()) => Ok(()),
        Err(source) => Err(EngineError::TaskFailed {
            phase: "fan-out",
            source,
        }),
    };
    let joined = join_phase("output", workers).await;
    coordinated.and(joined)
}

/// Join every task, reporting the first one that failed.
async fn join_phase(phase: &'static str, handles: Vec<JoinHandle<()>>) -> Result<(), EngineError> {
    let mut first_error = None;
    for result in join_all(handles).await {
        if let Err(source) = result {
            warn!(phase, error = %source, "pipeline: stage task failed");
            first_error.get_or_insert(EngineError::TaskFailed { phase, source });
        }
    }
    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
