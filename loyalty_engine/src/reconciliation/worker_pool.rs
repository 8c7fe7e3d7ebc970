use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use log::*;
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
};

use crate::{
    accrual::{AccrualClient, AccrualOutcome},
    db_types::OrderNumber,
};

/// A fixed number of workers that take order numbers off a shared queue, query the accrual service, and publish the
/// outcomes on a results channel.
#[derive(Debug, Clone)]
pub struct WorkerPool<C> {
    client: C,
    size: usize,
}

impl<C> WorkerPool<C>
where C: AccrualClient + Clone + Send + Sync + 'static
{
    /// Creates a pool with `size` workers. A size of zero is treated as one.
    pub fn new(client: C, size: usize) -> Self {
        Self { client, size: size.max(1) }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Queues `numbers` and starts the workers. Results arrive on the returned handle in completion order. The results
    /// channel closes once every worker has exited, i.e. when the queue is drained or the pool was aborted.
    pub fn dispatch(&self, numbers: Vec<OrderNumber>) -> PoolHandle {
        let (job_tx, job_rx) = mpsc::unbounded_channel();
        for number in numbers {
            // The receiver is alive until the workers exit, so this cannot fail
            let _ = job_tx.send(number);
        }
        drop(job_tx);
        let jobs = Arc::new(Mutex::new(job_rx));
        let abort = Arc::new(AtomicBool::new(false));
        let (result_tx, results) = mpsc::channel(self.size);
        let workers = (0..self.size)
            .map(|id| {
                let jobs = Arc::clone(&jobs);
                let abort = Arc::clone(&abort);
                let results = result_tx.clone();
                let client = self.client.clone();
                tokio::spawn(async move {
                    worker(id, client, jobs, abort, results).await;
                })
            })
            .collect();
        PoolHandle { results, abort, workers }
    }
}

async fn worker<C: AccrualClient>(
    id: usize,
    client: C,
    jobs: Arc<Mutex<mpsc::UnboundedReceiver<OrderNumber>>>,
    abort: Arc<AtomicBool>,
    results: mpsc::Sender<(OrderNumber, AccrualOutcome)>,
) {
    loop {
        if abort.load(Ordering::Acquire) {
            trace!("🔄️ Worker {id} stopping. The tick was aborted");
            break;
        }
        let next = jobs.lock().await.recv().await;
        let Some(number) = next else {
            break;
        };
        if abort.load(Ordering::Acquire) {
            break;
        }
        let outcome = client.fetch(&number).await;
        if outcome.is_abort() {
            abort.store(true, Ordering::Release);
        }
        if results.send((number, outcome)).await.is_err() {
            break;
        }
    }
}

/// The receiving end of a dispatched batch. Dropping the handle stops every worker.
#[derive(Debug)]
pub struct PoolHandle {
    results: mpsc::Receiver<(OrderNumber, AccrualOutcome)>,
    abort: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
}

impl PoolHandle {
    /// The next outcome, or `None` once every worker has finished.
    pub async fn next_result(&mut self) -> Option<(OrderNumber, AccrualOutcome)> {
        self.results.recv().await
    }

    /// Workers finish the request they are on, but take no new jobs.
    pub fn abort(&self) {
        self.abort.store(true, Ordering::Release);
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.load(Ordering::Acquire)
    }
}

impl Drop for PoolHandle {
    fn drop(&mut self) {
        self.abort();
        for worker in &self.workers {
            worker.abort();
        }
    }
}
