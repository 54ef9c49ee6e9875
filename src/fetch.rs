use std::io::{ErrorKind, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, SyncSender};
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::domain::{IdentifierRecord, TitleRecord};
use crate::error::SearchError;
use crate::parser::{ParsedRecord, StreamingParser, TagSchema};
use crate::request::FetchRequest;
use crate::transport::Transport;

const CHUNK_SIZE: usize = 8 * 1024;
const ABORT_POLL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    aborted: Arc<AtomicBool>,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub enum FetchError {
    Aborted,
    Failed {
        error: SearchError,
        partial: Vec<ParsedRecord>,
    },
}

impl FetchError {
    fn failed(error: impl Into<SearchError>, partial: Vec<ParsedRecord>) -> Self {
        FetchError::Failed {
            error: error.into(),
            partial,
        }
    }
}

enum Pumped {
    Chunk(Vec<u8>),
    End,
    Failed(SearchError),
}

// Owns the connection. Stops and drops it as soon as the reading side hangs
// up, at the latest when the blocked read returns or the transport times out.
fn pump(transport: Arc<dyn Transport>, request: FetchRequest, tx: SyncSender<Pumped>) {
    let mut stream = match transport.open(&request) {
        Ok(stream) => stream,
        Err(err) => {
            let _ = tx.send(Pumped::Failed(err));
            return;
        }
    };
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let message = match stream.read(&mut buf) {
            Ok(0) => Pumped::End,
            Ok(read) => Pumped::Chunk(buf[..read].to_vec()),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => Pumped::Failed(SearchError::Http(err.to_string())),
        };
        let last = !matches!(message, Pumped::Chunk(_));
        if tx.send(message).is_err() || last {
            return;
        }
    }
}

fn stream_records(
    transport: &Arc<dyn Transport>,
    request: &FetchRequest,
    schema: TagSchema,
    abort: &AbortHandle,
) -> Result<Vec<ParsedRecord>, FetchError> {
    if abort.is_aborted() {
        return Err(FetchError::Aborted);
    }
    let (tx, rx) = mpsc::sync_channel(1);
    let pumped = (transport.clone(), request.clone());
    thread::Builder::new()
        .name("molsearch-connection".to_string())
        .spawn(move || {
            let (transport, request) = pumped;
            pump(transport, request, tx)
        })
        .map_err(|err| FetchError::failed(SearchError::Worker(err.to_string()), Vec::new()))?;

    let mut parser = StreamingParser::new(schema);
    let mut records = Vec::new();
    let mut received = 0usize;
    loop {
        if abort.is_aborted() {
            return Err(FetchError::Aborted);
        }
        let chunk = match rx.recv_timeout(ABORT_POLL) {
            Ok(Pumped::Chunk(chunk)) => chunk,
            Ok(Pumped::End) => break,
            Ok(Pumped::Failed(err)) => {
                if abort.is_aborted() {
                    return Err(FetchError::Aborted);
                }
                return Err(FetchError::failed(err, records));
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                return Err(FetchError::failed(SearchError::WorkerLost, records));
            }
        };
        if abort.is_aborted() {
            return Err(FetchError::Aborted);
        }
        received += chunk.len();
        if let Err(err) = parser.feed(&chunk, &mut records) {
            return Err(FetchError::failed(err, records));
        }
    }

    match parser.finish() {
        Ok(count) => {
            debug!(url = %request.url, bytes = received, records = count, "response parsed");
            Ok(records)
        }
        Err(err) => Err(FetchError::failed(err, records)),
    }
}

pub struct IdentifierFetcher {
    transport: Arc<dyn Transport>,
    schema: TagSchema,
    abort: AbortHandle,
}

impl IdentifierFetcher {
    pub fn new(transport: Arc<dyn Transport>, schema: TagSchema) -> Self {
        Self {
            transport,
            schema,
            abort: AbortHandle::new(),
        }
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn abort(&self) {
        self.abort.abort();
    }

    pub fn fetch(&self, request: &FetchRequest) -> Result<Vec<IdentifierRecord>, FetchError> {
        let records = stream_records(
            &self.transport,
            request,
            self.schema.clone(),
            &self.abort,
        )?;
        Ok(records
            .into_iter()
            .map(|record| IdentifierRecord::new(record.identifier))
            .collect())
    }
}

pub struct TitleFetcher {
    transport: Arc<dyn Transport>,
    schema: TagSchema,
    abort: AbortHandle,
}

impl TitleFetcher {
    pub fn new(transport: Arc<dyn Transport>, schema: TagSchema) -> Self {
        Self {
            transport,
            schema,
            abort: AbortHandle::new(),
        }
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn abort(&self) {
        self.abort.abort();
    }

    pub fn fetch(&self, requests: &[FetchRequest]) -> Result<Vec<TitleRecord>, FetchError> {
        let mut collected = Vec::new();
        for (index, request) in requests.iter().enumerate() {
            match stream_records(
                &self.transport,
                request,
                self.schema.clone(),
                &self.abort,
            ) {
                Ok(records) => {
                    debug!(
                        batch = index + 1,
                        batches = requests.len(),
                        titles = records.len(),
                        "title batch fetched"
                    );
                    collected.extend(records);
                }
                Err(FetchError::Failed { error, partial }) => {
                    collected.extend(partial);
                    return Err(FetchError::Failed {
                        error,
                        partial: collected,
                    });
                }
                Err(FetchError::Aborted) => return Err(FetchError::Aborted),
            }
        }
        Ok(collected.into_iter().map(ParsedRecord::into_title).collect())
    }
}
