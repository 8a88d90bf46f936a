//! Read-through resolution of CEPs
//!
//! The resolver checks the persistent store first and only calls the remote
//! fetcher on a miss, storing the fetched record before handing it back.
//! Batches are processed input by input; a failure for one code never stops
//! the others.

use futures::stream::{self, Stream, StreamExt};
use thiserror::Error;

use crate::cache::{AddressStore, InsertError, StoreError};
use crate::data::{
    is_normalized, normalize, AddressRecord, FetchError, Fetcher, ValidationError,
};

/// Where a resolved record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Read from the persistent store
    Cache,
    /// Fetched from the remote service and stored
    Remote,
}

/// A successfully resolved address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub record: AddressRecord,
    pub source: Source,
}

/// Errors that abort resolution of a single code
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The store lookup failed with something other than "not found"
    #[error("Database lookup failed for CEP {code}: {source}")]
    Store { code: String, source: StoreError },

    /// The remote lookup failed; nothing was stored
    #[error("Failed to fetch CEP {code}: {source}")]
    Fetch { code: String, source: FetchError },

    /// The fetched record could not be stored
    #[error("Failed to store CEP {code}: {source}")]
    Persist { code: String, source: InsertError },
}

/// Per-input failure within a batch
#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Result of processing one raw input of a batch
#[derive(Debug)]
pub struct Outcome {
    /// The raw input as given by the caller
    pub input: String,
    pub result: Result<Resolved, BatchError>,
}

/// Resolves normalized CEPs against a store, fetching on cache misses
pub struct Resolver<'a> {
    store: &'a dyn AddressStore,
    fetcher: &'a dyn Fetcher,
}

impl<'a> Resolver<'a> {
    pub fn new(store: &'a dyn AddressStore, fetcher: &'a dyn Fetcher) -> Self {
        Self { store, fetcher }
    }

    /// Resolves one normalized code
    ///
    /// # Behavior
    /// - Cache hit: returns the stored record, no network call
    /// - Cache miss: fetches, inserts, returns the fetched record
    /// - A concurrent insert of the same code (`KeyExists`) is treated as a
    ///   late cache hit and the stored record is returned instead
    /// - Fetch failures leave the store untouched
    ///
    /// `code` must already be normalized (see [`normalize`]).
    pub async fn resolve(&self, code: &str) -> Result<Resolved, ResolveError> {
        debug_assert!(is_normalized(code), "resolve called with raw input {code:?}");

        let cached = self.store.get(code).map_err(|source| ResolveError::Store {
            code: code.to_string(),
            source,
        })?;
        if let Some(record) = cached {
            tracing::debug!(cep = code, "cache hit");
            return Ok(Resolved {
                record,
                source: Source::Cache,
            });
        }

        tracing::debug!(cep = code, "cache miss, fetching");
        let mut record = self
            .fetcher
            .fetch_address(code)
            .await
            .map_err(|source| ResolveError::Fetch {
                code: code.to_string(),
                source,
            })?;
        // The requested code is the storage key, whatever form the fetcher used
        if record.code != code {
            tracing::debug!(cep = code, returned = %record.code, "rekeying fetched record");
            record.code = code.to_string();
        }

        match self.store.insert(&record) {
            Ok(()) => Ok(Resolved {
                record,
                source: Source::Remote,
            }),
            Err(InsertError::KeyExists(existing)) => {
                tracing::warn!(cep = code, "record stored concurrently, re-reading cache");
                self.reread_after_conflict(code, existing)
            }
            Err(source) => Err(ResolveError::Persist {
                code: code.to_string(),
                source,
            }),
        }
    }

    fn reread_after_conflict(&self, code: &str, existing: String) -> Result<Resolved, ResolveError> {
        match self.store.get(code) {
            Ok(Some(record)) => Ok(Resolved {
                record,
                source: Source::Cache,
            }),
            // Store claimed the key exists but cannot produce it
            Ok(None) => Err(ResolveError::Persist {
                code: code.to_string(),
                source: InsertError::KeyExists(existing),
            }),
            Err(source) => Err(ResolveError::Store {
                code: code.to_string(),
                source,
            }),
        }
    }

    /// Normalizes and resolves a single raw input
    pub async fn process(&self, input: String) -> Outcome {
        let result = match normalize(&input) {
            Ok(code) => self.resolve(&code).await.map_err(BatchError::from),
            Err(e) => Err(BatchError::from(e)),
        };
        Outcome { input, result }
    }

    /// Processes raw inputs, yielding one outcome per input in input order
    ///
    /// At most `concurrency` resolutions are in flight at once; `1` resolves
    /// each code fully before starting the next.
    pub fn resolve_stream<I>(
        &'a self,
        inputs: I,
        concurrency: usize,
    ) -> impl Stream<Item = Outcome> + 'a
    where
        I: IntoIterator<Item = String>,
        I::IntoIter: 'a,
    {
        stream::iter(inputs.into_iter().map(move |input| self.process(input)))
            .buffered(concurrency.max(1))
    }

    /// Processes a whole batch and collects the outcomes
    pub async fn resolve_batch<I>(&'a self, inputs: I, concurrency: usize) -> Vec<Outcome>
    where
        I: IntoIterator<Item = String>,
        I::IntoIter: 'a,
    {
        self.resolve_stream(inputs, concurrency).collect().await
    }
}
