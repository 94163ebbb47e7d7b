//! Optional deep path: pluggable per-declaration control-flow analysis.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, Sender, TrySendError};
use depgraph_core::errors::ParseError;
use depgraph_core::traits::{Cancellable, CancellationToken};

use super::bsl::keywords::{keyword, Keyword};
use super::bsl::lexer::{tokenize, TokenKind};
use super::types::{DeepMetrics, Declaration};

/// A structural-analysis backend. Must return one `DeepMetrics` per
/// declaration, in declaration order.
///
/// Long-running analyzers should poll `cancel` and return early once it is
/// set; the caller has already given up on the result by then.
pub trait DeepAnalyzer: Send + Sync {
    fn name(&self) -> &str;

    fn analyze(
        &self,
        source: &str,
        declarations: &[Declaration],
        cancel: &CancellationToken,
    ) -> Result<Vec<DeepMetrics>, ParseError>;
}

struct DeepJob {
    analyzer: Arc<dyn DeepAnalyzer>,
    source: String,
    declarations: Vec<Declaration>,
    cancel: CancellationToken,
    reply: Sender<Result<Vec<DeepMetrics>, ParseError>>,
}

/// Fixed set of deep-analysis threads fed through a bounded job queue.
///
/// Threads live as long as the pool; dropping it closes the queue and each
/// worker exits after its current job. A job whose caller timed out is
/// cancelled, and skipped if it has not started yet.
pub struct DeepWorkerPool {
    jobs: Sender<DeepJob>,
    workers: usize,
}

impl DeepWorkerPool {
    /// Spawn `workers` threads (at least one) behind a queue of the same depth.
    pub fn new(workers: usize) -> Self {
        let (jobs, queue) = crossbeam_channel::bounded::<DeepJob>(workers.max(1));
        let mut spawned = 0;
        for i in 0..workers.max(1) {
            let queue = queue.clone();
            let worker = std::thread::Builder::new()
                .name(format!("depgraph-deep-{i}"))
                .spawn(move || {
                    for job in queue.iter() {
                        if job.cancel.is_cancelled() {
                            continue;
                        }
                        let result = job.analyzer.analyze(&job.source, &job.declarations, &job.cancel);
                        let _ = job.reply.send(result);
                    }
                });
            match worker {
                Ok(_) => spawned += 1,
                Err(e) => tracing::warn!(error = %e, "cannot spawn deep worker"),
            }
        }
        Self {
            jobs,
            workers: spawned,
        }
    }

    /// Number of running worker threads.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Analyze on a pool thread and wait at most `timeout`.
    ///
    /// A full queue means every worker is busy; the unit degrades at once
    /// instead of waiting behind slow jobs.
    pub fn run(
        &self,
        analyzer: &Arc<dyn DeepAnalyzer>,
        unit: &str,
        source: &str,
        declarations: &[Declaration],
        timeout: Duration,
    ) -> Result<Vec<DeepMetrics>, ParseError> {
        let unavailable = |reason: String| ParseError::DeepUnavailable {
            unit: unit.to_string(),
            reason,
        };
        if self.workers == 0 {
            return Err(unavailable("no deep workers running".to_string()));
        }

        let (reply, result) = crossbeam_channel::bounded(1);
        let cancel = CancellationToken::new();
        let job = DeepJob {
            analyzer: Arc::clone(analyzer),
            source: source.to_string(),
            declarations: declarations.to_vec(),
            cancel: cancel.clone(),
            reply,
        };
        match self.jobs.try_send(job) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                return Err(unavailable(format!("all {} deep workers are busy", self.workers)))
            }
            Err(TrySendError::Disconnected(_)) => {
                return Err(unavailable("deep workers have exited".to_string()))
            }
        }

        let metrics = match result.recv_timeout(timeout) {
            Ok(result) => result?,
            Err(RecvTimeoutError::Timeout) => {
                cancel.cancel();
                return Err(ParseError::DeepTimeout {
                    unit: unit.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(unavailable(format!(
                    "{} worker exited without a result",
                    analyzer.name()
                )))
            }
        };
        if metrics.len() != declarations.len() {
            return Err(unavailable(format!(
                "{} returned {} results for {} declarations",
                analyzer.name(),
                metrics.len(),
                declarations.len()
            )));
        }
        Ok(metrics)
    }
}

/// Built-in analyzer counting blocks and decision points from the
/// structured statements of the language.
///
/// Cyclomatic complexity is `decisions + 1`, where decisions are
/// `If`/`ElsIf`/`While`/`For`/`Except`, the ternary `?(`, and the
/// short-circuit `And`/`Or`. Control-flow edges follow from
/// `M = E - N + 2`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockStructureAnalyzer;

impl DeepAnalyzer for BlockStructureAnalyzer {
    fn name(&self) -> &str {
        "block-structure"
    }

    fn analyze(
        &self,
        source: &str,
        declarations: &[Declaration],
        _cancel: &CancellationToken,
    ) -> Result<Vec<DeepMetrics>, ParseError> {
        let lexed = tokenize(source);
        let tokens = &lexed.tokens;

        Ok(declarations
            .iter()
            .map(|decl| {
                let (start, end) = decl.line_range;
                let body: Vec<_> = tokens
                    .iter()
                    .filter(|t| t.line >= start && t.line <= end)
                    .collect();

                let mut nesting = 0u32;
                let mut max_nesting = 0u32;
                let mut blocks = 1u32;
                let mut decisions = 0u32;

                for (idx, tok) in body.iter().enumerate() {
                    match tok.kind {
                        TokenKind::Ident => match keyword(&tok.text.to_lowercase()) {
                            Some(Keyword::If | Keyword::While | Keyword::For) => {
                                nesting += 1;
                                max_nesting = max_nesting.max(nesting);
                                blocks += 1;
                                decisions += 1;
                            }
                            Some(Keyword::Try) => {
                                nesting += 1;
                                max_nesting = max_nesting.max(nesting);
                                blocks += 1;
                            }
                            Some(Keyword::ElsIf) => {
                                blocks += 1;
                                decisions += 1;
                            }
                            Some(Keyword::Else) => blocks += 1,
                            Some(Keyword::Except) => {
                                blocks += 1;
                                decisions += 1;
                            }
                            Some(Keyword::EndIf | Keyword::EndDo | Keyword::EndTry) => {
                                nesting = nesting.saturating_sub(1);
                                blocks += 1;
                            }
                            Some(Keyword::And | Keyword::Or) => decisions += 1,
                            _ => {}
                        },
                        TokenKind::Punct('?')
                            if body.get(idx + 1).is_some_and(|t| t.is_punct('(')) =>
                        {
                            blocks += 2;
                            decisions += 1;
                        }
                        _ => {}
                    }
                }

                DeepMetrics {
                    cyclomatic: decisions + 1,
                    blocks,
                    cf_edges: blocks + decisions - 1,
                    max_nesting,
                }
            })
            .collect())
    }
}
