//! Fan-out / fan-in worker stage.
//!
//! Items `0..count` are split into contiguous ranges, one per producer
//! thread. Producers compute items independently and send them over a
//! bounded channel; the calling thread is the single consumer, so global
//! state touched by `consume` needs no locking. Every producer reports its
//! status exactly once on a second bounded channel, and the first error
//! aborts the stage. Dropping the receivers on abort unblocks the producers.

use crate::error::{Error, Result};
use crate::progress::Progress;
use crossbeam::channel::{self, Receiver};
use crossbeam::select;
use std::ops::Range;

/// Split `0..count` into `parts` contiguous ranges whose lengths differ by at most one.
pub fn partition(count: usize, parts: usize) -> Vec<Range<usize>> {
    let parts = parts.max(1);
    let (base, extra) = (count / parts, count % parts);
    let mut start = 0;
    (0..parts)
        .map(|p| {
            let len = base + usize::from(p < extra);
            let range = start..start + len;
            start += len;
            range
        })
        .filter(|r| !r.is_empty())
        .collect()
}

/// Run `produce` for every item on up to `threads` workers and feed the
/// results to `consume` on the calling thread.
///
/// Items reach `consume` in completion order, not index order.
pub fn fan_in<T, P, C>(
    stage: &str,
    threads: usize,
    count: usize,
    produce: P,
    mut consume: C,
) -> Result<()>
where
    T: Send,
    P: Fn(usize) -> Result<T> + Sync,
    C: FnMut(usize, T) -> Result<()>,
{
    let progress = Progress::new(stage, count);
    let ranges = partition(count, threads.min(count));
    let workers = ranges.len();

    if workers > 0 {
        let (data_tx, data_rx) = channel::bounded::<(usize, T)>(workers);
        let (report_tx, report_rx) = channel::bounded::<Result<()>>(workers);
        let produce = &produce;
        let consume = &mut consume;
        let progress = &progress;

        let outcome = crossbeam::scope(move |scope| {
            for range in ranges {
                let data_tx = data_tx.clone();
                let report_tx = report_tx.clone();
                scope.spawn(move |_| {
                    let mut status = Ok(());
                    for i in range {
                        match produce(i) {
                            Ok(item) => {
                                if data_tx.send((i, item)).is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                status = Err(e);
                                break;
                            }
                        }
                    }
                    // The consumer may already have stopped listening.
                    let _ = report_tx.send(status);
                });
            }
            drop(data_tx);
            drop(report_tx);
            drain(count, workers, data_rx, report_rx, consume, progress)
        });

        match outcome {
            Ok(result) => result?,
            Err(_) => return Err(Error::Assembly(format!("{}: worker thread panicked", stage))),
        }
    }

    progress.finish();
    Ok(())
}

fn drain<T>(
    count: usize,
    workers: usize,
    data_rx: Receiver<(usize, T)>,
    report_rx: Receiver<Result<()>>,
    consume: &mut impl FnMut(usize, T) -> Result<()>,
    progress: &Progress,
) -> Result<()> {
    let mut received = 0;
    let mut reports = 0;
    let stopped = |received: usize| {
        Error::Assembly(format!("workers stopped after {} of {} items", received, count))
    };

    while received < count {
        if reports == workers {
            let (i, item) = data_rx.recv().map_err(|_| stopped(received))?;
            consume(i, item)?;
            received += 1;
            progress.inc();
            continue;
        }
        select! {
            recv(data_rx) -> message => {
                let (i, item) = message.map_err(|_| stopped(received))?;
                consume(i, item)?;
                received += 1;
                progress.inc();
            }
            recv(report_rx) -> report => match report {
                Ok(status) => {
                    status?;
                    reports += 1;
                }
                // A producer died without reporting; keep draining what was sent.
                Err(_) => reports = workers,
            },
        }
    }

    while reports < workers {
        match report_rx.recv() {
            Ok(status) => {
                status?;
                reports += 1;
            }
            Err(_) => break,
        }
    }
    Ok(())
}
