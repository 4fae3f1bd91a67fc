//! Bounded worker pool running one probe per host.
//!
//! A fixed number of workers drain a shared job queue and push outcomes onto
//! a result channel. The dispatcher returns once it holds exactly one result
//! per input host, in completion order.

use super::{fetch_etag, FetchConfig};
use crate::models::FetchResult;
use futures::future::join_all;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

/// Number of workers to start for a batch.
///
/// Never more than there are hosts, and at least one when there is work.
pub fn effective_workers(concurrency: usize, hosts: usize) -> usize {
    if hosts == 0 {
        0
    } else {
        concurrency.clamp(1, hosts)
    }
}

/// Probe every host over HTTP and collect their ETags.
pub async fn fetch(hosts: &[String], config: &FetchConfig) -> Vec<FetchResult> {
    let config = Arc::new(config.clone());
    let concurrency = config.concurrency;

    dispatch(hosts, concurrency, move |host| {
        let config = Arc::clone(&config);
        async move {
            match fetch_etag(&host, &config).await {
                Ok(etag) => {
                    debug!(host = %host, etag = %etag, "Probe succeeded");
                    FetchResult::found(host, etag)
                }
                Err(e) => {
                    debug!(
                        host = %host,
                        timeout = e.is_timeout(),
                        error = %e,
                        "Probe failed"
                    );
                    FetchResult::failed(host)
                }
            }
        }
    })
    .await
}

/// Run `probe` once per host on a pool of `concurrency` workers.
///
/// Always returns `hosts.len()` results. A host whose probe never reported
/// (its worker panicked) is recorded as failed.
pub async fn dispatch<F, Fut>(hosts: &[String], concurrency: usize, probe: F) -> Vec<FetchResult>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = FetchResult> + Send + 'static,
{
    let workers = effective_workers(concurrency, hosts.len());
    if workers == 0 {
        return Vec::new();
    }

    debug!("Dispatching {} probes on {} workers", hosts.len(), workers);

    let jobs: VecDeque<String> = hosts.iter().cloned().collect();
    let queue = Arc::new(Mutex::new(jobs));
    let (result_tx, mut result_rx) = mpsc::channel::<FetchResult>(hosts.len());
    let probe = Arc::new(probe);

    let handles: Vec<_> = (0..workers)
        .map(|id| {
            let queue = Arc::clone(&queue);
            let result_tx = result_tx.clone();
            let probe = Arc::clone(&probe);

            tokio::spawn(async move {
                while let Some(host) = next_job(&queue).await {
                    let result = (*probe)(host).await;
                    if result_tx.send(result).await.is_err() {
                        break;
                    }
                }
                debug!(worker = id, "Worker drained queue");
            })
        })
        .collect();
    drop(result_tx);

    let mut results = Vec::with_capacity(hosts.len());
    while results.len() < hosts.len() {
        match result_rx.recv().await {
            Some(result) => results.push(result),
            None => break,
        }
    }

    for joined in join_all(handles).await {
        if let Err(e) = joined {
            warn!("Probe worker terminated abnormally: {}", e);
        }
    }

    fill_missing(hosts, &mut results);
    results
}

async fn next_job(queue: &Mutex<VecDeque<String>>) -> Option<String> {
    queue.lock().await.pop_front()
}

/// Record every host without a result as failed.
fn fill_missing(hosts: &[String], results: &mut Vec<FetchResult>) {
    if results.len() == hosts.len() {
        return;
    }

    let mut reported: HashMap<&str, usize> = HashMap::new();
    for result in results.iter() {
        *reported.entry(result.host.as_str()).or_default() += 1;
    }

    let mut missing = Vec::new();
    for host in hosts {
        match reported.get_mut(host.as_str()) {
            Some(count) if *count > 0 => *count -= 1,
            _ => missing.push(FetchResult::failed(host.clone())),
        }
    }

    warn!("{} hosts never reported a result", missing.len());
    results.extend(missing);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::testing::{local_config, spawn_proxy, spawn_silent_proxy_on};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn hosts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("host-{}", i)).collect()
    }

    fn sorted_hosts(results: &[FetchResult]) -> Vec<String> {
        let mut names: Vec<String> = results.iter().map(|r| r.host.clone()).collect();
        names.sort();
        names
    }

    #[test]
    fn test_effective_workers() {
        assert_eq!(effective_workers(100, 3), 3);
        assert_eq!(effective_workers(2, 10), 2);
        assert_eq!(effective_workers(5, 5), 5);
        assert_eq!(effective_workers(0, 4), 1);
        assert_eq!(effective_workers(10, 0), 0);
    }

    #[test]
    fn test_effective_workers_never_exceed_hosts() {
        for hosts in 1..20 {
            for concurrency in 0..40 {
                let workers = effective_workers(concurrency, hosts);
                assert!(workers >= 1);
                assert!(workers <= hosts);
            }
        }
    }

    #[tokio::test]
    async fn test_dispatch_returns_one_result_per_host() {
        let input = hosts(25);

        let results = dispatch(&input, 4, |host| async move {
            if host.ends_with('3') {
                FetchResult::failed(host)
            } else {
                FetchResult::found(host, "\"abc\"")
            }
        })
        .await;

        assert_eq!(results.len(), input.len());
        assert_eq!(sorted_hosts(&results), {
            let mut expected = input.clone();
            expected.sort();
            expected
        });
        assert_eq!(results.iter().filter(|r| r.etag.is_none()).count(), 3);
    }

    #[tokio::test]
    async fn test_dispatch_keeps_duplicate_hosts() {
        let input = vec!["web".to_string(), "web".to_string(), "web".to_string()];

        let results =
            dispatch(&input, 2, |host| async move { FetchResult::found(host, "x") }).await;

        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.host == "web"));
    }

    #[tokio::test]
    async fn test_dispatch_with_no_hosts() {
        let results = dispatch(&[], 10, |host| async move { FetchResult::failed(host) }).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_in_flight_probes_bounded_by_concurrency() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let input = hosts(12);

        let probe = {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            move |host: String| {
                let in_flight = Arc::clone(&in_flight);
                let peak = Arc::clone(&peak);
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    FetchResult::found(host, "x")
                }
            }
        };

        let results = dispatch(&input, 3, probe).await;

        assert_eq!(results.len(), 12);
        assert_eq!(peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_concurrency_above_host_count_is_clamped() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let input = hosts(4);

        let probe = {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            move |host: String| {
                let in_flight = Arc::clone(&in_flight);
                let peak = Arc::clone(&peak);
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    FetchResult::found(host, "x")
                }
            }
        };

        let results = dispatch(&input, 100, probe).await;

        assert_eq!(results.len(), 4);
        assert!(peak.load(Ordering::SeqCst) <= 4);
    }

    #[tokio::test]
    async fn test_panicking_probe_still_yields_complete_set() {
        let input = vec!["a".to_string(), "boom".to_string(), "c".to_string()];

        let results = dispatch(&input, 1, |host| async move {
            if host == "boom" {
                panic!("probe crashed");
            }
            FetchResult::found(host, "x")
        })
        .await;

        assert_eq!(results.len(), 3);
        let boom = results.iter().find(|r| r.host == "boom").unwrap();
        assert_eq!(boom.etag, None);
    }

    #[test]
    fn test_fill_missing_respects_duplicates() {
        let input = vec!["a".to_string(), "a".to_string(), "b".to_string()];
        let mut results = vec![FetchResult::found("a", "x")];

        fill_missing(&input, &mut results);

        assert_eq!(results.len(), 3);
        assert_eq!(
            results.iter().filter(|r| r.host == "a" && r.etag.is_none()).count(),
            1
        );
        assert_eq!(
            results.iter().filter(|r| r.host == "b" && r.etag.is_none()).count(),
            1
        );
    }

    #[tokio::test]
    async fn test_fetch_over_http() {
        let proxy = spawn_proxy(
            "HTTP/1.1 200 OK\r\nETag: \"v1\"\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        let config = local_config(proxy.port);
        let input = vec![
            "127.0.0.1".to_string(),
            "127.0.0.1".to_string(),
            String::new(),
        ];

        let results = fetch(&input, &config).await;

        assert_eq!(results.len(), 3);
        assert_eq!(
            results
                .iter()
                .filter(|r| r.etag.as_deref() == Some("\"v1\""))
                .count(),
            2
        );
        let empty = results.iter().find(|r| r.host.is_empty()).unwrap();
        assert_eq!(empty.etag, None);
    }

    #[tokio::test]
    async fn test_slow_host_does_not_abort_batch() {
        let healthy = spawn_proxy(
            "HTTP/1.1 200 OK\r\nETag: \"v1\"\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        // Same port on another loopback address, so one config reaches both.
        let _slow = spawn_silent_proxy_on(&format!("127.0.0.2:{}", healthy.port)).await;
        let config = FetchConfig {
            concurrency: 3,
            timeout_seconds: 1,
            ..local_config(healthy.port)
        };
        let input = vec![
            "127.0.0.1".to_string(),
            "127.0.0.2".to_string(),
            "127.0.0.1".to_string(),
            "127.0.0.1".to_string(),
        ];

        let results = fetch(&input, &config).await;

        assert_eq!(results.len(), 4);
        let healthy_results: Vec<_> = results.iter().filter(|r| r.host == "127.0.0.1").collect();
        assert_eq!(healthy_results.len(), 3);
        assert!(healthy_results
            .iter()
            .all(|r| r.etag.as_deref() == Some("\"v1\"")));
        let slow = results.iter().find(|r| r.host == "127.0.0.2").unwrap();
        assert_eq!(slow.etag, None);
    }
}
