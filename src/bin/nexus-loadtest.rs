//! Load generator for the Nexus load balancer.
//!
//! Sends GET requests to the proxy and reports how they were spread across
//! backends, using the `X-Backend-Server` response header.

use clap::Parser;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "nexus-loadtest")]
#[command(about = "Load generator reporting per-backend distribution", long_about = None)]
struct Cli {
    /// Target URL.
    #[arg(short, long, default_value = "http://localhost:8000")]
    url: String,

    /// Number of requests.
    #[arg(short = 'n', long, default_value_t = 20)]
    requests: u64,

    /// Run concurrently instead of sequentially.
    #[arg(short, long)]
    concurrent: bool,

    /// Number of concurrent workers (with --concurrent).
    #[arg(long, default_value_t = 10)]
    workers: usize,

    /// Requests per second (with --concurrent).
    #[arg(long, default_value_t = 10)]
    rate: u32,

    /// Delay between sequential requests in milliseconds.
    #[arg(long, default_value_t = 100)]
    delay_ms: u64,
}

#[derive(Default)]
struct Stats {
    success: AtomicU64,
    failed: AtomicU64,
    backends: Mutex<BTreeMap<String, u64>>,
}

impl Stats {
    fn record_success(&self, backend: String) {
        self.success.fetch_add(1, Ordering::Relaxed);
        let mut backends = self.backends.lock().unwrap_or_else(PoisonError::into_inner);
        *backends.entry(backend).or_default() += 1;
    }

    fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    fn print_summary(&self, total: u64, duration: Duration) {
        let success = self.success.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let pct = |n: u64, of: u64| if of == 0 { 0.0 } else { n as f64 / of as f64 * 100.0 };

        println!("\n==============================================");
        println!("LOAD TEST SUMMARY");
        println!("==============================================");
        println!("Total Requests:      {}", total);
        println!("Successful:          {} ({:.1}%)", success, pct(success, total));
        println!("Failed:              {} ({:.1}%)", failed, pct(failed, total));
        println!("Duration:            {:?}", duration);
        println!("Requests/sec:        {:.2}", total as f64 / duration.as_secs_f64());
        println!("----------------------------------------------");
        println!("Backend Distribution:");

        let backends = self.backends.lock().unwrap_or_else(PoisonError::into_inner);
        for (backend, count) in backends.iter() {
            println!("  {:<30} {} ({:.1}%)", backend, count, pct(*count, success));
        }
        println!("==============================================");
    }
}

async fn send_request(client: &reqwest::Client, url: &str, n: u64, stats: &Stats) {
    match client.get(url).send().await {
        Ok(res) => {
            let status = res.status();
            let backend = res
                .headers()
                .get("x-backend-server")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("Unknown")
                .to_string();
            let _ = res.bytes().await;
            println!("[{}] SUCCESS: Status={}, Backend={}", n, status.as_u16(), backend);
            stats.record_success(backend);
        }
        Err(e) => {
            println!("[{}] FAILED: {}", n, e);
            stats.record_failure();
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;
    let stats = Arc::new(Stats::default());
    let start = Instant::now();

    if cli.concurrent {
        println!("Starting CONCURRENT load test");
        println!("Target URL:     {}", cli.url);
        println!("Total Requests: {}", cli.requests);
        println!("Concurrency:    {} workers", cli.workers);
        println!("Rate Limit:     {} requests/second\n", cli.rate);

        let (tx, rx) = mpsc::channel::<u64>(cli.workers.max(1));
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let workers: Vec<_> = (0..cli.workers.max(1))
            .map(|_| {
                let rx = rx.clone();
                let client = client.clone();
                let stats = stats.clone();
                let url = cli.url.clone();
                tokio::spawn(async move {
                    loop {
                        let next = rx.lock().await.recv().await;
                        let Some(n) = next else { break };
                        send_request(&client, &url, n, &stats).await;
                    }
                })
            })
            .collect();

        let mut ticker = tokio::time::interval(Duration::from_secs(1) / cli.rate.max(1));
        for n in 1..=cli.requests {
            ticker.tick().await;
            if tx.send(n).await.is_err() {
                break;
            }
        }
        drop(tx);

        for worker in workers {
            worker.await?;
        }
    } else {
        println!("Starting SEQUENTIAL load test");
        println!("Target URL:     {}", cli.url);
        println!("Total Requests: {}", cli.requests);
        println!("Delay:          {}ms between requests\n", cli.delay_ms);

        for n in 1..=cli.requests {
            send_request(&client, &cli.url, n, &stats).await;
            if cli.delay_ms > 0 && n < cli.requests {
                tokio::time::sleep(Duration::from_millis(cli.delay_ms)).await;
            }
        }
    }

    stats.print_summary(cli.requests, start.elapsed());
    Ok(())
}
