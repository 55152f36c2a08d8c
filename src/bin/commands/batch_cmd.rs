use anyhow::{bail, Context, Result};
use geobin::result::FIELD_NAMES;
use geobin::{address_list, Database, LookupResult};
use rayon::prelude::*;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use super::OpenOptions;
use crate::cli_utils::{format_number, format_qps, parse_threads};

/// Addresses resolved per parallel step; output keeps input order
const CHUNK_SIZE: usize = 8192;

#[derive(Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Json,
    Csv,
}

impl OutputFormat {
    fn parse(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            other => bail!("Invalid format '{}', expected json or csv", other),
        }
    }
}

enum Sink {
    Json(BufWriter<io::Stdout>),
    Csv(csv::Writer<BufWriter<io::Stdout>>),
}

impl Sink {
    fn new(format: OutputFormat) -> Result<Self> {
        let out = BufWriter::new(io::stdout());
        Ok(match format {
            OutputFormat::Json => Sink::Json(out),
            OutputFormat::Csv => {
                let mut writer = csv::Writer::from_writer(out);
                let header = ["address", "status"].into_iter().chain(FIELD_NAMES);
                writer.write_record(header)?;
                Sink::Csv(writer)
            }
        })
    }

    fn write(&mut self, result: &LookupResult) -> Result<()> {
        match self {
            Sink::Json(out) => {
                serde_json::to_writer(&mut *out, result)?;
                out.write_all(b"\n")?;
            }
            Sink::Csv(writer) => {
                let fields = result.text_fields();
                let row = [result.address.as_str(), result.status.as_str()]
                    .into_iter()
                    .chain(fields.iter().map(|f| f.as_deref().unwrap_or("")));
                writer.write_record(row)?;
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<()> {
        match self {
            Sink::Json(mut out) => out.flush()?,
            Sink::Csv(mut writer) => writer.flush()?,
        }
        Ok(())
    }
}

pub fn cmd_batch(
    options: OpenOptions,
    inputs: Vec<PathBuf>,
    format: String,
    threads: Option<String>,
    show_stats: bool,
) -> Result<()> {
    let format = OutputFormat::parse(&format)?;
    let num_threads = parse_threads(threads.as_deref())?;
    let db = options.open()?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .context("Failed to start worker threads")?;

    let start_time = Instant::now();
    let mut sink = Sink::new(format)?;
    let mut chunk = Vec::with_capacity(CHUNK_SIZE);

    for input in &inputs {
        let reader = address_list::open(input)
            .with_context(|| format!("Failed to open input: {}", input.display()))?;
        for address in address_list::addresses(reader) {
            let address =
                address.with_context(|| format!("Failed to read input: {}", input.display()))?;
            chunk.push(address);
            if chunk.len() == CHUNK_SIZE {
                resolve_chunk(&pool, &db, &mut chunk, &mut sink)?;
            }
        }
    }
    resolve_chunk(&pool, &db, &mut chunk, &mut sink)?;
    sink.finish()?;

    if show_stats {
        let stats = db.stats();
        let elapsed = start_time.elapsed().as_secs_f64();
        eprintln!("[INFO] Threads:        {}", num_threads);
        eprintln!(
            "[INFO] Addresses:      {}",
            format_number(stats.total_queries as usize)
        );
        eprintln!(
            "[INFO] Resolved:       {} ({:.1}%)",
            format_number(stats.queries_found as usize),
            stats.match_rate() * 100.0
        );
        eprintln!(
            "[INFO] Cache hit rate: {:.1}%",
            stats.cache_hit_rate() * 100.0
        );
        if elapsed > 0.0 {
            eprintln!(
                "[INFO] Throughput:     {} queries/s",
                format_qps(stats.total_queries as f64 / elapsed)
            );
        }
    }

    Ok(())
}

fn resolve_chunk(
    pool: &rayon::ThreadPool,
    db: &Database,
    chunk: &mut Vec<String>,
    sink: &mut Sink,
) -> Result<()> {
    if chunk.is_empty() {
        return Ok(());
    }
    let results: Vec<LookupResult> =
        pool.install(|| chunk.par_iter().map(|address| db.query(address)).collect());
    for result in &results {
        sink.write(result)?;
    }
    chunk.clear();
    Ok(())
}
