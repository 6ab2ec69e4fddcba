use std::io::{self, Write};

use clap::ValueEnum;
use serde::Serialize;
use tracing::info;

use crate::app::{PopulateResult, ProgressEvent, ProgressSink, ResetResult, Summary};
use crate::graph::BelGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GraphFormat {
    Json,
    Bel,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_summary(result: &Summary) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_populate(result: &PopulateResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_reset(result: &ResetResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let mut stdout = io::stdout();
        write_json(&mut stdout, value)
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Progress sink that reports phases as `tracing` events.
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => info!(
                elapsed_secs = elapsed.as_secs_f64(),
                "{}", event.message
            ),
            None => info!("{}", event.message),
        }
    }
}

pub fn write_graph<W: Write>(writer: &mut W, graph: &BelGraph, format: GraphFormat) -> io::Result<()> {
    match format {
        GraphFormat::Json => write_json(writer, graph),
        GraphFormat::Bel => writer.write_all(graph.to_bel_script().as_bytes()),
    }
}

fn write_json<W: Write, T: Serialize>(writer: &mut W, value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    writer.write_all(json.as_bytes())?;
    writer.write_all(b"\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn progress_events_are_logged() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            LogProgress.event(ProgressEvent {
                message: "phase=Enrich; 7 interaction rows".to_string(),
                elapsed: Some(Duration::from_millis(1500)),
            });
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("INFO"));
        assert!(output.contains("phase=Enrich; 7 interaction rows"));
        assert!(output.contains("elapsed_secs=1.5"));
    }

    #[test]
    fn bel_format_writes_script() {
        let graph = BelGraph::new(crate::domain::Namespace::Uniprot);
        let mut out = Vec::new();
        write_graph(&mut out, &graph, GraphFormat::Bel).unwrap();
        let script = String::from_utf8(out).unwrap();
        assert!(script.starts_with("SET DOCUMENT Name = \"HIPPIE\""));
    }
}
