//! Trajectory output as JSON lines.

use kmc_simulation::{Snapshot, TrajectorySink};
use std::io::{self, Write};
use tracing::warn;

/// Writes one JSON object per snapshot, one per line.
///
/// The first write error stops further output and is reported by
/// [`JsonLinesSink::finish`].
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: usize,
    error: Option<io::Error>,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            written: 0,
            error: None,
        }
    }

    /// Snapshots written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush and hand back the writer, or the first error hit.
    pub fn finish(mut self) -> io::Result<W> {
        if let Some(e) = self.error {
            return Err(e);
        }
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W: Write> TrajectorySink for JsonLinesSink<W> {
    fn record(&mut self, snapshot: Snapshot) {
        if self.error.is_some() {
            return;
        }
        let result = serde_json::to_writer(&mut self.writer, &snapshot)
            .map_err(io::Error::from)
            .and_then(|()| self.writer.write_all(b"\n"));
        match result {
            Ok(()) => self.written += 1,
            Err(e) => {
                warn!(error = %e, time = snapshot.time, "Trajectory write failed");
                self.error = Some(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kmc_core::CarrierKind;
    use kmc_simulation::CarrierSnapshot;
    use kmc_types::{CarrierId, NodeId, Vec3};

    fn snapshot(time: f64) -> Snapshot {
        Snapshot {
            time,
            carriers: vec![CarrierSnapshot {
                id: CarrierId(0),
                kind: CarrierKind::Hole,
                node: Some(NodeId(4)),
                position: Some(Vec3::new(1.0, 2.0, 3.0)),
                displacement: Vec3::new(0.5, 0.0, 0.0),
                hops: 2,
            }],
        }
    }

    #[test]
    fn test_one_line_per_snapshot() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.record(snapshot(0.0));
        sink.record(snapshot(1.0));
        assert_eq!(sink.written(), 2);

        let bytes = sink.finish().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: Snapshot = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed, snapshot(1.0));
        assert!(lines[0].contains("\"kind\":\"hole\""));
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_first_error_is_kept() {
        let mut sink = JsonLinesSink::new(Broken);
        sink.record(snapshot(0.0));
        sink.record(snapshot(1.0));
        assert_eq!(sink.written(), 0);
        assert!(sink.finish().is_err());
    }
}
