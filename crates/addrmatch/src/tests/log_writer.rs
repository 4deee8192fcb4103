use std::{
  io,
  sync::{Arc, Mutex},
};

/// Collects every complete log line written through it.
#[derive(Clone, Debug, Default)]
pub(super) struct LineCollector {
  pending: Vec<u8>,
  lines: Arc<Mutex<Vec<String>>>,
}

impl LineCollector {
  pub(super) fn new(lines: Arc<Mutex<Vec<String>>>) -> LineCollector {
    LineCollector { pending: Vec::new(), lines }
  }
}

impl io::Write for LineCollector {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    self.pending.extend_from_slice(buf);

    while let Some(end) = self.pending.iter().position(|byte| *byte == b'\n') {
      let line: Vec<u8> = self.pending.drain(..=end).collect();

      self.lines.lock().unwrap().push(String::from_utf8_lossy(&line).trim_end().to_string());
    }

    Ok(buf.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}
