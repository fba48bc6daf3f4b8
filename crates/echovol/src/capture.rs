//! Decoding of raw sensor captures into echo events.
//!
//! A capture row holds a piezo code (transducer id scaled by
//! [`CaptureFormat::piezo_divisor`]) and a timestamp in hardware clock ticks.

use serde::{Deserialize, Serialize};

use crate::echo::EchoEvent;

/// One undecoded capture row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub piezo_code: f64,
    pub ticks: f64,
}

/// Scale factors of the acquisition hardware.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureFormat {
    /// Transducer id is `floor(piezo_code / piezo_divisor)`.
    pub piezo_divisor: f64,
    /// Duration of one clock tick in microseconds.
    pub tick_us: f64,
}

impl Default for CaptureFormat {
    fn default() -> Self {
        Self {
            piezo_divisor: 1000.0,
            tick_us: 100.0 / 32.0,
        }
    }
}

impl CaptureFormat {
    fn decode(&self, rec: &RawRecord) -> Option<EchoEvent> {
        let id = (rec.piezo_code / self.piezo_divisor).floor();
        let timestamp_us = rec.ticks * self.tick_us;
        if !id.is_finite() || !timestamp_us.is_finite() || !(1.0..=255.0).contains(&id) {
            return None;
        }
        Some(EchoEvent::new(id as u8, timestamp_us))
    }
}

/// Decode capture rows in order, skipping rows without a valid transducer
/// id or with non-finite values.
pub fn decode_records(records: &[RawRecord], format: &CaptureFormat) -> Vec<EchoEvent> {
    let events: Vec<EchoEvent> = records.iter().filter_map(|r| format.decode(r)).collect();
    let skipped = records.len() - events.len();
    if skipped > 0 {
        tracing::warn!("skipped {} of {} undecodable capture rows", skipped, records.len());
    }
    events
}

/// Cut a capture into `n` consecutive sessions of `events.len() / n` events.
///
/// Trailing events that do not fill a whole session are dropped. `n == 0`
/// yields no sessions.
pub fn split_sessions(events: &[EchoEvent], n: usize) -> Vec<&[EchoEvent]> {
    if n == 0 {
        return Vec::new();
    }
    let size = events.len() / n;
    if size == 0 {
        return Vec::new();
    }
    let dropped = events.len() - size * n;
    if dropped > 0 {
        tracing::debug!("dropping {} trailing events", dropped);
    }
    events[..size * n].chunks_exact(size).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::echo::TransducerId;
    use approx::assert_relative_eq;

    fn rec(piezo_code: f64, ticks: f64) -> RawRecord {
        RawRecord { piezo_code, ticks }
    }

    #[test]
    fn decodes_id_and_timestamp() {
        let events = decode_records(
            &[rec(1000.0, 6.4), rec(4999.0, 35.2)],
            &CaptureFormat::default(),
        );
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].transducer, TransducerId(1));
        assert_relative_eq!(events[0].timestamp_us, 20.0, epsilon = 1e-12);
        assert_eq!(events[1].transducer, TransducerId(4));
        assert_relative_eq!(events[1].timestamp_us, 110.0, epsilon = 1e-12);
    }

    #[test]
    fn invalid_rows_are_skipped() {
        let events = decode_records(
            &[
                rec(999.0, 10.0),
                rec(256_000.0, 10.0),
                rec(f64::NAN, 10.0),
                rec(2000.0, f64::INFINITY),
                rec(-3000.0, 10.0),
                rec(3000.0, 10.0),
            ],
            &CaptureFormat::default(),
        );
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].transducer, TransducerId(3));
    }

    #[test]
    fn custom_format_is_honoured() {
        let format = CaptureFormat {
            piezo_divisor: 10.0,
            tick_us: 0.5,
        };
        let events = decode_records(&[rec(21.0, 40.0)], &format);
        assert_eq!(events[0].transducer, TransducerId(2));
        assert_relative_eq!(events[0].timestamp_us, 20.0, epsilon = 1e-12);
    }

    #[test]
    fn split_drops_remainder() {
        let events: Vec<EchoEvent> = (0..11).map(|i| EchoEvent::new(1, i as f64)).collect();
        let sessions = split_sessions(&events, 3);
        assert_eq!(sessions.len(), 3);
        assert!(sessions.iter().all(|s| s.len() == 3));
        assert_eq!(sessions[1][0].timestamp_us, 3.0);
        assert_eq!(sessions[2][2].timestamp_us, 8.0);
    }

    #[test]
    fn split_degenerate_counts() {
        let events: Vec<EchoEvent> = (0..2).map(|i| EchoEvent::new(1, i as f64)).collect();
        assert!(split_sessions(&events, 0).is_empty());
        assert!(split_sessions(&events, 3).is_empty());
        assert_eq!(split_sessions(&events, 1), vec![&events[..]]);
    }
}
